use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use cqlexec::client::options::QueryOptions;
use cqlexec::client::ClientBuilder;
use cqlexec::errors::{BadQuery, ClientBuildError, ExecutionError};
use cqlexec::policies::retry::{FallthroughRetryPolicy, RetryPolicy};
use cqlexec::{Consistency, ExecutionProfile, SerialConsistency};

use crate::utils::{setup_tracing, FakeControlConnection, FakeMetadata, TestCluster};

fn cluster_with_profiles() -> TestCluster {
    let default = ExecutionProfile::builder("default")
        .consistency(Consistency::Quorum)
        .read_timeout(Duration::from_secs(2))
        .build();
    let oltp = ExecutionProfile::builder("oltp")
        .consistency(Consistency::LocalQuorum)
        .build();
    let lwt = ExecutionProfile::builder("lwt")
        .serial_consistency(SerialConsistency::LocalSerial)
        .build();
    TestCluster::with(
        FakeControlConnection::new(),
        FakeMetadata::agreeing_on_poll(1),
        ClientBuilder::new()
            .default_serial_consistency(SerialConsistency::Serial)
            .execution_profile(default)
            .execution_profile(oltp)
            .execution_profile(lwt),
    )
}

#[tokio::test]
async fn options_come_from_request_then_profile_then_default() {
    setup_tracing();
    let cluster = cluster_with_profiles();

    cluster
        .client
        .execute("SELECT 1", (), &QueryOptions::default())
        .await
        .unwrap();
    let (_, resolved) = cluster.handler.last();
    assert_eq!(resolved.profile_name, "default");
    assert_eq!(resolved.consistency, Consistency::Quorum);
    assert_eq!(resolved.read_timeout, Duration::from_secs(2));

    let options = QueryOptions {
        execution_profile: Some("lwt".into()),
        ..Default::default()
    };
    cluster.client.execute("SELECT 1", (), &options).await.unwrap();
    let (_, resolved) = cluster.handler.last();
    assert_eq!(resolved.profile_name, "lwt");
    // Unset in "lwt", inherited from "default".
    assert_eq!(resolved.consistency, Consistency::Quorum);
    assert_eq!(resolved.serial_consistency, SerialConsistency::LocalSerial);

    let retry_policy: Arc<dyn RetryPolicy> = Arc::new(FallthroughRetryPolicy::new());
    let options = QueryOptions {
        execution_profile: Some("oltp".into()),
        consistency: Some(Consistency::One),
        retry_policy: Some(retry_policy.clone()),
        is_idempotent: Some(true),
        ..Default::default()
    };
    cluster.client.execute("SELECT 1", (), &options).await.unwrap();
    let (_, resolved) = cluster.handler.last();
    assert_eq!(resolved.profile_name, "oltp");
    assert_eq!(resolved.consistency, Consistency::One);
    assert!(resolved.is_idempotent);
    assert!(Arc::ptr_eq(&resolved.retry_policy, &retry_policy));
}

#[tokio::test]
async fn unknown_profile_is_an_argument_error() {
    setup_tracing();
    let cluster = cluster_with_profiles();
    let options = QueryOptions {
        execution_profile: Some("olap".into()),
        ..Default::default()
    };
    assert_matches!(
        cluster.client.execute("SELECT 1", (), &options).await,
        Err(ExecutionError::BadQuery(BadQuery::ExecutionProfileNotFound(name))) if name == "olap"
    );
    assert!(!cluster.client.is_connected());
}

#[tokio::test]
async fn malformed_hint_is_a_type_error() {
    setup_tracing();
    let cluster = cluster_with_profiles();
    let options = QueryOptions {
        hints: Some(cqlexec::client::options::TypeHints::positional([Some(
            "map<text>",
        )])),
        ..Default::default()
    };
    assert_matches!(
        cluster.client.execute("SELECT 1", (), &options).await,
        Err(ExecutionError::BadTypeHint(_))
    );
    assert!(cluster.handler.sent.lock().unwrap().is_empty());
}

#[test]
fn duplicate_profile_names_fail_build() {
    let cluster = TestCluster::new();
    let err = ClientBuilder::new()
        .known_node("127.0.0.1:9042")
        .execution_profile(ExecutionProfile::builder("a").build())
        .execution_profile(ExecutionProfile::builder("a").build())
        .control_connection(cluster.control_connection.clone())
        .request_handler(cluster.handler.clone())
        .prepare_handler(cluster.preparer.clone())
        .metadata(cluster.metadata.clone())
        .build()
        .unwrap_err();
    assert_eq!(err, ClientBuildError::DuplicateExecutionProfile("a".into()));
}
