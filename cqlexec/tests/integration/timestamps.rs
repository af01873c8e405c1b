use std::sync::Arc;

use cqlexec::client::options::QueryOptions;
use cqlexec::client::ClientBuilder;
use cqlexec::policies::timestamp_generator::SimpleTimestampGenerator;
use cqlexec::ProtocolVersion;

use crate::utils::{setup_tracing, FakeControlConnection, FakeMetadata, TestCluster};

async fn sent_timestamp(
    version: ProtocolVersion,
    builder: ClientBuilder,
    options: QueryOptions,
) -> Option<i64> {
    let cluster = TestCluster::with(
        FakeControlConnection::new().with_protocol_version(version),
        FakeMetadata::agreeing_on_poll(1),
        builder,
    );
    cluster
        .client
        .execute("INSERT INTO ks.t (a) VALUES (1)", (), &options)
        .await
        .unwrap();
    cluster.handler.last().1.timestamp
}

#[tokio::test]
async fn timestamps_require_protocol_v3() {
    setup_tracing();
    let explicit = QueryOptions {
        timestamp: Some(1_000),
        ..Default::default()
    };

    for version in [ProtocolVersion::V1, ProtocolVersion::V2] {
        assert_eq!(
            sent_timestamp(version, ClientBuilder::new(), QueryOptions::default()).await,
            None
        );
        assert_eq!(
            sent_timestamp(version, ClientBuilder::new(), explicit.clone()).await,
            None
        );
    }

    for version in [ProtocolVersion::V3, ProtocolVersion::V4, ProtocolVersion::V5] {
        assert_eq!(
            sent_timestamp(version, ClientBuilder::new(), explicit.clone()).await,
            Some(1_000)
        );
        assert!(
            sent_timestamp(version, ClientBuilder::new(), QueryOptions::default())
                .await
                .is_some()
        );
    }
}

#[tokio::test]
async fn generated_timestamps_increase() {
    setup_tracing();
    let cluster = TestCluster::new();
    for _ in 0..10 {
        cluster
            .client
            .execute("INSERT INTO ks.t (a) VALUES (1)", (), &QueryOptions::default())
            .await
            .unwrap();
    }
    let timestamps: Vec<i64> = cluster
        .handler
        .sent
        .lock()
        .unwrap()
        .iter()
        .map(|(_, resolved)| resolved.timestamp.unwrap())
        .collect();
    assert!(timestamps.windows(2).all(|w| w[0] < w[1]));
}

#[tokio::test]
async fn no_generator_means_server_side_timestamps() {
    setup_tracing();
    assert_eq!(
        sent_timestamp(
            ProtocolVersion::V4,
            ClientBuilder::new().timestamp_generator(None),
            QueryOptions::default()
        )
        .await,
        None
    );

    let simple = ClientBuilder::new().timestamp_generator(Some(Arc::new(SimpleTimestampGenerator::new())));
    assert!(
        sent_timestamp(ProtocolVersion::V4, simple, QueryOptions::default())
            .await
            .is_some()
    );
}
