use std::sync::atomic::Ordering;
use std::time::Duration;

use cqlexec::client::options::QueryOptions;
use cqlexec::client::ClientBuilder;
use cqlexec::response::{QueryResult, SchemaChange};

use crate::utils::{setup_tracing, FakeControlConnection, FakeMetadata, TestCluster};

fn table_created() -> QueryResult {
    QueryResult::new().with_schema_change(SchemaChange {
        change_type: "CREATED".into(),
        target: "TABLE".into(),
        keyspace: "ks".into(),
        name: Some("t".into()),
    })
}

#[tokio::test(start_paused = true)]
async fn agreement_reached_on_third_poll() {
    setup_tracing();
    let cluster = TestCluster::with(
        FakeControlConnection::new(),
        FakeMetadata::agreeing_on_poll(3),
        ClientBuilder::new(),
    );
    *cluster.handler.response.lock().unwrap() = Some(table_created());

    let result = cluster
        .client
        .execute("CREATE TABLE ks.t (a int PRIMARY KEY)", (), &QueryOptions::default())
        .await
        .unwrap();

    assert!(result.is_schema_in_agreement());
    assert_eq!(cluster.metadata.polls.load(Ordering::SeqCst), 3);
}

#[tokio::test(start_paused = true)]
async fn deadline_elapses_without_agreement() {
    setup_tracing();
    let cluster = TestCluster::with(
        FakeControlConnection::new(),
        FakeMetadata::never_agreeing(),
        ClientBuilder::new().max_schema_agreement_wait(Duration::from_secs(1)),
    );
    *cluster.handler.response.lock().unwrap() = Some(table_created());

    let result = cluster
        .client
        .execute("CREATE TABLE ks.t (a int PRIMARY KEY)", (), &QueryOptions::default())
        .await
        .unwrap();

    assert!(!result.is_schema_in_agreement());
    let polls = cluster.metadata.polls.load(Ordering::SeqCst);
    assert!((5..=6).contains(&polls), "unexpected number of polls: {}", polls);
}

#[tokio::test(start_paused = true)]
async fn automatic_waiting_can_be_disabled() {
    setup_tracing();
    let cluster = TestCluster::with(
        FakeControlConnection::new(),
        FakeMetadata::never_agreeing(),
        ClientBuilder::new().auto_await_schema_agreement(false),
    );
    *cluster.handler.response.lock().unwrap() = Some(table_created());

    let result = cluster
        .client
        .execute("CREATE TABLE ks.t (a int PRIMARY KEY)", (), &QueryOptions::default())
        .await
        .unwrap();

    assert!(result.is_schema_in_agreement());
    assert_eq!(cluster.metadata.polls.load(Ordering::SeqCst), 0);
    assert!(!cluster.client.check_schema_agreement().await.unwrap());
    assert_eq!(cluster.metadata.polls.load(Ordering::SeqCst), 1);
}

#[tokio::test(start_paused = true)]
async fn shutdown_interrupts_waiting() {
    setup_tracing();
    let cluster = TestCluster::with(
        FakeControlConnection::new(),
        FakeMetadata::never_agreeing(),
        ClientBuilder::new().max_schema_agreement_wait(Duration::from_secs(3600)),
    );
    cluster.client.connect().await.unwrap();

    let client = cluster.client.clone();
    let waiting = tokio::spawn(async move { client.await_schema_agreement().await });
    tokio::time::sleep(Duration::from_secs(1)).await;
    cluster.client.shutdown().await;

    assert!(!waiting.await.unwrap().unwrap());
}
