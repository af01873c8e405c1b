use assert_matches::assert_matches;
use cqlexec::client::options::QueryOptions;
use cqlexec::errors::{BadQuery, ExecutionError};
use cqlexec::statement::{BatchEntry, BatchStatement, BatchType, Request};
use cqlexec::{CqlValue, Values};

use crate::utils::{setup_tracing, TestCluster};

#[tokio::test]
async fn invalid_batches_are_rejected_before_connecting() {
    setup_tracing();
    let cluster = TestCluster::new();
    let options = QueryOptions::default();

    assert_matches!(
        cluster.client.batch(Vec::<BatchEntry>::new(), &options).await,
        Err(ExecutionError::BadQuery(BadQuery::EmptyBatch))
    );

    let prepared = QueryOptions {
        prepare: Some(true),
        ..Default::default()
    };
    assert_matches!(
        cluster
            .client
            .batch(["INSERT INTO ks.t (a) VALUES (1)".to_owned(), String::new()], &prepared)
            .await,
        Err(ExecutionError::BadQuery(BadQuery::InvalidBatchEntry(1)))
    );

    let too_many = vec![BatchEntry::from("INSERT INTO ks.t (a) VALUES (1)"); 70_000];
    assert_matches!(
        cluster.client.batch(too_many, &options).await,
        Err(ExecutionError::BadQuery(BadQuery::TooManyQueriesInBatchStatement(70_000)))
    );

    assert!(!cluster.client.is_connected());
    assert!(cluster.handler.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn prepared_batch_binds_every_entry() {
    setup_tracing();
    let cluster = TestCluster::new();
    let options = QueryOptions {
        prepare: Some(true),
        counter: Some(true),
        ..Default::default()
    };
    cluster
        .client
        .batch(
            [
                ("UPDATE ks.c SET n = n + 1 WHERE k = ?", Values::positional([CqlValue::Int(1)])),
                ("UPDATE ks.c SET n = n + 1 WHERE k = ?", Values::positional([CqlValue::Int(2)])),
            ],
            &options,
        )
        .await
        .unwrap_err();

    // The fake preparer reports no bind markers, so the values do not match.
    assert!(cluster.handler.sent.lock().unwrap().is_empty());

    *cluster.preparer.metadata.lock().unwrap() = cqlexec::statement::PreparedMetadata {
        col_specs: vec![cqlexec::statement::ColumnSpec::new(
            "k",
            cqlexec::ColumnType::parse("int").unwrap(),
        )],
        pk_indexes: Some(vec![0]),
    };
    cluster
        .client
        .batch(
            [
                ("UPDATE ks.c2 SET n = n + 1 WHERE k = ?", Values::positional([CqlValue::Int(1)])),
                ("UPDATE ks.c2 SET n = n + 2 WHERE k = ?", Values::positional([CqlValue::Int(2)])),
            ],
            &options,
        )
        .await
        .unwrap();

    let (request, resolved) = cluster.handler.last();
    assert_matches!(request, Request::Batch { batch_type: BatchType::Counter, statements } => {
        assert_eq!(statements.len(), 2);
        assert!(statements.iter().all(|s| matches!(s, BatchStatement::Prepared { .. })));
    });
    assert_eq!(resolved.routing_key.as_deref(), Some(&[0, 0, 0, 1][..]));
}

#[tokio::test]
async fn batch_with_callback_reports_errors() {
    setup_tracing();
    let cluster = TestCluster::new();
    let (tx, rx) = tokio::sync::oneshot::channel();
    cluster
        .client
        .batch_with_callback(Vec::new(), QueryOptions::default(), move |res| {
            let _ = tx.send(res);
        })
        .await
        .unwrap();
    assert_matches!(
        rx.await.unwrap(),
        Err(ExecutionError::BadQuery(BadQuery::EmptyBatch))
    );
}
