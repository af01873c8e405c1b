use bytes::Bytes;
use cqlexec::client::options::{QueryOptions, TypeHints};
use cqlexec::statement::{ColumnSpec, PreparedMetadata, Request};
use cqlexec::{ColumnType, CqlValue, Values};

use crate::utils::{setup_tracing, TestCluster};

const COMPOSITE_KEY: [u8; 14] = [
    0x00, 0x04, 0x00, 0x00, 0x00, 0x01, 0x00, // first component: int 1
    0x00, 0x04, 0x00, 0x00, 0x00, 0x02, 0x00, // second component: int 2
];

fn two_int_key_metadata(pk_indexes: Option<Vec<usize>>) -> PreparedMetadata {
    let int = ColumnType::parse("int").unwrap();
    PreparedMetadata {
        col_specs: vec![
            ColumnSpec::new("id1", int.clone()),
            ColumnSpec::new("id2", int.clone()),
            ColumnSpec::new("value", ColumnType::parse("text").unwrap()),
        ],
        pk_indexes,
    }
}

fn prepared_options() -> QueryOptions {
    QueryOptions {
        prepare: Some(true),
        ..Default::default()
    }
}

#[tokio::test]
async fn composite_key_from_prepared_partition_keys() {
    setup_tracing();
    let cluster = TestCluster::new();
    *cluster.preparer.metadata.lock().unwrap() = two_int_key_metadata(Some(vec![0, 1]));

    cluster
        .client
        .execute(
            "INSERT INTO ks.t (id1, id2, value) VALUES (?, ?, ?)",
            vec![CqlValue::Int(1), CqlValue::Int(2), CqlValue::from("v")],
            &prepared_options(),
        )
        .await
        .unwrap();

    let (_, resolved) = cluster.handler.last();
    assert_eq!(resolved.routing_key.as_deref(), Some(&COMPOSITE_KEY[..]));
}

#[tokio::test]
async fn composite_key_from_routing_names() {
    setup_tracing();
    let cluster = TestCluster::new();
    *cluster.preparer.metadata.lock().unwrap() = two_int_key_metadata(None);

    let options = QueryOptions {
        routing_names: Some(vec!["id1".into(), "id2".into()]),
        ..prepared_options()
    };
    let values = Values::named([
        ("value", Some(CqlValue::from("v"))),
        ("ID2", Some(CqlValue::Int(2))),
        ("id1", Some(CqlValue::Int(1))),
    ]);
    cluster
        .client
        .execute(
            "INSERT INTO ks.t (id1, id2, value) VALUES (:id1, :id2, :value)",
            values,
            &options,
        )
        .await
        .unwrap();

    let (request, resolved) = cluster.handler.last();
    assert_eq!(resolved.routing_key.as_deref(), Some(&COMPOSITE_KEY[..]));
    match request {
        Request::Execute { values, .. } => assert_eq!(
            values,
            Values::positional([CqlValue::Int(1), CqlValue::Int(2), CqlValue::from("v")])
        ),
        other => panic!("Unexpected request {:?}", other),
    }
}

#[tokio::test]
async fn single_component_is_not_length_prefixed() {
    setup_tracing();
    let cluster = TestCluster::new();
    let options = QueryOptions {
        routing_indexes: Some(vec![1]),
        hints: Some(TypeHints::positional([None, Some("bigint")])),
        ..Default::default()
    };
    cluster
        .client
        .execute(
            "SELECT * FROM ks.t WHERE a = ? AND b = ?",
            vec![CqlValue::from("ignored"), CqlValue::BigInt(5)],
            &options,
        )
        .await
        .unwrap();

    let (_, resolved) = cluster.handler.last();
    assert_eq!(
        resolved.routing_key,
        Some(Bytes::from_static(&[0, 0, 0, 0, 0, 0, 0, 5]))
    );
}

#[tokio::test]
async fn null_component_disables_routing() {
    setup_tracing();
    let cluster = TestCluster::new();
    let options = QueryOptions {
        routing_indexes: Some(vec![0, 1]),
        ..Default::default()
    };
    cluster
        .client
        .execute(
            "SELECT * FROM ks.t WHERE a = ? AND b = ?",
            Values::Positional(vec![Some(CqlValue::Int(1)), None]),
            &options,
        )
        .await
        .unwrap();

    assert_eq!(cluster.handler.last().1.routing_key, None);
}

#[tokio::test]
async fn empty_partition_key_indexes_disable_routing() {
    setup_tracing();
    let cluster = TestCluster::new();
    *cluster.preparer.metadata.lock().unwrap() = two_int_key_metadata(Some(vec![]));

    cluster
        .client
        .execute(
            "UPDATE ks.t SET value = ? WHERE id1 = 1 AND id2 = ?",
            vec![CqlValue::Int(1), CqlValue::Int(2), CqlValue::from("v")],
            &prepared_options(),
        )
        .await
        .unwrap();
    assert_eq!(cluster.handler.last().1.routing_key, None);

    let options = QueryOptions {
        routing_indexes: Some(vec![]),
        ..Default::default()
    };
    cluster
        .client
        .execute(
            "SELECT * FROM ks.t WHERE a = ?",
            vec![CqlValue::Int(1)],
            &options,
        )
        .await
        .unwrap();
    assert_eq!(cluster.handler.last().1.routing_key, None);
}
