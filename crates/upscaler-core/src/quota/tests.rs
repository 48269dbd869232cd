use std::collections::HashMap;
use std::sync::Arc;

use upscaler_types::AccessCodeRecord;

use super::*;
use crate::error::StoreError;

fn fields(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
}

#[test]
fn test_record_key_prefix() {
    assert_eq!(record_key("demo"), "ac:demo");
}

#[test]
fn test_parse_record_full() {
    let record = parse_record(
        "ac:demo",
        &fields(&[("total", "10"), ("remaining", "4"), ("valid", "1")]),
    )
    .unwrap()
    .unwrap();
    assert_eq!(record, AccessCodeRecord { total: 10, remaining: 4, valid: true });
}

#[test]
fn test_parse_record_empty_hash_is_unknown() {
    assert!(parse_record("ac:none", &HashMap::new()).unwrap().is_none());
}

#[test]
fn test_parse_record_valid_flag() {
    let disabled =
        parse_record("ac:x", &fields(&[("total", "5"), ("remaining", "5"), ("valid", "0")]))
            .unwrap()
            .unwrap();
    assert!(!disabled.valid);

    let missing_flag = parse_record("ac:x", &fields(&[("total", "5"), ("remaining", "5")]))
        .unwrap()
        .unwrap();
    assert!(missing_flag.valid);
}

#[test]
fn test_parse_record_negative_remaining_kept() {
    let record =
        parse_record("ac:x", &fields(&[("total", "5"), ("remaining", "-1"), ("valid", "1")]))
            .unwrap()
            .unwrap();
    assert_eq!(record.remaining, -1);
    assert_eq!(record.quota().remaining, 0);
}

#[test]
fn test_parse_record_corrupt_integer() {
    let err = parse_record("ac:x", &fields(&[("total", "ten"), ("remaining", "1")])).unwrap_err();
    match err {
        StoreError::CorruptRecord { field, value, .. } => {
            assert_eq!(field, "total");
            assert_eq!(value, "ten");
        },
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_record_fields_roundtrip_layout() {
    let encoded = record_fields(&AccessCodeRecord { total: 3, remaining: 2, valid: false });
    assert_eq!(encoded[0], ("total", "3".to_string()));
    assert_eq!(encoded[1], ("remaining", "2".to_string()));
    assert_eq!(encoded[2], ("valid", "0".to_string()));
}

#[tokio::test]
async fn test_memory_store_decrement_returns_new_value() {
    let store = MemoryQuotaStore::with_records([(
        "demo".to_string(),
        AccessCodeRecord { total: 10, remaining: 2, valid: true },
    )]);

    assert_eq!(store.decrement("demo").await.unwrap(), 1);
    assert_eq!(store.decrement("demo").await.unwrap(), 0);
    assert_eq!(store.decrement("demo").await.unwrap(), -1);
    assert_eq!(store.decrement_count(), 3);
}

#[tokio::test]
async fn test_memory_store_unknown_code() {
    let store = MemoryQuotaStore::new();
    assert!(store.get_record("ghost").await.unwrap().is_none());
    assert!(matches!(store.decrement("ghost").await, Err(StoreError::NotFound { .. })));
    assert!(!store.set_valid("ghost", false).await.unwrap());
}

#[tokio::test]
async fn test_memory_store_concurrent_decrements_are_not_lost() {
    let store = Arc::new(MemoryQuotaStore::with_records([(
        "busy".to_string(),
        AccessCodeRecord::issue(100),
    )]));

    let mut handles = Vec::new();
    for _ in 0..50 {
        let store = store.clone();
        handles.push(tokio::spawn(async move { store.decrement("busy").await }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(store.snapshot("busy").unwrap().remaining, 50);
    assert_eq!(store.decrement_count(), 50);
}

#[tokio::test]
async fn test_memory_store_admin_operations() {
    let store = MemoryQuotaStore::new();
    store.put_record("new", &AccessCodeRecord::issue(7)).await.unwrap();
    assert!(store.set_valid("new", false).await.unwrap());

    let record = store.get_record("new").await.unwrap().unwrap();
    assert_eq!(record.total, 7);
    assert!(!record.valid);
}
