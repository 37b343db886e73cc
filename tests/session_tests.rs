//! Tests for the deserializer session lifecycle: construction, close,
//! reconstruction and type tracking.

mod common;

use std::sync::Arc;
use std::thread;

use avro_deser::{
    AvroDeserializer, DecodePlan, DecodeState, DeserializerConfig, ErrorKind, NamedKind,
    NativeValue, Reconstruction, TYPE_IDENTITY,
};
use common::{Encoder, LIST_SCHEMA, PERSON_SCHEMA};

const ORDER_SCHEMA: &str = r#"{
    "type": "record",
    "name": "Order",
    "namespace": "shop",
    "fields": [
        {"name": "id", "type": "long"},
        {"name": "status", "type": {"type": "enum", "name": "Status", "symbols": ["NEW", "PAID"]}},
        {"name": "payment", "type": ["null",
            {"type": "record", "name": "Card", "fields": [
                {"name": "digest", "type": {"type": "fixed", "name": "Digest", "size": 2}}
            ]},
            "string"
        ]}
    ]
}"#;

// ============================================================================
// Construction and close
// ============================================================================

#[test]
fn test_invalid_schema_fails_construction() {
    for text in [
        "{not json",
        r#""decimal""#,
        r#"{"type": "record", "name": "R"}"#,
        r#"{"type": "record", "name": "R", "fields": [{"name": "x", "type": "Nope"}]}"#,
        r#"{"type": "record", "name": "R", "fields": [{"name": "x", "type": "int", "default": 1.5}]}"#,
    ] {
        let err = AvroDeserializer::new(text).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Schema, "schema {}", text);
        assert!(err.to_string().starts_with("Error reading schema"));
    }
}

#[test]
fn test_close_any_number_of_times() {
    let mut deser = AvroDeserializer::new(PERSON_SCHEMA).unwrap();
    for _ in 0..3 {
        deser.close();
        assert!(deser.is_closed());
        assert_eq!(deser.state(), DecodeState::Closed);
    }
    let err = deser.decode(&[0x02, 0x00], None).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Closed);
    assert!(!err.is_retryable());
}

#[test]
fn test_drop_without_close() {
    let plan = Arc::new(DecodePlan::from_schema_text(PERSON_SCHEMA, false).unwrap());
    {
        let mut deser = AvroDeserializer::from_plan(Arc::clone(&plan), DeserializerConfig::new());
        deser.decode(&[0x02, 0x00], None).unwrap();
        assert_eq!(Arc::strong_count(&plan), 2);
    }
    assert_eq!(Arc::strong_count(&plan), 1);
}

// ============================================================================
// Calls are independent
// ============================================================================

#[test]
fn test_failed_call_does_not_affect_next_or_previous() {
    let mut deser = AvroDeserializer::new(PERSON_SCHEMA).unwrap();
    let first = deser
        .decode(&Encoder::new().long(5).string("five").finish(), None)
        .unwrap();

    // truncated string
    assert!(deser.decode(&[0x02, 0x08, b'a'], None).is_err());

    let second = deser
        .decode(&Encoder::new().long(6).string("six").finish(), None)
        .unwrap();
    assert_eq!(first.get("b").and_then(NativeValue::as_str), Some("five"));
    assert_eq!(second.get("b").and_then(NativeValue::as_str), Some("six"));
}

#[test]
fn test_cursor_state_never_leaks_between_calls() {
    let mut deser = AvroDeserializer::new(r#""long""#).unwrap();
    // trailing bytes of the first call must not be read by the second
    assert_eq!(deser.decode(&[0x02, 0x04, 0x06], None).unwrap(), NativeValue::Int(1));
    assert_eq!(deser.decode(&[0x08], None).unwrap(), NativeValue::Int(4));
    assert_eq!(deser.decode(&[], None).unwrap_err().kind(), ErrorKind::TruncatedInput);
}

// ============================================================================
// Reconstruction
// ============================================================================

#[test]
fn test_reconstruction_round_trip() {
    let mut deser = AvroDeserializer::with_types(LIST_SCHEMA, true).unwrap();
    let data = Encoder::new().long(1).index(0).finish();
    deser.decode(&data, None).unwrap();

    let token = deser.reconstruct();
    assert_eq!(token.type_identity, TYPE_IDENTITY);
    assert_eq!(token.reader_schema, LIST_SCHEMA);

    let json = serde_json::to_string(&token).unwrap();
    let back: Reconstruction = serde_json::from_str(&json).unwrap();
    let mut rebuilt = back.rebuild().unwrap();

    // tracking and registry contents are not carried over
    assert!(rebuilt.types().is_none());
    assert_eq!(rebuilt.reader_schema(), deser.reader_schema());
    assert_eq!(
        rebuilt.decode(&data, None).unwrap().get("value"),
        Some(&NativeValue::Int(1))
    );
}

#[test]
fn test_reconstruct_after_close() {
    let mut deser = AvroDeserializer::new(PERSON_SCHEMA).unwrap();
    deser.close();
    let mut rebuilt = deser.reconstruct().rebuild().unwrap();
    assert!(rebuilt.decode(&[0x02, 0x00], None).is_ok());
}

#[test]
fn test_rebuild_rejects_foreign_identity() {
    let token = Reconstruction {
        type_identity: "something.Else".to_string(),
        reader_schema: PERSON_SCHEMA.to_string(),
    };
    assert_eq!(token.rebuild().unwrap_err().kind(), ErrorKind::Schema);
}

// ============================================================================
// Type tracking
// ============================================================================

#[test]
fn test_registry_absent_without_tracking() {
    let mut deser = AvroDeserializer::new(ORDER_SCHEMA).unwrap();
    let data = Encoder::new().long(1).index(0).index(0).finish();
    assert_eq!(deser.decode(&data, None).unwrap().get("payment"), Some(&NativeValue::Null));
    assert!(deser.types().is_none());
}

#[test]
fn test_registry_records_types_actually_used() {
    let mut deser = AvroDeserializer::with_types(ORDER_SCHEMA, true).unwrap();

    // payment = null: the Card and Digest types are never met
    let data = Encoder::new().long(1).index(1).index(0).finish();
    let value = deser.decode(&data, None).unwrap();
    assert_eq!(
        value.get("payment"),
        Some(&NativeValue::Tagged {
            type_name: "null".to_string(),
            value: Box::new(NativeValue::Null),
        })
    );
    let registry = deser.types().unwrap();
    assert_eq!(
        registry.names().collect::<Vec<_>>(),
        vec!["shop.Order", "shop.Status"]
    );

    // payment = Card
    let data = Encoder::new().long(2).index(0).index(1).fixed(&[9, 9]).finish();
    let value = deser.decode(&data, None).unwrap();
    assert_eq!(value.get("payment").and_then(NativeValue::type_name), Some("shop.Card"));
    let registry = deser.types().unwrap();
    assert_eq!(
        registry.names().collect::<Vec<_>>(),
        vec!["shop.Card", "shop.Digest", "shop.Order", "shop.Status"]
    );
    assert_eq!(registry.get("shop.Digest").unwrap().kind, NamedKind::Fixed);
    assert_eq!(registry.get("shop.Digest").unwrap().size, Some(2));
    assert_eq!(
        registry.get("shop.Status").unwrap().symbols,
        vec!["NEW".to_string(), "PAID".to_string()]
    );

    // repeat payloads leave the registry unchanged
    deser.decode(&data, None).unwrap();
    assert_eq!(deser.types().unwrap().len(), 4);
}

#[test]
fn test_registry_survives_failed_calls() {
    let mut deser = AvroDeserializer::with_types(ORDER_SCHEMA, true).unwrap();
    deser
        .decode(&Encoder::new().long(1).index(0).index(0).finish(), None)
        .unwrap();
    assert!(deser.decode(&[0x02], None).is_err());
    assert!(deser.types().unwrap().contains("shop.Order"));
}

#[test]
fn test_registry_carried_across_sessions() {
    let mut orders = AvroDeserializer::with_types(ORDER_SCHEMA, true).unwrap();
    orders
        .decode(&Encoder::new().long(1).index(0).index(0).finish(), None)
        .unwrap();
    orders.close();
    let registry = orders.into_types().unwrap();

    let mut lists = AvroDeserializer::with_registry(LIST_SCHEMA, registry).unwrap();
    assert!(lists.config().track_types);
    lists
        .decode(&Encoder::new().long(7).index(0).finish(), None)
        .unwrap();

    let registry = lists.into_types().unwrap();
    assert_eq!(
        registry.names().collect::<Vec<_>>(),
        vec!["shop.Order", "shop.Status", "test.lists.LongList"]
    );
    assert!(AvroDeserializer::new(PERSON_SCHEMA).unwrap().into_types().is_none());
}

// ============================================================================
// Sharing
// ============================================================================

#[test]
fn test_one_session_per_thread_sharing_a_plan() {
    let plan = Arc::new(DecodePlan::from_schema_text(PERSON_SCHEMA, false).unwrap());

    let handles: Vec<_> = (0..4i64)
        .map(|i| {
            let plan = Arc::clone(&plan);
            thread::spawn(move || {
                let mut deser = AvroDeserializer::from_plan(plan, DeserializerConfig::new());
                let data = Encoder::new().long(i).string("t").finish();
                deser.decode(&data, None).unwrap().get("a").and_then(NativeValue::as_i64)
            })
        })
        .collect();

    let mut seen: Vec<i64> = handles
        .into_iter()
        .map(|h| h.join().unwrap().unwrap())
        .collect();
    seen.sort_unstable();
    assert_eq!(seen, vec![0, 1, 2, 3]);
}
