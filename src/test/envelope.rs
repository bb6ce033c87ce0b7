use crate::protocol::{DecodeError, Envelope, MessageKind, DEFAULT_TTL};
use serde_json::{json, Map, Value};

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

#[test]
fn round_trip_preserves_every_field_for_each_kind() {
    let kinds = [
        MessageKind::Hello,
        MessageKind::Echo,
        MessageKind::Lsa,
        MessageKind::Data,
        MessageKind::Info,
    ];

    for (i, kind) in kinds.into_iter().enumerate() {
        let envelope = Envelope::new("lsr", kind, "A", "D")
            .with_ttl(i as i64)
            .with_header("t0", 1712.5)
            .with_header("came_from", "B")
            .with_payload(object(json!({
                "text": "hola",
                "nested": {"list": [1, 2, 3], "flag": true, "none": null},
                "n": -4
            })));

        let decoded = Envelope::decode(&envelope.encode()).unwrap();
        assert_eq!(decoded, envelope);
    }
}

#[test]
fn encode_uses_wire_field_names() {
    let envelope = Envelope::new("lsr", MessageKind::Data, "A", "B");
    let value: Value = serde_json::from_str(&envelope.encode()).unwrap();

    assert_eq!(value["type"], "data");
    assert_eq!(value["from"], "A");
    assert_eq!(value["to"], "B");
    assert_eq!(value["ttl"], DEFAULT_TTL);
    assert_eq!(value["proto"], "lsr");
    assert!(value["headers"].as_object().unwrap().is_empty());
}

#[test]
fn missing_fields_take_defaults() {
    let envelope = Envelope::decode("{}").unwrap();

    assert_eq!(envelope.proto, "");
    assert_eq!(envelope.kind, MessageKind::Other(String::new()));
    assert_eq!(envelope.src, "");
    assert_eq!(envelope.dst, "");
    assert_eq!(envelope.ttl, 8);
    assert!(envelope.headers.is_empty());
    assert!(envelope.payload.is_empty());
}

#[test]
fn unknown_fields_are_ignored() {
    let envelope = Envelope::decode(
        r#"{"type":"data","from":"A","to":"C","ttl":3,"priority":"high","trace":[1,2]}"#,
    )
    .unwrap();

    assert_eq!(envelope.kind, MessageKind::Data);
    assert_eq!(envelope.ttl, 3);
}

#[test]
fn unknown_kind_survives_round_trip() {
    let envelope = Envelope::decode(r#"{"type":"lsp","from":"A"}"#).unwrap();
    assert_eq!(envelope.kind, MessageKind::Other("lsp".to_string()));
    assert_eq!(Envelope::decode(&envelope.encode()).unwrap(), envelope);
}

#[test]
fn malformed_input_is_a_decode_error() {
    assert!(matches!(Envelope::decode("not json"), Err(DecodeError::Json(_))));
    assert!(matches!(Envelope::decode("[1, 2]"), Err(DecodeError::Json(_))));
    assert!(matches!(Envelope::decode(r#"{"ttl":"many"}"#), Err(DecodeError::Json(_))));
    assert!(matches!(
        Envelope::decode_bytes(&[0xff, 0xfe, b'{']),
        Err(DecodeError::Utf8(_))
    ));
}

#[test]
fn negative_hop_limit_is_carried_as_is() {
    let envelope = Envelope::decode(r#"{"type":"data","ttl":-2}"#).unwrap();
    assert_eq!(envelope.ttl, -2);
}
