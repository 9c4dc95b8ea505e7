use super::*;
use serde_json::json;
use time::macros::datetime;

#[test]
fn numeric_and_string_ids_decode_to_the_same_user() {
    let a: UserId = serde_json::from_value(json!(42)).expect("numeric id");
    let b: UserId = serde_json::from_value(json!("42")).expect("string id");
    assert_eq!(a, b);
    assert_eq!(a.as_str(), "42");
    assert_eq!(serde_json::to_value(&a).expect("encode"), json!("42"));
}

#[test]
fn decode_new_message_with_numeric_ids() {
    let text = r#"{"type":"new_message","data":{"sender_id":42,"receiver_id":7,"message":"hi","created_at":"2024-01-01T00:00:00Z"}}"#;
    let event = decode_event(text).expect("decode");

    let InboundEvent::NewMessage(msg) = event else {
        panic!("expected new_message, got {event:?}");
    };
    assert_eq!(msg.id, None);
    assert_eq!(msg.sender_id, UserId::from(42));
    assert_eq!(msg.receiver_id, UserId::from("7"));
    assert_eq!(msg.message, "hi");
    assert_eq!(msg.created_at, datetime!(2024-01-01 00:00:00 UTC));
    assert_eq!(msg.sender_name, None);
}

#[test]
fn decode_new_message_keeps_server_id_and_name() {
    let text = json!({
        "type": "new_message",
        "data": {
            "id": 981,
            "sender_id": "3",
            "receiver_id": "9",
            "message": "yo",
            "created_at": "2024-03-05T10:11:12.123456789+02:00",
            "is_read": false,
            "sender_name": "carol"
        }
    })
    .to_string();

    let InboundEvent::NewMessage(msg) = decode_event(&text).expect("decode") else {
        panic!("expected new_message");
    };
    assert_eq!(msg.id, Some(MessageId::from("981")));
    assert_eq!(msg.sender_name.as_deref(), Some("carol"));
    assert_eq!(msg.created_at, datetime!(2024-03-05 08:11:12.123456789 UTC));
}

#[test]
fn decode_typing_and_status() {
    let typing = decode_event(r#"{"type":"typing","data":{"user_id":5,"is_typing":true,"username":"eve"}}"#)
        .expect("typing");
    assert_eq!(
        typing,
        InboundEvent::Typing(TypingPayload {
            user_id: UserId::from(5),
            is_typing: true,
            username: Some("eve".to_owned()),
        })
    );

    let status = decode_event(r#"{"type":"user_status","data":{"user_id":"5","is_online":false}}"#)
        .expect("status");
    assert_eq!(
        status,
        InboundEvent::UserStatus(StatusPayload { user_id: UserId::from(5), is_online: false, username: None })
    );
}

#[test]
fn decode_force_refresh_ignores_data() {
    assert_eq!(decode_event(r#"{"type":"force_refresh"}"#).expect("decode"), InboundEvent::ForceRefresh);
    assert_eq!(
        decode_event(r#"{"type":"force_refresh","data":{"anything":1}}"#).expect("decode"),
        InboundEvent::ForceRefresh
    );
}

#[test]
fn unknown_type_is_not_an_error() {
    let event = decode_event(r#"{"type":"read_receipt","data":{"x":1}}"#).expect("decode");
    assert_eq!(event, InboundEvent::Unknown("read_receipt".to_owned()));
    assert_eq!(event.kind(), "read_receipt");
}

#[test]
fn malformed_payload_reports_kind() {
    let err = decode_event(r#"{"type":"typing","data":{"user_id":5}}"#).expect_err("missing is_typing");
    assert!(matches!(err, CodecError::Payload { kind: TYPING, .. }));

    let err = decode_event(r#"{"type":"new_message"}"#).expect_err("missing data");
    assert!(matches!(err, CodecError::Payload { kind: NEW_MESSAGE, .. }));
}

#[test]
fn invalid_envelope_is_rejected() {
    assert!(matches!(decode_event("not json"), Err(CodecError::Envelope(_))));
    assert!(matches!(decode_event(r#"{"data":{}}"#), Err(CodecError::Envelope(_))));
    assert!(matches!(decode_event(r#"[1,2]"#), Err(CodecError::Envelope(_))));
}

#[test]
fn encode_chat_message_matches_server_shape() {
    let event = OutboundEvent::ChatMessage { receiver_id: UserId::from(42), message: "hello".to_owned() };
    let value: Value = serde_json::from_str(&encode_event(&event)).expect("json");
    assert_eq!(value, json!({"type": "chat_message", "data": {"receiver_id": "42", "message": "hello"}}));
    assert_eq!(event.kind(), CHAT_MESSAGE);
}

#[test]
fn encode_typing_matches_server_shape() {
    let event = OutboundEvent::Typing { receiver_id: UserId::from("8"), is_typing: false };
    let value: Value = serde_json::from_str(&encode_event(&event)).expect("json");
    assert_eq!(value, json!({"type": "typing", "data": {"receiver_id": "8", "is_typing": false}}));
}
