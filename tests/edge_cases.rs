#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
//! Comprehensive edge-case tests for production-grade reliability
//! Tests boundary conditions, malformed input, codec limits, and routing corners

use ami_client::core::codec::MAX_LINE_LENGTH;
use ami_client::protocol::correlation::{ActionId, CorrelationEngine};
use ami_client::service::pipeline::{BlockAssembler, BANNER_TEXT};
use ami_client::utils::timeout::with_timeout_error;
use ami_client::{AmiError, LineCodec, Message, RecordMap};
use bytes::BytesMut;
use std::time::Duration;
use tokio_util::codec::Decoder;

// ============================================================================
// MESSAGE DECODE EDGE CASES
// ============================================================================

#[test]
fn test_decode_empty_buffer() {
    let result = Message::from_bytes(b"");
    assert!(
        matches!(result, Err(AmiError::IncompleteMessage { lines: 1 })),
        "Empty input never terminates its first line"
    );
}

#[test]
fn test_decode_missing_block_terminator() {
    let result = Message::from_bytes(b"Response: Success\r\nActionID: 7\r\n");
    assert!(
        matches!(result, Err(AmiError::IncompleteMessage { lines: 3 })),
        "The blank closing line itself is line 3"
    );
}

#[test]
fn test_decode_line_without_separator() {
    let result = Message::from_bytes(b"Response: Success\r\njust words\r\n\r\n");
    assert!(matches!(result, Err(AmiError::MalformedField { line: 2 })));
}

#[test]
fn test_decode_empty_key_rejected() {
    let result = Message::from_bytes(b": orphaned value\r\n\r\n");
    assert!(matches!(result, Err(AmiError::MalformedField { line: 1 })));

    let result = Message::from_bytes(b"   : padded orphan\r\n\r\n");
    assert!(matches!(result, Err(AmiError::MalformedField { line: 1 })));
}

#[test]
fn test_decode_value_keeps_later_colons() {
    let msg = Message::from_bytes(b"Variable: key=a:b:c\r\n\r\n").unwrap();
    assert_eq!(msg.get("Variable"), Some("key=a:b:c"));
}

#[test]
fn test_decode_empty_value_allowed() {
    let msg = Message::from_bytes(b"Challenge:\r\n\r\n").unwrap();
    assert_eq!(msg.get("Challenge"), Some(""));
}

#[test]
fn test_decode_stops_at_first_blank_line() {
    let msg = Message::from_bytes(b"Event: Hangup\r\n\r\nEvent: Ignored\r\n\r\n").unwrap();
    assert_eq!(msg.len(), 1);
    assert_eq!(msg.get("Event"), Some("Hangup"));
}

#[test]
fn test_decode_lone_terminator_is_an_empty_message() {
    let msg = Message::from_bytes(b"\r\n").unwrap();
    assert!(msg.is_empty());
    assert!(!msg.is_success());
}

#[test]
fn test_decode_folds_repeated_keys() {
    let msg = Message::from_bytes(
        b"Event: VarSet\r\nVariable: a=1\r\nVARIABLE: b=2\r\nvariable: c=3\r\n\r\n",
    )
    .unwrap();
    assert_eq!(msg.len(), 2);
    assert_eq!(msg.get("Variable"), Some("a=1\r\nb=2\r\nc=3"));
}

// ============================================================================
// MESSAGE FIELD SEMANTICS
// ============================================================================

#[test]
fn test_field_whitespace_trimming() {
    let mut msg = Message::new();
    msg.add("  Channel  ", "  SIP/100  ");
    assert_eq!(msg.get("Channel"), Some("SIP/100"));
    assert_eq!(msg.get("  Channel"), Some("SIP/100"));
}

#[test]
fn test_empty_key_is_a_no_op() {
    let mut msg = Message::new();
    msg.add("", "value");
    msg.add("   \t ", "value");
    assert!(msg.is_empty());
}

#[test]
fn test_action_id_moves_to_the_end_on_replacement() {
    let mut msg = Message::new();
    msg.add("ActionID", "first");
    msg.add("Action", "Ping");
    msg.add("ACTIONID", "second");

    let keys: Vec<_> = msg.fields().map(|(k, _)| k).collect();
    assert_eq!(keys, vec!["Action", "ACTIONID"]);
    assert_eq!(msg.get("actionid"), Some("second"));
}

#[test]
fn test_generated_action_ids_are_unique() {
    let a = Message::new().field("Action", "Ping");
    let b = Message::new().field("Action", "Ping");
    assert_ne!(a.get("ActionID"), b.get("ActionID"));
}

#[test]
fn test_is_success_needs_both_key_and_value() {
    assert!(!Message::new().field("Response", "Failure").is_success());
    assert!(!Message::new().field("Outcome", "Success").is_success());
    assert!(Message::new()
        .field("Event", "X")
        .field("response", "success")
        .is_success());
}

// ============================================================================
// LINE CODEC EDGE CASES
// ============================================================================

#[test]
fn test_codec_byte_at_a_time_delivery() {
    let mut codec = LineCodec::new();
    let mut buf = BytesMut::new();
    let wire = b"Response: Success\r\n";

    let mut decoded = None;
    for &byte in wire.iter() {
        buf.extend_from_slice(&[byte]);
        if let Some(line) = codec.decode(&mut buf).unwrap() {
            decoded = Some(line);
        }
    }
    assert_eq!(decoded.as_deref(), Some("Response: Success"));
}

#[test]
fn test_codec_cr_without_lf_is_content() {
    let mut codec = LineCodec::new();
    let mut buf = BytesMut::from(&b"a\rb\r\n"[..]);
    assert_eq!(codec.decode(&mut buf).unwrap().as_deref(), Some("a\rb"));
}

#[test]
fn test_codec_line_at_the_cap_passes() {
    let mut codec = LineCodec::new();
    let mut wire = vec![b'k'; MAX_LINE_LENGTH - 2];
    wire.extend_from_slice(b"\r\n");
    let mut buf = BytesMut::from(wire.as_slice());
    let line = codec.decode(&mut buf).unwrap().unwrap();
    assert_eq!(line.len(), MAX_LINE_LENGTH - 2);
}

#[test]
fn test_codec_unterminated_line_over_the_cap_fails() {
    let mut codec = LineCodec::new();
    let mut buf = BytesMut::from(vec![b'k'; MAX_LINE_LENGTH + 16].as_slice());
    assert!(matches!(
        codec.decode(&mut buf),
        Err(AmiError::OversizedLine(_))
    ));
}

#[test]
fn test_codec_survives_invalid_utf8() {
    let mut codec = LineCodec::new();
    let mut buf = BytesMut::from(&b"Key: \xf0\x28\x8c\x28\r\n"[..]);
    let line = codec.decode(&mut buf).unwrap().unwrap();
    assert!(line.starts_with("Key: "));
}

// ============================================================================
// BLOCK ASSEMBLY EDGE CASES
// ============================================================================

#[test]
fn test_assembler_banner_with_version_suffix() {
    let mut assembler = BlockAssembler::new();
    assert_eq!(assembler.push_line("Asterisk Call Manager/1.1"), None);
    assert_eq!(assembler.push_line(BANNER_TEXT), None);
    // the discarded banner leaves no partial block behind
    assert_eq!(assembler.push_line(""), None);
}

#[test]
fn test_assembler_consecutive_blocks() {
    let mut assembler = BlockAssembler::new();
    assembler.push_line("A: 1");
    let first = assembler.push_line("").unwrap();
    assembler.push_line("B: 2");
    let second = assembler.push_line("").unwrap();

    assert_eq!(first, "A: 1\r\n\r\n");
    assert_eq!(second, "B: 2\r\n\r\n");
}

#[test]
fn test_assembler_output_is_decodable() {
    let mut assembler = BlockAssembler::new();
    assembler.push_line("Response: Success");
    assembler.push_line("ActionID: 9");
    let block = assembler.push_line("").unwrap();

    let msg = Message::from_bytes(block.as_bytes()).unwrap();
    assert!(msg.is_success());
    assert_eq!(msg.get("ActionID"), Some("9"));
}

// ============================================================================
// CORRELATION ROUTING CORNERS
// ============================================================================

#[tokio::test]
async fn test_route_without_action_id_is_inert() {
    let engine = CorrelationEngine::new();
    let mut rx = engine.register(&ActionId::new("open")).unwrap();

    engine
        .route(&Message::new().field("Response", "Success"))
        .unwrap();
    assert!(rx.try_recv().is_err(), "No token, no resolution");
}

#[tokio::test]
async fn test_route_unknown_token_is_inert() {
    let engine = CorrelationEngine::new();
    engine
        .route(
            &Message::new()
                .field("Response", "Success")
                .field("ActionID", "nobody-asked"),
        )
        .unwrap();
    // and the token remains available
    assert!(engine.register(&ActionId::new("nobody-asked")).is_ok());
}

#[tokio::test]
async fn test_event_head_does_not_claim_a_pending_token() {
    let engine = CorrelationEngine::new();
    let mut rx = engine.register(&ActionId::new("orig-1")).unwrap();

    // an event carrying the token, before the response head
    engine
        .route(
            &Message::new()
                .field("Event", "OriginateResponse")
                .field("ActionID", "orig-1"),
        )
        .unwrap();
    assert!(rx.try_recv().is_err());

    engine
        .route(
            &Message::new()
                .field("Response", "Success")
                .field("ActionID", "orig-1"),
        )
        .unwrap();
    assert!(rx.await.unwrap().unwrap().is_success());
}

#[tokio::test]
async fn test_aggregation_head_fields_survive_unchanged() {
    let engine = CorrelationEngine::new();
    let rx = engine.register(&ActionId::new("q")).unwrap();

    engine
        .route(
            &Message::new()
                .field("Response", "Success")
                .field("EventList", "start")
                .field("Message", "Queue status will follow")
                .field("ActionID", "q"),
        )
        .unwrap();
    engine
        .route(
            &Message::new()
                .field("Event", "QueueParams")
                .field("Queue", "support")
                .field("ActionID", "q"),
        )
        .unwrap();
    engine
        .route(
            &Message::new()
                .field("Event", "QueueStatusComplete")
                .field("ActionID", "q"),
        )
        .unwrap();

    let head = rx.await.unwrap().unwrap();
    assert_eq!(head.get("Message"), Some("Queue status will follow"));
    assert_eq!(head.get("EventList"), Some("start"));
    assert_eq!(head.responses().len(), 1);
    assert_eq!(head.responses()[0].get("Queue"), Some("support"));
}

// ============================================================================
// RECORD MAPPING EDGE CASES
// ============================================================================

#[derive(Default)]
struct CallRecord {
    channel: String,
    duration: u32,
    billable: bool,
}

#[test]
fn test_record_map_empty_mapping() {
    let map: RecordMap<CallRecord> = RecordMap::new();
    assert!(map.is_empty());
    let record = map.to_record(&Message::new().field("Channel", "SIP/1"));
    assert_eq!(record.channel, "");
}

#[test]
fn test_record_map_partial_and_bad_values() {
    let map = RecordMap::new()
        .field("Channel", |r: &mut CallRecord, v| r.channel = v)
        .field("Duration", |r: &mut CallRecord, v| r.duration = v)
        .field("Billable", |r: &mut CallRecord, v| r.billable = v);

    let msg = Message::new()
        .field("Channel", "SIP/100-0001")
        .field("Duration", "three minutes")
        .field("Billable", "true");
    let record = map.to_record(&msg);

    assert_eq!(record.channel, "SIP/100-0001");
    assert_eq!(record.duration, 0, "Unparseable value keeps the default");
    assert!(record.billable);
}

// ============================================================================
// TIMEOUT HELPER
// ============================================================================

#[tokio::test]
async fn test_timeout_elapses_to_typed_error() {
    let never = async {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(())
    };
    let result = with_timeout_error(never, Duration::from_millis(10)).await;
    assert!(matches!(result, Err(AmiError::Timeout)));
}

#[tokio::test]
async fn test_timeout_passes_inner_results_through() {
    let quick = async { Ok(7u8) };
    assert_eq!(
        with_timeout_error(quick, Duration::from_secs(1)).await.unwrap(),
        7
    );

    let failing = async { Err::<(), _>(AmiError::NotConnected) };
    let result = with_timeout_error(failing, Duration::from_secs(1)).await;
    assert!(matches!(result, Err(AmiError::NotConnected)));
}
