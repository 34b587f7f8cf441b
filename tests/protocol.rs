use fleet_monitor::feed::{encode_message, parse_message, request_positions, BatchKind, FeedError, FeedMessage};
use fleet_monitor::tracking::{position, VehicleId, VehicleReport};
use anyhow::Result;

/// initial_state frames parse into a batch with normalized ids
#[test]
fn test_initial_state_batch() -> Result<()> {
    let text = r#"{"type":"initial_state","data":[
        {"id":"1","position":[13.134407425677608,77.56936729614509],"timestamp":"2024-05-01 10:00:00"},
        {"id":2,"position":[13.135633790624643,77.56791730038407]}
    ]}"#;

    match parse_message(text)? {
        FeedMessage::Batch { kind, vehicles } => {
            assert_eq!(kind, BatchKind::InitialState);
            assert_eq!(vehicles.len(), 2);
            assert_eq!(vehicles[0].id, VehicleId::from("1"));
            assert_eq!(vehicles[0].timestamp.as_deref(), Some("2024-05-01 10:00:00"));
            // Integer ids normalize to their decimal text
            assert_eq!(vehicles[1].id, VehicleId::from("2"));
            assert_eq!(vehicles[1].position, position(13.135633790624643, 77.56791730038407));
        }
        other => panic!("expected batch, got {:?}", other),
    }
    Ok(())
}

/// An empty position_update is a valid batch
#[test]
fn test_position_update_batch_may_be_empty() -> Result<()> {
    let message = parse_message(r#"{"type":"position_update","data":[]}"#)?;
    assert_eq!(message, FeedMessage::Batch { kind: BatchKind::PositionUpdate, vehicles: vec![] });
    Ok(())
}

/// A bare id/position object is a single update
#[test]
fn test_single_update() -> Result<()> {
    let message = parse_message(r#"{"id":"1","position":[13.0001,77.5001],"timestamp":1714557600}"#)?;
    let expected = VehicleReport::new("1", position(13.0001, 77.5001)).with_timestamp("1714557600");
    assert_eq!(message, FeedMessage::Single(expected));
    Ok(())
}

/// Unknown message types are reported, not guessed at
#[test]
fn test_unknown_type_is_reported() {
    let err = parse_message(r#"{"type":"heartbeat"}"#).unwrap_err();
    assert!(matches!(err, FeedError::UnknownType(ref kind) if kind == "heartbeat"));
    assert!(err.is_payload_error());
}

/// Malformed payloads are rejected as payload errors
#[test]
fn test_malformed_payloads_are_rejected() {
    let cases = [
        ("not json", "json"),
        (r#"{"type":"initial_state"}"#, "batch without data"),
        (r#"{"type":"initial_state","data":{"id":"1"}}"#, "batch with object data"),
        (r#"{"position":[1.0,2.0]}"#, "single without id"),
        (r#"{"id":"1"}"#, "single without position"),
        (r#"{"id":"1","position":[1.0]}"#, "short position"),
        (r#"{"id":"1","position":["a","b"]}"#, "non-numeric position"),
        (r#"{"id":"1","position":[95.0,10.0]}"#, "latitude out of range"),
        (r#"{"id":"1","position":[10.0,181.0]}"#, "longitude out of range"),
    ];

    for (text, label) in cases {
        match parse_message(text) {
            Ok(message) => panic!("{} should fail, parsed {:?}", label, message),
            Err(e) => {
                println!("✓ {}: {}", label, e);
                assert!(e.is_payload_error());
            }
        }
    }
}

/// Missing fields are named in the error
#[test]
fn test_missing_fields_are_named() {
    assert!(matches!(parse_message(r#"{"position":[1.0,2.0]}"#), Err(FeedError::MissingField("id"))));
    assert!(matches!(parse_message(r#"{"id":"1"}"#), Err(FeedError::MissingField("position"))));
    assert!(matches!(
        parse_message(r#"{"id":"1","position":[91.0,0.0]}"#),
        Err(FeedError::InvalidPosition(_))
    ));
}

/// One bad entry rejects the whole batch
#[test]
fn test_one_bad_entry_rejects_whole_batch() {
    let text = r#"{"type":"position_update","data":[
        {"id":"1","position":[13.0,77.5]},
        {"id":"2"}
    ]}"#;
    assert!(matches!(parse_message(text), Err(FeedError::MissingField("position"))));
}

/// Encoded messages parse back to the same value
#[test]
fn test_encoded_messages_parse_back() -> Result<()> {
    let batch = FeedMessage::Batch {
        kind: BatchKind::InitialState,
        vehicles: vec![
            VehicleReport::new("1", position(13.134407425677608, 77.56936729614509)).with_timestamp("sim+0"),
            VehicleReport::new("5", position(13.134405252127834, 77.5703374633789)),
        ],
    };
    assert_eq!(parse_message(&encode_message(&batch))?, batch);

    let single = FeedMessage::Single(VehicleReport::new("3", position(13.135252, 77.569146)));
    assert_eq!(parse_message(&encode_message(&single))?, single);
    Ok(())
}

/// The connect request has the expected shape
#[test]
fn test_request_positions_frame() -> Result<()> {
    let value: serde_json::Value = serde_json::from_str(&request_positions())?;
    assert_eq!(value, serde_json::json!({ "type": "request_positions" }));
    Ok(())
}
