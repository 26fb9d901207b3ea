// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wire format tests: length-prefix framing and JSON encoding.

use super::*;
use std::io::Cursor;

const TIMEOUT: Duration = Duration::from_secs(1);

#[test]
fn encode_returns_json_without_length_prefix() {
    let encoded = encode(&Response::Pong).unwrap();
    assert_eq!(std::str::from_utf8(&encoded).unwrap(), r#"{"type":"Pong"}"#);
}

#[tokio::test]
async fn write_message_adds_big_endian_length_prefix() {
    let mut buffer = Vec::new();
    write_message(&mut buffer, b"test data").await.unwrap();

    assert_eq!(&buffer[..4], &9u32.to_be_bytes());
    assert_eq!(&buffer[4..], b"test data");
}

#[tokio::test]
async fn request_survives_the_wire() {
    let request = Request::submit("run", Some("agt-a"), serde_json::json!({ "n": 1 }));
    let mut buffer = Vec::new();
    write_request(&mut buffer, &request, TIMEOUT).await.unwrap();

    let read = read_request(&mut Cursor::new(buffer), TIMEOUT).await.unwrap();
    assert_eq!(read, request);
}

#[tokio::test]
async fn empty_stream_is_connection_closed() {
    let err = read_message(&mut Cursor::new(Vec::new())).await.unwrap_err();
    assert!(matches!(err, ProtocolError::ConnectionClosed));
}

#[tokio::test]
async fn oversized_prefix_is_rejected_before_reading_the_body() {
    let mut buffer = ((MAX_MESSAGE_SIZE + 1) as u32).to_be_bytes().to_vec();
    buffer.extend_from_slice(b"{}");

    let err = read_message(&mut Cursor::new(buffer)).await.unwrap_err();
    assert!(matches!(err, ProtocolError::MessageTooLarge { size, .. } if size == MAX_MESSAGE_SIZE + 1));
}

#[tokio::test]
async fn truncated_body_is_an_io_error() {
    let mut buffer = 10u32.to_be_bytes().to_vec();
    buffer.extend_from_slice(b"{}");

    let err = read_message(&mut Cursor::new(buffer)).await.unwrap_err();
    assert!(matches!(err, ProtocolError::Io(_)));
}

#[tokio::test]
async fn malformed_json_is_a_json_error() {
    let mut buffer = Vec::new();
    write_message(&mut buffer, b"not json").await.unwrap();

    let err = read_request(&mut Cursor::new(buffer), TIMEOUT).await.unwrap_err();
    assert!(matches!(err, ProtocolError::Json(_)));
}

#[tokio::test]
async fn silent_peer_times_out() {
    let (mut client, _server) = tokio::io::duplex(64);
    let err = read_request(&mut client, Duration::from_millis(20)).await.unwrap_err();
    assert!(matches!(err, ProtocolError::Timeout));
}
