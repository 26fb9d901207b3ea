// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

/// Serve one canned HTTP response and hand back the request it received.
async fn serve_once(status: u16, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 16 * 1024];
        let mut request = String::new();
        loop {
            let n = stream.read(&mut buf).await.unwrap();
            request.push_str(&String::from_utf8_lossy(&buf[..n]));
            if n == 0 || request_complete(&request) {
                break;
            }
        }
        let response = format!(
            "HTTP/1.1 {status} X\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
            body.len()
        );
        stream.write_all(response.as_bytes()).await.unwrap();
        request
    });
    (format!("http://{addr}/v1/chat/completions"), handle)
}

fn request_complete(request: &str) -> bool {
    let Some((head, body)) = request.split_once("\r\n\r\n") else { return false };
    let len = head
        .lines()
        .find_map(|l| {
            let (k, v) = l.split_once(':')?;
            k.eq_ignore_ascii_case("content-length").then(|| v.trim().parse::<usize>().ok())?
        })
        .unwrap_or(0);
    body.len() >= len
}

fn adapter(url: String) -> HttpModelAdapter {
    HttpModelAdapter::new(Some(url), Some("sk-test".to_string()), Duration::from_secs(5))
}

#[tokio::test]
async fn http_returns_first_choice_content() {
    let (url, server) =
        serve_once(200, r#"{"choices":[{"message":{"role":"assistant","content":"hi there"}}]}"#)
            .await;
    let text = adapter(url).complete("say hi", "m-1").await.unwrap();
    assert_eq!(text, "hi there");

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /v1/chat/completions"));
    assert!(request.to_ascii_lowercase().contains("authorization: bearer sk-test"));
    assert!(request.contains(r#""model":"m-1""#));
    assert!(request.contains(r#""content":"say hi""#));
}

#[tokio::test]
async fn http_rate_limit_is_transient() {
    let (url, _server) = serve_once(429, r#"{"error":"slow down"}"#).await;
    let err = adapter(url).complete("x", "m").await.unwrap_err();
    assert!(err.is_transient());
}

#[tokio::test]
async fn http_bad_request_is_permanent() {
    let (url, _server) = serve_once(400, r#"{"error":"bad"}"#).await;
    let err = adapter(url).complete("x", "m").await.unwrap_err();
    assert!(!err.is_transient());
}

#[tokio::test]
async fn http_malformed_body_is_permanent() {
    let (url, _server) = serve_once(200, r#"{"nope":true}"#).await;
    let err = adapter(url).complete("x", "m").await.unwrap_err();
    assert!(matches!(err, ModelError::Permanent(msg) if msg.contains("malformed")));
}

#[tokio::test]
async fn http_connection_refused_is_transient() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let err = adapter(format!("http://{addr}/v1/chat/completions"))
        .complete("x", "m")
        .await
        .unwrap_err();
    assert!(err.is_transient(), "{err}");
}

#[tokio::test]
async fn missing_endpoint_is_permanent() {
    let adapter = HttpModelAdapter::new(None, None, Duration::from_secs(1));
    let err = adapter.complete("x", "m").await.unwrap_err();
    assert_eq!(err, ModelError::Permanent("no model endpoint configured".to_string()));
}

#[yare::parameterized(
    timeout      = { 408, true },
    rate_limited = { 429, true },
    server_error = { 500, true },
    bad_gateway  = { 502, true },
    unavailable  = { 503, true },
    bad_request  = { 400, false },
    unauthorized = { 401, false },
    not_found    = { 404, false },
)]
fn status_classification(status: u16, transient: bool) {
    assert_eq!(classify_status(status, "").is_transient(), transient);
}

#[test]
fn status_detail_includes_body() {
    assert_eq!(
        classify_status(503, " overloaded \n"),
        ModelError::Transient("HTTP 503: overloaded".to_string())
    );
}

#[tokio::test]
async fn fake_consumes_script_then_echoes() {
    let model = FakeModel::scripted([
        Err(ModelError::Transient("busy".into())),
        Ok("scripted".to_string()),
    ]);
    assert!(model.complete("a", "m").await.unwrap_err().is_transient());
    assert_eq!(model.complete("b", "m").await.unwrap(), "scripted");
    assert_eq!(model.complete("c", "m").await.unwrap(), "c");
    assert_eq!(model.attempts(), 3);
    assert_eq!(model.calls()[1], ModelCall { text: "b".into(), model: "m".into() });
}
