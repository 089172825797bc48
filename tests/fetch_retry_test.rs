//! Retry and backoff behavior of the price API client against live
//! HTTP.
//!
//! Sequenced scenarios (different response per attempt) run against a
//! minimal scripted TCP fixture; single-behavior scenarios use
//! mockito. Sleeps are recorded, not slept, so the backoff schedule is
//! asserted exactly.

mod common;

use common::*;

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};

use auag::adapters::metals_api_adapter::MetalsApiSource;
use auag::domain::error::AuagError;
use auag::domain::throttle::RateLimitContext;
use auag::ports::price_source_port::PriceSource;

const OK_BODY: &str = r#"{"success":true,"rates":{"2020-01-01":{"USDXAU":1520.0,"USDXAG":17.8},"2020-01-02":{"USDXAU":1525.0,"USDXAG":17.9}}}"#;

fn http_response(status_line: &str, headers: &[(&str, &str)], body: &str) -> String {
    let mut response = format!("HTTP/1.1 {status_line}\r\n");
    for (name, value) in headers {
        response.push_str(&format!("{name}: {value}\r\n"));
    }
    response.push_str(&format!(
        "content-length: {}\r\nconnection: close\r\n\r\n{body}",
        body.len()
    ));
    response
}

/// Serve one canned response per connection, in order.
async fn serve_script(responses: Vec<String>) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        for response in responses {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let mut seen = Vec::new();
            let mut buf = [0u8; 1024];
            loop {
                match socket.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        seen.extend_from_slice(&buf[..n]);
                        if seen.windows(4).any(|w| w == b"\r\n\r\n") {
                            break;
                        }
                    }
                }
            }
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
    });

    format!("http://{addr}")
}

fn source_for(base_url: String) -> (MetalsApiSource, std::sync::Arc<std::sync::Mutex<Vec<Duration>>>) {
    let (sleeper, delays) = RecordingSleeper::new();
    (
        MetalsApiSource::new(base_url, "test-key".into(), Box::new(sleeper)),
        delays,
    )
}

#[tokio::test]
async fn recovers_after_two_rate_limited_responses() {
    let base_url = serve_script(vec![
        http_response("429 Too Many Requests", &[], ""),
        http_response("429 Too Many Requests", &[], ""),
        http_response("200 OK", &[("content-type", "application/json")], OK_BODY),
    ])
    .await;

    let (source, delays) = source_for(base_url);
    let throttle = RateLimitContext::new();
    let records = source
        .fetch_range(date(2020, 1, 1), date(2020, 1, 2), &throttle)
        .await
        .unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].gold, 1520.0);
    // base delay, then doubled
    assert_eq!(
        *delays.lock().unwrap(),
        vec![Duration::from_millis(700), Duration::from_millis(1400)]
    );
    assert_eq!(throttle.current_delay(), Duration::from_millis(1400));
}

#[tokio::test]
async fn server_retry_after_takes_precedence_when_larger() {
    let base_url = serve_script(vec![
        http_response("429 Too Many Requests", &[("retry-after", "3")], ""),
        http_response("200 OK", &[("content-type", "application/json")], OK_BODY),
    ])
    .await;

    let (source, delays) = source_for(base_url);
    let throttle = RateLimitContext::new();
    source
        .fetch_range(date(2020, 1, 1), date(2020, 1, 2), &throttle)
        .await
        .unwrap();

    assert_eq!(*delays.lock().unwrap(), vec![Duration::from_secs(3)]);
    assert_eq!(throttle.current_delay(), Duration::from_secs(3));
}

#[tokio::test]
async fn server_errors_also_back_off() {
    let base_url = serve_script(vec![
        http_response("503 Service Unavailable", &[], "maintenance"),
        http_response("200 OK", &[("content-type", "application/json")], OK_BODY),
    ])
    .await;

    let (source, delays) = source_for(base_url);
    let throttle = RateLimitContext::new();
    let records = source
        .fetch_range(date(2020, 1, 1), date(2020, 1, 2), &throttle)
        .await
        .unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(*delays.lock().unwrap(), vec![Duration::from_millis(700)]);
}

#[tokio::test]
async fn rate_limit_reported_inside_ok_body_retries() {
    let base_url = serve_script(vec![
        http_response(
            "200 OK",
            &[("content-type", "application/json")],
            r#"{"success":false,"error":{"code":104,"info":"rate limit reached"}}"#,
        ),
        http_response("200 OK", &[("content-type", "application/json")], OK_BODY),
    ])
    .await;

    let (source, delays) = source_for(base_url);
    let throttle = RateLimitContext::new();
    let records = source
        .fetch_range(date(2020, 1, 1), date(2020, 1, 2), &throttle)
        .await
        .unwrap();

    assert_eq!(records.len(), 2);
    assert_eq!(*delays.lock().unwrap(), vec![Duration::from_millis(700)]);
}

#[tokio::test]
async fn other_client_error_fails_immediately_with_body() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/timeframe")
        .match_query(mockito::Matcher::Any)
        .with_status(404)
        .with_body("no such endpoint")
        .expect(1)
        .create_async()
        .await;

    let (source, delays) = source_for(server.url());
    let throttle = RateLimitContext::new();
    let err = source
        .fetch_range(date(2020, 1, 1), date(2020, 1, 2), &throttle)
        .await
        .unwrap_err();

    mock.assert_async().await;
    assert!(delays.lock().unwrap().is_empty());
    match err {
        AuagError::Fetch { reason } => {
            assert!(reason.contains("404"));
            assert!(reason.contains("no such endpoint"));
        }
        other => panic!("expected fetch error, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_body_fails_immediately() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/timeframe")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_body("<html>definitely not json</html>")
        .expect(1)
        .create_async()
        .await;

    let (source, delays) = source_for(server.url());
    let throttle = RateLimitContext::new();
    let err = source
        .fetch_range(date(2020, 1, 1), date(2020, 1, 2), &throttle)
        .await
        .unwrap_err();

    mock.assert_async().await;
    assert!(delays.lock().unwrap().is_empty());
    assert!(matches!(err, AuagError::Fetch { .. }));
    assert!(err.to_string().contains("malformed"));
}

#[tokio::test]
async fn exhausting_retries_is_a_terminal_fetch_error() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/timeframe")
        .match_query(mockito::Matcher::Any)
        .with_status(429)
        .expect(5)
        .create_async()
        .await;

    let (source, delays) = source_for(server.url());
    let throttle = RateLimitContext::new();
    let err = source
        .fetch_range(date(2020, 1, 1), date(2020, 1, 2), &throttle)
        .await
        .unwrap_err();

    mock.assert_async().await;
    assert!(err.to_string().contains("after 5 attempts"));

    // four sleeps between five attempts, doubling each time
    assert_eq!(
        *delays.lock().unwrap(),
        vec![
            Duration::from_millis(700),
            Duration::from_millis(1400),
            Duration::from_millis(2800),
            Duration::from_millis(5600),
        ]
    );
    // the throttle ratchet is clamped below the largest backoff
    assert_eq!(throttle.current_delay(), Duration::from_millis(5000));
}
