use std::time::{Duration, Instant};

use oai_pmh_client::{
    CancellationToken, ClientConfig, OaiPmhClient, OaiPmhError, RequestOptions, Transport,
    TransportError, Verb,
};
use reqwest::header::{HeaderMap, HeaderValue};
use wiremock::matchers::{body_string, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const IDENTIFY: &str = include_str!("fixtures/identify.xml");

fn config(server: &MockServer) -> oai_pmh_client::ClientConfigBuilder {
    ClientConfig::builder(format!("{}/oai", server.uri())).retry_interval(Duration::ZERO)
}

fn transport(server: &MockServer, retry_count: u32) -> Transport {
    let config = config(server).retry_count(retry_count).build().unwrap();
    Transport::new(&config).unwrap()
}

#[tokio::test]
async fn test_retries_server_errors_exactly_retry_count_times() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .expect(4)
        .mount(&server)
        .await;

    let err = transport(&server, 3)
        .send(Verb::Identify, &[], &RequestOptions::default())
        .await
        .unwrap_err();

    assert!(err.is_retryable());
    match err {
        OaiPmhError::Transport(TransportError::UnexpectedStatus { status, body, .. }) => {
            assert_eq!(status, 503);
            assert_eq!(body, "maintenance");
        }
        other => panic!("expected unexpected status, got {other:?}"),
    }
}

#[tokio::test]
async fn test_retry_succeeds_after_transient_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(2)
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(IDENTIFY))
        .expect(1)
        .mount(&server)
        .await;

    let body = transport(&server, 3)
        .send(Verb::Identify, &[], &RequestOptions::default())
        .await
        .unwrap();
    assert_eq!(body, IDENTIFY);
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("no such endpoint"))
        .expect(1)
        .mount(&server)
        .await;

    let err = transport(&server, 3)
        .send(Verb::Identify, &[], &RequestOptions::default())
        .await
        .unwrap_err();

    assert!(!err.is_retryable());
    assert!(matches!(
        err,
        OaiPmhError::Transport(TransportError::UnexpectedStatus { status: 404, .. })
    ));
    assert!(err.to_string().contains("response from server: no such endpoint"));
}

#[tokio::test]
async fn test_per_call_retry_override() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(502))
        .expect(1)
        .mount(&server)
        .await;

    let options = RequestOptions {
        retry_count: Some(0),
        ..RequestOptions::default()
    };
    let err = transport(&server, 3)
        .send(Verb::Identify, &[], &options)
        .await
        .unwrap_err();
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_timeout_is_distinct_transport_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(IDENTIFY)
                .set_delay(Duration::from_secs(5)),
        )
        .mount(&server)
        .await;

    let config = config(&server)
        .timeout(Duration::from_millis(100))
        .build()
        .unwrap();
    let err = Transport::new(&config)
        .unwrap()
        .send(Verb::Identify, &[], &RequestOptions::default())
        .await
        .unwrap_err();

    match err {
        OaiPmhError::Transport(TransportError::Timeout { timeout, .. }) => {
            assert_eq!(timeout, Duration::from_millis(100));
        }
        other => panic!("expected timeout, got {other:?}"),
    }
}

#[tokio::test]
async fn test_huge_timeout_does_not_overflow() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string(IDENTIFY))
        .expect(1)
        .mount(&server)
        .await;

    let config = config(&server).timeout(Duration::MAX).build().unwrap();
    let body = Transport::new(&config)
        .unwrap()
        .send(Verb::Identify, &[], &RequestOptions::default())
        .await
        .unwrap();
    assert_eq!(body, IDENTIFY);
}

#[tokio::test]
async fn test_cancellation_during_retry_wait() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let config = config(&server)
        .retry_interval(Duration::from_secs(60))
        .build()
        .unwrap();
    let transport = Transport::new(&config).unwrap();

    let token = CancellationToken::new();
    tokio::spawn({
        let token = token.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            token.cancel();
        }
    });

    let started = Instant::now();
    let err = transport
        .send(Verb::Identify, &[], &RequestOptions::with_signal(token))
        .await
        .unwrap_err();

    assert!(err.is_aborted(), "expected aborted, got {err:?}");
    assert!(started.elapsed() < Duration::from_secs(10));
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_cancellation_of_in_flight_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(IDENTIFY)
                .set_delay(Duration::from_secs(30)),
        )
        .mount(&server)
        .await;

    // the caller's cancellation must win over the configured timeout
    let config = config(&server)
        .timeout(Duration::from_secs(20))
        .build()
        .unwrap();
    let client = OaiPmhClient::new(&config).unwrap();

    let token = CancellationToken::new();
    tokio::spawn({
        let token = token.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            token.cancel();
        }
    });

    let err = client
        .identify(&RequestOptions::with_signal(token))
        .await
        .unwrap_err();
    assert!(matches!(err, OaiPmhError::Aborted));
}

#[tokio::test]
async fn test_post_mode_sends_form_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/oai"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string(
            "verb=GetRecord&identifier=oai%3Arepository.example.org%3A1&metadataPrefix=oai_dc",
        ))
        .respond_with(
            ResponseTemplate::new(200).set_body_string(include_str!("fixtures/get_record.xml")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let config = config(&server).use_post(true).build().unwrap();
    let record = OaiPmhClient::new(&config)
        .unwrap()
        .get_record(
            "oai:repository.example.org:1",
            "oai_dc",
            &RequestOptions::default(),
        )
        .await
        .unwrap();
    assert_eq!(record.header.datestamp, "2024-01-05");
}

#[tokio::test]
async fn test_sends_user_agent_and_extra_headers() {
    let server = MockServer::start().await;
    Mock::given(query_param("verb", "Identify"))
        .and(header("user-agent", oai_pmh_client::config::USER_AGENT))
        .and(header("authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_string(IDENTIFY))
        .expect(1)
        .mount(&server)
        .await;

    let mut headers = HeaderMap::new();
    headers.insert("authorization", HeaderValue::from_static("Bearer secret"));
    let config = config(&server).extra_headers(headers).build().unwrap();

    let identify = OaiPmhClient::new(&config)
        .unwrap()
        .identify(&RequestOptions::default())
        .await
        .unwrap();
    assert_eq!(identify.repository_name, "Example Repository");
}

#[tokio::test]
async fn test_connection_failure_wraps_cause() {
    // nothing listens on the port once the listener is dropped
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let config = ClientConfig::builder(format!("http://127.0.0.1:{port}/oai"))
        .retry_count(3)
        .build()
        .unwrap();

    let err = Transport::new(&config)
        .unwrap()
        .send(Verb::Identify, &[], &RequestOptions::default())
        .await
        .unwrap_err();

    assert!(!err.is_retryable());
    match err {
        OaiPmhError::Transport(e @ TransportError::Request { .. }) => {
            assert!(std::error::Error::source(&e).is_some());
        }
        other => panic!("expected request error, got {other:?}"),
    }
}
