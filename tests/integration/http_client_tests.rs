use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use sumi_flow::client::{HttpClient, OutgoingRequest, RetryPolicy, Transport, TransportError};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn create_client(max_retries: u32) -> HttpClient {
    HttpClient::new(
        RetryPolicy {
            max_retries,
            base_delay: Duration::from_millis(5),
        },
        Duration::from_secs(5),
    )
    .expect("Failed to build client")
}

fn request_for(base: &str, tag: u64) -> OutgoingRequest {
    OutgoingRequest::new(base, tag, "TestAgent/9.9", Duration::from_secs(5), false)
}

#[tokio::test]
async fn test_success_with_tag_and_user_agent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .and(query_param("num", "7"))
        .and(header("user-agent", "TestAgent/9.9"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = create_client(3);
    let status = client.get(&request_for(&mock_server.uri(), 7)).await;

    assert_eq!(status, Ok(200));
}

#[tokio::test]
async fn test_transient_server_errors_are_retried() {
    let mock_server = MockServer::start().await;

    // Mounted first, so it answers until its budget is spent
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let client = create_client(3);
    let status = client.get(&request_for(&mock_server.uri(), 0)).await;

    assert_eq!(status, Ok(200));
    let received = mock_server.received_requests().await.unwrap();
    assert_eq!(received.len(), 3);
}

#[tokio::test]
async fn test_persistent_rate_limit_surfaces_after_retries() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429))
        .mount(&mock_server)
        .await;

    let client = create_client(2);
    let status = client.get(&request_for(&mock_server.uri(), 0)).await;

    assert_eq!(status, Ok(429));
    let received = mock_server.received_requests().await.unwrap();
    assert_eq!(received.len(), 3);
}

#[tokio::test]
async fn test_non_transient_status_is_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;

    let client = create_client(3);
    let status = client.get(&request_for(&mock_server.uri(), 0)).await;

    assert_eq!(status, Ok(404));
    let received = mock_server.received_requests().await.unwrap();
    assert_eq!(received.len(), 1);
}

#[tokio::test]
async fn test_slow_response_is_read_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&mock_server)
        .await;

    let client = create_client(0);
    let mut request = request_for(&mock_server.uri(), 0);
    request.timeout = Duration::from_millis(200);

    let result = client.get(&request).await;

    assert!(
        matches!(result, Err(TransportError::ReadTimeout(_))),
        "unexpected result: {:?}",
        result
    );
}

/// Serves one response whose body stops after a few bytes, then holds the connection
async fn spawn_stalling_server() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = [0u8; 1024];
        let _ = socket.read(&mut buf).await;
        socket
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 1000\r\n\r\npartial")
            .await
            .unwrap();
        socket.flush().await.unwrap();
        tokio::time::sleep(Duration::from_secs(10)).await;
    });

    format!("http://{}", addr)
}

#[tokio::test]
async fn test_stalled_body_is_read_timeout() {
    let base = spawn_stalling_server().await;

    let client = create_client(0);
    let mut request = request_for(&base, 0);
    request.timeout = Duration::from_millis(300);

    let result = client.get(&request).await;

    assert!(
        matches!(result, Err(TransportError::ReadTimeout(_))),
        "unexpected result: {:?}",
        result
    );
}

#[tokio::test]
async fn test_unresolvable_host_is_name_resolution_failure() {
    let client = create_client(0);
    let result = client
        .get(&request_for("http://sumi-flow-test.invalid", 0))
        .await;

    assert!(
        matches!(result, Err(TransportError::NameResolution(_))),
        "unexpected result: {:?}",
        result
    );
}

#[tokio::test]
async fn test_refused_connection_is_other_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let client = create_client(0);
    let result = client
        .get(&request_for(&format!("http://127.0.0.1:{}", port), 0))
        .await;

    assert!(
        matches!(result, Err(TransportError::Other(_))),
        "unexpected result: {:?}",
        result
    );
}
