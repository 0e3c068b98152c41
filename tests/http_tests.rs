// Probe and status resolver against a local one-shot HTTP responder.

use std::time::Duration;

use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
    sync::mpsc,
};
use twitcast_rec::{
    probe::{Connectivity, ConnectivityProbe},
    session::RecordingTarget,
    status::{Availability, NotLiveReason, StatusError, StatusResolver, StreamEndpoint},
    util::{HttpClient, HttpError},
};

/// Serve `status`/`body` to every connection. Returns the base URL and a
/// receiver yielding the head of each request.
async fn respond_with(
    status: &'static str,
    body: &'static str,
) -> (String, mpsc::UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((mut sock, _)) = listener.accept().await {
            let mut head = Vec::new();
            let mut buf = [0u8; 1024];
            while !head.windows(4).any(|w| w == b"\r\n\r\n") {
                match sock.read(&mut buf).await {
                    Ok(0) | Err(_) => break,
                    Ok(n) => head.extend_from_slice(&buf[..n]),
                }
            }
            let _ = tx.send(String::from_utf8_lossy(&head).into_owned());

            let resp = format!(
                "HTTP/1.1 {}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            let _ = sock.write_all(resp.as_bytes()).await;
            let _ = sock.shutdown().await;
        }
    });

    (format!("http://{}", addr), rx)
}

fn client() -> HttpClient {
    HttpClient::new(Duration::from_secs(5)).expect("Could not create HttpClient")
}

fn target() -> RecordingTarget {
    RecordingTarget::new("someone").unwrap()
}

#[tokio::test]
async fn probe_reachable_on_ok() {
    let (url, mut requests) = respond_with("200 OK", "").await;
    let client = client();

    assert_eq!(
        ConnectivityProbe::new(&client, url).check().await,
        Connectivity::Reachable
    );

    let head = requests.recv().await.unwrap().to_lowercase();
    assert!(head.contains("user-agent: mozilla/5.0"), "{}", head);
}

#[tokio::test]
async fn probe_unreachable_on_error_status() {
    let (url, _requests) = respond_with("503 Service Unavailable", "").await;
    let client = client();

    assert_eq!(
        ConnectivityProbe::new(&client, url).check().await,
        Connectivity::Unreachable
    );
}

#[tokio::test]
async fn probe_unreachable_when_refused() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);
    let client = client();

    assert_eq!(
        ConnectivityProbe::new(&client, url).check().await,
        Connectivity::Unreachable
    );
}

#[tokio::test]
async fn resolver_live() {
    let (url, mut requests) = respond_with(
        "200 OK",
        r#"{"movie":{"id":"abc","live":true},"fmp4":{"host":"h1","proto":"wss","source":true},"live":true}"#,
    )
    .await;
    let client = client();
    let resolver = StatusResolver::new(&client, url);

    let availability = resolver.resolve(&target()).await.unwrap();
    assert_eq!(
        availability,
        Availability::Live(StreamEndpoint::new("h1", "abc").unwrap())
    );

    let head = requests.recv().await.unwrap();
    assert!(
        head.starts_with("GET /streamserver.php?target=someone&mode=client "),
        "{}",
        head
    );
}

#[tokio::test]
async fn resolver_not_live() {
    let (url, _requests) = respond_with("200 OK", r#"{"movie":{"id":123,"live":false},"live":false}"#).await;
    let client = client();
    let resolver = StatusResolver::new(&client, url);

    assert_eq!(
        resolver.resolve(&target()).await.unwrap(),
        Availability::NotLive(NotLiveReason::Offline)
    );
}

#[tokio::test]
async fn resolver_reports_error_status() {
    let (url, _requests) = respond_with(
        "500 Internal Server Error",
        r#"{"live":true,"fmp4":{"host":"h1"},"movie":{"id":"abc"}}"#,
    )
    .await;
    let client = client();
    let resolver = StatusResolver::new(&client, url);

    match resolver.resolve(&target()).await {
        Err(StatusError::Fetch(HttpError::Status(status))) => assert_eq!(status.as_u16(), 500),
        other => panic!("unexpected result {:?}", other),
    }
}
