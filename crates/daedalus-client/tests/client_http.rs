//! Client calls against a local HTTP listener.

use daedalus_client::{ApiClient, ClientError, StaticAuth};
use daedalus_config::ClientSection;
use serde_json::{json, Map, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

/// A request seen by the stub host.
#[derive(Debug)]
struct Seen {
    request_line: String,
    headers: String,
    body: Value,
}

/// Serves `reply` with `status` to every connection and reports what it saw.
async fn stub_host(status: u16, reply: &'static str) -> (String, mpsc::UnboundedReceiver<Seen>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let tx = tx.clone();
            tokio::spawn(async move {
                if let Some(seen) = answer(stream, status, reply).await {
                    let _ = tx.send(seen);
                }
            });
        }
    });

    (format!("http://{addr}"), rx)
}

async fn answer(mut stream: TcpStream, status: u16, reply: &str) -> Option<Seen> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    let header_end = loop {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let length = head
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("content-length")
                .then(|| value.trim().parse::<usize>().ok())
                .flatten()
        })
        .unwrap_or(0);

    while buf.len() < header_end + length {
        let n = stream.read(&mut chunk).await.ok()?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let response = format!(
        "HTTP/1.1 {status} OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{reply}",
        reply.len()
    );
    stream.write_all(response.as_bytes()).await.ok()?;
    stream.shutdown().await.ok()?;

    let (request_line, headers) = head.split_once("\r\n").unwrap_or((head.as_str(), ""));
    Some(Seen {
        request_line: request_line.to_string(),
        headers: headers.to_ascii_lowercase(),
        body: serde_json::from_slice(&buf[header_end..]).unwrap_or(Value::Null),
    })
}

/// An address nothing listens on.
async fn dead_host() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

fn client(hosts: Vec<String>) -> ApiClient {
    ApiClient::new(&ClientSection {
        hosts,
        timeout_ms: 2000,
        ..ClientSection::default()
    })
    .unwrap()
}

#[tokio::test]
async fn test_send_posts_json_with_credentials() {
    let (host, mut seen) = stub_host(200, r#"{"hasErrors":false,"errors":[],"name":"alice"}"#).await;
    let client = client(vec![host]).with_auth(StaticAuth::new().with("apiKey", "secret"));

    let mut params = Map::new();
    params.insert("userId".to_string(), json!(2));
    let reply = client.send("get-user", params).await.unwrap();
    assert_eq!(reply["name"], "alice");

    let request = seen.recv().await.unwrap();
    assert_eq!(request.request_line, "POST /api/get-user HTTP/1.1");
    assert!(request.headers.contains("user-agent: fts-api-client"));
    assert!(request.headers.contains("content-type: application/json; charset=utf-8"));
    assert_eq!(request.body, json!({"userId": 2, "apiKey": "secret"}));
}

#[tokio::test]
async fn test_fails_over_to_next_host() {
    let dead = dead_host().await;
    let (broken, _) = stub_host(503, "{}").await;
    let (live, mut seen) = stub_host(200, r#"{"hasErrors":false,"errors":[],"message":"pong"}"#).await;

    let client = client(vec![dead, broken, live]);
    assert!(client.ping().await);
    assert_eq!(seen.recv().await.unwrap().request_line, "POST /api/ping HTTP/1.1");
}

#[tokio::test]
async fn test_all_hosts_down() {
    let client = client(vec![dead_host().await, dead_host().await]);

    match client.send("ping", Map::new()).await {
        Err(ClientError::Unavailable { attempted, .. }) => assert_eq!(attempted, 2),
        other => panic!("unexpected: {other:?}"),
    }
    assert!(!client.ping().await);
}

#[tokio::test]
async fn test_ping_requires_pong() {
    let (host, _) = stub_host(200, r#"{"hasErrors":false,"errors":[],"message":"ping"}"#).await;
    assert!(!client(vec![host]).ping().await);
}

#[tokio::test]
async fn test_non_json_reply() {
    let (host, _) = stub_host(200, "<html>maintenance</html>").await;
    let err = client(vec![host]).send("ping", Map::new()).await.unwrap_err();
    assert!(matches!(err, ClientError::Json(_)));
}

#[tokio::test]
async fn test_call_decodes_error_envelope() {
    let (host, _) = stub_host(
        200,
        r#"{"hasErrors":true,"errors":[{"message":"Missing userId","code":"ParamNotFound"}]}"#,
    )
    .await;

    let result = client(vec![host])
        .call::<Map<String, Value>>("get-user", Map::new())
        .await
        .unwrap();
    assert!(result.has_errors);
    assert!(result.has_code("ParamNotFound"));
    assert_eq!(result.error_string(), "Missing userId");
}
