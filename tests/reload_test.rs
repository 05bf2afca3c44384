//! Reload loop integration tests against a mock engine admin endpoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use gateway_control::reload::{PushError, Reloader};
use gateway_control::store::FileStore;
use gateway_control::EngineClient;

/// Starts a minimal engine admin endpoint that answers every request with
/// the given status line and body, reporting each request line received.
async fn start_mock_engine(
    status_line: &'static str,
    body: &'static str,
) -> (SocketAddr, mpsc::UnboundedReceiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            let tx = tx.clone();
            tokio::spawn(async move {
                let mut buf = Vec::new();
                let mut chunk = [0u8; 4096];

                // Read headers, then drain the body per Content-Length so
                // the client never sees its upload cut short.
                let header_end = loop {
                    if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                        break pos + 4;
                    }
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                };
                let headers = String::from_utf8_lossy(&buf[..header_end]).to_string();
                let content_length: usize = headers
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length: "))
                    .or_else(|| {
                        headers
                            .lines()
                            .find_map(|l| l.strip_prefix("Content-Length: "))
                    })
                    .and_then(|v| v.trim().parse().ok())
                    .unwrap_or(0);
                while buf.len() < header_end + content_length {
                    match socket.read(&mut chunk).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => buf.extend_from_slice(&chunk[..n]),
                    }
                }

                let request_line = headers.lines().next().unwrap_or_default().to_string();
                let _ = tx.send(request_line);

                let response = format!(
                    "{status_line}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, rx)
}

fn temp_model(name: &str) -> std::path::PathBuf {
    let path = std::env::temp_dir().join(name);
    std::fs::write(
        &path,
        concat!(
            "services:\n",
            "  users:\n",
            "    url: localhost:8000\n",
            "routes:\n",
            "  users:\n",
            "    service_name: users\n",
            "    paths: [\"/users\"]\n",
        ),
    )
    .unwrap();
    path
}

#[tokio::test]
async fn test_loop_pushes_once_per_model_version() {
    let (addr, mut rx) = start_mock_engine("HTTP/1.1 200 OK", "").await;

    let path = temp_model("gateway-control-reload-ok.yaml");
    let store = Arc::new(FileStore::new(&path));
    let engine = EngineClient::new(&format!("http://{addr}")).unwrap();

    let handle = Reloader::new(store, engine, Duration::from_millis(50)).start();

    let request_line = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("engine was never pushed to")
        .unwrap();
    assert!(request_line.starts_with("POST /load"), "{request_line}");

    // The file is unchanged, so subsequent ticks are not-modified skips.
    let second = tokio::time::timeout(Duration::from_millis(300), rx.recv()).await;
    assert!(second.is_err(), "unchanged model was pushed again");

    // Shutdown is cooperative and bounded.
    tokio::time::timeout(Duration::from_secs(1), handle.stop())
        .await
        .expect("reloader did not stop");
}

#[tokio::test]
async fn test_rejected_document_surfaces_engine_body() {
    let (addr, _rx) = start_mock_engine("HTTP/1.1 400 Bad Request", "unknown module").await;

    let engine = EngineClient::new(&format!("http://{addr}")).unwrap();
    let err = engine.load(&serde_json::json!({})).await.unwrap_err();

    match err {
        PushError::Rejected(body) => assert_eq!(body, "unknown module"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_failed_push_keeps_retrying_from_same_baseline() {
    let (addr, mut rx) = start_mock_engine("HTTP/1.1 500 Internal Server Error", "boom").await;

    let path = temp_model("gateway-control-reload-retry.yaml");
    let store = Arc::new(FileStore::new(&path));
    let engine = EngineClient::new(&format!("http://{addr}")).unwrap();

    let handle = Reloader::new(store, engine, Duration::from_millis(50)).start();

    // Every tick retries the push because last_synced never advances.
    for _ in 0..2 {
        let request_line = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("engine was never pushed to")
            .unwrap();
        assert!(request_line.starts_with("POST /load"), "{request_line}");
    }

    handle.stop().await;
}
