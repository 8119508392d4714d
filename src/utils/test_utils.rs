use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, Mutex, Notify};

use crate::core::chat_stream::StreamMessage;
use crate::core::config::data::Config;
use crate::core::storage::LocalStorage;

/// A canned HTTP/1.1 response. The body is written piece by piece with a
/// flush after each part so clients observe separate network chunks.
pub struct RawResponse {
    status: u16,
    parts: Vec<Vec<u8>>,
    delay_ms: u64,
}

impl RawResponse {
    pub fn streaming(status: u16, parts: Vec<Vec<u8>>) -> Self {
        Self {
            status,
            parts,
            delay_ms: 0,
        }
    }

    pub fn full(status: u16, body: &str) -> Self {
        Self::streaming(status, vec![body.as_bytes().to_vec()])
    }

    /// Wait before sending anything back.
    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct CapturedRequest {
    pub head: String,
    pub body: String,
}

pub struct TestServer {
    pub base_url: String,
    captured: Arc<Mutex<Option<CapturedRequest>>>,
    received: Arc<Notify>,
}

impl TestServer {
    /// The first request the server received.
    pub async fn request(&self) -> CapturedRequest {
        loop {
            let notified = self.received.notified();
            if let Some(request) = self.captured.lock().await.clone() {
                return request;
            }
            notified.await;
        }
    }
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|p| p + 4)
}

fn content_length(head: &str) -> usize {
    head.lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse().ok())
        .unwrap_or(0)
}

/// Serve `response` to a single connection on an ephemeral local port.
pub async fn spawn_http_server(response: RawResponse) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener address");
    let captured = Arc::new(Mutex::new(None));
    let received = Arc::new(Notify::new());

    let captured_clone = Arc::clone(&captured);
    let received_clone = Arc::clone(&received);
    tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };

        let mut buf = Vec::new();
        let mut read_buf = [0u8; 4096];
        let header_end = loop {
            if let Some(end) = find_header_end(&buf) {
                break end;
            }
            match socket.read(&mut read_buf).await {
                Ok(0) | Err(_) => return,
                Ok(n) => buf.extend_from_slice(&read_buf[..n]),
            }
        };
        let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
        let wanted = content_length(&head);
        while buf.len() < header_end + wanted {
            match socket.read(&mut read_buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => buf.extend_from_slice(&read_buf[..n]),
            }
        }
        let body = String::from_utf8_lossy(&buf[header_end..]).to_string();
        *captured_clone.lock().await = Some(CapturedRequest { head, body });
        received_clone.notify_waiters();

        if response.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(response.delay_ms)).await;
        }

        let status_line = format!(
            "HTTP/1.1 {} Test\r\nContent-Type: text/plain; charset=utf-8\r\nConnection: close\r\n\r\n",
            response.status
        );
        if socket.write_all(status_line.as_bytes()).await.is_err() {
            return;
        }
        let _ = socket.flush().await;
        for part in response.parts {
            if socket.write_all(&part).await.is_err() {
                return;
            }
            let _ = socket.flush().await;
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        let _ = socket.shutdown().await;
    });

    TestServer {
        base_url: format!("http://{addr}"),
        captured,
        received,
    }
}

/// Gather a stream's text and error until its `End`.
pub async fn collect_stream(
    rx: &mut mpsc::UnboundedReceiver<(StreamMessage, u64)>,
    expected_stream_id: u64,
) -> (String, Option<String>) {
    let mut text = String::new();
    let mut error = None;
    loop {
        let next = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("stream timed out");
        match next {
            Some((message, stream_id)) => {
                assert_eq!(stream_id, expected_stream_id);
                match message {
                    StreamMessage::Chunk(chunk) => text.push_str(&chunk),
                    StreamMessage::Error(err) => error = Some(err),
                    StreamMessage::End => return (text, error),
                }
            }
            None => panic!("stream channel closed before End"),
        }
    }
}

pub fn create_test_app(dir: &std::path::Path) -> crate::core::app::App {
    crate::core::app::App::new(Config::default(), LocalStorage::new(dir), None)
        .expect("test app")
}
