use futures_util::StreamExt;
use memchr::memchr;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::api::{BackendRequest, GeminiContent, GeminiRequest, GeminiStreamResponse};
use crate::utils::url::construct_api_url;
use crate::utils::utf8::Utf8StreamDecoder;

pub const SEMANTIC_INSTRUCTION: &str = "Answer as an expert in semantic specifications.";
pub const ASSISTANT_INSTRUCTION: &str = "You are a helpful assistant.";

#[derive(Clone, Debug, PartialEq)]
pub enum StreamMessage {
    Chunk(String),
    Error(String),
    End,
}

/// Where a turn is sent.
#[derive(Clone, Debug, PartialEq)]
pub enum StreamBackend {
    /// The conversation's own endpoint; the body streams back as raw text.
    Custom { url: String },
    /// Google Gemini `streamGenerateContent` over server-sent events.
    Gemini {
        base_url: String,
        api_key: Option<String>,
        model: String,
    },
}

impl StreamBackend {
    pub fn label(&self) -> &'static str {
        match self {
            StreamBackend::Custom { .. } => "custom",
            StreamBackend::Gemini { .. } => "gemini",
        }
    }
}

pub struct StreamParams {
    pub client: reqwest::Client,
    pub backend: StreamBackend,
    pub request: BackendRequest,
    pub cancel_token: CancellationToken,
    pub stream_id: u64,
}

type StreamSender = mpsc::UnboundedSender<(StreamMessage, u64)>;

/// Sends tagged messages for one stream. Every stream ends with exactly one
/// `End`, preceded by at most one `Error`.
struct StreamEmitter {
    tx: StreamSender,
    stream_id: u64,
}

impl StreamEmitter {
    fn chunk(&self, text: String) {
        if !text.is_empty() {
            let _ = self.tx.send((StreamMessage::Chunk(text), self.stream_id));
        }
    }

    fn fail(&self, error: String) {
        let _ = self.tx.send((StreamMessage::Error(error), self.stream_id));
        self.end();
    }

    fn end(&self) {
        let _ = self.tx.send((StreamMessage::End, self.stream_id));
    }
}

fn extract_data_payload(line: &str) -> Option<&str> {
    line.strip_prefix("data:").map(str::trim_start)
}

/// Handle one SSE line of a Gemini stream. Returns true once the stream
/// has been terminated.
fn process_gemini_sse_line(line: &str, emitter: &StreamEmitter) -> bool {
    let Some(payload) = extract_data_payload(line) else {
        return false;
    };
    if payload.trim().is_empty() {
        return false;
    }
    if payload == "[DONE]" {
        emitter.end();
        return true;
    }

    let value = match serde_json::from_str::<serde_json::Value>(payload) {
        Ok(value) => value,
        Err(_) => {
            emitter.fail(format_api_error(payload));
            return true;
        }
    };

    if value.get("error").is_some() {
        emitter.fail(format_api_error(payload));
        return true;
    }

    match serde_json::from_value::<GeminiStreamResponse>(value) {
        Ok(response) => {
            emitter.chunk(response.text());
            false
        }
        Err(_) => {
            emitter.fail(format_api_error(payload));
            true
        }
    }
}

fn extract_error_summary(value: &serde_json::Value) -> Option<String> {
    let summary = value
        .pointer("/error/message")
        .and_then(|v| v.as_str())
        .map(str::to_owned)
        .or_else(|| {
            value.get("error").and_then(|v| match v {
                serde_json::Value::String(s) => Some(s.to_string()),
                _ => None,
            })
        })
        .or_else(|| {
            value
                .get("message")
                .and_then(|v| v.as_str().map(str::to_owned))
        });

    summary.map(|text| {
        let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
        collapsed.trim().to_string()
    })
}

pub(crate) fn format_api_error(error_text: &str) -> String {
    let trimmed = error_text.trim();

    if trimmed.is_empty() {
        return "API Error:\n```\n<empty>\n```".to_string();
    }

    if let Ok(json_value) = serde_json::from_str::<serde_json::Value>(trimmed) {
        if let Ok(pretty_json) = serde_json::to_string_pretty(&json_value) {
            if let Some(summary) = extract_error_summary(&json_value) {
                if !summary.is_empty() {
                    return format!("API Error: {}\n```json\n{}\n```", summary, pretty_json);
                }
            }
            return format!("API Error:\n```json\n{}\n```", pretty_json);
        }
    }

    if trimmed.starts_with('<') && trimmed.ends_with('>') {
        format!("API Error:\n```xml\n{}\n```", trimmed)
    } else {
        format!("API Error:\n```\n{}\n```", trimmed)
    }
}

async fn stream_custom_backend(
    client: reqwest::Client,
    url: String,
    request: BackendRequest,
    emitter: StreamEmitter,
) {
    let response = match client
        .post(&url)
        .header("Content-Type", "application/json")
        .json(&request)
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            emitter.fail(format!("Could not reach the backend: {e}"));
            return;
        }
    };

    let status = response.status();
    if !status.is_success() {
        let fallback = status.canonical_reason().unwrap_or("").to_string();
        let error_text = response.text().await.unwrap_or(fallback);
        emitter.fail(format!(
            "Backend request failed ({}): {error_text}",
            status.as_u16()
        ));
        return;
    }

    let mut decoder = Utf8StreamDecoder::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(bytes) => emitter.chunk(decoder.decode(&bytes)),
            Err(e) => {
                emitter.fail(format!("Backend stream interrupted: {e}"));
                return;
            }
        }
    }

    emitter.chunk(decoder.finish());
    emitter.end();
}

async fn stream_gemini(
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    request: BackendRequest,
    emitter: StreamEmitter,
) {
    let Some(api_key) = api_key else {
        emitter.fail(
            "No Gemini API key configured. Run 'jiuding set api-key <key>' or export GEMINI_API_KEY."
                .to_string(),
        );
        return;
    };

    let instruction = if request.enable_semantic_thinking {
        SEMANTIC_INSTRUCTION
    } else {
        ASSISTANT_INSTRUCTION
    };
    let body = GeminiRequest {
        contents: vec![GeminiContent::text(Some("user"), request.text)],
        system_instruction: Some(GeminiContent::text(None, instruction)),
    };

    let url = construct_api_url(
        &base_url,
        &format!("models/{model}:streamGenerateContent?alt=sse"),
    );
    debug!(model = %model, "sending Gemini request");

    let response = match client
        .post(url)
        .header("Content-Type", "application/json")
        .header("x-goog-api-key", api_key)
        .json(&body)
        .send()
        .await
    {
        Ok(response) => response,
        Err(e) => {
            emitter.fail(format_api_error(&e.to_string()));
            return;
        }
    };

    if !response.status().is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());
        emitter.fail(format_api_error(&error_text));
        return;
    }

    let mut stream = response.bytes_stream();
    let mut buffer: Vec<u8> = Vec::new();

    while let Some(chunk) = stream.next().await {
        let chunk_bytes = match chunk {
            Ok(bytes) => bytes,
            Err(e) => {
                emitter.fail(format_api_error(&e.to_string()));
                return;
            }
        };
        buffer.extend_from_slice(&chunk_bytes);

        while let Some(newline_pos) = memchr(b'\n', &buffer) {
            let line = String::from_utf8_lossy(&buffer[..newline_pos]).trim().to_string();
            buffer.drain(..=newline_pos);
            if process_gemini_sse_line(&line, &emitter) {
                return;
            }
        }
    }

    if !buffer.is_empty() {
        let line = String::from_utf8_lossy(&buffer).trim().to_string();
        if process_gemini_sse_line(&line, &emitter) {
            return;
        }
    }

    emitter.end();
}

#[derive(Clone)]
pub struct ChatStreamService {
    tx: StreamSender,
}

impl ChatStreamService {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<(StreamMessage, u64)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn spawn_stream(&self, params: StreamParams) {
        let tx_clone = self.tx.clone();
        tokio::spawn(async move {
            let StreamParams {
                client,
                backend,
                request,
                cancel_token,
                stream_id,
            } = params;

            debug!(stream_id, backend = backend.label(), "starting stream");
            let emitter = StreamEmitter {
                tx: tx_clone,
                stream_id,
            };

            let work = async move {
                match backend {
                    StreamBackend::Custom { url } => {
                        stream_custom_backend(client, url, request, emitter).await
                    }
                    StreamBackend::Gemini {
                        base_url,
                        api_key,
                        model,
                    } => stream_gemini(client, base_url, api_key, model, request, emitter).await,
                }
            };

            tokio::select! {
                _ = work => {}
                _ = cancel_token.cancelled() => {
                    debug!(stream_id, "stream cancelled");
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::test_utils::{collect_stream, spawn_http_server, RawResponse, TestServer};

    fn emitter_for_test() -> (StreamEmitter, mpsc::UnboundedReceiver<(StreamMessage, u64)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (StreamEmitter { tx, stream_id: 7 }, rx)
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<(StreamMessage, u64)>) -> Vec<StreamMessage> {
        let mut messages = Vec::new();
        while let Ok((message, stream_id)) = rx.try_recv() {
            assert_eq!(stream_id, 7);
            messages.push(message);
        }
        messages
    }

    async fn receive_until_end(
        rx: &mut mpsc::UnboundedReceiver<(StreamMessage, u64)>,
    ) -> Vec<StreamMessage> {
        let mut messages = Vec::new();
        loop {
            let (message, stream_id) =
                tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
                    .await
                    .expect("stream timed out")
                    .expect("channel closed before End");
            assert_eq!(stream_id, 1);
            let done = message == StreamMessage::End;
            messages.push(message);
            if done {
                return messages;
            }
        }
    }

    fn params(backend: StreamBackend, text: &str, semantic: bool) -> StreamParams {
        StreamParams {
            client: reqwest::Client::new(),
            backend,
            request: BackendRequest {
                text: text.to_string(),
                enable_semantic_thinking: semantic,
                stream: true,
            },
            cancel_token: CancellationToken::new(),
            stream_id: 1,
        }
    }

    #[test]
    fn gemini_sse_line_emits_chunk_text() {
        let (emitter, mut rx) = emitter_for_test();
        let variants = [
            r#"data: {"candidates":[{"content":{"parts":[{"text":"Hello"}]}}]}"#,
            r#"data:{"candidates":[{"content":{"parts":[{"text":"Hello"}]}}]}"#,
        ];
        for line in variants {
            assert!(!process_gemini_sse_line(line, &emitter));
        }
        assert_eq!(
            drain(&mut rx),
            vec![
                StreamMessage::Chunk("Hello".into()),
                StreamMessage::Chunk("Hello".into())
            ]
        );
    }

    #[test]
    fn gemini_sse_ignores_comments_and_blank_payloads() {
        let (emitter, mut rx) = emitter_for_test();
        assert!(!process_gemini_sse_line(": keep-alive", &emitter));
        assert!(!process_gemini_sse_line("data: ", &emitter));
        assert!(!process_gemini_sse_line("event: message", &emitter));
        assert!(drain(&mut rx).is_empty());
    }

    #[test]
    fn gemini_sse_error_payload_terminates_stream() {
        let (emitter, mut rx) = emitter_for_test();
        let line = r#"data: {"error":{"code":429,"message":"quota exceeded"}}"#;
        assert!(process_gemini_sse_line(line, &emitter));

        let messages = drain(&mut rx);
        assert_eq!(messages.len(), 2);
        match &messages[0] {
            StreamMessage::Error(text) => assert!(text.starts_with("API Error: quota exceeded")),
            other => panic!("expected error, got {other:?}"),
        }
        assert_eq!(messages[1], StreamMessage::End);
    }

    #[test]
    fn format_api_error_prettifies_json_with_summary() {
        let raw = r#"{"error":{"message":"model overloaded","status":"UNAVAILABLE"}}"#;
        let formatted = format_api_error(raw);

        let expected = r#"API Error: model overloaded
```json
{
  "error": {
    "message": "model overloaded",
    "status": "UNAVAILABLE"
  }
}
```"#;
        assert_eq!(formatted, expected);
    }

    #[test]
    fn format_api_error_handles_json_without_summary() {
        let formatted = format_api_error(r#"{"status":"failed"}"#);
        assert_eq!(formatted, "API Error:\n```json\n{\n  \"status\": \"failed\"\n}\n```");
    }

    #[test]
    fn format_api_error_handles_xml_plaintext_and_empty() {
        assert_eq!(
            format_api_error("<error>bad</error>"),
            "API Error:\n```xml\n<error>bad</error>\n```"
        );
        assert_eq!(format_api_error("api failure"), "API Error:\n```\napi failure\n```");
        assert_eq!(format_api_error("  "), "API Error:\n```\n<empty>\n```");
    }

    #[tokio::test]
    async fn custom_backend_streams_raw_text_chunks() {
        let body = "语义结构: ok".as_bytes();
        let server = spawn_http_server(RawResponse::streaming(
            200,
            vec![body[..2].to_vec(), body[2..7].to_vec(), body[7..].to_vec()],
        ))
        .await;

        let (service, mut rx) = ChatStreamService::new();
        service.spawn_stream(params(
            StreamBackend::Custom {
                url: format!("{}/v1/query/semantic", server.base_url),
            },
            "describe",
            true,
        ));

        let (text, error) = collect_stream(&mut rx, 1).await;
        assert_eq!(error, None);
        assert_eq!(text, "语义结构: ok");

        let request = server.request().await;
        assert!(request.head.starts_with("POST /v1/query/semantic "));
        let sent: serde_json::Value = serde_json::from_str(&request.body).unwrap();
        assert_eq!(
            sent,
            serde_json::json!({"text": "describe", "enable_semantic_thinking": true, "stream": true})
        );
    }

    #[tokio::test]
    async fn custom_backend_error_status_reports_body() {
        let server = spawn_http_server(RawResponse::full(503, "maintenance window\n")).await;

        let (service, mut rx) = ChatStreamService::new();
        service.spawn_stream(params(
            StreamBackend::Custom {
                url: server.base_url.clone(),
            },
            "hi",
            false,
        ));

        let (text, error) = collect_stream(&mut rx, 1).await;
        assert_eq!(text, "");
        assert_eq!(
            error.as_deref(),
            Some("Backend request failed (503): maintenance window\n")
        );
    }

    #[tokio::test]
    async fn custom_backend_empty_body_only_ends() {
        let server = spawn_http_server(RawResponse::streaming(200, Vec::new())).await;

        let (service, mut rx) = ChatStreamService::new();
        service.spawn_stream(params(
            StreamBackend::Custom {
                url: server.base_url.clone(),
            },
            "hi",
            false,
        ));

        assert_eq!(receive_until_end(&mut rx).await, vec![StreamMessage::End]);
    }

    #[tokio::test]
    async fn custom_backend_unreachable_reports_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let (service, mut rx) = ChatStreamService::new();
        service.spawn_stream(params(
            StreamBackend::Custom {
                url: format!("http://{addr}/"),
            },
            "hi",
            false,
        ));

        let (_, error) = collect_stream(&mut rx, 1).await;
        assert!(error.unwrap().starts_with("Could not reach the backend"));
    }

    #[tokio::test]
    async fn gemini_stream_concatenates_sse_events() {
        let events = vec![
            b"data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"Hel\"}]}}]}\r\n\r\n".to_vec(),
            b"data: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"lo\"}]}}]}\n".to_vec(),
            b"\ndata: {\"candidates\":[{\"content\":{\"parts\":[{\"text\":\"!\"}]}}]}".to_vec(),
        ];
        let server = spawn_http_server(RawResponse::streaming(200, events)).await;

        let (service, mut rx) = ChatStreamService::new();
        service.spawn_stream(params(
            StreamBackend::Gemini {
                base_url: format!("{}/v1beta/", server.base_url),
                api_key: Some("test-key".into()),
                model: "gemini-test".into(),
            },
            "hello",
            true,
        ));

        let (text, error) = collect_stream(&mut rx, 1).await;
        assert_eq!(error, None);
        assert_eq!(text, "Hello!");

        let request = server.request().await;
        assert!(request
            .head
            .starts_with("POST /v1beta/models/gemini-test:streamGenerateContent?alt=sse "));
        assert!(request
            .head
            .to_ascii_lowercase()
            .contains("x-goog-api-key: test-key"));
        let sent: serde_json::Value = serde_json::from_str(&request.body).unwrap();
        assert_eq!(sent["systemInstruction"]["parts"][0]["text"], SEMANTIC_INSTRUCTION);
        assert_eq!(sent["contents"][0]["parts"][0]["text"], "hello");
    }

    fn gemini_backend(server: &TestServer) -> StreamBackend {
        StreamBackend::Gemini {
            base_url: server.base_url.clone(),
            api_key: Some("test-key".into()),
            model: "gemini-test".into(),
        }
    }

    #[tokio::test]
    async fn gemini_error_status_is_formatted() {
        let body = r#"{"error":{"code":429,"message":"quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#;
        let server = spawn_http_server(RawResponse::full(429, body)).await;

        let (service, mut rx) = ChatStreamService::new();
        service.spawn_stream(params(gemini_backend(&server), "hello", false));

        assert_eq!(
            receive_until_end(&mut rx).await,
            vec![StreamMessage::Error(format_api_error(body)), StreamMessage::End]
        );
    }

    #[tokio::test]
    async fn gemini_non_json_payload_ends_with_error() {
        let events = vec![b"data: not json\n\n".to_vec()];
        let server = spawn_http_server(RawResponse::streaming(200, events)).await;

        let (service, mut rx) = ChatStreamService::new();
        service.spawn_stream(params(gemini_backend(&server), "hello", false));

        assert_eq!(
            receive_until_end(&mut rx).await,
            vec![
                StreamMessage::Error("API Error:\n```\nnot json\n```".to_string()),
                StreamMessage::End
            ]
        );
    }

    #[tokio::test]
    async fn gemini_without_api_key_fails_fast() {
        let (service, mut rx) = ChatStreamService::new();
        service.spawn_stream(params(
            StreamBackend::Gemini {
                base_url: "http://127.0.0.1:9".into(),
                api_key: None,
                model: "gemini-test".into(),
            },
            "hello",
            false,
        ));

        let (_, error) = collect_stream(&mut rx, 1).await;
        assert!(error.unwrap().contains("No Gemini API key configured"));
    }

    #[tokio::test]
    async fn cancelled_stream_sends_nothing() {
        let server = spawn_http_server(RawResponse::streaming(200, vec![b"late".to_vec()])
            .with_delay_ms(500))
        .await;

        let (service, mut rx) = ChatStreamService::new();
        let params = params(
            StreamBackend::Custom {
                url: server.base_url.clone(),
            },
            "hi",
            false,
        );
        let token = params.cancel_token.clone();
        service.spawn_stream(params);
        token.cancel();

        let outcome = tokio::time::timeout(std::time::Duration::from_millis(800), rx.recv()).await;
        assert!(outcome.is_err(), "cancelled stream should stay silent");
    }
}
