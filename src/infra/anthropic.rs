use async_trait::async_trait;
use reqwest::{
    Client, StatusCode,
    header::{ACCEPT, CONTENT_TYPE},
};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AppConfig;
use crate::domain::changelog::{Completion, GenerationFailure};
use crate::domain::prompt::CompletionRequest;
use crate::error::{AppError, AppResult};
use crate::services::LanguageModelService;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Client for the Anthropic Messages API.
pub struct AnthropicClient {
    http: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
    max_tokens: u32,
    temperature: f32,
    request_timeout_secs: u64,
}

impl AnthropicClient {
    pub fn new(config: &AppConfig) -> AppResult<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|err| AppError::Configuration(format!("failed to build HTTP client: {err}")))?;

        Ok(Self {
            http,
            base_url: config.api_base_url.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            request_timeout_secs: config.request_timeout.as_secs(),
        })
    }

    fn messages_endpoint(base_url: &str) -> String {
        format!("{}/v1/messages", base_url.trim_end_matches('/'))
    }

    fn transport_failure(&self, err: &reqwest::Error) -> GenerationFailure {
        if err.is_timeout() {
            GenerationFailure::timed_out(self.request_timeout_secs)
        } else if err.is_connect() {
            GenerationFailure::connection()
        } else {
            GenerationFailure::unexpected(err)
        }
    }
}

#[async_trait]
impl LanguageModelService for AnthropicClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, GenerationFailure> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| GenerationFailure::provider("Anthropic API key is not configured"))?;

        let body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            system: &request.system,
            messages: vec![MessageParam {
                role: "user",
                content: &request.user_message,
            }],
        };

        debug!(
            model = %self.model,
            prompt_chars = request.user_message.len(),
            "sending generation request"
        );

        let response = self
            .http
            .post(Self::messages_endpoint(&self.base_url))
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header(ACCEPT, "application/json")
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|err| self.transport_failure(&err))?;

        let status = response.status();
        let payload = response
            .text()
            .await
            .map_err(|err| self.transport_failure(&err))?;

        if !status.is_success() {
            return Err(classify_error_response(status, &payload));
        }
        parse_messages_response(&payload)
    }
}

fn classify_error_response(status: StatusCode, body: &str) -> GenerationFailure {
    let envelope = serde_json::from_str::<ErrorEnvelope>(body).ok();

    let rate_limited = status == StatusCode::TOO_MANY_REQUESTS
        || envelope
            .as_ref()
            .is_some_and(|e| e.error.error_type == "rate_limit_error");
    if rate_limited {
        return GenerationFailure::rate_limited();
    }

    let detail = envelope
        .map(|e| e.error.message)
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| match body.trim() {
            "" => "<empty response>".to_string(),
            raw => raw.to_string(),
        });
    GenerationFailure::provider(format!("{status}: {detail}"))
}

fn parse_messages_response(body: &str) -> Result<Completion, GenerationFailure> {
    let payload: MessagesResponse = serde_json::from_str(body).map_err(|err| {
        GenerationFailure::unexpected(format!(
            "provider response did not match the expected schema: {err}"
        ))
    })?;

    let text = payload
        .content
        .into_iter()
        .find(|block| block.block_type == "text")
        .and_then(|block| block.text)
        .ok_or_else(|| GenerationFailure::unexpected("provider response contained no text content"))?;

    Ok(Completion {
        text,
        input_tokens: payload.usage.input_tokens,
        output_tokens: payload.usage.output_tokens,
    })
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<MessageParam<'a>>,
}

#[derive(Serialize)]
struct MessageParam<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
    usage: Usage,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    input_tokens: u64,
    output_tokens: u64,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(rename = "type")]
    error_type: String,
    #[serde(default)]
    message: String,
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::{TcpListener, TcpStream};
    use tokio::task::JoinHandle;

    use super::*;
    use crate::config::StoredConfig;
    use crate::domain::changelog::FailureCategory;

    fn config_with(pairs: &[(&str, &str)]) -> AppConfig {
        let pairs: Vec<(String, String)> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_sources(Path::new("."), &StoredConfig::default(), move |key| {
            pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
        })
        .unwrap()
    }

    fn client_for(base_url: &str, extra: &[(&str, &str)]) -> AnthropicClient {
        let mut pairs = vec![("SHIPNOTE_API_KEY", "sk-test"), ("SHIPNOTE_API_URL", base_url)];
        pairs.extend_from_slice(extra);
        AnthropicClient::new(&config_with(&pairs)).unwrap()
    }

    /// Reads one HTTP request (headers plus `content-length` body).
    async fn read_request(socket: &mut TcpStream) -> String {
        let mut buffer = Vec::new();
        let mut chunk = [0u8; 4096];
        loop {
            let read = socket.read(&mut chunk).await.unwrap();
            if read == 0 {
                break;
            }
            buffer.extend_from_slice(&chunk[..read]);
            let text = String::from_utf8_lossy(&buffer).to_string();
            if let Some(header_end) = text.find("\r\n\r\n") {
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if buffer.len() >= header_end + 4 + content_length {
                    return text;
                }
            }
        }
        String::from_utf8_lossy(&buffer).to_string()
    }

    /// Answers a single request with `status_line` and `body`, returning the
    /// raw request it received.
    async fn serve_once(status_line: &'static str, body: &'static str) -> (String, JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let request = read_request(&mut socket).await;
            let response = format!(
                "HTTP/1.1 {status_line}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            request
        });
        (url, handle)
    }

    #[test]
    fn parses_text_and_usage() {
        let body = r###"{
            "id": "msg_01",
            "type": "message",
            "role": "assistant",
            "content": [{"type": "text", "text": "## Fixes\n- Login works again"}],
            "usage": {"input_tokens": 812, "output_tokens": 64}
        }"###;
        let completion = parse_messages_response(body).unwrap();
        assert_eq!(completion.text, "## Fixes\n- Login works again");
        assert_eq!(completion.input_tokens, 812);
        assert_eq!(completion.output_tokens, 64);
    }

    #[test]
    fn skips_non_text_blocks() {
        let body = r#"{
            "content": [{"type": "thinking"}, {"type": "text", "text": "No significant changes"}],
            "usage": {"input_tokens": 1, "output_tokens": 2}
        }"#;
        assert_eq!(parse_messages_response(body).unwrap().text, "No significant changes");
    }

    #[test]
    fn mismatched_shape_is_unexpected() {
        for body in [
            r#"{"content": "plain string", "usage": {"input_tokens": 1, "output_tokens": 1}}"#,
            r#"{"content": [{"type": "text", "text": "hi"}]}"#,
            r#"{"content": [], "usage": {"input_tokens": 1, "output_tokens": 1}}"#,
            "not json",
        ] {
            let failure = parse_messages_response(body).unwrap_err();
            assert_eq!(failure.category, FailureCategory::Unexpected, "body {body}");
        }
    }

    #[test]
    fn rate_limits_are_distinct() {
        let by_status = classify_error_response(StatusCode::TOO_MANY_REQUESTS, "");
        assert_eq!(by_status.category, FailureCategory::RateLimited);

        let by_type = classify_error_response(
            StatusCode::BAD_REQUEST,
            r#"{"type":"error","error":{"type":"rate_limit_error","message":"slow down"}}"#,
        );
        assert_eq!(by_type.category, FailureCategory::RateLimited);
    }

    #[test]
    fn other_statuses_are_provider_errors() {
        let failure = classify_error_response(
            StatusCode::NOT_FOUND,
            r#"{"type":"error","error":{"type":"not_found_error","message":"model: claude-nope"}}"#,
        );
        assert_eq!(failure.category, FailureCategory::ProviderError);
        assert_eq!(failure.message, "API Error: 404 Not Found: model: claude-nope");

        let raw = classify_error_response(StatusCode::BAD_GATEWAY, "  ");
        assert_eq!(raw.message, "API Error: 502 Bad Gateway: <empty response>");
    }

    #[test]
    fn endpoint_joins_base_url() {
        assert_eq!(
            AnthropicClient::messages_endpoint("https://api.anthropic.com/"),
            "https://api.anthropic.com/v1/messages"
        );
    }

    #[tokio::test]
    async fn missing_api_key_fails_without_request() {
        let client = AnthropicClient::new(&config_with(&[])).unwrap();
        let failure = client
            .complete(&CompletionRequest::for_log("a1 fix", None))
            .await
            .unwrap_err();
        assert_eq!(failure.category, FailureCategory::ProviderError);
        assert!(failure.message.contains("not configured"));
    }

    #[tokio::test]
    async fn unreachable_provider_is_connection_error() {
        let client = AnthropicClient::new(&config_with(&[
            ("SHIPNOTE_API_KEY", "sk-test"),
            ("SHIPNOTE_API_URL", "http://127.0.0.1:1"),
        ]))
        .unwrap();
        let failure = client
            .complete(&CompletionRequest::for_log("a1 fix", None))
            .await
            .unwrap_err();
        assert_eq!(failure.category, FailureCategory::ConnectionError);
        assert!(failure.message.contains("Check your internet connection"));
    }

    #[tokio::test]
    async fn successful_exchange_returns_completion() {
        let (url, server) = serve_once(
            "200 OK",
            r###"{"content":[{"type":"text","text":"## Features\n- Dark mode"}],"usage":{"input_tokens":120,"output_tokens":9}}"###,
        )
        .await;
        let completion = client_for(&url, &[])
            .complete(&CompletionRequest::for_log("b1d4e2a feat(ui): add dark mode", None))
            .await
            .unwrap();
        assert_eq!(completion.text, "## Features\n- Dark mode");
        assert_eq!(completion.input_tokens, 120);
        assert_eq!(completion.output_tokens, 9);

        let request = server.await.unwrap();
        let lowered = request.to_lowercase();
        assert!(request.starts_with("POST /v1/messages "));
        assert!(lowered.contains("x-api-key: sk-test"));
        assert!(lowered.contains("anthropic-version: 2023-06-01"));
        assert!(request.contains("feat(ui): add dark mode"));
    }

    #[tokio::test]
    async fn throttled_exchange_is_rate_limited() {
        let (url, server) = serve_once(
            "429 Too Many Requests",
            r#"{"type":"error","error":{"type":"rate_limit_error","message":"slow down"}}"#,
        )
        .await;
        let failure = client_for(&url, &[])
            .complete(&CompletionRequest::for_log("a1 fix", None))
            .await
            .unwrap_err();
        assert_eq!(failure.category, FailureCategory::RateLimited);
        assert_eq!(
            failure.message,
            "Rate Limit Error: Too many requests. Please try again later."
        );
        server.await.unwrap();
    }

    #[tokio::test]
    async fn silent_provider_times_out_as_connection_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let server = tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            std::future::pending::<()>().await;
            drop(socket);
        });

        let failure = client_for(&url, &[("SHIPNOTE_TIMEOUT_SECS", "1")])
            .complete(&CompletionRequest::for_log("a1 fix", None))
            .await
            .unwrap_err();
        server.abort();
        assert_eq!(failure.category, FailureCategory::ConnectionError);
        assert!(
            failure.message.contains("did not respond within 1s"),
            "{}",
            failure.message
        );
    }
}
