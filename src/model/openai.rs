//! Chat completions client for OpenAI-compatible APIs
//!
//! Rate-limit responses, server errors and dropped connections are retried
//! with exponential backoff. Once the retry budget is spent the client
//! reports `CompletionOutcome::Unrecoverable` instead of an error.

use std::time::Duration;

use rand::{Rng, thread_rng};
use reqwest::{Client as ReqwestClient, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument, warn};

use super::{ChatMessage, ChatModel, Completion, CompletionOutcome, CompletionRequest, TokenUsage};
use crate::error::{Error, Result};

/// Default timeout for model requests in seconds
const DEFAULT_TIMEOUT_SECS: u64 = 90;

/// Upper bound for a single backoff sleep in seconds
const MAX_BACKOFF_SECS: u64 = 60;

/// Options for the chat completions client
#[derive(Debug, Clone)]
pub struct OpenAiOptions {
    /// API root, without the `/v1` suffix
    pub base_url: String,

    /// Request timeout
    pub timeout: Duration,

    /// Maximum number of retries for transient failures
    pub max_retries: u32,

    /// Retry delay in seconds if no Retry-After header is provided
    pub default_retry_after_secs: u64,
}

impl Default for OpenAiOptions {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com".to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_retries: 3,
            default_retry_after_secs: 2,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    model: String,
    choices: Vec<Choice>,
    #[serde(default)]
    usage: TokenUsage,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// What to do after one HTTP attempt
enum Attempt {
    Done(Completion),
    Retry { after_secs: u64, reason: String },
}

/// HTTP client for the chat completions endpoint
#[derive(Clone)]
pub struct OpenAiChat {
    client: ReqwestClient,
    api_key: String,
    options: OpenAiOptions,
}

impl OpenAiChat {
    /// Create a client. Fails if the underlying HTTP client cannot be built.
    pub fn new(api_key: impl Into<String>, options: OpenAiOptions) -> Result<Self> {
        let client = ReqwestClient::builder().timeout(options.timeout).build()?;
        Ok(Self {
            client,
            api_key: api_key.into(),
            options,
        })
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.options.base_url.trim_end_matches('/')
        )
    }

    async fn attempt(&self, request: &CompletionRequest) -> Result<Attempt> {
        let body = ChatCompletionBody {
            model: &request.model,
            messages: &request.messages,
            max_tokens: request.max_tokens,
            temperature: request.temperature,
        };

        let response = match self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            // Only a request we could not even build is our fault; every other send failure is transport
            Err(e) if e.is_builder() => return Err(Error::Http(e)),
            Err(e) => {
                return Ok(Attempt::Retry {
                    after_secs: self.options.default_retry_after_secs,
                    reason: format!("connection error: {}", e),
                });
            }
        };

        let status = response.status();
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|h| h.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(self.options.default_retry_after_secs);
        let response_text = match response.text().await {
            Ok(text) => text,
            Err(e) if e.is_timeout() || e.is_body() || e.is_decode() || e.is_connect() => {
                return Ok(Attempt::Retry {
                    after_secs: self.options.default_retry_after_secs,
                    reason: format!("response body interrupted: {}", e),
                });
            }
            Err(e) => return Err(Error::Http(e)),
        };

        if status.is_success() {
            let parsed: ChatCompletionResponse =
                serde_json::from_str(&response_text).map_err(|e| {
                    error!("Failed to parse response: {}", e);
                    Error::Other(format!("Failed to parse chat completion: {}", e))
                })?;
            let text = parsed
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .unwrap_or_default();
            return Ok(Attempt::Done(Completion {
                text,
                model: parsed.model,
                usage: parsed.usage,
            }));
        }

        error!("API error: {} - {}", status, response_text);

        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            Ok(Attempt::Retry {
                after_secs: retry_after,
                reason: format!("{} - {}", status, response_text),
            })
        } else if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            Err(Error::Auth("Invalid API key or credentials".to_string()))
        } else {
            Err(Error::Api {
                status_code: status.as_u16(),
                message: response_text,
            })
        }
    }

    /// Exponential backoff with ±20% jitter, capped
    fn backoff_secs(base_delay: u64, attempts: u32) -> u64 {
        let exp_factor = u64::pow(2, attempts.saturating_sub(1));
        let mut delay = base_delay.saturating_mul(exp_factor);

        if delay > 1 {
            let jitter_factor = thread_rng().gen_range(0.8..1.2);
            delay = ((delay as f64) * jitter_factor) as u64;
        }

        std::cmp::min(delay, MAX_BACKOFF_SECS)
    }
}

impl ChatModel for OpenAiChat {
    #[instrument(skip(self, request), fields(model = %request.model, intent = request.intent.label()))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionOutcome> {
        let mut attempts = 0;

        loop {
            match self.attempt(&request).await? {
                Attempt::Done(completion) => {
                    debug!(
                        "Completion received: {} tokens total",
                        completion.usage.total
                    );
                    return Ok(CompletionOutcome::Completed(completion));
                }
                Attempt::Retry { after_secs, reason } => {
                    attempts += 1;
                    if attempts > self.options.max_retries {
                        error!(
                            "Giving up after {} attempts: {}",
                            attempts, reason
                        );
                        return Ok(CompletionOutcome::Unrecoverable { reason });
                    }

                    let delay = Self::backoff_secs(after_secs, attempts);
                    warn!(
                        "Transient model failure ({}). Retrying after {} seconds (attempt {}/{})",
                        reason, delay, attempts, self.options.max_retries
                    );
                    tokio::time::sleep(Duration::from_secs(delay)).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Intent;
    use mockito::Server;
    use std::io::Write;

    fn request() -> CompletionRequest {
        CompletionRequest {
            messages: vec![ChatMessage::system("sys"), ChatMessage::user("hello")],
            model: "gpt-4o-mini".to_string(),
            max_tokens: 100,
            temperature: 0.3,
            intent: Intent::LinkSelection,
        }
    }

    fn options(base_url: String) -> OpenAiOptions {
        OpenAiOptions {
            base_url,
            max_retries: 2,
            default_retry_after_secs: 0,
            ..OpenAiOptions::default()
        }
    }

    #[tokio::test]
    async fn test_completion_success() {
        let mut server = Server::new_async().await;
        let mock_server = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer test-key")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "model": "gpt-4o-mini-2024-07-18",
                    "choices": [{"message": {"role": "assistant", "content": "hi there"}}],
                    "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
                }"#,
            )
            .expect(1)
            .create_async()
            .await;

        let client = OpenAiChat::new("test-key", options(server.url())).unwrap();
        let outcome = client.complete(request()).await.unwrap();

        let completion = outcome.completion().expect("completed");
        assert_eq!(completion.text, "hi there");
        assert_eq!(completion.model, "gpt-4o-mini-2024-07-18");
        assert_eq!(
            completion.usage,
            TokenUsage {
                prompt: 12,
                completion: 3,
                total: 15
            }
        );

        mock_server.assert_async().await;
    }

    #[tokio::test]
    async fn test_rate_limit_exhaustion_is_unrecoverable() {
        let mut server = Server::new_async().await;
        let mock_server = server
            .mock("POST", "/v1/chat/completions")
            .with_status(429)
            .with_body("slow down")
            .expect(3)
            .create_async()
            .await;

        let client = OpenAiChat::new("test-key", options(server.url())).unwrap();
        let outcome = client.complete(request()).await.unwrap();

        assert!(matches!(outcome, CompletionOutcome::Unrecoverable { .. }));
        mock_server.assert_async().await;
    }

    #[tokio::test]
    async fn test_unauthorized_is_fatal() {
        let mut server = Server::new_async().await;
        let mock_server = server
            .mock("POST", "/v1/chat/completions")
            .with_status(401)
            .with_body("bad key")
            .expect(1)
            .create_async()
            .await;

        let client = OpenAiChat::new("test-key", options(server.url())).unwrap();
        let result = client.complete(request()).await;

        assert!(matches!(result, Err(Error::Auth(_))));
        mock_server.assert_async().await;
    }

    #[tokio::test]
    async fn test_bad_request_is_api_error() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(400)
            .with_body("unknown model")
            .create_async()
            .await;

        let client = OpenAiChat::new("test-key", options(server.url())).unwrap();
        let result = client.complete(request()).await;

        match result {
            Err(Error::Api {
                status_code,
                message,
            }) => {
                assert_eq!(status_code, 400);
                assert_eq!(message, "unknown model");
            }
            other => panic!("Expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_unrecoverable() {
        let client = OpenAiChat::new(
            "test-key",
            OpenAiOptions {
                max_retries: 1,
                ..options("http://127.0.0.1:1".to_string())
            },
        )
        .unwrap();

        let outcome = client.complete(request()).await.unwrap();

        assert!(matches!(outcome, CompletionOutcome::Unrecoverable { .. }));
    }

    #[tokio::test]
    async fn test_stalled_body_is_unrecoverable() {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_chunked_body(|writer| {
                writer.write_all(b"{\"model\":")?;
                writer.flush()?;
                std::thread::sleep(Duration::from_secs(3));
                Ok(())
            })
            .create_async()
            .await;

        let client = OpenAiChat::new(
            "test-key",
            OpenAiOptions {
                timeout: Duration::from_secs(1),
                max_retries: 1,
                ..options(server.url())
            },
        )
        .unwrap();

        let outcome = client.complete(request()).await.unwrap();

        assert!(matches!(outcome, CompletionOutcome::Unrecoverable { .. }));
    }

    #[tokio::test]
    async fn test_retry_after_header_is_honoured() {
        let mut server = Server::new_async().await;
        let limited = server
            .mock("POST", "/v1/chat/completions")
            .with_status(429)
            .with_header("retry-after", "0")
            .with_body("slow down")
            .expect(1)
            .create_async()
            .await;
        let ok = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(r#"{"model": "gpt-4o-mini", "choices": [{"message": {"content": "done"}}]}"#)
            .expect(1)
            .create_async()
            .await;

        // Without the header the client would wait a default of 30 seconds
        let client = OpenAiChat::new(
            "test-key",
            OpenAiOptions {
                default_retry_after_secs: 30,
                ..options(server.url())
            },
        )
        .unwrap();

        let outcome = tokio::time::timeout(Duration::from_secs(10), client.complete(request()))
            .await
            .expect("retry-after of 0 should retry immediately")
            .unwrap();

        assert_eq!(outcome.completion().unwrap().text, "done");
        limited.assert_async().await;
        ok.assert_async().await;
    }

    #[test]
    fn test_backoff_is_capped() {
        assert_eq!(OpenAiChat::backoff_secs(0, 3), 0);
        assert!(OpenAiChat::backoff_secs(50, 5) <= MAX_BACKOFF_SECS);
    }
}
