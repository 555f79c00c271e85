//! Vision-model interaction: one image + prompt in, raw reply text out.
//!
//! [`VisionModel`] is the seam between the pipeline and the remote service.
//! [`GroqVisionClient`] implements it over Groq's OpenAI-compatible
//! `/chat/completions` endpoint; tests and alternative providers implement
//! it directly and inject it through
//! [`crate::config::ExtractionConfigBuilder::vision`].
//!
//! A call is a single attempt. Retry and backoff belong to the orchestrator
//! ([`crate::extract`]), which knows which failures are worth repeating.

use crate::config::ExtractionConfig;
use crate::error::{ItemError, ReaderError};
use crate::pipeline::encode::EncodedImage;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// Raw model reply for one image, with token accounting.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisionResponse {
    /// Free text; may or may not follow the requested template.
    pub content: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl VisionResponse {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }
}

/// A multimodal model that can read a tag photo.
///
/// Implementations must be shareable across concurrent tasks: the
/// orchestrator holds one `Arc<dyn VisionModel>` for the whole batch.
#[async_trait]
pub trait VisionModel: Send + Sync {
    /// Short provider name used in logs.
    fn name(&self) -> &str;

    /// Send `prompt` and `image` to `model` and return its reply.
    async fn infer(
        &self,
        model: &str,
        image: &EncodedImage,
        prompt: &str,
    ) -> Result<VisionResponse, ItemError>;
}

// ── Wire types ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: [ContentPart<'a>; 2],
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<Usage>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ApiError,
}

// ── HTTP client ──────────────────────────────────────────────────────────────

/// Vision client for Groq (or any OpenAI-compatible chat-completions API).
///
/// Built once per batch from [`ExtractionConfig`]; the credential and the
/// pooled `reqwest::Client` are immutable and shared by every call.
#[derive(Clone)]
pub struct GroqVisionClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
    timeout_secs: u64,
}

impl std::fmt::Debug for GroqVisionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroqVisionClient")
            .field("endpoint", &self.endpoint)
            .field("timeout_secs", &self.timeout_secs)
            .finish_non_exhaustive()
    }
}

impl GroqVisionClient {
    pub fn new(config: &ExtractionConfig) -> Result<Self, ReaderError> {
        if config.api_key.trim().is_empty() {
            return Err(ReaderError::MissingApiKey {
                var: crate::config::API_KEY_ENV.to_string(),
            });
        }

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.api_timeout_secs))
            .build()
            .map_err(|e| ReaderError::HttpClient(e.to_string()))?;

        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: config.api_key.clone(),
            temperature: config.temperature,
            top_p: config.top_p,
            max_tokens: config.max_tokens,
            timeout_secs: config.api_timeout_secs,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn transport_error(&self, err: reqwest::Error) -> ItemError {
        if err.is_timeout() {
            ItemError::Timeout {
                secs: self.timeout_secs,
            }
        } else {
            ItemError::Transport {
                detail: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl VisionModel for GroqVisionClient {
    fn name(&self) -> &str {
        "groq"
    }

    async fn infer(
        &self,
        model: &str,
        image: &EncodedImage,
        prompt: &str,
    ) -> Result<VisionResponse, ItemError> {
        let body = ChatRequest {
            model,
            messages: [ChatMessage {
                role: "user",
                content: [
                    ContentPart::Text { text: prompt },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl {
                            url: image.data_uri(),
                        },
                    },
                ],
            }],
            temperature: self.temperature,
            top_p: self.top_p,
            max_tokens: self.max_tokens,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        let text = response.text().await.map_err(|e| self.transport_error(e))?;
        debug!("{} answered HTTP {} ({} bytes)", self.endpoint, status, text.len());

        if !status.is_success() {
            return Err(classify_status(status, &text));
        }

        parse_chat_response(&text)
    }
}

/// Map a non-success HTTP status to the per-image error taxonomy.
///
/// A rejected credential is [`ItemError::Auth`]. Rate-limit and server-side
/// failures are transport problems (the request never reached a working
/// model); anything else is the model service refusing this request.
fn classify_status(status: StatusCode, body: &str) -> ItemError {
    let message = serde_json::from_str::<ErrorEnvelope>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.chars().take(200).collect());
    let detail = format!("HTTP {}: {}", status.as_u16(), message);

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ItemError::Auth { detail },
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
            ItemError::Transport { detail }
        }
        s if s.is_server_error() => ItemError::Transport { detail },
        _ => ItemError::Model { detail },
    }
}

/// Extract the reply text from a success envelope.
fn parse_chat_response(body: &str) -> Result<VisionResponse, ItemError> {
    let parsed: ChatResponse = serde_json::from_str(body).map_err(|e| ItemError::Model {
        detail: format!("unreadable response body: {e}"),
    })?;

    if let Some(err) = parsed.error {
        return Err(ItemError::Model {
            detail: err.message,
        });
    }

    let content = parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or_else(|| ItemError::Model {
            detail: "response contained no message content".into(),
        })?;

    let usage = parsed.usage.unwrap_or(Usage {
        prompt_tokens: 0,
        completion_tokens: 0,
    });

    Ok(VisionResponse {
        content,
        prompt_tokens: usage.prompt_tokens,
        completion_tokens: usage.completion_tokens,
    })
}
