//! Configuration types for shelf-tag extraction.
//!
//! All batch behaviour is controlled through [`ExtractionConfig`], built via
//! its [`ExtractionConfigBuilder`]. The credential is read from the process
//! environment exactly once, when the builder is asked to
//! ([`ExtractionConfigBuilder::from_env`]), and then travels explicitly with
//! the config; nothing deeper in the pipeline touches the environment.

use crate::error::ReaderError;
use crate::pipeline::vision::VisionModel;
use crate::progress::ProgressCallback;
use std::env::VarError;
use std::fmt;
use std::sync::Arc;

/// Environment variable holding the Groq API key.
pub const API_KEY_ENV: &str = "GROQ_API_KEY";
/// Environment variable overriding the API base URL.
pub const BASE_URL_ENV: &str = "GROQ_BASE_URL";
/// Environment variable overriding the vision model.
pub const MODEL_ENV: &str = "GROQ_VISION_MODEL";

/// Groq's OpenAI-compatible API root.
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";
/// Multimodal model used when none is configured.
pub const DEFAULT_MODEL: &str = "llama-3.2-11b-vision-preview";

/// Configuration for a batch of price-tag extractions.
///
/// # Example
/// ```rust
/// use shelf_tag_reader::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .api_key("gsk_test")
///     .concurrency(2)
///     .build()
///     .unwrap();
/// assert_eq!(config.concurrency, 2);
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Bearer credential for the vision API.
    pub api_key: String,

    /// API root; `/chat/completions` is appended. Default: Groq.
    pub base_url: String,

    /// Vision model identifier. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// Sampling temperature. Default: 0.2.
    ///
    /// Kept low so the model copies what is printed on the tag instead of
    /// paraphrasing it.
    pub temperature: f32,

    /// Nucleus-sampling cutoff. Default: 0.1.
    pub top_p: f32,

    /// Maximum tokens the model may generate per image. Default: 256.
    ///
    /// The expected reply is two short lines; the cap only guards against a
    /// model that ignores the template and starts explaining itself.
    pub max_tokens: u32,

    /// Number of images sent to the API at the same time. Default: 4.
    ///
    /// Images are independent, so this is purely a rate-limit knob. Lower it
    /// if the API starts answering `429`.
    pub concurrency: usize,

    /// Retries per image after a transport failure. Default: 2.
    ///
    /// Only network, auth, rate-limit and timeout failures are retried. A
    /// reply that fails to parse is reported as-is.
    pub max_retries: u32,

    /// Initial retry delay in milliseconds, doubled per attempt. Default: 500.
    pub retry_backoff_ms: u64,

    /// Per-call timeout in seconds. Default: 60.
    pub api_timeout_secs: u64,

    /// Custom extraction prompt. If None, uses the built-in prompt.
    pub prompt: Option<String>,

    /// Pre-constructed vision model. Takes precedence over the HTTP client
    /// built from `api_key` / `base_url`.
    pub vision: Option<Arc<dyn VisionModel>>,

    /// Receives per-image progress events.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.2,
            top_p: 0.1,
            max_tokens: 256,
            concurrency: 4,
            max_retries: 2,
            retry_backoff_ms: 500,
            api_timeout_secs: 60,
            prompt: None,
            vision: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtractionConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("top_p", &self.top_p)
            .field("max_tokens", &self.max_tokens)
            .field("concurrency", &self.concurrency)
            .field("max_retries", &self.max_retries)
            .field("retry_backoff_ms", &self.retry_backoff_ms)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("prompt", &self.prompt.as_ref().map(|_| "<custom>"))
            .field("vision", &self.vision.as_ref().map(|_| "<dyn VisionModel>"))
            .finish()
    }
}

fn redact(key: &str) -> &'static str {
    if key.is_empty() {
        "<unset>"
    } else {
        "<redacted>"
    }
}

impl ExtractionConfig {
    /// Create a new builder for `ExtractionConfig`.
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`ExtractionConfig`].
#[derive(Debug)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    /// Read [`API_KEY_ENV`], [`BASE_URL_ENV`] and [`MODEL_ENV`] from the
    /// process environment. Unset variables leave the current value alone.
    pub fn from_env(self) -> Self {
        self.apply_env(|var| std::env::var(var))
    }

    fn apply_env<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Result<String, VarError>,
    {
        let non_empty = |var: &str| lookup(var).ok().filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty(API_KEY_ENV) {
            self.config.api_key = key.trim().to_string();
        }
        if let Some(url) = non_empty(BASE_URL_ENV) {
            self.config.base_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(model) = non_empty(MODEL_ENV) {
            self.config.model = model.trim().to_string();
        }
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = key.into();
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn top_p(mut self, p: f32) -> Self {
        self.config.top_p = p.clamp(0.0, 1.0);
        self
    }

    pub fn max_tokens(mut self, n: u32) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn concurrency(mut self, n: usize) -> Self {
        self.config.concurrency = n.max(1);
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.config.max_retries = n;
        self
    }

    pub fn retry_backoff_ms(mut self, ms: u64) -> Self {
        self.config.retry_backoff_ms = ms;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.prompt = Some(prompt.into());
        self
    }

    pub fn vision(mut self, vision: Arc<dyn VisionModel>) -> Self {
        self.config.vision = Some(vision);
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    ///
    /// A missing credential is fatal here, before any image is touched,
    /// unless a pre-built vision model was supplied.
    pub fn build(self) -> Result<ExtractionConfig, ReaderError> {
        let c = &self.config;
        if c.vision.is_none() && c.api_key.trim().is_empty() {
            return Err(ReaderError::MissingApiKey {
                var: API_KEY_ENV.to_string(),
            });
        }
        if c.model.trim().is_empty() {
            return Err(ReaderError::InvalidConfig("model must not be empty".into()));
        }
        if c.concurrency == 0 {
            return Err(ReaderError::InvalidConfig("concurrency must be ≥ 1".into()));
        }
        if c.api_timeout_secs == 0 {
            return Err(ReaderError::InvalidConfig(
                "API timeout must be at least 1 second".into(),
            ));
        }
        if c.prompt.as_deref().is_some_and(|p| p.trim().is_empty()) {
            return Err(ReaderError::InvalidConfig("prompt must not be empty".into()));
        }
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Result<String, VarError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned().ok_or(VarError::NotPresent)
    }

    #[test]
    fn defaults_match_reference_sampling() {
        let c = ExtractionConfig::default();
        assert_eq!(c.temperature, 0.2);
        assert_eq!(c.top_p, 0.1);
        assert_eq!(c.model, DEFAULT_MODEL);
        assert_eq!(c.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn missing_key_is_fatal() {
        let err = ExtractionConfig::builder()
            .apply_env(lookup(&[]))
            .build()
            .unwrap_err();
        assert!(matches!(err, ReaderError::MissingApiKey { ref var } if var == API_KEY_ENV));
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let err = ExtractionConfig::builder()
            .apply_env(lookup(&[(API_KEY_ENV, "   ")]))
            .build()
            .unwrap_err();
        assert!(matches!(err, ReaderError::MissingApiKey { .. }));
    }

    #[test]
    fn env_overrides_are_applied() {
        let c = ExtractionConfig::builder()
            .apply_env(lookup(&[
                (API_KEY_ENV, "gsk_abc"),
                (BASE_URL_ENV, "http://localhost:8080/v1/"),
                (MODEL_ENV, "llama-3.2-90b-vision-preview"),
            ]))
            .build()
            .expect("valid config");
        assert_eq!(c.api_key, "gsk_abc");
        assert_eq!(c.base_url, "http://localhost:8080/v1");
        assert_eq!(c.model, "llama-3.2-90b-vision-preview");
    }

    #[test]
    fn concurrency_is_clamped_to_one() {
        let c = ExtractionConfig::builder()
            .api_key("k")
            .concurrency(0)
            .build()
            .expect("valid config");
        assert_eq!(c.concurrency, 1);
    }

    #[test]
    fn empty_prompt_is_rejected() {
        let err = ExtractionConfig::builder()
            .api_key("k")
            .prompt("  ")
            .build()
            .unwrap_err();
        assert!(matches!(err, ReaderError::InvalidConfig(_)));
    }

    #[test]
    fn debug_output_redacts_key() {
        let c = ExtractionConfig::builder()
            .api_key("gsk_secret")
            .build()
            .expect("valid config");
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("gsk_secret"));
        assert!(dbg.contains("<redacted>"));
    }
}
