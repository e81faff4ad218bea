//! LLM provider trait and request/response types.
//!
//! Defines the interface that text-generation providers implement, plus the
//! factory that creates the right provider from CLI flags and config.

use crate::config::{resolve_env_var, LlmConfig};
use crate::error::{PipelineError, PipelineResult};
use async_trait::async_trait;
use base64::Engine;
use std::time::Duration;

/// Base64-encoded image ready to send to an LLM API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageInput {
    /// Base64-encoded image bytes
    pub data: String,
    /// MIME type (e.g., "image/jpeg", "image/png")
    pub media_type: String,
}

impl ImageInput {
    /// Create an `ImageInput` from raw bytes and format string.
    ///
    /// The format is the image format identifier (e.g., "jpeg", "png", "webp").
    pub fn from_bytes(bytes: &[u8], format: &str) -> Self {
        let media_type = match format {
            "jpeg" | "jpg" => "image/jpeg",
            "png" => "image/png",
            "webp" => "image/webp",
            "gif" => "image/gif",
            other => {
                tracing::warn!("Unknown image format '{other}', defaulting to image/jpeg");
                "image/jpeg"
            }
        };

        Self {
            data: base64::engine::general_purpose::STANDARD.encode(bytes),
            media_type: media_type.to_string(),
        }
    }

    /// Create an `ImageInput` from raw bytes, guessing the format from magic
    /// bytes first and the HTTP content type second.
    pub fn sniff(bytes: &[u8], content_type: Option<&str>) -> Self {
        let format = if bytes.starts_with(&[0x89, b'P', b'N', b'G']) {
            "png"
        } else if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            "jpeg"
        } else if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            "webp"
        } else if bytes.starts_with(b"GIF8") {
            "gif"
        } else {
            content_type
                .and_then(|ct| ct.split(';').next())
                .and_then(|ct| ct.trim().strip_prefix("image/"))
                .unwrap_or("jpeg")
        };
        Self::from_bytes(bytes, format)
    }

    /// Parse a `data:<mime>;base64,<payload>` URI.
    pub fn from_data_url(url: &str) -> Option<Self> {
        let rest = url.strip_prefix("data:")?;
        let (header, data) = rest.split_once(',')?;
        let media_type = header.strip_suffix(";base64")?;
        if media_type.is_empty() || data.is_empty() {
            return None;
        }
        Some(Self {
            data: data.to_string(),
            media_type: media_type.to_string(),
        })
    }

    /// Return a data URL suitable for OpenAI-style APIs.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.data)
    }
}

/// A request for a short text completion.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    /// Optional system instruction
    pub system: Option<String>,
    /// Text prompt for the model
    pub prompt: String,
    /// Optional image the prompt refers to
    pub image: Option<ImageInput>,
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// Sampling temperature
    pub temperature: f32,
}

impl LlmRequest {
    /// Build a text-only request.
    pub fn text(prompt: impl Into<String>, max_tokens: u32) -> Self {
        Self {
            system: None,
            prompt: prompt.into(),
            image: None,
            max_tokens,
            temperature: 0.7,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_image(mut self, image: ImageInput) -> Self {
        self.image = Some(image);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

/// The response from an LLM call.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    /// Generated text
    pub text: String,
    /// Model identifier used
    pub model: String,
    /// Number of tokens used (input + output), if reported
    pub tokens_used: Option<u32>,
    /// Round-trip latency in milliseconds
    pub latency_ms: u64,
}

/// Trait that all LLM providers implement.
///
/// Uses `async_trait` because native async fn in trait is not object-safe
/// (we need `Box<dyn LlmProvider>` for dynamic dispatch).
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider name for logging (e.g., "anthropic", "openai").
    fn name(&self) -> &str;

    /// Generate a completion for the given request.
    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, PipelineError>;

    /// Per-request timeout for this provider.
    fn timeout(&self) -> Duration;
}

/// Run a request with the provider's timeout and return the trimmed text.
pub async fn complete(provider: &dyn LlmProvider, request: &LlmRequest) -> PipelineResult<String> {
    let timeout = provider.timeout();
    match tokio::time::timeout(timeout, provider.generate(request)).await {
        Ok(Ok(response)) => {
            tracing::debug!(
                provider = provider.name(),
                model = %response.model,
                tokens = ?response.tokens_used,
                latency_ms = response.latency_ms,
                "LLM call completed"
            );
            Ok(response.text)
        }
        Ok(Err(e)) => Err(e),
        Err(_) => Err(PipelineError::Timeout {
            stage: "llm".to_string(),
            timeout_ms: timeout.as_millis() as u64,
        }),
    }
}

/// Factory that creates the appropriate provider from CLI flags and config.
pub struct LlmProviderFactory;

impl LlmProviderFactory {
    /// Create an LLM provider based on provider name, config, and optional model override.
    ///
    /// # Arguments
    /// * `provider` - Provider identifier ("anthropic", "openai")
    /// * `config` - The full LLM config section
    /// * `model_override` - Optional model name that overrides the config default
    /// * `timeout` - Per-request timeout
    pub fn create(
        provider: &str,
        config: &LlmConfig,
        model_override: Option<&str>,
        timeout: Duration,
    ) -> Result<Box<dyn LlmProvider>, PipelineError> {
        match provider {
            "anthropic" => {
                let cfg = config.anthropic.clone().unwrap_or_default();
                let api_key = resolve_env_var(&cfg.api_key).ok_or_else(|| PipelineError::Llm {
                    message: "Anthropic API key not set. Set ANTHROPIC_API_KEY env var."
                        .to_string(),
                    status_code: None,
                })?;
                let model = model_override
                    .map(String::from)
                    .unwrap_or(cfg.model.clone());
                Ok(Box::new(super::anthropic::AnthropicProvider::new(
                    &api_key, &model, timeout,
                )))
            }
            "openai" => {
                let cfg = config.openai.clone().unwrap_or_default();
                let api_key = resolve_env_var(&cfg.api_key).ok_or_else(|| PipelineError::Llm {
                    message: "OpenAI API key not set. Set OPENAI_API_KEY env var.".to_string(),
                    status_code: None,
                })?;
                let model = model_override
                    .map(String::from)
                    .unwrap_or(cfg.model.clone());
                Ok(Box::new(super::openai::OpenAiProvider::new(
                    &api_key, &model, timeout,
                )))
            }
            other => Err(PipelineError::Llm {
                message: format!("Unknown LLM provider: {other}"),
                status_code: None,
            }),
        }
    }
}

/// Map a reqwest transport error into a pipeline error for the given provider.
pub(crate) fn request_failed(provider: &str, timeout: Duration, e: reqwest::Error) -> PipelineError {
    if e.is_timeout() {
        PipelineError::Timeout {
            stage: "llm".to_string(),
            timeout_ms: timeout.as_millis() as u64,
        }
    } else if e.is_connect() {
        PipelineError::Connection {
            target: provider.to_string(),
            message: e.to_string(),
        }
    } else {
        PipelineError::Llm {
            message: format!("{provider} request failed: {e}"),
            status_code: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_image_input_from_bytes_jpeg() {
        let input = ImageInput::from_bytes(&[0xFF, 0xD8, 0xFF], "jpeg");
        assert_eq!(input.media_type, "image/jpeg");
        assert!(!input.data.is_empty());
    }

    #[test]
    fn test_image_input_sniffs_png_over_content_type() {
        let input = ImageInput::sniff(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A], Some("image/jpeg"));
        assert_eq!(input.media_type, "image/png");
    }

    #[test]
    fn test_image_input_sniff_falls_back_to_content_type() {
        let input = ImageInput::sniff(&[1, 2, 3], Some("image/webp; charset=binary"));
        assert_eq!(input.media_type, "image/webp");

        let input = ImageInput::sniff(&[1, 2, 3], None);
        assert_eq!(input.media_type, "image/jpeg");
    }

    #[test]
    fn test_image_input_data_url_round_trip() {
        let input = ImageInput::from_bytes(&[1, 2, 3], "png");
        let url = input.data_url();
        assert!(url.starts_with("data:image/png;base64,"));
        assert_eq!(ImageInput::from_data_url(&url), Some(input));
    }

    #[test]
    fn test_from_data_url_rejects_non_base64() {
        assert!(ImageInput::from_data_url("data:text/plain,hello").is_none());
        assert!(ImageInput::from_data_url("https://example.com/a.png").is_none());
    }

    #[test]
    fn test_request_builders() {
        let image = ImageInput::from_bytes(&[1, 2, 3], "jpeg");
        let request = LlmRequest::text("Name the subject", 64)
            .with_system("You are terse.")
            .with_image(image);
        assert_eq!(request.max_tokens, 64);
        assert_eq!(request.system.as_deref(), Some("You are terse."));
        assert!(request.image.is_some());
    }

    #[test]
    fn test_factory_rejects_unknown_provider() {
        let result = LlmProviderFactory::create(
            "ollama",
            &LlmConfig::default(),
            None,
            Duration::from_secs(1),
        );
        let err = result.err().unwrap();
        assert!(err.to_string().contains("Unknown LLM provider"));
    }

    #[test]
    fn test_factory_uses_literal_key_and_model_override() {
        let config = LlmConfig {
            openai: Some(crate::config::OpenAiConfig {
                api_key: "sk-test".to_string(),
                model: "gpt-4o-mini".to_string(),
            }),
            ..LlmConfig::default()
        };
        let provider =
            LlmProviderFactory::create("openai", &config, Some("gpt-4o"), Duration::from_secs(5))
                .unwrap();
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.timeout(), Duration::from_secs(5));
    }
}
