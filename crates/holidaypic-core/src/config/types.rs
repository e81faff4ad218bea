//! Sub-configuration structs with defaults matching the daily run.

use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Control image used when neither `--control-image` nor `CONTROL_IMAGE` is set.
pub const FALLBACK_CONTROL_IMAGE: &str =
    "https://replicate.delivery/pbxt/Ll54VZSXgicY76IolH5uDcTgUHKO8Aj3nyNhApW0EyeBEyEj/Sliday%20Logo2.jpg";

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory the generated picture is written to
    pub output_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
        }
    }
}

/// Retry settings for the depth and primary image services.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per call, including the first
    pub max_attempts: u32,

    /// Fixed delay between attempts in milliseconds
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_ms: 2000,
        }
    }
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            delay: Duration::from_millis(self.delay_ms),
        }
    }
}

/// Timeouts and size limits for outbound calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Per-request HTTP timeout in milliseconds
    pub http_timeout_ms: u64,

    /// Text-model call timeout in milliseconds
    pub llm_timeout_ms: u64,

    /// Largest download accepted, in megabytes
    pub max_download_mb: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            http_timeout_ms: 120_000,
            llm_timeout_ms: 60_000,
            max_download_mb: 50,
        }
    }
}

impl LimitsConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_millis(self.http_timeout_ms)
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_millis(self.llm_timeout_ms)
    }

    pub fn max_download_bytes(&self) -> u64 {
        self.max_download_mb * 1024 * 1024
    }
}

/// Text-model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider used for all text queries: "anthropic" or "openai"
    pub provider: String,

    /// How many times to ask for the holiday before giving up on bad JSON
    pub holiday_attempts: u32,

    /// Anthropic configuration
    pub anthropic: Option<AnthropicConfig>,

    /// OpenAI configuration
    pub openai: Option<OpenAiConfig>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "anthropic".to_string(),
            holiday_attempts: 2,
            anthropic: None,
            openai: None,
        }
    }
}

/// Anthropic configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Model name
    pub model: String,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key: "${ANTHROPIC_API_KEY}".to_string(),
            model: "claude-3-5-sonnet-20240620".to_string(),
        }
    }
}

/// OpenAI configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,

    /// Model name
    pub model: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: "${OPENAI_API_KEY}".to_string(),
            model: "gpt-4o-mini".to_string(),
        }
    }
}

/// Replicate API settings shared by the image and depth models.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReplicateConfig {
    /// API token (supports ${ENV_VAR} syntax)
    pub api_token: String,

    /// API base URL
    pub api_base: String,

    /// Delay between prediction status polls in milliseconds
    pub poll_interval_ms: u64,

    /// Give up polling a prediction after this many milliseconds
    pub poll_timeout_ms: u64,
}

impl Default for ReplicateConfig {
    fn default() -> Self {
        Self {
            api_token: "${REPLICATE_API_TOKEN}".to_string(),
            api_base: "https://api.replicate.com/v1".to_string(),
            poll_interval_ms: 1000,
            poll_timeout_ms: 300_000,
        }
    }
}

/// Control image and depth preprocessing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControlConfig {
    /// Control image used when no override is given
    pub default_image: String,

    /// Convert the control image to a depth map before generation
    pub depth_enabled: bool,

    /// Depth-estimation model. Community models need `owner/name:version`;
    /// a bare `owner/name` only works for official models.
    pub depth_model: String,
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            default_image: FALLBACK_CONTROL_IMAGE.to_string(),
            depth_enabled: true,
            depth_model: "chenxwh/depth-anything-v2:b239ea33cff32bb7abb5db39ffe9a09c14cbc2894331d1ef66fe096eed88ebd4".to_string(),
        }
    }
}

/// Image model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Depth-conditioned model (`owner/name` or `owner/name:version`)
    pub primary_model: String,

    /// Prompt-only model used when the primary fails. Empty disables fallback.
    pub fallback_model: String,

    /// Denoising steps
    pub steps: u32,

    /// Classifier-free guidance scale
    pub guidance_scale: f32,

    /// How strongly the control image shapes the result (0.0 - 1.0)
    pub control_strength: f32,

    /// Things the model should steer away from
    pub negative_prompt: String,

    /// JPEG quality of the rendered image (1 - 100)
    pub output_quality: u32,
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            primary_model: "xlabs-ai/flux-dev-controlnet:f2c31c31d81278a91b2447a304dae654c64a5d5a70340fba811bb1cbd41019a2".to_string(),
            fallback_model: "black-forest-labs/flux-schnell".to_string(),
            steps: 28,
            guidance_scale: 3.52,
            control_strength: 0.68,
            negative_prompt: "low quality, ugly, distorted, artefacts, low contrast".to_string(),
            output_quality: 80,
        }
    }
}

impl ImageConfig {
    /// The fallback model, if one is configured.
    pub fn fallback_model(&self) -> Option<&str> {
        let model = self.fallback_model.trim();
        (!model.is_empty()).then_some(model)
    }
}

/// SMTP delivery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    /// Send the picture by email unless `--no-email` is given
    pub enabled: bool,

    /// SMTP relay host (STARTTLS)
    pub smtp_host: String,

    /// SMTP submission port
    pub smtp_port: u16,

    /// Sender address (supports ${ENV_VAR} syntax)
    pub sender_email: String,

    /// Recipient address (supports ${ENV_VAR} syntax)
    pub receiver_email: String,

    /// SMTP password for the sender (supports ${ENV_VAR} syntax)
    pub sender_password: String,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            smtp_host: "smtp.gmail.com".to_string(),
            smtp_port: 587,
            sender_email: "${SENDER_EMAIL}".to_string(),
            receiver_email: "${RECEIVER_EMAIL}".to_string(),
            sender_password: "${SENDER_PASSWORD}".to_string(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
