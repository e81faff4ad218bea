//! Primary/fallback image generation.
//!
//! The primary model is depth-conditioned on the control image and retried on
//! transient failures. If it still fails, a prompt-only fallback model gets one
//! attempt. There is no second fallback.

use super::service::{output_urls, ImageService};
use crate::config::ImageConfig;
use crate::control::ControlImageRef;
use crate::error::{PipelineError, PipelineResult};
use crate::retry::{with_retry, RetryPolicy};
use serde_json::{json, Value};

/// Which model produced the picture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelUsed {
    Primary(String),
    Fallback(String),
}

impl ModelUsed {
    pub fn name(&self) -> &str {
        match self {
            ModelUsed::Primary(model) | ModelUsed::Fallback(model) => model,
        }
    }
}

/// A rendered picture, still on the service's CDN.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub url: String,
    pub model: ModelUsed,
}

/// Input for the depth-conditioned model.
pub fn primary_input(config: &ImageConfig, prompt: &str, control_image: &str) -> Value {
    json!({
        "steps": config.steps,
        "prompt": prompt,
        "lora_url": "",
        "control_type": "depth",
        "control_image": control_image,
        "lora_strength": 1,
        "output_format": "jpg",
        "guidance_scale": config.guidance_scale,
        "output_quality": config.output_quality,
        "negative_prompt": config.negative_prompt,
        "control_strength": config.control_strength,
        "depth_preprocessor": "DepthAnything",
        "soft_edge_preprocessor": "HED",
        "image_to_image_strength": 0,
        "return_preprocessed_image": false
    })
}

/// Input for the prompt-only fallback model.
pub fn fallback_input(config: &ImageConfig, prompt: &str) -> Value {
    json!({
        "prompt": prompt,
        "num_outputs": 1,
        "output_format": "jpg",
        "output_quality": config.output_quality
    })
}

fn first_url(model: &str, output: &Value) -> PipelineResult<String> {
    output_urls(output)
        .into_iter()
        .next()
        .ok_or_else(|| PipelineError::ImageService {
            model: model.to_string(),
            message: format!("output has no image URL: {output}"),
            status_code: None,
        })
}

/// Image generation stage.
pub struct ImageOrchestrator<'a> {
    pub service: &'a dyn ImageService,
    pub config: &'a ImageConfig,
    pub retry: RetryPolicy,
}

impl ImageOrchestrator<'_> {
    /// Render `prompt`, returning exactly one image URL.
    pub async fn generate(
        &self,
        prompt: &str,
        control_image: &ControlImageRef,
    ) -> PipelineResult<GeneratedImage> {
        let primary_error = match self.run_primary(prompt, control_image).await {
            Ok(url) => {
                return Ok(GeneratedImage {
                    url,
                    model: ModelUsed::Primary(self.config.primary_model.clone()),
                });
            }
            Err(e) => e,
        };

        let Some(fallback) = self.config.fallback_model() else {
            tracing::error!("Primary image model failed and no fallback is configured: {primary_error}");
            return Err(primary_error);
        };

        tracing::warn!("Primary image model failed ({primary_error}), trying fallback {fallback}");
        let output = self
            .service
            .predict(fallback, fallback_input(self.config, prompt))
            .await?;
        let url = first_url(fallback, &output)?;
        Ok(GeneratedImage {
            url,
            model: ModelUsed::Fallback(fallback.to_string()),
        })
    }

    async fn run_primary(
        &self,
        prompt: &str,
        control_image: &ControlImageRef,
    ) -> PipelineResult<String> {
        let model = self.config.primary_model.as_str();
        tracing::info!("Generating image with {model} (control image {control_image})");

        let control = control_image.model_input().await?;
        let output = with_retry(&self.retry, "Image generation", || {
            self.service
                .predict(model, primary_input(self.config, prompt, &control))
        })
        .await?;
        first_url(model, &output)
    }
}
