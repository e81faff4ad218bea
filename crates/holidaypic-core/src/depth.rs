//! Depth-map preprocessing of the control image.
//!
//! Runs a depth-estimation model over the control image and swaps the result
//! in as an inline data URI. Any failure leaves the original image in place.

use crate::error::{PipelineError, PipelineResult};
use crate::fetch::Fetcher;
use crate::image::{preferred_url, ImageService};
use crate::llm::ImageInput;
use crate::pipeline::RunContext;
use crate::retry::{with_retry, RetryPolicy};
use serde_json::json;

/// Output key holding the grayscale map when the model returns several.
const GREY_DEPTH_KEY: &str = "grey_depth";

/// Depth-estimation stage.
pub struct DepthPreprocessor<'a> {
    pub service: &'a dyn ImageService,
    pub fetcher: &'a dyn Fetcher,
    pub model: &'a str,
    pub retry: RetryPolicy,
}

impl DepthPreprocessor<'_> {
    /// Return the context with its control image replaced by a depth map,
    /// or unchanged if the depth service could not produce one.
    pub async fn apply(&self, ctx: RunContext) -> RunContext {
        tracing::info!("Estimating depth map for control image {}", ctx.source_image);
        match self.depth_data_uri(&ctx).await {
            Ok(data_uri) => {
                tracing::info!("Depth map ready ({} chars inline)", data_uri.len());
                ctx.with_depth_map(data_uri)
            }
            Err(e) => {
                tracing::warn!("Depth preprocessing failed, using original control image: {e}");
                ctx
            }
        }
    }

    async fn depth_data_uri(&self, ctx: &RunContext) -> PipelineResult<String> {
        let image = ctx.source_image.model_input().await?;

        let output = with_retry(&self.retry, "Depth estimation", || {
            self.service
                .predict(self.model, json!({ "image": image.as_str() }))
        })
        .await?;

        let url = preferred_url(&output, GREY_DEPTH_KEY).ok_or_else(|| {
            PipelineError::ImageService {
                model: self.model.to_string(),
                message: format!("depth output has no image URL: {output}"),
                status_code: None,
            }
        })?;
        tracing::debug!("Depth map URL: {url}");

        let fetched = with_retry(&self.retry, "Depth map download", || self.fetcher.fetch(&url))
            .await?;
        Ok(ImageInput::sniff(&fetched.bytes, fetched.content_type.as_deref()).data_url())
    }
}
