//! holidaypic core - daily holiday picture pipeline.
//!
//! Asks a text model to pick an interesting holiday for a date, turns it into
//! an image prompt, renders the prompt with a hosted image model guided by a
//! control image, then saves the picture and emails it.
//!
//! # Architecture
//!
//! Every stage is awaited before the next one starts:
//!
//! ```text
//! Control image → Depth map → Holiday → Prompt → Image (primary/fallback) → Save → Email
//! ```
//!
//! External services sit behind traits ([`LlmProvider`], [`ImageService`],
//! [`Fetcher`], [`Mailer`]) so the whole run can be driven by test doubles.
//!
//! # Usage
//!
//! ```rust,ignore
//! use holidaypic_core::{
//!     resolve_control_image, Config, HttpFetcher, LlmProviderFactory, Pipeline,
//!     ReplicateService, RunContext,
//! };
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let llm = LlmProviderFactory::create("anthropic", &config.llm, None, config.limits.llm_timeout())?;
//!     let images = ReplicateService::from_config(&config.replicate, config.limits.http_timeout())?;
//!     let fetcher = HttpFetcher::new(config.limits.http_timeout(), config.limits.max_download_bytes());
//!
//!     let source = resolve_control_image(None, None, &config.control.default_image);
//!     let ctx = RunContext::new(chrono::Local::now().date_naive(), source);
//!     let report = Pipeline::new(&config, llm.as_ref(), &images, &fetcher).run(ctx).await?;
//!     println!("Saved {}", report.saved_to.display());
//!     Ok(())
//! }
//! ```

// Module declarations
pub mod config;
pub mod control;
pub mod delivery;
pub mod depth;
pub mod error;
pub mod fetch;
pub mod holiday;
pub mod image;
pub mod llm;
pub mod pipeline;
pub mod prompt;
pub mod retry;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenient access
pub use config::Config;
pub use control::{resolve_control_image, ControlImageRef, CONTROL_IMAGE_ENV};
pub use delivery::{DeliveryStatus, EmailError, HolidayEmail, ImageArtifact, Mailer, SmtpMailer};
pub use error::{ConfigError, HolidayPicError, PipelineError, PipelineResult, Result};
pub use fetch::{Fetcher, HttpFetcher};
pub use holiday::HolidayRecord;
pub use image::{ImageService, ModelUsed, ReplicateService};
pub use llm::{LlmProvider, LlmProviderFactory};
pub use pipeline::{Pipeline, RunContext, RunReport};
pub use retry::RetryPolicy;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
