//! Pipeline orchestration: wires the stages together for one run.
//!
//! Stages run strictly one after another:
//! - **depth**: optional depth map for the control image (degrades on failure)
//! - **holiday**: pick today's holiday and its base prompt
//! - **prompt**: foreground object, control subject, restyle, assembly
//! - **image**: primary model with retry, then the fallback model
//! - **delivery**: download, save, email (email failures are reported only)

mod context;

pub use context::{RunContext, RunReport};

use crate::config::Config;
use crate::delivery::{download_image, DeliveryStatus, HolidayEmail, ImageArtifact, Mailer};
use crate::depth::DepthPreprocessor;
use crate::error::PipelineResult;
use crate::fetch::Fetcher;
use crate::holiday::generate_holiday;
use crate::image::{ImageOrchestrator, ImageService};
use crate::llm::LlmProvider;
use crate::prompt::compose_prompt;

/// The external services one run talks to.
pub struct Pipeline<'a> {
    config: &'a Config,
    llm: &'a dyn LlmProvider,
    images: &'a dyn ImageService,
    fetcher: &'a dyn Fetcher,
    mailer: Option<&'a dyn Mailer>,
    depth_enabled: bool,
}

impl<'a> Pipeline<'a> {
    /// Create a pipeline with email disabled and depth preprocessing as configured.
    pub fn new(
        config: &'a Config,
        llm: &'a dyn LlmProvider,
        images: &'a dyn ImageService,
        fetcher: &'a dyn Fetcher,
    ) -> Self {
        Self {
            config,
            llm,
            images,
            fetcher,
            mailer: None,
            depth_enabled: config.control.depth_enabled,
        }
    }

    pub fn with_mailer(mut self, mailer: &'a dyn Mailer) -> Self {
        self.mailer = Some(mailer);
        self
    }

    pub fn with_depth(mut self, enabled: bool) -> Self {
        self.depth_enabled = enabled;
        self
    }

    /// Run every stage for `ctx.date` and report what was produced.
    ///
    /// Returns an error if the holiday, prompt, both image models, the
    /// download or the save fail. Email problems only show up in the report.
    pub async fn run(&self, ctx: RunContext) -> PipelineResult<RunReport> {
        let start = std::time::Instant::now();
        let retry = self.config.retry.policy();
        tracing::info!("Starting holiday picture run for {}", ctx.date);

        let ctx = if self.depth_enabled {
            DepthPreprocessor {
                service: self.images,
                fetcher: self.fetcher,
                model: &self.config.control.depth_model,
                retry,
            }
            .apply(ctx)
            .await
        } else {
            tracing::info!("Depth preprocessing disabled");
            ctx
        };

        let holiday = generate_holiday(self.llm, ctx.date, self.config.llm.holiday_attempts).await?;
        tracing::info!("Holiday: {} {}", holiday.emoji, holiday.title);
        tracing::debug!("Holiday description: {}", holiday.description);

        let prompt = compose_prompt(self.llm, self.fetcher, &holiday, &ctx.source_image).await?;
        tracing::info!("Image prompt: {}", prompt.text);

        let generated = ImageOrchestrator {
            service: self.images,
            config: &self.config.image,
            retry,
        }
        .generate(&prompt.text, &ctx.control_image)
        .await?;
        tracing::info!("Image generated by {}: {}", generated.model.name(), generated.url);

        let bytes = download_image(self.fetcher, &generated.url, &retry).await?;
        let artifact = ImageArtifact::new(ctx.date, &holiday.title, bytes);
        let saved_to = artifact.save(&self.config.output_dir()).await?;

        let email = match self.mailer {
            Some(mailer) => {
                let message = HolidayEmail::new(&holiday, artifact.bytes, &artifact.filename);
                match mailer.send(&message).await {
                    Ok(()) => DeliveryStatus::Sent,
                    Err(e) => {
                        tracing::error!("Email delivery failed: {e}");
                        DeliveryStatus::Failed(e.to_string())
                    }
                }
            }
            None => {
                tracing::info!("Email delivery skipped");
                DeliveryStatus::Skipped
            }
        };

        tracing::info!("Run finished in {:?}", start.elapsed());
        Ok(RunReport {
            holiday,
            prompt: prompt.text,
            model: generated.model,
            image_url: generated.url,
            saved_to,
            email,
        })
    }
}
