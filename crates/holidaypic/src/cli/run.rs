//! The default command: one full holiday picture run.

use clap::{Args, ValueEnum};
use holidaypic_core::{
    resolve_control_image, Config, DeliveryStatus, HttpFetcher, LlmProviderFactory, ModelUsed,
    Pipeline, ReplicateService, RunContext, RunReport, SmtpMailer, CONTROL_IMAGE_ENV,
};

/// Text-model providers selectable on the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LlmChoice {
    /// Anthropic Messages API
    Anthropic,
    /// OpenAI Chat Completions API
    Openai,
}

impl std::fmt::Display for LlmChoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmChoice::Anthropic => write!(f, "anthropic"),
            LlmChoice::Openai => write!(f, "openai"),
        }
    }
}

/// Flags for the daily run.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// Save the picture but do not email it
    #[arg(long)]
    pub no_email: bool,

    /// Control image URL, file path or data URI (overrides CONTROL_IMAGE)
    #[arg(long, value_name = "REF")]
    pub control_image: Option<String>,

    /// Send the control image to the image model as-is, without a depth map
    #[arg(long)]
    pub no_depth_processing: bool,

    /// Text-model provider (defaults to `llm.provider` in the config)
    #[arg(long, value_enum)]
    pub llm: Option<LlmChoice>,

    /// Text-model name (provider-specific)
    #[arg(long)]
    pub llm_model: Option<String>,
}

/// Fold command-line flags into the loaded config.
fn apply_overrides(args: &RunArgs, config: &mut Config) {
    if let Some(llm) = args.llm {
        config.llm.provider = llm.to_string();
    }
    if args.no_email {
        config.email.enabled = false;
    }
    if args.no_depth_processing {
        config.control.depth_enabled = false;
    }
}

pub async fn execute(args: RunArgs, mut config: Config) -> anyhow::Result<()> {
    apply_overrides(&args, &mut config);
    config.validate()?;

    let llm = LlmProviderFactory::create(
        &config.llm.provider,
        &config.llm,
        args.llm_model.as_deref(),
        config.limits.llm_timeout(),
    )?;
    let images = ReplicateService::from_config(&config.replicate, config.limits.http_timeout())?;
    let fetcher = HttpFetcher::new(
        config.limits.http_timeout(),
        config.limits.max_download_bytes(),
    );
    let mailer = config.email.enabled.then(|| SmtpMailer::new(&config.email));

    let env_image = std::env::var(CONTROL_IMAGE_ENV).ok();
    let source = resolve_control_image(
        args.control_image.as_deref(),
        env_image.as_deref(),
        &config.control.default_image,
    );
    tracing::info!("Control image: {source}");
    let ctx = RunContext::new(chrono::Local::now().date_naive(), source);

    let mut pipeline = Pipeline::new(&config, llm.as_ref(), &images, &fetcher);
    if let Some(mailer) = &mailer {
        pipeline = pipeline.with_mailer(mailer);
    }
    let report = pipeline.run(ctx).await?;

    println!("{}", summary(&report));
    Ok(())
}

fn summary(report: &RunReport) -> String {
    let model = match &report.model {
        ModelUsed::Primary(name) => name.clone(),
        ModelUsed::Fallback(name) => format!("{name} (fallback)"),
    };
    let email = match &report.email {
        DeliveryStatus::Failed(_) => "failed, see log".to_string(),
        other => other.to_string(),
    };
    format!(
        "{}\n  {}\n  model: {model}\n  saved: {}\n  email: {email}",
        report.holiday.subject(),
        report.holiday.description,
        report.saved_to.display(),
    )
}
