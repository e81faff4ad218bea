//! Final image prompt composition.
//!
//! Three short text queries shape the foreground: a holiday object, the main
//! subject of the control image, and that subject restyled for the holiday.

use crate::control::ControlImageRef;
use crate::error::{PipelineError, PipelineResult};
use crate::fetch::Fetcher;
use crate::holiday::HolidayRecord;
use crate::llm::{complete, LlmProvider, LlmRequest};

const OBJECT_MAX_TOKENS: u32 = 16;
const ANALYZE_MAX_TOKENS: u32 = 64;
const STYLIZE_MAX_TOKENS: u32 = 64;

/// Subject used when the control image cannot be shown to the model.
const UNKNOWN_SUBJECT: &str = "the central shape";

/// The assembled prompt and the pieces it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedPrompt {
    pub holiday_object: String,
    pub control_subject: String,
    pub stylized_object: String,
    pub text: String,
}

/// Join the foreground clauses with the holiday prompt.
pub fn assemble_prompt(holiday_object: &str, stylized_object: &str, holiday_prompt: &str) -> String {
    format!(
        "Large bold {holiday_object} ({stylized_object}) at the foreground. High contrast. {holiday_prompt}"
    )
}

/// Strip the decoration models like to add around one-phrase answers.
///
/// Code fence lines and blank lines are skipped; the first remaining line is
/// the answer.
fn clean_answer(raw: &str) -> String {
    let mut answer = raw
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with("```"))
        .unwrap_or_default();
    loop {
        let stripped = answer
            .trim_matches(|c| matches!(c, '"' | '\'' | '`' | '*'))
            .trim_end_matches('.')
            .trim();
        if stripped == answer {
            return stripped.to_string();
        }
        answer = stripped;
    }
}

/// Clean a model answer, rejecting one that leaves nothing usable.
fn phrase(what: &str, raw: &str) -> PipelineResult<String> {
    let answer = clean_answer(raw);
    if answer.is_empty() {
        return Err(PipelineError::Llm {
            message: format!("empty {what} in model answer: {raw:?}"),
            status_code: None,
        });
    }
    Ok(answer)
}

pub fn object_request(holiday: &HolidayRecord) -> LlmRequest {
    LlmRequest::text(
        format!(
            "Name a single object that best represents the holiday \"{}\" ({}). \
             Answer with one emoji or an object name of one or two words. \
             No comments, no intro, only the object.",
            holiday.title, holiday.description
        ),
        OBJECT_MAX_TOKENS,
    )
}

pub fn analyze_request() -> LlmRequest {
    LlmRequest::text(
        "What is the main subject of this image? Answer with a short noun phrase, \
         for example \"a bold letter S\" or \"a round logo with a bird\". \
         No comments, no intro, only the subject.",
        ANALYZE_MAX_TOKENS,
    )
    .with_temperature(0.2)
}

pub fn stylize_request(control_subject: &str, holiday: &HolidayRecord) -> LlmRequest {
    LlmRequest::text(
        format!(
            "Restyle {control_subject} to match the theme of {}: {}. \
             Describe the restyled subject in one short phrase of at most 12 words. \
             No comments, no intro, only the phrase.",
            holiday.title, holiday.description
        ),
        STYLIZE_MAX_TOKENS,
    )
}

/// Name the holiday's foreground object.
pub async fn generate_holiday_object(
    provider: &dyn LlmProvider,
    holiday: &HolidayRecord,
) -> PipelineResult<String> {
    let answer = complete(provider, &object_request(holiday)).await?;
    phrase("holiday object", &answer)
}

/// Describe the control image's main subject.
///
/// If the image cannot be loaded the analysis is skipped and a generic
/// subject is used; model errors are returned.
pub async fn analyze_control_image(
    provider: &dyn LlmProvider,
    fetcher: &dyn Fetcher,
    control_image: &ControlImageRef,
) -> PipelineResult<String> {
    let image = match control_image.load(fetcher).await {
        Ok(image) => image,
        Err(e) => {
            tracing::warn!("Could not load control image for analysis: {e}");
            return Ok(UNKNOWN_SUBJECT.to_string());
        }
    };
    let answer = complete(provider, &analyze_request().with_image(image)).await?;
    phrase("control image subject", &answer)
}

/// Restyle the control subject to fit the holiday.
pub async fn stylize_object(
    provider: &dyn LlmProvider,
    control_subject: &str,
    holiday: &HolidayRecord,
) -> PipelineResult<String> {
    let answer = complete(provider, &stylize_request(control_subject, holiday)).await?;
    phrase("stylized subject", &answer)
}

/// Run the foreground queries and build the final prompt.
///
/// `source_image` is the operator's control image, not the depth map.
pub async fn compose_prompt(
    provider: &dyn LlmProvider,
    fetcher: &dyn Fetcher,
    holiday: &HolidayRecord,
    source_image: &ControlImageRef,
) -> PipelineResult<GeneratedPrompt> {
    let holiday_object = generate_holiday_object(provider, holiday).await?;
    tracing::info!("Foreground object: {holiday_object}");

    let control_subject = analyze_control_image(provider, fetcher, source_image).await?;
    tracing::info!("Control image subject: {control_subject}");

    let stylized_object = stylize_object(provider, &control_subject, holiday).await?;
    tracing::info!("Stylized subject: {stylized_object}");

    let text = assemble_prompt(&holiday_object, &stylized_object, &holiday.prompt);
    Ok(GeneratedPrompt {
        holiday_object,
        control_subject,
        stylized_object,
        text,
    })
}
