//! Holiday selection and decoding.
//!
//! Asks the text model to pick a holiday for today's date and decodes its
//! answer into a [`HolidayRecord`]. The answer must be bare JSON.

use crate::error::{HolidayDecodeError, PipelineError, PipelineResult};
use crate::llm::{complete, LlmProvider, LlmRequest};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Longest description the model is asked for, in characters.
pub const MAX_DESCRIPTION_CHARS: usize = 100;

/// Longest image prompt the model is asked for, in characters.
pub const MAX_PROMPT_CHARS: usize = 500;

const HOLIDAY_MAX_TOKENS: u32 = 256;

const HOLIDAY_SYSTEM: &str = "You're a holiday master.";

/// The holiday picked for today.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolidayRecord {
    pub title: String,
    pub emoji: String,
    pub description: String,
    pub prompt: String,
}

impl HolidayRecord {
    fn check_fields(&self) -> Result<(), HolidayDecodeError> {
        let fields = [
            ("title", &self.title),
            ("emoji", &self.emoji),
            ("description", &self.description),
            ("prompt", &self.prompt),
        ];
        for (name, value) in fields {
            if value.trim().is_empty() {
                return Err(HolidayDecodeError::EmptyField(name));
            }
        }
        Ok(())
    }

    /// Email subject line: emoji followed by the title.
    pub fn subject(&self) -> String {
        format!("{} {}", self.emoji, self.title)
    }
}

/// Decode a model answer into a holiday record.
///
/// Fenced answers are rejected rather than unwrapped. Over-long description
/// or prompt fields are accepted with a warning.
pub fn parse_holiday(raw: &str) -> Result<HolidayRecord, HolidayDecodeError> {
    let trimmed = raw.trim();
    if trimmed.starts_with("```") {
        return Err(HolidayDecodeError::CodeFence);
    }

    let record: HolidayRecord =
        serde_json::from_str(trimmed).map_err(|e| HolidayDecodeError::Schema(e.to_string()))?;
    record.check_fields()?;

    let description_len = record.description.chars().count();
    if description_len > MAX_DESCRIPTION_CHARS {
        tracing::warn!(
            "Holiday description is {description_len} chars (asked for at most {MAX_DESCRIPTION_CHARS})"
        );
    }
    let prompt_len = record.prompt.chars().count();
    if prompt_len > MAX_PROMPT_CHARS {
        tracing::warn!("Holiday prompt is {prompt_len} chars (asked for at most {MAX_PROMPT_CHARS})");
    }

    Ok(record)
}

/// Build the holiday query for a date.
pub fn holiday_request(date: NaiveDate) -> LlmRequest {
    let today = date.format("%B %d, %Y");
    let prompt = format!(
        r#"Look up in your worldwide holiday register, think of top 10 worldwide holidays for {today}, pick the most interesting and unorthodox holiday and create a Stable Diffusion prompt (max {MAX_PROMPT_CHARS} characters) for the image that represents this holiday the best. No comments, no intro, only the prompt.
Use JSON format to output the result:
{{
    "type": "object",
    "properties": {{
        "title": {{
            "type": "string",
            "description": "The title of the holiday"
        }},
        "emoji": {{
            "type": "string",
            "description": "A single emoji that best represents the holiday"
        }},
        "description": {{
            "type": "string",
            "description": "A short description (max {MAX_DESCRIPTION_CHARS} characters) that mentions the date and explains the holiday in a simple way"
        }},
        "prompt": {{
            "type": "string",
            "description": "The Stable Diffusion prompt for the image"
        }}
    }},
    "required": ["title", "emoji", "description", "prompt"]
}}
No ```json``` code block, no comments, no intro, only the JSON."#
    );
    LlmRequest::text(prompt, HOLIDAY_MAX_TOKENS).with_system(HOLIDAY_SYSTEM)
}

/// Ask for today's holiday, re-asking up to `attempts` times on undecodable answers.
///
/// Provider errors are returned immediately; only decode failures are re-asked.
pub async fn generate_holiday(
    provider: &dyn LlmProvider,
    date: NaiveDate,
    attempts: u32,
) -> PipelineResult<HolidayRecord> {
    let request = holiday_request(date);
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        let raw = complete(provider, &request).await?;
        match parse_holiday(&raw) {
            Ok(record) => return Ok(record),
            Err(source) if attempt < attempts => {
                tracing::warn!("Holiday answer {attempt}/{attempts} unusable ({source}), asking again");
                tracing::debug!("Rejected holiday answer: {raw}");
                attempt += 1;
            }
            Err(source) => return Err(PipelineError::HolidayDecode { source, raw }),
        }
    }
}
