//! Image service trait and prediction output helpers.

use crate::error::PipelineResult;
use async_trait::async_trait;
use serde_json::Value;

/// A hosted model runner (image generation, depth estimation).
///
/// `predict` submits `input` to `model` and returns the prediction's
/// `output` value once the prediction has succeeded.
#[async_trait]
pub trait ImageService: Send + Sync {
    /// Service name for logging.
    fn name(&self) -> &str;

    async fn predict(&self, model: &str, input: Value) -> PipelineResult<Value>;
}

/// Collect every HTTP(S) URL in a prediction output, in order, without duplicates.
///
/// Outputs may be a bare string, an array, or an object with `url`/`urls`/
/// `output` keys or arbitrary named outputs.
pub fn output_urls(value: &Value) -> Vec<String> {
    let mut out = Vec::new();
    collect_urls(value, &mut out);
    out
}

fn collect_urls(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(url) => {
            let trimmed = url.trim();
            if trimmed.starts_with("http") && !out.iter().any(|existing| existing == trimmed) {
                out.push(trimmed.to_string());
            }
        }
        Value::Array(rows) => {
            for row in rows {
                collect_urls(row, out);
            }
        }
        Value::Object(obj) => {
            for key in ["url", "urls", "output"] {
                if let Some(inner) = obj.get(key) {
                    collect_urls(inner, out);
                }
            }
            for (key, inner) in obj {
                if !matches!(key.as_str(), "url" | "urls" | "output") {
                    collect_urls(inner, out);
                }
            }
        }
        _ => {}
    }
}

/// Pick the URL stored under `key` if the output is an object that has one,
/// otherwise the first URL anywhere in the output.
pub fn preferred_url(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(|inner| output_urls(inner).into_iter().next())
        .or_else(|| output_urls(value).into_iter().next())
}
