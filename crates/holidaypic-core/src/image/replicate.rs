//! Replicate predictions client.
//!
//! Creates a prediction with `Prefer: wait` and, if the model is still running
//! when the server stops waiting, polls the prediction's `urls.get` until it
//! settles or the poll timeout elapses.

use super::service::ImageService;
use crate::config::{resolve_env_var, ReplicateConfig};
use crate::error::{ConfigError, PipelineError, PipelineResult};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::{Duration, Instant};

/// Replicate-hosted model runner.
pub struct ReplicateService {
    api_token: String,
    api_base: String,
    client: reqwest::Client,
    timeout: Duration,
    poll_interval: Duration,
    poll_timeout: Duration,
}

#[derive(Debug, Deserialize)]
struct Prediction {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    status: String,
    #[serde(default)]
    output: Value,
    #[serde(default)]
    error: Value,
    #[serde(default)]
    urls: Option<PredictionUrls>,
}

#[derive(Debug, Deserialize)]
struct PredictionUrls {
    get: Option<String>,
}

impl ReplicateService {
    /// Build from config, resolving the API token.
    pub fn from_config(config: &ReplicateConfig, timeout: Duration) -> Result<Self, ConfigError> {
        let api_token = resolve_env_var(&config.api_token).ok_or_else(|| {
            ConfigError::MissingCredential(
                "Replicate API token not set. Set REPLICATE_API_TOKEN env var.".to_string(),
            )
        })?;
        Ok(Self {
            api_token,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            client: reqwest::Client::new(),
            timeout,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            poll_timeout: Duration::from_millis(config.poll_timeout_ms),
        })
    }

    fn transport_error(&self, model: &str, e: reqwest::Error) -> PipelineError {
        if e.is_timeout() {
            PipelineError::Timeout {
                stage: format!("replicate {model}"),
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else if e.is_connect() {
            PipelineError::Connection {
                target: format!("replicate {model}"),
                message: e.to_string(),
            }
        } else {
            PipelineError::ImageService {
                model: model.to_string(),
                message: format!("request failed: {e}"),
                status_code: None,
            }
        }
    }

    async fn read_prediction(
        &self,
        model: &str,
        resp: reqwest::Response,
    ) -> PipelineResult<Prediction> {
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(PipelineError::ImageService {
                model: model.to_string(),
                message: format!("Replicate HTTP {status}: {text}"),
                status_code: Some(status.as_u16()),
            });
        }
        resp.json().await.map_err(|e| PipelineError::ImageService {
            model: model.to_string(),
            message: format!("Failed to parse Replicate response: {e}"),
            status_code: None,
        })
    }

    async fn poll(&self, model: &str, poll_url: &str) -> PipelineResult<Prediction> {
        let started = Instant::now();
        loop {
            tokio::time::sleep(self.poll_interval).await;
            let resp = self
                .client
                .get(poll_url)
                .bearer_auth(&self.api_token)
                .timeout(self.timeout)
                .send()
                .await
                .map_err(|e| self.transport_error(model, e))?;
            let prediction = self.read_prediction(model, resp).await?;
            if !is_running(&prediction.status) {
                return Ok(prediction);
            }
            if started.elapsed() >= self.poll_timeout {
                return Err(PipelineError::Timeout {
                    stage: format!("replicate {model}"),
                    timeout_ms: self.poll_timeout.as_millis() as u64,
                });
            }
            tracing::debug!("Prediction for {model} still {}", prediction.status);
        }
    }
}

fn is_running(status: &str) -> bool {
    matches!(status, "starting" | "processing")
}

/// Endpoint and request body for a model reference.
///
/// `owner/name:version` goes to `/predictions` with a pinned version;
/// `owner/name` goes to the model's own predictions endpoint.
fn prediction_request(api_base: &str, model: &str, input: Value) -> (String, Value) {
    match model.split_once(':') {
        Some((_, version)) => (
            format!("{api_base}/predictions"),
            json!({ "version": version, "input": input }),
        ),
        None => (
            format!("{api_base}/models/{model}/predictions"),
            json!({ "input": input }),
        ),
    }
}

/// Turn a settled prediction into its output, or an error if it did not succeed.
fn settle(model: &str, prediction: Prediction) -> PipelineResult<Value> {
    match prediction.status.as_str() {
        "succeeded" => Ok(prediction.output),
        status => {
            let detail = match &prediction.error {
                Value::Null => String::from("no error detail"),
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            Err(PipelineError::ImageService {
                model: model.to_string(),
                message: format!(
                    "prediction {} {status}: {detail}",
                    prediction.id.as_deref().unwrap_or("<unknown>")
                ),
                status_code: None,
            })
        }
    }
}

#[async_trait]
impl ImageService for ReplicateService {
    fn name(&self) -> &str {
        "replicate"
    }

    async fn predict(&self, model: &str, input: Value) -> PipelineResult<Value> {
        let (endpoint, body) = prediction_request(&self.api_base, model, input);

        let resp = self
            .client
            .post(&endpoint)
            .bearer_auth(&self.api_token)
            .header("Prefer", "wait")
            .json(&body)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(model, e))?;

        let mut prediction = self.read_prediction(model, resp).await?;
        if is_running(&prediction.status) {
            let poll_url = prediction
                .urls
                .as_ref()
                .and_then(|urls| urls.get.clone())
                .ok_or_else(|| PipelineError::ImageService {
                    model: model.to_string(),
                    message: "prediction still running but has no poll URL".to_string(),
                    status_code: None,
                })?;
            prediction = self.poll(model, &poll_url).await?;
        }

        settle(model, prediction)
    }
}
