//! Hand-written test doubles for the pipeline's external services.

use crate::delivery::{EmailError, HolidayEmail, Mailer};
use crate::error::{PipelineError, PipelineResult};
use crate::fetch::{Fetched, Fetcher};
use crate::image::ImageService;
use crate::llm::{LlmProvider, LlmRequest, LlmResponse};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

type LlmFn = Box<dyn Fn(&LlmRequest) -> PipelineResult<String> + Send + Sync>;

/// Text model that answers from a closure and records every request.
pub(crate) struct MockLlm {
    respond: LlmFn,
    requests: Mutex<Vec<LlmRequest>>,
}

impl MockLlm {
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(&LlmRequest) -> PipelineResult<String> + Send + Sync + 'static,
    {
        Self {
            respond: Box::new(respond),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Answer with each item in turn, repeating the last one.
    pub fn sequence(answers: Vec<String>) -> Self {
        let next = AtomicUsize::new(0);
        Self::new(move |_| {
            let idx = next.fetch_add(1, Ordering::SeqCst).min(answers.len() - 1);
            Ok(answers[idx].clone())
        })
    }

    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl LlmProvider for MockLlm {
    fn name(&self) -> &str {
        "mock"
    }

    async fn generate(&self, request: &LlmRequest) -> Result<LlmResponse, PipelineError> {
        self.requests.lock().unwrap().push(request.clone());
        let text = (self.respond)(request)?;
        Ok(LlmResponse {
            text,
            model: "mock-v1".to_string(),
            tokens_used: Some(42),
            latency_ms: 1,
        })
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(5)
    }
}

type PredictFn = Box<dyn Fn(&str, &Value) -> PipelineResult<Value> + Send + Sync>;

/// Hosted model service answering from a closure.
pub(crate) struct MockImageService {
    respond: PredictFn,
    calls: Mutex<Vec<(String, Value)>>,
}

impl MockImageService {
    pub fn new<F>(respond: F) -> Self
    where
        F: Fn(&str, &Value) -> PipelineResult<Value> + Send + Sync + 'static,
    {
        Self {
            respond: Box::new(respond),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// `(model, input)` for every prediction, in order.
    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ImageService for MockImageService {
    fn name(&self) -> &str {
        "mock"
    }

    async fn predict(&self, model: &str, input: Value) -> PipelineResult<Value> {
        let result = (self.respond)(model, &input);
        self.calls.lock().unwrap().push((model.to_string(), input));
        result
    }
}

enum Canned {
    Body(Fetched),
    Failure {
        message: String,
        status_code: Option<u16>,
    },
}

/// Fetcher serving canned responses. Unknown URLs get a 404.
#[derive(Default)]
pub(crate) struct MockFetcher {
    responses: HashMap<String, Canned>,
    requested: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, response: PipelineResult<Fetched>) -> Self {
        let canned = match response {
            Ok(fetched) => Canned::Body(fetched),
            Err(e) => Canned::Failure {
                status_code: e.status_code(),
                message: e.to_string(),
            },
        };
        self.responses.insert(url.to_string(), canned);
        self
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> PipelineResult<Fetched> {
        self.requested.lock().unwrap().push(url.to_string());
        match self.responses.get(url) {
            Some(Canned::Body(fetched)) => Ok(fetched.clone()),
            Some(Canned::Failure {
                message,
                status_code,
            }) => Err(PipelineError::Download {
                url: url.to_string(),
                message: message.clone(),
                status_code: *status_code,
            }),
            None => Err(PipelineError::Download {
                url: url.to_string(),
                message: "HTTP 404 Not Found".to_string(),
                status_code: Some(404),
            }),
        }
    }
}

/// Mailer that records what it was asked to send.
#[derive(Default)]
pub(crate) struct MockMailer {
    fail: bool,
    sent: Mutex<Vec<HolidayEmail>>,
}

impl MockMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<HolidayEmail> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send(&self, email: &HolidayEmail) -> Result<(), EmailError> {
        self.sent.lock().unwrap().push(email.clone());
        if self.fail {
            return Err(EmailError::Build("mock mailer refused".to_string()));
        }
        Ok(())
    }
}
