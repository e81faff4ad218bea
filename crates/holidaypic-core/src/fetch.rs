//! Remote byte downloads.
//!
//! Every GET in the pipeline (control image, depth map, generated picture)
//! goes through [`Fetcher`] so stages can be exercised without a network.

use crate::error::{PipelineError, PipelineResult};
use async_trait::async_trait;
use std::time::Duration;

/// Bytes downloaded from a URL.
#[derive(Debug, Clone)]
pub struct Fetched {
    pub bytes: Vec<u8>,
    /// `Content-Type` header, if the server sent one
    pub content_type: Option<String>,
}

/// Something that can download a URL.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> PipelineResult<Fetched>;
}

/// [`Fetcher`] backed by reqwest, with a timeout and a size cap.
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
    max_bytes: u64,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, max_bytes: u64) -> Self {
        Self {
            client: reqwest::Client::new(),
            timeout,
            max_bytes,
        }
    }

    fn transport_error(&self, url: &str, e: reqwest::Error) -> PipelineError {
        if e.is_timeout() {
            PipelineError::Timeout {
                stage: "download".to_string(),
                timeout_ms: self.timeout.as_millis() as u64,
            }
        } else if e.is_connect() {
            PipelineError::Connection {
                target: url.to_string(),
                message: e.to_string(),
            }
        } else {
            PipelineError::Download {
                url: url.to_string(),
                message: format!("request failed: {e}"),
                status_code: None,
            }
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> PipelineResult<Fetched> {
        use futures_util::StreamExt;

        let response = self
            .client
            .get(url)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|e| self.transport_error(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PipelineError::Download {
                url: url.to_string(),
                message: format!("HTTP {status}"),
                status_code: Some(status.as_u16()),
            });
        }

        if let Some(size) = response.content_length() {
            if size > self.max_bytes {
                return Err(PipelineError::Download {
                    url: url.to_string(),
                    message: format!("{size} bytes exceeds limit of {} bytes", self.max_bytes),
                    status_code: None,
                });
            }
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);

        let mut bytes = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| self.transport_error(url, e))?;
            if bytes.len() as u64 + chunk.len() as u64 > self.max_bytes {
                return Err(PipelineError::Download {
                    url: url.to_string(),
                    message: format!("body exceeds limit of {} bytes", self.max_bytes),
                    status_code: None,
                });
            }
            bytes.extend_from_slice(&chunk);
        }

        tracing::debug!("Downloaded {} bytes from {url}", bytes.len());
        Ok(Fetched {
            bytes,
            content_type,
        })
    }
}
