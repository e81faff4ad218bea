//! Delivery: download the rendered picture, save it, email it.

mod email;
mod filename;

pub use email::{holiday_html, EmailError, HolidayEmail, Mailer, SmtpMailer, IMAGE_CONTENT_ID};
pub use filename::{image_filename, sanitize_title, MAX_FILENAME_BYTES};

use crate::error::{PipelineError, PipelineResult};
use crate::fetch::Fetcher;
use crate::retry::{with_retry, RetryPolicy};
use chrono::NaiveDate;
use std::fmt;
use std::path::{Path, PathBuf};

/// The rendered picture and the name it is stored under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageArtifact {
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl ImageArtifact {
    pub fn new(date: NaiveDate, title: &str, bytes: Vec<u8>) -> Self {
        Self {
            filename: image_filename(date, title),
            bytes,
        }
    }

    /// Write the picture into `dir`.
    pub async fn save(&self, dir: &Path) -> PipelineResult<PathBuf> {
        save_image(dir, &self.filename, &self.bytes).await
    }
}

/// What happened to the email for this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStatus {
    Sent,
    /// Email disabled by flag or config
    Skipped,
    /// Sending failed; the run still counts as a success
    Failed(String),
}

impl fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryStatus::Sent => write!(f, "sent"),
            DeliveryStatus::Skipped => write!(f, "skipped"),
            DeliveryStatus::Failed(reason) => write!(f, "failed ({reason})"),
        }
    }
}

/// Download the generated picture. Any non-success status is fatal.
pub async fn download_image(
    fetcher: &dyn Fetcher,
    url: &str,
    retry: &RetryPolicy,
) -> PipelineResult<Vec<u8>> {
    tracing::info!("Downloading generated image from {url}");
    let fetched = with_retry(retry, "Image download", || fetcher.fetch(url)).await?;
    if fetched.bytes.is_empty() {
        return Err(PipelineError::Download {
            url: url.to_string(),
            message: "empty response body".to_string(),
            status_code: None,
        });
    }
    Ok(fetched.bytes)
}

/// Write the picture to `dir/filename`, creating `dir` if needed.
pub async fn save_image(dir: &Path, filename: &str, bytes: &[u8]) -> PipelineResult<PathBuf> {
    let path = dir.join(filename);
    let save_error = |source: std::io::Error| PipelineError::Save {
        path: path.clone(),
        source,
    };

    tokio::fs::create_dir_all(dir).await.map_err(save_error)?;
    tokio::fs::write(&path, bytes).await.map_err(save_error)?;

    tracing::info!("Saved {} bytes to {}", bytes.len(), path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::Fetched;
    use crate::testing::MockFetcher;
    use std::time::Duration;

    fn fast_retry() -> RetryPolicy {
        RetryPolicy {
            max_attempts: 3,
            delay: Duration::from_millis(5),
        }
    }

    #[tokio::test]
    async fn test_save_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("pictures").join("2025");

        let path = save_image(&nested, "2025-03-03_World_Otter_Day.jpg", b"jpeg")
            .await
            .unwrap();

        assert_eq!(path, nested.join("2025-03-03_World_Otter_Day.jpg"));
        assert_eq!(std::fs::read(&path).unwrap(), b"jpeg");
    }

    #[tokio::test]
    async fn test_save_into_file_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();

        let err = save_image(&blocker, "a.jpg", b"jpeg").await.unwrap_err();
        assert!(matches!(err, PipelineError::Save { .. }));
    }

    #[tokio::test]
    async fn test_download_returns_bytes() {
        let fetcher = MockFetcher::new().with(
            "https://cdn.test/out.jpg",
            Ok(Fetched {
                bytes: vec![0xFF, 0xD8, 0xFF],
                content_type: Some("image/jpeg".to_string()),
            }),
        );
        let bytes = download_image(&fetcher, "https://cdn.test/out.jpg", &fast_retry())
            .await
            .unwrap();
        assert_eq!(bytes, vec![0xFF, 0xD8, 0xFF]);
    }

    #[tokio::test]
    async fn test_download_not_found_is_fatal_without_retry() {
        let fetcher = MockFetcher::new();
        let err = download_image(&fetcher, "https://cdn.test/gone.jpg", &fast_retry())
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), Some(404));
        assert_eq!(fetcher.requested().len(), 1);
    }

    #[tokio::test]
    async fn test_download_empty_body_is_error() {
        let fetcher = MockFetcher::new().with(
            "https://cdn.test/empty.jpg",
            Ok(Fetched {
                bytes: Vec::new(),
                content_type: None,
            }),
        );
        let err = download_image(&fetcher, "https://cdn.test/empty.jpg", &fast_retry())
            .await
            .unwrap_err();
        assert!(matches!(err, PipelineError::Download { .. }));
    }

    #[tokio::test]
    async fn test_artifact_saved_under_derived_name() {
        let dir = tempfile::tempdir().unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        let artifact = ImageArtifact::new(date, "World Otter Day", b"jpeg".to_vec());

        let path = artifact.save(dir.path()).await.unwrap();
        assert_eq!(path, dir.path().join("2025-03-03_World_Otter_Day.jpg"));
    }

    #[test]
    fn test_delivery_status_display() {
        assert_eq!(DeliveryStatus::Sent.to_string(), "sent");
        assert_eq!(
            DeliveryStatus::Failed("auth".to_string()).to_string(),
            "failed (auth)"
        );
    }
}
