//! Control image references and resolution.
//!
//! A control image guides generation spatially. It can be a remote URL, a
//! local file, or an inline data URI (what the depth preprocessor produces).

use crate::error::{PipelineError, PipelineResult};
use crate::fetch::Fetcher;
use crate::llm::ImageInput;
use std::fmt;
use std::path::PathBuf;

/// Environment variable consulted when no control image is given on the command line.
pub const CONTROL_IMAGE_ENV: &str = "CONTROL_IMAGE";

/// Where the control image lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlImageRef {
    Url(String),
    Path(PathBuf),
    DataUri(String),
}

impl ControlImageRef {
    /// Classify a user-supplied reference string.
    pub fn parse(reference: &str) -> Self {
        let reference = reference.trim();
        if reference.starts_with("data:") {
            Self::DataUri(reference.to_string())
        } else if reference.starts_with("http://") || reference.starts_with("https://") {
            Self::Url(reference.to_string())
        } else {
            Self::Path(PathBuf::from(reference))
        }
    }

    /// The string form a hosted model accepts: URLs and data URIs pass
    /// through, local files are read and inlined as data URIs.
    pub async fn model_input(&self) -> PipelineResult<String> {
        match self {
            Self::Url(url) => Ok(url.clone()),
            Self::DataUri(uri) => Ok(uri.clone()),
            Self::Path(path) => {
                let bytes = tokio::fs::read(path).await.map_err(|e| PipelineError::ControlImage {
                    reference: path.display().to_string(),
                    message: format!("failed to read file: {e}"),
                })?;
                Ok(ImageInput::sniff(&bytes, None).data_url())
            }
        }
    }

    /// Load the image itself, e.g. to show it to a vision model.
    pub async fn load(&self, fetcher: &dyn Fetcher) -> PipelineResult<ImageInput> {
        match self {
            Self::Url(url) => {
                let fetched = fetcher.fetch(url).await?;
                Ok(ImageInput::sniff(&fetched.bytes, fetched.content_type.as_deref()))
            }
            Self::DataUri(uri) => {
                ImageInput::from_data_url(uri).ok_or_else(|| PipelineError::ControlImage {
                    reference: abbreviate(uri),
                    message: "not a base64 data URI".to_string(),
                })
            }
            Self::Path(path) => {
                let bytes = tokio::fs::read(path).await.map_err(|e| PipelineError::ControlImage {
                    reference: path.display().to_string(),
                    message: format!("failed to read file: {e}"),
                })?;
                Ok(ImageInput::sniff(&bytes, None))
            }
        }
    }
}

impl fmt::Display for ControlImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) => write!(f, "{url}"),
            Self::Path(path) => write!(f, "{}", path.display()),
            Self::DataUri(uri) => write!(f, "{}", abbreviate(uri)),
        }
    }
}

/// Data URIs are long; keep only the header for logs.
fn abbreviate(uri: &str) -> String {
    match uri.split_once(',') {
        Some((header, data)) => format!("{header},<{} chars>", data.len()),
        None => uri.chars().take(48).collect(),
    }
}

/// Pick the control image: explicit argument, then environment, then default.
///
/// Blank values count as absent. Never fails.
pub fn resolve_control_image(
    explicit: Option<&str>,
    env_value: Option<&str>,
    default: &str,
) -> ControlImageRef {
    let chosen = [explicit, env_value]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|value| !value.is_empty())
        .unwrap_or(default);
    ControlImageRef::parse(chosen)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_classifies_references() {
        assert_eq!(
            ControlImageRef::parse("https://example.com/logo.jpg"),
            ControlImageRef::Url("https://example.com/logo.jpg".to_string())
        );
        assert_eq!(
            ControlImageRef::parse("data:image/png;base64,AAAA"),
            ControlImageRef::DataUri("data:image/png;base64,AAAA".to_string())
        );
        assert_eq!(
            ControlImageRef::parse("./logo.png"),
            ControlImageRef::Path(PathBuf::from("./logo.png"))
        );
    }

    #[test]
    fn test_resolve_prefers_explicit() {
        let resolved = resolve_control_image(
            Some("https://cli.test/a.png"),
            Some("https://env.test/b.png"),
            "https://default.test/c.png",
        );
        assert_eq!(resolved, ControlImageRef::Url("https://cli.test/a.png".to_string()));
    }

    #[test]
    fn test_resolve_falls_back_to_env_then_default() {
        let resolved =
            resolve_control_image(None, Some("https://env.test/b.png"), "https://default.test/c.png");
        assert_eq!(resolved, ControlImageRef::Url("https://env.test/b.png".to_string()));

        let resolved = resolve_control_image(Some("  "), Some(""), "https://default.test/c.png");
        assert_eq!(resolved, ControlImageRef::Url("https://default.test/c.png".to_string()));
    }

    #[test]
    fn test_display_abbreviates_data_uri() {
        let reference = ControlImageRef::DataUri(format!("data:image/png;base64,{}", "A".repeat(5000)));
        let shown = reference.to_string();
        assert_eq!(shown, "data:image/png;base64,<5000 chars>");
    }

    #[tokio::test]
    async fn test_local_path_becomes_data_uri() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guide.png");
        std::fs::write(&path, [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]).unwrap();

        let input = ControlImageRef::Path(path).model_input().await.unwrap();
        assert!(input.starts_with("data:image/png;base64,"));
    }

    #[tokio::test]
    async fn test_missing_local_path_is_control_image_error() {
        let reference = ControlImageRef::Path(PathBuf::from("/definitely/not/here.png"));
        let err = reference.model_input().await.unwrap_err();
        assert!(matches!(err, PipelineError::ControlImage { .. }));
    }
}
