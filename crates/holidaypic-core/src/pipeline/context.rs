//! Values threaded from stage to stage.

use crate::control::ControlImageRef;
use crate::delivery::DeliveryStatus;
use crate::holiday::HolidayRecord;
use crate::image::ModelUsed;
use chrono::NaiveDate;
use std::path::PathBuf;

/// Per-run state passed explicitly between stages.
///
/// `source_image` is what the operator asked for; `control_image` is what the
/// image model receives. They differ only after a successful depth rewrite.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunContext {
    pub date: NaiveDate,
    pub source_image: ControlImageRef,
    pub control_image: ControlImageRef,
}

impl RunContext {
    pub fn new(date: NaiveDate, source_image: ControlImageRef) -> Self {
        Self {
            date,
            control_image: source_image.clone(),
            source_image,
        }
    }

    /// Replace the control image with a depth map data URI.
    ///
    /// Only the first rewrite takes effect.
    pub fn with_depth_map(mut self, data_uri: String) -> Self {
        if self.has_depth_map() {
            tracing::warn!("Control image already replaced by a depth map; keeping the first one");
            return self;
        }
        self.control_image = ControlImageRef::DataUri(data_uri);
        self
    }

    pub fn has_depth_map(&self) -> bool {
        self.control_image != self.source_image
    }
}

/// Outcome of a full run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub holiday: HolidayRecord,
    pub prompt: String,
    pub model: ModelUsed,
    pub image_url: String,
    pub saved_to: PathBuf,
    pub email: DeliveryStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> RunContext {
        RunContext::new(
            NaiveDate::from_ymd_opt(2025, 3, 3).unwrap(),
            ControlImageRef::Url("https://example.com/logo.jpg".to_string()),
        )
    }

    #[test]
    fn test_new_context_uses_source_as_control() {
        let ctx = context();
        assert_eq!(ctx.control_image, ctx.source_image);
        assert!(!ctx.has_depth_map());
    }

    #[test]
    fn test_only_first_depth_rewrite_applies() {
        let ctx = context()
            .with_depth_map("data:image/png;base64,AAAA".to_string())
            .with_depth_map("data:image/png;base64,BBBB".to_string());
        assert!(ctx.has_depth_map());
        assert_eq!(
            ctx.control_image,
            ControlImageRef::DataUri("data:image/png;base64,AAAA".to_string())
        );
        assert_eq!(
            ctx.source_image,
            ControlImageRef::Url("https://example.com/logo.jpg".to_string())
        );
    }
}
