//! Configuration validation with range checks.

use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "retry.max_attempts must be > 0".into(),
            ));
        }
        if self.limits.http_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.http_timeout_ms must be > 0".into(),
            ));
        }
        if self.limits.llm_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.llm_timeout_ms must be > 0".into(),
            ));
        }
        if self.limits.max_download_mb == 0 {
            return Err(ConfigError::ValidationError(
                "limits.max_download_mb must be > 0".into(),
            ));
        }
        if self.llm.holiday_attempts == 0 {
            return Err(ConfigError::ValidationError(
                "llm.holiday_attempts must be > 0".into(),
            ));
        }
        if !matches!(self.llm.provider.as_str(), "anthropic" | "openai") {
            return Err(ConfigError::ValidationError(format!(
                "llm.provider must be \"anthropic\" or \"openai\", got \"{}\"",
                self.llm.provider
            )));
        }
        if self.replicate.poll_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "replicate.poll_interval_ms must be > 0".into(),
            ));
        }
        if self.image.primary_model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "image.primary_model must not be empty".into(),
            ));
        }
        if self.control.depth_enabled && self.control.depth_model.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "control.depth_model must not be empty when depth is enabled".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.image.control_strength) {
            return Err(ConfigError::ValidationError(
                "image.control_strength must be between 0.0 and 1.0".into(),
            ));
        }
        if !(1..=100).contains(&self.image.output_quality) {
            return Err(ConfigError::ValidationError(
                "image.output_quality must be between 1 and 100".into(),
            ));
        }
        if self.image.steps == 0 {
            return Err(ConfigError::ValidationError(
                "image.steps must be > 0".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_passes_validation() {
        let config = Config::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_timeout() {
        let mut config = Config::default();
        config.limits.http_timeout_ms = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("http_timeout_ms"));
    }

    #[test]
    fn test_validate_rejects_unknown_provider() {
        let mut config = Config::default();
        config.llm.provider = "ollama".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("llm.provider"));
    }

    #[test]
    fn test_validate_rejects_invalid_control_strength() {
        let mut config = Config::default();
        config.image.control_strength = 1.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("control_strength"));

        config.image.control_strength = -0.1;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("control_strength"));
    }

    #[test]
    fn test_validate_allows_empty_depth_model_when_disabled() {
        let mut config = Config::default();
        config.control.depth_model = String::new();
        assert!(config.validate().is_err());

        config.control.depth_enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_out_of_range_quality() {
        let mut config = Config::default();
        config.image.output_quality = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("output_quality"));
    }
}
