//! Error types for the holiday picture pipeline.
//!
//! Errors are organized by stage so the operator can tell which external
//! service failed and whether the failure was transient.

use thiserror::Error;

/// Top-level error type for holidaypic operations.
#[derive(Error, Debug)]
pub enum HolidayPicError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Pipeline stage errors
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    /// A required credential could not be resolved
    #[error("Missing credential: {0}")]
    MissingCredential(String),
}

/// Why a holiday response could not be decoded into a record.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HolidayDecodeError {
    /// The model wrapped its answer in a markdown code fence
    #[error("response is wrapped in a code fence")]
    CodeFence,

    /// The response is not valid JSON or does not match the record schema
    #[error("invalid holiday JSON: {0}")]
    Schema(String),

    /// A required field is present but empty
    #[error("field `{0}` is empty")]
    EmptyField(&'static str),
}

/// Pipeline errors, organized by stage.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Text-generation call failed
    #[error("LLM error: {message}")]
    Llm {
        message: String,
        status_code: Option<u16>,
    },

    /// Holiday response could not be decoded
    #[error("Holiday decode failed: {source}")]
    HolidayDecode {
        source: HolidayDecodeError,
        raw: String,
    },

    /// Image or depth model call failed
    #[error("Image service error ({model}): {message}")]
    ImageService {
        model: String,
        message: String,
        status_code: Option<u16>,
    },

    /// Remote download failed or returned a non-success status
    #[error("Download failed for {url}: {message}")]
    Download {
        url: String,
        message: String,
        status_code: Option<u16>,
    },

    /// Control image reference could not be read or interpreted
    #[error("Control image error for {reference}: {message}")]
    ControlImage { reference: String, message: String },

    /// Could not reach the remote host
    #[error("Connection to {target} failed: {message}")]
    Connection { target: String, message: String },

    /// Operation timed out
    #[error("Timeout in {stage} stage after {timeout_ms}ms")]
    Timeout { stage: String, timeout_ms: u64 },

    /// Writing the generated image failed
    #[error("Failed to save {path}: {source}")]
    Save {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
}

impl PipelineError {
    /// HTTP status code attached to the failure, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            PipelineError::Llm { status_code, .. }
            | PipelineError::ImageService { status_code, .. }
            | PipelineError::Download { status_code, .. } => *status_code,
            _ => None,
        }
    }
}

/// Convenience type alias for holidaypic results.
pub type Result<T> = std::result::Result<T, HolidayPicError>;

/// Convenience type alias for pipeline-specific results.
pub type PipelineResult<T> = std::result::Result<T, PipelineError>;
