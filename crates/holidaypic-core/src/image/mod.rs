//! Hosted image models: generation and depth estimation.

pub(crate) mod generate;
pub(crate) mod replicate;
pub(crate) mod service;

pub use generate::{fallback_input, primary_input, GeneratedImage, ImageOrchestrator, ModelUsed};
pub use replicate::ReplicateService;
pub use service::{output_urls, preferred_url, ImageService};
