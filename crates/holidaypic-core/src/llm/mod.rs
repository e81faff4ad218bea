//! Text-generation providers.
//!
//! Provides a provider abstraction over the Anthropic and OpenAI APIs, used for
//! the holiday query, the foreground object and stylizer queries, and the
//! control-image analysis.

pub(crate) mod anthropic;
pub(crate) mod openai;
pub(crate) mod provider;

pub use provider::{complete, ImageInput, LlmProvider, LlmProviderFactory, LlmRequest, LlmResponse};
