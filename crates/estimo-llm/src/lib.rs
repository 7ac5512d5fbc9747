//! Embedding and generation provider abstraction and backend implementations.

pub mod any;
pub mod error;
pub(crate) mod http;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod ollama;
pub mod openai;
pub mod provider;
pub(crate) mod sse;

pub use any::AnyProvider;
pub use error::LlmError;
pub use provider::{ChatStream, GenerationConfig, LlmProvider, Message, Role};
