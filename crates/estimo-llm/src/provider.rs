use std::future::Future;
use std::pin::Pin;

use futures_core::Stream;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;

/// Finite, non-restartable stream of answer fragments in arrival order.
///
/// Dropping the stream releases the underlying connection.
pub type ChatStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Options recognized by the generation backends.
///
/// `model` selects the chat model. `max_tokens` caps the completion length
/// (default 500). `temperature` is forwarded only when set; otherwise the
/// backend default applies.
#[derive(Clone, Debug, PartialEq)]
pub struct GenerationConfig {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: Option<f32>,
}

impl GenerationConfig {
    #[must_use]
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            max_tokens: 500,
            temperature: None,
        }
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: Option<f32>) -> Self {
        self.temperature = temperature;
        self
    }
}

pub trait LlmProvider: Send + Sync {
    /// Send messages to the model and return the complete assistant response.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider fails to communicate or the response is invalid.
    fn chat(&self, messages: &[Message]) -> impl Future<Output = Result<String, LlmError>> + Send;

    /// Send messages and receive the response as incremental fragments.
    ///
    /// # Errors
    ///
    /// Returns an error if the streaming request cannot be started.
    fn chat_stream(
        &self,
        messages: &[Message],
    ) -> impl Future<Output = Result<ChatStream, LlmError>> + Send;

    /// Embed a single text.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider does not support embeddings or the request fails.
    fn embed(&self, text: &str) -> impl Future<Output = Result<Vec<f32>, LlmError>> + Send;

    /// Embed several texts. Output vector `i` belongs to input `i`.
    ///
    /// The default implementation calls [`LlmProvider::embed`] once per text.
    ///
    /// # Errors
    ///
    /// Returns the first embedding error encountered.
    fn embed_batch(
        &self,
        texts: &[String],
    ) -> impl Future<Output = Result<Vec<Vec<f32>>, LlmError>> + Send {
        async move {
            let mut vectors = Vec::with_capacity(texts.len());
            for text in texts {
                vectors.push(self.embed(text).await?);
            }
            Ok(vectors)
        }
    }

    /// Whether [`LlmProvider::embed`] can succeed at all. Checked once at
    /// startup so a generation-only backend fails before indexing.
    fn supports_embeddings(&self) -> bool;

    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use tokio_stream::StreamExt;

    use super::*;

    struct Echo;

    impl LlmProvider for Echo {
        async fn chat(&self, messages: &[Message]) -> Result<String, LlmError> {
            Ok(messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default())
        }

        async fn chat_stream(&self, messages: &[Message]) -> Result<ChatStream, LlmError> {
            let text = self.chat(messages).await?;
            Ok(Box::pin(tokio_stream::once(Ok(text))))
        }

        #[allow(clippy::cast_precision_loss)]
        async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
            Ok(vec![text.len() as f32, 1.0])
        }

        fn supports_embeddings(&self) -> bool {
            true
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    #[tokio::test]
    async fn default_embed_batch_preserves_order() {
        let texts = vec!["a".to_owned(), "abc".to_owned(), "ab".to_owned()];
        let vectors = Echo.embed_batch(&texts).await.unwrap();
        assert_eq!(vectors.len(), 3);
        assert_eq!(vectors[0][0], 1.0);
        assert_eq!(vectors[1][0], 3.0);
        assert_eq!(vectors[2][0], 2.0);
    }

    #[tokio::test]
    async fn default_embed_batch_empty_input() {
        let vectors = Echo.embed_batch(&[]).await.unwrap();
        assert!(vectors.is_empty());
    }

    #[tokio::test]
    async fn single_fragment_stream_yields_whole_answer() {
        let mut stream = Echo.chat_stream(&[Message::user("hi")]).await.unwrap();
        assert_eq!(stream.next().await.unwrap().unwrap(), "hi");
        assert!(stream.next().await.is_none());
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&Role::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
        assert_eq!(Role::System.as_str(), "system");
    }

    #[test]
    fn generation_config_defaults() {
        let cfg = GenerationConfig::new("phi3");
        assert_eq!(cfg.model, "phi3");
        assert_eq!(cfg.max_tokens, 500);
        assert!(cfg.temperature.is_none());
    }

    #[test]
    fn generation_config_builder() {
        let cfg = GenerationConfig::new("m")
            .with_max_tokens(64)
            .with_temperature(Some(0.2));
        assert_eq!(cfg.max_tokens, 64);
        assert_eq!(cfg.temperature, Some(0.2));
    }
}
