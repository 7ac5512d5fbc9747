#[cfg(any(test, feature = "mock"))]
use crate::mock::MockProvider;
use crate::ollama::OllamaProvider;
use crate::openai::OpenAiProvider;

use crate::error::LlmError;
use crate::provider::{ChatStream, LlmProvider, Message};

/// Generates a match over all `AnyProvider` variants, binding the inner provider
/// and evaluating the given expression for each arm.
macro_rules! delegate_provider {
    ($self:expr, |$p:ident| $expr:expr) => {
        match $self {
            AnyProvider::Ollama($p) => $expr,
            AnyProvider::OpenAi($p) => $expr,
            #[cfg(any(test, feature = "mock"))]
            AnyProvider::Mock($p) => $expr,
        }
    };
}

#[derive(Debug, Clone)]
pub enum AnyProvider {
    Ollama(OllamaProvider),
    OpenAi(OpenAiProvider),
    #[cfg(any(test, feature = "mock"))]
    Mock(MockProvider),
}

impl LlmProvider for AnyProvider {
    async fn chat(&self, messages: &[Message]) -> Result<String, LlmError> {
        delegate_provider!(self, |p| p.chat(messages).await)
    }

    async fn chat_stream(&self, messages: &[Message]) -> Result<ChatStream, LlmError> {
        delegate_provider!(self, |p| p.chat_stream(messages).await)
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        delegate_provider!(self, |p| p.embed(text).await)
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        delegate_provider!(self, |p| p.embed_batch(texts).await)
    }

    fn supports_embeddings(&self) -> bool {
        delegate_provider!(self, |p| p.supports_embeddings())
    }

    fn name(&self) -> &str {
        delegate_provider!(self, |p| p.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::GenerationConfig;

    fn ollama() -> AnyProvider {
        AnyProvider::Ollama(OllamaProvider::new(
            "http://localhost:11434",
            "test".into(),
            "embed".into(),
        ))
    }

    #[test]
    fn any_ollama_delegates() {
        let provider = ollama();
        assert_eq!(provider.name(), "ollama");
        assert!(provider.supports_embeddings());
    }

    #[test]
    fn any_openai_delegates() {
        let provider = AnyProvider::OpenAi(OpenAiProvider::new(
            "key".into(),
            "https://api.example.com/v1".into(),
            GenerationConfig::new("m"),
            None,
        ));
        assert_eq!(provider.name(), "openai");
        assert!(!provider.supports_embeddings());
    }

    #[tokio::test]
    async fn any_mock_chat_and_embed_batch() {
        let provider = AnyProvider::Mock(
            MockProvider::with_responses(vec!["answer".into()]).with_dimension(4),
        );
        assert_eq!(
            provider.chat(&[Message::user("q")]).await.unwrap(),
            "answer"
        );
        let vectors = provider
            .embed_batch(&["x".to_owned(), "y".to_owned()])
            .await
            .unwrap();
        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0].len(), 4);
    }

    #[test]
    fn any_provider_debug_hides_key() {
        let provider = AnyProvider::OpenAi(OpenAiProvider::new(
            "super-secret".into(),
            "https://api.example.com/v1".into(),
            GenerationConfig::new("m"),
            None,
        ));
        assert!(!format!("{provider:?}").contains("super-secret"));
    }
}
