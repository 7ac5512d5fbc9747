//! Test-only mock provider.
//!
//! Embeddings are deterministic: each text is hashed into a bag of word
//! buckets and L2-normalized, so texts sharing vocabulary land close together
//! under both cosine and Euclidean distance.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::LlmError;
use crate::provider::{ChatStream, LlmProvider, Message};

pub const DEFAULT_MOCK_DIMENSION: usize = 512;

#[derive(Debug, Clone)]
pub struct MockProvider {
    pub responses: Arc<Mutex<Vec<String>>>,
    pub embedded_texts: Arc<AtomicUsize>,
    pub default_response: String,
    pub dimension: usize,
    /// When set, every text embeds to this vector.
    pub fixed_embedding: Option<Vec<f32>>,
    pub supports_embeddings: bool,
    pub streaming: bool,
    /// Echo the last message back instead of a scripted answer.
    pub echo: bool,
    pub fail_chat: bool,
    pub fail_embed: bool,
    /// Fail any chat or embedding whose input contains this substring.
    pub fail_on: Option<String>,
    /// Milliseconds to sleep before returning a response.
    pub delay_ms: u64,
    /// Restrict `delay_ms` to inputs containing this substring.
    pub delay_on: Option<String>,
}

impl Default for MockProvider {
    fn default() -> Self {
        Self {
            responses: Arc::new(Mutex::new(Vec::new())),
            embedded_texts: Arc::new(AtomicUsize::new(0)),
            default_response: "mock response".into(),
            dimension: DEFAULT_MOCK_DIMENSION,
            fixed_embedding: None,
            supports_embeddings: true,
            streaming: true,
            echo: false,
            fail_chat: false,
            fail_embed: false,
            fail_on: None,
            delay_ms: 0,
            delay_on: None,
        }
    }
}

impl MockProvider {
    #[must_use]
    pub fn with_responses(responses: Vec<String>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail_chat: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn echoing() -> Self {
        Self {
            echo: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = dimension;
        self
    }

    #[must_use]
    pub fn with_fixed_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.fixed_embedding = Some(embedding);
        self
    }

    #[must_use]
    pub fn with_fail_on(mut self, needle: impl Into<String>) -> Self {
        self.fail_on = Some(needle.into());
        self
    }

    #[must_use]
    pub fn with_embed_failure(mut self) -> Self {
        self.fail_embed = true;
        self
    }

    #[must_use]
    pub fn without_streaming(mut self) -> Self {
        self.streaming = false;
        self
    }

    #[must_use]
    pub fn with_delay(mut self, ms: u64) -> Self {
        self.delay_ms = ms;
        self
    }

    #[must_use]
    pub fn with_delay_on(mut self, needle: impl Into<String>, ms: u64) -> Self {
        self.delay_on = Some(needle.into());
        self.delay_ms = ms;
        self
    }

    /// Number of texts embedded so far, shared across clones.
    #[must_use]
    pub fn embedded_count(&self) -> usize {
        self.embedded_texts.load(Ordering::SeqCst)
    }

    async fn pause<'a>(&self, inputs: impl IntoIterator<Item = &'a str>) {
        if self.delay_ms == 0 {
            return;
        }
        if self.delay_on.is_none() || matches_any(self.delay_on.as_deref(), inputs) {
            tokio::time::sleep(std::time::Duration::from_millis(self.delay_ms)).await;
        }
    }

    fn check_embed<'a>(&self, inputs: impl IntoIterator<Item = &'a str>) -> Result<(), LlmError> {
        if !self.supports_embeddings {
            return Err(LlmError::EmbedUnsupported {
                provider: "mock".into(),
            });
        }
        if self.fail_embed {
            return Err(LlmError::Other("mock embedding error".into()));
        }
        if matches_any(self.fail_on.as_deref(), inputs) {
            return Err(LlmError::Other("mock embedding error on matched input".into()));
        }
        Ok(())
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        match &self.fixed_embedding {
            Some(v) => v.clone(),
            None => hashed_embedding(text, self.dimension),
        }
    }
}

impl LlmProvider for MockProvider {
    async fn chat(&self, messages: &[Message]) -> Result<String, LlmError> {
        self.pause(messages.iter().map(|m| m.content.as_str())).await;
        if self.fail_chat {
            return Err(LlmError::Other("mock LLM error".into()));
        }
        if matches_any(
            self.fail_on.as_deref(),
            messages.iter().map(|m| m.content.as_str()),
        ) {
            return Err(LlmError::Other("mock LLM error on matched input".into()));
        }
        if self.echo {
            return Ok(messages
                .last()
                .map(|m| m.content.clone())
                .unwrap_or_default());
        }
        let mut responses = self
            .responses
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if responses.is_empty() {
            Ok(self.default_response.clone())
        } else {
            Ok(responses.remove(0))
        }
    }

    async fn chat_stream(&self, messages: &[Message]) -> Result<ChatStream, LlmError> {
        let response = self.chat(messages).await?;
        if !self.streaming {
            return Ok(Box::pin(tokio_stream::once(Ok(response))));
        }
        let chunks: Vec<_> = response.chars().map(|c| c.to_string()).map(Ok).collect();
        Ok(Box::pin(tokio_stream::iter(chunks)))
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, LlmError> {
        self.pause([text]).await;
        self.check_embed([text])?;
        self.embedded_texts.fetch_add(1, Ordering::SeqCst);
        Ok(self.vector_for(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        self.pause(texts.iter().map(String::as_str)).await;
        self.check_embed(texts.iter().map(String::as_str))?;
        self.embedded_texts.fetch_add(texts.len(), Ordering::SeqCst);
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }

    fn supports_embeddings(&self) -> bool {
        self.supports_embeddings
    }

    #[allow(clippy::unnecessary_literal_bound)]
    fn name(&self) -> &str {
        "mock"
    }
}

fn matches_any<'a>(needle: Option<&str>, inputs: impl IntoIterator<Item = &'a str>) -> bool {
    needle.is_some_and(|needle| inputs.into_iter().any(|input| input.contains(needle)))
}

/// Hash lowercased word tokens into `dimension` buckets and normalize.
///
/// A trailing plural `s` is dropped from words longer than three characters.
#[must_use]
pub fn hashed_embedding(text: &str, dimension: usize) -> Vec<f32> {
    let mut vector = vec![0.0_f32; dimension];
    if dimension == 0 {
        return vector;
    }
    let lowered = text.to_lowercase();
    for word in lowered
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        let word = match word.strip_suffix('s') {
            Some(stem) if word.chars().count() > 3 => stem,
            _ => word,
        };
        let bucket = usize::try_from(fnv1a(word.as_bytes()) % dimension as u64).unwrap_or(0);
        vector[bucket] += 1.0;
    }
    let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in &mut vector {
            *x /= norm;
        }
    }
    vector
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for b in bytes {
        hash ^= u64::from(*b);
        hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
    }
    hash
}

#[cfg(test)]
mod tests {
    use tokio_stream::StreamExt;

    use super::*;

    fn dot(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[test]
    fn hashed_embedding_is_deterministic_and_normalized() {
        let a = hashed_embedding("push notifications", 64);
        let b = hashed_embedding("push notifications", 64);
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[test]
    fn hashed_embedding_empty_text_is_zero() {
        let v = hashed_embedding("", 16);
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[test]
    fn plural_and_singular_share_bucket() {
        let a = hashed_embedding("notifications", 128);
        let b = hashed_embedding("Notification", 128);
        assert_eq!(a, b);
    }

    #[test]
    fn shared_vocabulary_is_more_similar() {
        let q = hashed_embedding("push notification feature", DEFAULT_MOCK_DIMENSION);
        let near = hashed_embedding("add push notifications", DEFAULT_MOCK_DIMENSION);
        let far = hashed_embedding("calendar booking", DEFAULT_MOCK_DIMENSION);
        assert!(dot(&q, &near) > dot(&q, &far));
    }

    #[tokio::test]
    async fn scripted_responses_then_default() {
        let mock = MockProvider::with_responses(vec!["first".into()]);
        assert_eq!(mock.chat(&[Message::user("a")]).await.unwrap(), "first");
        assert_eq!(
            mock.chat(&[Message::user("b")]).await.unwrap(),
            "mock response"
        );
    }

    #[tokio::test]
    async fn fail_on_matches_substring_only() {
        let mock = MockProvider::default().with_fail_on("boom");
        assert!(mock.chat(&[Message::user("go boom now")]).await.is_err());
        assert!(mock.chat(&[Message::user("all fine")]).await.is_ok());
        assert!(mock.embed("boom").await.is_err());
        assert!(mock.embed("fine").await.is_ok());
        let batch = vec!["fine".to_owned(), "boom".to_owned()];
        assert!(mock.embed_batch(&batch).await.is_err());
        assert_eq!(mock.embedded_count(), 1);
    }

    #[tokio::test]
    async fn delay_on_only_slows_matching_input() {
        let mock = MockProvider::default().with_delay_on("slow", 500);
        let fast = tokio::time::timeout(std::time::Duration::from_millis(100), mock.embed("quick"));
        assert!(fast.await.is_ok());
        let slow = tokio::time::timeout(std::time::Duration::from_millis(20), mock.embed("slow"));
        assert!(slow.await.is_err());
    }

    #[tokio::test]
    async fn echo_returns_last_message() {
        let mock = MockProvider::echoing();
        let answer = mock.chat(&[Message::user("prompt text")]).await.unwrap();
        assert_eq!(answer, "prompt text");
    }

    #[tokio::test]
    async fn stream_yields_one_char_per_fragment() {
        let mock = MockProvider::with_responses(vec!["abc".into()]);
        let stream = mock.chat_stream(&[Message::user("q")]).await.unwrap();
        let fragments: Vec<String> = stream.map(Result::unwrap).collect().await;
        assert_eq!(fragments, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn non_streaming_yields_single_fragment() {
        let mock = MockProvider::with_responses(vec!["abc".into()]).without_streaming();
        let stream = mock.chat_stream(&[Message::user("q")]).await.unwrap();
        let fragments: Vec<String> = stream.map(Result::unwrap).collect().await;
        assert_eq!(fragments, vec!["abc"]);
    }

    #[tokio::test]
    async fn embedded_count_shared_across_clones() {
        let mock = MockProvider::default().with_dimension(8);
        let clone = mock.clone();
        clone
            .embed_batch(&["a".to_owned(), "b".to_owned()])
            .await
            .unwrap();
        mock.embed("c").await.unwrap();
        assert_eq!(mock.embedded_count(), 3);
    }

    #[tokio::test]
    async fn embed_failure_and_unsupported() {
        let failing = MockProvider::default().with_embed_failure();
        assert!(failing.embed("x").await.is_err());
        let unsupported = MockProvider {
            supports_embeddings: false,
            ..MockProvider::default()
        };
        assert!(matches!(
            unsupported.embed("x").await,
            Err(LlmError::EmbedUnsupported { .. })
        ));
    }

    #[tokio::test]
    async fn fixed_embedding_overrides_hashing() {
        let mock = MockProvider::default().with_fixed_embedding(vec![1.0, 2.0]);
        assert_eq!(mock.embed("anything").await.unwrap(), vec![1.0, 2.0]);
    }
}
