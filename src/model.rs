//! Model seams: the traits every stage talks to, and their
//! `edgequake-llm` adapters.
//!
//! Stages never hold an `LLMProvider` directly. They build a
//! [`CompletionRequest`] and hand it to a [`LanguageModel`]; the knowledge
//! base embeds through an [`Embedder`]. Production code wraps the providers
//! returned by `ProviderFactory`; tests plug in scripted fakes without any
//! network access.

use crate::error::SoilError;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, EmbeddingProvider, ImageData, LLMProvider};
use std::fmt;
use std::sync::Arc;

/// One chat completion: a system prompt, a user turn, optional images.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    /// Stage name used in logs and errors ("extraction", "summary-wo", …).
    pub stage: String,
    pub system: String,
    pub user: String,
    /// Page images for the vision OCR fallback; empty for text stages.
    pub images: Vec<ImageData>,
    pub temperature: f32,
    pub max_tokens: usize,
}

impl CompletionRequest {
    pub fn new(stage: impl Into<String>, system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            stage: stage.into(),
            system: system.into(),
            user: user.into(),
            images: Vec::new(),
            temperature: 0.3,
            max_tokens: 4096,
        }
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.temperature = t;
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.max_tokens = n;
        self
    }

    pub fn images(mut self, images: Vec<ImageData>) -> Self {
        self.images = images;
        self
    }
}

/// The model's answer.
#[derive(Debug, Clone, Default)]
pub struct Completion {
    pub content: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
}

impl Completion {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }
}

/// Anything that can answer a [`CompletionRequest`].
///
/// Implementations make exactly one attempt; retries and timeouts are applied
/// by [`crate::pipeline::llm::complete`].
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, SoilError>;
}

/// Anything that can turn texts into embedding vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SoilError>;
}

// ── edgequake-llm adapters ───────────────────────────────────────────────

/// [`LanguageModel`] backed by an `edgequake-llm` chat provider.
#[derive(Clone)]
pub struct ProviderModel {
    provider: Arc<dyn LLMProvider>,
}

impl ProviderModel {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }
}

impl fmt::Debug for ProviderModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderModel")
            .field("provider", &"<dyn LLMProvider>")
            .finish()
    }
}

#[async_trait]
impl LanguageModel for ProviderModel {
    async fn complete(&self, request: &CompletionRequest) -> Result<Completion, SoilError> {
        let user = if request.images.is_empty() {
            ChatMessage::user(&request.user)
        } else {
            ChatMessage::user_with_images(&request.user, request.images.clone())
        };
        let messages = vec![ChatMessage::system(&request.system), user];
        let options = CompletionOptions {
            temperature: Some(request.temperature),
            max_tokens: Some(request.max_tokens),
            ..Default::default()
        };

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| SoilError::LlmApiError {
                stage: request.stage.clone(),
                message: e.to_string(),
            })?;

        Ok(Completion {
            content: response.content,
            input_tokens: response.prompt_tokens,
            output_tokens: response.completion_tokens,
        })
    }
}

/// [`Embedder`] backed by an `edgequake-llm` embedding provider.
#[derive(Clone)]
pub struct ProviderEmbedder {
    provider: Arc<dyn EmbeddingProvider>,
}

impl ProviderEmbedder {
    pub fn new(provider: Arc<dyn EmbeddingProvider>) -> Self {
        Self { provider }
    }
}

impl fmt::Debug for ProviderEmbedder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderEmbedder")
            .field("provider", &"<dyn EmbeddingProvider>")
            .finish()
    }
}

#[async_trait]
impl Embedder for ProviderEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, SoilError> {
        self.provider
            .embed(texts)
            .await
            .map_err(|e| SoilError::EmbeddingFailed(e.to_string()))
    }
}
