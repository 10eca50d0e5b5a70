//! LLM transport: the single seam between the pipeline and a model API.
//!
//! [`PolicyTransport`] takes a fully built request (prompts, optional page
//! images, sampling parameters) and returns raw response text plus token
//! usage. The extractor never talks to a provider directly, so tests inject
//! a fake transport and production wraps any `edgequake_llm::LLMProvider` in
//! [`ProviderTransport`].
//!
//! Timeouts are applied by the caller, not the transport.

use crate::error::TransportError;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider};
use futures::future::BoxFuture;
use std::sync::Arc;
use tracing::debug;

/// One chat-completion request.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub system_prompt: String,
    pub user_prompt: String,
    /// Page images attached to the user message (vision mode).
    pub images: Vec<ImageData>,
    pub temperature: f32,
    pub max_tokens: usize,
    /// Ask the provider for a bare JSON object.
    pub json_mode: bool,
}

/// Raw response text plus token usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransportResponse {
    pub content: String,
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
}

/// Sends one request to a language model.
pub trait PolicyTransport: Send + Sync {
    fn complete<'a>(
        &'a self,
        request: &'a TransportRequest,
    ) -> BoxFuture<'a, Result<TransportResponse, TransportError>>;

    /// Model id the transport calls, when it knows it.
    fn model(&self) -> Option<&str> {
        None
    }
}

/// Transport backed by an `edgequake_llm` provider.
pub struct ProviderTransport {
    provider: Arc<dyn LLMProvider>,
}

impl ProviderTransport {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }
}

impl std::fmt::Debug for ProviderTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderTransport").finish_non_exhaustive()
    }
}

impl PolicyTransport for ProviderTransport {
    fn model(&self) -> Option<&str> {
        Some(self.provider.model())
    }

    fn complete<'a>(
        &'a self,
        request: &'a TransportRequest,
    ) -> BoxFuture<'a, Result<TransportResponse, TransportError>> {
        Box::pin(async move {
            let messages = build_messages(request);
            let options = build_options(request);

            let response = self
                .provider
                .chat(&messages, Some(&options))
                .await
                .map_err(|e| TransportError::from_provider_message(e.to_string()))?;

            debug!(
                "LLM: {} input tokens, {} output tokens",
                response.prompt_tokens, response.completion_tokens
            );

            if response.content.trim().is_empty() {
                return Err(TransportError::EmptyResponse);
            }

            Ok(TransportResponse {
                content: response.content,
                prompt_tokens: response.prompt_tokens,
                completion_tokens: response.completion_tokens,
            })
        })
    }
}

/// System message, then the user turn (with images when present).
fn build_messages(request: &TransportRequest) -> Vec<ChatMessage> {
    let user = if request.images.is_empty() {
        ChatMessage::user(request.user_prompt.as_str())
    } else {
        ChatMessage::user_with_images(request.user_prompt.as_str(), request.images.clone())
    };
    vec![ChatMessage::system(request.system_prompt.as_str()), user]
}

fn build_options(request: &TransportRequest) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(request.temperature),
        max_tokens: Some(request.max_tokens),
        response_format: request.json_mode.then(|| "json_object".to_string()),
        ..Default::default()
    }
}
