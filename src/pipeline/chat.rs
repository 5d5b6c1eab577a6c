//! Chat-completion client: send one prompt, get one answer.
//!
//! [`ChatClient`] is the seam the map and reduce stages talk to. The
//! production implementation, [`LlmChatClient`], sits on top of
//! `edgequake-llm` providers; tests substitute scripted clients.
//!
//! Clients never retry. A failed call surfaces immediately as a
//! [`ChatApiError`] and the run aborts, so the caller decides whether a new
//! run is worth it. Every stage goes through [`complete_with_timeout`] so a
//! hung provider cannot stall a run forever.

use crate::config::SummaryModel;
use crate::error::{ChatApiError, ConfigurationError};
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// One chat-completion request.
#[derive(Debug, Clone, Copy)]
pub struct ChatRequest<'a> {
    /// Rendered user prompt. Must not be blank.
    pub prompt: &'a str,
    /// System message; an empty string sends no system turn.
    pub system_message: &'a str,
    pub model: SummaryModel,
    /// Output-token ceiling enforced by the provider.
    pub max_tokens: Option<usize>,
    pub temperature: Option<f32>,
}

impl ChatRequest<'_> {
    pub fn validate(&self) -> Result<(), ChatApiError> {
        if self.prompt.trim().is_empty() {
            return Err(ChatApiError::InvalidRequest("prompt is empty".into()));
        }
        Ok(())
    }
}

/// A chat-completion backend.
///
/// The returned text is treated as opaque by the pipeline.
pub trait ChatClient: Send + Sync {
    fn complete(
        &self,
        request: ChatRequest<'_>,
    ) -> impl Future<Output = Result<String, ChatApiError>> + Send;
}

/// Validate `request`, then run it against `client` under `timeout`.
pub async fn complete_with_timeout<C: ChatClient>(
    client: &C,
    request: ChatRequest<'_>,
    timeout: Duration,
) -> Result<String, ChatApiError> {
    request.validate()?;
    match tokio::time::timeout(timeout, client.complete(request)).await {
        Ok(result) => result,
        Err(_) => {
            warn!("Chat call to {} timed out after {:?}", request.model, timeout);
            Err(ChatApiError::Timeout {
                model: request.model.to_string(),
                timeout,
            })
        }
    }
}

/// [`ChatClient`] over `edgequake-llm` providers.
///
/// `edgequake-llm` binds the model when a provider is created, so one
/// provider per [`SummaryModel`] is created up front. Creation reads the
/// provider's API key from the environment; failures surface as
/// [`ConfigurationError`] at startup rather than in the middle of a run.
pub struct LlmChatClient {
    provider_name: String,
    providers: HashMap<SummaryModel, Arc<dyn LLMProvider>>,
    /// Used for every model when set.
    fixed: Option<Arc<dyn LLMProvider>>,
}

impl LlmChatClient {
    /// Create providers for every supported model on the named provider
    /// (e.g. `"openai"`).
    pub fn new(provider_name: impl Into<String>) -> Result<Self, ConfigurationError> {
        let provider_name = provider_name.into();
        let mut providers = HashMap::new();
        for model in SummaryModel::ALL {
            let provider = ProviderFactory::create_llm_provider(&provider_name, model.id())
                .map_err(|e| ConfigurationError::ProviderNotConfigured {
                    provider: provider_name.clone(),
                    hint: format!("{e}"),
                })?;
            providers.insert(model, provider);
        }
        debug!(
            "Created {} '{}' providers",
            providers.len(),
            provider_name
        );
        Ok(Self {
            provider_name,
            providers,
            fixed: None,
        })
    }

    /// Use a pre-built provider for every model. Useful when the caller
    /// needs custom middleware or a non-default endpoint.
    pub fn with_provider(provider: Arc<dyn LLMProvider>) -> Self {
        Self {
            provider_name: "custom".to_string(),
            providers: HashMap::new(),
            fixed: Some(provider),
        }
    }

    pub fn provider_name(&self) -> &str {
        &self.provider_name
    }

    fn provider_for(&self, model: SummaryModel) -> Result<Arc<dyn LLMProvider>, ChatApiError> {
        if let Some(ref provider) = self.fixed {
            return Ok(Arc::clone(provider));
        }
        self.providers
            .get(&model)
            .cloned()
            .ok_or_else(|| ChatApiError::InvalidRequest(format!("no provider for model {model}")))
    }
}

impl std::fmt::Debug for LlmChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmChatClient")
            .field("provider_name", &self.provider_name)
            .field("models", &self.providers.keys().collect::<Vec<_>>())
            .field("fixed", &self.fixed.as_ref().map(|_| "<dyn LLMProvider>"))
            .finish()
    }
}

impl ChatClient for LlmChatClient {
    async fn complete(&self, request: ChatRequest<'_>) -> Result<String, ChatApiError> {
        let provider = self.provider_for(request.model)?;

        let mut messages = Vec::with_capacity(2);
        if !request.system_message.is_empty() {
            messages.push(ChatMessage::system(request.system_message));
        }
        messages.push(ChatMessage::user(request.prompt));

        let options = CompletionOptions {
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            ..Default::default()
        };

        let response = provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| classify_error(&self.provider_name, &e.to_string()))?;

        debug!(
            "{}: {} input tokens, {} output tokens",
            request.model, response.prompt_tokens, response.completion_tokens
        );

        if response.content.trim().is_empty() {
            return Err(ChatApiError::MalformedResponse {
                model: request.model.to_string(),
                detail: "empty completion".into(),
            });
        }
        Ok(response.content)
    }
}

/// Map a provider error message onto the [`ChatApiError`] taxonomy.
///
/// Providers only expose a formatted message, so classification is by
/// well-known status codes and phrases.
pub fn classify_error(provider: &str, message: &str) -> ChatApiError {
    let lower = message.to_lowercase();
    let has = |needles: &[&str]| needles.iter().any(|n| lower.contains(n));

    let detail = message.to_string();
    let provider = provider.to_string();

    if has(&["401", "403", "unauthorized", "authentication", "api key", "forbidden"]) {
        ChatApiError::Authentication { provider, detail }
    } else if has(&["429", "rate limit", "rate_limit", "quota", "too many requests"]) {
        ChatApiError::RateLimited { provider, detail }
    } else if has(&["connect", "network", "dns", "timed out", "timeout", "broken pipe"]) {
        ChatApiError::Network { provider, detail }
    } else if has(&["parse", "deserializ", "invalid response", "malformed", "unexpected response"]) {
        ChatApiError::MalformedResponse {
            model: provider,
            detail,
        }
    } else {
        ChatApiError::Api { message: detail }
    }
}
