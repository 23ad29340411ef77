//! Model interaction: the completion-service seam and the Summarization
//! Adapter built on it.
//!
//! Passes never talk to a provider directly. They hold an
//! `Arc<dyn CompletionService>` constructed once at startup and injected
//! into the [`crate::enrich::Enricher`], so tests can substitute a scripted
//! service. [`ProviderCompletion`] is the production implementation on top
//! of `edgequake-llm`.
//!
//! There is exactly one attempt per call; a failed call becomes a sentinel
//! in the owning pass.

use crate::cell::Cell;
use crate::config::EnrichConfig;
use crate::error::{EnrichError, RowError};
use crate::pipeline::normalize::clean_response;
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use futures::future::BoxFuture;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Content sent alongside the instruction.
#[derive(Debug, Clone)]
pub enum Attachment {
    /// Extracted page text.
    Text(String),
    /// Rendered pages, in page order.
    Images(Vec<ImageData>),
}

/// One completion call.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub instruction: String,
    pub attachment: Option<Attachment>,
}

impl CompletionRequest {
    /// An instruction with nothing attached.
    pub fn prompt(instruction: impl Into<String>) -> Self {
        Self {
            instruction: instruction.into(),
            attachment: None,
        }
    }

    pub fn with_attachment(instruction: impl Into<String>, attachment: Attachment) -> Self {
        Self {
            instruction: instruction.into(),
            attachment: Some(attachment),
        }
    }
}

/// The generative completion collaborator.
pub trait CompletionService: Send + Sync {
    /// Return the raw completion text.
    fn complete(&self, request: CompletionRequest) -> BoxFuture<'_, Result<String, RowError>>;
}

/// [`CompletionService`] backed by an `edgequake-llm` provider.
pub struct ProviderCompletion {
    provider: Arc<dyn LLMProvider>,
    options: CompletionOptions,
    timeout: Duration,
}

impl ProviderCompletion {
    pub fn new(provider: Arc<dyn LLMProvider>, config: &EnrichConfig) -> Self {
        Self {
            provider,
            options: build_options(config),
            timeout: Duration::from_secs(config.api_timeout_secs),
        }
    }

    async fn call(&self, request: CompletionRequest) -> Result<String, RowError> {
        let messages = build_messages(request);
        let start = Instant::now();

        let response = tokio::time::timeout(self.timeout, self.provider.chat(&messages, Some(&self.options)))
            .await
            .map_err(|_| RowError::LlmTimeout {
                secs: self.timeout.as_secs(),
            })?
            .map_err(|e| RowError::LlmFailed(e.to_string()))?;

        debug!(
            "LLM: {} input tokens, {} output tokens, {:?}",
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );
        Ok(response.content)
    }
}

impl CompletionService for ProviderCompletion {
    fn complete(&self, request: CompletionRequest) -> BoxFuture<'_, Result<String, RowError>> {
        Box::pin(self.call(request))
    }
}

/// Instruction first, then the material it refers to, all in one user turn.
fn build_messages(request: CompletionRequest) -> Vec<ChatMessage> {
    match request.attachment {
        None => vec![ChatMessage::user(request.instruction)],
        Some(Attachment::Text(text)) => vec![ChatMessage::user(format!(
            "{}\n\n{}",
            request.instruction, text
        ))],
        Some(Attachment::Images(images)) => {
            vec![ChatMessage::user_with_images(request.instruction, images)]
        }
    }
}

/// Build `CompletionOptions` from the run config.
fn build_options(config: &EnrichConfig) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(config.temperature),
        max_tokens: Some(config.max_tokens),
        ..Default::default()
    }
}

/// The Summarization Adapter: one model call with a fixed instruction,
/// answered as a trimmed value or the Failed sentinel.
#[derive(Clone)]
pub struct Summarizer {
    service: Arc<dyn CompletionService>,
}

impl Summarizer {
    pub fn new(service: Arc<dyn CompletionService>) -> Self {
        Self { service }
    }

    /// Extraction call: errors and blank answers both become [`Cell::Failed`].
    pub async fn summarize(&self, instruction: &str, attachment: Attachment) -> Cell {
        match self.ask(CompletionRequest::with_attachment(instruction, attachment)).await {
            Ok(answer) => Cell::from_response(&answer),
            Err(e) => {
                warn!("Extraction call failed: {}", e);
                Cell::Failed
            }
        }
    }

    /// Raw call with cleanup applied; the caller decides what an error means.
    pub async fn ask(&self, request: CompletionRequest) -> Result<String, RowError> {
        let answer = self.service.complete(request).await?;
        Ok(clean_response(&answer))
    }
}

/// Environment variable holding the API key for a provider, when it needs one.
pub fn credential_var(provider: &str) -> Option<&'static str> {
    match provider.to_ascii_lowercase().as_str() {
        "gemini" | "google" => Some("GEMINI_API_KEY"),
        "openai" => Some("OPENAI_API_KEY"),
        "anthropic" => Some("ANTHROPIC_API_KEY"),
        "mistral" => Some("MISTRAL_API_KEY"),
        _ => None,
    }
}

/// Fail fast when the provider's credential is absent or empty.
pub fn check_credential(
    provider: &str,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<(), EnrichError> {
    let Some(var) = credential_var(provider) else {
        return Ok(());
    };
    match lookup(var) {
        Some(v) if !v.trim().is_empty() => Ok(()),
        _ => Err(EnrichError::ProviderNotConfigured {
            provider: provider.to_string(),
            hint: format!("Environment variable {var} is not set."),
        }),
    }
}

/// Resolve the LLM provider once for the whole process.
///
/// 1. **Pre-built provider** (`config.provider`) is used as-is.
/// 2. Otherwise the named provider (default `gemini`) is created with the
///    configured model, after checking its API key is present.
pub fn resolve_provider(config: &EnrichConfig) -> Result<Arc<dyn LLMProvider>, EnrichError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    let name = config.provider_name();
    check_credential(name, |var| std::env::var(var).ok())?;

    ProviderFactory::create_llm_provider(name, config.model()).map_err(|e| {
        EnrichError::ProviderNotConfigured {
            provider: name.to_string(),
            hint: format!("{e}"),
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct Scripted {
        answer: Result<String, RowError>,
        seen: Mutex<Vec<CompletionRequest>>,
    }

    impl CompletionService for Scripted {
        fn complete(&self, request: CompletionRequest) -> BoxFuture<'_, Result<String, RowError>> {
            self.seen.lock().unwrap().push(request);
            let answer = self.answer.clone();
            Box::pin(async move { answer })
        }
    }

    fn summarizer(answer: Result<String, RowError>) -> (Summarizer, Arc<Scripted>) {
        let svc = Arc::new(Scripted {
            answer,
            seen: Mutex::new(Vec::new()),
        });
        (Summarizer::new(svc.clone()), svc)
    }

    #[test]
    fn build_options_defaults() {
        let opts = build_options(&EnrichConfig::default());
        assert_eq!(opts.temperature, Some(0.1));
        assert_eq!(opts.max_tokens, Some(1024));
    }

    #[test]
    fn text_attachment_follows_instruction() {
        let messages = build_messages(CompletionRequest::with_attachment(
            "抽出してください",
            Attachment::Text("本文".into()),
        ));
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "抽出してください\n\n本文");
    }

    #[tokio::test]
    async fn summarize_trims_answer() {
        let (s, svc) = summarizer(Ok("  ソニーグループ \n".into()));
        let cell = s.summarize("p", Attachment::Text("t".into())).await;
        assert_eq!(cell, Cell::Value("ソニーグループ".into()));
        assert_eq!(svc.seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn summarize_maps_blank_and_errors_to_failed() {
        let (s, _) = summarizer(Ok("   ".into()));
        assert_eq!(s.summarize("p", Attachment::Text("t".into())).await, Cell::Failed);

        let (s, _) = summarizer(Err(RowError::LlmFailed("503".into())));
        assert_eq!(s.summarize("p", Attachment::Text("t".into())).await, Cell::Failed);
    }

    #[test]
    fn missing_credential_is_fatal() {
        let err = check_credential("gemini", |_| None).unwrap_err();
        assert!(err.to_string().contains("GEMINI_API_KEY"));
        assert!(check_credential("gemini", |_| Some("   ".into())).is_err());
        assert!(check_credential("gemini", |_| Some("key".into())).is_ok());
        assert!(check_credential("ollama", |_| None).is_ok());
    }
}
