//! Optional LLM enricher: hypothetical-question generation (spec §4.6,
//! §9 design notes).
//!
//! Providers plug in through a factory that returns either a working
//! provider or a null provider; the orchestrator remains ignorant of
//! provider identity. Failures are logged and swallowed — the parent is
//! persisted without LLM-derived fields.

use async_trait::async_trait;
use tracing::warn;

/// Per-request budget for LLM calls (spec §5): a timeout here triggers
/// graceful degradation rather than job failure.
pub const LLM_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Debug)]
pub enum LlmError {
    Timeout,
    ProviderError(String),
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmError::Timeout => write!(f, "LLM request timed out"),
            LlmError::ProviderError(msg) => write!(f, "LLM provider error: {msg}"),
        }
    }
}

/// A provider capable of generating hypothetical questions a chunk would
/// answer, used to improve retrieval recall.
#[async_trait]
pub trait HypotheticalQuestionProvider: Send + Sync {
    async fn generate(&self, chunk_text: &str, max_questions: usize) -> Result<Vec<String>, LlmError>;
}

/// Returns no questions and never errs; selected when the LLM enricher
/// is disabled or no working provider is configured.
pub struct NullProvider;

#[async_trait]
impl HypotheticalQuestionProvider for NullProvider {
    async fn generate(&self, _chunk_text: &str, _max_questions: usize) -> Result<Vec<String>, LlmError> {
        Ok(Vec::new())
    }
}

/// Selects the provider for a run. Returns the null provider whenever
/// hypothetical-question generation is disabled, keeping the orchestrator
/// ignorant of whether a real provider exists.
pub fn provider_factory(enabled: bool, working: Option<Box<dyn HypotheticalQuestionProvider>>) -> Box<dyn HypotheticalQuestionProvider> {
    if enabled {
        working.unwrap_or_else(|| Box::new(NullProvider))
    } else {
        Box::new(NullProvider)
    }
}

/// Runs the enricher over one parent's text, swallowing failures.
pub async fn enrich_with_questions(
    provider: &dyn HypotheticalQuestionProvider,
    chunk_text: &str,
    max_questions: usize,
) -> Vec<String> {
    match tokio::time::timeout(
        std::time::Duration::from_secs(LLM_REQUEST_TIMEOUT_SECS),
        provider.generate(chunk_text, max_questions),
    )
    .await
    {
        Ok(Ok(questions)) => questions,
        Ok(Err(err)) => {
            warn!(error = %err, "LLM enrichment failed, degrading gracefully");
            Vec::new()
        }
        Err(_) => {
            warn!("LLM enrichment timed out, degrading gracefully");
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingProvider;

    #[async_trait]
    impl HypotheticalQuestionProvider for FailingProvider {
        async fn generate(&self, _chunk_text: &str, _max_questions: usize) -> Result<Vec<String>, LlmError> {
            Err(LlmError::ProviderError("503".to_string()))
        }
    }

    #[tokio::test]
    async fn disabled_enricher_uses_null_provider() {
        let provider = provider_factory(false, Some(Box::new(FailingProvider)));
        let questions = enrich_with_questions(provider.as_ref(), "some text", 3).await;
        assert!(questions.is_empty());
    }

    #[tokio::test]
    async fn failing_provider_degrades_gracefully() {
        let provider = provider_factory(true, Some(Box::new(FailingProvider)));
        let questions = enrich_with_questions(provider.as_ref(), "some text", 3).await;
        assert!(questions.is_empty());
    }
}
