//! Answer synthesis: retrieval, external search, prompt composition and
//! one model call.

use crate::format::{format_chunks, format_history};
use crate::retriever::Retriever;
use crate::search::ExternalSearcher;
use crate::types::{Answer, Message, RetrievalResult};
use serde::Serialize;
use std::sync::Arc;
use tracing::Instrument;
use tutor_core::{AppError, AppResult};
use tutor_llm::{LlmClient, LlmRequest};
use tutor_prompt::{PromptComposer, PromptInputs};

/// Default number of distinct chunks placed in the prompt.
pub const DEFAULT_TOP_K: usize = 5;

/// Default sampling temperature for the answer model.
pub const DEFAULT_TEMPERATURE: f32 = 0.0;

/// Pipeline stages, in order. `Failed` is reachable from `Retrieving`,
/// `Prompting` and `ModelCall`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Start,
    Retrieving,
    SearchingExternal,
    Formatting,
    Prompting,
    ModelCall,
    Done,
    Failed,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Start => "start",
            Stage::Retrieving => "retrieving",
            Stage::SearchingExternal => "searching_external",
            Stage::Formatting => "formatting",
            Stage::Prompting => "prompting",
            Stage::ModelCall => "model_call",
            Stage::Done => "done",
            Stage::Failed => "failed",
        }
    }
}

fn enter(stage: Stage) {
    tracing::debug!(stage = stage.as_str(), "Pipeline stage");
}

/// What the external search stage contributed to a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ExternalContext {
    /// The provider returned a summary.
    Found { summary: String },
    /// The provider failed; the prompt got empty external information.
    Degraded { reason: String },
    /// External search was switched off for this synthesizer.
    Skipped,
}

impl ExternalContext {
    /// Text substituted for `external_info` in the prompt.
    pub fn prompt_text(&self) -> &str {
        match self {
            ExternalContext::Found { summary } => summary,
            ExternalContext::Degraded { .. } | ExternalContext::Skipped => "",
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, ExternalContext::Degraded { .. })
    }
}

/// Full outcome of one pipeline run.
#[derive(Debug, Clone, Serialize)]
pub struct Synthesis {
    pub answer: Answer,
    pub sources: RetrievalResult,
    pub external: ExternalContext,

    /// The exact prompt sent to the model
    #[serde(skip)]
    pub prompt: String,
}

/// Orchestrates the answer pipeline over injected, shared handles.
#[derive(Clone)]
pub struct AnswerSynthesizer {
    retriever: Retriever,
    searcher: ExternalSearcher,
    composer: Arc<PromptComposer>,
    llm: Arc<dyn LlmClient>,
    model: String,
    top_k: usize,
    temperature: f32,
    external_search: bool,
}

impl AnswerSynthesizer {
    pub fn new(
        retriever: Retriever,
        searcher: ExternalSearcher,
        composer: Arc<PromptComposer>,
        llm: Arc<dyn LlmClient>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            retriever,
            searcher,
            composer,
            llm,
            model: model.into(),
            top_k: DEFAULT_TOP_K,
            temperature: DEFAULT_TEMPERATURE,
            external_search: true,
        }
    }

    /// Number of distinct chunks to retrieve; values below 1 are treated as 1.
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k.max(1);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Switch the external search stage on or off.
    pub fn with_external_search(mut self, enabled: bool) -> Self {
        self.external_search = enabled;
        self
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Answer `question` given the conversation so far.
    pub async fn answer(&self, question: &str, history: &[Message]) -> AppResult<Answer> {
        self.synthesize(question, history).await.map(|s| s.answer)
    }

    /// Run the pipeline and report everything that went into the answer.
    pub async fn synthesize(&self, question: &str, history: &[Message]) -> AppResult<Synthesis> {
        let span = tracing::info_span!(
            "synthesize",
            k = self.top_k,
            history_len = history.len(),
            prompt_id = self.composer.prompt_id()
        );

        async {
            let result = self.run(question, history).await;
            match &result {
                Ok(synthesis) => {
                    enter(Stage::Done);
                    tracing::info!(
                        chunks = synthesis.sources.len(),
                        external_degraded = synthesis.external.is_degraded(),
                        "Answer synthesized"
                    );
                }
                Err(e) => {
                    enter(Stage::Failed);
                    tracing::error!(error = %e, "Answer synthesis failed");
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run(&self, question: &str, history: &[Message]) -> AppResult<Synthesis> {
        enter(Stage::Start);

        let (retrieved, external) = tokio::join!(
            async {
                enter(Stage::Retrieving);
                self.retriever.retrieve(question, self.top_k).await
            },
            self.search(question)
        );
        let sources = retrieved?;

        enter(Stage::Formatting);
        let chunks_text = format_chunks(sources.chunks());
        let history_text = format_history(history);

        enter(Stage::Prompting);
        let prompt = self.composer.compose(&PromptInputs {
            history: &history_text,
            question,
            chunks: &chunks_text,
            external_info: external.prompt_text(),
        })?;

        enter(Stage::ModelCall);
        let request = LlmRequest::new(prompt.as_str(), self.model.as_str())
            .with_temperature(self.temperature);
        let response = self
            .llm
            .complete(&request)
            .await
            .map_err(|e| AppError::ModelUnavailable(e.to_string()))?;

        tracing::debug!(
            total_tokens = response.usage.total_tokens,
            provider = self.llm.provider_name(),
            "Model call completed"
        );

        Ok(Synthesis {
            answer: Answer {
                text: response.content,
            },
            sources,
            external,
            prompt,
        })
    }

    async fn search(&self, question: &str) -> ExternalContext {
        if !self.external_search {
            return ExternalContext::Skipped;
        }

        enter(Stage::SearchingExternal);
        match self.searcher.search_external(question).await {
            Ok(summary) => ExternalContext::Found { summary },
            Err(e) => {
                tracing::warn!(error = %e, "Continuing without external information");
                ExternalContext::Degraded {
                    reason: e.to_string(),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_external_context_prompt_text() {
        let found = ExternalContext::Found {
            summary: "Polity: a state.".to_string(),
        };
        assert_eq!(found.prompt_text(), "Polity: a state.");
        assert_eq!(ExternalContext::Skipped.prompt_text(), "");

        let degraded = ExternalContext::Degraded {
            reason: "quota".to_string(),
        };
        assert_eq!(degraded.prompt_text(), "");
        assert!(degraded.is_degraded());
    }

    #[test]
    fn test_external_context_serializes_status() {
        let json = serde_json::to_value(ExternalContext::Degraded {
            reason: "timed out".to_string(),
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"status": "degraded", "reason": "timed out"}));

        let json = serde_json::to_value(ExternalContext::Skipped).unwrap();
        assert_eq!(json, serde_json::json!({"status": "skipped"}));
    }

    #[test]
    fn test_stage_names() {
        assert_eq!(Stage::SearchingExternal.as_str(), "searching_external");
        assert_eq!(Stage::ModelCall.as_str(), "model_call");
    }
}
