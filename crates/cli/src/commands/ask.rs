//! Ask command handler.
//!
//! Runs the answer pipeline once for a question and optional history.

use super::context::{build_synthesizer, PipelineOverrides};
use anyhow::Context;
use clap::Args;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tutor_core::{config::AppConfig, AppError};
use tutor_knowledge::{AskRequest, AskResponse, ExternalContext, Message, RetrievalResult};

/// Ask a question against the knowledge base
#[derive(Args, Debug)]
pub struct AskCommand {
    /// The question to ask
    pub question: Option<String>,

    /// Read a JSON request `{"question": ..., "history": [...]}` from a file
    #[arg(long, conflicts_with_all = ["question", "history"])]
    pub request: Option<PathBuf>,

    /// Read the conversation history (JSON array of messages) from a file
    #[arg(long)]
    pub history: Option<PathBuf>,

    /// Knowledge base to retrieve from
    #[arg(short, long)]
    pub base: Option<String>,

    /// Number of distinct chunks to retrieve
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Skip the external web search
    #[arg(long)]
    pub no_external: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,

    /// Print the composed prompt to stderr
    #[arg(long)]
    pub show_prompt: bool,
}

#[derive(Serialize)]
struct AskOutput<'a> {
    #[serde(flatten)]
    response: AskResponse,
    sources: &'a RetrievalResult,
    external: &'a ExternalContext,
}

impl AskCommand {
    pub async fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        tracing::info!("Executing ask command");
        tracing::debug!("Ask command options: {:?}", self);

        let request = self.read_request()?;
        if request.question.trim().is_empty() {
            return Err(AppError::Config("No question provided".to_string()).into());
        }

        let synthesizer = build_synthesizer(
            config,
            &PipelineOverrides {
                base: self.base.clone(),
                top_k: self.top_k,
                no_external: self.no_external,
            },
        )?;

        let synthesis = synthesizer
            .synthesize(&request.question, &request.history)
            .await?;

        if self.show_prompt {
            eprintln!("{}", synthesis.prompt);
        }

        if let ExternalContext::Degraded { reason } = &synthesis.external {
            tracing::info!("Answered without external information: {}", reason);
        }

        if self.json {
            let output = AskOutput {
                sources: &synthesis.sources,
                external: &synthesis.external,
                response: AskResponse::from(synthesis.answer.clone()),
            };
            let json = serde_json::to_string_pretty(&output).map_err(AppError::from)?;
            println!("{}", json);
        } else {
            println!("{}", synthesis.answer.text);
        }

        Ok(())
    }

    fn read_request(&self) -> anyhow::Result<AskRequest> {
        if let Some(path) = &self.request {
            return read_json(path).context("Failed to read ask request");
        }

        let history: Vec<Message> = match &self.history {
            Some(path) => read_json(path).context("Failed to read conversation history")?,
            None => Vec::new(),
        };

        Ok(AskRequest {
            question: self.question.clone().unwrap_or_default(),
            history,
        })
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {:?}", path))?;
    let value = serde_json::from_str(&contents).map_err(AppError::from)?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tutor_knowledge::Role;

    fn command() -> AskCommand {
        AskCommand {
            question: None,
            request: None,
            history: None,
            base: None,
            top_k: None,
            no_external: false,
            json: false,
            show_prompt: false,
        }
    }

    #[test]
    fn test_read_request_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("request.json");
        std::fs::write(
            &path,
            r#"{"question": "What is a polity?", "history": [{"role": "user", "content": "hi"}]}"#,
        )
        .unwrap();

        let request = AskCommand {
            request: Some(path),
            ..command()
        }
        .read_request()
        .unwrap();

        assert_eq!(request.question, "What is a polity?");
        assert_eq!(request.history.len(), 1);
        assert_eq!(request.history[0].role, Role::User);
    }

    #[test]
    fn test_question_with_history_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("history.json");
        std::fs::write(&path, r#"[{"role": "assistant", "content": "hello"}]"#).unwrap();

        let request = AskCommand {
            question: Some("Why?".to_string()),
            history: Some(path),
            ..command()
        }
        .read_request()
        .unwrap();

        assert_eq!(request.question, "Why?");
        assert_eq!(request.history, vec![Message::assistant("hello")]);
    }

    #[test]
    fn test_malformed_request_is_serialization_error() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("request.json");
        std::fs::write(&path, "{not json").unwrap();

        let err = AskCommand {
            request: Some(path),
            ..command()
        }
        .read_request()
        .unwrap_err();

        assert!(matches!(
            err.downcast_ref::<AppError>(),
            Some(AppError::Serialization(_))
        ));
    }

    #[test]
    fn test_output_flattens_answer() {
        let sources = RetrievalResult::default();
        let output = AskOutput {
            response: AskResponse {
                answer: "A polity is a state.".to_string(),
            },
            sources: &sources,
            external: &ExternalContext::Skipped,
        };

        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["answer"], "A polity is a state.");
        assert_eq!(json["sources"], serde_json::json!([]));
        assert_eq!(json["external"]["status"], "skipped");
    }
}
