//! Prompt types for Tutor.

use serde::{Deserialize, Serialize};

/// Variables every answer-synthesis prompt must accept.
pub const PIPELINE_VARIABLES: [&str; 4] = ["history", "question", "chunks", "external_info"];

/// A prompt definition loaded from YAML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptDefinition {
    /// Unique prompt identifier
    pub id: String,

    /// Human-readable title
    pub title: String,

    /// API version for schema evolution
    #[serde(rename = "apiVersion")]
    pub api_version: String,

    /// Creator identifier
    #[serde(rename = "createdBy", default)]
    pub created_by: String,

    /// Language of the template text (e.g., "en", "fr")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,

    /// Variables the template consumes
    #[serde(default)]
    pub variables: Vec<String>,

    /// Template string with Handlebars syntax
    pub template: String,
}

impl PromptDefinition {
    /// Whether the template text references `{{name}}`.
    pub fn references(&self, name: &str) -> bool {
        self.template.contains(&format!("{{{{{}}}}}", name))
    }
}

/// The four text blocks substituted into an answer-synthesis prompt.
///
/// Field names are the template variable names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PromptInputs<'a> {
    /// Rendered conversation history
    pub history: &'a str,

    /// The user's question
    pub question: &'a str,

    /// Rendered internal document chunks
    pub chunks: &'a str,

    /// External search summary, empty when unavailable
    pub external_info: &'a str,
}
