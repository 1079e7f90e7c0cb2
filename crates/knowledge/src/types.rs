//! Knowledge and pipeline type definitions.

use serde::{Deserialize, Serialize};

/// A unit of internal-corpus text returned by the vector index.
///
/// Two chunks are the same chunk for deduplication purposes exactly when
/// their `text` is equal; metadata is carried along untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,

    #[serde(default = "empty_metadata")]
    pub metadata: serde_json::Value,
}

impl Chunk {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            metadata: empty_metadata(),
        }
    }

    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = metadata;
        self
    }
}

fn empty_metadata() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

/// Author of a conversation message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    /// Label used when rendering history into a prompt.
    pub fn label(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Assistant => "ASSISTANT",
        }
    }
}

/// One turn of conversation history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Ordered chunks with pairwise distinct texts, at most `k` of them.
///
/// Only [`crate::dedup::dedupe_top_k`] builds one.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RetrievalResult {
    chunks: Vec<Chunk>,
}

impl RetrievalResult {
    pub(crate) fn from_distinct(chunks: Vec<Chunk>) -> Self {
        Self { chunks }
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }
}

/// The synthesized final response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub text: String,
}

/// JSON request boundary: a question and the conversation so far.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskRequest {
    pub question: String,

    #[serde(default)]
    pub history: Vec<Message>,
}

/// JSON response boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AskResponse {
    pub answer: String,
}

impl From<Answer> for AskResponse {
    fn from(answer: Answer) -> Self {
        Self {
            answer: answer.text,
        }
    }
}

/// A chunk row as stored in the SQLite index.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedChunk {
    pub id: String,
    pub text: String,
    pub metadata: serde_json::Value,
    pub embedding: Vec<f32>,
}

impl IndexedChunk {
    /// Drop storage details, keeping what the pipeline consumes.
    pub fn into_chunk(self) -> Chunk {
        Chunk {
            text: self.text,
            metadata: self.metadata,
        }
    }
}

/// Statistics for a knowledge base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseStats {
    pub base_name: String,
    pub chunks_count: u64,
    pub embedding_dimensions: Option<usize>,
    pub db_size_bytes: u64,
}

/// Outcome of a `load` ingestion run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadStats {
    pub chunks_count: u64,
    pub skipped_lines: u64,
    pub duration_secs: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_lowercase() {
        let json = serde_json::to_string(&Message::user("hi")).unwrap();
        assert_eq!(json, r#"{"role":"user","content":"hi"}"#);
    }

    #[test]
    fn test_ask_request_history_defaults_to_empty() {
        let request: AskRequest =
            serde_json::from_str(r#"{"question": "What is a polity?"}"#).unwrap();
        assert!(request.history.is_empty());
    }

    #[test]
    fn test_ask_request_rejects_unknown_role() {
        let result: Result<AskRequest, _> = serde_json::from_str(
            r#"{"question": "q", "history": [{"role": "system", "content": "x"}]}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_chunk_metadata_defaults_to_empty_object() {
        let chunk: Chunk = serde_json::from_str(r#"{"text": "A polity is..."}"#).unwrap();
        assert_eq!(chunk.metadata, serde_json::json!({}));
    }

    #[test]
    fn test_answer_converts_to_response() {
        let response = AskResponse::from(Answer {
            text: "42".to_string(),
        });
        assert_eq!(serde_json::to_string(&response).unwrap(), r#"{"answer":"42"}"#);
    }
}
