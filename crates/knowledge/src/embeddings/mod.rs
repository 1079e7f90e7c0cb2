//! Embedding providers used by the vector index.
//!
//! The answer pipeline never embeds text itself; the SQLite index embeds
//! queries at search time and chunks at load time.

pub mod provider;
pub mod providers;

pub use provider::{create_provider, EmbeddingProvider};
pub use providers::{MockProvider, OllamaEmbeddingProvider, OpenAiEmbeddingProvider};
