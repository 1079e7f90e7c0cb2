//! LLM integration crate for Tutor.
//!
//! A provider-agnostic `LlmClient` trait plus the chat model clients the
//! answer pipeline can talk to.
//!
//! # Providers
//! - **OpenAI**: Chat Completions API (default, `gpt-4`)
//! - **Ollama**: Local LLM runtime
//!
//! # Example
//! ```no_run
//! use tutor_llm::{LlmClient, LlmRequest, providers::OllamaClient};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = OllamaClient::new();
//! let request = LlmRequest::new("Hello, world!", "llama3.2").with_temperature(0.0);
//! let response = client.complete(&request).await?;
//! println!("{}", response.content);
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod factory;
pub mod providers;
pub mod types;

// Re-export main types
pub use client::{LlmClient, LlmRequest, LlmResponse, LlmUsage};
pub use factory::create_client;
pub use providers::{OllamaClient, OpenAiClient};
pub use types::ProviderType;
