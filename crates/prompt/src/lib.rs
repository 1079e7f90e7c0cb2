//! Prompt system for Tutor.
//!
//! This crate provides structured prompt management with:
//! - YAML-based prompt definitions (built-in and per-workspace)
//! - Handlebars template rendering with verbatim substitution
//! - The chain-of-thought composer used by the answer pipeline

pub mod composer;
pub mod loader;
pub mod types;

// Re-export main types
pub use composer::{compose_prompt, PromptComposer};
pub use loader::{builtin_prompt, list_prompts, load_prompt, PromptListing, PromptSource};
pub use types::{PromptDefinition, PromptInputs, PIPELINE_VARIABLES};
