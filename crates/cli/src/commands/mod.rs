//! Command handlers for the Tutor CLI.

pub mod ask;
pub mod chat;
pub mod context;
pub mod knowledge;
pub mod prompts;

pub use ask::AskCommand;
pub use chat::ChatCommand;
pub use knowledge::KnowledgeCommand;
pub use prompts::PromptsCommand;
