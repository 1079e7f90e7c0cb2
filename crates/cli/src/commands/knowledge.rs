//! Knowledge command handler.
//!
//! Manages the local SQLite knowledge bases the retriever reads from.

use super::context::{base_name, open_index};
use clap::{Args, Subcommand};
use std::path::PathBuf;
use tutor_core::{config::AppConfig, AppError};

/// Knowledge base management
#[derive(Args, Debug)]
pub struct KnowledgeCommand {
    #[command(subcommand)]
    pub action: KnowledgeAction,
}

#[derive(Subcommand, Debug)]
pub enum KnowledgeAction {
    /// Load chunks from a JSONL file
    Load(KnowledgeLoadCommand),
    /// Show knowledge base statistics
    Stats(KnowledgeStatsCommand),
    /// Remove every chunk from a knowledge base
    Clean(KnowledgeCleanCommand),
}

/// Load chunks from a JSONL file
#[derive(Args, Debug)]
pub struct KnowledgeLoadCommand {
    /// JSONL file with one `{"text": ..., "metadata": {...}}` object per line
    pub file: PathBuf,

    /// Knowledge base name (default: rag.knowledgeBase)
    #[arg(short, long)]
    pub base: Option<String>,

    /// Reset base before loading
    #[arg(long)]
    pub reset: bool,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl KnowledgeLoadCommand {
    pub async fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        let base = base_name(config, self.base.as_deref());
        tracing::info!("Executing knowledge load command for base '{}'", base);

        let index = open_index(config, base)?;
        let stats =
            tutor_knowledge::load(&index, &self.file, config.embedding.batch_size, self.reset)
                .await?;

        if self.json {
            let mut output = serde_json::to_value(&stats).map_err(AppError::from)?;
            output["base"] = serde_json::Value::from(base);
            println!(
                "{}",
                serde_json::to_string_pretty(&output).map_err(AppError::from)?
            );
        } else {
            println!(
                "Loaded {} chunks into '{}' ({} lines skipped) in {:.2}s",
                stats.chunks_count, base, stats.skipped_lines, stats.duration_secs
            );
        }

        Ok(())
    }
}

/// Show knowledge base stats
#[derive(Args, Debug)]
pub struct KnowledgeStatsCommand {
    /// Knowledge base name (default: rag.knowledgeBase)
    #[arg(short, long)]
    pub base: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

impl KnowledgeStatsCommand {
    pub async fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        let base = base_name(config, self.base.as_deref());
        tracing::info!("Executing knowledge stats command for base '{}'", base);

        let index = open_index(config, base)?;
        let stats = tutor_knowledge::stats(&index, base).await?;

        if self.json {
            println!(
                "{}",
                serde_json::to_string_pretty(&stats).map_err(AppError::from)?
            );
        } else {
            println!("Knowledge base: {}", stats.base_name);
            println!("  Chunks: {}", stats.chunks_count);
            if let Some(dimensions) = stats.embedding_dimensions {
                println!("  Embedding dimensions: {}", dimensions);
            }
            println!("  DB size: {} bytes", stats.db_size_bytes);
        }

        Ok(())
    }
}

/// Clean knowledge base
#[derive(Args, Debug)]
pub struct KnowledgeCleanCommand {
    /// Knowledge base name (default: rag.knowledgeBase)
    #[arg(short, long)]
    pub base: Option<String>,
}

impl KnowledgeCleanCommand {
    pub async fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        let base = base_name(config, self.base.as_deref());
        tracing::info!("Executing knowledge clean command for base '{}'", base);

        let index = open_index(config, base)?;
        tutor_knowledge::clean(&index, base).await?;

        println!("Knowledge base '{}' cleaned", base);

        Ok(())
    }
}

impl KnowledgeCommand {
    pub async fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        match &self.action {
            KnowledgeAction::Load(cmd) => cmd.execute(config).await,
            KnowledgeAction::Stats(cmd) => cmd.execute(config).await,
            KnowledgeAction::Clean(cmd) => cmd.execute(config).await,
        }
    }
}
