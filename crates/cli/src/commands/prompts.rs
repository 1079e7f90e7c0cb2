//! Prompts command handler.

use clap::{Args, Subcommand};
use tutor_core::{config::AppConfig, AppError};
use tutor_prompt::{list_prompts, PromptSource};

/// Inspect the prompt definitions available to the pipeline
#[derive(Args, Debug)]
pub struct PromptsCommand {
    #[command(subcommand)]
    pub action: PromptsAction,
}

#[derive(Subcommand, Debug)]
pub enum PromptsAction {
    /// List built-in and workspace prompts
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

impl PromptsCommand {
    pub async fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        match &self.action {
            PromptsAction::List { json } => {
                tracing::info!("Executing prompts list command");
                let prompts = list_prompts(&config.workspace)?;

                if *json {
                    println!(
                        "{}",
                        serde_json::to_string_pretty(&prompts).map_err(AppError::from)?
                    );
                    return Ok(());
                }

                for prompt in &prompts {
                    let source = match prompt.source {
                        PromptSource::Builtin => "built-in",
                        PromptSource::Workspace => "workspace",
                    };
                    let active = if prompt.id == config.rag.prompt_id {
                        " (active)"
                    } else {
                        ""
                    };
                    println!("{} [{}]{}", prompt.id, source, active);
                }

                Ok(())
            }
        }
    }
}
