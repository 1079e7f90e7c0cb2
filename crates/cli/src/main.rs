//! Tutor CLI
//!
//! Answers questions from a local knowledge base, enriched with web search
//! and synthesized by a language model.

mod commands;

use clap::{Parser, Subcommand};
use commands::{AskCommand, ChatCommand, KnowledgeCommand, PromptsCommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tutor_core::{config::AppConfig, logging, AppError, AppResult};

/// Tutor - retrieval-augmented answers over your documents
#[derive(Parser, Debug)]
#[command(name = "tutor")]
#[command(about = "Retrieval-augmented answers over your documents", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "TUTOR_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "TUTOR_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "RUST_LOG")]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true, env = "NO_COLOR")]
    no_color: bool,

    /// LLM provider (openai, ollama)
    #[arg(short, long, global = true, env = "TUTOR_PROVIDER")]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true, env = "TUTOR_MODEL")]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Answer one question
    Ask(AskCommand),

    /// Conversation on stdin
    Chat(ChatCommand),

    /// Knowledge base management
    Knowledge(KnowledgeCommand),

    /// Prompt definitions
    Prompts(PromptsCommand),
}

impl Commands {
    fn name(&self) -> &'static str {
        match self {
            Commands::Ask(_) => "ask",
            Commands::Chat(_) => "chat",
            Commands::Knowledge(_) => "knowledge",
            Commands::Prompts(_) => "prompts",
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}

/// Resolve configuration; workspace and config file decide what gets merged.
fn load_config(cli: &Cli) -> AppResult<AppConfig> {
    let config = AppConfig::load_from(cli.workspace.clone(), cli.config.clone())?;
    Ok(config.with_overrides(
        cli.provider.clone(),
        cli.model.clone(),
        cli.log_level.clone(),
        cli.verbose,
        cli.no_color,
    ))
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(&cli)?;

    logging::init_logging(config.log_level.as_deref(), config.log_format, config.no_color)?;

    tracing::info!("Tutor CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    config.validate()?;
    config.ensure_state_dir()?;

    let _span = tracing::info_span!("command", name = cli.command.name()).entered();

    let result = match &cli.command {
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Chat(cmd) => cmd.execute(&config).await,
        Commands::Knowledge(cmd) => cmd.execute(&config).await,
        Commands::Prompts(cmd) => cmd.execute(&config).await,
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {:#}", e),
    }

    result
}

/// Exit with the code of the underlying [`AppError`], or 1.
fn exit_code(err: &anyhow::Error) -> u8 {
    err.downcast_ref::<AppError>()
        .map(AppError::exit_code)
        .and_then(|code| u8::try_from(code).ok())
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_exit_code_from_app_error() {
        let err = anyhow::Error::from(AppError::ModelUnavailable("down".to_string()));
        assert_eq!(exit_code(&err), 69);

        let err = anyhow::Error::from(AppError::Config("bad".to_string()));
        assert_eq!(exit_code(&err), 78);
    }

    #[test]
    fn test_exit_code_through_context() {
        let result: Result<(), AppError> =
            Err(AppError::RetrievalUnavailable("index missing".to_string()));
        let err = result.context("ask failed").unwrap_err();
        assert_eq!(exit_code(&err), 69);
    }

    #[test]
    fn test_exit_code_defaults_to_one() {
        assert_eq!(exit_code(&anyhow::anyhow!("plain failure")), 1);
    }

    #[test]
    fn test_cli_parses_ask() {
        let cli = Cli::try_parse_from([
            "tutor",
            "--provider",
            "ollama",
            "ask",
            "What is a polity?",
            "-k",
            "3",
            "--no-external",
        ])
        .unwrap();

        assert_eq!(cli.provider.as_deref(), Some("ollama"));
        match cli.command {
            Commands::Ask(cmd) => {
                assert_eq!(cmd.question.as_deref(), Some("What is a polity?"));
                assert_eq!(cmd.top_k, Some(3));
                assert!(cmd.no_external);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_config_flag_file_is_merged() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("custom.yaml");
        std::fs::write(&path, "rag:\n  topK: 9\n").unwrap();

        let args: Vec<std::ffi::OsString> = vec![
            "tutor".into(),
            "--workspace".into(),
            temp.path().as_os_str().to_owned(),
            "--config".into(),
            path.as_os_str().to_owned(),
            "--model".into(),
            "gpt-4o".into(),
            "prompts".into(),
            "list".into(),
        ];
        let cli = Cli::try_parse_from(args).unwrap();

        let config = load_config(&cli).unwrap();
        assert_eq!(config.rag.top_k, 9);
        assert_eq!(config.workspace, temp.path());
        assert_eq!(config.model, "gpt-4o");
    }

    #[test]
    fn test_cli_rejects_request_with_question() {
        let result = Cli::try_parse_from(["tutor", "ask", "hi", "--request", "req.json"]);
        assert!(result.is_err());
    }
}
