//! Chat command handler.
//!
//! A line-oriented conversation on stdin. The history lives only in this
//! process and is handed to the pipeline with every question.

use super::context::{build_synthesizer, PipelineOverrides};
use clap::Args;
use std::io::Write;
use tokio::io::{AsyncBufReadExt, BufReader};
use tutor_core::config::AppConfig;
use tutor_knowledge::Message;

/// Interactive conversation against the knowledge base
#[derive(Args, Debug)]
pub struct ChatCommand {
    /// Knowledge base to retrieve from
    #[arg(short, long)]
    pub base: Option<String>,

    /// Number of distinct chunks to retrieve
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,

    /// Skip the external web search
    #[arg(long)]
    pub no_external: bool,
}

/// What a line of input asks the chat loop to do.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Question(&'a str),
    Reset,
    Exit,
    Empty,
}

fn parse_input(line: &str) -> Input<'_> {
    match line.trim() {
        "" => Input::Empty,
        "/reset" => Input::Reset,
        "/exit" | "/quit" => Input::Exit,
        question => Input::Question(question),
    }
}

/// Conversation state carried between questions.
#[derive(Debug)]
struct Conversation {
    history: Vec<Message>,
    max_messages: usize,
}

impl Conversation {
    fn new(max_messages: usize) -> Self {
        Self {
            history: Vec::new(),
            max_messages,
        }
    }

    /// Start over once the history has grown past the configured limit.
    fn trim(&mut self) -> bool {
        if self.history.len() > self.max_messages {
            self.history.clear();
            true
        } else {
            false
        }
    }

    fn record(&mut self, question: &str, answer: &str) {
        self.history.push(Message::user(question));
        self.history.push(Message::assistant(answer));
    }
}

impl ChatCommand {
    pub async fn execute(&self, config: &AppConfig) -> anyhow::Result<()> {
        tracing::info!("Executing chat command");

        let synthesizer = build_synthesizer(
            config,
            &PipelineOverrides {
                base: self.base.clone(),
                top_k: self.top_k,
                no_external: self.no_external,
            },
        )?;

        let mut conversation = Conversation::new(config.rag.max_history_messages);
        let mut lines = BufReader::new(tokio::io::stdin()).lines();

        eprintln!("Type a question, /reset to start over, /exit to quit.");

        loop {
            eprint!("> ");
            std::io::stderr().flush().ok();

            let Some(line) = lines.next_line().await? else {
                break;
            };

            let question = match parse_input(&line) {
                Input::Empty => continue,
                Input::Exit => break,
                Input::Reset => {
                    conversation.history.clear();
                    eprintln!("Started a new conversation.");
                    continue;
                }
                Input::Question(question) => question,
            };

            if conversation.trim() {
                tracing::info!(
                    "History exceeded {} messages, starting a new conversation",
                    conversation.max_messages
                );
            }

            match synthesizer.answer(question, &conversation.history).await {
                Ok(answer) => {
                    println!("{}\n", answer.text);
                    conversation.record(question, &answer.text);
                }
                Err(e) => {
                    tracing::error!("Question failed: {}", e);
                    eprintln!("Error: {}", e);
                }
            }
        }

        Ok(())
    }
}
