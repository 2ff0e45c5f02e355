mod chat_client;
mod cli;
mod config;

use std::io::{self, IsTerminal};
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use dotenv::dotenv;
use eyre::Result;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use crate::chat_client::ChatClient;
use crate::cli::chat::ChatContext;
use crate::config::{Config, DEFAULT_BASE_URL};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    args: ChatArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Start a chat session
    Chat(ChatArgs),
}

#[derive(Args)]
struct ChatArgs {
    /// Ask a single question, print the answer and exit
    #[arg(short, long)]
    input: Option<String>,

    /// Base URL of the chat server
    #[arg(long, env = "API_BASE_URL", default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Load environment variables from .env file
    dotenv().ok();

    let cli = Cli::parse();

    // Default to chat if no subcommand is provided
    let args = match cli.command {
        Some(Commands::Chat(args)) => args,
        None => cli.args,
    };

    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };

    // Logs go to stderr so they never land inside the conversation.
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_writer(io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    let config = Config::from_base_url(&args.base_url)?;
    let client = ChatClient::new(&config)?;

    info!(base_url = %config.base_url(), endpoint = %client.query_url(), "Starting chat widget");

    let mut chat_context = ChatContext::new(
        Box::new(io::stdout()),
        args.input,
        io::stdin().is_terminal(),
        Arc::new(client),
    );
    chat_context.run().await
}
