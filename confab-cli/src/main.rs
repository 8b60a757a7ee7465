// Lint configuration for this crate
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! Confab CLI - chat with GigaChat from the terminal.
//!
//! # Examples
//!
//! ```bash
//! # Store the authorization key and fetch a token
//! confab login --key "$GIGACHAT_KEY"
//!
//! # Interactive chat (default)
//! confab
//!
//! # One-shot question, streamed
//! confab ask --stream "Explain borrow checking in one paragraph"
//!
//! # JSON output
//! confab ask --format json --pretty "Hi"
//!
//! # Token status
//! confab status
//!
//! # Change a setting
//! confab config set temperature 0.3
//! ```

mod app;
mod commands;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use confab_session::{ChatError, SendFailure};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use commands::{ask, auth, chat, config};

// ============================================================================
// CLI Definition
// ============================================================================

/// Confab CLI - authenticated chat with context compression.
#[derive(Parser)]
#[command(name = "confab")]
#[command(about = "Terminal chat client for GigaChat")]
#[command(long_about = r#"
Confab is a terminal chat client for the GigaChat completion API.

It keeps a bearer token fresh, streams replies as they arrive and folds
older messages into summaries once the conversation grows.

The authorization key is read from CONFAB_AUTH_KEY or the system keychain.

Examples:
  confab login --key <KEY>      # Store the key and fetch a token
  confab                        # Interactive chat
  confab ask "Hello"            # One-shot question
  confab ask --stream "Hello"   # Streamed reply
  confab status                 # Token status
  confab config show            # Settings and endpoints
"#)]
#[command(version)]
#[command(author = "Confab Contributors")]
pub struct Cli {
    /// Subcommand to run. If none, starts an interactive chat.
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Output format (text or json).
    #[arg(long, short = 'f', default_value = "text", global = true)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long, global = true)]
    pub pretty: bool,

    /// Verbose output (show debug info).
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Quiet mode (minimal output).
    #[arg(long, short, global = true)]
    pub quiet: bool,
}

/// CLI commands.
#[derive(Subcommand)]
pub enum Commands {
    /// Interactive chat (default if no command specified).
    #[command(visible_alias = "c")]
    Chat(chat::ChatArgs),

    /// Send one message and print the reply.
    #[command(visible_alias = "a")]
    Ask(ask::AskArgs),

    /// Store the authorization key and obtain a token.
    Login(auth::LoginArgs),

    /// Drop the stored token.
    Logout(auth::LogoutArgs),

    /// Show authentication status.
    Status,

    /// Manage configuration.
    Config(config::ConfigArgs),
}

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable text with colors.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

/// CLI exit codes.
#[repr(i32)]
pub enum ExitCode {
    /// Success.
    Success = 0,
    /// General error.
    Error = 1,
    /// Authentication failed or no key configured.
    AuthFailed = 2,
    /// Network or API failure.
    RequestFailed = 3,
    /// Interrupted by the user.
    Cancelled = 130,
}

impl ExitCode {
    /// Picks the exit code for a failed command.
    fn for_error(error: &anyhow::Error) -> Self {
        let chat_error = error
            .downcast_ref::<SendFailure>()
            .map(|failure| &failure.error)
            .or_else(|| error.downcast_ref::<ChatError>());

        match chat_error {
            Some(ChatError::Auth(_)) => ExitCode::AuthFailed,
            Some(ChatError::Network(_) | ChatError::Api { .. } | ChatError::EmptyResponse) => {
                ExitCode::RequestFailed
            }
            Some(ChatError::Cancelled) => ExitCode::Cancelled,
            Some(ChatError::Config(_)) | None => ExitCode::Error,
        }
    }
}

// ============================================================================
// Logging Setup
// ============================================================================

fn setup_logging(verbose: bool, quiet: bool) {
    if quiet {
        return;
    }

    let filter = if verbose {
        EnvFilter::new("confab=debug,info")
    } else {
        EnvFilter::new("confab=warn")
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .without_time()
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let result = match &cli.command {
        Some(Commands::Chat(args)) => chat::run(args, &cli).await,
        Some(Commands::Ask(args)) => ask::run(args, &cli).await,
        Some(Commands::Login(args)) => auth::login(args, &cli).await,
        Some(Commands::Logout(args)) => auth::logout(args, &cli).await,
        Some(Commands::Status) => auth::status(&cli).await,
        Some(Commands::Config(args)) => config::run(args, &cli).await,
        None => chat::run(&chat::ChatArgs::default(), &cli).await,
    };

    if let Err(e) = result {
        if !cli.quiet {
            if cli.format == OutputFormat::Json {
                let formatter = output::JsonFormatter::new(cli.pretty);
                println!("{}", formatter.format_error(&format!("{e:#}"))?);
            } else {
                eprintln!("Error: {e:#}");
            }
        }
        std::process::exit(ExitCode::for_error(&e) as i32);
    }

    std::process::exit(ExitCode::Success as i32);
}
