//! Ask command - one-shot message.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use confab_core::MemoryConversationStore;
use tokio::io::AsyncReadExt;

use crate::app::App;
use crate::commands::chat::send;
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the ask command.
#[derive(Args)]
pub struct AskArgs {
    /// Message to send. Use "-" to read it from stdin.
    #[arg(required = true)]
    pub message: Vec<String>,

    /// Stream the reply as it is generated.
    #[arg(long, short)]
    pub stream: bool,

    /// Do not read or write the saved conversation.
    #[arg(long)]
    pub ephemeral: bool,
}

/// Runs the ask command.
pub async fn run(args: &AskArgs, cli: &Cli) -> Result<()> {
    let text = message_text(&args.message).await?;

    let app = App::load().await?;
    let mut session = if args.ephemeral {
        app.session_with_store(Arc::new(MemoryConversationStore::new()))
    } else {
        let mut session = app.session();
        session.restore().await?;
        session
    };

    let settings = session.settings().await?;
    let streaming = args.stream || settings.streaming;
    let formatter = TextFormatter::new(!cli.no_color);

    let result = send(&mut session, &text, streaming, &formatter, cli.format).await?;

    match cli.format {
        OutputFormat::Json => {
            println!("{}", JsonFormatter::new(cli.pretty).format_reply(&result)?);
        }
        OutputFormat::Text => {
            if cli.verbose {
                if let Some(usage) = &result.message.token_usage {
                    eprintln!("{}", formatter.format_usage_line(usage));
                }
            }
        }
    }
    Ok(())
}

async fn message_text(parts: &[String]) -> Result<String> {
    if parts.len() == 1 && parts[0] == "-" {
        let mut input = String::new();
        tokio::io::stdin()
            .read_to_string(&mut input)
            .await
            .context("failed to read the message from stdin")?;
        return Ok(input);
    }
    Ok(parts.join(" "))
}
