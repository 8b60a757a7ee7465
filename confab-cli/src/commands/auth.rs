//! Login, logout and status commands.

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Args;
use confab_store::{delete_auth_key, store_auth_key};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use crate::app::App;
use crate::output::{JsonFormatter, StatusOutput, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the login command.
#[derive(Args)]
pub struct LoginArgs {
    /// Authorization key to store in the system keychain.
    #[arg(long, conflicts_with = "key_stdin")]
    pub key: Option<String>,

    /// Read the authorization key from stdin.
    #[arg(long)]
    pub key_stdin: bool,
}

/// Arguments for the logout command.
#[derive(Args)]
pub struct LogoutArgs {
    /// Also remove the authorization key from the system keychain.
    #[arg(long)]
    pub forget_key: bool,
}

/// Stores the key if given, then exchanges it for a token.
pub async fn login(args: &LoginArgs, cli: &Cli) -> Result<()> {
    let key = if args.key_stdin {
        let mut line = String::new();
        BufReader::new(tokio::io::stdin())
            .read_line(&mut line)
            .await
            .context("failed to read the key from stdin")?;
        Some(line)
    } else {
        args.key.clone()
    };

    if let Some(key) = key {
        store_auth_key(&key).context("failed to store the authorization key")?;
        info!("Authorization key stored in keychain");
    }

    let app = App::load().await?;
    app.tokens.authenticate().await?;
    print_status(&app, cli)
}

/// Drops the stored token.
pub async fn logout(args: &LogoutArgs, cli: &Cli) -> Result<()> {
    let app = App::load().await?;
    app.tokens.logout().await;

    if args.forget_key {
        delete_auth_key().context("failed to remove the authorization key")?;
    }

    if cli.format == OutputFormat::Text && !cli.quiet {
        println!("Logged out");
        if args.forget_key {
            println!("Authorization key removed from keychain");
        }
    }
    Ok(())
}

/// Shows the current token state.
pub async fn status(cli: &Cli) -> Result<()> {
    let app = App::load().await?;
    print_status(&app, cli)
}

fn print_status(app: &App, cli: &Cli) -> Result<()> {
    let state = app.tokens.state();
    let now = Utc::now();

    match cli.format {
        OutputFormat::Text => {
            let formatter = TextFormatter::new(!cli.no_color);
            println!("{}", formatter.format_status(&state, app.key_source, now));
        }
        OutputFormat::Json => {
            let output = StatusOutput::new(&state, app.key_source, now);
            println!("{}", JsonFormatter::new(cli.pretty).format(&output)?);
        }
    }
    Ok(())
}
