//! Chat command - the interactive REPL.

use std::io::{Write, stdout};
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use confab_core::{MemoryConversationStore, SendMessageResult, SettingsSource};
use confab_session::{ChatSession, SendFailure};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::app::App;
use crate::commands::slash::{self, HELP, SlashCommand};
use crate::output::{JsonFormatter, TextFormatter};
use crate::{Cli, OutputFormat};

/// Arguments for the chat command.
#[derive(Args, Default)]
pub struct ChatArgs {
    /// Start from an empty conversation instead of the saved history.
    #[arg(long)]
    pub fresh: bool,

    /// Keep this conversation in memory only.
    #[arg(long)]
    pub ephemeral: bool,
}

/// Runs the interactive chat.
pub async fn run(args: &ChatArgs, cli: &Cli) -> Result<()> {
    let app = App::load().await?;
    let mut session = if args.ephemeral {
        app.session_with_store(Arc::new(MemoryConversationStore::new()))
    } else {
        app.session()
    };

    if args.fresh {
        session.clear().await?;
    } else {
        session.restore().await?;
    }

    let mut repl = Repl {
        app: &app,
        session,
        text: TextFormatter::new(!cli.no_color),
        json: JsonFormatter::new(cli.pretty),
        format: cli.format,
        last_failed: None,
    };
    repl.run().await
}

struct Repl<'a> {
    app: &'a App,
    session: ChatSession,
    text: TextFormatter,
    json: JsonFormatter,
    format: OutputFormat,
    last_failed: Option<String>,
}

/// Whether the loop keeps going after a command.
enum Flow {
    Continue,
    Exit,
}

impl Repl<'_> {
    async fn run(&mut self) -> Result<()> {
        let restored = self.session.window().recent_len();
        if self.format == OutputFormat::Text {
            println!(
                "{}",
                self.text
                    .notice("Confab chat. Type /help for commands, /exit to leave.")
            );
            if restored > 0 {
                println!(
                    "{}",
                    self.text
                        .notice(&format!("Restored {restored} messages from history."))
                );
            }
        }

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        loop {
            if self.format == OutputFormat::Text {
                print!("{}", self.text.prompt());
                stdout().flush()?;
            }

            let Some(line) = lines.next_line().await? else {
                debug!("Input closed");
                break;
            };
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let flow = match slash::parse(line) {
                Some(Ok(command)) => self.handle(command).await?,
                Some(Err(usage)) => {
                    println!("{}", self.text.error(&usage));
                    Flow::Continue
                }
                None => {
                    self.send(line.to_string()).await?;
                    Flow::Continue
                }
            };
            if matches!(flow, Flow::Exit) {
                break;
            }
        }

        info!("Chat ended");
        Ok(())
    }

    async fn send(&mut self, text: String) -> Result<()> {
        let settings = self.session.settings().await?;
        match send(&mut self.session, &text, settings.streaming, &self.text, self.format).await {
            Ok(result) => {
                self.last_failed = None;
                self.print_result(&result)?;
            }
            Err(failure) => {
                self.last_failed = Some(failure.user_message.content.clone());
                self.print_error(&failure.to_string())?;
            }
        }
        Ok(())
    }

    fn print_result(&self, result: &SendMessageResult) -> Result<()> {
        match self.format {
            OutputFormat::Json => println!("{}", self.json.format_reply(result)?),
            OutputFormat::Text => {
                if let Some(usage) = &result.message.token_usage {
                    println!("{}", self.text.format_usage_line(usage));
                }
                if result.compressed_count > 0 {
                    println!("{}", self.text.format_compression(result.compressed_count));
                }
            }
        }
        Ok(())
    }

    fn print_error(&self, error: &str) -> Result<()> {
        match self.format {
            OutputFormat::Json => println!("{}", self.json.format_error(error)?),
            OutputFormat::Text => println!("{}", self.text.error(error)),
        }
        Ok(())
    }

    fn print_notice(&self, notice: &str) {
        println!("{}", self.text.notice(notice));
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        match self.app.settings.set(key, value).await {
            Ok(_) => self.print_notice(&format!("{key} = {value}")),
            Err(e) => self.print_error(&e.to_string())?,
        }
        Ok(())
    }

    async fn handle(&mut self, command: SlashCommand) -> Result<Flow> {
        match command {
            SlashCommand::Help => println!("{HELP}"),
            SlashCommand::Exit => return Ok(Flow::Exit),
            SlashCommand::Clear => {
                self.session.clear().await?;
                self.last_failed = None;
                self.print_notice("Conversation cleared.");
            }
            SlashCommand::Save(name) => {
                let snapshot = self.session.export().await;
                match self.app.transcripts.save(&name, &snapshot).await {
                    Ok(path) => self.print_notice(&format!("Saved to {}", path.display())),
                    Err(e) => self.print_error(&e.to_string())?,
                }
            }
            SlashCommand::Load(name) => match self.app.transcripts.load(&name).await {
                Ok(snapshot) => {
                    let count = snapshot.window.recent_len();
                    self.session.import(snapshot).await?;
                    self.print_notice(&format!("Loaded '{name}' ({count} messages)."));
                }
                Err(e) => self.print_error(&e.to_string())?,
            },
            SlashCommand::Model(None) => {
                let settings = self.session.settings().await?;
                self.print_notice(&format!("model = {}", settings.model));
            }
            SlashCommand::Model(Some(name)) => self.set("model", &name).await?,
            SlashCommand::Models => match self.session.available_models().await {
                Ok(models) => match self.format {
                    OutputFormat::Json => println!("{}", self.json.format(&models)?),
                    OutputFormat::Text => {
                        for model in models {
                            println!("  {model}");
                        }
                    }
                },
                Err(e) => self.print_error(&e.to_string())?,
            },
            SlashCommand::Config => {
                let settings = self.session.settings().await?;
                match self.format {
                    OutputFormat::Json => println!("{}", self.json.format(&settings)?),
                    OutputFormat::Text => {
                        println!("{}", self.text.format_settings(&settings, &self.app.config));
                    }
                }
            }
            SlashCommand::Set { key, value } => self.set(&key, &value).await?,
            SlashCommand::System(prompt) => {
                let prompt = prompt.unwrap_or_default();
                let mut settings = self.app.settings.get().await;
                settings.system_prompt = prompt;
                SettingsSource::save(self.app.settings.as_ref(), &settings).await?;
                self.print_notice(if settings.system_prompt().is_some() {
                    "System prompt updated."
                } else {
                    "System prompt cleared."
                });
            }
            SlashCommand::Format(format) => self.set("output_format", &format.to_string()).await?,
            SlashCommand::Stream(on) => {
                self.set("streaming", if on { "on" } else { "off" }).await?;
            }
            SlashCommand::History => match self.format {
                OutputFormat::Json => {
                    println!("{}", self.json.format_messages(self.session.window().recent())?);
                }
                OutputFormat::Text => println!("{}", self.text.format_history(self.session.window())),
            },
            SlashCommand::Tokens => {
                let totals = self.session.usage_totals();
                match self.format {
                    OutputFormat::Json => println!("{}", self.json.format(&totals)?),
                    OutputFormat::Text => println!("{}", self.text.format_totals(&totals)),
                }
            }
            SlashCommand::Stats => {
                let stats = self.session.stats();
                match self.format {
                    OutputFormat::Json => println!("{}", self.json.format(&stats)?),
                    OutputFormat::Text => println!("{}", self.text.format_stats(&stats)),
                }
            }
            SlashCommand::Retry => match self.last_failed.take() {
                Some(text) => self.send(text).await?,
                None => self.print_notice("Nothing to retry."),
            },
        }
        Ok(Flow::Continue)
    }
}

/// Sends one message, printing the reply as text when `format` is text.
///
/// Streaming replies are printed as deltas arrive; Ctrl-C cancels the
/// stream. Non-streaming replies are printed whole.
pub async fn send(
    session: &mut ChatSession,
    text: &str,
    streaming: bool,
    formatter: &TextFormatter,
    format: OutputFormat,
) -> Result<SendMessageResult, SendFailure> {
    let print_text = format == OutputFormat::Text;

    if !streaming {
        let result = session.send_message(text).await?;
        if print_text {
            println!("{}{}", formatter.assistant_label(), result.message.content);
        }
        return Ok(result);
    }

    let cancel = CancellationToken::new();
    let interrupt = cancel.clone();
    let watcher = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            interrupt.cancel();
        }
    });

    let mut started = false;
    let result = session
        .send_message_streaming(
            text,
            |delta| {
                if print_text {
                    if !started {
                        print!("{}", formatter.assistant_label());
                        started = true;
                    }
                    print!("{delta}");
                    let _ = stdout().flush();
                }
            },
            &cancel,
        )
        .await;
    watcher.abort();

    if started {
        println!();
    }
    result
}
