//! Slash command parsing for the chat REPL.

use confab_core::OutputFormat;
use confab_store::parse_bool;

/// A parsed REPL command.
#[derive(Debug, Clone, PartialEq)]
pub enum SlashCommand {
    /// Show the command list.
    Help,
    /// Clear the conversation.
    Clear,
    /// Leave the REPL.
    Exit,
    /// Save the conversation under a name.
    Save(String),
    /// Load a saved conversation.
    Load(String),
    /// Switch model, or show the current one.
    Model(Option<String>),
    /// List available models.
    Models,
    /// Show settings and endpoints.
    Config,
    /// Change one setting.
    Set {
        /// Setting key.
        key: String,
        /// Raw value.
        value: String,
    },
    /// Replace the system prompt; `None` clears it.
    System(Option<String>),
    /// Change the output format.
    Format(OutputFormat),
    /// Show the conversation so far.
    History,
    /// Show cumulative token usage.
    Tokens,
    /// Show context window statistics.
    Stats,
    /// Resend the last message that failed.
    Retry,
    /// Toggle streaming.
    Stream(bool),
}

/// Help text listing every command.
pub const HELP: &str = "\
Commands:
  /help                  Show this help
  /clear                 Clear the conversation
  /exit, /quit           Leave
  /save <name>           Save the conversation
  /load <name>           Load a saved conversation
  /model [name]          Show or switch the model
  /models                List available models
  /config                Show settings
  /set <param> <value>   Change a setting
  /system [prompt]       Set or clear the system prompt
  /format <none|json>    Change the reply format
  /history               Show the conversation
  /tokens                Show token usage
  /stats                 Show context statistics
  /retry                 Resend the last failed message
  /stream <on|off>       Toggle streaming";

/// Parses `line` if it is a slash command.
///
/// Returns `None` for ordinary chat input and `Some(Err(..))` with a usage
/// hint for malformed commands.
pub fn parse(line: &str) -> Option<Result<SlashCommand, String>> {
    let line = line.trim();
    let rest = line.strip_prefix('/')?;

    let (name, arg) = match rest.split_once(char::is_whitespace) {
        Some((name, arg)) => (name, arg.trim()),
        None => (rest, ""),
    };
    let arg = (!arg.is_empty()).then_some(arg);

    let required = |usage: &str| arg.map(str::to_string).ok_or_else(|| format!("usage: {usage}"));

    let command = match name.to_ascii_lowercase().as_str() {
        "help" | "h" | "?" => Ok(SlashCommand::Help),
        "clear" => Ok(SlashCommand::Clear),
        "exit" | "quit" | "q" => Ok(SlashCommand::Exit),
        "save" => required("/save <name>").map(SlashCommand::Save),
        "load" => required("/load <name>").map(SlashCommand::Load),
        "model" => Ok(SlashCommand::Model(arg.map(str::to_string))),
        "models" => Ok(SlashCommand::Models),
        "config" => Ok(SlashCommand::Config),
        "set" => match arg.and_then(|a| a.split_once(char::is_whitespace)) {
            Some((key, value)) => Ok(SlashCommand::Set {
                key: key.to_string(),
                value: value.trim().to_string(),
            }),
            None => Err("usage: /set <param> <value>".to_string()),
        },
        "system" => Ok(SlashCommand::System(arg.map(str::to_string))),
        "format" => arg
            .and_then(OutputFormat::parse)
            .map(SlashCommand::Format)
            .ok_or_else(|| "usage: /format <none|json>".to_string()),
        "history" => Ok(SlashCommand::History),
        "tokens" => Ok(SlashCommand::Tokens),
        "stats" => Ok(SlashCommand::Stats),
        "retry" => Ok(SlashCommand::Retry),
        "stream" => arg
            .and_then(parse_bool)
            .map(SlashCommand::Stream)
            .ok_or_else(|| "usage: /stream <on|off>".to_string()),
        other => Err(format!("unknown command '/{other}', try /help")),
    };
    Some(command)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_not_a_command() {
        assert_eq!(parse("hello there"), None);
        assert_eq!(parse("  what is 1/2?"), None);
    }

    #[test]
    fn test_simple_commands() {
        assert_eq!(parse("/help"), Some(Ok(SlashCommand::Help)));
        assert_eq!(parse("  /QUIT "), Some(Ok(SlashCommand::Exit)));
        assert_eq!(parse("/exit"), Some(Ok(SlashCommand::Exit)));
        assert_eq!(parse("/models"), Some(Ok(SlashCommand::Models)));
        assert_eq!(parse("/stats"), Some(Ok(SlashCommand::Stats)));
    }

    #[test]
    fn test_commands_with_arguments() {
        assert_eq!(
            parse("/save  monday notes"),
            Some(Ok(SlashCommand::Save("monday notes".into())))
        );
        assert_eq!(
            parse("/model GigaChat-Max"),
            Some(Ok(SlashCommand::Model(Some("GigaChat-Max".into()))))
        );
        assert_eq!(parse("/model"), Some(Ok(SlashCommand::Model(None))));
        assert_eq!(
            parse("/set temperature 0.2"),
            Some(Ok(SlashCommand::Set {
                key: "temperature".into(),
                value: "0.2".into()
            }))
        );
        assert_eq!(
            parse("/system You are terse."),
            Some(Ok(SlashCommand::System(Some("You are terse.".into()))))
        );
        assert_eq!(parse("/system"), Some(Ok(SlashCommand::System(None))));
        assert_eq!(
            parse("/format json"),
            Some(Ok(SlashCommand::Format(OutputFormat::Json)))
        );
        assert_eq!(parse("/stream off"), Some(Ok(SlashCommand::Stream(false))));
    }

    #[test]
    fn test_malformed_commands() {
        assert!(matches!(parse("/save"), Some(Err(msg)) if msg.contains("/save <name>")));
        assert!(matches!(parse("/set temperature"), Some(Err(_))));
        assert!(matches!(parse("/format yaml"), Some(Err(_))));
        assert!(matches!(parse("/stream maybe"), Some(Err(_))));
        assert!(matches!(parse("/frobnicate"), Some(Err(msg)) if msg.contains("unknown")));
    }
}
