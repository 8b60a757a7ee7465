//! Text output formatting with colors.

use chrono::{DateTime, Local, Utc};
use confab_core::{
    AuthState, ChatSettings, ContextStats, ConversationWindow, Message, MessageStatus, Role,
    TokenUsage, UsageTotals,
};
use confab_store::{AppConfig, AuthKeySource};

// ============================================================================
// ANSI Colors
// ============================================================================

const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const CYAN: &str = "\x1b[36m";

/// Text formatter with optional colors.
pub struct TextFormatter {
    use_colors: bool,
}

impl TextFormatter {
    /// Creates a new text formatter.
    pub fn new(use_colors: bool) -> Self {
        Self { use_colors }
    }

    /// The REPL input prompt.
    pub fn prompt(&self) -> String {
        format!("{} ", self.paint(CYAN, "you>"))
    }

    /// Label printed before a streamed reply.
    pub fn assistant_label(&self) -> String {
        format!("{} ", self.paint(GREEN, "assistant>"))
    }

    /// Formats a complete reply with its usage line.
    pub fn format_reply(&self, message: &Message) -> String {
        let mut out = format!("{}{}", self.assistant_label(), message.content);
        if let Some(usage) = &message.token_usage {
            out.push('\n');
            out.push_str(&self.format_usage_line(usage));
        }
        out
    }

    /// One-line token usage; estimated counts are prefixed with `~`.
    pub fn format_usage_line(&self, usage: &TokenUsage) -> String {
        let line = if usage.has_actual_data() {
            format!(
                "[tokens: prompt {}, completion {}, total {}]",
                usage.prompt(),
                usage.completion(),
                usage
                    .actual_total
                    .unwrap_or(usage.prompt() + usage.completion())
            )
        } else {
            format!(
                "[tokens: prompt ~{}, completion ~{}, total ~{}]",
                usage.estimated_prompt,
                usage.estimated_completion,
                usage.estimated_total()
            )
        };
        self.dim(&line)
    }

    /// Note shown when older messages were folded during a send.
    pub fn format_compression(&self, count: usize) -> String {
        self.dim(&format!("[context compressed: {count} messages summarized]"))
    }

    /// Formats the summaries and recent messages of a window.
    pub fn format_history(&self, window: &ConversationWindow) -> String {
        if window.is_empty() {
            return self.dim("(no messages yet)");
        }

        let mut lines = Vec::new();
        for summary in window.summaries() {
            lines.push(self.paint(
                YELLOW,
                &format!("[summary of {} messages]", summary.original_message_count),
            ));
            lines.push(format!("  {}", summary.content));
        }
        for message in window.recent() {
            lines.push(self.format_history_entry(message));
        }
        lines.join("\n")
    }

    fn format_history_entry(&self, message: &Message) -> String {
        let time = message.timestamp.with_timezone(&Local).format("%H:%M");
        let label = match message.role {
            Role::User => self.paint(CYAN, message.role.label()),
            Role::Assistant => self.paint(GREEN, message.role.label()),
            Role::System => self.paint(YELLOW, message.role.label()),
        };
        let marker = match message.status {
            MessageStatus::Error => format!(" {}", self.paint(RED, "(failed)")),
            MessageStatus::Sending => format!(" {}", self.dim("(sending)")),
            MessageStatus::Sent => String::new(),
        };
        format!("{} {label}{marker}: {}", self.dim(&time.to_string()), message.content)
    }

    /// Formats context window statistics.
    pub fn format_stats(&self, stats: &ContextStats) -> String {
        [
            self.bold("Context"),
            "─".repeat(40),
            format!("Recent messages:       {}", stats.recent_count),
            format!("Summary blocks:        {}", stats.summary_block_count),
            format!("Summarized messages:   {}", stats.total_original_messages),
            format!("Current context:       ~{} tokens", stats.current_context_tokens),
            format!("Saved by compression:  ~{} tokens", stats.estimated_tokens_saved),
        ]
        .join("\n")
    }

    /// Formats cumulative usage.
    pub fn format_totals(&self, totals: &UsageTotals) -> String {
        [
            self.bold("Token usage"),
            "─".repeat(40),
            format!("Exchanges:          {}", totals.exchanges),
            format!("Prompt tokens:      {}", totals.prompt_tokens),
            format!("Completion tokens:  {}", totals.completion_tokens),
            format!("Total:              {}", totals.total()),
        ]
        .join("\n")
    }

    /// Formats chat settings and endpoints.
    pub fn format_settings(&self, settings: &ChatSettings, config: &AppConfig) -> String {
        let prompt = settings.system_prompt().unwrap_or("(none)");
        [
            self.bold("Settings"),
            "─".repeat(40),
            format!("model:                  {}", settings.model),
            format!("temperature:            {}", settings.temperature),
            format!("max_tokens:             {}", settings.max_tokens),
            format!("system_prompt:          {prompt}"),
            format!("output_format:          {}", settings.output_format),
            format!("streaming:              {}", on_off(settings.streaming)),
            format!(
                "compression:            {}",
                on_off(settings.context_compression_enabled)
            ),
            format!("compression_threshold:  {}", settings.compression_threshold),
            format!("recent_messages_count:  {}", settings.recent_messages_count),
            String::new(),
            self.bold("Connection"),
            "─".repeat(40),
            format!("auth_url:               {}", config.auth_url),
            format!("api_url:                {}", config.api_url),
            format!("scope:                  {}", config.scope),
            format!(
                "timeouts:               connect {}s, request {}s, stream idle {}s",
                config.connect_timeout_secs,
                config.request_timeout_secs,
                config.stream_idle_timeout_secs
            ),
            format!("token_backend:          {}", config.token_backend),
        ]
        .join("\n")
    }

    /// Formats the authentication status.
    pub fn format_status(
        &self,
        state: &AuthState,
        key_source: Option<AuthKeySource>,
        now: DateTime<Utc>,
    ) -> String {
        let headline = match state {
            AuthState::Authorized(token) if token.is_expired(now) => {
                self.paint(YELLOW, "✗ Token expired")
            }
            AuthState::Authorized(token) => {
                let expiry = token
                    .expires_at_utc()
                    .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "unknown".to_string());
                format!(
                    "{} Authorized ({}, expires {expiry}, {} remaining)",
                    self.paint(GREEN, "✓"),
                    token.masked(),
                    format_duration(token.seconds_remaining(now))
                )
            }
            AuthState::Error(cause) => self.paint(RED, &format!("✗ Error: {cause}")),
            AuthState::Loading => self.dim("… Authorizing"),
            AuthState::Unauthorized => self.paint(YELLOW, "✗ Not logged in"),
        };

        let key = match key_source {
            Some(AuthKeySource::Environment) => "environment (CONFAB_AUTH_KEY)",
            Some(AuthKeySource::Keychain) => "system keychain",
            None => "not configured",
        };
        format!("{headline}\nAuthorization key: {key}")
    }

    /// Formats an error line.
    pub fn error(&self, text: &str) -> String {
        self.paint(RED, &format!("Error: {text}"))
    }

    /// Formats an informational line.
    pub fn notice(&self, text: &str) -> String {
        self.dim(text)
    }

    fn paint(&self, color: &str, text: &str) -> String {
        if self.use_colors {
            format!("{color}{text}{RESET}")
        } else {
            text.to_string()
        }
    }

    fn bold(&self, text: &str) -> String {
        self.paint(BOLD, text)
    }

    fn dim(&self, text: &str) -> String {
        self.paint(DIM, text)
    }
}

fn on_off(value: bool) -> &'static str {
    if value { "on" } else { "off" }
}

/// Formats seconds as `1h 05m`, `4m 10s` or `12s`.
pub fn format_duration(secs: i64) -> String {
    let secs = secs.max(0);
    let (hours, minutes, seconds) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if hours > 0 {
        format!("{hours}h {minutes:02}m")
    } else if minutes > 0 {
        format!("{minutes}m {seconds:02}s")
    } else {
        format!("{seconds}s")
    }
}
