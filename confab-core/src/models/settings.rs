//! Chat settings supplied by the settings collaborator.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Default model name.
pub const DEFAULT_MODEL: &str = "GigaChat";

// ============================================================================
// Output Format
// ============================================================================

/// Requested shape of assistant replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputFormat {
    /// Free-form text.
    #[default]
    None,
    /// A strict JSON object.
    Json,
}

impl OutputFormat {
    /// Parses a format name.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "none" | "text" | "plain" => Some(OutputFormat::None),
            "json" => Some(OutputFormat::Json),
            _ => None,
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::None => write!(f, "none"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

// ============================================================================
// Chat Settings
// ============================================================================

/// Generation and context settings for a chat session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatSettings {
    /// Model name sent with every request.
    pub model: String,
    /// Sampling temperature in `[0, 2]`.
    pub temperature: f32,
    /// Completion token limit.
    pub max_tokens: u32,
    /// User-configured system prompt. Blank means none.
    pub system_prompt: String,
    /// Requested output format.
    pub output_format: OutputFormat,
    /// Whether older messages are summarized.
    pub context_compression_enabled: bool,
    /// Recent message count above which compression runs.
    pub compression_threshold: usize,
    /// Messages kept verbatim after compression.
    pub recent_messages_count: usize,
    /// Whether replies are streamed.
    pub streaming: bool,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.7,
            max_tokens: 2048,
            system_prompt: String::new(),
            output_format: OutputFormat::None,
            context_compression_enabled: true,
            compression_threshold: 20,
            recent_messages_count: 10,
            streaming: false,
        }
    }
}

impl ChatSettings {
    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), CoreError> {
        if self.model.trim().is_empty() {
            return Err(CoreError::InvalidConfig("model must not be empty".into()));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(CoreError::InvalidConfig(format!(
                "temperature must be between 0 and 2, got {}",
                self.temperature
            )));
        }
        if self.max_tokens == 0 {
            return Err(CoreError::InvalidConfig(
                "max_tokens must be at least 1".into(),
            ));
        }
        if self.recent_messages_count > self.compression_threshold {
            return Err(CoreError::InvalidConfig(format!(
                "recent_messages_count ({}) must not exceed compression_threshold ({})",
                self.recent_messages_count, self.compression_threshold
            )));
        }
        Ok(())
    }

    /// Returns the configured system prompt if it is not blank.
    pub fn system_prompt(&self) -> Option<&str> {
        let prompt = self.system_prompt.trim();
        (!prompt.is_empty()).then_some(self.system_prompt.as_str())
    }
}
