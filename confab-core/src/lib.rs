// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Confab Core
//!
//! Core types, models, and collaborator traits for Confab.
//!
//! This crate provides the foundational abstractions used across all other
//! Confab crates, including:
//!
//! - Domain models (messages, tokens, context window, settings)
//! - Error types
//! - Collaborator traits for token, settings and conversation storage
//! - The heuristic token estimator
//!
//! ## Key Types
//!
//! ### Conversation
//! - [`Message`] - A single message with role, status and usage
//! - [`TokenUsage`] - Estimated and reported token counts
//! - [`ConversationWindow`] - Recent messages plus summaries
//! - [`ContextSummary`] - A summary replacing older messages
//! - [`ContextStats`] - Projection of the window for display
//!
//! ### Authentication
//! - [`AuthToken`] - Bearer token with expiry in epoch seconds
//! - [`AuthState`] - Observable authentication state
//!
//! ### Settings & Streaming
//! - [`ChatSettings`] - Model, sampling and compression settings
//! - [`OutputFormat`] - Requested reply format
//! - [`StreamEvent`] - Decoded streaming event
//! - [`SendMessageResult`] - Outcome of a successful send
//! - [`ConversationSnapshot`] - Exported conversation with usage totals

pub mod error;
pub mod estimate;
pub mod memory;
pub mod models;
pub mod traits;

// Re-export error types
pub use error::CoreError;

// Re-export all model types
pub use models::{
    // Conversation
    ContextStats,
    ContextSummary,
    ConversationWindow,
    Message,
    MessageStatus,
    Role,
    TokenUsage,
    // Authentication
    AuthState,
    AuthToken,
    mask_secret,
    normalize_expiry,
    // Settings & Streaming
    ChatSettings,
    DEFAULT_MODEL,
    OutputFormat,
    SendMessageResult,
    StreamEvent,
    // Snapshots
    ConversationSnapshot,
    UsageTotals,
};

pub use estimate::{estimate_tokens, estimate_tokens_for};
pub use memory::{MemoryConversationStore, MemorySettingsSource, MemoryTokenStore};
pub use traits::{ConversationStore, SettingsSource, TokenStore};
