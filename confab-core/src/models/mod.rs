//! Domain models for Confab.
//!
//! ## Submodules
//!
//! - [`message`] - Messages, roles, statuses and token usage
//! - [`auth`] - Bearer tokens and the observable auth state
//! - [`context`] - Conversation window, summaries and stats
//! - [`settings`] - Chat settings and output formats
//! - [`stream`] - Streaming events and send results
//! - [`snapshot`] - Usage totals and exported conversations

pub mod auth;
pub mod context;
pub mod message;
pub mod settings;
pub mod snapshot;
pub mod stream;

pub use auth::{AuthState, AuthToken, mask_secret, normalize_expiry};
pub use context::{ContextStats, ContextSummary, ConversationWindow};
pub use message::{Message, MessageStatus, Role, TokenUsage};
pub use settings::{ChatSettings, DEFAULT_MODEL, OutputFormat};
pub use snapshot::{ConversationSnapshot, UsageTotals};
pub use stream::{SendMessageResult, StreamEvent};
