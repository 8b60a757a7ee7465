// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Confab Session
//!
//! The stateful core of Confab.
//!
//! - [`TokenManager`] - bearer token lifecycle with single-flight refresh
//! - [`ContextWindowManager`] - compression decisions, summarization, and
//!   request context assembly
//! - [`ChatSession`] - one "send message" operation composed from the above,
//!   including the 401 refresh-and-retry
//!
//! ## Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use confab_session::{ChatSession, TokenManager};
//!
//! let tokens = Arc::new(TokenManager::new(issuer, token_store));
//! let mut session = ChatSession::new(tokens, transport, settings, conversations);
//! session.restore().await?;
//!
//! let result = session.send_message("Hello").await?;
//! println!("{}", result.message.content);
//! ```

pub mod auth;
pub mod context;
pub mod error;
pub mod prompts;
pub mod session;

#[cfg(test)]
mod testing;

pub use auth::{TOKEN_REFRESH_MARGIN_SECS, TokenManager};
pub use context::{Compression, ContextWindowManager, transcript};
pub use error::{ChatError, SendFailure};
pub use session::ChatSession;
