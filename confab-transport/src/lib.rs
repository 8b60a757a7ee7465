// Lint configuration for this crate
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::must_use_candidate)]

//! # Confab Transport
//!
//! HTTP plumbing for the completion API.
//!
//! - [`http::HttpClient`] - reqwest wrapper with tracing and timeouts
//! - [`auth::AuthClient`] - token endpoint client behind [`TokenIssuer`]
//! - [`chat::HttpChatTransport`] - completions, streaming and model
//!   listing behind [`ChatTransport`]
//! - [`stream::EventStream`] - pull-based decoder for server-sent events
//! - [`wire`] - request and response bodies
//!
//! ## Example
//!
//! ```ignore
//! use confab_transport::{ChatMessage, ChatRequest, ChatTransport, HttpChatTransport, HttpClient};
//!
//! let http = HttpClient::new()?;
//! let transport = HttpChatTransport::new(http, "https://api.example.com/v1")?;
//! let request = ChatRequest::new("GigaChat", vec![ChatMessage::user("Hello")]);
//! let reply = transport.send(&request, &token).await?;
//! ```

pub mod auth;
pub mod chat;
pub mod error;
pub mod http;
pub mod stream;
pub mod wire;

// Errors
pub use error::TransportError;

// Clients
pub use auth::{AuthClient, DEFAULT_SCOPE, TokenIssuer};
pub use chat::{ChatTransport, HttpChatTransport};
pub use http::{HttpClient, Timeouts};

// Streaming
pub use stream::{ByteStream, EventStream, parse_data};

// Wire types
pub use wire::{
    ApiErrorBody, AuthResponse, ChatMessage, ChatRequest, ChatResponse, Choice, ModelInfo, Usage,
};
