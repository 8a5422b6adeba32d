//! Minimal client for Dify "completion-messages" applications.
//!
//! Each Dify application is addressed by its own API key, so callers hold one
//! [`DifyClient`] per application and can share a single `reqwest::Client`
//! between them with [`DifyClient::with_http`].

mod client;
pub mod error;
pub mod types;

pub use client::DifyClient;
pub use error::DifyError;
pub use types::{CompletionRequest, CompletionResponse, ResponseMode, Usage};
