//! OpenAI HTTP transport.
//!
//! Speaks both `/v1/completions` and `/v1/chat/completions`, streaming or
//! not, with `Authorization: Bearer` keys supplied per call.

mod api;
mod client;
mod config;

pub use client::OpenAiClient;
pub use config::OpenAiConfig;
