//! Session orchestration.
//!
//! A [`Session`] ties one `ask`/`ask_stream` call together: key selection,
//! conversation lookup, optional moderation, prompt building, the transport
//! call, stream draining, reply cleanup, history append and usage
//! accounting.

mod chat;
mod manager;
mod types;

#[cfg(test)]
mod tests;

pub use manager::Session;
pub use types::{scrub_reply, FLAGGED_REPLY};
