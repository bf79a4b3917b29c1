//! Prompt rendering and the sliding context window.
//!
//! The system preamble is not stored as a message: it is rendered fresh on
//! every call (it carries the current date and time), so however much
//! history is evicted it always comes first.

mod builder;
mod render;


pub use builder::{normalize_user_text, PromptBuilder, RenderedPrompt};
pub use render::{render_text, system_preamble, ChatMessage, ChatRole, PromptPayload};
