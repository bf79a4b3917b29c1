//! Server-Sent Events (SSE) decoding for streamed replies.
//!
//! Decoding runs in two stages. [`SseDecoder`] frames raw bytes into lines
//! and forwards the JSON payload of each `data: ` line, stopping for good at
//! the `data: [DONE]` sentinel. [`extract_delta`] then pulls the text delta
//! out of a payload in either the completion or the chat shape.
//!
//! [`decode_stream`] drives the decoder over a byte stream as a pull-based
//! `Stream`: it only polls the transport when the caller asks for the next
//! payload, and dropping it releases any buffered partial line.

mod decoder;
mod payload;


pub use decoder::{
    decode_stream, decode_stream_with, DecoderState, SseDecoder, DATA_PREFIX, DONE_SENTINEL,
};
pub use payload::extract_delta;
