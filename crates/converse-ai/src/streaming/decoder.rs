//! Line framing: bytes in, `data: ` payloads out.

use std::collections::VecDeque;

use futures_util::{Stream, StreamExt};
use tracing::debug;

use crate::AiError;

/// Prefix of a line carrying a payload.
pub const DATA_PREFIX: &str = "data: ";
/// Line that ends the stream.
pub const DONE_SENTINEL: &str = "data: [DONE]";

/// Where the decoder is between chunks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    /// Nothing buffered.
    AwaitingData,
    /// Holding a partial line until its newline arrives.
    Buffering,
    /// Sentinel seen (or stream failed). Further input is ignored.
    Terminated,
}

enum Line {
    Forward(String),
    Drop,
    Terminate,
}

/// Incremental SSE line framer.
///
/// Bytes are buffered until a `\n` completes a line, so a chunk boundary
/// may fall anywhere, including inside a multi-byte character.
#[derive(Debug)]
pub struct SseDecoder {
    buffer: Vec<u8>,
    /// Bytes of `buffer` already searched for a newline.
    scanned: usize,
    state: DecoderState,
    prefix: String,
    sentinel: String,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::with_framing(DATA_PREFIX, DONE_SENTINEL)
    }

    /// Decoder for a protocol with a different data prefix or sentinel.
    pub fn with_framing(prefix: impl Into<String>, sentinel: impl Into<String>) -> Self {
        Self {
            buffer: Vec::new(),
            scanned: 0,
            state: DecoderState::AwaitingData,
            prefix: prefix.into(),
            sentinel: sentinel.into(),
        }
    }

    pub fn state(&self) -> DecoderState {
        self.state
    }

    pub fn is_terminated(&self) -> bool {
        self.state == DecoderState::Terminated
    }

    /// Feed one chunk, returning the payloads of every line it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut payloads = Vec::new();
        if self.is_terminated() {
            return payloads;
        }

        self.buffer.extend_from_slice(chunk);

        while let Some(offset) = self.buffer[self.scanned..].iter().position(|&b| b == b'\n') {
            let eol = self.scanned + offset;
            self.scanned = 0;
            let raw: Vec<u8> = self.buffer.drain(..=eol).collect();
            let text = String::from_utf8_lossy(&raw);
            match self.classify(text.trim_end()) {
                Line::Forward(payload) => payloads.push(payload),
                Line::Drop => {}
                Line::Terminate => {
                    self.terminate();
                    return payloads;
                }
            }
        }

        self.scanned = self.buffer.len();
        self.state = if self.buffer.is_empty() {
            DecoderState::AwaitingData
        } else {
            DecoderState::Buffering
        };
        payloads
    }

    /// Upstream ended. An unterminated trailing line is discarded.
    pub fn finish(&mut self) {
        if !self.buffer.is_empty() {
            debug!(
                bytes = self.buffer.len(),
                "discarding unterminated line at end of stream"
            );
        }
        self.terminate();
    }

    /// Stop decoding and release the buffer.
    pub fn terminate(&mut self) {
        self.buffer = Vec::new();
        self.scanned = 0;
        self.state = DecoderState::Terminated;
    }

    fn classify(&self, line: &str) -> Line {
        if line == self.sentinel {
            Line::Terminate
        } else if let Some(payload) = line.strip_prefix(self.prefix.as_str()) {
            Line::Forward(payload.to_string())
        } else {
            // Comments, keep-alives, `event:`/`id:` fields and blank separators.
            Line::Drop
        }
    }
}

impl Default for SseDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode a byte stream into a lazy stream of raw JSON payloads.
///
/// A transport error is yielded once and ends the stream.
pub fn decode_stream<S>(bytes: S) -> impl Stream<Item = Result<String, AiError>> + Send
where
    S: Stream<Item = Result<Vec<u8>, AiError>> + Unpin + Send,
{
    decode_stream_with(bytes, SseDecoder::new())
}

/// [`decode_stream`] with a caller-configured decoder.
pub fn decode_stream_with<S>(
    bytes: S,
    decoder: SseDecoder,
) -> impl Stream<Item = Result<String, AiError>> + Send
where
    S: Stream<Item = Result<Vec<u8>, AiError>> + Unpin + Send,
{
    let state = (bytes, decoder, VecDeque::<String>::new());
    futures_util::stream::unfold(state, |(mut bytes, mut decoder, mut pending)| async move {
        loop {
            if let Some(payload) = pending.pop_front() {
                return Some((Ok(payload), (bytes, decoder, pending)));
            }
            if decoder.is_terminated() {
                return None;
            }
            match bytes.next().await {
                Some(Ok(chunk)) => pending.extend(decoder.feed(&chunk)),
                Some(Err(e)) => {
                    decoder.terminate();
                    return Some((Err(e), (bytes, decoder, pending)));
                }
                None => {
                    decoder.finish();
                    return None;
                }
            }
        }
    })
}
