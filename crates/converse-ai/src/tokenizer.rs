//! Token counting.
//!
//! Budgets are enforced in model tokens, not characters. [`BpeTokenizer`]
//! wraps the byte-pair encodings shipped with `tiktoken-rs`; anything that
//! implements [`Tokenizer`] can stand in for it.

use tiktoken_rs::CoreBPE;

use crate::AiError;

/// Counts tokens in a piece of text.
pub trait Tokenizer: Send + Sync {
    fn count(&self, text: &str) -> usize;
}

/// Byte-pair-encoding tokenizer for OpenAI models.
pub struct BpeTokenizer {
    bpe: CoreBPE,
}

impl BpeTokenizer {
    /// The GPT-3 (`r50k_base`) encoding.
    pub fn r50k() -> Result<Self, AiError> {
        let bpe = tiktoken_rs::r50k_base().map_err(|e| AiError::Tokenizer(e.to_string()))?;
        Ok(Self { bpe })
    }

    /// The encoding `model` uses, or `r50k_base` for unknown models.
    pub fn for_model(model: &str) -> Result<Self, AiError> {
        match tiktoken_rs::get_bpe_from_model(model) {
            Ok(bpe) => Ok(Self { bpe }),
            Err(e) => {
                tracing::debug!(model, error = %e, "unknown model encoding, using r50k_base");
                Self::r50k()
            }
        }
    }
}

impl Tokenizer for BpeTokenizer {
    fn count(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }
}

impl std::fmt::Debug for BpeTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BpeTokenizer").finish_non_exhaustive()
    }
}
