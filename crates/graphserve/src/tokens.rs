//! Token counting shared by the context builders.
//!
//! Both engines budget their context windows in `cl100k_base` tokens, the
//! encoding used by the gpt-4 family.

use std::sync::Arc;

use tiktoken_rs::{cl100k_base, CoreBPE};

use crate::error::{Error, Result};

/// Cheap-to-clone handle over a `cl100k_base` encoder.
#[derive(Clone)]
pub struct TokenCounter {
    bpe: Arc<CoreBPE>,
}

impl TokenCounter {
    /// Build a counter for the `cl100k_base` encoding.
    pub fn cl100k() -> Result<Self> {
        let bpe = cl100k_base().map_err(|e| Error::Tokenizer(e.to_string()))?;
        Ok(Self { bpe: Arc::new(bpe) })
    }

    /// Number of tokens in `text`.
    #[must_use]
    pub fn count(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }
}

impl std::fmt::Debug for TokenCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCounter").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn counts_are_monotonic_in_text_length() {
        let counter = TokenCounter::cl100k().unwrap();
        let short = counter.count("hello");
        let long = counter.count("hello hello hello hello");
        assert!(short >= 1);
        assert!(long > short);
    }
}
