// src/tokenizer.rs
// Token counting for context budgets: tiktoken when available, word estimate otherwise

use tracing::{debug, warn};

/// Counts tokens the same way the generation side will see them.
pub trait TokenCounter: Send + Sync {
    fn count(&self, text: &str) -> usize;
    fn name(&self) -> &str;
}

/// BPE token counter backed by tiktoken-rs.
pub struct TiktokenCounter {
    bpe: tiktoken_rs::CoreBPE,
    encoding: String,
}

impl TiktokenCounter {
    /// Load a named encoding (`cl100k_base`, `o200k_base`, `p50k_base`, `r50k_base`).
    pub fn new(encoding: &str) -> Result<Self, String> {
        let bpe = match encoding {
            "cl100k_base" => tiktoken_rs::cl100k_base(),
            "o200k_base" => tiktoken_rs::o200k_base(),
            "p50k_base" => tiktoken_rs::p50k_base(),
            "r50k_base" => tiktoken_rs::r50k_base(),
            other => return Err(format!("Unknown tiktoken encoding: {}", other)),
        }
        .map_err(|e| e.to_string())?;

        debug!(encoding = %encoding, "Loaded tiktoken encoding");
        Ok(Self {
            bpe,
            encoding: encoding.to_string(),
        })
    }
}

impl TokenCounter for TiktokenCounter {
    fn count(&self, text: &str) -> usize {
        self.bpe.encode_with_special_tokens(text).len()
    }

    fn name(&self) -> &str {
        &self.encoding
    }
}

/// Approximates tokens as `floor(words * 1.3)`.
///
/// Integer arithmetic keeps the result identical across platforms.
#[derive(Debug, Clone, Copy, Default)]
pub struct WordEstimateCounter;

impl TokenCounter for WordEstimateCounter {
    fn count(&self, text: &str) -> usize {
        text.split_whitespace().count() * 13 / 10
    }

    fn name(&self) -> &str {
        "word-estimate"
    }
}

/// Build the configured counter. `estimate` selects the word estimator directly;
/// any encoding that fails to load degrades to it as well.
pub fn default_counter(encoding: &str) -> Box<dyn TokenCounter> {
    if encoding.eq_ignore_ascii_case("estimate") {
        return Box::new(WordEstimateCounter);
    }
    match TiktokenCounter::new(encoding) {
        Ok(counter) => Box::new(counter),
        Err(e) => {
            warn!(encoding = %encoding, error = %e, "Tokenizer unavailable, using word-count estimate");
            Box::new(WordEstimateCounter)
        }
    }
}
