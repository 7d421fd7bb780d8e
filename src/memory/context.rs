// src/memory/context.rs
// Context assembly: pack retrieved passages into a token budget

use crate::memory::vector_store::Passage;
use crate::tokenizer::TokenCounter;
use std::sync::Arc;
use tracing::debug;

/// Separator placed between passages in assembled context.
pub const SECTION_SEPARATOR: &str = "\n\n---\n\n";

/// Default token budget for assembled context.
pub const DEFAULT_MAX_CONTEXT_TOKENS: usize = 250;

/// Packs passages into a single context string that fits a token budget.
///
/// Whole passages are taken in order while they fit. The first passage that
/// would overflow contributes as many leading words as still fit, and assembly
/// stops there: later passages are never considered, so the output is always a
/// prefix of the ranked passage list.
///
/// Budget checks measure the assembled candidate string itself (separators
/// included), so the returned text never counts above `max_tokens`.
#[derive(Clone)]
pub struct ContextAssembler {
    counter: Arc<dyn TokenCounter>,
}

impl ContextAssembler {
    pub fn new(counter: Arc<dyn TokenCounter>) -> Self {
        Self { counter }
    }

    pub fn counter(&self) -> &dyn TokenCounter {
        self.counter.as_ref()
    }

    /// Assemble retrieved passages in ranking order.
    pub fn assemble(&self, passages: &[Passage], max_tokens: usize) -> String {
        let sections: Vec<&str> = passages.iter().map(|p| p.content.as_str()).collect();
        self.assemble_sections(&sections, max_tokens)
    }

    /// Assemble raw text sections in order.
    pub fn assemble_sections(&self, sections: &[&str], max_tokens: usize) -> String {
        let joined = sections.join(SECTION_SEPARATOR);
        if self.counter.count(&joined) <= max_tokens {
            return joined;
        }

        let mut context = String::new();
        for (idx, section) in sections.iter().enumerate() {
            let candidate = append_section(&context, section);
            if self.counter.count(&candidate) <= max_tokens {
                context = candidate;
                continue;
            }

            let partial = self.fit_words(&context, section, max_tokens);
            debug!(
                section = idx,
                kept_words = partial.split_whitespace().count(),
                "Context budget reached, truncating section"
            );
            if !partial.is_empty() {
                context = append_section(&context, &partial);
            }
            break;
        }

        context
    }

    /// Longest word prefix of `section` that still fits after `context`.
    fn fit_words(&self, context: &str, section: &str, max_tokens: usize) -> String {
        let mut partial = String::new();
        for word in section.split_whitespace() {
            let next = if partial.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", partial, word)
            };
            if self.counter.count(&append_section(context, &next)) <= max_tokens {
                partial = next;
            } else {
                break;
            }
        }
        partial
    }
}

fn append_section(context: &str, section: &str) -> String {
    if context.is_empty() {
        section.to_string()
    } else {
        format!("{}{}{}", context, SECTION_SEPARATOR, section)
    }
}
