//! Casual phrases that short-circuit classification.

use std::collections::HashSet;

/// Built-in greeting phrases.
pub const GREETINGS: &[&str] = &[
    "hi",
    "hello",
    "hello there",
    "hello chatbot",
    "hey",
    "wow",
    "ok",
    "okay",
    "thanks",
    "thank you",
    "good morning",
    "good evening",
];

/// Trim and lowercase user text (or a greeting entry) for comparison.
pub fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Immutable set of normalized greeting phrases.
///
/// Entries are normalized on construction, so a stray space or capital in the
/// source list can never make an entry unmatchable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GreetingSet {
    phrases: HashSet<String>,
}

impl GreetingSet {
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let phrases = phrases.into_iter().map(|p| normalize(p.as_ref())).filter(|p| !p.is_empty()).collect();

        Self { phrases }
    }

    /// The built-in greeting set.
    pub fn builtin() -> Self {
        Self::new(GREETINGS)
    }

    /// Exact match against already-normalized input.
    pub fn is_greeting(&self, normalized: &str) -> bool {
        self.phrases.contains(normalized)
    }

    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }
}
