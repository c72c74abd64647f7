//! Text Normalizer: turns extracted résumé text and job descriptions into a
//! canonical lowercase token stream for embedding.
//!
//! Steps, in order:
//! 1. separator characters → single space
//! 2. lowercase
//! 3. split on whitespace and drop every token in the stop-word set
//!    ("and" never matches inside "android"; "c++" and "&" are whole tokens)
//! 4. join with single spaces
//!
//! The output contains no separator characters and no stop-word token, so a
//! second pass changes nothing.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

/// Default English stop-word set, used when `STOP_WORDS` is not configured.
pub const DEFAULT_STOP_WORDS: &[&str] = &[
    "a", "about", "an", "and", "are", "as", "at", "be", "been", "but", "by", "can", "do", "for",
    "from", "has", "have", "he", "her", "his", "i", "if", "in", "into", "is", "it", "its", "me",
    "my", "of", "on", "or", "our", "she", "so", "that", "the", "their", "them", "they", "this",
    "to", "was", "we", "were", "will", "with", "you", "your",
];

/// `+ # & @ %` are not separators, so `c++`, `c#`, `r&d` stay whole.
static SEPARATORS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"[.,;:!?()\[\]{}"'`/\\|\-_*<>=~^•·–—…‘’“”\p{Cc}]"#).unwrap()
});

static DEFAULT: Lazy<StopWords> = Lazy::new(|| StopWords::new(DEFAULT_STOP_WORDS.iter().copied()));

/// A stop-word set, stored in the same canonical form `normalize` produces.
/// Build once at startup and share.
#[derive(Debug, Clone)]
pub struct StopWords {
    words: HashSet<String>,
}

impl StopWords {
    /// Each entry goes through the separator mapping and lowercasing, so a
    /// configured word compares equal to the token `normalize` would emit.
    /// Entries that collapse to nothing or to several tokens are skipped.
    pub fn new<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = HashSet::new();
        for raw in words {
            let raw = raw.as_ref();
            let canonical = canonical_tokens(raw);
            match canonical.as_slice() {
                [] => {}
                [token] => {
                    set.insert(token.clone());
                }
                _ => warn!(word = raw, "ignoring multi-token stop word"),
            }
        }
        Self { words: set }
    }

    /// The shared default English set.
    pub fn english() -> &'static StopWords {
        &DEFAULT
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn contains(&self, token: &str) -> bool {
        self.words.contains(token)
    }
}

impl Default for StopWords {
    fn default() -> Self {
        DEFAULT.clone()
    }
}

fn canonical_tokens(text: &str) -> Vec<String> {
    SEPARATORS
        .replace_all(text, " ")
        .to_lowercase()
        .split_whitespace()
        .map(String::from)
        .collect()
}

/// Normalizes `text` against `stopwords`. Pure and deterministic.
pub fn normalize(text: &str, stopwords: &StopWords) -> String {
    if text.is_empty() {
        return String::new();
    }

    let lowered = SEPARATORS.replace_all(text, " ").to_lowercase();
    lowered
        .split_whitespace()
        .filter(|token| !stopwords.contains(token))
        .collect::<Vec<_>>()
        .join(" ")
}
