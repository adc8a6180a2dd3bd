// Shared English text resources for the mutation engine.
//
// Provides the linguistic building blocks `buttbot_core` needs to decide
// where a meme token can go inside a word. No chat, storage, or RNG
// dependencies: everything here is a pure function of its input.
//
// Architecture:
// - `syllables.rs`: `Hyphenator` trait and `DictionaryHyphenator`, the
//   en-US dictionary syllable splitter (`default_hyphenator()`)
// - `plural.rs`: basic English plural folding (`singular`, `is_plural`) and
//   case-preserving pluralization (`plural`)
// - `lib.rs` (this file): `StopWords`, which loads and queries the JSON
//   stop-word list, plus small casing helpers shared by the word mutator
//
// The stop-word list is loaded from `data/stopwords.json` via
// `StopWords::from_json()`. The `default_stop_words()` convenience function
// uses `include_str!` to embed the default list at compile time.

pub mod plural;
pub mod syllables;

pub use plural::{is_plural, plural, singular};
pub use syllables::{DictionaryHyphenator, Hyphenator, default_hyphenator};

use std::collections::BTreeSet;

/// The top-level JSON structure for the stop-word file.
#[derive(Debug, serde::Deserialize)]
struct StopWordFile {
    words: Vec<String>,
}

/// A set of words that are never mutated.
///
/// Entries are stored lowercased; lookups are ASCII-case-insensitive exact
/// matches ("The" matches "the", "there" does not).
#[derive(Debug, Clone, Default)]
pub struct StopWords {
    words: BTreeSet<String>,
}

impl StopWords {
    /// Parse a stop-word list from a JSON string of the form
    /// `{"words": ["a", "the", ...]}`.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let file: StopWordFile = serde_json::from_str(json)?;
        Ok(Self::from_words(file.words))
    }

    /// Build a list from any iterator of words.
    pub fn from_words<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        StopWords {
            words: words
                .into_iter()
                .map(|w| w.as_ref().to_ascii_lowercase())
                .collect(),
        }
    }

    /// Whether `word` is a stop word.
    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(&word.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Load the default stop-word list embedded at compile time.
///
/// Uses `include_str!` to embed `data/stopwords.json`. Panics if the
/// embedded JSON is malformed (should never happen in a released build).
pub fn default_stop_words() -> StopWords {
    let json = include_str!("../../data/stopwords.json");
    StopWords::from_json(json).expect("embedded stopwords.json is malformed")
}

/// Capitalize the first character of a string.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        None => String::new(),
        Some(c) => {
            let upper: String = c.to_uppercase().collect();
            format!("{}{}", upper, chars.as_str())
        }
    }
}

/// True if `s` contains at least one letter and no lowercase letters.
pub fn is_all_uppercase(s: &str) -> bool {
    s.chars().any(char::is_alphabetic) && s == s.to_uppercase()
}

/// True if the first character is an ASCII uppercase letter.
pub fn starts_uppercase(s: &str) -> bool {
    s.chars().next().is_some_and(|c| c.is_ascii_uppercase())
}
