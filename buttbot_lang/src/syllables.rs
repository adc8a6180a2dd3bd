// Syllable splitting for English words.
//
// The word mutator swaps one syllable of a word for the meme token, so it
// needs a way to cut "computer" into ["com", "put", "er"]. `Hyphenator` is
// the seam; `DictionaryHyphenator` is the production implementation, a
// Knuth-Liang pattern lookup over the en-US TeX hyphenation dictionary
// embedded by the `hyphenation` crate. The dictionary's own minimums apply
// (at least 2 letters before the first break, 3 after the last), so short
// words come back whole.
//
// Contract (relied on by `buttbot_core::word`): concatenating the returned
// fragments reproduces the input exactly, and the result is never empty for
// a non-empty input.

use hyphenation::{Hyphenator as _, Language, Load, Standard};

/// Splits a word into ordered syllable fragments.
pub trait Hyphenator {
    fn hyphenate(&self, word: &str) -> Vec<String>;
}

/// Dictionary-backed hyphenator.
pub struct DictionaryHyphenator {
    dictionary: Standard,
}

impl DictionaryHyphenator {
    pub fn new(dictionary: Standard) -> Self {
        Self { dictionary }
    }
}

impl Hyphenator for DictionaryHyphenator {
    fn hyphenate(&self, word: &str) -> Vec<String> {
        // Patterns are lowercase. ASCII lowercasing keeps every byte offset,
        // so the breaks found on `lower` cut `word` at the same places.
        let lower = word.to_ascii_lowercase();
        let breaks = self.dictionary.hyphenate(&lower).breaks;

        let mut fragments = Vec::with_capacity(breaks.len() + 1);
        let mut start = 0;
        for b in breaks {
            if b > start && word.is_char_boundary(b) {
                fragments.push(word[start..b].to_string());
                start = b;
            }
        }
        fragments.push(word[start..].to_string());
        fragments
    }
}

/// The embedded en-US dictionary.
///
/// # Panics
/// Panics if the embedded dictionary cannot be decoded (a build defect,
/// not a runtime condition).
pub fn default_hyphenator() -> DictionaryHyphenator {
    let dictionary = Standard::from_embedded(Language::EnglishUS)
        .expect("embedded en-US hyphenation dictionary is malformed");
    DictionaryHyphenator::new(dictionary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn split(word: &str) -> Vec<String> {
        default_hyphenator().hyphenate(word)
    }

    #[test]
    fn short_words_stay_whole() {
        for w in ["fox", "cat", "the", "a"] {
            assert_eq!(split(w), vec![w.to_string()], "{w}");
        }
    }

    #[test]
    fn dictionary_breaks_are_used() {
        assert_eq!(split("hyphenation"), vec!["hy", "phen", "ation"]);
        assert_eq!(split("computer"), vec!["com", "put", "er"]);
    }

    #[test]
    fn case_is_preserved_in_fragments() {
        assert_eq!(split("HYPHENATION"), vec!["HY", "PHEN", "ATION"]);
        assert_eq!(split("Computer"), vec!["Com", "put", "er"]);
    }

    #[test]
    fn fragments_always_rejoin_to_input() {
        let hyphenator = default_hyphenator();
        for w in [
            "hyphenation",
            "Mississippi",
            "rhythm",
            "beautiful",
            "STREAMER",
            "queueing",
            "table",
            "abc",
            "a",
        ] {
            let parts = hyphenator.hyphenate(w);
            assert!(!parts.is_empty());
            assert_eq!(parts.concat(), w, "fragments of {w} must rejoin");
        }
    }
}
