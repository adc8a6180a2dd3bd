// Eligibility filter: may this word be mutated at all?
//
// Three independent checks, any one of which disqualifies a word:
// - it already contains the meme token (directly, or once plurals are
//   folded: "BUTTS", "buttons" and "rebutt" are all off limits);
// - it is a stop word;
// - it is an absolute URI.
//
// The filter is consulted twice per mutated word: the line engine uses the
// stop-word part to choose candidate positions, and the word mutator
// re-checks the full filter on the stripped letter core before touching it.

use buttbot_lang::{StopWords, singular};

use crate::uri::is_absolute_uri;

/// Borrowed view of everything the filter needs.
#[derive(Debug, Clone, Copy)]
pub struct Eligibility<'a> {
    meme: &'a str,
    stop_words: &'a StopWords,
}

impl<'a> Eligibility<'a> {
    pub fn new(meme: &'a str, stop_words: &'a StopWords) -> Self {
        Self { meme, stop_words }
    }

    /// Whether a word may be mutated. `raw` is the token as it appeared in
    /// the line, `stripped` is its letter core without surrounding
    /// punctuation.
    pub fn is_eligible(&self, raw: &str, stripped: &str) -> bool {
        !self.contains_meme(stripped)
            && !self.is_stop_word(stripped)
            && !is_absolute_uri(raw)
            && !is_absolute_uri(stripped)
    }

    /// Stop-word check alone; used to pick candidate positions in a line.
    pub fn is_stop_word(&self, stripped: &str) -> bool {
        self.stop_words.contains(stripped)
    }

    fn contains_meme(&self, stripped: &str) -> bool {
        let meme = self.meme.to_lowercase();
        stripped.to_lowercase().contains(&meme) || singular(stripped).contains(&meme)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use buttbot_lang::default_stop_words;

    #[test]
    fn ordinary_words_are_eligible() {
        let stop = default_stop_words();
        let filter = Eligibility::new("butt", &stop);
        for w in ["brown", "Streamer", "cats", "HELLO"] {
            assert!(filter.is_eligible(w, w), "{w}");
        }
    }

    #[test]
    fn meme_containing_words_are_not() {
        let stop = default_stop_words();
        let filter = Eligibility::new("butt", &stop);
        for w in ["butt", "BUTT", "Butts", "buttons", "rebuttal"] {
            assert!(!filter.is_eligible(w, w), "{w}");
        }
    }

    #[test]
    fn plural_folding_catches_meme_plurals() {
        let stop = StopWords::default();
        // "geese" folds to "goose", which contains the meme.
        let filter = Eligibility::new("goose", &stop);
        assert!(!filter.is_eligible("geese", "geese"));
    }

    #[test]
    fn stop_words_are_not() {
        let stop = default_stop_words();
        let filter = Eligibility::new("butt", &stop);
        for w in ["the", "The", "is", "a"] {
            assert!(!filter.is_eligible(w, w), "{w}");
            assert!(filter.is_stop_word(w));
        }
    }

    #[test]
    fn uris_are_not() {
        let stop = default_stop_words();
        let filter = Eligibility::new("butt", &stop);
        let link = "https://example.com/page";
        assert!(!filter.is_eligible(link, link));
    }

    #[test]
    fn filter_is_pure() {
        let stop = default_stop_words();
        let filter = Eligibility::new("butt", &stop);
        for w in ["brown", "butts", "the", "https://x.io", ""] {
            assert_eq!(filter.is_eligible(w, w), filter.is_eligible(w, w));
        }
    }
}
