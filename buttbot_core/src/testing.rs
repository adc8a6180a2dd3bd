// Test doubles shared by the unit tests in this crate.

use buttbot_lang::Hyphenator;

/// Hyphenator with fixed splits, written `"com|put|er"`. Lookup is
/// case-insensitive and fragments keep the input's casing; unknown words
/// come back whole.
pub struct SyllableTable {
    entries: Vec<(String, Vec<usize>)>,
}

impl SyllableTable {
    pub fn new(splits: &[&str]) -> Self {
        let entries = splits
            .iter()
            .map(|s| {
                let lengths = s.split('|').map(str::len).collect();
                (s.replace('|', ""), lengths)
            })
            .collect();
        Self { entries }
    }
}

impl Default for SyllableTable {
    fn default() -> Self {
        Self::new(&["com|put|er", "com|put|ers"])
    }
}

impl Hyphenator for SyllableTable {
    fn hyphenate(&self, word: &str) -> Vec<String> {
        let lower = word.to_ascii_lowercase();
        let Some((_, lengths)) = self.entries.iter().find(|(w, _)| *w == lower) else {
            return vec![word.to_string()];
        };
        let mut fragments = Vec::with_capacity(lengths.len());
        let mut start = 0;
        for len in lengths {
            fragments.push(word[start..start + len].to_string());
            start += len;
        }
        fragments
    }
}
