// Word mutator: turns one eligible word into its meme form.
//
// A raw token is split into leading punctuation, a letter core, and trailing
// punctuation (`"(Buttons!)"` -> `"("`, `"Buttons"`, `"!)"`). The core is
// hyphenated; a multi-syllable core gets one random syllable replaced by the
// meme token, a single-syllable core is replaced whole. Punctuation is
// reattached byte-for-byte.
//
// Casing rules, applied to the meme token before substitution:
// - core entirely uppercase -> meme uppercased;
// - core starts uppercase and the swap lands on the first syllable (or the
//   whole word is replaced) -> meme capitalized.
// Plurality: a plural core gets a pluralized meme when the meme ends up
// carrying the word's ending (whole-word replacement, or the last syllable
// swapped). Swapping an inner syllable keeps the original ending, which
// already carries the plural.
//
// The full eligibility filter is re-checked on the core here, independent of
// whatever the line engine already filtered, so this function is safe to
// call on any token.

use buttbot_lang::{Hyphenator, capitalize, is_all_uppercase, is_plural, plural, starts_uppercase};
use buttbot_prng::RandomSource;

use crate::eligibility::Eligibility;

/// A token split around its letter core.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Affixes<'a> {
    pub prefix: &'a str,
    pub core: &'a str,
    pub suffix: &'a str,
}

/// Split a token into leading non-letters, the core (first ASCII letter to
/// last ASCII letter, inclusive), and trailing non-letters. A token with no
/// letters is all prefix.
pub fn split_affixes(token: &str) -> Affixes<'_> {
    let Some(start) = token.find(|c: char| c.is_ascii_alphabetic()) else {
        return Affixes {
            prefix: token,
            core: "",
            suffix: "",
        };
    };
    // Letters are ASCII, so the byte after the last one is a char boundary.
    let end = token
        .rfind(|c: char| c.is_ascii_alphabetic())
        .map_or(token.len(), |i| i + 1);
    Affixes {
        prefix: &token[..start],
        core: &token[start..end],
        suffix: &token[end..],
    }
}

/// Mutates single words.
pub struct WordMutator<'a> {
    meme: &'a str,
    eligibility: Eligibility<'a>,
    hyphenator: &'a dyn Hyphenator,
}

impl<'a> WordMutator<'a> {
    pub fn new(meme: &'a str, eligibility: Eligibility<'a>, hyphenator: &'a dyn Hyphenator) -> Self {
        Self {
            meme,
            eligibility,
            hyphenator,
        }
    }

    /// Mutate `raw`, or return it unchanged if its core is empty or
    /// ineligible. Draws from `rng` only when the core has 2+ syllables.
    pub fn mutate(&self, raw: &str, rng: &mut dyn RandomSource) -> String {
        let Affixes {
            prefix,
            core,
            suffix,
        } = split_affixes(raw);
        if core.is_empty() || !self.eligibility.is_eligible(raw, core) {
            return raw.to_string();
        }

        let mut syllables = self.hyphenator.hyphenate(core);
        let mut meme = if is_all_uppercase(core) {
            self.meme.to_uppercase()
        } else {
            self.meme.to_string()
        };
        let plural_core = is_plural(core);

        let body = if syllables.len() > 1 {
            let swap = rng.pick_index(syllables.len());
            if swap == 0 && starts_uppercase(core) {
                meme = capitalize(&meme);
            }
            // Only the last syllable carries the plural ending; an inner swap
            // keeps it ("buttputers", not "buttsputers").
            if plural_core && swap == syllables.len() - 1 {
                meme = plural(&meme);
            }
            syllables[swap] = meme;
            syllables.concat()
        } else {
            if starts_uppercase(core) {
                meme = capitalize(&meme);
            }
            if plural_core {
                meme = plural(&meme);
            }
            meme
        };

        format!("{prefix}{body}{suffix}")
    }

    /// Whether `token` is a whole-word replacement by the meme (in any case,
    /// singular or plural), ignoring punctuation.
    pub fn is_whole_meme(&self, token: &str) -> bool {
        let core = split_affixes(token).core.to_lowercase();
        let meme = self.meme.to_lowercase();
        core == meme || core == plural(&meme)
    }
}
