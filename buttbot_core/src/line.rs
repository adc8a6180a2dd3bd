// Line mutation engine: picks which words of a chat line to mutate and
// reassembles the result.
//
// Tokenization is a single-space split of the trimmed line; runs of spaces
// produce empty tokens and survive the round trip unchanged. Only tokens
// whose letter core is not a stop word are candidate positions.
//
// Per call, one draw fixes the replacement ceiling
// `floor(r * floor(tokens / factor)) + 1`, then each of that many attempts
// draws a candidate position. A position drawn twice wastes its attempt; it
// is not redrawn. For each fresh position the mapping lookup is consulted
// first:
// - mapping scored above the negative threshold -> its text, verbatim;
// - mapping scored at or below the threshold -> the word is left alone;
// - no mapping -> the word mutator.
// A whole-word replacement by the meme also claims both neighbouring
// positions so the line does not collapse into a run of memes.
//
// The joined line has its URIs wrapped in `<...>` as a last step.

use buttbot_lang::{Hyphenator, StopWords};
use buttbot_prng::RandomSource;

use crate::config::MutationConfig;
use crate::eligibility::Eligibility;
use crate::error::MutationError;
use crate::store::MappingLookup;
use crate::uri::escape_links;
use crate::word::{WordMutator, split_affixes};

/// One word replaced by the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChangedWord {
    pub original: String,
    pub mutated: String,
}

/// A successfully mutated line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MutationResult {
    pub text: String,
    /// In the order the replacements were made.
    pub changed_words: Vec<ChangedWord>,
}

pub struct LineMutator<'a> {
    config: &'a MutationConfig,
    eligibility: Eligibility<'a>,
    words: WordMutator<'a>,
}

impl<'a> LineMutator<'a> {
    pub fn new(
        config: &'a MutationConfig,
        stop_words: &'a StopWords,
        hyphenator: &'a dyn Hyphenator,
    ) -> Self {
        let eligibility = Eligibility::new(&config.meme, stop_words);
        Self {
            config,
            eligibility,
            words: WordMutator::new(&config.meme, eligibility, hyphenator),
        }
    }

    pub fn mutate<M: MappingLookup + ?Sized>(
        &self,
        line: &str,
        mappings: &M,
        rng: &mut dyn RandomSource,
    ) -> Result<MutationResult, MutationError> {
        let original = line.trim();
        let mut tokens: Vec<String> = original.split(' ').map(str::to_string).collect();
        let required = self.config.min_words_before_mutation;
        if tokens.len() < required {
            return Err(MutationError::InsufficientLength {
                words: tokens.len(),
                required,
            });
        }

        let candidates: Vec<usize> = tokens
            .iter()
            .enumerate()
            .filter(|(_, t)| !self.eligibility.is_stop_word(split_affixes(t).core))
            .map(|(i, _)| i)
            .collect();
        if candidates.is_empty() {
            return Err(MutationError::NoEligibleWords);
        }

        let per_factor = tokens.len() / self.config.max_candidates_factor.max(1);
        let limit = (rng.next_f64() * per_factor as f64) as usize + 1;

        let mut used = vec![false; tokens.len()];
        let mut changed_words = Vec::new();
        for _ in 0..limit {
            let index = candidates[rng.pick_index(candidates.len())];
            if used[index] {
                continue;
            }
            used[index] = true;

            let token = &tokens[index];
            let replacement = match mappings.find_mapping(token)? {
                Some(mapping) if mapping.score > self.config.negative_threshold => mapping.mutated,
                Some(_) => token.clone(),
                None => self.words.mutate(token, rng),
            };

            if self.words.is_whole_meme(&replacement) {
                if index > 0 {
                    used[index - 1] = true;
                }
                if index + 1 < used.len() {
                    used[index + 1] = true;
                }
            }
            if replacement != *token {
                changed_words.push(ChangedWord {
                    original: token.clone(),
                    mutated: replacement.clone(),
                });
                tokens[index] = replacement;
            }
        }

        let joined = tokens.join(" ");
        if joined == original {
            return Err(MutationError::NoEffectiveChange);
        }
        Ok(MutationResult {
            text: escape_links(&joined),
            changed_words,
        })
    }
}
