// Mutation engine and trigger controller for buttbot.
//
// Given a chat line, decide whether to react to it and, if so, replace a few
// of its words (or single syllables of them) with the meme token. This crate
// is transport-agnostic: the chat connection is abstracted behind the
// `ChatTransport` trait and persistence behind `BotStore`, and every random
// draw goes through `buttbot_prng::RandomSource`.
//
// Module overview, leaf-first:
// - `uri.rs`:         absolute-URI check (`url` crate) and `<...>` link escaping.
// - `eligibility.rs`: may a word be mutated (meme, stop words, URIs)?
// - `word.rs`:        single-word mutation with casing, plurality, punctuation.
// - `store.rs`:       word mappings, counters, channel overrides
//                     (`MemoryStore`, `JsonFileStore`).
// - `line.rs`:        picks words in a line and reassembles the result.
// - `trigger.rs`:     per-channel lock counter and escalating chance.
// - `directive.rs`:   `<map`, `<unmap`, `<force`, `<count` parsing.
// - `config.rs`:      `BotConfig`, `ChannelOverrides`, resolved
//                     `MutationConfig`.
// - `bot.rs`:         `Bot::handle_line`, the orchestrator tying it together.
// - `error.rs`:       error enums; all line-local, none fatal.

pub mod bot;
pub mod config;
pub mod directive;
pub mod eligibility;
pub mod error;
pub mod line;
pub mod store;
pub mod trigger;
pub mod uri;
pub mod word;

#[cfg(test)]
mod testing;

pub use bot::{Bot, ChatLine, ChatTransport, LineOutcome};
pub use config::{BotConfig, ChannelOverrides, ConfigError, MutationConfig};
pub use error::{BotError, MutationError, StoreError, TransportError};
pub use line::{ChangedWord, LineMutator, MutationResult};
pub use store::{BotStore, JsonFileStore, MappingLookup, MemoryStore, WordMapping};
