// Error types for the mutation pipeline and its collaborators.
//
// Every error here is line-local: `Bot::handle_line` logs and swallows all
// of them, so nothing in this module is fatal to the process. The split
// mirrors where a failure originates:
// - `MutationError`: the line mutation engine gave up on this line.
// - `StoreError`: the persistence collaborator could not be reached or read
//   (surfaced to the orchestrator as `BotError::CollaboratorUnavailable`).
// - `DirectiveError`: an administrative command had the wrong shape.
// - `TransportError`: the chat transport refused an outgoing line.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Reasons the line mutation engine declined to produce output.
#[derive(Error, Debug)]
pub enum MutationError {
    #[error("not enough words to mutate ({words} < {required})")]
    InsufficientLength { words: usize, required: usize },

    #[error("no eligible words in line")]
    NoEligibleWords,

    #[error("mutation left the line unchanged")]
    NoEffectiveChange,

    /// Reported by `Bot::handle_line` as `BotError::CollaboratorUnavailable`.
    #[error("mapping lookup failed: {0}")]
    Lookup(#[from] StoreError),
}

/// Failures of the persistence collaborator.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store I/O failed at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("store document is malformed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// A recognized administrative directive with the wrong argument count.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectiveError {
    #[error("malformed {directive} directive: expected {expected} argument(s), found {found}")]
    Malformed {
        directive: &'static str,
        expected: usize,
        found: usize,
    },
}

/// The chat transport could not deliver a line.
#[derive(Error, Debug)]
#[error("transport send failed: {0}")]
pub struct TransportError(pub String);

/// Everything `Bot::handle_line` can swallow for a single line.
#[derive(Error, Debug)]
pub enum BotError {
    #[error(transparent)]
    Mutation(#[from] MutationError),

    #[error("collaborator unavailable: {0}")]
    CollaboratorUnavailable(#[from] StoreError),

    #[error(transparent)]
    MalformedDirective(#[from] DirectiveError),

    #[error(transparent)]
    Transport(#[from] TransportError),
}
