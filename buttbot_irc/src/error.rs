// Transport errors.
//
// `Rejected` is the only one the runner treats as final: the server turned
// the credentials down, so reconnecting with the same ones is pointless.
// Everything else ends the current connection and triggers a reconnect.

use std::io;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum IrcError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("protocol error: {0}")]
    Protocol(String),

    #[error("server rejected login: {0}")]
    Rejected(String),
}
