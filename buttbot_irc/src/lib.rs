// buttbot_irc: IRC transport for buttbot.
//
// Connects the transport-agnostic `buttbot_core::Bot` to an IRC server
// (Twitch chat by default). Lines arriving on joined channels are handed to
// `Bot::handle_line`; the bot answers through the `ChatTransport` impl on
// `IrcClient`.
//
// Module overview:
// - `framing.rs`:  CRLF line framing with the 512-byte IRC limit.
// - `message.rs`:  `IrcMessage` parsing (tags, prefix, params) and
//                  formatting helpers for the commands the client sends.
// - `client.rs`:   `IrcClient`, a blocking TCP client. Registration runs on
//                  the calling thread; a reader thread feeds an `mpsc` inbox.
// - `runner.rs`:   the bot thread (`start_bot`, `BotHandle`): PING/PONG,
//                  PRIVMSG dispatch, reconnect with backoff.
// - `error.rs`:    `IrcError`.
//
// The `buttbot` binary (`main.rs`) wires config, logging, store and RNG
// together and runs `start_bot` until the connection is rejected or the
// process is killed.

pub mod client;
pub mod error;
pub mod framing;
pub mod message;
pub mod runner;

pub use client::{Credentials, IrcClient};
pub use error::IrcError;
pub use runner::{BotHandle, ConnectOptions, start_bot};
