// Blocking TCP client for an IRC server (Twitch chat in practice).
//
// Architecture:
// - `connect()` performs TCP connect and the registration handshake on the
//   calling thread (PASS, NICK, wait for `001`), joins the configured
//   channels, then spawns a background reader thread.
// - The reader thread calls `read_line()` in a loop, parses each line into
//   an `IrcMessage`, and pushes it into an `mpsc` channel. Lines that do not
//   parse are logged and skipped. On EOF or a read error the thread exits,
//   which disconnects the channel.
// - The owning thread holds a `BufWriter<TcpStream>` for sending and drains
//   the inbox with `recv_timeout()`.
//
// Only the owning thread writes to the socket; the reader thread only reads.
//
// See also: `runner.rs`, which owns an `IrcClient` and feeds its messages to
// the `Bot`.

use std::io::{BufReader, BufWriter};
use std::net::{Shutdown, TcpStream};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use buttbot_core::config::channel_key;
use buttbot_core::{ChatTransport, TransportError};
use tracing::{debug, info, warn};

use crate::error::IrcError;
use crate::framing::{fit_to_line, read_line, write_line};
use crate::message::{self, IrcMessage};

/// How long the registration handshake may take.
const HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// NOTICE texts Twitch sends when it refuses the PASS/NICK pair.
const AUTH_FAILURE_NOTICES: &[&str] = &[
    "Login authentication failed",
    "Login unsuccessful",
    "Improperly formatted auth",
];

/// Login details for `IrcClient::connect`.
#[derive(Clone, Debug)]
pub struct Credentials {
    pub nick: String,
    pub password: Option<String>,
}

/// Connected IRC client.
pub struct IrcClient {
    writer: BufWriter<TcpStream>,
    inbox: Receiver<IrcMessage>,
    control: TcpStream,
    _reader_thread: Option<JoinHandle<()>>,
    nick: String,
}

impl IrcClient {
    /// Connect to `addr`, register, and join `channels` (with or without
    /// the leading `#`).
    pub fn connect(
        addr: &str,
        credentials: &Credentials,
        channels: &[String],
    ) -> Result<Self, IrcError> {
        let stream = TcpStream::connect(addr)?;
        stream.set_read_timeout(Some(HANDSHAKE_TIMEOUT))?;

        let control = stream.try_clone()?;
        let mut reader = BufReader::new(stream.try_clone()?);
        let mut writer = BufWriter::new(stream);

        if let Some(password) = &credentials.password {
            write_line(&mut writer, &message::pass(password))?;
        }
        write_line(&mut writer, &message::nick(&credentials.nick))?;
        await_welcome(&mut reader, &mut writer)?;
        info!(server = %addr, nick = %credentials.nick, "registered");

        for channel in channels {
            let name = channel_name(channel);
            write_line(&mut writer, &message::join(&name))?;
            info!(channel = %name, "joined");
        }

        // The long-lived reader loop blocks indefinitely.
        control.set_read_timeout(None)?;

        let (tx, rx) = mpsc::channel();
        let reader_thread = thread::spawn(move || {
            reader_loop(reader, tx);
        });

        Ok(Self {
            writer,
            inbox: rx,
            control,
            _reader_thread: Some(reader_thread),
            nick: credentials.nick.clone(),
        })
    }

    pub fn nick(&self) -> &str {
        &self.nick
    }

    /// Send one raw protocol line.
    pub fn send_raw(&mut self, line: &str) -> Result<(), IrcError> {
        write_line(&mut self.writer, line)?;
        Ok(())
    }

    /// Send `text` to `channel`, cut to fit one line.
    pub fn privmsg(&mut self, channel: &str, text: &str) -> Result<(), IrcError> {
        let prefix = message::privmsg_prefix(&channel_name(channel));
        let text = fit_to_line(&prefix, text);
        self.send_raw(&format!("{prefix}{text}"))
    }

    pub fn pong(&mut self, token: &str) -> Result<(), IrcError> {
        self.send_raw(&message::pong(token))
    }

    /// Wait up to `timeout` for the next message. `Ok(None)` on timeout; an
    /// error once the connection is gone and the inbox is drained.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<Option<IrcMessage>, IrcError> {
        match self.inbox.recv_timeout(timeout) {
            Ok(msg) => Ok(Some(msg)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                Err(IrcError::Protocol("connection closed by server".into()))
            }
        }
    }

    /// Send QUIT and close the socket, which also ends the reader thread.
    pub fn disconnect(&mut self) {
        let _ = write_line(&mut self.writer, &message::quit());
        let _ = self.control.shutdown(Shutdown::Both);
    }
}

impl ChatTransport for IrcClient {
    fn send_line(&mut self, channel: &str, text: &str) -> Result<(), TransportError> {
        self.privmsg(channel, text)
            .map_err(|e| TransportError(e.to_string()))
    }
}

/// `#`-prefixed, lowercase channel name.
pub fn channel_name(channel: &str) -> String {
    format!("#{}", channel_key(channel))
}

/// Read until the server confirms registration with `001`.
fn await_welcome(
    reader: &mut BufReader<TcpStream>,
    writer: &mut BufWriter<TcpStream>,
) -> Result<(), IrcError> {
    loop {
        let line = read_line(reader)?;
        let msg = match IrcMessage::parse(&line) {
            Ok(msg) => msg,
            Err(e) => {
                debug!(error = %e, "skipping unparseable handshake line");
                continue;
            }
        };
        if let Some(token) = msg.ping_token() {
            write_line(writer, &message::pong(token))?;
            continue;
        }
        match msg.command.as_str() {
            "001" => return Ok(()),
            "NOTICE" => {
                let text = msg.params.last().map_or("", String::as_str);
                if AUTH_FAILURE_NOTICES.iter().any(|n| text.contains(n)) {
                    return Err(IrcError::Rejected(text.to_string()));
                }
            }
            // ERR_PASSWDMISMATCH, ERR_NICKNAMEINUSE, ERR_ERRONEUSNICKNAME
            "464" | "433" | "432" => {
                let text = msg.params.last().map_or("", String::as_str);
                return Err(IrcError::Rejected(format!("{} {text}", msg.command)));
            }
            _ => {}
        }
    }
}

/// Reader thread: read lines in a loop, push parsed messages to the channel.
fn reader_loop(mut reader: BufReader<TcpStream>, tx: mpsc::Sender<IrcMessage>) {
    loop {
        let line = match read_line(&mut reader) {
            Ok(line) => line,
            Err(e) => {
                debug!(error = %e, "reader stopping");
                break;
            }
        };
        if line.is_empty() {
            continue;
        }
        match IrcMessage::parse(&line) {
            Ok(msg) => {
                if tx.send(msg).is_err() {
                    break; // Owner dropped the receiver
                }
            }
            Err(e) => warn!(error = %e, "skipping unparseable line"),
        }
    }
}
