// IRC message parsing and formatting.
//
// Grammar handled (RFC 1459 plus IRCv3 message tags):
//
//   [@tags SPACE] [:prefix SPACE] command *(SPACE param) [SPACE :trailing]
//
// Tag values are unescaped (`\:` `\s` `\\` `\r` `\n`). The trailing
// parameter is stored as the last entry of `params`, indistinguishable from
// a middle parameter once parsed, which is all the bot needs.
//
// The formatting helpers at the bottom produce the handful of commands the
// client sends. They do no validation; `framing::write_line` rejects
// anything that would break the line format.

use std::collections::BTreeMap;

use crate::error::IrcError;

/// One parsed IRC line.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct IrcMessage {
    pub tags: BTreeMap<String, String>,
    pub prefix: Option<String>,
    pub command: String,
    pub params: Vec<String>,
}

/// A chat message addressed to a channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Privmsg<'a> {
    pub sender: &'a str,
    pub channel: &'a str,
    pub text: &'a str,
}

impl IrcMessage {
    pub fn parse(line: &str) -> Result<Self, IrcError> {
        let mut rest = line.trim_end_matches(['\r', '\n']);
        let mut msg = IrcMessage::default();

        if let Some(after) = rest.strip_prefix('@') {
            let (tags, tail) = after
                .split_once(' ')
                .ok_or_else(|| IrcError::Protocol(format!("tags without command: {line:?}")))?;
            msg.tags = parse_tags(tags);
            rest = tail.trim_start_matches(' ');
        }

        if let Some(after) = rest.strip_prefix(':') {
            let (prefix, tail) = after
                .split_once(' ')
                .ok_or_else(|| IrcError::Protocol(format!("prefix without command: {line:?}")))?;
            msg.prefix = Some(prefix.to_string());
            rest = tail.trim_start_matches(' ');
        }

        let (command, mut rest) = rest.split_once(' ').unwrap_or((rest, ""));
        if command.is_empty() {
            return Err(IrcError::Protocol(format!("missing command: {line:?}")));
        }
        msg.command = command.to_ascii_uppercase();

        loop {
            rest = rest.trim_start_matches(' ');
            if rest.is_empty() {
                break;
            }
            if let Some(trailing) = rest.strip_prefix(':') {
                msg.params.push(trailing.to_string());
                break;
            }
            let (param, tail) = rest.split_once(' ').unwrap_or((rest, ""));
            msg.params.push(param.to_string());
            rest = tail;
        }
        Ok(msg)
    }

    /// Nickname part of the prefix (`nick!user@host` -> `nick`).
    pub fn nick(&self) -> Option<&str> {
        let prefix = self.prefix.as_deref()?;
        Some(prefix.split(['!', '@']).next().unwrap_or(prefix))
    }

    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    /// The message as a channel PRIVMSG, if it is one.
    pub fn as_privmsg(&self) -> Option<Privmsg<'_>> {
        if self.command != "PRIVMSG" || self.params.len() < 2 {
            return None;
        }
        let channel = self.params[0].as_str();
        if !channel.starts_with('#') {
            return None;
        }
        Some(Privmsg {
            sender: self.nick()?,
            channel,
            text: self.params[1].as_str(),
        })
    }

    /// The token to echo back if this is a PING.
    pub fn ping_token(&self) -> Option<&str> {
        if self.command == "PING" {
            Some(self.params.first().map_or("", String::as_str))
        } else {
            None
        }
    }
}

fn parse_tags(raw: &str) -> BTreeMap<String, String> {
    raw.split(';')
        .filter(|t| !t.is_empty())
        .map(|t| match t.split_once('=') {
            Some((k, v)) => (k.to_string(), unescape_tag_value(v)),
            None => (t.to_string(), String::new()),
        })
        .collect()
}

fn unescape_tag_value(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some(':') => out.push(';'),
            Some('s') => out.push(' '),
            Some('r') => out.push('\r'),
            Some('n') => out.push('\n'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

pub fn pass(password: &str) -> String {
    format!("PASS {password}")
}

pub fn nick(nick: &str) -> String {
    format!("NICK {nick}")
}

pub fn join(channel: &str) -> String {
    format!("JOIN {channel}")
}

pub fn pong(token: &str) -> String {
    format!("PONG :{token}")
}

pub fn quit() -> String {
    "QUIT".to_string()
}

/// Everything before the text of a PRIVMSG line.
pub fn privmsg_prefix(channel: &str) -> String {
    format!("PRIVMSG {channel} :")
}
