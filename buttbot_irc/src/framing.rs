// CRLF line framing over TCP.
//
// IRC is a line protocol: each message is one line terminated by `\r\n`,
// at most 512 bytes including the terminator. Servers that speak IRCv3 may
// prepend a tag section of up to 8191 more bytes, so incoming lines are
// allowed that much extra; outgoing lines never carry tags.
//
// `read_line` accepts a bare `\n` terminator too, since some servers (and
// hand-written test servers) send one. Invalid UTF-8 is replaced rather
// than rejected; chat text from the wild is not always clean.

use std::io::{self, BufRead, Read, Write};

/// Maximum outgoing line length in bytes, including the CRLF terminator.
pub const MAX_LINE_LEN: usize = 512;

/// Extra room allowed for an IRCv3 message-tag section on incoming lines.
pub const MAX_TAGS_LEN: usize = 8191;

/// Write one line followed by CRLF.
///
/// Returns `InvalidInput` if the line contains CR or LF (which would smuggle
/// a second command onto the wire) or does not fit in `MAX_LINE_LEN`.
pub fn write_line<W: Write>(writer: &mut W, line: &str) -> io::Result<()> {
    if line.contains(['\r', '\n']) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "line contains a CR or LF",
        ));
    }
    let len = line.len() + 2;
    if len > MAX_LINE_LEN {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("line too long: {len} bytes (max {MAX_LINE_LEN})"),
        ));
    }
    writer.write_all(line.as_bytes())?;
    writer.write_all(b"\r\n")?;
    writer.flush()?;
    Ok(())
}

/// Read one line, without its terminator.
///
/// Returns `UnexpectedEof` if the stream closes before a complete line, and
/// `InvalidData` if the line exceeds `MAX_LINE_LEN + MAX_TAGS_LEN`.
pub fn read_line<R: BufRead>(reader: &mut R) -> io::Result<String> {
    let limit = MAX_LINE_LEN + MAX_TAGS_LEN;
    let mut buf = Vec::new();
    reader.by_ref().take(limit as u64 + 1).read_until(b'\n', &mut buf)?;
    if buf.last() != Some(&b'\n') {
        if buf.len() > limit {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("line too long: more than {limit} bytes"),
            ));
        }
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "stream closed mid-line",
        ));
    }
    buf.pop();
    if buf.last() == Some(&b'\r') {
        buf.pop();
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Cut `text` so that `prefix` + `text` fits in one outgoing line, without
/// splitting a UTF-8 character.
pub fn fit_to_line<'a>(prefix: &str, text: &'a str) -> &'a str {
    let room = MAX_LINE_LEN.saturating_sub(prefix.len() + 2);
    if text.len() <= room {
        return text;
    }
    let mut end = room;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}
