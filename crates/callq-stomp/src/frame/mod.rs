//! STOMP 1.2 frame codec.
//!
//! A frame is a command line, `name:value` header lines, a blank line and a
//! body terminated by a NUL octet. Header values are escaped (`\\`, `\n`,
//! `\r`, `\c`) except on `CONNECT` and `CONNECTED` frames. When a
//! `content-length` header is present the body length is taken from it, so
//! bodies may contain NUL octets. End-of-line octets between frames are
//! heart-beats and are skipped.

use std::fmt;

use strum::{AsRefStr, Display, EnumString};
use thiserror::Error;

/// Largest frame accepted from a broker.
pub const MAX_FRAME_BYTES: usize = 4 * 1024 * 1024;

/// Frame commands understood by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, AsRefStr, Display, EnumString)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Command {
    /// Client opens a session.
    Connect,
    /// Broker accepted the session.
    Connected,
    /// Client publishes a message.
    Send,
    /// Client starts consuming a destination.
    Subscribe,
    /// Client acknowledges a delivery.
    Ack,
    /// Client ends the session.
    Disconnect,
    /// Broker delivers a message.
    Message,
    /// Broker confirms a frame carrying a `receipt` header.
    Receipt,
    /// Broker reports an error.
    Error,
}

impl Command {
    const fn escapes_headers(self) -> bool {
        !matches!(self, Self::Connect | Self::Connected)
    }
}

/// Errors raised while decoding a frame.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FrameError {
    /// The command line named an unsupported command.
    #[error("unknown STOMP command '{command}'")]
    UnknownCommand {
        /// Command text as received.
        command: String,
    },
    /// A command or header line was not valid UTF-8.
    #[error("frame header is not valid UTF-8")]
    InvalidUtf8,
    /// A header line had no `:` separator.
    #[error("header line '{line}' has no ':' separator")]
    MissingSeparator {
        /// Offending line.
        line: String,
    },
    /// A header used an undefined escape sequence.
    #[error("undefined escape sequence '\\{sequence}' in header")]
    InvalidEscape {
        /// Character following the backslash.
        sequence: char,
    },
    /// `content-length` was not a non-negative integer.
    #[error("invalid content-length '{value}'")]
    InvalidContentLength {
        /// Header value as received.
        value: String,
    },
    /// The body was not followed by a NUL octet.
    #[error("frame body is not terminated by NUL")]
    MissingTerminator,
    /// The frame exceeds [`MAX_FRAME_BYTES`].
    #[error("frame exceeds {limit} bytes")]
    TooLarge {
        /// Configured limit.
        limit: usize,
    },
}

/// One STOMP frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    command: Command,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Frame {
    /// Creates a frame without headers or body.
    #[must_use]
    pub const fn new(command: Command) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Appends a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Replaces the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Frame command.
    #[must_use]
    pub const fn command(&self) -> Command {
        self.command
    }

    /// Value of the first header called `name`; repeated headers keep the
    /// first occurrence.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Headers in wire order.
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Raw body.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Body as text, replacing invalid UTF-8.
    #[must_use]
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Serialises the frame, adding `content-length` when a body is present.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let escape = self.command.escapes_headers();
        let mut out = Vec::with_capacity(self.body.len() + 64);
        out.extend_from_slice(self.command.as_ref().as_bytes());
        out.push(b'\n');
        for (name, value) in &self.headers {
            push_header_text(&mut out, name, escape);
            out.push(b':');
            push_header_text(&mut out, value, escape);
            out.push(b'\n');
        }
        if !self.body.is_empty() && self.header("content-length").is_none() {
            out.extend_from_slice(format!("content-length:{}\n", self.body.len()).as_bytes());
        }
        out.push(b'\n');
        out.extend_from_slice(&self.body);
        out.push(0);
        out
    }
}

impl fmt::Display for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} frame", self.command)?;
        if let Some(receipt) = self.header("receipt-id") {
            write!(f, " (receipt {receipt})")?;
        }
        Ok(())
    }
}

fn push_header_text(out: &mut Vec<u8>, text: &str, escape: bool) {
    if !escape {
        out.extend_from_slice(text.as_bytes());
        return;
    }
    for ch in text.chars() {
        match ch {
            '\\' => out.extend_from_slice(b"\\\\"),
            '\n' => out.extend_from_slice(b"\\n"),
            '\r' => out.extend_from_slice(b"\\r"),
            ':' => out.extend_from_slice(b"\\c"),
            other => {
                let mut utf8 = [0_u8; 4];
                out.extend_from_slice(other.encode_utf8(&mut utf8).as_bytes());
            }
        }
    }
}

fn unescape(text: &str, escape: bool) -> Result<String, FrameError> {
    if !escape {
        return Ok(text.to_owned());
    }
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            Some(sequence) => return Err(FrameError::InvalidEscape { sequence }),
            None => return Err(FrameError::InvalidEscape { sequence: ' ' }),
        }
    }
    Ok(out)
}

/// Splits off the next line, without its `\n` or `\r\n` ending.
fn next_line(buf: &[u8]) -> Option<(&[u8], &[u8])> {
    let end = buf.iter().position(|byte| *byte == b'\n')?;
    let (line, rest) = buf.split_at(end);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    Some((line, rest.get(1..).unwrap_or_default()))
}

fn line_text(line: &[u8]) -> Result<&str, FrameError> {
    std::str::from_utf8(line).map_err(|_| FrameError::InvalidUtf8)
}

fn parse_header(line: &str, escape: bool) -> Result<(String, String), FrameError> {
    let (name, value) = line
        .split_once(':')
        .ok_or_else(|| FrameError::MissingSeparator {
            line: line.to_owned(),
        })?;
    Ok((unescape(name, escape)?, unescape(value, escape)?))
}

fn parse_content_length(value: &str) -> Result<usize, FrameError> {
    value
        .trim()
        .parse()
        .map_err(|_| FrameError::InvalidContentLength {
            value: value.to_owned(),
        })
}

/// Decodes the first frame in `buf`.
///
/// Returns the frame and the number of bytes it occupied, including any
/// heart-beat EOLs before it, or `Ok(None)` when `buf` does not yet hold a
/// complete frame.
///
/// # Errors
///
/// Returns [`FrameError`] when the buffered bytes cannot form a valid frame.
pub fn parse_frame(buf: &[u8]) -> Result<Option<(Frame, usize)>, FrameError> {
    let skipped = buf
        .iter()
        .take_while(|byte| matches!(byte, b'\n' | b'\r'))
        .count();
    let mut rest = buf.get(skipped..).unwrap_or_default();
    if rest.is_empty() {
        return Ok(None);
    }

    let Some((command_line, after_command)) = next_line(rest) else {
        return Ok(None);
    };
    let command_text = line_text(command_line)?;
    let command: Command = command_text
        .parse()
        .map_err(|_| FrameError::UnknownCommand {
            command: command_text.to_owned(),
        })?;
    let escape = command.escapes_headers();
    rest = after_command;

    let mut headers = Vec::new();
    loop {
        let Some((line, after_line)) = next_line(rest) else {
            return Ok(None);
        };
        rest = after_line;
        if line.is_empty() {
            break;
        }
        headers.push(parse_header(line_text(line)?, escape)?);
    }

    let frame = Frame {
        command,
        headers,
        body: Vec::new(),
    };
    let declared_length = frame
        .header("content-length")
        .map(parse_content_length)
        .transpose()?;

    let body_length = match declared_length {
        Some(length) => {
            if rest.len() <= length {
                return Ok(None);
            }
            if rest.get(length) != Some(&0) {
                return Err(FrameError::MissingTerminator);
            }
            length
        }
        None => match rest.iter().position(|byte| *byte == 0) {
            Some(position) => position,
            None => return Ok(None),
        },
    };

    let body = rest.get(..body_length).unwrap_or_default().to_vec();
    let consumed = buf.len() - rest.len() + body_length + 1;
    Ok(Some((Frame { body, ..frame }, consumed)))
}
