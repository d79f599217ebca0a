use std::fmt;

use thiserror::Error;

/// Longest slice of the offending input kept inside an error.
const RAW_PREVIEW_LEN: usize = 128;

/// Why a link or subscription body could not be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// No decoder claims the link's scheme.
    InvalidPrefix,
    /// Not a well formed link, or host/port missing.
    InvalidStructure,
    /// Port present but not an integer in 1..=65535.
    InvalidPort,
    /// A field the protocol requires is empty.
    MissingField,
    /// Base64 payload could not be decoded.
    InvalidEncoding,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ParseErrorKind::InvalidPrefix => "invalid prefix",
            ParseErrorKind::InvalidStructure => "invalid structure",
            ParseErrorKind::InvalidPort => "invalid port",
            ParseErrorKind::MissingField => "missing field",
            ParseErrorKind::InvalidEncoding => "invalid encoding",
        };
        f.write_str(text)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}: {message} (raw: {raw})")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub message: String,
    /// The offending input, shortened to a preview.
    pub raw: String,
}

impl ParseError {
    pub fn new(kind: ParseErrorKind, message: impl Into<String>, raw: &str) -> Self {
        ParseError {
            kind,
            message: message.into(),
            raw: preview(raw),
        }
    }
}

fn preview(raw: &str) -> String {
    if raw.chars().count() <= RAW_PREVIEW_LEN {
        return raw.to_string();
    }
    let mut out: String = raw.chars().take(RAW_PREVIEW_LEN).collect();
    out.push_str("...");
    out
}
