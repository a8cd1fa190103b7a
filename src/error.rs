use std::io;

use thiserror::Error;

/// Parse anomalies that the tolerance policy decides on: fatal under
/// strict parsing, logged and recovered from under lenient parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// End of stream before the blank line terminating a header block.
    HeadersPrematureEnd,
    /// End of stream inside a boundary-terminated body.
    BodyPrematureEnd,
    /// A header line without a colon, or an otherwise unusable field.
    InvalidHeader,
    /// More header fields than the configured maximum.
    HeadersTooMany,
    /// Invalid symbol or truncated quantum in a base64 body.
    InvalidBase64,
    /// Invalid escape sequence in a quoted-printable body.
    InvalidQuotedPrintable,
    /// Quoted-printable soft line break not followed by a line terminator.
    UnterminatedSoftBreak,
    /// Non-ASCII byte in a field expected to be ASCII.
    NonAsciiInHeader,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HeadersPrematureEnd => "HEADERS_PREMATURE_END",
            Self::BodyPrematureEnd => "BODY_PREMATURE_END",
            Self::InvalidHeader => "INVALID_HEADER",
            Self::HeadersTooMany => "HEADERS_TOO_MANY",
            Self::InvalidBase64 => "INVALID_BASE64",
            Self::InvalidQuotedPrintable => "INVALID_QUOTED_PRINTABLE",
            Self::UnterminatedSoftBreak => "UNTERMINATED_SOFT_BREAK",
            Self::NonAsciiInHeader => "NON_ASCII_IN_HEADER",
        }
    }
}

#[derive(Debug, Error)]
pub enum Error {
    /// Structural parse violation escalated by the strict policy.
    #[error("parse violation {}: {detail}", .kind.as_str())]
    ParseEvent { kind: EventKind, detail: String },

    /// A line exceeded the configured maximum length. This is a resource
    /// guard and is fatal regardless of the tolerance policy.
    #[error("line length limit of {limit} bytes exceeded")]
    LineLimit { limit: usize },

    /// The multipart boundary cannot fit the buffer: configuration error,
    /// raised at multipart entry.
    #[error("boundary of {len} bytes exceeds buffer capacity {capacity}")]
    BoundaryTooLong { len: usize, capacity: usize },

    /// Index or range arguments outside the buffer's valid window.
    #[error("range [{from}, {to}) outside valid window [{pos}, {limit})")]
    OutOfRange {
        from: usize,
        to: usize,
        pos: usize,
        limit: usize,
    },

    /// Read attempted on a closed stream adapter.
    #[error("stream used after close")]
    UseAfterClose,

    /// `parse` called while a previous traversal is still in progress.
    #[error("parse called while a traversal is in progress")]
    ParseInProgress,

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl Error {
    pub fn event(kind: EventKind, detail: impl Into<String>) -> Self {
        Self::ParseEvent {
            kind,
            detail: detail.into(),
        }
    }

    /// The event kind, when this error is a structural parse violation.
    pub fn kind(&self) -> Option<EventKind> {
        match self {
            Self::ParseEvent { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

impl From<Error> for io::Error {
    fn from(e: Error) -> io::Error {
        match e {
            Error::Io(io) => io,
            other => io::Error::new(io::ErrorKind::InvalidData, other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_display() {
        let e = Error::event(EventKind::HeadersPrematureEnd, "no blank line");
        assert_eq!(
            e.to_string(),
            "parse violation HEADERS_PREMATURE_END: no blank line"
        );
        assert_eq!(e.kind(), Some(EventKind::HeadersPrematureEnd));
    }

    #[test]
    fn test_io_conversion() {
        let e = Error::UseAfterClose;
        let io: io::Error = e.into();
        assert_eq!(io.kind(), io::ErrorKind::InvalidData);
    }
}
