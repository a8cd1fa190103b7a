//! Content-Transfer-Encoding values (RFC 2045 section 6).

use nom::{combinator::map, IResult};

use crate::text::words::mime_token;

/// The transfer encoding applied to an entity's body.
///
/// The identity encodings differ only in what they promise about the
/// bytes; only `QuotedPrintable` and `Base64` change them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum TransferEncoding {
    #[default]
    SevenBit,
    EightBit,
    Binary,
    QuotedPrintable,
    Base64,
    Other(Vec<u8>),
}

impl TransferEncoding {
    pub fn from_label(label: &[u8]) -> Self {
        match label.to_ascii_lowercase().as_slice() {
            b"7bit" => Self::SevenBit,
            b"8bit" => Self::EightBit,
            b"binary" => Self::Binary,
            b"quoted-printable" => Self::QuotedPrintable,
            b"base64" => Self::Base64,
            _ => Self::Other(label.to_vec()),
        }
    }

    /// Whether body bytes are delivered as stored.
    pub fn is_identity(&self) -> bool {
        !matches!(self, Self::QuotedPrintable | Self::Base64)
    }

    pub fn label(&self) -> &[u8] {
        match self {
            Self::SevenBit => b"7bit",
            Self::EightBit => b"8bit",
            Self::Binary => b"binary",
            Self::QuotedPrintable => b"quoted-printable",
            Self::Base64 => b"base64",
            Self::Other(l) => l,
        }
    }
}

pub fn transfer_encoding(input: &[u8]) -> IResult<&[u8], TransferEncoding> {
    map(mime_token, TransferEncoding::from_label)(input)
}
