//! Character set labels declared in Content-Type parameters.

use encoding_rs::Encoding;

/// A charset as labelled in the message.
///
/// The label is kept verbatim for diagnostics; resolution goes through the
/// encoding_rs label database, which folds US-ASCII and ISO-8859-1 into
/// windows-1252 the way mail readers do. Labels the database does not know
/// resolve to windows-1252 too, so decoding is total.
#[derive(Debug, PartialEq, Clone)]
pub struct Charset {
    label: String,
}

impl Default for Charset {
    fn default() -> Self {
        Self {
            label: "us-ascii".into(),
        }
    }
}

impl From<&str> for Charset {
    fn from(label: &str) -> Self {
        Self {
            label: label.to_string(),
        }
    }
}

impl From<&[u8]> for Charset {
    fn from(label: &[u8]) -> Self {
        Self {
            label: String::from_utf8_lossy(label).into_owned(),
        }
    }
}

impl Charset {
    /// The label as written in the message.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn encoding(&self) -> &'static Encoding {
        Encoding::for_label(self.label.as_bytes()).unwrap_or(encoding_rs::WINDOWS_1252)
    }

    /// Decode `bytes` out of this charset, lossily.
    pub fn decode(&self, bytes: &[u8]) -> String {
        self.encoding()
            .decode_without_bom_handling(bytes)
            .0
            .into_owned()
    }
}
