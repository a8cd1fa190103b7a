//! Per-entity metadata accumulated from header fields, consumed by the
//! tokenizer to pick the next state.

use crate::mime::charset::Charset;
use crate::mime::mechanism::{transfer_encoding, TransferEncoding};
use crate::mime::r#type::{naive_type, AnyType, MessageSubtype, MultipartSubtype, Text};

/// Default Content-Type of an entity whose headers do not declare one:
/// `text/plain`, except inside a multipart/digest where it is
/// `message/rfc822` (RFC 2046 section 5.1.5).
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DefaultType {
    #[default]
    Generic,
    Digest,
}

/// Accumulates the Content-* fields of one entity while its header block
/// is being tokenized. `build` interprets what was collected.
#[derive(Debug, Default)]
pub struct DescriptorBuilder {
    ctype: Option<(String, String, AnyType)>,
    transfer_encoding: Option<TransferEncoding>,
    content_length: Option<u64>,
}

impl DescriptorBuilder {
    /// Offer one raw header field. Unknown fields are ignored; on repeated
    /// fields the first occurrence wins.
    pub fn field(&mut self, name: &[u8], value: &[u8]) {
        match name.to_ascii_lowercase().as_slice() {
            b"content-type" => {
                if self.ctype.is_none() {
                    if let Ok((_, nt)) = naive_type(value) {
                        self.ctype = Some((
                            String::from_utf8_lossy(&nt.main.to_ascii_lowercase()).into_owned(),
                            String::from_utf8_lossy(&nt.sub.to_ascii_lowercase()).into_owned(),
                            nt.to_type(),
                        ));
                    }
                }
            }
            b"content-transfer-encoding" => {
                if self.transfer_encoding.is_none() {
                    if let Ok((_, m)) = transfer_encoding(value) {
                        self.transfer_encoding = Some(m);
                    }
                }
            }
            b"content-length" => {
                if self.content_length.is_none() {
                    let trimmed: Vec<u8> = value
                        .iter()
                        .copied()
                        .filter(|c| c.is_ascii_digit())
                        .collect();
                    if !trimmed.is_empty() && value.iter().all(|c| {
                        c.is_ascii_digit() || c.is_ascii_whitespace()
                    }) {
                        self.content_length =
                            String::from_utf8_lossy(&trimmed).parse::<u64>().ok();
                    }
                }
            }
            _ => (),
        }
    }

    pub fn build(self, default_type: DefaultType) -> BodyDescriptor {
        let (main, sub, media) = self.ctype.unwrap_or_else(|| match default_type {
            DefaultType::Generic => ("text".into(), "plain".into(), AnyType::Text(Text::default())),
            DefaultType::Digest => (
                "message".into(),
                "rfc822".into(),
                AnyType::Message(MessageSubtype::RFC822),
            ),
        });
        BodyDescriptor {
            main,
            sub,
            media,
            transfer_encoding: self.transfer_encoding.unwrap_or_default(),
            content_length: self.content_length,
        }
    }
}

/// Metadata of one entity (message or body part), fixed once its header
/// block has ended.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyDescriptor {
    main: String,
    sub: String,
    media: AnyType,
    transfer_encoding: TransferEncoding,
    content_length: Option<u64>,
}

impl Default for BodyDescriptor {
    fn default() -> Self {
        DescriptorBuilder::default().build(DefaultType::Generic)
    }
}

impl BodyDescriptor {
    /// `"main/sub"`, lowercased, after multipart-without-boundary
    /// degradation has been applied.
    pub fn mime_type(&self) -> String {
        match &self.media {
            AnyType::Text(_) if self.main != "text" => "text/plain".into(),
            _ => format!("{}/{}", self.main, self.sub),
        }
    }

    pub fn media(&self) -> &AnyType {
        &self.media
    }

    /// The multipart delimiter token, when this entity is a multipart with
    /// a usable boundary parameter.
    pub fn boundary(&self) -> Option<&[u8]> {
        match &self.media {
            AnyType::Multipart(m) => Some(&m.boundary),
            _ => None,
        }
    }

    pub fn multipart_subtype(&self) -> Option<&MultipartSubtype> {
        match &self.media {
            AnyType::Multipart(m) => Some(&m.subtype),
            _ => None,
        }
    }

    pub fn is_multipart(&self) -> bool {
        matches!(self.media, AnyType::Multipart(_))
    }

    pub fn is_message(&self) -> bool {
        matches!(self.media, AnyType::Message(MessageSubtype::RFC822))
    }

    pub fn charset(&self) -> Option<&Charset> {
        match &self.media {
            AnyType::Text(t) => t.charset.as_ref(),
            _ => None,
        }
    }

    pub fn transfer_encoding(&self) -> &TransferEncoding {
        &self.transfer_encoding
    }

    pub fn content_length(&self) -> Option<u64> {
        self.content_length
    }
}
