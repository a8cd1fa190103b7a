//! Raw header fields: one logical field may span several physical lines
//! (RFC 822 folding).

use std::io::Read;

use crate::error::Error;
use crate::stream::buffer::LineBuffer;
use crate::text::ascii;
use crate::text::encoding::decode_encoded_words;
use crate::text::fold::unfold;
use crate::text::whitespace::trim_terminator;

/// One header field as read from the stream, folding preserved.
#[derive(Debug, Clone, PartialEq)]
pub struct RawField {
    name: Vec<u8>,
    value: Vec<u8>,
    raw: Vec<u8>,
}

impl RawField {
    pub fn name_bytes(&self) -> &[u8] {
        &self.name
    }

    pub fn name(&self) -> String {
        String::from_utf8_lossy(&self.name).into_owned()
    }

    /// The value as written: folded, leading whitespace trimmed,
    /// terminator excluded.
    pub fn value_bytes(&self) -> &[u8] {
        &self.value
    }

    /// The value unfolded, with RFC 2047 encoded words decoded.
    pub fn value(&self) -> String {
        decode_encoded_words(&unfold(&self.value))
    }

    /// The physical bytes of the whole logical field, terminators included.
    pub fn raw_bytes(&self) -> &[u8] {
        &self.raw
    }
}

/// What one attempt at reading a logical field produced.
#[derive(Debug, PartialEq)]
pub enum FieldLine {
    Field(RawField),
    /// Blank line: end of the header block (the line is consumed).
    EndOfHeader,
    /// No bytes remain.
    Eof,
    /// A non-empty line that is not a usable field; the raw line is
    /// returned so the caller can push it back if configured to.
    Malformed(Vec<u8>),
}

/// RFC 5322 ftext: printable US-ASCII except the colon.
fn is_ftext(c: u8) -> bool {
    (33..=126).contains(&c) && c != ascii::COLON
}

fn is_blank(line: &[u8]) -> bool {
    trim_terminator(line).is_empty()
}

/// Read one logical field, consuming continuation lines (leading space or
/// tab) until the next field, the header-terminating blank line, or end of
/// stream.
pub fn read_logical_field<R: Read>(buf: &mut LineBuffer<R>) -> Result<FieldLine, Error> {
    let mut raw = Vec::new();
    if buf.read_line(&mut raw)? == 0 {
        return Ok(FieldLine::Eof);
    }
    if is_blank(&raw) {
        return Ok(FieldLine::EndOfHeader);
    }

    let first = trim_terminator(&raw);
    let colon = match first.iter().position(|c| *c == ascii::COLON) {
        Some(i) => i,
        None => return Ok(FieldLine::Malformed(raw)),
    };
    // trailing whitespace between the name and the colon is obsolete
    // syntax; anything else before the colon makes the line unusable
    let before_colon = &first[..colon];
    let name_len = before_colon
        .iter()
        .take_while(|c| !ascii::is_ws(**c))
        .count();
    let name = before_colon[..name_len].to_vec();
    if name.is_empty()
        || !before_colon[name_len..].iter().all(|c| ascii::is_ws(*c))
        || !name.iter().all(|c| is_ftext(*c))
    {
        return Ok(FieldLine::Malformed(raw));
    }

    // continuation lines
    loop {
        match buf.peek_u8()? {
            Some(c) if ascii::is_ws(c) => {
                if buf.read_line(&mut raw)? == 0 {
                    break;
                }
            }
            _ => break,
        }
    }

    // value excludes its final terminator but keeps interior folding
    let body = &raw[colon + 1..];
    let body = trim_terminator(body);
    let skip = body.iter().take_while(|c| ascii::is_ws(**c)).count();
    let value = body[skip..].to_vec();

    Ok(FieldLine::Field(RawField { name, value, raw }))
}
