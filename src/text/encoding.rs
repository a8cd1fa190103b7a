//! RFC 2047 encoded words (`=?charset?Q|B?text?=`) in header values.

use base64::{engine::general_purpose, Engine as _};
use encoding_rs::Encoding;
use nom::{
    bytes::complete::{tag, take_while},
    character::complete::one_of,
    sequence::tuple,
    IResult,
};

use crate::text::ascii;
use crate::text::words::{is_vchar, mime_token_plain};

/// encoded-text: any printable character except `?`, which closes the word.
fn is_etext(c: u8) -> bool {
    is_vchar(c) && c != ascii::QUESTION
}

fn hex(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'A'..=b'F' => Some(c - b'A' + 10),
        // lowercase is not canonical but widespread
        b'a'..=b'f' => Some(c - b'a' + 10),
        _ => None,
    }
}

/// The Q form: `_` is a space, `=XY` a raw octet, anything else itself.
/// A malformed escape stays literal.
fn q_decode(payload: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len());
    let mut rest = payload;
    while let Some((&c, tail)) = rest.split_first() {
        match c {
            ascii::UNDERSCORE => {
                out.push(ascii::SP);
                rest = tail;
            }
            b'=' => match tail {
                [a, b, more @ ..] if hex(*a).is_some() && hex(*b).is_some() => {
                    out.push(hex(*a).unwrap() << 4 | hex(*b).unwrap());
                    rest = more;
                }
                _ => {
                    out.push(c);
                    rest = tail;
                }
            },
            _ => {
                out.push(c);
                rest = tail;
            }
        }
    }
    out
}

/// The B form: base64, trailing padding tolerated. Undecodable payloads
/// yield nothing rather than garbage.
fn b_decode(payload: &[u8]) -> Vec<u8> {
    let end = payload.iter().rposition(|c| *c != b'=').map_or(0, |i| i + 1);
    general_purpose::STANDARD_NO_PAD
        .decode(&payload[..end])
        .unwrap_or_default()
}

/// Parse one encoded word and decode it to text.
///
/// Unknown charset labels fall back to windows-1252, the de-facto
/// superset mail readers assume for mislabelled content.
pub fn encoded_word(input: &[u8]) -> IResult<&[u8], String> {
    let (rest, (_, charset, _, form, _, payload, _)) = tuple((
        tag("=?"),
        mime_token_plain,
        tag("?"),
        one_of("QqBb"),
        tag("?"),
        take_while(is_etext),
        tag("?="),
    ))(input)?;

    let enc = Encoding::for_label(charset).unwrap_or(encoding_rs::WINDOWS_1252);
    let raw = match form {
        'Q' | 'q' => q_decode(payload),
        _ => b_decode(payload),
    };
    let (text, _) = enc.decode_without_bom_handling(&raw);
    Ok((rest, text.into_owned()))
}

/// Decode every encoded word of a header value, leaving the rest of the
/// text untouched. Whitespace between two adjacent encoded words is
/// dropped, as RFC 2047 section 6.2 requires.
pub fn decode_encoded_words(input: &[u8]) -> String {
    let mut out = String::new();
    let mut rest = input;
    let mut pending_ws: &[u8] = &[];
    let mut last_was_encoded = false;

    while !rest.is_empty() {
        if let Ok((after, text)) = encoded_word(rest) {
            // separating whitespace between two encoded words is elided
            if !last_was_encoded {
                out.push_str(&String::from_utf8_lossy(pending_ws));
            }
            out.push_str(&text);
            pending_ws = &[];
            last_was_encoded = true;
            rest = after;
            continue;
        }

        let ws_len = rest.iter().take_while(|c| ascii::is_ws(**c)).count();
        if ws_len > 0 {
            out.push_str(&String::from_utf8_lossy(pending_ws));
            pending_ws = &rest[..ws_len];
            rest = &rest[ws_len..];
            continue;
        }

        let plain_len = rest
            .iter()
            .take_while(|c| !ascii::is_ws(**c))
            .count()
            .max(1);
        out.push_str(&String::from_utf8_lossy(pending_ws));
        pending_ws = &[];
        last_was_encoded = false;
        out.push_str(&String::from_utf8_lossy(&rest[..plain_len]));
        rest = &rest[plain_len..];
    }
    out.push_str(&String::from_utf8_lossy(pending_ws));

    out
}
