//! Folding and unfolding of header field values (RFC 5322 section 2.2.3).

use memchr::memchr;

use crate::text::ascii;

/// Fold a header value so that no line exceeds `width` bytes, breaking only
/// at existing whitespace. A break inserts CRLF *before* the whitespace
/// character, so the whitespace itself survives as the continuation
/// indent and `unfold` is an exact inverse.
///
/// A single token longer than `width` is left intact, uncut.
pub fn fold(value: &[u8], width: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len() + 16);
    let mut line_len = 0;

    let mut rest = value;
    while !rest.is_empty() {
        if ascii::is_ws(rest[0]) {
            let ws_end = rest.iter().take_while(|c| ascii::is_ws(**c)).count();
            let token_end = rest[ws_end..]
                .iter()
                .take_while(|c| !ascii::is_ws(**c))
                .count();
            // break before the whitespace when the next token would not fit
            if line_len + ws_end + token_end > width && line_len > 0 {
                out.extend_from_slice(ascii::CRLF);
                line_len = 0;
            }
            out.extend_from_slice(&rest[..ws_end]);
            line_len += ws_end;
            rest = &rest[ws_end..];
        } else {
            let token_end = rest.iter().take_while(|c| !ascii::is_ws(**c)).count();
            out.extend_from_slice(&rest[..token_end]);
            line_len += token_end;
            rest = &rest[token_end..];
        }
    }

    out
}

/// Remove the line breaks introduced by folding: every CRLF (or bare LF)
/// immediately followed by whitespace is deleted, the whitespace stays.
pub fn unfold(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(i) = memchr(ascii::LF, rest) {
        let break_start = if i > 0 && rest[i - 1] == ascii::CR { i - 1 } else { i };
        if rest.get(i + 1).copied().is_some_and(ascii::is_ws) {
            out.extend_from_slice(&rest[..break_start]);
        } else {
            out.extend_from_slice(&rest[..i + 1]);
        }
        rest = &rest[i + 1..];
    }
    out.extend_from_slice(rest);

    out
}
