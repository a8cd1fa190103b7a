//! Tokens of the MIME header grammar (RFC 2045 section 5.1).

use nom::{bytes::complete::take_while1, combinator::opt, sequence::delimited, IResult};

use crate::text::ascii;
use crate::text::whitespace::cfws;

/// Printable US-ASCII.
pub fn is_vchar(c: u8) -> bool {
    (ascii::EXCLAMATION..=ascii::TILDE).contains(&c)
}

/// tspecials: the printable characters that delimit tokens.
fn is_tspecial(c: u8) -> bool {
    matches!(
        c,
        b'(' | b')'
            | b'<'
            | b'>'
            | b'@'
            | b','
            | b';'
            | b':'
            | b'\\'
            | b'"'
            | b'/'
            | b'['
            | b']'
            | b'?'
            | b'='
    )
}

/// `token = 1*<any CHAR except SPACE, CTLs, or tspecials>`
pub fn is_token_char(c: u8) -> bool {
    is_vchar(c) && !is_tspecial(c)
}

/// A bare token.
pub fn mime_token_plain(input: &[u8]) -> IResult<&[u8], &[u8]> {
    take_while1(is_token_char)(input)
}

/// A token with surrounding comments and folding white space skipped.
pub fn mime_token(input: &[u8]) -> IResult<&[u8], &[u8]> {
    delimited(opt(cfws), mime_token_plain, opt(cfws))(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_chars() {
        assert!(is_token_char(b'a'));
        assert!(is_token_char(b'0'));
        assert!(is_token_char(b'-'));
        assert!(is_token_char(b'*'));
        assert!(!is_token_char(b'='));
        assert!(!is_token_char(b'/'));
        assert!(!is_token_char(b'"'));
        assert!(!is_token_char(b' '));
    }

    #[test]
    fn test_token_skips_cfws() {
        assert_eq!(
            mime_token(b"(note) base64 (note) x"),
            Ok((&b"x"[..], &b"base64"[..]))
        );
        assert_eq!(mime_token(b"text/plain"), Ok((&b"/plain"[..], &b"text"[..])));
    }

    #[test]
    fn test_token_stops_at_tspecials() {
        assert_eq!(
            mime_token_plain(b"boundary=sep"),
            Ok((&b"=sep"[..], &b"boundary"[..]))
        );
        assert!(mime_token_plain(b"=?word").is_err());
    }
}
