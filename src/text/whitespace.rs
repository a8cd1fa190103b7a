//! Whitespace, line terminators and comment syntax shared by the header
//! field grammar.

use nom::error::{Error as NomError, ErrorKind};
use nom::{Err, IResult};

use crate::text::ascii;

fn reject(input: &[u8], kind: ErrorKind) -> Err<NomError<&[u8]>> {
    Err::Error(NomError::new(input, kind))
}

/// One line terminator. CRLF per the grammar; bare LF and bare CR occur in
/// messages written by tolerant software and are accepted wherever a
/// terminator is.
pub fn eol(input: &[u8]) -> IResult<&[u8], &[u8]> {
    match input {
        [b'\r', b'\n', ..] => Ok((&input[2..], &input[..2])),
        [b'\n', ..] | [b'\r', ..] => Ok((&input[1..], &input[..1])),
        _ => Err(reject(input, ErrorKind::CrLf)),
    }
}

/// Folding white space, collapsed to one space.
///
/// A long header value wraps by breaking before existing whitespace;
/// reading it back, any run of WSP and line breaks counts as a single
/// space, provided every break is followed by at least one WSP.
pub fn fws(input: &[u8]) -> IResult<&[u8], u8> {
    let mut rest = input;
    loop {
        let ws = rest.iter().take_while(|c| ascii::is_ws(**c)).count();
        rest = &rest[ws..];
        match eol(rest) {
            Ok((after, _)) if after.first().copied().is_some_and(ascii::is_ws) => rest = after,
            _ => break,
        }
    }
    if rest.len() == input.len() {
        return Err(reject(input, ErrorKind::Space));
    }
    Ok((rest, ascii::SP))
}

/// A parenthesized comment. Comments nest, backslash escapes the next
/// byte, and the content is discarded.
pub fn comment(input: &[u8]) -> IResult<&[u8], ()> {
    if input.first() != Some(&b'(') {
        return Err(reject(input, ErrorKind::Char));
    }
    let mut depth = 1usize;
    let mut i = 1;
    while depth > 0 {
        match input.get(i).copied() {
            None => return Err(reject(input, ErrorKind::Char)),
            Some(b'(') => depth += 1,
            Some(b')') => depth -= 1,
            Some(ascii::BACKSLASH) => i += 1,
            Some(ascii::CR) | Some(ascii::LF) => {
                // a break inside a comment must be a fold
                let (after, _) = fws(&input[i..])?;
                i = input.len() - after.len();
                continue;
            }
            Some(_) => (),
        }
        i += 1;
    }
    Ok((&input[i..], ()))
}

/// Folding white space and comments, in any order, at least one of either.
/// Returns the consumed bytes.
pub fn cfws(input: &[u8]) -> IResult<&[u8], &[u8]> {
    let mut rest = input;
    loop {
        if let Ok((r, _)) = fws(rest) {
            rest = r;
            continue;
        }
        match comment(rest) {
            Ok((r, ())) => rest = r,
            Err(_) => break,
        }
    }
    if rest.len() == input.len() {
        return Err(reject(input, ErrorKind::Many1));
    }
    Ok((rest, &input[..input.len() - rest.len()]))
}

/// Strip one trailing CRLF, CR or LF from a physical line.
pub fn trim_terminator(line: &[u8]) -> &[u8] {
    match line {
        [rest @ .., b'\r', b'\n'] => rest,
        [rest @ .., b'\n'] | [rest @ .., b'\r'] => rest,
        _ => line,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eol() {
        assert_eq!(eol(b"\r\nrest"), Ok((&b"rest"[..], &b"\r\n"[..])));
        assert_eq!(eol(b"\nrest"), Ok((&b"rest"[..], &b"\n"[..])));
        assert_eq!(eol(b"\rrest"), Ok((&b"rest"[..], &b"\r"[..])));
        assert!(eol(b"rest").is_err());
    }

    #[test]
    fn test_fws_collapses_folds() {
        assert_eq!(fws(b"\r\n next"), Ok((&b"next"[..], ascii::SP)));
        assert_eq!(fws(b" \r\n \r\n next"), Ok((&b"next"[..], ascii::SP)));
        assert_eq!(fws(b"\t\t next"), Ok((&b"next"[..], ascii::SP)));
        // a break not followed by whitespace starts a new line, not a fold
        assert!(fws(b"\r\nSubject: x").is_err());
        assert!(fws(b"next").is_err());
    }

    #[test]
    fn test_comment_nesting_and_escapes() {
        assert_eq!(comment(b"(one (two) three) x"), Ok((&b" x"[..], ())));
        assert_eq!(comment(b"(escaped \\) paren)x"), Ok((&b"x"[..], ())));
        assert_eq!(comment(b"(folded\r\n over lines)x"), Ok((&b"x"[..], ())));
        assert!(comment(b"(never closed").is_err());
        assert!(comment(b"no comment").is_err());
    }

    #[test]
    fn test_cfws() {
        assert_eq!(
            cfws(b"(Plain text) us-ascii"),
            Ok((&b"us-ascii"[..], &b"(Plain text) "[..]))
        );
        assert_eq!(
            cfws(b" (a (nested) remark) value"),
            Ok((&b"value"[..], &b" (a (nested) remark) "[..]))
        );
        assert!(cfws(b"value").is_err());
    }

    #[test]
    fn test_trim_terminator() {
        assert_eq!(trim_terminator(b"abc\r\n"), b"abc");
        assert_eq!(trim_terminator(b"abc\n"), b"abc");
        assert_eq!(trim_terminator(b"abc\r"), b"abc");
        assert_eq!(trim_terminator(b"abc"), b"abc");
        assert_eq!(trim_terminator(b"\r\n"), b"");
    }
}
