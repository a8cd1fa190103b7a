//! Quoted strings in structured field values (RFC 5322 section 3.2.4).

use nom::combinator::opt;
use nom::error::{Error as NomError, ErrorKind};
use nom::{Err, IResult};

use crate::text::ascii;
use crate::text::whitespace::{cfws, fws};

/// The content of one quoted string, unescaped, folds collapsed.
#[derive(Debug, PartialEq, Default, Clone)]
pub struct QuotedString(Vec<u8>);

impl QuotedString {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.clone()
    }

    pub fn to_string(&self) -> String {
        String::from_utf8_lossy(&self.0).into_owned()
    }
}

/// ```abnf
/// quoted-string   =   [CFWS]
///                     DQUOTE *([FWS] qcontent) [FWS] DQUOTE
///                     [CFWS]
/// ```
///
/// Backslash escapes the next byte; whitespace runs, folds included,
/// collapse to one space.
pub fn quoted_string(input: &[u8]) -> IResult<&[u8], QuotedString> {
    let (rest, _) = opt(cfws)(input)?;
    let mut rest = match rest {
        [b'"', tail @ ..] => tail,
        _ => return Err(Err::Error(NomError::new(input, ErrorKind::Char))),
    };

    let mut content = Vec::new();
    loop {
        match rest.first() {
            None => return Err(Err::Error(NomError::new(input, ErrorKind::Char))),
            Some(&ascii::DQUOTE) => {
                rest = &rest[1..];
                break;
            }
            Some(&ascii::BACKSLASH) => match rest.get(1) {
                Some(c) => {
                    content.push(*c);
                    rest = &rest[2..];
                }
                None => return Err(Err::Error(NomError::new(input, ErrorKind::Char))),
            },
            Some(&c) if ascii::is_ws(c) || c == ascii::CR || c == ascii::LF => {
                let (after, _) = fws(rest)?;
                content.push(ascii::SP);
                rest = after;
            }
            Some(&c) => {
                content.push(c);
                rest = &rest[1..];
            }
        }
    }

    let (rest, _) = opt(cfws)(rest)?;
    Ok((rest, QuotedString(content)))
}
