use nom::{
    branch::alt,
    bytes::complete::tag,
    combinator::map,
    multi::many0,
    sequence::{preceded, tuple},
    IResult,
};

use crate::mime::charset::Charset;
use crate::text::quoted::{quoted_string, QuotedString};
use crate::text::words::mime_token;

// --------- NAIVE TYPE

/// A Content-Type value as written: main type, subtype, raw parameters.
/// Interpretation (including RFC 2231 reassembly) happens in `to_type`.
#[derive(Debug, PartialEq)]
pub struct NaiveType<'a> {
    pub main: &'a [u8],
    pub sub: &'a [u8],
    pub params: Vec<RawParameter<'a>>,
}

impl<'a> NaiveType<'a> {
    pub fn to_type(&self) -> AnyType {
        AnyType::from_naive_type(self)
    }

    pub fn parameters(&self) -> Vec<Parameter> {
        assemble_parameters(&self.params)
    }
}

pub fn naive_type(input: &[u8]) -> IResult<&[u8], NaiveType> {
    map(
        tuple((mime_token, tag("/"), mime_token, parameter_list)),
        |(main, _, sub, params)| NaiveType { main, sub, params },
    )(input)
}

#[derive(Debug, PartialEq)]
pub struct RawParameter<'a> {
    pub name: &'a [u8],
    pub value: RawValue<'a>,
}

#[derive(Debug, PartialEq)]
pub enum RawValue<'a> {
    Atom(&'a [u8]),
    Quoted(QuotedString),
}

impl<'a> RawValue<'a> {
    pub fn to_bytes(&self) -> Vec<u8> {
        match self {
            RawValue::Atom(a) => a.to_vec(),
            RawValue::Quoted(q) => q.to_bytes(),
        }
    }
}

pub fn parameter(input: &[u8]) -> IResult<&[u8], RawParameter> {
    map(
        tuple((
            mime_token,
            tag(b"="),
            alt((
                map(quoted_string, RawValue::Quoted),
                map(mime_token, RawValue::Atom),
            )),
        )),
        |(name, _, value)| RawParameter { name, value },
    )(input)
}

pub fn parameter_list(input: &[u8]) -> IResult<&[u8], Vec<RawParameter>> {
    many0(preceded(tag(";"), parameter))(input)
}

// --------- RFC 2231 REASSEMBLY

/// A parameter after RFC 2231 interpretation: continuations (`name*0`,
/// `name*1`, ...) concatenated, extended values (`name*=`) percent-decoded
/// and converted out of their declared charset.
#[derive(Debug, PartialEq, Clone)]
pub struct Parameter {
    pub name: String,
    pub value: Vec<u8>,
}

impl Parameter {
    pub fn to_string(&self) -> String {
        String::from_utf8_lossy(&self.value).into_owned()
    }
}

struct Continuation {
    name: String,
    charset: Option<Charset>,
    segments: Vec<(u32, Vec<u8>)>,
    simple: Option<Vec<u8>>,
}

/// `name`, `name*`, `name*0`, `name*0*` -> (base, section, extended)
fn split_param_name(name: &[u8]) -> (&[u8], Option<u32>, bool) {
    let (name, extended) = match name {
        [rest @ .., b'*'] => (rest, true),
        _ => (name, false),
    };
    match name.iter().rposition(|c| *c == b'*') {
        Some(star) => {
            let digits = &name[star + 1..];
            let parsed = (!digits.is_empty() && digits.iter().all(u8::is_ascii_digit))
                .then(|| String::from_utf8_lossy(digits).parse::<u32>().ok())
                .flatten();
            match parsed {
                Some(n) => (&name[..star], Some(n), extended),
                None => (name, None, extended),
            }
        }
        None => (name, None, extended),
    }
}

fn percent_decode(value: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(value.len());
    let mut rest = value;
    while let Some((head, tail)) = rest.split_first() {
        if *head == b'%' && tail.len() >= 2 {
            let hex = String::from_utf8_lossy(&tail[..2]);
            if let Ok(b) = u8::from_str_radix(hex.as_ref(), 16) {
                out.push(b);
                rest = &tail[2..];
                continue;
            }
        }
        out.push(*head);
        rest = tail;
    }
    out
}

/// `charset'lang'percent-encoded-data` (leading segment of an extended value)
fn split_extended_initial(value: &[u8]) -> (Option<Charset>, &[u8]) {
    let mut quotes = value.iter().enumerate().filter(|(_, c)| **c == b'\'');
    match (quotes.next(), quotes.next()) {
        (Some((first, _)), Some((second, _))) => {
            let charset = &value[..first];
            let data = &value[second + 1..];
            let charset = (!charset.is_empty()).then(|| Charset::from(charset));
            (charset, data)
        }
        _ => (None, value),
    }
}

pub fn assemble_parameters(raw: &[RawParameter]) -> Vec<Parameter> {
    let mut groups: Vec<Continuation> = Vec::new();

    for p in raw {
        let (base, section, extended) = split_param_name(p.name);
        let base = String::from_utf8_lossy(base).to_ascii_lowercase();
        let group = match groups.iter_mut().find(|g| g.name == base) {
            Some(g) => g,
            None => {
                groups.push(Continuation {
                    name: base,
                    charset: None,
                    segments: Vec::new(),
                    simple: None,
                });
                groups.last_mut().unwrap()
            }
        };

        let bytes = p.value.to_bytes();
        match (section, extended) {
            (None, false) => {
                // plain parameter; first occurrence wins
                if group.simple.is_none() && group.segments.is_empty() {
                    group.simple = Some(bytes);
                }
            }
            (None, true) => {
                let (charset, data) = split_extended_initial(&bytes);
                group.charset = charset;
                if group.simple.is_none() && group.segments.is_empty() {
                    group.simple = Some(percent_decode(data));
                }
            }
            (Some(n), false) => group.segments.push((n, bytes)),
            (Some(n), true) => {
                if n == 0 {
                    let (charset, data) = split_extended_initial(&bytes);
                    group.charset = charset;
                    group.segments.push((n, percent_decode(data)));
                } else {
                    group.segments.push((n, percent_decode(&bytes)));
                }
            }
        }
    }

    groups
        .into_iter()
        .map(|mut g| {
            let value = match g.simple {
                Some(v) => v,
                None => {
                    g.segments.sort_by_key(|(n, _)| *n);
                    g.segments.into_iter().fold(Vec::new(), |mut acc, (_, v)| {
                        acc.extend_from_slice(&v);
                        acc
                    })
                }
            };
            let value = match g.charset {
                // normalize to UTF-8 once the declared charset is known
                Some(cs) => cs.decode(&value).into_bytes(),
                None => value,
            };
            Parameter { name: g.name, value }
        })
        .collect()
}

// -------- TYPE

#[derive(Debug, PartialEq, Clone)]
pub enum AnyType {
    // Composite types
    Multipart(Multipart),
    Message(MessageSubtype),

    // Discrete types
    Text(Text),
    Binary,
}

impl AnyType {
    pub fn from_naive_type(nt: &NaiveType) -> Self {
        let params = nt.parameters();
        match nt.main.to_ascii_lowercase().as_slice() {
            b"multipart" => Multipart::try_new(nt.sub, &params)
                .map(Self::Multipart)
                // a multipart without a boundary degrades to text
                .unwrap_or_else(|| Self::Text(Text::new(b"plain", &params))),
            b"message" => Self::Message(MessageSubtype::from_sub(nt.sub)),
            b"text" => Self::Text(Text::new(nt.sub, &params)),
            _ => Self::Binary,
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub struct Multipart {
    pub subtype: MultipartSubtype,
    pub boundary: Vec<u8>,
}

impl Multipart {
    fn try_new(sub: &[u8], params: &[Parameter]) -> Option<Self> {
        let boundary = params
            .iter()
            .find(|p| p.name == "boundary" && !p.value.is_empty())?;
        Some(Multipart {
            subtype: MultipartSubtype::from_sub(sub),
            boundary: boundary.value.clone(),
        })
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum MultipartSubtype {
    Alternative,
    Mixed,
    Digest,
    Parallel,
    Report,
    Unknown,
}

impl MultipartSubtype {
    fn from_sub(sub: &[u8]) -> Self {
        match sub.to_ascii_lowercase().as_slice() {
            b"alternative" => Self::Alternative,
            b"mixed" => Self::Mixed,
            b"digest" => Self::Digest,
            b"parallel" => Self::Parallel,
            b"report" => Self::Report,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, PartialEq, Clone)]
pub enum MessageSubtype {
    RFC822,
    Partial,
    External,
    Unknown,
}

impl MessageSubtype {
    fn from_sub(sub: &[u8]) -> Self {
        match sub.to_ascii_lowercase().as_slice() {
            b"rfc822" => Self::RFC822,
            b"partial" => Self::Partial,
            b"external-body" => Self::External,
            _ => Self::Unknown,
        }
    }
}

#[derive(Debug, PartialEq, Clone, Default)]
pub struct Text {
    pub subtype: TextSubtype,
    pub charset: Option<Charset>,
}

impl Text {
    fn new(sub: &[u8], params: &[Parameter]) -> Self {
        Text {
            subtype: TextSubtype::from_sub(sub),
            charset: params
                .iter()
                .find(|p| p.name == "charset")
                .map(|p| Charset::from(p.value.as_slice())),
        }
    }
}

#[derive(Debug, PartialEq, Clone, Default)]
pub enum TextSubtype {
    #[default]
    Plain,
    Html,
    Unknown,
}

impl TextSubtype {
    fn from_sub(sub: &[u8]) -> Self {
        match sub.to_ascii_lowercase().as_slice() {
            b"plain" => Self::Plain,
            b"html" => Self::Html,
            _ => Self::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(input: &[u8]) -> NaiveType {
        let (rest, nt) = naive_type(input).unwrap();
        assert_eq!(rest, &b""[..]);
        nt
    }

    #[test]
    fn test_content_type_plaintext() {
        let nt = parsed(b"text/plain; charset=utf-8");
        assert_eq!(
            nt.to_type(),
            AnyType::Text(Text {
                subtype: TextSubtype::Plain,
                charset: Some(Charset::from("utf-8")),
            }),
        );
    }

    #[test]
    fn test_content_type_multipart() {
        let nt = parsed(
            b"multipart/mixed;\r\n\tboundary=\"--==_mimepart_64a3f2c69114f\";\r\n\tcharset=UTF-8",
        );
        assert_eq!(
            nt.to_type(),
            AnyType::Multipart(Multipart {
                subtype: MultipartSubtype::Mixed,
                boundary: b"--==_mimepart_64a3f2c69114f".to_vec(),
            }),
        );
    }

    #[test]
    fn test_multipart_without_boundary_degrades() {
        let nt = parsed(b"multipart/mixed; charset=utf-8");
        assert_eq!(
            nt.to_type(),
            AnyType::Text(Text {
                subtype: TextSubtype::Plain,
                charset: Some(Charset::from("utf-8")),
            }),
        );
    }

    #[test]
    fn test_content_type_message() {
        let nt = parsed(b"message/rfc822");
        assert_eq!(nt.to_type(), AnyType::Message(MessageSubtype::RFC822));
    }

    #[test]
    fn test_rfc2231_continuation() {
        let nt = parsed(b"application/x-stuff; title*0=\"part one, \"; title*1=\"part two\"");
        assert_eq!(
            nt.parameters(),
            vec![Parameter {
                name: "title".into(),
                value: b"part one, part two".to_vec(),
            }],
        );
    }

    #[test]
    fn test_rfc2231_extended_value() {
        let nt = parsed(b"application/x-stuff; title*=us-ascii'en-us'This%20is%20%2A%2A%2Afun%2A%2A%2A");
        assert_eq!(
            nt.parameters(),
            vec![Parameter {
                name: "title".into(),
                value: b"This is ***fun***".to_vec(),
            }],
        );
    }

    #[test]
    fn test_rfc2231_extended_continuation() {
        let nt = parsed(
            b"application/x-stuff; name*0*=utf-8''caf%C3%A9%20; name*1*=ole; name*2=\" soir\"",
        );
        assert_eq!(
            nt.parameters(),
            vec![Parameter {
                name: "name".into(),
                value: "café ole soir".as_bytes().to_vec(),
            }],
        );
    }

    #[test]
    fn test_split_param_name() {
        assert_eq!(split_param_name(b"title"), (&b"title"[..], None, false));
        assert_eq!(split_param_name(b"title*"), (&b"title"[..], None, true));
        assert_eq!(split_param_name(b"title*0"), (&b"title"[..], Some(0), false));
        assert_eq!(split_param_name(b"title*12*"), (&b"title"[..], Some(12), true));
    }
}
