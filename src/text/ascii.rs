//! Byte constants for the US-ASCII characters the grammar cares about.

pub const HT: u8 = 0x09;
pub const LF: u8 = 0x0A;
pub const CR: u8 = 0x0D;
pub const SP: u8 = 0x20;
pub const EXCLAMATION: u8 = 0x21;
pub const DQUOTE: u8 = 0x22;
pub const COLON: u8 = 0x3A;
pub const QUESTION: u8 = 0x3F;
pub const BACKSLASH: u8 = 0x5C;
pub const UNDERSCORE: u8 = 0x5F;
pub const TILDE: u8 = 0x7E;

pub const CRLF: &[u8] = &[CR, LF];
pub const DASH_DASH: &[u8] = b"--";

pub fn is_ws(c: u8) -> bool {
    c == SP || c == HT
}
