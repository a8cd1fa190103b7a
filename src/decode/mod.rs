/// Streaming base64 body decoding
pub mod base64;

/// Streaming quoted-printable body decoding
pub mod qp;

pub use base64::Base64Reader;
pub use qp::QuotedPrintableReader;
