/// US-ASCII byte constants
pub mod ascii;

/// RFC 2047 encoded words
pub mod encoding;

/// Header value folding/unfolding
pub mod fold;

/// Quoted strings
pub mod quoted;

/// Whitespace, line terminators, comments
pub mod whitespace;

/// Atoms and tokens
pub mod words;
