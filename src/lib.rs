#![doc = include_str!("../README.md")]

pub mod config;
pub mod decode;
pub mod error;
pub mod mime;
pub mod monitor;
pub mod stream;
pub mod text;
pub mod token;

pub use config::TokenizerConfig;
pub use error::{Error, EventKind};
pub use monitor::{DecodeMonitor, Lenient, Strict};
pub use stream::pool::BufferPool;
pub use token::{RecursionMode, Token, TokenStream};

use std::io::Read;

/// Lenient tokenizer over any byte source.
pub fn tokenize<R: Read>(src: R) -> TokenStream<R> {
    TokenStream::new(src)
}

/// Strict tokenizer: structural violations abort the traversal.
pub fn tokenize_strict<R: Read>(src: R) -> TokenStream<R> {
    TokenStream::strict(src)
}
