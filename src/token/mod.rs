/// Raw header fields and folding
pub mod field;

/// Pull-based event state machine
pub mod tokenizer;

pub use field::RawField;
pub use tokenizer::{BodyReader, TokenStream};

/// One step of the traversal. Tokens carry no payload; the accessors of
/// [`TokenStream`] are scoped to the current token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token {
    StartMessage,
    StartHeader,
    Field,
    EndHeader,
    Preamble,
    StartMultipart,
    StartBodypart,
    Body,
    EndBodypart,
    EndMultipart,
    Epilogue,
    EndMessage,
    /// One whole body part, headers included, delivered unparsed
    /// (`RecursionMode::Raw`).
    RawEntity,
    /// Terminal: emitted forever once the outermost message has ended.
    EndOfStream,
}

impl Token {
    /// Tokens during which `body_reader` is available.
    pub fn has_content(&self) -> bool {
        matches!(
            self,
            Token::Body | Token::Preamble | Token::Epilogue | Token::RawEntity
        )
    }
}

/// What to do with `message/rfc822` bodies (and, for [`Raw`], body parts
/// in general). Mutable during traversal; takes effect from the next
/// body decision.
///
/// [`Raw`]: RecursionMode::Raw
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecursionMode {
    /// Tokenize nested messages as nested `StartMessage..EndMessage` runs.
    #[default]
    Recurse,
    /// Expose nested messages as one opaque `Body` token.
    NoRecurse,
    /// Expose each body part as one `RawEntity` token, headers unparsed.
    Raw,
}
