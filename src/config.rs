/// Tokenizer configuration.
///
/// `Default` gives the lenient profile: unlimited line length and header
/// count, malformed header lines skipped, 4 KiB initial buffer with
/// unbounded growth.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenizerConfig {
    /// Fatal cap on the length of one physical header line, terminator
    /// included. `None` is unlimited.
    pub max_line_len: Option<usize>,
    /// Cap on the number of header fields of one entity.
    pub max_header_count: Option<usize>,
    /// Initial capacity of the line buffer.
    pub buffer_size: usize,
    /// Hard ceiling on buffer growth. Boundary tokens are validated
    /// against it at multipart entry. `None` is unbounded.
    pub max_buffer_size: Option<usize>,
    /// Escalate structural violations instead of recovering.
    pub strict: bool,
    /// Parse a header-less payload: the outermost entity takes this
    /// Content-Type value and its content starts at the first byte.
    pub headless_content_type: Option<String>,
    /// Treat a malformed header line as the first line of the body
    /// instead of skipping it.
    pub malformed_starts_body: bool,
}

pub(crate) const DEFAULT_BUFFER_SIZE: usize = 4096;

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            max_line_len: None,
            max_header_count: None,
            buffer_size: DEFAULT_BUFFER_SIZE,
            max_buffer_size: None,
            strict: false,
            headless_content_type: None,
            malformed_starts_body: false,
        }
    }
}

impl TokenizerConfig {
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::default()
        }
    }
}
