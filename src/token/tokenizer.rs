//! The pull-based event state machine.
//!
//! One `next_token` call advances the traversal by one token. Nesting
//! (multipart body parts, encapsulated messages) is driven by an explicit
//! stack of entity frames, never by call-stack recursion, so traversal
//! depth is bounded by memory and `stop` works at any depth.

use std::io::Read;
use std::sync::Arc;

use crate::config::TokenizerConfig;
use crate::decode::{Base64Reader, QuotedPrintableReader};
use crate::error::{Error, EventKind};
use crate::mime::descriptor::{BodyDescriptor, DefaultType, DescriptorBuilder};
use crate::mime::mechanism::TransferEncoding;
use crate::mime::r#type::MultipartSubtype;
use crate::monitor::{DecodeMonitor, Lenient, Strict};
use crate::stream::boundary::{BoundaryScanner, Delimiter};
use crate::stream::buffer::LineBuffer;
use crate::stream::lines::LineTrackingReader;
use crate::stream::pool::BufferPool;
use crate::token::field::{read_logical_field, FieldLine, RawField};
use crate::token::{RecursionMode, Token};

#[derive(Debug, Clone, Copy, PartialEq)]
enum EntityKind {
    Message,
    BodyPart,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum EntityState {
    Start,
    Header,
    Field,
    EndHeader,
    Preamble,
    StartMultipart,
    /// Between two delimiters of this entity's own multipart body.
    PartsBoundary,
    /// About to push an encapsulated message frame.
    NestedMessage,
    Body,
    Epilogue,
    EndMultipart,
    End,
}

struct EntityFrame {
    kind: EntityKind,
    state: EntityState,
    /// Boundary token of the enclosing multipart, terminating this
    /// entity's own content regions. `None` means end-of-stream bounded.
    terminator: Option<Vec<u8>>,
    default_type: DefaultType,
    headless: bool,
    builder: DescriptorBuilder,
    descriptor: Option<BodyDescriptor>,
    /// This entity's own multipart boundary, when it is a multipart.
    own_boundary: Option<Vec<u8>>,
    own_scanner: Option<BoundaryScanner>,
    field_count: usize,
    overflow_notified: bool,
}

impl EntityFrame {
    fn new(
        kind: EntityKind,
        terminator: Option<Vec<u8>>,
        default_type: DefaultType,
        headless: bool,
    ) -> Self {
        Self {
            kind,
            state: EntityState::Start,
            terminator,
            default_type,
            headless,
            builder: DescriptorBuilder::default(),
            descriptor: None,
            own_boundary: None,
            own_scanner: None,
            field_count: 0,
            overflow_notified: false,
        }
    }
}

/// The body-bearing region the traversal currently sits on.
enum Region {
    Boundary(BoundaryScanner),
    Length(u64),
    Eof,
}

/// Streaming MIME tokenizer over a byte source.
pub struct TokenStream<R: Read> {
    config: TokenizerConfig,
    monitor: Arc<dyn DecodeMonitor>,
    pool: Option<Arc<BufferPool>>,
    buf: LineBuffer<LineTrackingReader<R>>,
    frames: Vec<EntityFrame>,
    region: Option<Region>,
    /// Outcome of the last drained boundary region; the inner `None`
    /// means the region ended at end of stream without a delimiter.
    last_scan: Option<Option<Delimiter>>,
    field: Option<RawField>,
    descriptor: Option<BodyDescriptor>,
    recursion: RecursionMode,
    stopped: bool,
    started: bool,
}

impl<R: Read> TokenStream<R> {
    /// Lenient tokenizer with default configuration.
    pub fn new(src: R) -> Self {
        Self::with_config(src, TokenizerConfig::default(), Arc::new(Lenient))
    }

    /// Strict tokenizer: structural violations abort the traversal.
    pub fn strict(src: R) -> Self {
        Self::with_config(src, TokenizerConfig::strict(), Arc::new(Strict))
    }

    pub fn with_config(src: R, config: TokenizerConfig, monitor: Arc<dyn DecodeMonitor>) -> Self {
        Self::assemble(src, config, monitor, None, RecursionMode::default())
    }

    /// Like [`with_config`](Self::with_config), drawing the look-ahead
    /// buffer from a shared pool; it returns there when this stream is
    /// dropped or re-armed.
    pub fn with_pool(
        src: R,
        config: TokenizerConfig,
        monitor: Arc<dyn DecodeMonitor>,
        pool: Arc<BufferPool>,
    ) -> Self {
        Self::assemble(src, config, monitor, Some(pool), RecursionMode::default())
    }

    fn assemble(
        src: R,
        config: TokenizerConfig,
        monitor: Arc<dyn DecodeMonitor>,
        pool: Option<Arc<BufferPool>>,
        recursion: RecursionMode,
    ) -> Self {
        let src = LineTrackingReader::new(src);
        let buf = match &pool {
            Some(pool) => LineBuffer::with_pool(
                src,
                config.buffer_size,
                config.max_buffer_size,
                config.max_line_len,
                pool.clone(),
            ),
            None => LineBuffer::with_limits(
                src,
                config.buffer_size,
                config.max_buffer_size,
                config.max_line_len,
            ),
        };
        let root = EntityFrame::new(
            EntityKind::Message,
            None,
            DefaultType::Generic,
            config.headless_content_type.is_some(),
        );
        Self {
            config,
            monitor,
            pool,
            buf,
            frames: vec![root],
            region: None,
            last_scan: None,
            field: None,
            descriptor: None,
            recursion,
            stopped: false,
            started: false,
        }
    }

    /// Re-arm over a new source, keeping configuration, policy and
    /// recursion mode. Fails while a traversal is in progress; call
    /// [`reset`](Self::reset) first to abandon one.
    pub fn parse(&mut self, src: R) -> Result<(), Error> {
        if self.started && !self.stopped && !self.frames.is_empty() {
            return Err(Error::ParseInProgress);
        }
        *self = Self::assemble(
            src,
            self.config.clone(),
            self.monitor.clone(),
            self.pool.clone(),
            self.recursion,
        );
        Ok(())
    }

    /// Abandon the current traversal; `next_token` yields only
    /// `EndOfStream` until [`parse`](Self::parse) is called again.
    pub fn reset(&mut self) {
        self.frames.clear();
        self.region = None;
        self.last_scan = None;
        self.field = None;
        self.descriptor = None;
        self.stopped = false;
    }

    /// Prevent any further token emission. Cooperative: an in-flight
    /// blocking read is not interrupted.
    pub fn stop(&mut self) {
        self.stopped = true;
    }

    pub fn recursion_mode(&self) -> RecursionMode {
        self.recursion
    }

    /// Takes effect from the next body decision; parts already entered
    /// are not affected.
    pub fn set_recursion_mode(&mut self, mode: RecursionMode) {
        self.recursion = mode;
    }

    /// The field of the last `Field` token.
    pub fn field(&self) -> Option<&RawField> {
        self.field.as_ref()
    }

    /// Descriptor of the entity whose header block ended last. Valid from
    /// its `EndHeader` token to the end of that entity.
    pub fn descriptor(&self) -> Option<&BodyDescriptor> {
        self.descriptor.as_ref()
    }

    /// 1-based input line the source has been consumed up to. Approximate
    /// while content is buffered ahead; meant for diagnostics.
    pub fn line(&self) -> u64 {
        self.buf.source().line()
    }

    /// Reader over the content of the current body-bearing token
    /// (`Body`, `Preamble`, `Epilogue`, `RawEntity`). Content not read
    /// before the next `next_token` call is skipped.
    pub fn body_reader(&mut self) -> Option<BodyReader<'_, R>> {
        self.region.as_ref()?;
        Some(BodyReader {
            stream: self,
            closed: false,
        })
    }

    /// Like [`body_reader`](Self::body_reader), with the entity's
    /// Content-Transfer-Encoding decoded on the fly.
    pub fn decoded_body_reader(&mut self) -> Option<Box<dyn Read + '_>> {
        self.region.as_ref()?;
        let encoding = self
            .descriptor
            .as_ref()
            .map(|d| d.transfer_encoding().clone())
            .unwrap_or_default();
        let monitor = self.monitor.clone();
        let reader = BodyReader {
            stream: self,
            closed: false,
        };
        Some(match encoding {
            TransferEncoding::Base64 => Box::new(Base64Reader::new(reader, monitor)),
            TransferEncoding::QuotedPrintable => {
                Box::new(QuotedPrintableReader::new(reader, monitor))
            }
            _ => Box::new(reader),
        })
    }

    /// Advance the traversal by one token. After the outermost
    /// `EndMessage`, keeps returning `EndOfStream`.
    pub fn next_token(&mut self) -> Result<Token, Error> {
        self.started = true;
        self.field = None;
        if self.stopped {
            return Ok(Token::EndOfStream);
        }
        self.finish_region()?;

        loop {
            let Some(state) = self.frames.last().map(|f| f.state) else {
                return Ok(Token::EndOfStream);
            };
            let token = match state {
                EntityState::Start => {
                    let frame = self.frames.last_mut().unwrap();
                    frame.state = EntityState::Header;
                    match frame.kind {
                        EntityKind::Message => Token::StartMessage,
                        EntityKind::BodyPart => Token::StartBodypart,
                    }
                }

                EntityState::Header => {
                    let frame = self.frames.last_mut().unwrap();
                    frame.builder = DescriptorBuilder::default();
                    frame.field_count = 0;
                    frame.state = match frame.headless {
                        true => EntityState::EndHeader,
                        false => EntityState::Field,
                    };
                    Token::StartHeader
                }

                EntityState::Field => match read_logical_field(&mut self.buf)? {
                    FieldLine::Field(f) => {
                        let over = {
                            let frame = self.frames.last_mut().unwrap();
                            frame.field_count += 1;
                            self.config
                                .max_header_count
                                .is_some_and(|max| frame.field_count > max)
                        };
                        if over {
                            let frame = self.frames.last_mut().unwrap();
                            if !frame.overflow_notified {
                                frame.overflow_notified = true;
                                self.monitor.warn(
                                    EventKind::HeadersTooMany,
                                    "header field count over the configured maximum",
                                )?;
                            }
                            continue; // consumed, not emitted
                        }
                        if !f.value_bytes().is_ascii() {
                            self.monitor.warn(
                                EventKind::NonAsciiInHeader,
                                "8-bit bytes in a header value",
                            )?;
                        }
                        let frame = self.frames.last_mut().unwrap();
                        frame.builder.field(f.name_bytes(), f.value_bytes());
                        self.field = Some(f);
                        Token::Field
                    }
                    FieldLine::EndOfHeader => {
                        self.frames.last_mut().unwrap().state = EntityState::EndHeader;
                        continue;
                    }
                    FieldLine::Eof => {
                        self.monitor.warn(
                            EventKind::HeadersPrematureEnd,
                            "end of stream before the header-terminating blank line",
                        )?;
                        self.frames.last_mut().unwrap().state = EntityState::EndHeader;
                        continue;
                    }
                    FieldLine::Malformed(raw) => {
                        if self.config.malformed_starts_body {
                            self.buf.unread(&raw);
                            self.frames.last_mut().unwrap().state = EntityState::EndHeader;
                        } else {
                            self.monitor.warn(
                                EventKind::InvalidHeader,
                                "skipping a header line without a usable name",
                            )?;
                        }
                        continue;
                    }
                },

                EntityState::EndHeader => {
                    let lenient = !self.config.strict;
                    let max_cap = self.buf.max_capacity();
                    let mode = self.recursion;
                    let headless_ct = self.config.headless_content_type.clone();

                    let frame = self.frames.last_mut().unwrap();
                    if frame.headless {
                        if let Some(ct) = &headless_ct {
                            frame.builder.field(b"Content-Type", ct.as_bytes());
                        }
                    }
                    let builder = std::mem::take(&mut frame.builder);
                    let descriptor = builder.build(frame.default_type);

                    if let Some(boundary) = descriptor.boundary() {
                        // fatal configuration error, raised here at
                        // multipart entry rather than on a later read
                        let scanner = BoundaryScanner::new(boundary, lenient, max_cap)?;
                        frame.own_boundary = Some(boundary.to_vec());
                        frame.own_scanner = Some(scanner);
                        frame.state = EntityState::Preamble;
                    } else if descriptor.is_message() && mode == RecursionMode::Recurse {
                        frame.state = EntityState::NestedMessage;
                    } else {
                        frame.state = EntityState::Body;
                    }
                    frame.descriptor = Some(descriptor.clone());
                    self.descriptor = Some(descriptor);
                    Token::EndHeader
                }

                EntityState::Preamble => {
                    let frame = self.frames.last_mut().unwrap();
                    let scanner = frame.own_scanner.take().expect("scanner set at EndHeader");
                    frame.state = EntityState::StartMultipart;
                    self.region = Some(Region::Boundary(scanner));
                    Token::Preamble
                }

                EntityState::StartMultipart => {
                    self.frames.last_mut().unwrap().state = EntityState::PartsBoundary;
                    Token::StartMultipart
                }

                EntityState::PartsBoundary => {
                    let delimiter = self.last_scan.take().flatten();
                    if delimiter != Some(Delimiter::Next) {
                        self.frames.last_mut().unwrap().state = EntityState::Epilogue;
                        continue;
                    }
                    if self.recursion == RecursionMode::Raw {
                        let lenient = !self.config.strict;
                        let max_cap = self.buf.max_capacity();
                        let token = self
                            .frames
                            .last()
                            .unwrap()
                            .own_boundary
                            .clone()
                            .expect("multipart frame has a boundary");
                        let scanner = BoundaryScanner::new(&token, lenient, max_cap)?;
                        self.region = Some(Region::Boundary(scanner));
                        Token::RawEntity
                    } else {
                        let (terminator, default_type) = {
                            let frame = self.frames.last().unwrap();
                            let digest = matches!(
                                frame
                                    .descriptor
                                    .as_ref()
                                    .and_then(BodyDescriptor::multipart_subtype),
                                Some(MultipartSubtype::Digest)
                            );
                            (
                                frame.own_boundary.clone(),
                                match digest {
                                    true => DefaultType::Digest,
                                    false => DefaultType::Generic,
                                },
                            )
                        };
                        self.frames.push(EntityFrame::new(
                            EntityKind::BodyPart,
                            terminator,
                            default_type,
                            false,
                        ));
                        continue; // the part's Start arm emits the token
                    }
                }

                EntityState::NestedMessage => {
                    let frame = self.frames.last_mut().unwrap();
                    let terminator = frame.terminator.clone();
                    frame.state = EntityState::End;
                    self.frames.push(EntityFrame::new(
                        EntityKind::Message,
                        terminator,
                        DefaultType::Generic,
                        false,
                    ));
                    continue;
                }

                EntityState::Body => {
                    let lenient = !self.config.strict;
                    let max_cap = self.buf.max_capacity();
                    let frame = self.frames.last_mut().unwrap();
                    frame.state = EntityState::End;
                    let region = match &frame.terminator {
                        Some(token) => {
                            Region::Boundary(BoundaryScanner::new(token, lenient, max_cap)?)
                        }
                        None => match frame.descriptor.as_ref().and_then(|d| d.content_length()) {
                            Some(n) => Region::Length(n),
                            None => Region::Eof,
                        },
                    };
                    self.region = Some(region);
                    Token::Body
                }

                EntityState::Epilogue => {
                    let lenient = !self.config.strict;
                    let max_cap = self.buf.max_capacity();
                    let frame = self.frames.last_mut().unwrap();
                    frame.state = EntityState::EndMultipart;
                    let region = match &frame.terminator {
                        Some(token) => {
                            Region::Boundary(BoundaryScanner::new(token, lenient, max_cap)?)
                        }
                        None => Region::Eof,
                    };
                    self.region = Some(region);
                    Token::Epilogue
                }

                EntityState::EndMultipart => {
                    self.frames.last_mut().unwrap().state = EntityState::End;
                    Token::EndMultipart
                }

                EntityState::End => {
                    let frame = self.frames.pop().expect("End state implies a frame");
                    match frame.kind {
                        EntityKind::Message => Token::EndMessage,
                        EntityKind::BodyPart => Token::EndBodypart,
                    }
                }
            };

            tracing::trace!(?token, depth = self.frames.len(), "token");
            return Ok(token);
        }
    }

    /// Drain whatever is left of the current content region and record
    /// the delimiter outcome for the enclosing multipart.
    fn finish_region(&mut self) -> Result<(), Error> {
        let Some(region) = self.region.take() else {
            return Ok(());
        };
        match region {
            Region::Boundary(mut scanner) => {
                scanner.drain(&mut self.buf)?;
                let delimiter = scanner.delimiter();
                self.last_scan = Some(delimiter);
                if delimiter.is_none() {
                    self.monitor.warn(
                        EventKind::BodyPrematureEnd,
                        "end of stream before the closing boundary",
                    )?;
                }
            }
            Region::Length(n) => {
                let mut remaining = n;
                while remaining > 0 {
                    let step = remaining.min(1 << 20) as usize;
                    let skipped = self.buf.skip(step)?;
                    if skipped == 0 {
                        break;
                    }
                    remaining -= skipped as u64;
                }
                self.last_scan = None;
            }
            Region::Eof => {
                while self.buf.skip(1 << 20)? > 0 {}
                self.last_scan = None;
            }
        }
        Ok(())
    }

    fn region_read(&mut self, dst: &mut [u8]) -> Result<usize, Error> {
        match self.region.as_mut() {
            None => Ok(0),
            Some(Region::Boundary(scanner)) => scanner.read(&mut self.buf, dst),
            Some(Region::Length(remaining)) => {
                if *remaining == 0 {
                    return Ok(0);
                }
                let cap = (*remaining).min(dst.len() as u64) as usize;
                let n = Read::read(&mut self.buf, &mut dst[..cap])?;
                *remaining -= n as u64;
                Ok(n)
            }
            Some(Region::Eof) => Ok(Read::read(&mut self.buf, dst)?),
        }
    }
}

/// Read view over the current body-bearing token's content.
pub struct BodyReader<'a, R: Read> {
    stream: &'a mut TokenStream<R>,
    closed: bool,
}

impl<'a, R: Read> BodyReader<'a, R> {
    /// Further reads fail with a use-after-close error.
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// After read-to-EOF of a boundary-terminated body: whether the
    /// terminating delimiter was the `--token--` form.
    pub fn is_last_part(&self) -> Option<bool> {
        match self.stream.region.as_ref() {
            Some(Region::Boundary(s)) if s.exhausted() => Some(s.is_last_part()),
            _ => None,
        }
    }
}

impl<'a, R: Read> Read for BodyReader<'a, R> {
    fn read(&mut self, dst: &mut [u8]) -> std::io::Result<usize> {
        if self.closed {
            return Err(Error::UseAfterClose.into());
        }
        self.stream.region_read(dst).map_err(Into::into)
    }
}
