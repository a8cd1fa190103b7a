//! Multipart delimiter detection over the line buffer.
//!
//! A region of body content runs up to the next line matching
//! `--token[--][padding]CRLF`. The scanner delivers body bytes and stops at
//! the delimiter, consuming the whole delimiter line. The CRLF immediately
//! preceding the delimiter belongs to the delimiter (RFC 2046 section 5.1.1)
//! and is never delivered. A candidate that straddles a buffer refill is
//! held back until enough bytes are available to decide.

use std::io::Read;

use memchr::memmem;

use crate::error::Error;
use crate::stream::buffer::LineBuffer;
use crate::text::ascii;

/// Kind of the delimiter that terminated a region.
#[derive(Debug, PartialEq, Clone, Copy)]
pub enum Delimiter {
    Next,
    Last,
}

#[derive(Debug)]
pub struct BoundaryScanner {
    delimiter: Vec<u8>,
    lenient: bool,
    line_start: bool,
    done: bool,
    last_part: bool,
    found: bool,
}

enum Outcome {
    /// A confirmed delimiter: body runs to `body_end`, the delimiter line
    /// runs to `consume_to`.
    Match {
        body_end: usize,
        consume_to: usize,
        last: bool,
    },
    /// No decision yet: `[pos, up_to)` is body regardless of what follows.
    Deliver { up_to: usize },
}

enum Tail {
    Delimiter { consumed: usize, last: bool },
    NeedMore,
    NotDelimiter,
}

impl BoundaryScanner {
    /// `token` is the boundary parameter value, without the leading `--`.
    /// Its length is validated against the buffer growth ceiling here, at
    /// construction, so a misconfigured boundary fails loudly instead of
    /// never matching.
    pub fn new(token: &[u8], lenient: bool, max_capacity: usize) -> Result<Self, Error> {
        // the scanner must be able to hold a full delimiter line plus the
        // preceding CRLF and the trailing terminator in one window
        if token.len() + 8 > max_capacity {
            return Err(Error::BoundaryTooLong {
                len: token.len(),
                capacity: max_capacity,
            });
        }
        let mut delimiter = Vec::with_capacity(token.len() + 2);
        delimiter.extend_from_slice(ascii::DASH_DASH);
        delimiter.extend_from_slice(token);
        Ok(Self {
            delimiter,
            lenient,
            line_start: true,
            done: false,
            last_part: false,
            found: false,
        })
    }

    /// The region has been fully delivered.
    pub fn exhausted(&self) -> bool {
        self.done
    }

    /// Whether the terminating delimiter was the `--token--` form. Only
    /// meaningful once the region is exhausted.
    pub fn is_last_part(&self) -> bool {
        self.last_part
    }

    /// Whether a delimiter line was seen at all; false when the region was
    /// cut short by end of stream.
    pub fn delimiter_found(&self) -> bool {
        self.found
    }

    /// The delimiter that terminated the region, `None` when it ended at
    /// end of stream instead.
    pub fn delimiter(&self) -> Option<Delimiter> {
        match (self.found, self.last_part) {
            (false, _) => None,
            (true, false) => Some(Delimiter::Next),
            (true, true) => Some(Delimiter::Last),
        }
    }

    pub fn read<R: Read>(
        &mut self,
        src: &mut LineBuffer<R>,
        dst: &mut [u8],
    ) -> Result<usize, Error> {
        if self.done || dst.is_empty() {
            return Ok(0);
        }
        loop {
            if src.available() == 0 && src.fill()? == 0 {
                self.done = true;
                return Ok(0);
            }
            match self.scan(src) {
                Outcome::Match {
                    body_end,
                    consume_to,
                    last,
                } => {
                    if body_end > src.pos() {
                        return Ok(self.deliver(src, dst, body_end));
                    }
                    src.consume(consume_to - src.pos());
                    self.done = true;
                    self.found = true;
                    self.last_part = last;
                    return Ok(0);
                }
                Outcome::Deliver { up_to } => {
                    if up_to > src.pos() {
                        return Ok(self.deliver(src, dst, up_to));
                    }
                    if src.fill()? == 0 && src.available() == 0 {
                        self.done = true;
                        return Ok(0);
                    }
                    // refilled (or end of stream is now known): scan again
                }
            }
        }
    }

    /// Discard the rest of the region; returns the number of body bytes
    /// thrown away.
    pub fn drain<R: Read>(&mut self, src: &mut LineBuffer<R>) -> Result<u64, Error> {
        let mut scratch = [0u8; 4096];
        let mut total = 0u64;
        loop {
            let n = self.read(src, &mut scratch)?;
            if n == 0 {
                return Ok(total);
            }
            total += n as u64;
        }
    }

    fn deliver<R: Read>(&mut self, src: &mut LineBuffer<R>, dst: &mut [u8], up_to: usize) -> usize {
        let n = dst.len().min(up_to - src.pos());
        dst[..n].copy_from_slice(&src.window()[..n]);
        self.line_start = dst[n - 1] == ascii::LF;
        src.consume(n);
        n
    }

    fn scan<R: Read>(&self, src: &LineBuffer<R>) -> Outcome {
        let pos = src.pos();
        let limit = src.limit();
        let w = src.window();
        let eof = src.saw_eof();
        let dlen = self.delimiter.len();

        for rel in memmem::find_iter(w, &self.delimiter) {
            let at_line_start = match rel {
                0 => self.line_start,
                _ => w[rel - 1] == ascii::LF,
            };
            if !at_line_start {
                continue;
            }
            match classify_tail(&w[rel + dlen..], eof, self.lenient) {
                Tail::Delimiter { consumed, last } => {
                    return Outcome::Match {
                        body_end: pos + strip_eol(w, rel),
                        consume_to: pos + rel + dlen + consumed,
                        last,
                    };
                }
                Tail::NeedMore => {
                    return Outcome::Deliver {
                        up_to: pos + strip_eol(w, rel),
                    };
                }
                Tail::NotDelimiter => continue,
            }
        }

        if eof {
            Outcome::Deliver { up_to: limit }
        } else {
            // hold back any suffix that could still turn into
            // CRLF + delimiter after the next refill
            let keepback = dlen + 2;
            Outcome::Deliver {
                up_to: limit.saturating_sub(keepback).max(pos),
            }
        }
    }
}

/// Body end for a candidate at `rel`: the line break before the delimiter
/// is part of the delimiter, earlier ones are content.
fn strip_eol(w: &[u8], rel: usize) -> usize {
    let mut end = rel;
    if end > 0 && w[end - 1] == ascii::LF {
        end -= 1;
        if end > 0 && w[end - 1] == ascii::CR {
            end -= 1;
        }
    }
    end
}

/// Decide what the bytes right after `--token` make of the candidate.
fn classify_tail(tail: &[u8], eof: bool, lenient: bool) -> Tail {
    let (mut i, last) = match tail {
        [b'-', b'-', ..] => (2, true),
        [b'-'] if !eof => return Tail::NeedMore,
        [] if !eof => return Tail::NeedMore,
        _ => (0, false),
    };

    // transport padding (RFC 2046: ignored whitespace before the CRLF)
    while i < tail.len() && ascii::is_ws(tail[i]) {
        i += 1;
    }

    if i >= tail.len() {
        // end of window inside the padding, or the delimiter ends the stream
        return match eof {
            true => Tail::Delimiter { consumed: i, last },
            false => Tail::NeedMore,
        };
    }

    match tail[i] {
        ascii::CR => {
            if tail.get(i + 1) == Some(&ascii::LF) {
                Tail::Delimiter {
                    consumed: i + 2,
                    last,
                }
            } else if i + 1 >= tail.len() && !eof {
                Tail::NeedMore
            } else {
                Tail::NotDelimiter
            }
        }
        ascii::LF if lenient => Tail::Delimiter {
            consumed: i + 1,
            last,
        },
        _ => Tail::NotDelimiter,
    }
}
