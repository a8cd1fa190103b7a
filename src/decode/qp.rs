//! Streaming quoted-printable decoding of body content.

use std::io::{self, Read};
use std::sync::Arc;

use crate::error::EventKind;
use crate::monitor::DecodeMonitor;

/// Decodes a quoted-printable body on the fly: `=XY` hex escapes, soft
/// line breaks (`=` before a line end), everything else passed through.
/// Malformed escapes are reported to the monitor and passed through
/// literally when recovery is allowed.
pub struct QuotedPrintableReader<R> {
    inner: R,
    monitor: Arc<dyn DecodeMonitor>,
    out: Vec<u8>,
    out_pos: usize,
    /// Escape bytes carried over a chunk border (`=`, `=X` or `=CR`).
    pending: Vec<u8>,
    eof: bool,
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'A'..=b'F' => Some(c - b'A' + 10),
        // lowercase is not canonical but widespread
        b'a'..=b'f' => Some(c - b'a' + 10),
        _ => None,
    }
}

impl<R: Read> QuotedPrintableReader<R> {
    pub fn new(inner: R, monitor: Arc<dyn DecodeMonitor>) -> Self {
        Self {
            inner,
            monitor,
            out: Vec::new(),
            out_pos: 0,
            pending: Vec::new(),
            eof: false,
        }
    }

    fn warn(&self, kind: EventKind, detail: &str) -> io::Result<()> {
        self.monitor.warn(kind, detail).map_err(io::Error::from)
    }

    fn process(&mut self, chunk: &[u8]) -> io::Result<()> {
        // stitch the carried-over escape prefix to the new chunk
        let data: Vec<u8> = if self.pending.is_empty() {
            chunk.to_vec()
        } else {
            let mut v = std::mem::take(&mut self.pending);
            v.extend_from_slice(chunk);
            v
        };

        let mut i = 0;
        while i < data.len() {
            if data[i] != b'=' {
                self.out.push(data[i]);
                i += 1;
                continue;
            }
            match &data[i + 1..] {
                // soft line breaks
                [b'\n', ..] => i += 2,
                [b'\r', b'\n', ..] => i += 3,

                // hex escape
                [a, b, ..] if hex_value(*a).is_some() && hex_value(*b).is_some() => {
                    self.out
                        .push(hex_value(*a).unwrap() << 4 | hex_value(*b).unwrap());
                    i += 3;
                }

                // sequences that cannot be decided before the next chunk
                [] if !self.eof => {
                    self.pending = data[i..].to_vec();
                    return Ok(());
                }
                [b'\r'] if !self.eof => {
                    self.pending = data[i..].to_vec();
                    return Ok(());
                }
                [a] if !self.eof && hex_value(*a).is_some() => {
                    self.pending = data[i..].to_vec();
                    return Ok(());
                }

                // end-of-stream stragglers
                [] => {
                    self.warn(EventKind::UnterminatedSoftBreak, "= at end of stream")?;
                    self.out.push(b'=');
                    i += 1;
                }
                [b'\r'] => {
                    self.warn(EventKind::UnterminatedSoftBreak, "soft break missing LF")?;
                    i += 2;
                }

                // anything else is an invalid escape: keep the `=` literal
                _ => {
                    self.warn(EventKind::InvalidQuotedPrintable, "invalid escape sequence")?;
                    self.out.push(b'=');
                    i += 1;
                }
            }
        }
        Ok(())
    }

    fn refill(&mut self) -> io::Result<()> {
        self.out.clear();
        self.out_pos = 0;
        let mut chunk = [0u8; 512];
        while self.out.is_empty() && !self.eof {
            let n = self.inner.read(&mut chunk)?;
            if n == 0 {
                self.eof = true;
                let rest = std::mem::take(&mut self.pending);
                if !rest.is_empty() {
                    self.process(&rest)?;
                }
                return Ok(());
            }
            self.process(&chunk[..n])?;
        }
        Ok(())
    }
}

impl<R: Read> Read for QuotedPrintableReader<R> {
    fn read(&mut self, dst: &mut [u8]) -> io::Result<usize> {
        if dst.is_empty() {
            return Ok(0);
        }
        if self.out_pos >= self.out.len() {
            self.refill()?;
        }
        let pending = &self.out[self.out_pos..];
        let n = dst.len().min(pending.len());
        dst[..n].copy_from_slice(&pending[..n]);
        self.out_pos += n;
        Ok(n)
    }
}
