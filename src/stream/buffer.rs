//! Growable look-ahead buffer over a byte source.
//!
//! The buffer keeps a single contiguous window of not-yet-consumed bytes,
//! `[pos, limit)`. `fill` appends more bytes from the source, compacting or
//! growing the backing storage as needed, so absolute indices obtained
//! before a `fill` call must not be cached across it.

use std::io::{self, Read};
use std::sync::Arc;

use memchr::{memchr, memmem};

use crate::error::Error;
use crate::stream::pool::BufferPool;

pub struct LineBuffer<R> {
    src: R,
    buf: Vec<u8>,
    pos: usize,
    limit: usize,
    eof: bool,
    max_size: Option<usize>,
    max_line_len: Option<usize>,
    pool: Option<Arc<BufferPool>>,
}

impl<R: Read> LineBuffer<R> {
    pub fn new(src: R, size: usize) -> Self {
        Self::with_limits(src, size, None, None)
    }

    pub fn with_limits(
        src: R,
        size: usize,
        max_size: Option<usize>,
        max_line_len: Option<usize>,
    ) -> Self {
        Self {
            src,
            buf: vec![0; size.max(64)],
            pos: 0,
            limit: 0,
            eof: false,
            max_size,
            max_line_len,
            pool: None,
        }
    }

    /// Like [`with_limits`](Self::with_limits), drawing the backing
    /// storage from a shared pool. It returns there when the buffer is
    /// dropped.
    pub fn with_pool(
        src: R,
        size: usize,
        max_size: Option<usize>,
        max_line_len: Option<usize>,
        pool: Arc<BufferPool>,
    ) -> Self {
        let buf = pool.acquire(size.max(64));
        Self {
            src,
            buf,
            pos: 0,
            limit: 0,
            eof: false,
            max_size,
            max_line_len,
            pool: Some(pool),
        }
    }

    pub fn pos(&self) -> usize {
        self.pos
    }

    pub fn source(&self) -> &R {
        &self.src
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Bytes currently buffered and not yet consumed.
    pub fn available(&self) -> usize {
        self.limit - self.pos
    }

    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// The ceiling the backing storage may grow to.
    pub fn max_capacity(&self) -> usize {
        self.max_size.unwrap_or(usize::MAX)
    }

    /// End of stream was observed on the source.
    pub fn saw_eof(&self) -> bool {
        self.eof
    }

    /// End of stream was observed and everything buffered was consumed.
    pub fn exhausted(&self) -> bool {
        self.eof && self.available() == 0
    }

    pub fn window(&self) -> &[u8] {
        &self.buf[self.pos..self.limit]
    }

    /// Read more bytes from the source into free capacity, growing or
    /// compacting the backing storage first when it is full. Returns the
    /// number of bytes appended; `Ok(0)` means end of stream.
    pub fn fill(&mut self) -> Result<usize, Error> {
        if self.eof {
            return Ok(0);
        }
        if self.limit == self.buf.len() {
            if self.pos > 0 {
                // compact: relocate the live window to the start
                self.buf.copy_within(self.pos..self.limit, 0);
                self.limit -= self.pos;
                self.pos = 0;
            } else {
                let max = self.max_capacity();
                if self.buf.len() >= max {
                    return Err(Error::Io(io::Error::new(
                        io::ErrorKind::OutOfMemory,
                        "line buffer reached its maximum capacity",
                    )));
                }
                let new_len = (self.buf.len() * 2).min(max);
                self.buf.resize(new_len, 0);
            }
        }
        let n = self.src.read(&mut self.buf[self.limit..])?;
        if n == 0 {
            self.eof = true;
        }
        self.limit += n;
        Ok(n)
    }

    /// Make sure at least one byte is buffered, filling as needed.
    /// Returns false at end of stream.
    pub fn ensure(&mut self) -> Result<bool, Error> {
        while self.available() == 0 {
            if self.fill()? == 0 {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Random access within the valid window; out-of-window indices are a
    /// caller bug and fail.
    pub fn byte_at(&self, i: usize) -> Result<u8, Error> {
        if i < self.pos || i >= self.limit {
            return Err(Error::OutOfRange {
                from: i,
                to: i + 1,
                pos: self.pos,
                limit: self.limit,
            });
        }
        Ok(self.buf[i])
    }

    fn check_range(&self, from: usize, to: usize) -> Result<(), Error> {
        if from < self.pos || from > to || to > self.limit {
            return Err(Error::OutOfRange {
                from,
                to,
                pos: self.pos,
                limit: self.limit,
            });
        }
        Ok(())
    }

    /// First occurrence of `pattern` within `[from, to)`, as an absolute
    /// index into the current window.
    pub fn find(&self, pattern: &[u8], from: usize, to: usize) -> Result<Option<usize>, Error> {
        self.check_range(from, to)?;
        Ok(memmem::find(&self.buf[from..to], pattern).map(|i| i + from))
    }

    /// Single-byte analogue of `find`.
    pub fn find_byte(&self, byte: u8, from: usize, to: usize) -> Result<Option<usize>, Error> {
        self.check_range(from, to)?;
        Ok(memchr(byte, &self.buf[from..to]).map(|i| i + from))
    }

    /// Consume `n` buffered bytes. `n` must not exceed `available()`.
    pub fn consume(&mut self, n: usize) {
        debug_assert!(n <= self.available());
        self.pos += n;
    }

    pub fn read_u8(&mut self) -> Result<Option<u8>, Error> {
        if !self.ensure()? {
            return Ok(None);
        }
        let b = self.buf[self.pos];
        self.pos += 1;
        Ok(Some(b))
    }

    /// Next byte without consuming it.
    pub fn peek_u8(&mut self) -> Result<Option<u8>, Error> {
        if !self.ensure()? {
            return Ok(None);
        }
        Ok(Some(self.buf[self.pos]))
    }

    /// Discard up to `n` bytes, filling as needed; returns how many were
    /// actually discarded (less than `n` only at end of stream).
    pub fn skip(&mut self, n: usize) -> Result<usize, Error> {
        let mut skipped = 0;
        while skipped < n {
            if !self.ensure()? {
                break;
            }
            let take = (n - skipped).min(self.available());
            self.pos += take;
            skipped += take;
        }
        Ok(skipped)
    }

    /// Read one line, terminator included, appending to `dst`. Returns the
    /// number of bytes appended; `Ok(0)` means no bytes remain. A line
    /// longer than the configured maximum is a fatal resource error.
    pub fn read_line(&mut self, dst: &mut Vec<u8>) -> Result<usize, Error> {
        let mut added = 0;
        loop {
            if !self.ensure()? {
                return Ok(added);
            }
            match self.find_byte(b'\n', self.pos, self.limit)? {
                Some(i) => {
                    added += i + 1 - self.pos;
                    self.check_line_len(added)?;
                    dst.extend_from_slice(&self.buf[self.pos..=i]);
                    self.pos = i + 1;
                    return Ok(added);
                }
                None => {
                    added += self.available();
                    self.check_line_len(added)?;
                    dst.extend_from_slice(self.window());
                    self.pos = self.limit;
                }
            }
        }
    }

    fn check_line_len(&self, len: usize) -> Result<(), Error> {
        match self.max_line_len {
            Some(max) if len > max => Err(Error::LineLimit { limit: max }),
            _ => Ok(()),
        }
    }

    /// Push bytes back in front of the window, as if they had not been
    /// consumed yet.
    pub fn unread(&mut self, bytes: &[u8]) {
        let len = bytes.len();
        if len == 0 {
            return;
        }
        if len <= self.pos {
            self.buf[self.pos - len..self.pos].copy_from_slice(bytes);
            self.pos -= len;
        } else {
            let tail = self.buf[self.pos..self.limit].to_vec();
            let needed = len + tail.len();
            if needed > self.buf.len() {
                self.buf.resize(needed, 0);
            }
            self.buf[..len].copy_from_slice(bytes);
            self.buf[len..needed].copy_from_slice(&tail);
            self.pos = 0;
            self.limit = needed;
        }
    }
}

impl<R> Drop for LineBuffer<R> {
    fn drop(&mut self) {
        if let Some(pool) = self.pool.take() {
            pool.release(std::mem::take(&mut self.buf));
        }
    }
}

impl<R: Read> Read for LineBuffer<R> {
    fn read(&mut self, dst: &mut [u8]) -> io::Result<usize> {
        if dst.is_empty() {
            return Ok(0);
        }
        if !self.ensure()? {
            return Ok(0);
        }
        let n = dst.len().min(self.available());
        dst[..n].copy_from_slice(&self.buf[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_window_is_idempotent() {
        let mut buf = LineBuffer::new(&b"blah blah yada yada"[..], 64);
        buf.fill().unwrap();

        let mut two = [0u8; 2];
        buf.read(&mut two).unwrap();
        assert_eq!(&two, b"bl");

        // consumed positions are gone
        assert!(matches!(buf.byte_at(1), Err(Error::OutOfRange { .. })));
        // the rest of the window is stable and searchable
        assert_eq!(buf.byte_at(2).unwrap(), b'a');
        assert_eq!(buf.find(b"blah", 2, 17).unwrap(), Some(5));
        assert_eq!(buf.find(b"blah", 2, 17).unwrap(), Some(5));
    }

    #[test]
    fn test_find_rejects_bad_ranges() {
        let mut buf = LineBuffer::new(&b"blah blah yada yada"[..], 64);
        buf.fill().unwrap();
        buf.skip(2).unwrap();

        assert!(matches!(
            buf.find(b"blah", 0, 17),
            Err(Error::OutOfRange { .. })
        ));
        assert!(matches!(
            buf.find(b"blah", 3, 2),
            Err(Error::OutOfRange { .. })
        ));
        assert!(matches!(
            buf.find(b"blah", 2, 100),
            Err(Error::OutOfRange { .. })
        ));
        assert!(matches!(
            buf.find_byte(b'x', 0, 5),
            Err(Error::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_fill_grows_and_compacts() {
        let data = b"0123456789abcdef0123456789abcdef".repeat(8);
        let mut buf = LineBuffer::new(&data[..], 64);
        // tiny initial capacity: repeated fills must grow transparently
        let mut total = 0;
        loop {
            let n = buf.fill().unwrap();
            if n == 0 {
                break;
            }
            total += n;
        }
        assert_eq!(total, data.len());
        assert_eq!(buf.window(), &data[..]);
    }

    #[test]
    fn test_fill_respects_max_capacity() {
        let data = [b'x'; 1024];
        let mut buf = LineBuffer::with_limits(&data[..], 64, Some(128), None);
        let mut err = None;
        for _ in 0..64 {
            match buf.fill() {
                Ok(0) => break,
                Ok(_) => continue,
                Err(e) => {
                    err = Some(e);
                    break;
                }
            }
        }
        assert!(matches!(err, Some(Error::Io(_))));
    }

    #[test]
    fn test_read_line() {
        let mut buf = LineBuffer::new(&b"one\r\ntwo\nthree"[..], 64);
        let mut line = Vec::new();
        assert_eq!(buf.read_line(&mut line).unwrap(), 5);
        assert_eq!(line, b"one\r\n");

        line.clear();
        assert_eq!(buf.read_line(&mut line).unwrap(), 4);
        assert_eq!(line, b"two\n");

        line.clear();
        assert_eq!(buf.read_line(&mut line).unwrap(), 5);
        assert_eq!(line, b"three");

        line.clear();
        assert_eq!(buf.read_line(&mut line).unwrap(), 0);
    }

    #[test]
    fn test_read_line_limit() {
        let mut buf =
            LineBuffer::with_limits(&b"a line that is too long\r\n"[..], 64, None, Some(10));
        let mut line = Vec::new();
        assert!(matches!(
            buf.read_line(&mut line),
            Err(Error::LineLimit { limit: 10 })
        ));

        // large enough: the exact line, terminator included
        let mut buf =
            LineBuffer::with_limits(&b"short\r\nrest"[..], 64, None, Some(10));
        let mut line = Vec::new();
        assert_eq!(buf.read_line(&mut line).unwrap(), 7);
        assert_eq!(line, b"short\r\n");
    }

    #[test]
    fn test_cr_without_lf_is_content() {
        let mut buf = LineBuffer::new(&b"a\rb\rc\nrest"[..], 64);
        let mut line = Vec::new();
        assert_eq!(buf.read_line(&mut line).unwrap(), 6);
        assert_eq!(line, b"a\rb\rc\n");
    }

    #[test]
    fn test_unread() {
        let mut buf = LineBuffer::new(&b"hello world"[..], 64);
        let mut line = Vec::new();
        buf.read_line(&mut line).unwrap();
        assert_eq!(line, b"hello world");

        buf.unread(b"world");
        let mut rest = Vec::new();
        buf.read_line(&mut rest).unwrap();
        assert_eq!(rest, b"world");
    }

    #[test]
    fn test_unread_larger_than_consumed() {
        let mut buf = LineBuffer::new(&b"xyz"[..], 64);
        buf.unread(b"abc");
        let mut all = Vec::new();
        buf.read_line(&mut all).unwrap();
        assert_eq!(all, b"abcxyz");
    }

    #[test]
    fn test_pooled_storage_returns_on_drop() {
        let pool = Arc::new(BufferPool::new());
        {
            let mut buf = LineBuffer::with_pool(&b"data"[..], 64, None, None, pool.clone());
            buf.fill().unwrap();
            assert_eq!(buf.window(), b"data");
            assert_eq!(pool.idle(), 0);
        }
        assert_eq!(pool.idle(), 1);
    }
}
