//! Logical-line counting read view, for diagnostics.

use std::io::{self, Read};

use memchr::memchr_iter;

use crate::error::Error;

/// Counts the CRLF- or LF-terminated lines crossed by reads without
/// altering the bytes delivered.
pub struct LineTrackingReader<R> {
    inner: R,
    line: u64,
    closed: bool,
}

impl<R: Read> LineTrackingReader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            line: 1,
            closed: false,
        }
    }

    /// 1-based number of the line the next byte belongs to.
    pub fn line(&self) -> u64 {
        self.line
    }

    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for LineTrackingReader<R> {
    fn read(&mut self, dst: &mut [u8]) -> io::Result<usize> {
        if self.closed {
            return Err(Error::UseAfterClose.into());
        }
        let n = self.inner.read(dst)?;
        self.line += memchr_iter(b'\n', &dst[..n]).count() as u64;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_lines() {
        let mut r = LineTrackingReader::new(&b"one\r\ntwo\nthree"[..]);
        assert_eq!(r.line(), 1);
        let mut out = Vec::new();
        r.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"one\r\ntwo\nthree");
        assert_eq!(r.line(), 3);
    }

    #[test]
    fn test_counts_across_single_byte_reads() {
        let mut r = LineTrackingReader::new(&b"a\nb\n"[..]);
        let mut byte = [0u8; 1];
        for _ in 0..4 {
            r.read(&mut byte).unwrap();
        }
        assert_eq!(r.line(), 3);
    }

    #[test]
    fn test_use_after_close() {
        let mut r = LineTrackingReader::new(&b"abc"[..]);
        r.close();
        let mut byte = [0u8; 1];
        assert!(r.read(&mut byte).is_err());
    }
}
