//! Fixed-length read view.

use std::io::{self, Read};

use crate::error::Error;

/// Presents at most `limit` bytes of the inner reader, then end of stream.
/// Reading after `close` is an explicit error, never a silent EOF.
pub struct LimitedReader<R> {
    inner: R,
    remaining: u64,
    closed: bool,
}

impl<R: Read> LimitedReader<R> {
    pub fn new(inner: R, limit: u64) -> Self {
        Self {
            inner,
            remaining: limit,
            closed: false,
        }
    }

    /// Bytes still deliverable before the limit.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }

    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> Read for LimitedReader<R> {
    fn read(&mut self, dst: &mut [u8]) -> io::Result<usize> {
        if self.closed {
            return Err(Error::UseAfterClose.into());
        }
        if self.remaining == 0 || dst.is_empty() {
            return Ok(0);
        }
        let cap = dst.len().min(self.remaining.min(usize::MAX as u64) as usize);
        let n = self.inner.read(&mut dst[..cap])?;
        self.remaining -= n as u64;
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stops_at_limit() {
        let mut r = LimitedReader::new(&b"0123456789"[..], 4);
        let mut out = Vec::new();
        r.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"0123");
        assert_eq!(r.remaining(), 0);

        // further reads keep returning end of stream
        let mut byte = [0u8; 1];
        assert_eq!(r.read(&mut byte).unwrap(), 0);
    }

    #[test]
    fn test_limit_beyond_source() {
        let mut r = LimitedReader::new(&b"abc"[..], 10);
        let mut out = Vec::new();
        r.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"abc");
        assert_eq!(r.remaining(), 7);
    }

    #[test]
    fn test_exact_fill_fails_past_limit() {
        let mut r = LimitedReader::new(&b"0123456789"[..], 4);
        let mut out = [0u8; 8];
        // read_exact needs more than the limit allows: explicit error
        assert!(r.read_exact(&mut out).is_err());
    }

    #[test]
    fn test_use_after_close() {
        let mut r = LimitedReader::new(&b"abc"[..], 3);
        r.close();
        let mut byte = [0u8; 1];
        let err = r.read(&mut byte).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
