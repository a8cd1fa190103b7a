//! Streaming base64 decoding of body content.

use std::io::{self, Read};
use std::sync::Arc;

use base64::{engine::general_purpose, Engine as _};

use crate::error::EventKind;
use crate::monitor::DecodeMonitor;

/// Decodes a base64 body on the fly, one 4-character quantum at a time.
/// Line breaks and other whitespace are transparent; any other byte
/// outside the alphabet is reported to the monitor and skipped.
pub struct Base64Reader<R> {
    inner: R,
    monitor: Arc<dyn DecodeMonitor>,
    quantum: [u8; 4],
    qlen: usize,
    out: Vec<u8>,
    out_pos: usize,
    eof: bool,
    padded: bool,
}

fn is_base64_char(c: u8) -> bool {
    c.is_ascii_alphanumeric() || c == b'+' || c == b'/'
}

impl<R: Read> Base64Reader<R> {
    pub fn new(inner: R, monitor: Arc<dyn DecodeMonitor>) -> Self {
        Self {
            inner,
            monitor,
            quantum: [0; 4],
            qlen: 0,
            out: Vec::new(),
            out_pos: 0,
            eof: false,
            padded: false,
        }
    }

    fn decode_quantum(&mut self) -> io::Result<()> {
        let significant = self.quantum[..self.qlen]
            .iter()
            .take_while(|c| **c != b'=')
            .count();
        if significant < self.qlen {
            self.padded = true;
        }
        let quantum = &self.quantum[..significant];
        if significant == 1 {
            // a single leftover character cannot encode anything
            self.monitor
                .warn(EventKind::InvalidBase64, "truncated base64 quantum")
                .map_err(io::Error::from)?;
        } else {
            match general_purpose::STANDARD_NO_PAD.decode(quantum) {
                Ok(bytes) => self.out.extend_from_slice(&bytes),
                Err(_) => {
                    self.monitor
                        .warn(EventKind::InvalidBase64, "undecodable base64 quantum")
                        .map_err(io::Error::from)?;
                }
            }
        }
        self.qlen = 0;
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
                if self.qlen > 0 {
                    self.decode_quantum()?;
                }
                return Ok(());
            }
            for i in 0..n {
                let c = chunk[i];
                if is_base64_char(c) || (c == b'=' && self.qlen > 0) {
                    if self.padded {
                        // content after the terminating padding is noise
                        continue;
                    }
                    self.quantum[self.qlen] = c;
                    self.qlen += 1;
                    if self.qlen == 4 {
                        self.decode_quantum()?;
                    }
                } else if !c.is_ascii_whitespace() {
                    self.monitor
                        .warn(EventKind::InvalidBase64, "byte outside base64 alphabet")
                        .map_err(io::Error::from)?;
                }
            }
        }
        Ok(())
    }
}

impl<R: Read> Read for Base64Reader<R> {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::monitor::{Lenient, Strict};

    fn decode(input: &[u8]) -> Vec<u8> {
        let mut r = Base64Reader::new(input, Arc::new(Lenient));
        let mut out = Vec::new();
        r.read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn test_simple() {
        assert_eq!(decode(b"aGVsbG8gd29ybGQ="), b"hello world");
    }

    #[test]
    fn test_line_breaks_ignored() {
        assert_eq!(decode(b"aGVs\r\nbG8g\r\nd29y\r\nbGQ=\r\n"), b"hello world");
    }

    #[test]
    fn test_unpadded_tail() {
        assert_eq!(decode(b"aGVsbG8"), b"hello");
    }

    #[test]
    fn test_invalid_bytes_skipped_leniently() {
        assert_eq!(decode(b"aGV%sbG8gd29ybGQ="), b"hello world");
    }

    #[test]
    fn test_invalid_byte_fatal_in_strict() {
        let mut r = Base64Reader::new(&b"aGV%sbG8="[..], Arc::new(Strict));
        let mut out = Vec::new();
        assert!(r.read_to_end(&mut out).is_err());
    }

    #[test]
    fn test_small_destination_reads() {
        let mut r = Base64Reader::new(&b"aGVsbG8gd29ybGQ="[..], Arc::new(Lenient));
        let mut out = Vec::new();
        let mut byte = [0u8; 1];
        loop {
            match r.read(&mut byte).unwrap() {
                0 => break,
                _ => out.push(byte[0]),
            }
        }
        assert_eq!(out, b"hello world");
    }
}
