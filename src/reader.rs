// Copyright 2025 Janek Bevendorff
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The `Stream` abstraction and the limitable, line-reading `BufferedReader`
//! built on top of it.

use std::io::{self, BufRead, BufReader, Read, Write};

/// A byte-stream source/sink consumed by the archive reader and writer.
///
/// This is the "external collaborator" interface from the design: the core
/// does not care whether the bytes come from a file, an in-memory buffer, or
/// a block-compressed substrate, only that it can `read`/`write` and report
/// its own position.
pub trait Stream: Read + Write {
    /// Number of bytes produced (if a source) or consumed (if a sink) so far.
    fn tell(&mut self) -> io::Result<u64>;

    /// Releases any underlying resources. Default is a no-op.
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// A [`Stream`] whose records each form an independently-decodable
/// compression member (e.g. one gzip member per WARC record).
///
/// Implementing this signals to [`crate::iterator::ArchiveIterator`] that
/// `tell()` is meaningful only at member boundaries, matching real-world
/// `.warc.gz` tooling that indexes by compressed-member offset.
pub trait CompressingStream: Stream {
    /// Starts a new compression member and returns the sink's byte offset at
    /// that point (the member's start offset, for indexing).
    fn begin_member(&mut self) -> io::Result<u64>;

    /// Finishes the current compression member, flushing it to the sink, and
    /// returns the number of bytes the member occupied in the sink.
    fn end_member(&mut self) -> io::Result<u64>;
}

/// A buffered reader over a [`Stream`] that layers a content-length limit (so
/// the framing of one record's payload can never leak into the next) and
/// line reading on top of raw byte reads.
///
/// Bytes advanced via [`BufferedReader::consume`] are not copied out to the
/// caller, but they still count toward [`BufferedReader::tell`]: callers use
/// `tell()` to recover the logical stream offset, and a skipped payload is
/// still part of that offset.
pub struct BufferedReader<S> {
    inner: BufReader<S>,
    limit: Option<u64>,
    pos: u64,
}

impl<S: Read> BufferedReader<S> {
    /// Wraps `stream` with an unbounded limit.
    pub fn new(stream: S) -> Self {
        BufferedReader {
            inner: BufReader::new(stream),
            limit: None,
            pos: 0,
        }
    }

    /// Reads up to `n` bytes, or fewer at the limit/EOF. Empty once the
    /// limit or the underlying stream is exhausted.
    pub fn read(&mut self, n: usize) -> io::Result<Vec<u8>> {
        let cap = match self.limit {
            Some(limit) => n.min(limit as usize),
            None => n,
        };
        let mut buf = vec![0u8; cap];
        let mut total = 0;
        while total < cap {
            let read = self.inner.read(&mut buf[total..])?;
            if read == 0 {
                break;
            }
            total += read;
        }
        buf.truncate(total);
        self.advance(total as u64);
        Ok(buf)
    }

    /// Reads a single `\n`-terminated line, terminator included. Returns an
    /// empty vector on EOF or once the limit is reached.
    pub fn read_line(&mut self) -> io::Result<Vec<u8>> {
        let mut out = Vec::new();
        loop {
            if self.limit == Some(0) {
                break;
            }
            let buf = self.inner.fill_buf()?;
            if buf.is_empty() {
                break;
            }
            let avail = match self.limit {
                Some(limit) => (buf.len() as u64).min(limit) as usize,
                None => buf.len(),
            };
            if avail == 0 {
                break;
            }
            let window = &buf[..avail];
            match window.iter().position(|&b| b == b'\n') {
                Some(idx) => {
                    out.extend_from_slice(&window[..=idx]);
                    let consumed = idx + 1;
                    self.inner.consume(consumed);
                    self.advance(consumed as u64);
                    break;
                }
                None => {
                    let full_buf_len = buf.len();
                    out.extend_from_slice(window);
                    self.inner.consume(avail);
                    self.advance(avail as u64);
                    if avail < full_buf_len {
                        // Hit the limit mid-buffer without a newline.
                        break;
                    }
                }
            }
        }
        Ok(out)
    }

    /// Advances past up to `n` bytes (or up to the current limit if `n` is
    /// `None`) without returning them. Returns the number of bytes skipped.
    pub fn consume(&mut self, n: Option<u64>) -> io::Result<u64> {
        let target = match (n, self.limit) {
            (Some(n), Some(limit)) => n.min(limit),
            (Some(n), None) => n,
            (None, Some(limit)) => limit,
            (None, None) => return Ok(0),
        };
        let mut skipped = 0u64;
        while skipped < target {
            let buf = self.inner.fill_buf()?;
            if buf.is_empty() {
                break;
            }
            let want = ((target - skipped) as usize).min(buf.len());
            self.inner.consume(want);
            skipped += want as u64;
        }
        self.advance(skipped);
        Ok(skipped)
    }

    /// Sets a byte limit that `read`/`read_line` respect as if it were EOF.
    pub fn set_limit(&mut self, n: u64) {
        self.limit = Some(n);
    }

    /// Removes any limit previously set with [`Self::set_limit`].
    pub fn reset_limit(&mut self) {
        self.limit = None;
    }

    /// The currently remaining limit, if any.
    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    /// Total bytes advanced through this reader so far (read, line-read, or
    /// consumed), i.e. the logical offset into the underlying stream.
    pub fn tell(&self) -> u64 {
        self.pos
    }

    /// Borrows the wrapped stream.
    pub fn get_ref(&self) -> &S {
        self.inner.get_ref()
    }

    /// Mutably borrows the wrapped stream.
    pub fn get_mut(&mut self) -> &mut S {
        self.inner.get_mut()
    }

    /// Unwraps the reader, discarding any buffered-but-unconsumed bytes.
    pub fn into_inner(self) -> S {
        self.inner.into_inner()
    }

    fn advance(&mut self, n: u64) {
        self.pos += n;
        if let Some(limit) = self.limit.as_mut() {
            *limit = limit.saturating_sub(n);
        }
    }
}

impl<S: Stream> BufferedReader<S> {
    /// Closes the underlying stream.
    pub fn close(&mut self) -> io::Result<()> {
        self.inner.get_mut().close()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn read_respects_limit() {
        let mut reader = BufferedReader::new(Cursor::new(b"hello world".to_vec()));
        reader.set_limit(5);
        assert_eq!(reader.read(100).unwrap(), b"hello");
        assert_eq!(reader.read(100).unwrap(), b"");
        reader.reset_limit();
        assert_eq!(reader.read(100).unwrap(), b" world");
    }

    #[test]
    fn read_line_includes_terminator_and_stops_at_limit() {
        let mut reader = BufferedReader::new(Cursor::new(b"foo\nbar\nbaz".to_vec()));
        reader.set_limit(5);
        assert_eq!(reader.read_line().unwrap(), b"foo\n");
        assert_eq!(reader.read_line().unwrap(), b"b");
        assert_eq!(reader.read_line().unwrap(), b"");
    }

    #[test]
    fn read_line_returns_empty_on_eof() {
        let mut reader = BufferedReader::new(Cursor::new(Vec::new()));
        assert_eq!(reader.read_line().unwrap(), b"");
    }

    #[test]
    fn consume_skips_without_delivering_and_advances_tell() {
        let mut reader = BufferedReader::new(Cursor::new(b"0123456789".to_vec()));
        reader.set_limit(6);
        let skipped = reader.consume(Some(4)).unwrap();
        assert_eq!(skipped, 4);
        assert_eq!(reader.tell(), 4);
        assert_eq!(reader.read(100).unwrap(), b"45");
        assert_eq!(reader.tell(), 6);
    }

    #[test]
    fn consume_with_no_arg_consumes_to_limit() {
        let mut reader = BufferedReader::new(Cursor::new(b"0123456789".to_vec()));
        reader.set_limit(7);
        assert_eq!(reader.consume(None).unwrap(), 7);
        reader.reset_limit();
        assert_eq!(reader.read(100).unwrap(), b"789");
    }
}
