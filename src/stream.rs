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

//! Concrete [`Stream`]/[`CompressingStream`] implementations: a file, an
//! in-memory buffer, and block-compressed (gzip, LZ4) substrates where each
//! WARC record is its own independently-decodable compression member.

use std::cell::Cell;
use std::fs::File;
use std::io::{self, BufReader, Cursor, Read, Seek, SeekFrom, Write};
use std::rc::Rc;

use flate2::bufread::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use lz4_flex::frame::FrameDecoder;

use crate::reader::{CompressingStream, Stream};

/// An in-memory, seekable stream backed by a `Vec<u8>`.
pub struct MemoryStream {
    cursor: Cursor<Vec<u8>>,
}

impl MemoryStream {
    /// Creates an empty stream.
    pub fn new() -> Self {
        MemoryStream {
            cursor: Cursor::new(Vec::new()),
        }
    }

    /// Wraps existing bytes for reading.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        MemoryStream {
            cursor: Cursor::new(bytes),
        }
    }

    /// Consumes the stream, returning its contents.
    pub fn into_bytes(self) -> Vec<u8> {
        self.cursor.into_inner()
    }

    /// Seeks to an absolute position.
    pub fn seek_to(&mut self, pos: u64) -> io::Result<u64> {
        self.cursor.seek(SeekFrom::Start(pos))
    }
}

impl Default for MemoryStream {
    fn default() -> Self {
        Self::new()
    }
}

impl Read for MemoryStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.cursor.read(buf)
    }
}

impl Write for MemoryStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.cursor.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.cursor.flush()
    }
}

impl Stream for MemoryStream {
    fn tell(&mut self) -> io::Result<u64> {
        self.cursor.stream_position()
    }
}

/// A plain file, read or written without compression.
pub struct FileStream {
    file: File,
}

impl FileStream {
    /// Wraps an already-open file.
    pub fn new(file: File) -> Self {
        FileStream { file }
    }
}

impl Read for FileStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for FileStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Stream for FileStream {
    fn tell(&mut self) -> io::Result<u64> {
        self.file.stream_position()
    }

    fn close(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

/// A gzip-compressed stream where each `begin_member`/`end_member` pair
/// produces one independent gzip member, matching the `.warc.gz` convention
/// used by web-archiving tools so any record can be decompressed in
/// isolation.
///
/// Only the write direction is modeled here: a decoder has no notion of
/// "current member" to expose through [`CompressingStream`]'s
/// `begin_member`/`end_member`. For reading a `.warc.gz`-style stream, see
/// [`GzipReadStream`].
pub struct GzipStream<S: Write> {
    sink: Option<S>,
    member: Option<GzEncoder<CountingWriter<S>>>,
    bytes_written: u64,
}

impl<S: Write> GzipStream<S> {
    /// Wraps `sink` for writing independent gzip members.
    pub fn new(sink: S) -> Self {
        GzipStream {
            sink: Some(sink),
            member: None,
            bytes_written: 0,
        }
    }
}

impl<S: Write> Write for GzipStream<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.member.as_mut() {
            Some(member) => member.write(buf),
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "write outside of begin_member()/end_member()",
            )),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.member.as_mut() {
            Some(member) => member.flush(),
            None => Ok(()),
        }
    }
}

impl<S: Write> Read for GzipStream<S> {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "GzipStream is write-only; decode with flate2::bufread::MultiGzDecoder instead",
        ))
    }
}

impl<S: Write> Stream for GzipStream<S> {
    fn tell(&mut self) -> io::Result<u64> {
        Ok(self.bytes_written)
    }

    fn close(&mut self) -> io::Result<()> {
        if let Some(sink) = self.sink.as_mut() {
            sink.flush()?;
        }
        Ok(())
    }
}

impl<S: Write> CompressingStream for GzipStream<S> {
    fn begin_member(&mut self) -> io::Result<u64> {
        let sink = self
            .sink
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "member already open"))?;
        self.member = Some(GzEncoder::new(
            CountingWriter::new(sink),
            Compression::best(),
        ));
        Ok(self.bytes_written)
    }

    fn end_member(&mut self) -> io::Result<u64> {
        let member = self
            .member
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "no open member"))?;
        let counting = member.finish()?;
        let written = counting.count;
        self.bytes_written += written;
        self.sink = Some(counting.inner);
        Ok(written)
    }
}

/// A read-only [`Stream`] over a gzip/`.warc.gz`-style substrate: each
/// `begin_member`/`end_member` pair [`GzipStream`] wrote is just another
/// gzip member, and [`flate2::bufread::MultiGzDecoder`] already concatenates
/// the decompressed output of however many members the underlying reader
/// holds, so no member bookkeeping is needed on the read side.
///
/// `tell()` reports the number of *compressed* bytes pulled from the
/// underlying reader so far, via a shared counter threaded through the
/// decoder's internal buffering; per the design, this is meaningful only at
/// member boundaries, not mid-member.
pub struct GzipReadStream<R: Read> {
    decoder: MultiGzDecoder<BufReader<CountingReader<R>>>,
    compressed_read: Rc<Cell<u64>>,
}

impl<R: Read> GzipReadStream<R> {
    /// Wraps `inner` for reading one or more concatenated gzip members.
    pub fn new(inner: R) -> Self {
        let compressed_read = Rc::new(Cell::new(0));
        let counting = CountingReader::new(inner, compressed_read.clone());
        GzipReadStream {
            decoder: MultiGzDecoder::new(BufReader::new(counting)),
            compressed_read,
        }
    }
}

impl<R: Read> Read for GzipReadStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.decoder.read(buf)
    }
}

impl<R: Read> Write for GzipReadStream<R> {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "GzipReadStream is read-only; write with GzipStream instead",
        ))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<R: Read> Stream for GzipReadStream<R> {
    fn tell(&mut self) -> io::Result<u64> {
        Ok(self.compressed_read.get())
    }
}

/// An LZ4-framed stream where each `begin_member`/`end_member` pair produces
/// one independent LZ4 frame, analogous to [`GzipStream`].
pub struct Lz4Stream<S: Write> {
    sink: Option<S>,
    member: Option<lz4_flex::frame::FrameEncoder<CountingWriter<S>>>,
    bytes_written: u64,
}

impl<S: Write> Lz4Stream<S> {
    /// Wraps `sink` for writing independent LZ4 frames.
    pub fn new(sink: S) -> Self {
        Lz4Stream {
            sink: Some(sink),
            member: None,
            bytes_written: 0,
        }
    }
}

impl<S: Write> Write for Lz4Stream<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.member.as_mut() {
            Some(member) => member.write(buf),
            None => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "write outside of begin_member()/end_member()",
            )),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.member.as_mut() {
            Some(member) => member.flush(),
            None => Ok(()),
        }
    }
}

impl<S: Write> Read for Lz4Stream<S> {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "Lz4Stream is write-only; decode with lz4_flex::frame::FrameDecoder instead",
        ))
    }
}

impl<S: Write> Stream for Lz4Stream<S> {
    fn tell(&mut self) -> io::Result<u64> {
        Ok(self.bytes_written)
    }

    fn close(&mut self) -> io::Result<()> {
        if let Some(sink) = self.sink.as_mut() {
            sink.flush()?;
        }
        Ok(())
    }
}

impl<S: Write> CompressingStream for Lz4Stream<S> {
    fn begin_member(&mut self) -> io::Result<u64> {
        let sink = self
            .sink
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "member already open"))?;
        self.member = Some(lz4_flex::frame::FrameEncoder::new(CountingWriter::new(sink)));
        Ok(self.bytes_written)
    }

    fn end_member(&mut self) -> io::Result<u64> {
        let member = self
            .member
            .take()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "no open member"))?;
        let counting = member
            .finish()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
        let written = counting.count;
        self.bytes_written += written;
        self.sink = Some(counting.inner);
        Ok(written)
    }
}

/// A read-only [`Stream`] over an LZ4-framed substrate written by
/// [`Lz4Stream`], analogous to [`GzipReadStream`]: the LZ4 frame format
/// allows concatenating independent frames in one byte stream, and
/// [`FrameDecoder`] decodes straight through that concatenation, so no
/// per-member bookkeeping is needed on the read side either.
pub struct Lz4ReadStream<R: Read> {
    decoder: FrameDecoder<CountingReader<R>>,
    compressed_read: Rc<Cell<u64>>,
}

impl<R: Read> Lz4ReadStream<R> {
    /// Wraps `inner` for reading one or more concatenated LZ4 frames.
    pub fn new(inner: R) -> Self {
        let compressed_read = Rc::new(Cell::new(0));
        let counting = CountingReader::new(inner, compressed_read.clone());
        Lz4ReadStream {
            decoder: FrameDecoder::new(counting),
            compressed_read,
        }
    }
}

impl<R: Read> Read for Lz4ReadStream<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.decoder.read(buf)
    }
}

impl<R: Read> Write for Lz4ReadStream<R> {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(
            io::ErrorKind::Unsupported,
            "Lz4ReadStream is read-only; write with Lz4Stream instead",
        ))
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<R: Read> Stream for Lz4ReadStream<R> {
    fn tell(&mut self) -> io::Result<u64> {
        Ok(self.compressed_read.get())
    }
}

/// A `Write` wrapper that tracks how many bytes have passed through it, used
/// to report the size of a just-closed compression member.
struct CountingWriter<W: Write> {
    inner: W,
    count: u64,
}

impl<W: Write> CountingWriter<W> {
    fn new(inner: W) -> Self {
        CountingWriter { inner, count: 0 }
    }
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.count += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// A `Read` wrapper that tracks how many bytes have been pulled from it, via
/// a shared counter so a decoder that owns this reader by value still lets
/// its wrapping [`Stream`] report `tell()`.
struct CountingReader<R> {
    inner: R,
    count: Rc<Cell<u64>>,
}

impl<R> CountingReader<R> {
    fn new(inner: R, count: Rc<Cell<u64>>) -> Self {
        CountingReader { inner, count }
    }
}

impl<R: Read> Read for CountingReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.count.set(self.count.get() + n as u64);
        Ok(n)
    }
}
