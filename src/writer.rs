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

//! Serializes [`WarcRecord`]s back onto a stream, per the wire framing
//! rules: status line, folded headers, a blank line, exactly
//! `Content-Length` payload bytes, and a trailing blank line. Inter-record
//! blank lines are tolerated on read (see [`crate::iterator`]) but never
//! emitted here.

use std::io::{self, Read, Write};

use crate::error::Result;
use crate::reader::CompressingStream;
use crate::record::WarcRecord;

/// Default chunk size for the pass-through write path.
pub const DEFAULT_CHUNK_SIZE: usize = 16384;

/// Wraps an output writer and serializes [`WarcRecord`]s onto it, choosing
/// between [`WarcRecord::write`]'s fast pass-through path and its
/// checksum/HTTP-reconstruct path.
pub struct RecordWriter<W> {
    out: W,
    checksum_data: bool,
    chunk_size: usize,
}

impl<W: Write> RecordWriter<W> {
    /// Wraps `out`, writing records without checksums (the fast path,
    /// unless a record has already had its HTTP headers parsed).
    pub fn new(out: W) -> Self {
        RecordWriter {
            out,
            checksum_data: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// As [`Self::new`], but recomputes `WARC-Block-Digest` (and
    /// `WARC-Payload-Digest` for HTTP-parsed records) on every write.
    pub fn with_checksums(out: W) -> Self {
        RecordWriter {
            out,
            checksum_data: true,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Overrides the pass-through path's chunk size (default
    /// [`DEFAULT_CHUNK_SIZE`]).
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    /// Serializes one record onto the wrapped writer.
    pub fn write_record<S: Read>(&mut self, record: &mut WarcRecord<'_, S>) -> Result<u64> {
        record.write(&mut self.out, self.checksum_data, self.chunk_size)
    }

    /// Unwraps the writer, returning the underlying sink.
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: CompressingStream> RecordWriter<W> {
    /// As [`Self::write_record`], but wraps the write in a
    /// `begin_member`/`end_member` pair so the record becomes its own
    /// independently-decodable compression member, and returns the
    /// compressed byte count the stream reports rather than the
    /// uncompressed one.
    pub fn write_record_member<S: Read>(&mut self, record: &mut WarcRecord<'_, S>) -> Result<u64> {
        record.write_member(&mut self.out, self.checksum_data, self.chunk_size)
    }
}

/// Writes the bare record framing (status line, headers, blank line) for a
/// header-only write, e.g. a caller that streams its own payload rather than
/// going through [`WarcRecord::write`]. Exposed for callers composing
/// lower-level writes; [`RecordWriter::write_record`] is the usual entry
/// point.
pub fn write_header_block<W: io::Write>(
    headers: &crate::header::HeaderMap,
    out: &mut W,
) -> io::Result<usize> {
    let mut written = headers.write(out)?;
    out.write_all(b"\r\n")?;
    written += 2;
    Ok(written)
}
