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

//! The archive iterator: framing, filtering, skipping, and positional
//! reporting over a (possibly block-compressed) WARC stream.

use std::io;

use crate::error::{Error, Result};
use crate::header::{parse_header_block, trim_line_ending, HeaderEncoding, HeaderMap};
use crate::reader::{BufferedReader, Stream};
use crate::record::WarcRecord;
use crate::record_type::{RecordType, RecordTypeFilter};

/// Configuration for an [`ArchiveIterator`].
#[derive(Debug, Clone)]
pub struct ArchiveIteratorConfig {
    /// Whether to automatically invoke [`WarcRecord::parse_http`] on records
    /// whose `Content-Type` is `application/http`. Default `true`.
    pub parse_http: bool,
    /// Which record types to yield; others are skipped. Default
    /// [`RecordTypeFilter::ANY`].
    pub record_type_filter: RecordTypeFilter,
    /// When `true`, a missing or unparseable `Content-Length` raises
    /// [`Error::MalformedRecord`] instead of silently ending iteration.
    /// Default `false`, matching the archival-forensics tolerance for
    /// imperfect real-world captures.
    pub strict: bool,
}

impl Default for ArchiveIteratorConfig {
    fn default() -> Self {
        ArchiveIteratorConfig {
            parse_http: true,
            record_type_filter: RecordTypeFilter::ANY,
            strict: false,
        }
    }
}

/// Outcome of one [`ArchiveIterator::next`] call.
pub enum NextRecord<'a, S> {
    /// A record matching the configured filter, ready to be read.
    HasNext(WarcRecord<'a, S>),
    /// A record was parsed but did not match the type filter; its payload
    /// has already been skipped.
    SkipNext,
    /// The stream is exhausted, or what follows no longer looks like a WARC
    /// record (defensive termination, never an error).
    Eof,
}

/// Drives record-by-record extraction from a [`Stream`].
///
/// Only one [`WarcRecord`] is ever live at a time: it borrows the
/// iterator's internal [`BufferedReader`], so the borrow checker itself
/// prevents calling [`Self::next`] again while a previously yielded record
/// is still held, and guarantees the next call reclaims any unread payload
/// before reading further.
pub struct ArchiveIterator<S> {
    reader: BufferedReader<S>,
    config: ArchiveIteratorConfig,
    block_compressed: bool,
}

impl<S: Stream> ArchiveIterator<S> {
    /// Creates an iterator over `stream` with the default configuration.
    pub fn new(stream: S) -> Self {
        Self::with_config(stream, ArchiveIteratorConfig::default())
    }

    /// As [`Self::new`], with explicit configuration.
    pub fn with_config(stream: S, config: ArchiveIteratorConfig) -> Self {
        ArchiveIterator {
            reader: BufferedReader::new(stream),
            config,
            block_compressed: false,
        }
    }

    /// As [`Self::with_config`], but marks `stream` as block-compressed:
    /// each yielded record's `stream_pos` is then the offset on the
    /// underlying compressed substrate (meaningful only at block/member
    /// boundaries) rather than the logical decompressed offset.
    pub fn with_config_block_compressed(stream: S, config: ArchiveIteratorConfig) -> Self {
        ArchiveIterator {
            reader: BufferedReader::new(stream),
            config,
            block_compressed: true,
        }
    }

    /// The iterator's configuration.
    pub fn config(&self) -> &ArchiveIteratorConfig {
        &self.config
    }

    /// Closes the underlying stream.
    pub fn close(&mut self) -> io::Result<()> {
        self.reader.close()
    }

    /// Pulls the next record from the stream, per the per-iteration
    /// protocol in the design: reclaim the prior record's unread payload,
    /// skip blank lines, validate the version line, parse headers, apply
    /// the type filter, and (optionally) parse an embedded HTTP header
    /// block.
    pub fn next(&mut self) -> Result<NextRecord<'_, S>> {
        // Reclaim whatever the previous record left unread. On the very
        // first call there is no limit set yet, so this is a no-op.
        self.reader.consume(None)?;
        self.reader.reset_limit();

        let (stream_pos, version_line) = loop {
            let offset_before = if self.block_compressed {
                self.reader.get_mut().tell()?
            } else {
                self.reader.tell()
            };
            let line = self.reader.read_line()?;
            if line.is_empty() {
                return Ok(NextRecord::Eof);
            }
            let trimmed = trim_line_ending(&line);
            if trimmed.is_empty() {
                // Blank line between records: tolerated, keep scanning.
                continue;
            }
            break (offset_before, trimmed.to_vec());
        };

        let version = String::from_utf8_lossy(&version_line);
        if version.as_ref() != "WARC/1.0" && version.as_ref() != "WARC/1.1" {
            // Not a WARC version line: defensive resync is not attempted,
            // treat this position as the end of the stream.
            return Ok(NextRecord::Eof);
        }

        let mut warc_headers = HeaderMap::new(HeaderEncoding::Utf8);
        warc_headers.set_status_line(&version_line);
        parse_header_block(&mut self.reader, &mut warc_headers, false)?;

        let mut content_length_value: Option<String> = None;
        let mut record_type = RecordType::Unknown;
        let mut is_http = false;
        for (name, value) in warc_headers.items() {
            if name.eq_ignore_ascii_case("Content-Length") {
                content_length_value = Some(value);
            } else if name.eq_ignore_ascii_case("WARC-Type") {
                record_type = RecordType::from_token(&value);
            } else if name.eq_ignore_ascii_case("Content-Type")
                && value.to_ascii_lowercase().starts_with("application/http")
            {
                is_http = true;
            }
        }

        let parsed_content_length = content_length_value
            .as_deref()
            .map(str::trim)
            .and_then(|raw| raw.parse::<u64>().ok());
        let content_length = match parsed_content_length {
            Some(n) => n,
            None if self.config.strict => {
                return Err(Error::MalformedRecord(format!(
                    "missing or non-numeric Content-Length: {content_length_value:?}"
                )));
            }
            // Real-world archives sometimes have a corrupt or missing
            // Content-Length; per design, tolerate it by ending iteration
            // rather than raising, unless the caller opted into strict mode.
            None => return Ok(NextRecord::Eof),
        };

        if !self.config.record_type_filter.matches(record_type) {
            self.reader.reset_limit();
            self.reader.consume(Some(content_length))?;
            return Ok(NextRecord::SkipNext);
        }

        self.reader.set_limit(content_length);
        let mut record = WarcRecord::from_stream(
            warc_headers,
            &mut self.reader,
            content_length,
            record_type,
            is_http,
            stream_pos,
        );

        if self.config.parse_http && is_http {
            record.parse_http()?;
        }

        Ok(NextRecord::HasNext(record))
    }
}
