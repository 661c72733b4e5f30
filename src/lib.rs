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

//! A streaming reader/writer for the Web ARChive (WARC) file format
//! (versions 1.0 and 1.1).
//!
//! The core pieces are an [`ArchiveIterator`] that extracts [`WarcRecord`]s
//! one at a time from an arbitrary byte [`Stream`] without materializing
//! them in memory, and a [`RecordWriter`] that serializes them back out,
//! either as a straight pass-through or re-materialized with recomputed
//! `Content-Length` and SHA-1/MD5/SHA-256 digests.
//!
//! ```no_run
//! use fastwarc::iterator::{ArchiveIterator, NextRecord};
//! use fastwarc::stream::FileStream;
//!
//! # fn example() -> fastwarc::Result<()> {
//! let file = std::fs::File::open("crawl.warc")?;
//! let mut it = ArchiveIterator::new(FileStream::new(file));
//! loop {
//!     match it.next()? {
//!         NextRecord::HasNext(mut record) => {
//!             println!("{:?} at {}", record.record_type, record.stream_pos);
//!         }
//!         NextRecord::SkipNext => continue,
//!         NextRecord::Eof => break,
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod digest;
pub mod error;
pub mod header;
pub mod iterator;
pub mod reader;
pub mod record;
pub mod record_type;
pub mod stream;
pub mod writer;

pub use error::{Error, Result};
pub use header::{HeaderEncoding, HeaderMap};
pub use iterator::{ArchiveIterator, ArchiveIteratorConfig, NextRecord};
pub use reader::{BufferedReader, CompressingStream, Stream};
pub use record::WarcRecord;
pub use record_type::{RecordType, RecordTypeFilter};
pub use writer::RecordWriter;
