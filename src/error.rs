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

//! Error types for WARC parsing, writing, and digest verification.

use thiserror::Error;

/// Errors that can occur while reading, writing, or verifying WARC records.
#[derive(Error, Debug)]
pub enum Error {
    /// A WARC header block was missing a required field or the field value
    /// could not be parsed (e.g. a non-numeric `Content-Length`).
    #[error("malformed record: {0}")]
    MalformedRecord(String),

    /// The record's `WARC-Block-Digest` or `WARC-Payload-Digest` named an
    /// algorithm this crate does not implement.
    #[error("unsupported digest algorithm: {0}")]
    UnsupportedDigestAlgorithm(String),

    /// Underlying I/O failure on the wrapped stream.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;
