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

//! WARC record type tags and the bitset filter used by [`crate::iterator::ArchiveIterator`].

/// WARC record type, one value per `WARC-Type` token plus two filter-only
/// sentinels (`NoType`, `AnyType`).
///
/// The discriminants double as single-bit flags so a filter can be expressed
/// as a plain bitwise-or of the types to keep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    WarcInfo = 1 << 0,
    Response = 1 << 1,
    Resource = 1 << 2,
    Request = 1 << 3,
    Metadata = 1 << 4,
    Revisit = 1 << 5,
    Conversion = 1 << 6,
    Continuation = 1 << 7,
    Unknown = 1 << 8,
    /// Filter/constructor sentinel meaning "match any real type".
    AnyType = 0xffff,
    /// Filter/constructor sentinel meaning "preserve the record's existing type".
    NoType = 0,
}

impl RecordType {
    /// The nine real (non-sentinel) record types, in wire-token order.
    pub const REAL_TYPES: [RecordType; 9] = [
        RecordType::WarcInfo,
        RecordType::Response,
        RecordType::Resource,
        RecordType::Request,
        RecordType::Metadata,
        RecordType::Revisit,
        RecordType::Conversion,
        RecordType::Continuation,
        RecordType::Unknown,
    ];

    /// The `WARC-Type` wire token for this record type (lowercase).
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordType::WarcInfo => "warcinfo",
            RecordType::Response => "response",
            RecordType::Resource => "resource",
            RecordType::Request => "request",
            RecordType::Metadata => "metadata",
            RecordType::Revisit => "revisit",
            RecordType::Conversion => "conversion",
            RecordType::Continuation => "continuation",
            RecordType::Unknown | RecordType::AnyType | RecordType::NoType => "unknown",
        }
    }

    /// Parses a `WARC-Type` header value (case-insensitive). Unknown tokens
    /// map to [`RecordType::Unknown`] rather than failing, per spec: archival
    /// tooling should not choke on forward-compatible record types.
    pub fn from_token(token: &str) -> RecordType {
        match token.to_ascii_lowercase().as_str() {
            "warcinfo" => RecordType::WarcInfo,
            "response" => RecordType::Response,
            "resource" => RecordType::Resource,
            "request" => RecordType::Request,
            "metadata" => RecordType::Metadata,
            "revisit" => RecordType::Revisit,
            "conversion" => RecordType::Conversion,
            "continuation" => RecordType::Continuation,
            _ => RecordType::Unknown,
        }
    }

    /// Whether this type's bit is set in `bitmask`.
    pub fn matches_bitmask(&self, bitmask: u16) -> bool {
        (*self as u16) & bitmask != 0
    }
}

/// A bitset over [`RecordType`], used to select which record types an
/// [`crate::iterator::ArchiveIterator`] yields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordTypeFilter(u16);

impl RecordTypeFilter {
    /// Matches every real record type.
    pub const ANY: RecordTypeFilter = RecordTypeFilter(RecordType::AnyType as u16);

    /// Matches nothing.
    pub const NONE: RecordTypeFilter = RecordTypeFilter(RecordType::NoType as u16);

    /// Builds a filter matching exactly the given types.
    pub fn of(types: &[RecordType]) -> RecordTypeFilter {
        let mut bits = 0u16;
        for t in types {
            bits |= *t as u16;
        }
        RecordTypeFilter(bits)
    }

    /// Whether `record_type` is matched by this filter.
    pub fn matches(&self, record_type: RecordType) -> bool {
        record_type.matches_bitmask(self.0)
    }

    /// The raw bitmask.
    pub fn bits(&self) -> u16 {
        self.0
    }
}

impl Default for RecordTypeFilter {
    fn default() -> Self {
        RecordTypeFilter::ANY
    }
}
