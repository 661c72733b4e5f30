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

//! Header maps (WARC and HTTP) and the header-block parser that fills them.

use std::collections::HashMap;
use std::io::{self, Read};

use encoding::all::{ISO_8859_15, WINDOWS_1252};
use encoding::{DecoderTrap, Encoding};
use parking_lot::RwLock;

use crate::reader::BufferedReader;

/// Charset used to decode a [`HeaderMap`]'s string view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderEncoding {
    /// UTF-8, used for WARC headers.
    Utf8,
    /// ISO-8859-15, the default for HTTP headers per RFC 7230's historical
    /// Latin-1 fallback (close to, but not identical to, CP1252).
    Iso8859_15,
    /// Windows-1252, offered for callers that need byte-for-byte parity with
    /// tools that decode HTTP headers as CP1252 rather than ISO-8859-15.
    Windows1252,
}

impl HeaderEncoding {
    fn decode(&self, bytes: &[u8]) -> String {
        match self {
            HeaderEncoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            HeaderEncoding::Iso8859_15 => ISO_8859_15
                .decode(bytes, DecoderTrap::Replace)
                .unwrap_or_default(),
            HeaderEncoding::Windows1252 => WINDOWS_1252
                .decode(bytes, DecoderTrap::Replace)
                .unwrap_or_default(),
        }
    }
}

fn trim_ascii(bytes: &[u8]) -> &[u8] {
    let start = bytes
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(bytes.len());
    let end = bytes
        .iter()
        .rposition(|b| !b.is_ascii_whitespace())
        .map_or(start, |p| p + 1);
    &bytes[start..end]
}

pub(crate) fn trim_line_ending(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

/// An ordered, case-insensitive multimap of header name/value byte-string
/// pairs, with an optional status line and a lazily-decoded string view.
///
/// Duplicates are permitted: [`HeaderMap::set`] replaces the first match and
/// drops the rest, while [`HeaderMap::append`] always adds a new pair.
/// Iteration order always matches insertion order.
#[derive(Debug)]
pub struct HeaderMap {
    encoding: HeaderEncoding,
    status_line: Vec<u8>,
    headers: Vec<(Vec<u8>, Vec<u8>)>,
    dict_cache: RwLock<Option<HashMap<String, String>>>,
}

impl Clone for HeaderMap {
    fn clone(&self) -> Self {
        HeaderMap {
            encoding: self.encoding,
            status_line: self.status_line.clone(),
            headers: self.headers.clone(),
            // The cache is not carried over: cloning is rare (record
            // freezing) and recomputing lazily is simpler than cloning the
            // lock's contents under contention.
            dict_cache: RwLock::new(None),
        }
    }
}

impl HeaderMap {
    /// Creates an empty header map decoding its string view as `encoding`.
    pub fn new(encoding: HeaderEncoding) -> Self {
        HeaderMap {
            encoding,
            status_line: Vec::new(),
            headers: Vec::new(),
            dict_cache: RwLock::new(None),
        }
    }

    /// The configured string-decoding charset.
    pub fn encoding(&self) -> HeaderEncoding {
        self.encoding
    }

    /// The raw status line bytes (no trailing `\r\n`).
    pub fn status_line_bytes(&self) -> &[u8] {
        &self.status_line
    }

    /// The status line, decoded under this map's charset.
    pub fn status_line(&self) -> String {
        self.encoding.decode(&self.status_line)
    }

    /// Sets the status line.
    pub fn set_status_line(&mut self, status_line: impl AsRef<[u8]>) {
        self.status_line = status_line.as_ref().to_vec();
        self.invalidate();
    }

    /// The HTTP status code, or `None` if this isn't an HTTP status line.
    pub fn status_code(&self) -> Option<u16> {
        if !self.status_line.starts_with(b"HTTP/") {
            return None;
        }
        let mut parts = self.status_line.splitn(3, |&b| b == b' ');
        parts.next()?;
        std::str::from_utf8(parts.next()?).ok()?.parse().ok()
    }

    /// Looks up a header by case-insensitive name. Duplicate occurrences are
    /// joined with `,`, mirroring HTTP's comma-folding rule.
    pub fn get(&self, name: &str) -> Option<String> {
        self.get_bytes(name.as_bytes())
            .map(|bytes| self.encoding.decode(&bytes))
    }

    /// As [`Self::get`], but returns the raw undecoded bytes.
    pub fn get_bytes(&self, name: &[u8]) -> Option<Vec<u8>> {
        let mut result: Option<Vec<u8>> = None;
        for (k, v) in &self.headers {
            if !k.eq_ignore_ascii_case(name) {
                continue;
            }
            match &mut result {
                Some(acc) => {
                    acc.push(b',');
                    acc.extend_from_slice(v);
                }
                None => result = Some(v.clone()),
            }
        }
        result
    }

    /// Whether a header with this (case-insensitive) name exists.
    pub fn contains_key(&self, name: &str) -> bool {
        let name = name.as_bytes();
        self.headers.iter().any(|(k, _)| k.eq_ignore_ascii_case(name))
    }

    /// Sets a header, replacing the first existing occurrence (if any) and
    /// dropping any further duplicates. O(n) in the number of headers.
    pub fn set(&mut self, name: impl AsRef<str>, value: impl AsRef<str>) {
        self.set_bytes(name.as_ref().as_bytes(), value.as_ref().as_bytes());
    }

    /// Byte-string form of [`Self::set`].
    pub fn set_bytes(&mut self, name: &[u8], value: &[u8]) {
        let mut found = false;
        self.headers.retain_mut(|(k, v)| {
            if !k.eq_ignore_ascii_case(name) {
                true
            } else if !found {
                *v = trim_ascii(value).to_vec();
                found = true;
                true
            } else {
                false
            }
        });
        if !found {
            self.headers
                .push((trim_ascii(name).to_vec(), trim_ascii(value).to_vec()));
        }
        self.invalidate();
    }

    /// Appends a new header without checking for an existing one of the same
    /// name.
    pub fn append(&mut self, name: impl AsRef<str>, value: impl AsRef<str>) {
        self.append_bytes(name.as_ref().as_bytes(), value.as_ref().as_bytes());
    }

    /// Byte-string form of [`Self::append`].
    pub fn append_bytes(&mut self, name: &[u8], value: &[u8]) {
        self.headers
            .push((trim_ascii(name).to_vec(), trim_ascii(value).to_vec()));
        self.invalidate();
    }

    /// Folds a continuation line into the previous header's value. If there
    /// is no previous header, a synthetic pair with an empty name is
    /// created (preserves a leading continuation rather than discarding it).
    pub fn add_continuation(&mut self, value: &[u8]) {
        let value = trim_ascii(value);
        match self.headers.last_mut() {
            Some((_, v)) => {
                v.push(b' ');
                v.extend_from_slice(value);
            }
            None => self.headers.push((Vec::new(), value.to_vec())),
        }
        self.invalidate();
    }

    /// Iterator over decoded `(name, value)` pairs, insertion order, with
    /// duplicates preserved.
    pub fn items(&self) -> impl Iterator<Item = (String, String)> + '_ {
        self.headers
            .iter()
            .map(move |(k, v)| (self.encoding.decode(k), self.encoding.decode(v)))
    }

    /// Decoded header names, insertion order, with duplicates preserved.
    pub fn keys(&self) -> impl Iterator<Item = String> + '_ {
        self.headers.iter().map(move |(k, _)| self.encoding.decode(k))
    }

    /// Number of stored `(name, value)` pairs.
    pub fn len(&self) -> usize {
        self.headers.len()
    }

    /// Whether there are no stored pairs.
    pub fn is_empty(&self) -> bool {
        self.headers.is_empty()
    }

    /// Clears the status line and all headers.
    pub fn clear(&mut self) {
        self.status_line.clear();
        self.headers.clear();
        self.invalidate();
    }

    /// The read-through decoded-string view, recomputed on first access
    /// after a mutation and cached until the next one.
    pub fn as_dict(&self) -> HashMap<String, String> {
        if let Some(cached) = self.dict_cache.read().as_ref() {
            return cached.clone();
        }
        let mut map = HashMap::with_capacity(self.headers.len());
        for (k, v) in self.items() {
            map.entry(k)
                .and_modify(|existing: &mut String| {
                    existing.push(',');
                    existing.push_str(&v);
                })
                .or_insert(v);
        }
        *self.dict_cache.write() = Some(map.clone());
        map
    }

    fn invalidate(&mut self) {
        *self.dict_cache.get_mut() = None;
    }

    /// Serializes the status line (if set) and headers as
    /// `<status line>\r\n(<name>: <value>\r\n)*`, without a trailing blank
    /// line (the caller adds the record-framing blank line separately).
    pub fn write<W: io::Write>(&self, writer: &mut W) -> io::Result<usize> {
        let mut written = 0;
        if !self.status_line.is_empty() {
            writer.write_all(&self.status_line)?;
            writer.write_all(b"\r\n")?;
            written += self.status_line.len() + 2;
        }
        for (name, value) in &self.headers {
            if !name.is_empty() {
                writer.write_all(name)?;
                writer.write_all(b": ")?;
                written += name.len() + 2;
            }
            writer.write_all(value)?;
            writer.write_all(b"\r\n")?;
            written += value.len() + 2;
        }
        Ok(written)
    }
}

/// Consumes header-block lines from `reader` into `target` until a blank
/// line (`\r\n`, `\n`, or EOF). Returns the number of bytes consumed,
/// terminator lines included.
///
/// When `has_status_line` is set, the first non-continuation line is stored
/// as the status line instead of being parsed as a `name: value` pair.
/// Lines with no colon are tolerated and folded in as continuations, a
/// best-effort accommodation for malformed real-world archives.
pub fn parse_header_block<S: Read>(
    reader: &mut BufferedReader<S>,
    target: &mut HeaderMap,
    mut has_status_line: bool,
) -> io::Result<u64> {
    let start = reader.tell();
    loop {
        let line = reader.read_line()?;
        if line.is_empty() {
            break;
        }
        let trimmed = trim_line_ending(&line);
        if trimmed.is_empty() {
            break;
        }
        if trimmed[0].is_ascii_whitespace() {
            target.add_continuation(trimmed);
            continue;
        }
        if has_status_line {
            target.set_status_line(trim_ascii(trimmed));
            has_status_line = false;
            continue;
        }
        match trimmed.iter().position(|&b| b == b':') {
            Some(idx) => {
                let name = trim_ascii(&trimmed[..idx]);
                let value = trim_ascii(&trimmed[idx + 1..]);
                target.append_bytes(name, value);
            }
            None => target.add_continuation(trimmed),
        }
    }
    Ok(reader.tell() - start)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn parse(data: &[u8], has_status_line: bool) -> (HeaderMap, u64) {
        let mut reader = BufferedReader::new(Cursor::new(data.to_vec()));
        let mut map = HeaderMap::new(HeaderEncoding::Utf8);
        let n = parse_header_block(&mut reader, &mut map, has_status_line).unwrap();
        (map, n)
    }

    #[test]
    fn continuation_folding_joins_with_space() {
        let (map, _) = parse(b"X-Foo: bar\r\n baz\r\n\r\n", false);
        assert_eq!(map.get("X-Foo").unwrap(), "bar baz");
    }

    #[test]
    fn status_line_is_captured_once() {
        let (map, _) = parse(b"WARC-Type: warcinfo\r\n\r\n", false);
        assert_eq!(map.get("WARC-Type").unwrap(), "warcinfo");

        let (map, _) = parse(b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\n\r\n", true);
        assert_eq!(map.status_line(), "HTTP/1.1 200 OK");
        assert_eq!(map.status_code(), Some(200));
        assert_eq!(map.get("Content-Type").unwrap(), "text/plain");
    }

    #[test]
    fn colonless_line_is_preserved_as_continuation() {
        let (map, _) = parse(b"not-a-header-line\r\n\r\n", false);
        assert_eq!(map.len(), 1);
        assert_eq!(map.headers[0].0, Vec::<u8>::new());
    }

    #[test]
    fn lf_only_terminator_is_accepted() {
        let (map, _) = parse(b"A: 1\nB: 2\n\n", false);
        assert_eq!(map.get("A").unwrap(), "1");
        assert_eq!(map.get("B").unwrap(), "2");
    }

    #[test]
    fn case_insensitive_lookup_and_set_replaces_first_occurrence() {
        let mut map = HeaderMap::new(HeaderEncoding::Utf8);
        map.append("Content-Length", "5");
        map.append("content-length", "10");
        assert_eq!(map.get("CONTENT-LENGTH").unwrap(), "5,10");

        map.set("Content-Length", "42");
        assert_eq!(map.get("content-length").unwrap(), "42");
        assert_eq!(map.len(), 1);
    }

    #[test]
    fn mutation_invalidates_dict_cache() {
        let mut map = HeaderMap::new(HeaderEncoding::Utf8);
        map.append("A", "1");
        let dict = map.as_dict();
        assert_eq!(dict.get("A").unwrap(), "1");

        map.set("A", "2");
        let dict = map.as_dict();
        assert_eq!(dict.get("A").unwrap(), "2");
    }

    #[test]
    fn write_round_trips_with_parse() {
        let (map, _) = parse(b"WARC/1.1\r\nA: 1\r\nB: 2\r\n\r\n", true);
        let mut out = Vec::new();
        map.write(&mut out).unwrap();
        assert_eq!(out, b"WARC/1.1\r\nA: 1\r\nB: 2\r\n");
    }
}
