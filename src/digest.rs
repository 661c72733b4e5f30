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

//! Digest algorithms for `WARC-Block-Digest` / `WARC-Payload-Digest`.

use data_encoding::BASE32;
use digest::Digest;
use md5::Md5;
use sha1::Sha1;
use sha2::Sha256;

use crate::error::Error;

/// A digest algorithm named in a `<alg>:<base32-upper digest>` header value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestAlgorithm {
    Sha1,
    Md5,
    Sha256,
}

impl DigestAlgorithm {
    /// The wire token used in digest headers (e.g. `sha1:...`).
    pub fn token(&self) -> &'static str {
        match self {
            DigestAlgorithm::Sha1 => "sha1",
            DigestAlgorithm::Md5 => "md5",
            DigestAlgorithm::Sha256 => "sha256",
        }
    }

    fn from_token(token: &str) -> Option<DigestAlgorithm> {
        match token.to_ascii_lowercase().as_str() {
            "sha1" => Some(DigestAlgorithm::Sha1),
            "md5" => Some(DigestAlgorithm::Md5),
            "sha256" => Some(DigestAlgorithm::Sha256),
            _ => None,
        }
    }

    /// Hashes `data` and returns the upper-case base32 digest, without the
    /// `alg:` prefix.
    pub fn digest(&self, data: &[u8]) -> String {
        let bytes: Vec<u8> = match self {
            DigestAlgorithm::Sha1 => Sha1::digest(data).to_vec(),
            DigestAlgorithm::Md5 => Md5::digest(data).to_vec(),
            DigestAlgorithm::Sha256 => Sha256::digest(data).to_vec(),
        };
        BASE32.encode(&bytes)
    }

    /// Formats `data`'s digest as a full header value, e.g. `sha1:ABCD...`.
    pub fn header_value(&self, data: &[u8]) -> String {
        format!("{}:{}", self.token(), self.digest(data))
    }
}

/// Splits a `<alg>:<base32 digest>` header value into its algorithm and
/// expected digest. Returns [`Error::UnsupportedDigestAlgorithm`] if the
/// algorithm token isn't recognized, and `None` if the value isn't even
/// colon-delimited (not an error: the header may simply be absent/malformed
/// in a way verification should just fail on).
pub fn parse_digest_header(value: &str) -> Result<Option<(DigestAlgorithm, &str)>, Error> {
    let Some((alg, expected)) = value.split_once(':') else {
        return Ok(None);
    };
    match DigestAlgorithm::from_token(alg) {
        Some(alg) => Ok(Some((alg, expected))),
        None => Err(Error::UnsupportedDigestAlgorithm(alg.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha1_of_abc_matches_known_vector() {
        // sha1("abc") = a9993e364706816aba3e25717850c26c9cd0d89
        let digest = DigestAlgorithm::Sha1.digest(b"abc");
        assert_eq!(digest, "VGMT4NSHA2AWVOR6EVYXQUGCNSONBWE5");
    }

    #[test]
    fn header_value_round_trips_through_parse() {
        let value = DigestAlgorithm::Sha1.header_value(b"abc");
        let (alg, expected) = parse_digest_header(&value).unwrap().unwrap();
        assert_eq!(alg, DigestAlgorithm::Sha1);
        assert_eq!(expected, DigestAlgorithm::Sha1.digest(b"abc"));
    }

    #[test]
    fn unknown_algorithm_is_reported() {
        let err = parse_digest_header("crc32:XYZ").unwrap_err();
        assert!(matches!(err, Error::UnsupportedDigestAlgorithm(_)));
    }
}
