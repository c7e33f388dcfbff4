// Copyright Materialize, Inc. and contributors. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! The pull-spec fingerprint scheme.
//!
//! A [`Fingerprint`] is the canonical `<tagged-name>@<content-digest>` pull
//! spec. Its [`RequestId`] is the MD5 hex digest of that string -- stable,
//! short, and used as the arbiter's primary key for an in-flight scan --
//! once set for a fingerprint, it never changes.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical pull spec, e.g. `registry/ns/image@sha256:<hex>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn new(pull_spec: impl Into<String>) -> Self {
        Fingerprint(pull_spec.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The tagged name portion, before the `@`.
    pub fn tagged_name(&self) -> &str {
        self.0.split('@').next().unwrap_or(&self.0)
    }

    /// The content digest portion, after the `@`, if present.
    pub fn content_digest(&self) -> Option<&str> {
        self.0.split_once('@').map(|(_, digest)| digest)
    }

    /// The first 10 hex characters of the content digest, used by the
    /// analysis service as a project-version search key (see
    /// `findProjectVersions` in the design).
    pub fn short_digest(&self) -> Option<&str> {
        let digest = self.content_digest()?;
        // Digests are typically `sha256:<hex>`; strip any algorithm prefix
        // before truncating to match `imageId[:10]` on the raw hex
        // portion.
        let hex = digest.rsplit_once(':').map_or(digest, |(_, hex)| hex);
        Some(&hex[..hex.len().min(10)])
    }

    /// `hex(md5(pull_spec))`.
    pub fn request_id(&self) -> RequestId {
        use md_5::{Digest, Md5};
        let mut hasher = Md5::new();
        hasher.update(self.0.as_bytes());
        RequestId(hex_encode(&hasher.finalize()))
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Fingerprint {
    fn from(s: String) -> Self {
        Fingerprint(s)
    }
}

impl From<&str> for Fingerprint {
    fn from(s: &str) -> Self {
        Fingerprint(s.to_string())
    }
}

/// `hex(md5(fingerprint))`. The arbiter's arbitration key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(String);

impl RequestId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The wire value for "no assignment right now" -- an unauthorized
    /// caller has nothing to key off of and should just retry later.
    pub fn empty() -> Self {
        RequestId(String::new())
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for RequestId {
    fn from(s: String) -> Self {
        RequestId(s)
    }
}

fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        write!(s, "{:02x}", b).unwrap();
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_id_is_md5_hex_of_spec() {
        let spec = "host/ns/img@sha256:abc";
        let fp = Fingerprint::new(spec);
        let expected = format!("{:x}", md5_crate_hash(spec.as_bytes()));
        assert_eq!(fp.request_id().as_str(), expected);
    }

    // Two calls with the same spec produce byte-identical request ids.
    #[test]
    fn request_id_is_stable_across_calls() {
        let a = Fingerprint::new("x@sha256:deadbeef");
        let b = Fingerprint::new("x@sha256:deadbeef");
        assert_eq!(a.request_id(), b.request_id());
    }

    #[test]
    fn short_digest_takes_first_ten_hex_chars() {
        let fp = Fingerprint::new("img@sha256:0123456789abcdef");
        assert_eq!(fp.short_digest(), Some("0123456789"));
    }

    fn md5_crate_hash(bytes: &[u8]) -> md_5::digest::Output<md_5::Md5> {
        use md_5::{Digest, Md5};
        let mut hasher = Md5::new();
        hasher.update(bytes);
        hasher.finalize()
    }
}
