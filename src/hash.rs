//! # Download and upload integrity checks.
//!
//! A [`HashValidator`] digests the payload as it streams and compares the
//! result against the hash the service reported, either in an `x-goog-hash`
//! response header or in the object metadata.
//!
//! ## Rules
//! - An empty metadata hash never overrides a hash received in a header
//! - Without a received hash there is nothing to compare and no mismatch is raised
//! - A mismatch is [`Error::HashMismatch`]; as a status it is `DataLoss`, which is never retried

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use sha2::Digest;

use crate::error::Error;

/// Response header carrying server-side hashes (`crc32c=...,md5=...`).
pub const HASH_HEADER: &str = "x-goog-hash";

/// Received and computed hashes, base64-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct HashValues {
    /// Hash reported by the service; empty when none was sent.
    pub received: String,
    pub computed: String,
}

/// Streaming validator over any [`Digest`] implementation.
///
/// # Example
/// ```
/// use cloudretry::HashValidator;
/// use sha2::Sha256;
///
/// let mut v = HashValidator::<Sha256>::new("sha256");
/// v.update(b"hello ");
/// v.update(b"world");
/// v.process_header("x-goog-hash", "sha256=uU0nuZNNPgilLlLX2n2r+sSE7+N6U4DukIj3rOLvzek=");
/// let values = v.finish("gs://bucket/object").unwrap();
/// assert_eq!(values.received, values.computed);
/// ```
#[derive(Debug, Clone)]
pub struct HashValidator<D: Digest> {
    prefix: &'static str,
    hasher: D,
    received: String,
}

impl<D: Digest> HashValidator<D> {
    /// `prefix` is the algorithm name used in the hash header (`md5`, `crc32c`, ...).
    pub fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            hasher: D::new(),
            received: String::new(),
        }
    }

    pub fn update(&mut self, data: impl AsRef<[u8]>) {
        self.hasher.update(data);
    }

    /// Inspects a response header; only `x-goog-hash` entries with this prefix are used.
    pub fn process_header(&mut self, key: &str, value: &str) {
        if !key.eq_ignore_ascii_case(HASH_HEADER) {
            return;
        }
        let needle = format!("{}=", self.prefix);
        for part in value.split(',') {
            if let Some(hash) = part.trim().strip_prefix(&needle) {
                self.received = hash.to_string();
                return;
            }
        }
    }

    /// Records the hash found in object metadata, unless it is empty.
    pub fn process_metadata(&mut self, hash: &str) {
        if hash.is_empty() {
            return;
        }
        self.received = hash.to_string();
    }

    pub fn received(&self) -> &str {
        &self.received
    }

    /// Computes the final hash and compares it with the received one.
    ///
    /// `context` names the transfer in the mismatch error.
    pub fn finish(self, context: &str) -> Result<HashValues, Error> {
        let computed = STANDARD.encode(self.hasher.finalize());
        if !self.received.is_empty() && self.received != computed {
            return Err(Error::HashMismatch {
                received: self.received,
                computed,
                context: context.to_string(),
            });
        }
        Ok(HashValues {
            received: self.received,
            computed,
        })
    }
}
