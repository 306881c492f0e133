//! Core object model: digests, blobs, and commits.
//!
//! Implements content-addressable identity: every persisted object is keyed
//! by the SHA-256 digest of its canonical serialized form. Blobs hash their
//! raw contents so identical bytes collapse to one stored object regardless
//! of file name; commits hash their full versioned encoding, making a
//! commit's digest a pure function of its fields.

use serde::{Deserialize, Serialize};
use sha2::{Digest as _, Sha256};
use std::collections::BTreeMap;

use crate::error::{Error, Result};

/// Version byte prefixed to every serialized object. Bump when the encoding
/// of [`Blob`] or [`Commit`] changes; loads reject unknown versions.
pub const FORMAT_VERSION: u8 = 1;

/// Unique identifier for any stored object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Digest([u8; 32]);

impl Digest {
    /// Compute the digest of raw data.
    pub fn from_data(data: &[u8]) -> Self {
        let hash = Sha256::digest(data);
        Self(hash.into())
    }

    /// Convert to a lowercase hexadecimal string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from a hexadecimal string.
    pub fn from_hex(hex_str: &str) -> Option<Self> {
        let bytes = hex::decode(hex_str).ok()?;
        let arr: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(arr))
    }
}

impl std::fmt::Display for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

/// Frame a serialized payload with the format version byte.
fn frame(payload: Vec<u8>) -> Vec<u8> {
    let mut out = Vec::with_capacity(payload.len() + 1);
    out.push(FORMAT_VERSION);
    out.extend(payload);
    out
}

/// Strip and validate the format version byte.
fn unframe(data: &[u8]) -> Result<&[u8]> {
    match data.split_first() {
        Some((&FORMAT_VERSION, payload)) => Ok(payload),
        Some((&version, _)) => Err(Error::UnsupportedFormat(version)),
        None => Err(Error::UnsupportedFormat(0)),
    }
}

/// Snapshot of one file's contents at staging time. Immutable once stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blob {
    /// Logical file name the contents were read from.
    pub name: String,
    /// Raw contents.
    pub data: Vec<u8>,
}

impl Blob {
    pub fn new(name: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }

    /// Storage key: digest of the contents only. Two files with identical
    /// bytes map to the same key even under different names.
    pub fn digest(&self) -> Digest {
        Digest::from_data(&self.data)
    }

    /// Serialize to the versioned binary format.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(frame(bincode::serialize(self)?))
    }

    /// Deserialize from the versioned binary format.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(unframe(data)?)?)
    }
}

/// Immutable node in the history graph.
///
/// `tracked` maps every file name considered tracked as of this commit to
/// the digest of its blob; it is inherited from the parent and updated by
/// the staged delta at commit time. A `BTreeMap` keeps the serialized form
/// deterministic so the digest is reproducible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commit {
    /// Commit message (non-empty).
    pub message: String,
    /// Unix seconds. The root commit uses the epoch.
    pub timestamp: i64,
    /// First parent. `None` only for the root commit.
    pub parent: Option<Digest>,
    /// Second parent, present only for merge commits.
    pub other_parent: Option<Digest>,
    /// Tracked file name → blob digest.
    pub tracked: BTreeMap<String, Digest>,
}

impl Commit {
    pub fn new(
        message: impl Into<String>,
        timestamp: i64,
        parent: Option<Digest>,
        other_parent: Option<Digest>,
    ) -> Self {
        Self {
            message: message.into(),
            timestamp,
            parent,
            other_parent,
            tracked: BTreeMap::new(),
        }
    }

    /// The root commit shared by every repository: empty tree, epoch
    /// timestamp, fixed message. Its digest is identical everywhere, which
    /// is what makes histories from independent repositories converge.
    pub fn root() -> Self {
        Self::new("initial commit", 0, None, None)
    }

    /// Storage key: digest of the canonical serialized form. Re-serializing
    /// a loaded commit and hashing must reproduce this value.
    pub fn digest(&self) -> Result<Digest> {
        Ok(Digest::from_data(&self.to_bytes()?))
    }

    /// Serialize to the versioned binary format.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(frame(bincode::serialize(self)?))
    }

    /// Deserialize from the versioned binary format.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Ok(bincode::deserialize(unframe(data)?)?)
    }

    /// True for merge commits (two parents).
    pub fn is_merge(&self) -> bool {
        self.other_parent.is_some()
    }
}
