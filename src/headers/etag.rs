//! Entity tags and the digests they are built from

use base64::{engine::general_purpose::STANDARD, Engine};
use sha1::{Digest, Sha1};
use sha2::Sha256;
use twox_hash::XxHash64;
use std::{
    fmt::{self, Display},
    ops::Deref,
    str::FromStr
};

use crate::{error::Error, headers::HeaderValue};

const FNV_OFFSET: u32 = 0x811c9dc5;
const FNV_PRIME: u32 = 0x01000193;
const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const WEAK_PREFIX: &str = "W/";

/// Hash function used to compute an entity tag
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum EtagAlgorithm {
    /// SHA-1, base64 encoded
    #[default]
    Sha1,
    /// SHA-256, base64 encoded
    Sha256,
    /// 32-bit FNV-1a, base36 encoded
    Fnv1a,
    /// 32-bit MurmurHash3, hex encoded and zero-padded to 8 chars
    MurmurHash,
    /// 64-bit xxHash, hex encoded
    XxHash,
}

impl FromStr for EtagAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sha1" => Ok(Self::Sha1),
            "sha256" => Ok(Self::Sha256),
            "fnv1a" => Ok(Self::Fnv1a),
            "murmurhash" => Ok(Self::MurmurHash),
            "xxhash" => Ok(Self::XxHash),
            other => Err(Error::server_error(format!("Algorithm {other} not supported."))),
        }
    }
}

impl EtagAlgorithm {
    /// Computes the digest of `data`
    pub fn digest(&self, data: &[u8]) -> String {
        match self {
            Self::Sha1 => STANDARD.encode(Sha1::digest(data)),
            Self::Sha256 => STANDARD.encode(Sha256::digest(data)),
            Self::Fnv1a => to_base36(fnv1a(data)),
            Self::MurmurHash => format!("{:08x}", murmur3_32(data, 0)),
            Self::XxHash => format!("{:x}", XxHash64::oneshot(0, data)),
        }
    }
}

/// Represents an Entity Tag (ETag) value, quotes and weakness prefix included
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ETag {
    inner: String,
}

impl Deref for ETag {
    type Target = str;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl Display for ETag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner)
    }
}

impl TryFrom<ETag> for HeaderValue {
    type Error = Error;

    #[inline]
    fn try_from(etag: ETag) -> Result<Self, Self::Error> {
        HeaderValue::from_str(&etag.inner).map_err(Error::from)
    }
}

impl ETag {
    /// Wraps an already formatted tag, e.g. `"abc"` or `W/"abc"`
    #[inline]
    pub fn new(etag: impl Into<String>) -> Self {
        Self { inner: etag.into() }
    }

    /// Computes a tag over `data`
    pub fn compute(algorithm: EtagAlgorithm, data: &[u8], weak: bool) -> Self {
        let prefix = if weak { "W/\"" } else { "\"" };
        Self::new(format!("{prefix}{}\"", algorithm.digest(data)))
    }

    /// Checks the tag against an `If-None-Match` value
    ///
    /// Weakness is ignored on both sides. `*` matches any tag.
    pub fn matches(&self, if_none_match: &str) -> bool {
        if_none_match
            .split(',')
            .map(str::trim)
            .any(|candidate| candidate == "*"
                || candidate == self.inner
                || strip_weak(candidate) == strip_weak(&self.inner))
    }
}

#[inline]
fn strip_weak(tag: &str) -> &str {
    tag.strip_prefix(WEAK_PREFIX).unwrap_or(tag)
}

fn fnv1a(data: &[u8]) -> u32 {
    data.iter().fold(FNV_OFFSET, |hash, byte| (hash ^ *byte as u32).wrapping_mul(FNV_PRIME))
}

fn to_base36(mut value: u32) -> String {
    if value == 0 {
        return "0".into();
    }
    let mut digits = Vec::with_capacity(7);
    while value > 0 {
        digits.push(BASE36[(value % 36) as usize]);
        value /= 36;
    }
    digits.iter().rev().map(|d| *d as char).collect()
}

fn murmur3_32(data: &[u8], seed: u32) -> u32 {
    const C1: u32 = 0xcc9e2d51;
    const C2: u32 = 0x1b873593;

    let mut hash = seed;
    let mut chunks = data.chunks_exact(4);
    for chunk in &mut chunks {
        let mut k = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        k = k.wrapping_mul(C1).rotate_left(15).wrapping_mul(C2);
        hash ^= k;
        hash = hash.rotate_left(13).wrapping_mul(5).wrapping_add(0xe6546b64);
    }

    let tail = chunks.remainder();
    if !tail.is_empty() {
        let k = tail
            .iter()
            .rev()
            .fold(0u32, |k, byte| (k << 8) | *byte as u32);
        hash ^= k.wrapping_mul(C1).rotate_left(15).wrapping_mul(C2);
    }

    hash ^= data.len() as u32;
    hash ^= hash >> 16;
    hash = hash.wrapping_mul(0x85ebca6b);
    hash ^= hash >> 13;
    hash = hash.wrapping_mul(0xc2b2ae35);
    hash ^ (hash >> 16)
}
