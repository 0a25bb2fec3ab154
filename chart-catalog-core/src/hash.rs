//! MD5 content hashing for folder and chart identity.
//!
//! Folder identity is the hash of a normalized absolute path string; chart
//! identity is the hash of the file bytes. Both are rendered as 32 upper-case
//! hex digits so values written by older catalogs compare equal.

use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const CHUNK_SIZE: usize = 64 * 1024; // 64 KB

/// Length of a hex-encoded 128-bit digest.
pub const HASH_HEX_LEN: usize = 32;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum HashError {
    #[error("invalid hash '{0}': expected {HASH_HEX_LEN} hex digits")]
    Invalid(String),
}

/// A hex-encoded 128-bit MD5 digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Md5Hash(String);

impl Md5Hash {
    /// Parse a hex digest, accepting either case.
    pub fn from_hex(hex: &str) -> Result<Self, HashError> {
        if hex.len() != HASH_HEX_LEN || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(HashError::Invalid(hex.to_string()));
        }
        Ok(Self(hex.to_ascii_uppercase()))
    }

    /// Reserved identity of the catalog's root folder: the digest of the empty string.
    pub fn root() -> Self {
        hash_bytes(b"")
    }

    pub fn is_root(&self) -> bool {
        *self == Self::root()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Md5Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Md5Hash {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl TryFrom<String> for Md5Hash {
    type Error = HashError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::from_hex(&value)
    }
}

impl From<Md5Hash> for String {
    fn from(hash: Md5Hash) -> Self {
        hash.0
    }
}

/// Hash a byte string.
pub fn hash_bytes(bytes: &[u8]) -> Md5Hash {
    Md5Hash(format!("{:X}", md5::compute(bytes)))
}

/// Hash the UTF-8 bytes of a string.
pub fn hash_str(s: &str) -> Md5Hash {
    hash_bytes(s.as_bytes())
}

/// Hash a folder path. The caller is responsible for normalizing it first.
pub fn hash_path(path: &Path) -> Md5Hash {
    hash_str(&path.to_string_lossy())
}

/// Stream a file through MD5 in fixed-size chunks.
pub fn hash_file(path: &Path) -> io::Result<Md5Hash> {
    let mut file = File::open(path)?;
    hash_reader(&mut file)
}

/// Stream any reader through MD5 in fixed-size chunks.
pub fn hash_reader(reader: &mut dyn Read) -> io::Result<Md5Hash> {
    let mut ctx = md5::Context::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        ctx.consume(&buf[..n]);
    }
    Ok(Md5Hash(format!("{:X}", ctx.compute())))
}

#[cfg(test)]
#[path = "tests/hash_tests.rs"]
mod tests;
