//! Hash utilities for document custody and artifact fingerprints

use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest as ShaDigest, Sha256, Sha512};

/// Supported hash algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HashAlgorithm {
    Sha256,
    Sha512,
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HashAlgorithm::Sha256 => "SHA256",
            HashAlgorithm::Sha512 => "SHA512",
        };
        write!(f, "{}", name)
    }
}

/// Hash result (digest + algorithm)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashResult {
    pub algorithm: HashAlgorithm,
    pub digest: String,
}

/// Custody digests recorded for every ingested document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DigestBundle {
    pub sha256: String,
    pub sha512: String,
}

impl DigestBundle {
    pub fn of(data: &[u8]) -> Self {
        Self {
            sha256: hash_bytes(data, HashAlgorithm::Sha256).digest,
            sha512: hash_bytes(data, HashAlgorithm::Sha512).digest,
        }
    }
}

/// Hashes a byte slice
pub fn hash_bytes(data: &[u8], algo: HashAlgorithm) -> HashResult {
    let digest = match algo {
        HashAlgorithm::Sha256 => {
            let mut hasher = Sha256::new();
            hasher.update(data);
            hex::encode(hasher.finalize())
        }
        HashAlgorithm::Sha512 => {
            let mut hasher = Sha512::new();
            hasher.update(data);
            hex::encode(hasher.finalize())
        }
    };

    HashResult {
        algorithm: algo,
        digest,
    }
}

/// Hex-encoded SHA-256, the default content identity everywhere.
pub fn sha256_hex(data: &[u8]) -> String {
    hash_bytes(data, HashAlgorithm::Sha256).digest
}

/// Hashes file content at given path
pub fn hash_file(path: &Path, algo: HashAlgorithm) -> Result<HashResult, std::io::Error> {
    let mut file = File::open(path)?;
    let mut buffer = Vec::new();
    file.read_to_end(&mut buffer)?;
    Ok(hash_bytes(&buffer, algo))
}

/// Verifies content hash matches the expected value
pub fn verify_hash(data: &[u8], expected: &str, algo: HashAlgorithm) -> bool {
    hash_bytes(data, algo).digest.eq_ignore_ascii_case(expected)
}
