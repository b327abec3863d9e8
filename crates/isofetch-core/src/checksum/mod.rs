//! Checksum engine: streaming file digests and checksum-file parsing.
//!
//! Digests are computed after the transfer finishes, never inline with the
//! download path, so hashing cost does not slow the network copy.

mod parse;

use md5::Md5;
use serde::{Deserialize, Serialize};
use sha1::Sha1;
use sha2::{Digest, Sha256, Sha512};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub use parse::find_checksum;

const BUF_SIZE: usize = 64 * 1024;

/// Errors from digest computation and checksum-file lookup.
#[derive(Debug, thiserror::Error)]
pub enum ChecksumError {
    #[error("unsupported checksum algorithm: {0}")]
    UnsupportedAlgorithm(String),
    #[error("checksum not found for file: {file}")]
    NotFound { file: String },
    #[error("read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Hash algorithms accepted for verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    Md5,
    Sha1,
    Sha256,
    Sha512,
}

impl HashAlgorithm {
    pub const ALL: [HashAlgorithm; 4] = [
        HashAlgorithm::Md5,
        HashAlgorithm::Sha1,
        HashAlgorithm::Sha256,
        HashAlgorithm::Sha512,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            HashAlgorithm::Md5 => "md5",
            HashAlgorithm::Sha1 => "sha1",
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha512 => "sha512",
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HashAlgorithm {
    type Err = ChecksumError;

    /// Case-insensitive; unknown tags are rejected up front so a job with a
    /// bad algorithm never reaches the queue.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let tag = s.trim();
        HashAlgorithm::ALL
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(tag))
            .ok_or_else(|| ChecksumError::UnsupportedAlgorithm(tag.to_string()))
    }
}

/// Compute the digest of a file and return it as lowercase hex.
/// Reads in chunks to keep memory use bounded; suitable for multi-GB images.
pub fn digest_path(path: &Path, algorithm: HashAlgorithm) -> Result<String, ChecksumError> {
    let io_err = |source| ChecksumError::Io {
        path: path.to_path_buf(),
        source,
    };
    let f = File::open(path).map_err(io_err)?;
    digest_reader(f, algorithm).map_err(io_err)
}

/// Stream any reader through the selected hasher.
pub fn digest_reader<R: Read>(reader: R, algorithm: HashAlgorithm) -> std::io::Result<String> {
    match algorithm {
        HashAlgorithm::Md5 => hash_stream::<Md5, R>(reader),
        HashAlgorithm::Sha1 => hash_stream::<Sha1, R>(reader),
        HashAlgorithm::Sha256 => hash_stream::<Sha256, R>(reader),
        HashAlgorithm::Sha512 => hash_stream::<Sha512, R>(reader),
    }
}

fn hash_stream<D: Digest, R: Read>(mut reader: R) -> std::io::Result<String> {
    let mut hasher = D::new();
    let mut buf = vec![0u8; BUF_SIZE];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex::encode(hasher.finalize()))
}
