// Hash computation utilities

use anyhow::Result;
use sha2::{Digest, Sha256, Sha512};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Hash algorithm types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HashAlgorithm {
    Sha256,
    Sha512,
}

impl HashAlgorithm {
    /// Get the algorithm prefix for formatted output
    pub fn prefix(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha512 => "sha512",
        }
    }
}

/// Hash a file in 64 KiB chunks and return the formatted digest
pub fn compute_file_hash(path: &Path, algorithm: HashAlgorithm) -> Result<String> {
    let mut file = File::open(path)?;
    let mut buffer = vec![0u8; 64 * 1024];

    let hash_hex = match algorithm {
        HashAlgorithm::Sha256 => {
            let mut hasher = Sha256::new();
            loop {
                let read = file.read(&mut buffer)?;
                if read == 0 {
                    break;
                }
                hasher.update(&buffer[..read]);
            }
            hex::encode(hasher.finalize())
        }
        HashAlgorithm::Sha512 => {
            let mut hasher = Sha512::new();
            loop {
                let read = file.read(&mut buffer)?;
                if read == 0 {
                    break;
                }
                hasher.update(&buffer[..read]);
            }
            hex::encode(hasher.finalize())
        }
    };

    Ok(format_hash(&hash_hex, algorithm))
}

/// Format an existing hash with algorithm prefix
pub fn format_hash(hash: &str, algorithm: HashAlgorithm) -> String {
    format!("{}:{}", algorithm.prefix(), hash.to_lowercase())
}
