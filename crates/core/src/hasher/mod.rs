use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

/// Read buffer size; large videos are streamed, never loaded whole.
const CHUNK_SIZE: usize = 64 * 1024;

/// Lowercase hex SHA-256 of a file's bytes. The name plays no part.
pub fn compute_sha256(path: &Path) -> io::Result<String> {
    let file = File::open(path)?;
    hash_reader(BufReader::with_capacity(CHUNK_SIZE, file))
}

pub fn hash_reader(mut reader: impl Read) -> io::Result<String> {
    let mut hasher = Sha256::new();
    io::copy(&mut reader, &mut hasher)?;
    Ok(format!("{:x}", hasher.finalize()))
}

/// True when `path` exists and its bytes hash to `expected`.
pub fn matches_hash(path: &Path, expected: &str) -> bool {
    matches!(compute_sha256(path), Ok(ref actual) if actual == expected)
}
