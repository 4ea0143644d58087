//! Content fingerprints.
//!
//! A fingerprint is the SHA-256 of a file's raw bytes, rendered as lowercase
//! hex. It is content-based rather than mtime-based so it survives
//! `git checkout` and copies between machines, and it is the only signal the
//! sync engine uses to decide that a source image changed.
//!
//! Files are streamed through the hasher in fixed-size chunks, so a large
//! source asset never has to be resident in memory.

use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

/// Read buffer size for streaming file hashes.
const CHUNK_SIZE: usize = 64 * 1024;

/// SHA-256 hash of a file's contents, returned as a hex string.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let file = File::open(path)?;
    let mut reader = BufReader::with_capacity(CHUNK_SIZE, file);
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; CHUNK_SIZE];
    loop {
        let n = reader.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

/// SHA-256 hash of an in-memory byte slice, returned as a hex string.
pub fn hash_bytes(bytes: &[u8]) -> String {
    format!("{:x}", Sha256::digest(bytes))
}
