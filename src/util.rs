// src/util.rs

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};
use std::path::Path;

/// Read a UTF-8 file into a String with a clear error message.
///
/// Used by `scriptgen check <file>`.
pub fn read_to_string(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("Failed to read file {:?}", path))
}

/// Ensure a directory exists (create it if missing).
///
/// Used for the configured scratch root.
pub fn ensure_dir(path: &Path) -> Result<()> {
    std::fs::create_dir_all(path)
        .with_context(|| format!("Failed to create directory {:?}", path))
}

/// Hex SHA-256 of `bytes`, used as the audit digest of generated code.
pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}
