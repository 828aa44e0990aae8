// src/watch/hash.rs

//! Content hashing for `use_hash` bindings.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use blake3::Hasher;
use tracing::debug;

use crate::fs::FileSystem;

/// Hex-encoded blake3 hash of a file's contents.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let bytes = fs.read(path)?;
    let mut hasher = Hasher::new();
    hasher.update(&bytes);
    Ok(hasher.finalize().to_hex().to_string())
}

/// Abstract storage for the last seen hash per key.
pub trait HashStore: Send + Sync {
    fn load(&self, key: &str) -> Option<String>;
    fn save(&mut self, key: &str, hash: &str);

    /// Store `hash` and report whether it differs from the stored one.
    fn check_and_update(&mut self, key: &str, hash: &str) -> bool {
        if self.load(key).as_deref() == Some(hash) {
            return false;
        }
        self.save(key, hash);
        true
    }
}

/// Stores hashes in memory only; nothing survives the process.
#[derive(Debug, Default)]
pub struct MemoryHashStore {
    map: HashMap<String, String>,
}

impl MemoryHashStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl HashStore for MemoryHashStore {
    fn load(&self, key: &str) -> Option<String> {
        self.map.get(key).cloned()
    }

    fn save(&mut self, key: &str, hash: &str) {
        debug!(hash = %hash, "stored content hash");
        self.map.insert(key.to_string(), hash.to_string());
    }
}
