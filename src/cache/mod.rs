//! Two-tier cache: a fast bounded memory tier over a slower on-disk tier.

pub mod codec;
mod disk;
mod memory;

use std::path::PathBuf;
use std::sync::Arc;

use codec::ImageCodec;
use disk::DiskTier;
use memory::MemoryTier;

/// The two-tier cache facade. Synchronous — callers decide whether disk
/// access is permitted for a given lookup via `memory_only`, since disk I/O
/// is the one operation in this type that can block.
pub(crate) struct Cache<Img> {
    memory: MemoryTier<Img>,
    disk: DiskTier<Img>,
}

impl<Img: Clone> Cache<Img> {
    pub(crate) fn new(
        memory_capacity: usize,
        disk_dir: PathBuf,
        codec: Arc<dyn ImageCodec<Img>>,
    ) -> Self {
        Self {
            memory: MemoryTier::new(memory_capacity),
            disk: DiskTier::new(disk_dir, codec),
        }
    }

    /// Probe memory first. If `memory_only`, return immediately with the
    /// memory result. Otherwise fall through to disk on a memory miss; a
    /// disk hit populates memory before returning.
    pub(crate) fn get(&self, key: &str, memory_only: bool) -> Option<Img> {
        if let Some(image) = self.memory.get(key) {
            return Some(image);
        }
        if memory_only {
            return None;
        }
        let image = self.disk.get(key)?;
        self.memory.put(key.to_string(), image.clone());
        Some(image)
    }

    /// Write to both tiers. `None` is the removal instruction.
    pub(crate) fn set(&self, image: Option<Img>, key: &str) {
        match image {
            Some(image) => {
                self.memory.put(key.to_string(), image.clone());
                self.disk.set(key, &image);
            }
            None => self.remove(key),
        }
    }

    pub(crate) fn remove(&self, key: &str) {
        self.memory.remove(key);
        self.disk.remove(key);
    }

    pub(crate) fn clear_memory(&self) {
        self.memory.clear();
    }

    pub(crate) fn clear_disk(&self) {
        self.disk.clear();
    }

    #[cfg(test)]
    pub(crate) fn disk_root(&self) -> &std::path::Path {
        self.disk.root()
    }
}
