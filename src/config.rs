//! Configuration types for image-retrieval-core

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Cache tier configuration.
///
/// Covers the knobs the two-tier cache needs that the [`crate::provider::Provider`]
/// doesn't supply. Download concurrency is intentionally *not* here — it is
/// sampled once from `Provider::max_concurrent_downloads()` at construction,
/// not duplicated into a second config surface.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Maximum number of entries the memory tier holds before evicting the
    /// least-recently-used entry (default: 100).
    #[serde(default = "default_memory_capacity")]
    pub memory_capacity: usize,

    /// Directory the disk tier writes blobs into (default: `./image-cache`).
    /// Created on [`crate::manager::ImageManager::new`] if missing.
    #[serde(default = "default_disk_dir")]
    pub disk_dir: PathBuf,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            memory_capacity: default_memory_capacity(),
            disk_dir: default_disk_dir(),
        }
    }
}

fn default_memory_capacity() -> usize {
    100
}

fn default_disk_dir() -> PathBuf {
    PathBuf::from("image-cache")
}
