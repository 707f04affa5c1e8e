//! On-disk blob tier.
//!
//! Each key maps to one file at a deterministic path derived from a SHA-256
//! hex digest of the key. Files may be deleted out of band without
//! corrupting the core — a missing file is simply a miss.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use sha2::{Digest, Sha256};

use super::codec::ImageCodec;

pub(crate) struct DiskTier<Img> {
    root: PathBuf,
    codec: Arc<dyn ImageCodec<Img>>,
}

impl<Img> DiskTier<Img> {
    pub(crate) fn new(root: PathBuf, codec: Arc<dyn ImageCodec<Img>>) -> Self {
        Self { root, codec }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let digest = Sha256::digest(key.as_bytes());
        self.root.join(format!("{}.blob", hex::encode(digest)))
    }

    /// Read and decode the blob for `key`. A missing file is a plain miss.
    /// A file that fails to decode is a corrupt blob: deleted and treated
    /// as a miss.
    pub(crate) fn get(&self, key: &str) -> Option<Img> {
        let path = self.path_for(key);
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(_) => return None,
        };
        match self.codec.decode(&bytes) {
            Some(image) => Some(image),
            None => {
                tracing::warn!(path = %path.display(), "corrupt disk cache blob, removing");
                let _ = std::fs::remove_file(&path);
                None
            }
        }
    }

    /// Write the blob for `key`. Errors are logged and otherwise ignored —
    /// a disk write failure degrades to a non-persistent success rather than
    /// an error returned to the caller.
    pub(crate) fn set(&self, key: &str, image: &Img) {
        let path = self.path_for(key);
        let bytes = self.codec.encode(image);
        if let Err(error) = std::fs::write(&path, bytes) {
            tracing::warn!(path = %path.display(), %error, "failed to write disk cache blob");
        }
    }

    pub(crate) fn remove(&self, key: &str) {
        let path = self.path_for(key);
        match std::fs::remove_file(&path) {
            Ok(()) | Err(_) => {}
        }
    }

    /// Delete every blob under the cache root. Best-effort: a failure to
    /// remove one entry doesn't stop the rest.
    pub(crate) fn clear(&self) {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(error) => {
                tracing::warn!(root = %self.root.display(), %error, "failed to list disk cache root");
                return;
            }
        };
        for entry in entries.flatten() {
            if let Err(error) = std::fs::remove_file(entry.path()) {
                tracing::warn!(path = %entry.path().display(), %error, "failed to remove disk cache blob");
            }
        }
    }

    pub(crate) fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::codec::RawBytesCodec;

    fn tier(dir: &Path) -> DiskTier<Vec<u8>> {
        DiskTier::new(dir.to_path_buf(), Arc::new(RawBytesCodec))
    }

    #[test]
    fn miss_on_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(tier(dir.path()).get("k"), None);
    }

    #[test]
    fn set_then_get_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let tier = tier(dir.path());
        tier.set("k", &vec![1, 2, 3]);
        assert_eq!(tier.get("k"), Some(vec![1, 2, 3]));
    }

    #[test]
    fn remove_deletes_blob() {
        let dir = tempfile::tempdir().unwrap();
        let tier = tier(dir.path());
        tier.set("k", &vec![1]);
        tier.remove("k");
        assert_eq!(tier.get("k"), None);
    }

    #[test]
    fn corrupt_blob_is_treated_as_miss_and_deleted() {
        struct AlwaysFailCodec;
        impl ImageCodec<Vec<u8>> for AlwaysFailCodec {
            fn encode(&self, image: &Vec<u8>) -> Vec<u8> {
                image.clone()
            }
            fn decode(&self, _bytes: &[u8]) -> Option<Vec<u8>> {
                None
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let tier: DiskTier<Vec<u8>> = DiskTier::new(dir.path().to_path_buf(), Arc::new(AlwaysFailCodec));
        tier.set("k", &vec![9, 9]);
        let path = tier.path_for("k");
        assert!(path.exists());
        assert_eq!(tier.get("k"), None);
        assert!(!path.exists(), "corrupt blob should be removed on read");
    }

    #[test]
    fn distinct_keys_map_to_distinct_paths() {
        let dir = tempfile::tempdir().unwrap();
        let tier = tier(dir.path());
        assert_ne!(tier.path_for("a"), tier.path_for("b"));
    }

    #[test]
    fn clear_removes_all_blobs() {
        let dir = tempfile::tempdir().unwrap();
        let tier = tier(dir.path());
        tier.set("a", &vec![1]);
        tier.set("b", &vec![2]);
        tier.clear();
        assert_eq!(tier.get("a"), None);
        assert_eq!(tier.get("b"), None);
    }
}
