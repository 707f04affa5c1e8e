//! The embedder-supplied hook for identifier typing, keying, and downloads.
//!
//! Modeled on `PLImageManagerProvider` (`original_source/PLImageManager/Sources/PLImageManager.h`):
//! the original protocol validates an `id <NSObject>` identifier against
//! `identifierClass` at runtime. Here the identifier's type is an associated
//! type instead, so a mismatched identifier simply fails to compile rather
//! than raising a runtime error.

use std::num::NonZeroUsize;

use crate::error::DownloadError;

/// Supplies everything [`crate::manager::ImageManager`] needs to know about
/// the domain it's caching images for.
///
/// Implementations must be cheap to share across tasks (the manager holds
/// one behind an `Arc`) and `download` must be safe to call concurrently from
/// up to `max_concurrent_downloads()` threads at once.
pub trait Provider: Send + Sync + 'static {
    /// Client-side handle naming one image. Opaque to the core.
    type Identifier: Clone + Send + Sync + 'static;

    /// Decoded image payload. Opaque to the core; held by the cache with
    /// shared ownership until evicted.
    type Image: Clone + Send + Sync + 'static;

    /// Maximum number of concurrent `download` calls. Sampled exactly once,
    /// at [`crate::manager::ImageManager::new`].
    fn max_concurrent_downloads(&self) -> NonZeroUsize;

    /// Canonical, non-empty cache key for an identifier. Must be stable: the
    /// same identifier always yields the same key.
    fn key_for_identifier(&self, identifier: &Self::Identifier) -> String;

    /// Perform the actual image fetch. Blocking by contract — the runner
    /// dispatches this via a blocking-task pool rather than awaiting it
    /// directly.
    fn download(&self, identifier: &Self::Identifier) -> Result<Self::Image, DownloadError>;
}
