//! Observability events broadcast by [`crate::manager::ImageManager`].
//!
//! Mirrors the teacher crate's event-driven design: any number of
//! subscribers can independently drain the stream via
//! [`crate::manager::ImageManager::subscribe`]. Consumers that only care
//! about `tracing` output can ignore this entirely — every event here is
//! also logged at the call site.

use serde::{Deserialize, Serialize};

/// A single pipeline transition, keyed by the cache key the transition
/// concerns.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Event {
    /// A request was satisfied synchronously from the memory tier.
    MemoryHit {
        /// Cache key the request resolved to.
        key: String,
    },
    /// A disk-probe job found the image on the disk tier.
    DiskHit {
        /// Cache key the request resolved to.
        key: String,
    },
    /// A download job started executing `Provider::download`.
    DownloadStarted {
        /// Cache key the download is for.
        key: String,
    },
    /// A download job's provider call returned successfully.
    DownloadCompleted {
        /// Cache key the download was for.
        key: String,
    },
    /// A download job's provider call returned an error.
    DownloadFailed {
        /// Cache key the download was for.
        key: String,
    },
    /// A placeholder or final image was posted to the delivery lane for at
    /// least one live token.
    Delivered {
        /// Cache key that was delivered.
        key: String,
        /// Whether this was a placeholder delivery or the real image.
        is_placeholder: bool,
    },
    /// A registry entry was fully canceled and its download (if any) will
    /// have its result discarded.
    Abandoned {
        /// Cache key whose entry was abandoned.
        key: String,
    },
    /// `defer_current_downloads` was invoked.
    Deferred,
}

/// Buffer size for the broadcast channel backing [`Event`] subscriptions.
///
/// Slow subscribers that fall more than this many events behind observe a
/// `RecvError::Lagged` on their next `recv`, same as the teacher crate.
pub const EVENT_CHANNEL_CAPACITY: usize = 1000;
