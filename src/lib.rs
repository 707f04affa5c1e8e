//! # image-retrieval-core
//!
//! Request-coalescing, multi-tier image retrieval core for latency-sensitive
//! clients.
//!
//! A client asks for the image behind some identifier and supplies a
//! callback; the core answers from a bounded in-memory cache when possible,
//! otherwise from an on-disk cache, otherwise by invoking an embedder-supplied
//! downloader. Concurrent requests for the same identifier are deduplicated
//! so the downloader runs at most once per key; requests are individually
//! cancelable; and the whole pipeline can be told to de-prioritize
//! currently-pending downloads in favor of whatever is requested next (useful
//! when, say, a scroll view's visible range just changed).
//!
//! ## Design Philosophy
//!
//! - **Coalescing, not caching policy** — the core owns request
//!   deduplication and cancellation; cache eviction, prefetching, and image
//!   decoding are the embedder's concern.
//! - **Generic over the domain** — [`Provider::Identifier`] and
//!   [`Provider::Image`] are associated types, not `Any`; a mismatched
//!   identifier simply fails to compile rather than erroring at runtime.
//! - **Event-driven** — consumers subscribe to a stream of pipeline events,
//!   no polling required, same as `tracing` output but structured for
//!   programmatic use.
//! - **Deterministic tests** — [`FakeOperationRunner`] lets tests step the
//!   disk/download/delivery lanes one job at a time instead of racing against
//!   a real thread pool.
//!
//! ## Quick Start
//!
//! ```no_run
//! use image_retrieval_core::{CacheConfig, ImageManager, Provider, DownloadError};
//! use image_retrieval_core::cache::codec::RawBytesCodec;
//! use std::num::NonZeroUsize;
//! use std::sync::Arc;
//!
//! struct HttpProvider;
//!
//! impl Provider for HttpProvider {
//!     type Identifier = String;
//!     type Image = Vec<u8>;
//!
//!     fn max_concurrent_downloads(&self) -> NonZeroUsize {
//!         NonZeroUsize::new(4).unwrap()
//!     }
//!
//!     fn key_for_identifier(&self, identifier: &Self::Identifier) -> String {
//!         identifier.clone()
//!     }
//!
//!     fn download(&self, identifier: &Self::Identifier) -> Result<Self::Image, DownloadError> {
//!         // blocking fetch; the runner dispatches this on a download worker
//!         Ok(identifier.as_bytes().to_vec())
//!     }
//! }
//!
//! # fn main() -> image_retrieval_core::Result<()> {
//! let manager = ImageManager::with_production_runner(
//!     HttpProvider,
//!     CacheConfig::default(),
//!     Arc::new(RawBytesCodec),
//! )?;
//!
//! let token = manager.request(
//!     "https://example.com/a.png".to_string(),
//!     None,
//!     |image, is_placeholder| {
//!         println!("got image (placeholder={is_placeholder}): {image:?}");
//!     },
//! );
//! assert!(!token.is_canceled());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

/// Two-tier cache: bounded in-memory tier over an on-disk blob tier.
pub mod cache;
/// Configuration types.
pub mod config;
/// Crate-level error types.
pub mod error;
/// Observability events broadcast by [`ImageManager`].
pub mod event;
/// The public façade: [`ImageManager`].
pub mod manager;
/// The embedder-supplied hook for identifier typing, keying, and downloads.
pub mod provider;
/// The coalescing and cancellation ledger.
pub mod registry;
/// The Operation Runner abstraction and its two implementations.
pub mod runner;
/// The client-visible request handle.
pub mod token;

pub use config::CacheConfig;
pub use error::{DownloadError, Error, Result};
pub use event::Event;
pub use manager::ImageManager;
pub use provider::Provider;
pub use runner::{FakeOperationRunner, OperationRunner, ProductionRunner};
pub use token::RequestToken;
