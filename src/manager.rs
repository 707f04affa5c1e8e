//! The public façade orchestrating provider, cache, runner, and registry.
//!
//! Modeled on `PLImageManager`
//! (`original_source/PLImageManager/Sources/PLImageManager.h`): the
//! `imageForIdentifier:placeholder:callback:` entry point and its disk-probe /
//! download / deliver job chain, generalized over the [`Provider`] trait's
//! associated types instead of `id`.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::broadcast;

use crate::cache::Cache;
use crate::cache::codec::ImageCodec;
use crate::config::CacheConfig;
use crate::error::{Error, Result};
use crate::event::{EVENT_CHANNEL_CAPACITY, Event};
use crate::provider::Provider;
use crate::registry::{CancellationSink, Registry};
use crate::runner::{OperationRunner, ProductionRunner};
use crate::token::RequestToken;

/// Orchestrates a [`Provider`] over an [`OperationRunner`] strategy, fronted
/// by a two-tier [`Cache`].
///
/// `R` is a type parameter rather than a trait object so embedders pay no
/// dynamic-dispatch cost on the hot fast/disk/download paths, and so tests
/// can substitute `FakeOperationRunner` with the exact same façade code.
pub struct ImageManager<P: Provider, R: OperationRunner> {
    provider: Arc<P>,
    cache: Arc<Cache<P::Image>>,
    registry: Arc<Registry<P::Image>>,
    runner: R,
    events: broadcast::Sender<Event>,
}

impl<P: Provider, R: OperationRunner> Clone for ImageManager<P, R> {
    fn clone(&self) -> Self {
        Self {
            provider: self.provider.clone(),
            cache: self.cache.clone(),
            registry: self.registry.clone(),
            runner: self.runner.clone(),
            events: self.events.clone(),
        }
    }
}

impl<P: Provider, R: OperationRunner> ImageManager<P, R> {
    /// Build a manager over an already-constructed runner. Creates the disk
    /// cache directory if missing.
    pub fn new(
        provider: P,
        config: CacheConfig,
        runner: R,
        codec: Arc<dyn ImageCodec<P::Image>>,
    ) -> Result<Self> {
        create_disk_dir(&config.disk_dir)?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Ok(Self {
            provider: Arc::new(provider),
            cache: Arc::new(Cache::new(config.memory_capacity, config.disk_dir, codec)),
            registry: Arc::new(Registry::new(events.clone())),
            runner,
            events,
        })
    }

    /// Submit a request for `identifier`.
    ///
    /// If the key is already present in the memory tier, `callback` runs
    /// synchronously before this method returns and the returned token is
    /// already ready. Otherwise the token is coalesced into any in-flight
    /// request for the same key and the callback is invoked later on the
    /// delivery lane — twice, if `placeholder` is `Some`.
    pub fn request(
        &self,
        identifier: P::Identifier,
        placeholder: Option<P::Image>,
        callback: impl Fn(Option<P::Image>, bool) + Send + Sync + 'static,
    ) -> RequestToken {
        let key: Arc<str> = Arc::from(self.provider.key_for_identifier(&identifier));
        let callback: Arc<dyn Fn(Option<P::Image>, bool) + Send + Sync> = Arc::new(callback);

        if let Some(image) = self.cache.get(&key, true) {
            tracing::debug!(key = %key, "memory hit");
            let _ = self.events.send(Event::MemoryHit {
                key: key.to_string(),
            });
            callback(Some(image), false);
            let sink: Arc<dyn CancellationSink> = self.registry.clone();
            return RequestToken::ready(key, sink);
        }

        let (token, is_first) = self.registry.register(key.clone(), callback.clone());

        if let Some(placeholder) = placeholder {
            let state = token.state_handle();
            let cb = callback.clone();
            let events = self.events.clone();
            let key_for_event = key.to_string();
            self.runner.submit_delivery(move || {
                if state.is_canceled() {
                    return;
                }
                cb(Some(placeholder), true);
            });
            let _ = events.send(Event::Delivered {
                key: key_for_event,
                is_placeholder: true,
            });
        }

        if is_first {
            tracing::debug!(key = %key, "first request for key, starting disk probe");
            self.spawn_disk_probe(key, identifier);
        }

        token
    }

    /// Remove `identifier`'s cached image from both tiers, on the disk lane.
    pub fn clear_cached_image(&self, identifier: &P::Identifier) {
        let key = self.provider.key_for_identifier(identifier);
        let cache = self.cache.clone();
        self.runner.submit_disk(move || cache.remove(&key));
    }

    /// Clear the memory tier synchronously and the disk tier on the disk
    /// lane.
    pub fn clear_cache(&self) {
        self.cache.clear_memory();
        let cache = self.cache.clone();
        self.runner.submit_disk(move || cache.clear_disk());
    }

    /// Re-tag every pending download as deferred.
    pub fn defer_current_downloads(&self) {
        self.registry.mark_deferred();
        self.runner.mark_downloads_deferred();
        let _ = self.events.send(Event::Deferred);
    }

    /// Subscribe to the pipeline's observability event stream. Independent
    /// of `tracing` output; a subscriber that falls more than
    /// [`EVENT_CHANNEL_CAPACITY`] events behind sees `RecvError::Lagged`.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    fn spawn_disk_probe(&self, key: Arc<str>, identifier: P::Identifier) {
        let provider = self.provider.clone();
        let cache = self.cache.clone();
        let registry = self.registry.clone();
        let runner = self.runner.clone();
        let events = self.events.clone();

        self.runner.submit_disk(move || {
            if registry.is_abandoned(&key) {
                tracing::debug!(key = %key, "disk probe skipped, entry abandoned");
                return;
            }
            if let Some(image) = cache.get(&key, false) {
                tracing::debug!(key = %key, "disk hit");
                let _ = events.send(Event::DiskHit {
                    key: key.to_string(),
                });
                deliver(&registry, &runner, &events, &key, Some(image));
                return;
            }
            spawn_download(provider, cache, registry, runner, events, key, identifier);
        });
    }
}

impl<P: Provider> ImageManager<P, ProductionRunner> {
    /// Convenience constructor for the tokio-backed runner: samples
    /// `provider.max_concurrent_downloads()` once and builds the runner
    /// from it.
    pub fn with_production_runner(
        provider: P,
        config: CacheConfig,
        codec: Arc<dyn ImageCodec<P::Image>>,
    ) -> Result<Self> {
        let max_concurrent_downloads = provider.max_concurrent_downloads();
        let runner = ProductionRunner::new(max_concurrent_downloads);
        Self::new(provider, config, runner, codec)
    }
}

fn create_disk_dir(path: &std::path::Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|source| Error::DiskCacheInit {
        path: PathBuf::from(path),
        source,
    })
}

/// Runs on a download worker: call the provider, then hand the result off to
/// the disk lane for persistence and fan-out (or fan out a failure directly).
fn spawn_download<P: Provider, R: OperationRunner>(
    provider: Arc<P>,
    cache: Arc<Cache<P::Image>>,
    registry: Arc<Registry<P::Image>>,
    runner: R,
    events: broadcast::Sender<Event>,
    key: Arc<str>,
    identifier: P::Identifier,
) {
    let disk_runner = runner.clone();
    runner.submit_download(move || {
        if registry.is_abandoned(&key) {
            tracing::debug!(key = %key, "download skipped, entry abandoned");
            return;
        }
        let _ = events.send(Event::DownloadStarted {
            key: key.to_string(),
        });
        let result = provider.download(&identifier);
        if registry.is_abandoned(&key) {
            tracing::debug!(key = %key, "download result discarded, entry abandoned");
            return;
        }
        match result {
            Ok(image) => {
                tracing::debug!(key = %key, "download completed");
                let _ = events.send(Event::DownloadCompleted {
                    key: key.to_string(),
                });
                let registry = registry.clone();
                let deliver_runner = disk_runner.clone();
                let events = events.clone();
                let key_for_disk = key.clone();
                disk_runner.submit_disk(move || {
                    cache.set(Some(image.clone()), &key_for_disk);
                    deliver(&registry, &deliver_runner, &events, &key_for_disk, Some(image));
                });
            }
            Err(error) => {
                tracing::warn!(key = %key, %error, "download failed");
                let _ = events.send(Event::DownloadFailed {
                    key: key.to_string(),
                });
                deliver(&registry, &disk_runner, &events, &key, None);
            }
        }
    });
}

/// Atomically drain the entry for `key` and post each non-canceled token's
/// callback to the delivery lane. Runs directly from whichever worker
/// produced the image rather than being re-routed through the disk lane,
/// since `Registry::drain` is already atomic under its own mutex.
fn deliver<Img, R: OperationRunner>(
    registry: &Arc<Registry<Img>>,
    runner: &R,
    events: &broadcast::Sender<Event>,
    key: &Arc<str>,
    image: Option<Img>,
) where
    Img: Clone + Send + Sync + 'static,
{
    let Some(tokens) = registry.drain(key) else {
        return;
    };
    for (state, callback) in tokens {
        if state.is_canceled() {
            continue;
        }
        state.mark_ready();
        let job_state = state.clone();
        let job_image = image.clone();
        runner.submit_delivery(move || {
            if job_state.is_canceled() {
                return;
            }
            callback(job_image, false);
        });
    }
    let _ = events.send(Event::Delivered {
        key: key.to_string(),
        is_placeholder: false,
    });
}
