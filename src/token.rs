//! Client-visible handle for one outstanding request.
//!
//! Modeled on `PLImageManagerRequestToken` (`original_source/PLImageManager/Sources/PLImageManager.h`):
//! `key`, `isCanceled`, `isReady`, and an idempotent `cancel`. The token never
//! owns its registry entry — it holds only the key and the registry handle
//! needed to flip its own cancellation flag and ask the registry to
//! re-check whether the entry is now fully abandoned. This keeps the token
//! cheap to clone and avoids a reference cycle back into the registry's map.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::registry::CancellationSink;

/// Per-token readiness/cancellation flags, shared between the [`RequestToken`]
/// handed to the caller and the registry entry it's coalesced into.
#[derive(Debug, Default)]
pub(crate) struct TokenState {
    pub(crate) canceled: AtomicBool,
    pub(crate) ready: AtomicBool,
}

impl TokenState {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn is_canceled(&self) -> bool {
        self.canceled.load(Ordering::Acquire)
    }

    pub(crate) fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub(crate) fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
    }
}

/// A cancelable handle for one `request` call.
///
/// Terminal once either [`RequestToken::is_canceled`] or
/// [`RequestToken::is_ready`] is observed true. Dropping a token without
/// canceling it does not cancel the request — the pipeline runs to
/// completion and the (now unreachable) callback fires and is simply never
/// observed.
#[derive(Clone)]
pub struct RequestToken {
    key: Arc<str>,
    state: Arc<TokenState>,
    registry: Arc<dyn CancellationSink>,
}

impl RequestToken {
    pub(crate) fn new(
        key: Arc<str>,
        state: Arc<TokenState>,
        registry: Arc<dyn CancellationSink>,
    ) -> Self {
        Self {
            key,
            state,
            registry,
        }
    }

    /// Build a token that is already terminal (ready), for the synchronous
    /// memory-hit fast path. It was never registered, so canceling it
    /// afterward is a harmless no-op.
    pub(crate) fn ready(key: Arc<str>, registry: Arc<dyn CancellationSink>) -> Self {
        let state = TokenState::new();
        state.mark_ready();
        Self::new(key, state, registry)
    }

    /// The cache key this request resolved to.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Whether [`RequestToken::cancel`] has been called.
    pub fn is_canceled(&self) -> bool {
        self.state.is_canceled()
    }

    /// Whether the callback for this token has already been posted (or, for
    /// the memory-hit fast path, invoked synchronously).
    pub fn is_ready(&self) -> bool {
        self.state.is_ready()
    }

    /// Clone of this token's flag pair, for code in this crate that needs to
    /// re-check cancellation immediately before a delivery-lane invocation
    /// without going through `cancel`.
    pub(crate) fn state_handle(&self) -> Arc<TokenState> {
        self.state.clone()
    }

    /// Cancel this specific request. Idempotent, non-blocking, and returns
    /// immediately.
    ///
    /// No callback fires for this token after `cancel()` returns — a
    /// callback already posted to the delivery lane re-checks the flag
    /// immediately before invocation and suppresses itself if set.
    pub fn cancel(&self) {
        self.state.canceled.store(true, Ordering::Release);
        self.registry.reconcile_cancellation(&self.key, &self.state);
    }
}
