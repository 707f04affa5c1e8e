//! The coalescing and cancellation ledger.
//!
//! A mapping from cache key to the set of live tokens interested in that
//! key, the in-flight-download marker, and a priority tag. The single mutex
//! here is the *only* shared mutable state crossing lane boundaries — it is
//! held only for registry-local bookkeeping, never across disk or network
//! I/O.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::broadcast;

use crate::event::Event;
use crate::token::{RequestToken, TokenState};

/// A request's callback, reusable across the placeholder and real-image
/// invocations — the same callback is called up to twice.
pub(crate) type Callback<Img> = Arc<dyn Fn(Option<Img>, bool) + Send + Sync>;

/// Cohort tag for an entry's pending download(s). Functionally inert on its
/// own — the actual FIFO/deferred-cohort split lives in
/// [`crate::runner::OperationRunner`]; this tag is bookkeeping so an
/// embedder inspecting the registry can tell which cohort an entry belongs
/// to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Priority {
    /// Newly arrived, not yet subject to a deferral signal.
    Current,
    /// Pending at the moment `defer_current_downloads` was last called.
    Deferred,
}

/// One coalesced per-key record: every live token waiting on this key, plus
/// whether the key's in-flight work has been abandoned (the entry goes
/// `LIVE -> ABANDONED` the moment its last token cancels).
struct Entry<Img> {
    tokens: Vec<(Arc<TokenState>, Callback<Img>)>,
    abandoned: Arc<AtomicBool>,
    priority: Priority,
}

/// Narrow capability a [`RequestToken`] needs to reconcile its own
/// cancellation against the entry it's coalesced into, without forcing the
/// token type itself to carry the cache's image type parameter.
pub(crate) trait CancellationSink: Send + Sync {
    fn reconcile_cancellation(&self, key: &str, state: &Arc<TokenState>);
}

/// The registry itself, generic over the image type so it can hold
/// per-token callbacks directly — each entry's "live tokens" are, concretely,
/// a list of `(flags, callback)` pairs.
pub struct Registry<Img> {
    entries: parking_lot::Mutex<HashMap<Arc<str>, Entry<Img>>>,
    events: broadcast::Sender<Event>,
}

impl<Img> Registry<Img> {
    /// Create an empty registry that reports abandonment on `events`.
    pub fn new(events: broadcast::Sender<Event>) -> Self {
        Self {
            entries: parking_lot::Mutex::new(HashMap::new()),
            events,
        }
    }

    /// Register a new token for `key`. Returns the token plus whether this
    /// call created a fresh entry (`is_first`) — the façade uses `is_first`
    /// to decide whether it must kick off the disk/download pipeline or can
    /// rely on an already in-flight pipeline's fan-out.
    pub(crate) fn register(
        self: &Arc<Self>,
        key: Arc<str>,
        callback: Callback<Img>,
    ) -> (RequestToken, bool)
    where
        Img: 'static,
    {
        let state = TokenState::new();
        let mut entries = self.entries.lock();
        let is_first = !entries.contains_key(&key);
        entries
            .entry(key.clone())
            .or_insert_with(|| Entry {
                tokens: Vec::new(),
                abandoned: Arc::new(AtomicBool::new(false)),
                priority: Priority::Current,
            })
            .tokens
            .push((state.clone(), callback));
        drop(entries);

        let sink: Arc<dyn CancellationSink> = self.clone();
        let token = RequestToken::new(key, state, sink);
        (token, is_first)
    }

    /// Whether the entry for `key` is abandoned, i.e. every token that was
    /// interested in it has been canceled. An entry that no longer exists
    /// (already drained) is treated as abandoned too — there is nothing
    /// left to deliver to.
    pub(crate) fn is_abandoned(&self, key: &str) -> bool {
        self.entries
            .lock()
            .get(key)
            .map(|entry| entry.abandoned.load(Ordering::Acquire))
            .unwrap_or(true)
    }

    /// Atomically remove the entry for `key` and return its token list.
    /// Called exactly once per key, whenever the pipeline has an image
    /// (success or final failure) ready to fan out.
    pub(crate) fn drain(&self, key: &str) -> Option<Vec<(Arc<TokenState>, Callback<Img>)>> {
        self.entries.lock().remove(key).map(|entry| entry.tokens)
    }

    /// Tag every current entry as deferred. Functionally inert — see the
    /// `Priority` doc comment — but kept so the registry's state faithfully
    /// reflects the deferral signal for introspection and tests.
    pub(crate) fn mark_deferred(&self) {
        for entry in self.entries.lock().values_mut() {
            entry.priority = Priority::Deferred;
        }
    }

    /// Current cohort tag for `key`, if an entry exists. Exposed for tests.
    #[cfg(test)]
    pub(crate) fn priority_of(&self, key: &str) -> Option<Priority> {
        self.entries.lock().get(key).map(|entry| entry.priority)
    }

    /// Number of live (non-abandoned) entries. Exposed for tests.
    #[cfg(test)]
    pub(crate) fn entry_count(&self) -> usize {
        self.entries.lock().len()
    }
}

impl<Img> CancellationSink for Registry<Img> {
    /// `state` has already had `canceled` set by [`RequestToken::cancel`]
    /// before this is called; since the registry holds the same `Arc`, the
    /// token's own flag is already reflected in `entry.tokens` below and
    /// doesn't need separate handling here.
    fn reconcile_cancellation(&self, key: &str, _state: &Arc<TokenState>) {
        let just_abandoned = {
            let entries = self.entries.lock();
            match entries.get(key) {
                Some(entry) => {
                    let all_canceled = entry
                        .tokens
                        .iter()
                        .all(|(token_state, _)| token_state.is_canceled());
                    if all_canceled {
                        !entry.abandoned.swap(true, Ordering::Release)
                    } else {
                        false
                    }
                }
                None => false,
            }
        };
        if just_abandoned {
            let _ = self.events.send(Event::Abandoned {
                key: key.to_string(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop_callback() -> Callback<&'static str> {
        Arc::new(|_, _| {})
    }

    fn new_registry<Img>() -> Registry<Img> {
        Registry::new(broadcast::channel(16).0)
    }

    #[test]
    fn first_registration_reports_is_first() {
        let registry = Arc::new(new_registry());
        let (_token, is_first) = registry.register(Arc::from("k"), noop_callback());
        assert!(is_first);
        assert_eq!(registry.entry_count(), 1);
    }

    #[test]
    fn second_registration_for_same_key_coalesces() {
        let registry = Arc::new(new_registry());
        let (_t1, first1) = registry.register(Arc::from("k"), noop_callback());
        let (_t2, first2) = registry.register(Arc::from("k"), noop_callback());
        assert!(first1);
        assert!(!first2);
        assert_eq!(registry.entry_count(), 1);
    }

    #[test]
    fn cancel_last_token_abandons_entry() {
        let registry = Arc::new(new_registry());
        let (token, _) = registry.register(Arc::from("k"), noop_callback());
        assert!(!registry.is_abandoned("k"));
        token.cancel();
        assert!(registry.is_abandoned("k"));
    }

    #[test]
    fn cancel_last_token_emits_abandoned_event() {
        let registry = Arc::new(new_registry());
        let mut events = registry.events.subscribe();
        let (token, _) = registry.register(Arc::from("k"), noop_callback());
        token.cancel();
        assert_eq!(
            events.try_recv().unwrap(),
            Event::Abandoned { key: "k".to_string() }
        );
    }

    #[test]
    fn cancel_one_of_two_does_not_abandon() {
        let registry = Arc::new(new_registry());
        let (token1, _) = registry.register(Arc::from("k"), noop_callback());
        let (_token2, _) = registry.register(Arc::from("k"), noop_callback());
        token1.cancel();
        assert!(!registry.is_abandoned("k"));
    }

    #[test]
    fn drain_removes_entry_and_returns_tokens() {
        let registry = Arc::new(new_registry());
        registry.register(Arc::from("k"), noop_callback());
        registry.register(Arc::from("k"), noop_callback());
        let drained = registry.drain("k").unwrap();
        assert_eq!(drained.len(), 2);
        assert_eq!(registry.entry_count(), 0);
        assert!(registry.drain("k").is_none());
    }

    #[test]
    fn mark_deferred_tags_existing_entries() {
        let registry = Arc::new(new_registry());
        registry.register(Arc::from("k"), noop_callback());
        assert_eq!(registry.priority_of("k"), Some(Priority::Current));
        registry.mark_deferred();
        assert_eq!(registry.priority_of("k"), Some(Priority::Deferred));
    }

    #[test]
    fn missing_entry_counts_as_abandoned() {
        let registry: Registry<&'static str> = new_registry();
        assert!(registry.is_abandoned("nope"));
    }
}
