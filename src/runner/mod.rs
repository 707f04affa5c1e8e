//! The Operation Runner: a thin submission layer exposing four named lanes —
//! fast (synchronous, caller thread), disk (serial, background), download
//! (bounded concurrency, background), delivery (single-threaded, client
//! callbacks only) — kept as a trait so tests can substitute a deterministic
//! step-driven fake.

mod fake;
mod production;

pub use fake::FakeOperationRunner;
pub use production::ProductionRunner;

/// Type-erased unit of work queued on a lane. Lanes execute these via
/// `tokio::task::spawn_blocking` (disk, download) since disk I/O and
/// `Provider::download` are blocking calls, not futures.
pub(crate) type Job = Box<dyn FnOnce() + Send + 'static>;

/// The four submission targets an embedder's pipeline dispatches work to.
///
/// All methods return immediately — queuing, not executing, is the
/// synchronous part. Implementations must be cheap to `Clone` (the façade
/// clones its runner into every spawned job) and safe to share across
/// threads.
pub trait OperationRunner: Clone + Send + Sync + 'static {
    /// Run `job` synchronously, on the caller's own thread. Used only for
    /// memory-cache probes — the fast path must never touch disk.
    fn run_fast<F: FnOnce() + Send + 'static>(&self, job: F) {
        job();
    }

    /// Queue `job` on the single serial disk worker. FIFO by default.
    fn submit_disk<F: FnOnce() + Send + 'static>(&self, job: F);

    /// Queue `job` on the bounded-concurrency download pool. Ordering
    /// follows a FIFO/deferred-cohort split, until
    /// [`OperationRunner::mark_downloads_deferred`] re-tags the pending
    /// cohort.
    fn submit_download<F: FnOnce() + Send + 'static>(&self, job: F);

    /// Queue `job` on the single delivery lane. FIFO; this is the only lane
    /// that invokes client callbacks.
    fn submit_delivery<F: FnOnce() + Send + 'static>(&self, job: F);

    /// Re-tag every job currently pending (not yet dispatched) on the
    /// download lane as "deferred", so future submissions run first.
    /// Idempotent only in the sense that repeated calls simply rebrand the
    /// current cohort as deferred again.
    fn mark_downloads_deferred(&self);
}
