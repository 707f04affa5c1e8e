//! Deterministic, step-driven test double for [`super::OperationRunner`].
//!
//! Modeled on `PLImageMangerOpRunnerFake`
//! (`original_source/PLImageManager/PLImageManagerSpecs/Fakes/PLImageMangerOpRunnerFake.h`):
//! jobs queue up instead of running on spawn, and a test advances each lane
//! one job at a time via `step_*`, asserting on exact ordering without
//! sleeps or `tokio::time::pause`.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{Job, OperationRunner};

#[derive(Default)]
struct Lanes {
    disk: VecDeque<Job>,
    download_current: VecDeque<Job>,
    download_deferred: VecDeque<Job>,
    delivery: VecDeque<Job>,
}

/// A runner whose lanes never execute on their own. Call `step_disk`,
/// `step_download`, or `step_delivery` to run exactly one queued job per
/// call; `run_fast` still executes inline, matching the real runner — the
/// fast path is always synchronous.
#[derive(Clone, Default)]
pub struct FakeOperationRunner {
    lanes: Arc<Mutex<Lanes>>,
}

impl FakeOperationRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run the oldest queued disk job, if any. Returns whether one ran.
    pub fn step_disk(&self) -> bool {
        let job = self.lanes.lock().disk.pop_front();
        match job {
            Some(job) => {
                job();
                true
            }
            None => false,
        }
    }

    /// Run the oldest queued download job, preferring the current cohort
    /// over the deferred one. Returns whether one ran.
    pub fn step_download(&self) -> bool {
        let job = {
            let mut lanes = self.lanes.lock();
            lanes
                .download_current
                .pop_front()
                .or_else(|| lanes.download_deferred.pop_front())
        };
        match job {
            Some(job) => {
                job();
                true
            }
            None => false,
        }
    }

    /// Run the oldest queued delivery job, if any. Returns whether one ran.
    pub fn step_delivery(&self) -> bool {
        let job = self.lanes.lock().delivery.pop_front();
        match job {
            Some(job) => {
                job();
                true
            }
            None => false,
        }
    }

    /// Number of jobs waiting on the disk lane.
    pub fn pending_disk(&self) -> usize {
        self.lanes.lock().disk.len()
    }

    /// Number of jobs waiting on the download lane, both cohorts combined.
    pub fn pending_download(&self) -> usize {
        let lanes = self.lanes.lock();
        lanes.download_current.len() + lanes.download_deferred.len()
    }

    /// Number of jobs waiting on the delivery lane.
    pub fn pending_delivery(&self) -> usize {
        self.lanes.lock().delivery.len()
    }
}

impl OperationRunner for FakeOperationRunner {
    fn submit_disk<F: FnOnce() + Send + 'static>(&self, job: F) {
        self.lanes.lock().disk.push_back(Box::new(job));
    }

    fn submit_download<F: FnOnce() + Send + 'static>(&self, job: F) {
        self.lanes.lock().download_current.push_back(Box::new(job));
    }

    fn submit_delivery<F: FnOnce() + Send + 'static>(&self, job: F) {
        self.lanes.lock().delivery.push_back(Box::new(job));
    }

    fn mark_downloads_deferred(&self) {
        let mut lanes = self.lanes.lock();
        let moved: Vec<Job> = lanes.download_current.drain(..).collect();
        lanes.download_deferred.extend(moved);
    }
}
