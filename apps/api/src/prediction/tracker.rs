//! Diagnostic request tracking.
//!
//! Nothing here influences a score. The tracker remembers which description
//! hash each job id was last seen with (and the reverse), which job ids are
//! currently being scored, and the job id of the previous request, so that
//! duplicate postings and suspected state leaks show up in the logs.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::{Mutex, MutexGuard, PoisonError};

use lru::LruCache;
use tracing::{debug, warn};

const DEFAULT_CAPACITY: usize = 1024;

struct TrackerState {
    hash_by_job: LruCache<String, String>,
    job_by_hash: LruCache<String, String>,
    in_flight: HashMap<String, usize>,
    previous_job_id: Option<String>,
}

pub struct RequestTracker {
    state: Mutex<TrackerState>,
}

/// Marks one prediction as in flight until dropped.
pub struct TrackedRequest<'a> {
    tracker: &'a RequestTracker,
    job_id: String,
    /// Another job id last seen with the same description hash.
    pub duplicate_of: Option<String>,
    /// Same job id as the previous request while an earlier call is still running.
    pub state_leak_suspected: bool,
}

impl Default for RequestTracker {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl RequestTracker {
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            state: Mutex::new(TrackerState {
                hash_by_job: LruCache::new(capacity),
                job_by_hash: LruCache::new(capacity),
                in_flight: HashMap::new(),
                previous_job_id: None,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn begin(&self, job_id: &str, description_hash: &str) -> TrackedRequest<'_> {
        let mut state = self.lock();

        if let Some(previous_hash) = state.hash_by_job.get(job_id) {
            if previous_hash != description_hash {
                debug!(
                    job_id,
                    previous_hash = %previous_hash,
                    description_hash,
                    "Job description hash changed since last request"
                );
            }
        }

        let duplicate_of = state
            .job_by_hash
            .get(description_hash)
            .filter(|other| other.as_str() != job_id)
            .cloned();
        if let Some(other_job_id) = &duplicate_of {
            warn!(
                job_id,
                other_job_id = %other_job_id,
                description_hash,
                "Duplicate job description: identical hash seen for a different job id"
            );
        }

        state
            .hash_by_job
            .put(job_id.to_string(), description_hash.to_string());
        state
            .job_by_hash
            .put(description_hash.to_string(), job_id.to_string());

        let overlapping = state.in_flight.get(job_id).copied().unwrap_or(0) > 0;
        let state_leak_suspected =
            overlapping && state.previous_job_id.as_deref() == Some(job_id);
        if state_leak_suspected {
            warn!(
                job_id,
                in_flight = state.in_flight.get(job_id).copied().unwrap_or(0),
                "Possible state leak: job id matches previous request while still in flight"
            );
        }

        *state.in_flight.entry(job_id.to_string()).or_insert(0) += 1;
        state.previous_job_id = Some(job_id.to_string());

        TrackedRequest {
            tracker: self,
            job_id: job_id.to_string(),
            duplicate_of,
            state_leak_suspected,
        }
    }

    #[cfg(test)]
    pub fn in_flight(&self, job_id: &str) -> usize {
        self.lock().in_flight.get(job_id).copied().unwrap_or(0)
    }

    #[cfg(test)]
    pub fn previous_job_id(&self) -> Option<String> {
        self.lock().previous_job_id.clone()
    }

    fn finish(&self, job_id: &str) {
        let mut state = self.lock();
        if let Some(count) = state.in_flight.get_mut(job_id) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                state.in_flight.remove(job_id);
            }
        }
    }
}

impl Drop for TrackedRequest<'_> {
    fn drop(&mut self) {
        self.tracker.finish(&self.job_id);
    }
}
