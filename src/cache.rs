//! Short-lived cache of loaded records, keyed on the load parameters.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::loader::{LoadParams, LoadedRecords};

#[derive(Debug)]
pub struct QueryCache {
    ttl: Duration,
    entries: HashMap<LoadParams, (Instant, LoadedRecords)>,
}

impl QueryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, params: &LoadParams) -> Option<&LoadedRecords> {
        self.get_at(params, Instant::now())
    }

    /// Entry for `params` if it was stored less than `ttl` before `now`.
    pub fn get_at(&self, params: &LoadParams, now: Instant) -> Option<&LoadedRecords> {
        match self.entries.get(params) {
            Some((stored, records)) if now.saturating_duration_since(*stored) < self.ttl => {
                debug!(status = %params.status, "query cache hit");
                Some(records)
            }
            _ => {
                debug!(status = %params.status, "query cache miss");
                None
            }
        }
    }

    pub fn insert(&mut self, params: LoadParams, records: LoadedRecords) {
        self.insert_at(params, records, Instant::now());
    }

    /// Store `records`, dropping every entry that has expired by `now`.
    pub fn insert_at(&mut self, params: LoadParams, records: LoadedRecords, now: Instant) {
        let ttl = self.ttl;
        self.entries
            .retain(|_, (stored, _)| now.saturating_duration_since(*stored) < ttl);
        self.entries.insert(params, (now, records));
    }

    pub fn invalidate(&mut self) {
        debug!(entries = self.entries.len(), "query cache cleared");
        self.entries.clear();
    }
}
