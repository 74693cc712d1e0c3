//! Age-ordered flow cache.
//!
//! The cache is two maps over the same set of flows: the primary map keyed
//! by [`FlowKey`] answers per-packet lookups, and a secondary index keyed
//! by [`AgeKey`] keeps the flows in age order so the oldest entry can be
//! found in logarithmic time for eviction and oldest-first export.

use std::collections::BTreeMap;

use crate::flow::{AgeKey, FlowKey, FlowRecord};

#[derive(Debug, Default)]
pub struct FlowCache {
    records: BTreeMap<FlowKey, FlowRecord>,
    age: BTreeMap<AgeKey, FlowKey>,
}

impl FlowCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn contains(&self, key: &FlowKey) -> bool {
        self.records.contains_key(key)
    }

    pub fn lookup(&self, key: &FlowKey) -> Option<&FlowRecord> {
        self.records.get(key)
    }

    /// Mutable lookup for per-packet updates. Callers only ever touch the
    /// counters, flags and `last` timestamp; `first` and `cache_id` are
    /// fixed at insertion, so the age index cannot go stale.
    pub fn lookup_mut(&mut self, key: &FlowKey) -> Option<&mut FlowRecord> {
        self.records.get_mut(key)
    }

    /// Insert a freshly opened flow. The key must not be present; the
    /// aggregator mutates existing records instead of re-inserting them.
    pub fn insert(&mut self, record: FlowRecord) {
        let age_key = record.age_key();
        let key = record.key;
        let previous = self.records.insert(key, record);
        debug_assert!(previous.is_none(), "flow inserted over a live key");
        self.age.insert(age_key, key);
    }

    /// Remove a flow by key. No-op when the key is absent.
    pub fn remove(&mut self, key: &FlowKey) -> Option<FlowRecord> {
        let record = self.records.remove(key)?;
        self.age.remove(&record.age_key());
        Some(record)
    }

    /// The entry minimal under age order.
    pub fn find_oldest(&self) -> Option<&FlowRecord> {
        let (_, key) = self.age.first_key_value()?;
        self.records.get(key)
    }

    /// Remove and return the oldest entry.
    pub fn pop_oldest(&mut self) -> Option<FlowRecord> {
        let (_, key) = self.age.pop_first()?;
        self.records.remove(&key)
    }

    /// Empty the cache oldest-first, handing every record to `sink`.
    pub fn drain_oldest_first(&mut self, mut sink: impl FnMut(FlowRecord)) {
        while let Some(record) = self.pop_oldest() {
            sink(record);
        }
    }

    /// Iterate the live records in key order.
    pub fn values(&self) -> impl Iterator<Item = &FlowRecord> {
        self.records.values()
    }
}
