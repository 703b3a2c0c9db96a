//! Log Collection - typed keyed store with a pluggable mutation policy
//!
//! Each run owns three collections: params and datasets use [`Upsert`]
//! (re-logging a key replaces the entry in place), metrics use [`Append`]
//! (every put is a new record, lookups see the most recent one).

use std::marker::PhantomData;

use rustc_hash::FxHashMap;

use super::{DatasetRecord, LogKind, MetricRecord, ParamRecord};
use crate::{Error, Result};

/// An entry that can live in a [`LogCollection`].
pub trait Keyed {
    /// Collection key of the entry.
    fn key(&self) -> &str;
}

impl Keyed for ParamRecord {
    fn key(&self) -> &str {
        self.name()
    }
}

impl Keyed for MetricRecord {
    fn key(&self) -> &str {
        self.name()
    }
}

impl Keyed for DatasetRecord {
    fn key(&self) -> &str {
        self.name()
    }
}

/// How `put` treats an existing entry with the same key.
pub trait MutationPolicy {
    /// Slot to overwrite given the slot currently indexed for the key,
    /// or `None` to append a new record.
    fn slot(existing: Option<usize>) -> Option<usize>;
}

/// Last-write-wins, one entry per key, position of first insertion kept.
#[derive(Debug, Clone, Copy)]
pub struct Upsert;

/// Every put appends; the key index tracks the most recent record.
#[derive(Debug, Clone, Copy)]
pub struct Append;

impl MutationPolicy for Upsert {
    fn slot(existing: Option<usize>) -> Option<usize> {
        existing
    }
}

impl MutationPolicy for Append {
    fn slot(_existing: Option<usize>) -> Option<usize> {
        None
    }
}

/// Ordered, keyed store of one log kind.
#[derive(Debug, Clone)]
pub struct LogCollection<E, P> {
    kind: LogKind,
    entries: Vec<E>,
    index: FxHashMap<String, usize>,
    _policy: PhantomData<P>,
}

impl<E: Keyed, P: MutationPolicy> LogCollection<E, P> {
    /// Create an empty collection for `kind`.
    #[must_use]
    pub fn new(kind: LogKind) -> Self {
        Self {
            kind,
            entries: Vec::new(),
            index: FxHashMap::default(),
            _policy: PhantomData,
        }
    }

    /// Insert an entry according to the collection's policy.
    pub fn put(&mut self, entry: E) {
        let existing = self.index.get(entry.key()).copied();
        match P::slot(existing) {
            Some(slot) => self.entries[slot] = entry,
            None => {
                self.index.insert(entry.key().to_string(), self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    /// Current entry for `key` (the most recent one for append collections).
    ///
    /// # Errors
    ///
    /// Returns `Error::NotFound` if no entry has this key.
    pub fn get(&self, key: &str) -> Result<&E> {
        self.index
            .get(key)
            .map(|&slot| &self.entries[slot])
            .ok_or_else(|| Error::not_found(self.kind.as_str(), key))
    }

    /// Number of stored records.
    #[must_use]
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Check if the collection is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Records in insertion order.
    pub fn iter(&self) -> std::slice::Iter<'_, E> {
        self.entries.iter()
    }

    /// Kind of log this collection holds.
    #[must_use]
    pub const fn kind(&self) -> LogKind {
        self.kind
    }
}

impl<'a, E: Keyed, P: MutationPolicy> IntoIterator for &'a LogCollection<E, P> {
    type Item = &'a E;
    type IntoIter = std::slice::Iter<'a, E>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Params collection.
pub type ParamCollection = LogCollection<ParamRecord, Upsert>;
/// Metrics collection.
pub type MetricCollection = LogCollection<MetricRecord, Append>;
/// Datasets collection.
pub type DatasetCollection = LogCollection<DatasetRecord, Upsert>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upsert_overwrites_in_place() {
        let mut params = ParamCollection::new(LogKind::Params);
        params.put(ParamRecord::new("input1", 5.75));
        params.put(ParamRecord::new("other", 1));
        params.put(ParamRecord::new("input1", 500));

        assert_eq!(params.count(), 2);
        assert_eq!(params.get("input1").unwrap().value().as_f64(), Some(500.0));
        let names: Vec<&str> = params.iter().map(ParamRecord::name).collect();
        assert_eq!(names, vec!["input1", "other"]);
    }

    #[test]
    fn test_append_keeps_every_record() {
        let mut metrics = MetricCollection::new(LogKind::Metrics);
        metrics.put(MetricRecord::new("loss", 1.0, 0, "0"));
        metrics.put(MetricRecord::new("loss", 0.5, 0, "0"));
        metrics.put(MetricRecord::new("acc", 0.9, 0, "0"));

        assert_eq!(metrics.count(), 3);
        assert!((metrics.get("loss").unwrap().value() - 0.5).abs() < f64::EPSILON);
        let values: Vec<f64> = metrics.iter().map(MetricRecord::value).collect();
        assert_eq!(values, vec![1.0, 0.5, 0.9]);
    }

    #[test]
    fn test_get_missing_is_not_found() {
        let params = ParamCollection::new(LogKind::Params);
        let err = params.get("nope").unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("params"));

        let metrics = MetricCollection::new(LogKind::Metrics);
        assert!(metrics.get("").unwrap_err().is_not_found());
    }

    #[test]
    fn test_iteration_is_replayable() {
        let mut metrics = MetricCollection::new(LogKind::Metrics);
        for step in 0..5 {
            metrics.put(MetricRecord::new("loss", 1.0, step, "0"));
        }
        let first: Vec<i64> = metrics.iter().map(MetricRecord::step).collect();
        let second: Vec<i64> = (&metrics).into_iter().map(MetricRecord::step).collect();
        assert_eq!(first, second);
    }
}
