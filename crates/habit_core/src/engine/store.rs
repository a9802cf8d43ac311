//! Shared per-date progress store.
//!
//! # Responsibility
//! - Hold the session-wide `date -> ProgressRecord` map read by the month
//!   grid and written by day detail sessions.
//! - Notify subscribers synchronously on every publish.
//!
//! # Invariants
//! - Last write for a date wins.
//! - A publish is visible to `get` before `publish` returns.
//! - Subscribers run in registration order.

use crate::model::progress::{ProgressRecord, ProgressUpdate};
use chrono::NaiveDate;
use log::debug;
use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};

/// Write channel handed to detail sessions.
pub trait ProgressSink {
    fn publish(&mut self, update: ProgressUpdate);
}

/// Handle returned by [`ProgressStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Subscriber = Box<dyn FnMut(&ProgressUpdate) + Send>;

/// In-memory progress map owned by the top-level session.
#[derive(Default)]
pub struct ProgressStore {
    records: BTreeMap<NaiveDate, ProgressRecord>,
    subscribers: Vec<(SubscriptionId, Subscriber)>,
    next_subscription: u64,
}

impl ProgressStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, date: NaiveDate) -> Option<&ProgressRecord> {
        self.records.get(&date)
    }

    /// Stored percent for `date`, 0 when absent.
    pub fn percent_for(&self, date: NaiveDate) -> f64 {
        self.get(date).map_or(0.0, |record| record.percent)
    }

    /// Bulk-loads records from persistence without notifying subscribers.
    pub fn seed(&mut self, records: impl IntoIterator<Item = (NaiveDate, ProgressRecord)>) {
        self.records.extend(records);
    }

    /// Registers a callback invoked after every publish.
    pub fn subscribe(
        &mut self,
        callback: impl FnMut(&ProgressUpdate) + Send + 'static,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.subscribers.push((id, Box::new(callback)));
        id
    }

    /// Removes a subscriber. Returns `false` when `id` was not registered.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|(registered, _)| *registered != id);
        self.subscribers.len() != before
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in chronological order.
    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, &ProgressRecord)> {
        self.records.iter().map(|(date, record)| (*date, record))
    }
}

impl ProgressSink for ProgressStore {
    fn publish(&mut self, update: ProgressUpdate) {
        debug!(
            "event=progress_publish module=store status=ok date={} percent={:.2} completed={}",
            update.date,
            update.record.percent,
            update.record.completed_ids.len()
        );
        self.records.insert(update.date, update.record.clone());
        for (_, subscriber) in &mut self.subscribers {
            subscriber(&update);
        }
    }
}

impl Debug for ProgressStore {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressStore")
            .field("records", &self.records)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
