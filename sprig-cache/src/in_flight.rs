//! Tracker of pending children fetches.
//!
//! Each parent id maps to at most one [`InFlightEntry`]. The entry's future is
//! `Shared`, so any number of callers can await the same fetch and observe the
//! same outcome.

use futures_util::future::{BoxFuture, Shared};
use sprig_core::{CacheResult, ChildrenPage, NodeId};
use std::collections::HashMap;
use std::sync::Arc;

pub(crate) type SharedFetch = Shared<BoxFuture<'static, CacheResult<Arc<ChildrenPage>>>>;

pub(crate) struct InFlightEntry {
    /// Identifies the fetch that created the entry so a superseded fetch
    /// cannot remove its successor's marker.
    pub(crate) ticket: u64,
    pub(crate) fetch: SharedFetch,
}

#[derive(Default)]
pub(crate) struct InFlightTracker {
    entries: HashMap<NodeId, InFlightEntry>,
}

impl InFlightTracker {
    /// Shared fetch for `parent_id` if one is pending. Entries outlive
    /// `clear_content_caches`; only the fetch's write-back is dropped.
    pub(crate) fn joinable(&self, parent_id: &NodeId) -> Option<SharedFetch> {
        self.entries.get(parent_id).map(|entry| entry.fetch.clone())
    }

    /// Register a fetch for a parent with no pending entry.
    pub(crate) fn insert(&mut self, parent_id: NodeId, entry: InFlightEntry) {
        self.entries.insert(parent_id, entry);
    }

    /// Remove the entry for `parent_id` if it still belongs to `ticket`.
    pub(crate) fn settle(&mut self, parent_id: &NodeId, ticket: u64) -> bool {
        match self.entries.get(parent_id) {
            Some(entry) if entry.ticket == ticket => {
                self.entries.remove(parent_id);
                true
            }
            _ => false,
        }
    }

    pub(crate) fn contains(&self, parent_id: &NodeId) -> bool {
        self.entries.contains_key(parent_id)
    }

    pub(crate) fn keys(&self) -> Vec<NodeId> {
        self.entries.keys().cloned().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::FutureExt;

    fn ready_fetch(parent: &str) -> SharedFetch {
        let page = Arc::new(ChildrenPage::empty(NodeId::from(parent)));
        async move { Ok(page) }.boxed().shared()
    }

    fn entry(ticket: u64) -> InFlightEntry {
        InFlightEntry {
            ticket,
            fetch: ready_fetch("bundle-1"),
        }
    }

    #[test]
    fn test_joinable_is_keyed_by_parent() {
        let mut tracker = InFlightTracker::default();
        let parent = NodeId::from("bundle-1");
        tracker.insert(parent.clone(), entry(1));

        assert!(tracker.joinable(&parent).is_some());
        assert!(tracker.joinable(&NodeId::from("bundle-2")).is_none());
    }

    #[test]
    fn test_settle_ignores_superseded_ticket() {
        let mut tracker = InFlightTracker::default();
        let parent = NodeId::from("bundle-1");
        tracker.insert(parent.clone(), entry(1));
        // reset empties the tracker, so a later fetch can claim the same key
        // while the earlier task is still running.
        tracker.clear();
        tracker.insert(parent.clone(), entry(2));

        assert!(!tracker.settle(&parent, 1));
        assert!(tracker.contains(&parent));
        assert!(tracker.settle(&parent, 2));
        assert_eq!(tracker.len(), 0);
    }

    #[tokio::test]
    async fn test_joiners_share_one_outcome() {
        let fetch = ready_fetch("bundle-3");
        let (a, b) = tokio::join!(fetch.clone(), fetch);
        let (a, b) = (a.unwrap(), b.unwrap());
        assert!(Arc::ptr_eq(&a, &b));
    }
}
