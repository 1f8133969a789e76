//! # SubscriberSet: ordered, identity-unique subscriber membership.
//!
//! [`SubscriberSet`] is the shared membership list of one event. It is mutated by
//! subscribe/unsubscribe/dispose and read by dispatch through snapshots.
//!
//! ## Rules
//! - **Identity-unique**: the same `Arc<Subscription>` is never stored twice.
//! - **Insertion order** is preserved (sequential dispatch relies on it).
//! - **Snapshots**: dispatch iterates over a cloned `Vec<Arc<_>>`, so concurrent
//!   add/remove never affects an in-flight notification.
//! - The single-subscriber check and the insert happen under one write lock.

use std::sync::Arc;

use tokio::sync::RwLock;

use super::subscription::Subscription;

/// Outcome of [`SubscriberSet::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Insert {
    /// Added as a new member.
    Added,
    /// Already a member; nothing changed.
    Duplicate,
    /// Rejected: only one subscriber allowed and the set is not empty.
    Rejected,
}

/// Subscriber membership of one event.
pub(crate) struct SubscriberSet<P: Send + Sync + 'static> {
    subs: RwLock<Vec<Arc<Subscription<P>>>>,
}

impl<P: Send + Sync + 'static> SubscriberSet<P> {
    /// Creates an empty set.
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            subs: RwLock::new(Vec::new()),
        })
    }

    /// Adds `sub` unless it is already present or the single-subscriber rule rejects it.
    pub(crate) async fn insert(&self, sub: Arc<Subscription<P>>, allow_multiple: bool) -> Insert {
        let mut subs = self.subs.write().await;
        if subs.iter().any(|s| Arc::ptr_eq(s, &sub)) {
            return Insert::Duplicate;
        }
        if !allow_multiple && !subs.is_empty() {
            return Insert::Rejected;
        }
        subs.push(sub);
        Insert::Added
    }

    /// Removes `sub` by identity. Returns `true` if it was a member.
    pub(crate) async fn remove(&self, sub: &Subscription<P>) -> bool {
        let mut subs = self.subs.write().await;
        match subs.iter().position(|s| std::ptr::eq(Arc::as_ptr(s), sub)) {
            Some(idx) => {
                subs.remove(idx);
                true
            }
            None => false,
        }
    }

    /// True if `sub` is a member.
    pub(crate) async fn contains(&self, sub: &Subscription<P>) -> bool {
        self.subs
            .read()
            .await
            .iter()
            .any(|s| std::ptr::eq(Arc::as_ptr(s), sub))
    }

    /// Stable copy of the current members, in insertion order.
    pub(crate) async fn snapshot(&self) -> Vec<Arc<Subscription<P>>> {
        self.subs.read().await.clone()
    }

    /// Removes and returns all members.
    pub(crate) async fn drain(&self) -> Vec<Arc<Subscription<P>>> {
        std::mem::take(&mut *self.subs.write().await)
    }

    /// Number of members.
    pub(crate) async fn len(&self) -> usize {
        self.subs.read().await.len()
    }

    /// True if there are no members.
    pub(crate) async fn is_empty(&self) -> bool {
        self.subs.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventCall;
    use crate::subscribers::SubscriptionRequest;

    fn sub_for(set: &Arc<SubscriberSet<()>>) -> Arc<Subscription<()>> {
        Subscription::new(
            SubscriptionRequest::new(|_c: Arc<EventCall<()>>| async { Ok(()) }),
            Arc::downgrade(set),
        )
    }

    #[tokio::test]
    async fn test_insert_is_identity_unique_and_ordered() {
        let set = SubscriberSet::new();
        let a = sub_for(&set);
        let b = sub_for(&set);

        assert_eq!(set.insert(a.clone(), true).await, Insert::Added);
        assert_eq!(set.insert(b.clone(), true).await, Insert::Added);
        assert_eq!(set.insert(a.clone(), true).await, Insert::Duplicate);

        let ids: Vec<_> = set.snapshot().await.iter().map(|s| s.id()).collect();
        assert_eq!(ids, vec![a.id(), b.id()]);
    }

    #[tokio::test]
    async fn test_single_subscriber_rule() {
        let set = SubscriberSet::new();
        assert_eq!(set.insert(sub_for(&set), false).await, Insert::Added);
        assert_eq!(set.insert(sub_for(&set), false).await, Insert::Rejected);
        assert_eq!(set.len().await, 1);
    }

    #[tokio::test]
    async fn test_snapshot_is_stable_across_removal() {
        let set = SubscriberSet::new();
        let a = sub_for(&set);
        set.insert(a.clone(), true).await;

        let snap = set.snapshot().await;
        assert!(set.remove(&a).await);
        assert!(!set.remove(&a).await);

        assert_eq!(snap.len(), 1);
        assert!(set.is_empty().await);
        assert!(!set.contains(&a).await);
    }

    #[tokio::test]
    async fn test_dispose_detaches_from_set() {
        let set = SubscriberSet::new();
        let a = sub_for(&set);
        set.insert(a.clone(), true).await;

        a.dispose().await;
        assert!(set.is_empty().await);
    }
}
