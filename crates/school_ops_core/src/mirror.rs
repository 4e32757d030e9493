//! crates/school_ops_core/src/mirror.rs
//!
//! Local read-only copy of a store collection, kept current by a subscription.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock, RwLockReadGuard};
use tracing::debug;

use crate::ports::{SnapshotCallback, Subscription};

pub(crate) struct Mirror<T> {
    latest: Arc<RwLock<Vec<T>>>,
    subscription: Mutex<Option<Subscription>>,
}

impl<T: Send + Sync + 'static> Mirror<T> {
    /// Opens the subscription. Each pushed snapshot replaces the previous one wholesale.
    pub(crate) fn attach(
        collection: &'static str,
        subscribe: impl FnOnce(SnapshotCallback<T>) -> Subscription,
    ) -> Self {
        let latest = Arc::new(RwLock::new(Vec::new()));
        let sink = latest.clone();
        let subscription = subscribe(Box::new(move |snapshot: Vec<T>| {
            debug!(collection, count = snapshot.len(), "snapshot received");
            *sink.write() = snapshot;
        }));
        Self {
            latest,
            subscription: Mutex::new(Some(subscription)),
        }
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, Vec<T>> {
        self.latest.read()
    }

    pub(crate) fn close(&self) {
        let subscription = self.subscription.lock().take();
        if let Some(subscription) = subscription {
            subscription.unsubscribe();
        }
    }
}
