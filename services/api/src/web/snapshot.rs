//! services/api/src/web/snapshot.rs
//!
//! Request handlers need a single snapshot rather than a live feed. This helper
//! subscribes, waits for the first push, and releases the subscription.

use std::time::Duration;

use parking_lot::Mutex;
use school_ops_core::{PortError, PortResult, SnapshotCallback, Subscription};
use tokio::sync::oneshot;

/// Waits up to `timeout` for the first snapshot delivered through `subscribe`.
pub async fn first_snapshot<T, F>(timeout: Duration, subscribe: F) -> PortResult<Vec<T>>
where
    T: Send + 'static,
    F: FnOnce(SnapshotCallback<T>) -> Subscription,
{
    let (tx, rx) = oneshot::channel();
    let slot = Mutex::new(Some(tx));
    let subscription = subscribe(Box::new(move |rows: Vec<T>| {
        let sender = slot.lock().take();
        if let Some(sender) = sender {
            // The receiver is gone only if the request already timed out.
            let _ = sender.send(rows);
        }
    }));

    let received = tokio::time::timeout(timeout, rx).await;
    subscription.unsubscribe();

    match received {
        Ok(Ok(rows)) => Ok(rows),
        Ok(Err(_)) => Err(PortError::Unexpected(
            "Subscription closed before delivering a snapshot".to_string(),
        )),
        Err(_) => Err(PortError::Unexpected(format!(
            "No snapshot received within {} ms",
            timeout.as_millis()
        ))),
    }
}
