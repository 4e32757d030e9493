//! crates/school_ops_core/src/ports.rs
//!
//! Defines the collaborator contracts (traits) the core depends on.
//! Persistence and change notification live behind these ports so the core can be
//! exercised without a live document store.

use async_trait::async_trait;

use crate::domain::{AeeEnrollment, Appointment, AttendanceEvent, RosterMember};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// Failure reported by a store adapter. The core never interprets these; it hands
/// them back to the caller unchanged.
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Permission denied: {0}")]
    PermissionDenied(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Subscriptions
//=========================================================================================

/// Callback receiving a full snapshot (never a delta) of a collection.
pub type SnapshotCallback<T> = Box<dyn Fn(Vec<T>) + Send + Sync + 'static>;

/// Handle for a live change subscription.
///
/// The owner must release it when the consuming view is torn down, either through
/// [`Subscription::unsubscribe`] or by dropping it; until then the store keeps
/// invoking the callback.
#[must_use = "dropping a Subscription cancels it immediately"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send + 'static>>,
}

impl Subscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    /// A handle with nothing to release.
    pub fn noop() -> Self {
        Self { cancel: None }
    }

    pub fn unsubscribe(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

pub trait RosterSource: Send + Sync {
    /// Pushes the whole roster now and again after every change.
    fn subscribe_roster(&self, on_update: SnapshotCallback<RosterMember>) -> Subscription;
}

#[async_trait]
pub trait AttendanceSource: Send + Sync {
    /// Pushes every event recorded for `day` (`YYYY-MM-DD`) now and after every change.
    fn subscribe_events(
        &self,
        day: &str,
        on_update: SnapshotCallback<AttendanceEvent>,
    ) -> Subscription;

    /// Appends an event. The store assigns the identifier.
    async fn record_event(&self, event: AttendanceEvent) -> PortResult<AttendanceEvent>;
}

#[async_trait]
pub trait AppointmentStore: Send + Sync {
    /// Persists an appointment whose `id` is empty and returns it with the assigned id.
    async fn create(&self, appointment: Appointment) -> PortResult<Appointment>;

    /// Removes an appointment. May report `NotFound` for an unknown id.
    async fn remove(&self, id: &str) -> PortResult<()>;

    fn subscribe_all(&self, on_update: SnapshotCallback<Appointment>) -> Subscription;
}

#[async_trait]
pub trait AeeStore: Send + Sync {
    async fn enroll(&self, enrollment: AeeEnrollment) -> PortResult<AeeEnrollment>;

    async fn withdraw(&self, id: &str) -> PortResult<()>;

    fn subscribe_all(&self, on_update: SnapshotCallback<AeeEnrollment>) -> Subscription;
}
