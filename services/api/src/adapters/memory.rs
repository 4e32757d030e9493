//! services/api/src/adapters/memory.rs
//!
//! In-process document store implementing every store port of the `core` crate.
//! Subscribers receive the full current snapshot when they subscribe and again,
//! synchronously, after every write.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

use school_ops_core::domain::{AeeEnrollment, Appointment, AttendanceEvent, RosterMember};
use school_ops_core::ports::{
    AeeStore, AppointmentStore, AttendanceSource, PortError, PortResult, RosterSource,
    SnapshotCallback, Subscription,
};

use crate::error::ApiError;

//=========================================================================================
// A Single Observable Collection
//=========================================================================================

struct Listener<T> {
    key: u64,
    /// Restricts the pushed snapshot (e.g. one day of events).
    scope: Option<String>,
    callback: Arc<SnapshotCallback<T>>,
}

impl<T> Clone for Listener<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key,
            scope: self.scope.clone(),
            callback: self.callback.clone(),
        }
    }
}

struct Collection<T> {
    name: &'static str,
    rows: RwLock<Vec<T>>,
    listeners: Arc<Mutex<Vec<Listener<T>>>>,
    /// Held while a snapshot is built and delivered, so deliveries never reorder.
    delivery: Mutex<()>,
    next_key: AtomicU64,
    in_scope: fn(&T, &str) -> bool,
}

impl<T: Clone + Send + Sync + 'static> Collection<T> {
    fn new(name: &'static str, in_scope: fn(&T, &str) -> bool) -> Self {
        Self {
            name,
            rows: RwLock::new(Vec::new()),
            listeners: Arc::new(Mutex::new(Vec::new())),
            delivery: Mutex::new(()),
            next_key: AtomicU64::new(1),
            in_scope,
        }
    }

    fn view(&self, scope: Option<&str>) -> Vec<T> {
        let rows = self.rows.read();
        match scope {
            Some(scope) => rows
                .iter()
                .filter(|row| (self.in_scope)(row, scope))
                .cloned()
                .collect(),
            None => rows.clone(),
        }
    }

    fn subscribe(&self, scope: Option<&str>, callback: SnapshotCallback<T>) -> Subscription {
        let callback = Arc::new(callback);
        // Registering under the delivery lock means no write can land between the
        // initial snapshot and the first published one.
        let _delivery = self.delivery.lock();
        callback(self.view(scope));

        let key = self.next_key.fetch_add(1, Ordering::Relaxed);
        self.listeners.lock().push(Listener {
            key,
            scope: scope.map(str::to_string),
            callback,
        });
        debug!(collection = self.name, key, "subscribed");

        let listeners = self.listeners.clone();
        let name = self.name;
        Subscription::new(move || {
            listeners.lock().retain(|l| l.key != key);
            debug!(collection = name, key, "unsubscribed");
        })
    }

    /// Pushes fresh snapshots to every listener.
    ///
    /// Only the delivery lock is held while callbacks run: each snapshot is read
    /// after the previous delivery finished, so the last one a listener receives
    /// always reflects the latest write. Callbacks must not write to the store.
    fn publish(&self) {
        let _delivery = self.delivery.lock();
        let listeners = self.listeners.lock().clone();
        for listener in listeners {
            (listener.callback)(self.view(listener.scope.as_deref()));
        }
    }

    fn insert(&self, row: T) {
        self.rows.write().push(row);
        self.publish();
    }

    fn replace_all(&self, rows: Vec<T>) {
        *self.rows.write() = rows;
        self.publish();
    }

    /// Returns whether anything was removed.
    fn remove_where(&self, mut matches: impl FnMut(&T) -> bool) -> bool {
        let removed = {
            let mut rows = self.rows.write();
            let before = rows.len();
            rows.retain(|row| !matches(row));
            rows.len() != before
        };
        if removed {
            self.publish();
        }
        removed
    }

    fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }
}

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// Shape of the optional seed file.
#[derive(Debug, Default, Deserialize)]
pub struct Seed {
    #[serde(default)]
    pub roster: Vec<RosterMember>,
}

pub struct MemoryStore {
    roster: Collection<RosterMember>,
    events: Collection<AttendanceEvent>,
    appointments: Collection<Appointment>,
    aee: Collection<AeeEnrollment>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            roster: Collection::new("roster", |_, _| true),
            events: Collection::new("attendance_events", |e: &AttendanceEvent, day| e.day == day),
            appointments: Collection::new("appointments", |_, _| true),
            aee: Collection::new("aee_enrollments", |_, _| true),
        }
    }

    /// Creates a store pre-loaded from a JSON seed file.
    pub fn from_seed_file(path: &Path) -> Result<Self, ApiError> {
        let raw = std::fs::read_to_string(path)?;
        let seed: Seed = serde_json::from_str(&raw).map_err(|e| {
            ApiError::Internal(format!("Invalid seed file {}: {}", path.display(), e))
        })?;
        let store = Self::new();
        info!(members = seed.roster.len(), path = %path.display(), "roster seeded");
        store.replace_roster(seed.roster);
        Ok(store)
    }

    /// Replaces the whole roster, as an external roster sync would.
    pub fn replace_roster(&self, members: Vec<RosterMember>) {
        self.roster.replace_all(members);
    }

    /// Live subscriptions across all collections.
    pub fn subscriber_count(&self) -> usize {
        self.roster.listener_count()
            + self.events.listener_count()
            + self.appointments.listener_count()
            + self.aee.listener_count()
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

//=========================================================================================
// Port Implementations
//=========================================================================================

impl RosterSource for MemoryStore {
    fn subscribe_roster(&self, on_update: SnapshotCallback<RosterMember>) -> Subscription {
        self.roster.subscribe(None, on_update)
    }
}

#[async_trait]
impl AttendanceSource for MemoryStore {
    fn subscribe_events(
        &self,
        day: &str,
        on_update: SnapshotCallback<AttendanceEvent>,
    ) -> Subscription {
        self.events.subscribe(Some(day), on_update)
    }

    async fn record_event(&self, mut event: AttendanceEvent) -> PortResult<AttendanceEvent> {
        event.id = new_id();
        self.events.insert(event.clone());
        Ok(event)
    }
}

#[async_trait]
impl AppointmentStore for MemoryStore {
    async fn create(&self, mut appointment: Appointment) -> PortResult<Appointment> {
        if appointment.is_persisted() {
            return Err(PortError::Unexpected(format!(
                "Appointment {} is already persisted",
                appointment.id
            )));
        }
        appointment.id = new_id();
        self.appointments.insert(appointment.clone());
        Ok(appointment)
    }

    async fn remove(&self, id: &str) -> PortResult<()> {
        if self.appointments.remove_where(|a| a.id == id) {
            Ok(())
        } else {
            Err(PortError::NotFound(format!("Appointment {} not found", id)))
        }
    }

    fn subscribe_all(&self, on_update: SnapshotCallback<Appointment>) -> Subscription {
        self.appointments.subscribe(None, on_update)
    }
}

#[async_trait]
impl AeeStore for MemoryStore {
    async fn enroll(&self, mut enrollment: AeeEnrollment) -> PortResult<AeeEnrollment> {
        enrollment.id = new_id();
        self.aee.insert(enrollment.clone());
        Ok(enrollment)
    }

    async fn withdraw(&self, id: &str) -> PortResult<()> {
        if self.aee.remove_where(|e| e.id == id) {
            Ok(())
        } else {
            Err(PortError::NotFound(format!("AEE enrollment {} not found", id)))
        }
    }

    fn subscribe_all(&self, on_update: SnapshotCallback<AeeEnrollment>) -> Subscription {
        self.aee.subscribe(None, on_update)
    }
}
