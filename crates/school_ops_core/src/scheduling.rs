//! crates/school_ops_core/src/scheduling.rs
//!
//! The Scheduling Controller: day listings, appointment creation and removal, and
//! month-grid navigation annotated with appointment counts.
//!
//! Listings are always read from the latest snapshot pushed by the store. A
//! successful `create` or `delete` does not patch local state; the change becomes
//! visible once the store's notification arrives, and a failed call leaves
//! everything exactly as it was.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{info, warn};

use crate::calendar::{build_month_grid, MonthCursor};
use crate::context::ConsoleContext;
use crate::domain::{Appointment, AppointmentDraft};
use crate::error::{require, require_date, require_time, CoreResult};
use crate::mirror::Mirror;
use crate::ports::{AppointmentStore, PortError};

/// Result of a delete request. Deleting an id the store no longer has is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteOutcome {
    Removed,
    AlreadyAbsent,
}

/// One cell of the month grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayCell {
    /// `None` for the leading placeholders.
    pub day: Option<u32>,
    pub date: Option<String>,
    pub appointments: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthView {
    pub cursor: MonthCursor,
    pub previous: MonthCursor,
    pub next: MonthCursor,
    pub cells: Vec<DayCell>,
}

pub struct SchedulingController {
    store: Arc<dyn AppointmentStore>,
    context: ConsoleContext,
    appointments: Mirror<Appointment>,
    displayed: Mutex<MonthCursor>,
}

impl SchedulingController {
    /// Subscribes to the store's appointment collection and starts on `month`.
    pub fn new(
        store: Arc<dyn AppointmentStore>,
        context: ConsoleContext,
        month: MonthCursor,
    ) -> Self {
        let appointments = Mirror::attach("appointments", |cb| store.subscribe_all(cb));
        Self {
            store,
            context,
            appointments,
            displayed: Mutex::new(month),
        }
    }

    /// Appointments on `date`, ordered by time. Ties keep store order.
    pub fn list_for_day(&self, date: &str) -> Vec<Appointment> {
        let mut day: Vec<Appointment> = self
            .appointments
            .read()
            .iter()
            .filter(|a| a.date == date)
            .cloned()
            .collect();
        // Zero-padded HH:MM sorts correctly as plain text.
        day.sort_by(|a, b| a.time.cmp(&b.time));
        day
    }

    /// Validates the draft and hands it to the store, which assigns the id.
    ///
    /// No conflict check: several appointments may share a date and a time.
    pub async fn create(&self, draft: AppointmentDraft) -> CoreResult<Appointment> {
        require("subject_id", &draft.subject_id)?;
        require_date("date", &draft.date)?;
        require_time("time", &draft.time)?;

        let unsaved = draft.into_unsaved(self.context.clock.now_millis());
        let saved = self.store.create(unsaved).await?;
        info!(
            operator = %self.context.operator,
            id = %saved.id,
            subject = %saved.subject_id,
            date = %saved.date,
            time = %saved.time,
            "appointment created"
        );
        Ok(saved)
    }

    /// Removes an appointment. Callers are expected to have confirmed the action.
    pub async fn delete(&self, id: &str) -> CoreResult<DeleteOutcome> {
        require("id", id)?;
        match self.store.remove(id).await {
            Ok(()) => {
                info!(operator = %self.context.operator, id, "appointment deleted");
                Ok(DeleteOutcome::Removed)
            }
            Err(PortError::NotFound(msg)) => {
                warn!(operator = %self.context.operator, id, %msg, "appointment already absent");
                Ok(DeleteOutcome::AlreadyAbsent)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn displayed_month(&self) -> MonthCursor {
        *self.displayed.lock()
    }

    pub fn previous_month(&self) -> MonthCursor {
        let mut displayed = self.displayed.lock();
        *displayed = displayed.previous();
        *displayed
    }

    pub fn next_month(&self) -> MonthCursor {
        let mut displayed = self.displayed.lock();
        *displayed = displayed.next();
        *displayed
    }

    /// The displayed month's grid.
    pub fn current_view(&self) -> MonthView {
        self.month_view(self.displayed_month())
    }

    /// Grid for `cursor` with the number of appointments on each day.
    pub fn month_view(&self, cursor: MonthCursor) -> MonthView {
        let counts: HashMap<String, usize> = {
            let snapshot = self.appointments.read();
            let mut counts = HashMap::new();
            for appt in snapshot.iter() {
                *counts.entry(appt.date.clone()).or_insert(0) += 1;
            }
            counts
        };

        let cells = build_month_grid(cursor.year, cursor.month as i32)
            .into_iter()
            .map(|day| match day {
                Some(d) => {
                    let date = cursor.date_string(d);
                    DayCell {
                        day: Some(d),
                        appointments: counts.get(&date).copied().unwrap_or(0),
                        date: Some(date),
                    }
                }
                None => DayCell {
                    day: None,
                    date: None,
                    appointments: 0,
                },
            })
            .collect();

        MonthView {
            cursor,
            previous: cursor.previous(),
            next: cursor.next(),
            cells,
        }
    }

    /// Releases the store subscription. Listings freeze at the last snapshot.
    pub fn close(&self) {
        self.appointments.close();
    }
}

impl Drop for SchedulingController {
    fn drop(&mut self) {
        self.appointments.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Clock;
    use crate::domain::Period;
    use crate::error::{CoreError, ValidationError};
    use crate::ports::{PortResult, SnapshotCallback, Subscription};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Store that notifies subscribers synchronously before acknowledging a write.
    #[derive(Default)]
    struct FakeStore {
        rows: Mutex<Vec<Appointment>>,
        listeners: Mutex<Vec<Arc<SnapshotCallback<Appointment>>>>,
        next_id: Mutex<u32>,
        fail_writes: AtomicBool,
    }

    impl FakeStore {
        fn push(&self) {
            let rows = self.rows.lock().clone();
            let listeners = self.listeners.lock().clone();
            for listener in listeners {
                listener(rows.clone());
            }
        }
    }

    #[async_trait]
    impl AppointmentStore for FakeStore {
        async fn create(&self, mut appointment: Appointment) -> PortResult<Appointment> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(PortError::Unexpected("offline".to_string()));
            }
            {
                let mut next = self.next_id.lock();
                *next += 1;
                appointment.id = format!("appt-{}", *next);
            }
            self.rows.lock().push(appointment.clone());
            self.push();
            Ok(appointment)
        }

        async fn remove(&self, id: &str) -> PortResult<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(PortError::PermissionDenied("read-only".to_string()));
            }
            let removed = {
                let mut rows = self.rows.lock();
                let before = rows.len();
                rows.retain(|a| a.id != id);
                rows.len() != before
            };
            if !removed {
                return Err(PortError::NotFound(format!("Appointment {} not found", id)));
            }
            self.push();
            Ok(())
        }

        fn subscribe_all(&self, on_update: SnapshotCallback<Appointment>) -> Subscription {
            let on_update = Arc::new(on_update);
            on_update(self.rows.lock().clone());
            self.listeners.lock().push(on_update);
            Subscription::noop()
        }
    }

    struct FixedClock;

    impl Clock for FixedClock {
        fn now_millis(&self) -> i64 {
            1_700_000_000_000
        }
    }

    fn controller(store: Arc<FakeStore>) -> SchedulingController {
        let context = ConsoleContext::new("tester").with_clock(Arc::new(FixedClock));
        SchedulingController::new(store, context, MonthCursor::new(2024, 1))
    }

    fn draft(time: &str) -> AppointmentDraft {
        AppointmentDraft {
            subject_id: "stu-1".to_string(),
            subject_name: "Ana".to_string(),
            date: "2024-02-15".to_string(),
            time: time.to_string(),
            period: Period::Morning,
            description: "Psychopedagogy".to_string(),
        }
    }

    #[tokio::test]
    async fn listing_is_sorted_by_time() {
        let store = Arc::new(FakeStore::default());
        let ctl = controller(store);
        for t in ["14:00", "08:30", "08:00"] {
            ctl.create(draft(t)).await.unwrap();
        }
        let times: Vec<String> = ctl
            .list_for_day("2024-02-15")
            .into_iter()
            .map(|a| a.time)
            .collect();
        assert_eq!(times, vec!["08:00", "08:30", "14:00"]);
        assert!(ctl.list_for_day("2024-02-16").is_empty());
    }

    #[tokio::test]
    async fn create_assigns_id_and_timestamp() {
        let store = Arc::new(FakeStore::default());
        let ctl = controller(store);
        let saved = ctl.create(draft("09:00")).await.unwrap();
        assert!(saved.is_persisted());
        assert_eq!(saved.created_at, 1_700_000_000_000);

        let listed = ctl.list_for_day("2024-02-15");
        assert_eq!(listed, vec![saved]);
    }

    #[tokio::test]
    async fn create_rejects_missing_fields() {
        let store = Arc::new(FakeStore::default());
        let ctl = controller(store.clone());

        let mut missing_subject = draft("09:00");
        missing_subject.subject_id = " ".to_string();
        let err = ctl.create(missing_subject).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::MissingField("subject_id"))
        ));

        let mut missing_time = draft("");
        missing_time.time.clear();
        let err = ctl.create(missing_time).await.unwrap_err();
        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::MissingField("time"))
        ));

        assert!(store.rows.lock().is_empty());
    }

    #[tokio::test]
    async fn same_slot_twice_is_allowed() {
        let store = Arc::new(FakeStore::default());
        let ctl = controller(store);
        ctl.create(draft("10:00")).await.unwrap();
        ctl.create(draft("10:00")).await.unwrap();
        assert_eq!(ctl.list_for_day("2024-02-15").len(), 2);
    }

    #[tokio::test]
    async fn failed_create_leaves_listing_untouched() {
        let store = Arc::new(FakeStore::default());
        let ctl = controller(store.clone());
        ctl.create(draft("10:00")).await.unwrap();
        store.fail_writes.store(true, Ordering::SeqCst);

        let err = ctl.create(draft("11:00")).await.unwrap_err();
        assert!(matches!(err, CoreError::Store(PortError::Unexpected(_))));
        assert_eq!(ctl.list_for_day("2024-02-15").len(), 1);
    }

    #[tokio::test]
    async fn delete_twice_reports_already_absent() {
        let store = Arc::new(FakeStore::default());
        let ctl = controller(store);
        let saved = ctl.create(draft("10:00")).await.unwrap();

        assert_eq!(ctl.delete(&saved.id).await.unwrap(), DeleteOutcome::Removed);
        assert!(ctl.list_for_day("2024-02-15").is_empty());
        assert_eq!(
            ctl.delete(&saved.id).await.unwrap(),
            DeleteOutcome::AlreadyAbsent
        );
    }

    #[tokio::test]
    async fn delete_propagates_other_store_errors() {
        let store = Arc::new(FakeStore::default());
        let ctl = controller(store.clone());
        let saved = ctl.create(draft("10:00")).await.unwrap();
        store.fail_writes.store(true, Ordering::SeqCst);

        let err = ctl.delete(&saved.id).await.unwrap_err();
        assert!(matches!(err, CoreError::Store(PortError::PermissionDenied(_))));
        assert_eq!(ctl.list_for_day("2024-02-15").len(), 1);
    }

    #[tokio::test]
    async fn month_view_counts_appointments_per_day() {
        let store = Arc::new(FakeStore::default());
        let ctl = controller(store);
        ctl.create(draft("08:00")).await.unwrap();
        ctl.create(draft("09:00")).await.unwrap();

        let view = ctl.current_view();
        assert_eq!(view.cursor, MonthCursor::new(2024, 1));
        assert_eq!(view.cells.len(), 4 + 29);
        let fifteenth = view
            .cells
            .iter()
            .find(|c| c.day == Some(15))
            .unwrap();
        assert_eq!(fifteenth.date.as_deref(), Some("2024-02-15"));
        assert_eq!(fifteenth.appointments, 2);
        assert_eq!(view.cells[0].appointments, 0);
    }

    #[test]
    fn navigation_wraps_years() {
        let store = Arc::new(FakeStore::default());
        let context = ConsoleContext::new("tester");
        let ctl = SchedulingController::new(store, context, MonthCursor::new(2024, 0));
        assert_eq!(ctl.previous_month(), MonthCursor::new(2023, 11));
        assert_eq!(ctl.next_month(), MonthCursor::new(2024, 0));
        assert_eq!(ctl.next_month(), MonthCursor::new(2024, 1));
        assert_eq!(ctl.displayed_month(), MonthCursor::new(2024, 1));
    }
}
