//! services/api/src/adapters/db.rs
//!
//! This module contains the PostgreSQL adapter, the concrete implementation of the
//! store ports from the `core` crate backed by `sqlx`.
//!
//! Change notification uses `LISTEN/NOTIFY`: statement-level triggers announce the
//! changed table on one channel, a single listener connection fans the notices out
//! over a broadcast channel, and every subscription reloads its full snapshot when
//! its table is announced.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt};
use school_ops_core::domain::{
    AeeEnrollment, Appointment, AttendanceEvent, EventKind, Period, RosterMember,
};
use school_ops_core::ports::{
    AeeStore, AppointmentStore, AttendanceSource, PortError, PortResult, RosterSource,
    SnapshotCallback, Subscription,
};
use sqlx::postgres::{PgListener, PgPool};
use sqlx::FromRow;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Channel the migration's triggers notify on.
pub const CHANGE_CHANNEL: &str = "school_ops_changes";

/// Pseudo table name meaning "reload everything" (sent after a reconnect).
const ALL_TABLES: &str = "*";
const CHANGE_BUFFER: usize = 256;

type LoadFuture<T> = BoxFuture<'static, Result<Vec<T>, sqlx::Error>>;
type Loader<T> = Arc<dyn Fn(PgPool) -> LoadFuture<T> + Send + Sync>;

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements every store port.
pub struct PgStore {
    pool: PgPool,
    changes: broadcast::Sender<String>,
    shutdown: CancellationToken,
}

impl PgStore {
    /// Opens the change listener and starts forwarding notices.
    pub async fn connect(pool: PgPool) -> Result<Self, sqlx::Error> {
        let mut listener = PgListener::connect_with(&pool).await?;
        listener.listen(CHANGE_CHANNEL).await?;
        info!("Listening for changes on '{}'", CHANGE_CHANNEL);

        let (changes, _) = broadcast::channel(CHANGE_BUFFER);
        let shutdown = CancellationToken::new();
        tokio::spawn(forward_notices(listener, changes.clone(), shutdown.clone()));

        Ok(Self {
            pool,
            changes,
            shutdown,
        })
    }

    /// A helper function to run database migrations at startup.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(&self.pool).await
    }

    /// Spawns a task that pushes the loaded snapshot now and after every notice
    /// naming `table`, until the returned handle is released.
    fn watch<T: Send + 'static>(
        &self,
        table: &'static str,
        load: Loader<T>,
        on_update: SnapshotCallback<T>,
    ) -> Subscription {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        // Subscribe before the first load so no notice can slip in between.
        let mut changes = self.changes.subscribe();
        let pool = self.pool.clone();

        tokio::spawn(async move {
            let mut stale = true;
            loop {
                if stale {
                    match load(pool.clone()).await {
                        Ok(rows) => on_update(rows),
                        Err(e) => error!(table, "Failed to load snapshot: {:?}", e),
                    }
                }
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    notice = changes.recv() => match notice {
                        Ok(changed) => stale = changed == table || changed == ALL_TABLES,
                        Err(RecvError::Lagged(skipped)) => {
                            warn!(table, skipped, "Change notices lagged; reloading");
                            stale = true;
                        }
                        Err(RecvError::Closed) => break,
                    },
                }
            }
            debug!(table, "Snapshot subscription closed");
        });

        Subscription::new(move || token.cancel())
    }
}

impl Drop for PgStore {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

async fn forward_notices(
    mut listener: PgListener,
    changes: broadcast::Sender<String>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            received = listener.recv() => match received {
                Ok(notice) => {
                    // No receivers simply means nobody is subscribed right now.
                    let _ = changes.send(notice.payload().to_string());
                }
                Err(e) => {
                    error!("Change listener failed: {:?}", e);
                    tokio::time::sleep(Duration::from_secs(1)).await;
                    // Notices sent while disconnected are lost.
                    let _ = changes.send(ALL_TABLES.to_string());
                }
            },
        }
    }
    info!("Change listener stopped.");
}

fn port_error(e: sqlx::Error) -> PortError {
    match e {
        sqlx::Error::RowNotFound => PortError::NotFound("Row not found".to_string()),
        sqlx::Error::Database(ref db) if db.code().as_deref() == Some("42501") => {
            PortError::PermissionDenied(db.message().to_string())
        }
        other => PortError::Unexpected(other.to_string()),
    }
}

fn decode_error(message: String) -> sqlx::Error {
    sqlx::Error::Decode(message.into())
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct RosterRecord {
    id: String,
    name: String,
    class_code: String,
    photo_url: Option<String>,
}
impl RosterRecord {
    fn to_domain(self) -> RosterMember {
        RosterMember {
            id: self.id,
            name: self.name,
            class_code: self.class_code,
            photo_url: self.photo_url,
        }
    }
}

#[derive(FromRow)]
struct EventRecord {
    id: String,
    subject_id: String,
    subject_name: String,
    class_code: String,
    timestamp_ms: i64,
    kind: Option<String>,
    day: String,
}
impl EventRecord {
    fn to_domain(self) -> Result<AttendanceEvent, sqlx::Error> {
        let kind = match self.kind.as_deref() {
            None => None,
            Some("entry") => Some(EventKind::Entry),
            Some("exit") => Some(EventKind::Exit),
            Some(other) => return Err(decode_error(format!("unknown event kind '{}'", other))),
        };
        Ok(AttendanceEvent {
            id: self.id,
            subject_id: self.subject_id,
            subject_name: self.subject_name,
            class_code: self.class_code,
            timestamp_ms: self.timestamp_ms,
            kind,
            day: self.day,
        })
    }
}

fn kind_column(kind: Option<EventKind>) -> Option<&'static str> {
    kind.map(|k| match k {
        EventKind::Entry => "entry",
        EventKind::Exit => "exit",
    })
}

#[derive(FromRow)]
struct AppointmentRecord {
    id: String,
    subject_id: String,
    subject_name: String,
    scheduled_date: String,
    scheduled_time: String,
    period: String,
    description: String,
    created_at: i64,
}
impl AppointmentRecord {
    fn to_domain(self) -> Result<Appointment, sqlx::Error> {
        let period = self.period.parse::<Period>().map_err(decode_error)?;
        Ok(Appointment {
            id: self.id,
            subject_id: self.subject_id,
            subject_name: self.subject_name,
            date: self.scheduled_date,
            time: self.scheduled_time,
            period,
            description: self.description,
            created_at: self.created_at,
        })
    }
}

#[derive(FromRow)]
struct EnrollmentRecord {
    id: String,
    student_id: String,
    student_name: String,
    class_code: String,
    support_need: String,
    specialist: Option<String>,
    notes: String,
    enrolled_at: i64,
}
impl EnrollmentRecord {
    fn to_domain(self) -> AeeEnrollment {
        AeeEnrollment {
            id: self.id,
            student_id: self.student_id,
            student_name: self.student_name,
            class_code: self.class_code,
            support_need: self.support_need,
            specialist: self.specialist,
            notes: self.notes,
            enrolled_at: self.enrolled_at,
        }
    }
}

const ROSTER_COLUMNS: &str = "id, name, class_code, photo_url";
const EVENT_COLUMNS: &str = "id, subject_id, subject_name, class_code, timestamp_ms, kind, day";
const APPOINTMENT_COLUMNS: &str =
    "id, subject_id, subject_name, scheduled_date, scheduled_time, period, description, created_at";
const ENROLLMENT_COLUMNS: &str =
    "id, student_id, student_name, class_code, support_need, specialist, notes, enrolled_at";

//=========================================================================================
// Snapshot Loaders
//=========================================================================================

async fn load_roster(pool: PgPool) -> Result<Vec<RosterMember>, sqlx::Error> {
    let sql = format!("SELECT {} FROM roster_members ORDER BY name", ROSTER_COLUMNS);
    let records = sqlx::query_as::<_, RosterRecord>(&sql)
        .fetch_all(&pool)
        .await?;
    Ok(records.into_iter().map(RosterRecord::to_domain).collect())
}

async fn load_events(pool: PgPool, day: String) -> Result<Vec<AttendanceEvent>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM attendance_events WHERE day = $1 ORDER BY timestamp_ms",
        EVENT_COLUMNS
    );
    let records = sqlx::query_as::<_, EventRecord>(&sql)
        .bind(day)
        .fetch_all(&pool)
        .await?;
    records.into_iter().map(EventRecord::to_domain).collect()
}

async fn load_appointments(pool: PgPool) -> Result<Vec<Appointment>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM appointments ORDER BY scheduled_date, scheduled_time",
        APPOINTMENT_COLUMNS
    );
    let records = sqlx::query_as::<_, AppointmentRecord>(&sql)
        .fetch_all(&pool)
        .await?;
    records.into_iter().map(AppointmentRecord::to_domain).collect()
}

async fn load_enrollments(pool: PgPool) -> Result<Vec<AeeEnrollment>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM aee_enrollments ORDER BY student_name",
        ENROLLMENT_COLUMNS
    );
    let records = sqlx::query_as::<_, EnrollmentRecord>(&sql)
        .fetch_all(&pool)
        .await?;
    Ok(records.into_iter().map(EnrollmentRecord::to_domain).collect())
}

//=========================================================================================
// Port Trait Implementations
//=========================================================================================

impl RosterSource for PgStore {
    fn subscribe_roster(&self, on_update: SnapshotCallback<RosterMember>) -> Subscription {
        let load: Loader<RosterMember> = Arc::new(|pool: PgPool| load_roster(pool).boxed());
        self.watch("roster_members", load, on_update)
    }
}

#[async_trait]
impl AttendanceSource for PgStore {
    fn subscribe_events(
        &self,
        day: &str,
        on_update: SnapshotCallback<AttendanceEvent>,
    ) -> Subscription {
        let day = day.to_string();
        let load: Loader<AttendanceEvent> =
            Arc::new(move |pool: PgPool| load_events(pool, day.clone()).boxed());
        self.watch("attendance_events", load, on_update)
    }

    async fn record_event(&self, event: AttendanceEvent) -> PortResult<AttendanceEvent> {
        let sql = format!(
            "INSERT INTO attendance_events ({cols}) VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {cols}",
            cols = EVENT_COLUMNS
        );
        let record = sqlx::query_as::<_, EventRecord>(&sql)
            .bind(new_id())
            .bind(&event.subject_id)
            .bind(&event.subject_name)
            .bind(&event.class_code)
            .bind(event.timestamp_ms)
            .bind(kind_column(event.kind))
            .bind(&event.day)
            .fetch_one(&self.pool)
            .await
            .map_err(port_error)?;
        record.to_domain().map_err(port_error)
    }
}

#[async_trait]
impl AppointmentStore for PgStore {
    async fn create(&self, appointment: Appointment) -> PortResult<Appointment> {
        let sql = format!(
            "INSERT INTO appointments ({cols}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {cols}",
            cols = APPOINTMENT_COLUMNS
        );
        let record = sqlx::query_as::<_, AppointmentRecord>(&sql)
            .bind(new_id())
            .bind(&appointment.subject_id)
            .bind(&appointment.subject_name)
            .bind(&appointment.date)
            .bind(&appointment.time)
            .bind(appointment.period.as_str())
            .bind(&appointment.description)
            .bind(appointment.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(port_error)?;
        record.to_domain().map_err(port_error)
    }

    async fn remove(&self, id: &str) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM appointments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(port_error)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("Appointment {} not found", id)));
        }
        Ok(())
    }

    fn subscribe_all(&self, on_update: SnapshotCallback<Appointment>) -> Subscription {
        let load: Loader<Appointment> = Arc::new(|pool: PgPool| load_appointments(pool).boxed());
        self.watch("appointments", load, on_update)
    }
}

#[async_trait]
impl AeeStore for PgStore {
    async fn enroll(&self, enrollment: AeeEnrollment) -> PortResult<AeeEnrollment> {
        let sql = format!(
            "INSERT INTO aee_enrollments ({cols}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8) \
             RETURNING {cols}",
            cols = ENROLLMENT_COLUMNS
        );
        let record = sqlx::query_as::<_, EnrollmentRecord>(&sql)
            .bind(new_id())
            .bind(&enrollment.student_id)
            .bind(&enrollment.student_name)
            .bind(&enrollment.class_code)
            .bind(&enrollment.support_need)
            .bind(&enrollment.specialist)
            .bind(&enrollment.notes)
            .bind(enrollment.enrolled_at)
            .fetch_one(&self.pool)
            .await
            .map_err(port_error)?;
        Ok(record.to_domain())
    }

    async fn withdraw(&self, id: &str) -> PortResult<()> {
        let result = sqlx::query("DELETE FROM aee_enrollments WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(port_error)?;
        if result.rows_affected() == 0 {
            return Err(PortError::NotFound(format!("AEE enrollment {} not found", id)));
        }
        Ok(())
    }

    fn subscribe_all(&self, on_update: SnapshotCallback<AeeEnrollment>) -> Subscription {
        let load: Loader<AeeEnrollment> = Arc::new(|pool: PgPool| load_enrollments(pool).boxed());
        self.watch("aee_enrollments", load, on_update)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_kind_round_trips_through_its_column() {
        for kind in [None, Some(EventKind::Entry), Some(EventKind::Exit)] {
            let record = EventRecord {
                id: "e1".to_string(),
                subject_id: "s1".to_string(),
                subject_name: "Ana".to_string(),
                class_code: "1A".to_string(),
                timestamp_ms: 0,
                kind: kind_column(kind).map(str::to_string),
                day: "2024-03-01".to_string(),
            };
            assert_eq!(record.to_domain().unwrap().kind, kind);
        }
    }

    #[test]
    fn unknown_column_values_fail_to_decode() {
        let record = AppointmentRecord {
            id: "a1".to_string(),
            subject_id: "s1".to_string(),
            subject_name: "Ana".to_string(),
            scheduled_date: "2024-03-01".to_string(),
            scheduled_time: "08:00".to_string(),
            period: "Night".to_string(),
            description: String::new(),
            created_at: 0,
        };
        assert!(matches!(record.to_domain(), Err(sqlx::Error::Decode(_))));
    }

    #[test]
    fn row_not_found_maps_to_not_found() {
        assert!(matches!(
            port_error(sqlx::Error::RowNotFound),
            PortError::NotFound(_)
        ));
        assert!(matches!(
            port_error(sqlx::Error::PoolTimedOut),
            PortError::Unexpected(_)
        ));
    }
}
