pub mod aee;
pub mod board;
pub mod calendar;
pub mod classifier;
pub mod context;
pub mod domain;
pub mod error;
mod mirror;
pub mod ports;
pub mod presence;
pub mod scheduling;

pub use aee::AeeRegistry;
pub use board::PresenceBoard;
pub use calendar::{build_month_grid, MonthCursor};
pub use classifier::{classify, Bucket, RosterFilter};
pub use context::{Clock, ConsoleContext, SystemClock};
pub use domain::{
    AeeEnrollment, Appointment, AppointmentDraft, AttendanceEvent, EnrollmentDraft, EventKind,
    Period, RosterMember,
};
pub use error::{CoreError, CoreResult, ValidationError};
pub use ports::{
    AeeStore, AppointmentStore, AttendanceSource, PortError, PortResult, RosterSource,
    SnapshotCallback, Subscription,
};
pub use presence::{compute_presence, compute_presence_filtered, export_csv, PresenceSnapshot};
pub use scheduling::{DayCell, DeleteOutcome, MonthView, SchedulingController};
