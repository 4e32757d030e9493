//! services/api/src/web/state.rs
//!
//! Defines the application state shared by every handler.

use std::sync::Arc;

use chrono::NaiveDate;
use school_ops_core::{
    AeeRegistry, AeeStore, AppointmentStore, AttendanceSource, ConsoleContext, MonthCursor,
    RosterSource, SchedulingController,
};

use crate::config::Config;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub roster: Arc<dyn RosterSource>,
    pub attendance: Arc<dyn AttendanceSource>,
    pub scheduling: Arc<SchedulingController>,
    pub aee: Arc<AeeRegistry>,
}

impl AppState {
    /// Wires the controllers to a store that serves every collection.
    ///
    /// The scheduling view starts on the month containing `today`.
    pub fn build<S>(config: Arc<Config>, store: Arc<S>, today: NaiveDate) -> Self
    where
        S: RosterSource + AttendanceSource + AppointmentStore + AeeStore + 'static,
    {
        let context = ConsoleContext::new(config.operator_name.clone());
        let appointments: Arc<dyn AppointmentStore> = store.clone();
        let enrollments: Arc<dyn AeeStore> = store.clone();

        let scheduling = Arc::new(SchedulingController::new(
            appointments,
            context.clone(),
            MonthCursor::containing(today),
        ));
        let aee = Arc::new(AeeRegistry::new(enrollments, context));

        let roster: Arc<dyn RosterSource> = store.clone();
        let attendance: Arc<dyn AttendanceSource> = store;
        Self {
            config,
            roster,
            attendance,
            scheduling,
            aee,
        }
    }
}
