pub mod aee;
pub mod errors;
pub mod protocol;
pub mod rest;
pub mod schedule;
pub mod snapshot;
pub mod state;
pub mod ws_handler;

use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::trace::TraceLayer;

// Re-export the pieces the binaries need to build the web server.
pub use rest::ApiDoc;
pub use state::AppState;
pub use ws_handler::ws_handler;

/// Every console route, with request tracing. CORS and the Swagger UI are added by
/// the `api` binary.
pub fn router(app_state: Arc<AppState>) -> Router {
    Router::new()
        .route("/roster", get(rest::list_roster_handler))
        .route("/presence", get(rest::presence_handler))
        .route("/presence/export", get(rest::export_presence_handler))
        .route("/attendance/events", post(rest::record_event_handler))
        .route("/calendar", get(schedule::calendar_handler))
        .route("/calendar/{direction}", post(schedule::step_calendar_handler))
        .route(
            "/appointments",
            get(schedule::list_appointments_handler).post(schedule::create_appointment_handler),
        )
        .route("/appointments/{id}", delete(schedule::delete_appointment_handler))
        .route(
            "/aee",
            get(aee::list_enrollments_handler).post(aee::enroll_handler),
        )
        .route("/aee/{id}", delete(aee::withdraw_handler))
        .route("/ws/presence", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}
