//! services/api/src/web/schedule.rs
//!
//! Calendar and appointment handlers backed by the `SchedulingController`.
//!
//! A successful create or delete is visible in later listings only once the store
//! has pushed the change; with the in-memory store that happens before the
//! response is written.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use school_ops_core::{
    Appointment, AppointmentDraft, DayCell, DeleteOutcome, MonthCursor, MonthView, Period,
    ValidationError,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::web::errors::{ErrorBody, HttpError};
use crate::web::rest::{parse_day, today};
use crate::web::state::AppState;

//=========================================================================================
// Payloads and Responses
//=========================================================================================

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct CalendarQuery {
    pub year: Option<i32>,
    /// Zero-based (0 = January). Out-of-range values roll into neighbouring years.
    pub month: Option<i32>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DayQuery {
    /// `YYYY-MM-DD`; defaults to today (UTC).
    pub date: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DayCellDto {
    /// Absent for the leading blanks before the first weekday.
    pub day: Option<u32>,
    pub date: Option<String>,
    pub appointments: usize,
}

impl From<DayCell> for DayCellDto {
    fn from(cell: DayCell) -> Self {
        Self {
            day: cell.day,
            date: cell.date,
            appointments: cell.appointments,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CalendarResponse {
    pub year: i32,
    pub month: u32,
    pub previous: CursorDto,
    pub next: CursorDto,
    pub cells: Vec<DayCellDto>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CursorDto {
    pub year: i32,
    /// Zero-based.
    pub month: u32,
}

impl From<MonthCursor> for CursorDto {
    fn from(cursor: MonthCursor) -> Self {
        Self {
            year: cursor.year,
            month: cursor.month,
        }
    }
}

impl From<MonthView> for CalendarResponse {
    fn from(view: MonthView) -> Self {
        Self {
            year: view.cursor.year,
            month: view.cursor.month,
            previous: view.previous.into(),
            next: view.next.into(),
            cells: view.cells.into_iter().map(DayCellDto::from).collect(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AppointmentDto {
    pub id: String,
    pub subject_id: String,
    pub subject_name: String,
    pub date: String,
    pub time: String,
    /// `Morning`, `Afternoon` or `Off-shift`.
    pub period: String,
    pub description: String,
    pub created_at: i64,
}

impl From<Appointment> for AppointmentDto {
    fn from(a: Appointment) -> Self {
        Self {
            id: a.id,
            subject_id: a.subject_id,
            subject_name: a.subject_name,
            date: a.date,
            time: a.time,
            period: a.period.as_str().to_string(),
            description: a.description,
            created_at: a.created_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AppointmentPayload {
    pub subject_id: String,
    #[serde(default)]
    pub subject_name: String,
    pub date: String,
    /// Zero-padded 24-hour `HH:MM`.
    pub time: String,
    pub period: String,
    #[serde(default)]
    pub description: String,
}

impl AppointmentPayload {
    fn into_draft(self) -> Result<AppointmentDraft, ValidationError> {
        let period = self
            .period
            .parse::<Period>()
            .map_err(|_| ValidationError::InvalidField {
                field: "period",
                value: self.period.clone(),
            })?;
        Ok(AppointmentDraft {
            subject_id: self.subject_id,
            subject_name: self.subject_name,
            date: self.date,
            time: self.time,
            period,
            description: self.description,
        })
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DeleteResponse {
    pub id: String,
    /// `removed` or `already_absent`.
    pub outcome: String,
}

pub(crate) fn delete_response(id: String, outcome: DeleteOutcome) -> DeleteResponse {
    let outcome = match outcome {
        DeleteOutcome::Removed => "removed",
        DeleteOutcome::AlreadyAbsent => "already_absent",
    };
    DeleteResponse {
        id,
        outcome: outcome.to_string(),
    }
}

//=========================================================================================
// Handlers
//=========================================================================================

/// Month grid annotated with per-day appointment counts.
///
/// Without `year` and `month` the currently displayed month is returned.
#[utoipa::path(
    get,
    path = "/calendar",
    params(CalendarQuery),
    responses(
        (status = 200, description = "Annotated month grid", body = CalendarResponse),
        (status = 400, description = "Half a month given, or an unsupported year", body = ErrorBody)
    )
)]
pub async fn calendar_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<CalendarQuery>,
) -> Result<impl IntoResponse, HttpError> {
    let view = match (query.year, query.month) {
        (Some(year), Some(month)) => {
            let cursor = MonthCursor::new(year, month);
            if !cursor.is_supported() {
                return Err(HttpError::bad_request(format!("Year {} is out of range", year)));
            }
            app_state.scheduling.month_view(cursor)
        }
        (None, None) => app_state.scheduling.current_view(),
        _ => return Err(HttpError::bad_request("Give both year and month, or neither")),
    };
    Ok(Json(CalendarResponse::from(view)))
}

/// Move the displayed month backwards or forwards and return its grid.
#[utoipa::path(
    post,
    path = "/calendar/{direction}",
    params(("direction" = String, Path, description = "`previous` or `next`")),
    responses(
        (status = 200, description = "Grid of the newly displayed month", body = CalendarResponse),
        (status = 400, description = "Unknown direction", body = ErrorBody)
    )
)]
pub async fn step_calendar_handler(
    State(app_state): State<Arc<AppState>>,
    Path(direction): Path<String>,
) -> Result<impl IntoResponse, HttpError> {
    let cursor = match direction.as_str() {
        "previous" => app_state.scheduling.previous_month(),
        "next" => app_state.scheduling.next_month(),
        other => return Err(HttpError::bad_request(format!("Unknown direction '{}'", other))),
    };
    Ok(Json(CalendarResponse::from(app_state.scheduling.month_view(cursor))))
}

/// Appointments on one day, ordered by time.
#[utoipa::path(
    get,
    path = "/appointments",
    params(DayQuery),
    responses(
        (status = 200, description = "Appointments on the day", body = [AppointmentDto]),
        (status = 400, description = "Malformed date", body = ErrorBody)
    )
)]
pub async fn list_appointments_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<DayQuery>,
) -> Result<impl IntoResponse, HttpError> {
    let date = match query.date.as_deref().map(str::trim) {
        None | Some("") => today(),
        Some(date) => {
            parse_day(date)?;
            date.to_string()
        }
    };
    let appointments: Vec<AppointmentDto> = app_state
        .scheduling
        .list_for_day(&date)
        .into_iter()
        .map(AppointmentDto::from)
        .collect();
    Ok(Json(appointments))
}

/// Create an appointment. Overlapping appointments are accepted.
#[utoipa::path(
    post,
    path = "/appointments",
    request_body = AppointmentPayload,
    responses(
        (status = 201, description = "Appointment persisted with its id", body = AppointmentDto),
        (status = 422, description = "Missing or malformed field", body = ErrorBody),
        (status = 403, description = "Store refused the write", body = ErrorBody),
        (status = 500, description = "Store failure", body = ErrorBody)
    )
)]
pub async fn create_appointment_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<AppointmentPayload>,
) -> Result<impl IntoResponse, HttpError> {
    let draft = payload.into_draft()?;
    let saved = app_state.scheduling.create(draft).await?;
    Ok((StatusCode::CREATED, Json(AppointmentDto::from(saved))))
}

/// Delete an appointment. Deleting an unknown id succeeds with `already_absent`.
#[utoipa::path(
    delete,
    path = "/appointments/{id}",
    params(("id" = String, Path, description = "Appointment id")),
    responses(
        (status = 200, description = "Outcome of the delete", body = DeleteResponse),
        (status = 403, description = "Store refused the delete", body = ErrorBody),
        (status = 500, description = "Store failure", body = ErrorBody)
    )
)]
pub async fn delete_appointment_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HttpError> {
    let outcome = app_state.scheduling.delete(&id).await?;
    Ok(Json(delete_response(id, outcome)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_with_unknown_period_is_invalid() {
        let payload = AppointmentPayload {
            subject_id: "s1".to_string(),
            subject_name: "Ana".to_string(),
            date: "2024-03-01".to_string(),
            time: "08:00".to_string(),
            period: "Night".to_string(),
            description: String::new(),
        };
        assert_eq!(
            payload.into_draft().unwrap_err(),
            ValidationError::InvalidField {
                field: "period",
                value: "Night".to_string()
            }
        );
    }

    #[test]
    fn month_view_converts_cursors_to_pairs() {
        let cursor = MonthCursor::new(2024, 0);
        let view = MonthView {
            cursor,
            previous: cursor.previous(),
            next: cursor.next(),
            cells: Vec::new(),
        };
        let response = CalendarResponse::from(view);
        assert_eq!(response.previous, CursorDto { year: 2023, month: 11 });
        assert_eq!(response.next, CursorDto { year: 2024, month: 1 });
    }
}
