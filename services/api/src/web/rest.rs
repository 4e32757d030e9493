//! services/api/src/web/rest.rs
//!
//! Contains the roster, presence and attendance handlers, the query/payload types
//! shared with the other route modules, and the master definition for the OpenAPI
//! specification.

use crate::web::{
    errors::{ErrorBody, HttpError},
    snapshot::first_snapshot,
    state::AppState,
};
use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json},
};
use chrono::{NaiveDate, Utc};
use school_ops_core::{
    classify, compute_presence_filtered, export_csv, AttendanceEvent, Bucket, EventKind,
    PresenceSnapshot, RosterFilter, RosterMember, ValidationError,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::{IntoParams, OpenApi, ToSchema};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        list_roster_handler,
        presence_handler,
        export_presence_handler,
        record_event_handler,
        crate::web::schedule::calendar_handler,
        crate::web::schedule::step_calendar_handler,
        crate::web::schedule::list_appointments_handler,
        crate::web::schedule::create_appointment_handler,
        crate::web::schedule::delete_appointment_handler,
        crate::web::aee::list_enrollments_handler,
        crate::web::aee::enroll_handler,
        crate::web::aee::withdraw_handler,
    ),
    components(
        schemas(
            ErrorBody,
            MemberDto,
            PresenceResponse,
            EventPayload,
            EventDto,
            crate::web::schedule::AppointmentDto,
            crate::web::schedule::AppointmentPayload,
            crate::web::schedule::CalendarResponse,
            crate::web::schedule::CursorDto,
            crate::web::schedule::DayCellDto,
            crate::web::schedule::DeleteResponse,
            crate::web::aee::EnrollmentDto,
            crate::web::aee::EnrollmentPayload,
        )
    ),
    tags(
        (
            name = "School Ops API",
            description = "Presence, scheduling and AEE endpoints for the school console."
        )
    )
)]
pub struct ApiDoc;

//=========================================================================================
// Shared Query Types
//=========================================================================================

/// Roster filter shared by every listing. `class` and `level` are mutually exclusive.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct FilterQuery {
    /// Exact class code, e.g. `1A`.
    pub class: Option<String>,
    /// Education level slug, e.g. `early-elementary`.
    pub level: Option<String>,
}

impl FilterQuery {
    pub fn to_filter(&self) -> Result<RosterFilter, HttpError> {
        let level = self
            .level
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty());
        match (self.class.as_deref(), level) {
            (Some(class), Some(_)) if !class.trim().is_empty() => Err(HttpError::bad_request(
                "Use either the class or the level filter, not both",
            )),
            (_, Some(level)) => level
                .parse::<Bucket>()
                .map(RosterFilter::Level)
                .map_err(HttpError::BadRequest),
            (class, None) => Ok(RosterFilter::from_class(class)),
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PresenceQuery {
    /// `YYYY-MM-DD`; defaults to today (UTC).
    pub day: Option<String>,
    pub class: Option<String>,
    pub level: Option<String>,
}

impl PresenceQuery {
    pub(crate) fn day(&self) -> Result<String, HttpError> {
        match self.day.as_deref().map(str::trim) {
            None | Some("") => Ok(today()),
            Some(day) => parse_day(day).map(|_| day.to_string()),
        }
    }

    pub(crate) fn filter(&self) -> Result<RosterFilter, HttpError> {
        FilterQuery {
            class: self.class.clone(),
            level: self.level.clone(),
        }
        .to_filter()
    }
}

pub(crate) fn today() -> String {
    Utc::now().date_naive().format("%Y-%m-%d").to_string()
}

pub(crate) fn parse_day(day: &str) -> Result<NaiveDate, HttpError> {
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map_err(|_| HttpError::bad_request(format!("'{}' is not a YYYY-MM-DD date", day)))
}

//=========================================================================================
// API Response and Payload Structs
//=========================================================================================

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MemberDto {
    pub id: String,
    pub name: String,
    pub class_code: String,
    pub photo_url: Option<String>,
    /// Education level slug derived from the class code.
    pub level: String,
}

impl From<&RosterMember> for MemberDto {
    fn from(m: &RosterMember) -> Self {
        Self {
            id: m.id.clone(),
            name: m.name.clone(),
            class_code: m.class_code.clone(),
            photo_url: m.photo_url.clone(),
            level: classify(&m.class_code).slug().to_string(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PresenceResponse {
    pub day: String,
    pub total: usize,
    pub present_count: usize,
    pub absent_count: usize,
    /// Integer percentage.
    pub rate: u8,
    pub present: Vec<MemberDto>,
    pub absent: Vec<MemberDto>,
}

impl PresenceResponse {
    pub fn new(day: String, snapshot: &PresenceSnapshot) -> Self {
        Self {
            day,
            total: snapshot.total,
            present_count: snapshot.present_count(),
            absent_count: snapshot.absent_count(),
            rate: snapshot.rate,
            present: snapshot.present.iter().map(MemberDto::from).collect(),
            absent: snapshot.absent.iter().map(MemberDto::from).collect(),
        }
    }
}

/// An already-resolved entry or exit.
#[derive(Debug, Deserialize, ToSchema)]
pub struct EventPayload {
    pub subject_id: String,
    /// `entry` or `exit`.
    pub kind: String,
    /// Epoch milliseconds; defaults to now.
    pub timestamp_ms: Option<i64>,
    /// Partition day; defaults to the UTC day of the timestamp.
    pub day: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EventDto {
    pub id: String,
    pub subject_id: String,
    pub subject_name: String,
    pub class_code: String,
    pub timestamp_ms: i64,
    pub kind: Option<String>,
    pub day: String,
}

impl From<AttendanceEvent> for EventDto {
    fn from(e: AttendanceEvent) -> Self {
        Self {
            id: e.id,
            subject_id: e.subject_id,
            subject_name: e.subject_name,
            class_code: e.class_code,
            timestamp_ms: e.timestamp_ms,
            kind: e.kind.map(|k| match k {
                EventKind::Entry => "entry".to_string(),
                EventKind::Exit => "exit".to_string(),
            }),
            day: e.day,
        }
    }
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

async fn load_presence(
    app_state: &AppState,
    day: &str,
    filter: &RosterFilter,
) -> Result<PresenceSnapshot, HttpError> {
    let timeout = app_state.config.snapshot_timeout;
    let roster = first_snapshot(timeout, |cb| app_state.roster.subscribe_roster(cb)).await?;
    let events =
        first_snapshot(timeout, |cb| app_state.attendance.subscribe_events(day, cb)).await?;
    Ok(compute_presence_filtered(&roster, &events, filter))
}

/// List roster members, optionally restricted to a class or an education level.
#[utoipa::path(
    get,
    path = "/roster",
    params(FilterQuery),
    responses(
        (status = 200, description = "Roster members in store order", body = [MemberDto]),
        (status = 400, description = "Unknown level or conflicting filters", body = ErrorBody),
        (status = 500, description = "Store unavailable", body = ErrorBody)
    )
)]
pub async fn list_roster_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<FilterQuery>,
) -> Result<impl IntoResponse, HttpError> {
    let filter = query.to_filter()?;
    let roster = first_snapshot(app_state.config.snapshot_timeout, |cb| {
        app_state.roster.subscribe_roster(cb)
    })
    .await?;
    let members: Vec<MemberDto> = filter
        .apply(&roster)
        .into_iter()
        .map(MemberDto::from)
        .collect();
    Ok(Json(members))
}

/// Presence partition for one day and one filter.
#[utoipa::path(
    get,
    path = "/presence",
    params(PresenceQuery),
    responses(
        (
            status = 200,
            description = "Present and absent members with the presence rate",
            body = PresenceResponse
        ),
        (status = 400, description = "Malformed day or filter", body = ErrorBody),
        (status = 500, description = "Store unavailable", body = ErrorBody)
    )
)]
pub async fn presence_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<PresenceQuery>,
) -> Result<impl IntoResponse, HttpError> {
    let day = query.day()?;
    let filter = query.filter()?;
    let snapshot = load_presence(&app_state, &day, &filter).await?;
    Ok(Json(PresenceResponse::new(day, &snapshot)))
}

/// Same partition as `/presence`, rendered as `Name,Class,Status,Date` CSV.
#[utoipa::path(
    get,
    path = "/presence/export",
    params(PresenceQuery),
    responses(
        (
            status = 200,
            description = "CSV export, present members first",
            content_type = "text/csv",
            body = String
        ),
        (status = 400, description = "Malformed day or filter", body = ErrorBody),
        (status = 500, description = "Store unavailable", body = ErrorBody)
    )
)]
pub async fn export_presence_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<PresenceQuery>,
) -> Result<impl IntoResponse, HttpError> {
    let day = query.day()?;
    let filter = query.filter()?;
    let snapshot = load_presence(&app_state, &day, &filter).await?;
    let csv = export_csv(&snapshot, &day)?;
    let disposition = format!("attachment; filename=\"presence-{}.csv\"", day);
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    ))
}

/// Record an entry or exit for a roster member.
#[utoipa::path(
    post,
    path = "/attendance/events",
    request_body = EventPayload,
    responses(
        (status = 201, description = "Event recorded", body = EventDto),
        (status = 404, description = "No roster member with that id", body = ErrorBody),
        (status = 422, description = "Missing subject, bad kind or timestamp", body = ErrorBody),
        (status = 500, description = "Store unavailable", body = ErrorBody)
    )
)]
pub async fn record_event_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<EventPayload>,
) -> Result<impl IntoResponse, HttpError> {
    let subject_id = payload.subject_id.trim();
    if subject_id.is_empty() {
        return Err(ValidationError::MissingField("subject_id").into());
    }
    let kind = match payload.kind.trim().to_lowercase().as_str() {
        "entry" => EventKind::Entry,
        "exit" => EventKind::Exit,
        _ => {
            return Err(ValidationError::InvalidField {
                field: "kind",
                value: payload.kind.clone(),
            }
            .into())
        }
    };
    let day = match payload.day.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(day) => {
            if NaiveDate::parse_from_str(day, "%Y-%m-%d").is_err() {
                return Err(ValidationError::InvalidField {
                    field: "day",
                    value: day.to_string(),
                }
                .into());
            }
            Some(day.to_string())
        }
    };

    let roster = first_snapshot(app_state.config.snapshot_timeout, |cb| {
        app_state.roster.subscribe_roster(cb)
    })
    .await?;
    let member = roster
        .iter()
        .find(|m| m.id == subject_id)
        .ok_or_else(|| HttpError::not_found(format!("Roster member {} not found", subject_id)))?;

    let timestamp_ms = payload
        .timestamp_ms
        .unwrap_or_else(|| Utc::now().timestamp_millis());
    let event = AttendanceEvent::for_member(member, kind, timestamp_ms, day)?;
    let saved = app_state.attendance.record_event(event).await?;
    info!(
        operator = %app_state.config.operator_name,
        subject = %saved.subject_id,
        day = %saved.day,
        "attendance event recorded"
    );
    Ok((StatusCode::CREATED, Json(EventDto::from(saved))))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(class: Option<&str>, level: Option<&str>) -> FilterQuery {
        FilterQuery {
            class: class.map(str::to_string),
            level: level.map(str::to_string),
        }
    }

    #[test]
    fn filter_query_selects_the_right_filter() {
        assert_eq!(query(None, None).to_filter().unwrap(), RosterFilter::All);
        assert_eq!(query(Some(" "), None).to_filter().unwrap(), RosterFilter::All);
        assert_eq!(
            query(Some("1A"), None).to_filter().unwrap(),
            RosterFilter::Class("1A".to_string())
        );
        assert_eq!(
            query(None, Some("secondary")).to_filter().unwrap(),
            RosterFilter::Level(Bucket::Secondary)
        );
        assert!(query(Some("1A"), Some("secondary")).to_filter().is_err());
        assert!(query(None, Some("college")).to_filter().is_err());
    }

    #[test]
    fn presence_query_rejects_malformed_days() {
        let bad = PresenceQuery {
            day: Some("01/03/2024".to_string()),
            ..Default::default()
        };
        assert!(bad.day().is_err());

        let blank = PresenceQuery {
            day: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(blank.day().unwrap(), today());
    }
}
