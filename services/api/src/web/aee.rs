//! services/api/src/web/aee.rs
//!
//! Special-education (AEE) enrollment handlers.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use school_ops_core::{classify, AeeEnrollment, EnrollmentDraft};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::web::errors::{ErrorBody, HttpError};
use crate::web::rest::FilterQuery;
use crate::web::schedule::{delete_response, DeleteResponse};
use crate::web::state::AppState;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct EnrollmentDto {
    pub id: String,
    pub student_id: String,
    pub student_name: String,
    pub class_code: String,
    pub level: String,
    pub support_need: String,
    pub specialist: Option<String>,
    pub notes: String,
    pub enrolled_at: i64,
}

impl From<AeeEnrollment> for EnrollmentDto {
    fn from(e: AeeEnrollment) -> Self {
        Self {
            level: classify(&e.class_code).slug().to_string(),
            id: e.id,
            student_id: e.student_id,
            student_name: e.student_name,
            class_code: e.class_code,
            support_need: e.support_need,
            specialist: e.specialist,
            notes: e.notes,
            enrolled_at: e.enrolled_at,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct EnrollmentPayload {
    pub student_id: String,
    #[serde(default)]
    pub student_name: String,
    #[serde(default)]
    pub class_code: String,
    pub support_need: String,
    #[serde(default)]
    pub specialist: Option<String>,
    #[serde(default)]
    pub notes: String,
}

impl From<EnrollmentPayload> for EnrollmentDraft {
    fn from(p: EnrollmentPayload) -> Self {
        EnrollmentDraft {
            student_id: p.student_id,
            student_name: p.student_name,
            class_code: p.class_code,
            support_need: p.support_need,
            specialist: p.specialist,
            notes: p.notes,
        }
    }
}

/// AEE enrollments ordered by student name.
#[utoipa::path(
    get,
    path = "/aee",
    params(FilterQuery),
    responses(
        (status = 200, description = "Enrollments passing the filter", body = [EnrollmentDto]),
        (status = 400, description = "Unknown level or conflicting filters", body = ErrorBody)
    )
)]
pub async fn list_enrollments_handler(
    State(app_state): State<Arc<AppState>>,
    Query(query): Query<FilterQuery>,
) -> Result<impl IntoResponse, HttpError> {
    let filter = query.to_filter()?;
    let listed: Vec<EnrollmentDto> = app_state
        .aee
        .list(&filter)
        .into_iter()
        .map(EnrollmentDto::from)
        .collect();
    Ok(Json(listed))
}

#[utoipa::path(
    post,
    path = "/aee",
    request_body = EnrollmentPayload,
    responses(
        (status = 201, description = "Enrollment persisted", body = EnrollmentDto),
        (status = 422, description = "Missing student id or support need", body = ErrorBody),
        (status = 500, description = "Store failure", body = ErrorBody)
    )
)]
pub async fn enroll_handler(
    State(app_state): State<Arc<AppState>>,
    Json(payload): Json<EnrollmentPayload>,
) -> Result<impl IntoResponse, HttpError> {
    let saved = app_state.aee.enroll(payload.into()).await?;
    Ok((StatusCode::CREATED, Json(EnrollmentDto::from(saved))))
}

#[utoipa::path(
    delete,
    path = "/aee/{id}",
    params(("id" = String, Path, description = "Enrollment id")),
    responses(
        (status = 200, description = "Outcome of the withdrawal", body = DeleteResponse),
        (status = 500, description = "Store failure", body = ErrorBody)
    )
)]
pub async fn withdraw_handler(
    State(app_state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HttpError> {
    let outcome = app_state.aee.withdraw(&id).await?;
    Ok(Json(delete_response(id, outcome)))
}
