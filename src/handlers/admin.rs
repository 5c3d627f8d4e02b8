use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use serde::Deserialize;

use crate::db::queries;
use crate::errors::AppError;
use crate::models::availability::{parse_time, parse_weekday};
use crate::models::{Appointment, AppointmentStatus, AvailabilityTemplate, Doctor, NewDoctor};
use crate::state::AppState;

fn check_auth(headers: &HeaderMap, expected_token: &str) -> Result<(), AppError> {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    let token = auth.strip_prefix("Bearer ").unwrap_or("");
    if token.is_empty() || token != expected_token {
        return Err(AppError::Unauthorized);
    }
    Ok(())
}

// POST /api/admin/doctors
pub async fn create_doctor(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<NewDoctor>,
) -> Result<(StatusCode, Json<Doctor>), AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    if body.name.trim().is_empty() || body.specialization.trim().is_empty() {
        return Err(AppError::BadRequest(
            "name and specialization are required".to_string(),
        ));
    }

    let doctor = state.planner.ledger().add_doctor(&body)?;
    tracing::info!(doctor_id = doctor.doctor_id, specialization = %doctor.specialization, "doctor added");
    Ok((StatusCode::CREATED, Json(doctor)))
}

#[derive(Deserialize)]
pub struct AvailabilityRequest {
    pub day_of_week: String,
    pub start_time: String,
    pub end_time: String,
}

// POST /api/admin/doctors/:id/availability
pub async fn add_availability(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(doctor_id): Path<i64>,
    Json(body): Json<AvailabilityRequest>,
) -> Result<(StatusCode, Json<AvailabilityTemplate>), AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let day = parse_weekday(&body.day_of_week).map_err(|e| AppError::BadRequest(e.to_string()))?;
    let start = parse_time(&body.start_time).map_err(|e| AppError::BadRequest(e.to_string()))?;
    let end = parse_time(&body.end_time).map_err(|e| AppError::BadRequest(e.to_string()))?;
    if start >= end {
        return Err(AppError::BadRequest(
            "start_time must be before end_time".to_string(),
        ));
    }

    let template = state
        .planner
        .ledger()
        .add_template(doctor_id, day, start, end)?;
    tracing::info!(
        doctor_id,
        availability_id = template.availability_id,
        "availability template added"
    );
    Ok((StatusCode::CREATED, Json(template)))
}

#[derive(Deserialize)]
pub struct AppointmentsQuery {
    pub status: Option<String>,
    pub limit: Option<i64>,
}

// GET /api/admin/appointments
pub async fn get_appointments(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<AppointmentsQuery>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    check_auth(&headers, &state.config.admin_token)?;

    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    let status = match query.status.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(s) if s.eq_ignore_ascii_case("booked") => Some(AppointmentStatus::Booked),
        Some(s) if s.eq_ignore_ascii_case("cancelled") => Some(AppointmentStatus::Cancelled),
        Some(other) => {
            return Err(AppError::BadRequest(format!("unknown status: {other}")));
        }
    };

    let appointments = state
        .planner
        .ledger()
        .read(|conn| queries::get_all_appointments(conn, status, limit))?;
    Ok(Json(appointments))
}
