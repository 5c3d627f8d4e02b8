use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::{Appointment, BookingRequest, Doctor, DoctorSearch, TimeWindow};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct DoctorsQuery {
    pub specialization: Option<String>,
}

// GET /api/doctors?specialization=
pub async fn find_doctors(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DoctorsQuery>,
) -> Result<Json<DoctorSearch>, AppError> {
    let search = state
        .planner
        .find_doctors(query.specialization.as_deref().unwrap_or(""))?;
    Ok(Json(search))
}

#[derive(Deserialize)]
pub struct DateQuery {
    pub date: Option<String>,
}

impl DateQuery {
    fn required(&self) -> Result<&str, AppError> {
        self.date
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .ok_or_else(|| AppError::BadRequest("date is required".to_string()))
    }
}

#[derive(Serialize)]
pub struct DoctorWindows {
    pub doctor: Doctor,
    pub windows: Vec<TimeWindow>,
}

// GET /api/doctors/:id/availability?date=
pub async fn doctor_availability(
    State(state): State<Arc<AppState>>,
    Path(doctor_id): Path<i64>,
    Query(query): Query<DateQuery>,
) -> Result<Json<DoctorWindows>, AppError> {
    let date = state.planner.concrete_date(query.required()?)?;
    let doctor = state.planner.get_doctor(doctor_id)?;
    let windows = state.planner.check_availability(doctor_id, date)?;
    Ok(Json(DoctorWindows { doctor, windows }))
}

// GET /api/availability?date=
pub async fn available_on(
    State(state): State<Arc<AppState>>,
    Query(query): Query<DateQuery>,
) -> Result<Json<Vec<DoctorWindows>>, AppError> {
    let date = state.planner.concrete_date(query.required()?)?;
    let doctors = state
        .planner
        .doctors_available_on(date)?
        .into_iter()
        .map(|(doctor, windows)| DoctorWindows { doctor, windows })
        .collect();
    Ok(Json(doctors))
}

// POST /api/appointments
pub async fn book(
    State(state): State<Arc<AppState>>,
    Json(body): Json<BookingRequest>,
) -> Result<(StatusCode, Json<Appointment>), AppError> {
    let appointment = state.planner.book(&body)?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

#[derive(Deserialize)]
pub struct IdentityRequest {
    pub patient_name: String,
    pub patient_phone: String,
}

// POST /api/appointments/:id/cancel
pub async fn cancel(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<IdentityRequest>,
) -> Result<Json<Appointment>, AppError> {
    let appointment = state
        .planner
        .cancel(&id, &body.patient_name, &body.patient_phone)?;
    Ok(Json(appointment))
}

#[derive(Deserialize)]
pub struct RescheduleRequest {
    pub patient_name: String,
    pub patient_phone: String,
    pub date: Option<String>,
    pub time: Option<String>,
}

// POST /api/appointments/:id/reschedule
pub async fn reschedule(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(body): Json<RescheduleRequest>,
) -> Result<Json<Appointment>, AppError> {
    let appointment = state.planner.reschedule(
        &id,
        &body.patient_name,
        &body.patient_phone,
        body.date.as_deref(),
        body.time.as_deref(),
    )?;
    Ok(Json(appointment))
}

#[derive(Deserialize)]
pub struct PhoneQuery {
    pub phone: Option<String>,
}

// GET /api/appointments?phone=
pub async fn patient_appointments(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PhoneQuery>,
) -> Result<Json<Vec<Appointment>>, AppError> {
    let phone = query
        .phone
        .as_deref()
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("phone is required".to_string()))?;
    Ok(Json(state.planner.appointments_for_patient(phone)?))
}
