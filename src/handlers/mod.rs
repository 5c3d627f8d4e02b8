pub mod admin;
pub mod booking;
pub mod chat;
pub mod health;

use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;

use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/chat", post(chat::chat))
        .route("/api/sessions/:id/reset", post(chat::reset_session))
        .route("/api/sessions/:id", delete(chat::end_session))
        .route("/api/doctors", get(booking::find_doctors))
        .route(
            "/api/doctors/:id/availability",
            get(booking::doctor_availability),
        )
        .route("/api/availability", get(booking::available_on))
        .route(
            "/api/appointments",
            get(booking::patient_appointments).post(booking::book),
        )
        .route(
            "/api/appointments/:id/cancel",
            post(booking::cancel),
        )
        .route(
            "/api/appointments/:id/reschedule",
            post(booking::reschedule),
        )
        .route("/api/admin/doctors", post(admin::create_doctor))
        .route(
            "/api/admin/doctors/:id/availability",
            post(admin::add_availability),
        )
        .route("/api/admin/appointments", get(admin::get_appointments))
        .with_state(state)
}
