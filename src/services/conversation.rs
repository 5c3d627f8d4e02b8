use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::errors::{AppError, BookingError};
use crate::models::availability::templates_to_human_readable;
use crate::models::{
    Appointment, BookingCommand, BookingRequest, Doctor, DoctorAvailability, DoctorSearch, Label,
    Route, Session, TimeWindow,
};
use crate::services::ai::extraction::{ExtractionContext, CLARIFY_PROMPT};
use crate::services::dialogue::resolve;
use crate::state::AppState;

#[derive(Debug, Clone, Serialize)]
pub struct TurnReply {
    pub route: Route,
    pub reply: String,
}

/// Handles one inbound utterance end to end. Turns for the same session are
/// serialized by the session lock; the session is only updated once the chosen
/// capability has produced a reply.
pub async fn process_message(
    state: &Arc<AppState>,
    session_id: &str,
    message: &str,
) -> Result<TurnReply, AppError> {
    let handle = state.sessions.handle(session_id);
    let mut session = handle.lock().await;
    let timeout = Duration::from_secs(state.config.llm_timeout_secs);

    let label = match with_timeout(timeout, state.classifier.classify(message)).await {
        Ok(label) => label,
        Err(e) => {
            tracing::warn!(session_id, error = %e, "classifier failed, treating turn as unclear");
            Label::Unclear
        }
    };

    let decision = resolve(&session, label, state.config.history_turns);
    tracing::info!(
        session_id,
        label = label.as_str(),
        state = session.state.as_str(),
        next_state = decision.next_state.as_str(),
        route = ?decision.route,
        "routing message"
    );

    let (reply, pending) = match decision.route {
        Route::Faq => {
            let reply = with_timeout(
                timeout,
                state.answerer.answer(message, decision.chat_history.as_deref()),
            )
            .await?;
            (reply, session.pending_booking.clone())
        }
        Route::Appointment => handle_appointment_turn(state, &session, message, timeout).await?,
        Route::Reject => {
            let reply = with_timeout(timeout, state.responder.respond(message)).await?;
            (reply, session.pending_booking.clone())
        }
    };

    session.pending_booking = pending;
    session.commit(&decision, message, &reply);

    Ok(TurnReply {
        route: decision.route,
        reply,
    })
}

async fn with_timeout<T>(
    limit: Duration,
    fut: impl Future<Output = anyhow::Result<T>>,
) -> Result<T, AppError> {
    match tokio::time::timeout(limit, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(AppError::Ai(e.to_string())),
        Err(_) => Err(AppError::Ai(format!("no reply within {}s", limit.as_secs()))),
    }
}

/// Extracts a command and runs it against the planner. Returns the reply and the
/// pending booking fields to keep for the next turn.
async fn handle_appointment_turn(
    state: &Arc<AppState>,
    session: &Session,
    message: &str,
    timeout: Duration,
) -> Result<(String, BookingRequest), AppError> {
    let ctx = ExtractionContext {
        today: state.planner.today(),
        pending: session.pending_booking.clone(),
    };
    let history = session.recent(state.config.history_turns * 2);
    let command = with_timeout(timeout, state.extractor.extract(message, &history, &ctx)).await?;

    tracing::debug!(session_id = %session.session_id, ?command, "extracted booking command");

    let mut pending = ctx.pending;
    let reply = match execute(state, command, &mut pending) {
        Ok(reply) => reply,
        Err(e) if e.is_fatal() => {
            tracing::error!(session_id = %session.session_id, error = %e, "booking storage failure");
            return Err(AppError::Booking(e));
        }
        Err(e) => {
            if matches!(
                e,
                BookingError::Conflict { .. }
                    | BookingError::OutsideAvailability { .. }
                    | BookingError::AmbiguousTime(_)
                    | BookingError::PastTime { .. }
            ) {
                pending.time = None;
            }
            if matches!(e, BookingError::AmbiguousDate(_) | BookingError::PastDate(_)) {
                pending.date = None;
            }
            e.to_string()
        }
    };
    Ok((reply, pending))
}

fn execute(
    state: &AppState,
    command: BookingCommand,
    pending: &mut BookingRequest,
) -> Result<String, BookingError> {
    let planner = &state.planner;
    match command {
        BookingCommand::FindDoctors { specialization } => {
            match planner.find_doctors(&specialization)? {
                DoctorSearch::Matches { matches: listings } => {
                    if let [only] = listings.as_slice() {
                        pending.doctor_id = Some(only.doctor.doctor_id);
                    }
                    let lines = listings
                        .iter()
                        .map(|l| render_listing(&l.doctor, &l.availability))
                        .collect::<Vec<_>>()
                        .join("\n");
                    Ok(format!("Here is who can help:\n{lines}"))
                }
                DoctorSearch::NoMatch { specializations } => Ok(format!(
                    "I couldn't find a {}. We have: {}.",
                    specialization.trim(),
                    specializations.join(", ")
                )),
            }
        }

        BookingCommand::CheckAvailability { doctor_id, date } => {
            let Some(doctor_id) = doctor_id.or(pending.doctor_id) else {
                return Ok("Which doctor would you like to see?".to_string());
            };
            let doctor = planner.get_doctor(doctor_id)?;
            pending.doctor_id = Some(doctor_id);

            let Some(raw) = date.filter(|d| !d.trim().is_empty()) else {
                return Ok(
                    match planner.weekly_hours(doctor_id)? {
                        DoctorAvailability::Available(t) => format!(
                            "{} sees patients {}. Which date suits you?",
                            doctor.name,
                            templates_to_human_readable(&t)
                        ),
                        DoctorAvailability::Unavailable => {
                            format!("{} has no scheduled hours at the moment.", doctor.name)
                        }
                    },
                );
            };

            let date = planner.concrete_date(&raw)?;
            pending.date = Some(date.format("%Y-%m-%d").to_string());
            let windows = planner.check_availability(doctor_id, date)?;
            if windows.is_empty() {
                return Ok(format!(
                    "{} has no open times on {}. Would another day work?",
                    doctor.name,
                    date.format("%Y-%m-%d")
                ));
            }
            Ok(format!(
                "{} on {}: {}",
                doctor.name,
                date.format("%Y-%m-%d"),
                render_windows(&windows)
            ))
        }

        BookingCommand::AvailableOn { date } => {
            let Some(raw) = date.or_else(|| pending.date.clone()) else {
                return Ok("Which date are you looking for?".to_string());
            };
            let date = planner.concrete_date(&raw)?;
            let doctors = planner.doctors_available_on(date)?;
            if doctors.is_empty() {
                return Ok(format!("No doctors have open times on {}.", date.format("%Y-%m-%d")));
            }
            let lines = doctors
                .iter()
                .map(|(doctor, windows)| {
                    format!(
                        "- {} ({}, id {}): {}",
                        doctor.name,
                        doctor.specialization,
                        doctor.doctor_id,
                        render_windows(windows)
                    )
                })
                .collect::<Vec<_>>()
                .join("\n");
            Ok(format!("Open on {}:\n{lines}", date.format("%Y-%m-%d")))
        }

        BookingCommand::Book { fields } => {
            pending.merge(&fields);
            let appointment = planner.book(pending)?;
            let doctor = planner.get_doctor(appointment.doctor_id)?;
            *pending = BookingRequest::default();
            Ok(format!(
                "You're booked with {} on {} at {}. Your appointment id is {}.",
                doctor.name,
                appointment.appointment_date.format("%Y-%m-%d"),
                appointment.appointment_time.format("%H:%M"),
                appointment.appointment_id
            ))
        }

        BookingCommand::Cancel {
            appointment_id,
            patient_name,
            patient_phone,
        } => {
            let (id, name, phone) = identity(appointment_id, patient_name, patient_phone, pending)?;
            let appointment = planner.cancel(&id, &name, &phone)?;
            Ok(format!(
                "Your appointment on {} at {} has been cancelled.",
                appointment.appointment_date.format("%Y-%m-%d"),
                appointment.appointment_time.format("%H:%M")
            ))
        }

        BookingCommand::Reschedule {
            appointment_id,
            patient_name,
            patient_phone,
            date,
            time,
        } => {
            let (id, name, phone) = identity(appointment_id, patient_name, patient_phone, pending)?;
            let appointment = planner.reschedule(&id, &name, &phone, date.as_deref(), time.as_deref())?;
            Ok(format!(
                "Done. You're now booked on {} at {}. Your new appointment id is {}.",
                appointment.appointment_date.format("%Y-%m-%d"),
                appointment.appointment_time.format("%H:%M"),
                appointment.appointment_id
            ))
        }

        BookingCommand::MyAppointments { patient_phone } => {
            let Some(phone) = patient_phone.or_else(|| pending.patient_phone.clone()) else {
                return Ok("What phone number did you book with?".to_string());
            };
            let appointments = planner.appointments_for_patient(&phone)?;
            if appointments.is_empty() {
                return Ok("I don't see any upcoming appointments for that number.".to_string());
            }
            let lines = appointments
                .iter()
                .map(render_appointment)
                .collect::<Vec<_>>()
                .join("\n");
            Ok(format!("Your appointments:\n{lines}"))
        }

        BookingCommand::Clarify { message } => {
            if message.trim().is_empty() {
                Ok(CLARIFY_PROMPT.to_string())
            } else {
                Ok(message)
            }
        }
    }
}

/// Appointment id, name and phone for cancel/reschedule, falling back to what
/// the patient already gave in this session.
fn identity(
    appointment_id: Option<String>,
    patient_name: Option<String>,
    patient_phone: Option<String>,
    pending: &BookingRequest,
) -> Result<(String, String, String), BookingError> {
    let name = patient_name.or_else(|| pending.patient_name.clone());
    let phone = patient_phone.or_else(|| pending.patient_phone.clone());

    let mut missing = Vec::new();
    if appointment_id.is_none() {
        missing.push("appointment id");
    }
    if name.is_none() {
        missing.push("patient name");
    }
    if phone.is_none() {
        missing.push("phone number");
    }
    match (appointment_id, name, phone) {
        (Some(id), Some(name), Some(phone)) => Ok((id, name, phone)),
        _ => Err(BookingError::IncompleteRequest { missing }),
    }
}

fn render_listing(doctor: &Doctor, availability: &DoctorAvailability) -> String {
    let hours = match availability {
        DoctorAvailability::Available(templates) => templates_to_human_readable(templates),
        DoctorAvailability::Unavailable => "currently unavailable".to_string(),
    };
    format!(
        "- {} ({}, id {}): {hours}",
        doctor.name, doctor.specialization, doctor.doctor_id
    )
}

fn render_windows(windows: &[TimeWindow]) -> String {
    windows
        .iter()
        .map(TimeWindow::describe)
        .collect::<Vec<_>>()
        .join("; ")
}

fn render_appointment(a: &Appointment) -> String {
    format!(
        "- {} at {} with doctor {} (id {})",
        a.appointment_date.format("%Y-%m-%d"),
        a.appointment_time.format("%H:%M"),
        a.doctor_id,
        a.appointment_id
    )
}
