use std::collections::HashSet;

use chrono::{Datelike, Local, NaiveDate, NaiveDateTime, NaiveTime};

use crate::db::queries;
use crate::errors::BookingError;
use crate::models::availability::{parse_date, parse_time};
use crate::models::{
    Appointment, AppointmentStatus, BookingRequest, Doctor, DoctorAvailability, DoctorListing,
    DoctorSearch, NewAppointment, TimeWindow,
};
use crate::services::ledger::{LedgerTx, SlotLedger};

pub fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Turns extracted scheduling fields into ledger operations.
#[derive(Clone)]
pub struct BookingPlanner {
    ledger: SlotLedger,
    slot_minutes: u32,
    clock: fn() -> NaiveDateTime,
}

/// Which grid times of one date are still offered.
#[derive(Debug, Clone, Copy)]
struct Day {
    date: NaiveDate,
    slot_minutes: u32,
    /// Set when `date` is today: times at or before it have passed.
    passed_until: Option<NaiveTime>,
}

impl Day {
    fn offers(&self, time: NaiveTime) -> bool {
        self.passed_until.map_or(true, |cutoff| time > cutoff)
    }
}

impl BookingPlanner {
    pub fn new(ledger: SlotLedger, slot_minutes: u32) -> Self {
        Self {
            ledger,
            slot_minutes,
            clock: now,
        }
    }

    pub fn with_clock(mut self, clock: fn() -> NaiveDateTime) -> Self {
        self.clock = clock;
        self
    }

    pub fn today(&self) -> NaiveDate {
        (self.clock)().date()
    }

    pub fn ledger(&self) -> &SlotLedger {
        &self.ledger
    }

    fn day(&self, date: NaiveDate) -> Day {
        let now = (self.clock)();
        Day {
            date,
            slot_minutes: self.slot_minutes,
            passed_until: (date == now.date()).then(|| now.time()),
        }
    }

    /// Doctors whose specialization contains `query` (case-insensitive), each
    /// with its weekly templates or an explicit `Unavailable` marker. With no
    /// match, the known specializations come back instead.
    pub fn find_doctors(&self, query: &str) -> Result<DoctorSearch, BookingError> {
        self.ledger.read(|conn| {
            let doctors = queries::find_doctors_by_specialization(conn, query)?;
            if doctors.is_empty() {
                return Ok(DoctorSearch::NoMatch {
                    specializations: queries::list_specializations(conn)?,
                });
            }
            let mut listings = Vec::with_capacity(doctors.len());
            for doctor in doctors {
                let templates = queries::list_doctor_templates(conn, doctor.doctor_id)?;
                listings.push(DoctorListing {
                    doctor,
                    availability: DoctorAvailability::from_templates(templates),
                });
            }
            Ok(DoctorSearch::Matches { matches: listings })
        })
    }

    /// The doctor's weekly hours, or `Unavailable` when none are set.
    pub fn weekly_hours(&self, doctor_id: i64) -> Result<DoctorAvailability, BookingError> {
        let templates = self
            .ledger
            .read(|conn| queries::list_doctor_templates(conn, doctor_id))?;
        Ok(DoctorAvailability::from_templates(templates))
    }

    /// Template windows for `date`'s weekday minus the times already booked on
    /// that date. Only windows with a free time are returned.
    pub fn check_availability(
        &self,
        doctor_id: i64,
        date: NaiveDate,
    ) -> Result<Vec<TimeWindow>, BookingError> {
        let day = self.day(date);
        self.ledger.atomically(|tx| {
            ensure_doctor(tx, doctor_id)?;
            free_windows(tx, doctor_id, day)
        })
    }

    /// Every doctor working on `date`'s weekday with their free windows.
    pub fn doctors_available_on(
        &self,
        date: NaiveDate,
    ) -> Result<Vec<(Doctor, Vec<TimeWindow>)>, BookingError> {
        let day = self.day(date);
        self.ledger.atomically(|tx| {
            let templates = tx.list_templates_on_day(date.weekday())?;
            let mut doctor_ids: Vec<i64> = templates.iter().map(|t| t.doctor_id).collect();
            doctor_ids.dedup();

            let mut result = Vec::new();
            for doctor_id in doctor_ids {
                let Some(doctor) = tx.get_doctor(doctor_id)? else {
                    continue;
                };
                let windows = free_windows(tx, doctor_id, day)?;
                if !windows.is_empty() {
                    result.push((doctor, windows));
                }
            }
            Ok(result)
        })
    }

    /// Books a slot. Every field is required; the availability check and the
    /// insert run in one transaction.
    pub fn book(&self, request: &BookingRequest) -> Result<Appointment, BookingError> {
        let missing = request.missing_fields();
        if !missing.is_empty() {
            return Err(BookingError::IncompleteRequest { missing });
        }

        let (Some(doctor_id), Some(date_raw), Some(time_raw), Some(name), Some(phone)) = (
            request.doctor_id,
            request.date.as_deref(),
            request.time.as_deref(),
            request.patient_name.as_deref(),
            request.patient_phone.as_deref(),
        ) else {
            return Err(BookingError::IncompleteRequest {
                missing: request.missing_fields(),
            });
        };

        let date = self.concrete_date(date_raw)?;
        let time = concrete_time(time_raw)?;
        let day = self.day(date);

        let result = self.ledger.atomically(|tx| {
            ensure_doctor(tx, doctor_id)?;
            book_in_tx(tx, doctor_id, day, time, name.trim(), phone.trim())
        });

        match &result {
            Ok(appointment) => tracing::info!(
                appointment_id = %appointment.appointment_id,
                doctor_id,
                date = %date,
                time = %time.format("%H:%M"),
                "appointment booked"
            ),
            Err(BookingError::Conflict { .. }) => {
                tracing::warn!(doctor_id, date = %date, time = %time.format("%H:%M"), "slot already booked")
            }
            Err(_) => {}
        }
        result
    }

    /// Marks an appointment CANCELLED after checking the patient's name and
    /// phone. Cancelling twice returns the cancelled row unchanged.
    pub fn cancel(
        &self,
        appointment_id: &str,
        patient_name: &str,
        patient_phone: &str,
    ) -> Result<Appointment, BookingError> {
        let appointment = self.ledger.atomically(|tx| {
            let existing = load_verified(tx, appointment_id, patient_name, patient_phone)?;
            if existing.status == AppointmentStatus::Cancelled {
                return Ok(existing);
            }
            tx.update_status(&existing.appointment_id, AppointmentStatus::Cancelled)?;
            reload(tx, &existing.appointment_id)
        })?;

        tracing::info!(appointment_id, "appointment cancelled");
        Ok(appointment)
    }

    /// Moves a booking to a new date/time with the same doctor. The old row is
    /// cancelled and the new one inserted in a single transaction, so a taken
    /// target slot leaves the original booking in place.
    pub fn reschedule(
        &self,
        appointment_id: &str,
        patient_name: &str,
        patient_phone: &str,
        new_date: Option<&str>,
        new_time: Option<&str>,
    ) -> Result<Appointment, BookingError> {
        let mut missing = Vec::new();
        if new_date.map_or(true, |d| d.trim().is_empty()) {
            missing.push("date");
        }
        if new_time.map_or(true, |t| t.trim().is_empty()) {
            missing.push("time");
        }
        let (Some(date_raw), Some(time_raw)) = (new_date, new_time) else {
            return Err(BookingError::IncompleteRequest { missing });
        };
        if !missing.is_empty() {
            return Err(BookingError::IncompleteRequest { missing });
        }

        let date = self.concrete_date(date_raw)?;
        let time = concrete_time(time_raw)?;
        let day = self.day(date);

        let appointment = self.ledger.atomically(|tx| {
            let existing = load_verified(tx, appointment_id, patient_name, patient_phone)?;
            if existing.status == AppointmentStatus::Cancelled {
                return Err(BookingError::NotFound(appointment_id.to_string()));
            }
            tx.update_status(&existing.appointment_id, AppointmentStatus::Cancelled)?;
            book_in_tx(
                tx,
                existing.doctor_id,
                day,
                time,
                &existing.patient_name,
                &existing.patient_phone,
            )
        })?;

        tracing::info!(
            old_appointment_id = appointment_id,
            new_appointment_id = %appointment.appointment_id,
            "appointment rescheduled"
        );
        Ok(appointment)
    }

    pub fn appointments_for_patient(&self, phone: &str) -> Result<Vec<Appointment>, BookingError> {
        self.ledger
            .read(|conn| queries::get_booked_for_phone(conn, phone.trim()))
    }

    pub fn get_doctor(&self, doctor_id: i64) -> Result<Doctor, BookingError> {
        self.ledger
            .read(|conn| queries::get_doctor(conn, doctor_id))?
            .ok_or(BookingError::DoctorNotFound(doctor_id))
    }

    /// Parses a strict ISO date and rejects past dates. Relative phrases like
    /// "next week" are handed back for the caller to clarify.
    pub fn concrete_date(&self, raw: &str) -> Result<NaiveDate, BookingError> {
        let date = parse_date(raw).map_err(|_| BookingError::AmbiguousDate(raw.trim().to_string()))?;
        if date < self.today() {
            return Err(BookingError::PastDate(date));
        }
        Ok(date)
    }
}

fn concrete_time(raw: &str) -> Result<NaiveTime, BookingError> {
    parse_time(raw).map_err(|_| BookingError::AmbiguousTime(raw.trim().to_string()))
}

fn ensure_doctor(tx: &LedgerTx<'_>, doctor_id: i64) -> Result<Doctor, BookingError> {
    tx.get_doctor(doctor_id)?.ok_or(BookingError::DoctorNotFound(doctor_id))
}

/// Two-step check: weekday templates first, then subtract booked times on the
/// concrete date.
fn free_windows(tx: &LedgerTx<'_>, doctor_id: i64, day: Day) -> Result<Vec<TimeWindow>, BookingError> {
    let templates = tx.list_templates(doctor_id, day.date.weekday())?;
    if templates.is_empty() {
        return Ok(vec![]);
    }

    let booked: HashSet<NaiveTime> = tx
        .list_booked_appointments(doctor_id, day.date)?
        .into_iter()
        .map(|a| a.appointment_time)
        .collect();

    Ok(templates
        .into_iter()
        .filter_map(|template| {
            let free_times: Vec<NaiveTime> = template
                .slot_times(day.slot_minutes)
                .into_iter()
                .filter(|t| day.offers(*t) && !booked.contains(t))
                .collect();
            (!free_times.is_empty()).then(|| TimeWindow {
                availability_id: template.availability_id,
                date: day.date,
                start: template.start_time,
                end: template.end_time,
                free_times,
            })
        })
        .collect())
}

/// Re-runs the availability check and inserts, inside the caller's transaction.
fn book_in_tx(
    tx: &LedgerTx<'_>,
    doctor_id: i64,
    day: Day,
    time: NaiveTime,
    patient_name: &str,
    patient_phone: &str,
) -> Result<Appointment, BookingError> {
    let templates = tx.list_templates(doctor_id, day.date.weekday())?;
    let Some(template) = templates.iter().find(|t| t.offers(time, day.slot_minutes)) else {
        return Err(BookingError::OutsideAvailability {
            alternatives: free_windows(tx, doctor_id, day)?,
        });
    };
    if !day.offers(time) {
        return Err(BookingError::PastTime {
            time,
            alternatives: free_windows(tx, doctor_id, day)?,
        });
    }

    let windows = free_windows(tx, doctor_id, day)?;
    if !windows.iter().any(|w| w.free_times.contains(&time)) {
        return Err(BookingError::Conflict {
            alternatives: windows,
        });
    }

    let new = NewAppointment {
        doctor_id,
        availability_id: Some(template.availability_id),
        patient_name: patient_name.to_string(),
        patient_phone: patient_phone.to_string(),
        appointment_date: day.date,
        appointment_time: time,
    };
    match tx.insert_appointment(&new) {
        Err(BookingError::Conflict { .. }) => Err(BookingError::Conflict {
            alternatives: free_windows(tx, doctor_id, day)?,
        }),
        other => other,
    }
}

fn load_verified(
    tx: &LedgerTx<'_>,
    appointment_id: &str,
    patient_name: &str,
    patient_phone: &str,
) -> Result<Appointment, BookingError> {
    let appointment = tx
        .get_appointment(appointment_id.trim())?
        .ok_or_else(|| BookingError::NotFound(appointment_id.trim().to_string()))?;
    if !same_name(&appointment.patient_name, patient_name)
        || !same_phone(&appointment.patient_phone, patient_phone)
    {
        return Err(BookingError::IdentityMismatch);
    }
    Ok(appointment)
}

fn reload(tx: &LedgerTx<'_>, appointment_id: &str) -> Result<Appointment, BookingError> {
    tx.get_appointment(appointment_id)?
        .ok_or_else(|| BookingError::NotFound(appointment_id.to_string()))
}

fn same_name(stored: &str, given: &str) -> bool {
    let normalize = |s: &str| s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    !given.trim().is_empty() && normalize(stored) == normalize(given)
}

fn same_phone(stored: &str, given: &str) -> bool {
    let digits = |s: &str| s.chars().filter(char::is_ascii_digit).collect::<String>();
    let given = digits(given);
    !given.is_empty() && digits(stored) == given
}
