use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use super::availability::hhmm;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Appointment {
    pub appointment_id: String,
    pub doctor_id: i64,
    pub availability_id: Option<i64>,
    pub patient_name: String,
    pub patient_phone: String,
    pub appointment_date: NaiveDate,
    #[serde(with = "hhmm")]
    pub appointment_time: NaiveTime,
    pub status: AppointmentStatus,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum AppointmentStatus {
    Booked,
    Cancelled,
}

impl AppointmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentStatus::Booked => "BOOKED",
            AppointmentStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.to_uppercase().as_str() {
            "CANCELLED" => AppointmentStatus::Cancelled,
            _ => AppointmentStatus::Booked,
        }
    }
}

/// Fully validated input for a ledger insert.
#[derive(Debug, Clone)]
pub struct NewAppointment {
    pub doctor_id: i64,
    pub availability_id: Option<i64>,
    pub patient_name: String,
    pub patient_phone: String,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
}
