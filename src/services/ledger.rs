use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{NaiveDate, NaiveTime, Weekday};
use rusqlite::{Connection, Transaction, TransactionBehavior};

use crate::db::queries;
use crate::errors::BookingError;
use crate::models::{
    Appointment, AppointmentStatus, AvailabilityTemplate, Doctor, NewAppointment, NewDoctor,
};

/// Authoritative store of templates and appointments.
///
/// All access goes through one connection behind a mutex. Scheduling work runs
/// inside [`SlotLedger::atomically`], which hands the closure a [`LedgerTx`]
/// over an IMMEDIATE transaction so a read-then-write sequence commits or rolls
/// back as a unit. The unique index on booked slots backs this up at the
/// storage boundary.
#[derive(Clone)]
pub struct SlotLedger {
    db: Arc<Mutex<Connection>>,
}

impl SlotLedger {
    pub fn new(db: Arc<Mutex<Connection>>) -> Self {
        Self { db }
    }

    /// Runs `f` as one transaction. `Err` from `f` rolls everything back.
    pub fn atomically<T>(
        &self,
        f: impl FnOnce(&LedgerTx<'_>) -> Result<T, BookingError>,
    ) -> Result<T, BookingError> {
        let conn = self.lock()?;
        let tx = Transaction::new_unchecked(&conn, TransactionBehavior::Immediate)?;
        let value = f(&LedgerTx { conn: &tx })?;
        tx.commit()?;
        Ok(value)
    }

    /// Reference-data lookups that need no transaction.
    pub fn read<T>(
        &self,
        f: impl FnOnce(&Connection) -> anyhow::Result<T>,
    ) -> Result<T, BookingError> {
        let conn = self.lock()?;
        Ok(f(&conn)?)
    }

    pub fn add_doctor(&self, doctor: &NewDoctor) -> Result<Doctor, BookingError> {
        let conn = self.lock()?;
        Ok(queries::insert_doctor(&conn, doctor)?)
    }

    /// Adds a weekly window for an existing doctor.
    pub fn add_template(
        &self,
        doctor_id: i64,
        day: Weekday,
        start: NaiveTime,
        end: NaiveTime,
    ) -> Result<AvailabilityTemplate, BookingError> {
        self.atomically(|tx| {
            tx.get_doctor(doctor_id)?
                .ok_or(BookingError::DoctorNotFound(doctor_id))?;
            Ok(queries::insert_availability(tx.conn, doctor_id, day, start, end)?)
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, BookingError> {
        self.db
            .lock()
            .map_err(|_| BookingError::Storage(anyhow::anyhow!("ledger connection mutex poisoned")))
    }
}

/// Ledger operations available inside one transaction.
pub struct LedgerTx<'a> {
    conn: &'a Connection,
}

impl LedgerTx<'_> {
    pub fn list_templates(
        &self,
        doctor_id: i64,
        day: Weekday,
    ) -> Result<Vec<AvailabilityTemplate>, BookingError> {
        Ok(queries::list_templates(self.conn, doctor_id, day)?)
    }

    pub fn list_templates_on_day(&self, day: Weekday) -> Result<Vec<AvailabilityTemplate>, BookingError> {
        Ok(queries::list_templates_on_day(self.conn, day)?)
    }

    pub fn list_booked_appointments(
        &self,
        doctor_id: i64,
        date: NaiveDate,
    ) -> Result<Vec<Appointment>, BookingError> {
        Ok(queries::list_booked_appointments(self.conn, doctor_id, date)?)
    }

    /// Fails with `Conflict` when the slot already holds a BOOKED row.
    pub fn insert_appointment(&self, new: &NewAppointment) -> Result<Appointment, BookingError> {
        queries::insert_appointment(self.conn, new)
    }

    pub fn update_status(
        &self,
        appointment_id: &str,
        status: AppointmentStatus,
    ) -> Result<bool, BookingError> {
        Ok(queries::update_appointment_status(self.conn, appointment_id, status)?)
    }

    pub fn get_doctor(&self, doctor_id: i64) -> Result<Option<Doctor>, BookingError> {
        Ok(queries::get_doctor(self.conn, doctor_id)?)
    }

    pub fn get_appointment(&self, appointment_id: &str) -> Result<Option<Appointment>, BookingError> {
        Ok(queries::get_appointment(self.conn, appointment_id)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::models::availability::parse_time;

    fn tuesday() -> NaiveDate {
        NaiveDate::from_ymd_opt(2030, 1, 8).unwrap()
    }

    fn ledger_with_doctor() -> (SlotLedger, i64) {
        let ledger = SlotLedger::new(Arc::new(Mutex::new(db::init_db(":memory:").unwrap())));
        let doctor = ledger
            .add_doctor(&NewDoctor {
                name: "Dr. Rao".to_string(),
                specialization: "Orthopedic".to_string(),
                nationality: None,
            })
            .unwrap();
        (ledger, doctor.doctor_id)
    }

    fn new_appointment(doctor_id: i64) -> NewAppointment {
        NewAppointment {
            doctor_id,
            availability_id: None,
            patient_name: "Ann".to_string(),
            patient_phone: "555-0000".to_string(),
            appointment_date: tuesday(),
            appointment_time: parse_time("10:00").unwrap(),
        }
    }

    #[test]
    fn test_atomically_rolls_back_on_error() {
        let (ledger, doctor_id) = ledger_with_doctor();
        let result: Result<(), BookingError> = ledger.atomically(|tx| {
            tx.insert_appointment(&new_appointment(doctor_id))?;
            Err(BookingError::IdentityMismatch)
        });
        assert!(matches!(result, Err(BookingError::IdentityMismatch)));

        let booked = ledger
            .atomically(|tx| tx.list_booked_appointments(doctor_id, tuesday()))
            .unwrap();
        assert!(booked.is_empty());
    }

    #[test]
    fn test_uniqueness_enforced_without_precheck() {
        let (ledger, doctor_id) = ledger_with_doctor();
        ledger
            .atomically(|tx| tx.insert_appointment(&new_appointment(doctor_id)))
            .unwrap();
        let again = ledger.atomically(|tx| tx.insert_appointment(&new_appointment(doctor_id)));
        assert!(matches!(again, Err(BookingError::Conflict { .. })));
    }

    #[test]
    fn test_update_status_frees_the_slot() {
        let (ledger, doctor_id) = ledger_with_doctor();
        let booked = ledger
            .atomically(|tx| tx.insert_appointment(&new_appointment(doctor_id)))
            .unwrap();

        let changed = ledger
            .atomically(|tx| tx.update_status(&booked.appointment_id, AppointmentStatus::Cancelled))
            .unwrap();
        assert!(changed);
        assert!(ledger
            .atomically(|tx| tx.list_booked_appointments(doctor_id, tuesday()))
            .unwrap()
            .is_empty());
        assert!(ledger
            .atomically(|tx| tx.insert_appointment(&new_appointment(doctor_id)))
            .is_ok());
    }

    #[test]
    fn test_update_status_unknown_id() {
        let (ledger, _) = ledger_with_doctor();
        assert!(!ledger
            .atomically(|tx| tx.update_status("missing", AppointmentStatus::Cancelled))
            .unwrap());
    }

    #[test]
    fn test_add_template_lists_by_weekday() {
        let (ledger, doctor_id) = ledger_with_doctor();
        ledger
            .add_template(doctor_id, Weekday::Tue, parse_time("09:00").unwrap(), parse_time("12:00").unwrap())
            .unwrap();

        let tue = ledger.atomically(|tx| tx.list_templates(doctor_id, Weekday::Tue)).unwrap();
        assert_eq!(tue.len(), 1);
        assert!(ledger
            .atomically(|tx| tx.list_templates(doctor_id, Weekday::Wed))
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_add_template_unknown_doctor() {
        let (ledger, _) = ledger_with_doctor();
        let result = ledger.add_template(42, Weekday::Tue, parse_time("09:00").unwrap(), parse_time("10:00").unwrap());
        assert!(matches!(result, Err(BookingError::DoctorNotFound(42))));
    }
}
