use anyhow::Context;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Utc, Weekday};
use rusqlite::{params, Connection, ErrorCode};

use crate::errors::BookingError;
use crate::models::availability::{parse_time, parse_weekday, weekday_full_name};
use crate::models::{
    Appointment, AppointmentStatus, AvailabilityTemplate, Doctor, NewAppointment, NewDoctor,
};

const TIMESTAMP_FMT: &str = "%Y-%m-%d %H:%M:%S";
const DATE_FMT: &str = "%Y-%m-%d";
const TIME_FMT: &str = "%H:%M";

const APPOINTMENT_COLUMNS: &str = "appointment_id, doctor_id, availability_id, patient_name, patient_phone, \
     appointment_date, appointment_time, status, created_at, updated_at";

// ── Doctors ──

pub fn insert_doctor(conn: &Connection, doctor: &NewDoctor) -> anyhow::Result<Doctor> {
    conn.execute(
        "INSERT INTO doctors (name, specialization, nationality) VALUES (?1, ?2, ?3)",
        params![doctor.name, doctor.specialization, doctor.nationality],
    )?;
    Ok(Doctor {
        doctor_id: conn.last_insert_rowid(),
        name: doctor.name.clone(),
        specialization: doctor.specialization.clone(),
        nationality: doctor.nationality.clone(),
    })
}

pub fn get_doctor(conn: &Connection, doctor_id: i64) -> anyhow::Result<Option<Doctor>> {
    let result = conn.query_row(
        "SELECT doctor_id, name, specialization, nationality FROM doctors WHERE doctor_id = ?1",
        params![doctor_id],
        parse_doctor_row,
    );

    match result {
        Ok(doctor) => Ok(Some(doctor)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Case-insensitive substring match on specialization.
pub fn find_doctors_by_specialization(
    conn: &Connection,
    query: &str,
) -> anyhow::Result<Vec<Doctor>> {
    let pattern = format!("%{}%", escape_like(query.trim()));
    let mut stmt = conn.prepare(
        "SELECT doctor_id, name, specialization, nationality FROM doctors
         WHERE specialization LIKE ?1 ESCAPE '\\'
         ORDER BY name ASC, doctor_id ASC",
    )?;
    let rows = stmt.query_map(params![pattern], parse_doctor_row)?;

    let mut doctors = vec![];
    for row in rows {
        doctors.push(row?);
    }
    Ok(doctors)
}

pub fn list_doctors(conn: &Connection) -> anyhow::Result<Vec<Doctor>> {
    let mut stmt = conn.prepare(
        "SELECT doctor_id, name, specialization, nationality FROM doctors ORDER BY name ASC, doctor_id ASC",
    )?;
    let rows = stmt.query_map([], parse_doctor_row)?;

    let mut doctors = vec![];
    for row in rows {
        doctors.push(row?);
    }
    Ok(doctors)
}

pub fn list_specializations(conn: &Connection) -> anyhow::Result<Vec<String>> {
    let mut stmt =
        conn.prepare("SELECT DISTINCT specialization FROM doctors ORDER BY specialization ASC")?;
    let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

    let mut specializations = vec![];
    for row in rows {
        specializations.push(row?);
    }
    Ok(specializations)
}

fn parse_doctor_row(row: &rusqlite::Row) -> rusqlite::Result<Doctor> {
    Ok(Doctor {
        doctor_id: row.get(0)?,
        name: row.get(1)?,
        specialization: row.get(2)?,
        nationality: row.get(3)?,
    })
}

fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

// ── Availability templates ──

pub fn insert_availability(
    conn: &Connection,
    doctor_id: i64,
    day: Weekday,
    start: NaiveTime,
    end: NaiveTime,
) -> anyhow::Result<AvailabilityTemplate> {
    conn.execute(
        "INSERT INTO doctor_availability (doctor_id, day_of_week, start_time, end_time)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            doctor_id,
            weekday_full_name(day),
            start.format(TIME_FMT).to_string(),
            end.format(TIME_FMT).to_string(),
        ],
    )?;
    Ok(AvailabilityTemplate {
        availability_id: conn.last_insert_rowid(),
        doctor_id,
        day_of_week: day,
        start_time: start,
        end_time: end,
    })
}

/// Templates for one doctor on one weekday, earliest first.
pub fn list_templates(
    conn: &Connection,
    doctor_id: i64,
    day: Weekday,
) -> anyhow::Result<Vec<AvailabilityTemplate>> {
    let mut stmt = conn.prepare(
        "SELECT availability_id, doctor_id, day_of_week, start_time, end_time
         FROM doctor_availability WHERE doctor_id = ?1 AND day_of_week = ?2
         ORDER BY start_time ASC, availability_id ASC",
    )?;
    let rows = stmt.query_map(params![doctor_id, weekday_full_name(day)], |row| {
        Ok(parse_template_row(row))
    })?;

    let mut templates = vec![];
    for row in rows {
        templates.push(row??);
    }
    Ok(templates)
}

pub fn list_doctor_templates(
    conn: &Connection,
    doctor_id: i64,
) -> anyhow::Result<Vec<AvailabilityTemplate>> {
    let mut stmt = conn.prepare(
        "SELECT availability_id, doctor_id, day_of_week, start_time, end_time
         FROM doctor_availability WHERE doctor_id = ?1",
    )?;
    let rows = stmt.query_map(params![doctor_id], |row| Ok(parse_template_row(row)))?;

    let mut templates = vec![];
    for row in rows {
        templates.push(row??);
    }
    templates.sort_by_key(|t| (t.day_of_week.num_days_from_monday(), t.start_time));
    Ok(templates)
}

/// Every doctor's templates for a weekday.
pub fn list_templates_on_day(
    conn: &Connection,
    day: Weekday,
) -> anyhow::Result<Vec<AvailabilityTemplate>> {
    let mut stmt = conn.prepare(
        "SELECT availability_id, doctor_id, day_of_week, start_time, end_time
         FROM doctor_availability WHERE day_of_week = ?1
         ORDER BY doctor_id ASC, start_time ASC",
    )?;
    let rows = stmt.query_map(params![weekday_full_name(day)], |row| {
        Ok(parse_template_row(row))
    })?;

    let mut templates = vec![];
    for row in rows {
        templates.push(row??);
    }
    Ok(templates)
}

fn parse_template_row(row: &rusqlite::Row) -> anyhow::Result<AvailabilityTemplate> {
    let day_str: String = row.get(2)?;
    let start_str: String = row.get(3)?;
    let end_str: String = row.get(4)?;

    Ok(AvailabilityTemplate {
        availability_id: row.get(0)?,
        doctor_id: row.get(1)?,
        day_of_week: parse_weekday(&day_str)?,
        start_time: parse_time(&start_str)?,
        end_time: parse_time(&end_str)?,
    })
}

// ── Appointments ──

/// Inserts a BOOKED appointment. The partial unique index on
/// (doctor_id, appointment_date, appointment_time) WHERE status = 'BOOKED'
/// turns a double booking into `BookingError::Conflict`, whatever the caller
/// checked beforehand.
pub fn insert_appointment(
    conn: &Connection,
    new: &NewAppointment,
) -> Result<Appointment, BookingError> {
    let now = Utc::now().naive_utc();
    let now_str = now.format(TIMESTAMP_FMT).to_string();
    let appointment_id = uuid::Uuid::new_v4().to_string();

    let result = conn.execute(
        "INSERT INTO appointments (appointment_id, doctor_id, availability_id, patient_name, patient_phone,
                                   appointment_date, appointment_time, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
        params![
            appointment_id,
            new.doctor_id,
            new.availability_id,
            new.patient_name,
            new.patient_phone,
            new.appointment_date.format(DATE_FMT).to_string(),
            new.appointment_time.format(TIME_FMT).to_string(),
            AppointmentStatus::Booked.as_str(),
            now_str,
        ],
    );

    match result {
        Ok(_) => {}
        Err(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::ConstraintViolation => {
            if e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE {
                return Err(BookingError::Conflict {
                    alternatives: vec![],
                });
            }
            return Err(BookingError::Storage(anyhow::anyhow!(
                "constraint violation inserting appointment: {e}"
            )));
        }
        Err(e) => return Err(e.into()),
    }

    Ok(Appointment {
        appointment_id,
        doctor_id: new.doctor_id,
        availability_id: new.availability_id,
        patient_name: new.patient_name.clone(),
        patient_phone: new.patient_phone.clone(),
        appointment_date: new.appointment_date,
        appointment_time: new.appointment_time,
        status: AppointmentStatus::Booked,
        created_at: now,
        updated_at: now,
    })
}

pub fn list_booked_appointments(
    conn: &Connection,
    doctor_id: i64,
    date: NaiveDate,
) -> anyhow::Result<Vec<Appointment>> {
    let sql = format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments
         WHERE doctor_id = ?1 AND appointment_date = ?2 AND status = 'BOOKED'
         ORDER BY appointment_time ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(
        params![doctor_id, date.format(DATE_FMT).to_string()],
        |row| Ok(parse_appointment_row(row)),
    )?;

    let mut appointments = vec![];
    for row in rows {
        appointments.push(row??);
    }
    Ok(appointments)
}

pub fn get_appointment(conn: &Connection, appointment_id: &str) -> anyhow::Result<Option<Appointment>> {
    let sql = format!("SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE appointment_id = ?1");
    let result = conn.query_row(&sql, params![appointment_id], |row| {
        Ok(parse_appointment_row(row))
    });

    match result {
        Ok(appointment) => Ok(Some(appointment?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Status transition only; rows are never deleted.
pub fn update_appointment_status(
    conn: &Connection,
    appointment_id: &str,
    status: AppointmentStatus,
) -> anyhow::Result<bool> {
    let now = Utc::now().naive_utc().format(TIMESTAMP_FMT).to_string();
    let count = conn.execute(
        "UPDATE appointments SET status = ?1, updated_at = ?2 WHERE appointment_id = ?3",
        params![status.as_str(), now, appointment_id],
    )?;
    Ok(count > 0)
}

pub fn get_booked_for_phone(conn: &Connection, phone: &str) -> anyhow::Result<Vec<Appointment>> {
    let sql = format!(
        "SELECT {APPOINTMENT_COLUMNS} FROM appointments
         WHERE patient_phone = ?1 AND status = 'BOOKED'
         ORDER BY appointment_date ASC, appointment_time ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![phone], |row| Ok(parse_appointment_row(row)))?;

    let mut appointments = vec![];
    for row in rows {
        appointments.push(row??);
    }
    Ok(appointments)
}

pub fn get_all_appointments(
    conn: &Connection,
    status_filter: Option<AppointmentStatus>,
    limit: i64,
) -> anyhow::Result<Vec<Appointment>> {
    let (sql, params_vec): (String, Vec<Box<dyn rusqlite::types::ToSql>>) = match status_filter {
        Some(status) => (
            format!(
                "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE status = ?1 \
                 ORDER BY appointment_date DESC, appointment_time DESC LIMIT ?2"
            ),
            vec![
                Box::new(status.as_str().to_string()) as Box<dyn rusqlite::types::ToSql>,
                Box::new(limit),
            ],
        ),
        None => (
            format!(
                "SELECT {APPOINTMENT_COLUMNS} FROM appointments \
                 ORDER BY appointment_date DESC, appointment_time DESC LIMIT ?1"
            ),
            vec![Box::new(limit) as Box<dyn rusqlite::types::ToSql>],
        ),
    };

    let mut stmt = conn.prepare(&sql)?;
    let params_refs: Vec<&dyn rusqlite::types::ToSql> =
        params_vec.iter().map(|p| p.as_ref()).collect();
    let rows = stmt.query_map(params_refs.as_slice(), |row| Ok(parse_appointment_row(row)))?;

    let mut appointments = vec![];
    for row in rows {
        appointments.push(row??);
    }
    Ok(appointments)
}

fn parse_appointment_row(row: &rusqlite::Row) -> anyhow::Result<Appointment> {
    let appointment_id: String = row.get(0)?;
    let date_str: String = row.get(5)?;
    let time_str: String = row.get(6)?;
    let status_str: String = row.get(7)?;
    let created_at_str: String = row.get(8)?;
    let updated_at_str: String = row.get(9)?;

    let appointment_date = NaiveDate::parse_from_str(&date_str, DATE_FMT)
        .with_context(|| format!("bad appointment_date on {appointment_id}: {date_str}"))?;
    let appointment_time = parse_time(&time_str)
        .with_context(|| format!("bad appointment_time on {appointment_id}"))?;
    let created_at = NaiveDateTime::parse_from_str(&created_at_str, TIMESTAMP_FMT)
        .unwrap_or_else(|_| Utc::now().naive_utc());
    let updated_at = NaiveDateTime::parse_from_str(&updated_at_str, TIMESTAMP_FMT)
        .unwrap_or_else(|_| Utc::now().naive_utc());

    Ok(Appointment {
        appointment_id,
        doctor_id: row.get(1)?,
        availability_id: row.get(2)?,
        patient_name: row.get(3)?,
        patient_phone: row.get(4)?,
        appointment_date,
        appointment_time,
        status: AppointmentStatus::parse(&status_str),
        created_at,
        updated_at,
    })
}
