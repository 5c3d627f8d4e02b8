use serde::{Deserialize, Serialize};

use super::BookingRequest;

/// Classifier output.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Label {
    Faq,
    Appointment,
    Unclear,
}

impl Label {
    /// Anything outside the contract (`faq`, `appointment`) reads as `Unclear`.
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "faq" => Label::Faq,
            "appointment" => Label::Appointment,
            _ => Label::Unclear,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Label::Faq => "faq",
            Label::Appointment => "appointment",
            Label::Unclear => "unclear",
        }
    }
}

/// A scheduling utterance after field extraction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum BookingCommand {
    FindDoctors {
        specialization: String,
    },
    CheckAvailability {
        doctor_id: Option<i64>,
        date: Option<String>,
    },
    AvailableOn {
        date: Option<String>,
    },
    Book {
        #[serde(flatten)]
        fields: BookingRequest,
    },
    Cancel {
        appointment_id: Option<String>,
        patient_name: Option<String>,
        patient_phone: Option<String>,
    },
    Reschedule {
        appointment_id: Option<String>,
        patient_name: Option<String>,
        patient_phone: Option<String>,
        date: Option<String>,
        time: Option<String>,
    },
    MyAppointments {
        patient_phone: Option<String>,
    },
    Clarify {
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_parse_contract_violation_is_unclear() {
        assert_eq!(Label::parse("FAQ"), Label::Faq);
        assert_eq!(Label::parse(" appointment\n"), Label::Appointment);
        assert_eq!(Label::parse("billing"), Label::Unclear);
        assert_eq!(Label::parse(""), Label::Unclear);
    }

    #[test]
    fn test_book_command_flattens_fields() {
        let json = r#"{"action":"book","doctor_id":2,"date":"2025-06-17","time":"10:00","patient_name":"John Doe","patient_phone":null}"#;
        let cmd: BookingCommand = serde_json::from_str(json).unwrap();
        match cmd {
            BookingCommand::Book { fields } => {
                assert_eq!(fields.doctor_id, Some(2));
                assert_eq!(fields.patient_phone, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
