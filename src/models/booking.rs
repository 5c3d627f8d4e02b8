use serde::{Deserialize, Serialize};

/// Booking fields gathered so far. Dates and times stay as the raw strings the
/// patient (or the extractor) supplied; the planner decides whether they are
/// concrete enough to book.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BookingRequest {
    pub doctor_id: Option<i64>,
    pub date: Option<String>,
    pub time: Option<String>,
    pub patient_name: Option<String>,
    pub patient_phone: Option<String>,
}

impl BookingRequest {
    /// Overlays every field `newer` carries on top of `self`.
    pub fn merge(&mut self, newer: &BookingRequest) {
        if newer.doctor_id.is_some() {
            self.doctor_id = newer.doctor_id;
        }
        if let Some(date) = non_blank(&newer.date) {
            self.date = Some(date);
        }
        if let Some(time) = non_blank(&newer.time) {
            self.time = Some(time);
        }
        if let Some(name) = non_blank(&newer.patient_name) {
            self.patient_name = Some(name);
        }
        if let Some(phone) = non_blank(&newer.patient_phone) {
            self.patient_phone = Some(phone);
        }
    }

    /// Names of required fields still absent, in the order a receptionist asks.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.doctor_id.is_none() {
            missing.push("doctor");
        }
        if non_blank(&self.date).is_none() {
            missing.push("date");
        }
        if non_blank(&self.time).is_none() {
            missing.push("time");
        }
        if non_blank(&self.patient_name).is_none() {
            missing.push("patient name");
        }
        if non_blank(&self.patient_phone).is_none() {
            missing.push("phone number");
        }
        missing
    }

    pub fn is_empty(&self) -> bool {
        *self == BookingRequest::default()
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_keeps_earlier_fields() {
        let mut pending = BookingRequest {
            doctor_id: Some(3),
            ..Default::default()
        };
        pending.merge(&BookingRequest {
            date: Some("2025-06-17".to_string()),
            time: Some("10:00".to_string()),
            patient_name: Some("John Doe".to_string()),
            patient_phone: Some("555-1234".to_string()),
            ..Default::default()
        });
        assert_eq!(pending.doctor_id, Some(3));
        assert_eq!(pending.time.as_deref(), Some("10:00"));
        assert!(pending.missing_fields().is_empty());
    }

    #[test]
    fn test_merge_ignores_blank_values() {
        let mut pending = BookingRequest {
            patient_name: Some("Jane".to_string()),
            ..Default::default()
        };
        pending.merge(&BookingRequest {
            patient_name: Some("  ".to_string()),
            ..Default::default()
        });
        assert_eq!(pending.patient_name.as_deref(), Some("Jane"));
    }

    #[test]
    fn test_missing_fields_order() {
        let req = BookingRequest {
            time: Some("10:00".to_string()),
            ..Default::default()
        };
        assert_eq!(
            req.missing_fields(),
            vec!["doctor", "date", "patient name", "phone number"]
        );
    }
}
