use serde::{Deserialize, Serialize};

use super::AvailabilityTemplate;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Doctor {
    pub doctor_id: i64,
    pub name: String,
    pub specialization: String,
    pub nationality: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewDoctor {
    pub name: String,
    pub specialization: String,
    pub nationality: Option<String>,
}

/// Weekly availability attached to a doctor search result. A doctor with no
/// templates is reported as `Unavailable`, never dropped from the listing.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "status", content = "windows", rename_all = "snake_case")]
pub enum DoctorAvailability {
    Available(Vec<AvailabilityTemplate>),
    Unavailable,
}

impl DoctorAvailability {
    pub fn from_templates(templates: Vec<AvailabilityTemplate>) -> Self {
        if templates.is_empty() {
            DoctorAvailability::Unavailable
        } else {
            DoctorAvailability::Available(templates)
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DoctorListing {
    pub doctor: Doctor,
    pub availability: DoctorAvailability,
}

/// Outcome of a specialization lookup. Serialized as `{"matches": [...]}` or
/// `{"specializations": [...]}`.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(untagged)]
pub enum DoctorSearch {
    Matches { matches: Vec<DoctorListing> },
    /// No doctor matched; these are the specializations that exist, so the
    /// caller can retry with a corrected term.
    NoMatch { specializations: Vec<String> },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_wire_shape() {
        let none = DoctorSearch::NoMatch {
            specializations: vec!["Cardiologist".to_string()],
        };
        assert_eq!(
            serde_json::to_value(&none).unwrap(),
            serde_json::json!({"specializations": ["Cardiologist"]})
        );

        let found = DoctorSearch::Matches {
            matches: vec![DoctorListing {
                doctor: Doctor {
                    doctor_id: 1,
                    name: "Dr. Rao".to_string(),
                    specialization: "Orthopedic".to_string(),
                    nationality: None,
                },
                availability: DoctorAvailability::Unavailable,
            }],
        };
        let json = serde_json::to_value(&found).unwrap();
        assert_eq!(json["matches"][0]["doctor"]["name"], "Dr. Rao");
        assert_eq!(json["matches"][0]["availability"]["status"], "unavailable");
    }
}
