//! Canonical patient records.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::field::Field;

/// Fields a record must carry to be admitted for analysis.
pub const REQUIRED_FIELDS: [Field; 3] = [
    Field::Age,
    Field::TotalSessionsAssigned,
    Field::SessionsAttended,
];

/// A patient record after normalization.
///
/// Field order matches [`Field::OUTPUT`]; the serde names are the canonical
/// header names, so the struct serializes directly to the output artifact.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PatientRecord {
    /// Opaque identifier
    #[serde(rename = "Patient_ID")]
    pub patient_id: Option<String>,
    #[serde(rename = "Patient_Name")]
    pub patient_name: Option<String>,
    #[serde(rename = "Age")]
    pub age: Option<u32>,
    /// Male, Female, Other, or an unmapped title-cased value
    #[serde(rename = "Gender")]
    pub gender: Option<String>,
    #[serde(rename = "City")]
    pub city: Option<String>,
    #[serde(rename = "Registration_Date")]
    pub registration_date: Option<NaiveDate>,
    #[serde(rename = "Program_Type")]
    pub program_type: Option<String>,
    #[serde(rename = "Therapy_Type")]
    pub therapy_type: Option<String>,
    #[serde(rename = "Total_Sessions_Assigned")]
    pub total_sessions_assigned: Option<u32>,
    #[serde(rename = "Sessions_Attended")]
    pub sessions_attended: Option<u32>,
    /// Fraction parsed from the source percentage text
    #[serde(rename = "Attendance_Rate")]
    pub attendance_rate: Option<f64>,
    #[serde(rename = "Provider_Name")]
    pub provider_name: Option<String>,
    #[serde(rename = "Case_Status")]
    pub case_status: Option<String>,
    #[serde(rename = "Risk_Level")]
    pub risk_level: Option<String>,
    #[serde(rename = "Satisfaction_Score")]
    pub satisfaction_score: Option<f64>,
    /// Sessions_Attended / Total_Sessions_Assigned, set by the reconciler
    #[serde(rename = "Attendance_Rate_Fixed", default)]
    pub attendance_rate_fixed: Option<f64>,
}

impl PatientRecord {
    /// Required fields that are null on this record.
    pub fn missing_required(&self) -> Vec<Field> {
        REQUIRED_FIELDS
            .iter()
            .copied()
            .filter(|f| match f {
                Field::Age => self.age.is_none(),
                Field::TotalSessionsAssigned => self.total_sessions_assigned.is_none(),
                Field::SessionsAttended => self.sessions_attended.is_none(),
                _ => false,
            })
            .collect()
    }

    /// Whether all required fields are present.
    pub fn is_admissible(&self) -> bool {
        self.missing_required().is_empty()
    }

    /// Attended over assigned, or `None` when either count is missing or
    /// nothing was assigned.
    pub fn computed_attendance_rate(&self) -> Option<f64> {
        match (self.sessions_attended, self.total_sessions_assigned) {
            (Some(attended), Some(assigned)) if assigned > 0 => {
                Some(attended as f64 / assigned as f64)
            }
            _ => None,
        }
    }

    /// Whether attended sessions exceed assigned sessions.
    pub fn is_over_attended(&self) -> bool {
        matches!(
            (self.sessions_attended, self.total_sessions_assigned),
            (Some(attended), Some(assigned)) if attended > assigned
        )
    }
}
