//! Canonical field names.

use std::fmt;

/// One of the canonical patient-record fields.
///
/// The first fifteen variants are the source columns, in the positional
/// order the raw spreadsheet uses. `AttendanceRateFixed` is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    PatientId,
    PatientName,
    Age,
    Gender,
    City,
    RegistrationDate,
    ProgramType,
    TherapyType,
    TotalSessionsAssigned,
    SessionsAttended,
    AttendanceRate,
    ProviderName,
    CaseStatus,
    RiskLevel,
    SatisfactionScore,
    AttendanceRateFixed,
}

/// Number of positional columns expected in the raw source.
pub const SOURCE_FIELD_COUNT: usize = 15;

impl Field {
    /// Source columns in positional order.
    pub const SOURCE: [Field; SOURCE_FIELD_COUNT] = [
        Field::PatientId,
        Field::PatientName,
        Field::Age,
        Field::Gender,
        Field::City,
        Field::RegistrationDate,
        Field::ProgramType,
        Field::TherapyType,
        Field::TotalSessionsAssigned,
        Field::SessionsAttended,
        Field::AttendanceRate,
        Field::ProviderName,
        Field::CaseStatus,
        Field::RiskLevel,
        Field::SatisfactionScore,
    ];

    /// Output columns: the source columns followed by the derived rate.
    pub const OUTPUT: [Field; SOURCE_FIELD_COUNT + 1] = [
        Field::PatientId,
        Field::PatientName,
        Field::Age,
        Field::Gender,
        Field::City,
        Field::RegistrationDate,
        Field::ProgramType,
        Field::TherapyType,
        Field::TotalSessionsAssigned,
        Field::SessionsAttended,
        Field::AttendanceRate,
        Field::ProviderName,
        Field::CaseStatus,
        Field::RiskLevel,
        Field::SatisfactionScore,
        Field::AttendanceRateFixed,
    ];

    /// Canonical header name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::PatientId => "Patient_ID",
            Field::PatientName => "Patient_Name",
            Field::Age => "Age",
            Field::Gender => "Gender",
            Field::City => "City",
            Field::RegistrationDate => "Registration_Date",
            Field::ProgramType => "Program_Type",
            Field::TherapyType => "Therapy_Type",
            Field::TotalSessionsAssigned => "Total_Sessions_Assigned",
            Field::SessionsAttended => "Sessions_Attended",
            Field::AttendanceRate => "Attendance_Rate",
            Field::ProviderName => "Provider_Name",
            Field::CaseStatus => "Case_Status",
            Field::RiskLevel => "Risk_Level",
            Field::SatisfactionScore => "Satisfaction_Score",
            Field::AttendanceRateFixed => "Attendance_Rate_Fixed",
        }
    }

    /// Position of this field in the raw source, if it is a source field.
    pub fn source_index(&self) -> Option<usize> {
        Self::SOURCE.iter().position(|f| f == self)
    }

    /// Look up a field by header name, ignoring case, spaces and underscores.
    pub fn from_header(header: &str) -> Option<Field> {
        let key = header_key(header);
        Self::OUTPUT
            .iter()
            .copied()
            .find(|f| header_key(f.as_str()) == key)
    }

    /// Whether a source header loosely matches this field's canonical name.
    pub fn matches_header(&self, header: &str) -> bool {
        header_key(header) == header_key(self.as_str())
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn header_key(header: &str) -> String {
    header
        .trim_start_matches('\u{feff}')
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
        .flat_map(char::to_lowercase)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_extends_source() {
        assert_eq!(&Field::OUTPUT[..SOURCE_FIELD_COUNT], &Field::SOURCE[..]);
        assert_eq!(Field::OUTPUT[SOURCE_FIELD_COUNT], Field::AttendanceRateFixed);
        assert_eq!(Field::AttendanceRateFixed.source_index(), None);
        assert_eq!(Field::CaseStatus.source_index(), Some(12));
    }

    #[test]
    fn test_loose_header_matching() {
        assert!(Field::TotalSessionsAssigned.matches_header("Total Sessions Assigned"));
        assert!(Field::PatientId.matches_header("patient_id"));
        assert!(Field::PatientId.matches_header("\u{feff}Patient ID"));
        assert!(!Field::Age.matches_header("Gender"));
    }

    #[test]
    fn test_from_header() {
        assert_eq!(Field::from_header("attendance rate fixed"), Some(Field::AttendanceRateFixed));
        assert_eq!(Field::from_header("CASE_STATUS"), Some(Field::CaseStatus));
        assert_eq!(Field::from_header("Unrelated"), None);
    }
}
