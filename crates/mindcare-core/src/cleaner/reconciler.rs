//! Derived attendance rate.

use crate::models::PatientRecord;

/// Set Attendance_Rate_Fixed on every record from its validated counts.
///
/// Records with zero sessions assigned get a null rate. Returns how many
/// records ended up with a null rate.
pub fn reconcile(records: &mut [PatientRecord]) -> usize {
    let mut undefined = 0;
    for record in records.iter_mut() {
        record.attendance_rate_fixed = record.computed_attendance_rate();
        if record.attendance_rate_fixed.is_none() {
            undefined += 1;
        }
    }
    undefined
}
