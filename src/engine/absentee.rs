use std::collections::HashMap;

use chrono::NaiveDate;

use crate::model::{attendance::AttendanceRecord, person::Person};

/// Index a day's records by person. Records for other days are ignored.
pub fn records_by_person(
    date: NaiveDate,
    records: &[AttendanceRecord],
) -> HashMap<u64, &AttendanceRecord> {
    records
        .iter()
        .filter(|r| r.date == date)
        .map(|r| (r.person_id, r))
        .collect()
}

/// People with no record on `date`, or whose record is absent/unmarked.
/// Result keeps roster order.
pub fn find_absentees(date: NaiveDate, roster: &[Person], records: &[AttendanceRecord]) -> Vec<Person> {
    let by_person = records_by_person(date, records);

    roster
        .iter()
        .filter(|person| {
            by_person
                .get(&person.id)
                .is_none_or(|record| record.status.is_absent_like())
        })
        .cloned()
        .collect()
}
