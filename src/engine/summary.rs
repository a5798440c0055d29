use chrono::NaiveDate;
use serde::Serialize;
use utoipa::ToSchema;

use crate::engine::absentee::records_by_person;
use crate::model::{
    attendance::{AttendanceRecord, AttendanceStatus},
    person::Person,
};

/// Dashboard counts for one day. `absent + unmarked` always equals the
/// number of people `find_absentees` returns for the same inputs.
#[derive(Debug, Default, Clone, PartialEq, Serialize, ToSchema)]
pub struct DailySummary {
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    pub total: usize,
    pub present: usize,
    pub late: usize,
    pub excused: usize,
    pub absent: usize,
    /// No record, or a record nobody marked.
    pub unmarked: usize,
}

pub fn summarize(date: NaiveDate, roster: &[Person], records: &[AttendanceRecord]) -> DailySummary {
    let by_person = records_by_person(date, records);
    let mut summary = DailySummary {
        date,
        total: roster.len(),
        ..Default::default()
    };

    for person in roster {
        match by_person.get(&person.id).map(|r| r.status) {
            Some(AttendanceStatus::Present) => summary.present += 1,
            Some(AttendanceStatus::Late) => summary.late += 1,
            Some(AttendanceStatus::Excused) => summary.excused += 1,
            Some(AttendanceStatus::Absent) => summary.absent += 1,
            Some(AttendanceStatus::Unmarked) | None => summary.unmarked += 1,
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::absentee::find_absentees;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, 1).unwrap()
    }

    fn person(id: u64) -> Person {
        Person {
            id,
            name: format!("Intern {id}"),
            email: None,
            department: "Ops".to_string(),
            supervisor: None,
        }
    }

    #[test]
    fn counts_match_absentee_detection() {
        let roster: Vec<_> = (1..=7).map(person).collect();
        let statuses = [
            (1, AttendanceStatus::Present),
            (2, AttendanceStatus::Present),
            (3, AttendanceStatus::Late),
            (4, AttendanceStatus::Excused),
            (5, AttendanceStatus::Absent),
            (6, AttendanceStatus::Unmarked),
        ];
        let records: Vec<_> = statuses
            .iter()
            .map(|&(id, status)| {
                let mut r = AttendanceRecord::unmarked(id, day());
                r.status = status;
                r
            })
            .collect();

        let summary = summarize(day(), &roster, &records);
        assert_eq!(
            summary,
            DailySummary {
                date: day(),
                total: 7,
                present: 2,
                late: 1,
                excused: 1,
                absent: 1,
                unmarked: 2,
            }
        );
        assert_eq!(
            summary.absent + summary.unmarked,
            find_absentees(day(), &roster, &records).len()
        );
    }

    #[test]
    fn records_for_people_off_roster_are_ignored() {
        let mut stray = AttendanceRecord::unmarked(99, day());
        stray.status = AttendanceStatus::Present;
        let summary = summarize(day(), &[person(1)], &[stray]);
        assert_eq!(summary.total, 1);
        assert_eq!(summary.present, 0);
        assert_eq!(summary.unmarked, 1);
    }
}
