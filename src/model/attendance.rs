use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::model::geofence::Location;

/// Canonical attendance status. Parsing is case-insensitive so that
/// "Present" and "present" from different callers land on the same value.
#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize, ToSchema, Display, AsRefStr,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AttendanceStatus {
    Unmarked,
    Present,
    Absent,
    Late,
    Excused,
}

impl AttendanceStatus {
    /// Statuses that count a person as not in attendance for the day.
    pub fn is_absent_like(&self) -> bool {
        matches!(self, AttendanceStatus::Absent | AttendanceStatus::Unmarked)
    }
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, ToSchema, Display, AsRefStr,
    EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MarkedBy {
    #[serde(rename = "self")]
    #[strum(serialize = "self")]
    SelfService,
    Admin,
}

/// One person's attendance for one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[schema(example = json!({
    "person_id": 7,
    "date": "2026-01-05",
    "status": "present",
    "check_in_at": "2026-01-05T08:55:00Z",
    "check_out_at": "2026-01-05T17:02:00Z",
    "check_in_location": { "latitude": 23.8103, "longitude": 90.4125 },
    "check_out_location": null,
    "marked_by": "self",
    "notes": null
}))]
pub struct AttendanceRecord {
    pub person_id: u64,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_in_at: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_out_at: Option<DateTime<Utc>>,
    pub check_in_location: Option<Location>,
    pub check_out_location: Option<Location>,
    pub marked_by: MarkedBy,
    pub notes: Option<String>,
}

impl AttendanceRecord {
    /// Fresh record with no check-in, as created by an admin action.
    pub fn unmarked(person_id: u64, date: NaiveDate) -> Self {
        Self {
            person_id,
            date,
            status: AttendanceStatus::Unmarked,
            check_in_at: None,
            check_out_at: None,
            check_in_location: None,
            check_out_location: None,
            marked_by: MarkedBy::Admin,
            notes: None,
        }
    }

    /// Minutes between check-in and check-out, when both are recorded.
    pub fn worked_minutes(&self) -> Option<i64> {
        match (self.check_in_at, self.check_out_at) {
            (Some(start), Some(end)) => Some((end - start).num_minutes()),
            _ => None,
        }
    }
}

/// Flat row shape of the `attendance` table.
#[derive(Debug, sqlx::FromRow)]
pub struct AttendanceRow {
    pub person_id: u64,
    pub date: NaiveDate,
    pub status: Option<String>,
    pub check_in_at: Option<DateTime<Utc>>,
    pub check_out_at: Option<DateTime<Utc>>,
    pub check_in_lat: Option<f64>,
    pub check_in_lng: Option<f64>,
    pub check_out_lat: Option<f64>,
    pub check_out_lng: Option<f64>,
    pub marked_by: String,
    pub notes: Option<String>,
}

fn location(lat: Option<f64>, lng: Option<f64>) -> Option<Location> {
    match (lat, lng) {
        (Some(latitude), Some(longitude)) => Some(Location { latitude, longitude }),
        _ => None,
    }
}

impl TryFrom<AttendanceRow> for AttendanceRecord {
    type Error = anyhow::Error;

    fn try_from(row: AttendanceRow) -> anyhow::Result<Self> {
        // blank status in legacy rows means nobody marked the day
        let status = match row.status.as_deref().map(str::trim) {
            None | Some("") => AttendanceStatus::Unmarked,
            Some(s) => AttendanceStatus::from_str(s)
                .map_err(|_| anyhow::anyhow!("unknown attendance status {s:?}"))?,
        };
        let marked_by = MarkedBy::from_str(&row.marked_by)
            .map_err(|_| anyhow::anyhow!("unknown marked_by {:?}", row.marked_by))?;

        Ok(AttendanceRecord {
            person_id: row.person_id,
            date: row.date,
            status,
            check_in_at: row.check_in_at,
            check_out_at: row.check_out_at,
            check_in_location: location(row.check_in_lat, row.check_in_lng),
            check_out_location: location(row.check_out_lat, row.check_out_lng),
            marked_by,
            notes: row.notes,
        })
    }
}
