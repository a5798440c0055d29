//! MySQL-backed collaborators.
//!
//! Tables used:
//! - `attendance` (unique on `person_id, date`)
//! - `interns` (roster, `status = 'active'` rows only)
//! - `geofences`

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::MySqlPool;

use super::{GeofenceSource, RecordStore, RosterSource};
use crate::model::{
    attendance::{AttendanceRecord, AttendanceRow},
    geofence::{Geofence, GeofenceRow},
    person::Person,
};

const ATTENDANCE_COLUMNS: &str = r#"
    person_id, date, status, check_in_at, check_out_at,
    check_in_lat, check_in_lng, check_out_lat, check_out_lng,
    marked_by, notes
"#;

#[derive(Clone)]
pub struct MySqlRecordStore {
    pool: MySqlPool,
}

impl MySqlRecordStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RecordStore for MySqlRecordStore {
    async fn get(&self, person_id: u64, date: NaiveDate) -> anyhow::Result<Option<AttendanceRecord>> {
        let row = sqlx::query_as::<_, AttendanceRow>(&format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE person_id = ? AND date = ?"
        ))
        .bind(person_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        row.map(AttendanceRecord::try_from).transpose()
    }

    async fn put(&self, record: &AttendanceRecord) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO attendance
            (person_id, date, status, check_in_at, check_out_at,
             check_in_lat, check_in_lng, check_out_lat, check_out_lng,
             marked_by, notes)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON DUPLICATE KEY UPDATE
                status = VALUES(status),
                check_in_at = VALUES(check_in_at),
                check_out_at = VALUES(check_out_at),
                check_in_lat = VALUES(check_in_lat),
                check_in_lng = VALUES(check_in_lng),
                check_out_lat = VALUES(check_out_lat),
                check_out_lng = VALUES(check_out_lng),
                marked_by = VALUES(marked_by),
                notes = VALUES(notes)
            "#,
        )
        .bind(record.person_id)
        .bind(record.date)
        .bind(record.status.as_ref())
        .bind(record.check_in_at)
        .bind(record.check_out_at)
        .bind(record.check_in_location.map(|l| l.latitude))
        .bind(record.check_in_location.map(|l| l.longitude))
        .bind(record.check_out_location.map(|l| l.latitude))
        .bind(record.check_out_location.map(|l| l.longitude))
        .bind(record.marked_by.as_ref())
        .bind(record.notes.as_deref())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_by_date(&self, date: NaiveDate) -> anyhow::Result<Vec<AttendanceRecord>> {
        let rows = sqlx::query_as::<_, AttendanceRow>(&format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE date = ? ORDER BY person_id"
        ))
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AttendanceRecord::try_from).collect()
    }
}

#[derive(Clone)]
pub struct MySqlGeofenceSource {
    pool: MySqlPool,
}

impl MySqlGeofenceSource {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl GeofenceSource for MySqlGeofenceSource {
    async fn list_geofences(&self) -> anyhow::Result<Vec<Geofence>> {
        let rows = sqlx::query_as::<_, GeofenceRow>(
            r#"
            SELECT name, latitude, longitude, radius_meters
            FROM geofences
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Geofence::from).collect())
    }
}

#[derive(Clone)]
pub struct MySqlRosterSource {
    pool: MySqlPool,
}

impl MySqlRosterSource {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RosterSource for MySqlRosterSource {
    async fn list_active_people(&self) -> anyhow::Result<Vec<Person>> {
        let people = sqlx::query_as::<_, Person>(
            r#"
            SELECT id, name, email, department, supervisor
            FROM interns
            WHERE status = 'active'
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(people)
    }
}
