//! Collaborators the attendance engine reads from and writes to.
//!
//! The engine only sees these traits; [`mysql`] backs them in production and
//! `memory` backs them in tests.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::model::{attendance::AttendanceRecord, geofence::Geofence, person::Person};

pub mod geofence_cache;
#[cfg(test)]
pub mod memory;
pub mod mysql;

/// Record of truth for attendance. At most one record per `(person_id, date)`.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get(&self, person_id: u64, date: NaiveDate) -> anyhow::Result<Option<AttendanceRecord>>;

    /// Insert or replace the record for its `(person_id, date)` key.
    async fn put(&self, record: &AttendanceRecord) -> anyhow::Result<()>;

    async fn list_by_date(&self, date: NaiveDate) -> anyhow::Result<Vec<AttendanceRecord>>;
}

#[async_trait]
pub trait GeofenceSource: Send + Sync {
    async fn list_geofences(&self) -> anyhow::Result<Vec<Geofence>>;
}

#[async_trait]
pub trait RosterSource: Send + Sync {
    /// Active people in stable roster order.
    async fn list_active_people(&self) -> anyhow::Result<Vec<Person>>;
}
