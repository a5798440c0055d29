//! In-memory collaborators for tests.

use std::collections::HashSet;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::NaiveDate;

use super::{GeofenceSource, RecordStore, RosterSource};
use crate::model::{attendance::AttendanceRecord, geofence::Geofence, person::Person};

#[derive(Default)]
pub struct MemoryRecordStore {
    records: RwLock<Vec<AttendanceRecord>>,
    failing_people: RwLock<HashSet<u64>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write for `person_id` fail, to exercise partial failures.
    pub fn fail_writes_for(&self, person_id: u64) {
        if let Ok(mut failing) = self.failing_people.write() {
            failing.insert(person_id);
        }
    }

    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or(0)
    }
}

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow::anyhow!("memory store lock poisoned")
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get(&self, person_id: u64, date: NaiveDate) -> anyhow::Result<Option<AttendanceRecord>> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records
            .iter()
            .find(|r| r.person_id == person_id && r.date == date)
            .cloned())
    }

    async fn put(&self, record: &AttendanceRecord) -> anyhow::Result<()> {
        if self
            .failing_people
            .read()
            .map_err(poisoned)?
            .contains(&record.person_id)
        {
            anyhow::bail!("write rejected for person {}", record.person_id);
        }

        let mut records = self.records.write().map_err(poisoned)?;
        match records
            .iter_mut()
            .find(|r| r.person_id == record.person_id && r.date == record.date)
        {
            Some(existing) => *existing = record.clone(),
            None => records.push(record.clone()),
        }
        Ok(())
    }

    async fn list_by_date(&self, date: NaiveDate) -> anyhow::Result<Vec<AttendanceRecord>> {
        let records = self.records.read().map_err(poisoned)?;
        Ok(records.iter().filter(|r| r.date == date).cloned().collect())
    }
}

/// Fixed geofence list.
#[derive(Default)]
pub struct StaticGeofences(pub Vec<Geofence>);

#[async_trait]
impl GeofenceSource for StaticGeofences {
    async fn list_geofences(&self) -> anyhow::Result<Vec<Geofence>> {
        Ok(self.0.clone())
    }
}

/// Fixed roster.
#[derive(Default)]
pub struct StaticRoster(pub Vec<Person>);

#[async_trait]
impl RosterSource for StaticRoster {
    async fn list_active_people(&self) -> anyhow::Result<Vec<Person>> {
        Ok(self.0.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 2).unwrap()
    }

    #[actix_web::test]
    async fn put_replaces_same_key() {
        let store = MemoryRecordStore::new();
        let mut record = AttendanceRecord::unmarked(1, day());
        store.put(&record).await.unwrap();

        record.notes = Some("second write".to_string());
        store.put(&record).await.unwrap();

        assert_eq!(store.len(), 1);
        let stored = store.get(1, day()).await.unwrap().unwrap();
        assert_eq!(stored.notes.as_deref(), Some("second write"));
    }

    #[actix_web::test]
    async fn list_by_date_filters_other_days() {
        let store = MemoryRecordStore::new();
        store.put(&AttendanceRecord::unmarked(1, day())).await.unwrap();
        store
            .put(&AttendanceRecord::unmarked(1, day().succ_opt().unwrap()))
            .await
            .unwrap();

        assert_eq!(store.list_by_date(day()).await.unwrap().len(), 1);
    }

    #[actix_web::test]
    async fn failing_person_write_errors() {
        let store = MemoryRecordStore::new();
        store.fail_writes_for(4);
        assert!(store.put(&AttendanceRecord::unmarked(4, day())).await.is_err());
        assert!(store.get(4, day()).await.unwrap().is_none());
    }
}
