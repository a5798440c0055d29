//! Per-person, per-day check-in / check-out transitions.
//!
//! `NoRecord -> CheckedIn -> CheckedOut`, with an admin-settable status label
//! that can be applied at any point. Callers must serialize mutations for the
//! same `(person_id, date)` key (see `utils::key_lock`); nothing here locks.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};
use utoipa::ToSchema;

use crate::engine::geo;
use crate::error::AttendanceError;
use crate::model::attendance::{AttendanceRecord, AttendanceStatus, MarkedBy};
use crate::model::geofence::Location;
use crate::store::{GeofenceSource, RecordStore};

/// Per-id outcome of a bulk admin mark.
#[derive(Debug, Serialize, ToSchema)]
pub struct BulkMarkResult {
    pub person_id: u64,
    pub success: bool,
    #[schema(nullable = true)]
    pub record: Option<AttendanceRecord>,
    #[schema(nullable = true)]
    pub error: Option<String>,
}

impl BulkMarkResult {
    pub fn from_outcome(person_id: u64, outcome: Result<AttendanceRecord, AttendanceError>) -> Self {
        match outcome {
            Ok(record) => Self {
                person_id,
                success: true,
                record: Some(record),
                error: None,
            },
            Err(e) => Self {
                person_id,
                success: false,
                record: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// Parse a status string from outside the engine.
pub fn parse_status(raw: &str) -> Result<AttendanceStatus, AttendanceError> {
    AttendanceStatus::from_str(raw.trim())
        .map_err(|_| AttendanceError::InvalidStatus(raw.to_string()))
}

/// Keep `location` only when its coordinates are usable.
fn well_formed(person_id: u64, location: Option<Location>) -> Option<Location> {
    let point = location?;
    match geo::check_coordinates(point) {
        Ok(()) => Some(point),
        Err(e) => {
            warn!(person_id, error = %e, "Dropping malformed location");
            None
        }
    }
}

#[derive(Clone)]
pub struct AttendanceStateMachine {
    store: Arc<dyn RecordStore>,
    geofences: Arc<dyn GeofenceSource>,
}

impl AttendanceStateMachine {
    pub fn new(store: Arc<dyn RecordStore>, geofences: Arc<dyn GeofenceSource>) -> Self {
        Self { store, geofences }
    }

    /// Self check-in. Lateness is decided by the caller.
    ///
    /// Location is validated before anything is written, so a rejected
    /// check-in leaves the store untouched. Without geofences nothing is
    /// rejected; a malformed location is dropped instead of stored.
    pub async fn check_in(
        &self,
        person_id: u64,
        date: NaiveDate,
        timestamp: DateTime<Utc>,
        mut location: Option<Location>,
        is_late: bool,
    ) -> Result<AttendanceRecord, AttendanceError> {
        let existing = self.store.get(person_id, date).await?;
        if existing.as_ref().is_some_and(|r| r.check_in_at.is_some()) {
            return Err(AttendanceError::AlreadyCheckedIn);
        }

        let fences = self.geofences.list_geofences().await?;
        if !fences.is_empty() {
            let point = location.ok_or_else(|| {
                AttendanceError::LocationRejected("location is required to check in".to_string())
            })?;
            let verdict = geo::validate(point, &fences)?;
            if !verdict.is_valid {
                warn!(person_id, %date, reason = %verdict.reason, "Check-in outside geofence");
                return Err(AttendanceError::LocationRejected(verdict.reason));
            }
            debug!(person_id, fence = ?verdict.matched_fence, "Check-in location accepted");
        } else {
            location = well_formed(person_id, location);
        }

        let mut record = existing.unwrap_or_else(|| AttendanceRecord::unmarked(person_id, date));
        record.check_in_at = Some(timestamp);
        record.check_in_location = location;
        record.status = if is_late {
            AttendanceStatus::Late
        } else {
            AttendanceStatus::Present
        };
        record.marked_by = MarkedBy::SelfService;

        self.store.put(&record).await?;
        info!(person_id, %date, status = %record.status, "Checked in");
        Ok(record)
    }

    /// Self check-out. Status stays whatever check-in decided.
    pub async fn check_out(
        &self,
        person_id: u64,
        date: NaiveDate,
        timestamp: DateTime<Utc>,
        location: Option<Location>,
    ) -> Result<AttendanceRecord, AttendanceError> {
        let mut record = match self.store.get(person_id, date).await? {
            Some(r) if r.check_in_at.is_some() => r,
            _ => return Err(AttendanceError::NotCheckedIn),
        };
        if record.check_out_at.is_some() {
            return Err(AttendanceError::AlreadyCheckedOut);
        }
        let location = well_formed(person_id, location);

        // clock skew must not produce a negative duration
        let check_in_at = record.check_in_at.unwrap_or(timestamp);
        record.check_out_at = Some(timestamp.max(check_in_at));
        record.check_out_location = location;

        self.store.put(&record).await?;
        info!(
            person_id,
            %date,
            worked_minutes = record.worked_minutes(),
            "Checked out"
        );
        Ok(record)
    }

    /// Admin override. Accepts any of the five statuses regardless of the
    /// current timestamps and never clears them.
    pub async fn admin_set_status(
        &self,
        person_id: u64,
        date: NaiveDate,
        status: &str,
        notes: Option<String>,
    ) -> Result<AttendanceRecord, AttendanceError> {
        let status = parse_status(status)?;
        self.set_status(person_id, date, status, notes).await
    }

    pub async fn set_status(
        &self,
        person_id: u64,
        date: NaiveDate,
        status: AttendanceStatus,
        notes: Option<String>,
    ) -> Result<AttendanceRecord, AttendanceError> {
        let mut record = self
            .store
            .get(person_id, date)
            .await?
            .unwrap_or_else(|| AttendanceRecord::unmarked(person_id, date));

        record.status = status;
        record.marked_by = MarkedBy::Admin;
        record.notes = notes;

        self.store.put(&record).await?;
        info!(person_id, %date, %status, "Attendance status set by admin");
        Ok(record)
    }

    /// Mark every id present. One id failing never stops the others.
    pub async fn bulk_set_present(
        &self,
        date: NaiveDate,
        person_ids: &[u64],
        notes: Option<String>,
    ) -> Vec<BulkMarkResult> {
        let mut results = Vec::with_capacity(person_ids.len());
        for &person_id in person_ids {
            let outcome = self
                .set_status(person_id, date, AttendanceStatus::Present, notes.clone())
                .await;
            if let Err(e) = &outcome {
                warn!(person_id, %date, error = %e, "Bulk mark present failed");
            }
            results.push(BulkMarkResult::from_outcome(person_id, outcome));
        }
        results
    }
}
