use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{Local, NaiveDate};
use sqlx::MySqlPool;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;
use crate::engine::{lateness::LatePolicy, state_machine::AttendanceStateMachine};
use crate::notify::mailer::{DisabledMailer, Mailer, SmtpMailer};
use crate::store::{
    GeofenceSource, RecordStore, RosterSource,
    geofence_cache::CachedGeofenceSource,
    mysql::{MySqlGeofenceSource, MySqlRecordStore, MySqlRosterSource},
};
use crate::utils::key_lock::KeyLocks;

/// Shared by every worker; build once and hand out as `web::Data`.
pub struct AppState {
    pub attendance: AttendanceStateMachine,
    pub records: Arc<dyn RecordStore>,
    pub roster: Arc<dyn RosterSource>,
    pub geofences: Arc<dyn GeofenceSource>,
    pub mailer: Arc<dyn Mailer>,
    pub locks: KeyLocks,
    pub late_policy: LatePolicy,
    pub notify_delay: Duration,
    /// Cancellation handle of the bulk reminder run in flight, if any.
    pub active_run: Mutex<Option<CancellationToken>>,
}

impl AppState {
    pub fn new(
        records: Arc<dyn RecordStore>,
        roster: Arc<dyn RosterSource>,
        geofences: Arc<dyn GeofenceSource>,
        mailer: Arc<dyn Mailer>,
        late_policy: LatePolicy,
        notify_delay: Duration,
    ) -> Self {
        Self {
            attendance: AttendanceStateMachine::new(records.clone(), geofences.clone()),
            records,
            roster,
            geofences,
            mailer,
            locks: KeyLocks::default(),
            late_policy,
            notify_delay,
            active_run: Mutex::new(None),
        }
    }

    pub fn from_pool(pool: MySqlPool, config: &Config) -> Self {
        let geofences = CachedGeofenceSource::new(
            Arc::new(MySqlGeofenceSource::new(pool.clone())),
            Duration::from_secs(config.geofence_cache_ttl_secs),
        );

        let mailer: Arc<dyn Mailer> = match &config.smtp {
            Some(smtp) => match SmtpMailer::new(smtp) {
                Ok(mailer) => {
                    info!(host = %smtp.host, port = smtp.port, "SMTP mailer configured");
                    Arc::new(mailer)
                }
                Err(e) => {
                    warn!(error = %e, "SMTP mailer could not be built, reminders disabled");
                    Arc::new(DisabledMailer)
                }
            },
            None => {
                warn!("SMTP_HOST not set, reminders disabled");
                Arc::new(DisabledMailer)
            }
        };

        Self::new(
            Arc::new(MySqlRecordStore::new(pool.clone())),
            Arc::new(MySqlRosterSource::new(pool)),
            Arc::new(geofences),
            mailer,
            LatePolicy::new(config.work_start_time, config.late_grace_minutes),
            Duration::from_millis(config.notify_delay_ms),
        )
    }
}

/// Today's date on the server's clock.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}
