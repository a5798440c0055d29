use chrono::{DateTime, Duration, Local, NaiveTime, Utc};

/// Working-day start plus grace period. A check-in is late only when it
/// happens strictly after `start + grace`, in local time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatePolicy {
    pub start: NaiveTime,
    pub grace: Duration,
}

impl LatePolicy {
    pub fn new(start: NaiveTime, grace_minutes: u32) -> Self {
        Self {
            start,
            grace: Duration::minutes(grace_minutes as i64),
        }
    }

    /// Latest on-time check-in. Saturates at midnight instead of wrapping.
    pub fn cutoff(&self) -> NaiveTime {
        let (cutoff, wrapped) = self.start.overflowing_add_signed(self.grace);
        if wrapped != 0 {
            NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(self.start)
        } else {
            cutoff
        }
    }

    pub fn is_late_at(&self, time_of_day: NaiveTime) -> bool {
        time_of_day > self.cutoff()
    }

    pub fn is_late(&self, timestamp: DateTime<Utc>) -> bool {
        self.is_late_at(timestamp.with_timezone(&Local).time())
    }
}
