//! Attendance lifecycle: geofence checks, check-in/out transitions,
//! absentee detection and reminder dispatch.

pub mod absentee;
pub mod dispatcher;
pub mod geo;
pub mod lateness;
pub mod state_machine;
pub mod summary;
