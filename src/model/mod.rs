pub mod attendance;
pub mod geofence;
pub mod notification;
pub mod person;
pub mod role;
