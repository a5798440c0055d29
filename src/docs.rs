use crate::api::attendance::{
    BulkPresentRequest, CheckInRequest, CheckOutRequest, SetStatusRequest,
    ValidateLocationRequest,
};
use crate::api::notifications::NotifyAbsenteesRequest;
use crate::engine::{geo::GeoVerdict, state_machine::BulkMarkResult, summary::DailySummary};
use crate::model::attendance::{AttendanceRecord, AttendanceStatus, MarkedBy};
use crate::model::geofence::{Geofence, Location};
use crate::model::notification::{BulkNotificationReport, NotificationResult};
use crate::model::person::Person;
use utoipa::Modify;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{OpenApi, openapi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Intern Attendance API",
        version = "1.0.0",
        description = r#"
## Intern Attendance Tracker

Daily check-in/check-out for interns and staff, with geofenced locations,
absentee detection, and email reminders.

### Key Features
- **Check-in / check-out**
  - Location checked against configured geofences
  - Late arrivals flagged from the configured start time and grace period
- **Admin corrections**
  - Set any status for a person and day, or mark many people present at once
- **Absentees**
  - Daily absentee list and dashboard counts
- **Reminders**
  - One email per absentee, sent sequentially with a pause between sends

### Security
All endpoints require a **JWT Bearer** token. Admin and HR roles are needed
for everything except the caller's own check-in, check-out and today's record.
"#,
    ),
    paths(
        crate::api::attendance::check_in,
        crate::api::attendance::check_out,
        crate::api::attendance::my_today,
        crate::api::attendance::list_by_date,
        crate::api::attendance::set_status,
        crate::api::attendance::bulk_present,
        crate::api::attendance::absentees,
        crate::api::attendance::summary,
        crate::api::attendance::validate_location,

        crate::api::notifications::notify_absentees,
        crate::api::notifications::cancel_notify_absentees,
        crate::api::notifications::notify_one
    ),
    components(
        schemas(
            CheckInRequest,
            CheckOutRequest,
            SetStatusRequest,
            BulkPresentRequest,
            ValidateLocationRequest,
            NotifyAbsenteesRequest,
            AttendanceRecord,
            AttendanceStatus,
            MarkedBy,
            Location,
            Geofence,
            Person,
            GeoVerdict,
            BulkMarkResult,
            DailySummary,
            NotificationResult,
            BulkNotificationReport
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Attendance", description = "Check-in, check-out and admin attendance APIs"),
        (name = "Notifications", description = "Absentee reminder APIs"),
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/attendance/check-in",
            "/api/attendance/check-out",
            "/api/attendance/status",
            "/api/attendance/bulk-present",
            "/api/notifications/absentees",
            "/api/notifications/absentees/{person_id}",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }

    #[test]
    fn bearer_scheme_is_registered() {
        let doc = ApiDoc::openapi();
        let components = doc.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
