//! Geofence membership checks for check-in locations.

use serde::Serialize;
use utoipa::ToSchema;

use crate::error::AttendanceError;
use crate::model::geofence::{Geofence, Location};

/// Mean Earth radius used by the haversine distance.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

pub const NO_GEOFENCES: &str = "no geofences configured";
pub const OUTSIDE_ALL: &str = "outside all configured regions";

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct GeoVerdict {
    pub is_valid: bool,
    #[schema(nullable = true)]
    pub matched_fence: Option<String>,
    pub reason: String,
    /// Distance to the closest fence center, when any fence exists.
    #[schema(nullable = true)]
    pub nearest_distance_meters: Option<f64>,
}

/// Great-circle distance between two points in meters.
pub fn haversine_meters(a: Location, b: Location) -> f64 {
    let (lat1, lat2) = (a.latitude.to_radians(), b.latitude.to_radians());
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_METERS * h.sqrt().min(1.0).asin()
}

/// Reject NaN and out-of-range coordinates.
pub fn check_coordinates(point: Location) -> Result<(), AttendanceError> {
    let Location { latitude, longitude } = point;
    if latitude.is_nan() || longitude.is_nan() {
        return Err(AttendanceError::InvalidLocation(
            "coordinates must be numbers".to_string(),
        ));
    }
    if !(-90.0..=90.0).contains(&latitude) {
        return Err(AttendanceError::InvalidLocation(format!(
            "latitude {latitude} is outside [-90, 90]"
        )));
    }
    if !(-180.0..=180.0).contains(&longitude) {
        return Err(AttendanceError::InvalidLocation(format!(
            "longitude {longitude} is outside [-180, 180]"
        )));
    }
    Ok(())
}

/// Decide whether `point` lies inside any of `geofences`.
///
/// An empty fence list accepts every point, malformed or not, so
/// deployments that never configure geofences are never blocked. Otherwise
/// coordinates must be well formed; fences are checked in order and the
/// first match wins.
pub fn validate(point: Location, geofences: &[Geofence]) -> Result<GeoVerdict, AttendanceError> {
    if geofences.is_empty() {
        return Ok(GeoVerdict {
            is_valid: true,
            matched_fence: None,
            reason: NO_GEOFENCES.to_string(),
            nearest_distance_meters: None,
        });
    }

    check_coordinates(point)?;

    let mut nearest = f64::INFINITY;
    for fence in geofences {
        let distance = haversine_meters(point, fence.center);
        nearest = nearest.min(distance);

        if distance <= fence.radius_meters {
            return Ok(GeoVerdict {
                is_valid: true,
                matched_fence: Some(fence.name.clone()),
                reason: format!("inside {}", fence.name),
                nearest_distance_meters: Some(distance),
            });
        }
    }

    Ok(GeoVerdict {
        is_valid: false,
        matched_fence: None,
        reason: OUTSIDE_ALL.to_string(),
        nearest_distance_meters: Some(nearest),
    })
}
