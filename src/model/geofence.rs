use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// WGS84 point in degrees.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Location {
    #[schema(example = 23.8103)]
    pub latitude: f64,
    #[schema(example = 90.4125)]
    pub longitude: f64,
}

impl Location {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

/// Named circular region an intern must be inside to check in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Geofence {
    #[schema(example = "Head Office")]
    pub name: String,
    pub center: Location,
    #[schema(example = 150.0)]
    pub radius_meters: f64,
}

/// Flat row shape of the `geofences` table.
#[derive(Debug, sqlx::FromRow)]
pub struct GeofenceRow {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_meters: f64,
}

impl From<GeofenceRow> for Geofence {
    fn from(row: GeofenceRow) -> Self {
        Geofence {
            name: row.name,
            center: Location::new(row.latitude, row.longitude),
            radius_meters: row.radius_meters,
        }
    }
}
