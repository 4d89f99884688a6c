use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A canonical WGS84 position. Latitude first, as Leaflet expects it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Rejects NaN and values outside the valid degree ranges.
    pub fn checked(lat: f64, lng: f64) -> Option<Self> {
        let valid = lat.is_finite()
            && lng.is_finite()
            && (-90.0..=90.0).contains(&lat)
            && (-180.0..=180.0).contains(&lng);
        valid.then_some(Self { lat, lng })
    }

    pub fn distance_km(&self, other: &Coordinates) -> f64 {
        haversine_distance(self.lat, self.lng, other.lat, other.lng)
    }

    /// A box around this point that holds every point within `radius_km`.
    /// Longitudes wrap at the antimeridian; a box reaching a pole spans
    /// every longitude.
    pub fn bounding_box(&self, radius_km: f64) -> BoundingBox {
        let lat_rad = self.lat.to_radians();
        let lat_delta = (radius_km / EARTH_RADIUS_KM).to_degrees();
        let south = (self.lat - lat_delta).max(-90.0);
        let north = (self.lat + lat_delta).min(90.0);
        // longitude degrees shrink towards the poles
        let lng_delta = (radius_km / (EARTH_RADIUS_KM * lat_rad.cos().abs().max(1e-9)))
            .to_degrees();

        let (west, east) = if lng_delta >= 180.0 || south <= -90.0 || north >= 90.0 {
            (-180.0, 180.0)
        } else {
            (
                wrap_longitude(self.lng - lng_delta),
                wrap_longitude(self.lng + lng_delta),
            )
        };
        BoundingBox {
            south_west: Coordinates::new(south, west),
            north_east: Coordinates::new(north, east),
        }
    }
}

/// Maps any longitude onto `-180.0..=180.0`.
fn wrap_longitude(lng: f64) -> f64 {
    if (-180.0..=180.0).contains(&lng) {
        lng
    } else {
        (lng + 180.0).rem_euclid(360.0) - 180.0
    }
}

impl From<(f64, f64)> for Coordinates {
    fn from((lat, lng): (f64, f64)) -> Self {
        Self::new(lat, lng)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub south_west: Coordinates,
    pub north_east: Coordinates,
}

impl BoundingBox {
    /// True when the box wraps past the 180th meridian.
    pub fn crosses_antimeridian(&self) -> bool {
        self.south_west.lng > self.north_east.lng
    }

    pub fn contains(&self, point: &Coordinates) -> bool {
        let lat_matches = point.lat >= self.south_west.lat && point.lat <= self.north_east.lat;
        let lng_matches = if self.crosses_antimeridian() {
            point.lng >= self.south_west.lng || point.lng <= self.north_east.lng
        } else {
            point.lng >= self.south_west.lng && point.lng <= self.north_east.lng
        };
        lat_matches && lng_matches
    }
}

pub fn haversine_distance(
    latitude_1: f64,
    longitude_1: f64,
    latitude_2: f64,
    longitude_2: f64,
) -> f64 {
    let lat1_rad = latitude_1.to_radians();
    let lat2_rad = latitude_2.to_radians();

    let dlat = lat2_rad - lat1_rad;
    let dlon = (longitude_2 - longitude_1).to_radians();

    let a = (dlat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_KM * c
}
