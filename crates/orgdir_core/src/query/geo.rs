//! Great-circle distance on a spherical Earth.
//!
//! # Invariants
//! - Inputs are degrees and are not validated here.
//! - `distance_km(p, p) == 0.0` and `distance_km(p, q) == distance_km(q, p)`.

/// Mean Earth radius used by the haversine formula, in kilometers.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Geographic point in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Haversine distance to `other` in kilometers.
    pub fn distance_km(&self, other: &GeoPoint) -> f64 {
        distance_km(self.latitude, self.longitude, other.latitude, other.longitude)
    }
}

/// Haversine distance between two points given in degrees, in kilometers.
pub fn distance_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (lat1, lon1, lat2, lon2) = (
        lat1.to_radians(),
        lon1.to_radians(),
        lat2.to_radians(),
        lon2.to_radians(),
    );
    let half_dlat = (lat2 - lat1) / 2.0;
    let half_dlon = (lon2 - lon1) / 2.0;

    let a = half_dlat.sin().powi(2) + lat1.cos() * lat2.cos() * half_dlon.sin().powi(2);
    // Rounding can push `a` a hair above 1 for antipodal points.
    let c = 2.0 * a.sqrt().min(1.0).asin();
    EARTH_RADIUS_KM * c
}

/// Closed-disk membership: the boundary counts as inside.
pub fn within_radius(distance_km: f64, radius_km: f64) -> bool {
    distance_km <= radius_km
}

#[cfg(test)]
mod tests {
    use super::{distance_km, within_radius, GeoPoint, EARTH_RADIUS_KM};

    const TOLERANCE_KM: f64 = 1e-9;

    #[test]
    fn distance_to_self_is_zero() {
        for (lat, lon) in [(0.0, 0.0), (55.7558, 37.6173), (-89.9, 179.9), (90.0, -180.0)] {
            assert_eq!(distance_km(lat, lon, lat, lon), 0.0);
        }
    }

    #[test]
    fn distance_is_symmetric() {
        let pairs = [
            ((55.7558, 37.6173), (55.7650, 37.5900)),
            ((51.5074, -0.1278), (40.7128, -74.0060)),
            ((-33.8688, 151.2093), (35.6762, 139.6503)),
        ];
        for ((lat1, lon1), (lat2, lon2)) in pairs {
            let forward = distance_km(lat1, lon1, lat2, lon2);
            let backward = distance_km(lat2, lon2, lat1, lon1);
            assert!((forward - backward).abs() < TOLERANCE_KM);
        }
    }

    #[test]
    fn one_degree_of_latitude_is_about_111_km() {
        let distance = distance_km(0.0, 0.0, 1.0, 0.0);
        let expected = EARTH_RADIUS_KM * 1.0_f64.to_radians();
        assert!((distance - expected).abs() < TOLERANCE_KM);
        assert!((distance - 111.19).abs() < 0.01);
    }

    #[test]
    fn antipodal_points_are_half_circumference_apart() {
        let distance = distance_km(0.0, 0.0, 0.0, 180.0);
        assert!((distance - EARTH_RADIUS_KM * std::f64::consts::PI).abs() < 1e-6);
    }

    #[test]
    fn seeded_moscow_buildings_are_about_two_km_apart() {
        let first = GeoPoint::new(55.7558, 37.6173);
        let second = GeoPoint::new(55.7650, 37.5900);
        let distance = first.distance_km(&second);
        assert!((distance - 1.991).abs() < 0.001, "got {distance}");
    }

    #[test]
    fn within_radius_includes_boundary_only() {
        assert!(within_radius(10.0, 10.0));
        assert!(within_radius(0.0, 0.0));
        assert!(!within_radius(10.0 + 1e-9, 10.0));
        assert!(!within_radius(f64::NAN, 10.0));
    }
}
