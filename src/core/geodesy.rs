//! Great-circle distance helper for the real-scale mode.

/// Mean Earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine great-circle distance in meters between two lon/lat points.
///
/// Only used for the horizontal reference distance of real-scale
/// displacement; per-vertex positions stay on the flat equirectangular
/// plane, which is acceptable for the small bounding boxes this crate
/// assumes.
pub fn haversine_distance_m(lon1: f64, lat1: f64, lon2: f64, lat2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_zero_distance() {
        assert_relative_eq!(haversine_distance_m(10.0, 46.0, 10.0, 46.0), 0.0);
    }

    #[test]
    fn test_one_degree_longitude_at_equator() {
        // 1 degree of longitude at the equator is about 111.2 km
        let d = haversine_distance_m(0.0, 0.0, 1.0, 0.0);
        assert_relative_eq!(d, 111_195.0, epsilon = 100.0);
    }

    #[test]
    fn test_longitude_shrinks_with_latitude() {
        let at_equator = haversine_distance_m(10.0, 0.0, 11.0, 0.0);
        let at_60n = haversine_distance_m(10.0, 60.0, 11.0, 60.0);
        // cos(60 deg) = 0.5
        assert_relative_eq!(at_60n / at_equator, 0.5, epsilon = 1e-3);
    }

    #[test]
    fn test_symmetry() {
        let forward = haversine_distance_m(10.0, 46.0, 10.5, 46.4);
        let backward = haversine_distance_m(10.5, 46.4, 10.0, 46.0);
        assert_relative_eq!(forward, backward);
    }
}
