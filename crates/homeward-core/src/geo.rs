//! Great-circle distance on a spherical earth.

use crate::types::Coords;

/// Mean earth radius used by the haversine approximation.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Haversine distance between two positions, in meters.
///
/// NaN coordinates propagate to a NaN result; callers comparing against a
/// radius therefore see "not within".
pub fn distance_meters(a: Coords, b: Coords) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    EARTH_RADIUS_M * 2.0 * h.sqrt().atan2((1.0 - h).sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_point_is_zero() {
        let p = Coords::new(49.4178, 2.8261);
        assert_eq!(distance_meters(p, p), 0.0);
    }

    #[test]
    fn paris_to_london() {
        let paris = Coords::new(48.8566, 2.3522);
        let london = Coords::new(51.5074, -0.1278);
        let d = distance_meters(paris, london);
        assert!((d - 343_556.0).abs() < 1_000.0, "got {d}");
    }

    #[test]
    fn symmetric() {
        let a = Coords::new(49.4178, 2.8261);
        let b = Coords::new(49.4300, 2.8300);
        assert!((distance_meters(a, b) - distance_meters(b, a)).abs() < 1e-9);
    }

    #[test]
    fn one_millidegree_of_latitude() {
        let a = Coords::new(49.4178, 2.8261);
        let b = Coords::new(49.4188, 2.8261);
        let d = distance_meters(a, b);
        assert!((d - 111.19).abs() < 0.5, "got {d}");
    }

    #[test]
    fn nan_propagates() {
        let a = Coords::new(f64::NAN, 2.8261);
        let b = Coords::new(49.4178, 2.8261);
        assert!(distance_meters(a, b).is_nan());
    }
}
