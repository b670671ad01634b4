//! Sidereal time and TEME to geodetic conversion

use std::f64::consts::TAU;

use nalgebra::Vector3;
use satkit::frametransform;
use satkit::itrfcoord::ITRFCoord;
use satkit::Instant;
use serde::{Deserialize, Serialize};

pub const METERS_PER_KM: f64 = 1000.0;

/// Geodetic position on the WGS-84 ellipsoid
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_km: f64,
}

impl GeoPoint {
    pub fn new(latitude_deg: f64, longitude_deg: f64, altitude_km: f64) -> Self {
        Self {
            latitude_deg,
            longitude_deg,
            altitude_km,
        }
    }
}

/// Greenwich mean sidereal time in radians, in [0, 2π)
///
/// IAU-82 model. UT1 comes from satkit's Earth orientation table when it
/// covers the instant; otherwise UTC stands in, which is off by under a second.
pub fn gmst(instant: &Instant) -> f64 {
    frametransform::gmst(instant).rem_euclid(TAU)
}

/// Rotate a TEME position into the Earth-fixed frame
pub fn teme_to_itrf(position_km: &Vector3<f64>, instant: &Instant) -> Vector3<f64> {
    frametransform::qteme2itrf(instant) * position_km
}

/// Geodetic coordinates of an Earth-fixed position given in km
///
/// Longitude is in [-180, 180] degrees.
pub fn itrf_to_geodetic(position_km: &Vector3<f64>) -> GeoPoint {
    let coord = ITRFCoord::from(position_km * METERS_PER_KM);
    let (latitude_deg, longitude_deg, hae_m) = coord.to_geodetic_deg();

    GeoPoint {
        latitude_deg,
        longitude_deg,
        altitude_km: hae_m / METERS_PER_KM,
    }
}

/// Convert a TEME position (km) at an instant to geodetic coordinates
pub fn teme_to_geodetic(position_km: &Vector3<f64>, instant: &Instant) -> GeoPoint {
    itrf_to_geodetic(&teme_to_itrf(position_km, instant))
}

#[cfg(test)]
mod tests {
    use super::*;
    use satkit::consts::{WGS84_A, WGS84_F};

    fn equatorial_radius_km() -> f64 {
        WGS84_A / METERS_PER_KM
    }

    fn polar_radius_km() -> f64 {
        WGS84_A * (1.0 - WGS84_F) / METERS_PER_KM
    }

    /// Signed difference of two longitudes, wrapped to [-180, 180)
    fn longitude_delta(a: f64, b: f64) -> f64 {
        (a - b + 540.0).rem_euclid(360.0) - 180.0
    }

    #[test]
    fn test_gmst_reference_value() {
        // 1992-08-20 12:14 UT1 -> 152.578787886 deg; UTC input differs by dUT1
        let instant = Instant::from_datetime(1992, 8, 20, 12, 14, 0.0).unwrap();
        let gmst_deg = gmst(&instant).to_degrees();
        assert!(
            (gmst_deg - 152.578_787_886).abs() < 0.01,
            "GMST {} deg",
            gmst_deg
        );
    }

    #[test]
    fn test_gmst_is_normalized() {
        for (year, month) in [(1985, 2), (1999, 12), (2031, 3)] {
            let instant = Instant::from_datetime(year, month, 5, 23, 59, 59.0).unwrap();
            let theta = gmst(&instant);
            assert!((0.0..TAU).contains(&theta), "{} rad", theta);
        }
    }

    #[test]
    fn test_point_on_equator() {
        let geo = itrf_to_geodetic(&Vector3::new(equatorial_radius_km() + 500.0, 0.0, 0.0));
        assert!(geo.latitude_deg.abs() < 1e-9);
        assert!(geo.longitude_deg.abs() < 1e-9);
        assert!((geo.altitude_km - 500.0).abs() < 1e-6);
    }

    #[test]
    fn test_point_over_pole() {
        let geo = itrf_to_geodetic(&Vector3::new(0.0, 0.0, polar_radius_km() + 800.0));
        assert!((geo.latitude_deg - 90.0).abs() < 1e-6);
        assert!((geo.altitude_km - 800.0).abs() < 1e-3, "alt {}", geo.altitude_km);
    }

    #[test]
    fn test_sidereal_rotation_shifts_longitude() {
        let instant = Instant::from_datetime(2008, 9, 21, 6, 30, 0.0).unwrap();
        let theta_deg = gmst(&instant).to_degrees();

        let geo = teme_to_geodetic(&Vector3::new(7000.0, 0.0, 0.0), &instant);
        let delta = longitude_delta(geo.longitude_deg, -theta_deg);
        assert!(delta.abs() < 1e-3, "lon {} gmst {}", geo.longitude_deg, theta_deg);
        assert!(geo.latitude_deg.abs() < 1e-3);

        let behind = teme_to_geodetic(&Vector3::new(-7000.0, 1.0, 0.0), &instant);
        assert!((-180.0..=180.0).contains(&behind.longitude_deg));
    }

    #[test]
    fn test_rotation_keeps_radius() {
        let instant = Instant::from_datetime(2020, 1, 1, 0, 0, 0.0).unwrap();
        let teme = Vector3::new(-2500.0, 5300.0, 3900.0);
        let itrf = teme_to_itrf(&teme, &instant);
        assert!((itrf.norm() - teme.norm()).abs() < 1e-6);
        assert!((itrf.z - teme.z).abs() < 0.1);
    }
}
