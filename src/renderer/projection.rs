//! Geographic to scene-space projection

use glam::Vec3;

use crate::propagation::GeoPoint;

/// Point in scene units
pub type ScenePoint = Vec3;

/// Earth mean radius (km)
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Radius of the Earth sphere in scene units
pub const SCENE_EARTH_RADIUS: f64 = 5.0;

/// Scene units per kilometer
pub const SCENE_SCALE: f64 = SCENE_EARTH_RADIUS / EARTH_RADIUS_KM;

/// Project geodetic coordinates onto the scene sphere
///
/// Y is up. Longitude is offset by 180 degrees so an equirectangular world
/// texture lines up with the meridians.
pub fn project(latitude_deg: f64, longitude_deg: f64, altitude_km: f64) -> ScenePoint {
    let radius = SCENE_EARTH_RADIUS + altitude_km * SCENE_SCALE;
    let phi = (90.0 - latitude_deg).to_radians();
    let theta = (longitude_deg + 180.0).to_radians();

    Vec3::new(
        (-(radius * phi.sin() * theta.cos())) as f32,
        (radius * phi.cos()) as f32,
        (radius * phi.sin() * theta.sin()) as f32,
    )
}

pub fn project_geo(point: &GeoPoint) -> ScenePoint {
    project(point.latitude_deg, point.longitude_deg, point.altitude_km)
}
