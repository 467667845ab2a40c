//! Backend units to anchor-relative render space

use bevy::math::Vec3;
use disha_core::Waypoint;

/// Scale a waypoint into render space, component-wise
pub fn transform(point: &Waypoint, scale: f64) -> Vec3 {
    Vec3::new(
        (point.x * scale) as f32,
        (point.y * scale) as f32,
        (point.z * scale) as f32,
    )
}
