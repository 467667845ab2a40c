//! Marker factory for path start and waypoint markers
//!
//! Markers are plain descriptions of geometry and color. Render resources are
//! allocated only when a `RenderBackend` spawns them, and released when the
//! registry despawns them.

use bevy::math::Vec3;
use disha_core::config::{AnimationConfig, MarkerConfig};
use disha_core::{ArConfig, Rgb};

/// Role of a marker along the path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MarkerRole {
    Start,
    Waypoint,
}

/// Primitive shapes, all aligned with +Y
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Sphere { radius: f32 },
    Cylinder { radius: f32, height: f32 },
    Cone { radius: f32, height: f32 },
}

/// One piece of geometry in a marker, relative to the marker's origin
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerPart {
    pub shape: Shape,
    pub color: Rgb,
    pub offset: Vec3,
}

/// Vertical idle animation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bob {
    pub amplitude: f32,
    /// Radians per second
    pub speed: f32,
    pub phase: f32,
}

impl Bob {
    /// Vertical offset at `elapsed` seconds since the session started
    pub fn offset(&self, elapsed: f32) -> f32 {
        self.amplitude * (self.speed * elapsed + self.phase).sin()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VisualMarker {
    pub role: MarkerRole,
    /// Position in the path's traversal order, start is 0
    pub index: usize,
    /// Rest position in anchor-relative render space
    pub position: Vec3,
    pub parts: Vec<MarkerPart>,
    pub bob: Bob,
}

impl VisualMarker {
    /// Animated translation at `elapsed` seconds
    pub fn translation_at(&self, elapsed: f32) -> Vec3 {
        self.position + Vec3::Y * self.bob.offset(elapsed)
    }

    pub fn has_indicator(&self) -> bool {
        self.parts
            .iter()
            .any(|p| matches!(p.shape, Shape::Cone { .. }))
    }
}

/// Builds markers with a fixed style
#[derive(Debug, Clone)]
pub struct MarkerFactory {
    style: MarkerConfig,
    animation: AnimationConfig,
}

impl MarkerFactory {
    pub fn new(style: MarkerConfig, animation: AnimationConfig) -> Self {
        Self { style, animation }
    }

    pub fn from_config(config: &ArConfig) -> Self {
        Self::new(config.markers.clone(), config.animation.clone())
    }

    pub fn create_marker(&self, position: Vec3, role: MarkerRole, index: usize) -> VisualMarker {
        let style = &self.style;
        let parts = match role {
            MarkerRole::Start => vec![MarkerPart {
                shape: Shape::Sphere {
                    radius: style.start_radius,
                },
                color: style.start_color,
                offset: Vec3::ZERO,
            }],
            MarkerRole::Waypoint => vec![
                MarkerPart {
                    shape: Shape::Cylinder {
                        radius: style.waypoint_radius,
                        height: style.waypoint_height,
                    },
                    color: style.waypoint_color,
                    offset: Vec3::ZERO,
                },
                MarkerPart {
                    shape: Shape::Cone {
                        radius: style.indicator_radius,
                        height: style.indicator_height,
                    },
                    color: style.indicator_color,
                    offset: Vec3::Y * style.indicator_offset,
                },
            ],
        };

        VisualMarker {
            role,
            index,
            position,
            parts,
            bob: Bob {
                amplitude: self.animation.bob_amplitude,
                speed: self.animation.bob_speed,
                phase: index as f32 * self.animation.phase_step,
            },
        }
    }
}

impl Default for MarkerFactory {
    fn default() -> Self {
        Self::from_config(&ArConfig::default())
    }
}
