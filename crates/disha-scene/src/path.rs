//! Path builder: markers and connectors for an ordered waypoint path

use bevy::math::{Quat, Vec3};
use disha_core::config::ConnectorConfig;
use disha_core::{ArConfig, OrderedWaypointPath, Rgb, StartPosition, Waypoint};

use crate::backend::SceneObject;
use crate::markers::{MarkerFactory, MarkerRole, VisualMarker};
use crate::transform::transform;

/// Straight line between two consecutive render-space positions
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectorSegment {
    pub from: Vec3,
    pub to: Vec3,
    pub thickness: f32,
    pub color: Rgb,
}

impl ConnectorSegment {
    pub fn length(&self) -> f32 {
        self.from.distance(self.to)
    }

    pub fn midpoint(&self) -> Vec3 {
        (self.from + self.to) * 0.5
    }

    /// Rotation taking +Y onto the segment direction
    pub fn rotation(&self) -> Quat {
        (self.to - self.from)
            .try_normalize()
            .map(|dir| Quat::from_rotation_arc(Vec3::Y, dir))
            .unwrap_or(Quat::IDENTITY)
    }
}

/// Output of the path builder, both lists in creation order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuiltPath {
    /// Start marker first, then waypoints in traversal order
    pub markers: Vec<VisualMarker>,
    /// start→first, then each consecutive waypoint pair
    pub connectors: Vec<ConnectorSegment>,
}

impl BuiltPath {
    pub fn object_count(&self) -> usize {
        self.markers.len() + self.connectors.len()
    }

    /// Flatten into one generation of scene objects
    pub fn into_scene_objects(self) -> Vec<SceneObject> {
        let mut objects = Vec::with_capacity(self.object_count());
        objects.extend(self.markers.into_iter().map(SceneObject::Marker));
        objects.extend(self.connectors.into_iter().map(SceneObject::Connector));
        objects
    }
}

#[derive(Debug, Clone, Default)]
pub struct PathBuilder {
    factory: MarkerFactory,
    connector: ConnectorConfig,
}

impl PathBuilder {
    pub fn new(factory: MarkerFactory, connector: ConnectorConfig) -> Self {
        Self { factory, connector }
    }

    pub fn from_config(config: &ArConfig) -> Self {
        Self::new(MarkerFactory::from_config(config), config.connectors.clone())
    }

    pub fn build(&self, start: &StartPosition, waypoints: &[Waypoint], scale: f64) -> BuiltPath {
        let start_pos = transform(start, scale);
        let mut built = BuiltPath {
            markers: Vec::with_capacity(waypoints.len() + 1),
            connectors: Vec::with_capacity(waypoints.len()),
        };

        built
            .markers
            .push(self.factory.create_marker(start_pos, MarkerRole::Start, 0));

        let mut previous = start_pos;
        for (i, waypoint) in waypoints.iter().enumerate() {
            let position = transform(waypoint, scale);
            // The first connector runs from the start marker, the rest chain
            // waypoint to waypoint.
            built.connectors.push(self.connect(previous, position));
            built
                .markers
                .push(self.factory.create_marker(position, MarkerRole::Waypoint, i + 1));
            previous = position;
        }

        built
    }

    pub fn build_path(&self, path: &OrderedWaypointPath, scale: f64) -> BuiltPath {
        self.build(&path.start, &path.waypoints, scale)
    }

    fn connect(&self, from: Vec3, to: Vec3) -> ConnectorSegment {
        ConnectorSegment {
            from,
            to,
            thickness: self.connector.thickness,
            color: self.connector.color,
        }
    }
}
