//! Render backend contract

use bevy::math::Vec3;

use crate::markers::VisualMarker;
use crate::path::ConnectorSegment;
use crate::platform::Pose;

/// Opaque handle to an object spawned by a render backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectHandle(pub u64);

/// Anything the registry can place in the scene
#[derive(Debug, Clone, PartialEq)]
pub enum SceneObject {
    Marker(VisualMarker),
    Connector(ConnectorSegment),
}

impl SceneObject {
    pub fn as_marker(&self) -> Option<&VisualMarker> {
        match self {
            SceneObject::Marker(marker) => Some(marker),
            SceneObject::Connector(_) => None,
        }
    }

    pub fn is_connector(&self) -> bool {
        matches!(self, SceneObject::Connector(_))
    }
}

/// Scene graph and renderer owned by one AR session
///
/// All positions are relative to a root whose pose follows the anchor.
/// Implementors own the geometry and material resources behind every handle
/// until `despawn` releases them.
pub trait RenderBackend {
    /// Allocate resources for `object` and add it under the anchor root
    fn spawn(&mut self, object: &SceneObject) -> ObjectHandle;

    /// Remove the object from the scene graph and release its resources
    fn despawn(&mut self, handle: ObjectHandle);

    fn set_translation(&mut self, handle: ObjectHandle, translation: Vec3);

    /// Place the anchor root (and everything under it) at `pose`
    fn set_root_pose(&mut self, pose: Pose);

    /// Render the current scene state
    fn render(&mut self);

    /// Release renderer resources. Objects still spawned are released too.
    fn dispose(&mut self);
}
