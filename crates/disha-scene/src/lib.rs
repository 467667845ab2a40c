//! Disha Scene - AR anchoring and waypoint visualization
//!
//! This crate turns an ordered waypoint path into anchored, animated markers
//! and connectors, and manages their lifecycle across a single AR session:
//! - `transform`: backend units to render space
//! - `markers` / `path`: marker factory and path builder
//! - `registry`: generation-based ownership of live scene objects
//! - `anchor` / `session`: hit-test driven anchoring and the render loop
//! - `platform` / `backend`: capability traits the host implements
//! - `bevy_backend`: the Bevy implementation of `RenderBackend`
//! - `ui`: egui widgets shared by hosts

pub mod anchor;
pub mod backend;
pub mod bevy_backend;
pub mod markers;
pub mod path;
pub mod platform;
pub mod registry;
pub mod session;
pub mod transform;
pub mod ui;

#[cfg(test)]
pub(crate) mod testing;

use bevy::prelude::*;

/// Plugin that applies queued scene commands to the Bevy world
pub struct DishaScenePlugin;

impl Plugin for DishaScenePlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins(bevy_backend::BevyBackendPlugin);
    }
}

// Re-export commonly used types
pub use anchor::{AnchorController, AnchorEvent, AnchorState};
pub use backend::{ObjectHandle, RenderBackend, SceneObject};
pub use bevy_backend::{
    AnchorRoot, BevyBackendPlugin, BevyRenderBackend, PathObject, SceneCommand, SceneCommandQueue,
    SceneSet, SpawnedObjects,
};
pub use markers::{MarkerFactory, MarkerRole, VisualMarker};
pub use path::{BuiltPath, ConnectorSegment, PathBuilder};
pub use platform::{ArPlatform, HitResult, PendingRequest, PlatformError, Pose, Resolver};
pub use registry::{Generation, SceneRegistry};
pub use session::{SessionController, SessionError};
pub use transform::transform;
