//! Bevy implementation of the render backend
//!
//! `BevyRenderBackend` never touches the `World` directly. It records scene
//! commands into a shared queue and `apply_scene_commands` drains the whole
//! queue in a single system run, so a generation swap (despawn old, spawn
//! new) lands in one frame.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use bevy::prelude::*;
use tracing::{debug, warn};

use crate::backend::{ObjectHandle, RenderBackend, SceneObject};
use crate::markers::{Shape, VisualMarker};
use crate::path::ConnectorSegment;
use crate::platform::Pose;
use disha_core::Rgb;

/// Scene mutation recorded by [`BevyRenderBackend`]
#[derive(Debug, Clone, PartialEq)]
pub enum SceneCommand {
    Spawn {
        handle: ObjectHandle,
        object: SceneObject,
    },
    Despawn(ObjectHandle),
    SetTranslation(ObjectHandle, Vec3),
    SetRootPose(Pose),
    Dispose,
}

/// Commands waiting to be applied to the world
#[derive(Resource, Clone, Default)]
pub struct SceneCommandQueue(pub Arc<Mutex<Vec<SceneCommand>>>);

impl SceneCommandQueue {
    pub fn push(&self, command: SceneCommand) {
        if let Ok(mut queue) = self.0.lock() {
            queue.push(command);
        }
    }

    /// Take every queued command in submission order
    pub fn drain(&self) -> Vec<SceneCommand> {
        self.0
            .lock()
            .map(|mut queue| std::mem::take(&mut *queue))
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.0.lock().map(|queue| queue.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Systems that mutate path entities
#[derive(Debug, Clone, PartialEq, Eq, Hash, SystemSet)]
pub enum SceneSet {
    /// Drain the command queue into the world
    Apply,
}

/// Root entity whose transform follows the anchor
#[derive(Component)]
pub struct AnchorRoot;

/// Entity spawned for one scene object
#[derive(Component, Debug, Clone, Copy)]
pub struct PathObject(pub ObjectHandle);

pub struct BevyRenderBackend {
    queue: SceneCommandQueue,
    next_handle: u64,
    live: HashSet<ObjectHandle>,
    frames: u64,
    disposed: bool,
}

impl BevyRenderBackend {
    pub fn new(queue: SceneCommandQueue) -> Self {
        Self {
            queue,
            next_handle: 0,
            live: HashSet::new(),
            frames: 0,
            disposed: false,
        }
    }

    pub fn queue(&self) -> &SceneCommandQueue {
        &self.queue
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}

impl RenderBackend for BevyRenderBackend {
    fn spawn(&mut self, object: &SceneObject) -> ObjectHandle {
        let handle = ObjectHandle(self.next_handle);
        self.next_handle += 1;
        self.live.insert(handle);
        self.queue.push(SceneCommand::Spawn {
            handle,
            object: object.clone(),
        });
        handle
    }

    fn despawn(&mut self, handle: ObjectHandle) {
        if self.live.remove(&handle) {
            self.queue.push(SceneCommand::Despawn(handle));
        } else {
            warn!(handle = handle.0, "Despawn of unknown scene object ignored");
        }
    }

    fn set_translation(&mut self, handle: ObjectHandle, translation: Vec3) {
        if self.live.contains(&handle) {
            self.queue.push(SceneCommand::SetTranslation(handle, translation));
        }
    }

    fn set_root_pose(&mut self, pose: Pose) {
        self.queue.push(SceneCommand::SetRootPose(pose));
    }

    fn render(&mut self) {
        // Bevy draws after Update; a frame here only marks the batch boundary.
        self.frames += 1;
    }

    fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.live.clear();
        self.queue.push(SceneCommand::Dispose);
        debug!(frames = self.frames, "Bevy render backend disposed");
    }
}

struct SpawnedObject {
    entity: Entity,
    meshes: Vec<Handle<Mesh>>,
    materials: Vec<Handle<StandardMaterial>>,
}

/// Entities and render assets owned by live scene objects
#[derive(Resource, Default)]
pub struct SpawnedObjects {
    root: Option<Entity>,
    objects: HashMap<ObjectHandle, SpawnedObject>,
}

impl SpawnedObjects {
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn root(&self) -> Option<Entity> {
        self.root
    }

    pub fn entity(&self, handle: ObjectHandle) -> Option<Entity> {
        self.objects.get(&handle).map(|o| o.entity)
    }

    fn root_or_spawn(&mut self, commands: &mut Commands) -> Entity {
        *self.root.get_or_insert_with(|| {
            commands
                .spawn((
                    AnchorRoot,
                    Name::new("anchor_root"),
                    Transform::default(),
                    Visibility::default(),
                ))
                .id()
        })
    }
}

pub struct BevyBackendPlugin;

impl Plugin for BevyBackendPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<SceneCommandQueue>()
            .init_resource::<SpawnedObjects>()
            .configure_sets(Update, SceneSet::Apply)
            .add_systems(Update, apply_scene_commands.in_set(SceneSet::Apply));
    }
}

/// Apply every queued scene command
pub fn apply_scene_commands(
    mut commands: Commands,
    queue: Res<SceneCommandQueue>,
    mut spawned: ResMut<SpawnedObjects>,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    let batch = queue.drain();
    if batch.is_empty() {
        return;
    }

    for command in batch {
        match command {
            SceneCommand::Spawn { handle, object } => {
                let root = spawned.root_or_spawn(&mut commands);
                let entry = match &object {
                    SceneObject::Marker(marker) => {
                        spawn_marker(&mut commands, &mut meshes, &mut materials, root, handle, marker)
                    }
                    SceneObject::Connector(segment) => spawn_connector(
                        &mut commands,
                        &mut meshes,
                        &mut materials,
                        root,
                        handle,
                        segment,
                    ),
                };
                spawned.objects.insert(handle, entry);
            }
            SceneCommand::Despawn(handle) => match spawned.objects.remove(&handle) {
                Some(entry) => {
                    commands.entity(entry.entity).despawn();
                    release_assets(&mut meshes, &mut materials, entry);
                }
                None => warn!(handle = handle.0, "No entity for despawned scene object"),
            },
            SceneCommand::SetTranslation(handle, translation) => {
                if let Some(entry) = spawned.objects.get(&handle) {
                    commands
                        .entity(entry.entity)
                        .insert(Transform::from_translation(translation));
                }
            }
            SceneCommand::SetRootPose(pose) => {
                let root = spawned.root_or_spawn(&mut commands);
                commands.entity(root).insert(Transform {
                    translation: pose.position,
                    rotation: pose.orientation,
                    ..default()
                });
            }
            SceneCommand::Dispose => {
                let count = spawned.objects.len();
                for (_, entry) in spawned.objects.drain() {
                    release_assets(&mut meshes, &mut materials, entry);
                }
                // Despawning the root takes every remaining child with it
                if let Some(root) = spawned.root.take() {
                    commands.entity(root).despawn();
                }
                debug!(released = count, "Scene root despawned");
            }
        }
    }
}

fn spawn_marker(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    root: Entity,
    handle: ObjectHandle,
    marker: &VisualMarker,
) -> SpawnedObject {
    let entity = commands
        .spawn((
            PathObject(handle),
            Name::new(format!("marker_{}", marker.index)),
            Transform::from_translation(marker.position),
            Visibility::default(),
            ChildOf(root),
        ))
        .id();

    let mut spawned = SpawnedObject {
        entity,
        meshes: Vec::with_capacity(marker.parts.len()),
        materials: Vec::with_capacity(marker.parts.len()),
    };
    for part in &marker.parts {
        let mesh = meshes.add(shape_mesh(part.shape));
        let material = materials.add(unlit(part.color));
        commands.spawn((
            Mesh3d(mesh.clone()),
            MeshMaterial3d(material.clone()),
            Transform::from_translation(part.offset),
            ChildOf(entity),
        ));
        spawned.meshes.push(mesh);
        spawned.materials.push(material);
    }
    spawned
}

fn spawn_connector(
    commands: &mut Commands,
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    root: Entity,
    handle: ObjectHandle,
    segment: &ConnectorSegment,
) -> SpawnedObject {
    // Cylinders are built along +Y, so rotate +Y onto the segment
    let mesh = meshes.add(Cylinder::new(
        segment.thickness * 0.5,
        segment.length().max(1e-4),
    ));
    let material = materials.add(unlit(segment.color));
    let entity = commands
        .spawn((
            PathObject(handle),
            Mesh3d(mesh.clone()),
            MeshMaterial3d(material.clone()),
            Transform {
                translation: segment.midpoint(),
                rotation: segment.rotation(),
                ..default()
            },
            ChildOf(root),
        ))
        .id();

    SpawnedObject {
        entity,
        meshes: vec![mesh],
        materials: vec![material],
    }
}

fn release_assets(
    meshes: &mut Assets<Mesh>,
    materials: &mut Assets<StandardMaterial>,
    entry: SpawnedObject,
) {
    for mesh in entry.meshes {
        meshes.remove(mesh.id());
    }
    for material in entry.materials {
        materials.remove(material.id());
    }
}

fn shape_mesh(shape: Shape) -> Mesh {
    match shape {
        Shape::Sphere { radius } => Mesh::from(Sphere::new(radius)),
        Shape::Cylinder { radius, height } => Mesh::from(Cylinder::new(radius, height)),
        Shape::Cone { radius, height } => Mesh::from(Cone::new(radius, height)),
    }
}

fn unlit(color: Rgb) -> StandardMaterial {
    StandardMaterial {
        base_color: Color::srgb(color.r, color.g, color.b),
        unlit: true,
        ..default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markers::{MarkerFactory, MarkerRole};
    use crate::path::PathBuilder;
    use bevy::ecs::system::RunSystemOnce;
    use disha_core::Waypoint;

    fn world() -> World {
        let mut world = World::new();
        world.init_resource::<SceneCommandQueue>();
        world.init_resource::<SpawnedObjects>();
        world.init_resource::<Assets<Mesh>>();
        world.init_resource::<Assets<StandardMaterial>>();
        world
    }

    fn apply(world: &mut World) {
        world.run_system_once(apply_scene_commands).unwrap();
    }

    fn path_objects(world: &mut World) -> usize {
        world.query::<&PathObject>().iter(world).count()
    }

    #[test]
    fn test_backend_queues_commands() {
        let queue = SceneCommandQueue::default();
        let mut backend = BevyRenderBackend::new(queue.clone());
        let marker = MarkerFactory::default().create_marker(Vec3::ZERO, MarkerRole::Start, 0);

        let a = backend.spawn(&SceneObject::Marker(marker.clone()));
        let b = backend.spawn(&SceneObject::Marker(marker));
        assert_ne!(a, b);
        backend.set_translation(a, Vec3::Y);
        backend.despawn(a);
        // Dead handles produce no further commands
        backend.set_translation(a, Vec3::X);
        backend.despawn(a);

        let commands = queue.drain();
        assert_eq!(commands.len(), 4);
        assert!(matches!(commands[0], SceneCommand::Spawn { handle, .. } if handle == a));
        assert_eq!(commands[2], SceneCommand::SetTranslation(a, Vec3::Y));
        assert_eq!(commands[3], SceneCommand::Despawn(a));
        assert_eq!(backend.live_count(), 1);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_dispose_once() {
        let queue = SceneCommandQueue::default();
        let mut backend = BevyRenderBackend::new(queue.clone());
        backend.render();
        backend.dispose();
        backend.dispose();
        assert!(backend.is_disposed());
        assert_eq!(backend.frames(), 1);
        assert_eq!(queue.drain(), vec![SceneCommand::Dispose]);
    }

    #[test]
    fn test_apply_spawns_under_root() {
        let mut world = world();
        let queue = world.resource::<SceneCommandQueue>().clone();
        let mut backend = BevyRenderBackend::new(queue);

        let objects = PathBuilder::default()
            .build(&Waypoint::ORIGIN, &[Waypoint::new(1.0, 0.0, 0.0)], 0.1)
            .into_scene_objects();
        let handles: Vec<ObjectHandle> = objects.iter().map(|o| backend.spawn(o)).collect();
        apply(&mut world);

        // start sphere, waypoint cylinder + cone, connector cylinder
        assert_eq!(world.resource::<Assets<Mesh>>().len(), 4);
        assert_eq!(world.resource::<Assets<StandardMaterial>>().len(), 4);
        assert_eq!(path_objects(&mut world), 3);

        let spawned = world.resource::<SpawnedObjects>();
        let root = spawned.root().unwrap();
        let entity = spawned.entity(handles[0]).unwrap();
        assert_eq!(world.get::<ChildOf>(entity).map(|c| c.parent()), Some(root));
        assert!(world.get::<AnchorRoot>(root).is_some());
    }

    #[test]
    fn test_apply_despawn_releases_assets() {
        let mut world = world();
        let queue = world.resource::<SceneCommandQueue>().clone();
        let mut backend = BevyRenderBackend::new(queue);

        let marker = MarkerFactory::default().create_marker(Vec3::ONE, MarkerRole::Waypoint, 1);
        let handle = backend.spawn(&SceneObject::Marker(marker));
        apply(&mut world);
        assert_eq!(world.resource::<Assets<Mesh>>().len(), 2);

        backend.despawn(handle);
        apply(&mut world);
        assert_eq!(world.resource::<Assets<Mesh>>().len(), 0);
        assert_eq!(world.resource::<Assets<StandardMaterial>>().len(), 0);
        assert_eq!(path_objects(&mut world), 0);
        assert!(world.resource::<SpawnedObjects>().is_empty());
    }

    #[test]
    fn test_apply_root_pose_and_dispose() {
        let mut world = world();
        let queue = world.resource::<SceneCommandQueue>().clone();
        let mut backend = BevyRenderBackend::new(queue);

        let marker = MarkerFactory::default().create_marker(Vec3::ZERO, MarkerRole::Start, 0);
        backend.spawn(&SceneObject::Marker(marker));
        backend.set_root_pose(Pose::from_position(Vec3::new(0.0, -1.0, -2.0)));
        apply(&mut world);

        let root = world.resource::<SpawnedObjects>().root().unwrap();
        let transform = world.get::<Transform>(root).copied().unwrap();
        assert_eq!(transform.translation, Vec3::new(0.0, -1.0, -2.0));

        backend.dispose();
        apply(&mut world);
        assert!(world.get_entity(root).is_err());
        assert_eq!(path_objects(&mut world), 0);
        assert_eq!(world.resource::<Assets<Mesh>>().len(), 0);
    }
}
