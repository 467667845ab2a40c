//! Scene registry: one live generation of scene objects at a time

use tracing::debug;

use crate::backend::{ObjectHandle, RenderBackend, SceneObject};

/// Identifier of one batch of objects produced by a single population
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Generation(pub u64);

#[derive(Debug)]
struct LiveObject {
    handle: ObjectHandle,
    object: SceneObject,
}

/// Owns the live scene objects of a session
///
/// Every spawned handle is despawned exactly once: either by the next
/// `replace` or by `clear`. Both run synchronously between two frames so a
/// frame never sees a mix of two generations.
#[derive(Debug, Default)]
pub struct SceneRegistry {
    next_generation: u64,
    current: Option<(Generation, Vec<LiveObject>)>,
}

impl SceneRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Despawn the current generation, then spawn `objects` as the next one
    pub fn replace<R>(&mut self, renderer: &mut R, objects: Vec<SceneObject>) -> Generation
    where
        R: RenderBackend + ?Sized,
    {
        self.remove_current(renderer);

        let generation = Generation(self.next_generation);
        self.next_generation += 1;

        let live: Vec<LiveObject> = objects
            .into_iter()
            .map(|object| LiveObject {
                handle: renderer.spawn(&object),
                object,
            })
            .collect();

        debug!(generation = generation.0, objects = live.len(), "Scene generation replaced");
        self.current = Some((generation, live));
        generation
    }

    /// Despawn everything; used on teardown
    pub fn clear<R>(&mut self, renderer: &mut R)
    where
        R: RenderBackend + ?Sized,
    {
        self.remove_current(renderer);
    }

    /// Push each marker's bobbed translation to the renderer
    pub fn animate<R>(&self, renderer: &mut R, elapsed: f32)
    where
        R: RenderBackend + ?Sized,
    {
        let Some((_, live)) = &self.current else {
            return;
        };
        for entry in live {
            if let Some(marker) = entry.object.as_marker() {
                renderer.set_translation(entry.handle, marker.translation_at(elapsed));
            }
        }
    }

    pub fn generation(&self) -> Option<Generation> {
        self.current.as_ref().map(|(generation, _)| *generation)
    }

    pub fn live_count(&self) -> usize {
        self.current.as_ref().map_or(0, |(_, live)| live.len())
    }

    pub fn is_empty(&self) -> bool {
        self.live_count() == 0
    }

    pub fn live_handles(&self) -> Vec<ObjectHandle> {
        self.current
            .as_ref()
            .map(|(_, live)| live.iter().map(|l| l.handle).collect())
            .unwrap_or_default()
    }

    /// Number of generations populated so far, including empty ones
    pub fn generations_created(&self) -> u64 {
        self.next_generation
    }

    fn remove_current<R>(&mut self, renderer: &mut R)
    where
        R: RenderBackend + ?Sized,
    {
        if let Some((generation, live)) = self.current.take() {
            let count = live.len();
            for entry in live {
                renderer.despawn(entry.handle);
            }
            debug!(generation = generation.0, objects = count, "Scene generation removed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::PathBuilder;
    use crate::testing::RecordingBackend;
    use disha_core::Waypoint;

    fn batch(n: usize) -> Vec<SceneObject> {
        let waypoints: Vec<Waypoint> = (1..=n).map(|i| Waypoint::new(i as f64, 0.0, 0.0)).collect();
        PathBuilder::default()
            .build(&Waypoint::ORIGIN, &waypoints, 0.1)
            .into_scene_objects()
    }

    #[test]
    fn test_replace_empty_twice() {
        let mut backend = RecordingBackend::default();
        let mut registry = SceneRegistry::new();
        registry.replace(&mut backend, Vec::new());
        registry.replace(&mut backend, Vec::new());
        assert!(registry.is_empty());
        assert_eq!(backend.live_count(), 0);
        assert_eq!(backend.state().spawned, 0);
        assert_eq!(backend.state().despawned, 0);
        assert!(backend.state().errors.is_empty());
    }

    #[test]
    fn test_replace_generation_disposes_previous() {
        let mut backend = RecordingBackend::default();
        let mut registry = SceneRegistry::new();

        let g0 = registry.replace(&mut backend, batch(3));
        let g0_handles = registry.live_handles();
        assert_eq!(g0_handles.len(), 7);

        let g1 = registry.replace(&mut backend, batch(1));
        assert!(g1 > g0);
        let g1_handles = registry.live_handles();
        assert_eq!(g1_handles.len(), 3);

        // Exactly G+1 is live, every G handle was released
        assert_eq!(backend.live_handles(), {
            let mut h = g1_handles.clone();
            h.sort();
            h
        });
        for handle in &g0_handles {
            assert!(backend.was_despawned(*handle));
        }
        assert!(backend.state().errors.is_empty());
    }

    #[test]
    fn test_removal_precedes_addition() {
        let mut backend = RecordingBackend::default();
        let mut registry = SceneRegistry::new();
        registry.replace(&mut backend, batch(2));
        backend.state_mut().log.clear();

        registry.replace(&mut backend, batch(2));
        let log = backend.state().log.clone();
        let first_spawn = log.iter().position(|e| e.starts_with("spawn"));
        let last_despawn = log.iter().rposition(|e| e.starts_with("despawn"));
        assert!(last_despawn.unwrap() < first_spawn.unwrap());
    }

    #[test]
    fn test_clear_balances_allocations() {
        let mut backend = RecordingBackend::default();
        let mut registry = SceneRegistry::new();
        for n in [0, 4, 2, 7] {
            registry.replace(&mut backend, batch(n));
        }
        registry.clear(&mut backend);
        registry.clear(&mut backend);

        assert!(registry.is_empty());
        assert_eq!(registry.generation(), None);
        assert_eq!(backend.state().spawned, backend.state().despawned);
        assert_eq!(backend.live_count(), 0);
        assert!(backend.state().errors.is_empty());
    }

    #[test]
    fn test_animate_moves_only_markers() {
        let mut backend = RecordingBackend::default();
        let mut registry = SceneRegistry::new();
        registry.replace(&mut backend, batch(2));

        registry.animate(&mut backend, 0.75);
        // 3 markers, connectors stay put
        let state = backend.state();
        assert_eq!(state.translations.len(), 3);
        for handle in state.translations.keys() {
            assert!(!state.live[handle].is_connector());
        }
    }

    #[test]
    fn test_animate_without_generation_is_noop() {
        let mut backend = RecordingBackend::default();
        let registry = SceneRegistry::new();
        registry.animate(&mut backend, 1.0);
        assert!(backend.state().translations.is_empty());
    }
}
