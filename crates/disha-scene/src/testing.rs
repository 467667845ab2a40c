//! In-memory test doubles for the render backend and AR platform

use std::cell::{Ref, RefCell, RefMut};
use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::rc::Rc;

use bevy::math::Vec3;
use disha_core::config::SessionConfig;
use disha_core::NavigationStatus;

use crate::backend::{ObjectHandle, RenderBackend, SceneObject};
use crate::platform::{ArPlatform, HitResult, PendingRequest, PlatformError, Pose, Resolver};

#[derive(Debug, Default)]
pub struct Recording {
    next: u64,
    pub spawned: usize,
    pub despawned: usize,
    pub live: BTreeMap<ObjectHandle, SceneObject>,
    pub released: HashSet<ObjectHandle>,
    pub translations: HashMap<ObjectHandle, Vec3>,
    pub root_pose: Option<Pose>,
    pub frames_rendered: usize,
    pub disposed: usize,
    pub errors: Vec<String>,
    pub log: Vec<String>,
}

/// Render backend that counts allocations and flags misuse
///
/// Clones share the same recording, so a test can keep one clone while the
/// session owns the other.
#[derive(Debug, Clone, Default)]
pub struct RecordingBackend {
    state: Rc<RefCell<Recording>>,
}

impl RecordingBackend {
    pub fn state(&self) -> Ref<'_, Recording> {
        self.state.borrow()
    }

    pub fn state_mut(&self) -> RefMut<'_, Recording> {
        self.state.borrow_mut()
    }

    pub fn live_count(&self) -> usize {
        self.state().live.len()
    }

    pub fn live_handles(&self) -> Vec<ObjectHandle> {
        self.state().live.keys().copied().collect()
    }

    pub fn was_despawned(&self, handle: ObjectHandle) -> bool {
        self.state().released.contains(&handle)
    }
}

impl RenderBackend for RecordingBackend {
    fn spawn(&mut self, object: &SceneObject) -> ObjectHandle {
        let mut s = self.state_mut();
        if s.disposed > 0 {
            s.errors.push("spawn after dispose".to_string());
        }
        let handle = ObjectHandle(s.next);
        s.next += 1;
        s.spawned += 1;
        s.live.insert(handle, object.clone());
        s.log.push(format!("spawn {}", handle.0));
        handle
    }

    fn despawn(&mut self, handle: ObjectHandle) {
        let mut s = self.state_mut();
        if s.live.remove(&handle).is_none() {
            s.errors.push(format!("despawn of unknown handle {}", handle.0));
            return;
        }
        s.despawned += 1;
        s.released.insert(handle);
        s.translations.remove(&handle);
        s.log.push(format!("despawn {}", handle.0));
    }

    fn set_translation(&mut self, handle: ObjectHandle, translation: Vec3) {
        let mut s = self.state_mut();
        if !s.live.contains_key(&handle) {
            s.errors.push(format!("translate of dead handle {}", handle.0));
            return;
        }
        s.translations.insert(handle, translation);
    }

    fn set_root_pose(&mut self, pose: Pose) {
        self.state_mut().root_pose = Some(pose);
    }

    fn render(&mut self) {
        let mut s = self.state_mut();
        if s.disposed > 0 {
            s.errors.push("render after dispose".to_string());
        }
        s.frames_rendered += 1;
    }

    fn dispose(&mut self) {
        let mut s = self.state_mut();
        s.disposed += 1;
        s.log.push("dispose".to_string());
    }
}

#[derive(Debug)]
pub struct FakeState {
    pub supported: bool,
    pub support_check_fails: bool,
    pub session_error: Option<PlatformError>,
    pub renderer_error: Option<PlatformError>,
    pub overlay_error: Option<PlatformError>,
    /// When set, every hit-test returns one hit at this pose
    pub hit: Option<Pose>,
    pub anchor_pose: Pose,
    pub hit_test_calls: usize,
    pub anchor_requests: usize,
    pub pending_anchors: VecDeque<Resolver<u32>>,
    pub next_anchor: u32,
    pub statuses: Vec<NavigationStatus>,
    pub sessions_requested: usize,
    pub renderers_created: usize,
    pub overlay_mounted: bool,
    pub overlays_removed: usize,
    pub sessions_ended: usize,
    pub renderer: RecordingBackend,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            supported: true,
            support_check_fails: false,
            session_error: None,
            renderer_error: None,
            overlay_error: None,
            hit: None,
            anchor_pose: Pose::from_position(Vec3::new(0.0, -1.2, -0.5)),
            hit_test_calls: 0,
            anchor_requests: 0,
            pending_anchors: VecDeque::new(),
            next_anchor: 1,
            statuses: Vec::new(),
            sessions_requested: 0,
            renderers_created: 0,
            overlay_mounted: false,
            overlays_removed: 0,
            sessions_ended: 0,
            renderer: RecordingBackend::default(),
        }
    }
}

/// Scriptable AR platform
///
/// Anchor requests stay pending until the test resolves them with
/// [`FakePlatform::resolve_anchor`] or [`FakePlatform::reject_anchor`].
#[derive(Debug, Clone, Default)]
pub struct FakePlatform {
    state: Rc<RefCell<FakeState>>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn unsupported() -> Self {
        let platform = Self::default();
        platform.state_mut().supported = false;
        platform
    }

    pub fn state(&self) -> Ref<'_, FakeState> {
        self.state.borrow()
    }

    pub fn state_mut(&self) -> RefMut<'_, FakeState> {
        self.state.borrow_mut()
    }

    pub fn renderer(&self) -> RecordingBackend {
        self.state().renderer.clone()
    }

    pub fn set_hit(&self, pose: Option<Pose>) {
        self.state_mut().hit = pose;
    }

    /// Complete the oldest anchor request successfully
    pub fn resolve_anchor(&self) {
        let mut s = self.state_mut();
        let id = s.next_anchor;
        s.next_anchor += 1;
        if let Some(resolver) = s.pending_anchors.pop_front() {
            resolver.resolve(Ok(id));
        }
    }

    pub fn reject_anchor(&self) {
        if let Some(resolver) = self.state_mut().pending_anchors.pop_front() {
            resolver.resolve(Err(PlatformError::AnchorRejected("plane lost".to_string())));
        }
    }
}

impl ArPlatform for FakePlatform {
    type Session = u32;
    type ReferenceSpace = String;
    type Anchor = u32;
    type Frame = u64;
    type Overlay = ();
    type Renderer = RecordingBackend;

    fn is_session_supported(&mut self, _mode: &str) -> PendingRequest<bool> {
        let s = self.state();
        if s.support_check_fails {
            return PendingRequest::ready(Err(PlatformError::SessionRejected(
                "navigator.xr missing".to_string(),
            )));
        }
        PendingRequest::ready(Ok(s.supported))
    }

    fn request_session(&mut self, _options: &SessionConfig) -> PendingRequest<u32> {
        let mut s = self.state_mut();
        s.sessions_requested += 1;
        match s.session_error.clone() {
            Some(err) => PendingRequest::ready(Err(err)),
            None => PendingRequest::ready(Ok(1)),
        }
    }

    fn request_reference_space(&mut self, _session: &u32, kind: &str) -> PendingRequest<String> {
        PendingRequest::ready(Ok(kind.to_string()))
    }

    fn create_renderer(&mut self, _session: &u32) -> Result<RecordingBackend, PlatformError> {
        let mut s = self.state_mut();
        if let Some(err) = s.renderer_error.clone() {
            return Err(err);
        }
        s.renderers_created += 1;
        Ok(s.renderer.clone())
    }

    fn mount_overlay(&mut self) -> Result<(), PlatformError> {
        let mut s = self.state_mut();
        if let Some(err) = s.overlay_error.clone() {
            return Err(err);
        }
        s.overlay_mounted = true;
        Ok(())
    }

    fn remove_overlay(&mut self, _overlay: ()) {
        let mut s = self.state_mut();
        s.overlay_mounted = false;
        s.overlays_removed += 1;
    }

    fn show_status(&mut self, status: &NavigationStatus) {
        self.state_mut().statuses.push(status.clone());
    }

    fn request_hit_test_results(&mut self, _frame: &u64, _space: &String) -> Vec<HitResult> {
        let mut s = self.state_mut();
        s.hit_test_calls += 1;
        s.hit.map(|pose| vec![HitResult { pose }]).unwrap_or_default()
    }

    fn create_anchor(&mut self, _frame: &u64, _pose: Pose, _space: &String) -> PendingRequest<u32> {
        let mut s = self.state_mut();
        s.anchor_requests += 1;
        let (resolver, pending) = PendingRequest::channel();
        s.pending_anchors.push_back(resolver);
        pending
    }

    fn anchor_pose(&self, _frame: &u64, _anchor: &u32, _space: &String) -> Option<Pose> {
        Some(self.state().anchor_pose)
    }

    fn end_session(&mut self, _session: u32) {
        self.state_mut().sessions_ended += 1;
    }
}
