//! Simulated AR platform for the browser preview
//!
//! The orbit camera plays the device: each frame's camera pose is the
//! tracking data, and hit-tests cast its view ray against the ground plane.
//! Anchors resolve immediately and never drift.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bevy::prelude::*;
use disha_core::config::SessionConfig;
use disha_core::NavigationStatus;
use disha_scene::{
    ArPlatform, BevyRenderBackend, HitResult, PendingRequest, PlatformError, Pose,
    SceneCommandQueue,
};
use tracing::{debug, info};

use crate::scene::GROUND_Y;

/// Session mode the simulation can run
pub const SIMULATED_MODE: &str = "immersive-ar";

/// Session features the simulation provides
const SIMULATED_FEATURES: &[&str] = &["hit-test", "anchors", "local", "dom-overlay"];

/// Reference spaces the simulation can hand out
const REFERENCE_SPACES: &[&str] = &["local", "local-floor", "viewer"];

/// Tracking data for one frame
#[derive(Debug, Clone, Copy)]
pub struct SimFrame {
    /// Frames since the session started
    pub index: u64,
    pub camera: Pose,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimAnchor {
    pub pose: Pose,
}

#[derive(Debug)]
pub struct SimSession {
    pub id: u32,
}

/// DOM "Exit AR" button injected over the canvas
pub struct ExitOverlay {
    #[cfg(target_arch = "wasm32")]
    element: web_sys::HtmlElement,
    #[cfg(target_arch = "wasm32")]
    _on_click: wasm_bindgen::closure::Closure<dyn FnMut(web_sys::Event)>,
}

#[derive(Debug, Clone)]
pub struct SimulationOptions {
    pub supported: bool,
    /// Frames of "searching" before the floor is reported
    pub warmup_frames: u64,
    pub max_hit_distance: f32,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            supported: true,
            warmup_frames: 45,
            max_hit_distance: 10.0,
        }
    }
}

impl SimulationOptions {
    /// Read `?xr=off` from the page URL to simulate a device without AR
    pub fn from_url() -> Self {
        #[allow(unused_mut)]
        let mut options = Self::default();
        #[cfg(target_arch = "wasm32")]
        {
            let xr = web_sys::window()
                .and_then(|w| w.location().href().ok())
                .and_then(|href| web_sys::Url::new(&href).ok())
                .and_then(|url| url.search_params().get("xr"));
            if xr.as_deref() == Some("off") {
                info!("Simulating a device without AR support");
                options.supported = false;
            }
        }
        options
    }
}

pub struct SimulatedPlatform {
    options: SimulationOptions,
    queue: SceneCommandQueue,
    exit_requested: Arc<AtomicBool>,
    next_session: u32,
    last_status: NavigationStatus,
}

impl SimulatedPlatform {
    pub fn new(options: SimulationOptions, queue: SceneCommandQueue) -> Self {
        Self {
            options,
            queue,
            exit_requested: Arc::new(AtomicBool::new(false)),
            next_session: 1,
            last_status: NavigationStatus::default(),
        }
    }

    /// Consume a pending click on the exit overlay
    pub fn take_exit_request(&self) -> bool {
        self.exit_requested.swap(false, Ordering::SeqCst)
    }

    pub fn last_status(&self) -> &NavigationStatus {
        &self.last_status
    }
}

/// Intersect the camera's view ray with the ground plane
///
/// The returned pose sits on the floor, yawed so that local -Z points the
/// way the camera faces.
pub fn ground_hit(camera: &Pose, max_distance: f32) -> Option<Pose> {
    let forward = camera.orientation * Vec3::NEG_Z;
    if forward.y > -1e-3 {
        return None;
    }
    let t = (GROUND_Y - camera.position.y) / forward.y;
    if t <= 0.0 || t > max_distance {
        return None;
    }
    let point = camera.position + forward * t;

    let heading = Vec3::new(forward.x, 0.0, forward.z).normalize_or_zero();
    let yaw = if heading == Vec3::ZERO {
        0.0
    } else {
        f32::atan2(-heading.x, -heading.z)
    };
    Some(Pose::new(point, Quat::from_rotation_y(yaw)))
}

impl ArPlatform for SimulatedPlatform {
    type Session = SimSession;
    type ReferenceSpace = String;
    type Anchor = SimAnchor;
    type Frame = SimFrame;
    type Overlay = ExitOverlay;
    type Renderer = BevyRenderBackend;

    fn is_session_supported(&mut self, mode: &str) -> PendingRequest<bool> {
        PendingRequest::ready(Ok(self.options.supported && mode == SIMULATED_MODE))
    }

    fn request_session(&mut self, options: &SessionConfig) -> PendingRequest<SimSession> {
        if let Some(missing) = options
            .required_features
            .iter()
            .find(|f| !SIMULATED_FEATURES.contains(&f.as_str()))
        {
            return PendingRequest::ready(Err(PlatformError::SessionRejected(format!(
                "required feature '{}' is not available",
                missing
            ))));
        }
        let id = self.next_session;
        self.next_session += 1;
        debug!(id, mode = %options.mode, "Simulated session granted");
        PendingRequest::ready(Ok(SimSession { id }))
    }

    fn request_reference_space(
        &mut self,
        _session: &SimSession,
        kind: &str,
    ) -> PendingRequest<String> {
        if REFERENCE_SPACES.contains(&kind) {
            PendingRequest::ready(Ok(kind.to_string()))
        } else {
            PendingRequest::ready(Err(PlatformError::ReferenceSpace(kind.to_string())))
        }
    }

    fn create_renderer(&mut self, _session: &SimSession) -> Result<BevyRenderBackend, PlatformError> {
        Ok(BevyRenderBackend::new(self.queue.clone()))
    }

    #[cfg(target_arch = "wasm32")]
    fn mount_overlay(&mut self) -> Result<ExitOverlay, PlatformError> {
        use wasm_bindgen::closure::Closure;
        use wasm_bindgen::JsCast;

        let overlay_err = |what: &str| PlatformError::Overlay(what.to_string());
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| overlay_err("no document"))?;
        let body = document.body().ok_or_else(|| overlay_err("no document body"))?;
        let element: web_sys::HtmlElement = document
            .create_element("button")
            .map_err(|e| PlatformError::Overlay(format!("{:?}", e)))?
            .dyn_into()
            .map_err(|_| overlay_err("button is not an HtmlElement"))?;

        element.set_id("disha-exit-ar");
        element.set_inner_text("Exit AR");
        let style = element.style();
        let _ = style.set_property("position", "absolute");
        let _ = style.set_property("top", "16px");
        let _ = style.set_property("right", "16px");
        let _ = style.set_property("z-index", "10");
        let _ = style.set_property("padding", "8px 14px");

        let flag = self.exit_requested.clone();
        let on_click = Closure::wrap(Box::new(move |_event: web_sys::Event| {
            flag.store(true, Ordering::SeqCst);
        }) as Box<dyn FnMut(_)>);
        element.set_onclick(Some(on_click.as_ref().unchecked_ref()));

        body.append_child(&element)
            .map_err(|e| PlatformError::Overlay(format!("{:?}", e)))?;
        debug!("Exit overlay mounted");

        Ok(ExitOverlay {
            element,
            _on_click: on_click,
        })
    }

    #[cfg(not(target_arch = "wasm32"))]
    fn mount_overlay(&mut self) -> Result<ExitOverlay, PlatformError> {
        Err(PlatformError::Overlay("no DOM outside the browser".to_string()))
    }

    fn remove_overlay(&mut self, overlay: ExitOverlay) {
        #[cfg(target_arch = "wasm32")]
        {
            overlay.element.set_onclick(None);
            overlay.element.remove();
        }
        drop(overlay);
        debug!("Exit overlay removed");
    }

    fn show_status(&mut self, status: &NavigationStatus) {
        info!(status = %status, "AR status");
        self.last_status = status.clone();
    }

    fn request_hit_test_results(&mut self, frame: &SimFrame, _space: &String) -> Vec<HitResult> {
        if frame.index < self.options.warmup_frames {
            return Vec::new();
        }
        ground_hit(&frame.camera, self.options.max_hit_distance)
            .map(|pose| vec![HitResult { pose }])
            .unwrap_or_default()
    }

    fn create_anchor(
        &mut self,
        _frame: &SimFrame,
        pose: Pose,
        _space: &String,
    ) -> PendingRequest<SimAnchor> {
        PendingRequest::ready(Ok(SimAnchor { pose }))
    }

    fn anchor_pose(&self, _frame: &SimFrame, anchor: &SimAnchor, _space: &String) -> Option<Pose> {
        Some(anchor.pose)
    }

    fn end_session(&mut self, session: SimSession) {
        info!(id = session.id, "Simulated session ended");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use disha_core::{ArConfig, OrderedWaypointPath, Waypoint};
    use disha_scene::{SceneCommand, SessionController};

    fn looking_down_from(height: f32) -> Pose {
        let transform = Transform::from_xyz(0.0, height, 1.0).looking_at(Vec3::ZERO, Vec3::Y);
        Pose::new(transform.translation, transform.rotation)
    }

    #[test]
    fn test_ground_hit_below_camera() {
        let hit = ground_hit(&looking_down_from(1.0), 10.0).unwrap();
        assert!(hit.position.y.abs() < 1e-4);
        assert!(hit.position.length() < 1e-3);
        // Local -Z follows the camera heading (towards -Z here)
        let ahead = hit.orientation * Vec3::NEG_Z;
        assert!((ahead - Vec3::NEG_Z).length() < 1e-4);
    }

    #[test]
    fn test_no_hit_looking_up_or_too_far() {
        let up = Pose::new(Vec3::Y, Quat::from_rotation_x(0.5));
        assert!(ground_hit(&up, 10.0).is_none());
        assert!(ground_hit(&looking_down_from(1.0), 0.5).is_none());
    }

    #[test]
    fn test_missing_feature_rejects_session() {
        let mut platform = SimulatedPlatform::new(SimulationOptions::default(), SceneCommandQueue::default());
        let options = SessionConfig {
            required_features: vec!["depth-sensing".to_string()],
            ..SessionConfig::default()
        };
        let mut request = platform.request_session(&options);
        assert!(matches!(
            request.try_take(),
            Some(Err(PlatformError::SessionRejected(_)))
        ));
    }

    #[test]
    fn test_simulated_session_places_path() {
        let queue = SceneCommandQueue::default();
        let options = SimulationOptions {
            warmup_frames: 3,
            ..SimulationOptions::default()
        };
        let path = OrderedWaypointPath::new(Waypoint::ORIGIN, vec![Waypoint::new(1.0, 0.0, 0.0)]);
        let mut controller = SessionController::new(
            SimulatedPlatform::new(options, queue.clone()),
            path,
            ArConfig::default(),
        );
        bevy::tasks::block_on(controller.start()).unwrap();

        let camera = looking_down_from(1.2);
        for index in 0..3 {
            controller.tick(&SimFrame { index, camera }, 0.0);
        }
        assert!(!controller.is_anchored());

        // One frame to request, one to observe the resolved anchor
        controller.tick(&SimFrame { index: 3, camera }, 0.1);
        controller.tick(&SimFrame { index: 4, camera }, 0.2);
        assert!(controller.is_anchored());
        assert_eq!(controller.status(), NavigationStatus::NavigationActive);

        let commands = queue.drain();
        let spawns = commands
            .iter()
            .filter(|c| matches!(c, SceneCommand::Spawn { .. }))
            .count();
        assert_eq!(spawns, 3);
        assert!(commands
            .iter()
            .any(|c| matches!(c, SceneCommand::SetRootPose(_))));

        controller.end();
        assert!(queue.drain().contains(&SceneCommand::Dispose));
    }

    #[test]
    fn test_unsupported_device() {
        let options = SimulationOptions {
            supported: false,
            ..SimulationOptions::default()
        };
        let mut controller = SessionController::new(
            SimulatedPlatform::new(options, SceneCommandQueue::default()),
            OrderedWaypointPath::new(Waypoint::ORIGIN, Vec::new()),
            ArConfig::default(),
        );
        assert!(bevy::tasks::block_on(controller.start()).is_err());
        assert_eq!(controller.status(), NavigationStatus::Unsupported);
        assert_eq!(controller.platform().last_status(), &NavigationStatus::Unsupported);
    }
}
