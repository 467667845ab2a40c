//! AR session lifecycle and the per-frame tick
//!
//! `SessionController` owns everything one mounted AR view allocates: the
//! platform session, the reference space, the renderer, the injected overlay
//! and the scene registry. The host awaits [`SessionController::start`] once,
//! calls [`SessionController::tick`] from its frame callback, and calls
//! [`SessionController::end`] (or drops the controller) on exit.

use disha_core::{ArConfig, NavigationStatus, OrderedWaypointPath};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::anchor::{AnchorController, AnchorEvent};
use crate::backend::RenderBackend;
use crate::path::PathBuilder;
use crate::platform::{ArPlatform, PlatformError};
use crate::registry::SceneRegistry;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
    #[error("AR mode '{0}' is not supported on this device")]
    Unsupported(String),
    #[error("AR session initialization failed: {0}")]
    InitFailed(String),
    #[error("Session was already started")]
    AlreadyStarted,
}

#[derive(Debug, Clone, PartialEq)]
enum Phase {
    Idle,
    Starting,
    Running,
    Unsupported,
    Failed(String),
    Ended,
}

pub struct SessionController<P: ArPlatform> {
    platform: P,
    config: ArConfig,
    builder: PathBuilder,
    path: OrderedWaypointPath,
    phase: Phase,
    session: Option<P::Session>,
    reference_space: Option<P::ReferenceSpace>,
    renderer: Option<P::Renderer>,
    overlay: Option<P::Overlay>,
    anchors: AnchorController<P>,
    registry: SceneRegistry,
    frame_loop_active: bool,
    last_status: Option<NavigationStatus>,
}

impl<P: ArPlatform> SessionController<P> {
    pub fn new(platform: P, path: OrderedWaypointPath, config: ArConfig) -> Self {
        Self {
            platform,
            builder: PathBuilder::from_config(&config),
            config,
            path,
            phase: Phase::Idle,
            session: None,
            reference_space: None,
            renderer: None,
            overlay: None,
            anchors: AnchorController::new(),
            registry: SceneRegistry::new(),
            frame_loop_active: false,
            last_status: None,
        }
    }

    /// Check capabilities and acquire the session, reference space, renderer
    /// and overlay
    ///
    /// On success the frame loop is active and the first tick starts
    /// searching for a surface. On failure nothing stays allocated and the
    /// status reports either `Unsupported` or `Failed`. An unsupported device
    /// goes straight from idle to `Unsupported`.
    pub async fn start(&mut self) -> Result<(), SessionError> {
        if self.phase != Phase::Idle {
            return Err(SessionError::AlreadyStarted);
        }

        let mode = self.config.session.mode.clone();
        let supported = match self.platform.is_session_supported(&mode).wait().await {
            Ok(supported) => supported,
            Err(e) => {
                warn!(mode = %mode, "Capability check failed: {}", e);
                false
            }
        };
        if !supported {
            warn!(mode = %mode, "AR session mode not supported");
            self.phase = Phase::Unsupported;
            self.publish_status();
            return Err(SessionError::Unsupported(mode));
        }

        self.phase = Phase::Starting;
        self.publish_status();

        if let Err(e) = self.initialize().await {
            error!("Failed to initialize AR session: {}", e);
            self.release();
            self.phase = Phase::Failed(e.to_string());
            self.publish_status();
            return Err(SessionError::InitFailed(e.to_string()));
        }

        self.frame_loop_active = true;
        self.phase = Phase::Running;
        info!(
            mode = %mode,
            waypoints = self.path.waypoints.len(),
            "AR session started"
        );
        self.publish_status();
        Ok(())
    }

    async fn initialize(&mut self) -> Result<(), PlatformError> {
        let session = self
            .platform
            .request_session(&self.config.session)
            .wait()
            .await?;
        let session = self.session.insert(session);

        let space = self
            .platform
            .request_reference_space(session, &self.config.session.reference_space)
            .wait()
            .await?;
        self.reference_space = Some(space);

        self.renderer = Some(self.platform.create_renderer(session)?);

        match self.platform.mount_overlay() {
            Ok(overlay) => self.overlay = Some(overlay),
            Err(e) => warn!("Continuing without exit overlay: {}", e),
        }
        Ok(())
    }

    /// One frame of the render loop
    ///
    /// While unanchored this runs the hit-test/anchor step; the frame in
    /// which the anchor is established also populates the scene. Every
    /// frame then follows the anchor pose, animates markers and renders.
    pub fn tick(&mut self, frame: &P::Frame, elapsed: f32) {
        if !self.frame_loop_active {
            return;
        }

        if !self.anchors.is_established() {
            if let Some(space) = self.reference_space.as_ref() {
                let event = self.anchors.on_frame(&mut self.platform, frame, space);
                if event == AnchorEvent::Established {
                    self.populate();
                    self.publish_status();
                }
            }
        }

        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        if let Some((anchor, space)) = self.anchors.anchor() {
            if let Some(pose) = self.platform.anchor_pose(frame, anchor, space) {
                renderer.set_root_pose(pose);
            }
        }
        self.registry.animate(renderer, elapsed);
        renderer.render();
    }

    /// Replace the path wholesale
    ///
    /// If the session is already anchored the scene is repopulated right
    /// away against the same anchor.
    pub fn set_path(&mut self, path: OrderedWaypointPath) {
        info!(waypoints = path.waypoints.len(), "Path updated");
        self.path = path;
        if self.frame_loop_active && self.anchors.is_established() {
            self.populate();
        }
    }

    /// Stop the frame loop and release every resource that was created
    ///
    /// Safe to call any number of times, before or after `start`.
    pub fn end(&mut self) {
        self.frame_loop_active = false;
        self.release();
        if matches!(self.phase, Phase::Idle | Phase::Starting | Phase::Running) {
            self.phase = Phase::Ended;
            info!("AR session ended");
            self.publish_status();
        }
    }

    fn populate(&mut self) {
        let Some(renderer) = self.renderer.as_mut() else {
            return;
        };
        let built = self.builder.build_path(&self.path, self.config.path.scale);
        let markers = built.markers.len();
        let connectors = built.connectors.len();
        let generation = self.registry.replace(renderer, built.into_scene_objects());
        info!(
            generation = generation.0,
            markers, connectors, "Scene populated"
        );
    }

    fn release(&mut self) {
        if let Some(mut renderer) = self.renderer.take() {
            self.registry.clear(&mut renderer);
            renderer.dispose();
            debug!("Renderer disposed");
        }
        if let Some(overlay) = self.overlay.take() {
            self.platform.remove_overlay(overlay);
        }
        self.reference_space = None;
        if let Some(session) = self.session.take() {
            self.platform.end_session(session);
        }
    }

    fn publish_status(&mut self) {
        let status = self.status();
        if self.last_status.as_ref() == Some(&status) {
            return;
        }
        debug!(status = %status, "Status changed");
        self.platform.show_status(&status);
        self.last_status = Some(status);
    }

    pub fn status(&self) -> NavigationStatus {
        match &self.phase {
            Phase::Idle => NavigationStatus::Idle,
            Phase::Starting => NavigationStatus::Starting,
            Phase::Running if self.anchors.is_established() => NavigationStatus::NavigationActive,
            Phase::Running => NavigationStatus::SearchingForSurface,
            Phase::Unsupported => NavigationStatus::Unsupported,
            Phase::Failed(reason) => NavigationStatus::Failed(reason.clone()),
            Phase::Ended => NavigationStatus::Ended,
        }
    }

    pub fn is_frame_loop_active(&self) -> bool {
        self.frame_loop_active
    }

    pub fn is_anchored(&self) -> bool {
        self.anchors.is_established()
    }

    pub fn registry(&self) -> &SceneRegistry {
        &self.registry
    }

    pub fn renderer(&self) -> Option<&P::Renderer> {
        self.renderer.as_ref()
    }

    pub fn platform(&self) -> &P {
        &self.platform
    }

    pub fn path(&self) -> &OrderedWaypointPath {
        &self.path
    }
}

impl<P: ArPlatform> Drop for SessionController<P> {
    fn drop(&mut self) {
        self.end();
    }
}
