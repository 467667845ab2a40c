//! Drives the AR session controller from Bevy systems
//!
//! The controller holds browser handles, so it lives in a non-send resource.
//! Its frame tick runs before `SceneSet::Apply`, which puts every scene
//! change of a tick on screen in the same frame.

use bevy::prelude::*;
use bevy::tasks::{block_on, futures_lite::future};
use disha_core::NavigationStatus;
use disha_scene::{Pose, SceneCommandQueue, SceneSet, SessionController};
use tracing::{error, info, warn};

use crate::app::{LoadedPath, ViewerConfig};
use crate::platform::{SimFrame, SimulatedPlatform, SimulationOptions};
use crate::scene::MainCamera;

pub struct ArSessionPlugin;

impl Plugin for ArSessionPlugin {
    fn build(&self, app: &mut App) {
        app.insert_non_send_resource(ArSession::default())
            .add_systems(
                Update,
                (
                    apply_path_updates,
                    start_session,
                    handle_exit_request,
                    drive_session,
                )
                    .chain()
                    .before(SceneSet::Apply),
            );
    }
}

/// The viewer's single AR session
pub struct ArSession {
    controller: Option<SessionController<SimulatedPlatform>>,
    started_at: f32,
    frames: u64,
    /// Start as soon as a path is available
    auto_start: bool,
    restart_requested: bool,
    end_requested: bool,
}

impl Default for ArSession {
    fn default() -> Self {
        Self {
            controller: None,
            started_at: 0.0,
            frames: 0,
            auto_start: true,
            restart_requested: false,
            end_requested: false,
        }
    }
}

impl ArSession {
    pub fn status(&self) -> NavigationStatus {
        self.controller
            .as_ref()
            .map(|c| c.status())
            .unwrap_or_default()
    }

    pub fn controller(&self) -> Option<&SessionController<SimulatedPlatform>> {
        self.controller.as_ref()
    }

    pub fn is_running(&self) -> bool {
        self.controller
            .as_ref()
            .is_some_and(|c| c.is_frame_loop_active())
    }

    /// Tear down the current session (if any) and start a new one
    pub fn request_restart(&mut self) {
        self.restart_requested = true;
    }

    pub fn request_end(&mut self) {
        self.end_requested = true;
    }
}

/// Hand a newly loaded path to the running session
fn apply_path_updates(mut session: NonSendMut<ArSession>, loaded: Res<LoadedPath>) {
    if !loaded.is_changed() {
        return;
    }
    let (Some(controller), Some(path)) = (session.controller.as_mut(), loaded.path.as_ref())
    else {
        return;
    };
    if controller.is_frame_loop_active() && controller.path() != path {
        controller.set_path(path.clone());
    }
}

fn start_session(
    mut session: NonSendMut<ArSession>,
    loaded: Res<LoadedPath>,
    config: Res<ViewerConfig>,
    queue: Res<SceneCommandQueue>,
    time: Res<Time>,
) {
    if session.restart_requested {
        session.restart_requested = false;
        // Dropping the controller ends it and queues the scene teardown
        session.controller = None;
        session.auto_start = true;
    }
    if session.controller.is_some() || !session.auto_start {
        return;
    }
    // Without a valid path there is no session at all
    let Some(path) = loaded.path.clone() else {
        return;
    };
    session.auto_start = false;

    let platform = SimulatedPlatform::new(SimulationOptions::from_url(), queue.clone());
    let mut controller = SessionController::new(platform, path, config.0.clone());

    // Simulated requests resolve immediately, so startup finishes in one poll
    match block_on(future::poll_once(controller.start())) {
        Some(Ok(())) => info!("Simulated AR session running"),
        Some(Err(e)) => warn!("AR session did not start: {}", e),
        None => {
            error!("AR session startup did not complete");
            return;
        }
    }

    session.started_at = time.elapsed_secs();
    session.frames = 0;
    session.controller = Some(controller);
}

fn handle_exit_request(mut session: NonSendMut<ArSession>) {
    let end_requested = std::mem::take(&mut session.end_requested);
    let Some(controller) = session.controller.as_mut() else {
        return;
    };
    if controller.platform().take_exit_request() || end_requested {
        info!("Exit requested");
        controller.end();
    }
}

fn drive_session(
    mut session: NonSendMut<ArSession>,
    camera: Query<&GlobalTransform, With<MainCamera>>,
    time: Res<Time>,
) {
    let Ok(camera) = camera.single() else {
        return;
    };
    let session = &mut *session;
    let Some(controller) = session.controller.as_mut() else {
        return;
    };
    if !controller.is_frame_loop_active() {
        return;
    }

    let (_, rotation, translation) = camera.to_scale_rotation_translation();
    let frame = SimFrame {
        index: session.frames,
        camera: Pose::new(translation, rotation),
    };
    session.frames += 1;
    controller.tick(&frame, time.elapsed_secs() - session.started_at);
}
