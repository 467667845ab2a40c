//! AR platform capability interface
//!
//! The session and anchor controllers depend only on this trait. A browser
//! host implements it on top of WebXR, the viewer implements it with a
//! simulated ground plane, and tests use an in-memory double.

use bevy::math::{Quat, Vec3};
use disha_core::config::SessionConfig;
use disha_core::NavigationStatus;
use thiserror::Error;
use tokio::sync::oneshot;

use crate::backend::RenderBackend;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlatformError {
    #[error("Session request rejected: {0}")]
    SessionRejected(String),
    #[error("Reference space unavailable: {0}")]
    ReferenceSpace(String),
    #[error("Renderer setup failed: {0}")]
    Renderer(String),
    #[error("Overlay unavailable: {0}")]
    Overlay(String),
    #[error("Anchor creation rejected: {0}")]
    AnchorRejected(String),
    #[error("Request was dropped before completing")]
    Cancelled,
}

/// Rigid transform in a reference space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Quat,
}

impl Pose {
    pub const IDENTITY: Pose = Pose {
        position: Vec3::ZERO,
        orientation: Quat::IDENTITY,
    };

    pub fn new(position: Vec3, orientation: Quat) -> Self {
        Self {
            position,
            orientation,
        }
    }

    pub fn from_position(position: Vec3) -> Self {
        Self::new(position, Quat::IDENTITY)
    }

    /// Map a point from this pose's local frame into its parent space
    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.position + self.orientation * local
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// A candidate surface returned by a hit-test
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitResult {
    pub pose: Pose,
}

/// One-shot asynchronous platform request
///
/// Awaited during session startup and polled with [`PendingRequest::try_take`]
/// from the frame tick, which must never block.
#[derive(Debug)]
pub struct PendingRequest<T> {
    rx: oneshot::Receiver<Result<T, PlatformError>>,
}

/// Completing side of a [`PendingRequest`]
#[derive(Debug)]
pub struct Resolver<T> {
    tx: oneshot::Sender<Result<T, PlatformError>>,
}

impl<T> PendingRequest<T> {
    pub fn channel() -> (Resolver<T>, PendingRequest<T>) {
        let (tx, rx) = oneshot::channel();
        (Resolver { tx }, PendingRequest { rx })
    }

    /// A request that has already completed
    pub fn ready(result: Result<T, PlatformError>) -> Self {
        let (resolver, pending) = Self::channel();
        resolver.resolve(result);
        pending
    }

    /// Take the result if the request has completed
    ///
    /// A resolver dropped without answering yields `PlatformError::Cancelled`.
    pub fn try_take(&mut self) -> Option<Result<T, PlatformError>> {
        match self.rx.try_recv() {
            Ok(result) => Some(result),
            Err(oneshot::error::TryRecvError::Empty) => None,
            Err(oneshot::error::TryRecvError::Closed) => Some(Err(PlatformError::Cancelled)),
        }
    }

    pub async fn wait(self) -> Result<T, PlatformError> {
        match self.rx.await {
            Ok(result) => result,
            Err(_) => Err(PlatformError::Cancelled),
        }
    }
}

impl<T> Resolver<T> {
    pub fn resolve(self, result: Result<T, PlatformError>) {
        // The requester may already be gone; nothing to deliver then.
        let _ = self.tx.send(result);
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Capabilities the AR core consumes from its host
pub trait ArPlatform {
    type Session;
    type ReferenceSpace: Clone;
    type Anchor: Clone;
    /// Per-frame tracking data handed to the frame tick
    type Frame;
    /// Injected UI control (e.g. an exit button)
    type Overlay;
    type Renderer: RenderBackend;

    fn is_session_supported(&mut self, mode: &str) -> PendingRequest<bool>;

    fn request_session(&mut self, options: &SessionConfig) -> PendingRequest<Self::Session>;

    fn request_reference_space(
        &mut self,
        session: &Self::Session,
        kind: &str,
    ) -> PendingRequest<Self::ReferenceSpace>;

    /// Create scene, camera and renderer with XR rendering enabled
    fn create_renderer(&mut self, session: &Self::Session) -> Result<Self::Renderer, PlatformError>;

    fn mount_overlay(&mut self) -> Result<Self::Overlay, PlatformError>;

    fn remove_overlay(&mut self, overlay: Self::Overlay);

    fn show_status(&mut self, status: &NavigationStatus);

    fn request_hit_test_results(
        &mut self,
        frame: &Self::Frame,
        space: &Self::ReferenceSpace,
    ) -> Vec<HitResult>;

    fn create_anchor(
        &mut self,
        frame: &Self::Frame,
        pose: Pose,
        space: &Self::ReferenceSpace,
    ) -> PendingRequest<Self::Anchor>;

    /// Current tracked pose of an anchor, if tracking is available this frame
    fn anchor_pose(
        &self,
        frame: &Self::Frame,
        anchor: &Self::Anchor,
        space: &Self::ReferenceSpace,
    ) -> Option<Pose>;

    fn end_session(&mut self, session: Self::Session);
}
