//! Hit-test driven anchor establishment
//!
//! Runs once per frame while no anchor exists. The first frame with at least
//! one hit issues a single anchor request; frames seen while that request is
//! in flight only poll it. A rejected request returns the controller to
//! searching. Once established the state never reverts for the session.

use tracing::{debug, info, warn};

use crate::platform::{ArPlatform, PendingRequest};

/// Anchor state of one AR session
#[derive(Debug, Clone)]
pub enum AnchorState<A, S> {
    None,
    Established { anchor: A, reference_space: S },
}

impl<A, S> AnchorState<A, S> {
    pub fn is_established(&self) -> bool {
        matches!(self, AnchorState::Established { .. })
    }
}

/// Outcome of one frame of anchor work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnchorEvent {
    /// Already anchored, nothing was done
    Idle,
    /// Hit-test returned no surface this frame
    NoHit,
    /// A hit was found and an anchor request issued
    Requested,
    /// An earlier request has not completed yet
    Pending,
    /// The platform refused to create the anchor
    Rejected,
    /// The anchor was created this frame
    Established,
}

pub struct AnchorController<P: ArPlatform> {
    state: AnchorState<P::Anchor, P::ReferenceSpace>,
    pending: Option<(PendingRequest<P::Anchor>, P::ReferenceSpace)>,
    requests: u32,
    rejections: u32,
}

impl<P: ArPlatform> Default for AnchorController<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: ArPlatform> AnchorController<P> {
    pub fn new() -> Self {
        Self {
            state: AnchorState::None,
            pending: None,
            requests: 0,
            rejections: 0,
        }
    }

    /// Advance the state machine by one frame
    pub fn on_frame(
        &mut self,
        platform: &mut P,
        frame: &P::Frame,
        space: &P::ReferenceSpace,
    ) -> AnchorEvent {
        if self.state.is_established() {
            return AnchorEvent::Idle;
        }

        if let Some((mut request, reference_space)) = self.pending.take() {
            let Some(result) = request.try_take() else {
                self.pending = Some((request, reference_space));
                return AnchorEvent::Pending;
            };
            return match result {
                Ok(anchor) => {
                    info!(attempts = self.requests, "Anchor established");
                    self.state = AnchorState::Established {
                        anchor,
                        reference_space,
                    };
                    AnchorEvent::Established
                }
                Err(e) => {
                    self.rejections += 1;
                    warn!(rejections = self.rejections, "Anchor request failed: {}", e);
                    AnchorEvent::Rejected
                }
            };
        }

        let hits = platform.request_hit_test_results(frame, space);
        let Some(hit) = hits.first() else {
            return AnchorEvent::NoHit;
        };

        self.requests += 1;
        debug!(
            attempt = self.requests,
            x = hit.pose.position.x,
            y = hit.pose.position.y,
            z = hit.pose.position.z,
            "Surface hit, requesting anchor"
        );
        let request = platform.create_anchor(frame, hit.pose, space);
        self.pending = Some((request, space.clone()));
        AnchorEvent::Requested
    }

    pub fn state(&self) -> &AnchorState<P::Anchor, P::ReferenceSpace> {
        &self.state
    }

    pub fn is_established(&self) -> bool {
        self.state.is_established()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    pub fn anchor(&self) -> Option<(&P::Anchor, &P::ReferenceSpace)> {
        match &self.state {
            AnchorState::Established {
                anchor,
                reference_space,
            } => Some((anchor, reference_space)),
            AnchorState::None => None,
        }
    }

    /// Anchor requests issued so far
    pub fn requests(&self) -> u32 {
        self.requests
    }

    pub fn rejections(&self) -> u32 {
        self.rejections
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::Pose;
    use crate::testing::FakePlatform;
    use bevy::math::Vec3;

    fn space() -> String {
        "local".to_string()
    }

    #[test]
    fn test_no_hit_keeps_waiting() {
        let mut platform = FakePlatform::new();
        let mut anchors = AnchorController::<FakePlatform>::new();
        for frame in 0..5 {
            assert_eq!(anchors.on_frame(&mut platform, &frame, &space()), AnchorEvent::NoHit);
        }
        assert!(!anchors.is_established());
        assert_eq!(platform.state().hit_test_calls, 5);
        assert_eq!(platform.state().anchor_requests, 0);
    }

    #[test]
    fn test_single_request_while_pending() {
        let mut platform = FakePlatform::new();
        platform.set_hit(Some(Pose::from_position(Vec3::new(0.0, -1.0, -2.0))));
        let mut anchors = AnchorController::<FakePlatform>::new();

        assert_eq!(anchors.on_frame(&mut platform, &0, &space()), AnchorEvent::Requested);
        for frame in 1..4 {
            assert_eq!(anchors.on_frame(&mut platform, &frame, &space()), AnchorEvent::Pending);
        }
        assert_eq!(platform.state().anchor_requests, 1);
        assert_eq!(platform.state().hit_test_calls, 1);
        assert!(anchors.is_pending());

        // The request polled across those frames is the one that completes
        platform.resolve_anchor();
        assert_eq!(anchors.on_frame(&mut platform, &4, &space()), AnchorEvent::Established);
        assert!(!anchors.is_pending());
        assert_eq!(anchors.requests(), 1);
    }

    #[test]
    fn test_established_never_reverts() {
        let mut platform = FakePlatform::new();
        platform.set_hit(Some(Pose::IDENTITY));
        let mut anchors = AnchorController::<FakePlatform>::new();

        anchors.on_frame(&mut platform, &0, &space());
        platform.resolve_anchor();
        assert_eq!(anchors.on_frame(&mut platform, &1, &space()), AnchorEvent::Established);
        assert_eq!(anchors.anchor(), Some((&1, &space())));

        let calls = platform.state().hit_test_calls;
        for frame in 2..10 {
            assert_eq!(anchors.on_frame(&mut platform, &frame, &space()), AnchorEvent::Idle);
        }
        assert!(anchors.is_established());
        assert_eq!(platform.state().hit_test_calls, calls);
        assert_eq!(platform.state().anchor_requests, 1);
    }

    #[test]
    fn test_rejection_retries_on_next_hit() {
        let mut platform = FakePlatform::new();
        platform.set_hit(Some(Pose::IDENTITY));
        let mut anchors = AnchorController::<FakePlatform>::new();

        anchors.on_frame(&mut platform, &0, &space());
        platform.reject_anchor();
        assert_eq!(anchors.on_frame(&mut platform, &1, &space()), AnchorEvent::Rejected);
        assert!(!anchors.is_established());
        assert!(!anchors.is_pending());

        assert_eq!(anchors.on_frame(&mut platform, &2, &space()), AnchorEvent::Requested);
        platform.resolve_anchor();
        assert_eq!(anchors.on_frame(&mut platform, &3, &space()), AnchorEvent::Established);
        assert_eq!(anchors.requests(), 2);
        assert_eq!(anchors.rejections(), 1);
    }

    #[test]
    fn test_dropped_request_counts_as_rejection() {
        let mut platform = FakePlatform::new();
        platform.set_hit(Some(Pose::IDENTITY));
        let mut anchors = AnchorController::<FakePlatform>::new();

        anchors.on_frame(&mut platform, &0, &space());
        platform.state_mut().pending_anchors.clear();
        assert_eq!(anchors.on_frame(&mut platform, &1, &space()), AnchorEvent::Rejected);
    }
}
