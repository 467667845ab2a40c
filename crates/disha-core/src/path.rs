//! Waypoint paths produced by the vision backend
//!
//! The backend answers an image upload with a JSON document holding a start
//! position and an ordered list of waypoints. Coordinates are in the
//! backend's own units; scaling into render space happens in `disha-scene`.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum PathError {
    #[error("Failed to parse path response: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Path response is missing required field `{0}`")]
    MissingField(&'static str),
    #[error("Non-finite coordinate in `{field}` at index {index}")]
    NonFinite { field: &'static str, index: usize },
    #[error("Coordinate in `{field}` at index {index} is too large to render")]
    OutOfRange { field: &'static str, index: usize },
}

/// A point in the vision backend's coordinate frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Waypoint {
    pub const ORIGIN: Waypoint = Waypoint { x: 0.0, y: 0.0, z: 0.0 };

    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Every component is representable in single-precision render space
    pub fn fits_f32(&self) -> bool {
        [self.x, self.y, self.z]
            .iter()
            .all(|v| v.abs() <= f32::MAX as f64)
    }
}

/// The origin of a path. Same shape as a waypoint but never part of the
/// waypoint sequence itself.
pub type StartPosition = Waypoint;

/// The complete navigable path for one AR session
///
/// Replaced wholesale when a new backend response arrives; there are no
/// incremental edits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderedWaypointPath {
    pub start: StartPosition,
    /// Traversal order: index 0 is nearest the start
    pub waypoints: Vec<Waypoint>,
}

impl OrderedWaypointPath {
    pub fn new(start: StartPosition, waypoints: Vec<Waypoint>) -> Self {
        Self { start, waypoints }
    }

    /// Parse and validate a backend response
    pub fn from_json(json: &str) -> Result<Self, PathError> {
        PathResponse::from_json(json)?.into_path()
    }

    /// Start position followed by every waypoint, in traversal order
    pub fn points(&self) -> impl Iterator<Item = &Waypoint> {
        std::iter::once(&self.start).chain(self.waypoints.iter())
    }
}

/// Raw response body as sent by the vision backend
///
/// Both fields are optional at the wire level so that a partial response can
/// be told apart from malformed JSON.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PathResponse {
    #[serde(default)]
    pub start_pos: Option<StartPosition>,
    #[serde(default)]
    pub waypoints: Option<Vec<Waypoint>>,
}

impl PathResponse {
    pub fn from_json(json: &str) -> Result<Self, PathError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Validate the response into a path the AR view can consume
    ///
    /// A response without `start_pos` or `waypoints` must not reach AR mode.
    /// An empty waypoint list is valid.
    pub fn into_path(self) -> Result<OrderedWaypointPath, PathError> {
        let start = self.start_pos.ok_or(PathError::MissingField("start_pos"))?;
        let waypoints = self.waypoints.ok_or(PathError::MissingField("waypoints"))?;

        if !start.is_finite() {
            return Err(PathError::NonFinite {
                field: "start_pos",
                index: 0,
            });
        }
        if let Some(index) = waypoints.iter().position(|w| !w.is_finite()) {
            return Err(PathError::NonFinite {
                field: "waypoints",
                index,
            });
        }
        if !start.fits_f32() {
            return Err(PathError::OutOfRange {
                field: "start_pos",
                index: 0,
            });
        }
        if let Some(index) = waypoints.iter().position(|w| !w.fits_f32()) {
            return Err(PathError::OutOfRange {
                field: "waypoints",
                index,
            });
        }

        debug!(waypoints = waypoints.len(), "Validated path response");
        Ok(OrderedWaypointPath { start, waypoints })
    }
}
