//! Disha Core - Waypoint data model, input contract, and configuration
//!
//! This crate provides the foundational types for the Disha system:
//! - Waypoint paths as delivered by the vision backend
//! - Parsing and validation of the backend's JSON response
//! - TOML configuration for scale, marker style, animation, and session
//! - The user-facing navigation status

pub mod config;
pub mod path;
pub mod status;

pub use config::{load_config, save_default_config, ArConfig, ConfigError, Rgb};
pub use path::{OrderedWaypointPath, PathError, PathResponse, StartPosition, Waypoint};
pub use status::NavigationStatus;
