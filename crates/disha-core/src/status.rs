//! User-facing navigation status

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status shown to the user while the AR view is mounted
///
/// Derived from the session phase and the anchor state; it is never stored
/// independently of them.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum NavigationStatus {
    /// No session has been started yet
    #[default]
    Idle,
    /// Capability check and session acquisition in progress
    Starting,
    /// The platform cannot run the required AR session type
    Unsupported,
    /// Session or renderer setup failed
    Failed(String),
    /// Session running, waiting for the first surface hit
    SearchingForSurface,
    /// Anchor established and the path is on screen
    NavigationActive,
    /// Session torn down
    Ended,
}

impl NavigationStatus {
    /// Short text for the status overlay
    pub fn message(&self) -> String {
        match self {
            NavigationStatus::Idle => "AR view not started".to_string(),
            NavigationStatus::Starting => "Starting AR session...".to_string(),
            NavigationStatus::Unsupported => "AR is not supported on this device".to_string(),
            NavigationStatus::Failed(reason) => format!("AR session failed: {}", reason),
            NavigationStatus::SearchingForSurface => {
                "Searching for surface... move your device slowly".to_string()
            }
            NavigationStatus::NavigationActive => "Navigation active".to_string(),
            NavigationStatus::Ended => "AR session ended".to_string(),
        }
    }

    /// Whether the status reports a failure the caller must show
    pub fn is_error(&self) -> bool {
        matches!(self, NavigationStatus::Unsupported | NavigationStatus::Failed(_))
    }
}

impl fmt::Display for NavigationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_and_failed_are_distinct() {
        let failed = NavigationStatus::Failed("renderer".into());
        assert_ne!(failed, NavigationStatus::Unsupported);
        assert!(failed.is_error());
        assert!(failed.message().contains("renderer"));
        assert!(!NavigationStatus::Ended.is_error());
    }
}
