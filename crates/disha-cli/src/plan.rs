//! Render-space plan of a path, as the AR view would place it

use disha_core::{ArConfig, OrderedWaypointPath};
use disha_scene::{MarkerRole, PathBuilder};
use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Serialize)]
pub struct PlannedMarker {
    pub index: usize,
    pub role: &'static str,
    pub position: [f32; 3],
    pub indicator: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlannedConnector {
    pub from: [f32; 3],
    pub to: [f32; 3],
    pub length: f32,
}

/// Markers and connectors relative to the anchor
#[derive(Debug, Clone, Serialize)]
pub struct ScenePlan {
    pub scale: f64,
    pub markers: Vec<PlannedMarker>,
    pub connectors: Vec<PlannedConnector>,
    /// Sum of connector lengths in render units
    pub total_length: f32,
}

impl ScenePlan {
    pub fn build(path: &OrderedWaypointPath, config: &ArConfig) -> Self {
        let scale = config.path.scale;
        let built = PathBuilder::from_config(config).build_path(path, scale);

        let markers = built
            .markers
            .iter()
            .map(|m| PlannedMarker {
                index: m.index,
                role: match m.role {
                    MarkerRole::Start => "start",
                    MarkerRole::Waypoint => "waypoint",
                },
                position: m.position.to_array(),
                indicator: m.has_indicator(),
            })
            .collect();
        let connectors: Vec<PlannedConnector> = built
            .connectors
            .iter()
            .map(|c| PlannedConnector {
                from: c.from.to_array(),
                to: c.to.to_array(),
                length: c.length(),
            })
            .collect();
        let total_length = connectors.iter().map(|c| c.length).sum();

        Self {
            scale,
            markers,
            connectors,
            total_length,
        }
    }

    pub fn object_count(&self) -> usize {
        self.markers.len() + self.connectors.len()
    }
}

fn fmt_point(p: &[f32; 3]) -> String {
    format!("({:.3}, {:.3}, {:.3})", p[0], p[1], p[2])
}

impl fmt::Display for ScenePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} markers, {} connectors (scale {})",
            self.markers.len(),
            self.connectors.len(),
            self.scale
        )?;
        for marker in &self.markers {
            writeln!(
                f,
                "  [{}] {:<8} {}{}",
                marker.index,
                marker.role,
                fmt_point(&marker.position),
                if marker.indicator { "  ^" } else { "" }
            )?;
        }
        for (i, connector) in self.connectors.iter().enumerate() {
            writeln!(
                f,
                "  {}-{}      {} -> {}  len {:.3}",
                i,
                i + 1,
                fmt_point(&connector.from),
                fmt_point(&connector.to),
                connector.length
            )?;
        }
        write!(f, "Total length: {:.3}", self.total_length)
    }
}
