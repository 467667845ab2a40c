//! Shared UI components for navigation display

use bevy_egui::egui;
use disha_core::{NavigationStatus, OrderedWaypointPath};

use crate::registry::SceneRegistry;

/// Banner color for a status
pub fn status_color(status: &NavigationStatus) -> egui::Color32 {
    match status {
        NavigationStatus::NavigationActive => egui::Color32::from_rgb(80, 200, 120),
        NavigationStatus::SearchingForSurface | NavigationStatus::Starting => {
            egui::Color32::from_rgb(230, 190, 60)
        }
        NavigationStatus::Unsupported | NavigationStatus::Failed(_) => {
            egui::Color32::from_rgb(230, 80, 80)
        }
        NavigationStatus::Idle | NavigationStatus::Ended => egui::Color32::GRAY,
    }
}

/// Render the status line shown over the AR view
pub fn render_status_banner(ui: &mut egui::Ui, status: &NavigationStatus) {
    ui.horizontal(|ui| {
        ui.label(egui::RichText::new("●").color(status_color(status)));
        let text = egui::RichText::new(status.message()).strong();
        if status.is_error() {
            ui.label(text.color(status_color(status)));
        } else {
            ui.label(text);
        }
    });
}

/// Render a summary of the loaded path and what is on screen
pub fn render_path_summary(
    ui: &mut egui::Ui,
    path: &OrderedWaypointPath,
    registry: &SceneRegistry,
) {
    let start = &path.start;
    ui.label(format!(
        "Start: [{:.2}, {:.2}, {:.2}]",
        start.x, start.y, start.z
    ));
    ui.label(format!("Waypoints: {}", path.waypoints.len()));

    match registry.generation() {
        Some(generation) => ui.label(
            egui::RichText::new(format!(
                "{} scene objects (generation {})",
                registry.live_count(),
                generation.0
            ))
            .small()
            .color(egui::Color32::GRAY),
        ),
        None => ui.label(
            egui::RichText::new("Path not placed yet")
                .small()
                .color(egui::Color32::GRAY),
        ),
    };

    if path.waypoints.is_empty() {
        return;
    }

    ui.collapsing("Waypoints", |ui| {
        for (i, waypoint) in path.waypoints.iter().enumerate() {
            ui.label(
                egui::RichText::new(format!(
                    "{}: [{:.2}, {:.2}, {:.2}]",
                    i + 1,
                    waypoint.x,
                    waypoint.y,
                    waypoint.z
                ))
                .small(),
            );
        }
    });
}
