//! Bevy application setup

use bevy::prelude::*;
use bevy::winit::WinitSettings;
use bevy_egui::EguiPlugin;
use bevy_picking::DefaultPickingPlugins;
use disha_core::{ArConfig, OrderedWaypointPath};
use disha_scene::DishaScenePlugin;

use crate::loader::PathLoaderPlugin;
use crate::scene::ViewerScenePlugin;
use crate::session::ArSessionPlugin;
use crate::ui::UiPlugin;

/// The path the AR view navigates, as last loaded
#[derive(Debug, Clone, Resource, Default)]
pub struct LoadedPath {
    pub path: Option<OrderedWaypointPath>,
    /// URL or file name the path came from
    pub source: Option<String>,
    pub loading: bool,
    pub error: Option<String>,
}

/// Configuration used for every session the viewer starts
#[derive(Debug, Clone, Resource, Default)]
pub struct ViewerConfig(pub ArConfig);

pub fn run() {
    App::new()
        .insert_resource(ClearColor(Color::srgb(0.08, 0.09, 0.12)))
        .insert_resource(WinitSettings::default())
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Disha AR Navigation".to_string(),
                canvas: Some("#disha-canvas".to_string()),
                fit_canvas_to_parent: true,
                prevent_default_event_handling: false,
                ..default()
            }),
            ..default()
        }))
        // Picking must be registered before EguiPlugin so it can detect it
        .add_plugins(DefaultPickingPlugins)
        .add_plugins(EguiPlugin::default())
        .init_resource::<LoadedPath>()
        .init_resource::<ViewerConfig>()
        .add_plugins(DishaScenePlugin)
        .add_plugins(ViewerScenePlugin)
        .add_plugins(PathLoaderPlugin)
        .add_plugins(ArSessionPlugin)
        .add_plugins(UiPlugin)
        .run();
}
