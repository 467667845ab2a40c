//! egui overlay: status, path summary and session controls

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use bevy_egui::{egui, EguiContexts, EguiPrimaryContextPass};
use disha_scene::ui::{render_path_summary, render_status_banner};

use crate::app::LoadedPath;
use crate::loader::{open_path_file, PendingPathLoad};
use crate::session::ArSession;

#[derive(SystemParam)]
pub struct UiParams<'w, 's> {
    pub contexts: EguiContexts<'w, 's>,
    pub session: NonSendMut<'w, ArSession>,
    pub loaded: Res<'w, LoadedPath>,
    pub pending: Res<'w, PendingPathLoad>,
}

pub struct UiPlugin;

impl Plugin for UiPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(EguiPrimaryContextPass, ui_system);
    }
}

fn ui_system(mut params: UiParams) {
    let Ok(ctx) = params.contexts.ctx_mut() else {
        return;
    };

    egui::Window::new("Disha AR")
        .anchor(egui::Align2::LEFT_TOP, egui::vec2(12.0, 12.0))
        .resizable(false)
        .collapsible(true)
        .show(ctx, |ui| {
            render_status_banner(ui, &params.session.status());
            ui.separator();

            if params.loaded.loading {
                ui.label("Loading path...");
            }
            if let Some(error) = &params.loaded.error {
                ui.colored_label(egui::Color32::from_rgb(230, 80, 80), error);
            }

            match params.session.controller() {
                Some(controller) => {
                    if let Some(source) = &params.loaded.source {
                        ui.label(
                            egui::RichText::new(format!("Source: {}", source))
                                .small()
                                .color(egui::Color32::GRAY),
                        );
                    }
                    render_path_summary(ui, controller.path(), controller.registry());
                }
                None if params.loaded.path.is_none() && !params.loaded.loading => {
                    ui.label("Load a path to start navigation");
                }
                None => {}
            }

            ui.separator();
            ui.horizontal(|ui| {
                if ui.button("Load path...").clicked() {
                    open_path_file(&params.pending);
                }
                if params.session.is_running() {
                    if ui.button("Exit AR").clicked() {
                        params.session.request_end();
                    }
                } else if params.loaded.path.is_some() && ui.button("Restart AR").clicked() {
                    params.session.request_restart();
                }
            });
        });
}
