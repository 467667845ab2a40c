//! Viewer scene - camera, lights, ground plane and orbit controls
//!
//! Render space is Y-up. The ground plane at y = 0 is the surface the
//! simulated platform hit-tests against.

use bevy::input::mouse::{AccumulatedMouseMotion, AccumulatedMouseScroll};
use bevy::prelude::*;
use bevy_egui::EguiContexts;

/// Height of the simulated floor
pub const GROUND_Y: f32 = 0.0;

/// Orbit camera state
#[derive(Debug, Clone, Resource)]
pub struct CameraSettings {
    pub distance: f32,
    pub target_distance: f32,
    pub azimuth: f32,
    pub elevation: f32,
    pub target: Vec3,
    pub sensitivity: f32,
    pub zoom_speed: f32,
    pub smooth_factor: f32,
}

impl Default for CameraSettings {
    fn default() -> Self {
        Self {
            distance: 1.6,
            target_distance: 1.6,
            azimuth: 0.6,
            elevation: 0.7,
            target: Vec3::ZERO,
            sensitivity: 0.005,
            zoom_speed: 0.1,
            smooth_factor: 0.15,
        }
    }
}

impl CameraSettings {
    /// Camera position on the orbit sphere around `target`
    pub fn eye(&self) -> Vec3 {
        let horizontal = self.distance * self.elevation.cos();
        self.target
            + Vec3::new(
                horizontal * self.azimuth.sin(),
                self.distance * self.elevation.sin(),
                horizontal * self.azimuth.cos(),
            )
    }
}

/// Marker component for the main camera
#[derive(Component)]
pub struct MainCamera;

/// Marker component for the simulated floor
#[derive(Component)]
pub struct GroundPlane;

pub struct ViewerScenePlugin;

impl Plugin for ViewerScenePlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<CameraSettings>()
            .add_systems(Startup, setup_scene)
            .add_systems(Update, update_camera);
    }
}

fn setup_scene(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
    settings: Res<CameraSettings>,
) {
    commands.spawn((
        Camera3d::default(),
        Projection::Perspective(PerspectiveProjection {
            near: 0.01,
            far: 100.0,
            ..default()
        }),
        Transform::from_translation(settings.eye()).looking_at(settings.target, Vec3::Y),
        // Sky/ground fill, close to a hemisphere light
        AmbientLight {
            color: Color::srgb(0.9, 0.95, 1.0),
            brightness: 400.0,
            ..default()
        },
        MainCamera,
    ));

    commands.spawn((
        DirectionalLight {
            illuminance: 4000.0,
            shadows_enabled: false,
            ..default()
        },
        Transform::from_xyz(1.0, 3.0, 2.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    commands.spawn((
        Mesh3d(meshes.add(Plane3d::default().mesh().size(6.0, 6.0))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb(0.25, 0.27, 0.3),
            perceptual_roughness: 0.9,
            ..default()
        })),
        Transform::from_xyz(0.0, GROUND_Y, 0.0),
        GroundPlane,
    ));
}

fn update_camera(
    mut camera_query: Query<&mut Transform, With<MainCamera>>,
    mut settings: ResMut<CameraSettings>,
    mouse_motion: Res<AccumulatedMouseMotion>,
    mouse_scroll: Res<AccumulatedMouseScroll>,
    mouse_button: Res<ButtonInput<MouseButton>>,
    touch_input: Res<Touches>,
    mut contexts: EguiContexts,
) {
    // Leave the pointer to egui when it is over a panel
    let egui_wants_pointer = contexts
        .ctx_mut()
        .map(|ctx| ctx.wants_pointer_input())
        .unwrap_or(false);

    if !egui_wants_pointer {
        let mut delta = Vec2::ZERO;
        if mouse_button.pressed(MouseButton::Left) {
            delta += mouse_motion.delta;
        }
        if touch_input.iter().count() == 1 {
            for touch in touch_input.iter() {
                delta += touch.delta();
            }
        }
        settings.azimuth -= delta.x * settings.sensitivity;
        settings.elevation =
            (settings.elevation + delta.y * settings.sensitivity).clamp(0.05, 1.5);

        if mouse_scroll.delta.y != 0.0 {
            let zoom_factor = 1.0 - mouse_scroll.delta.y * settings.zoom_speed * 0.3;
            settings.target_distance = (settings.target_distance * zoom_factor).clamp(0.3, 8.0);
        }
    }

    let smooth = settings.smooth_factor;
    settings.distance += (settings.target_distance - settings.distance) * smooth;

    let Ok(mut transform) = camera_query.single_mut() else {
        return;
    };
    *transform = Transform::from_translation(settings.eye()).looking_at(settings.target, Vec3::Y);
}
