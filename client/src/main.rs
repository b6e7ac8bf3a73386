//! Stride client - renders the avatar and feeds it keyboard and joystick input
//!
//! Bevy 0.17 / bevy_rapier3d 0.32

mod camera;
mod input;
mod settings;
mod systems;
mod ui;

use std::path::PathBuf;

use bevy::asset::AssetPlugin;
use bevy::prelude::*;
use bevy::window::WindowResolution;
use bevy_rapier3d::prelude::*;
use stride_shared::FrameClock;

use settings::AvatarSettings;

/// Get the asset path - for bundled macOS apps, use path relative to executable
fn get_asset_path() -> PathBuf {
    // Try to find assets relative to executable (for .app bundles)
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            let bundled_assets = exe_dir.join("assets");
            if bundled_assets.exists() {
                return bundled_assets;
            }
        }
    }
    // Fall back to the crate's assets folder (for development)
    let manifest_assets = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("assets");
    if manifest_assets.exists() {
        return manifest_assets;
    }
    PathBuf::from("assets")
}

fn main() {
    let asset_path = get_asset_path();

    let mut app = App::new();

    app.add_plugins(
        DefaultPlugins
            .set(WindowPlugin {
                primary_window: Some(Window {
                    title: "Stride".to_string(),
                    resolution: WindowResolution::new(1280, 720),
                    ..default()
                }),
                ..default()
            })
            .set(AssetPlugin {
                file_path: asset_path.to_string_lossy().to_string(),
                ..default()
            }),
    );
    app.add_plugins(RapierPhysicsPlugin::<NoUserData>::default());

    app.add_plugins(ui::HudPlugin);
    app.add_plugins(ui::JoystickOverlayPlugin);

    // Settings and input state
    app.insert_resource(AvatarSettings::from_env());
    app.insert_resource(systems::AssetRoot(asset_path));
    app.init_resource::<input::ControlSettings>();
    app.init_resource::<input::ActionInbox>();
    app.init_resource::<input::JoystickState>();
    app.init_resource::<FrameClock>();
    app.add_message::<input::DirectionalEventMessage>();

    // Measure the frame delta once, before anything reads it
    app.add_systems(First, systems::measure_frame_clock);

    app.add_systems(
        Startup,
        (
            systems::spawn_world,
            systems::load_avatar_gallery,
            systems::spawn_player_avatar,
        )
            .chain(),
    );

    // Model loading and rig hookup
    app.add_systems(
        Update,
        (systems::track_avatar_loading, systems::attach_avatar_rigs),
    );

    // ORDER MATTERS: input mutates intents -> physics writes back -> step -> playback -> camera.
    app.add_systems(
        Update,
        (
            input::handle_keyboard_input,
            input::handle_joystick_input,
            input::apply_avatar_actions,
            input::handle_lifecycle_keys,
            systems::sync_physics_positions,
            systems::step_avatars,
            systems::drive_avatar_animation,
            camera::update_camera,
        )
            .chain()
            .after(systems::track_avatar_loading),
    );

    info!("Starting Stride client");
    app.run();
}
