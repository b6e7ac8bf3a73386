//! Player avatar spawning, load tracking and the per-frame locomotion step.

use std::path::PathBuf;

use bevy::animation::graph::{AnimationGraph, AnimationNodeIndex};
use bevy::asset::RecursiveDependencyLoadState;
use bevy::prelude::*;
use bevy_rapier3d::prelude::*;
use stride_shared::{
    Avatar, AvatarConfig, AvatarGallery, CollisionShape, CollisionSpec, FrameClock, GestureConfig,
    ModelTransform, MovementMode, QueuedPlayback, AVATAR_GALLERY_FILE,
};

use crate::input::{ActionInbox, ControlSettings};
use crate::settings::AvatarSettings;

pub type PlayerAvatar = Avatar<KeyCode, QueuedPlayback>;

/// Marks the avatar driven by this machine's keyboard and joystick.
#[derive(Component)]
pub struct LocalAvatar;

/// Assets backing an avatar entity.
#[derive(Component, Clone)]
pub struct AvatarModel {
    pub scene: Handle<Scene>,
    pub clip: Handle<AnimationClip>,
    pub graph: Handle<AnimationGraph>,
    pub node: AnimationNodeIndex,
    pub frames_per_second: f32,
}

/// The model could not be loaded; the avatar stays inert.
#[derive(Component)]
pub struct ModelLoadFailed;

/// Filesystem location of the asset directory.
#[derive(Resource, Debug, Clone)]
pub struct AssetRoot(pub PathBuf);

/// Avatar poses put +yaw to the right with forward at +Z. Bevy is right-handed, so X flips.
/// The mapping is its own inverse.
pub fn mirror_x(v: Vec3) -> Vec3 {
    Vec3::new(-v.x, v.y, v.z)
}

pub fn yaw_rotation(yaw: f32) -> Quat {
    Quat::from_rotation_y(-yaw)
}

pub fn measure_frame_clock(mut clock: ResMut<FrameClock>) {
    clock.measure();
}

pub fn load_avatar_gallery(mut commands: Commands, root: Res<AssetRoot>) {
    let path = root.0.join(AVATAR_GALLERY_FILE);
    let gallery = match AvatarGallery::from_file(&path) {
        Ok(gallery) => gallery,
        Err(e) => {
            warn!("{}", e);
            AvatarGallery::default()
        }
    };
    commands.insert_resource(gallery);
}

/// Spawn the local avatar from the gallery entry named in [`AvatarSettings`].
pub fn spawn_player_avatar(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    mut graphs: ResMut<Assets<AnimationGraph>>,
    gallery: Res<AvatarGallery>,
    settings: Res<AvatarSettings>,
    controls: Res<ControlSettings>,
    inbox: Res<ActionInbox>,
) {
    let definition = match gallery.get(&settings.avatar) {
        Ok(definition) => definition,
        Err(e) => {
            warn!("Cannot spawn player avatar: {}", e);
            return;
        }
    };

    // Physics bodies rest on the ground by their own height; lift the root and drop the
    // model back down by the same amount.
    let clearance = match settings.movement {
        MovementMode::Physics(spec) => spec.shape.ground_clearance(),
        MovementMode::Kinematic => 0.0,
    };
    let position = settings.spawn_position + Vec3::Y * clearance;

    let config = AvatarConfig::from_definition(definition, controls.key_mapping(&inbox), position)
        .with_movement(settings.movement)
        .with_clip_resolution(settings.clip_resolution)
        .with_gesture(GestureConfig {
            reverse_backward: settings.reverse_backward,
            ..default()
        });
    let avatar = match PlayerAvatar::new(config, QueuedPlayback::default()) {
        Ok(avatar) => avatar,
        Err(e) => {
            warn!("Invalid key mapping for avatar '{}': {}", definition.name, e);
            return;
        }
    };

    let scene: Handle<Scene> = asset_server.load(definition.model_path.clone());
    let clip_path = definition
        .clip_source
        .clone()
        .unwrap_or_else(|| default_clip_path(&definition.model_path));
    let clip: Handle<AnimationClip> = asset_server.load(clip_path);
    let (graph, node) = AnimationGraph::from_clip(clip.clone());
    let graph = graphs.add(graph);

    let model_transform = model_transform(avatar.model_transform(), clearance);
    let spawn_at = mirror_x(position);

    let mut entity = commands.spawn((
        Name::new(format!("Avatar {}", definition.name)),
        LocalAvatar,
        AvatarModel {
            scene: scene.clone(),
            clip,
            graph,
            node,
            frames_per_second: definition.frames_per_second,
        },
        Transform::from_translation(spawn_at),
        Visibility::default(),
    ));
    if let MovementMode::Physics(spec) = avatar.movement_mode() {
        entity.insert(physics_body(&spec));
    }
    entity.insert(avatar);
    entity.with_child((SceneRoot(scene), model_transform));

    info!(
        "Spawned avatar '{}' ({:?} movement)",
        definition.name, settings.movement
    );
}

/// First animation of the model file, e.g. `models/dude.glb#Animation0`.
fn default_clip_path(model_path: &str) -> String {
    let file = model_path.split('#').next().unwrap_or(model_path);
    format!("{file}#Animation0")
}

fn model_transform(transform: &ModelTransform, clearance: f32) -> Transform {
    let [x, y, z] = transform.offset;
    Transform::from_xyz(-x, y - clearance, z)
        .with_rotation(Quat::from_rotation_y(transform.yaw_degrees.to_radians()))
        .with_scale(Vec3::splat(transform.scale))
}

fn physics_body(spec: &CollisionSpec) -> impl Bundle {
    let collider = match spec.shape {
        CollisionShape::Sphere { radius } => Collider::ball(radius),
        CollisionShape::Capsule { radius, half_height } => Collider::capsule_y(half_height, radius),
    };
    (
        RigidBody::KinematicPositionBased,
        collider,
        KinematicCharacterController::default(),
        Friction::coefficient(spec.friction),
        Restitution::coefficient(spec.restitution),
        LockedAxes::ROTATION_LOCKED,
    )
}

/// Mark avatars loaded once their model and clip are in, or give up on failure.
pub fn track_avatar_loading(
    mut commands: Commands,
    asset_server: Res<AssetServer>,
    mut avatars: Query<(Entity, &AvatarModel, &mut PlayerAvatar), Without<ModelLoadFailed>>,
) {
    for (entity, model, mut avatar) in avatars.iter_mut() {
        if avatar.is_loaded() {
            continue;
        }
        let scene = asset_server.get_recursive_dependency_load_state(&model.scene);
        let clip = asset_server.get_recursive_dependency_load_state(&model.clip);
        match (scene, clip) {
            (Some(RecursiveDependencyLoadState::Loaded), Some(RecursiveDependencyLoadState::Loaded)) => {
                avatar.mark_loaded();
            }
            (Some(RecursiveDependencyLoadState::Failed(e)), _)
            | (_, Some(RecursiveDependencyLoadState::Failed(e))) => {
                warn!("Model for avatar '{}' failed to load: {}", avatar.name(), e);
                commands.entity(entity).insert(ModelLoadFailed);
            }
            _ => {}
        }
    }
}

/// Pull positions resolved by the physics engine back into the avatars.
pub fn sync_physics_positions(
    mut avatars: Query<(&mut PlayerAvatar, &Transform), With<KinematicCharacterController>>,
) {
    for (mut avatar, transform) in avatars.iter_mut() {
        if avatar.is_loaded() {
            avatar.sync_position(mirror_x(transform.translation));
        }
    }
}

/// Advance every avatar by the cached frame delta and apply the resulting pose.
pub fn step_avatars(
    clock: Res<FrameClock>,
    mut avatars: Query<(
        &mut PlayerAvatar,
        &mut Transform,
        Option<&mut KinematicCharacterController>,
    )>,
) {
    let frame_delta_ms = clock.cached_delta_ms();

    for (mut avatar, mut transform, controller) in avatars.iter_mut() {
        if avatar.step(frame_delta_ms).is_none() {
            continue;
        }
        let pose = *avatar.pose();
        transform.rotation = yaw_rotation(pose.yaw);

        match controller {
            Some(mut controller) => {
                if let Some(displacement) = avatar.take_velocity() {
                    if displacement != Vec3::ZERO {
                        controller.translation = Some(mirror_x(displacement));
                    }
                }
            }
            None => transform.translation = mirror_x(pose.position),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stride_shared::motion::AvatarPose;

    #[test]
    fn test_pose_forward_matches_transform_forward() {
        for yaw in [0.0, 0.4, -1.2, 2.5] {
            let pose = AvatarPose::new(Vec3::ZERO, yaw);
            let facing = yaw_rotation(yaw) * Vec3::Z;
            assert!((facing - mirror_x(pose.forward())).length() < 1e-5);
        }
    }

    #[test]
    fn test_default_clip_path() {
        assert_eq!(default_clip_path("models/dude.glb#Scene0"), "models/dude.glb#Animation0");
        assert_eq!(default_clip_path("models/dude.glb"), "models/dude.glb#Animation0");
    }
}
