//! Third-person follow camera

use bevy::prelude::*;

use crate::systems::LocalAvatar;

/// Distance from the pivot to the camera
const FOLLOW_DISTANCE: f32 = 7.0;
/// Height of the pivot above the avatar root
const PIVOT_HEIGHT: f32 = 1.2;
/// Orbit angle above the horizon, radians
const FOLLOW_PITCH: f32 = 0.35;

/// Keep the camera behind the local avatar.
pub fn update_camera(
    avatars: Query<&Transform, (With<LocalAvatar>, Without<Camera3d>)>,
    mut camera_query: Query<&mut Transform, (With<Camera3d>, Without<LocalAvatar>)>,
    time: Res<Time>,
) {
    let Some(avatar_transform) = avatars.iter().next() else {
        return;
    };
    let Ok(mut camera_transform) = camera_query.single_mut() else {
        return;
    };

    // Mild smoothing so turning doesn't snap the view
    let cam_rate: f32 = 6.0;
    let cam_t = 1.0_f32 - (-cam_rate * time.delta_secs()).exp();

    let pivot = avatar_transform.translation + Vec3::Y * PIVOT_HEIGHT;
    let behind = -(avatar_transform.rotation * Vec3::Z);
    let target_pos = orbit_position(pivot, behind, FOLLOW_PITCH, FOLLOW_DISTANCE);
    let target_rot = look_at_level(target_pos, pivot);

    camera_transform.translation = camera_transform.translation.lerp(target_pos, cam_t);
    camera_transform.rotation = camera_transform.rotation.slerp(target_rot, cam_t);
}

/// Camera position on a sphere around `pivot`, `pitch` radians above the `behind` direction.
fn orbit_position(pivot: Vec3, behind: Vec3, pitch: f32, distance: f32) -> Vec3 {
    let horizontal = Vec3::new(behind.x, 0.0, behind.z).normalize_or_zero();
    pivot + horizontal * distance * pitch.cos() + Vec3::Y * distance * pitch.sin()
}

/// Rotation looking at `target` without roll
fn look_at_level(eye: Vec3, target: Vec3) -> Quat {
    Transform::from_translation(eye).looking_at(target, Vec3::Y).rotation
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orbit_sits_behind_and_above() {
        let pos = orbit_position(Vec3::ZERO, -Vec3::Z, 0.0, 5.0);
        assert!((pos - Vec3::new(0.0, 0.0, -5.0)).length() < 1e-5);

        let raised = orbit_position(Vec3::ZERO, -Vec3::Z, FOLLOW_PITCH, FOLLOW_DISTANCE);
        assert!(raised.y > 0.0);
        assert!(raised.z < 0.0);
        assert!((raised.length() - FOLLOW_DISTANCE).abs() < 1e-4);
    }
}
