//! Startup settings for the local avatar.

use bevy::prelude::*;
use stride_shared::{ClipResolution, CollisionSpec, MovementMode, DEFAULT_AVATAR};

/// Which avatar to spawn and how it moves.
#[derive(Resource, Debug, Clone)]
pub struct AvatarSettings {
    pub avatar: String,
    pub movement: MovementMode,
    pub clip_resolution: ClipResolution,
    pub spawn_position: Vec3,
    /// Mirror lateral steering while the stick points backwards.
    pub reverse_backward: bool,
}

impl Default for AvatarSettings {
    fn default() -> Self {
        Self {
            avatar: DEFAULT_AVATAR.to_string(),
            movement: MovementMode::Kinematic,
            clip_resolution: ClipResolution::Lenient,
            spawn_position: Vec3::ZERO,
            reverse_backward: false,
        }
    }
}

impl AvatarSettings {
    /// Defaults overridden by `STRIDE_*` environment variables.
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    pub fn from_vars(var: impl Fn(&str) -> Option<String>) -> Self {
        let mut settings = Self::default();

        if let Some(name) = var("STRIDE_AVATAR").filter(|n| !n.trim().is_empty()) {
            settings.avatar = name.trim().to_string();
        }
        if let Some(mode) = var("STRIDE_MOVEMENT") {
            match mode.trim().to_ascii_lowercase().as_str() {
                "physics" => settings.movement = MovementMode::Physics(CollisionSpec::default()),
                "kinematic" | "" => {}
                other => warn!("Unknown STRIDE_MOVEMENT '{}', using kinematic movement", other),
            }
        }
        if var("STRIDE_STRICT_CLIPS").is_some_and(|v| is_truthy(&v)) {
            settings.clip_resolution = ClipResolution::Strict;
        }
        if var("STRIDE_REVERSE_BACKWARD").is_some_and(|v| is_truthy(&v)) {
            settings.reverse_backward = true;
        }

        settings
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings_with(vars: &[(&str, &str)]) -> AvatarSettings {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AvatarSettings::from_vars(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults_without_overrides() {
        let s = settings_with(&[]);
        assert_eq!(s.avatar, DEFAULT_AVATAR);
        assert_eq!(s.movement, MovementMode::Kinematic);
        assert_eq!(s.clip_resolution, ClipResolution::Lenient);
        assert!(!s.reverse_backward);
    }

    #[test]
    fn test_env_overrides() {
        let s = settings_with(&[
            ("STRIDE_MOVEMENT", "Physics"),
            ("STRIDE_STRICT_CLIPS", "1"),
            ("STRIDE_AVATAR", "knight"),
            ("STRIDE_REVERSE_BACKWARD", "yes"),
        ]);
        assert!(matches!(s.movement, MovementMode::Physics(_)));
        assert_eq!(s.clip_resolution, ClipResolution::Strict);
        assert_eq!(s.avatar, "knight");
        assert!(s.reverse_backward);

        let s = settings_with(&[("STRIDE_STRICT_CLIPS", "0"), ("STRIDE_MOVEMENT", "hover")]);
        assert_eq!(s.clip_resolution, ClipResolution::Lenient);
        assert_eq!(s.movement, MovementMode::Kinematic);
    }
}
