//! Avatar definitions loaded from `avatars.ron`.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::animation::AnimationTable;
use crate::locomotion::MotionTuning;

pub const GALLERY_VERSION: u32 = 1;

fn default_fps() -> f32 {
    30.0
}

fn default_scale() -> f32 {
    1.0
}

/// Placement of the loaded model relative to the avatar root.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelTransform {
    pub scale: f32,
    pub offset: [f32; 3],
    /// Extra yaw applied to the model so its front faces the avatar's forward axis.
    pub yaw_degrees: f32,
}

impl Default for ModelTransform {
    fn default() -> Self {
        Self {
            scale: default_scale(),
            offset: [0.0; 3],
            yaw_degrees: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvatarDefinition {
    pub name: String,
    /// Scene asset path, e.g. `models/knight.glb#Scene0`.
    pub model_path: String,
    /// Animation asset holding every clip as one timeline. Falls back to the model's
    /// first animation when absent.
    #[serde(default)]
    pub clip_source: Option<String>,
    #[serde(default = "default_fps")]
    pub frames_per_second: f32,
    pub animations: AnimationTable,
    #[serde(default)]
    pub tuning: MotionTuning,
    #[serde(default)]
    pub transform: ModelTransform,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvatarGalleryFile {
    pub version: u32,
    pub avatars: Vec<AvatarDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GalleryError {
    Io(String),
    Parse(String),
    UnsupportedVersion { found: u32, expected: u32 },
    DuplicateAvatar(String),
    UnknownAvatar(String),
}

impl fmt::Display for GalleryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GalleryError::Io(e) => write!(f, "failed to read avatar gallery: {e}"),
            GalleryError::Parse(e) => write!(f, "failed to parse avatar gallery: {e}"),
            GalleryError::UnsupportedVersion { found, expected } => {
                write!(f, "unsupported avatar gallery version {found} (expected {expected})")
            }
            GalleryError::DuplicateAvatar(name) => write!(f, "avatar {name:?} is defined twice"),
            GalleryError::UnknownAvatar(name) => write!(f, "no avatar named {name:?}"),
        }
    }
}

impl std::error::Error for GalleryError {}

/// Named avatar definitions.
#[derive(Resource, Debug, Clone, Default)]
pub struct AvatarGallery {
    avatars: BTreeMap<String, AvatarDefinition>,
}

impl AvatarGallery {
    pub fn from_ron_str(text: &str) -> Result<Self, GalleryError> {
        let file: AvatarGalleryFile =
            ron::from_str(text).map_err(|e| GalleryError::Parse(e.to_string()))?;
        if file.version != GALLERY_VERSION {
            return Err(GalleryError::UnsupportedVersion {
                found: file.version,
                expected: GALLERY_VERSION,
            });
        }

        let mut gallery = Self::default();
        for avatar in file.avatars {
            gallery.insert(avatar)?;
        }
        Ok(gallery)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, GalleryError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| GalleryError::Io(format!("{path:?}: {e}")))?;
        let gallery = Self::from_ron_str(&text)?;
        info!("Loaded {} avatar definition(s) from {:?}", gallery.len(), path);
        Ok(gallery)
    }

    pub fn insert(&mut self, avatar: AvatarDefinition) -> Result<(), GalleryError> {
        if self.avatars.contains_key(&avatar.name) {
            return Err(GalleryError::DuplicateAvatar(avatar.name));
        }
        self.avatars.insert(avatar.name.clone(), avatar);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Result<&AvatarDefinition, GalleryError> {
        self.avatars
            .get(name)
            .ok_or_else(|| GalleryError::UnknownAvatar(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.avatars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.avatars.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{ClipId, ClipRange};

    const GALLERY: &str = r#"
(
    version: 1,
    avatars: [
        (
            name: "dude",
            model_path: "models/dude.glb#Scene0",
            animations: {
                Idle: (start_frame: 0, end_frame: 89),
                Run: (start_frame: 90, end_frame: 124),
            },
            tuning: (
                speed_increase_percent: 0.4,
                initial_backward_speed: 0.01,
            ),
            transform: (scale: 0.05, offset: (0.0, -5.2, 0.0)),
        ),
    ],
)
"#;

    #[test]
    fn test_parse_gallery() {
        let gallery = AvatarGallery::from_ron_str(GALLERY).unwrap();
        assert_eq!(gallery.len(), 1);

        let dude = gallery.get("dude").unwrap();
        assert_eq!(dude.animations.get(ClipId::Run), Some(ClipRange::new(90, 124)));
        assert!(!dude.animations.contains(ClipId::Die));
        assert_eq!(dude.frames_per_second, 30.0);
        assert_eq!(dude.clip_source, None);

        // Unlisted tuning values keep their defaults
        assert!((dude.tuning.speed_increase_percent - 0.4).abs() < 1e-6);
        assert!((dude.tuning.initial_backward_speed - 0.01).abs() < 1e-6);
        assert!((dude.tuning.max_forward_speed - 0.1).abs() < 1e-6);
        assert_eq!(dude.transform.offset, [0.0, -5.2, 0.0]);
        assert_eq!(dude.transform.yaw_degrees, 0.0);
    }

    #[test]
    fn test_unknown_avatar_fails_fast() {
        let gallery = AvatarGallery::from_ron_str(GALLERY).unwrap();
        assert_eq!(
            gallery.get("nobody").unwrap_err(),
            GalleryError::UnknownAvatar("nobody".into())
        );
    }

    #[test]
    fn test_rejects_other_versions() {
        let text = GALLERY.replacen("version: 1", "version: 2", 1);
        assert_eq!(
            AvatarGallery::from_ron_str(&text).unwrap_err(),
            GalleryError::UnsupportedVersion {
                found: 2,
                expected: GALLERY_VERSION
            }
        );
        assert!(matches!(
            AvatarGallery::from_ron_str("(version: 1"),
            Err(GalleryError::Parse(_))
        ));
    }

    #[test]
    fn test_shipped_gallery_parses() {
        let gallery =
            AvatarGallery::from_ron_str(include_str!("../../client/assets/avatars.ron")).unwrap();
        let dude = gallery.get(crate::DEFAULT_AVATAR).unwrap();
        assert!(dude.animations.contains(ClipId::Idle));
        assert!(dude.animations.contains(ClipId::Die));

        let knight = gallery.get("knight").unwrap();
        assert!(knight.clip_source.is_some());
        assert_eq!(knight.transform.yaw_degrees, 180.0);
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let mut gallery = AvatarGallery::from_ron_str(GALLERY).unwrap();
        let dude = gallery.get("dude").unwrap().clone();
        assert_eq!(
            gallery.insert(dude),
            Err(GalleryError::DuplicateAvatar("dude".into()))
        );
    }
}
