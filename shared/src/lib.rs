//! Engine-agnostic avatar locomotion: input intents, the joystick gesture mapper, the speed
//! ramp and clip selection. The client wires these into Bevy systems.

pub mod animation;
pub mod avatar;
pub mod clock;
pub mod gallery;
pub mod gesture;
pub mod intent;
pub mod keys;
pub mod locomotion;
pub mod motion;

pub use animation::{
    AnimationBackend, AnimationDirector, AnimationError, AnimationTable, ClipId, ClipRange,
    ClipResolution, PlaybackCommand, PlaybackHandle, QueuedPlayback, SwitchOutcome,
};
pub use avatar::{Avatar, AvatarConfig};
pub use clock::FrameClock;
pub use gallery::{AvatarDefinition, AvatarGallery, GalleryError, ModelTransform};
pub use gesture::{GestureConfig, GestureMapper, JoystickGesture};
pub use intent::{Direction, DirectionalEvent, DirectionalEventKind, DirectionalIntentSet};
pub use keys::{KeyCodeLike, KeyMapping, KeyMappingError};
pub use locomotion::{LocomotionController, MotionPhase, MotionTuning, StepReport};
pub use motion::{AvatarPose, CollisionShape, CollisionSpec, MovementMode};

/// File name of the avatar gallery inside the asset directory.
pub const AVATAR_GALLERY_FILE: &str = "avatars.ron";

/// Avatar spawned for the local player when nothing else is requested.
pub const DEFAULT_AVATAR: &str = "dude";
