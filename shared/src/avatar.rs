//! The player avatar: input sources, locomotion and clip selection bundled per entity.

use bevy::prelude::*;

use crate::animation::{
    AnimationBackend, AnimationDirector, AnimationError, AnimationTable, ClipId, ClipResolution,
    CompletionCallback, PlaybackHandle, QueuedPlayback, SwitchOutcome,
};
use crate::gallery::{AvatarDefinition, ModelTransform};
use crate::gesture::{GestureConfig, GestureMapper};
use crate::intent::{DirectionalEvent, DirectionalIntentSet};
use crate::keys::{KeyCodeLike, KeyIntentTracker, KeyMapping, KeyMappingError};
use crate::locomotion::{LocomotionController, MotionPhase, MotionTuning, StepReport};
use crate::motion::{backend_for, AvatarPose, MotionBackend, MovementMode};

/// Everything needed to build an [`Avatar`].
pub struct AvatarConfig<K> {
    pub name: String,
    pub keys: KeyMapping<K>,
    pub gesture: GestureConfig,
    pub animations: AnimationTable,
    pub tuning: MotionTuning,
    pub transform: ModelTransform,
    pub movement: MovementMode,
    pub clip_resolution: ClipResolution,
    pub initial_position: Vec3,
    pub initial_yaw: f32,
}

impl<K: KeyCodeLike> AvatarConfig<K> {
    pub fn from_definition(definition: &AvatarDefinition, keys: KeyMapping<K>, position: Vec3) -> Self {
        Self {
            name: definition.name.clone(),
            keys,
            gesture: GestureConfig::default(),
            animations: definition.animations.clone(),
            tuning: definition.tuning,
            transform: definition.transform,
            movement: MovementMode::default(),
            clip_resolution: ClipResolution::default(),
            initial_position: position,
            initial_yaw: 0.0,
        }
    }

    pub fn with_movement(mut self, movement: MovementMode) -> Self {
        self.movement = movement;
        self
    }

    pub fn with_clip_resolution(mut self, resolution: ClipResolution) -> Self {
        self.clip_resolution = resolution;
        self
    }

    pub fn with_gesture(mut self, gesture: GestureConfig) -> Self {
        self.gesture = gesture;
        self
    }
}

#[derive(Component)]
pub struct Avatar<K: KeyCodeLike, B: AnimationBackend = QueuedPlayback> {
    name: String,
    keys: KeyIntentTracker<K>,
    gesture: GestureMapper,
    /// Intents held by the on-screen stick or other pointer sources.
    pointer_intents: DirectionalIntentSet,
    locomotion: LocomotionController,
    director: AnimationDirector<B>,
    motion: Box<dyn MotionBackend>,
    transform: ModelTransform,
    pose: AvatarPose,
    initial_position: Vec3,
    loaded: bool,
    destroyed: bool,
    /// Non-looping clip (attack, hit) that currently overrides the resting clip.
    one_shot: Option<PlaybackHandle>,
}

impl<K: KeyCodeLike, B: AnimationBackend> Avatar<K, B> {
    pub fn new(config: AvatarConfig<K>, backend: B) -> Result<Self, KeyMappingError> {
        let keys = KeyIntentTracker::new(config.keys)?;
        Ok(Self {
            name: config.name,
            keys,
            gesture: GestureMapper::new(config.gesture),
            pointer_intents: DirectionalIntentSet::default(),
            locomotion: LocomotionController::new(config.tuning),
            director: AnimationDirector::new(backend, config.animations, config.clip_resolution),
            motion: backend_for(config.movement),
            transform: config.transform,
            pose: AvatarPose::new(config.initial_position, config.initial_yaw),
            initial_position: config.initial_position,
            loaded: false,
            destroyed: false,
            one_shot: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn model_transform(&self) -> &ModelTransform {
        &self.transform
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// The model finished loading: start simulating and play the idle clip.
    /// A death clip queued by an earlier kill keeps playing.
    pub fn mark_loaded(&mut self) {
        if self.loaded || self.destroyed {
            return;
        }
        self.loaded = true;
        self.pose.position = self.initial_position;
        info!("Avatar '{}' loaded at {:?}", self.name, self.initial_position);
        if self.locomotion.is_killed() {
            return;
        }
        let speed = self.locomotion.tuning().animation_speed;
        self.play(ClipId::Idle, speed, true);
    }

    fn accepts_input(&self) -> bool {
        self.loaded && !self.destroyed && !self.locomotion.is_killed()
    }

    pub fn key_down(&mut self, key: K) {
        if !self.accepts_input() {
            return;
        }
        if let Some(clip) = self.keys.key_down(key) {
            let speed = match clip {
                ClipId::Run => self.locomotion.speed_ratio(),
                _ => self.locomotion.tuning().animation_speed,
            };
            self.play(clip, speed, true);
        }
    }

    pub fn key_up(&mut self, key: K) {
        // Forget the key even while input is gated so it cannot get stuck.
        let requested = self.keys.key_up(key);
        if !self.accepts_input() || !self.keys.is_movement_key(key) {
            return;
        }
        let intents = self.intents();
        if intents.fore_aft_active() || self.one_shot.is_some() {
            return;
        }
        let clip = requested.unwrap_or_else(|| resting_clip(&intents));
        let speed = self.locomotion.tuning().animation_speed;
        self.play(clip, speed, true);
    }

    /// Returns `true` if an alternate binding fired.
    pub fn key_press(&mut self, key: K) -> bool {
        if !self.accepts_input() {
            return false;
        }
        self.keys.key_press(key)
    }

    /// Feed one stick reading. The returned events are meant for the UI.
    pub fn handle_gesture_sample(&mut self, angle_degrees: f32, distance_ratio: f32) -> Vec<DirectionalEvent> {
        if !self.accepts_input() {
            return Vec::new();
        }
        let events = self.gesture.sample(angle_degrees, distance_ratio);
        for event in &events {
            self.pointer_intents.apply(event);
        }
        events
    }

    /// The stick was let go.
    pub fn release_gesture(&mut self) -> Vec<DirectionalEvent> {
        let events = self.gesture.clear();
        for event in &events {
            self.pointer_intents.apply(event);
        }
        events
    }

    pub fn apply_directional_event(&mut self, event: &DirectionalEvent) {
        if !self.accepts_input() {
            return;
        }
        self.pointer_intents.apply(event);
    }

    /// Snapshot of every input source combined.
    pub fn intents(&self) -> DirectionalIntentSet {
        self.keys.intents().merged(&self.pointer_intents)
    }

    /// Advance one frame. `None` until the model is loaded, or after destruction.
    pub fn step(&mut self, frame_delta_ms: f32) -> Option<StepReport> {
        if !self.loaded || self.destroyed {
            return None;
        }
        let intents = self.intents();
        let report = self
            .locomotion
            .step(&intents, frame_delta_ms, &mut self.pose, self.motion.as_mut());

        match report.phase {
            MotionPhase::Killed => {}
            MotionPhase::Accelerating(_) | MotionPhase::Cruising(_) => {
                self.one_shot = None;
                self.play(ClipId::Run, report.speed_ratio, true);
            }
            MotionPhase::Idle | MotionPhase::Decelerating => {
                if self.one_shot.is_none() {
                    let speed = self.locomotion.tuning().animation_speed;
                    self.play(resting_clip(&intents), speed, true);
                }
            }
        }
        Some(report)
    }

    /// Play a non-looping clip, then fall back to whatever the avatar is doing.
    pub fn play_one_shot(&mut self, clip: ClipId) -> Result<bool, AnimationError> {
        if !self.accepts_input() {
            return Ok(false);
        }
        let speed = self.locomotion.tuning().animation_speed;
        match self.director.switch_to(clip, speed, false, None)? {
            SwitchOutcome::Started(handle) => {
                self.one_shot = Some(handle);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Called when a non-looping playback reached its end.
    pub fn playback_finished(&mut self, handle: PlaybackHandle) -> Option<ClipId> {
        let finished = self.director.playback_finished(handle);
        if self.one_shot == Some(handle) {
            self.one_shot = None;
            if self.accepts_input() {
                let intents = self.intents();
                if intents.fore_aft_active() {
                    let ratio = self.locomotion.speed_ratio();
                    self.play(ClipId::Run, ratio, true);
                } else {
                    let speed = self.locomotion.tuning().animation_speed;
                    self.play(resting_clip(&intents), speed, true);
                }
            }
        }
        finished
    }

    /// Freeze the avatar and play its death clip. Only the first call has any effect.
    pub fn kill(&mut self, on_complete: Option<CompletionCallback>) -> bool {
        if self.destroyed || !self.locomotion.kill() {
            return false;
        }
        info!("Avatar '{}' killed", self.name);
        self.one_shot = None;

        if self.director.table().contains(ClipId::Die) {
            let speed = self.locomotion.tuning().animation_speed;
            if let Err(e) = self.director.switch_to(ClipId::Die, speed, false, on_complete) {
                warn!("Avatar '{}' could not play its death clip: {}", self.name, e);
            }
        } else {
            if self.director.resolution() == ClipResolution::Strict {
                warn!("Avatar '{}' has no {:?} clip", self.name, ClipId::Die);
            }
            // Nothing to wait for
            if let Some(callback) = on_complete {
                callback();
            }
        }
        true
    }

    pub fn is_killed(&self) -> bool {
        self.locomotion.is_killed()
    }

    /// Release input state. Safe to call on a killed avatar; later calls are no-ops.
    pub fn destroy(&mut self) -> bool {
        if self.destroyed {
            return false;
        }
        self.destroyed = true;
        self.keys.release_all();
        self.gesture.clear();
        self.pointer_intents.clear_all();
        self.one_shot = None;
        info!("Avatar '{}' destroyed", self.name);
        true
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    /// Current position, or the pending spawn point on the ground before the model is loaded.
    pub fn position(&self) -> Vec3 {
        if self.loaded {
            self.pose.position
        } else {
            Vec3::new(self.initial_position.x, 0.0, self.initial_position.z)
        }
    }

    /// Position resolved by the physics engine.
    pub fn sync_position(&mut self, position: Vec3) {
        self.pose.position = position;
    }

    pub fn take_velocity(&mut self) -> Option<Vec3> {
        self.motion.take_velocity()
    }

    pub fn pose(&self) -> &AvatarPose {
        &self.pose
    }

    pub fn movement_mode(&self) -> MovementMode {
        self.motion.mode()
    }

    pub fn locomotion(&self) -> &LocomotionController {
        &self.locomotion
    }

    pub fn director(&self) -> &AnimationDirector<B> {
        &self.director
    }

    pub fn director_mut(&mut self) -> &mut AnimationDirector<B> {
        &mut self.director
    }

    fn play(&mut self, clip: ClipId, speed_ratio: f32, looped: bool) {
        match self.director.switch_to(clip, speed_ratio, looped, None) {
            Ok(SwitchOutcome::Started(_)) => {
                if looped {
                    self.one_shot = None;
                }
            }
            Ok(_) => {}
            Err(e) => warn!("Avatar '{}': {}", self.name, e),
        }
    }
}

/// Clip to show when not moving fore/aft.
fn resting_clip(intents: &DirectionalIntentSet) -> ClipId {
    if intents.left.active {
        ClipId::MoveLeft
    } else if intents.right.active {
        ClipId::MoveRight
    } else {
        ClipId::Idle
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{ClipRange, PlaybackCommand};
    use crate::intent::Direction;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const W: u32 = 87;
    const S: u32 = 83;
    const A: u32 = 65;
    const D: u32 = 68;

    fn table() -> AnimationTable {
        [
            (ClipId::Idle, ClipRange::new(0, 89)),
            (ClipId::Run, ClipRange::new(90, 124)),
            (ClipId::MoveLeft, ClipRange::new(125, 150)),
            (ClipId::MoveRight, ClipRange::new(151, 176)),
            (ClipId::Attack, ClipRange::new(177, 200)),
            (ClipId::Die, ClipRange::new(201, 260)),
        ]
        .into_iter()
        .collect()
    }

    const SPACE: u32 = 32;

    fn avatar() -> Avatar<u32> {
        avatar_with_keys(KeyMapping::new(W, S, A, D))
    }

    fn avatar_with_keys(keys: KeyMapping<u32>) -> Avatar<u32> {
        let config = AvatarConfig {
            name: "dude".into(),
            keys,
            gesture: GestureConfig::default(),
            animations: table(),
            tuning: MotionTuning::default(),
            transform: ModelTransform::default(),
            movement: MovementMode::Kinematic,
            clip_resolution: ClipResolution::Lenient,
            initial_position: Vec3::new(3.0, 2.0, -4.0),
            initial_yaw: 0.0,
        };
        Avatar::new(config, QueuedPlayback::default()).unwrap()
    }

    fn starts_of(a: &Avatar<u32>, range: ClipRange) -> usize {
        a.director()
            .backend()
            .pending()
            .iter()
            .filter(|c| matches!(c, PlaybackCommand::Begin { range: r, .. } if *r == range))
            .count()
    }

    #[test]
    fn test_pending_position_before_load() {
        let mut a = avatar();
        assert_eq!(a.position(), Vec3::new(3.0, 0.0, -4.0));

        a.key_down(W);
        assert!(!a.intents().any_active());
        assert!(a.step(16.0).is_none());

        a.mark_loaded();
        assert_eq!(a.position(), Vec3::new(3.0, 2.0, -4.0));
        assert_eq!(a.director().current_clip(), Some(ClipId::Idle));
    }

    #[test]
    fn test_walking_never_restarts_run() {
        let mut a = avatar();
        a.mark_loaded();
        a.key_down(W);
        for _ in 0..10 {
            a.step(16.0);
        }

        assert_eq!(a.director().current_clip(), Some(ClipId::Run));
        assert_eq!(starts_of(&a, ClipRange::new(90, 124)), 1);
        assert!(a.director().current_speed_ratio() > 1.0);
        assert!(a.position().z > -4.0);
    }

    #[test]
    fn test_key_up_idles_only_when_nothing_held() {
        let mut a = avatar();
        a.mark_loaded();
        a.key_down(W);
        a.key_down(A);
        a.step(16.0);

        a.key_up(W);
        assert_eq!(a.director().current_clip(), Some(ClipId::MoveLeft));
        a.key_up(A);
        assert_eq!(a.director().current_clip(), Some(ClipId::Idle));
    }

    #[test]
    fn test_kill_is_idempotent_and_destroy_is_safe() {
        let mut a = avatar();
        a.mark_loaded();
        assert!(a.kill(None));
        assert!(!a.kill(None));
        assert!(a.is_killed());
        assert_eq!(starts_of(&a, ClipRange::new(201, 260)), 1);

        assert!(a.destroy());
        assert!(!a.destroy());
        assert!(a.is_killed());
        assert!(a.step(16.0).is_none());
    }

    #[test]
    fn test_kill_mid_walk() {
        let mut a = avatar();
        a.mark_loaded();
        a.key_down(W);
        a.step(16.0);
        a.step(16.0);

        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();
        assert!(a.kill(Some(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }))));

        let frozen = a.position();
        let report = a.step(16.0).unwrap();
        assert_eq!(report.phase, MotionPhase::Killed);
        assert_eq!(a.position(), frozen);

        let last = a.director().backend().pending().last().copied();
        assert!(matches!(last, Some(PlaybackCommand::Begin { looped: false, .. })));
        assert_eq!(a.director().current_clip(), Some(ClipId::Die));

        // Input is ignored once killed
        a.key_down(D);
        assert!(!a.intents().is_active(Direction::Right));

        let handle = a.director().current_playback().unwrap();
        a.playback_finished(handle);
        a.playback_finished(handle);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_one_shot_returns_to_resting_clip() {
        let mut a = avatar();
        a.mark_loaded();
        assert!(a.play_one_shot(ClipId::Attack).unwrap());
        a.step(16.0);
        assert_eq!(a.director().current_clip(), Some(ClipId::Attack));

        let handle = a.director().current_playback().unwrap();
        assert_eq!(a.playback_finished(handle), Some(ClipId::Attack));
        assert_eq!(a.director().current_clip(), Some(ClipId::Idle));

        // Missing clips are ignored in lenient mode
        assert!(!a.play_one_shot(ClipId::HitReceived).unwrap());
    }

    #[test]
    fn test_gesture_drives_locomotion() {
        let mut a = avatar();
        a.mark_loaded();
        let events = a.handle_gesture_sample(90.0, 1.0);
        assert_eq!(events, vec![DirectionalEvent::start(Direction::Forward, 1.0)]);

        a.step(20.0);
        assert_eq!(a.director().current_clip(), Some(ClipId::Run));

        let released = a.release_gesture();
        assert_eq!(released, vec![DirectionalEvent::end(Direction::Forward)]);
        let report = a.step(20.0).unwrap();
        assert_eq!(report.phase, MotionPhase::Decelerating);
        assert_eq!(a.director().current_clip(), Some(ClipId::Idle));
    }

    fn counter() -> (Arc<AtomicUsize>, Arc<AtomicUsize>) {
        let fired = Arc::new(AtomicUsize::new(0));
        (fired.clone(), fired)
    }

    #[test]
    fn test_kill_before_load_keeps_death_clip() {
        let mut a = avatar();
        let (fired, count) = counter();
        assert!(a.kill(Some(Box::new(move || {
            count.fetch_add(1, Ordering::SeqCst);
        }))));
        let death = a.director().current_playback().unwrap();

        a.mark_loaded();
        assert_eq!(a.director().current_clip(), Some(ClipId::Die));
        assert_eq!(a.director().current_playback(), Some(death));
        assert_eq!(starts_of(&a, ClipRange::new(0, 89)), 0);

        let report = a.step(16.0).unwrap();
        assert_eq!(report.phase, MotionPhase::Killed);
        assert_eq!(a.director().current_clip(), Some(ClipId::Die));

        a.playback_finished(death);
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_alternate_binding_gated_by_load_and_kill() {
        let (fired, count) = counter();
        let keys = KeyMapping::new(W, S, A, D).with_alternate(SPACE, move || {
            count.fetch_add(1, Ordering::SeqCst);
        });
        let mut a = avatar_with_keys(keys);

        assert!(!a.key_press(SPACE));
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        a.mark_loaded();
        assert!(a.key_press(SPACE));
        assert!(!a.key_press(W));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        a.key_up(SPACE);

        a.kill(None);
        assert!(!a.key_press(SPACE));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_directional_events_from_other_sources() {
        let mut a = avatar();
        a.apply_directional_event(&DirectionalEvent::start(Direction::Left, 0.5));
        assert!(!a.intents().any_active());

        a.mark_loaded();
        a.apply_directional_event(&DirectionalEvent::start(Direction::Left, 0.5));
        assert!(a.intents().is_active(Direction::Left));
        assert_eq!(a.intents().power(Direction::Left), 0.5);
        a.step(16.0);
        assert_eq!(a.director().current_clip(), Some(ClipId::MoveLeft));

        a.apply_directional_event(&DirectionalEvent::end(Direction::Left));
        assert!(!a.intents().any_active());

        a.kill(None);
        a.apply_directional_event(&DirectionalEvent::start(Direction::Forward, 1.0));
        assert!(!a.intents().any_active());
    }
}
