//! Clip selection on top of a frame-range playback capability.
//!
//! The renderer owns actual playback. The director only decides *when* to start a clip
//! or retune its speed, and forwards the renderer's "finished" notification to whoever
//! asked for one.

use std::collections::HashMap;
use std::fmt;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Playback rate used when a caller has no better opinion.
pub const DEFAULT_SPEED_RATIO: f32 = 0.8;

/// The closed set of clips an avatar definition may provide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClipId {
    Idle,
    Walk,
    Run,
    MoveLeft,
    MoveRight,
    Die,
    HitReceived,
    Attack,
}

/// Inclusive frame window of the avatar's source animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClipRange {
    pub start_frame: u32,
    pub end_frame: u32,
}

impl ClipRange {
    pub fn new(start_frame: u32, end_frame: u32) -> Self {
        Self {
            start_frame,
            end_frame,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AnimationTable(HashMap<ClipId, ClipRange>);

impl AnimationTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, clip: ClipId, range: ClipRange) {
        self.0.insert(clip, range);
    }

    pub fn get(&self, clip: ClipId) -> Option<ClipRange> {
        self.0.get(&clip).copied()
    }

    pub fn contains(&self, clip: ClipId) -> bool {
        self.0.contains_key(&clip)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(ClipId, ClipRange)> for AnimationTable {
    fn from_iter<T: IntoIterator<Item = (ClipId, ClipRange)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Identifies one `begin_animation` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaybackHandle(pub u64);

/// The renderer's skeletal playback capability.
pub trait AnimationBackend: Send + Sync + 'static {
    fn begin_animation(&mut self, range: ClipRange, looped: bool, speed_ratio: f32) -> PlaybackHandle;
    fn set_playback_speed(&mut self, handle: PlaybackHandle, speed_ratio: f32);
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PlaybackCommand {
    Begin {
        handle: PlaybackHandle,
        range: ClipRange,
        looped: bool,
        speed_ratio: f32,
    },
    SetSpeed {
        handle: PlaybackHandle,
        speed_ratio: f32,
    },
}

/// Backend that records commands for the engine to apply on its own schedule.
///
/// Only the latest `Begin` and the latest speed change for it are kept, so an
/// avatar without a rig to drain the queue does not accumulate commands.
#[derive(Debug, Default)]
pub struct QueuedPlayback {
    next_handle: u64,
    commands: Vec<PlaybackCommand>,
}

impl QueuedPlayback {
    pub fn pending(&self) -> &[PlaybackCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<PlaybackCommand> {
        std::mem::take(&mut self.commands)
    }
}

impl AnimationBackend for QueuedPlayback {
    fn begin_animation(&mut self, range: ClipRange, looped: bool, speed_ratio: f32) -> PlaybackHandle {
        self.next_handle += 1;
        let handle = PlaybackHandle(self.next_handle);
        // Anything queued before this point targets a superseded playback
        self.commands.clear();
        self.commands.push(PlaybackCommand::Begin {
            handle,
            range,
            looped,
            speed_ratio,
        });
        handle
    }

    fn set_playback_speed(&mut self, handle: PlaybackHandle, speed_ratio: f32) {
        self.commands
            .retain(|c| !matches!(c, PlaybackCommand::SetSpeed { .. }));
        self.commands.push(PlaybackCommand::SetSpeed {
            handle,
            speed_ratio,
        });
    }
}

/// How a request for a clip missing from the table is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClipResolution {
    /// Error out.
    Strict,
    /// Silently ignore the request.
    #[default]
    Lenient,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationError {
    MissingClip(ClipId),
}

impl fmt::Display for AnimationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnimationError::MissingClip(clip) => write!(f, "animation table has no {clip:?} clip"),
        }
    }
}

impl std::error::Error for AnimationError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwitchOutcome {
    Started(PlaybackHandle),
    SpeedUpdated,
    Unchanged,
    Ignored,
}

pub type CompletionCallback = Box<dyn FnOnce() + Send + Sync>;

pub struct AnimationDirector<B> {
    backend: B,
    table: AnimationTable,
    resolution: ClipResolution,
    current: Option<ClipId>,
    speed_ratio: f32,
    playback: Option<PlaybackHandle>,
    on_complete: Option<(PlaybackHandle, CompletionCallback)>,
}

impl<B: AnimationBackend> AnimationDirector<B> {
    pub fn new(backend: B, table: AnimationTable, resolution: ClipResolution) -> Self {
        Self {
            backend,
            table,
            resolution,
            current: None,
            speed_ratio: DEFAULT_SPEED_RATIO,
            playback: None,
            on_complete: None,
        }
    }

    pub fn current_clip(&self) -> Option<ClipId> {
        self.current
    }

    pub fn current_speed_ratio(&self) -> f32 {
        self.speed_ratio
    }

    pub fn current_playback(&self) -> Option<PlaybackHandle> {
        self.playback
    }

    pub fn table(&self) -> &AnimationTable {
        &self.table
    }

    pub fn resolution(&self) -> ClipResolution {
        self.resolution
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn backend_mut(&mut self) -> &mut B {
        &mut self.backend
    }

    /// Start `clip`, or retune it in place when it is already the current clip.
    pub fn switch_to(
        &mut self,
        clip: ClipId,
        speed_ratio: f32,
        looped: bool,
        on_complete: Option<CompletionCallback>,
    ) -> Result<SwitchOutcome, AnimationError> {
        if self.current == Some(clip) {
            if let (Some(handle), Some(callback)) = (self.playback, on_complete) {
                self.on_complete = Some((handle, callback));
            }
            if self.speed_ratio == speed_ratio {
                return Ok(SwitchOutcome::Unchanged);
            }
            self.speed_ratio = speed_ratio;
            if let Some(handle) = self.playback {
                self.backend.set_playback_speed(handle, speed_ratio);
            }
            return Ok(SwitchOutcome::SpeedUpdated);
        }

        let Some(range) = self.table.get(clip) else {
            return match self.resolution {
                ClipResolution::Lenient => Ok(SwitchOutcome::Ignored),
                ClipResolution::Strict => {
                    warn!("Requested clip {:?} is not in the animation table", clip);
                    Err(AnimationError::MissingClip(clip))
                }
            };
        };

        let handle = self.backend.begin_animation(range, looped, speed_ratio);
        self.current = Some(clip);
        self.speed_ratio = speed_ratio;
        self.playback = Some(handle);
        self.on_complete = on_complete.map(|callback| (handle, callback));
        Ok(SwitchOutcome::Started(handle))
    }

    /// Called by the renderer when a non-looping playback reaches its last frame.
    ///
    /// Runs the completion callback registered for `handle`, if any. Returns the clip that
    /// finished when `handle` is still the current playback.
    pub fn playback_finished(&mut self, handle: PlaybackHandle) -> Option<ClipId> {
        if matches!(&self.on_complete, Some((h, _)) if *h == handle) {
            if let Some((_, callback)) = self.on_complete.take() {
                callback();
            }
        }
        if self.playback == Some(handle) {
            self.current
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn table() -> AnimationTable {
        [
            (ClipId::Idle, ClipRange::new(0, 30)),
            (ClipId::Run, ClipRange::new(31, 60)),
            (ClipId::Die, ClipRange::new(61, 90)),
        ]
        .into_iter()
        .collect()
    }

    fn begin_count(director: &AnimationDirector<QueuedPlayback>) -> usize {
        director
            .backend()
            .pending()
            .iter()
            .filter(|c| matches!(c, PlaybackCommand::Begin { .. }))
            .count()
    }

    #[test]
    fn test_same_clip_updates_speed_without_restart() {
        let mut d = AnimationDirector::new(QueuedPlayback::default(), table(), ClipResolution::Lenient);

        let first = d.switch_to(ClipId::Run, 0.8, true, None).unwrap();
        assert!(matches!(first, SwitchOutcome::Started(_)));
        let second = d.switch_to(ClipId::Run, 1.05, true, None).unwrap();
        assert_eq!(second, SwitchOutcome::SpeedUpdated);

        assert_eq!(begin_count(&d), 1);
        assert_eq!(d.current_speed_ratio(), 1.05);
        let last = d.backend().pending().last().copied();
        assert!(matches!(last, Some(PlaybackCommand::SetSpeed { speed_ratio, .. }) if speed_ratio == 1.05));

        assert_eq!(d.switch_to(ClipId::Run, 1.05, true, None).unwrap(), SwitchOutcome::Unchanged);
    }

    #[test]
    fn test_missing_clip_lenient_is_noop() {
        let mut d = AnimationDirector::new(QueuedPlayback::default(), table(), ClipResolution::Lenient);
        d.switch_to(ClipId::Idle, 0.8, true, None).unwrap();

        let outcome = d.switch_to(ClipId::Attack, 0.8, false, None).unwrap();
        assert_eq!(outcome, SwitchOutcome::Ignored);
        assert_eq!(d.current_clip(), Some(ClipId::Idle));
        assert_eq!(begin_count(&d), 1);
    }

    #[test]
    fn test_missing_clip_strict_errors() {
        let mut d = AnimationDirector::new(QueuedPlayback::default(), table(), ClipResolution::Strict);
        let err = d.switch_to(ClipId::Attack, 0.8, false, None).unwrap_err();
        assert_eq!(err, AnimationError::MissingClip(ClipId::Attack));
        assert_eq!(d.current_clip(), None);
    }

    #[test]
    fn test_completion_runs_once_for_its_handle() {
        let mut d = AnimationDirector::new(QueuedPlayback::default(), table(), ClipResolution::Lenient);
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = fired.clone();

        let SwitchOutcome::Started(handle) = d
            .switch_to(
                ClipId::Die,
                0.8,
                false,
                Some(Box::new(move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                })),
            )
            .unwrap()
        else {
            panic!("die clip should start");
        };

        assert_eq!(d.playback_finished(PlaybackHandle(handle.0 + 100)), None);
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        assert_eq!(d.playback_finished(handle), Some(ClipId::Die));
        assert_eq!(d.playback_finished(handle), Some(ClipId::Die));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_queued_commands_drain() {
        let mut d = AnimationDirector::new(QueuedPlayback::default(), table(), ClipResolution::Lenient);
        d.switch_to(ClipId::Idle, 0.8, true, None).unwrap();
        d.switch_to(ClipId::Run, 1.0, true, None).unwrap();

        let commands = d.backend_mut().take_commands();
        assert_eq!(commands.len(), 1);
        assert!(d.backend().pending().is_empty());
        assert!(matches!(
            commands[0],
            PlaybackCommand::Begin { range, looped: true, .. } if range == ClipRange::new(31, 60)
        ));
    }

    #[test]
    fn test_undrained_queue_stays_bounded() {
        let mut d = AnimationDirector::new(QueuedPlayback::default(), table(), ClipResolution::Lenient);
        for i in 0..100 {
            d.switch_to(ClipId::Idle, 0.8, true, None).unwrap();
            d.switch_to(ClipId::Run, 1.0 + i as f32 * 0.01, true, None).unwrap();
            d.switch_to(ClipId::Run, 2.0 + i as f32 * 0.01, true, None).unwrap();
        }

        let pending = d.backend().pending();
        assert_eq!(pending.len(), 2);
        let PlaybackCommand::Begin { handle, range, .. } = pending[0] else {
            panic!("latest begin should lead the queue");
        };
        assert_eq!(range, ClipRange::new(31, 60));
        assert_eq!(Some(handle), d.current_playback());
        assert!(matches!(
            pending[1],
            PlaybackCommand::SetSpeed { handle: h, speed_ratio } if h == handle && (speed_ratio - 2.99).abs() < 1e-4
        ));
    }
}
