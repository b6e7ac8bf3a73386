//! Clip playback on the avatar rig.
//!
//! Every clip of an avatar is a frame window of one animation timeline. The director's
//! queued commands are turned into seeks on a single `AnimationPlayer` node, and this module
//! keeps the playhead inside the active window: looping windows rewind, one-shot windows
//! pause on their last frame and report back to the avatar.

use bevy::animation::graph::{AnimationGraphHandle, AnimationNodeIndex};
use bevy::animation::RepeatAnimation;
use bevy::prelude::*;
use stride_shared::{ClipRange, PlaybackCommand, PlaybackHandle};

use super::avatar::{AvatarModel, PlayerAvatar};

/// The seconds range of the clip currently playing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipWindow {
    pub handle: PlaybackHandle,
    pub start: f32,
    pub end: f32,
    pub looped: bool,
}

impl ClipWindow {
    pub fn new(handle: PlaybackHandle, range: ClipRange, looped: bool, frames_per_second: f32) -> Self {
        let fps = if frames_per_second > 0.0 { frames_per_second } else { 30.0 };
        Self {
            handle,
            start: range.start_frame as f32 / fps,
            end: range.end_frame as f32 / fps,
            looped,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WindowStep {
    Continue,
    /// Seek to the given time.
    Rewind(f32),
    Finish,
}

/// Decide what to do with a playhead at `seek_time` seconds.
pub fn advance_window(window: &ClipWindow, seek_time: f32) -> WindowStep {
    if seek_time < window.start {
        return WindowStep::Rewind(window.start);
    }
    if seek_time < window.end {
        return WindowStep::Continue;
    }
    if !window.looped {
        return WindowStep::Finish;
    }
    let length = window.end - window.start;
    if length <= f32::EPSILON {
        return WindowStep::Rewind(window.start);
    }
    WindowStep::Rewind(window.start + (seek_time - window.end) % length)
}

/// Animation player inside an avatar's model, linked back to the avatar entity.
#[derive(Component)]
pub struct AvatarRig {
    pub owner: Entity,
    pub node: AnimationNodeIndex,
    pub frames_per_second: f32,
    pub window: Option<ClipWindow>,
}

/// Once a model's scene spawns its `AnimationPlayer`, attach the avatar's graph to it.
pub fn attach_avatar_rigs(
    mut commands: Commands,
    players: Query<Entity, Added<AnimationPlayer>>,
    parents: Query<&ChildOf>,
    models: Query<&AvatarModel>,
) {
    for player in players.iter() {
        // Walk up to the avatar root that owns this scene
        let mut current = player;
        let owner = loop {
            if let Ok(model) = models.get(current) {
                break Some((current, model));
            }
            match parents.get(current) {
                Ok(parent) => current = parent.parent(),
                Err(_) => break None,
            }
        };
        let Some((owner, model)) = owner else {
            continue;
        };

        commands.entity(player).insert((
            AnimationGraphHandle(model.graph.clone()),
            AvatarRig {
                owner,
                node: model.node,
                frames_per_second: model.frames_per_second,
                window: None,
            },
        ));
        debug!("Attached animation rig {:?} to avatar {:?}", player, owner);
    }
}

/// Apply queued playback commands and keep each rig inside its clip window.
pub fn drive_avatar_animation(
    mut rigs: Query<(&mut AvatarRig, &mut AnimationPlayer)>,
    mut avatars: Query<&mut PlayerAvatar>,
) {
    for (mut rig, mut player) in rigs.iter_mut() {
        let Ok(mut avatar) = avatars.get_mut(rig.owner) else {
            continue;
        };
        let node = rig.node;

        for command in avatar.director_mut().backend_mut().take_commands() {
            match command {
                PlaybackCommand::Begin {
                    handle,
                    range,
                    looped,
                    speed_ratio,
                } => {
                    let window = ClipWindow::new(handle, range, looped, rig.frames_per_second);
                    player
                        .start(node)
                        .set_repeat(RepeatAnimation::Forever)
                        .set_speed(speed_ratio)
                        .seek_to(window.start)
                        .resume();
                    rig.window = Some(window);
                }
                PlaybackCommand::SetSpeed { handle, speed_ratio } => {
                    if rig.window.map(|w| w.handle) != Some(handle) {
                        continue;
                    }
                    if let Some(active) = player.animation_mut(node) {
                        active.set_speed(speed_ratio);
                    }
                }
            }
        }

        let Some(window) = rig.window else {
            continue;
        };
        let Some(active) = player.animation_mut(node) else {
            continue;
        };

        match advance_window(&window, active.seek_time()) {
            WindowStep::Continue => {}
            WindowStep::Rewind(time) => {
                active.seek_to(time);
            }
            WindowStep::Finish => {
                active.seek_to(window.end).pause();
                rig.window = None;
                avatar.playback_finished(window.handle);
            }
        }
    }
}
