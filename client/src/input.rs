//! Keyboard and on-screen joystick input for the local avatar.

use std::sync::{Arc, Mutex};

use bevy::prelude::*;
use bevy::window::PrimaryWindow;
use stride_shared::gesture::DEFAULT_JOYSTICK_RADIUS;
use stride_shared::{ClipId, DirectionalEvent, JoystickGesture, KeyMapping};

use crate::systems::{LocalAvatar, PlayerAvatar};

/// One-shot actions requested by alternate key bindings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvatarAction {
    Attack,
    HitReaction,
}

impl AvatarAction {
    pub fn clip(&self) -> ClipId {
        match self {
            AvatarAction::Attack => ClipId::Attack,
            AvatarAction::HitReaction => ClipId::HitReceived,
        }
    }
}

/// Actions queued by key callbacks, applied to the avatar by [`apply_avatar_actions`].
///
/// The callbacks live inside the avatar itself, so they cannot touch it directly.
#[derive(Resource, Clone, Default)]
pub struct ActionInbox(Arc<Mutex<Vec<AvatarAction>>>);

impl ActionInbox {
    pub fn push(&self, action: AvatarAction) {
        match self.0.lock() {
            Ok(mut queue) => queue.push(action),
            Err(poisoned) => poisoned.into_inner().push(action),
        }
    }

    pub fn drain(&self) -> Vec<AvatarAction> {
        match self.0.lock() {
            Ok(mut queue) => std::mem::take(&mut *queue),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

/// Key bindings. Arrow keys mirror the primary movement keys.
#[derive(Resource, Debug, Clone)]
pub struct ControlSettings {
    pub forward: KeyCode,
    pub backward: KeyCode,
    pub left: KeyCode,
    pub right: KeyCode,
    pub alt_forward: KeyCode,
    pub alt_backward: KeyCode,
    pub alt_left: KeyCode,
    pub alt_right: KeyCode,
    pub attack: KeyCode,
    pub hit: KeyCode,
    pub kill: KeyCode,
    pub destroy: KeyCode,
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self {
            forward: KeyCode::KeyW,
            backward: KeyCode::KeyS,
            left: KeyCode::KeyA,
            right: KeyCode::KeyD,
            alt_forward: KeyCode::ArrowUp,
            alt_backward: KeyCode::ArrowDown,
            alt_left: KeyCode::ArrowLeft,
            alt_right: KeyCode::ArrowRight,
            attack: KeyCode::Space,
            hit: KeyCode::KeyH,
            kill: KeyCode::KeyK,
            destroy: KeyCode::Delete,
        }
    }
}

impl ControlSettings {
    /// Movement keys plus the attack/hit alternates, which report into `inbox`.
    pub fn key_mapping(&self, inbox: &ActionInbox) -> KeyMapping<KeyCode> {
        let attack = inbox.clone();
        let hit = inbox.clone();
        KeyMapping::new(self.forward, self.backward, self.left, self.right)
            .with_alternate(self.attack, move || attack.push(AvatarAction::Attack))
            .with_alternate(self.hit, move || hit.push(AvatarAction::HitReaction))
    }

    /// Fold the arrow keys onto the primary movement keys.
    pub fn canonical(&self, key: KeyCode) -> KeyCode {
        if key == self.alt_forward {
            self.forward
        } else if key == self.alt_backward {
            self.backward
        } else if key == self.alt_left {
            self.left
        } else if key == self.alt_right {
            self.right
        } else {
            key
        }
    }
}

/// Directional edge events, for anything on screen that wants to reflect them.
#[derive(Message, Debug, Clone, Copy)]
pub struct DirectionalEventMessage(pub DirectionalEvent);

/// Forward key transitions to the local avatar.
pub fn handle_keyboard_input(
    keyboard: Res<ButtonInput<KeyCode>>,
    controls: Res<ControlSettings>,
    mut avatars: Query<&mut PlayerAvatar, With<LocalAvatar>>,
) {
    let Ok(mut avatar) = avatars.single_mut() else {
        return;
    };

    for key in keyboard.get_just_pressed() {
        let key = controls.canonical(*key);
        avatar.key_down(key);
        avatar.key_press(key);
    }
    for key in keyboard.get_just_released() {
        avatar.key_up(controls.canonical(*key));
    }
}

/// Kill / destroy the local avatar on demand.
pub fn handle_lifecycle_keys(
    mut commands: Commands,
    keyboard: Res<ButtonInput<KeyCode>>,
    controls: Res<ControlSettings>,
    mut avatars: Query<(Entity, &mut PlayerAvatar), With<LocalAvatar>>,
) {
    let Ok((entity, mut avatar)) = avatars.single_mut() else {
        return;
    };

    if keyboard.just_pressed(controls.kill) {
        let name = avatar.name().to_string();
        avatar.kill(Some(Box::new(move || {
            info!("Avatar '{}' finished its death animation", name);
        })));
    }

    if keyboard.just_pressed(controls.destroy) && avatar.destroy() {
        commands.entity(entity).despawn();
    }
}

pub fn apply_avatar_actions(
    inbox: Res<ActionInbox>,
    mut avatars: Query<&mut PlayerAvatar, With<LocalAvatar>>,
) {
    let actions = inbox.drain();
    if actions.is_empty() {
        return;
    }
    let Ok(mut avatar) = avatars.single_mut() else {
        return;
    };

    for action in actions {
        match avatar.play_one_shot(action.clip()) {
            Ok(true) => debug!("Avatar '{}' plays {:?}", avatar.name(), action),
            Ok(false) => {}
            Err(e) => warn!("Avatar '{}' cannot play {:?}: {}", avatar.name(), action, e),
        }
    }
}

/// Where the on-screen stick is being dragged, in window coordinates.
#[derive(Resource, Debug, Default)]
pub struct JoystickState {
    /// Where the drag started; `None` while the stick is idle.
    pub origin: Option<Vec2>,
    /// Knob offset from the origin, clamped to the stick radius (+y is down).
    pub knob: Vec2,
    touch: Option<u64>,
}

impl JoystickState {
    pub fn radius(&self) -> f32 {
        DEFAULT_JOYSTICK_RADIUS
    }

    fn release(&mut self) {
        self.origin = None;
        self.knob = Vec2::ZERO;
        self.touch = None;
    }
}

/// Turn a touch drag (or a left-mouse drag on desktop) into stick readings.
pub fn handle_joystick_input(
    touches: Res<Touches>,
    mouse: Res<ButtonInput<MouseButton>>,
    windows: Query<&Window, With<PrimaryWindow>>,
    mut stick: ResMut<JoystickState>,
    mut avatars: Query<&mut PlayerAvatar, With<LocalAvatar>>,
    mut events: MessageWriter<DirectionalEventMessage>,
) {
    let Ok(mut avatar) = avatars.single_mut() else {
        if stick.origin.is_some() {
            stick.release();
        }
        return;
    };

    let tracked = stick.touch;
    let pointer = match tracked {
        Some(id) => touches.get_pressed(id).map(|t| t.position()),
        None => {
            if let Some(touch) = touches.iter_just_pressed().next() {
                stick.touch = Some(touch.id());
                stick.origin = Some(touch.position());
                Some(touch.position())
            } else if mouse.pressed(MouseButton::Left) {
                let cursor = windows.single().ok().and_then(|w| w.cursor_position());
                if mouse.just_pressed(MouseButton::Left) {
                    stick.origin = cursor;
                }
                cursor
            } else {
                None
            }
        }
    };

    let (Some(origin), Some(pointer)) = (stick.origin, pointer) else {
        if stick.origin.is_some() {
            stick.release();
            for event in avatar.release_gesture() {
                events.write(DirectionalEventMessage(event));
            }
        }
        return;
    };

    let offset = pointer - origin;
    let radius = stick.radius();
    stick.knob = offset.clamp_length_max(radius);

    // Screen y grows downwards, the stick's y grows upwards
    let gesture = JoystickGesture::from_offset(offset.x, -offset.y, radius);
    for event in avatar.handle_gesture_sample(gesture.angle_degrees, gesture.distance_ratio) {
        events.write(DirectionalEventMessage(event));
    }
}
