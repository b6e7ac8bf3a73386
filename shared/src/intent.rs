//! Directional intents shared by every input source.
//!
//! A keyboard and an analog stick both end up describing the same thing: which of the
//! four locomotion directions the player wants, and how strongly. The controller reads a
//! single merged snapshot of these once per step.

use serde::{Deserialize, Serialize};

/// One of the four locomotion directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Forward,
    Backward,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Forward,
        Direction::Backward,
        Direction::Left,
        Direction::Right,
    ];

    /// The direction on the same axis pointing the other way.
    pub fn opposite(&self) -> Self {
        match self {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Direction::Forward => "forward",
            Direction::Backward => "backward",
            Direction::Left => "left",
            Direction::Right => "right",
        }
    }
}

/// Level-triggered state of a single direction.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct IntentChannel {
    pub active: bool,
    /// Strength in `[0, 1]`. Keyboard sources always report 1.
    pub power: f32,
}

/// The four independent direction channels.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DirectionalIntentSet {
    pub forward: IntentChannel,
    pub backward: IntentChannel,
    pub left: IntentChannel,
    pub right: IntentChannel,
}

impl DirectionalIntentSet {
    pub fn channel(&self, direction: Direction) -> &IntentChannel {
        match direction {
            Direction::Forward => &self.forward,
            Direction::Backward => &self.backward,
            Direction::Left => &self.left,
            Direction::Right => &self.right,
        }
    }

    fn channel_mut(&mut self, direction: Direction) -> &mut IntentChannel {
        match direction {
            Direction::Forward => &mut self.forward,
            Direction::Backward => &mut self.backward,
            Direction::Left => &mut self.left,
            Direction::Right => &mut self.right,
        }
    }

    /// Activate `direction` with the given power (clamped into `[0, 1]`).
    pub fn set(&mut self, direction: Direction, power: f32) {
        let channel = self.channel_mut(direction);
        channel.active = true;
        channel.power = power.clamp(0.0, 1.0);
    }

    pub fn clear(&mut self, direction: Direction) {
        *self.channel_mut(direction) = IntentChannel::default();
    }

    pub fn clear_all(&mut self) {
        *self = Self::default();
    }

    pub fn is_active(&self, direction: Direction) -> bool {
        self.channel(direction).active
    }

    pub fn power(&self, direction: Direction) -> f32 {
        self.channel(direction).power
    }

    pub fn any_active(&self) -> bool {
        Direction::ALL.iter().any(|d| self.is_active(*d))
    }

    pub fn fore_aft_active(&self) -> bool {
        self.forward.active || self.backward.active
    }

    /// Update the set from an edge event emitted by an input source.
    pub fn apply(&mut self, event: &DirectionalEvent) {
        match event.kind {
            DirectionalEventKind::Start => self.set(event.direction, event.power.unwrap_or(1.0)),
            DirectionalEventKind::End => self.clear(event.direction),
        }
    }

    /// Union of two sources: a channel is active if either source holds it, with the
    /// stronger of the two powers.
    pub fn merged(&self, other: &DirectionalIntentSet) -> DirectionalIntentSet {
        let mut out = DirectionalIntentSet::default();
        for direction in Direction::ALL {
            let a = self.channel(direction);
            let b = other.channel(direction);
            if a.active || b.active {
                let power = match (a.active, b.active) {
                    (true, true) => a.power.max(b.power),
                    (true, false) => a.power,
                    _ => b.power,
                };
                out.set(direction, power);
            }
        }
        out
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DirectionalEventKind {
    Start,
    End,
}

/// Edge event surfaced to the UI layer whenever a direction starts, changes power, or ends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DirectionalEvent {
    pub kind: DirectionalEventKind,
    pub direction: Direction,
    pub power: Option<f32>,
}

impl DirectionalEvent {
    pub fn start(direction: Direction, power: f32) -> Self {
        Self {
            kind: DirectionalEventKind::Start,
            direction,
            power: Some(power),
        }
    }

    pub fn end(direction: Direction) -> Self {
        Self {
            kind: DirectionalEventKind::End,
            direction,
            power: None,
        }
    }
}
