//! Analog joystick → directional intent mapping.
//!
//! The stick reports an angle (0° = right, 90° = up, counter-clockwise) and a distance
//! from its center. Lateral intent comes from overlapping angular sectors around the
//! horizontal axis; fore/aft intent comes from the stick's vertical component once the
//! stick is pushed past a distance threshold. Both axes are tracked independently so
//! diagonals produce two concurrent intents.

use serde::{Deserialize, Serialize};

use crate::intent::{Direction, DirectionalEvent, DirectionalIntentSet};

/// Radius of the on-screen stick in pixels (raw distances are divided by this).
pub const DEFAULT_JOYSTICK_RADIUS: f32 = 35.0;

/// Angular bounds of a lateral sector, in degrees.
///
/// `min_angle` bounds the sector in the upper half of the circle and `max_angle` in the
/// lower half.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SectorBounds {
    pub min_angle: f32,
    pub max_angle: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    pub left: SectorBounds,
    pub right: SectorBounds,
    /// Fore/aft intent needs the stick pushed strictly further than this ratio.
    pub fore_aft_threshold: f32,
    /// Mirror the lateral result while the stick points backwards (steer like a reversing car).
    pub reverse_backward: bool,
    pub radius: f32,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            left: SectorBounds {
                min_angle: 110.0,
                max_angle: 250.0,
            },
            right: SectorBounds {
                min_angle: 70.0,
                max_angle: 290.0,
            },
            fore_aft_threshold: 0.5,
            reverse_backward: false,
            radius: DEFAULT_JOYSTICK_RADIUS,
        }
    }
}

/// A single stick reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct JoystickGesture {
    /// Normalized into `[0, 360)`.
    pub angle_degrees: f32,
    /// Clamped into `[0, 1]`.
    pub distance_ratio: f32,
}

impl JoystickGesture {
    pub fn new(angle_degrees: f32, distance_ratio: f32) -> Self {
        let angle = angle_degrees.rem_euclid(360.0);
        let distance = if distance_ratio.is_finite() {
            distance_ratio.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            angle_degrees: if angle.is_finite() { angle } else { 0.0 },
            distance_ratio: distance,
        }
    }

    /// Build from a raw distance (e.g. pixels) and the stick radius in the same unit.
    pub fn from_raw(angle_degrees: f32, distance: f32, radius: f32) -> Self {
        let ratio = if radius > 0.0 { distance / radius } else { 0.0 };
        Self::new(angle_degrees, ratio)
    }

    /// Build from a stick offset where +x is right and +y is up.
    pub fn from_offset(x: f32, y: f32, radius: f32) -> Self {
        let angle = y.atan2(x).to_degrees();
        Self::from_raw(angle, (x * x + y * y).sqrt(), radius)
    }

    /// Sign of the stick's vertical component: `1` up, `-1` down, `0` on the horizontal axis.
    fn vertical_sign(&self) -> i8 {
        let v = self.angle_degrees.to_radians().sin();
        if v > 1e-4 {
            1
        } else if v < -1e-4 {
            -1
        } else {
            0
        }
    }
}

/// Stateful translator from stick readings to edge-triggered directional events.
#[derive(Debug, Clone, Default)]
pub struct GestureMapper {
    config: GestureConfig,
    status: DirectionalIntentSet,
}

impl GestureMapper {
    pub fn new(config: GestureConfig) -> Self {
        Self {
            config,
            status: DirectionalIntentSet::default(),
        }
    }

    pub fn config(&self) -> &GestureConfig {
        &self.config
    }

    /// Current per-direction state as last emitted.
    pub fn status(&self) -> &DirectionalIntentSet {
        &self.status
    }

    pub fn sample(&mut self, angle_degrees: f32, distance_ratio: f32) -> Vec<DirectionalEvent> {
        self.apply(JoystickGesture::new(angle_degrees, distance_ratio))
    }

    pub fn apply(&mut self, gesture: JoystickGesture) -> Vec<DirectionalEvent> {
        let mut events = Vec::new();
        let distance = gesture.distance_ratio;

        match self.lateral(&gesture) {
            Some((direction, power)) => {
                self.enable(direction, power, &mut events);
                self.disable(direction.opposite(), &mut events);
            }
            None => {
                self.disable(Direction::Left, &mut events);
                self.disable(Direction::Right, &mut events);
            }
        }

        let vertical = if distance > self.config.fore_aft_threshold {
            gesture.vertical_sign()
        } else {
            0
        };
        match vertical {
            1 => {
                self.enable(Direction::Forward, distance, &mut events);
                self.disable(Direction::Backward, &mut events);
            }
            -1 => {
                self.enable(Direction::Backward, distance, &mut events);
                self.disable(Direction::Forward, &mut events);
            }
            _ => {
                self.disable(Direction::Forward, &mut events);
                self.disable(Direction::Backward, &mut events);
            }
        }

        events
    }

    /// End every active direction (stick released).
    pub fn clear(&mut self) -> Vec<DirectionalEvent> {
        let mut events = Vec::new();
        for direction in [
            Direction::Right,
            Direction::Forward,
            Direction::Left,
            Direction::Backward,
        ] {
            self.disable(direction, &mut events);
        }
        events
    }

    /// Which lateral sector the sample falls in, with its ramped power.
    fn lateral(&self, gesture: &JoystickGesture) -> Option<(Direction, f32)> {
        let angle = gesture.angle_degrees;
        let distance = gesture.distance_ratio;
        let left = self.config.left;
        let right = self.config.right;

        // Both sector boundaries at 0° and 180° belong to the right-hand sector test,
        // so a dead-left drag yields no lateral intent while dead-right saturates.
        if angle <= 180.0 {
            if angle >= left.min_angle && angle < 180.0 {
                let ramp = ratio(angle - left.min_angle, 180.0 - left.min_angle);
                Some((Direction::Left, clamp_power(ramp * distance)))
            } else if angle <= right.min_angle {
                let ramp = if angle > 0.0 {
                    1.0 - ratio(angle, right.min_angle)
                } else {
                    1.0
                };
                Some((Direction::Right, clamp_power(ramp * distance)))
            } else {
                None
            }
        } else {
            let hit = if angle <= left.max_angle {
                let ramp = 1.0 - ratio(angle - 180.0, left.max_angle - 180.0);
                Some((Direction::Left, clamp_power(ramp * distance)))
            } else if angle >= right.max_angle {
                let ramp = ratio(angle - right.max_angle, 360.0 - right.max_angle);
                Some((Direction::Right, clamp_power(ramp * distance)))
            } else {
                None
            };

            if self.config.reverse_backward {
                hit.map(|(direction, power)| (direction.opposite(), power))
            } else {
                hit
            }
        }
    }

    fn enable(&mut self, direction: Direction, power: f32, events: &mut Vec<DirectionalEvent>) {
        let channel = self.status.channel(direction);
        if !channel.active || channel.power != power {
            self.status.set(direction, power);
            events.push(DirectionalEvent::start(direction, power));
        }
    }

    fn disable(&mut self, direction: Direction, events: &mut Vec<DirectionalEvent>) {
        if self.status.is_active(direction) {
            self.status.clear(direction);
            events.push(DirectionalEvent::end(direction));
        }
    }
}

fn ratio(numerator: f32, denominator: f32) -> f32 {
    if denominator.abs() <= f32::EPSILON {
        1.0
    } else {
        numerator / denominator
    }
}

fn clamp_power(power: f32) -> f32 {
    power.clamp(0.0, 1.0)
}
