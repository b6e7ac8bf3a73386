//! Speed ramp and heading integration for a single avatar.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::intent::DirectionalIntentSet;
use crate::motion::{AvatarPose, MotionBackend};

/// Frame deltas are divided by this before being used as the step length, so tuning values
/// stay in "per 20 ms" units.
pub const FRAME_DELTA_DIVISOR: f32 = 20.0;

/// How strongly movement speed feeds into the playback rate of the run clip.
pub const SPEED_RATIO_GAIN: f32 = 0.1;

/// Per-avatar movement constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionTuning {
    /// Playback rate of the idle and lateral clips.
    pub animation_speed: f32,
    pub speed_multiplier: f32,
    /// Geometric growth per step, e.g. `0.2` grows speed by 20 %.
    pub speed_increase_percent: f32,
    pub initial_forward_speed: f32,
    pub initial_backward_speed: f32,
    pub max_forward_speed: f32,
    pub max_backward_speed: f32,
    /// Radians per step unit.
    pub rotate_speed: f32,
}

impl Default for MotionTuning {
    fn default() -> Self {
        Self {
            animation_speed: 0.8,
            speed_multiplier: 2.0,
            speed_increase_percent: 0.2,
            initial_forward_speed: 0.02,
            initial_backward_speed: 0.02,
            max_forward_speed: 0.1,
            max_backward_speed: 0.1,
            rotate_speed: 0.03,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Heading {
    Forward,
    Backward,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MotionPhase {
    #[default]
    Idle,
    Accelerating(Heading),
    Cruising(Heading),
    /// Fore/aft intent was released this step; speed dropped to zero.
    Decelerating,
    Killed,
}

/// What a single step did.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepReport {
    pub phase: MotionPhase,
    pub speed: f32,
    pub speed_ratio: f32,
    pub displacement: Vec3,
    pub yaw_delta: f32,
    /// Step length after rescaling the frame delta.
    pub dt: f32,
}

#[derive(Debug, Clone)]
pub struct LocomotionController {
    tuning: MotionTuning,
    speed: f32,
    phase: MotionPhase,
    killed: bool,
}

impl LocomotionController {
    pub fn new(tuning: MotionTuning) -> Self {
        Self {
            tuning,
            speed: 0.0,
            phase: MotionPhase::Idle,
            killed: false,
        }
    }

    pub fn tuning(&self) -> &MotionTuning {
        &self.tuning
    }

    pub fn speed(&self) -> f32 {
        self.speed
    }

    pub fn phase(&self) -> MotionPhase {
        self.phase
    }

    pub fn is_killed(&self) -> bool {
        self.killed
    }

    /// Enter the terminal state. Returns `false` if already killed.
    pub fn kill(&mut self) -> bool {
        if self.killed {
            return false;
        }
        self.killed = true;
        self.speed = 0.0;
        self.phase = MotionPhase::Killed;
        true
    }

    pub fn speed_ratio(&self) -> f32 {
        if self.tuning.max_backward_speed > 0.0 {
            1.0 + self.speed / self.tuning.max_backward_speed * SPEED_RATIO_GAIN
        } else {
            1.0
        }
    }

    /// Advance one frame.
    pub fn step(
        &mut self,
        intents: &DirectionalIntentSet,
        frame_delta_ms: f32,
        pose: &mut AvatarPose,
        motion: &mut dyn MotionBackend,
    ) -> StepReport {
        if self.killed {
            return StepReport {
                phase: MotionPhase::Killed,
                speed: 0.0,
                speed_ratio: self.speed_ratio(),
                displacement: Vec3::ZERO,
                yaw_delta: 0.0,
                dt: 0.0,
            };
        }

        let dt = if intents.any_active() {
            frame_delta_ms.max(0.0) / FRAME_DELTA_DIVISOR
        } else {
            0.0
        };

        let heading = if intents.forward.active {
            Some(Heading::Forward)
        } else if intents.backward.active {
            Some(Heading::Backward)
        } else {
            None
        };

        let mut displacement = Vec3::ZERO;
        self.phase = match heading {
            Some(heading) => {
                let (initial, max, sign) = match heading {
                    Heading::Forward => (
                        self.tuning.initial_forward_speed,
                        self.tuning.max_forward_speed,
                        1.0,
                    ),
                    Heading::Backward => (
                        self.tuning.initial_backward_speed,
                        self.tuning.max_backward_speed,
                        -1.0,
                    ),
                };
                self.speed = ramp(self.speed, initial, max, self.tuning.speed_increase_percent);

                displacement = pose.forward() * (sign * self.speed * self.tuning.speed_multiplier * dt);
                if displacement != Vec3::ZERO {
                    motion.apply_displacement(pose, displacement);
                }

                if self.speed >= max {
                    MotionPhase::Cruising(heading)
                } else {
                    MotionPhase::Accelerating(heading)
                }
            }
            None if self.speed > 0.0 => {
                self.speed = 0.0;
                MotionPhase::Decelerating
            }
            None => MotionPhase::Idle,
        };

        let mut yaw_delta = 0.0;
        if intents.right.active {
            yaw_delta += self.tuning.rotate_speed * dt;
        }
        if intents.left.active {
            yaw_delta -= self.tuning.rotate_speed * dt;
        }
        pose.yaw += yaw_delta;

        StepReport {
            phase: self.phase,
            speed: self.speed,
            speed_ratio: self.speed_ratio(),
            displacement,
            yaw_delta,
            dt,
        }
    }
}

fn ramp(speed: f32, initial: f32, max: f32, increase: f32) -> f32 {
    if speed <= 0.0 {
        initial.min(max)
    } else {
        (speed * (1.0 + increase)).min(max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intent::Direction;
    use crate::motion::KinematicBackend;

    fn forward() -> DirectionalIntentSet {
        let mut set = DirectionalIntentSet::default();
        set.set(Direction::Forward, 1.0);
        set
    }

    #[test]
    fn test_forward_ramp_scenario() {
        let mut c = LocomotionController::new(MotionTuning::default());
        let mut pose = AvatarPose::default();
        let mut backend = KinematicBackend;

        let speeds: Vec<f32> = (0..3)
            .map(|_| c.step(&forward(), 20.0, &mut pose, &mut backend).speed)
            .collect();

        assert!((speeds[0] - 0.02).abs() < 1e-6);
        assert!((speeds[1] - 0.024).abs() < 1e-6);
        assert!((speeds[2] - 0.0288).abs() < 1e-6);
        // dt = 1, multiplier 2, yaw 0 → straight along +Z
        let travelled = 2.0 * (0.02 + 0.024 + 0.0288);
        assert!((pose.position.z - travelled).abs() < 1e-5);
        assert!(pose.position.x.abs() < 1e-6);
    }

    #[test]
    fn test_ramp_is_monotonic_and_bounded() {
        let tuning = MotionTuning::default();
        let mut c = LocomotionController::new(tuning);
        let mut pose = AvatarPose::default();
        let mut backend = KinematicBackend;

        let mut last = 0.0;
        for _ in 0..50 {
            let report = c.step(&forward(), 16.0, &mut pose, &mut backend);
            assert!(report.speed >= last);
            assert!(report.speed <= tuning.max_forward_speed);
            last = report.speed;
        }
        assert_eq!(c.phase(), MotionPhase::Cruising(Heading::Forward));
        assert!((c.speed_ratio() - 1.1).abs() < 1e-5);

        let report = c.step(&DirectionalIntentSet::default(), 16.0, &mut pose, &mut backend);
        assert_eq!(report.phase, MotionPhase::Decelerating);
        assert_eq!(report.speed, 0.0);
        assert_eq!(report.dt, 0.0);

        let report = c.step(&DirectionalIntentSet::default(), 16.0, &mut pose, &mut backend);
        assert_eq!(report.phase, MotionPhase::Idle);
    }

    #[test]
    fn test_forward_wins_and_backward_moves_back() {
        let mut c = LocomotionController::new(MotionTuning::default());
        let mut pose = AvatarPose::default();
        let mut backend = KinematicBackend;

        let mut both = forward();
        both.set(Direction::Backward, 1.0);
        let report = c.step(&both, 20.0, &mut pose, &mut backend);
        assert_eq!(report.phase, MotionPhase::Accelerating(Heading::Forward));
        assert!(pose.position.z > 0.0);

        let mut c = LocomotionController::new(MotionTuning::default());
        let mut pose = AvatarPose::default();
        let mut back = DirectionalIntentSet::default();
        back.set(Direction::Backward, 1.0);
        c.step(&back, 20.0, &mut pose, &mut backend);
        assert!(pose.position.z < 0.0);
    }

    #[test]
    fn test_rotation_is_independent_of_translation() {
        let mut c = LocomotionController::new(MotionTuning::default());
        let mut pose = AvatarPose::default();
        let mut backend = KinematicBackend;

        let mut turning = DirectionalIntentSet::default();
        turning.set(Direction::Right, 1.0);
        let report = c.step(&turning, 40.0, &mut pose, &mut backend);
        assert_eq!(report.phase, MotionPhase::Idle);
        assert!((report.yaw_delta - 0.06).abs() < 1e-6);
        assert_eq!(pose.position, Vec3::ZERO);

        turning.set(Direction::Forward, 1.0);
        turning.clear(Direction::Right);
        turning.set(Direction::Left, 1.0);
        c.step(&turning, 20.0, &mut pose, &mut backend);
        assert!((pose.yaw - 0.03).abs() < 1e-6);
        assert!(pose.position.length() > 0.0);
    }

    #[test]
    fn test_killed_controller_is_frozen() {
        let mut c = LocomotionController::new(MotionTuning::default());
        let mut pose = AvatarPose::default();
        let mut backend = KinematicBackend;
        c.step(&forward(), 20.0, &mut pose, &mut backend);
        let before = pose;

        assert!(c.kill());
        assert!(!c.kill());

        let report = c.step(&forward(), 20.0, &mut pose, &mut backend);
        assert_eq!(report.phase, MotionPhase::Killed);
        assert_eq!(report.displacement, Vec3::ZERO);
        assert_eq!(pose, before);
    }
}
