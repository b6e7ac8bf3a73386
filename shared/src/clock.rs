//! Wall-clock frame delta.

use std::time::{Duration, Instant};

use bevy::prelude::*;

/// Measures the time between consecutive simulation steps.
///
/// `measure` is called once at the top of a frame; everything else in the frame reads the
/// cached value so all consumers agree on the same delta.
#[derive(Resource, Debug, Clone)]
pub struct FrameClock {
    before: Instant,
    delta_ms: f32,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    pub fn new() -> Self {
        Self::starting_at(Instant::now())
    }

    pub fn starting_at(now: Instant) -> Self {
        Self {
            before: now,
            delta_ms: 0.0,
        }
    }

    /// Milliseconds since the previous measurement.
    pub fn measure(&mut self) -> f32 {
        self.measure_at(Instant::now())
    }

    pub fn measure_at(&mut self, now: Instant) -> f32 {
        let elapsed: Duration = now.saturating_duration_since(self.before);
        self.before = now;
        self.delta_ms = elapsed.as_secs_f32() * 1000.0;
        self.delta_ms
    }

    pub fn cached_delta_ms(&self) -> f32 {
        self.delta_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measure_caches_delta() {
        let start = Instant::now();
        let mut clock = FrameClock::starting_at(start);
        assert_eq!(clock.cached_delta_ms(), 0.0);

        let d = clock.measure_at(start + Duration::from_millis(16));
        assert!((d - 16.0).abs() < 1e-3);
        assert!((clock.cached_delta_ms() - 16.0).abs() < 1e-3);

        let d = clock.measure_at(start + Duration::from_millis(50));
        assert!((d - 34.0).abs() < 1e-3);
    }

    #[test]
    fn test_time_going_backwards_is_zero() {
        let start = Instant::now() + Duration::from_secs(1);
        let mut clock = FrameClock::starting_at(start);
        assert_eq!(clock.measure_at(start - Duration::from_millis(10)), 0.0);
    }
}
