use std::time::Duration;
use crate::core::Coordinate;

/// Glides a marker from its previous position to a new one over a fixed duration
///
/// A renderer calls [`MarkerTween::retarget`] whenever a new frame arrives and
/// [`MarkerTween::position`] on every animation frame.
#[derive(Debug, Clone)]
pub struct MarkerTween {
    from: Coordinate,
    to: Coordinate,
    duration: Duration,
    elapsed: Duration,
}

impl MarkerTween {
    pub fn new(start: Coordinate, duration: Duration) -> Self {
        Self {
            from: start,
            to: start,
            duration,
            elapsed: duration,
        }
    }

    /// Start a new glide from wherever the marker currently is
    pub fn retarget(&mut self, to: Coordinate) {
        self.from = self.position();
        self.to = to;
        self.elapsed = Duration::ZERO;
    }

    /// Advance the animation clock
    pub fn advance(&mut self, delta: Duration) {
        self.elapsed = (self.elapsed + delta).min(self.duration);
    }

    pub fn progress(&self) -> f64 {
        if self.duration.is_zero() {
            return 1.0;
        }
        (self.elapsed.as_secs_f64() / self.duration.as_secs_f64()).min(1.0)
    }

    pub fn position(&self) -> Coordinate {
        let t = self.progress();
        if t >= 1.0 {
            return self.to;
        }
        self.from.lerp(&self.to, t)
    }

    pub fn is_finished(&self) -> bool {
        self.progress() >= 1.0
    }
}
