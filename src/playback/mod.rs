pub mod engine;
pub mod session;
pub mod synth;
pub mod timer;

pub use engine::{PlaybackEngine, TickOutcome};
pub use session::Session;
pub use synth::synthesize_path;
pub use timer::TimerSlot;

use std::time::Duration;
use crate::core::Coordinate;

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackState {
    Stopped,
    Playing,
}

/// Playback configuration
#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    /// Time between cursor advances while playing
    pub tick_interval: Duration,
    /// Delay before playback resumes after a click-to-target
    pub resume_delay: Duration,
    /// How long the target marker stays after the detour completes
    pub target_clear_delay: Duration,
    /// Number of interpolation steps for a synthesized path
    pub synth_steps: usize,
    /// Vehicle position reported while no route is loaded
    pub fallback_position: Coordinate,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(500),
            resume_delay: Duration::from_millis(100),
            target_clear_delay: Duration::from_millis(2000),
            synth_steps: synth::DEFAULT_STEPS,
            fallback_position: Coordinate::new(17.385044, 78.486671),
        }
    }
}
