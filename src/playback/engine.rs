use crate::core::{Coordinate, Route, Sample};
use crate::playback::{synthesize_path, PlaybackState};
use crate::telemetry::{speed_kmh, RenderFrame, VehiclePopup, VehicleStatus};
use crate::telemetry::frame::MOCK_BATTERY_PERCENT;
use chrono::{DateTime, Utc};
use tracing::debug;

/// Result of a single tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Not playing; nothing changed
    Idle,
    /// Cursor moved forward and playback continues
    Advanced,
    /// Cursor reached the last sample and playback stopped
    Finished { detour_completed: bool },
}

/// Playback state machine over a route
///
/// Owns the working route, the cursor and the pending target. Timing lives
/// elsewhere: the caller drives [`PlaybackEngine::tick`] at its own interval.
pub struct PlaybackEngine {
    route: Route,
    cursor: usize,
    state: PlaybackState,
    target: Option<Coordinate>,
    detour_active: bool,
}

impl Default for PlaybackEngine {
    fn default() -> Self {
        Self::new(Route::new())
    }
}

impl PlaybackEngine {
    pub fn new(route: Route) -> Self {
        Self {
            route,
            cursor: 0,
            state: PlaybackState::Stopped,
            target: None,
            detour_active: false,
        }
    }

    /// Current cursor (index into the route)
    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn total_samples(&self) -> usize {
        self.route.len()
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    pub fn target(&self) -> Option<Coordinate> {
        self.target
    }

    /// Whether a synthesized path is still being traversed
    pub fn detour_active(&self) -> bool {
        self.detour_active
    }

    fn last_index(&self) -> usize {
        self.route.len().saturating_sub(1)
    }

    /// Whether the cursor sits on the final sample (or the route is empty)
    pub fn at_end(&self) -> bool {
        self.cursor >= self.last_index()
    }

    pub fn current_sample(&self) -> Option<&Sample> {
        self.route.get(self.cursor)
    }

    pub fn previous_sample(&self) -> Option<&Sample> {
        self.cursor.checked_sub(1).and_then(|i| self.route.get(i))
    }

    /// Speed between the previous and current samples
    pub fn current_speed_kmh(&self) -> f64 {
        speed_kmh(self.previous_sample(), self.current_sample())
    }

    /// Start playback. Returns false (and stays stopped) if there is
    /// nothing left to play.
    pub fn play(&mut self) -> bool {
        if self.route.is_empty() || self.at_end() {
            debug!("Play ignored at cursor {} of {}", self.cursor, self.route.len());
            return false;
        }
        self.state = PlaybackState::Playing;
        true
    }

    pub fn pause(&mut self) {
        self.state = PlaybackState::Stopped;
    }

    /// Play if stopped, pause if playing. Returns whether playback is now running.
    pub fn toggle(&mut self) -> bool {
        if self.is_playing() {
            self.pause();
            false
        } else {
            self.play()
        }
    }

    /// Advance the cursor by one, clamped to the last sample
    pub fn tick(&mut self) -> TickOutcome {
        if !self.is_playing() {
            return TickOutcome::Idle;
        }

        self.cursor = (self.cursor + 1).min(self.last_index());

        if self.at_end() {
            self.state = PlaybackState::Stopped;
            let detour_completed = std::mem::replace(&mut self.detour_active, false);
            return TickOutcome::Finished { detour_completed };
        }

        TickOutcome::Advanced
    }

    /// Swap in a new route: cursor back to 0, target cleared, playback stopped
    pub fn replace(&mut self, route: Route) {
        self.route = route;
        self.cursor = 0;
        self.state = PlaybackState::Stopped;
        self.target = None;
        self.detour_active = false;
    }

    /// Stop, clear the target and rewind, keeping the current route
    pub fn rewind(&mut self) {
        self.state = PlaybackState::Stopped;
        self.cursor = 0;
        self.target = None;
        self.detour_active = false;
    }

    pub fn clear_target(&mut self) {
        self.target = None;
    }

    /// Replace everything after the cursor with a straight path to `target`
    ///
    /// Playback is left stopped; the caller resumes it. Returns false when
    /// there is no current position to start from.
    pub fn redirect(&mut self, target: Coordinate, steps: usize, now: DateTime<Utc>) -> bool {
        let Some(start) = self.current_sample().map(Sample::coordinate) else {
            return false;
        };

        self.state = PlaybackState::Stopped;
        self.route.truncate(self.cursor + 1);
        self.route.extend(synthesize_path(start, target, steps, now));
        self.target = Some(target);
        self.detour_active = true;

        debug!(
            "Redirecting from sample {} to {:.6}, {:.6}; route now {} samples",
            self.cursor,
            target.latitude,
            target.longitude,
            self.route.len()
        );
        true
    }

    /// Snapshot for the presentation layer
    pub fn frame(&self, fallback: Coordinate) -> RenderFrame {
        let Some(current) = self.current_sample() else {
            let mut frame = RenderFrame::empty(fallback);
            frame.target = self.target;
            return frame;
        };

        let speed = self.current_speed_kmh();
        let full_path: Vec<Coordinate> = self.route.iter().map(Sample::coordinate).collect();
        let traveled_path = full_path[..=self.cursor].to_vec();

        RenderFrame {
            current_position: current.coordinate(),
            full_path,
            traveled_path,
            target: self.target,
            is_playing: self.is_playing(),
            current_index: self.cursor,
            total_count: self.route.len(),
            current_speed_kmh: speed,
            popup: VehiclePopup {
                timestamp: Some(current.timestamp),
                speed_kmh: speed,
                battery_percent: MOCK_BATTERY_PERCENT,
                status: if self.is_playing() { VehicleStatus::Running } else { VehicleStatus::Idle },
            },
        }
    }
}
