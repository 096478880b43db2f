use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use chrono::Utc;
use tokio::sync::watch;
use tracing::{debug, info};
use crate::core::{Coordinate, Route};
use crate::error::RouteResult;
use crate::input::RouteSource;
use crate::playback::{PlaybackConfig, PlaybackEngine, PlaybackState, TickOutcome, TimerSlot};
use crate::store::RouteStore;
use crate::telemetry::RenderFrame;

/// State shared with the timer tasks
struct Inner {
    engine: PlaybackEngine,
    config: PlaybackConfig,
    ticker: TimerSlot,
    resume: TimerSlot,
    target_clear: TimerSlot,
    frames: watch::Sender<RenderFrame>,
}

type Shared = Mutex<Inner>;

fn lock(shared: &Shared) -> MutexGuard<'_, Inner> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Inner {
    fn publish(&self) {
        self.frames.send_replace(self.engine.frame(self.config.fallback_position));
    }

    fn cancel_timers(&mut self) {
        self.ticker.cancel();
        self.resume.cancel();
        self.target_clear.cancel();
    }

    /// Enter Playing and start the tick task
    fn start_playing(&mut self, weak: Weak<Shared>) -> bool {
        self.resume.cancel();
        if !self.engine.play() {
            self.ticker.cancel();
            return false;
        }

        info!(
            "Playing from sample {} of {}",
            self.engine.position() + 1,
            self.engine.total_samples()
        );
        self.ticker
            .start_interval(self.config.tick_interval, move |generation| on_tick(&weak, generation));
        true
    }

    fn schedule_target_clear(&mut self, weak: Weak<Shared>) {
        self.target_clear.start_once(self.config.target_clear_delay, move |generation| {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let mut inner = lock(&shared);
            if inner.target_clear.is_current(generation) {
                inner.engine.clear_target();
                inner.publish();
            }
        });
    }
}

fn on_tick(weak: &Weak<Shared>, generation: u64) -> ControlFlow<()> {
    let Some(shared) = weak.upgrade() else {
        return ControlFlow::Break(());
    };
    let mut inner = lock(&shared);
    if !inner.ticker.is_current(generation) {
        return ControlFlow::Break(());
    }

    match inner.engine.tick() {
        TickOutcome::Advanced => {
            inner.publish();
            ControlFlow::Continue(())
        }
        TickOutcome::Finished { detour_completed } => {
            info!("Reached end of route at sample {}", inner.engine.position() + 1);
            inner.ticker.cancel();
            if detour_completed {
                inner.schedule_target_clear(weak.clone());
            }
            inner.publish();
            ControlFlow::Break(())
        }
        TickOutcome::Idle => {
            inner.ticker.cancel();
            ControlFlow::Break(())
        }
    }
}

/// A replay session: one vehicle, one route, one tick timer
///
/// Composes the route store, the playback engine and its timers. The four
/// user actions are [`play`](Session::play), [`pause`](Session::pause),
/// [`reset`](Session::reset) and [`click_at`](Session::click_at). Frames are
/// pushed to [`subscribe`](Session::subscribe)rs after every change and can
/// also be polled with [`frame`](Session::frame).
///
/// Actions must be called from within a tokio runtime. Dropping the session
/// cancels every timer it owns.
pub struct Session {
    shared: Arc<Shared>,
    store: tokio::sync::Mutex<RouteStore>,
}

impl Session {
    pub fn new(source: Box<dyn RouteSource>, config: PlaybackConfig) -> Self {
        let engine = PlaybackEngine::default();
        let (frames, _) = watch::channel(engine.frame(config.fallback_position));

        Self {
            shared: Arc::new(Mutex::new(Inner {
                engine,
                config,
                ticker: TimerSlot::new("tick"),
                resume: TimerSlot::new("resume"),
                target_clear: TimerSlot::new("target clear"),
                frames,
            })),
            store: tokio::sync::Mutex::new(RouteStore::new(source)),
        }
    }

    fn inner(&self) -> MutexGuard<'_, Inner> {
        lock(&self.shared)
    }

    /// Load the route and make it the working route
    ///
    /// On failure the session keeps whatever it was showing.
    pub async fn load(&self) -> RouteResult<usize> {
        let route = self.store.lock().await.load().await?;
        let count = route.len();
        self.replace_route(route);
        Ok(count)
    }

    /// Swap the working route, rewinding and stopping playback
    pub fn replace_route(&self, route: Route) {
        let mut inner = self.inner();
        inner.cancel_timers();
        inner.engine.replace(route);
        inner.publish();
    }

    /// Start playback. Returns false if there is nothing left to play.
    pub fn play(&self) -> bool {
        let mut inner = self.inner();
        if inner.engine.is_playing() && inner.ticker.is_active() {
            return true;
        }
        let started = inner.start_playing(Arc::downgrade(&self.shared));
        inner.publish();
        started
    }

    pub fn pause(&self) {
        let mut inner = self.inner();
        inner.ticker.cancel();
        inner.resume.cancel();
        inner.engine.pause();
        debug!("Paused at sample {}", inner.engine.position() + 1);
        inner.publish();
    }

    /// Play/Pause button. Returns whether playback is now running.
    pub fn toggle(&self) -> bool {
        if self.state() == PlaybackState::Playing {
            self.pause();
            false
        } else {
            self.play()
        }
    }

    /// Stop, drop any detour and target, and reload the route from its source
    ///
    /// If the reload fails the last successfully loaded route is restored.
    pub async fn reset(&self) {
        {
            let mut inner = self.inner();
            inner.cancel_timers();
            inner.engine.rewind();
            inner.publish();
        }

        let mut store = self.store.lock().await;
        let route = match store.load().await {
            Ok(route) => route,
            Err(_) if !store.loaded().is_empty() => {
                info!("Reload from {} failed; restoring last loaded route", store.source_name());
                store.loaded().clone()
            }
            Err(_) => return,
        };
        self.replace_route(route);
    }

    /// Redirect the vehicle in a straight line to `target`, then resume
    ///
    /// Ignored (returns false) while no route is loaded.
    pub fn click_at(&self, target: Coordinate) -> bool {
        let mut inner = self.inner();
        inner.cancel_timers();

        let steps = inner.config.synth_steps;
        if !inner.engine.redirect(target, steps, Utc::now()) {
            debug!("Ignoring click with no route loaded");
            return false;
        }
        info!(
            "Redirecting to {:.6}, {:.6} over {} steps",
            target.latitude, target.longitude, steps
        );

        let weak = Arc::downgrade(&self.shared);
        let delay = inner.config.resume_delay;
        inner.resume.start_once(delay, move |generation| {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            let mut inner = lock(&shared);
            if inner.resume.is_current(generation) {
                inner.start_playing(weak);
                inner.publish();
            }
        });

        inner.publish();
        true
    }

    /// Receive a frame after every state change
    pub fn subscribe(&self) -> watch::Receiver<RenderFrame> {
        self.inner().frames.subscribe()
    }

    /// Current frame
    pub fn frame(&self) -> RenderFrame {
        let inner = self.inner();
        inner.engine.frame(inner.config.fallback_position)
    }

    pub fn state(&self) -> PlaybackState {
        self.inner().engine.state()
    }

    /// Whether the tick task is live
    pub fn is_ticking(&self) -> bool {
        self.inner().ticker.is_active()
    }

    /// Whether a click-to-target resume is still pending
    pub fn resume_pending(&self) -> bool {
        self.inner().resume.is_active()
    }

    /// Stop playback and cancel every timer
    pub fn shutdown(&self) {
        let mut inner = self.inner();
        inner.cancel_timers();
        inner.engine.pause();
        debug!("Session shut down");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Sample;
    use crate::input::MemoryRouteSource;
    use crate::telemetry::haversine_km;
    use chrono::{DateTime, Duration as ChronoDuration, TimeZone};
    use std::time::Duration;
    use tokio::time::sleep;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap()
    }

    fn two_point_route() -> Route {
        vec![
            Sample::new(17.0, 78.0, t0()),
            Sample::new(17.001, 78.001, t0() + ChronoDuration::seconds(60)),
        ]
    }

    fn straight_route(n: usize) -> Route {
        (0..n)
            .map(|i| Sample::new(17.0 + i as f64 * 0.001, 78.0, t0() + ChronoDuration::seconds(i as i64 * 10)))
            .collect()
    }

    async fn loaded_session(route: Route) -> (Session, MemoryRouteSource) {
        let source = MemoryRouteSource::new(route);
        let session = Session::new(Box::new(source.clone()), PlaybackConfig::default());
        session.load().await.unwrap();
        (session, source)
    }

    #[tokio::test(start_paused = true)]
    async fn test_play_to_end_auto_stops() {
        let (session, _) = loaded_session(two_point_route()).await;

        assert!(session.play());
        assert!(session.is_ticking());

        sleep(Duration::from_millis(600)).await;
        let frame = session.frame();
        assert_eq!(frame.current_index, 1);
        assert!(!frame.is_playing);
        assert!(!session.is_ticking());

        let expected = haversine_km(17.0, 78.0, 17.001, 78.001) / (1.0 / 60.0);
        assert!((frame.current_speed_kmh - expected).abs() < 1e-9);

        // at the end, play is refused
        assert!(!session.play());
    }

    #[tokio::test(start_paused = true)]
    async fn test_repeated_play_keeps_one_timer() {
        let (session, _) = loaded_session(straight_route(10)).await;

        assert!(session.play());
        assert!(session.play());
        assert!(session.play());

        sleep(Duration::from_millis(1100)).await;
        assert_eq!(session.frame().current_index, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_tick_interval_still_plays_to_end() {
        let source = MemoryRouteSource::new(straight_route(5));
        let config = PlaybackConfig {
            tick_interval: Duration::ZERO,
            ..PlaybackConfig::default()
        };
        let session = Session::new(Box::new(source), config);
        session.load().await.unwrap();

        assert!(session.play());
        assert!(session.is_ticking());

        sleep(Duration::from_millis(1000)).await;
        let frame = session.frame();
        assert_eq!(frame.current_index, 4);
        assert!(!frame.is_playing);
        assert!(!session.is_ticking());
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_cancels_ticks() {
        let (session, _) = loaded_session(straight_route(10)).await;

        session.play();
        sleep(Duration::from_millis(600)).await;
        session.pause();
        assert!(!session.is_ticking());
        assert_eq!(session.state(), PlaybackState::Stopped);

        sleep(Duration::from_millis(3000)).await;
        assert_eq!(session.frame().current_index, 1);

        assert!(session.toggle());
        assert!(!session.toggle());
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribers_see_ticks() {
        let (session, _) = loaded_session(straight_route(5)).await;
        let mut frames = session.subscribe();
        frames.borrow_and_update();

        session.play();
        frames.changed().await.unwrap();
        assert!(frames.borrow_and_update().is_playing);

        frames.changed().await.unwrap();
        assert_eq!(frames.borrow_and_update().current_index, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_click_redirects_and_resumes() {
        let (session, _) = loaded_session(two_point_route()).await;

        assert!(session.click_at(Coordinate::new(18.0, 79.0)));
        let frame = session.frame();
        assert_eq!(frame.total_count, 17);
        assert_eq!(frame.full_path.last(), Some(&Coordinate::new(18.0, 79.0)));
        assert_eq!(frame.target, Some(Coordinate::new(18.0, 79.0)));
        assert!(!frame.is_playing);
        assert!(session.resume_pending());

        sleep(Duration::from_millis(150)).await;
        assert_eq!(session.state(), PlaybackState::Playing);
        assert!(session.is_ticking());
    }

    #[tokio::test(start_paused = true)]
    async fn test_click_while_playing_stops_first() {
        let (session, _) = loaded_session(straight_route(10)).await;

        session.play();
        sleep(Duration::from_millis(1100)).await;
        assert_eq!(session.frame().current_index, 2);

        session.click_at(Coordinate::new(17.5, 78.5));
        assert_eq!(session.state(), PlaybackState::Stopped);
        assert!(!session.is_ticking());
        assert_eq!(session.frame().total_count, 3 + 16);
    }

    #[tokio::test(start_paused = true)]
    async fn test_pause_during_resume_delay_wins() {
        let (session, _) = loaded_session(two_point_route()).await;

        session.click_at(Coordinate::new(18.0, 79.0));
        session.pause();
        sleep(Duration::from_millis(1000)).await;

        assert_eq!(session.state(), PlaybackState::Stopped);
        assert_eq!(session.frame().current_index, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_target_clears_after_detour_completes() {
        let source = MemoryRouteSource::new(two_point_route());
        let config = PlaybackConfig {
            synth_steps: 2,
            ..PlaybackConfig::default()
        };
        let session = Session::new(Box::new(source), config);
        session.load().await.unwrap();

        session.click_at(Coordinate::new(18.0, 79.0));
        // resume at 100ms, ticks at 600, 1100, 1600
        sleep(Duration::from_millis(2000)).await;
        let frame = session.frame();
        assert_eq!(frame.current_index, 3);
        assert!(!frame.is_playing);
        assert_eq!(frame.target, Some(Coordinate::new(18.0, 79.0)));

        sleep(Duration::from_millis(1700)).await;
        assert_eq!(session.frame().target, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_discards_detour() {
        let (session, source) = loaded_session(two_point_route()).await;

        session.click_at(Coordinate::new(18.0, 79.0));
        sleep(Duration::from_millis(700)).await;
        assert!(session.frame().current_index >= 1);
        assert_eq!(session.state(), PlaybackState::Playing);

        session.reset().await;
        let frame = session.frame();
        assert!(!session.is_ticking());
        assert_eq!(frame.target, None);
        assert_eq!(frame.current_index, 0);
        assert_eq!(frame.total_count, 2);
        assert_eq!(frame.full_path[1], Coordinate::new(17.001, 78.001));
        assert_eq!(source.fetch_count(), 2);

        sleep(Duration::from_millis(3000)).await;
        assert_eq!(session.frame().current_index, 0);
        assert_eq!(session.frame().target, None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_with_failed_reload_restores_loaded_route() {
        let (session, source) = loaded_session(two_point_route()).await;

        session.click_at(Coordinate::new(18.0, 79.0));
        source.set_failing(true);
        session.reset().await;

        let frame = session.frame();
        assert_eq!(frame.total_count, 2);
        assert_eq!(frame.current_index, 0);
        assert!(!session.resume_pending());
    }

    #[tokio::test]
    async fn test_failed_initial_load_keeps_fallback() {
        let source = MemoryRouteSource::new(two_point_route());
        source.set_failing(true);
        let session = Session::new(Box::new(source), PlaybackConfig::default());

        assert!(session.load().await.is_err());
        let frame = session.frame();
        assert_eq!(frame.total_count, 0);
        assert_eq!(frame.current_position, PlaybackConfig::default().fallback_position);
        assert!(!session.play());
        assert!(!session.click_at(Coordinate::new(18.0, 79.0)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_timers() {
        let (session, _) = loaded_session(straight_route(10)).await;
        let mut frames = session.subscribe();

        session.play();
        frames.borrow_and_update();
        drop(session);

        sleep(Duration::from_millis(2000)).await;
        assert_eq!(frames.borrow().current_index, 0);
        assert!(frames.changed().await.is_err());
    }
}
