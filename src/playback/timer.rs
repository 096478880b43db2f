use std::ops::ControlFlow;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Shortest period an interval will run at; tokio rejects a zero period
pub const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Owned handle for one background timer task
///
/// Starting a slot cancels whatever it was running before, so a slot never
/// has more than one live task. Every start and cancel bumps a generation
/// counter; callbacks receive the generation they were started with and
/// should check [`TimerSlot::is_current`] before touching shared state, since
/// an aborted task can still be blocked on a lock when the abort lands.
///
/// Must be started from within a tokio runtime. Dropping the slot cancels
/// the task.
pub struct TimerSlot {
    name: &'static str,
    handle: Option<JoinHandle<()>>,
    generation: u64,
}

impl TimerSlot {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            handle: None,
            generation: 0,
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether a callback started with `generation` is still the live one
    pub fn is_current(&self, generation: u64) -> bool {
        self.handle.is_some() && self.generation == generation
    }

    /// Whether a task is scheduled and has not yet finished
    pub fn is_active(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Call `on_tick` every `period`, first after one full period, until it
    /// returns `Break` or the slot is cancelled. Periods below [`MIN_PERIOD`]
    /// are raised to it.
    pub fn start_interval<F>(&mut self, period: Duration, mut on_tick: F)
    where
        F: FnMut(u64) -> ControlFlow<()> + Send + 'static,
    {
        self.cancel();
        let generation = self.generation;
        let period = period.max(MIN_PERIOD);

        self.handle = Some(tokio::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if on_tick(generation).is_break() {
                    break;
                }
            }
        }));
    }

    /// Call `f` once after `delay`, unless the slot is cancelled first
    pub fn start_once<F>(&mut self, delay: Duration, f: F)
    where
        F: FnOnce(u64) + Send + 'static,
    {
        self.cancel();
        let generation = self.generation;

        self.handle = Some(tokio::spawn(async move {
            time::sleep(delay).await;
            f(generation);
        }));
    }

    /// Abort the running task, if any. Returns whether one was still live.
    pub fn cancel(&mut self) -> bool {
        self.generation = self.generation.wrapping_add(1);
        match self.handle.take() {
            Some(handle) => {
                let live = !handle.is_finished();
                handle.abort();
                if live {
                    tracing::trace!("Cancelled {} timer", self.name);
                }
                live
            }
            None => false,
        }
    }
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        self.cancel();
    }
}
