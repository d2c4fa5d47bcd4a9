//! Fixed-interval tick scheduler.
//!
//! The scheduler only owns timing. The first scheduled tick fires one full
//! interval after `start`; callers wanting an immediate tick run it
//! themselves. Stopping aborts the timer task, dropping the scheduler stops it
//! too.

use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

const MIN_INTERVAL: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Stopped,
    Running,
}

#[derive(Debug, Default)]
pub struct TickScheduler {
    task: Option<JoinHandle<()>>,
    interval: Option<Duration>,
}

impl TickScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SchedulerState {
        match &self.task {
            Some(task) if !task.is_finished() => SchedulerState::Running,
            _ => SchedulerState::Stopped,
        }
    }

    pub fn interval(&self) -> Option<Duration> {
        self.interval
    }

    /// Starts firing `on_tick` every `interval`, replacing any prior schedule.
    pub fn start<F>(&mut self, runtime: &Handle, interval: Duration, mut on_tick: F)
    where
        F: FnMut() + Send + 'static,
    {
        self.stop();

        let interval = interval.max(MIN_INTERVAL);
        let task = runtime.spawn(async move {
            let mut ticker = time::interval_at(Instant::now() + interval, interval);
            // A slow tick pushes the next one back instead of firing a burst.
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                on_tick();
            }
        });

        tracing::debug!(interval_ms = interval.as_millis() as u64, "tick scheduler started");
        self.task = Some(task);
        self.interval = Some(interval);
    }

    /// Returns whether a running schedule was halted.
    pub fn stop(&mut self) -> bool {
        self.interval = None;
        match self.task.take() {
            Some(task) => {
                task.abort();
                tracing::debug!("tick scheduler stopped");
                true
            }
            None => false,
        }
    }
}

impl Drop for TickScheduler {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    fn counter_tick(counter: &Arc<AtomicUsize>) -> impl FnMut() + Send + 'static {
        let counter = Arc::clone(counter);
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fires_once_per_interval_after_start() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let mut scheduler = TickScheduler::new();

        scheduler.start(&Handle::current(), Duration::from_millis(100), counter_tick(&ticks));
        assert_eq!(scheduler.state(), SchedulerState::Running);

        time::sleep(Duration::from_millis(50)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 0);

        time::sleep(Duration::from_millis(260)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_is_idempotent_and_halts_ticks() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let mut scheduler = TickScheduler::new();
        scheduler.start(&Handle::current(), Duration::from_millis(100), counter_tick(&ticks));

        time::sleep(Duration::from_millis(150)).await;
        assert!(scheduler.stop());
        assert!(!scheduler.stop());
        assert_eq!(scheduler.state(), SchedulerState::Stopped);

        time::sleep(Duration::from_millis(500)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn restart_replaces_the_previous_interval() {
        let slow = Arc::new(AtomicUsize::new(0));
        let fast = Arc::new(AtomicUsize::new(0));
        let mut scheduler = TickScheduler::new();

        scheduler.start(&Handle::current(), Duration::from_millis(1_000), counter_tick(&slow));
        scheduler.start(&Handle::current(), Duration::from_millis(10), counter_tick(&fast));
        assert_eq!(scheduler.interval(), Some(Duration::from_millis(10)));

        time::sleep(Duration::from_millis(1_005)).await;
        assert_eq!(slow.load(Ordering::SeqCst), 0);
        assert_eq!(fast.load(Ordering::SeqCst), 100);
    }
}
