use std::time::Duration;

use tokio::time::{interval, interval_at, Instant, Interval, MissedTickBehavior};
use tracing::debug;

/// A named fixed-period timer that can be started late and cancelled.
///
/// A task is idle until started; an idle or cancelled task's `tick` never
/// resolves, so it can sit in a `select!` unconditionally. Ticks missed
/// while the loop was busy are skipped rather than replayed.
#[derive(Debug)]
pub struct PeriodicTask {
    name: &'static str,
    period: Duration,
    timer: Option<Interval>,
}

impl PeriodicTask {
    pub fn new(name: &'static str, period: Duration) -> Self {
        Self {
            name,
            period,
            timer: None,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn is_running(&self) -> bool {
        self.timer.is_some()
    }

    /// Start ticking now. Must be called from within a tokio runtime.
    pub fn start(&mut self) {
        self.install(interval(self.period));
    }

    /// Start ticking one period from now.
    pub fn start_delayed(&mut self) {
        self.install(interval_at(Instant::now() + self.period, self.period));
    }

    fn install(&mut self, mut timer: Interval) {
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);
        debug!(task = self.name, period_ms = self.period.as_millis() as u64, "periodic task started");
        self.timer = Some(timer);
    }

    pub fn cancel(&mut self) {
        if self.timer.take().is_some() {
            debug!(task = self.name, "periodic task cancelled");
        }
    }

    pub async fn tick(&mut self) -> Instant {
        match self.timer.as_mut() {
            Some(timer) => timer.tick().await,
            None => std::future::pending().await,
        }
    }
}
