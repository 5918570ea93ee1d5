//! Fixed-interval trigger for poll-style connectors.
//!
//! The task runs once immediately, then whenever the interval has elapsed
//! since the previous run completed. The due check happens once per tick
//! (1 s by default), so a raised stop signal is honoured within a tick.
//! Runs never overlap and late ticks are not caught up.

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use crate::context::StopSignal;

pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct Scheduler {
    interval: Duration,
    tick: Duration,
    stop: StopSignal,
}

impl Scheduler {
    pub fn new(interval: Duration, stop: StopSignal) -> Self {
        Self {
            interval,
            tick: DEFAULT_TICK,
            stop,
        }
    }

    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub fn stop_signal(&self) -> &StopSignal {
        &self.stop
    }

    /// Run `task` until the stop signal is raised. Returns how many times
    /// it ran, including the initial call.
    pub async fn schedule<F, Fut>(&self, mut task: F) -> usize
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ()>,
    {
        task().await;
        let mut runs = 1;
        let mut next_due = Instant::now() + self.interval;

        while !self.stop.is_raised() {
            tokio::time::sleep(self.tick).await;
            if self.stop.is_raised() {
                break;
            }
            if Instant::now() >= next_due {
                debug!("Scheduled run #{} due", runs + 1);
                task().await;
                runs += 1;
                next_due = Instant::now() + self.interval;
            }
        }

        debug!("Scheduler stopped after {} run(s)", runs);
        runs
    }
}
