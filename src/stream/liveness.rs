//! Stream liveness watchdog.
//!
//! The stream loop pushes each event type into a capacity-1 channel with
//! `try_send`; a full channel drops the signal. A separate task consumes it
//! and flips an alive flag when no traffic was seen within the timeout.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::context::StopSignal;

/// How often the monitor re-evaluates the timeout and the stop signal.
pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(1);

/// Non-blocking producer side, held by the stream loop.
#[derive(Debug, Clone)]
pub struct LivenessSender {
    tx: mpsc::Sender<String>,
    dropped: Arc<AtomicU64>,
}

impl LivenessSender {
    /// Capacity-1 queue.
    pub fn channel() -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(1);
        (
            Self {
                tx,
                dropped: Arc::new(AtomicU64::new(0)),
            },
            rx,
        )
    }

    /// Push an event type. Never waits; returns whether it was queued.
    pub fn signal(&self, event_type: &str) -> bool {
        match self.tx.try_send(event_type.to_string()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => false,
        }
    }

    /// Signals dropped because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

/// Observer side of a running monitor.
#[derive(Debug)]
pub struct LivenessHandle {
    alive: Arc<AtomicBool>,
    seen: Arc<AtomicU64>,
    task: JoinHandle<()>,
}

impl LivenessHandle {
    /// Whether traffic was observed within the timeout window.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Events consumed by the monitor so far.
    pub fn events_seen(&self) -> u64 {
        self.seen.load(Ordering::Relaxed)
    }

    /// Wait for the monitor task to exit.
    pub async fn join(self) {
        if let Err(e) = self.task.await {
            warn!("Liveness monitor task failed: {}", e);
        }
    }
}

/// Watchdog over the stream's event queue.
#[derive(Debug, Clone)]
pub struct LivenessMonitor {
    timeout: Duration,
    check_interval: Duration,
    stop: StopSignal,
    alive: Arc<AtomicBool>,
}

impl LivenessMonitor {
    pub fn new(timeout: Duration, stop: StopSignal) -> Self {
        Self {
            timeout,
            check_interval: DEFAULT_CHECK_INTERVAL,
            stop,
            alive: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Publish the alive flag into an existing health indicator.
    pub fn with_alive_flag(mut self, alive: Arc<AtomicBool>) -> Self {
        self.alive = alive;
        self
    }

    pub fn with_check_interval(mut self, interval: Duration) -> Self {
        self.check_interval = interval;
        self
    }

    /// Spawn the monitor; returns the producer for the stream loop.
    ///
    /// The task ends when the stop signal is raised or every sender is
    /// dropped. The start time counts as the first observation.
    pub fn spawn(self) -> (LivenessSender, LivenessHandle) {
        let (sender, rx) = LivenessSender::channel();
        let alive = Arc::clone(&self.alive);
        alive.store(true, Ordering::SeqCst);
        let seen = Arc::new(AtomicU64::new(0));

        let task = tokio::spawn(self.run(rx, Arc::clone(&alive), Arc::clone(&seen)));

        (sender, LivenessHandle { alive, seen, task })
    }

    async fn run(
        self,
        mut rx: mpsc::Receiver<String>,
        alive: Arc<AtomicBool>,
        seen: Arc<AtomicU64>,
    ) {
        info!("Liveness monitor started (timeout {:?})", self.timeout);
        let mut last_seen = Instant::now();

        loop {
            if self.stop.is_raised() {
                break;
            }

            tokio::select! {
                received = rx.recv() => match received {
                    Some(event_type) => {
                        last_seen = Instant::now();
                        seen.fetch_add(1, Ordering::Relaxed);
                        if !alive.swap(true, Ordering::SeqCst) {
                            info!("Stream traffic resumed ({})", event_type);
                        }
                        debug!("Liveness signal: {}", event_type);
                    }
                    None => break,
                },
                _ = tokio::time::sleep(self.check_interval) => {
                    if last_seen.elapsed() > self.timeout && alive.swap(false, Ordering::SeqCst) {
                        warn!("No stream traffic for {:?}, reporting not alive", self.timeout);
                    }
                }
            }
        }

        info!("Liveness monitor stopped");
    }
}
