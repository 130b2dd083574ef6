use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{error, info};

use crate::commands::giveaway::coordinator::{LifecycleCoordinator, SweepReport};
use crate::commands::giveaway::models::now_millis;

pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(10);

/// Periodically completes expired giveaways. Ticks never overlap: the next
/// one starts only after the previous sweep has returned.
pub struct ExpiryScheduler {
    coordinator: Arc<LifecycleCoordinator>,
    interval: Duration,
    shutdown: watch::Sender<bool>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ExpiryScheduler {
    pub fn new(coordinator: Arc<LifecycleCoordinator>, interval: Duration) -> Self {
        let (shutdown, _) = watch::channel(false);

        ExpiryScheduler {
            coordinator,
            interval,
            shutdown,
            handle: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    // Runs one sweep against the current time.
    pub fn tick(&self) -> SweepReport {
        self.coordinator.sweep(now_millis())
    }

    pub fn is_running(&self) -> bool {
        let handle = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        match handle.as_ref() {
            Some(handle) => !handle.is_finished(),
            None => false,
        }
    }

    // Spawns the background loop. The first sweep happens immediately.
    pub fn start(&self) {
        let mut handle = self.handle.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(running) = handle.as_ref() {
            if !running.is_finished() {
                return;
            }
        }

        self.shutdown.send_replace(false);
        let mut shutdown = self.shutdown.subscribe();
        let coordinator = self.coordinator.clone();
        let period = self.interval;

        *handle = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!("Giveaway expiry scheduler started (every {:?})", period);

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let report = coordinator.sweep(now_millis());
                        if !report.is_empty() {
                            info!("Sweep completed {} giveaway(s)", report.completed.len());
                        }
                    }
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break;
                        }
                    }
                }
            }

            info!("Giveaway expiry scheduler stopped");
        }));
    }

    // Signals the loop to exit and waits for it.
    pub async fn stop(&self) {
        self.shutdown.send_replace(true);

        let handle = self
            .handle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            if let Err(err) = handle.await {
                error!("Giveaway expiry scheduler failed: {}", err);
            }
        }
    }
}
