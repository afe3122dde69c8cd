//! Periodic decay sweeps for long-running sessions.
//!
//! [`Tracker::open`] already sweeps once at startup. A session that stays up
//! (`friction watch`) also needs the rules re-applied while it runs, so a hot
//! project cools and a stale today pick expires without a restart.
//!
//! Each tick goes through [`Tracker::sweep`], which re-reads the stored
//! collections under the store lock, so records written by other `friction`
//! invocations between ticks survive the sweep.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::decay::SweepReport;
use crate::tracker::Tracker;

/// A tracker shared between the sweeper and its owner.
pub type SharedTracker = Arc<Mutex<Tracker>>;

/// Handle to a running sweeper task.
#[derive(Debug)]
pub struct Sweeper {
    stop: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

impl Sweeper {
    /// Start sweeping `tracker` every `period` on the current tokio runtime.
    ///
    /// `on_change` runs after each sweep that cooled or expired something.
    /// A failed sweep is logged and the loop keeps going.
    pub fn spawn<F>(tracker: SharedTracker, period: Duration, mut on_change: F) -> Self
    where
        F: FnMut(&SweepReport) + Send + 'static,
    {
        let (stop, mut stopped) = watch::channel(false);
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // First tick fires immediately; opening the tracker swept already.
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => {}
                    changed = stopped.changed() => {
                        if changed.is_err() || *stopped.borrow() {
                            break;
                        }
                        continue;
                    }
                }

                let result = {
                    let mut tracker = tracker.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
                    tracker.sweep()
                };
                match result {
                    Ok(report) if report.changed() => on_change(&report),
                    Ok(_) => tracing::trace!("periodic sweep found nothing to do"),
                    Err(error) => tracing::warn!(error = %error, "periodic decay sweep failed"),
                }
            }
            tracing::debug!("sweeper stopped");
        });

        Self { stop, handle }
    }

    /// Signal the loop to stop and wait for it to finish.
    pub async fn shutdown(self) {
        let _ = self.stop.send(true);
        if let Err(error) = self.handle.await {
            tracing::warn!(error = %error, "sweeper task ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::decay::DecayPolicy;
    use crate::friction::Friction;
    use crate::model::ProjectStatus;
    use crate::storage::MemoryStorage;
    use chrono::{TimeZone, Utc};

    #[tokio::test]
    async fn sweeps_on_each_tick_until_shutdown() {
        let start = Utc.timestamp_millis_opt(1_710_082_800_000).unwrap();
        let clock = ManualClock::new(start);
        let mut tracker = Tracker::open_with_clock(
            MemoryStorage::new(),
            Arc::new(clock.clone()),
            DecayPolicy::default(),
        )
        .unwrap();
        let project = tracker
            .create_project("Idle", ProjectStatus::Hot)
            .unwrap()
            .applied()
            .unwrap();
        let task = tracker
            .create_task(&project.id, "pick me", Friction::None)
            .unwrap()
            .applied()
            .unwrap();
        tracker.toggle_today(&task.id).unwrap();

        let shared: SharedTracker = Arc::new(Mutex::new(tracker));
        let (seen_tx, mut seen_rx) = tokio::sync::mpsc::unbounded_channel();
        let sweeper = Sweeper::spawn(shared.clone(), Duration::from_millis(10), move |report| {
            let _ = seen_tx.send(report.clone());
        });

        clock.advance(chrono::Duration::days(8));
        let report = tokio::time::timeout(Duration::from_secs(5), seen_rx.recv())
            .await
            .expect("sweep within timeout")
            .expect("report");
        assert_eq!(report.cooled, vec![project.id.clone()]);
        assert_eq!(report.expired, vec![task.id.clone()]);

        sweeper.shutdown().await;
        let tracker = shared.lock().unwrap();
        assert_eq!(tracker.project(&project.id).unwrap().status, ProjectStatus::Cold);
        assert_eq!(tracker.task(&task.id).unwrap().friction, Friction::Low);
    }
}
