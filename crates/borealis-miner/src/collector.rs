//! Collection-cycle coordination.
//!
//! One long-lived manager task serializes collection cycles across the
//! worker pool with a two-phase barrier: a cycle begins on the first
//! worker's `started` signal, and the external settlement component is only
//! notified once every worker has signalled both `started` and `ended`.
//! A second task keeps the collector-settings snapshot fresh.

use crate::{REQUEST_DEADLINE, SETTINGS_SYNC_INTERVAL};
use borealis_distribution::{CollectorRepository, CollectorSettings, CycleNotifier};
use borealis_model::{Clock, Timestamp};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Collection window length after the cycle start, production.
const COLLECTING_WINDOW: Duration = Duration::from_secs(5 * 60);

/// Collection window length after the cycle start, development.
const COLLECTING_WINDOW_DEV: Duration = Duration::from_secs(10);

/// Wall minute at which the synchronizer logs aggregate cycle totals.
const TOTALS_LOG_MINUTE: u32 = 15;

/// Shared collector state: the swappable settings snapshot, the running
/// cycle anchor and the per-cycle distribution totals.
pub(crate) struct CollectorState {
    settings: RwLock<Arc<CollectorSettings>>,
    collector_started_at: RwLock<Timestamp>,
    total_count_cycle: AtomicU64,
    total_amount_cycle_centi: AtomicU64,
    disabled_advanced_team_countries: RwLock<Arc<Vec<String>>>,
}

impl CollectorState {
    pub(crate) fn new(settings: CollectorSettings) -> Self {
        Self {
            settings: RwLock::new(Arc::new(settings)),
            collector_started_at: RwLock::new(Timestamp::NIL),
            total_count_cycle: AtomicU64::new(0),
            total_amount_cycle_centi: AtomicU64::new(0),
            disabled_advanced_team_countries: RwLock::new(Arc::new(Vec::new())),
        }
    }

    /// Load the current settings snapshot.
    pub(crate) fn settings(&self) -> Arc<CollectorSettings> {
        Arc::clone(&self.settings.read())
    }

    /// Atomically swap in a fresh settings snapshot.
    pub(crate) fn store_settings(&self, settings: CollectorSettings) {
        *self.settings.write() = Arc::new(settings);
    }

    pub(crate) fn collector_started_at(&self) -> Timestamp {
        *self.collector_started_at.read()
    }

    fn set_collector_started_at(&self, at: Timestamp) {
        *self.collector_started_at.write() = at;
    }

    fn clear_collector_started_at(&self) {
        *self.collector_started_at.write() = Timestamp::NIL;
    }

    /// Count one distributed user and their amount into the cycle totals.
    pub(crate) fn record_distribution(&self, amount: f64) {
        self.total_count_cycle.fetch_add(1, Ordering::Relaxed);
        self.total_amount_cycle_centi
            .fetch_add((amount * 100.0).round() as u64, Ordering::Relaxed);
    }

    /// Reset the cycle totals, returning `(users, amount)`.
    pub(crate) fn swap_cycle_totals(&self) -> (u64, f64) {
        let users = self.total_count_cycle.swap(0, Ordering::Relaxed);
        let amount = self.total_amount_cycle_centi.swap(0, Ordering::Relaxed) as f64 / 100.0;

        (users, amount)
    }

    pub(crate) fn set_disabled_advanced_team_countries(&self, countries: Vec<String>) {
        let countries: Vec<String> = countries.into_iter().map(|c| c.to_lowercase()).collect();
        *self.disabled_advanced_team_countries.write() = Arc::new(countries);
    }

    /// Whether advanced-team (T1/T2) rewards are switched off for `country`.
    pub(crate) fn advanced_team_disabled_for(&self, country: &str) -> bool {
        let countries = Arc::clone(&self.disabled_advanced_team_countries.read());
        let country = country.to_lowercase();

        countries.iter().any(|c| *c == country)
    }
}

/// Length of one collection window.
pub(crate) fn collecting_window(development: bool) -> Duration {
    if development {
        COLLECTING_WINDOW_DEV
    } else {
        COLLECTING_WINDOW
    }
}

/// End of the current collection window.
///
/// Anchored at the running cycle's start; with no cycle running the anchor
/// is one millisecond in the past.
pub(crate) fn collecting_ended_at(
    collector_started_at: Timestamp,
    now: Timestamp,
    development: bool,
) -> Timestamp {
    let anchor = if collector_started_at.is_nil() {
        now.sub(Duration::from_millis(1))
    } else {
        collector_started_at
    };

    anchor.add(collecting_window(development))
}

/// The collection-cycle worker-manager.
pub(crate) struct WorkerManager {
    pub(crate) state: Arc<CollectorState>,
    pub(crate) repository: Arc<dyn CollectorRepository>,
    pub(crate) notifier: Arc<dyn CycleNotifier>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) workers: i64,
    pub(crate) cycle_mutex: Arc<tokio::sync::Mutex<()>>,
}

impl WorkerManager {
    /// Run cycles until cancellation or signaler shutdown.
    pub(crate) async fn run(
        self,
        mut started_rx: mpsc::Receiver<()>,
        mut ended_rx: mpsc::Receiver<()>,
        cancel: CancellationToken,
    ) {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                signal = started_rx.recv() => {
                    if signal.is_none() {
                        return;
                    }
                }
            }
            if !self
                .run_cycle(&mut started_rx, &mut ended_rx, &cancel)
                .await
            {
                return;
            }
        }
    }

    /// Run one full cycle. Returns false when the manager must exit.
    ///
    /// The cycle mutex is held from the first `started` signal until the
    /// settlement hand-off completes (or the cycle aborts), which is what
    /// guarantees at most one active cycle.
    async fn run_cycle(
        &self,
        started_rx: &mut mpsc::Receiver<()>,
        ended_rx: &mut mpsc::Receiver<()>,
        cancel: &CancellationToken,
    ) -> bool {
        let _cycle_guard = self.cycle_mutex.lock().await;
        info!("started collecting coin distributions");
        let before = self.clock.now();
        self.state.set_collector_started_at(before);
        self.notify_cycle_started().await;

        let mut workers_started: i64 = 1;
        while workers_started < self.workers {
            tokio::select! {
                _ = cancel.cancelled() => {
                    self.notify_cycle_ended_prematurely().await;
                    return false;
                }
                signal = started_rx.recv() => match signal {
                    Some(()) => workers_started += 1,
                    None => {
                        self.notify_cycle_ended_prematurely().await;
                        return false;
                    }
                }
            }
        }

        let mut workers_ended: i64 = 0;
        while workers_ended < self.workers {
            tokio::select! {
                _ = cancel.cancelled() => {
                    self.notify_cycle_ended_prematurely().await;
                    return false;
                }
                signal = ended_rx.recv() => match signal {
                    Some(()) => workers_ended += 1,
                    None => {
                        self.notify_cycle_ended_prematurely().await;
                        return false;
                    }
                }
            }
        }

        self.notify_collection_cycle_ended(cancel).await;
        let after = self.clock.now();
        info!(
            elapsed_hours = after.hours_since(before),
            "finished collecting coin distributions"
        );
        self.state.clear_collector_started_at();

        true
    }

    /// Best-effort "cycle started" notification.
    async fn notify_cycle_started(&self) {
        match timeout(REQUEST_DEADLINE, self.notifier.cycle_started()).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => error!(error = %err, "failed to send cycle-started notification"),
            Err(_) => error!("timed out sending cycle-started notification"),
        }
    }

    /// Best-effort "cycle ended prematurely" notification.
    async fn notify_cycle_ended_prematurely(&self) {
        match timeout(REQUEST_DEADLINE, self.notifier.cycle_ended_prematurely()).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                error!(error = %err, "failed to send cycle-ended-prematurely notification");
            }
            Err(_) => error!("timed out sending cycle-ended-prematurely notification"),
        }
    }

    /// Tell the settlement component the cycle ended and refresh the
    /// settings snapshot, each retried until success or cancellation.
    async fn notify_collection_cycle_ended(&self, cancel: &CancellationToken) {
        while !cancel.is_cancelled() {
            match timeout(REQUEST_DEADLINE, self.repository.notify_collection_cycle_ended()).await
            {
                Ok(Ok(())) => break,
                Ok(Err(err)) => error!(error = %err, "failed to notify collection cycle ended"),
                Err(_) => error!("timed out notifying collection cycle ended"),
            }
        }
        while !cancel.is_cancelled() {
            match timeout(REQUEST_DEADLINE, self.repository.get_collector_settings()).await {
                Ok(Ok(settings)) => {
                    self.state.store_settings(settings);
                    break;
                }
                Ok(Err(err)) => error!(error = %err, "failed to get collector settings"),
                Err(_) => error!("timed out fetching collector settings"),
            }
        }
    }
}

/// Background task keeping the collector-settings snapshot fresh.
pub(crate) struct SettingsSynchronizer {
    pub(crate) state: Arc<CollectorState>,
    pub(crate) repository: Arc<dyn CollectorRepository>,
    pub(crate) clock: Arc<dyn Clock>,
}

impl SettingsSynchronizer {
    pub(crate) async fn run(self, cancel: CancellationToken) {
        let start = tokio::time::Instant::now() + SETTINGS_SYNC_INTERVAL;
        let mut ticker = tokio::time::interval_at(start, SETTINGS_SYNC_INTERVAL);

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return,
                _ = ticker.tick() => {
                    if self.clock.now().minute() == TOTALS_LOG_MINUTE {
                        let (users, amount) = self.state.swap_cycle_totals();
                        if users > 0 {
                            info!(users, amount, "current eth coins collected");
                        }
                    }
                    match timeout(REQUEST_DEADLINE, self.repository.get_collector_settings()).await
                    {
                        Ok(Ok(settings)) => self.state.store_settings(settings),
                        Ok(Err(err)) => error!(error = %err, "failed to get collector settings"),
                        Err(_) => error!("timed out fetching collector settings"),
                    }
                }
            }
        }
    }
}
