//! The miner client surface.

use crate::collector::{
    collecting_ended_at, CollectorState, SettingsSynchronizer, WorkerManager,
};
use crate::context::TickContext;
use crate::error::{MinerError, MinerResult};
use crate::REQUEST_DEADLINE;
use borealis_distribution::{CollectorRepository, CycleNotifier};
use borealis_model::{Clock, Timestamp};
use borealis_tokenomics::Config;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// The long-lived miner engine.
///
/// Owns the collector state shared by every worker, the two barrier
/// signalers and the background tasks (worker-manager and settings
/// synchronizer). Workers are external: they pull user batches, run
/// [`crate::mine`] and [`crate::process_ethereum_coin_distribution`] per
/// user with a [`TickContext`] from [`Miner::tick_context`], and signal
/// cycle boundaries through this handle.
pub struct Miner {
    config: Config,
    state: Arc<CollectorState>,
    repository: Arc<dyn CollectorRepository>,
    clock: Arc<dyn Clock>,
    started_tx: mpsc::Sender<()>,
    ended_tx: mpsc::Sender<()>,
    cancel: CancellationToken,
    tasks: Vec<JoinHandle<()>>,
}

impl Miner {
    /// Boot the engine.
    ///
    /// Fetches the initial collector settings (missing configuration at boot
    /// is fatal) and spawns the worker-manager and the settings
    /// synchronizer.
    pub async fn start(
        config: Config,
        repository: Arc<dyn CollectorRepository>,
        notifier: Arc<dyn CycleNotifier>,
        clock: Arc<dyn Clock>,
    ) -> MinerResult<Self> {
        if config.workers <= 0 {
            return Err(MinerError::Bootstrap(
                "workers must be positive".to_string(),
            ));
        }
        let settings = timeout(REQUEST_DEADLINE, repository.get_collector_settings())
            .await
            .map_err(|_| {
                MinerError::Bootstrap("timed out fetching initial collector settings".to_string())
            })?
            .map_err(|err| {
                MinerError::Bootstrap(format!("initial collector settings unavailable: {err}"))
            })?;

        let state = Arc::new(CollectorState::new(settings));
        let (started_tx, started_rx) = mpsc::channel(config.workers as usize);
        let (ended_tx, ended_rx) = mpsc::channel(config.workers as usize);
        let cancel = CancellationToken::new();

        let manager = WorkerManager {
            state: Arc::clone(&state),
            repository: Arc::clone(&repository),
            notifier,
            clock: Arc::clone(&clock),
            workers: config.workers,
            cycle_mutex: Arc::new(tokio::sync::Mutex::new(())),
        };
        let manager_task = tokio::spawn(manager.run(started_rx, ended_rx, cancel.clone()));

        let synchronizer = SettingsSynchronizer {
            state: Arc::clone(&state),
            repository: Arc::clone(&repository),
            clock: Arc::clone(&clock),
        };
        let synchronizer_task = tokio::spawn(synchronizer.run(cancel.clone()));

        info!(workers = config.workers, "miner engine started");

        Ok(Self {
            config,
            state,
            repository,
            clock,
            started_tx,
            ended_tx,
            cancel,
            tasks: vec![manager_task, synchronizer_task],
        })
    }

    /// Capture an immutable snapshot for one tick.
    pub fn tick_context(&self) -> TickContext {
        let now = self.clock.now();
        TickContext::new(
            &self.config,
            now,
            self.state.settings(),
            collecting_ended_at(
                self.state.collector_started_at(),
                now,
                self.config.development,
            ),
        )
    }

    /// The engine configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// End of the current collection window at `now`.
    pub fn collection_window_end(&self) -> Timestamp {
        collecting_ended_at(
            self.state.collector_started_at(),
            self.clock.now(),
            self.config.development,
        )
    }

    /// Worker signal: this worker entered the collection phase.
    ///
    /// The signaler is bounded to the worker count; under the barrier
    /// protocol a send can only fail if a worker signals twice in a phase.
    pub fn signal_collection_started(&self) -> MinerResult<()> {
        self.started_tx.try_send(()).map_err(|err| match err {
            mpsc::error::TrySendError::Full(()) => MinerError::SignalerFull("started"),
            mpsc::error::TrySendError::Closed(()) => MinerError::Closed,
        })
    }

    /// Worker signal: this worker finished the collection phase.
    pub fn signal_collection_ended(&self) -> MinerResult<()> {
        self.ended_tx.try_send(()).map_err(|err| match err {
            mpsc::error::TrySendError::Full(()) => MinerError::SignalerFull("ended"),
            mpsc::error::TrySendError::Closed(()) => MinerError::Closed,
        })
    }

    /// Count one distributed user into the cycle totals.
    pub fn record_distribution(&self, amount: f64) {
        self.state.record_distribution(amount);
    }

    /// Swap in the countries for which advanced-team rewards are disabled.
    pub fn set_disabled_advanced_team_countries(&self, countries: Vec<String>) {
        self.state.set_disabled_advanced_team_countries(countries);
    }

    /// Whether advanced-team (T1/T2) rewards are switched off for `country`.
    ///
    /// Workers consult this before counting active referrals into a tick.
    pub fn advanced_team_disabled_for(&self, country: &str) -> bool {
        self.state.advanced_team_disabled_for(country)
    }

    /// Health check: one round-trip to the collector repository.
    pub async fn check_health(&self) -> MinerResult<()> {
        timeout(REQUEST_DEADLINE, self.repository.get_collector_settings())
            .await
            .map_err(|_| MinerError::Unhealthy("collector repository timed out".to_string()))?
            .map_err(|err| MinerError::Unhealthy(err.to_string()))?;

        Ok(())
    }

    /// Shut the engine down: cancel the background tasks and wait for them.
    pub async fn close(mut self) {
        self.cancel.cancel();
        for task in self.tasks.drain(..) {
            let _ = task.await;
        }
        info!("miner engine stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use borealis_distribution::{CollectorSettings, DistributionError, DistributionResult};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct MockRepository {
        settings_calls: AtomicUsize,
        cycle_ended_calls: AtomicUsize,
        fail_settings: bool,
    }

    impl MockRepository {
        fn new() -> Self {
            Self {
                settings_calls: AtomicUsize::new(0),
                cycle_ended_calls: AtomicUsize::new(0),
                fail_settings: false,
            }
        }

        fn failing() -> Self {
            Self {
                fail_settings: true,
                ..Self::new()
            }
        }
    }

    #[async_trait]
    impl CollectorRepository for MockRepository {
        async fn get_collector_settings(&self) -> DistributionResult<CollectorSettings> {
            self.settings_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_settings {
                return Err(DistributionError::Repository("unavailable".to_string()));
            }
            Ok(CollectorSettings::default())
        }

        async fn notify_collection_cycle_ended(&self) -> DistributionResult<()> {
            self.cycle_ended_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct MockNotifier {
        started_calls: AtomicUsize,
        premature_calls: AtomicUsize,
    }

    impl MockNotifier {
        fn new() -> Self {
            Self {
                started_calls: AtomicUsize::new(0),
                premature_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CycleNotifier for MockNotifier {
        async fn cycle_started(&self) -> DistributionResult<()> {
            self.started_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn cycle_ended_prematurely(&self) -> DistributionResult<()> {
            self.premature_calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    async fn wait_until(what: &str, condition: impl Fn() -> bool) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while !condition() {
            assert!(
                tokio::time::Instant::now() < deadline,
                "timed out waiting for {what}"
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    struct FixedClock(Timestamp);

    impl Clock for FixedClock {
        fn now(&self) -> Timestamp {
            self.0
        }
    }

    fn fixed_clock() -> Arc<dyn Clock> {
        Arc::new(FixedClock(Timestamp::from_millis(1_780_000_000_000)))
    }

    fn worker_config(workers: i64) -> Config {
        Config {
            workers,
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn test_start_fails_without_settings() {
        let repository = Arc::new(MockRepository::failing());
        let notifier = Arc::new(MockNotifier::new());

        let result = Miner::start(worker_config(2), repository, notifier, fixed_clock()).await;

        assert!(matches!(result, Err(MinerError::Bootstrap(_))));
    }

    #[tokio::test]
    async fn test_full_cycle_notifies_after_both_barriers() {
        let repository = Arc::new(MockRepository::new());
        let notifier = Arc::new(MockNotifier::new());
        let miner = Miner::start(
            worker_config(2),
            Arc::clone(&repository) as Arc<dyn CollectorRepository>,
            Arc::clone(&notifier) as Arc<dyn CycleNotifier>,
            fixed_clock(),
        )
        .await
        .unwrap();

        miner.signal_collection_started().unwrap();
        miner.signal_collection_started().unwrap();
        miner.signal_collection_ended().unwrap();
        miner.signal_collection_ended().unwrap();

        wait_until("cycle completion", || {
            repository.cycle_ended_calls.load(Ordering::SeqCst) == 1
        })
        .await;

        assert_eq!(notifier.started_calls.load(Ordering::SeqCst), 1);
        assert_eq!(notifier.premature_calls.load(Ordering::SeqCst), 0);

        miner.close().await;
    }

    #[tokio::test]
    async fn test_cancellation_mid_cycle_notifies_prematurely() {
        let repository = Arc::new(MockRepository::new());
        let notifier = Arc::new(MockNotifier::new());
        let miner = Miner::start(
            worker_config(3),
            Arc::clone(&repository) as Arc<dyn CollectorRepository>,
            Arc::clone(&notifier) as Arc<dyn CycleNotifier>,
            fixed_clock(),
        )
        .await
        .unwrap();

        // Only one of three workers signals; the start barrier never fills.
        miner.signal_collection_started().unwrap();
        wait_until("cycle start", || {
            notifier.started_calls.load(Ordering::SeqCst) == 1
        })
        .await;
        miner.close().await;

        assert_eq!(notifier.premature_calls.load(Ordering::SeqCst), 1);
        assert_eq!(repository.cycle_ended_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_signaler_rejects_protocol_violations() {
        let repository = Arc::new(MockRepository::new());
        let notifier = Arc::new(MockNotifier::new());
        let miner = Miner::start(
            worker_config(1),
            Arc::clone(&repository) as Arc<dyn CollectorRepository>,
            Arc::clone(&notifier) as Arc<dyn CycleNotifier>,
            fixed_clock(),
        )
        .await
        .unwrap();

        // Flood the bounded ended-signaler without a running cycle; the
        // second signal exceeds the worker count.
        miner.signal_collection_ended().unwrap();
        let violation = miner.signal_collection_ended();
        assert!(matches!(violation, Err(MinerError::SignalerFull("ended"))));

        miner.close().await;
    }

    #[tokio::test]
    async fn test_check_health_round_trips() {
        let repository = Arc::new(MockRepository::new());
        let notifier = Arc::new(MockNotifier::new());
        let miner = Miner::start(
            worker_config(1),
            Arc::clone(&repository) as Arc<dyn CollectorRepository>,
            Arc::clone(&notifier) as Arc<dyn CycleNotifier>,
            fixed_clock(),
        )
        .await
        .unwrap();

        miner.check_health().await.unwrap();
        assert!(repository.settings_calls.load(Ordering::SeqCst) >= 2);

        miner.close().await;
    }

    #[tokio::test]
    async fn test_tick_context_captures_snapshot() {
        let repository = Arc::new(MockRepository::new());
        let notifier = Arc::new(MockNotifier::new());
        let miner = Miner::start(
            worker_config(1),
            Arc::clone(&repository) as Arc<dyn CollectorRepository>,
            Arc::clone(&notifier) as Arc<dyn CycleNotifier>,
            fixed_clock(),
        )
        .await
        .unwrap();

        let ctx = miner.tick_context();
        assert_eq!(ctx.now, Timestamp::from_millis(1_780_000_000_000));
        assert!(!ctx.dry_run);
        // No cycle running: the window end trails one millisecond behind
        // `now` plus the production window.
        assert_eq!(
            ctx.collection_window_end,
            ctx.now
                .sub(Duration::from_millis(1))
                .add(Duration::from_secs(5 * 60))
        );

        miner.close().await;
    }
}

