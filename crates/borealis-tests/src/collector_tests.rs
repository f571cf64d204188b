//! Collection-cycle barrier tests.
//!
//! Exercises the worker-manager protocol end to end through the `Miner`
//! handle: barrier conservation, sequential cycles, settings refresh and
//! premature termination.

use crate::generators::*;
use crate::harness::{FixedClock, InMemoryCollectorRepository, RecordingNotifier};
use borealis_distribution::{CollectorRepository, CycleNotifier};
use borealis_miner::{Miner, MinerError};
use borealis_model::Clock;
use borealis_tokenomics::Config;
use std::sync::Arc;
use std::time::Duration;

struct Cluster {
    miner: Miner,
    repository: Arc<InMemoryCollectorRepository>,
    notifier: Arc<RecordingNotifier>,
    clock: Arc<FixedClock>,
}

async fn start_cluster(workers: i64) -> Cluster {
    let now = test_now();
    let repository = Arc::new(InMemoryCollectorRepository::new(open_collector_settings(
        now,
    )));
    let notifier = Arc::new(RecordingNotifier::new());
    let clock = Arc::new(FixedClock::at(now));
    let miner = Miner::start(
        Config {
            workers,
            ..Config::default()
        },
        Arc::clone(&repository) as Arc<dyn CollectorRepository>,
        Arc::clone(&notifier) as Arc<dyn CycleNotifier>,
        Arc::clone(&clock) as Arc<dyn Clock>,
    )
    .await
    .expect("miner should boot with reachable settings");

    Cluster {
        miner,
        repository,
        notifier,
        clock,
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

#[tokio::test]
async fn test_cycle_requires_all_start_and_end_signals() {
    let cluster = start_cluster(3).await;

    cluster.miner.signal_collection_started().unwrap();
    cluster.miner.signal_collection_started().unwrap();
    cluster.miner.signal_collection_started().unwrap();
    wait_until("cycle start notification", || {
        cluster.notifier.started_calls() == 1
    })
    .await;
    // All workers started, none ended: the settlement hand-off must wait.
    assert_eq!(cluster.repository.cycle_ended_calls(), 0);

    cluster.miner.signal_collection_ended().unwrap();
    cluster.miner.signal_collection_ended().unwrap();
    assert_eq!(cluster.repository.cycle_ended_calls(), 0);

    cluster.miner.signal_collection_ended().unwrap();
    wait_until("settlement hand-off", || {
        cluster.repository.cycle_ended_calls() == 1
    })
    .await;
    assert_eq!(cluster.notifier.premature_calls(), 0);

    cluster.miner.close().await;
}

#[tokio::test]
async fn test_two_sequential_cycles() {
    let cluster = start_cluster(2).await;

    for round in 1..=2 {
        cluster.miner.signal_collection_started().unwrap();
        cluster.miner.signal_collection_started().unwrap();
        cluster.miner.signal_collection_ended().unwrap();
        cluster.miner.signal_collection_ended().unwrap();
        wait_until("cycle completion", || {
            cluster.repository.cycle_ended_calls() == round
        })
        .await;
    }

    assert_eq!(cluster.notifier.started_calls(), 2);
    assert_eq!(cluster.notifier.premature_calls(), 0);

    cluster.miner.close().await;
}

#[tokio::test]
async fn test_settings_refresh_after_cycle() {
    let cluster = start_cluster(1).await;

    let mut updated = open_collector_settings(test_now());
    updated.min_balance_required = 42.0;
    cluster.repository.update_settings(updated);

    cluster.miner.signal_collection_started().unwrap();
    cluster.miner.signal_collection_ended().unwrap();
    wait_until("cycle completion", || {
        cluster.repository.cycle_ended_calls() == 1
    })
    .await;
    wait_until("settings refresh", || {
        cluster.miner.tick_context().collector_settings.min_balance_required == 42.0
    })
    .await;

    cluster.miner.close().await;
}

#[tokio::test]
async fn test_collection_window_tracks_running_cycle() {
    let cluster = start_cluster(2).await;
    let now = cluster.clock.now();

    // Idle: the window trails just behind `now`.
    let idle_window = cluster.miner.collection_window_end();
    assert_eq!(
        idle_window,
        now.sub(Duration::from_millis(1))
            .add(Duration::from_secs(5 * 60))
    );

    cluster.miner.signal_collection_started().unwrap();
    wait_until("cycle start notification", || {
        cluster.notifier.started_calls() == 1
    })
    .await;

    // Running: anchored at the cycle start.
    let running_window = cluster.miner.collection_window_end();
    assert_eq!(running_window, now.add(Duration::from_secs(5 * 60)));

    cluster.miner.signal_collection_started().unwrap();
    cluster.miner.signal_collection_ended().unwrap();
    cluster.miner.signal_collection_ended().unwrap();
    wait_until("cycle completion", || {
        cluster.repository.cycle_ended_calls() == 1
    })
    .await;

    cluster.miner.close().await;
}

#[tokio::test]
async fn test_shutdown_mid_cycle_sends_premature_notification() {
    let cluster = start_cluster(2).await;

    cluster.miner.signal_collection_started().unwrap();
    wait_until("cycle start notification", || {
        cluster.notifier.started_calls() == 1
    })
    .await;
    cluster.miner.close().await;

    assert_eq!(cluster.notifier.premature_calls(), 1);
    assert_eq!(cluster.repository.cycle_ended_calls(), 0);
}

#[tokio::test]
async fn test_boot_fails_when_repository_is_down() {
    let repository = Arc::new(InMemoryCollectorRepository::new(closed_collector_settings()));
    repository.set_unavailable(true);
    let notifier = Arc::new(RecordingNotifier::new());
    let clock = Arc::new(FixedClock::at(test_now()));

    let result = Miner::start(
        Config::default(),
        Arc::clone(&repository) as Arc<dyn CollectorRepository>,
        notifier as Arc<dyn CycleNotifier>,
        clock as Arc<dyn Clock>,
    )
    .await;

    assert!(matches!(result, Err(MinerError::Bootstrap(_))));
}

#[tokio::test]
async fn test_cycle_totals_are_recorded_and_swapped() {
    let cluster = start_cluster(1).await;

    cluster.miner.record_distribution(10.5);
    cluster.miner.record_distribution(2.25);

    // The totals live until the synchronizer's quarter-hour log drains
    // them; workers only ever add.
    cluster
        .miner
        .set_disabled_advanced_team_countries(vec!["atlantis".to_string()]);
    assert!(cluster.miner.advanced_team_disabled_for("Atlantis"));
    assert!(!cluster.miner.advanced_team_disabled_for("norway"));

    cluster.miner.close().await;
}
