//! Test harness.
//!
//! In-memory implementations of the collaborator seams plus a pinned clock,
//! shared by the integration tests.

use async_trait::async_trait;
use borealis_distribution::{
    CollectorRepository, CollectorSettings, CycleNotifier, DistributionError, DistributionResult,
};
use borealis_model::{Clock, Timestamp};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Install a compact tracing subscriber writing through the test harness.
/// Safe to call from every test; only the first call installs.
pub fn init_test_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// In-memory collector repository.
pub struct InMemoryCollectorRepository {
    settings: Mutex<CollectorSettings>,
    unavailable: AtomicBool,
    settings_calls: AtomicUsize,
    cycle_ended_calls: AtomicUsize,
}

impl InMemoryCollectorRepository {
    pub fn new(settings: CollectorSettings) -> Self {
        Self {
            settings: Mutex::new(settings),
            unavailable: AtomicBool::new(false),
            settings_calls: AtomicUsize::new(0),
            cycle_ended_calls: AtomicUsize::new(0),
        }
    }

    /// Swap the settings subsequent fetches will observe.
    pub fn update_settings(&self, settings: CollectorSettings) {
        *self.settings.lock() = settings;
    }

    /// Make every call fail until restored.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn settings_calls(&self) -> usize {
        self.settings_calls.load(Ordering::SeqCst)
    }

    pub fn cycle_ended_calls(&self) -> usize {
        self.cycle_ended_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CollectorRepository for InMemoryCollectorRepository {
    async fn get_collector_settings(&self) -> DistributionResult<CollectorSettings> {
        self.settings_calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DistributionError::Repository("unavailable".to_string()));
        }
        Ok(self.settings.lock().clone())
    }

    async fn notify_collection_cycle_ended(&self) -> DistributionResult<()> {
        self.cycle_ended_calls.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(DistributionError::Notification("unavailable".to_string()));
        }
        Ok(())
    }
}

/// Cycle notifier that records every notification.
#[derive(Default)]
pub struct RecordingNotifier {
    started_calls: AtomicUsize,
    premature_calls: AtomicUsize,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn started_calls(&self) -> usize {
        self.started_calls.load(Ordering::SeqCst)
    }

    pub fn premature_calls(&self) -> usize {
        self.premature_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CycleNotifier for RecordingNotifier {
    async fn cycle_started(&self) -> DistributionResult<()> {
        self.started_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn cycle_ended_prematurely(&self) -> DistributionResult<()> {
        self.premature_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// A clock pinned to a settable instant.
pub struct FixedClock {
    now: Mutex<Timestamp>,
}

impl FixedClock {
    pub fn at(now: Timestamp) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Move the clock.
    pub fn set(&self, now: Timestamp) {
        *self.now.lock() = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        *self.now.lock()
    }
}
