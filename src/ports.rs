//! Narrow collaborator interfaces: time, randomness and notifications.
//!
//! The panel only ever reads the clock, draws one sample per ignition attempt
//! and fires named events. Hosts plug in real implementations; tests use the
//! manual clock, fixed samples and the recording notifier.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use tracing::debug;

pub trait Clock: Send {
    /// Milliseconds, monotonic within one clock instance.
    fn now_ms(&self) -> u64;
}

/// Monotonic clock anchored at the wall-clock epoch time of construction.
#[derive(Debug)]
pub struct SystemClock {
    anchor_ms: u64,
    started: Instant,
}

impl SystemClock {
    pub fn new() -> Self {
        let anchor_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_millis() as u64)
            .unwrap_or(0);
        Self {
            anchor_ms,
            started: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        self.anchor_ms + self.started.elapsed().as_millis() as u64
    }
}

/// Settable clock. Clones share the same time.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start_ms)),
        }
    }

    pub fn set(&self, now_ms: u64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, delta_ms: u64) -> u64 {
        self.now.fetch_add(delta_ms, Ordering::SeqCst) + delta_ms
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

pub trait RandomSource: Send {
    /// Uniform sample in `[0, 1)`.
    fn sample(&mut self) -> f64;
}

#[derive(Debug)]
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }
}

impl RandomSource for SeededRandom {
    fn sample(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Always returns the same draw.
#[derive(Debug, Clone, Copy)]
pub struct FixedSample(pub f64);

impl FixedSample {
    /// A draw that never fails ignition.
    pub fn success() -> Self {
        Self(0.999_999)
    }

    /// A draw that fails ignition for any non-zero starter damage.
    pub fn failure() -> Self {
        Self(0.0)
    }
}

impl RandomSource for FixedSample {
    fn sample(&mut self) -> f64 {
        self.0.clamp(0.0, 0.999_999_999)
    }
}

/// Named events for audio/visual feedback. Fire-and-forget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationEvent {
    MasterPowerToggled,
    MainPowerToggled,
    BackupPowerToggled,
    ConsolePowerToggled,
    ShipOnline,
    EngineReady,
    EngineIgnitionCycle,
    EngineOnline,
    EngineHeartbeat,
}

impl NotificationEvent {
    pub fn name(self) -> &'static str {
        match self {
            NotificationEvent::MasterPowerToggled => "master power toggled",
            NotificationEvent::MainPowerToggled => "main power toggled",
            NotificationEvent::BackupPowerToggled => "backup power toggled",
            NotificationEvent::ConsolePowerToggled => "console power toggled",
            NotificationEvent::ShipOnline => "ship online",
            NotificationEvent::EngineReady => "engine ready",
            NotificationEvent::EngineIgnitionCycle => "engine ignition cycle",
            NotificationEvent::EngineOnline => "engine online",
            NotificationEvent::EngineHeartbeat => "engine heartbeat",
        }
    }
}

pub trait Notifier: Send {
    fn notify(&self, event: NotificationEvent);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _event: NotificationEvent) {}
}

/// Emits each event as a debug-level trace.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, event: NotificationEvent) {
        debug!(event = event.name(), "notification");
    }
}

/// Keeps every event it receives. Clones share the same record.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    events: Arc<Mutex<Vec<NotificationEvent>>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<NotificationEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn count(&self, event: NotificationEvent) -> usize {
        self.events().iter().filter(|e| **e == event).count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, event: NotificationEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_is_shared() {
        let clock = ManualClock::new(1_000);
        let view = clock.clone();
        clock.advance(250);
        assert_eq!(view.now_ms(), 1_250);
        view.set(5_000);
        assert_eq!(clock.now_ms(), 5_000);
    }

    #[test]
    fn test_seeded_random_is_reproducible() {
        let mut a = SeededRandom::new(7);
        let mut b = SeededRandom::new(7);
        for _ in 0..16 {
            let sample = a.sample();
            assert!((0.0..1.0).contains(&sample));
            assert_eq!(sample, b.sample());
        }
    }

    #[test]
    fn test_fixed_sample_stays_below_one() {
        assert!(FixedSample(1.0).sample() < 1.0);
        assert_eq!(FixedSample::failure().sample(), 0.0);
    }

    #[test]
    fn test_recording_notifier() {
        let notifier = RecordingNotifier::new();
        notifier.notify(NotificationEvent::ShipOnline);
        notifier.notify(NotificationEvent::EngineHeartbeat);
        notifier.notify(NotificationEvent::EngineHeartbeat);
        assert_eq!(notifier.count(NotificationEvent::EngineHeartbeat), 2);
        assert_eq!(notifier.events().len(), 3);
    }
}
