//! Engine ignition state machine.
//!
//! `Offline -> Ready -> Starting -> Online`, with a failed ignition collapsing
//! back to `Offline` after clearing both ready toggles. The phase is read off
//! the snapshot flags; the machine itself only stores the ignition window.

use crate::controls::ControlId;
use crate::log::{LogEntry, LogLevel};
use crate::ports::RandomSource;
use crate::state::GameState;
use crate::subsystems::SystemSnapshot;
use serde::{Deserialize, Serialize};
use serde_json::json;

pub const IGNITION_DURATION_MS: u64 = 5_000;

const SOURCE: &str = "Engine Control";

/// Master plus both auxiliary power feeds.
pub const ENGINE_SUPPLY: [ControlId; 3] = [
    ControlId::EngineMaster,
    ControlId::EnginePwr1,
    ControlId::EnginePwr2,
];

pub const READY_TOGGLES: [ControlId; 2] = [ControlId::EngineReady1, ControlId::EngineReady2];

/// Every control the priming sequence needs.
pub const ENGINE_PRIMING: [ControlId; 5] = [
    ControlId::EngineMaster,
    ControlId::EnginePwr1,
    ControlId::EnginePwr2,
    ControlId::EngineReady1,
    ControlId::EngineReady2,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IgnitionPhase {
    Offline,
    Ready,
    Starting,
    Online,
}

impl IgnitionPhase {
    pub fn label(self) -> &'static str {
        match self {
            IgnitionPhase::Offline => "OFFLINE",
            IgnitionPhase::Ready => "READY",
            IgnitionPhase::Starting => "STARTING",
            IgnitionPhase::Online => "ONLINE",
        }
    }
}

pub fn phase(systems: &SystemSnapshot) -> IgnitionPhase {
    if systems.engines {
        IgnitionPhase::Online
    } else if systems.engine_starting {
        IgnitionPhase::Starting
    } else if systems.engine_ready {
        IgnitionPhase::Ready
    } else {
        IgnitionPhase::Offline
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnitionRejection {
    AlreadyStarting,
    AlreadyOnline,
    NotPrimed,
    NotRunning,
}

impl IgnitionRejection {
    fn message(self) -> &'static str {
        match self {
            IgnitionRejection::AlreadyStarting => {
                "ENGINE START REJECTED - Ignition sequence already in progress"
            }
            IgnitionRejection::AlreadyOnline => "ENGINE START REJECTED - Engines already online",
            IgnitionRejection::NotPrimed => {
                "ENGINE START REJECTED - Engine power supply not primed"
            }
            IgnitionRejection::NotRunning => "ENGINE STOP REJECTED - Engines are not online",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IgnitionEvent {
    Started,
    Rejected(IgnitionRejection),
    Progress(f64),
    Online,
    Failed { sample: f64, threshold: f64 },
    Stopped,
    Aborted,
    Idle,
}

#[derive(Debug, Clone, Copy)]
pub struct IgnitionSequence {
    duration_ms: u64,
}

impl IgnitionSequence {
    pub fn new(duration_ms: u64) -> Self {
        Self {
            duration_ms: duration_ms.max(1),
        }
    }

    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn start(&self, state: &mut GameState, now: u64) -> IgnitionEvent {
        let rejection = match phase(&state.systems) {
            IgnitionPhase::Starting => Some(IgnitionRejection::AlreadyStarting),
            IgnitionPhase::Online => Some(IgnitionRejection::AlreadyOnline),
            IgnitionPhase::Offline => Some(IgnitionRejection::NotPrimed),
            IgnitionPhase::Ready => None,
        };
        if let Some(rejection) = rejection {
            state.log(LogEntry::new(now, LogLevel::Warning, rejection.message(), SOURCE));
            return IgnitionEvent::Rejected(rejection);
        }

        state.systems.engine_starting = true;
        state.systems.engine_startup_start_time = now;
        state.systems.engine_startup_progress = 0.0;
        state.log(LogEntry::new(
            now,
            LogLevel::Info,
            format!(
                "ENGINE IGNITION SEQUENCE INITIATED - Starter engaged, ignition in {} seconds",
                self.duration_ms / 1000
            ),
            SOURCE,
        ));

        debug_assert!(!state.systems.engines, "ignition started with engines online");
        IgnitionEvent::Started
    }

    /// Advances an ignition in progress. Completes only once the full window
    /// has elapsed since the recorded start, drawing exactly one sample.
    pub fn poll(&self, state: &mut GameState, now: u64, rng: &mut dyn RandomSource) -> IgnitionEvent {
        if !state.systems.engine_starting {
            return IgnitionEvent::Idle;
        }

        let elapsed = now.saturating_sub(state.systems.engine_startup_start_time);
        let progress = (elapsed as f64 * 100.0 / self.duration_ms as f64).min(100.0);

        if elapsed < self.duration_ms {
            state.systems.engine_startup_progress = progress;
            return IgnitionEvent::Progress(progress);
        }

        let sample = rng.sample();
        let threshold = state.systems.starter_damage / 100.0;
        state.systems.engine_starting = false;

        if sample < threshold {
            state.systems.engine_startup_progress = 0.0;
            for id in READY_TOGGLES {
                state.controls.force_switch(id, false);
            }
            state.log(
                LogEntry::new(
                    now,
                    LogLevel::Critical,
                    "ENGINE IGNITION FAILED - Starter malfunction, engine ready switches reset for re-priming",
                    SOURCE,
                )
                .with_data(json!({ "sample": sample, "threshold": threshold })),
            );
            return IgnitionEvent::Failed { sample, threshold };
        }

        state.systems.engines = true;
        state.systems.engine_startup_progress = 100.0;
        state.log(LogEntry::new(
            now,
            LogLevel::System,
            "ENGINES ONLINE - Ignition successful, main drive engaged",
            SOURCE,
        ));
        IgnitionEvent::Online
    }

    pub fn stop(&self, state: &mut GameState, now: u64) -> IgnitionEvent {
        if !state.systems.engines {
            let rejection = IgnitionRejection::NotRunning;
            state.log(LogEntry::new(now, LogLevel::Warning, rejection.message(), SOURCE));
            return IgnitionEvent::Rejected(rejection);
        }

        state.systems.engines = false;
        state.systems.engine_startup_progress = 0.0;
        state.log(LogEntry::new(
            now,
            LogLevel::Warning,
            "ENGINES SHUTDOWN - Main drive disengaged by operator",
            SOURCE,
        ));
        IgnitionEvent::Stopped
    }

    /// Cancels an ignition in progress without drawing a sample.
    pub fn abort(&self, state: &mut GameState, entry: LogEntry) -> IgnitionEvent {
        if !state.systems.engine_starting {
            return IgnitionEvent::Idle;
        }
        state.systems.engine_starting = false;
        state.systems.engine_startup_progress = 0.0;
        state.log(entry);
        IgnitionEvent::Aborted
    }
}

impl Default for IgnitionSequence {
    fn default() -> Self {
        Self::new(IGNITION_DURATION_MS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::FixedSample;

    fn primed_state() -> GameState {
        let mut state = GameState::default();
        for id in ENGINE_PRIMING {
            state.controls.force_switch(id, true);
        }
        state.systems.engine_ready = true;
        state
    }

    #[test]
    fn test_phase_reading() {
        let mut systems = SystemSnapshot::new();
        assert_eq!(phase(&systems), IgnitionPhase::Offline);
        systems.engine_ready = true;
        assert_eq!(phase(&systems), IgnitionPhase::Ready);
        systems.engine_starting = true;
        assert_eq!(phase(&systems), IgnitionPhase::Starting);
    }

    #[test]
    fn test_start_requires_priming() {
        let sequence = IgnitionSequence::default();
        let mut state = GameState::default();
        assert_eq!(
            sequence.start(&mut state, 0),
            IgnitionEvent::Rejected(IgnitionRejection::NotPrimed)
        );
        assert!(!state.systems.engine_starting);
        assert_eq!(state.logs.latest().map(|e| e.level), Some(LogLevel::Warning));
    }

    #[test]
    fn test_second_start_rejected() {
        let sequence = IgnitionSequence::default();
        let mut state = primed_state();
        assert_eq!(sequence.start(&mut state, 1_000), IgnitionEvent::Started);
        assert_eq!(
            sequence.start(&mut state, 1_500),
            IgnitionEvent::Rejected(IgnitionRejection::AlreadyStarting)
        );
        assert_eq!(state.systems.engine_startup_start_time, 1_000);
    }

    #[test]
    fn test_never_completes_early() {
        let sequence = IgnitionSequence::default();
        let mut state = primed_state();
        let mut rng = FixedSample::success();
        sequence.start(&mut state, 10_000);

        assert_eq!(sequence.poll(&mut state, 12_500, &mut rng), IgnitionEvent::Progress(50.0));
        assert_eq!(sequence.poll(&mut state, 14_999, &mut rng), IgnitionEvent::Progress(99.98));
        assert!(!state.systems.engines);
        assert_eq!(sequence.poll(&mut state, 15_000, &mut rng), IgnitionEvent::Online);
        assert!(state.systems.engines);
        assert!(!state.systems.engine_starting);
        assert_eq!(state.systems.engine_startup_progress, 100.0);
    }

    #[test]
    fn test_failure_clears_ready_toggles() {
        let sequence = IgnitionSequence::default();
        let mut state = primed_state();
        state.systems.starter_damage = 100.0;
        sequence.start(&mut state, 0);

        let event = sequence.poll(&mut state, 5_000, &mut FixedSample::failure());
        assert!(matches!(event, IgnitionEvent::Failed { .. }));
        assert!(!state.systems.engines);
        assert!(!state.systems.engine_starting);
        assert!(!state.controls.is_on(ControlId::EngineReady1));
        assert!(!state.controls.is_on(ControlId::EngineReady2));
        assert!(state.controls.is_on(ControlId::EngineMaster));

        let failure = state.logs.latest().cloned();
        assert_eq!(failure.as_ref().map(|e| e.level), Some(LogLevel::Critical));
        assert_eq!(
            failure.and_then(|e| e.data).and_then(|d| d.get("threshold").and_then(|t| t.as_f64())),
            Some(1.0)
        );
    }

    #[test]
    fn test_stop_only_when_online() {
        let sequence = IgnitionSequence::default();
        let mut state = primed_state();
        assert_eq!(
            sequence.stop(&mut state, 0),
            IgnitionEvent::Rejected(IgnitionRejection::NotRunning)
        );
        state.systems.engines = true;
        assert_eq!(sequence.stop(&mut state, 0), IgnitionEvent::Stopped);
        assert!(!state.systems.engines);
    }

    #[test]
    fn test_abort_is_noop_when_idle() {
        let sequence = IgnitionSequence::default();
        let mut state = GameState::default();
        let entry = LogEntry::new(0, LogLevel::Critical, "abort", "Test");
        assert_eq!(sequence.abort(&mut state, entry), IgnitionEvent::Idle);
        assert!(state.logs.is_empty());
    }
}
