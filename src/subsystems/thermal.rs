use crate::log::{self, LogEntry};
use crate::subsystems::engine::{self, IgnitionPhase};
use crate::subsystems::{NumericField, SystemSnapshot, REACTOR_IDLE_C, REACTOR_MAX_C};

const COLD_TARGET_C: f64 = 0.0;
const PRIMED_TARGET_C: f64 = 1000.0;
const IGNITION_TARGET_C: f64 = 2000.0;
const RUNNING_TARGET_C: f64 = 2200.0;

/// Proportional gain of the approach, per second.
const APPROACH_GAIN: f64 = 0.1;
const MIN_RATE_C_PER_S: f64 = 2.0;

/// Temperature the reactor is heading for in the current engine phase.
pub fn target_temperature(systems: &SystemSnapshot) -> f64 {
    match engine::phase(systems) {
        IgnitionPhase::Online => RUNNING_TARGET_C,
        IgnitionPhase::Starting => IGNITION_TARGET_C,
        _ if !systems.power => COLD_TARGET_C,
        IgnitionPhase::Ready => PRIMED_TARGET_C,
        IgnitionPhase::Offline => REACTOR_IDLE_C,
    }
}

/// Fastest allowed approach toward `target`, degrees per second.
pub fn max_rate(target: f64) -> f64 {
    if target >= IGNITION_TARGET_C {
        20.0
    } else if target >= PRIMED_TARGET_C {
        10.0
    } else if target <= COLD_TARGET_C {
        5.0
    } else {
        2.0
    }
}

/// Moves `current` toward `target` over `dt_ms` without passing it.
pub fn approach(current: f64, target: f64, dt_ms: u64) -> f64 {
    let diff = target - current;
    if diff == 0.0 {
        return current;
    }

    let rate = (diff.abs() * APPROACH_GAIN).clamp(MIN_RATE_C_PER_S, max_rate(target));
    let step = rate * dt_ms as f64 / 1000.0;

    let next = if step >= diff.abs() {
        target
    } else {
        current + step * diff.signum()
    };
    next.clamp(0.0, REACTOR_MAX_C)
}

/// One reactor step. Returns an entry when the temperature changes band.
pub fn step(systems: &mut SystemSnapshot, dt_ms: u64, now: u64) -> Option<LogEntry> {
    let previous = systems.reactor_temperature;
    let next = approach(previous, target_temperature(systems), dt_ms);
    systems.reactor_temperature = next;

    debug_assert!(
        (0.0..=REACTOR_MAX_C).contains(&systems.reactor_temperature),
        "reactor temperature {} outside 0-{}",
        systems.reactor_temperature,
        REACTOR_MAX_C
    );

    log::numeric_entry(NumericField::ReactorTemperature, previous, next, now)
}
