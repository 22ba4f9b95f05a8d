use proptest::prelude::*;
use shipdeck::controls::{ControlId, ControlKind, ControlStore, CONSOLE_SELECTOR};
use shipdeck::derivation;
use shipdeck::log::{LogBuffer, LogEntry, LogLevel, LOG_CAPACITY};
use shipdeck::safety::{InterlockMonitor, RULE_COUNT};
use shipdeck::state::GameState;
use shipdeck::subsystems::engine::IgnitionSequence;
use shipdeck::subsystems::fuel::{self, FUEL_TICK_AMOUNT};
use shipdeck::subsystems::{FuelTanks, Reservoir, SystemSnapshot};

fn switches() -> Vec<ControlId> {
    ControlId::ALL
        .iter()
        .copied()
        .filter(|id| id.kind() == ControlKind::Switch)
        .collect()
}

fn state_with(on: &[bool], engines: bool, starting: bool) -> GameState {
    let mut state = GameState::default();
    for (id, on) in switches().into_iter().zip(on.iter()) {
        state.controls.force_switch(id, *on);
    }
    state.systems.engines = engines;
    state.systems.engine_starting = starting && !engines;
    state
}

proptest! {
    #[test]
    fn test_exactly_one_console_selected(picks in prop::collection::vec(0usize..8, 1..40)) {
        let mut controls = ControlStore::new();
        for pick in picks.iter() {
            controls.toggle_id(CONSOLE_SELECTOR[*pick]);
        }
        let selected = CONSOLE_SELECTOR.iter().filter(|id| controls.is_on(**id)).count();
        prop_assert_eq!(selected, 1);
        let last = picks[picks.len() - 1];
        prop_assert!(controls.is_on(CONSOLE_SELECTOR[last]));
    }

    #[test]
    fn test_drain_conserves_fuel(
        levels in prop::collection::vec(0.0f64..=100.0, 8),
        amount in 0.0f64..50.0,
    ) {
        let mut tanks = FuelTanks::uniform(0.0);
        for (reservoir, level) in Reservoir::ALL.iter().zip(levels.iter()) {
            tanks.set_level(*reservoir, *level);
        }
        let before = tanks.clone();

        let drained = tanks.drain(amount);
        prop_assert!(drained >= 0.0 && drained <= amount + 1e-9);
        prop_assert!((before.total() - tanks.total() - drained).abs() < 1e-6);

        // Anything taken from a reservoir means every earlier one is dry
        let mut seen_partial = false;
        for reservoir in Reservoir::ALL {
            let after = tanks.level(reservoir);
            prop_assert!(after >= 0.0);
            if seen_partial {
                prop_assert_eq!(after, before.level(reservoir));
            }
            if after > 0.0 {
                seen_partial = true;
            }
        }
    }

    #[test]
    fn test_burn_ticks_conserve_fuel(ticks in 1usize..2000) {
        let mut systems = SystemSnapshot::new();
        let before = systems.fuel.total();
        let mut drained = 0.0;
        for n in 0..ticks {
            drained += fuel::consume(&mut systems, FUEL_TICK_AMOUNT, n as u64).0;
            for reservoir in Reservoir::ALL {
                prop_assert!(systems.fuel.level(reservoir) >= 0.0);
            }
        }
        let expected = (ticks as f64 * FUEL_TICK_AMOUNT).min(before);
        prop_assert!((drained - expected).abs() < 1e-6);
        prop_assert!((before - systems.fuel.total() - drained).abs() < 1e-6);
    }

    #[test]
    fn test_log_ring_bound(count in 0u64..400) {
        let mut logs = LogBuffer::new();
        for n in 0..count {
            logs.push(LogEntry::new(n, LogLevel::Info, "tick", "Test"));
        }
        prop_assert!(logs.len() <= LOG_CAPACITY);
        prop_assert_eq!(logs.total_appended(), count);
        if count > 0 {
            prop_assert_eq!(logs.latest().map(|e| e.timestamp), Some(count - 1));
        }
        let kept: Vec<u64> = logs.iter().map(|e| e.timestamp).collect();
        let expected: Vec<u64> = (count.saturating_sub(LOG_CAPACITY as u64)..count).collect();
        prop_assert_eq!(kept, expected);
    }

    #[test]
    fn test_derivation_is_idempotent(on in prop::collection::vec(any::<bool>(), 120)) {
        let mut state = state_with(&on, false, false);
        derivation::refresh(&mut state, 0);
        let settled = state.systems.clone();

        prop_assert_eq!(derivation::refresh(&mut state, 1), 0);
        prop_assert_eq!(&state.systems, &settled);
    }

    #[test]
    fn test_settle_is_bounded(
        on in prop::collection::vec(any::<bool>(), 120),
        engines in any::<bool>(),
        starting in any::<bool>(),
        navigation in any::<bool>(),
    ) {
        let mut state = state_with(&on, engines, starting);
        state.navigation_command_activated = navigation;
        let mut monitor = InterlockMonitor::new();

        let report = monitor.settle(&mut state, &IgnitionSequence::default(), 0);
        prop_assert!(report.passes >= 1);
        prop_assert!(report.passes <= RULE_COUNT + 1);
        prop_assert!(!(state.systems.engines && state.systems.engine_starting));
        if !state.systems.power {
            prop_assert!(!state.controls.is_on(ControlId::EngineMaster));
            prop_assert!(!state.controls.is_on(ControlId::CommsMaster));
        }
        if !state.spaceship_online {
            prop_assert!(!state.navigation_command_activated);
        }
    }
}
