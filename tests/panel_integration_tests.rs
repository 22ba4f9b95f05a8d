use shipdeck::config::PanelConfig;
use shipdeck::controls::ControlId;
use shipdeck::log::{LogBuffer, LogLevel};
use shipdeck::panel::ControlPanel;
use shipdeck::ports::{
    Clock, FixedSample, ManualClock, NotificationEvent, RandomSource, RecordingNotifier,
};
use shipdeck::protocol::Action;
use shipdeck::scheduler::Process;
use shipdeck::state::GameState;
use shipdeck::subsystems::engine::{IgnitionEvent, IgnitionRejection, ENGINE_PRIMING};
use shipdeck::subsystems::power::CRITICAL_CONTROLS;
use shipdeck::subsystems::{IgnitionPhase, NumericField, Reservoir, ShipStatus};

struct Rig {
    panel: ControlPanel,
    clock: ManualClock,
    notifier: RecordingNotifier,
}

fn rig_with(config: PanelConfig, rng: Box<dyn RandomSource>) -> Rig {
    let clock = ManualClock::new(0);
    let notifier = RecordingNotifier::new();
    let panel = ControlPanel::new(
        config,
        Box::new(clock.clone()),
        rng,
        Box::new(notifier.clone()),
    );
    Rig { panel, clock, notifier }
}

fn rig() -> Rig {
    rig_with(PanelConfig::default(), Box::new(FixedSample::success()))
}

fn power_up(rig: &mut Rig) {
    for id in CRITICAL_CONTROLS {
        rig.panel.dispatch(Action::toggle(id.key()));
    }
}

fn prime_engine(rig: &mut Rig) {
    for id in ENGINE_PRIMING {
        rig.panel.dispatch(Action::toggle(id.key()));
    }
}

/// Walks the clock forward in 100 ms steps, advancing after each one.
fn run_until(rig: &mut Rig, until: u64) {
    let mut now = rig.clock.now_ms();
    while now < until {
        now = (now + 100).min(until);
        rig.clock.set(now);
        rig.panel.advance();
    }
}

fn has_message(rig: &Rig, needle: &str) -> bool {
    rig.panel.state().logs.iter().any(|entry| entry.message.contains(needle))
}

#[test]
fn test_startup_sequence_standby_then_online() {
    let mut rig = rig();
    for id in [
        ControlId::Pwr1,
        ControlId::Pwr2,
        ControlId::Pwr5,
        ControlId::Pwr6,
        ControlId::Pwr7,
        ControlId::Pwr8,
        ControlId::Pwr9,
        ControlId::Pwr10,
        ControlId::MasterToggle,
    ] {
        rig.panel.dispatch(Action::toggle(id.key()));
    }
    assert_eq!(rig.panel.state().status(), ShipStatus::Standby);
    assert!(rig.panel.state().systems.core_systems);
    assert!(!rig.panel.state().systems.power);
    assert!(has_message(&rig, "SPACESHIP STATUS: STANDBY MODE"));

    rig.panel.dispatch(Action::PrimeShip);
    assert_eq!(rig.panel.state().status(), ShipStatus::Standby);
    rig.panel.dispatch(Action::toggle("f3"));

    let state = rig.panel.state();
    assert_eq!(state.status(), ShipStatus::Online);
    assert!(state.critical_controls_met);
    assert!(state.systems.power);
    assert!(state.systems.emergency_protocols);
    assert!(has_message(&rig, "SPACESHIP STATUS: FULLY ONLINE"));
    assert_eq!(rig.notifier.count(NotificationEvent::ShipOnline), 1);
}

#[test]
fn test_kill_switch_drops_ship_offline() {
    let mut rig = rig();
    power_up(&mut rig);
    rig.panel.dispatch(Action::KillSwitch);

    let state = rig.panel.state();
    assert_eq!(state.status(), ShipStatus::Standby);
    assert!(!state.systems.power);
    assert!(!rig.panel.is_running(Process::ShipChime));
}

#[test]
fn test_each_critical_control_gates_online() {
    let mut rig = rig();
    power_up(&mut rig);
    assert!(rig.panel.state().spaceship_online);

    for id in CRITICAL_CONTROLS {
        rig.panel.dispatch(Action::toggle(id.key()));
        assert!(!rig.panel.state().controls.is_on(id));
        assert!(!rig.panel.state().critical_controls_met, "{:?} off", id);
        assert!(!rig.panel.state().spaceship_online, "{:?} off", id);

        rig.panel.dispatch(Action::toggle(id.key()));
        assert!(rig.panel.state().spaceship_online, "{:?} back on", id);
    }
}

#[test]
fn test_full_ignition_and_fuel_burn() {
    let mut rig = rig();
    power_up(&mut rig);
    prime_engine(&mut rig);
    assert_eq!(rig.panel.state().systems.ignition_phase(), IgnitionPhase::Ready);
    assert_eq!(rig.notifier.count(NotificationEvent::EngineReady), 1);

    let outcome = rig.panel.dispatch(Action::StartEngine);
    assert_eq!(outcome.ignition, Some(IgnitionEvent::Started));
    assert!(rig.panel.is_running(Process::IgnitionPoll));
    assert_eq!(rig.notifier.count(NotificationEvent::EngineIgnitionCycle), 1);

    run_until(&mut rig, 4_900);
    let systems = &rig.panel.state().systems;
    assert!(systems.engine_starting);
    assert!(!systems.engines);
    assert_eq!(systems.engine_startup_progress, 98.0);

    run_until(&mut rig, 5_000);
    let systems = &rig.panel.state().systems;
    assert!(systems.engines);
    assert!(!systems.engine_starting);
    assert!(!rig.panel.is_running(Process::IgnitionPoll));
    assert!(rig.panel.is_running(Process::FuelDrain));
    assert_eq!(rig.notifier.count(NotificationEvent::EngineOnline), 1);

    run_until(&mut rig, 8_000);
    let fuel = &rig.panel.state().systems.fuel;
    assert!((fuel.level(Reservoir::Main) - 99.7).abs() < 1e-9);
    assert_eq!(fuel.level(Reservoir::Reserve), 100.0);
    assert_eq!(rig.notifier.count(NotificationEvent::EngineHeartbeat), 3);
}

#[test]
fn test_start_rejected_when_not_primed() {
    let mut rig = rig();
    power_up(&mut rig);
    let outcome = rig.panel.dispatch(Action::StartEngine);
    assert_eq!(
        outcome.ignition,
        Some(IgnitionEvent::Rejected(IgnitionRejection::NotPrimed))
    );
    assert!(!rig.panel.is_running(Process::IgnitionPoll));
    assert_eq!(rig.notifier.count(NotificationEvent::EngineIgnitionCycle), 0);
}

#[test]
fn test_ignition_failure_needs_repriming() {
    let config = PanelConfig {
        starter_damage: 100.0,
        ..PanelConfig::default()
    };
    let mut rig = rig_with(config, Box::new(FixedSample::failure()));
    power_up(&mut rig);
    prime_engine(&mut rig);
    rig.panel.dispatch(Action::StartEngine);
    run_until(&mut rig, 5_000);

    let state = rig.panel.state();
    assert!(!state.systems.engines);
    assert!(!state.systems.engine_starting);
    assert!(!state.systems.engine_ready);
    assert!(!state.controls.is_on(ControlId::EngineReady1));
    assert!(!state.controls.is_on(ControlId::EngineReady2));
    assert!(state.controls.is_on(ControlId::EngineMaster));
    assert!(state
        .logs
        .iter()
        .any(|entry| entry.level == LogLevel::Critical && entry.data.is_some()));
    assert!(!rig.panel.is_running(Process::FuelDrain));
}

#[test]
fn test_stop_engine_halts_fuel_drain() {
    let mut rig = rig();
    power_up(&mut rig);
    prime_engine(&mut rig);
    rig.panel.dispatch(Action::StartEngine);
    run_until(&mut rig, 6_000);
    assert!(rig.panel.is_running(Process::FuelDrain));

    let outcome = rig.panel.dispatch(Action::StopEngine);
    assert_eq!(outcome.ignition, Some(IgnitionEvent::Stopped));
    assert!(!rig.panel.is_running(Process::FuelDrain));

    let main = rig.panel.state().systems.fuel.level(Reservoir::Main);
    run_until(&mut rig, 10_000);
    assert_eq!(rig.panel.state().systems.fuel.level(Reservoir::Main), main);
}

#[test]
fn test_power_loss_cascades_through_engines() {
    let mut rig = rig();
    power_up(&mut rig);
    prime_engine(&mut rig);
    rig.panel.dispatch(Action::toggle("forward"));
    rig.panel.dispatch(Action::StartEngine);
    run_until(&mut rig, 5_000);
    assert!(rig.panel.state().systems.propulsion);

    let outcome = rig.panel.dispatch(Action::toggle("master-toggle"));
    let state = rig.panel.state();
    assert!(!state.systems.power);
    assert!(!state.controls.is_on(ControlId::EngineMaster));
    assert!(!state.systems.engines);
    assert!(!state.systems.propulsion);
    assert!(!rig.panel.is_running(Process::FuelDrain));
    assert!(outcome.settle.passes >= 2);
    assert!(has_message(&rig, "ENGINE MASTER - Automatically disengaged due to power loss"));
    assert!(has_message(&rig, "ENGINES SHUTDOWN - Power supply disrupted"));
}

#[test]
fn test_supply_loss_aborts_ignition() {
    let mut rig = rig();
    power_up(&mut rig);
    prime_engine(&mut rig);
    rig.panel.dispatch(Action::StartEngine);
    run_until(&mut rig, 2_000);

    rig.panel.dispatch(Action::toggle("engine-pwr-2"));
    let systems = &rig.panel.state().systems;
    assert!(!systems.engine_starting);
    assert_eq!(systems.engine_startup_progress, 0.0);
    assert!(!rig.panel.is_running(Process::IgnitionPoll));

    run_until(&mut rig, 6_000);
    assert!(!rig.panel.state().systems.engines);
}

#[test]
fn test_communications_link_and_array() {
    let mut rig = rig();
    power_up(&mut rig);
    for key in ["comms-master", "comms-pwr-1", "comms-pwr-2"] {
        rig.panel.dispatch(Action::toggle(key));
    }
    let status = rig.panel.status();
    assert_eq!(status.signal_bars, 5);
    assert_eq!(status.linked_channels, 16);

    // The array follows the link; a manual disconnect is put back
    rig.panel.dispatch(Action::toggle("conn-laser"));
    assert!(rig.panel.state().controls.is_on(ControlId::ConnLaser));

    rig.panel.dispatch(Action::Transmit);
    assert!(has_message(&rig, "TRANSMISSION STARTED"));

    rig.panel.dispatch(Action::toggle("pwr-9"));
    let state = rig.panel.state();
    assert!(!state.systems.communications);
    assert!(!state.controls.is_on(ControlId::CommsMaster));
    assert!(!state.controls.is_on(ControlId::ConnLaser));
}

#[test]
fn test_transmit_ignored_without_link() {
    let mut rig = rig();
    let before = rig.panel.state().logs.len();
    rig.panel.dispatch(Action::Transmit);
    rig.panel.dispatch(Action::Receive);
    assert_eq!(rig.panel.state().logs.len(), before);
}

#[test]
fn test_navigation_interface_lifecycle() {
    let mut rig = rig();
    power_up(&mut rig);
    rig.panel.dispatch(Action::navigation("start"));
    assert!(rig.panel.state().navigation_command_activated);
    assert!(rig.panel.state().systems.navigation);
    assert!(has_message(&rig, "Navigation systems LOCKED"));

    rig.panel.dispatch(Action::navigation("quit"));
    assert!(!rig.panel.state().navigation_command_activated);
    assert!(!rig.panel.state().systems.navigation);
    let history: Vec<String> = rig.panel.state().navigation_command_history.iter().cloned().collect();
    assert_eq!(history, vec!["> start", "> quit"]);
}

#[test]
fn test_system_values_clamp_and_band() {
    let mut rig = rig();
    rig.panel.dispatch(Action::SetSystemValue {
        field: NumericField::HullIntegrity,
        value: 40.0,
    });
    let latest = rig.panel.state().logs.latest().cloned();
    assert_eq!(latest.map(|e| e.level), Some(LogLevel::Error));

    let before = rig.panel.state().logs.len();
    rig.panel.dispatch(Action::SetSystemValue {
        field: NumericField::HullIntegrity,
        value: 45.0,
    });
    assert_eq!(rig.panel.state().logs.len(), before);

    rig.panel.dispatch(Action::SetSystemValue {
        field: NumericField::HullIntegrity,
        value: 250.0,
    });
    assert_eq!(rig.panel.state().systems.hull_integrity, 100.0);
}

#[test]
fn test_dial_validation() {
    let mut rig = rig();
    rig.panel.dispatch(Action::set_value("out-1", 150.0));
    let controls = &rig.panel.state().controls;
    assert_eq!(controls.level(ControlId::Out1), 150.0);
    assert_eq!(controls.level_clamped(ControlId::Out1), 100.0);
    assert_eq!(
        rig.panel.state().logs.latest().map(|e| e.source.as_str()),
        Some("Control Validation")
    );

    rig.panel.dispatch(Action::set_value("out-1", f64::NAN));
    assert_eq!(rig.panel.state().controls.level(ControlId::Out1), 150.0);

    rig.panel.dispatch(Action::set_value("cue-1", 75.0));
    assert_eq!(
        rig.panel.state().logs.latest().map(|e| e.level),
        Some(LogLevel::Warning)
    );
}

#[test]
fn test_calibration_completes_when_powered() {
    let mut rig = rig();
    for key in ["out-1", "out-2", "mon-1", "mon-2", "cue-1"] {
        rig.panel.dispatch(Action::set_value(key, 50.0));
    }
    assert!(rig.panel.status().calibration.balanced);
    assert!(!rig.panel.status().calibration.complete);

    power_up(&mut rig);
    assert!(rig.panel.status().calibration.complete);
}

#[test]
fn test_reactor_warms_with_power() {
    let mut rig = rig();
    power_up(&mut rig);
    run_until(&mut rig, 3_000);
    // Idle target equals the starting temperature
    assert_eq!(rig.panel.state().systems.reactor_temperature, 150.0);

    prime_engine(&mut rig);
    run_until(&mut rig, 6_000);
    let temperature = rig.panel.state().systems.reactor_temperature;
    assert!(temperature > 150.0 && temperature <= 1000.0);
}

#[test]
fn test_ship_chime_repeats_while_online() {
    let mut rig = rig();
    power_up(&mut rig);
    run_until(&mut rig, 120_000);
    assert_eq!(rig.notifier.count(NotificationEvent::ShipOnline), 3);
}

#[test]
fn test_autosave_reported_on_schedule() {
    let mut rig = rig();
    rig.clock.set(29_900);
    assert!(!rig.panel.advance().autosave_due);
    rig.clock.set(30_000);
    assert!(rig.panel.advance().autosave_due);
}

#[test]
fn test_emergency_reset_via_panel() {
    let mut rig = rig();
    power_up(&mut rig);
    rig.panel.dispatch(Action::toggle("f13"));
    let outcome = rig.panel.dispatch(Action::toggle("f12"));
    assert!(outcome.reset);

    let state = rig.panel.state();
    assert_eq!(state.status(), ShipStatus::Offline);
    assert_eq!(state.logs.len(), 1);
    assert_eq!(state.logs.entries()[0].level, LogLevel::Critical);
    assert!(!state.controls.is_on(ControlId::FooterEmergency));
    assert!(!state.controls.is_on(ControlId::FooterAbort));
}

#[test]
fn test_reset_matches_initial_state() {
    let mut rig = rig();
    power_up(&mut rig);
    prime_engine(&mut rig);
    run_until(&mut rig, 4_200);
    rig.panel.dispatch(Action::toggle("f13"));
    rig.panel.dispatch(Action::toggle("f12"));

    let mut actual = rig.panel.state().clone();
    actual.logs = LogBuffer::new();
    assert_eq!(actual, GameState::initial(rig.panel.config(), 4_200));
}
