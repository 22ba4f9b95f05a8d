//! Subsystem derivation: a pure recomputation of every derived status from
//! the controls, with one log entry per actual flip.
//!
//! Each subsystem is an explicit AND-gate over the global power precondition
//! and its own controls. Engines and the ignition flag are not derived; they
//! are carried over from the prior snapshot untouched.

use crate::controls::{ControlId, ControlStore};
use crate::log::{LogEntry, LogLevel};
use crate::state::GameState;
use crate::subsystems::{comms, engine, ShipFlags, SubsystemId, SystemSnapshot};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DerivationInputs {
    pub navigation_command_activated: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Derivation {
    pub snapshot: SystemSnapshot,
    pub flags: ShipFlags,
    pub entries: Vec<LogEntry>,
}

impl Derivation {
    pub fn is_steady(&self) -> bool {
        self.entries.is_empty()
    }
}

pub fn derive(
    controls: &ControlStore,
    prior: &SystemSnapshot,
    prior_flags: &ShipFlags,
    inputs: DerivationInputs,
    now: u64,
) -> Derivation {
    let flags = ShipFlags::evaluate(controls);
    let mut entries: Vec<LogEntry> = flags.transition_entries(prior_flags, now).into_iter().collect();

    let mut snapshot = prior.clone();
    for id in SubsystemId::DERIVED {
        let on = gate(id, controls, &flags, prior, inputs);
        if on != prior.flag(id) {
            entries.push(flip_entry(id, on, now));
        }
        snapshot.set_flag(id, on);
    }

    Derivation {
        snapshot,
        flags,
        entries,
    }
}

/// Runs a derivation pass over `state` and adopts the result. Returns the
/// number of entries it logged.
pub fn refresh(state: &mut GameState, now: u64) -> usize {
    let inputs = DerivationInputs {
        navigation_command_activated: state.navigation_command_activated,
    };
    let derivation = derive(&state.controls, &state.systems, &state.ship_flags(), inputs, now);
    let logged = derivation.entries.len();

    state.systems = derivation.snapshot;
    state.apply_flags(&derivation.flags);
    state.log_all(derivation.entries);
    logged
}

fn gate(
    id: SubsystemId,
    controls: &ControlStore,
    flags: &ShipFlags,
    prior: &SystemSnapshot,
    inputs: DerivationInputs,
) -> bool {
    let power = flags.critical_controls_met;
    let shields = power && controls.is_on(ControlId::Shield);

    match id {
        SubsystemId::Power | SubsystemId::PowerSystems | SubsystemId::EmergencyProtocols => power,
        SubsystemId::LifeSupport => {
            power && controls.is_on(ControlId::AuxPwr) && controls.is_on(ControlId::PrimPwr)
        }
        SubsystemId::EngineReady => controls.all_on(&engine::ENGINE_PRIMING),
        SubsystemId::Navigation => power && inputs.navigation_command_activated,
        SubsystemId::Shields => shields,
        SubsystemId::Weapons => {
            power && controls.is_on(ControlId::Emergency) && controls.is_on(ControlId::Override)
        }
        SubsystemId::CoreSystems => flags.status().is_powered(),
        SubsystemId::Communications => power && comms::supply_active(controls),
        SubsystemId::Sensors => power && controls.is_on(ControlId::Monitor),
        SubsystemId::DefensiveArray => shields && controls.is_on(ControlId::Isolate),
        SubsystemId::Propulsion => prior.engines && controls.is_on(ControlId::Forward),
        SubsystemId::CargoSystems => power && controls.is_on(ControlId::Reserve),
        SubsystemId::Maintenance => power && controls.is_on(ControlId::Reset),
        SubsystemId::Engines | SubsystemId::EngineStarting => prior.flag(id),
    }
}

fn flip_entry(id: SubsystemId, on: bool, now: u64) -> LogEntry {
    let plain = |level_on: LogLevel, level_off: LogLevel, word_on: &str, word_off: &str, label: &str, source: &str| {
        LogEntry::new(
            now,
            if on { level_on } else { level_off },
            format!("{} {}", label, if on { word_on } else { word_off }),
            source,
        )
    };

    match id {
        SubsystemId::Power => LogEntry::new(
            now,
            if on { LogLevel::System } else { LogLevel::Critical },
            if on {
                "SHIP POWER STATUS: FULLY OPERATIONAL - Power level: 100% - All systems nominal"
            } else {
                "SHIP POWER STATUS: CRITICAL FAILURE - Power level: 0% - All systems offline"
            },
            "Ship Power Core",
        ),
        SubsystemId::LifeSupport => plain(
            LogLevel::Info,
            LogLevel::Critical,
            "ACTIVE",
            "OFFLINE",
            "Life support systems",
            "Environmental Systems",
        ),
        SubsystemId::EngineReady => LogEntry::new(
            now,
            if on { LogLevel::Info } else { LogLevel::Warning },
            if on {
                "Engine power supply PRIMED - Engine ready for engagement"
            } else {
                "Engine power supply STANDBY - Engine requires power supply setup"
            },
            "Engine Power Supply",
        ),
        SubsystemId::Navigation => plain(
            LogLevel::Info,
            LogLevel::Warning,
            "LOCKED",
            "OFFLINE",
            "Navigation systems",
            "Navigation Systems",
        ),
        SubsystemId::Shields => plain(
            LogLevel::Info,
            LogLevel::Warning,
            "ACTIVE",
            "OFFLINE",
            "Shield systems",
            "Defensive Systems",
        ),
        SubsystemId::Weapons => plain(
            LogLevel::Warning,
            LogLevel::Info,
            "READY",
            "SAFE",
            "Weapon systems",
            "Weapons Systems",
        ),
        SubsystemId::Communications => plain(
            LogLevel::Info,
            LogLevel::Warning,
            "ACTIVE",
            "OFFLINE",
            "Communication systems",
            "Communications",
        ),
        SubsystemId::Sensors => plain(
            LogLevel::Info,
            LogLevel::Warning,
            "NOMINAL",
            "OFFLINE",
            "Sensor array",
            "Sensor Systems",
        ),
        SubsystemId::DefensiveArray => plain(
            LogLevel::Info,
            LogLevel::Warning,
            "READY",
            "OFFLINE",
            "Defensive array",
            "Defensive Systems",
        ),
        SubsystemId::Propulsion => plain(
            LogLevel::Info,
            LogLevel::Warning,
            "ENGAGED",
            "OFFLINE",
            "Propulsion systems",
            "Propulsion Systems",
        ),
        SubsystemId::CargoSystems => plain(
            LogLevel::Info,
            LogLevel::Warning,
            "ACTIVE",
            "STANDBY",
            "Cargo systems",
            "Cargo Management",
        ),
        SubsystemId::Maintenance => plain(
            LogLevel::Info,
            LogLevel::Warning,
            "ACTIVE",
            "STANDBY",
            "Maintenance systems",
            "Maintenance",
        ),
        SubsystemId::PowerSystems
        | SubsystemId::CoreSystems
        | SubsystemId::EmergencyProtocols
        | SubsystemId::Engines
        | SubsystemId::EngineStarting => LogEntry::new(
            now,
            if on { LogLevel::System } else { LogLevel::Warning },
            format!(
                "{} {} - {}",
                id.label(),
                if on { "ENGAGED" } else { "OFFLINE" },
                if on {
                    "System activated and operational"
                } else {
                    "System deactivated or failed"
                }
            ),
            "Ship Systems",
        ),
    }
}
