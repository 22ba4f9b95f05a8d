//! Safety interlock monitor.
//!
//! Runs against a freshly derived snapshot and emits corrective writes as a
//! separate pass rather than re-entering dispatch. Each rule fires at most
//! once per settle; every correction is followed by a new derivation pass, so
//! a settle performs at most `RULE_COUNT + 1` passes.

use crate::controls::ControlId;
use crate::derivation;
use crate::log::{LogEntry, LogLevel};
use crate::state::GameState;
use crate::subsystems::comms;
use crate::subsystems::engine::{IgnitionSequence, ENGINE_SUPPLY};
use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const RULE_COUNT: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InterlockRule {
    EngineMasterPowerLoss,
    CommsMasterPowerLoss,
    EngineSupplyLost,
    IgnitionSupplyLost,
    ConnectionArraySync,
    NavigationOffline,
}

impl InterlockRule {
    pub const ALL: [InterlockRule; RULE_COUNT] = [
        InterlockRule::EngineMasterPowerLoss,
        InterlockRule::CommsMasterPowerLoss,
        InterlockRule::EngineSupplyLost,
        InterlockRule::IgnitionSupplyLost,
        InterlockRule::ConnectionArraySync,
        InterlockRule::NavigationOffline,
    ];

    fn index(self) -> usize {
        self as usize
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Correction {
    ForceOff(ControlId),
    EnginesOff,
    AbortIgnition,
    SyncConnections { online: bool },
    DeactivateNavigation,
}

#[derive(Debug, Default)]
pub struct InterlockActions {
    pub corrections: ArrayVec<(InterlockRule, Correction), RULE_COUNT>,
}

impl InterlockActions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_actions(&self) -> bool {
        !self.corrections.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterlockStats {
    pub settles: u64,
    pub passes: u64,
    pub corrections: u64,
    pub rule_trips: [u32; RULE_COUNT],
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettleReport {
    pub passes: usize,
    pub fired: ArrayVec<InterlockRule, RULE_COUNT>,
}

impl SettleReport {
    pub fn fired(&self, rule: InterlockRule) -> bool {
        self.fired.contains(&rule)
    }
}

#[derive(Debug, Default)]
pub struct InterlockMonitor {
    stats: InterlockStats,
}

impl InterlockMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rules violated by `state`, skipping those already fired this settle.
    pub fn evaluate(&self, state: &GameState, fired: &[bool; RULE_COUNT]) -> InterlockActions {
        let mut actions = InterlockActions::new();
        let systems = &state.systems;
        let controls = &state.controls;
        let supply = controls.all_on(&ENGINE_SUPPLY);

        for rule in InterlockRule::ALL {
            if fired[rule.index()] {
                continue;
            }
            let correction = match rule {
                InterlockRule::EngineMasterPowerLoss
                    if !systems.power && controls.is_on(ControlId::EngineMaster) =>
                {
                    Some(Correction::ForceOff(ControlId::EngineMaster))
                }
                InterlockRule::CommsMasterPowerLoss
                    if !systems.power && controls.is_on(ControlId::CommsMaster) =>
                {
                    Some(Correction::ForceOff(ControlId::CommsMaster))
                }
                InterlockRule::EngineSupplyLost if systems.engines && !supply => {
                    Some(Correction::EnginesOff)
                }
                InterlockRule::IgnitionSupplyLost if systems.engine_starting && !supply => {
                    Some(Correction::AbortIgnition)
                }
                InterlockRule::ConnectionArraySync
                    if !comms::array_in_step(controls, systems.communications) =>
                {
                    Some(Correction::SyncConnections {
                        online: systems.communications,
                    })
                }
                InterlockRule::NavigationOffline
                    if !state.spaceship_online && state.navigation_command_activated =>
                {
                    Some(Correction::DeactivateNavigation)
                }
                _ => None,
            };

            if let Some(correction) = correction {
                actions.corrections.push((rule, correction));
            }
        }

        actions
    }

    /// Derive, then run interlock passes until no rule fires.
    pub fn settle(&mut self, state: &mut GameState, ignition: &IgnitionSequence, now: u64) -> SettleReport {
        let mut fired = [false; RULE_COUNT];
        let mut report = SettleReport::default();

        derivation::refresh(state, now);

        for _ in 0..=RULE_COUNT {
            report.passes += 1;
            let actions = self.evaluate(state, &fired);
            if !actions.has_actions() {
                break;
            }

            for (rule, correction) in actions.corrections {
                fired[rule.index()] = true;
                Self::apply(state, ignition, correction, now);
                self.stats.rule_trips[rule.index()] += 1;
                self.stats.corrections += 1;
                report.fired.push(rule);
                debug!(?rule, ?correction, "interlock correction applied");
            }

            derivation::refresh(state, now);
        }

        self.stats.settles += 1;
        self.stats.passes += report.passes as u64;

        debug_assert!(
            report.passes <= RULE_COUNT + 1,
            "interlock settle took {} passes",
            report.passes
        );
        debug_assert!(
            !(state.systems.engines && state.systems.engine_starting),
            "engines online while ignition in progress"
        );

        report
    }

    fn apply(state: &mut GameState, ignition: &IgnitionSequence, correction: Correction, now: u64) {
        match correction {
            Correction::ForceOff(id) => {
                state.controls.force_switch(id, false);
                let (message, source) = match id {
                    ControlId::CommsMaster => (
                        "COMMUNICATIONS MASTER - Automatically disengaged due to power loss",
                        "Communications Power Supply",
                    ),
                    _ => (
                        "ENGINE MASTER - Automatically disengaged due to power loss",
                        "Engine Power Supply",
                    ),
                };
                state.log(LogEntry::new(now, LogLevel::Warning, message, source));
            }
            Correction::EnginesOff => {
                state.systems.engines = false;
                state.systems.engine_startup_progress = 0.0;
                state.log(LogEntry::new(
                    now,
                    LogLevel::Critical,
                    "ENGINES SHUTDOWN - Power supply disrupted, engines automatically disengaged",
                    "Engine Power Supply",
                ));
            }
            Correction::AbortIgnition => {
                ignition.abort(
                    state,
                    LogEntry::new(
                        now,
                        LogLevel::Critical,
                        "IGNITION ABORTED - Engine power supply lost during start sequence",
                        "Engine Power Supply",
                    ),
                );
            }
            Correction::SyncConnections { online } => {
                let moved = comms::sync_array(&mut state.controls, online);
                state.log(comms::sync_entry(online, moved, now));
            }
            Correction::DeactivateNavigation => {
                state.navigation_command_activated = false;
                state.log(LogEntry::new(
                    now,
                    LogLevel::Warning,
                    "Navigation command interface deactivated - Ship power offline",
                    "Navigation Console",
                ));
            }
        }
    }

    pub fn get_stats(&self) -> &InterlockStats {
        &self.stats
    }
}
