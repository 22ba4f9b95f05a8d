use crate::controls::{ControlId, ControlStore};
use crate::log::{LogEntry, LogLevel};
use arrayvec::ArrayVec;
use serde::{Deserialize, Serialize};
use static_assertions::const_assert_eq;

/// Power & gain panel: every reactor button plus the master switch.
pub const POWER_GAIN_PANEL: [ControlId; 9] = [
    ControlId::Pwr1,
    ControlId::Pwr2,
    ControlId::Pwr5,
    ControlId::Pwr6,
    ControlId::Pwr7,
    ControlId::Pwr8,
    ControlId::Pwr9,
    ControlId::Pwr10,
    ControlId::MasterToggle,
];

/// SAFE, ARM, LOCK and KEY on the footer strip.
pub const FOOTER_CRITICAL: [ControlId; 4] = [
    ControlId::FooterSafe,
    ControlId::FooterArm,
    ControlId::FooterLock,
    ControlId::FooterKey,
];

/// Every control that must be on for ship power.
pub const CRITICAL_CONTROLS: [ControlId; 13] = [
    ControlId::Pwr1,
    ControlId::Pwr2,
    ControlId::Pwr5,
    ControlId::Pwr6,
    ControlId::Pwr7,
    ControlId::Pwr8,
    ControlId::Pwr9,
    ControlId::Pwr10,
    ControlId::MasterToggle,
    ControlId::FooterSafe,
    ControlId::FooterArm,
    ControlId::FooterLock,
    ControlId::FooterKey,
];

const_assert_eq!(CRITICAL_CONTROLS.len(), POWER_GAIN_PANEL.len() + FOOTER_CRITICAL.len());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShipStatus {
    Offline,
    Standby,
    Online,
}

impl ShipStatus {
    pub fn is_powered(self) -> bool {
        matches!(self, ShipStatus::Online | ShipStatus::Standby)
    }

    pub fn label(self) -> &'static str {
        match self {
            ShipStatus::Offline => "OFFLINE",
            ShipStatus::Standby => "STANDBY",
            ShipStatus::Online => "ONLINE",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StartupSequence {
    pub power_gain_panel_complete: bool,
    pub footer_critical_complete: bool,
}

/// Ship-level power flags recomputed from the controls on every pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShipFlags {
    pub critical_controls_met: bool,
    pub spaceship_online: bool,
    pub spaceship_standby: bool,
    pub startup_sequence: StartupSequence,
}

impl ShipFlags {
    pub fn evaluate(controls: &ControlStore) -> Self {
        let startup_sequence = StartupSequence {
            power_gain_panel_complete: controls.all_on(&POWER_GAIN_PANEL),
            footer_critical_complete: controls.all_on(&FOOTER_CRITICAL),
        };
        let spaceship_online =
            startup_sequence.power_gain_panel_complete && startup_sequence.footer_critical_complete;
        let spaceship_standby =
            startup_sequence.power_gain_panel_complete && !startup_sequence.footer_critical_complete;

        Self {
            critical_controls_met: controls.all_on(&CRITICAL_CONTROLS),
            spaceship_online,
            spaceship_standby,
            startup_sequence,
        }
    }

    pub fn status(&self) -> ShipStatus {
        if self.spaceship_online {
            ShipStatus::Online
        } else if self.spaceship_standby {
            ShipStatus::Standby
        } else {
            ShipStatus::Offline
        }
    }

    /// Entries for the ship-status transition and each startup flag flip
    /// between `previous` and `self`.
    pub fn transition_entries(&self, previous: &ShipFlags, now: u64) -> ArrayVec<LogEntry, 3> {
        let mut entries = ArrayVec::new();
        let source = "Ship Power Core";

        if self.spaceship_online && !previous.spaceship_online {
            entries.push(LogEntry::new(
                now,
                LogLevel::System,
                "SPACESHIP STATUS: FULLY ONLINE - All power systems engaged, core initialization complete, ship ready for operation",
                source,
            ));
        } else if self.spaceship_standby && !previous.spaceship_standby {
            entries.push(LogEntry::new(
                now,
                LogLevel::Warning,
                "SPACESHIP STATUS: STANDBY MODE - Power systems active but safety protocols not fully engaged",
                source,
            ));
        } else if !self.status().is_powered() && previous.status().is_powered() {
            entries.push(LogEntry::new(
                now,
                LogLevel::Critical,
                "SPACESHIP STATUS: COMPLETE POWER FAILURE - All systems offline, emergency protocols recommended",
                source,
            ));
        }

        let panel = self.startup_sequence.power_gain_panel_complete;
        if panel != previous.startup_sequence.power_gain_panel_complete {
            entries.push(LogEntry::new(
                now,
                if panel { LogLevel::System } else { LogLevel::Critical },
                if panel {
                    "POWER GAIN PANEL: COMPLETE - All power controls engaged"
                } else {
                    "POWER GAIN PANEL: INCOMPLETE - Power distribution compromised"
                },
                "Power Gain Systems",
            ));
        }

        let footer = self.startup_sequence.footer_critical_complete;
        if footer != previous.startup_sequence.footer_critical_complete {
            entries.push(LogEntry::new(
                now,
                if footer { LogLevel::System } else { LogLevel::Warning },
                if footer {
                    "SAFETY PROTOCOLS: ENGAGED - SAFE/ARM/LOCK/KEY sequence complete"
                } else {
                    "SAFETY PROTOCOLS: STANDBY - Safety systems not fully initialized"
                },
                "Safety Systems",
            ));
        }

        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_with(ids: &[ControlId]) -> ControlStore {
        let mut store = ControlStore::new();
        for id in ids {
            store.force_switch(*id, true);
        }
        store
    }

    #[test]
    fn test_offline_by_default() {
        let flags = ShipFlags::evaluate(&ControlStore::new());
        assert_eq!(flags.status(), ShipStatus::Offline);
        assert!(!flags.critical_controls_met);
    }

    #[test]
    fn test_standby_without_footer() {
        let flags = ShipFlags::evaluate(&store_with(&POWER_GAIN_PANEL));
        assert_eq!(flags.status(), ShipStatus::Standby);
        assert!(!flags.critical_controls_met);
    }

    #[test]
    fn test_online_with_full_critical_set() {
        let flags = ShipFlags::evaluate(&store_with(&CRITICAL_CONTROLS));
        assert_eq!(flags.status(), ShipStatus::Online);
        assert!(flags.critical_controls_met);
    }

    #[test]
    fn test_footer_alone_is_not_power() {
        let flags = ShipFlags::evaluate(&store_with(&FOOTER_CRITICAL));
        assert_eq!(flags.status(), ShipStatus::Offline);
        assert!(flags.startup_sequence.footer_critical_complete);
    }

    #[test]
    fn test_transition_to_online_then_failure() {
        let offline = ShipFlags::default();
        let online = ShipFlags::evaluate(&store_with(&CRITICAL_CONTROLS));

        let entries = online.transition_entries(&offline, 10);
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].level, LogLevel::System);
        assert!(entries[0].message.contains("FULLY ONLINE"));

        let entries = offline.transition_entries(&online, 20);
        assert_eq!(entries[0].level, LogLevel::Critical);
        assert!(entries[0].message.contains("COMPLETE POWER FAILURE"));

        assert!(online.transition_entries(&online, 30).is_empty());
    }
}
