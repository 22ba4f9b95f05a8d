//! Emergency reset: EMERGENCY and ABORT on together wipe the ship back to its
//! initial snapshot.

use crate::config::PanelConfig;
use crate::controls::{ControlId, ControlStore};
use crate::log::{LogEntry, LogLevel};
use crate::state::GameState;
use tracing::warn;

pub const EMERGENCY_SLOT: ControlId = ControlId::FooterEmergency;
pub const ABORT_SLOT: ControlId = ControlId::FooterAbort;

pub const RESET_MESSAGE: &str =
    "EMERGENCY SYSTEM RESET EXECUTED - All systems returned to initial state, mission data cleared";

/// Only the toggle that completes the combination triggers a reset.
pub fn triggered(toggled: ControlId, controls: &ControlStore) -> bool {
    (toggled == EMERGENCY_SLOT || toggled == ABORT_SLOT)
        && controls.is_on(EMERGENCY_SLOT)
        && controls.is_on(ABORT_SLOT)
}

/// Replacement state after a reset: the initial snapshot carrying a single
/// critical entry. Both trigger slots read false.
pub fn reset_state(config: &PanelConfig, now: u64) -> GameState {
    warn!("emergency and abort engaged together, resetting panel state");

    let mut state = GameState::initial(config, now);
    state.log(LogEntry::new(now, LogLevel::Critical, RESET_MESSAGE, "Emergency Systems"));

    debug_assert!(!state.controls.is_on(EMERGENCY_SLOT) && !state.controls.is_on(ABORT_SLOT));
    state
}
