//! Status readouts: the JSON status report and the diagnostic calibration
//! grid from the systems-monitoring display.

use crate::controls::{ControlId, ControlStore, Console};
use crate::safety::InterlockStats;
use crate::scheduler::SchedulerStats;
use crate::state::GameState;
use crate::subsystems::{comms, FuelTanks, IgnitionPhase, ShipStatus, SubsystemId};
use serde::{Deserialize, Serialize};

pub const CALIBRATION_TARGET: f64 = 50.0;
/// A dial is balanced when strictly within this distance of the target.
pub const CALIBRATION_TOLERANCE: f64 = 1.0;
/// Deviation at which a dial lights its grid cells.
pub const CALIBRATION_DEVIATION: f64 = 5.0;

pub const GRID_CELLS: usize = 9;
const CENTER_CELL: usize = 4;

/// Battery dials in the order the grid reads them, each with the cells it
/// lights when off balance.
const GRID_RULES: [(ControlId, &[usize]); 5] = [
    (ControlId::Out1, &[0, 1, 2]),
    (ControlId::Out2, &[6, 7, 8]),
    (ControlId::Mon1, &[0, 3, 6]),
    (ControlId::Mon2, &[2, 5, 8]),
    (ControlId::Cue1, &[0, 2, 6, 8]),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitoringMode {
    Standby,
    Diagnostic,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalibrationReport {
    pub mode: MonitoringMode,
    pub grid: [bool; GRID_CELLS],
    pub balanced: bool,
    /// Balanced while the ship has power.
    pub complete: bool,
}

impl CalibrationReport {
    pub fn render_grid(&self) -> String {
        let mut out = String::with_capacity(GRID_CELLS * 2 + 2);
        for (index, lit) in self.grid.iter().enumerate() {
            out.push(if *lit { '■' } else { '□' });
            if index % 3 == 2 && index + 1 < GRID_CELLS {
                out.push('\n');
            }
        }
        out
    }
}

pub fn calibration(controls: &ControlStore, status: ShipStatus) -> CalibrationReport {
    let balanced = GRID_RULES
        .iter()
        .all(|(id, _)| (controls.level(*id) - CALIBRATION_TARGET).abs() < CALIBRATION_TOLERANCE);

    let mut grid = [false; GRID_CELLS];
    if balanced {
        grid[CENTER_CELL] = true;
    } else {
        for (id, cells) in GRID_RULES {
            if (controls.level(id) - CALIBRATION_TARGET).abs() >= CALIBRATION_DEVIATION {
                for cell in cells {
                    grid[*cell] = true;
                }
            }
        }
    }

    let mode = if status.is_powered() {
        MonitoringMode::Diagnostic
    } else {
        MonitoringMode::Standby
    };

    CalibrationReport {
        mode,
        grid,
        balanced,
        complete: balanced && status.is_powered(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IgnitionReport {
    pub phase: IgnitionPhase,
    pub progress: f64,
    pub starter_damage: f64,
}

/// Serialisable summary for the `status` command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PanelStatus {
    pub timestamp: u64,
    pub ship_status: ShipStatus,
    pub current_console: Console,
    pub online_subsystems: Vec<SubsystemId>,
    pub ignition: IgnitionReport,
    pub reactor_temperature: f64,
    pub hull_integrity: f64,
    pub battery_power: f64,
    pub fuel: FuelTanks,
    pub fuel_total: f64,
    pub signal_bars: u8,
    pub linked_channels: usize,
    pub navigation_command_activated: bool,
    pub calibration: CalibrationReport,
    pub scheduler: SchedulerStats,
    pub interlocks: InterlockStats,
    pub log_count: usize,
    pub logs_appended: u64,
    pub last_saved: u64,
}

impl PanelStatus {
    pub fn collect(
        state: &GameState,
        scheduler: &SchedulerStats,
        interlocks: &InterlockStats,
        now: u64,
    ) -> Self {
        let systems = &state.systems;
        let online_subsystems = SubsystemId::DERIVED
            .iter()
            .chain([SubsystemId::Engines, SubsystemId::EngineStarting].iter())
            .copied()
            .filter(|id| systems.flag(*id))
            .collect();

        Self {
            timestamp: now,
            ship_status: state.status(),
            current_console: state.current_console,
            online_subsystems,
            ignition: IgnitionReport {
                phase: systems.ignition_phase(),
                progress: systems.engine_startup_progress,
                starter_damage: systems.starter_damage,
            },
            reactor_temperature: systems.reactor_temperature,
            hull_integrity: systems.hull_integrity,
            battery_power: systems.battery_power,
            fuel: systems.fuel.clone(),
            fuel_total: systems.fuel.total(),
            signal_bars: comms::signal_bars(systems.communications),
            linked_channels: comms::linked_channels(&state.controls),
            navigation_command_activated: state.navigation_command_activated,
            calibration: calibration(&state.controls, state.status()),
            scheduler: scheduler.clone(),
            interlocks: interlocks.clone(),
            log_count: state.logs.len(),
            logs_appended: state.logs.total_appended(),
            last_saved: state.last_saved,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
