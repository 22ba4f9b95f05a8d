//! The control panel: single writer over `GameState`.
//!
//! Every action runs to completion before the next one is looked at:
//! apply the action, derive, settle interlocks, resync the periodic
//! processes. Nothing in here fails; rejected input becomes a log entry.

use crate::config::PanelConfig;
use crate::controls::{Console, ControlChange, ControlId, LevelUpdate};
use crate::emergency;
use crate::log::{self, LogEntry, LogLevel};
use crate::persistence::{self, StateStore};
use crate::ports::{Clock, NotificationEvent, Notifier, RandomSource};
use crate::protocol::Action;
use crate::safety::{InterlockMonitor, InterlockStats, SettleReport};
use crate::scheduler::{Process, ProcessScheduler, SchedulerStats};
use crate::state::GameState;
use crate::subsystems::engine::{IgnitionEvent, IgnitionSequence};
use crate::subsystems::power::FOOTER_CRITICAL;
use crate::subsystems::{comms, fuel, thermal, NumericField};
use crate::telemetry::PanelStatus;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

const NAVIGATION_SOURCE: &str = "Navigation Console";

/// SAFE, ARM and LOCK. Priming leaves KEY to the operator.
const PRIME_TOGGLES: [ControlId; 3] = [ControlId::FooterSafe, ControlId::FooterArm, ControlId::FooterLock];

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchOutcome {
    /// The emergency combination fired. The host should clear persisted
    /// state and call `reload` after the configured delay.
    pub reset: bool,
    pub save_requested: bool,
    pub ignition: Option<IgnitionEvent>,
    pub settle: SettleReport,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickOutcome {
    pub ran: Vec<(Process, u64)>,
    pub autosave_due: bool,
    pub ignition: Option<IgnitionEvent>,
    pub fuel_drained: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelStats {
    pub actions: u64,
    pub ignored_actions: u64,
    pub resets: u32,
    pub reloads: u32,
    pub saves: u32,
    pub failed_saves: u32,
}

/// Flags whose rising edge fires a notification.
#[derive(Debug, Clone, Copy)]
struct Edges {
    online: bool,
    engine_ready: bool,
    engines: bool,
}

impl Edges {
    fn capture(state: &GameState) -> Self {
        Self {
            online: state.spaceship_online,
            engine_ready: state.systems.engine_ready,
            engines: state.systems.engines,
        }
    }
}

pub struct ControlPanel {
    state: GameState,
    config: PanelConfig,
    clock: Box<dyn Clock>,
    rng: Box<dyn RandomSource>,
    notifier: Box<dyn Notifier>,
    ignition: IgnitionSequence,
    interlocks: InterlockMonitor,
    scheduler: ProcessScheduler,
    log_cursor: u64,
    stats: PanelStats,
}

impl ControlPanel {
    pub fn new(
        config: PanelConfig,
        clock: Box<dyn Clock>,
        rng: Box<dyn RandomSource>,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        let now = clock.now_ms();
        let state = GameState::initial(&config, now);
        let mut panel = Self {
            ignition: IgnitionSequence::new(config.ignition_duration_ms),
            scheduler: ProcessScheduler::new(&config),
            interlocks: InterlockMonitor::new(),
            state,
            config,
            clock,
            rng,
            notifier,
            log_cursor: 0,
            stats: PanelStats::default(),
        };
        panel.interlocks.settle(&mut panel.state, &panel.ignition, now);
        panel.scheduler.sync(&panel.state, now);
        panel
    }

    pub fn now(&self) -> u64 {
        self.clock.now_ms()
    }

    pub fn state(&self) -> &GameState {
        &self.state
    }

    pub fn config(&self) -> &PanelConfig {
        &self.config
    }

    pub fn is_running(&self, process: Process) -> bool {
        self.scheduler.is_running(process)
    }

    /// Applies one action and settles the panel before returning.
    pub fn dispatch(&mut self, action: Action) -> DispatchOutcome {
        let now = self.clock.now_ms();
        let before = Edges::capture(&self.state);
        let mut outcome = DispatchOutcome::default();
        self.stats.actions += 1;
        debug!(action = action.name(), now, "dispatch");

        match action {
            Action::Toggle { control } => match control.parse::<ControlId>() {
                Ok(id) => {
                    self.apply_toggle(id, now);
                    if emergency::triggered(id, &self.state.controls) {
                        self.emergency_reset(now);
                        outcome.reset = true;
                        return outcome;
                    }
                }
                Err(e) => self.ignore(&e.to_string()),
            },
            Action::SetValue { control, value } => match control.parse::<ControlId>() {
                Ok(id) => self.apply_level(id, value, now),
                Err(e) => self.ignore(&e.to_string()),
            },
            Action::SetSystemValue { field, value } => self.apply_numeric(field, value, now),
            Action::StartEngine => {
                let event = self.ignition.start(&mut self.state, now);
                if event == IgnitionEvent::Started {
                    self.notifier.notify(NotificationEvent::EngineIgnitionCycle);
                }
                outcome.ignition = Some(event);
            }
            Action::StopEngine => {
                outcome.ignition = Some(self.ignition.stop(&mut self.state, now));
            }
            Action::NavigationCommand { text } => self.navigation_command(&text, now),
            Action::PrimeShip => {
                for id in PRIME_TOGGLES {
                    if !self.state.controls.is_on(id) {
                        self.apply_toggle(id, now);
                    }
                }
            }
            Action::KillSwitch => {
                for id in FOOTER_CRITICAL {
                    if self.state.controls.is_on(id) {
                        self.apply_toggle(id, now);
                    }
                }
            }
            Action::NextConsole => {
                let target = self.selected_console().next();
                self.apply_toggle(target.selector(), now);
            }
            Action::PreviousConsole => {
                let target = self.selected_console().previous();
                self.apply_toggle(target.selector(), now);
            }
            Action::Transmit => {
                match comms::transmit_entry(self.state.systems.communications, now) {
                    Some(entry) => self.state.log(entry),
                    None => self.ignore("transmit without communications"),
                }
            }
            Action::Receive => match comms::receive_entry(self.state.systems.communications, now) {
                Some(entry) => self.state.log(entry),
                None => self.ignore("receive without communications"),
            },
            Action::ClearLogs => self.state.log(LogEntry::new(
                now,
                LogLevel::System,
                "Log buffer cleared by operator",
                NAVIGATION_SOURCE,
            )),
            Action::Save => outcome.save_requested = true,
        }

        outcome.settle = self.settle(now, before);
        outcome
    }

    /// Runs every periodic process due at the current clock reading.
    pub fn advance(&mut self) -> TickOutcome {
        let now = self.clock.now_ms();
        self.advance_to(now)
    }

    /// Runs due processes in deadline order, each stamped with its own
    /// deadline and followed by a full settle.
    pub fn advance_to(&mut self, now: u64) -> TickOutcome {
        let mut outcome = TickOutcome::default();

        for (process, deadline) in self.scheduler.due(now) {
            // An earlier tick in this batch may have stopped it.
            if !self.scheduler.is_running(process) {
                continue;
            }
            let before = Edges::capture(&self.state);

            match process {
                Process::IgnitionPoll => {
                    let event = self.ignition.poll(&mut self.state, deadline, self.rng.as_mut());
                    outcome.ignition = Some(event);
                }
                Process::FuelDrain => {
                    let (drained, entries) =
                        fuel::consume(&mut self.state.systems, self.config.fuel_tick_amount, deadline);
                    self.state.log_all(entries);
                    outcome.fuel_drained += drained;
                    self.notifier.notify(NotificationEvent::EngineHeartbeat);
                }
                Process::ReactorStep => {
                    let dt_ms = self.scheduler.period_ms(Process::ReactorStep);
                    if let Some(entry) = thermal::step(&mut self.state.systems, dt_ms, deadline) {
                        self.state.log(entry);
                    }
                }
                Process::Autosave => outcome.autosave_due = true,
                Process::ShipChime => self.notifier.notify(NotificationEvent::ShipOnline),
            }

            outcome.ran.push((process, deadline));
            self.settle(deadline, before);
        }

        outcome
    }

    /// Adopts a persisted snapshot. An ignition that was in flight belongs to
    /// another clock and is cancelled.
    pub fn restore(&mut self, state: GameState) {
        let now = self.clock.now_ms();
        self.state = state;
        self.log_cursor = self.state.logs.total_appended();

        self.ignition.abort(
            &mut self.state,
            LogEntry::new(
                now,
                LogLevel::Warning,
                "IGNITION SEQUENCE CANCELLED - Restored mid-ignition, engine must be restarted",
                "Engine Control",
            ),
        );

        let before = Edges::capture(&self.state);
        self.interlocks.settle(&mut self.state, &self.ignition, now);
        self.scheduler.restart(&self.state, now);
        self.fire_edges(before);
        info!(status = self.state.status().label(), "panel state restored");
    }

    /// Host reload after an emergency reset: every periodic process starts
    /// fresh.
    pub fn reload(&mut self) {
        let now = self.clock.now_ms();
        self.stats.reloads += 1;
        self.interlocks.settle(&mut self.state, &self.ignition, now);
        self.scheduler.restart(&self.state, now);
        info!("panel reloaded");
    }

    /// Entries appended since the previous call.
    pub fn take_new_entries(&mut self) -> Vec<LogEntry> {
        let fresh = self.state.logs.since(self.log_cursor).to_vec();
        self.log_cursor = self.state.logs.total_appended();
        fresh
    }

    pub fn save_to(&mut self, store: &dyn StateStore) -> bool {
        let now = self.clock.now_ms();
        let saved = persistence::save_stamped(store, &mut self.state, now);
        if saved {
            self.stats.saves += 1;
        } else {
            self.stats.failed_saves += 1;
        }
        saved
    }

    /// Stamps `last_saved` and hands back the snapshot to write elsewhere,
    /// with the stamp it replaced. Report the result with `finish_save`.
    pub fn begin_save(&mut self) -> (GameState, u64) {
        let previous = self.state.last_saved;
        self.state.last_saved = self.clock.now_ms();
        (self.state.clone(), previous)
    }

    /// Records the outcome of a save started with `begin_save`. A failed
    /// save puts the previous stamp back unless the state moved on since.
    pub fn finish_save(&mut self, stamped: u64, previous: u64, saved: bool) {
        if saved {
            self.stats.saves += 1;
            return;
        }
        self.stats.failed_saves += 1;
        if self.state.last_saved == stamped {
            self.state.last_saved = previous;
        }
    }

    pub fn status(&self) -> PanelStatus {
        PanelStatus::collect(
            &self.state,
            self.scheduler.get_stats(),
            self.interlocks.get_stats(),
            self.clock.now_ms(),
        )
    }

    pub fn get_stats(&self) -> &PanelStats {
        &self.stats
    }

    pub fn scheduler_stats(&self) -> &SchedulerStats {
        self.scheduler.get_stats()
    }

    pub fn interlock_stats(&self) -> &InterlockStats {
        self.interlocks.get_stats()
    }

    fn settle(&mut self, now: u64, before: Edges) -> SettleReport {
        let report = self.interlocks.settle(&mut self.state, &self.ignition, now);
        self.scheduler.sync(&self.state, now);
        self.fire_edges(before);

        debug_assert!(
            !(self.state.systems.engines && self.state.systems.engine_starting),
            "engines online while ignition in progress"
        );
        report
    }

    fn fire_edges(&self, before: Edges) {
        let after = Edges::capture(&self.state);
        if after.online && !before.online {
            self.notifier.notify(NotificationEvent::ShipOnline);
        }
        if after.engine_ready && !before.engine_ready {
            self.notifier.notify(NotificationEvent::EngineReady);
        }
        if after.engines && !before.engines {
            self.notifier.notify(NotificationEvent::EngineOnline);
        }
    }

    fn selected_console(&self) -> Console {
        self.state
            .controls
            .selected_console()
            .unwrap_or(self.state.current_console)
    }

    fn apply_toggle(&mut self, id: ControlId, now: u64) {
        match self.state.controls.toggle_id(id) {
            Some(ControlChange::Switched { id, on }) => {
                if let Some(entry) = log::control_entry(id, on, now) {
                    self.state.log(entry);
                }
            }
            Some(ControlChange::ConsoleSelected { console, .. }) => {
                self.state.current_console = console;
                self.state.log(LogEntry::new(
                    now,
                    LogLevel::Info,
                    format!("Switched to navigation console {}", console.label()),
                    "Navigation",
                ));
            }
            None => {
                self.ignore("toggle on a dial");
                return;
            }
        }

        if let Some(event) = toggle_notification(id) {
            self.notifier.notify(event);
        }
    }

    fn apply_level(&mut self, id: ControlId, value: f64, now: u64) {
        match self.state.controls.set_level(id, value) {
            Some(LevelUpdate::Stored(change)) => {
                if !change.in_range {
                    warn!(control = %id, value, "dial reading outside nominal range");
                }
                if let Some(entry) = log::dial_entry(change.id, change.value, change.in_range, now) {
                    self.state.log(entry);
                }
            }
            Some(LevelUpdate::Rejected { id, value }) => {
                warn!(control = %id, value, "non-finite dial reading rejected");
                self.state.log(log::rejected_dial_entry(id, value, now));
            }
            None => self.ignore("set value on a switch"),
        }
    }

    fn apply_numeric(&mut self, field: NumericField, value: f64, now: u64) {
        if !value.is_finite() {
            warn!(%field, value, "non-finite system value rejected");
            self.state.log(LogEntry::new(
                now,
                LogLevel::Warning,
                format!("{} rejected non-finite reading {}", field.label(), value),
                "Control Validation",
            ));
            return;
        }

        let previous = self.state.systems.numeric(field);
        let stored = self.state.systems.set_numeric(field, value);
        if let Some(entry) = log::numeric_entry(field, previous, stored, now) {
            self.state.log(entry);
        }
    }

    fn navigation_command(&mut self, text: &str, now: u64) {
        self.state.record_command(text);

        let (level, message) = match text.trim().to_lowercase().as_str() {
            "start" => {
                self.state.navigation_command_activated = true;
                (
                    LogLevel::Info,
                    "Navigation command interface activated - Navigation systems coming online".to_string(),
                )
            }
            "quit" => {
                self.state.navigation_command_activated = false;
                (
                    LogLevel::Warning,
                    "Navigation command interface deactivated - Navigation systems going offline".to_string(),
                )
            }
            _ => (LogLevel::Warning, format!("Unknown command: {}", text)),
        };
        self.state.log(LogEntry::new(now, level, message, NAVIGATION_SOURCE));
    }

    fn emergency_reset(&mut self, now: u64) {
        self.state = emergency::reset_state(&self.config, now);
        self.scheduler.stop_all();
        self.log_cursor = 0;
        self.stats.resets += 1;
    }

    fn ignore(&mut self, reason: &str) {
        self.stats.ignored_actions += 1;
        debug!(reason, "action ignored");
    }
}

fn toggle_notification(id: ControlId) -> Option<NotificationEvent> {
    use ControlId::*;

    let event = match id {
        MasterToggle | EngineMaster | CommsMaster => NotificationEvent::MasterPowerToggled,
        Pwr1 | Pwr2 => NotificationEvent::MainPowerToggled,
        Pwr5 | Pwr6 | Pwr7 | Pwr8 | Pwr9 | Pwr10 => NotificationEvent::BackupPowerToggled,
        EnginePwr1 | EnginePwr2 | EngineReady1 | EngineReady2 | CommsPwr1 | CommsPwr2 | Config1
        | Config2 | Config3 | Config4 | ChargeMode | FooterSafe | FooterArm | FooterLock | FooterKey
        | NavSelect1 | NavSelect2 | NavSelect3 | NavSelect4 | NavSelect5 | NavSelect6 | NavSelect7
        | NavSelect8 | FooterEmergency | FooterAbort => NotificationEvent::ConsolePowerToggled,
        _ => return None,
    };
    Some(event)
}
