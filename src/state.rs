use crate::config::PanelConfig;
use crate::controls::{ControlId, ControlStore, Console};
use crate::log::{LogBuffer, LogEntry};
use crate::subsystems::{ShipFlags, ShipStatus, StartupSequence, SystemSnapshot};
use heapless::Vec;
use serde::{Deserialize, Deserializer, Serialize};

pub const NAV_HISTORY_CAPACITY: usize = 8;

pub type CommandHistory = Vec<String, NAV_HISTORY_CAPACITY>;

/// Everything the panel persists. Missing fields in a stored snapshot take
/// their initial values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameState {
    pub controls: ControlStore,
    pub systems: SystemSnapshot,
    pub critical_controls_met: bool,
    pub spaceship_online: bool,
    pub spaceship_standby: bool,
    pub startup_sequence: StartupSequence,
    pub current_console: Console,
    pub logs: LogBuffer,
    pub last_saved: u64,
    pub navigation_command_activated: bool,
    #[serde(deserialize_with = "recent_commands")]
    pub navigation_command_history: CommandHistory,
}

impl GameState {
    /// The single source of the initial snapshot.
    pub fn initial(config: &PanelConfig, now: u64) -> Self {
        Self {
            controls: ControlStore::new(),
            systems: SystemSnapshot::with_starter_damage(config.starter_damage),
            critical_controls_met: false,
            spaceship_online: false,
            spaceship_standby: false,
            startup_sequence: StartupSequence::default(),
            current_console: Console::Nav1,
            logs: LogBuffer::new(),
            last_saved: now,
            navigation_command_activated: false,
            navigation_command_history: Vec::new(),
        }
    }

    pub fn ship_flags(&self) -> ShipFlags {
        ShipFlags {
            critical_controls_met: self.critical_controls_met,
            spaceship_online: self.spaceship_online,
            spaceship_standby: self.spaceship_standby,
            startup_sequence: self.startup_sequence,
        }
    }

    pub fn apply_flags(&mut self, flags: &ShipFlags) {
        self.critical_controls_met = flags.critical_controls_met;
        self.spaceship_online = flags.spaceship_online;
        self.spaceship_standby = flags.spaceship_standby;
        self.startup_sequence = flags.startup_sequence;
    }

    pub fn status(&self) -> ShipStatus {
        self.ship_flags().status()
    }

    pub fn log(&mut self, entry: LogEntry) {
        self.logs.push(entry);
    }

    pub fn log_all<I: IntoIterator<Item = LogEntry>>(&mut self, entries: I) {
        self.logs.extend(entries);
    }

    /// Records an operator command as `> text`, keeping the most recent eight.
    pub fn record_command(&mut self, text: &str) {
        if self.navigation_command_history.is_full() {
            self.navigation_command_history.remove(0);
        }
        let _ = self.navigation_command_history.push(format!("> {}", text));
    }

    pub fn emergency_engaged(&self) -> bool {
        self.controls.is_on(ControlId::Emergency)
    }

    pub fn visible_logs(&self) -> impl Iterator<Item = &LogEntry> {
        self.logs.visible(self.emergency_engaged())
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::initial(&PanelConfig::default(), 0)
    }
}

fn recent_commands<'de, D: Deserializer<'de>>(deserializer: D) -> Result<CommandHistory, D::Error> {
    let stored = std::vec::Vec::<String>::deserialize(deserializer)?;
    let skip = stored.len().saturating_sub(NAV_HISTORY_CAPACITY);
    Ok(stored.into_iter().skip(skip).collect())
}
