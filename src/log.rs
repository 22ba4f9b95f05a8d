//! Event log: bounded entry ring plus the fixed message tables for control
//! flips, dial moves and numeric band crossings.

use crate::controls::ControlId;
use crate::subsystems::NumericField;
use heapless::Vec;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

pub const LOG_CAPACITY: usize = 100;

/// Numeric changes smaller than this are not worth an entry.
const SIGNIFICANT_CHANGE: f64 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
    Critical,
    System,
}

impl LogLevel {
    pub fn label(self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Warning => "WARNING",
            LogLevel::Error => "ERROR",
            LogLevel::Critical => "CRITICAL",
            LogLevel::System => "SYSTEM",
        }
    }

    /// Entries the operator sees without emergency protocols engaged.
    pub fn always_visible(self) -> bool {
        matches!(self, LogLevel::Critical | LogLevel::Error | LogLevel::System)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: u64,
    pub level: LogLevel,
    pub message: String,
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl LogEntry {
    pub fn new(
        timestamp: u64,
        level: LogLevel,
        message: impl Into<String>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            timestamp,
            level,
            message: message.into(),
            source: source.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Insertion-ordered ring of the most recent entries.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogBuffer {
    entries: Vec<LogEntry, LOG_CAPACITY>,
    appended: u64,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append, evicting the oldest entry once the ring is full.
    pub fn push(&mut self, entry: LogEntry) {
        if self.entries.is_full() {
            self.entries.remove(0);
        }
        let _ = self.entries.push(entry);
        self.appended = self.appended.wrapping_add(1);

        debug_assert!(
            self.entries.len() <= LOG_CAPACITY,
            "log ring length {} exceeds capacity {}",
            self.entries.len(),
            LOG_CAPACITY
        );
    }

    pub fn extend<I: IntoIterator<Item = LogEntry>>(&mut self, entries: I) {
        for entry in entries {
            self.push(entry);
        }
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn latest(&self) -> Option<&LogEntry> {
        self.entries.last()
    }

    /// Running count of every entry ever appended, including evicted ones.
    pub fn total_appended(&self) -> u64 {
        self.appended
    }

    /// Entries appended after `cursor` (a previous `total_appended` value)
    /// that are still held by the ring.
    pub fn since(&self, cursor: u64) -> &[LogEntry] {
        let fresh = self.appended.saturating_sub(cursor);
        let fresh = usize::try_from(fresh).unwrap_or(usize::MAX).min(self.entries.len());
        &self.entries[self.entries.len() - fresh..]
    }

    /// Operator view: everything while emergency protocols are engaged,
    /// otherwise only critical, error and system entries.
    pub fn visible(&self, emergency_engaged: bool) -> impl Iterator<Item = &LogEntry> {
        self.entries
            .iter()
            .filter(move |entry| emergency_engaged || entry.level.always_visible())
    }
}

impl Serialize for LogBuffer {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.entries.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for LogBuffer {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let stored = std::vec::Vec::<LogEntry>::deserialize(deserializer)?;
        let mut buffer = LogBuffer::new();
        buffer.extend(stored);
        buffer.appended = buffer.entries.len() as u64;
        Ok(buffer)
    }
}

fn engaged(on: bool, when_on: &'static str, when_off: &'static str) -> &'static str {
    if on {
        when_on
    } else {
        when_off
    }
}

/// Entry for a flip of an operationally significant control.
pub fn control_entry(id: ControlId, on: bool, now: u64) -> Option<LogEntry> {
    use ControlId::*;

    let up_down = if on { LogLevel::System } else { LogLevel::Warning };
    let info_warn = if on { LogLevel::Info } else { LogLevel::Warning };

    let (level, message, source) = match id {
        MasterToggle => (
            up_down,
            format!(
                "MASTER POWER {} - Main power distribution {}",
                engaged(on, "ENGAGED", "DISENGAGED"),
                engaged(on, "active", "offline")
            ),
            "Power Systems",
        ),
        Pwr1 | Pwr2 | Pwr5 | Pwr6 | Pwr7 | Pwr8 | Pwr9 | Pwr10 => {
            let label = match id {
                Pwr1 => "PRIMARY REACTOR",
                Pwr2 => "SECONDARY REACTOR",
                Pwr5 => "BACKUP SYSTEMS",
                Pwr6 => "AUXILIARY POWER",
                Pwr7 => "EMERGENCY POWER",
                Pwr8 => "SHUTDOWN SYSTEMS",
                Pwr9 => "REACTOR CORE",
                _ => "COOLING SYSTEMS",
            };
            (
                up_down,
                format!(
                    "{} {} - Power distribution {}",
                    label,
                    engaged(on, "ONLINE", "OFFLINE"),
                    engaged(on, "engaged", "disengaged")
                ),
                "Power Systems",
            )
        }
        AuxPwr | PrimPwr | SecPwr => {
            let (label, grid) = match id {
                AuxPwr => ("AUXILIARY POWER", "Backup power systems"),
                PrimPwr => ("PRIMARY POWER", "Main power grid"),
                _ => ("SECONDARY POWER", "Secondary power grid"),
            };
            (
                up_down,
                format!(
                    "{} {} - {} {}",
                    label,
                    engaged(on, "ENGAGED", "OFFLINE"),
                    grid,
                    engaged(on, "active", "inactive")
                ),
                "Power Distribution",
            )
        }
        Emergency => (
            if on { LogLevel::Critical } else { LogLevel::Warning },
            format!(
                "EMERGENCY PROTOCOLS {} - All safety systems {}",
                engaged(on, "ACTIVATED", "DEACTIVATED"),
                engaged(on, "engaged", "standby")
            ),
            "Emergency Systems",
        ),
        FooterAbort => (
            if on { LogLevel::Critical } else { LogLevel::Warning },
            format!(
                "ABORT SEQUENCE {} - Mission abort protocols {}",
                engaged(on, "INITIATED", "CANCELLED"),
                engaged(on, "active", "standby")
            ),
            "Emergency Systems",
        ),
        Shield => (
            info_warn,
            format!(
                "SHIELD SYSTEMS {} - Defensive energy field {}",
                engaged(on, "ACTIVATED", "DEACTIVATED"),
                engaged(on, "online", "offline")
            ),
            "Defensive Systems",
        ),
        Config1 | Config2 | Config3 | Config4 => {
            let label = match id {
                Config1 => "AUTO-RECHARGE",
                Config2 => "BOOST MODE",
                Config3 => "REGENERATION",
                _ => "STANDBY MODE",
            };
            (
                LogLevel::Info,
                format!(
                    "BATTERY CONFIG: {} {} - Power management updated",
                    label,
                    engaged(on, "ENABLED", "DISABLED")
                ),
                "Battery Configuration",
            )
        }
        ChargeMode => (
            if on { LogLevel::System } else { LogLevel::Info },
            format!(
                "CHARGE MODE {} - Battery charging {}",
                engaged(on, "ACTIVATED", "DEACTIVATED"),
                engaged(on, "engaged", "standby")
            ),
            "Battery Systems",
        ),
        Feed1 | Feed2 | Feed3 => {
            let label = match id {
                Feed1 => "PRIMARY FEED",
                Feed2 => "SECONDARY FEED",
                _ => "AUXILIARY FEED",
            };
            (
                up_down,
                format!(
                    "ENGINE POWER {} {} - Propulsion power {}",
                    label,
                    engaged(on, "ENGAGED", "OFFLINE"),
                    engaged(on, "connected", "disconnected")
                ),
                "Engine Power Systems",
            )
        }
        Forward | Reverse => (
            info_warn,
            format!(
                "THRUST DIRECTION: {} {} - Engine thrust vector {}",
                if id == Forward { "FORWARD" } else { "REVERSE" },
                engaged(on, "ENGAGED", "OFFLINE"),
                engaged(on, "active", "neutral")
            ),
            "Propulsion Control",
        ),
        EngineMaster => (
            up_down,
            format!(
                "ENGINE MASTER POWER {} - Engine power distribution {}",
                engaged(on, "ENGAGED", "DISENGAGED"),
                engaged(on, "active", "offline")
            ),
            "Engine Power Supply",
        ),
        EnginePwr1 | EnginePwr2 => (
            up_down,
            format!(
                "{} {} - Engine auxiliary power {}",
                if id == EnginePwr1 { "ENGINE POWER A" } else { "ENGINE POWER B" },
                engaged(on, "ONLINE", "OFFLINE"),
                engaged(on, "engaged", "disengaged")
            ),
            "Engine Power Supply",
        ),
        EngineReady1 | EngineReady2 => (
            info_warn,
            format!(
                "{} {} - Engine priming sequence {}",
                if id == EngineReady1 { "ENGINE READY 1" } else { "ENGINE READY 2" },
                engaged(on, "ENGAGED", "STANDBY"),
                engaged(on, "active", "incomplete")
            ),
            "Engine Priming",
        ),
        FooterSafe | FooterArm | FooterLock | FooterKey => {
            let label = match id {
                FooterSafe => "SAFE",
                FooterArm => "ARM",
                FooterLock => "LOCK",
                _ => "KEY",
            };
            (
                up_down,
                format!(
                    "SAFETY SYSTEM: {} {} - {}",
                    label,
                    engaged(on, "ENGAGED", "DISENGAGED"),
                    engaged(on, "Safety protocol activated", "Safety protocol deactivated")
                ),
                "Safety Systems",
            )
        }
        Distribute => (
            info_warn,
            format!(
                "POWER DISTRIBUTION {} - {}",
                engaged(on, "ACTIVE", "OFFLINE"),
                engaged(on, "Power routing engaged", "Power routing disabled")
            ),
            "Power Distribution",
        ),
        Reserve => (
            info_warn,
            format!(
                "POWER RESERVE {} - {}",
                engaged(on, "ENGAGED", "OFFLINE"),
                engaged(on, "Emergency power available", "Emergency power disconnected")
            ),
            "Power Reserve",
        ),
        Boost => (
            if on { LogLevel::Warning } else { LogLevel::Info },
            format!(
                "POWER BOOST {} - {}",
                engaged(on, "ACTIVATED", "OFFLINE"),
                engaged(on, "Overload protection disabled", "Normal power limits restored")
            ),
            "Power Systems",
        ),
        Margin => (
            info_warn,
            format!(
                "POWER MARGIN {} - {}",
                engaged(on, "ENGAGED", "OFFLINE"),
                engaged(on, "Power reserve buffer active", "Power reserve buffer disabled")
            ),
            "Power Management",
        ),
        Clear => (
            LogLevel::Info,
            format!(
                "SYSTEM CLEAR {} - {}",
                engaged(on, "EXECUTED", "CANCELLED"),
                engaged(on, "System cache flushed", "Clear operation aborted")
            ),
            "System Control",
        ),
        Execute => (
            up_down,
            format!(
                "COMMAND EXECUTE {} - {}",
                engaged(on, "ENGAGED", "STANDBY"),
                engaged(on, "System command processing active", "Command execution paused")
            ),
            "System Control",
        ),
        _ => return None,
    };

    Some(LogEntry::new(now, level, message, source))
}

/// Entry for a stored dial value. `in_range` is false for readings outside
/// the nominal 0-100 span, which are kept but flagged.
pub fn dial_entry(id: ControlId, value: f64, in_range: bool, now: u64) -> Option<LogEntry> {
    use ControlId::*;

    if !in_range {
        return Some(LogEntry::new(
            now,
            LogLevel::Warning,
            format!("{} reading {} outside nominal range 0-100", id.key().to_uppercase(), value),
            "Control Validation",
        ));
    }

    let side = |port: ControlId| if id == port { "PORT" } else { "STARBOARD" };

    let entry = match id {
        Out1 | Out2 => LogEntry::new(
            now,
            LogLevel::Info,
            format!("{} BATTERY OUTPUT set to {}% - Power distribution adjusted", side(Out1), value),
            "Battery Systems",
        ),
        Mon1 | Mon2 => LogEntry::new(
            now,
            LogLevel::Info,
            format!("{} BATTERY MONITOR level: {}% - System monitoring updated", side(Mon1), value),
            "Battery Monitoring",
        ),
        Cue1 => {
            let high = value > 50.0;
            LogEntry::new(
                now,
                if high { LogLevel::Warning } else { LogLevel::Info },
                format!(
                    "ALERT SYSTEM level: {}% - {}",
                    value,
                    engaged(high, "High alert condition", "Normal monitoring")
                ),
                "Alert Systems",
            )
        }
        NavThrust => LogEntry::new(
            now,
            LogLevel::Info,
            format!("THRUST CONTROL set to {}% - Propulsion thrust vector adjusted", value),
            "Navigation Control",
        ),
        NavVector => LogEntry::new(
            now,
            LogLevel::Info,
            format!("VECTOR CONTROL set to {}% - Engine vector control updated", value),
            "Navigation Control",
        ),
        _ => return None,
    };

    Some(entry)
}

pub fn rejected_dial_entry(id: ControlId, value: f64, now: u64) -> LogEntry {
    LogEntry::new(
        now,
        LogLevel::Warning,
        format!("{} rejected non-finite reading {}", id.key().to_uppercase(), value),
        "Control Validation",
    )
}

/// Severity band of a numeric reading, or `None` for fields without a
/// threshold table.
pub fn band(field: NumericField, value: f64) -> Option<LogLevel> {
    let level = match field {
        NumericField::HullIntegrity => {
            if value < 20.0 {
                LogLevel::Critical
            } else if value < 50.0 {
                LogLevel::Error
            } else if value < 80.0 {
                LogLevel::Warning
            } else {
                LogLevel::Info
            }
        }
        NumericField::BatteryPower => {
            if value < 20.0 {
                LogLevel::Warning
            } else {
                LogLevel::Info
            }
        }
        NumericField::Fuel(_) => {
            if value < 10.0 {
                LogLevel::Critical
            } else if value < 25.0 {
                LogLevel::Warning
            } else {
                LogLevel::Info
            }
        }
        NumericField::ReactorTemperature => {
            if value > 800.0 {
                LogLevel::Critical
            } else if value > 600.0 {
                LogLevel::Error
            } else if value > 400.0 {
                LogLevel::Warning
            } else {
                LogLevel::Info
            }
        }
        NumericField::ShieldStrength => {
            if value < 20.0 {
                LogLevel::Critical
            } else if value < 50.0 {
                LogLevel::Warning
            } else {
                LogLevel::Info
            }
        }
        NumericField::WeaponCharge => {
            if value > 90.0 {
                LogLevel::Warning
            } else {
                LogLevel::Info
            }
        }
        NumericField::MissionTime | NumericField::Heading | NumericField::Speed => return None,
    };
    Some(level)
}

fn numeric_message(field: NumericField, value: f64) -> String {
    let label = field.label();
    match field {
        NumericField::HullIntegrity => format!(
            "{} at {:.1}% - {}",
            label,
            value,
            if value < 50.0 {
                "Critical structural damage"
            } else if value < 80.0 {
                "Hull integrity compromised"
            } else {
                "Structural integrity nominal"
            }
        ),
        NumericField::BatteryPower => format!(
            "{} at {:.1}% - {}",
            label,
            value,
            engaged(value < 20.0, "Low power reserves", "Power reserves adequate")
        ),
        NumericField::Fuel(_) => format!(
            "{} at {:.1}% - {}",
            label,
            value,
            if value < 10.0 {
                "Critical fuel reserves"
            } else if value < 25.0 {
                "Low fuel warning"
            } else {
                "Fuel reserves adequate"
            }
        ),
        NumericField::ReactorTemperature => format!(
            "{} at {:.0}°C - {}",
            label,
            value,
            if value > 800.0 {
                "Critical overheating"
            } else if value > 600.0 {
                "Temperature critical"
            } else if value > 400.0 {
                "Temperature elevated"
            } else {
                "Temperature nominal"
            }
        ),
        NumericField::ShieldStrength => format!(
            "{} at {:.1}% - {}",
            label,
            value,
            if value < 20.0 {
                "Shield failure imminent"
            } else if value < 50.0 {
                "Shield weakening"
            } else {
                "Shield integrity maintained"
            }
        ),
        NumericField::WeaponCharge => format!(
            "{} at {:.1}% - {}",
            label,
            value,
            engaged(value > 90.0, "Weapons charged and ready", "Weapons charging")
        ),
        NumericField::Speed => format!("{} {:.2} LY/h - Current velocity", label, value),
        NumericField::Heading => format!("{} {:.1}° - Course updated", label, value),
        NumericField::MissionTime => {
            let seconds = value.max(0.0) as u64;
            format!("{} {}h {}m elapsed", label, seconds / 3600, (seconds % 3600) / 60)
        }
    }
}

/// Entry for a numeric update. Banded fields log only when the band changes;
/// unbanded fields log any significant change.
pub fn numeric_entry(field: NumericField, previous: f64, value: f64, now: u64) -> Option<LogEntry> {
    let level = match (band(field, previous), band(field, value)) {
        (Some(before), Some(after)) if before == after => return None,
        (_, Some(after)) => after,
        (_, None) if (value - previous).abs() < SIGNIFICANT_CHANGE => return None,
        (_, None) => LogLevel::Info,
    };

    Some(LogEntry::new(now, level, numeric_message(field, value), "Ship Systems"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subsystems::fuel::Reservoir;

    fn entry(n: u64) -> LogEntry {
        LogEntry::new(n, LogLevel::Info, format!("entry {}", n), "Test")
    }

    #[test]
    fn test_ring_evicts_oldest() {
        let mut logs = LogBuffer::new();
        for n in 0..(LOG_CAPACITY as u64 + 5) {
            logs.push(entry(n));
        }
        assert_eq!(logs.len(), LOG_CAPACITY);
        assert_eq!(logs.entries()[0].timestamp, 5);
        assert_eq!(logs.latest().map(|e| e.timestamp), Some(LOG_CAPACITY as u64 + 4));
    }

    #[test]
    fn test_since_cursor() {
        let mut logs = LogBuffer::new();
        logs.push(entry(1));
        let cursor = logs.total_appended();
        logs.push(entry(2));
        logs.push(entry(3));
        let fresh: std::vec::Vec<u64> = logs.since(cursor).iter().map(|e| e.timestamp).collect();
        assert_eq!(fresh, vec![2, 3]);
        assert!(logs.since(logs.total_appended()).is_empty());
    }

    #[test]
    fn test_visible_filter() {
        let mut logs = LogBuffer::new();
        logs.push(LogEntry::new(1, LogLevel::Info, "a", "T"));
        logs.push(LogEntry::new(2, LogLevel::Critical, "b", "T"));
        logs.push(LogEntry::new(3, LogLevel::Warning, "c", "T"));
        logs.push(LogEntry::new(4, LogLevel::System, "d", "T"));
        assert_eq!(logs.visible(false).count(), 2);
        assert_eq!(logs.visible(true).count(), 4);
    }

    #[test]
    fn test_reactor_bands_log_once_per_crossing() {
        let field = NumericField::ReactorTemperature;
        assert!(numeric_entry(field, 150.0, 300.0, 0).is_none());
        let warn = numeric_entry(field, 390.0, 410.0, 0);
        assert_eq!(warn.map(|e| e.level), Some(LogLevel::Warning));
        assert!(numeric_entry(field, 410.0, 500.0, 0).is_none());
        let crit = numeric_entry(field, 790.0, 810.0, 0);
        assert_eq!(crit.map(|e| e.level), Some(LogLevel::Critical));
    }

    #[test]
    fn test_fuel_band_crossing() {
        let field = NumericField::Fuel(Reservoir::Main);
        assert!(numeric_entry(field, 50.0, 49.9, 0).is_none());
        let low = numeric_entry(field, 25.0, 24.9, 0).map(|e| e.level);
        assert_eq!(low, Some(LogLevel::Warning));
        let critical = numeric_entry(field, 10.0, 9.9, 0).map(|e| e.level);
        assert_eq!(critical, Some(LogLevel::Critical));
    }

    #[test]
    fn test_unbanded_fields_log_changes() {
        let heading = numeric_entry(NumericField::Heading, 0.0, 90.0, 0);
        assert_eq!(heading.map(|e| e.message), Some("SHIP HEADING 90.0° - Course updated".to_string()));
        assert!(numeric_entry(NumericField::Heading, 90.0, 90.001, 0).is_none());
    }

    #[test]
    fn test_small_step_across_band_logs_once() {
        let field = NumericField::HullIntegrity;
        let crossing = numeric_entry(field, 80.0, 79.995, 0).map(|e| e.level);
        assert_eq!(crossing, Some(LogLevel::Warning));
        assert!(numeric_entry(field, 79.995, 79.99, 0).is_none());

        let fuel = NumericField::Fuel(Reservoir::Main);
        let mut level = 25.002;
        let mut logged = 0;
        for _ in 0..10 {
            let next = level - 0.005;
            logged += numeric_entry(fuel, level, next, 0).iter().count();
            level = next;
        }
        assert_eq!(logged, 1);
    }

    #[test]
    fn test_control_table() {
        let on = control_entry(ControlId::MasterToggle, true, 7).map(|e| (e.level, e.message));
        assert_eq!(
            on,
            Some((
                LogLevel::System,
                "MASTER POWER ENGAGED - Main power distribution active".to_string()
            ))
        );
        let boost = control_entry(ControlId::Boost, true, 0).map(|e| e.level);
        assert_eq!(boost, Some(LogLevel::Warning));
        assert!(control_entry(ControlId::Mute, true, 0).is_none());
    }

    #[test]
    fn test_alert_dial_escalates() {
        let high = dial_entry(ControlId::Cue1, 75.0, true, 0).map(|e| e.level);
        assert_eq!(high, Some(LogLevel::Warning));
        let low = dial_entry(ControlId::Cue1, 25.0, true, 0).map(|e| e.level);
        assert_eq!(low, Some(LogLevel::Info));
        let out = dial_entry(ControlId::Out1, 140.0, false, 0).map(|e| e.source);
        assert_eq!(out.as_deref(), Some("Control Validation"));
    }

    #[test]
    fn test_buffer_deserialize_truncates() {
        let many: std::vec::Vec<LogEntry> = (0..150).map(entry).collect();
        let json = serde_json::to_string(&many).unwrap();
        let logs: LogBuffer = serde_json::from_str(&json).unwrap();
        assert_eq!(logs.len(), LOG_CAPACITY);
        assert_eq!(logs.entries()[0].timestamp, 50);
        assert_eq!(logs.total_appended(), LOG_CAPACITY as u64);
    }
}
