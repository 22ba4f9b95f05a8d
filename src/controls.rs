//! Control store: the flat, fixed set of panel inputs.
//!
//! Every control is known at compile time. The store never creates or removes
//! entries, it only mutates them. Unknown keys coming from outside are ignored.

use crate::error::UnknownControl;
use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use static_assertions::const_assert_eq;
use std::collections::BTreeMap;

pub const DIAL_MIN: f64 = 0.0;
pub const DIAL_MAX: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ControlKind {
    Switch,
    Dial,
}

macro_rules! define_controls {
    ($($variant:ident => $key:literal, $kind:ident;)+) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub enum ControlId {
            $($variant,)+
        }

        impl ControlId {
            pub const ALL: &'static [ControlId] = &[$(ControlId::$variant,)+];

            /// Stable string key used by operators and the persisted snapshot.
            pub fn key(self) -> &'static str {
                match self {
                    $(ControlId::$variant => $key,)+
                }
            }

            pub fn kind(self) -> ControlKind {
                match self {
                    $(ControlId::$variant => ControlKind::$kind,)+
                }
            }
        }

        impl FromStr for ControlId {
            type Err = UnknownControl;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($key => Ok(ControlId::$variant),)+
                    _ => Err(UnknownControl(s.to_string())),
                }
            }
        }
    };
}

define_controls! {
    // Power & gain panel
    Pwr1 => "pwr-1", Switch;
    Pwr2 => "pwr-2", Switch;
    Pwr5 => "pwr-5", Switch;
    Pwr6 => "pwr-6", Switch;
    Pwr7 => "pwr-7", Switch;
    Pwr8 => "pwr-8", Switch;
    Pwr9 => "pwr-9", Switch;
    Pwr10 => "pwr-10", Switch;
    MasterToggle => "master-toggle", Switch;
    // Console readout toggles
    AuxPwr => "aux-pwr", Switch;
    PrimPwr => "prim-pwr", Switch;
    SecPwr => "sec-pwr", Switch;
    Override => "override", Switch;
    AutoCal => "auto-cal", Switch;
    Manual => "manual", Switch;
    Feed1 => "feed-1", Switch;
    Feed2 => "feed-2", Switch;
    Feed3 => "feed-3", Switch;
    Sync => "sync", Switch;
    Lock => "lock", Switch;
    Release => "release", Switch;
    Shield => "shield", Switch;
    Isolate => "isolate", Switch;
    Latch => "latch", Switch;
    Emergency => "emergency", Switch;
    Reset => "reset", Switch;
    Standby => "standby", Switch;
    Forward => "forward", Switch;
    Reverse => "reverse", Switch;
    Active => "active", Switch;
    Record => "record", Switch;
    Monitor => "monitor", Switch;
    Mute => "mute", Switch;
    Distribute => "distribute", Switch;
    Reserve => "reserve", Switch;
    Boost => "boost", Switch;
    Margin => "margin", Switch;
    Clear => "clear", Switch;
    Execute => "execute", Switch;
    Digital1 => "digital-1", Switch;
    Digital2 => "digital-2", Switch;
    Analog => "analog", Switch;
    Cache => "cache", Switch;
    Flush => "flush", Switch;
    Buffer => "buffer", Switch;
    Limit => "limit", Switch;
    Thresh => "thresh", Switch;
    Gate => "gate", Switch;
    Comp => "comp", Switch;
    LowFreq => "low-freq", Switch;
    MidFreq => "mid-freq", Switch;
    HiFreq => "hi-freq", Switch;
    // Footer: SAFE, ARM, LOCK, KEY, NAV.1-NAV.8, EMERGENCY, ABORT
    FooterSafe => "f0", Switch;
    FooterArm => "f1", Switch;
    FooterLock => "f2", Switch;
    FooterKey => "f3", Switch;
    NavSelect1 => "f4", Switch;
    NavSelect2 => "f5", Switch;
    NavSelect3 => "f6", Switch;
    NavSelect4 => "f7", Switch;
    NavSelect5 => "f8", Switch;
    NavSelect6 => "f9", Switch;
    NavSelect7 => "f10", Switch;
    NavSelect8 => "f11", Switch;
    FooterEmergency => "f12", Switch;
    FooterAbort => "f13", Switch;
    // Battery control
    Config1 => "config-1", Switch;
    Config2 => "config-2", Switch;
    Config3 => "config-3", Switch;
    Config4 => "config-4", Switch;
    ChargeMode => "charge-mode", Switch;
    Out1 => "out-1", Dial;
    Out2 => "out-2", Dial;
    Mon1 => "mon-1", Dial;
    Mon2 => "mon-2", Dial;
    Cue1 => "cue-1", Dial;
    // Engine power supply
    EngineMaster => "engine-master", Switch;
    EnginePwr1 => "engine-pwr-1", Switch;
    EnginePwr2 => "engine-pwr-2", Switch;
    EngineReady1 => "engine-ready-1", Switch;
    EngineReady2 => "engine-ready-2", Switch;
    // Navigation console
    NavThrust => "nav-thrust", Dial;
    NavVector => "nav-vector", Dial;
    // Communications power supply
    CommsMaster => "comms-master", Switch;
    CommsPwr1 => "comms-pwr-1", Switch;
    CommsPwr2 => "comms-pwr-2", Switch;
    // Outernet connection array
    ConnSatellite => "conn-satellite", Switch;
    ConnRadio => "conn-radio", Switch;
    ConnLaser => "conn-laser", Switch;
    ConnQuantum => "conn-quantum", Switch;
    ConnMicrowave => "conn-microwave", Switch;
    ConnInfrared => "conn-infrared", Switch;
    ConnPlasma => "conn-plasma", Switch;
    ConnNeural => "conn-neural", Switch;
    ConnGravitic => "conn-gravitic", Switch;
    ConnPsionic => "conn-psionic", Switch;
    ConnTemporal => "conn-temporal", Switch;
    ConnDimensional => "conn-dimensional", Switch;
    ConnSubspace => "conn-subspace", Switch;
    ConnHyperwave => "conn-hyperwave", Switch;
    ConnTachyon => "conn-tachyon", Switch;
    ConnDarkmatter => "conn-darkmatter", Switch;
}

impl fmt::Display for ControlId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl Serialize for ControlId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.key())
    }
}

impl<'de> Deserialize<'de> for ControlId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let key = String::deserialize(deserializer)?;
        key.parse().map_err(serde::de::Error::custom)
    }
}

/// The eight navigation consoles addressed by the footer selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Console {
    Nav1,
    Nav2,
    Nav3,
    Nav4,
    Nav5,
    Nav6,
    Nav7,
    Nav8,
}

impl Console {
    pub const ALL: [Console; 8] = [
        Console::Nav1,
        Console::Nav2,
        Console::Nav3,
        Console::Nav4,
        Console::Nav5,
        Console::Nav6,
        Console::Nav7,
        Console::Nav8,
    ];

    fn index(self) -> usize {
        Self::ALL.iter().position(|c| *c == self).unwrap_or(0)
    }

    pub fn selector(self) -> ControlId {
        CONSOLE_SELECTOR[self.index()]
    }

    pub fn from_selector(id: ControlId) -> Option<Console> {
        CONSOLE_SELECTOR
            .iter()
            .position(|slot| *slot == id)
            .map(|index| Self::ALL[index])
    }

    /// Next console, wrapping from NAV8 back to NAV1.
    pub fn next(self) -> Console {
        Self::ALL[(self.index() + 1) % Self::ALL.len()]
    }

    /// Previous console, wrapping from NAV1 to NAV8.
    pub fn previous(self) -> Console {
        Self::ALL[(self.index() + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    pub fn label(self) -> &'static str {
        match self {
            Console::Nav1 => "NAV1",
            Console::Nav2 => "NAV2",
            Console::Nav3 => "NAV3",
            Console::Nav4 => "NAV4",
            Console::Nav5 => "NAV5",
            Console::Nav6 => "NAV6",
            Console::Nav7 => "NAV7",
            Console::Nav8 => "NAV8",
        }
    }
}

impl Default for Console {
    fn default() -> Self {
        Console::Nav1
    }
}

/// Radio group: exactly one slot is on at any time.
pub const CONSOLE_SELECTOR: [ControlId; 8] = [
    ControlId::NavSelect1,
    ControlId::NavSelect2,
    ControlId::NavSelect3,
    ControlId::NavSelect4,
    ControlId::NavSelect5,
    ControlId::NavSelect6,
    ControlId::NavSelect7,
    ControlId::NavSelect8,
];

pub const DEFAULT_CONSOLE_SLOT: ControlId = ControlId::NavSelect1;

const_assert_eq!(CONSOLE_SELECTOR.len(), Console::ALL.len());

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ControlValue {
    Switch(bool),
    Level(f64),
}

impl ControlValue {
    fn default_for(id: ControlId) -> Self {
        match id.kind() {
            ControlKind::Switch => ControlValue::Switch(id == DEFAULT_CONSOLE_SLOT),
            ControlKind::Dial => ControlValue::Level(0.0),
        }
    }

    pub fn is_on(self) -> bool {
        matches!(self, ControlValue::Switch(true))
    }

    pub fn level(self) -> Option<f64> {
        match self {
            ControlValue::Level(value) => Some(value),
            ControlValue::Switch(_) => None,
        }
    }

    fn matches_kind(self, kind: ControlKind) -> bool {
        matches!(
            (self, kind),
            (ControlValue::Switch(_), ControlKind::Switch) | (ControlValue::Level(_), ControlKind::Dial)
        )
    }
}

/// Result of a toggle that actually changed something.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlChange {
    Switched { id: ControlId, on: bool },
    ConsoleSelected { id: ControlId, console: Console },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelChange {
    pub id: ControlId,
    pub previous: f64,
    pub value: f64,
    pub in_range: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LevelUpdate {
    Stored(LevelChange),
    /// Non-finite input; the previous value is kept.
    Rejected { id: ControlId, value: f64 },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ControlStore {
    values: BTreeMap<ControlId, ControlValue>,
}

impl ControlStore {
    pub fn new() -> Self {
        let values = ControlId::ALL
            .iter()
            .map(|id| (*id, ControlValue::default_for(*id)))
            .collect();
        Self { values }
    }

    /// Toggle by string key. Unknown keys and dials are ignored.
    pub fn toggle(&mut self, key: &str) -> Option<ControlChange> {
        let id = key.parse::<ControlId>().ok()?;
        self.toggle_id(id)
    }

    pub fn toggle_id(&mut self, id: ControlId) -> Option<ControlChange> {
        if id.kind() != ControlKind::Switch {
            return None;
        }

        if let Some(console) = Console::from_selector(id) {
            for slot in CONSOLE_SELECTOR {
                self.values.insert(slot, ControlValue::Switch(false));
            }
            self.values.insert(id, ControlValue::Switch(true));
            return Some(ControlChange::ConsoleSelected { id, console });
        }

        let on = !self.is_on(id);
        self.values.insert(id, ControlValue::Switch(on));
        Some(ControlChange::Switched { id, on })
    }

    /// Overwrite a dial by string key. The value is stored as given; range is
    /// reported back, not enforced.
    pub fn set_value(&mut self, key: &str, value: f64) -> Option<LevelUpdate> {
        let id = key.parse::<ControlId>().ok()?;
        self.set_level(id, value)
    }

    pub fn set_level(&mut self, id: ControlId, value: f64) -> Option<LevelUpdate> {
        if id.kind() != ControlKind::Dial {
            return None;
        }
        if !value.is_finite() {
            return Some(LevelUpdate::Rejected { id, value });
        }

        let previous = self.level(id);
        self.values.insert(id, ControlValue::Level(value));
        Some(LevelUpdate::Stored(LevelChange {
            id,
            previous,
            value,
            in_range: (DIAL_MIN..=DIAL_MAX).contains(&value),
        }))
    }

    /// Write a switch directly. Returns `true` when the value changed.
    pub fn force_switch(&mut self, id: ControlId, on: bool) -> bool {
        if id.kind() != ControlKind::Switch || self.is_on(id) == on {
            return false;
        }
        self.values.insert(id, ControlValue::Switch(on));
        true
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn get(&self, id: ControlId) -> ControlValue {
        self.values
            .get(&id)
            .copied()
            .unwrap_or_else(|| ControlValue::default_for(id))
    }

    pub fn is_on(&self, id: ControlId) -> bool {
        self.get(id).is_on()
    }

    pub fn all_on(&self, ids: &[ControlId]) -> bool {
        ids.iter().all(|id| self.is_on(*id))
    }

    /// Raw dial reading; switches read as 0.
    pub fn level(&self, id: ControlId) -> f64 {
        self.get(id).level().unwrap_or(0.0)
    }

    pub fn level_clamped(&self, id: ControlId) -> f64 {
        self.level(id).clamp(DIAL_MIN, DIAL_MAX)
    }

    pub fn selected_console(&self) -> Option<Console> {
        CONSOLE_SELECTOR
            .iter()
            .find(|slot| self.is_on(**slot))
            .and_then(|slot| Console::from_selector(*slot))
    }

    pub fn iter(&self) -> impl Iterator<Item = (ControlId, ControlValue)> + '_ {
        self.values.iter().map(|(id, value)| (*id, *value))
    }

    fn normalize_selector(&mut self) {
        let selected = self.selected_console().unwrap_or_default();
        for slot in CONSOLE_SELECTOR {
            self.values.insert(slot, ControlValue::Switch(false));
        }
        self.values.insert(selected.selector(), ControlValue::Switch(true));
    }
}

impl Default for ControlStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Serialize for ControlStore {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.values.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ControlStore {
    /// Merges a persisted map onto the defaults. Unknown keys, values of the
    /// wrong kind and non-finite levels are dropped.
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, ControlValue>::deserialize(deserializer)?;
        let mut store = ControlStore::new();

        for (key, value) in raw {
            let Ok(id) = key.parse::<ControlId>() else {
                continue;
            };
            if !value.matches_kind(id.kind()) {
                continue;
            }
            if let ControlValue::Level(level) = value {
                if !level.is_finite() {
                    continue;
                }
            }
            store.values.insert(id, value);
        }

        store.normalize_selector();
        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_set_is_fixed() {
        let store = ControlStore::new();
        assert_eq!(ControlId::ALL.len(), 102);
        assert_eq!(store.iter().count(), ControlId::ALL.len());
    }

    #[test]
    fn test_keys_round_trip() {
        for id in ControlId::ALL {
            assert_eq!(id.key().parse::<ControlId>(), Ok(*id));
        }
        assert!("pwr-3".parse::<ControlId>().is_err());
    }

    #[test]
    fn test_defaults() {
        let store = ControlStore::new();
        assert!(store.is_on(ControlId::NavSelect1));
        assert!(!store.is_on(ControlId::Pwr1));
        assert_eq!(store.level(ControlId::Out1), 0.0);
        assert_eq!(store.selected_console(), Some(Console::Nav1));
    }

    #[test]
    fn test_toggle_flips_switch() {
        let mut store = ControlStore::new();
        assert_eq!(
            store.toggle("shield"),
            Some(ControlChange::Switched { id: ControlId::Shield, on: true })
        );
        assert!(store.is_on(ControlId::Shield));
        store.toggle("shield");
        assert!(!store.is_on(ControlId::Shield));
    }

    #[test]
    fn test_toggle_ignores_unknown_and_dials() {
        let mut store = ControlStore::new();
        let before = store.clone();
        assert_eq!(store.toggle("warp-core"), None);
        assert_eq!(store.toggle("out-1"), None);
        assert_eq!(store, before);
    }

    #[test]
    fn test_selector_is_radio_group() {
        let mut store = ControlStore::new();
        store.toggle("f7");
        let on: Vec<_> = CONSOLE_SELECTOR.iter().filter(|id| store.is_on(**id)).collect();
        assert_eq!(on, vec![&ControlId::NavSelect4]);
        assert_eq!(store.selected_console(), Some(Console::Nav4));

        // Re-selecting the active slot keeps it on
        store.toggle("f7");
        assert!(store.is_on(ControlId::NavSelect4));
    }

    #[test]
    fn test_set_value_keeps_out_of_range() {
        let mut store = ControlStore::new();
        let update = store.set_value("cue-1", 150.0);
        match update {
            Some(LevelUpdate::Stored(change)) => {
                assert!(!change.in_range);
                assert_eq!(change.previous, 0.0);
            }
            other => panic!("unexpected update {:?}", other),
        }
        assert_eq!(store.level(ControlId::Cue1), 150.0);
        assert_eq!(store.level_clamped(ControlId::Cue1), 100.0);
    }

    #[test]
    fn test_set_value_rejects_non_finite() {
        let mut store = ControlStore::new();
        store.set_value("out-2", 40.0);
        assert!(matches!(
            store.set_value("out-2", f64::NAN),
            Some(LevelUpdate::Rejected { .. })
        ));
        assert_eq!(store.level(ControlId::Out2), 40.0);
    }

    #[test]
    fn test_set_value_ignores_switches() {
        let mut store = ControlStore::new();
        assert_eq!(store.set_value("engine-master", 1.0), None);
        assert!(!store.is_on(ControlId::EngineMaster));
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut store = ControlStore::new();
        store.toggle("pwr-1");
        store.toggle("f9");
        store.set_value("nav-thrust", 75.0);
        store.reset();
        assert_eq!(store, ControlStore::new());
    }

    #[test]
    fn test_deserialize_merges_onto_defaults() {
        let json = r#"{"pwr-1": true, "out-1": 42.5, "warp-core": true, "shield": 3.0, "f6": true, "f4": false}"#;
        let store: ControlStore = serde_json::from_str(json).unwrap();
        assert!(store.is_on(ControlId::Pwr1));
        assert_eq!(store.level(ControlId::Out1), 42.5);
        // Wrong kind dropped
        assert!(!store.is_on(ControlId::Shield));
        assert_eq!(store.selected_console(), Some(Console::Nav3));
        assert_eq!(store.iter().count(), ControlId::ALL.len());
    }

    #[test]
    fn test_console_cycling_wraps() {
        assert_eq!(Console::Nav8.next(), Console::Nav1);
        assert_eq!(Console::Nav1.previous(), Console::Nav8);
        assert_eq!(Console::Nav3.selector(), ControlId::NavSelect3);
    }
}
