pub mod comms;
pub mod engine;
pub mod fuel;
pub mod power;
pub mod thermal;

pub use engine::IgnitionPhase;
pub use fuel::{FuelTanks, Reservoir};
pub use power::{ShipFlags, ShipStatus, StartupSequence};

use core::fmt;
use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::ActionParseError;

pub const HULL_INTEGRITY_START: f64 = 98.7;
pub const BATTERY_POWER_START: f64 = 98.7;
pub const REACTOR_IDLE_C: f64 = 150.0;
pub const REACTOR_MAX_C: f64 = 2500.0;
pub const DEFAULT_STARTER_DAMAGE: f64 = 50.0;

/// Boolean subsystem statuses shown on the systems-status readout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubsystemId {
    Power,
    PowerSystems,
    LifeSupport,
    Engines,
    EngineReady,
    EngineStarting,
    Navigation,
    Shields,
    Weapons,
    CoreSystems,
    Communications,
    Sensors,
    DefensiveArray,
    Propulsion,
    CargoSystems,
    Maintenance,
    EmergencyProtocols,
}

impl SubsystemId {
    /// Statuses recomputed from controls on every derivation pass. Engines
    /// and the ignition flag are owned by the ignition machine instead.
    pub const DERIVED: [SubsystemId; 15] = [
        SubsystemId::Power,
        SubsystemId::PowerSystems,
        SubsystemId::LifeSupport,
        SubsystemId::EngineReady,
        SubsystemId::Navigation,
        SubsystemId::Shields,
        SubsystemId::Weapons,
        SubsystemId::CoreSystems,
        SubsystemId::Communications,
        SubsystemId::Sensors,
        SubsystemId::DefensiveArray,
        SubsystemId::Propulsion,
        SubsystemId::CargoSystems,
        SubsystemId::Maintenance,
        SubsystemId::EmergencyProtocols,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SubsystemId::Power => "MAIN POWER",
            SubsystemId::PowerSystems => "POWER SYSTEMS",
            SubsystemId::LifeSupport => "LIFE SUPPORT",
            SubsystemId::Engines => "ENGINE SYSTEMS",
            SubsystemId::EngineReady => "ENGINE PRIMING",
            SubsystemId::EngineStarting => "ENGINE IGNITION",
            SubsystemId::Navigation => "NAVIGATION SYSTEMS",
            SubsystemId::Shields => "DEFENSIVE SHIELDS",
            SubsystemId::Weapons => "WEAPON SYSTEMS",
            SubsystemId::CoreSystems => "CORE SYSTEMS",
            SubsystemId::Communications => "COMMUNICATIONS",
            SubsystemId::Sensors => "SENSOR ARRAY",
            SubsystemId::DefensiveArray => "DEFENSIVE ARRAY",
            SubsystemId::Propulsion => "PROPULSION SYSTEMS",
            SubsystemId::CargoSystems => "CARGO SYSTEMS",
            SubsystemId::Maintenance => "MAINTENANCE SYSTEMS",
            SubsystemId::EmergencyProtocols => "EMERGENCY PROTOCOLS",
        }
    }
}

/// Settable numeric fields of the snapshot, each with a declared range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericField {
    HullIntegrity,
    BatteryPower,
    ReactorTemperature,
    ShieldStrength,
    WeaponCharge,
    Fuel(Reservoir),
    MissionTime,
    Heading,
    Speed,
}

impl NumericField {
    pub fn bounds(self) -> (f64, f64) {
        match self {
            NumericField::ReactorTemperature => (0.0, REACTOR_MAX_C),
            NumericField::Heading => (0.0, 360.0),
            NumericField::MissionTime | NumericField::Speed => (0.0, f64::MAX),
            NumericField::HullIntegrity
            | NumericField::BatteryPower
            | NumericField::ShieldStrength
            | NumericField::WeaponCharge
            | NumericField::Fuel(_) => (0.0, 100.0),
        }
    }

    pub fn clamp(self, value: f64) -> f64 {
        let (low, high) = self.bounds();
        value.clamp(low, high)
    }

    pub fn label(self) -> &'static str {
        match self {
            NumericField::HullIntegrity => "HULL INTEGRITY",
            NumericField::BatteryPower => "BATTERY POWER",
            NumericField::ReactorTemperature => "REACTOR TEMPERATURE",
            NumericField::ShieldStrength => "SHIELD STRENGTH",
            NumericField::WeaponCharge => "WEAPON CHARGE",
            NumericField::Fuel(reservoir) => reservoir.label(),
            NumericField::MissionTime => "MISSION TIME",
            NumericField::Heading => "SHIP HEADING",
            NumericField::Speed => "SHIP SPEED",
        }
    }

    /// Operator-facing key, e.g. `hull-integrity` or `fuel-main`.
    pub fn key(self) -> String {
        match self {
            NumericField::HullIntegrity => "hull-integrity".to_string(),
            NumericField::BatteryPower => "battery-power".to_string(),
            NumericField::ReactorTemperature => "reactor-temperature".to_string(),
            NumericField::ShieldStrength => "shield-strength".to_string(),
            NumericField::WeaponCharge => "weapon-charge".to_string(),
            NumericField::Fuel(reservoir) => format!("fuel-{}", reservoir.key()),
            NumericField::MissionTime => "mission-time".to_string(),
            NumericField::Heading => "heading".to_string(),
            NumericField::Speed => "speed".to_string(),
        }
    }
}

impl fmt::Display for NumericField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl FromStr for NumericField {
    type Err = ActionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let field = match s {
            "hull-integrity" => NumericField::HullIntegrity,
            "battery-power" => NumericField::BatteryPower,
            "reactor-temperature" => NumericField::ReactorTemperature,
            "shield-strength" => NumericField::ShieldStrength,
            "weapon-charge" => NumericField::WeaponCharge,
            "mission-time" => NumericField::MissionTime,
            "heading" => NumericField::Heading,
            "speed" => NumericField::Speed,
            other => {
                let reservoir = other
                    .strip_prefix("fuel-")
                    .and_then(|name| Reservoir::ALL.iter().find(|r| r.key() == name));
                match reservoir {
                    Some(reservoir) => NumericField::Fuel(*reservoir),
                    None => return Err(ActionParseError::UnknownField(s.to_string())),
                }
            }
        };
        Ok(field)
    }
}

/// Derived subsystem statuses plus the ship's numeric readings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemSnapshot {
    pub power: bool,
    pub power_systems: bool,
    pub life_support: bool,
    pub engines: bool,
    pub engine_ready: bool,
    pub engine_starting: bool,
    pub navigation: bool,
    pub shields: bool,
    pub weapons: bool,
    pub core_systems: bool,
    pub communications: bool,
    pub sensors: bool,
    pub defensive_array: bool,
    pub propulsion: bool,
    pub cargo_systems: bool,
    pub maintenance: bool,
    pub emergency_protocols: bool,

    pub hull_integrity: f64,
    pub battery_power: f64,
    pub reactor_temperature: f64,
    pub shield_strength: f64,
    pub weapon_charge: f64,
    pub fuel: FuelTanks,
    pub mission_time: f64,
    pub heading: f64,
    pub speed: f64,
    pub engine_startup_progress: f64,
    pub engine_startup_start_time: u64,
    pub starter_damage: f64,
}

impl SystemSnapshot {
    pub fn new() -> Self {
        Self {
            power: false,
            power_systems: false,
            life_support: false,
            engines: false,
            engine_ready: false,
            engine_starting: false,
            navigation: false,
            shields: false,
            weapons: false,
            core_systems: false,
            communications: false,
            sensors: false,
            defensive_array: false,
            propulsion: false,
            cargo_systems: false,
            maintenance: false,
            emergency_protocols: false,
            hull_integrity: HULL_INTEGRITY_START,
            battery_power: BATTERY_POWER_START,
            reactor_temperature: REACTOR_IDLE_C,
            shield_strength: 0.0,
            weapon_charge: 0.0,
            fuel: FuelTanks::full(),
            mission_time: 0.0,
            heading: 0.0,
            speed: 0.0,
            engine_startup_progress: 0.0,
            engine_startup_start_time: 0,
            starter_damage: DEFAULT_STARTER_DAMAGE,
        }
    }

    pub fn with_starter_damage(starter_damage: f64) -> Self {
        Self {
            starter_damage: starter_damage.clamp(0.0, 100.0),
            ..Self::new()
        }
    }

    pub fn flag(&self, id: SubsystemId) -> bool {
        match id {
            SubsystemId::Power => self.power,
            SubsystemId::PowerSystems => self.power_systems,
            SubsystemId::LifeSupport => self.life_support,
            SubsystemId::Engines => self.engines,
            SubsystemId::EngineReady => self.engine_ready,
            SubsystemId::EngineStarting => self.engine_starting,
            SubsystemId::Navigation => self.navigation,
            SubsystemId::Shields => self.shields,
            SubsystemId::Weapons => self.weapons,
            SubsystemId::CoreSystems => self.core_systems,
            SubsystemId::Communications => self.communications,
            SubsystemId::Sensors => self.sensors,
            SubsystemId::DefensiveArray => self.defensive_array,
            SubsystemId::Propulsion => self.propulsion,
            SubsystemId::CargoSystems => self.cargo_systems,
            SubsystemId::Maintenance => self.maintenance,
            SubsystemId::EmergencyProtocols => self.emergency_protocols,
        }
    }

    pub fn set_flag(&mut self, id: SubsystemId, on: bool) {
        let slot = match id {
            SubsystemId::Power => &mut self.power,
            SubsystemId::PowerSystems => &mut self.power_systems,
            SubsystemId::LifeSupport => &mut self.life_support,
            SubsystemId::Engines => &mut self.engines,
            SubsystemId::EngineReady => &mut self.engine_ready,
            SubsystemId::EngineStarting => &mut self.engine_starting,
            SubsystemId::Navigation => &mut self.navigation,
            SubsystemId::Shields => &mut self.shields,
            SubsystemId::Weapons => &mut self.weapons,
            SubsystemId::CoreSystems => &mut self.core_systems,
            SubsystemId::Communications => &mut self.communications,
            SubsystemId::Sensors => &mut self.sensors,
            SubsystemId::DefensiveArray => &mut self.defensive_array,
            SubsystemId::Propulsion => &mut self.propulsion,
            SubsystemId::CargoSystems => &mut self.cargo_systems,
            SubsystemId::Maintenance => &mut self.maintenance,
            SubsystemId::EmergencyProtocols => &mut self.emergency_protocols,
        };
        *slot = on;
    }

    pub fn numeric(&self, field: NumericField) -> f64 {
        match field {
            NumericField::HullIntegrity => self.hull_integrity,
            NumericField::BatteryPower => self.battery_power,
            NumericField::ReactorTemperature => self.reactor_temperature,
            NumericField::ShieldStrength => self.shield_strength,
            NumericField::WeaponCharge => self.weapon_charge,
            NumericField::Fuel(reservoir) => self.fuel.level(reservoir),
            NumericField::MissionTime => self.mission_time,
            NumericField::Heading => self.heading,
            NumericField::Speed => self.speed,
        }
    }

    /// Writes a numeric field clamped to its declared range and returns the
    /// stored value.
    pub fn set_numeric(&mut self, field: NumericField, value: f64) -> f64 {
        let value = field.clamp(value);
        match field {
            NumericField::HullIntegrity => self.hull_integrity = value,
            NumericField::BatteryPower => self.battery_power = value,
            NumericField::ReactorTemperature => self.reactor_temperature = value,
            NumericField::ShieldStrength => self.shield_strength = value,
            NumericField::WeaponCharge => self.weapon_charge = value,
            NumericField::Fuel(reservoir) => self.fuel.set_level(reservoir, value),
            NumericField::MissionTime => self.mission_time = value,
            NumericField::Heading => self.heading = value,
            NumericField::Speed => self.speed = value,
        }
        value
    }

    pub fn ignition_phase(&self) -> IgnitionPhase {
        engine::phase(self)
    }
}

impl Default for SystemSnapshot {
    fn default() -> Self {
        Self::new()
    }
}
