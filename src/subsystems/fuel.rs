use crate::log::{self, LogEntry};
use crate::subsystems::{NumericField, SystemSnapshot};
use serde::{Deserialize, Serialize};
use static_assertions::const_assert_eq;

pub const RESERVOIR_CAPACITY: f64 = 100.0;

/// Units drained per fuel tick while the engines run.
pub const FUEL_TICK_AMOUNT: f64 = 0.1;

/// Levels below this read as dry.
pub const DRY_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Reservoir {
    Main,
    Reserve,
    Boost,
    Emergency,
    Coolant,
    Auxiliary,
    Maneuver,
    Scram,
}

impl Reservoir {
    /// Drain priority: each reservoir empties fully before the next is touched.
    pub const ALL: [Reservoir; 8] = [
        Reservoir::Main,
        Reservoir::Reserve,
        Reservoir::Boost,
        Reservoir::Emergency,
        Reservoir::Coolant,
        Reservoir::Auxiliary,
        Reservoir::Maneuver,
        Reservoir::Scram,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Reservoir::Main => "main",
            Reservoir::Reserve => "reserve",
            Reservoir::Boost => "boost",
            Reservoir::Emergency => "emergency",
            Reservoir::Coolant => "coolant",
            Reservoir::Auxiliary => "auxiliary",
            Reservoir::Maneuver => "maneuver",
            Reservoir::Scram => "scram",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Reservoir::Main => "MAIN FUEL",
            Reservoir::Reserve => "RESERVE FUEL",
            Reservoir::Boost => "BOOST FUEL",
            Reservoir::Emergency => "EMERGENCY FUEL",
            Reservoir::Coolant => "COOLANT FUEL",
            Reservoir::Auxiliary => "AUXILIARY FUEL",
            Reservoir::Maneuver => "MANEUVER FUEL",
            Reservoir::Scram => "SCRAM FUEL",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

const_assert_eq!(Reservoir::ALL.len(), 8);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FuelTanks {
    pub main: f64,
    pub reserve: f64,
    pub boost: f64,
    pub emergency: f64,
    pub coolant: f64,
    pub auxiliary: f64,
    pub maneuver: f64,
    pub scram: f64,
}

impl FuelTanks {
    pub fn full() -> Self {
        Self::uniform(RESERVOIR_CAPACITY)
    }

    pub fn uniform(level: f64) -> Self {
        let level = level.clamp(0.0, RESERVOIR_CAPACITY);
        Self {
            main: level,
            reserve: level,
            boost: level,
            emergency: level,
            coolant: level,
            auxiliary: level,
            maneuver: level,
            scram: level,
        }
    }

    fn slot(&mut self, reservoir: Reservoir) -> &mut f64 {
        match reservoir {
            Reservoir::Main => &mut self.main,
            Reservoir::Reserve => &mut self.reserve,
            Reservoir::Boost => &mut self.boost,
            Reservoir::Emergency => &mut self.emergency,
            Reservoir::Coolant => &mut self.coolant,
            Reservoir::Auxiliary => &mut self.auxiliary,
            Reservoir::Maneuver => &mut self.maneuver,
            Reservoir::Scram => &mut self.scram,
        }
    }

    pub fn level(&self, reservoir: Reservoir) -> f64 {
        self.levels()[reservoir.index()]
    }

    pub fn set_level(&mut self, reservoir: Reservoir, level: f64) {
        *self.slot(reservoir) = level.clamp(0.0, RESERVOIR_CAPACITY);
    }

    /// Levels in drain order.
    pub fn levels(&self) -> [f64; 8] {
        [
            self.main,
            self.reserve,
            self.boost,
            self.emergency,
            self.coolant,
            self.auxiliary,
            self.maneuver,
            self.scram,
        ]
    }

    pub fn total(&self) -> f64 {
        self.levels().iter().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.levels().iter().all(|level| *level <= 0.0)
    }

    /// Reservoir currently feeding the engines.
    pub fn active(&self) -> Option<Reservoir> {
        Reservoir::ALL.into_iter().find(|r| self.level(*r) > 0.0)
    }

    /// Takes `amount` in priority order and returns what was actually drained.
    /// Never drives a reservoir negative; an exhausted supply drains nothing.
    pub fn drain(&mut self, amount: f64) -> f64 {
        if amount.is_nan() || amount <= 0.0 {
            return 0.0;
        }

        let mut remaining = amount;
        for reservoir in Reservoir::ALL {
            if remaining <= 0.0 {
                break;
            }
            let slot = self.slot(reservoir);
            if *slot > 0.0 {
                let taken = remaining.min(*slot);
                *slot = (*slot - taken).max(0.0);
                remaining -= taken;
                // Rounding residue left by repeated ticks
                if *slot < DRY_EPSILON {
                    *slot = 0.0;
                }
            }
        }

        let drained = amount - remaining.max(0.0);
        debug_assert!(drained >= 0.0 && drained <= amount, "drained {} of {}", drained, amount);
        drained
    }
}

impl Default for FuelTanks {
    fn default() -> Self {
        Self::full()
    }
}

/// One fuel tick: drain and log any reservoir that crossed a band.
pub fn consume(systems: &mut SystemSnapshot, amount: f64, now: u64) -> (f64, Vec<LogEntry>) {
    let before = systems.fuel.levels();
    let drained = systems.fuel.drain(amount);

    let entries = Reservoir::ALL
        .iter()
        .filter_map(|reservoir| {
            log::numeric_entry(
                NumericField::Fuel(*reservoir),
                before[reservoir.index()],
                systems.fuel.level(*reservoir),
                now,
            )
        })
        .collect();

    (drained, entries)
}
