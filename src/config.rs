use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Tunables for the panel and its periodic processes. Missing fields in a
/// config file fall back to the defaults below.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PanelConfig {
    /// Intrinsic ignition failure probability, percent.
    pub starter_damage: f64,
    pub ignition_duration_ms: u64,
    pub ignition_poll_ms: u64,
    pub fuel_tick_ms: u64,
    pub fuel_tick_amount: f64,
    pub reactor_step_ms: u64,
    pub autosave_ms: u64,
    pub ship_chime_ms: u64,
    pub reload_delay_ms: u64,
    pub autosave_enabled: bool,
}

impl Default for PanelConfig {
    fn default() -> Self {
        Self {
            starter_damage: 50.0,
            ignition_duration_ms: 5_000,
            ignition_poll_ms: 100,
            fuel_tick_ms: 1_000,
            fuel_tick_amount: 0.1,
            reactor_step_ms: 1_000,
            autosave_ms: 30_000,
            ship_chime_ms: 60_000,
            reload_delay_ms: 100,
            autosave_enabled: true,
        }
    }
}

impl PanelConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path)?;
        let config: PanelConfig = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=100.0).contains(&self.starter_damage) {
            return Err(ConfigError::Invalid {
                field: "starter_damage",
                reason: "must be within 0-100",
            });
        }

        let periods = [
            ("ignition_duration_ms", self.ignition_duration_ms),
            ("ignition_poll_ms", self.ignition_poll_ms),
            ("fuel_tick_ms", self.fuel_tick_ms),
            ("reactor_step_ms", self.reactor_step_ms),
            ("autosave_ms", self.autosave_ms),
            ("ship_chime_ms", self.ship_chime_ms),
        ];
        if let Some((field, _)) = periods.iter().find(|(_, period)| *period == 0) {
            return Err(ConfigError::Invalid {
                field: *field,
                reason: "period must be positive",
            });
        }

        if !self.fuel_tick_amount.is_finite() || self.fuel_tick_amount < 0.0 {
            return Err(ConfigError::Invalid {
                field: "fuel_tick_amount",
                reason: "must be a non-negative number",
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_are_valid() {
        assert!(PanelConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_out_of_range_damage() {
        let config = PanelConfig {
            starter_damage: 120.0,
            ..PanelConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "starter_damage", .. })
        ));
    }

    #[test]
    fn test_rejects_zero_period() {
        let config = PanelConfig {
            fuel_tick_ms: 0,
            ..PanelConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "fuel_tick_ms", .. })
        ));
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"starter_damage": 10.0, "autosave_enabled": false}}"#).unwrap();
        let config = PanelConfig::from_file(file.path()).unwrap();
        assert_eq!(config.starter_damage, 10.0);
        assert!(!config.autosave_enabled);
        assert_eq!(config.ignition_duration_ms, 5_000);
    }
}
