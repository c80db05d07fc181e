//! Generator settings with sensible defaults and JSON persistence.
//!
//! Every field is optional in the file; missing ones fall back to
//! [`WorldConfig::default`]. Command-line flags override loaded values.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::projection::Topology;
use crate::world::RANDOM_MODIFIER;

/// Settings for one generator run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorldConfig {
    pub width: usize,
    pub height: usize,
    pub topology: Topology,
    /// Master seed; a random one is picked when absent.
    pub seed: Option<u64>,
    /// Sea level modifier; random when absent.
    pub water: Option<f64>,
    /// Pole cooling modifier; random when absent.
    pub cooling: Option<f64>,
    pub generate_rivers: bool,
    /// Scales every field's octave count.
    pub octave_multiplier: f64,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            width: 256,
            height: 256,
            topology: Topology::default(),
            seed: None,
            water: None,
            cooling: None,
            generate_rivers: true,
            octave_multiplier: 1.0,
        }
    }
}

impl WorldConfig {
    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let file = File::open(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: WorldConfig =
            serde_json::from_reader(BufReader::new(file)).map_err(ConfigError::Parse)?;
        config.validate()?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Write the config as pretty-printed JSON, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        let mut writer = BufWriter::new(File::create(path).map_err(write_err)?);
        serde_json::to_writer_pretty(&mut writer, self).map_err(ConfigError::Serialize)?;
        writer.write_all(b"\n").map_err(write_err)?;
        writer.flush().map_err(write_err)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width < 2 || self.height < 2 {
            return Err(ConfigError::InvalidDimensions {
                width: self.width,
                height: self.height,
            });
        }
        if !self.octave_multiplier.is_finite() || self.octave_multiplier <= 0.0 {
            return Err(ConfigError::InvalidOctaveMultiplier(self.octave_multiplier));
        }
        Ok(())
    }

    /// `(water, cooling)` as passed to generation, with absent values mapped
    /// to the random sentinel.
    pub fn resolved_modifiers(&self) -> (f64, f64) {
        (
            self.water.unwrap_or(RANDOM_MODIFIER),
            self.cooling.unwrap_or(RANDOM_MODIFIER),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = WorldConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.resolved_modifiers(), (RANDOM_MODIFIER, RANDOM_MODIFIER));
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("world.json");
        let config = WorldConfig {
            width: 128,
            height: 64,
            topology: Topology::Polar,
            seed: Some(42),
            water: Some(1.0),
            cooling: None,
            generate_rivers: false,
            octave_multiplier: 0.5,
        };

        config.save(&path).unwrap();
        let loaded = WorldConfig::load(&path).unwrap();
        assert_eq!(config, loaded);
        assert_eq!(loaded.resolved_modifiers(), (1.0, RANDOM_MODIFIER));
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: WorldConfig = serde_json::from_str(r#"{"width": 100, "topology": "polar"}"#).unwrap();
        assert_eq!(config.width, 100);
        assert_eq!(config.height, 256);
        assert_eq!(config.topology, Topology::Polar);
        assert!(config.generate_rivers);
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = WorldConfig::load(&dir.path().join("absent.json"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(WorldConfig::load(&path), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_rejects_invalid_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.json");
        std::fs::write(&path, r#"{"width": 1}"#).unwrap();
        assert!(matches!(
            WorldConfig::load(&path),
            Err(ConfigError::InvalidDimensions { width: 1, height: 256 })
        ));
    }

    #[test]
    fn test_validate_octave_multiplier() {
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let config = WorldConfig {
                octave_multiplier: bad,
                ..WorldConfig::default()
            };
            assert!(matches!(config.validate(), Err(ConfigError::InvalidOctaveMultiplier(_))));
        }
    }
}
