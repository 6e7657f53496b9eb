//! Engine configuration loaded from TOML

use bee_core::Result;
use bee_physics::PhysicsSettings;
use serde::Deserialize;
use std::path::Path;

/// Top-level engine settings
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub fps_goal: u32,
    pub room: RoomSettings,
    pub physics: PhysicsSettings,
    pub particles: ParticleSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            fps_goal: 60,
            room: RoomSettings::default(),
            physics: PhysicsSettings::default(),
            particles: ParticleSettings::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct RoomSettings {
    pub width: u32,
    pub height: u32,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(default)]
pub struct ParticleSettings {
    /// Seed for emitter randomness
    pub seed: u64,
    /// Upper bound on frames a single fast-forward may simulate
    pub max_fast_forward: u32,
}

impl Default for ParticleSettings {
    fn default() -> Self {
        Self {
            seed: 0x5EED_B33,
            max_fast_forward: 600,
        }
    }
}

impl EngineConfig {
    /// Parse configuration from TOML text. Missing keys keep their defaults.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(text)?;
        log::debug!(target: "bee::config", "loaded engine config: {config:?}");
        Ok(config)
    }

    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bee_core::BeeError;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_partial_config() {
        let config = EngineConfig::from_toml_str(
            r#"
fps_goal = 30

[room]
width = 640

[physics]
gravity = [0.0, 9.8, 0.0]

[particles]
seed = 7
"#,
        )
        .unwrap();

        assert_eq!(config.fps_goal, 30);
        assert_eq!(config.room.width, 640);
        assert_eq!(config.room.height, 720);
        assert_eq!(config.physics.gravity, [0.0, 9.8, 0.0]);
        assert!((config.physics.scale - 10.0).abs() < 1e-12);
        assert_eq!(config.particles.seed, 7);
        assert_eq!(config.particles.max_fast_forward, 600);
    }

    #[test]
    fn test_bad_config_is_parse_error() {
        let err = EngineConfig::from_toml_str("fps_goal = \"fast\"").unwrap_err();
        assert!(matches!(err, BeeError::TomlParseError(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = EngineConfig::load(Path::new("/nonexistent/bee.toml")).unwrap_err();
        assert!(matches!(err, BeeError::IoError(_)));
    }
}
