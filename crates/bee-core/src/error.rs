//! Error types for Bee

use thiserror::Error;

/// The main error type for Bee operations
#[derive(Debug, Error)]
pub enum BeeError {
    #[error("Registration is closed, cannot add {kind} \"{name}\"")]
    RegistrationClosed { kind: &'static str, name: String },

    #[error("Duplicate resource name: {0}")]
    DuplicateName(String),

    #[error("Object not found: {0}")]
    ObjectNotFound(String),

    #[error("Instance not found: {0}")]
    InstanceNotFound(String),

    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("Particle type not found: {0}")]
    ParticleTypeNotFound(String),

    #[error("Physics body missing for instance {0}")]
    BodyMissing(String),

    #[error("Sprite not loaded: {0}")]
    SpriteNotLoaded(String),

    #[error("Sprite not found: {0}")]
    SpriteNotFound(String),

    #[error("Not applicable: {0}")]
    NotApplicable(String),

    #[error("Index out of range: {what} index {index} is not below {len}")]
    IndexOutOfRange {
        what: &'static str,
        index: usize,
        len: usize,
    },

    #[error("Physics error: {0}")]
    PhysicsError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(String),

    #[error("Config error: {0}")]
    ConfigError(String),
}

/// Result type alias for Bee operations
pub type Result<T> = std::result::Result<T, BeeError>;

impl BeeError {
    /// Whether this error only means "nothing to do" rather than a broken resource
    pub fn is_not_applicable(&self) -> bool {
        matches!(
            self,
            BeeError::NotApplicable(_) | BeeError::IndexOutOfRange { .. }
        )
    }
}

impl From<toml::de::Error> for BeeError {
    fn from(err: toml::de::Error) -> Self {
        BeeError::TomlParseError(err.to_string())
    }
}
