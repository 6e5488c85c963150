//! Configuration system
//!
//! Engine settings are plain serde structures that can be loaded from and
//! saved to TOML or RON files through the [`Config`] trait.

pub use serde::{Deserialize, Serialize};

use crate::foundation::math::Color;
use crate::graphics::api::{CullFace, FrontFace};

/// Configuration trait
pub trait Config: Serialize + for<'de> Deserialize<'de> + Default {
    /// Load configuration from file
    fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(ConfigError::Io)?;

        if path.ends_with(".toml") {
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else if path.ends_with(".ron") {
            ron::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
        } else {
            Err(ConfigError::UnsupportedFormat(path.to_string()))
        }
    }

    /// Save configuration to file
    fn save_to_file(&self, path: &str) -> Result<(), ConfigError> {
        let contents = if path.ends_with(".toml") {
            toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else if path.ends_with(".ron") {
            ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
                .map_err(|e| ConfigError::Serialize(e.to_string()))?
        } else {
            return Err(ConfigError::UnsupportedFormat(path.to_string()));
        };

        std::fs::write(path, contents).map_err(ConfigError::Io)
    }
}

/// Configuration errors
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Unsupported format
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// A value is outside its allowed range
    #[error("Invalid value: {0}")]
    Invalid(String),
}

/// Graphics state cache behavior
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// Reject redundant state changes instead of silently absorbing them
    ///
    /// Useful while developing a pass to find places that request state the
    /// context already has.
    pub strict: bool,
}

/// Forward renderer settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Color used when clearing the render target
    pub clear_color: Color,

    /// Winding order treated as front facing
    pub front_face: FrontFace,

    /// Faces discarded by face culling
    pub cull_face: CullFace,

    /// Whether face culling is enabled at startup
    pub face_culling: bool,

    /// Edge length of the shadow depth maps created by light passes
    pub shadow_map_size: u32,

    /// Depth bias applied when sampling shadow maps
    pub shadow_bias: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            clear_color: Color::BLACK,
            front_face: FrontFace::CounterClockwise,
            cull_face: CullFace::Back,
            face_culling: true,
            shadow_map_size: 1024,
            shadow_bias: 0.005,
        }
    }
}

/// Top-level engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Default log filter used by [`EngineConfig::init_logging`]
    pub log_level: String,

    /// State cache configuration
    pub state: StateConfig,

    /// Renderer configuration
    pub render: RenderConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            state: StateConfig::default(),
            render: RenderConfig::default(),
        }
    }
}

impl Config for EngineConfig {}

impl EngineConfig {
    /// Builder pattern: enable or disable strict state checking
    pub fn with_strict_state(mut self, strict: bool) -> Self {
        self.state.strict = strict;
        self
    }

    /// Builder pattern: set the clear color
    pub fn with_clear_color(mut self, color: Color) -> Self {
        self.render.clear_color = color;
        self
    }

    /// Install the global logger using [`EngineConfig::log_level`] as the default filter
    pub fn init_logging(&self) {
        crate::foundation::logging::init_with_level(&self.log_level);
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.render.shadow_map_size == 0 {
            return Err(ConfigError::Invalid(
                "shadow_map_size must be at least 1".to_string(),
            ));
        }
        if !self.render.clear_color.is_normalized() {
            return Err(ConfigError::Invalid(format!(
                "clear_color channels must be within [0, 1]: {:?}",
                self.render.clear_color
            )));
        }
        if self.render.shadow_bias < 0.0 {
            return Err(ConfigError::Invalid("shadow_bias must not be negative".to_string()));
        }
        Ok(())
    }
}
