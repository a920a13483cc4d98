//! Configuration loading traits and types.
//!
//! Any deserializable struct can be loaded from TOML through the
//! [`ConfigLoader`] blanket implementation. [`AmsConfig`] is the document
//! read by the `helix_ams` binary.
//!
//! # Usage
//!
//! ```rust,no_run
//! use helix_common::config::{AmsConfig, ConfigError, ConfigLoader};
//! use std::path::Path;
//!
//! fn main() -> Result<(), ConfigError> {
//!     let config = AmsConfig::load(Path::new("helix_ams.toml"))?;
//!     config.validate()?;
//!     println!("Service: {}", config.shared.service_name);
//!     Ok(())
//! }
//! ```

use crate::ams::types::MAX_MOCK_SLOTS;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Log level for application logging.
///
/// Uses lowercase serde values for TOML compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Most verbose, detailed tracing information.
    Trace,
    /// Debug information useful during development.
    Debug,
    /// General information about application operation.
    #[default]
    Info,
    /// Warning messages for potentially problematic situations.
    Warn,
    /// Error messages for serious problems.
    Error,
}

/// Common configuration fields shared across Helix services.
///
/// # TOML Example
///
/// ```toml
/// [shared]
/// log_level = "debug"
/// service_name = "helix-ams"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SharedConfig {
    /// Logging verbosity level.
    #[serde(default)]
    pub log_level: LogLevel,

    /// Application instance identifier.
    pub service_name: String,
}

impl SharedConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if `service_name` is empty.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::ValidationError(
                "service_name cannot be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            service_name: "helix-ams".to_string(),
        }
    }
}

/// Hardware layout simulated by the mock backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MockMode {
    /// Single Happy Hare style selector unit.
    #[default]
    HappyHare,
    /// Single AFC Box Turtle.
    Afc,
    /// Tool changer with one spool per tool.
    ToolChanger,
    /// Two AFC units feeding one toolhead.
    MultiUnit,
    /// One parallel unit plus two hub units.
    Mixed,
}

impl MockMode {
    /// TOML / CLI name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::HappyHare => "happy_hare",
            Self::Afc => "afc",
            Self::ToolChanger => "tool_changer",
            Self::MultiUnit => "multi_unit",
            Self::Mixed => "mixed",
        }
    }

    /// Parse a TOML / CLI name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "happy_hare" | "hh" => Some(Self::HappyHare),
            "afc" => Some(Self::Afc),
            "tool_changer" | "toolchanger" => Some(Self::ToolChanger),
            "multi_unit" => Some(Self::MultiUnit),
            "mixed" => Some(Self::Mixed),
            _ => None,
        }
    }
}

/// Scenario names accepted by the mock at start.
pub const MOCK_SCENARIOS: [&str; 4] = ["", "loading", "bypass", "error"];

/// Mock backend settings.
///
/// # TOML Example
///
/// ```toml
/// [mock]
/// enabled = true
/// slot_count = 4
/// mode = "afc"
/// sim_speedup = 10.0
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MockConfig {
    /// Use the mock backend instead of hardware discovery.
    pub enabled: bool,
    /// Number of slots (1..=16).
    pub slot_count: usize,
    /// Simulated hardware layout.
    pub mode: MockMode,
    /// Multi-phase operation timing.
    pub realistic: bool,
    /// Base delay for simple-mode operations (ms).
    pub operation_delay_ms: u32,
    /// Divides every simulated delay.
    pub sim_speedup: f64,
    /// Simulate an integrated dryer.
    pub dryer: bool,
    /// Initial scenario applied at start.
    pub scenario: String,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            slot_count: 4,
            mode: MockMode::HappyHare,
            realistic: true,
            operation_delay_ms: 500,
            sim_speedup: 1.0,
            dryer: false,
            scenario: String::new(),
        }
    }
}

impl MockConfig {
    /// Validate the mock section.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` if:
    /// - `slot_count` is outside 1..=16
    /// - `sim_speedup` is not a positive number
    /// - `scenario` is not one of [`MOCK_SCENARIOS`]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.slot_count == 0 || self.slot_count > MAX_MOCK_SLOTS {
            return Err(ConfigError::ValidationError(format!(
                "mock.slot_count must be 1..={}, got {}",
                MAX_MOCK_SLOTS, self.slot_count
            )));
        }
        if !(self.sim_speedup > 0.0) {
            return Err(ConfigError::ValidationError(format!(
                "mock.sim_speedup must be > 0, got {}",
                self.sim_speedup
            )));
        }
        if !MOCK_SCENARIOS.contains(&self.scenario.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "unknown mock.scenario '{}'",
                self.scenario
            )));
        }
        Ok(())
    }
}

/// Spoolman integration settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpoolmanConfig {
    /// Weight refresh interval while polling (seconds).
    pub poll_interval_s: u64,
}

impl Default for SpoolmanConfig {
    fn default() -> Self {
        Self { poll_interval_s: 30 }
    }
}

/// Top-level `helix_ams` configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AmsConfig {
    /// Common settings.
    #[serde(default)]
    pub shared: SharedConfig,
    /// Mock backend settings.
    #[serde(default)]
    pub mock: MockConfig,
    /// Spoolman settings.
    #[serde(default)]
    pub spoolman: SpoolmanConfig,
}

impl AmsConfig {
    /// Validate every section.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.shared.validate()?;
        self.mock.validate()?;
        if self.spoolman.poll_interval_s == 0 {
            return Err(ConfigError::ValidationError(
                "spoolman.poll_interval_s must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Trait for loading configuration from TOML files.
///
/// # Contract
///
/// - Returns `ConfigError::FileNotFound` if the file does not exist
/// - Returns `ConfigError::ParseError` if TOML syntax is invalid or a field
///   has an unknown value (e.g. `mode = "prusa"`)
pub trait ConfigLoader: Sized + serde::de::DeserializeOwned {
    /// Load configuration from a TOML file.
    fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::FileNotFound
            } else {
                ConfigError::ParseError(e.to_string())
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }
}

impl<T: serde::de::DeserializeOwned> ConfigLoader for T {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_default() {
        assert_eq!(LogLevel::default(), LogLevel::Info);
    }

    #[test]
    fn test_log_level_deserialization() {
        #[derive(Debug, Deserialize)]
        struct TestWrapper {
            level: LogLevel,
        }

        assert_eq!(
            toml::from_str::<TestWrapper>("level = \"trace\"").unwrap().level,
            LogLevel::Trace
        );
        assert_eq!(
            toml::from_str::<TestWrapper>("level = \"warn\"").unwrap().level,
            LogLevel::Warn
        );
    }

    #[test]
    fn test_shared_config_validation_empty_service_name() {
        let config = SharedConfig {
            log_level: LogLevel::Info,
            service_name: "".to_string(),
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = AmsConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.mock.slot_count, 4);
        assert_eq!(config.mock.mode, MockMode::HappyHare);
        assert!(config.mock.realistic);
    }

    #[test]
    fn test_mock_validation() {
        let mut mock = MockConfig::default();
        mock.slot_count = 0;
        assert!(mock.validate().is_err());
        mock.slot_count = 17;
        assert!(mock.validate().is_err());

        mock.slot_count = 16;
        mock.sim_speedup = 0.0;
        assert!(mock.validate().is_err());
        mock.sim_speedup = f64::NAN;
        assert!(mock.validate().is_err());

        mock.sim_speedup = 50.0;
        mock.scenario = "explode".to_string();
        assert!(matches!(mock.validate(), Err(ConfigError::ValidationError(_))));
        mock.scenario = "bypass".to_string();
        assert!(mock.validate().is_ok());
    }

    #[test]
    fn test_mock_mode_names() {
        for mode in [
            MockMode::HappyHare,
            MockMode::Afc,
            MockMode::ToolChanger,
            MockMode::MultiUnit,
            MockMode::Mixed,
        ] {
            assert_eq!(MockMode::from_name(mode.as_str()), Some(mode));
        }
        assert_eq!(MockMode::from_name("ercf"), None);
    }
}
