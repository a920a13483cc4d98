//! Backend registry for AMS backends.
//!
//! Provides a `BackendRegistry` struct for registering and retrieving backend
//! factories. This uses constructor-injection rather than global state.

use crate::backend::AmsBackend;
use helix_common::ams::AmsType;
use std::collections::HashMap;
use thiserror::Error;

/// Error types for backend creation and the state layer.
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// No factory registered under this name
    #[error("Backend not found: {0}")]
    BackendNotFound(String),

    /// Backend rejected `start()`
    #[error("Backend start failed: {0}")]
    StartFailed(String),

    /// No backend installed
    #[error("No AMS backend initialized")]
    NotInitialized,
}

/// What printer discovery found.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HardwareInfo {
    /// Detected system type (`None` when nothing was found).
    pub detected_type: AmsType,
    /// AFC lane object names.
    pub lane_names: Vec<String>,
    /// AFC hub object names.
    pub hub_names: Vec<String>,
    /// Tool changer tool object names.
    pub tool_names: Vec<String>,
}

/// Factory function type for creating backend instances.
pub type BackendFactory = fn(&HardwareInfo) -> Box<dyn AmsBackend>;

/// Registry key for a detected system type.
pub const fn backend_name_for(ams_type: AmsType) -> Option<&'static str> {
    match ams_type {
        AmsType::None => None,
        AmsType::HappyHare => Some("happy_hare"),
        AmsType::Afc => Some("afc"),
        AmsType::ValgAce => Some("valgace"),
        AmsType::ToolChanger => Some("tool_changer"),
    }
}

/// Registry of available AMS backends.
///
/// Constructed at startup, populated via `register()`, and handed to
/// `AmsState` by value. No global state, testable in isolation.
pub struct BackendRegistry {
    factories: HashMap<&'static str, BackendFactory>,
}

impl BackendRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a backend factory.
    ///
    /// # Panics
    /// Panics if a backend with the same name is already registered.
    pub fn register(&mut self, name: &'static str, factory: BackendFactory) {
        if self.factories.contains_key(name) {
            panic!("Backend '{name}' is already registered");
        }
        self.factories.insert(name, factory);
    }

    /// Get a backend factory by name.
    pub fn get_factory(&self, name: &str) -> Option<BackendFactory> {
        self.factories.get(name).copied()
    }

    /// Create a backend instance by name.
    ///
    /// # Errors
    /// Returns `BackendError::BackendNotFound` if no backend with the given name is registered.
    pub fn create_backend(
        &self,
        name: &str,
        hardware: &HardwareInfo,
    ) -> Result<Box<dyn AmsBackend>, BackendError> {
        let factory = self
            .get_factory(name)
            .ok_or_else(|| BackendError::BackendNotFound(name.to_string()))?;
        Ok(factory(hardware))
    }

    /// Create the backend registered for the detected system type.
    ///
    /// # Errors
    /// Returns `BackendError::BackendNotFound` when the type has no registry key
    /// or nothing is registered under it.
    pub fn create_for(&self, hardware: &HardwareInfo) -> Result<Box<dyn AmsBackend>, BackendError> {
        let name = backend_name_for(hardware.detected_type).ok_or_else(|| {
            BackendError::BackendNotFound(hardware.detected_type.as_str().to_string())
        })?;
        self.create_backend(name, hardware)
    }

    /// List all registered backend names.
    pub fn list_backends(&self) -> Vec<&'static str> {
        self.factories.keys().copied().collect()
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::mock::AmsBackendMock;

    fn create_test_backend(_hw: &HardwareInfo) -> Box<dyn AmsBackend> {
        Box::new(AmsBackendMock::new(2))
    }

    #[test]
    fn registry_register_and_create() {
        let mut reg = BackendRegistry::new();
        reg.register("test_backend", create_test_backend);

        let backend = reg
            .create_backend("test_backend", &HardwareInfo::default())
            .expect("should create");
        assert_eq!(backend.get_system_info().total_slots, 2);
    }

    #[test]
    fn registry_backend_not_found() {
        let reg = BackendRegistry::new();
        let result = reg.create_backend("nonexistent", &HardwareInfo::default());
        assert!(matches!(result, Err(BackendError::BackendNotFound(_))));
    }

    #[test]
    fn registry_create_for_detected_type() {
        let mut reg = BackendRegistry::new();
        reg.register("afc", create_test_backend);

        let hw = HardwareInfo {
            detected_type: AmsType::Afc,
            ..Default::default()
        };
        assert!(reg.create_for(&hw).is_ok());

        let none = HardwareInfo::default();
        assert!(matches!(
            reg.create_for(&none),
            Err(BackendError::BackendNotFound(_))
        ));
    }

    #[test]
    fn registry_list_backends() {
        let mut reg = BackendRegistry::new();
        reg.register("alpha", create_test_backend);
        reg.register("beta", create_test_backend);

        let mut names = reg.list_backends();
        names.sort();
        assert_eq!(names, vec!["alpha", "beta"]);
    }

    #[test]
    #[should_panic(expected = "already registered")]
    fn registry_duplicate_panics() {
        let mut reg = BackendRegistry::new();
        reg.register("dup", create_test_backend);
        reg.register("dup", create_test_backend);
    }

    #[test]
    fn backend_names() {
        assert_eq!(backend_name_for(AmsType::None), None);
        assert_eq!(backend_name_for(AmsType::HappyHare), Some("happy_hare"));
        assert_eq!(backend_name_for(AmsType::ToolChanger), Some("tool_changer"));
    }
}
