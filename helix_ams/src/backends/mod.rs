//! AMS backend implementations.
//!
//! This module contains all backend implementations:
//!
//! - [`mock`] - Simulation backend for development, demos and testing
//!
//! # Adding New Backends
//!
//! 1. Create a new submodule under `backends/`
//! 2. Implement the `AmsBackend` trait from `crate::backend`
//! 3. Register the backend in [`register_builtin_backends`] under the key
//!    returned by `backend_name_for()` for its system type
//! 4. Add export and documentation

pub mod mock;

use crate::backend_registry::BackendRegistry;

/// Register all built-in backends.
///
/// This function should be called once when building the registry handed to
/// `AmsState`.
pub fn register_builtin_backends(registry: &mut BackendRegistry) {
    registry.register("mock", mock::create_backend);
}
