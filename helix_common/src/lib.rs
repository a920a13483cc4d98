//! HelixScreen Common Library
//!
//! Shared building blocks for every crate that talks to an automated
//! material system (AMS / MMU): the data model, the error taxonomy, typed
//! backend events, vendor device-action catalogs and the slot registry.
//!
//! # Module Structure
//!
//! - [`ams`] - Data model, `AmsError`, events, dryer and device-action types
//! - [`slot_registry`] - Durable per-slot store with unit and tool mapping
//! - [`defaults`] - AFC and Happy Hare capability / action catalogs
//! - [`filament`] - Filament material temperature table
//! - [`color`] - Human-readable color names
//! - [`format`] - Display text helpers (durations, temperatures)
//! - [`config`] - Configuration loading traits and types
//! - [`prelude`] - Common re-exports for convenience
//!
//! # Usage
//!
//! ```rust
//! use helix_common::prelude::*;
//!
//! let info = SlotInfo::default();
//! assert_eq!(info.status, SlotStatus::Unknown);
//! ```

pub mod ams;
pub mod color;
pub mod config;
pub mod defaults;
pub mod filament;
pub mod format;
pub mod prelude;
pub mod slot_registry;
