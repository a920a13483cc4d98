//! AMS data model shared by backends and the state layer.
//!
//! - [`types`] - System, unit and slot snapshots plus the state enums
//! - [`error`] - `AmsResult` codes and the `AmsError` value
//! - [`event`] - Typed backend events and the channel sink
//! - [`dryer`] - Dryer state and drying presets
//! - [`device`] - Capability flags, endless spool and device-action types

pub mod device;
pub mod dryer;
pub mod error;
pub mod event;
pub mod types;

pub use error::{AmsError, AmsResult};
pub use event::{AmsEvent, BackendEvent, EventSink};
pub use types::*;
