//! Prelude module for common re-exports.
//!
//! Consumers can do `use helix_common::prelude::*;` and get the most
//! important AMS types without listing individual paths.

// ─── Configuration ──────────────────────────────────────────────────
pub use crate::config::{AmsConfig, ConfigError, ConfigLoader, LogLevel, MockMode, SharedConfig};

// ─── Data Model ─────────────────────────────────────────────────────
pub use crate::ams::types::{
    AmsAction, AmsSystemInfo, AmsType, AmsUnit, BufferHealth, PathSegment, PathTopology,
    SlotError, SlotErrorSeverity, SlotInfo, SlotStatus, TipMethod,
};
pub use crate::ams::types::{BYPASS_SLOT, DEFAULT_SLOT_COLOR, MAX_MOCK_SLOTS, NO_SLOT};

// ─── Errors & Events ────────────────────────────────────────────────
pub use crate::ams::error::{AmsError, AmsResult};
pub use crate::ams::event::{AmsEvent, BackendEvent, EventSink};

// ─── Capabilities ───────────────────────────────────────────────────
pub use crate::ams::device::{
    ActionType, ActionValue, BackendCapabilities, CapabilityFlags, DeviceAction, DeviceSection,
    EndlessSpoolCapabilities, EndlessSpoolConfig, ToolMappingCapabilities,
};
pub use crate::ams::dryer::{DryerInfo, DryingPreset};

// ─── Registry ───────────────────────────────────────────────────────
pub use crate::slot_registry::SlotRegistry;
