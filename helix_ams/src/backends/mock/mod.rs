//! Simulation backend.
//!
//! Drop-in [`AmsBackend`] that needs no printer. Used by the demo binary,
//! UI development and the integration tests.
//!
//! # Modes
//!
//! | Mode | Layout |
//! |------|--------|
//! | default | Happy Hare, one hub unit |
//! | AFC | Box Turtle, 4 lanes, per-lane endless spool |
//! | tool changer | one tool per slot, parallel paths |
//! | multi-unit | Box Turtle (4) + Night Owl (2), single toolhead |
//! | mixed | parallel Box Turtle + two hub OpenAMS units (12 lanes) |
//!
//! # Timing
//!
//! With realistic mode on, operations run through heating, cutting,
//! purging and segment animation phases (see `timing`). With it off, an
//! operation takes about one `operation_delay_ms`. All delays are divided
//! by the simulation speedup.

mod backend;
mod dryer;
mod modes;
mod timing;

pub use backend::AmsBackendMock;

use crate::backend::AmsBackend;
use crate::backend_registry::HardwareInfo;
use helix_common::ams::AmsType;
use tracing::info;

/// Slot count used when discovery found no lanes or tools.
const DEFAULT_SLOT_COUNT: usize = 4;

/// Factory: build a mock shaped like the discovered hardware.
pub fn create_backend(hardware: &HardwareInfo) -> Box<dyn AmsBackend> {
    let slot_count = if !hardware.lane_names.is_empty() {
        hardware.lane_names.len()
    } else if !hardware.tool_names.is_empty() {
        hardware.tool_names.len()
    } else {
        DEFAULT_SLOT_COUNT
    };

    let mock = AmsBackendMock::new(slot_count);
    match hardware.detected_type {
        AmsType::Afc => mock.set_afc_mode(true),
        AmsType::ToolChanger => mock.set_tool_changer_mode(true),
        _ => {}
    }
    info!(
        "Created mock backend ({} slots, type {})",
        slot_count, hardware.detected_type
    );
    Box::new(mock)
}
