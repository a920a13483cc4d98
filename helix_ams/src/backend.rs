//! AMS backend trait.
//!
//! Every driver for a multi-material system (Happy Hare, AFC, tool changer,
//! the mock) implements [`AmsBackend`]. Methods take `&self`: backends keep
//! their state behind interior locks because operations complete on
//! background threads.
//!
//! Synchronous results are [`AmsError`] values; asynchronous completion and
//! failures arrive as [`AmsEvent`](helix_common::ams::AmsEvent)s on the
//! [`EventSink`] installed with [`AmsBackend::set_event_sink`].

use helix_common::ams::device::{
    ActionValue, DeviceAction, DeviceSection, EndlessSpoolCapabilities, EndlessSpoolConfig,
    ToolMappingCapabilities,
};
use helix_common::ams::dryer::{DryerInfo, DryingPreset, default_drying_presets};
use helix_common::ams::{
    AmsAction, AmsError, AmsSystemInfo, AmsType, EventSink, PathSegment, PathTopology, SlotInfo,
};
use std::sync::Arc;

/// Receiver for raw G-code console lines a backend wants shown to the user
/// (e.g. `// action:prompt_*` sequences).
pub type GcodeResponseSink = Arc<dyn Fn(&str) + Send + Sync>;

/// Trait defining the interface for AMS backends.
///
/// `AmsState` manages backends through this trait, enabling pluggable
/// firmware integrations and the simulation backend.
///
/// # Lifecycle
///
/// 1. `set_event_sink()` - Install the event channel
/// 2. `start()` - Begin reporting; emits `StateChanged` on the first start
/// 3. queries and operations
/// 4. `stop()` - Stop reporting; background work winds down on drop
///
/// # Operation Contract
///
/// | Operation | Rejection | On acceptance |
/// |-----------|-----------|---------------|
/// | `load_filament` | NotConnected, Busy, InvalidSlot, SlotNotAvailable | action set synchronously, `LoadComplete` later |
/// | `unload_filament` | NotConnected, Busy, WrongState | action set synchronously, `UnloadComplete` later |
/// | `change_tool` | NotConnected, Busy, InvalidTool | action set synchronously, `ToolChanged` later |
/// | `cancel` | never | action forced to Idle |
pub trait AmsBackend: Send + Sync {
    // ─── Lifecycle ──────────────────────────────────────────────────

    /// Start the backend. Idempotent: a second call returns success without
    /// emitting another `StateChanged`.
    fn start(&self) -> AmsError;

    /// Stop the backend.
    fn stop(&self);

    /// True between `start()` and `stop()`.
    fn is_running(&self) -> bool;

    /// Install (or clear) the event sink.
    fn set_event_sink(&self, sink: Option<EventSink>);

    // ─── Queries ────────────────────────────────────────────────────

    /// Full snapshot. Always succeeds.
    fn get_system_info(&self) -> AmsSystemInfo;

    /// Detected system type.
    fn get_type(&self) -> AmsType;

    /// Slot snapshot by global index. Out-of-range indices return a default
    /// `SlotInfo` with `slot_index == -1`.
    fn get_slot_info(&self, slot: i32) -> SlotInfo;

    /// Current action.
    fn get_current_action(&self) -> AmsAction;

    /// Active tool, or -1.
    fn get_current_tool(&self) -> i32;

    /// Active slot, -1 for none, -2 for bypass.
    fn get_current_slot(&self) -> i32;

    /// Filament present at the nozzle.
    fn is_filament_loaded(&self) -> bool;

    /// System-wide path topology.
    fn get_topology(&self) -> PathTopology;

    /// Topology of one unit. Systems with a single layout report
    /// [`get_topology`](Self::get_topology).
    fn get_unit_topology(&self, _unit: i32) -> PathTopology {
        self.get_topology()
    }

    /// Where the active filament currently is.
    fn get_filament_segment(&self) -> PathSegment;

    /// Where the filament of one slot is.
    fn get_slot_filament_segment(&self, slot: i32) -> PathSegment;

    /// Segment to highlight as the fault location, `None` when healthy.
    fn infer_error_segment(&self) -> PathSegment;

    /// True while filament is fed through the bypass.
    fn is_bypass_active(&self) -> bool;

    /// Firmware stores spool assignments itself.
    fn has_firmware_spool_persistence(&self) -> bool {
        false
    }

    /// Slot has a prep (lane entry) sensor.
    fn slot_has_prep_sensor(&self, _slot: i32) -> bool {
        false
    }

    // ─── Operations ─────────────────────────────────────────────────

    /// Load filament from a slot to the nozzle.
    fn load_filament(&self, slot: i32) -> AmsError;

    /// Unload the current filament.
    fn unload_filament(&self) -> AmsError;

    /// Select a slot without loading.
    fn select_slot(&self, slot: i32) -> AmsError;

    /// Full tool change (unload, select, load).
    fn change_tool(&self, tool: i32) -> AmsError;

    /// Clear an error or pause.
    fn recover(&self) -> AmsError;

    /// Home / reset the unit.
    fn reset(&self) -> AmsError;

    /// Reset one lane without touching the others.
    fn reset_lane(&self, _slot: i32) -> AmsError {
        AmsError::not_supported("Per-lane reset")
    }

    /// Abort the current operation. Always accepted.
    fn cancel(&self) -> AmsError;

    /// Replace a slot's filament data. `persist` asks the backend to write
    /// the change to firmware as well.
    fn set_slot_info(&self, slot: i32, info: &SlotInfo, persist: bool) -> AmsError;

    /// Map a tool number to a slot.
    fn set_tool_mapping(&self, tool: i32, slot: i32) -> AmsError;

    /// Switch to external filament through the bypass.
    fn enable_bypass(&self) -> AmsError;

    /// Leave bypass mode.
    fn disable_bypass(&self) -> AmsError;

    // ─── Dryer ──────────────────────────────────────────────────────

    /// Dryer state. Default: unsupported.
    fn get_dryer_info(&self) -> DryerInfo {
        DryerInfo::default()
    }

    /// Start drying. `fan_pct < 0` uses the backend default.
    fn start_drying(&self, _temp_c: f32, _duration_min: i32, _fan_pct: i32) -> AmsError {
        AmsError::not_supported("Dryer")
    }

    /// Stop drying.
    fn stop_drying(&self) -> AmsError {
        AmsError::not_supported("Dryer")
    }

    /// Change a running dry cycle. Negative values keep the current setting.
    fn update_drying(&self, _temp_c: f32, _duration_min: i32, _fan_pct: i32) -> AmsError {
        AmsError::not_supported("Dryer")
    }

    /// Drying presets offered to the user.
    fn get_drying_presets(&self) -> Vec<DryingPreset> {
        default_drying_presets()
    }

    // ─── Endless Spool / Tool Mapping ───────────────────────────────

    /// Endless spool support.
    fn get_endless_spool_capabilities(&self) -> EndlessSpoolCapabilities {
        EndlessSpoolCapabilities::default()
    }

    /// Per-slot backup configuration.
    fn get_endless_spool_config(&self) -> Vec<EndlessSpoolConfig> {
        Vec::new()
    }

    /// Set the backup slot for `slot` (-1 clears it).
    fn set_endless_spool_backup(&self, _slot: i32, _backup_slot: i32) -> AmsError {
        AmsError::not_supported("Endless spool")
    }

    /// Restore the default tool-to-slot mapping.
    fn reset_tool_mappings(&self) -> AmsError {
        AmsError::not_supported("Reset tool mappings")
    }

    /// Clear every endless spool backup.
    fn reset_endless_spool(&self) -> AmsError {
        AmsError::not_supported("Reset endless spool")
    }

    /// Tool mapping support.
    fn get_tool_mapping_capabilities(&self) -> ToolMappingCapabilities {
        ToolMappingCapabilities::default()
    }

    /// Tool-to-slot map; `map[tool] == slot`.
    fn get_tool_mapping(&self) -> Vec<i32> {
        Vec::new()
    }

    // ─── Device Actions ─────────────────────────────────────────────

    /// Sections of the device settings surface.
    fn get_device_sections(&self) -> Vec<DeviceSection> {
        Vec::new()
    }

    /// Device settings and commands.
    fn get_device_actions(&self) -> Vec<DeviceAction> {
        Vec::new()
    }

    /// Run a device action.
    fn execute_device_action(&self, _action_id: &str, _value: Option<ActionValue>) -> AmsError {
        AmsError::not_supported("Device actions")
    }

    /// Install (or clear) the G-code response sink.
    fn set_gcode_response_sink(&self, _sink: Option<GcodeResponseSink>) {}

    // ─── Discovery ──────────────────────────────────────────────────

    /// Firmware heats the nozzle itself before a load.
    fn supports_auto_heat_on_load(&self) -> bool {
        false
    }

    /// Lane and hub object names found during printer discovery.
    fn set_discovered_lanes(&self, _lane_names: &[String], _hub_names: &[String]) {}

    /// Tool object names found during printer discovery.
    fn set_discovered_tools(&self, _tool_names: &[String]) {}
}
