//! System, unit and slot types for automated material systems.
//!
//! These structures are backend-agnostic: concrete backends translate their
//! firmware state (Happy Hare `printer.mmu`, AFC lane data, tool changer
//! objects) into this model. All state enums use `#[repr(u8)]` so they can be
//! published as plain integers through the observable state store.
//!
//! Snapshots (`AmsSystemInfo`) are rebuilt on every query; the durable store
//! for per-slot data is the backend's [`SlotRegistry`](crate::slot_registry::SlotRegistry).

use serde::{Deserialize, Serialize};
use static_assertions::const_assert_eq;
use std::fmt;

/// Default color for slots without filament info (medium gray).
pub const DEFAULT_SLOT_COLOR: u32 = 0x808080;

/// `current_slot` value meaning "nothing selected".
pub const NO_SLOT: i32 = -1;

/// `current_slot` value meaning filament is fed through the bypass.
pub const BYPASS_SLOT: i32 = -2;

/// Upper bound on slots for the mock backend and per-slot state cells.
pub const MAX_MOCK_SLOTS: usize = 16;

// ─── System Type ────────────────────────────────────────────────────

/// Type of AMS system detected.
///
/// Tool changers differ from filament systems in that every "slot" is a
/// complete toolhead with its own extruder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AmsType {
    /// No AMS detected.
    None = 0,
    /// Happy Hare MMU.
    HappyHare = 1,
    /// AFC-Klipper-Add-On (Box Turtle, Night Owl, ...).
    Afc = 2,
    /// AnyCubic ACE Pro via the ValgACE driver.
    ValgAce = 3,
    /// Physical tool changer.
    ToolChanger = 4,
}

impl AmsType {
    /// Convert from raw `u8`. Returns `None` for invalid values.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::HappyHare),
            2 => Some(Self::Afc),
            3 => Some(Self::ValgAce),
            4 => Some(Self::ToolChanger),
            _ => None,
        }
    }

    /// Human-readable name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::HappyHare => "Happy Hare",
            Self::Afc => "AFC",
            Self::ValgAce => "ACE Pro",
            Self::ToolChanger => "Tool Changer",
        }
    }

    /// Parse a Moonraker object name or display name.
    pub fn from_name(name: &str) -> Self {
        match name {
            "mmu" | "happy_hare" | "Happy Hare" => Self::HappyHare,
            "afc" | "AFC" => Self::Afc,
            "valgace" | "ValgACE" | "ace" | "ACE Pro" => Self::ValgAce,
            "toolchanger" | "tool_changer" | "Tool Changer" => Self::ToolChanger,
            _ => Self::None,
        }
    }

    /// True for physical tool changers.
    pub const fn is_tool_changer(self) -> bool {
        matches!(self, Self::ToolChanger)
    }

    /// True for systems routing several filaments into one toolhead.
    pub const fn is_filament_system(self) -> bool {
        matches!(self, Self::HappyHare | Self::Afc | Self::ValgAce)
    }
}

impl Default for AmsType {
    fn default() -> Self {
        Self::None
    }
}

impl fmt::Display for AmsType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Slot Status ────────────────────────────────────────────────────

/// Slot / lane status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SlotStatus {
    /// Status not known.
    Unknown = 0,
    /// No filament in slot.
    Empty = 1,
    /// Filament present, not loaded.
    Available = 2,
    /// Filament loaded to the extruder.
    Loaded = 3,
    /// Filament available from buffer.
    FromBuffer = 4,
    /// Slot jammed or otherwise blocked.
    Blocked = 5,
}

impl SlotStatus {
    /// Convert from raw `u8`. Returns `None` for invalid values.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Unknown),
            1 => Some(Self::Empty),
            2 => Some(Self::Available),
            3 => Some(Self::Loaded),
            4 => Some(Self::FromBuffer),
            5 => Some(Self::Blocked),
            _ => None,
        }
    }

    /// Human-readable name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "Unknown",
            Self::Empty => "Empty",
            Self::Available => "Available",
            Self::Loaded => "Loaded",
            Self::FromBuffer => "From Buffer",
            Self::Blocked => "Blocked",
        }
    }

    /// Translate a Happy Hare `gate_status` value (-1, 0, 1, 2).
    ///
    /// Loaded state is derived from `current_slot`, never from the gate status.
    pub const fn from_gate_status(status: i32) -> Self {
        match status {
            0 => Self::Empty,
            1 => Self::Available,
            2 => Self::FromBuffer,
            _ => Self::Unknown,
        }
    }

    /// Translate back into a Happy Hare `gate_status` value.
    pub const fn to_gate_status(self) -> i32 {
        match self {
            Self::Empty => 0,
            Self::Available | Self::Loaded => 1,
            Self::FromBuffer => 2,
            Self::Unknown | Self::Blocked => -1,
        }
    }

    /// True when the slot can feed filament.
    pub const fn has_filament(self) -> bool {
        matches!(self, Self::Available | Self::Loaded | Self::FromBuffer)
    }
}

impl Default for SlotStatus {
    fn default() -> Self {
        Self::Unknown
    }
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Action ─────────────────────────────────────────────────────────

/// Current AMS operation. The single central state-machine value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AmsAction {
    /// No operation in progress.
    Idle = 0,
    /// Loading filament to the extruder.
    Loading = 1,
    /// Unloading filament from the extruder.
    Unloading = 2,
    /// Selecting tool or slot.
    Selecting = 3,
    /// Homing / resetting the unit.
    Resetting = 4,
    /// Forming a filament tip.
    FormingTip = 5,
    /// Heating for an operation.
    Heating = 6,
    /// Sensor verification during recovery.
    Checking = 7,
    /// Paused, user attention required.
    Paused = 8,
    /// Error state.
    Error = 9,
    /// Cutting filament before retraction.
    Cutting = 10,
    /// Purging old color after a load.
    Purging = 11,
}

impl AmsAction {
    /// Convert from raw `u8`. Returns `None` for invalid values.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Idle),
            1 => Some(Self::Loading),
            2 => Some(Self::Unloading),
            3 => Some(Self::Selecting),
            4 => Some(Self::Resetting),
            5 => Some(Self::FormingTip),
            6 => Some(Self::Heating),
            7 => Some(Self::Checking),
            8 => Some(Self::Paused),
            9 => Some(Self::Error),
            10 => Some(Self::Cutting),
            11 => Some(Self::Purging),
            _ => None,
        }
    }

    /// Human-readable name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Loading => "Loading",
            Self::Unloading => "Unloading",
            Self::Selecting => "Selecting",
            Self::Resetting => "Resetting",
            Self::FormingTip => "Forming Tip",
            Self::Heating => "Heating",
            Self::Checking => "Checking",
            Self::Paused => "Paused",
            Self::Error => "Error",
            Self::Cutting => "Cutting",
            Self::Purging => "Purging",
        }
    }

    /// Parse a Happy Hare `printer.mmu.action` string.
    pub fn from_firmware(action: &str) -> Self {
        match action {
            "Idle" => Self::Idle,
            "Loading" => Self::Loading,
            "Unloading" => Self::Unloading,
            "Selecting" => Self::Selecting,
            "Homing" | "Resetting" => Self::Resetting,
            "Cutting" => Self::Cutting,
            "Forming Tip" | "Forming tip" => Self::FormingTip,
            "Heating" => Self::Heating,
            "Checking" => Self::Checking,
            "Purging" => Self::Purging,
            s if s.contains("Pause") => Self::Paused,
            s if s.contains("Error") => Self::Error,
            _ => Self::Idle,
        }
    }

    /// True for the actions that move filament through the path.
    pub const fn is_filament_operation(self) -> bool {
        matches!(self, Self::Loading | Self::Unloading | Self::Selecting)
    }
}

impl Default for AmsAction {
    fn default() -> Self {
        Self::Idle
    }
}

impl fmt::Display for AmsAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Tip Handling ───────────────────────────────────────────────────

/// How the filament tip is prepared before retraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum TipMethod {
    /// No active tip handling.
    None = 0,
    /// Physical filament cutter.
    Cut = 1,
    /// Heat and retract to form a tapered tip.
    TipForm = 2,
}

impl TipMethod {
    /// Human-readable name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Cut => "Cutter",
            Self::TipForm => "Tip Forming",
        }
    }

    /// Label for the unload step in progress displays.
    pub const fn step_label(self) -> &'static str {
        match self {
            Self::None => "Retract",
            Self::Cut => "Cut & retract",
            Self::TipForm => "Form tip & retract",
        }
    }
}

impl Default for TipMethod {
    fn default() -> Self {
        Self::Cut
    }
}

impl fmt::Display for TipMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Filament Path ──────────────────────────────────────────────────

/// Physical layout of the filament path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PathTopology {
    /// Selector picks one gate (Happy Hare ERCF).
    Linear = 0,
    /// Lanes merge through a hub (AFC Box Turtle).
    Hub = 1,
    /// Every slot has its own toolhead.
    Parallel = 2,
}

impl PathTopology {
    /// Convert from raw `u8`. Returns `None` for invalid values.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Linear),
            1 => Some(Self::Hub),
            2 => Some(Self::Parallel),
            _ => None,
        }
    }

    /// Human-readable name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Linear => "Linear (Selector)",
            Self::Hub => "Hub (Merger)",
            Self::Parallel => "Parallel (Tool Changer)",
        }
    }
}

impl Default for PathTopology {
    fn default() -> Self {
        Self::Hub
    }
}

impl fmt::Display for PathTopology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Logical segments of the filament path, spool to nozzle.
///
/// ```text
/// SPOOL → PREP → LANE → HUB → OUTPUT → TOOLHEAD → NOZZLE
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u8)]
pub enum PathSegment {
    /// No filament present.
    None = 0,
    /// At the spool.
    Spool = 1,
    /// At the prep / gate sensor.
    Prep = 2,
    /// In the lane tube.
    Lane = 3,
    /// At the hub or selector.
    Hub = 4,
    /// In the output (bowden) tube.
    Output = 5,
    /// At the toolhead sensor.
    Toolhead = 6,
    /// Fully loaded.
    Nozzle = 7,
}

impl PathSegment {
    /// Number of segments including `None`.
    pub const COUNT: usize = 8;

    /// Convert from raw `u8`. Returns `None` for invalid values.
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::Spool),
            2 => Some(Self::Prep),
            3 => Some(Self::Lane),
            4 => Some(Self::Hub),
            5 => Some(Self::Output),
            6 => Some(Self::Toolhead),
            7 => Some(Self::Nozzle),
            _ => None,
        }
    }

    /// Human-readable name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "None",
            Self::Spool => "Spool",
            Self::Prep => "Prep Sensor",
            Self::Lane => "Lane",
            Self::Hub => "Hub/Selector",
            Self::Output => "Output Tube",
            Self::Toolhead => "Toolhead",
            Self::Nozzle => "Nozzle",
        }
    }

    /// Next segment toward the nozzle. `Nozzle` stays put.
    pub const fn next(self) -> Self {
        match self {
            Self::None => Self::Spool,
            Self::Spool => Self::Prep,
            Self::Prep => Self::Lane,
            Self::Lane => Self::Hub,
            Self::Hub => Self::Output,
            Self::Output => Self::Toolhead,
            Self::Toolhead | Self::Nozzle => Self::Nozzle,
        }
    }

    /// Next segment toward the spool. `Spool` retracts to `None`.
    pub const fn prev(self) -> Self {
        match self {
            Self::None | Self::Spool => Self::None,
            Self::Prep => Self::Spool,
            Self::Lane => Self::Prep,
            Self::Hub => Self::Lane,
            Self::Output => Self::Hub,
            Self::Toolhead => Self::Output,
            Self::Nozzle => Self::Toolhead,
        }
    }

    /// Map Happy Hare `filament_pos` to a segment.
    pub const fn from_hh_filament_pos(pos: i32) -> Self {
        match pos {
            0 => Self::Spool,
            1 | 2 => Self::Prep,
            3 => Self::Lane,
            4 => Self::Hub,
            5 => Self::Output,
            6 => Self::Toolhead,
            7 | 8 => Self::Nozzle,
            _ => Self::None,
        }
    }

    /// Infer position from AFC lane sensors.
    pub const fn from_afc_sensors(prep: bool, hub: bool, toolhead: bool) -> Self {
        if toolhead {
            Self::Nozzle
        } else if hub {
            Self::Toolhead
        } else if prep {
            Self::Hub
        } else {
            Self::Spool
        }
    }
}

impl Default for PathSegment {
    fn default() -> Self {
        Self::None
    }
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const_assert_eq!(core::mem::size_of::<AmsAction>(), 1);
const_assert_eq!(core::mem::size_of::<SlotStatus>(), 1);
const_assert_eq!(core::mem::size_of::<PathSegment>(), 1);

// ─── Slot ───────────────────────────────────────────────────────────

/// Severity of a per-slot error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SlotErrorSeverity {
    /// Informational.
    Info,
    /// Needs attention soon.
    Warning,
    /// Slot unusable until cleared.
    #[default]
    Error,
}

/// Per-slot error reported by firmware.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SlotError {
    /// Human-readable error description.
    pub message: String,
    /// Error severity.
    pub severity: SlotErrorSeverity,
}

impl SlotError {
    /// Create an error with the given severity.
    pub fn new(message: impl Into<String>, severity: SlotErrorSeverity) -> Self {
        Self {
            message: message.into(),
            severity,
        }
    }
}

/// AFC buffer health.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BufferHealth {
    /// Whether buffer fault detection is active.
    pub fault_detection_enabled: bool,
    /// Distance to fault in mm (0 = no fault proximity).
    pub distance_to_fault: f32,
    /// Buffer state, e.g. "Advancing" or "Trailing".
    pub state: String,
}

/// One physical or logical filament slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SlotInfo {
    /// Slot number within its unit (0-based).
    pub slot_index: i32,
    /// Index across all units.
    pub global_index: i32,
    /// Slot status.
    pub status: SlotStatus,
    /// Tool this slot maps to (-1 = none).
    pub mapped_tool: i32,

    /// Named color, e.g. "Red".
    pub color_name: String,
    /// 0xRRGGBB color.
    pub color_rgb: u32,
    /// Comma-separated hex codes for multi-color filament.
    pub multi_color_hexes: String,
    /// Material, e.g. "PLA".
    pub material: String,
    /// Brand, e.g. "Polymaker".
    pub brand: String,

    /// Minimum nozzle temperature (°C).
    pub nozzle_temp_min: i32,
    /// Maximum nozzle temperature (°C).
    pub nozzle_temp_max: i32,
    /// Recommended bed temperature (°C).
    pub bed_temp: i32,

    /// Spoolman spool id (0 = not tracked).
    pub spoolman_id: i32,
    /// Spool name from Spoolman.
    pub spool_name: String,
    /// Remaining filament weight in grams (-1 = unknown).
    pub remaining_weight_g: f32,
    /// Total filament weight in grams (-1 = unknown).
    pub total_weight_g: f32,

    /// Endless spool group (-1 = not grouped).
    pub endless_spool_group: i32,

    /// Per-slot error state.
    pub error: Option<SlotError>,
    /// AFC buffer health.
    pub buffer_health: Option<BufferHealth>,
}

impl SlotInfo {
    /// Remaining filament in percent, or -1 when unknown.
    pub fn remaining_percent(&self) -> f32 {
        if self.remaining_weight_g < 0.0 || self.total_weight_g <= 0.0 {
            return -1.0;
        }
        (self.remaining_weight_g / self.total_weight_g * 100.0).clamp(0.0, 100.0)
    }

    /// True when material or a non-default color is known.
    pub fn has_filament_info(&self) -> bool {
        !self.material.is_empty() || self.color_rgb != DEFAULT_SLOT_COLOR
    }

    /// True for multi-color filament.
    pub fn is_multi_color(&self) -> bool {
        !self.multi_color_hexes.is_empty()
    }

    /// Snapshot returned for out-of-range slot queries.
    pub fn invalid() -> Self {
        Self::default()
    }

    /// Copy filament identity and Spoolman fields from `other`, keeping
    /// indices, status and tool mapping.
    pub fn copy_filament_from(&mut self, other: &SlotInfo) {
        self.color_name = other.color_name.clone();
        self.color_rgb = other.color_rgb;
        self.multi_color_hexes = other.multi_color_hexes.clone();
        self.material = other.material.clone();
        self.brand = other.brand.clone();
        self.spoolman_id = other.spoolman_id;
        self.spool_name = other.spool_name.clone();
        self.remaining_weight_g = other.remaining_weight_g;
        self.total_weight_g = other.total_weight_g;
        self.nozzle_temp_min = other.nozzle_temp_min;
        self.nozzle_temp_max = other.nozzle_temp_max;
        self.bed_temp = other.bed_temp;
    }
}

impl Default for SlotInfo {
    fn default() -> Self {
        Self {
            slot_index: -1,
            global_index: -1,
            status: SlotStatus::Unknown,
            mapped_tool: -1,
            color_name: String::new(),
            color_rgb: DEFAULT_SLOT_COLOR,
            multi_color_hexes: String::new(),
            material: String::new(),
            brand: String::new(),
            nozzle_temp_min: 0,
            nozzle_temp_max: 0,
            bed_temp: 0,
            spoolman_id: 0,
            spool_name: String::new(),
            remaining_weight_g: -1.0,
            total_weight_g: -1.0,
            endless_spool_group: -1,
            error: None,
            buffer_health: None,
        }
    }
}

// ─── Unit ───────────────────────────────────────────────────────────

/// One AMS unit (a Box Turtle, an ERCF, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmsUnit {
    /// Unit number (0-based).
    pub unit_index: i32,
    /// Display name.
    pub name: String,
    /// Number of slots on this unit.
    pub slot_count: i32,
    /// Global index of the first slot.
    pub first_slot_global_index: i32,
    /// Slot snapshots.
    pub slots: Vec<SlotInfo>,

    /// Unit communication status.
    pub connected: bool,
    /// Firmware version if available.
    pub firmware_version: String,

    /// Has a filament encoder.
    pub has_encoder: bool,
    /// Has a toolhead filament sensor.
    pub has_toolhead_sensor: bool,
    /// Has per-slot sensors.
    pub has_slot_sensors: bool,
    /// Has a hub / combiner sensor.
    pub has_hub_sensor: bool,
    /// Filament detected at this unit's hub.
    pub hub_sensor_triggered: bool,

    /// Unit-level buffer health (AFC).
    pub buffer_health: Option<BufferHealth>,
    /// Path layout inside this unit.
    pub topology: PathTopology,
    /// Tool fed by this unit's hub (-1 = shared / unknown).
    pub hub_tool_label: i32,
}

impl AmsUnit {
    /// Slot by unit-local index.
    pub fn get_slot(&self, local_index: i32) -> Option<&SlotInfo> {
        usize::try_from(local_index)
            .ok()
            .and_then(|i| self.slots.get(i))
    }

    /// Mutable slot by unit-local index.
    pub fn get_slot_mut(&mut self, local_index: i32) -> Option<&mut SlotInfo> {
        usize::try_from(local_index)
            .ok()
            .and_then(|i| self.slots.get_mut(i))
    }

    /// True if any slot carries an error.
    pub fn has_any_error(&self) -> bool {
        self.slots.iter().any(|s| s.error.is_some())
    }

    /// True if `global_index` falls inside this unit's range.
    pub fn contains_global(&self, global_index: i32) -> bool {
        global_index >= self.first_slot_global_index
            && global_index < self.first_slot_global_index + self.slot_count
    }
}

impl Default for AmsUnit {
    fn default() -> Self {
        Self {
            unit_index: 0,
            name: String::new(),
            slot_count: 0,
            first_slot_global_index: 0,
            slots: Vec::new(),
            connected: false,
            firmware_version: String::new(),
            has_encoder: false,
            has_toolhead_sensor: false,
            has_slot_sensors: false,
            has_hub_sensor: false,
            hub_sensor_triggered: false,
            buffer_health: None,
            topology: PathTopology::Hub,
            hub_tool_label: -1,
        }
    }
}

// ─── System ─────────────────────────────────────────────────────────

/// Aggregate snapshot returned by `get_system_info()`.
///
/// Transient: rebuilt from the slot registry on every query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AmsSystemInfo {
    /// Detected system type.
    #[serde(rename = "type")]
    pub ams_type: AmsType,
    /// Display name, e.g. "Happy Hare".
    pub type_name: String,
    /// System version string.
    pub version: String,

    /// Active tool (-1 = none).
    pub current_tool: i32,
    /// Active slot (-1 = none, -2 = bypass).
    pub current_slot: i32,
    /// Target slot of a tool change in progress (-1 = none).
    pub pending_target_slot: i32,
    /// Filament present at the extruder.
    pub filament_loaded: bool,
    /// Current operation.
    pub action: AmsAction,
    /// Free-text description of the operation.
    pub operation_detail: String,

    /// All units.
    pub units: Vec<AmsUnit>,
    /// Sum of all slots across units.
    pub total_slots: i32,

    /// Endless spool supported.
    pub supports_endless_spool: bool,
    /// Spoolman linkage supported.
    pub supports_spoolman: bool,
    /// Tool-to-slot remapping supported.
    pub supports_tool_mapping: bool,
    /// Bypass position present.
    pub supports_bypass: bool,
    /// Bypass is detected by a sensor rather than toggled.
    pub has_hardware_bypass_sensor: bool,
    /// How the tip is handled during unload.
    pub tip_method: TipMethod,
    /// Purge after load supported.
    pub supports_purge: bool,

    /// `tool_to_slot_map[tool] = slot`.
    pub tool_to_slot_map: Vec<i32>,
}

impl AmsSystemInfo {
    /// Slot by global index.
    pub fn get_slot_global(&self, global_index: i32) -> Option<&SlotInfo> {
        self.units
            .iter()
            .find(|u| u.contains_global(global_index))
            .and_then(|u| u.get_slot(global_index - u.first_slot_global_index))
    }

    /// Mutable slot by global index.
    pub fn get_slot_global_mut(&mut self, global_index: i32) -> Option<&mut SlotInfo> {
        self.units
            .iter_mut()
            .find(|u| u.contains_global(global_index))
            .and_then(|u| {
                let local = global_index - u.first_slot_global_index;
                u.get_slot_mut(local)
            })
    }

    /// Slot currently feeding the extruder.
    pub fn get_active_slot(&self) -> Option<&SlotInfo> {
        if self.current_slot < 0 {
            return None;
        }
        self.get_slot_global(self.current_slot)
    }

    /// True when a system is detected and reports at least one unit.
    pub fn is_available(&self) -> bool {
        self.ams_type != AmsType::None && !self.units.is_empty()
    }

    /// True while an operation other than idle / error is running.
    pub fn is_busy(&self) -> bool {
        !matches!(self.action, AmsAction::Idle | AmsAction::Error)
    }

    /// True for systems with more than one unit.
    pub fn is_multi_unit(&self) -> bool {
        self.units.len() > 1
    }

    /// Number of units.
    pub fn unit_count(&self) -> i32 {
        self.units.len() as i32
    }

    /// Unit by index.
    pub fn get_unit(&self, unit_index: i32) -> Option<&AmsUnit> {
        usize::try_from(unit_index)
            .ok()
            .and_then(|i| self.units.get(i))
    }

    /// Unit owning the given global slot.
    pub fn get_unit_for_slot(&self, global_index: i32) -> Option<&AmsUnit> {
        self.units.iter().find(|u| u.contains_global(global_index))
    }

    /// Unit index of the active slot, or -1.
    pub fn get_active_unit_index(&self) -> i32 {
        if self.current_slot < 0 {
            return -1;
        }
        self.get_unit_for_slot(self.current_slot)
            .map_or(-1, |u| u.unit_index)
    }

    /// True when filament is fed through the bypass.
    pub fn is_bypass_active(&self) -> bool {
        self.current_slot == BYPASS_SLOT
    }
}

impl Default for AmsSystemInfo {
    fn default() -> Self {
        Self {
            ams_type: AmsType::None,
            type_name: String::new(),
            version: String::new(),
            current_tool: -1,
            current_slot: NO_SLOT,
            pending_target_slot: NO_SLOT,
            filament_loaded: false,
            action: AmsAction::Idle,
            operation_detail: String::new(),
            units: Vec::new(),
            total_slots: 0,
            supports_endless_spool: false,
            supports_spoolman: false,
            supports_tool_mapping: false,
            supports_bypass: false,
            has_hardware_bypass_sensor: false,
            tip_method: TipMethod::Cut,
            supports_purge: false,
            tool_to_slot_map: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_unit_system() -> AmsSystemInfo {
        let mut info = AmsSystemInfo {
            ams_type: AmsType::Afc,
            ..Default::default()
        };
        for (u, (first, count)) in [(0, 4), (4, 2)].into_iter().enumerate() {
            let slots = (0..count)
                .map(|i| SlotInfo {
                    slot_index: i,
                    global_index: first + i,
                    ..Default::default()
                })
                .collect();
            info.units.push(AmsUnit {
                unit_index: u as i32,
                name: format!("Unit {}", u + 1),
                slot_count: count,
                first_slot_global_index: first,
                slots,
                ..Default::default()
            });
        }
        info.total_slots = 6;
        info
    }

    #[test]
    fn test_enum_from_u8_roundtrip() {
        for v in 0..=11u8 {
            assert_eq!(AmsAction::from_u8(v).map(|a| a as u8), Some(v));
        }
        assert!(AmsAction::from_u8(12).is_none());
        assert_eq!(SlotStatus::from_u8(5), Some(SlotStatus::Blocked));
        assert!(PathSegment::from_u8(8).is_none());
    }

    #[test]
    fn test_ams_type_names() {
        assert_eq!(AmsType::from_name("mmu"), AmsType::HappyHare);
        assert_eq!(AmsType::from_name("afc"), AmsType::Afc);
        assert_eq!(AmsType::from_name("ace"), AmsType::ValgAce);
        assert_eq!(AmsType::from_name("tool_changer"), AmsType::ToolChanger);
        assert_eq!(AmsType::from_name("MMU"), AmsType::None);
        assert_eq!(AmsType::ValgAce.to_string(), "ACE Pro");
        assert!(AmsType::ToolChanger.is_tool_changer());
        assert!(!AmsType::ToolChanger.is_filament_system());
        assert!(AmsType::Afc.is_filament_system());
    }

    #[test]
    fn test_gate_status_conversion() {
        assert_eq!(SlotStatus::from_gate_status(-1), SlotStatus::Unknown);
        assert_eq!(SlotStatus::from_gate_status(0), SlotStatus::Empty);
        assert_eq!(SlotStatus::from_gate_status(1), SlotStatus::Available);
        assert_eq!(SlotStatus::from_gate_status(2), SlotStatus::FromBuffer);
        assert_eq!(SlotStatus::from_gate_status(7), SlotStatus::Unknown);
        assert_eq!(SlotStatus::Loaded.to_gate_status(), 1);
        assert_eq!(SlotStatus::Blocked.to_gate_status(), -1);
    }

    #[test]
    fn test_action_from_firmware() {
        assert_eq!(AmsAction::from_firmware("Homing"), AmsAction::Resetting);
        assert_eq!(AmsAction::from_firmware("Forming Tip"), AmsAction::FormingTip);
        assert_eq!(AmsAction::from_firmware("Paused (locked)"), AmsAction::Paused);
        assert_eq!(AmsAction::from_firmware("Error: jam"), AmsAction::Error);
        assert_eq!(AmsAction::from_firmware("whatever"), AmsAction::Idle);
    }

    #[test]
    fn test_path_segment_walk() {
        let mut seg = PathSegment::None;
        let mut steps = 0;
        while seg != PathSegment::Nozzle {
            seg = seg.next();
            steps += 1;
        }
        assert_eq!(steps, 7);
        assert_eq!(PathSegment::Nozzle.next(), PathSegment::Nozzle);
        assert_eq!(PathSegment::Spool.prev(), PathSegment::None);
        assert_eq!(PathSegment::from_hh_filament_pos(8), PathSegment::Nozzle);
        assert_eq!(PathSegment::from_hh_filament_pos(-1), PathSegment::None);
        assert_eq!(
            PathSegment::from_afc_sensors(true, true, false),
            PathSegment::Toolhead
        );
        assert_eq!(
            PathSegment::from_afc_sensors(false, false, false),
            PathSegment::Spool
        );
    }

    #[test]
    fn test_slot_info_helpers() {
        let mut slot = SlotInfo::default();
        assert_eq!(slot.remaining_percent(), -1.0);
        assert!(!slot.has_filament_info());

        slot.total_weight_g = 1000.0;
        slot.remaining_weight_g = 250.0;
        assert_eq!(slot.remaining_percent(), 25.0);

        slot.remaining_weight_g = 1500.0;
        assert_eq!(slot.remaining_percent(), 100.0);

        slot.material = "PLA".to_string();
        assert!(slot.has_filament_info());
        assert!(!slot.is_multi_color());
    }

    #[test]
    fn test_system_info_lookup() {
        let mut info = two_unit_system();
        assert!(info.is_multi_unit());
        assert_eq!(info.unit_count(), 2);
        assert_eq!(info.get_slot_global(5).map(|s| s.slot_index), Some(1));
        assert!(info.get_slot_global(6).is_none());
        assert_eq!(info.get_unit_for_slot(4).map(|u| u.unit_index), Some(1));
        assert_eq!(info.get_unit(1).map(|u| u.name.as_str()), Some("Unit 2"));
        assert!(info.get_unit(-1).is_none());

        info.current_slot = 4;
        assert_eq!(info.get_active_unit_index(), 1);
        assert_eq!(info.get_active_slot().map(|s| s.global_index), Some(4));

        info.current_slot = BYPASS_SLOT;
        assert!(info.is_bypass_active());
        assert_eq!(info.get_active_unit_index(), -1);

        if let Some(slot) = info.get_slot_global_mut(2) {
            slot.error = Some(SlotError::new("jam", SlotErrorSeverity::Error));
        }
        assert!(info.units[0].has_any_error());
        assert!(!info.units[1].has_any_error());
    }

    #[test]
    fn test_is_busy() {
        let mut info = AmsSystemInfo::default();
        assert!(!info.is_busy());
        info.action = AmsAction::Error;
        assert!(!info.is_busy());
        info.action = AmsAction::Purging;
        assert!(info.is_busy());
    }

    #[test]
    fn test_status_and_action_predicates() {
        assert!(SlotStatus::FromBuffer.has_filament());
        assert!(SlotStatus::Loaded.has_filament());
        assert!(!SlotStatus::Empty.has_filament());
        assert!(!SlotStatus::Blocked.has_filament());

        assert!(AmsAction::Selecting.is_filament_operation());
        assert!(AmsAction::Unloading.is_filament_operation());
        assert!(!AmsAction::Heating.is_filament_operation());
        assert!(!AmsAction::Idle.is_filament_operation());

        assert_eq!(TipMethod::Cut.step_label(), "Cut & retract");
        assert_eq!(TipMethod::TipForm.step_label(), "Form tip & retract");
        assert_eq!(TipMethod::None.step_label(), "Retract");
    }
}
