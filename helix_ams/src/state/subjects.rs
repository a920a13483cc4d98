//! Observable cells published by `AmsState`.
//!
//! Every value the UI binds to is a named cell: an [`IntSubject`] or a
//! bounded [`StringSubject`]. Observers run synchronously on the thread
//! that sets the value, which is always the `AmsState` owner thread.
//! Setting a cell to its current value does not notify.
//!
//! Cell names follow the `ams_*`, `path_*`, `dryer_*` and
//! `ams_slot_N_color` / `ams_slot_N_status` conventions so they can be
//! looked up by name from bindings.

use heapless::String as BoundedString;
use helix_common::ams::{AmsAction, AmsType, DEFAULT_SLOT_COLOR, PathSegment, PathTopology, SlotStatus};

/// Slot cells published for the primary backend.
pub const MAX_SLOTS: usize = 16;

/// Capacity of short labels ("T12", "55°C", "1250g").
pub const SHORT_TEXT: usize = 16;
/// Capacity of durations and countdowns.
pub const TIME_TEXT: usize = 32;
/// Capacity of names, details and slot labels.
pub const LONG_TEXT: usize = 64;

/// Background shown when nothing is loaded.
pub const EMPTY_CURRENT_COLOR: i32 = 0x505050;

type IntObserver = Box<dyn Fn(i32) + Send>;
type TextObserver = Box<dyn Fn(&str) + Send>;

// ─── Integer Cell ───────────────────────────────────────────────────

/// Named integer cell.
pub struct IntSubject {
    name: String,
    initial: i32,
    value: i32,
    observers: Vec<IntObserver>,
}

impl IntSubject {
    pub fn new(name: impl Into<String>, initial: i32) -> Self {
        Self {
            name: name.into(),
            initial,
            value: initial,
            observers: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self) -> i32 {
        self.value
    }

    /// Store `value` and notify observers. Returns false when unchanged.
    pub fn set(&mut self, value: i32) -> bool {
        if self.value == value {
            return false;
        }
        self.value = value;
        for observer in &self.observers {
            observer(value);
        }
        true
    }

    pub fn set_bool(&mut self, value: bool) -> bool {
        self.set(i32::from(value))
    }

    pub fn observe(&mut self, observer: impl Fn(i32) + Send + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Back to the initial value, observers dropped.
    pub fn reset(&mut self) {
        self.value = self.initial;
        self.observers.clear();
    }
}

// ─── String Cell ────────────────────────────────────────────────────

/// Named string cell holding at most `N` bytes. Longer text is cut at
/// the last character boundary that fits.
pub struct StringSubject<const N: usize> {
    name: String,
    initial: &'static str,
    value: BoundedString<N>,
    observers: Vec<TextObserver>,
}

fn bounded<const N: usize>(text: &str) -> BoundedString<N> {
    let mut out = BoundedString::new();
    for c in text.chars() {
        if out.push(c).is_err() {
            break;
        }
    }
    out
}

impl<const N: usize> StringSubject<N> {
    pub fn new(name: impl Into<String>, initial: &'static str) -> Self {
        Self {
            name: name.into(),
            initial,
            value: bounded(initial),
            observers: Vec::new(),
        }
    }

    pub fn get(&self) -> &str {
        self.value.as_str()
    }

    /// Store `text` and notify observers. Returns false when unchanged.
    pub fn set(&mut self, text: &str) -> bool {
        let next = bounded::<N>(text);
        if next == self.value {
            return false;
        }
        self.value = next;
        for observer in &self.observers {
            observer(self.value.as_str());
        }
        true
    }

    pub fn observe(&mut self, observer: impl Fn(&str) + Send + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn reset(&mut self) {
        self.value = bounded(self.initial);
        self.observers.clear();
    }
}

/// Name-based access to string cells of any capacity.
pub trait TextSubject {
    fn name(&self) -> &str;
    fn text(&self) -> &str;
    fn observe_text(&mut self, observer: TextObserver);
    fn reset_text(&mut self);
}

impl<const N: usize> TextSubject for StringSubject<N> {
    fn name(&self) -> &str {
        &self.name
    }

    fn text(&self) -> &str {
        self.get()
    }

    fn observe_text(&mut self, observer: TextObserver) {
        self.observers.push(observer);
    }

    fn reset_text(&mut self) {
        self.reset();
    }
}

// ─── Per-Backend Slot Cells ─────────────────────────────────────────

/// Color and status cells for the slots of one backend.
pub struct SlotSubjects {
    pub colors: Vec<IntSubject>,
    pub statuses: Vec<IntSubject>,
}

impl SlotSubjects {
    /// Cells for the primary backend: `ams_slot_N_*`.
    pub fn primary(count: usize) -> Self {
        Self::with_prefix("ams_slot", count)
    }

    /// Cells for a secondary backend: `ams_backend_B_slot_N_*`.
    pub fn secondary(backend_index: usize, count: usize) -> Self {
        Self::with_prefix(&format!("ams_backend_{backend_index}_slot"), count)
    }

    fn with_prefix(prefix: &str, count: usize) -> Self {
        Self {
            colors: (0..count)
                .map(|i| IntSubject::new(format!("{prefix}_{i}_color"), DEFAULT_SLOT_COLOR as i32))
                .collect(),
            statuses: (0..count)
                .map(|i| IntSubject::new(format!("{prefix}_{i}_status"), SlotStatus::Unknown as i32))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Publish one slot. Out-of-range indices are ignored.
    pub fn set(&mut self, index: usize, color: u32, status: SlotStatus) {
        if let (Some(c), Some(s)) = (self.colors.get_mut(index), self.statuses.get_mut(index)) {
            c.set(color as i32);
            s.set(status as i32);
        }
    }

    fn reset(&mut self) {
        self.colors.iter_mut().for_each(IntSubject::reset);
        self.statuses.iter_mut().for_each(IntSubject::reset);
    }
}

// ─── Store ──────────────────────────────────────────────────────────

const TEXT_CELLS: usize = 11;

macro_rules! scalar_ints {
    ($s:ident, $($r:tt)+) => {
        [
            $($r)+ $s.backend_count,
            $($r)+ $s.active_backend,
            $($r)+ $s.ams_type,
            $($r)+ $s.action,
            $($r)+ $s.current_slot,
            $($r)+ $s.pending_target_slot,
            $($r)+ $s.current_tool,
            $($r)+ $s.filament_loaded,
            $($r)+ $s.bypass_active,
            $($r)+ $s.external_spool_color,
            $($r)+ $s.supports_bypass,
            $($r)+ $s.slot_count,
            $($r)+ $s.slots_version,
            $($r)+ $s.path_topology,
            $($r)+ $s.path_active_slot,
            $($r)+ $s.path_filament_segment,
            $($r)+ $s.path_error_segment,
            $($r)+ $s.path_anim_progress,
            $($r)+ $s.dryer_supported,
            $($r)+ $s.dryer_active,
            $($r)+ $s.dryer_current_temp,
            $($r)+ $s.dryer_target_temp,
            $($r)+ $s.dryer_remaining_min,
            $($r)+ $s.dryer_progress_pct,
            $($r)+ $s.current_has_weight,
            $($r)+ $s.current_color,
        ]
    };
}

macro_rules! text_cells {
    ($s:ident, $($r:tt)+) => {
        [
            $($r)+ $s.action_detail,
            $($r)+ $s.system_name,
            $($r)+ $s.current_tool_text,
            $($r)+ $s.dryer_current_temp_text,
            $($r)+ $s.dryer_target_temp_text,
            $($r)+ $s.dryer_time_text,
            $($r)+ $s.dryer_modal_temp_text,
            $($r)+ $s.dryer_modal_duration_text,
            $($r)+ $s.current_material_text,
            $($r)+ $s.current_slot_text,
            $($r)+ $s.current_weight_text,
        ]
    };
}

/// Every cell `AmsState` publishes.
pub struct AmsSubjects {
    // Backend selector
    pub backend_count: IntSubject,
    pub active_backend: IntSubject,

    // System
    pub ams_type: IntSubject,
    pub action: IntSubject,
    pub current_slot: IntSubject,
    pub pending_target_slot: IntSubject,
    pub current_tool: IntSubject,
    pub filament_loaded: IntSubject,
    pub bypass_active: IntSubject,
    pub external_spool_color: IntSubject,
    pub supports_bypass: IntSubject,
    pub slot_count: IntSubject,
    pub slots_version: IntSubject,
    pub action_detail: StringSubject<LONG_TEXT>,
    pub system_name: StringSubject<LONG_TEXT>,
    pub current_tool_text: StringSubject<SHORT_TEXT>,

    // Filament path
    pub path_topology: IntSubject,
    pub path_active_slot: IntSubject,
    pub path_filament_segment: IntSubject,
    pub path_error_segment: IntSubject,
    /// Driven by the UI animation, never by a sync.
    pub path_anim_progress: IntSubject,

    // Dryer
    pub dryer_supported: IntSubject,
    pub dryer_active: IntSubject,
    pub dryer_current_temp: IntSubject,
    pub dryer_target_temp: IntSubject,
    pub dryer_remaining_min: IntSubject,
    pub dryer_progress_pct: IntSubject,
    pub dryer_current_temp_text: StringSubject<SHORT_TEXT>,
    pub dryer_target_temp_text: StringSubject<SHORT_TEXT>,
    pub dryer_time_text: StringSubject<TIME_TEXT>,
    pub dryer_modal_temp_text: StringSubject<SHORT_TEXT>,
    pub dryer_modal_duration_text: StringSubject<TIME_TEXT>,

    // Currently loaded
    pub current_material_text: StringSubject<LONG_TEXT>,
    pub current_slot_text: StringSubject<LONG_TEXT>,
    pub current_weight_text: StringSubject<SHORT_TEXT>,
    pub current_has_weight: IntSubject,
    pub current_color: IntSubject,

    // Slots
    pub slots: SlotSubjects,
    /// Slot cells of backends 1.. (index 0 here is backend 1).
    pub secondary: Vec<SlotSubjects>,
}

impl AmsSubjects {
    pub fn new() -> Self {
        Self {
            backend_count: IntSubject::new("backend_count", 0),
            active_backend: IntSubject::new("active_backend", 0),

            ams_type: IntSubject::new("ams_type", AmsType::None as i32),
            action: IntSubject::new("ams_action", AmsAction::Idle as i32),
            current_slot: IntSubject::new("ams_current_slot", -1),
            pending_target_slot: IntSubject::new("ams_pending_target_slot", -1),
            current_tool: IntSubject::new("ams_current_tool", -1),
            filament_loaded: IntSubject::new("ams_filament_loaded", 0),
            bypass_active: IntSubject::new("ams_bypass_active", 0),
            external_spool_color: IntSubject::new("ams_external_spool_color", 0),
            supports_bypass: IntSubject::new("ams_supports_bypass", 0),
            slot_count: IntSubject::new("ams_slot_count", 0),
            slots_version: IntSubject::new("ams_slots_version", 0),
            action_detail: StringSubject::new("ams_action_detail", ""),
            system_name: StringSubject::new("ams_system_name", ""),
            current_tool_text: StringSubject::new("ams_current_tool_text", "---"),

            path_topology: IntSubject::new("path_topology", PathTopology::Hub as i32),
            path_active_slot: IntSubject::new("path_active_slot", -1),
            path_filament_segment: IntSubject::new("path_filament_segment", PathSegment::None as i32),
            path_error_segment: IntSubject::new("path_error_segment", PathSegment::None as i32),
            path_anim_progress: IntSubject::new("path_anim_progress", 0),

            dryer_supported: IntSubject::new("dryer_supported", 0),
            dryer_active: IntSubject::new("dryer_active", 0),
            dryer_current_temp: IntSubject::new("dryer_current_temp", 0),
            dryer_target_temp: IntSubject::new("dryer_target_temp", 0),
            dryer_remaining_min: IntSubject::new("dryer_remaining_min", 0),
            dryer_progress_pct: IntSubject::new("dryer_progress_pct", -1),
            dryer_current_temp_text: StringSubject::new("dryer_current_temp_text", "---"),
            dryer_target_temp_text: StringSubject::new("dryer_target_temp_text", "---"),
            dryer_time_text: StringSubject::new("dryer_time_text", ""),
            dryer_modal_temp_text: StringSubject::new("dryer_modal_temp_text", "55°C"),
            dryer_modal_duration_text: StringSubject::new("dryer_modal_duration_text", "4h"),

            current_material_text: StringSubject::new("ams_current_material_text", "---"),
            current_slot_text: StringSubject::new("ams_current_slot_text", "None"),
            current_weight_text: StringSubject::new("ams_current_weight_text", ""),
            current_has_weight: IntSubject::new("ams_current_has_weight", 0),
            current_color: IntSubject::new("ams_current_color", EMPTY_CURRENT_COLOR),

            slots: SlotSubjects::primary(MAX_SLOTS),
            secondary: Vec::new(),
        }
    }

    /// Increment the slots version so observers can detect any slot change.
    pub fn bump_slots_version(&mut self) {
        let next = self.slots_version.get().wrapping_add(1);
        self.slots_version.set(next);
    }

    /// Look up an integer cell by name.
    pub fn int(&self, name: &str) -> Option<&IntSubject> {
        let scalars = scalar_ints!(self, &);
        scalars
            .into_iter()
            .chain(self.slots.colors.iter())
            .chain(self.slots.statuses.iter())
            .chain(
                self.secondary
                    .iter()
                    .flat_map(|s| s.colors.iter().chain(s.statuses.iter())),
            )
            .find(|cell| cell.name() == name)
    }

    pub fn int_mut(&mut self, name: &str) -> Option<&mut IntSubject> {
        let scalars = scalar_ints!(self, &mut);
        scalars
            .into_iter()
            .chain(self.slots.colors.iter_mut())
            .chain(self.slots.statuses.iter_mut())
            .chain(
                self.secondary
                    .iter_mut()
                    .flat_map(|s| s.colors.iter_mut().chain(s.statuses.iter_mut())),
            )
            .find(|cell| cell.name() == name)
    }

    pub fn int_value(&self, name: &str) -> Option<i32> {
        self.int(name).map(IntSubject::get)
    }

    /// Current text of a string cell, by name.
    pub fn string_value(&self, name: &str) -> Option<&str> {
        let cells: [&dyn TextSubject; TEXT_CELLS] = text_cells!(self, &);
        cells.into_iter().find(|c| c.name() == name).map(|c| c.text())
    }

    /// Attach an observer to an integer cell. False if no such cell.
    pub fn observe_int(&mut self, name: &str, observer: impl Fn(i32) + Send + 'static) -> bool {
        match self.int_mut(name) {
            Some(cell) => {
                cell.observe(observer);
                true
            }
            None => false,
        }
    }

    /// Attach an observer to a string cell. False if no such cell.
    pub fn observe_string(
        &mut self,
        name: &str,
        observer: impl Fn(&str) + Send + 'static,
    ) -> bool {
        let cells: [&mut dyn TextSubject; TEXT_CELLS] = text_cells!(self, &mut);
        match cells.into_iter().find(|c| c.name() == name) {
            Some(cell) => {
                cell.observe_text(Box::new(observer));
                true
            }
            None => false,
        }
    }

    /// Every cell back to its initial value; observers and secondary
    /// backend cells dropped.
    pub fn reset(&mut self) {
        for cell in scalar_ints!(self, &mut) {
            cell.reset();
        }
        let texts: [&mut dyn TextSubject; TEXT_CELLS] = text_cells!(self, &mut);
        for cell in texts {
            cell.reset_text();
        }
        self.slots.reset();
        self.secondary.clear();
    }
}

impl Default for AmsSubjects {
    fn default() -> Self {
        Self::new()
    }
}
