//! Durable per-slot store shared by every backend.
//!
//! The registry owns the authoritative slot data of one backend: filament
//! info, sensor state, endless-spool backups and the tool mapping. Slots are
//! addressed by a contiguous global index across units and by the backend's
//! own lane name. Snapshots handed to the UI are built from it with
//! [`SlotRegistry::build_system_info`].
//!
//! # Tool Mapping
//!
//! The mapping is strictly 1:1. A tool lives on at most one slot and a slot
//! holds at most one tool; assigning a tool to a new slot clears it from
//! the old one.

use crate::ams::types::{AmsSystemInfo, AmsUnit, SlotInfo, SlotStatus};
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, trace};

// ─── Entries ────────────────────────────────────────────────────────

/// Sensor state of one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SlotSensors {
    /// Slot has a prep (entry) sensor.
    pub has_prep_sensor: bool,
    /// Prep sensor sees filament.
    pub prep_triggered: bool,
    /// Slot has a load (hub side) sensor.
    pub has_load_sensor: bool,
    /// Load sensor sees filament.
    pub load_triggered: bool,
}

/// One slot in the registry.
#[derive(Debug, Clone, PartialEq)]
pub struct SlotEntry {
    /// Index across all units.
    pub global_index: i32,
    /// Unit this slot belongs to.
    pub unit_index: i32,
    /// Name used by the firmware, e.g. "lane4".
    pub backend_name: String,
    /// Filament and status data.
    pub info: SlotInfo,
    /// Sensor state.
    pub sensors: SlotSensors,
    /// Endless-spool backup slot (-1 = none).
    pub endless_spool_backup: i32,
}

impl SlotEntry {
    fn fresh(global_index: i32, unit_index: i32, local_index: i32, name: &str) -> Self {
        let info = SlotInfo {
            slot_index: local_index,
            global_index,
            mapped_tool: -1,
            status: SlotStatus::Unknown,
            ..SlotInfo::default()
        };
        Self {
            global_index,
            unit_index,
            backend_name: name.to_string(),
            info,
            sensors: SlotSensors::default(),
            endless_spool_backup: -1,
        }
    }
}

/// Unit layout in the registry.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RegistryUnit {
    /// Display name.
    pub name: String,
    /// Global index of the first slot.
    pub first_slot: i32,
    /// Number of slots.
    pub slot_count: i32,
}

// ─── Registry ───────────────────────────────────────────────────────

/// Slot store with name lookup, unit layout and tool mapping.
#[derive(Debug, Clone, Default)]
pub struct SlotRegistry {
    entries: Vec<SlotEntry>,
    units: Vec<RegistryUnit>,
    name_to_index: HashMap<String, usize>,
}

impl SlotRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Single-unit layout.
    pub fn initialize<S: AsRef<str>>(&mut self, unit_name: &str, slot_names: &[S]) {
        let names: Vec<String> = slot_names.iter().map(|s| s.as_ref().to_string()).collect();
        self.initialize_units(&[(unit_name.to_string(), names)]);
    }

    /// Multi-unit layout. Global indices run contiguously in unit order.
    pub fn initialize_units(&mut self, units: &[(String, Vec<String>)]) {
        self.clear();
        for (unit_index, (unit_name, names)) in units.iter().enumerate() {
            let first = self.entries.len() as i32;
            for (local, name) in names.iter().enumerate() {
                let global = self.entries.len() as i32;
                self.name_to_index.insert(name.clone(), self.entries.len());
                self.entries
                    .push(SlotEntry::fresh(global, unit_index as i32, local as i32, name));
            }
            self.units.push(RegistryUnit {
                name: unit_name.clone(),
                first_slot: first,
                slot_count: names.len() as i32,
            });
        }
        debug!(
            "Slot registry initialized: {} units, {} slots",
            self.units.len(),
            self.entries.len()
        );
    }

    /// True once a layout has been set.
    pub fn is_initialized(&self) -> bool {
        !self.units.is_empty()
    }

    /// Remove every unit and slot.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.units.clear();
        self.name_to_index.clear();
    }

    // ─── Lookup ─────────────────────────────────────────────────────

    pub fn slot_count(&self) -> usize {
        self.entries.len()
    }

    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    pub fn is_valid_index(&self, global: i32) -> bool {
        global >= 0 && (global as usize) < self.entries.len()
    }

    /// Entry by global index.
    pub fn get(&self, global: i32) -> Option<&SlotEntry> {
        usize::try_from(global).ok().and_then(|i| self.entries.get(i))
    }

    /// Mutable entry by global index.
    pub fn get_mut(&mut self, global: i32) -> Option<&mut SlotEntry> {
        usize::try_from(global)
            .ok()
            .and_then(|i| self.entries.get_mut(i))
    }

    /// All entries in global order.
    pub fn entries(&self) -> &[SlotEntry] {
        &self.entries
    }

    /// Global index for a backend name, or -1.
    pub fn index_of(&self, name: &str) -> i32 {
        self.name_to_index
            .get(name)
            .map_or(-1, |&i| i as i32)
    }

    /// Backend name for a global index, or "" when invalid.
    pub fn name_of(&self, global: i32) -> &str {
        self.get(global).map_or("", |e| e.backend_name.as_str())
    }

    pub fn find_by_name(&self, name: &str) -> Option<&SlotEntry> {
        self.name_to_index.get(name).and_then(|&i| self.entries.get(i))
    }

    pub fn find_by_name_mut(&mut self, name: &str) -> Option<&mut SlotEntry> {
        self.name_to_index
            .get(name)
            .copied()
            .and_then(move |i| self.entries.get_mut(i))
    }

    // ─── Units ──────────────────────────────────────────────────────

    pub fn unit(&self, unit_index: usize) -> Option<&RegistryUnit> {
        self.units.get(unit_index)
    }

    pub fn units(&self) -> &[RegistryUnit] {
        &self.units
    }

    /// `(first, end)` global range of a unit, `(0, 0)` when invalid.
    pub fn unit_slot_range(&self, unit_index: usize) -> (i32, i32) {
        self.units
            .get(unit_index)
            .map_or((0, 0), |u| (u.first_slot, u.first_slot + u.slot_count))
    }

    /// Unit owning a global slot, or -1.
    pub fn unit_for_slot(&self, global: i32) -> i32 {
        self.get(global).map_or(-1, |e| e.unit_index)
    }

    /// Rebuild the layout from `unit name → slot names`.
    ///
    /// Units come out sorted by name. Slot data (info, sensors, backup and
    /// tool) follows its backend name; new names start fresh, missing names
    /// are dropped.
    pub fn reorganize(&mut self, unit_map: &BTreeMap<String, Vec<String>>) {
        let mut old: HashMap<String, SlotEntry> = self
            .entries
            .drain(..)
            .map(|e| (e.backend_name.clone(), e))
            .collect();

        let layout: Vec<(String, Vec<String>)> = unit_map
            .iter()
            .map(|(unit, names)| (unit.clone(), names.clone()))
            .collect();
        self.initialize_units(&layout);

        for entry in &mut self.entries {
            if let Some(prev) = old.remove(&entry.backend_name) {
                entry.info = SlotInfo {
                    slot_index: entry.info.slot_index,
                    global_index: entry.global_index,
                    ..prev.info
                };
                entry.sensors = prev.sensors;
                entry.endless_spool_backup = prev.endless_spool_backup;
            }
        }
        if !old.is_empty() {
            debug!("Slot registry dropped {} slots on reorganize", old.len());
        }
    }

    /// True when `unit_map` describes the current layout exactly.
    pub fn matches_layout(&self, unit_map: &BTreeMap<String, Vec<String>>) -> bool {
        if unit_map.len() != self.units.len() {
            return false;
        }
        unit_map.iter().zip(&self.units).all(|((name, slots), unit)| {
            if *name != unit.name || slots.len() as i32 != unit.slot_count {
                return false;
            }
            slots
                .iter()
                .enumerate()
                .all(|(i, s)| self.name_of(unit.first_slot + i as i32) == s)
        })
    }

    // ─── Tool Mapping ───────────────────────────────────────────────

    /// Put `tool` on `slot`, clearing it from any other slot. Tool -1 clears
    /// the slot's mapping.
    pub fn set_tool_mapping(&mut self, slot: i32, tool: i32) {
        if !self.is_valid_index(slot) {
            return;
        }
        if tool >= 0 {
            for entry in &mut self.entries {
                if entry.info.mapped_tool == tool && entry.global_index != slot {
                    entry.info.mapped_tool = -1;
                }
            }
        }
        if let Some(entry) = self.get_mut(slot) {
            trace!("Slot {} mapped to tool {}", slot, tool);
            entry.info.mapped_tool = tool.max(-1);
        }
    }

    /// Replace the whole mapping; `tool_to_slot[t]` is the slot for tool `t`.
    pub fn set_tool_map(&mut self, tool_to_slot: &[i32]) {
        for entry in &mut self.entries {
            entry.info.mapped_tool = -1;
        }
        for (tool, &slot) in tool_to_slot.iter().enumerate() {
            self.set_tool_mapping(slot, tool as i32);
        }
    }

    /// Tool on `slot`, or -1.
    pub fn tool_for_slot(&self, slot: i32) -> i32 {
        self.get(slot).map_or(-1, |e| e.info.mapped_tool)
    }

    /// Slot holding `tool`, or -1.
    pub fn slot_for_tool(&self, tool: i32) -> i32 {
        if tool < 0 {
            return -1;
        }
        self.entries
            .iter()
            .find(|e| e.info.mapped_tool == tool)
            .map_or(-1, |e| e.global_index)
    }

    /// Tool-to-slot vector sized to the highest mapped tool.
    pub fn tool_map(&self) -> Vec<i32> {
        let len = self
            .entries
            .iter()
            .map(|e| e.info.mapped_tool + 1)
            .max()
            .unwrap_or(0)
            .max(0) as usize;
        let mut map = vec![-1; len];
        for entry in &self.entries {
            if let Ok(tool) = usize::try_from(entry.info.mapped_tool) {
                map[tool] = entry.global_index;
            }
        }
        map
    }

    // ─── Endless Spool ──────────────────────────────────────────────

    /// Backup slot for `slot`, or -1.
    pub fn backup_for_slot(&self, slot: i32) -> i32 {
        self.get(slot).map_or(-1, |e| e.endless_spool_backup)
    }

    pub fn set_backup(&mut self, slot: i32, backup: i32) {
        if let Some(entry) = self.get_mut(slot) {
            entry.endless_spool_backup = backup.max(-1);
        }
    }

    // ─── Snapshot ───────────────────────────────────────────────────

    /// Write the registry's slots and tool map into `info`.
    ///
    /// Unit metadata (name, connection, sensors, topology) already in `info`
    /// is kept when the unit count matches; otherwise units are rebuilt with
    /// defaults and named after the registry units.
    pub fn build_system_info(&self, info: &mut AmsSystemInfo) {
        if info.units.len() != self.units.len() {
            info.units = (0..self.units.len())
                .map(|i| AmsUnit {
                    unit_index: i as i32,
                    connected: true,
                    ..AmsUnit::default()
                })
                .collect();
        }

        for (i, (unit, reg_unit)) in info.units.iter_mut().zip(&self.units).enumerate() {
            unit.unit_index = i as i32;
            if unit.name.is_empty() {
                unit.name = reg_unit.name.clone();
            }
            unit.slot_count = reg_unit.slot_count;
            unit.first_slot_global_index = reg_unit.first_slot;
            unit.slots = self
                .entries
                .iter()
                .filter(|e| e.unit_index == i as i32)
                .map(|e| e.info.clone())
                .collect();
        }

        info.total_slots = self.entries.len() as i32;
        info.tool_to_slot_map = self.tool_map();
    }
}
