//! Backend → subject synchronization.

use super::AmsState;
use super::subjects::{EMPTY_CURRENT_COLOR, MAX_SLOTS};
use helix_common::ams::{BYPASS_SLOT, DEFAULT_SLOT_COLOR, SlotInfo, SlotStatus};
use helix_common::color::color_name_from_hex;
use helix_common::format;
use tracing::{debug, info, trace, warn};

/// Swatch shown while the bypass feeds the toolhead.
const BYPASS_COLOR: i32 = 0x888888;

impl AmsState {
    /// Full resync of the system-level and per-slot cells from the
    /// primary backend.
    pub fn sync_from_backend(&mut self) {
        let Some(backend) = self.backends.first() else {
            return;
        };
        let info = backend.get_system_info();
        let topology = backend.get_topology();
        let segment = backend.get_filament_segment();
        let error_segment = backend.infer_error_segment();

        let s = &mut self.subjects;
        s.ams_type.set(info.ams_type as i32);
        s.action.set(info.action as i32);
        if info.type_name.is_empty() {
            s.system_name.set(info.ams_type.as_str());
        } else {
            s.system_name.set(&info.type_name);
        }
        s.current_slot.set(info.current_slot);
        s.pending_target_slot.set(info.pending_target_slot);
        s.current_tool.set(info.current_tool);
        s.current_tool_text.set(&format::tool_label(info.current_tool));
        s.filament_loaded.set_bool(info.filament_loaded);
        s.bypass_active.set_bool(info.current_slot == BYPASS_SLOT);
        s.supports_bypass.set_bool(info.supports_bypass);
        s.external_spool_color
            .set(self.external_spool.as_ref().map_or(0, |e| e.color_rgb as i32));
        s.slot_count.set(info.total_slots);
        if info.operation_detail.is_empty() {
            s.action_detail.set(info.action.as_str());
        } else {
            s.action_detail.set(&info.operation_detail);
        }

        s.path_topology.set(topology as i32);
        s.path_active_slot.set(info.current_slot);
        s.path_filament_segment.set(segment as i32);
        s.path_error_segment.set(error_segment as i32);

        let published = (info.total_slots.max(0) as usize).min(MAX_SLOTS);
        for i in 0..published {
            if let Some(slot) = info.get_slot_global(i as i32) {
                s.slots.set(i, slot.color_rgb, slot.status);
            }
        }
        for i in published..MAX_SLOTS {
            s.slots.set(i, DEFAULT_SLOT_COLOR, SlotStatus::Unknown);
        }
        s.bump_slots_version();

        self.sync_dryer_from_backend();
        self.sync_current_loaded_from_backend();

        debug!(
            "Synced from backend - type={}, slots={}, action={}, segment={}",
            info.ams_type,
            info.total_slots,
            info.action.as_str(),
            segment.as_str()
        );

        // Later refreshes come from the polling timer.
        if std::mem::take(&mut self.weights_stale) {
            self.refresh_spoolman_weights();
        }
    }

    /// Refresh one primary-backend slot.
    pub fn update_slot(&mut self, slot_index: i32) {
        if slot_index < 0 || slot_index as usize >= MAX_SLOTS {
            return;
        }
        let Some(backend) = self.backends.first() else {
            return;
        };
        let slot = backend.get_slot_info(slot_index);
        if slot.slot_index < 0 {
            return;
        }
        self.subjects
            .slots
            .set(slot_index as usize, slot.color_rgb, slot.status);
        self.subjects.bump_slots_version();
        trace!(
            "Updated slot {} - color=0x{:06X}, status={}",
            slot_index,
            slot.color_rgb,
            slot.status.as_str()
        );
    }

    /// Full resync of one backend. Secondary backends only publish their
    /// slot cells.
    pub fn sync_backend(&mut self, backend_index: usize) {
        if backend_index == 0 {
            self.sync_from_backend();
            return;
        }
        let Some(backend) = self.backends.get(backend_index) else {
            return;
        };
        let Some(cells) = self.subjects.secondary.get_mut(backend_index - 1) else {
            return;
        };

        let info = backend.get_system_info();
        let count = (info.total_slots.max(0) as usize).min(cells.len());
        for i in 0..count {
            if let Some(slot) = info.get_slot_global(i as i32) {
                cells.set(i, slot.color_rgb, slot.status);
            }
        }
        debug!(
            "Synced secondary backend {} - slots={}",
            backend_index, info.total_slots
        );
    }

    /// Refresh one slot of any backend.
    pub fn update_slot_for_backend(&mut self, backend_index: usize, slot_index: i32) {
        if backend_index == 0 {
            self.update_slot(slot_index);
            return;
        }
        if slot_index < 0 {
            return;
        }
        let Some(backend) = self.backends.get(backend_index) else {
            return;
        };
        let Some(cells) = self.subjects.secondary.get_mut(backend_index - 1) else {
            return;
        };
        if slot_index as usize >= cells.len() {
            return;
        }

        let slot = backend.get_slot_info(slot_index);
        if slot.slot_index >= 0 {
            cells.set(slot_index as usize, slot.color_rgb, slot.status);
            trace!(
                "Updated backend {} slot {} - color=0x{:06X}, status={}",
                backend_index,
                slot_index,
                slot.color_rgb,
                slot.status.as_str()
            );
        }
    }

    /// Refresh the "currently loaded" cells and push the loaded spool to
    /// Spoolman when it changed.
    pub fn sync_current_loaded_from_backend(&mut self) {
        let Some(backend) = self.backends.first() else {
            self.show_nothing_loaded();
            return;
        };

        let slot_index = self.subjects.current_slot.get();
        let loaded = self.subjects.filament_loaded.get() != 0;

        if slot_index == BYPASS_SLOT && backend.is_bypass_active() {
            let s = &mut self.subjects;
            s.current_material_text.set("External");
            s.current_slot_text.set("Current: Bypass");
            s.current_weight_text.set("");
            s.current_has_weight.set(0);
            s.current_color.set(BYPASS_COLOR);
        } else if slot_index >= 0 && loaded {
            let slot = backend.get_slot_info(slot_index);
            let sys = backend.get_system_info();

            let slot_text = if sys.ams_type.is_tool_changer() && sys.units.is_empty() {
                format!("Current: Tool {slot_index}")
            } else {
                let display_slot = slot_index + 1;
                match sys.get_unit_for_slot(slot_index) {
                    Some(unit) if sys.units.len() > 1 => {
                        format!("Current: {} · Slot {}", unit.name, display_slot)
                    }
                    _ => format!("Current: Slot {display_slot}"),
                }
            };

            self.link_active_spool(&slot, slot_index);

            let s = &mut self.subjects;
            s.current_color.set(slot.color_rgb as i32);
            s.current_material_text.set(&material_label(&slot));
            s.current_slot_text.set(&slot_text);
            if slot.total_weight_g > 0.0 && slot.remaining_weight_g >= 0.0 {
                s.current_weight_text
                    .set(&format!("{:.0}g", slot.remaining_weight_g));
                s.current_has_weight.set(1);
            } else {
                s.current_weight_text.set("");
                s.current_has_weight.set(0);
            }
        } else {
            self.show_nothing_loaded();
        }

        trace!(
            "Synced current loaded - slot={}, has_weight={}",
            slot_index,
            self.subjects.current_has_weight.get()
        );
    }

    fn show_nothing_loaded(&mut self) {
        let s = &mut self.subjects;
        s.current_material_text.set("---");
        s.current_slot_text.set("Currently Loaded");
        s.current_weight_text.set("");
        s.current_has_weight.set(0);
        s.current_color.set(EMPTY_CURRENT_COLOR);
    }

    /// Tell Spoolman which spool is printing, once per distinct spool.
    fn link_active_spool(&mut self, slot: &SlotInfo, slot_index: i32) {
        let Some(api) = &self.api else {
            return;
        };
        if slot.spoolman_id <= 0 || slot.spoolman_id == self.last_synced_spoolman_id {
            return;
        }
        self.last_synced_spoolman_id = slot.spoolman_id;
        info!(
            "Setting active Spoolman spool to {} (slot {})",
            slot.spoolman_id, slot_index
        );
        if let Err(e) = api.set_active_spool(slot.spoolman_id) {
            warn!("Failed to set active spool {}: {}", slot.spoolman_id, e);
        }
    }
}

/// "Red PLA", falling back to the color name, the material, then
/// "Filament". Spoolman color names win over the nearest palette name.
fn material_label(slot: &SlotInfo) -> String {
    let color = if slot.spoolman_id > 0 && !slot.color_name.is_empty() {
        slot.color_name.as_str()
    } else {
        color_name_from_hex(slot.color_rgb)
    };
    match (color.is_empty(), slot.material.is_empty()) {
        (false, false) => format!("{} {}", color, slot.material),
        (false, true) => color.to_string(),
        (true, false) => slot.material.clone(),
        (true, true) => "Filament".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_material_label_prefers_spoolman_name() {
        let slot = SlotInfo {
            spoolman_id: 4,
            color_name: "Galaxy Black".into(),
            color_rgb: 0x000000,
            material: "PETG".into(),
            ..Default::default()
        };
        assert_eq!(material_label(&slot), "Galaxy Black PETG");
    }

    #[test]
    fn test_material_label_falls_back_to_palette() {
        let slot = SlotInfo {
            color_name: "Ignored".into(),
            color_rgb: 0xFF0000,
            material: "PLA".into(),
            ..Default::default()
        };
        assert_eq!(material_label(&slot), "Red PLA");

        let bare = SlotInfo {
            color_rgb: 0xFFFFFF,
            ..Default::default()
        };
        assert_eq!(material_label(&bare), "White");
    }
}
