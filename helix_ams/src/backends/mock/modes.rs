//! Alternate hardware layouts for the mock.
//!
//! Each mode rebuilds the slot registry and unit metadata in place so one
//! mock instance can stand in for any supported system. Turning a mode off
//! restores the Happy Hare identity but keeps the current slot data.

use super::backend::{AmsBackendMock, MockState};
use helix_common::ams::{
    AmsAction, AmsEvent, AmsType, AmsUnit, BufferHealth, PathSegment, PathTopology, SlotStatus,
    TipMethod,
};
use helix_common::defaults::{
    afc_default_actions, afc_default_capabilities, afc_default_sections, find_action_mut,
    hh_default_actions, hh_default_sections,
};
use helix_common::filament;
use tracing::info;

const AFC_MOCK_VERSION: &str = "1.0.32-mock";
const SAVE_RESTART_REASON: &str = "Not available in mock mode";

/// Filament data for one seeded slot.
struct SlotSeed {
    material: &'static str,
    brand: &'static str,
    color: u32,
    color_name: &'static str,
    status: SlotStatus,
    spoolman_id: i32,
    spool_name: &'static str,
    remaining_g: f32,
}

const fn seed(
    material: &'static str,
    brand: &'static str,
    color: u32,
    color_name: &'static str,
    status: SlotStatus,
    spoolman_id: i32,
    remaining_g: f32,
) -> SlotSeed {
    SlotSeed {
        material,
        brand,
        color,
        color_name,
        status,
        spoolman_id,
        spool_name: "",
        remaining_g,
    }
}

const fn named(mut slot: SlotSeed, spool_name: &'static str) -> SlotSeed {
    slot.spool_name = spool_name;
    slot
}

const AFC_SLOTS: [SlotSeed; 4] = [
    named(seed("ASA", "Bambu Lab", 0x000000, "Black", SlotStatus::Loaded, 1, 750.0), "Black ASA"),
    named(seed("PLA", "Polymaker", 0xFF0000, "Red", SlotStatus::Available, 2, 900.0), "Red PLA"),
    named(seed("PETG", "eSUN", 0x00FF00, "Green", SlotStatus::Available, 3, 500.0), "Green PETG"),
    seed("TPU", "eSUN", 0xFF6600, "Orange", SlotStatus::Available, 0, 200.0),
];

const MULTI_UNIT_SLOTS: [SlotSeed; 6] = [
    // Box Turtle 1
    seed("ASA", "Bambu Lab", 0x000000, "Black", SlotStatus::Loaded, 100, 1000.0),
    seed("PLA", "Polymaker", 0xFF0000, "Red", SlotStatus::Available, 101, 750.0),
    seed("PETG", "eSUN", 0x00FF00, "Green", SlotStatus::Available, 102, 500.0),
    seed("PLA", "Overture", 0xFFFFFF, "White", SlotStatus::Empty, 103, 0.0),
    // Night Owl
    seed("PETG", "Prusa", 0x1E88E5, "Blue", SlotStatus::Available, 200, 1000.0),
    seed("ABS", "Bambu Lab", 0xFDD835, "Yellow", SlotStatus::Available, 201, 800.0),
];

const MIXED_SLOTS: [SlotSeed; 12] = [
    // Turtle_1
    seed("ASA", "", 0x000000, "Black", SlotStatus::Loaded, 300, 1000.0),
    seed("PLA", "", 0xFF0000, "Red", SlotStatus::Available, 301, 800.0),
    seed("PETG", "", 0x00FF00, "Green", SlotStatus::Available, 302, 600.0),
    seed("PLA", "", 0xFFFFFF, "White", SlotStatus::Available, 303, 400.0),
    // AMS_1
    seed("PETG", "", 0x1E88E5, "Blue", SlotStatus::Available, 310, 1000.0),
    seed("PLA", "", 0xFDD835, "Yellow", SlotStatus::Available, 311, 850.0),
    seed("ABS", "", 0x8E24AA, "Purple", SlotStatus::Available, 312, 700.0),
    seed("TPU", "", 0xFF6F00, "Orange", SlotStatus::Available, 313, 550.0),
    // AMS_2
    seed("PLA", "", 0xE53935, "Red", SlotStatus::Available, 320, 1000.0),
    seed("ASA", "", 0x43A047, "Green", SlotStatus::Available, 321, 900.0),
    seed("PETG", "", 0x90CAF9, "Sky Blue", SlotStatus::Available, 322, 800.0),
    seed("PLA-CF", "", 0x424242, "Carbon", SlotStatus::Available, 323, 700.0),
];

fn lane_names(count: usize) -> Vec<String> {
    (0..count).map(|i| i.to_string()).collect()
}

fn afc_unit(index: i32, name: &str, slot_count: i32, first_slot: i32) -> AmsUnit {
    AmsUnit {
        unit_index: index,
        name: name.to_string(),
        slot_count,
        first_slot_global_index: first_slot,
        connected: true,
        firmware_version: AFC_MOCK_VERSION.to_string(),
        has_encoder: false,
        has_toolhead_sensor: true,
        has_slot_sensors: true,
        ..AmsUnit::default()
    }
}

impl MockState {
    fn seed_slots(&mut self, seeds: &[SlotSeed]) {
        for (global, data) in seeds.iter().enumerate() {
            let Some(entry) = self.slots.get_mut(global as i32) else {
                continue;
            };
            let material = filament::find_material(data.material);
            let slot = &mut entry.info;
            slot.material = data.material.to_string();
            slot.brand = data.brand.to_string();
            slot.color_rgb = data.color;
            slot.color_name = data.color_name.to_string();
            slot.status = data.status;
            slot.spoolman_id = data.spoolman_id;
            slot.spool_name = data.spool_name.to_string();
            slot.total_weight_g = 1000.0;
            slot.remaining_weight_g = data.remaining_g;
            if let Some(material) = material {
                slot.nozzle_temp_min = material.nozzle_min;
                slot.nozzle_temp_max = material.nozzle_max;
                slot.bed_temp = material.bed_temp;
            }
        }
    }

    /// Slot 0 loaded to the nozzle, system idle.
    fn park_on_first_slot(&mut self) {
        self.info.current_slot = 0;
        self.info.current_tool = 0;
        self.info.filament_loaded = true;
        self.info.action = AmsAction::Idle;
        self.segment = PathSegment::Nozzle;
    }

    fn apply_afc_identity(&mut self, type_name: &str) {
        self.tool_changer_mode = false;
        self.info.ams_type = AmsType::Afc;
        self.info.type_name = type_name.to_string();
        self.info.version = AFC_MOCK_VERSION.to_string();
        afc_default_capabilities().apply_to(&mut self.info);
        self.info.has_hardware_bypass_sensor = false;
        self.topology = PathTopology::Hub;
    }

    fn apply_afc_catalog(&mut self) {
        self.device_sections = afc_default_sections();
        self.device_actions = afc_default_actions();
        if let Some(action) = find_action_mut(&mut self.device_actions, "save_restart") {
            action.enabled = false;
            action.disable_reason = SAVE_RESTART_REASON.to_string();
        }
    }

    fn restore_happy_hare(&mut self, with_catalog: bool) {
        self.info.ams_type = AmsType::HappyHare;
        self.info.type_name = "Happy Hare (Mock)".to_string();
        self.info.version = "2.7.0-mock".to_string();
        self.info.supports_bypass = true;
        self.topology = PathTopology::Hub;
        if let Some(unit) = self.info.units.first_mut() {
            unit.name = "Mock MMU".to_string();
        }
        if with_catalog {
            self.device_sections = hh_default_sections();
            self.device_actions = hh_default_actions();
        }
    }

    pub(super) fn apply_tool_changer_mode(&mut self, enabled: bool) {
        self.tool_changer_mode = enabled;
        if !enabled {
            self.restore_happy_hare(true);
            info!("Mock tool changer mode disabled, reverting to filament system");
            return;
        }

        self.info.ams_type = AmsType::ToolChanger;
        self.info.type_name = "Tool Changer (Mock)".to_string();
        self.info.supports_bypass = false;
        self.topology = PathTopology::Parallel;
        if let Some(unit) = self.info.units.first_mut() {
            unit.name = "Mock Tool Changer".to_string();
        }
        self.device_sections.clear();
        self.device_actions.clear();
        info!("Mock tool changer mode enabled ({} tools)", self.slots.slot_count());
    }

    pub(super) fn apply_afc_mode(&mut self, enabled: bool) {
        self.afc_mode = enabled;
        if !enabled {
            self.restore_happy_hare(true);
            info!("Mock AFC mode disabled, reverting to Happy Hare");
            return;
        }

        self.apply_afc_identity("AFC (Mock)");
        self.slots.clear();
        self.slots.initialize("Box Turtle (Mock)", &lane_names(AFC_SLOTS.len()));
        self.seed_slots(&AFC_SLOTS);
        self.slots.set_tool_map(&[0, 1, 2, 3]);

        self.info.units = vec![afc_unit(0, "Box Turtle (Mock)", 4, 0)];
        self.unit_topologies.clear();
        self.park_on_first_slot();
        self.apply_afc_catalog();
        info!("Mock AFC mode enabled (4-lane Box Turtle)");
    }

    pub(super) fn apply_multi_unit_mode(&mut self, enabled: bool) {
        self.multi_unit_mode = enabled;
        if !enabled {
            self.restore_happy_hare(false);
            info!("Mock multi-unit mode disabled");
            return;
        }

        self.apply_afc_identity("AFC (Mock Multi-Unit)");
        // Every feature on, whatever the AFC defaults say.
        self.info.supports_endless_spool = true;
        self.info.supports_tool_mapping = true;
        self.info.supports_bypass = true;
        self.info.supports_purge = true;
        self.info.tip_method = TipMethod::Cut;

        self.slots.clear();
        self.slots.initialize_units(&[
            ("Box Turtle 1".to_string(), lane_names(4)),
            ("Night Owl".to_string(), lane_names(2)),
        ]);
        self.seed_slots(&MULTI_UNIT_SLOTS);
        // Single toolhead: T0 sits on the loaded slot.
        self.slots.set_tool_map(&[0]);

        let mut turtle = afc_unit(0, "Box Turtle 1", 4, 0);
        turtle.has_hub_sensor = true;
        turtle.hub_sensor_triggered = true;
        let mut owl = afc_unit(1, "Night Owl", 2, 4);
        owl.firmware_version = "2.1.0-mock".to_string();
        owl.has_encoder = true;
        owl.has_hub_sensor = true;
        self.info.units = vec![turtle, owl];
        self.unit_topologies.clear();

        self.park_on_first_slot();
        info!("Mock multi-unit mode: Box Turtle (4) + Night Owl (2) = 6 slots");
    }

    pub(super) fn apply_mixed_topology_mode(&mut self, enabled: bool) {
        self.mixed_topology_mode = enabled;
        if !enabled {
            self.unit_topologies.clear();
            self.restore_happy_hare(true);
            info!("Mock mixed topology mode disabled");
            return;
        }

        self.multi_unit_mode = false;
        self.apply_afc_identity("AFC (Mock Mixed)");
        self.unit_topologies = vec![PathTopology::Parallel, PathTopology::Hub, PathTopology::Hub];

        self.slots.clear();
        self.slots.initialize_units(&[
            ("Turtle_1".to_string(), lane_names(4)),
            ("AMS_1".to_string(), lane_names(4)),
            ("AMS_2".to_string(), lane_names(4)),
        ]);
        self.seed_slots(&MIXED_SLOTS);
        let identity: Vec<i32> = (0..MIXED_SLOTS.len() as i32).collect();
        self.slots.set_tool_map(&identity);

        let mut turtle = afc_unit(0, "Turtle_1", 4, 0);
        turtle.topology = PathTopology::Parallel;
        turtle.buffer_health = Some(BufferHealth {
            fault_detection_enabled: true,
            distance_to_fault: 50.0,
            state: "Trailing".to_string(),
        });
        let openams = |index: i32, name: &str, hub_tool_label: i32| {
            let mut unit = afc_unit(index, name, 4, index * 4);
            unit.firmware_version = "1.0.0-mock".to_string();
            unit.has_hub_sensor = true;
            unit.topology = PathTopology::Hub;
            unit.hub_tool_label = hub_tool_label;
            unit
        };
        self.info.units = vec![turtle, openams(1, "AMS_1", 4), openams(2, "AMS_2", 5)];

        self.park_on_first_slot();
        self.apply_afc_catalog();
        info!("Mock mixed topology mode: Turtle_1 (4) + AMS_1 (4) + AMS_2 (4) = 12 slots");
    }
}

impl AmsBackendMock {
    /// Present as a tool changer: one tool per slot, parallel paths.
    pub fn set_tool_changer_mode(&self, enabled: bool) {
        self.core.state.lock().apply_tool_changer_mode(enabled);
        self.core.emit(AmsEvent::StateChanged);
    }

    pub fn is_tool_changer_mode(&self) -> bool {
        self.core.state.lock().tool_changer_mode
    }

    /// Present as a 4-lane AFC Box Turtle.
    pub fn set_afc_mode(&self, enabled: bool) {
        self.core.state.lock().apply_afc_mode(enabled);
        self.core.emit(AmsEvent::StateChanged);
    }

    pub fn is_afc_mode(&self) -> bool {
        self.core.state.lock().afc_mode
    }

    /// Two AFC units behind a single toolhead.
    pub fn set_multi_unit_mode(&self, enabled: bool) {
        self.core.state.lock().apply_multi_unit_mode(enabled);
        self.core.emit(AmsEvent::StateChanged);
    }

    pub fn is_multi_unit_mode(&self) -> bool {
        self.core.state.lock().multi_unit_mode
    }

    /// One parallel Box Turtle plus two hub-based OpenAMS units.
    pub fn set_mixed_topology_mode(&self, enabled: bool) {
        self.core.state.lock().apply_mixed_topology_mode(enabled);
        self.core.emit(AmsEvent::StateChanged);
    }

    pub fn is_mixed_topology_mode(&self) -> bool {
        self.core.state.lock().mixed_topology_mode
    }
}
