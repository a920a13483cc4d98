//! AFC (Armored Turtle Box Turtle) defaults.

use crate::ams::device::{BackendCapabilities, CapabilityFlags, DeviceAction, DeviceSection};
use crate::ams::types::TipMethod;

/// Reason shown on config-backed actions until the firmware config is read.
pub const CONFIG_LOADING_REASON: &str = "Loading configuration...";

/// Reason shown on `save_restart` while nothing is pending.
pub const NO_UNSAVED_CHANGES_REASON: &str = "No unsaved changes";

/// AFC feature set: endless spool, tool mapping, bypass and purge, with a
/// cutter for tips.
pub fn afc_default_capabilities() -> BackendCapabilities {
    BackendCapabilities {
        flags: CapabilityFlags::ENDLESS_SPOOL
            | CapabilityFlags::TOOL_MAPPING
            | CapabilityFlags::BYPASS
            | CapabilityFlags::PURGE,
        tip_method: TipMethod::Cut,
    }
}

pub fn afc_default_sections() -> Vec<DeviceSection> {
    vec![
        DeviceSection::new("setup", "Setup", 0, "Calibration and system setup"),
        DeviceSection::new("speed", "Speed", 1, "Lane motor speed multipliers"),
        DeviceSection::new("maintenance", "Maintenance", 2, "Lane tests and service tasks"),
        DeviceSection::new("hub", "Hub & Cutter", 3, "Hub cutter and bowden settings"),
        DeviceSection::new("tip_forming", "Tip Forming", 4, "Ramming and cooling moves"),
        DeviceSection::new("purge", "Purge & Wipe", 5, "Purge length and nozzle brush"),
        DeviceSection::new("config", "Configuration", 6, "Save settings to the printer"),
    ]
}

pub fn afc_default_actions() -> Vec<DeviceAction> {
    let cfg = |a: DeviceAction| a.disabled(CONFIG_LOADING_REASON);

    vec![
        // Setup
        DeviceAction::button(
            "calibration_wizard",
            "Run Calibration",
            "wrench",
            "setup",
            "Interactive lane and bowden calibration",
        ),
        DeviceAction::slider(
            "bowden_length",
            "Bowden Length",
            "ruler",
            "setup",
            "Distance from hub to toolhead",
            (100.0, 2000.0),
            "mm",
        ),
        DeviceAction::toggle("led_toggle", "LEDs", "lightbulb", "setup", "Lane status LEDs"),
        // Speed
        DeviceAction::slider(
            "speed_fwd",
            "Forward Speed",
            "speedometer",
            "speed",
            "Forward move speed multiplier",
            (0.5, 2.0),
            "x",
        ),
        DeviceAction::slider(
            "speed_rev",
            "Reverse Speed",
            "speedometer",
            "speed",
            "Reverse move speed multiplier",
            (0.5, 2.0),
            "x",
        ),
        // Maintenance
        DeviceAction::button("test_lanes", "Test Lanes", "play", "maintenance", "Run a test on every lane"),
        DeviceAction::button("change_blade", "Change Blade", "content-cut", "maintenance", "Move the cutter to the blade change position"),
        DeviceAction::button("park", "Park", "home", "maintenance", "Park the toolhead"),
        DeviceAction::button("brush", "Clean Nozzle", "brush", "maintenance", "Wipe the nozzle on the brush"),
        DeviceAction::button("reset_motor_time", "Reset Motor Time", "timer", "maintenance", "Reset the lane motor run-time counter"),
        // Hub & cutter
        cfg(DeviceAction::toggle("hub_cut_enabled", "Hub Cutter", "content-cut", "hub", "Cut filament at the hub")),
        cfg(DeviceAction::slider(
            "hub_cut_dist",
            "Cut Distance",
            "ruler",
            "hub",
            "Distance to move after the cut",
            (0.0, 100.0),
            "mm",
        )),
        cfg(DeviceAction::slider(
            "hub_bowden_length",
            "Hub Bowden Length",
            "ruler",
            "hub",
            "Bowden length from hub to toolhead",
            (100.0, 2000.0),
            "mm",
        )),
        cfg(DeviceAction::toggle("assisted_retract", "Assisted Retract", "arrow-left", "hub", "Spool motor helps retract")),
        // Tip forming
        cfg(DeviceAction::slider(
            "ramming_volume",
            "Ramming Volume",
            "cube",
            "tip_forming",
            "Volume rammed before the cooling moves",
            (0.0, 100.0),
            "mm³",
        )),
        cfg(DeviceAction::slider(
            "unloading_speed_start",
            "Unload Speed",
            "speedometer",
            "tip_forming",
            "Initial unloading speed",
            (0.0, 200.0),
            "mm/s",
        )),
        cfg(DeviceAction::slider(
            "cooling_tube_length",
            "Cooling Tube Length",
            "ruler",
            "tip_forming",
            "Length of the cooling move",
            (0.0, 100.0),
            "mm",
        )),
        cfg(DeviceAction::slider(
            "cooling_tube_retraction",
            "Cooling Tube Retraction",
            "ruler",
            "tip_forming",
            "Retraction before the cooling moves",
            (0.0, 100.0),
            "mm",
        )),
        // Purge & wipe
        cfg(DeviceAction::toggle("purge_enabled", "Purge", "water", "purge", "Purge after every load")),
        cfg(DeviceAction::slider(
            "purge_length",
            "Purge Length",
            "ruler",
            "purge",
            "Filament purged after a load",
            (0.0, 200.0),
            "mm",
        )),
        cfg(DeviceAction::toggle("brush_enabled", "Brush", "brush", "purge", "Wipe on the brush after purging")),
        // Configuration
        DeviceAction::button(
            "save_restart",
            "Save & Restart",
            "content-save",
            "config",
            "Write changes and restart Klipper",
        )
        .disabled(NO_UNSAVED_CHANGES_REASON),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ams::device::ActionType;
    use crate::defaults::find_action;

    #[test]
    fn test_afc_capabilities() {
        let caps = afc_default_capabilities();
        assert!(caps.flags.contains(CapabilityFlags::ENDLESS_SPOOL));
        assert!(caps.flags.contains(CapabilityFlags::BYPASS));
        assert!(!caps.flags.contains(CapabilityFlags::SPOOLMAN));
        assert!(!caps.flags.contains(CapabilityFlags::HARDWARE_BYPASS_SENSOR));
        assert_eq!(caps.tip_method, TipMethod::Cut);
    }

    #[test]
    fn test_config_backed_actions_start_disabled() {
        let actions = afc_default_actions();
        for id in ["hub_cut_enabled", "hub_cut_dist", "ramming_volume", "purge_length"] {
            let action = find_action(&actions, id).unwrap();
            assert!(!action.enabled, "{id}");
            assert_eq!(action.disable_reason, CONFIG_LOADING_REASON);
        }

        let save = find_action(&actions, "save_restart").unwrap();
        assert_eq!(save.section, "config");
        assert_eq!(save.disable_reason, NO_UNSAVED_CHANGES_REASON);

        let wizard = find_action(&actions, "calibration_wizard").unwrap();
        assert!(wizard.enabled);
        assert_eq!(wizard.action_type, ActionType::Button);
    }

    #[test]
    fn test_hub_bowden_slider_range() {
        let actions = afc_default_actions();
        let action = find_action(&actions, "hub_bowden_length").unwrap();
        assert_eq!(action.action_type, ActionType::Slider);
        assert_eq!(action.unit, "mm");
        assert_eq!((action.min_value, action.max_value), (100.0, 2000.0));
    }
}
