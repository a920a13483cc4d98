//! Happy Hare defaults.

use crate::ams::device::{DeviceAction, DeviceSection};

/// LED effect names accepted by `MMU_LED`.
pub const LED_MODES: [&str; 4] = ["off", "gates_status", "filament_color", "slicer_color"];

pub fn hh_default_sections() -> Vec<DeviceSection> {
    vec![
        DeviceSection::new("setup", "Setup", 0, "Calibration and LED settings"),
        DeviceSection::new("speed", "Speed", 1, "Gear and selector speeds"),
        DeviceSection::new("maintenance", "Maintenance", 2, "Tests, counters and motors"),
    ]
}

pub fn hh_default_actions() -> Vec<DeviceAction> {
    let speed = |id: &str, label: &str, description: &str| {
        DeviceAction::slider(id, label, "speedometer", "speed", description, (10.0, 300.0), "mm/s")
    };

    vec![
        DeviceAction::button("calibrate_bowden", "Calibrate Bowden", "ruler", "setup", "Measure the bowden length"),
        DeviceAction::button("calibrate_encoder", "Calibrate Encoder", "counter", "setup", "Calibrate encoder resolution"),
        DeviceAction::button("calibrate_gear", "Calibrate Gear", "cog", "setup", "Calibrate gear rotation distance"),
        DeviceAction::button("calibrate_gates", "Calibrate Gates", "gate", "setup", "Calibrate every gate"),
        DeviceAction::button("calibrate_servo", "Calibrate Servo", "axis-arrow", "setup", "Calibrate servo positions"),
        DeviceAction::dropdown("led_mode", "LED Mode", "lightbulb", "setup", "Gate LED effect", &LED_MODES),
        speed("gear_load_speed", "Gear Load Speed", "Gear speed while loading"),
        speed("gear_unload_speed", "Gear Unload Speed", "Gear speed while unloading"),
        speed("selector_speed", "Selector Speed", "Selector travel speed"),
        DeviceAction::button("test_grip", "Test Grip", "hand-back-left", "maintenance", "Engage the servo on the current gate"),
        DeviceAction::button("test_load", "Test Load", "tray-arrow-down", "maintenance", "Short load and unload test"),
        DeviceAction::button("servo_buzz", "Buzz Servo", "vibrate", "maintenance", "Buzz the servo to check movement"),
        DeviceAction::button("reset_servo_counter", "Reset Servo Counter", "counter", "maintenance", "Reset the servo wear counter"),
        DeviceAction::button("reset_blade_counter", "Reset Blade Counter", "content-cut", "maintenance", "Reset the cutter blade counter"),
        DeviceAction::toggle("motors_toggle", "Motors", "engine", "maintenance", "Enable or release the MMU motors"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ams::device::ActionType;
    use crate::defaults::find_action;

    #[test]
    fn test_hh_catalog_shape() {
        let sections = hh_default_sections();
        let actions = hh_default_actions();
        assert_eq!(sections.len(), 3);
        assert_eq!(actions.len(), 15);

        let bowden = find_action(&actions, "calibrate_bowden").unwrap();
        assert_eq!(bowden.action_type, ActionType::Button);
        assert_eq!(bowden.section, "setup");
        assert!(bowden.enabled);

        let gear = find_action(&actions, "gear_load_speed").unwrap();
        assert_eq!(gear.action_type, ActionType::Slider);
        assert_eq!(gear.section, "speed");
        assert_eq!(gear.unit, "mm/s");

        let led = find_action(&actions, "led_mode").unwrap();
        assert_eq!(led.options.len(), LED_MODES.len());
    }
}
