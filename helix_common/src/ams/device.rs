//! Backend capabilities, endless spool / tool mapping descriptors and
//! vendor device actions.
//!
//! Device actions describe settings surfaces (calibration buttons, speed
//! sliders, LED modes) that differ per vendor. Backends publish them as
//! plain data; the UI renders them generically and calls back through
//! `execute_device_action`.

use crate::ams::types::{AmsSystemInfo, TipMethod};
use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

// ─── Capabilities ───────────────────────────────────────────────────

bitflags! {
    /// Feature flags a backend advertises.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct CapabilityFlags: u8 {
        /// Automatic fallback to a backup slot when a spool runs out.
        const ENDLESS_SPOOL          = 0x01;
        /// Spoolman spool linkage.
        const SPOOLMAN               = 0x02;
        /// Tool-to-slot remapping.
        const TOOL_MAPPING           = 0x04;
        /// Bypass feed position.
        const BYPASS                 = 0x08;
        /// Bypass detected by a sensor instead of toggled.
        const HARDWARE_BYPASS_SENSOR = 0x10;
        /// Purge after load.
        const PURGE                  = 0x20;
    }
}

/// Capability set shared by backends of one vendor family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendCapabilities {
    /// Feature flags.
    pub flags: CapabilityFlags,
    /// Tip handling method.
    pub tip_method: TipMethod,
}

impl BackendCapabilities {
    /// Copy the capability fields into a system snapshot.
    pub fn apply_to(&self, info: &mut AmsSystemInfo) {
        info.supports_endless_spool = self.flags.contains(CapabilityFlags::ENDLESS_SPOOL);
        info.supports_spoolman = self.flags.contains(CapabilityFlags::SPOOLMAN);
        info.supports_tool_mapping = self.flags.contains(CapabilityFlags::TOOL_MAPPING);
        info.supports_bypass = self.flags.contains(CapabilityFlags::BYPASS);
        info.has_hardware_bypass_sensor =
            self.flags.contains(CapabilityFlags::HARDWARE_BYPASS_SENSOR);
        info.supports_purge = self.flags.contains(CapabilityFlags::PURGE);
        info.tip_method = self.tip_method;
    }
}

// ─── Endless Spool & Tool Mapping ───────────────────────────────────

/// Endless spool support reported by a backend.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EndlessSpoolCapabilities {
    /// Backend supports endless spool.
    pub supported: bool,
    /// UI may modify the configuration.
    pub editable: bool,
    /// Short description, e.g. "Per-slot backup".
    pub description: String,
}

/// Backup configuration for one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndlessSpoolConfig {
    /// Slot this entry applies to.
    pub slot_index: i32,
    /// Backup slot (-1 = none).
    pub backup_slot: i32,
}

impl Default for EndlessSpoolConfig {
    fn default() -> Self {
        Self {
            slot_index: 0,
            backup_slot: -1,
        }
    }
}

/// Tool mapping support reported by a backend.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ToolMappingCapabilities {
    /// Backend supports tool mapping.
    pub supported: bool,
    /// UI may modify the mapping.
    pub editable: bool,
    /// UI hint text.
    pub description: String,
}

// ─── Device Actions ─────────────────────────────────────────────────

/// Control type of a device action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum ActionType {
    /// Simple push button.
    #[default]
    Button = 0,
    /// On/off switch.
    Toggle = 1,
    /// Value slider with min/max.
    Slider = 2,
    /// Selection from a list of options.
    Dropdown = 3,
    /// Read-only display.
    Info = 4,
}

impl ActionType {
    /// Human-readable name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Button => "Button",
            Self::Toggle => "Toggle",
            Self::Slider => "Slider",
            Self::Dropdown => "Dropdown",
            Self::Info => "Info",
        }
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value carried by a toggle, slider or dropdown.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ActionValue {
    /// Toggle state.
    Bool(bool),
    /// Slider position.
    Float(f32),
    /// Integer setting.
    Int(i32),
    /// Dropdown choice or free text.
    Text(String),
}

impl ActionValue {
    /// Numeric view of the value, if it has one.
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Self::Float(v) => Some(*v),
            Self::Int(v) => Some(*v as f32),
            Self::Bool(_) | Self::Text(_) => None,
        }
    }

    /// Boolean view of the value, if it has one.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Text view of the value, if it has one.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }
}

/// Group of device actions on the settings screen.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeviceSection {
    /// Section identifier, e.g. "setup".
    pub id: String,
    /// Display label.
    pub label: String,
    /// Sort order (0 = first).
    pub display_order: i32,
    /// Short description for the settings row.
    pub description: String,
}

impl DeviceSection {
    /// Create a section.
    pub fn new(id: &str, label: &str, display_order: i32, description: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            display_order,
            description: description.to_string(),
        }
    }
}

/// One vendor-specific control.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceAction {
    /// Unique action id.
    pub id: String,
    /// Display label.
    pub label: String,
    /// Icon name.
    pub icon: String,
    /// Owning section id.
    pub section: String,
    /// Tooltip / hint text.
    pub description: String,
    /// Control type.
    pub action_type: ActionType,
    /// Current value for toggles, sliders and dropdowns.
    pub current_value: Option<ActionValue>,
    /// Options for dropdowns.
    pub options: Vec<String>,
    /// Slider minimum.
    pub min_value: f32,
    /// Slider maximum.
    pub max_value: f32,
    /// Display unit, e.g. "mm".
    pub unit: String,
    /// Per-slot action target (-1 = system-wide).
    pub slot_index: i32,
    /// Action currently available.
    pub enabled: bool,
    /// Why the action is disabled.
    pub disable_reason: String,
}

impl DeviceAction {
    /// Button in `section`.
    pub fn button(id: &str, label: &str, icon: &str, section: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
            icon: icon.to_string(),
            section: section.to_string(),
            description: description.to_string(),
            ..Default::default()
        }
    }

    /// Toggle in `section`.
    pub fn toggle(id: &str, label: &str, icon: &str, section: &str, description: &str) -> Self {
        Self {
            action_type: ActionType::Toggle,
            current_value: Some(ActionValue::Bool(false)),
            ..Self::button(id, label, icon, section, description)
        }
    }

    /// Slider in `section` spanning `min..=max` in `unit`.
    pub fn slider(
        id: &str,
        label: &str,
        icon: &str,
        section: &str,
        description: &str,
        (min_value, max_value): (f32, f32),
        unit: &str,
    ) -> Self {
        Self {
            action_type: ActionType::Slider,
            min_value,
            max_value,
            unit: unit.to_string(),
            ..Self::button(id, label, icon, section, description)
        }
    }

    /// Dropdown in `section` with `options`.
    pub fn dropdown(
        id: &str,
        label: &str,
        icon: &str,
        section: &str,
        description: &str,
        options: &[&str],
    ) -> Self {
        Self {
            action_type: ActionType::Dropdown,
            options: options.iter().map(|o| o.to_string()).collect(),
            ..Self::button(id, label, icon, section, description)
        }
    }

    /// Mark the action unavailable.
    pub fn disabled(mut self, reason: &str) -> Self {
        self.enabled = false;
        self.disable_reason = reason.to_string();
        self
    }
}

impl Default for DeviceAction {
    fn default() -> Self {
        Self {
            id: String::new(),
            label: String::new(),
            icon: String::new(),
            section: String::new(),
            description: String::new(),
            action_type: ActionType::Button,
            current_value: None,
            options: Vec::new(),
            min_value: 0.0,
            max_value: 100.0,
            unit: String::new(),
            slot_index: -1,
            enabled: true,
            disable_reason: String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capabilities_apply_to() {
        let caps = BackendCapabilities {
            flags: CapabilityFlags::BYPASS | CapabilityFlags::PURGE,
            tip_method: TipMethod::TipForm,
        };
        let mut info = AmsSystemInfo::default();
        info.supports_spoolman = true;
        caps.apply_to(&mut info);

        assert!(info.supports_bypass);
        assert!(info.supports_purge);
        assert!(!info.supports_spoolman);
        assert!(!info.supports_endless_spool);
        assert_eq!(info.tip_method, TipMethod::TipForm);
    }

    #[test]
    fn test_action_builders() {
        let slider = DeviceAction::slider("speed", "Speed", "speed", "speed", "", (10.0, 300.0), "mm/s");
        assert_eq!(slider.action_type, ActionType::Slider);
        assert!(slider.min_value < slider.max_value);
        assert_eq!(slider.slot_index, -1);
        assert!(slider.enabled);

        let toggle = DeviceAction::toggle("motors", "Motors", "engine", "maintenance", "")
            .disabled("Printing");
        assert_eq!(toggle.current_value, Some(ActionValue::Bool(false)));
        assert!(!toggle.enabled);
        assert_eq!(toggle.disable_reason, "Printing");
    }

    #[test]
    fn test_action_value_views() {
        assert_eq!(ActionValue::Int(5).as_f32(), Some(5.0));
        assert_eq!(ActionValue::Float(1.5).as_f32(), Some(1.5));
        assert_eq!(ActionValue::Text("off".into()).as_text(), Some("off"));
        assert_eq!(ActionValue::Bool(true).as_bool(), Some(true));
        assert!(ActionValue::Bool(true).as_f32().is_none());
    }
}
