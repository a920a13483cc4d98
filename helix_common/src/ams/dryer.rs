//! Dryer state for AMS units with integrated filament drying.

use crate::filament;
use serde::{Deserialize, Serialize};

/// Default fan speed for presets (percent).
pub const DEFAULT_PRESET_FAN_PCT: i32 = 50;

/// Drying profile for a material group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DryingPreset {
    /// Preset name, e.g. "PLA".
    pub name: String,
    /// Target temperature (°C).
    pub temp_c: f32,
    /// Duration in minutes.
    pub duration_min: i32,
    /// Fan speed (0-100).
    pub fan_pct: i32,
}

impl DryingPreset {
    /// Create a preset with the default fan speed.
    pub fn new(name: impl Into<String>, temp_c: f32, duration_min: i32) -> Self {
        Self {
            name: name.into(),
            temp_c,
            duration_min,
            fan_pct: DEFAULT_PRESET_FAN_PCT,
        }
    }
}

/// Presets derived from the filament material groups.
pub fn default_drying_presets() -> Vec<DryingPreset> {
    filament::drying_presets_by_group()
        .iter()
        .map(|g| DryingPreset::new(g.name, g.temp_c as f32, g.time_min))
        .collect()
}

/// Dryer state reported by a backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DryerInfo {
    /// Unit has a dryer.
    pub supported: bool,
    /// Drying in progress.
    pub active: bool,
    /// Dryer may run while printing.
    pub allows_during_print: bool,

    /// Chamber temperature (°C).
    pub current_temp_c: f32,
    /// Target temperature (0 = off).
    pub target_temp_c: f32,
    /// Total duration set (minutes).
    pub duration_min: i32,
    /// Minutes remaining.
    pub remaining_min: i32,
    /// Fan speed (0-100).
    pub fan_pct: i32,

    /// Minimum settable temperature.
    pub min_temp_c: f32,
    /// Maximum settable temperature.
    pub max_temp_c: f32,
    /// Maximum drying time (minutes).
    pub max_duration_min: i32,
    /// Fan speed can be set independently.
    pub supports_fan_control: bool,
}

impl DryerInfo {
    /// Progress in percent, or -1 when not drying.
    pub fn progress_pct(&self) -> i32 {
        if !self.active || self.duration_min <= 0 {
            return -1;
        }
        let elapsed = (self.duration_min - self.remaining_min).clamp(0, self.duration_min);
        elapsed * 100 / self.duration_min
    }

    /// True when within `tolerance_c` of a non-zero target.
    pub fn is_at_temp(&self, tolerance_c: f32) -> bool {
        if self.target_temp_c <= 0.0 {
            return false;
        }
        (self.current_temp_c - self.target_temp_c).abs() <= tolerance_c
    }
}

impl Default for DryerInfo {
    fn default() -> Self {
        Self {
            supported: false,
            active: false,
            allows_during_print: false,
            current_temp_c: 0.0,
            target_temp_c: 0.0,
            duration_min: 0,
            remaining_min: 0,
            fan_pct: 0,
            min_temp_c: 35.0,
            max_temp_c: 70.0,
            max_duration_min: 720,
            supports_fan_control: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_pct() {
        let mut info = DryerInfo::default();
        assert_eq!(info.progress_pct(), -1);

        info.active = true;
        info.duration_min = 240;
        info.remaining_min = 180;
        assert_eq!(info.progress_pct(), 25);

        // Firmware reporting more remaining than total.
        info.remaining_min = 300;
        assert_eq!(info.progress_pct(), 0);
    }

    #[test]
    fn test_is_at_temp() {
        let mut info = DryerInfo::default();
        info.current_temp_c = 54.0;
        assert!(!info.is_at_temp(2.0));

        info.target_temp_c = 55.0;
        assert!(info.is_at_temp(2.0));
        assert!(!info.is_at_temp(0.5));
    }

    #[test]
    fn test_default_presets() {
        let presets = default_drying_presets();
        let pla = presets.iter().find(|p| p.name == "PLA").unwrap();
        assert_eq!(pla.temp_c, 45.0);
        assert_eq!(pla.duration_min, 240);
        assert_eq!(pla.fan_pct, DEFAULT_PRESET_FAN_PCT);
        assert!(presets.iter().any(|p| p.name == "TPU"));
    }
}
