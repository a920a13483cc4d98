//! Filament material table.
//!
//! Temperatures are the printing ranges slicers ship for generic profiles;
//! drying values are the common vendor recommendations for a dedicated
//! filament dryer.

/// Material properties used to fill in slot temperatures and dryer presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterialInfo {
    /// Canonical material name.
    pub name: &'static str,
    /// Minimum nozzle temperature (°C).
    pub nozzle_min: i32,
    /// Maximum nozzle temperature (°C).
    pub nozzle_max: i32,
    /// Bed temperature (°C).
    pub bed_temp: i32,
    /// Drying temperature (°C).
    pub dry_temp_c: i32,
    /// Drying time (minutes).
    pub dry_time_min: i32,
}

const fn material(
    name: &'static str,
    (nozzle_min, nozzle_max): (i32, i32),
    bed_temp: i32,
    (dry_temp_c, dry_time_min): (i32, i32),
) -> MaterialInfo {
    MaterialInfo {
        name,
        nozzle_min,
        nozzle_max,
        bed_temp,
        dry_temp_c,
        dry_time_min,
    }
}

/// Known materials.
pub static MATERIALS: [MaterialInfo; 11] = [
    material("PLA", (190, 220), 60, (45, 240)),
    material("PLA-CF", (200, 230), 60, (45, 240)),
    material("Silk PLA", (200, 230), 60, (45, 240)),
    material("PETG", (230, 250), 80, (55, 240)),
    material("ABS", (240, 260), 100, (65, 240)),
    material("ASA", (240, 260), 100, (65, 240)),
    material("TPU", (210, 230), 50, (50, 300)),
    material("PC", (260, 290), 110, (70, 360)),
    material("PA", (260, 290), 80, (70, 480)),
    material("PVA", (190, 210), 60, (45, 480)),
    material("HIPS", (230, 250), 100, (60, 240)),
];

/// Values used when a material is unknown and PLA cannot be found.
pub const FALLBACK_MATERIAL: MaterialInfo = material("PLA", (190, 220), 60, (45, 240));

/// Case-insensitive lookup by material name.
pub fn find_material(name: &str) -> Option<&'static MaterialInfo> {
    MATERIALS.iter().find(|m| m.name.eq_ignore_ascii_case(name))
}

/// Lookup with the PLA fallback for unknown materials.
pub fn material_or_default(name: &str) -> MaterialInfo {
    find_material(name)
        .or_else(|| find_material("PLA"))
        .copied()
        .unwrap_or(FALLBACK_MATERIAL)
}

/// Drying profile shared by a material group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DryingGroup {
    /// Group name shown on the preset button.
    pub name: &'static str,
    /// Drying temperature (°C).
    pub temp_c: i32,
    /// Drying time (minutes).
    pub time_min: i32,
}

const PRESET_GROUPS: [&str; 4] = ["PLA", "PETG", "ABS", "TPU"];

/// One drying preset per material group, taken from the group's base
/// material.
pub fn drying_presets_by_group() -> Vec<DryingGroup> {
    PRESET_GROUPS
        .iter()
        .filter_map(|group| find_material(group))
        .map(|m| DryingGroup {
            name: m.name,
            temp_c: m.dry_temp_c,
            time_min: m.dry_time_min,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_material_case_insensitive() {
        let petg = find_material("petg").unwrap();
        assert_eq!(petg.name, "PETG");
        assert_eq!(petg.nozzle_min, 230);
        assert_eq!(find_material("Silk pla").unwrap().name, "Silk PLA");
        assert!(find_material("unobtainium").is_none());
    }

    #[test]
    fn test_unknown_material_falls_back_to_pla() {
        let m = material_or_default("unobtainium");
        assert_eq!(m.name, "PLA");
        assert_eq!((m.nozzle_min, m.nozzle_max, m.bed_temp), (190, 220, 60));
    }

    #[test]
    fn test_drying_groups() {
        let groups = drying_presets_by_group();
        assert_eq!(groups.len(), 4);
        assert_eq!(groups[0].name, "PLA");
        assert_eq!(groups[0].temp_c, 45);
        assert!(groups.iter().all(|g| g.time_min > 0));
    }
}
