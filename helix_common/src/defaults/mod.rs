//! Default capability sets and device-action catalogs per vendor.
//!
//! Real backends start from these and patch in live values once the
//! firmware configuration has been read. The mock uses them verbatim.

pub mod afc;
pub mod hh;

pub use afc::{afc_default_actions, afc_default_capabilities, afc_default_sections};
pub use hh::{hh_default_actions, hh_default_sections};

use crate::ams::device::{DeviceAction, DeviceSection};

/// Action with `id`, if present.
pub fn find_action<'a>(actions: &'a [DeviceAction], id: &str) -> Option<&'a DeviceAction> {
    actions.iter().find(|a| a.id == id)
}

/// Mutable action with `id`, if present.
pub fn find_action_mut<'a>(
    actions: &'a mut [DeviceAction],
    id: &str,
) -> Option<&'a mut DeviceAction> {
    actions.iter_mut().find(|a| a.id == id)
}

/// Section with `id`, if present.
pub fn find_section<'a>(sections: &'a [DeviceSection], id: &str) -> Option<&'a DeviceSection> {
    sections.iter().find(|s| s.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn assert_catalog_consistent(sections: &[DeviceSection], actions: &[DeviceAction]) {
        let mut ids = HashSet::new();
        for action in actions {
            assert!(ids.insert(action.id.as_str()), "duplicate action {}", action.id);
            assert!(
                find_section(sections, &action.section).is_some(),
                "action {} references missing section {}",
                action.id,
                action.section
            );
            assert!(action.min_value <= action.max_value);
        }
    }

    #[test]
    fn test_catalogs_reference_known_sections() {
        assert_catalog_consistent(&afc_default_sections(), &afc_default_actions());
        assert_catalog_consistent(&hh_default_sections(), &hh_default_actions());
    }

    #[test]
    fn test_sections_ordered() {
        for sections in [afc_default_sections(), hh_default_sections()] {
            for (i, s) in sections.iter().enumerate() {
                assert_eq!(s.display_order, i as i32);
            }
        }
    }

    #[test]
    fn test_find_helpers() {
        let mut actions = hh_default_actions();
        assert!(find_action(&actions, "calibrate_bowden").is_some());
        assert!(find_action(&actions, "nonexistent_action").is_none());

        find_action_mut(&mut actions, "motors_toggle").unwrap().enabled = false;
        assert!(!find_action(&actions, "motors_toggle").unwrap().enabled);

        assert_eq!(
            find_section(&hh_default_sections(), "speed").unwrap().label,
            "Speed"
        );
    }
}
