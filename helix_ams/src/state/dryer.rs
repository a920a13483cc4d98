//! Dryer cells and the drying dialog's working values.

use super::AmsState;
use helix_common::ams::dryer::DryerInfo;
use helix_common::format;
use tracing::{debug, trace};

pub const DEFAULT_MODAL_TEMP_C: i32 = 55;
pub const DEFAULT_MODAL_DURATION_MIN: i32 = 240;
pub const MIN_DRYER_TEMP_C: i32 = 35;
pub const MAX_DRYER_TEMP_C: i32 = 70;
pub const MIN_DRYER_DURATION_MIN: i32 = 30;
pub const MAX_DRYER_DURATION_MIN: i32 = 720;
/// Increment of one temperature button press.
pub const MODAL_TEMP_STEP_C: i32 = 5;
/// Increment of one duration button press.
pub const MODAL_DURATION_STEP_MIN: i32 = 30;

impl AmsState {
    pub fn sync_dryer_from_backend(&mut self) {
        let Some(backend) = self.backends.first() else {
            self.subjects.dryer_supported.set(0);
            self.subjects.dryer_active.set(0);
            return;
        };
        let dryer = backend.get_dryer_info();

        let s = &mut self.subjects;
        s.dryer_supported.set_bool(dryer.supported);
        s.dryer_active.set_bool(dryer.active);
        s.dryer_current_temp.set(dryer.current_temp_c as i32);
        s.dryer_target_temp.set(dryer.target_temp_c as i32);
        s.dryer_remaining_min.set(dryer.remaining_min);
        s.dryer_progress_pct.set(dryer.progress_pct());

        if dryer.supported {
            s.dryer_current_temp_text
                .set(&format::temp_c(dryer.current_temp_c as i32));
            if dryer.target_temp_c > 0.0 {
                s.dryer_target_temp_text
                    .set(&format::temp_c(dryer.target_temp_c as i32));
            } else {
                s.dryer_target_temp_text.set("Off");
            }
            if dryer.active && dryer.remaining_min > 0 {
                s.dryer_time_text
                    .set(&format::duration_remaining(dryer.remaining_min * 60));
            } else {
                s.dryer_time_text.set("");
            }
        } else {
            s.dryer_current_temp_text.set("---");
            s.dryer_target_temp_text.set("---");
            s.dryer_time_text.set("");
        }

        trace!(
            "Synced dryer - supported={}, active={}, temp={}→{}°C, {}min left",
            dryer.supported,
            dryer.active,
            dryer.current_temp_c as i32,
            dryer.target_temp_c as i32,
            dryer.remaining_min
        );
    }

    // ─── Modal ──────────────────────────────────────────────────────

    pub fn modal_temp_c(&self) -> i32 {
        self.modal_temp_c
    }

    pub fn modal_duration_min(&self) -> i32 {
        self.modal_duration_min
    }

    /// Nudge the dialog temperature, clamped to the dryer's limits.
    pub fn adjust_modal_temp(&mut self, delta_c: i32) {
        let (min, max) = match self.supported_dryer() {
            Some(d) => (d.min_temp_c as i32, d.max_temp_c as i32),
            None => (MIN_DRYER_TEMP_C, MAX_DRYER_TEMP_C),
        };
        self.modal_temp_c = (self.modal_temp_c + delta_c).min(max).max(min);
        self.update_modal_texts();
        debug!("Modal temp adjusted to {}°C", self.modal_temp_c);
    }

    /// Nudge the dialog duration, clamped to the dryer's limits.
    pub fn adjust_modal_duration(&mut self, delta_min: i32) {
        let max = self
            .supported_dryer()
            .map_or(MAX_DRYER_DURATION_MIN, |d| d.max_duration_min);
        self.modal_duration_min = (self.modal_duration_min + delta_min)
            .min(max)
            .max(MIN_DRYER_DURATION_MIN);
        self.update_modal_texts();
        debug!("Modal duration adjusted to {} min", self.modal_duration_min);
    }

    /// Load a preset into the dialog. Values are taken as given.
    pub fn set_modal_preset(&mut self, temp_c: i32, duration_min: i32) {
        self.modal_temp_c = temp_c;
        self.modal_duration_min = duration_min;
        self.update_modal_texts();
        debug!("Modal preset set: {}°C for {} min", temp_c, duration_min);
    }

    pub(super) fn update_modal_texts(&mut self) {
        self.subjects
            .dryer_modal_temp_text
            .set(&format::temp_c(self.modal_temp_c));
        self.subjects
            .dryer_modal_duration_text
            .set(&format::duration(self.modal_duration_min * 60));
    }

    fn supported_dryer(&self) -> Option<DryerInfo> {
        self.backends
            .first()
            .map(|b| b.get_dryer_info())
            .filter(|d| d.supported)
    }
}

#[cfg(test)]
mod tests {
    use crate::backend_registry::BackendRegistry;
    use crate::backends::mock::AmsBackendMock;
    use crate::state::AmsState;
    use helix_common::config::AmsConfig;

    fn state_with_dryer(enabled: bool) -> AmsState {
        let mut state = AmsState::new(AmsConfig::default(), BackendRegistry::new());
        state.init_subjects();
        let mock = AmsBackendMock::new(4);
        mock.set_dryer_enabled(enabled);
        state.set_backend(Box::new(mock));
        state
    }

    #[test]
    fn test_modal_defaults_and_clamp() {
        let mut state = state_with_dryer(true);
        assert_eq!(state.modal_temp_c(), 55);
        assert_eq!(state.modal_duration_min(), 240);

        state.adjust_modal_temp(100);
        assert_eq!(state.modal_temp_c(), 70);
        assert_eq!(state.string_value("dryer_modal_temp_text"), Some("70°C"));
        state.adjust_modal_temp(-100);
        assert_eq!(state.modal_temp_c(), 35);

        state.adjust_modal_duration(-1000);
        assert_eq!(state.modal_duration_min(), 30);
        assert_eq!(state.string_value("dryer_modal_duration_text"), Some("30m"));
        state.adjust_modal_duration(10_000);
        assert_eq!(state.modal_duration_min(), 720);
        assert_eq!(state.string_value("dryer_modal_duration_text"), Some("12h"));
    }

    #[test]
    fn test_modal_preset() {
        let mut state = state_with_dryer(false);
        state.set_modal_preset(65, 270);
        assert_eq!(state.string_value("dryer_modal_temp_text"), Some("65°C"));
        assert_eq!(state.string_value("dryer_modal_duration_text"), Some("4h 30m"));
    }

    #[test]
    fn test_unsupported_dryer_texts() {
        let mut state = state_with_dryer(false);
        state.sync_dryer_from_backend();
        assert_eq!(state.int_value("dryer_supported"), Some(0));
        assert_eq!(state.string_value("dryer_current_temp_text"), Some("---"));
        assert_eq!(state.string_value("dryer_target_temp_text"), Some("---"));
        assert_eq!(state.string_value("dryer_time_text"), Some(""));
    }

    #[test]
    fn test_idle_dryer_texts() {
        let mut state = state_with_dryer(true);
        state.sync_dryer_from_backend();
        assert_eq!(state.int_value("dryer_supported"), Some(1));
        assert_eq!(state.string_value("dryer_current_temp_text"), Some("25°C"));
        assert_eq!(state.string_value("dryer_target_temp_text"), Some("Off"));
        assert_eq!(state.int_value("dryer_progress_pct"), Some(-1));
    }

    #[test]
    fn test_active_dryer_texts() {
        let mut state = state_with_dryer(true);
        let started = state
            .with_backend(0, |b| b.start_drying(55.0, 240, -1))
            .map(|r| r.is_success());
        assert_eq!(started, Some(true));
        state.sync_dryer_from_backend();
        assert_eq!(state.int_value("dryer_active"), Some(1));
        assert_eq!(state.string_value("dryer_target_temp_text"), Some("55°C"));
        // The cycle has not advanced a full minute yet.
        assert_eq!(state.string_value("dryer_time_text"), Some("4:00 left"));
        assert_eq!(state.int_value("dryer_progress_pct"), Some(0));
    }
}
