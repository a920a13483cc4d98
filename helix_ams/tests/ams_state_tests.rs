//! AmsState integration tests.
//!
//! A mock backend drives the state layer end to end: operations run on the
//! mock's threads, events cross the channel and the owner thread (the
//! test) drains them into the subject cells.

use helix_ams::backends::mock;
use helix_ams::{
    AmsBackendMock, AmsState, ApiError, BackendRegistry, HardwareInfo, PrinterApi, SpoolRecord,
};
use helix_common::ams::{AmsAction, AmsType, BYPASS_SLOT, SlotStatus};
use helix_common::config::{AmsConfig, ConfigLoader, MockMode};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::NamedTempFile;

const WAIT: Duration = Duration::from_secs(5);

/// Spoolman stand-in that records every call.
#[derive(Default)]
struct RecordingApi {
    spools: Mutex<HashMap<i32, SpoolRecord>>,
    active: Mutex<Vec<i32>>,
    lookups: Mutex<Vec<i32>>,
    offline: bool,
}

impl RecordingApi {
    fn with_spool(self, id: i32, remaining_g: f32, initial_g: f32) -> Self {
        self.spools.lock().insert(
            id,
            SpoolRecord {
                id,
                remaining_weight_g: remaining_g,
                initial_weight_g: initial_g,
            },
        );
        self
    }

    fn lookup_count(&self) -> usize {
        self.lookups.lock().len()
    }
}

impl PrinterApi for RecordingApi {
    fn set_active_spool(&self, spool_id: i32) -> Result<(), ApiError> {
        self.active.lock().push(spool_id);
        if self.offline {
            return Err(ApiError::Unavailable);
        }
        Ok(())
    }

    fn get_spool(&self, spool_id: i32) -> Result<Option<SpoolRecord>, ApiError> {
        self.lookups.lock().push(spool_id);
        if self.offline {
            return Err(ApiError::Unavailable);
        }
        Ok(self.spools.lock().get(&spool_id).copied())
    }
}

fn quick_config(mock_enabled: bool) -> AmsConfig {
    let mut config = AmsConfig::default();
    config.mock.enabled = mock_enabled;
    config.mock.realistic = false;
    config.mock.operation_delay_ms = 60;
    config.mock.sim_speedup = 10.0;
    config
}

/// State running the configured mock.
fn mock_state(mode: MockMode) -> AmsState {
    let mut config = quick_config(true);
    config.mock.mode = mode;
    state_from_config(config)
}

/// Mock whose operations take long enough for every step to be drained
/// before the next one.
fn slow_mock_state() -> AmsState {
    let mut config = quick_config(true);
    config.mock.operation_delay_ms = 600;
    config.mock.sim_speedup = 1.0;
    state_from_config(config)
}

fn state_from_config(config: AmsConfig) -> AmsState {
    let mut registry = BackendRegistry::new();
    helix_ams::backends::register_builtin_backends(&mut registry);
    let mut state = AmsState::new(config, registry);
    state.init_subjects();
    state.init_mock_backend().unwrap();
    state.process_events();
    state
}

fn quick_mock(slots: usize) -> AmsBackendMock {
    let mock = AmsBackendMock::new(slots);
    mock.set_realistic_mode(false);
    mock.set_operation_delay(60);
    mock.set_sim_speedup(10.0);
    mock
}

/// State with a hand-installed mock and mock mode off, so Spoolman calls
/// go through.
fn spoolman_state(api: &Arc<RecordingApi>) -> AmsState {
    let mut state = AmsState::new(quick_config(false), BackendRegistry::new());
    state.init_subjects();
    state.set_printer_api(Some(Arc::clone(api) as Arc<dyn PrinterApi>));
    state.set_backend(Box::new(quick_mock(4)));
    state
}

/// Pump events until `done` holds.
fn pump_until(state: &mut AmsState, done: impl Fn(&AmsState) -> bool) -> bool {
    let deadline = Instant::now() + WAIT;
    while Instant::now() < deadline {
        state.wait_and_process(Duration::from_millis(20));
        if done(state) {
            return true;
        }
    }
    false
}

fn action(state: &AmsState) -> Option<AmsAction> {
    state
        .int_value("ams_action")
        .and_then(|v| u8::try_from(v).ok())
        .and_then(AmsAction::from_u8)
}

fn idle_with(state: &AmsState, cell: &str, value: i32) -> bool {
    action(state) == Some(AmsAction::Idle) && state.int_value(cell) == Some(value)
}

// ─── Operations Through The State ───────────────────────────────────

#[test]
fn test_load_flows_into_cells() {
    let mut state = mock_state(MockMode::HappyHare);
    assert_eq!(state.string_value("ams_current_slot_text"), Some("Current: Slot 1"));

    let unload = state.with_backend(0, |b| b.unload_filament());
    assert!(unload.is_some_and(|r| r.is_success()));
    assert!(pump_until(&mut state, |s| idle_with(s, "ams_current_slot", -1)));
    assert_eq!(state.int_value("ams_filament_loaded"), Some(0));
    assert_eq!(state.int_value("ams_slot_0_status"), Some(SlotStatus::Available as i32));
    assert_eq!(state.string_value("ams_current_slot_text"), Some("Currently Loaded"));
    assert_eq!(state.string_value("ams_current_material_text"), Some("---"));
    assert_eq!(state.int_value("ams_current_color"), Some(0x505050));

    let load = state.with_backend(0, |b| b.load_filament(2));
    assert!(load.is_some_and(|r| r.is_success()));
    assert!(pump_until(&mut state, |s| idle_with(s, "ams_current_slot", 2)));

    assert_eq!(state.int_value("ams_slot_2_status"), Some(SlotStatus::Loaded as i32));
    assert_eq!(state.int_value("ams_filament_loaded"), Some(1));
    assert_eq!(state.string_value("ams_current_tool_text"), Some("T2"));
    assert_eq!(state.string_value("ams_current_slot_text"), Some("Current: Slot 3"));
    assert_eq!(state.string_value("ams_current_material_text"), Some("Pop Blue ASA"));
    assert_eq!(state.string_value("ams_current_weight_text"), Some("400g"));
    assert_eq!(state.int_value("ams_current_has_weight"), Some(1));
    assert_eq!(state.int_value("ams_current_color"), Some(0x00AEFF));
    assert_eq!(state.int_value("path_active_slot"), Some(2));
}

#[test]
fn test_tool_change_sets_pending_then_clears() {
    let mut state = slow_mock_state();
    let seen_pending = Arc::new(Mutex::new(Vec::new()));
    {
        let seen = Arc::clone(&seen_pending);
        assert!(state
            .subjects_mut()
            .observe_int("ams_pending_target_slot", move |v| seen.lock().push(v)));
    }

    let result = state.with_backend(0, |b| b.change_tool(3));
    assert!(result.is_some_and(|r| r.is_success()));
    assert!(pump_until(&mut state, |s| idle_with(s, "ams_current_tool", 3)));

    assert_eq!(state.int_value("ams_pending_target_slot"), Some(-1));
    assert_eq!(*seen_pending.lock(), vec![3, -1]);
}

#[test]
fn test_action_observer_sees_operation() {
    let mut state = slow_mock_state();
    let actions = Arc::new(Mutex::new(Vec::new()));
    {
        let actions = Arc::clone(&actions);
        state
            .subjects_mut()
            .action
            .observe(move |v| actions.lock().push(v));
    }

    state.with_backend(0, |b| b.unload_filament());
    assert!(pump_until(&mut state, |s| idle_with(s, "ams_filament_loaded", 0)));

    let seen = actions.lock().clone();
    assert!(seen.contains(&(AmsAction::Unloading as i32)));
    assert_eq!(seen.last(), Some(&(AmsAction::Idle as i32)));
    assert!(!state.is_filament_operation_active());
}

#[test]
fn test_bypass_cells() {
    let mut state = mock_state(MockMode::HappyHare);
    assert_eq!(state.int_value("ams_supports_bypass"), Some(1));

    let unload = state.with_backend(0, |b| b.unload_filament());
    assert!(unload.is_some_and(|r| r.is_success()));
    assert!(pump_until(&mut state, |s| idle_with(s, "ams_filament_loaded", 0)));

    let bypass = state.with_backend(0, |b| b.enable_bypass());
    assert!(bypass.is_some_and(|r| r.is_success()));
    assert!(pump_until(&mut state, |s| s.int_value("ams_bypass_active") == Some(1)));

    assert_eq!(state.int_value("ams_current_slot"), Some(BYPASS_SLOT));
    assert_eq!(state.string_value("ams_current_slot_text"), Some("Current: Bypass"));
    assert_eq!(state.string_value("ams_current_material_text"), Some("External"));
    assert_eq!(state.int_value("ams_current_color"), Some(0x888888));
    assert_eq!(state.int_value("ams_current_has_weight"), Some(0));
}

#[test]
fn test_external_spool_color() {
    let mut state = mock_state(MockMode::HappyHare);
    let spool = helix_common::ams::SlotInfo {
        color_rgb: 0x112233,
        material: "PLA".to_string(),
        ..Default::default()
    };
    state.set_external_spool_info(spool);
    assert_eq!(state.int_value("ams_external_spool_color"), Some(0x112233));

    state.sync_from_backend();
    assert_eq!(state.int_value("ams_external_spool_color"), Some(0x112233));
    assert_eq!(state.external_spool_info().map(|s| s.material.as_str()), Some("PLA"));

    state.clear_external_spool_info();
    assert_eq!(state.int_value("ams_external_spool_color"), Some(0));
}

// ─── Layouts ────────────────────────────────────────────────────────

#[test]
fn test_multi_unit_slot_text_names_unit() {
    let state = mock_state(MockMode::MultiUnit);
    assert_eq!(state.int_value("ams_type"), Some(AmsType::Afc as i32));
    assert_eq!(state.int_value("ams_slot_count"), Some(6));
    assert_eq!(
        state.string_value("ams_current_slot_text"),
        Some("Current: Box Turtle 1 · Slot 1")
    );
    assert_eq!(state.int_value("ams_slot_3_status"), Some(SlotStatus::Empty as i32));
    assert_eq!(state.int_value("ams_slot_6_status"), Some(SlotStatus::Unknown as i32));
}

#[test]
fn test_tool_changer_slot_text() {
    let state = mock_state(MockMode::ToolChanger);
    assert_eq!(state.int_value("ams_type"), Some(AmsType::ToolChanger as i32));
    assert_eq!(state.string_value("ams_system_name"), Some("Tool Changer (Mock)"));
    assert_eq!(state.int_value("ams_supports_bypass"), Some(0));
}

#[test]
fn test_secondary_backend_cells() {
    let mut state = mock_state(MockMode::HappyHare);
    let index = state.add_backend(Box::new(quick_mock(2)));
    assert_eq!(index, 1);
    assert_eq!(state.int_value("backend_count"), Some(2));
    assert_eq!(
        state.int_value("ams_backend_1_slot_0_status"),
        Some(SlotStatus::Unknown as i32)
    );

    state.sync_backend(1);
    assert_eq!(
        state.int_value("ams_backend_1_slot_0_status"),
        Some(SlotStatus::Loaded as i32)
    );
    assert_eq!(
        state.int_value("ams_backend_1_slot_1_status"),
        Some(SlotStatus::Available as i32)
    );
    assert_eq!(state.int_value("ams_backend_1_slot_0_color"), Some(0x1A1A2E));
    assert_eq!(state.int_value("ams_backend_1_slot_2_color"), None);

    // Secondary backends never drive the system cells.
    assert_eq!(state.int_value("ams_slot_count"), Some(4));

    state.set_active_backend(1);
    assert_eq!(state.active_backend_index(), 1);
    state.set_active_backend(5);
    assert_eq!(state.active_backend_index(), 1);
}

#[test]
fn test_slot_changed_updates_single_slot() {
    let mut state = mock_state(MockMode::HappyHare);
    let before = state.int_value("ams_slots_version").unwrap_or_default();

    let updated = state.with_backend(0, |b| {
        let mut info = b.get_slot_info(1);
        info.color_rgb = 0x00FF00;
        b.set_slot_info(1, &info, true)
    });
    assert!(updated.is_some_and(|r| r.is_success()));
    assert!(pump_until(&mut state, |s| s.int_value("ams_slot_1_color") == Some(0x00FF00)));
    assert!(state.int_value("ams_slots_version").unwrap_or_default() > before);
}

#[test]
fn test_hardware_backend_from_registry() {
    let mut registry = BackendRegistry::new();
    registry.register("afc", mock::create_backend);
    let mut state = AmsState::new(quick_config(false), registry);
    state.init_subjects();

    let hw = HardwareInfo {
        detected_type: AmsType::Afc,
        lane_names: (1..=4).map(|i| format!("lane{i}")).collect(),
        hub_names: vec!["Turtle_1".to_string()],
        ..Default::default()
    };
    let api = Arc::new(RecordingApi::default());
    state
        .init_backend_from_hardware(&hw, Some(api as Arc<dyn PrinterApi>))
        .unwrap();
    assert_eq!(state.backend_count(), 1);
    assert_eq!(state.int_value("ams_type"), Some(AmsType::Afc as i32));
    assert!(state.backend(0).is_some_and(|b| b.is_running()));

    // Already initialized: a second call is a no-op.
    state.init_backend_from_hardware(&hw, None).unwrap();
    assert_eq!(state.backend_count(), 1);
}

// ─── Spoolman ───────────────────────────────────────────────────────

#[test]
fn test_active_spool_set_once_per_spool() {
    let api = Arc::new(RecordingApi::default());
    let mut state = spoolman_state(&api);

    state.sync_from_backend();
    state.sync_from_backend();
    assert_eq!(*api.active.lock(), vec![1]);
}

#[test]
fn test_active_spool_failure_is_not_fatal() {
    let api = Arc::new(RecordingApi {
        offline: true,
        ..Default::default()
    });
    let mut state = spoolman_state(&api);
    state.sync_from_backend();
    assert_eq!(*api.active.lock(), vec![1]);
    assert_eq!(state.string_value("ams_current_slot_text"), Some("Current: Slot 1"));
}

#[test]
fn test_refresh_writes_new_weights() {
    let api = Arc::new(
        RecordingApi::default()
            .with_spool(1, 250.0, 1000.0)
            .with_spool(2, 750.0, 1000.0),
    );
    let mut state = spoolman_state(&api);
    state.sync_from_backend();
    assert_eq!(state.string_value("ams_current_weight_text"), Some("1000g"));
    // Every linked slot was looked up: spools 1..=4.
    assert_eq!(api.lookup_count(), 4);

    let slot0 = state.with_backend(0, |b| b.get_slot_info(0));
    assert_eq!(slot0.map(|s| s.remaining_weight_g), Some(250.0));
    // Spool 2 already matched; spools 3 and 4 are unknown to Spoolman.
    let slot1 = state.with_backend(0, |b| b.get_slot_info(1));
    assert_eq!(slot1.map(|s| s.remaining_weight_g), Some(750.0));

    state.sync_current_loaded_from_backend();
    assert_eq!(state.string_value("ams_current_weight_text"), Some("250g"));

    let version = state.int_value("ams_slots_version");
    state.refresh_spoolman_weights();
    assert_eq!(state.int_value("ams_slots_version"), version);
}

#[test]
fn test_weights_pulled_once_per_backend() {
    let api = Arc::new(RecordingApi::default().with_spool(1, 250.0, 1000.0));
    let mut state = spoolman_state(&api);
    state.sync_from_backend();
    assert_eq!(api.lookup_count(), 4);

    state.sync_from_backend();
    state.sync_from_backend();
    assert_eq!(api.lookup_count(), 4);

    state.set_backend(Box::new(quick_mock(2)));
    state.sync_from_backend();
    assert_eq!(api.lookup_count(), 6);
}

#[test]
fn test_refresh_skipped_in_mock_mode() {
    let api = Arc::new(RecordingApi::default().with_spool(1, 10.0, 1000.0));
    let mut state = mock_state(MockMode::HappyHare);
    state.set_printer_api(Some(Arc::clone(&api) as Arc<dyn PrinterApi>));
    state.refresh_spoolman_weights();
    assert_eq!(api.lookup_count(), 0);
}

#[test]
fn test_polling_is_reference_counted() {
    let api = Arc::new(RecordingApi::default());
    let mut state = spoolman_state(&api);

    state.start_spoolman_polling();
    assert!(state.is_spoolman_polling());
    assert_eq!(api.lookup_count(), 4);

    state.start_spoolman_polling();
    assert_eq!(api.lookup_count(), 4);

    state.stop_spoolman_polling();
    assert!(state.is_spoolman_polling());
    state.stop_spoolman_polling();
    assert!(!state.is_spoolman_polling());
    state.stop_spoolman_polling();
    assert!(!state.is_spoolman_polling());
}

#[test]
fn test_polling_refreshes_when_due() {
    let api = Arc::new(RecordingApi::default());
    let mut config = quick_config(false);
    config.spoolman.poll_interval_s = 0;
    let mut state = AmsState::new(config, BackendRegistry::new());
    state.init_subjects();
    state.set_printer_api(Some(Arc::clone(&api) as Arc<dyn PrinterApi>));
    state.set_backend(Box::new(quick_mock(4)));

    state.process_events();
    assert_eq!(api.lookup_count(), 0);

    state.start_spoolman_polling();
    assert_eq!(api.lookup_count(), 4);
    state.process_events();
    assert_eq!(api.lookup_count(), 8);

    state.stop_spoolman_polling();
    state.process_events();
    assert_eq!(api.lookup_count(), 8);
}

// ─── Lifecycle ──────────────────────────────────────────────────────

#[test]
fn test_events_dropped_after_shutdown() {
    let mut state = mock_state(MockMode::HappyHare);
    state.begin_shutdown();
    let unload = state.with_backend(0, |b| b.unload_filament());
    assert!(unload.is_some_and(|r| r.is_success()));

    std::thread::sleep(Duration::from_millis(100));
    assert_eq!(state.process_events(), 0);
    // Cells still show the pre-shutdown state.
    assert_eq!(state.int_value("ams_filament_loaded"), Some(1));
}

#[test]
fn test_deinit_releases_backends() {
    let mut state = mock_state(MockMode::Afc);
    assert!(state.subjects_mut().observe_int("ams_slot_count", |_| {}));
    assert_eq!(state.subjects().slot_count.observer_count(), 1);

    state.deinit_subjects();
    assert_eq!(state.backend_count(), 0);
    assert!(!state.is_available());
    assert_eq!(state.subjects().slot_count.observer_count(), 0);
    assert_eq!(state.string_value("ams_system_name"), Some(""));
}

#[test]
fn test_state_from_config_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[mock]
enabled = true
slot_count = 4
mode = "afc"
realistic = false
operation_delay_ms = 20
sim_speedup = 100.0
dryer = true
"#
    )
    .unwrap();
    file.flush().unwrap();

    let config = AmsConfig::load(file.path()).unwrap();
    assert!(config.validate().is_ok());
    let state = state_from_config(config);
    assert_eq!(state.int_value("ams_type"), Some(AmsType::Afc as i32));
    assert_eq!(state.int_value("ams_slot_count"), Some(4));
    assert_eq!(state.int_value("dryer_supported"), Some(1));
}
