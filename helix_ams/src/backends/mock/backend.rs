//! Mock backend implementation.
//!
//! `AmsBackendMock` simulates a multi-material system without hardware.
//! Operations are accepted synchronously and completed on a background
//! operation thread that walks through the same phases real firmware
//! reports (heating, cutting, segment-by-segment filament movement,
//! purging). Every wait on that thread is interruptible by `cancel()` and
//! by drop.
//!
//! # Threads
//!
//! | Thread | Started by | Stopped by |
//! |--------|------------|------------|
//! | operation | load / unload / tool change / reset / recover | cancel, next operation, drop |
//! | dryer | `start_drying` | `stop_drying`, drop |
//! | scenario | `start` with a "loading" or "bypass" scenario | drop |
//!
//! State mutations from the operation thread happen under the state lock
//! and are skipped once the operation was cancelled, so a cancelled
//! sequence never overwrites the `Idle` set by `cancel()`.

use super::timing::{
    CHECKING_BASE_MS, CHECKING_VARIANCE, CUTTING_BASE_MS, HEATING_BASE_MS, HEATING_VARIANCE,
    LOADING_VARIANCE, PURGING_BASE_MS, PURGING_VARIANCE, SEGMENT_ANIMATION_BASE_MS,
    SELECTING_BASE_MS, SELECTING_VARIANCE, TIP_VARIANCE, effective_delay_ms,
};
use crate::backend::{AmsBackend, GcodeResponseSink};
use helix_common::ams::device::{
    ActionValue, DeviceAction, DeviceSection, EndlessSpoolCapabilities, EndlessSpoolConfig,
    ToolMappingCapabilities,
};
use helix_common::ams::dryer::DryerInfo;
use helix_common::ams::{
    AmsAction, AmsError, AmsEvent, AmsResult, AmsSystemInfo, AmsType, AmsUnit, BYPASS_SLOT,
    BufferHealth, EventSink, MAX_MOCK_SLOTS, PathSegment, PathTopology, SlotError,
    SlotErrorSeverity, SlotInfo, SlotStatus,
};
use helix_common::defaults::{afc_default_capabilities, hh_default_actions, hh_default_sections};
use helix_common::filament;
use helix_common::slot_registry::SlotRegistry;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

// ─── Sample Data ────────────────────────────────────────────────────

struct SampleFilament {
    color: u32,
    color_name: &'static str,
    material: &'static str,
    brand: &'static str,
}

/// Matches Spoolman mock spools 1-8.
const SAMPLE_FILAMENTS: [SampleFilament; 8] = [
    SampleFilament { color: 0x1A1A2E, color_name: "Jet Black", material: "PLA", brand: "Polymaker" },
    SampleFilament { color: 0x26DCD9, color_name: "Silk Blue", material: "Silk PLA", brand: "eSUN" },
    SampleFilament { color: 0x00AEFF, color_name: "Pop Blue", material: "ASA", brand: "Elegoo" },
    SampleFilament { color: 0xD20000, color_name: "Fire Engine Red", material: "ABS", brand: "Flashforge" },
    SampleFilament { color: 0xF4E111, color_name: "Signal Yellow", material: "PETG", brand: "Kingroon" },
    SampleFilament { color: 0xE8E8E8, color_name: "Clear", material: "TPU", brand: "Overture" },
    SampleFilament { color: 0x8A949E, color_name: "Gray", material: "ASA", brand: "Bambu Lab" },
    SampleFilament { color: 0xA2AAAD, color_name: "Grey", material: "PC", brand: "Polymaker" },
];

/// Spool fill levels, spread out so the UI shows every gauge state.
const FILL_LEVELS: [f32; 8] = [1.0, 0.75, 0.40, 0.10, 0.90, 0.50, 0.25, 0.05];

const SAMPLE_SPOOL_WEIGHT_G: f32 = 1000.0;

const LOAD_SEQUENCE: [PathSegment; 7] = [
    PathSegment::Spool,
    PathSegment::Prep,
    PathSegment::Lane,
    PathSegment::Hub,
    PathSegment::Output,
    PathSegment::Toolhead,
    PathSegment::Nozzle,
];

const UNLOAD_SEQUENCE: [PathSegment; 8] = [
    PathSegment::Nozzle,
    PathSegment::Toolhead,
    PathSegment::Output,
    PathSegment::Hub,
    PathSegment::Lane,
    PathSegment::Prep,
    PathSegment::Spool,
    PathSegment::None,
];

/// Delay before a start scenario fires, so the UI can settle first.
const SCENARIO_DELAY_MS: u64 = 500;

const CALIBRATION_PROMPT: [&str; 14] = [
    "// action:prompt_begin AFC Calibration",
    "// action:prompt_text Lane calibration measures bowden tube length",
    "// action:prompt_text for accurate filament loading distances.",
    "// action:prompt_text ",
    "// action:prompt_text Select a lane to calibrate, or calibrate all lanes.",
    "// action:prompt_button_group_start",
    "// action:prompt_button Lane 1|RESPOND msg=\"AFC_CALIBRATION LANE=lane1\"|primary",
    "// action:prompt_button Lane 2|RESPOND msg=\"AFC_CALIBRATION LANE=lane2\"|primary",
    "// action:prompt_button Lane 3|RESPOND msg=\"AFC_CALIBRATION LANE=lane3\"|primary",
    "// action:prompt_button Lane 4|RESPOND msg=\"AFC_CALIBRATION LANE=lane4\"|primary",
    "// action:prompt_button_group_end",
    "// action:prompt_button Calibrate All|RESPOND msg=\"AFC_CALIBRATION ALL=1\"|secondary",
    "// action:prompt_footer_button Cancel|RESPOND msg=\"AFC_CALIBRATION CANCEL=1\"|error",
    "// action:prompt_show",
];

// ─── State ──────────────────────────────────────────────────────────

/// Everything behind the state lock.
pub(super) struct MockState {
    /// Non-slot metadata; slots and tool map come from `slots`.
    pub(super) info: AmsSystemInfo,
    pub(super) slots: SlotRegistry,
    pub(super) segment: PathSegment,
    pub(super) error_segment: PathSegment,
    pub(super) topology: PathTopology,
    /// Per-unit topology override (mixed mode).
    pub(super) unit_topologies: Vec<PathTopology>,

    pub(super) operation_delay_ms: u32,
    pub(super) realistic: bool,
    pub(super) sim_speedup: f64,

    pub(super) tool_changer_mode: bool,
    pub(super) afc_mode: bool,
    pub(super) multi_unit_mode: bool,
    pub(super) mixed_topology_mode: bool,

    pub(super) endless_spool_supported: bool,
    pub(super) endless_spool_editable: bool,
    pub(super) tool_mapping_supported: bool,

    pub(super) device_sections: Vec<DeviceSection>,
    pub(super) device_actions: Vec<DeviceAction>,
    pub(super) last_action: Option<(String, Option<ActionValue>)>,

    pub(super) dryer: DryerInfo,
    pub(super) dryer_enabled: bool,
    /// Simulated seconds per real second.
    pub(super) dryer_speed: i32,

    pub(super) scenario: String,
    pub(super) event_sink: Option<EventSink>,
    pub(super) gcode_sink: Option<GcodeResponseSink>,
}

impl MockState {
    fn new(slot_count: usize) -> Self {
        let slot_count = slot_count.clamp(1, MAX_MOCK_SLOTS);

        let mut info = AmsSystemInfo {
            ams_type: AmsType::HappyHare,
            type_name: "Happy Hare (Mock)".to_string(),
            version: "2.7.0-mock".to_string(),
            ..AmsSystemInfo::default()
        };
        afc_default_capabilities().apply_to(&mut info);
        info.has_hardware_bypass_sensor = false;

        let names: Vec<String> = (0..slot_count).map(|i| i.to_string()).collect();
        let mut slots = SlotRegistry::new();
        slots.initialize("Mock MMU", &names);

        for i in 0..slot_count {
            let Some(entry) = slots.get_mut(i as i32) else {
                continue;
            };
            let sample = &SAMPLE_FILAMENTS[i % SAMPLE_FILAMENTS.len()];
            let material = filament::material_or_default(sample.material);
            let slot = &mut entry.info;
            slot.status = SlotStatus::Available;
            slot.color_rgb = sample.color;
            slot.color_name = sample.color_name.to_string();
            slot.material = sample.material.to_string();
            slot.brand = sample.brand.to_string();
            slot.spoolman_id = i as i32 + 1;
            slot.spool_name = format!("{} {}", sample.color_name, sample.material);
            slot.total_weight_g = SAMPLE_SPOOL_WEIGHT_G;
            slot.remaining_weight_g = SAMPLE_SPOOL_WEIGHT_G * FILL_LEVELS[i % FILL_LEVELS.len()];
            slot.nozzle_temp_min = material.nozzle_min;
            slot.nozzle_temp_max = material.nozzle_max;
            slot.bed_temp = material.bed_temp;
        }
        let identity: Vec<i32> = (0..slot_count as i32).collect();
        slots.set_tool_map(&identity);

        info.units.push(AmsUnit {
            unit_index: 0,
            name: "Mock MMU".to_string(),
            slot_count: slot_count as i32,
            connected: true,
            firmware_version: "mock-1.0".to_string(),
            has_encoder: true,
            has_toolhead_sensor: true,
            has_slot_sensors: true,
            ..AmsUnit::default()
        });

        // Slot 0 starts loaded, slot 3 empty.
        if let Some(entry) = slots.get_mut(0) {
            entry.info.status = SlotStatus::Loaded;
        }
        info.current_slot = 0;
        info.current_tool = 0;
        info.filament_loaded = true;
        if slot_count > 3 {
            if let Some(entry) = slots.get_mut(3) {
                entry.info.status = SlotStatus::Empty;
            }
        }

        Self {
            info,
            slots,
            segment: PathSegment::Nozzle,
            error_segment: PathSegment::None,
            topology: PathTopology::Hub,
            unit_topologies: Vec::new(),
            operation_delay_ms: 500,
            realistic: true,
            sim_speedup: 1.0,
            tool_changer_mode: false,
            afc_mode: false,
            multi_unit_mode: false,
            mixed_topology_mode: false,
            endless_spool_supported: true,
            endless_spool_editable: true,
            tool_mapping_supported: true,
            device_sections: hh_default_sections(),
            device_actions: hh_default_actions(),
            last_action: None,
            dryer: DryerInfo::default(),
            dryer_enabled: false,
            dryer_speed: 60,
            scenario: String::new(),
            event_sink: None,
            gcode_sink: None,
        }
    }

    /// Registry slots plus the metadata overlay.
    fn snapshot(&self) -> AmsSystemInfo {
        let mut info = self.info.clone();
        if self.slots.is_initialized() {
            self.slots.build_system_info(&mut info);
        }
        info
    }

    fn max_slot(&self) -> i32 {
        self.slots.slot_count() as i32 - 1
    }

    fn ensure_idle(&self) -> Result<(), AmsError> {
        if self.info.action != AmsAction::Idle {
            return Err(AmsError::busy(self.info.action.as_str()));
        }
        Ok(())
    }

    fn ensure_slot(&self, slot: i32) -> Result<(), AmsError> {
        if !self.slots.is_valid_index(slot) {
            return Err(AmsError::invalid_slot(slot, self.max_slot()));
        }
        Ok(())
    }

    fn set_action(&mut self, action: AmsAction, detail: impl Into<String>) {
        self.info.action = action;
        self.info.operation_detail = detail.into();
    }

    fn set_idle(&mut self) {
        self.set_action(AmsAction::Idle, "");
    }

    fn finalize_load(&mut self, slot: i32, tool: i32) {
        self.info.filament_loaded = true;
        self.segment = PathSegment::Nozzle;
        if slot >= 0 {
            self.info.current_slot = slot;
            self.info.current_tool = tool;
            if let Some(entry) = self.slots.get_mut(slot) {
                entry.info.status = SlotStatus::Loaded;
            }
        }
        self.set_idle();
        self.info.pending_target_slot = -1;
    }

    fn finalize_unload(&mut self) {
        let slot = self.info.current_slot;
        if let Some(entry) = self.slots.get_mut(slot) {
            entry.info.status = SlotStatus::Available;
        }
        self.info.filament_loaded = false;
        self.info.current_slot = -1;
        self.segment = PathSegment::None;
    }

    /// Fault location for an injected error.
    fn error_segment_for(&self, result: AmsResult) -> PathSegment {
        match result {
            AmsResult::FilamentJam | AmsResult::EncoderError => PathSegment::Hub,
            AmsResult::SensorError | AmsResult::LoadFailed => PathSegment::Toolhead,
            AmsResult::SlotBlocked | AmsResult::SlotNotAvailable => PathSegment::Prep,
            _ => self.segment,
        }
    }
}

// ─── Operation Thread ───────────────────────────────────────────────

/// Work scheduled on the operation thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Load { slot: i32 },
    Unload { slot: i32 },
    ToolChange { tool: i32, slot: i32 },
    Reset,
    Recover,
}

impl Operation {
    fn completion_event(self) -> Option<AmsEvent> {
        match self {
            Self::Load { slot } => Some(AmsEvent::LoadComplete { slot }),
            Self::Unload { slot } => Some(AmsEvent::UnloadComplete { slot }),
            Self::ToolChange { tool, .. } => Some(AmsEvent::ToolChanged { tool }),
            Self::Reset | Self::Recover => None,
        }
    }
}

/// Timing parameters captured when an operation starts.
#[derive(Debug, Clone, Copy)]
struct PhaseTiming {
    realistic: bool,
    speedup: f64,
    operation_delay_ms: u32,
    purge: bool,
}

impl PhaseTiming {
    fn delay(&self, base_ms: u32, variance: f32) -> u64 {
        effective_delay_ms(base_ms, variance, self.speedup)
    }

    /// Delay between two segment steps of a load or unload.
    fn segment_step(&self) -> u64 {
        let total = if self.realistic {
            self.delay(SEGMENT_ANIMATION_BASE_MS, LOADING_VARIANCE)
        } else {
            self.delay(self.operation_delay_ms, 0.0)
        };
        total / 6
    }
}

/// Shared between the backend handle and its threads.
pub(super) struct MockCore {
    pub(super) state: Mutex<MockState>,
    running: AtomicBool,
    shutdown: AtomicBool,
    cancel_requested: AtomicBool,
    op_running: AtomicBool,
    pub(super) dryer_stop: AtomicBool,
    pub(super) dryer_running: AtomicBool,
    wake_lock: Mutex<()>,
    wake: Condvar,
    op_thread: Mutex<Option<JoinHandle<()>>>,
    pub(super) dryer_thread: Mutex<Option<JoinHandle<()>>>,
    scenario_thread: Mutex<Option<JoinHandle<()>>>,
}

impl MockCore {
    fn new(slot_count: usize) -> Self {
        Self {
            state: Mutex::new(MockState::new(slot_count)),
            running: AtomicBool::new(false),
            shutdown: AtomicBool::new(false),
            cancel_requested: AtomicBool::new(false),
            op_running: AtomicBool::new(false),
            dryer_stop: AtomicBool::new(false),
            dryer_running: AtomicBool::new(false),
            wake_lock: Mutex::new(()),
            wake: Condvar::new(),
            op_thread: Mutex::new(None),
            dryer_thread: Mutex::new(None),
            scenario_thread: Mutex::new(None),
        }
    }

    // ─── Signalling ─────────────────────────────────────────────────

    /// Send an event. The sink is cloned under the lock and used outside it.
    pub(super) fn emit(&self, event: AmsEvent) {
        let sink = self.state.lock().event_sink.clone();
        if let Some(sink) = sink {
            sink.emit(event);
        }
    }

    pub(super) fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    fn op_aborted(&self) -> bool {
        self.is_shutting_down() || self.cancel_requested.load(Ordering::SeqCst)
    }

    /// Wake every waiting thread. Callers set their flag first.
    pub(super) fn wake_all(&self) {
        let _guard = self.wake_lock.lock();
        self.wake.notify_all();
    }

    /// Sleep for `ms` unless `abort` becomes true. Returns false when
    /// interrupted.
    pub(super) fn sleep_unless(&self, ms: u64, abort: impl Fn() -> bool) -> bool {
        let deadline = Instant::now() + Duration::from_millis(ms);
        let mut guard = self.wake_lock.lock();
        while !abort() {
            if self.wake.wait_until(&mut guard, deadline).timed_out() {
                return !abort();
            }
        }
        false
    }

    fn op_sleep(&self, ms: u64) -> bool {
        self.sleep_unless(ms, || self.op_aborted())
    }

    /// Apply `f` unless the running operation was cancelled. Cancellation
    /// is flagged under the same lock, so the check cannot race it.
    fn update_live(&self, f: impl FnOnce(&mut MockState)) -> bool {
        let mut st = self.state.lock();
        if self.op_aborted() {
            return false;
        }
        f(&mut st);
        true
    }

    fn set_phase(&self, action: AmsAction, detail: String) -> bool {
        debug!("Mock phase: {} ({})", action, detail);
        if !self.update_live(|st| st.set_action(action, detail)) {
            return false;
        }
        self.emit(AmsEvent::StateChanged);
        true
    }

    fn ensure_running(&self) -> Result<(), AmsError> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(AmsError::not_connected("Mock backend not started"));
        }
        Ok(())
    }

    /// Run `check` under the state lock once the backend is running.
    fn accept<T>(
        &self,
        check: impl FnOnce(&mut MockState) -> Result<T, AmsError>,
    ) -> Result<T, AmsError> {
        self.ensure_running()?;
        let mut st = self.state.lock();
        check(&mut st)
    }

    // ─── Thread Management ──────────────────────────────────────────

    /// Join the operation thread if one is in flight. The exchange makes
    /// sure only one caller joins.
    fn join_operation_thread(&self) {
        if self.op_running.swap(false, Ordering::SeqCst) {
            let handle = self.op_thread.lock().take();
            if let Some(handle) = handle {
                let _ = handle.join();
            }
        }
    }

    fn schedule(self: &Arc<Self>, op: Operation) {
        self.join_operation_thread();
        if self.is_shutting_down() {
            return;
        }
        self.cancel_requested.store(false, Ordering::SeqCst);
        self.op_running.store(true, Ordering::SeqCst);

        let core = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name("ams-mock-op".to_string())
            .spawn(move || core.run_operation(op));
        match spawned {
            Ok(handle) => *self.op_thread.lock() = Some(handle),
            Err(e) => {
                warn!("Failed to spawn mock operation thread: {}", e);
                self.op_running.store(false, Ordering::SeqCst);
                self.state.lock().set_idle();
                self.emit(AmsEvent::StateChanged);
            }
        }
    }

    /// Signal every thread and join them. Joins whatever handle is left,
    /// regardless of the running flags.
    fn shutdown(&self) {
        self.shutdown.store(true, Ordering::SeqCst);
        self.dryer_stop.store(true, Ordering::SeqCst);
        self.wake_all();

        let scenario = self.scenario_thread.lock().take();
        if let Some(handle) = scenario {
            let _ = handle.join();
        }
        self.op_running.store(false, Ordering::SeqCst);
        let op = self.op_thread.lock().take();
        if let Some(handle) = op {
            let _ = handle.join();
        }
        self.dryer_running.store(false, Ordering::SeqCst);
        let dryer = self.dryer_thread.lock().take();
        if let Some(handle) = dryer {
            let _ = handle.join();
        }
    }

    // ─── Phase Executors ────────────────────────────────────────────

    fn run_operation(&self, op: Operation) {
        let timing = {
            let st = self.state.lock();
            PhaseTiming {
                realistic: st.realistic,
                speedup: st.sim_speedup,
                operation_delay_ms: st.operation_delay_ms,
                purge: st.info.supports_purge,
            }
        };

        let completed = match op {
            Operation::Load { slot } => self.execute_load(slot, slot, &timing),
            Operation::Unload { .. } => self.execute_unload(true, &timing),
            Operation::ToolChange { tool, slot } => self.execute_tool_change(tool, slot, &timing),
            Operation::Reset => {
                self.op_sleep(timing.delay(timing.operation_delay_ms, 0.0))
                    && self.update_live(MockState::set_idle)
            }
            Operation::Recover => self.execute_recovery(&timing),
        };

        if !completed || self.op_aborted() {
            debug!("Mock operation {:?} interrupted", op);
            return;
        }
        if let Some(event) = op.completion_event() {
            self.emit(event);
        }
        self.emit(AmsEvent::StateChanged);
    }

    fn execute_load(&self, slot: i32, tool: i32, timing: &PhaseTiming) -> bool {
        if timing.realistic {
            if !self.set_phase(AmsAction::Heating, "Heating nozzle for load".to_string())
                || !self.op_sleep(timing.delay(HEATING_BASE_MS, HEATING_VARIANCE))
            {
                return false;
            }
            if !self.set_phase(AmsAction::Loading, format!("Loading from slot {slot}")) {
                return false;
            }
        }

        let step = timing.segment_step();
        for segment in LOAD_SEQUENCE {
            let moved = self.update_live(|st| {
                st.segment = segment;
                st.info.current_slot = slot;
            });
            if !moved {
                return false;
            }
            self.emit(AmsEvent::StateChanged);
            if !self.op_sleep(step) {
                return false;
            }
        }

        if timing.realistic
            && timing.purge
            && (!self.set_phase(AmsAction::Purging, "Purging filament".to_string())
                || !self.op_sleep(timing.delay(PURGING_BASE_MS, PURGING_VARIANCE)))
        {
            return false;
        }

        self.update_live(|st| st.finalize_load(slot, tool))
    }

    /// `then_idle` is false inside a tool change so the system never looks
    /// idle between the unload and the load.
    fn execute_unload(&self, then_idle: bool, timing: &PhaseTiming) -> bool {
        if timing.realistic {
            if !self.set_phase(AmsAction::Heating, "Heating for cut".to_string())
                || !self.op_sleep(timing.delay(HEATING_BASE_MS / 2, HEATING_VARIANCE))
            {
                return false;
            }
            if !self.set_phase(AmsAction::Cutting, "Cutting filament".to_string())
                || !self.op_sleep(timing.delay(CUTTING_BASE_MS, TIP_VARIANCE))
            {
                return false;
            }
            if !self.set_phase(AmsAction::Unloading, "Retracting filament".to_string()) {
                return false;
            }
        }

        let step = timing.segment_step();
        for segment in UNLOAD_SEQUENCE {
            if !self.update_live(|st| st.segment = segment) {
                return false;
            }
            trace!("Unload step: segment={}, delay={}ms", segment, step);
            self.emit(AmsEvent::StateChanged);
            if !self.op_sleep(step) {
                return false;
            }
        }

        self.update_live(|st| {
            st.finalize_unload();
            if then_idle {
                st.set_idle();
            }
        })
    }

    fn execute_tool_change(&self, tool: i32, slot: i32, timing: &PhaseTiming) -> bool {
        if !self.execute_unload(false, timing) {
            return false;
        }

        if timing.realistic {
            if !self.set_phase(AmsAction::Selecting, format!("Selecting slot {slot}"))
                || !self.op_sleep(timing.delay(SELECTING_BASE_MS, SELECTING_VARIANCE))
            {
                return false;
            }
        } else if !self.set_phase(AmsAction::Loading, format!("Loading slot {slot}")) {
            return false;
        }

        self.execute_load(slot, tool, timing)
    }

    fn execute_recovery(&self, timing: &PhaseTiming) -> bool {
        if !self.set_phase(AmsAction::Checking, "Checking system state".to_string())
            || !self.op_sleep(timing.delay(CHECKING_BASE_MS, CHECKING_VARIANCE))
        {
            return false;
        }
        let recovered = self.update_live(|st| {
            st.set_idle();
            st.error_segment = PathSegment::None;
        });
        if recovered {
            info!("Mock recovery complete");
        }
        recovered
    }

    // ─── Operations Shared With The Scenario Thread ─────────────────

    fn load_filament(self: &Arc<Self>, slot: i32) -> AmsError {
        let accepted = self.accept(|st| {
            st.ensure_idle()?;
            st.ensure_slot(slot)?;
            if st
                .slots
                .get(slot)
                .is_none_or(|e| e.info.status == SlotStatus::Empty)
            {
                return Err(AmsError::slot_not_available(slot));
            }
            st.set_action(AmsAction::Loading, format!("Loading from slot {slot}"));
            st.segment = PathSegment::Spool;
            info!("Mock loading from slot {}", slot);
            Ok(())
        });
        if let Err(e) = accepted {
            return e;
        }

        self.emit(AmsEvent::StateChanged);
        self.schedule(Operation::Load { slot });
        AmsError::success()
    }

    fn enable_bypass(&self) -> AmsError {
        let accepted = self.accept(|st| {
            if !st.info.supports_bypass {
                return Err(AmsError::with_messages(
                    AmsResult::WrongState,
                    "Bypass not supported",
                    "This system does not support bypass mode",
                    "",
                ));
            }
            st.ensure_idle()?;
            st.info.current_slot = BYPASS_SLOT;
            st.info.filament_loaded = true;
            st.segment = PathSegment::Nozzle;
            info!("Mock bypass enabled");
            Ok(())
        });
        if let Err(e) = accepted {
            return e;
        }

        self.emit(AmsEvent::StateChanged);
        AmsError::success()
    }

    fn start(self: &Arc<Self>) -> AmsError {
        if self.running.swap(true, Ordering::SeqCst) {
            return AmsError::success();
        }
        // Consumed on first start; a restart does not replay it.
        let scenario = std::mem::take(&mut self.state.lock().scenario);
        debug!("Mock backend started");
        self.emit(AmsEvent::StateChanged);

        match scenario.as_str() {
            "" | "idle" => {}
            "error" => {
                self.inject_mock_errors();
                info!("Applied initial mock scenario: error");
            }
            "loading" => {
                self.state.lock().realistic = true;
                self.spawn_scenario(|core| {
                    let _ = core.load_filament(1);
                });
                info!("Applied initial mock scenario: loading");
            }
            "bypass" => {
                self.spawn_scenario(|core| {
                    let _ = core.enable_bypass();
                });
                info!("Applied initial mock scenario: bypass");
            }
            other => warn!("Unknown mock scenario '{}', ignoring", other),
        }
        AmsError::success()
    }

    /// Run `action` after the scenario delay unless the backend stopped or
    /// is being dropped in the meantime.
    fn spawn_scenario(self: &Arc<Self>, action: fn(&Arc<MockCore>)) {
        let previous = self.scenario_thread.lock().take();
        if let Some(handle) = previous {
            let _ = handle.join();
        }
        let core = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name("ams-mock-scenario".to_string())
            .spawn(move || {
                let waited = core.sleep_unless(SCENARIO_DELAY_MS, || core.is_shutting_down());
                if waited && core.running.load(Ordering::SeqCst) {
                    action(&core);
                }
            });
        match spawned {
            Ok(handle) => *self.scenario_thread.lock() = Some(handle),
            Err(e) => warn!("Failed to spawn mock scenario thread: {}", e),
        }
    }

    fn inject_mock_errors(&self) {
        let mut st = self.state.lock();
        let afc = st.afc_mode;
        for unit in 0..st.slots.unit_count() {
            let (first, end) = st.slots.unit_slot_range(unit);
            if first < end {
                if let Some(entry) = st.slots.get_mut(end - 1) {
                    entry.info.error = Some(SlotError::new(
                        format!("Lane {} load failed", entry.info.slot_index + 1),
                        SlotErrorSeverity::Error,
                    ));
                }
            }
            if afc && unit == 0 {
                if let Some(meta) = st.info.units.get_mut(0) {
                    meta.buffer_health = Some(BufferHealth {
                        fault_detection_enabled: true,
                        distance_to_fault: 12.5,
                        state: "Trailing".to_string(),
                    });
                }
            }
        }
        info!("Injected mock errors on {} units", st.slots.unit_count());
    }
}

// ─── Backend Handle ─────────────────────────────────────────────────

/// Simulation backend.
///
/// # Example
///
/// ```rust,no_run
/// use helix_ams::{AmsBackend, AmsBackendMock};
///
/// let mock = AmsBackendMock::new(4);
/// mock.set_realistic_mode(false);
/// mock.set_operation_delay(10);
/// mock.start();
/// assert!(mock.load_filament(1).is_success());
/// ```
pub struct AmsBackendMock {
    pub(super) core: Arc<MockCore>,
}

impl AmsBackendMock {
    /// Create a Happy Hare style mock with `slot_count` slots (clamped to
    /// 1..=16). Slot 0 starts loaded; slot 3 is empty.
    pub fn new(slot_count: usize) -> Self {
        debug!("Mock backend created with {} slots", slot_count);
        Self {
            core: Arc::new(MockCore::new(slot_count)),
        }
    }

    // ─── Configuration ──────────────────────────────────────────────

    /// Base delay for simple-mode operations.
    pub fn set_operation_delay(&self, delay_ms: u32) {
        self.core.state.lock().operation_delay_ms = delay_ms;
    }

    /// Multi-phase timing on or off.
    pub fn set_realistic_mode(&self, enabled: bool) {
        self.core.state.lock().realistic = enabled;
        info!("Mock realistic mode {}", if enabled { "enabled" } else { "disabled" });
    }

    pub fn is_realistic_mode(&self) -> bool {
        self.core.state.lock().realistic
    }

    /// Divide every simulated delay by `speedup`. Non-positive values mean
    /// real time.
    pub fn set_sim_speedup(&self, speedup: f64) {
        self.core.state.lock().sim_speedup = if speedup > 0.0 { speedup } else { 1.0 };
    }

    pub fn sim_speedup(&self) -> f64 {
        self.core.state.lock().sim_speedup
    }

    /// Scenario applied on the first `start()`: "", "idle", "loading",
    /// "bypass" or "error".
    pub fn set_initial_state_scenario(&self, scenario: &str) {
        self.core.state.lock().scenario = scenario.to_string();
        debug!("Mock initial scenario set to '{}'", scenario);
    }

    pub fn set_has_hardware_bypass_sensor(&self, has_sensor: bool) {
        self.core.state.lock().info.has_hardware_bypass_sensor = has_sensor;
    }

    pub fn set_endless_spool_supported(&self, supported: bool) {
        let mut st = self.core.state.lock();
        st.endless_spool_supported = supported;
        st.info.supports_endless_spool = supported;
    }

    /// Per-slot editing (AFC) versus read-only groups (Happy Hare).
    pub fn set_endless_spool_editable(&self, editable: bool) {
        self.core.state.lock().endless_spool_editable = editable;
    }

    pub fn set_tool_mapping_supported(&self, supported: bool) {
        let mut st = self.core.state.lock();
        st.tool_mapping_supported = supported;
        st.info.supports_tool_mapping = supported;
    }

    pub fn set_device_sections(&self, sections: Vec<DeviceSection>) {
        self.core.state.lock().device_sections = sections;
    }

    pub fn set_device_actions(&self, actions: Vec<DeviceAction>) {
        self.core.state.lock().device_actions = actions;
    }

    /// Last `execute_device_action` call, for test verification.
    pub fn last_executed_action(&self) -> Option<(String, Option<ActionValue>)> {
        self.core.state.lock().last_action.clone()
    }

    pub fn clear_last_executed_action(&self) {
        self.core.state.lock().last_action = None;
    }

    // ─── Fault Injection ────────────────────────────────────────────

    /// Put the system into `Error` and emit `Error` + `StateChanged`.
    pub fn simulate_error(&self, result: AmsResult) {
        {
            let mut st = self.core.state.lock();
            st.set_action(AmsAction::Error, result.as_str());
            st.error_segment = st.error_segment_for(result);
            warn!("Mock error injected: {}", result);
        }
        self.core.emit(AmsEvent::Error {
            result,
            message: result.as_str().to_string(),
        });
        self.core.emit(AmsEvent::StateChanged);
    }

    /// Pause waiting for the user.
    pub fn simulate_pause(&self) {
        self.core
            .state
            .lock()
            .set_action(AmsAction::Paused, "User intervention required");
        info!("Mock paused");
        self.core.emit(AmsEvent::StateChanged);
    }

    /// Leave `Paused`. Idle is a no-op; any other state is rejected.
    pub fn resume(&self) -> AmsError {
        let accepted = self.core.accept(|st| {
            match st.info.action {
                AmsAction::Idle => return Ok(false),
                AmsAction::Paused => {}
                other => {
                    return Err(AmsError::with_messages(
                        AmsResult::WrongState,
                        "Cannot resume - not in PAUSED state",
                        format!("System is {other}"),
                        "Wait for current operation to complete or use cancel",
                    ));
                }
            }
            st.set_idle();
            info!("Mock resumed from pause");
            Ok(true)
        });
        match accepted {
            Ok(true) => {
                self.core.emit(AmsEvent::StateChanged);
                AmsError::success()
            }
            Ok(false) => AmsError::success(),
            Err(e) => e,
        }
    }

    pub fn force_slot_status(&self, slot: i32, status: SlotStatus) {
        if let Some(entry) = self.core.state.lock().slots.get_mut(slot) {
            entry.info.status = status;
            debug!("Forced slot {} status to {}", slot, status);
        }
    }

    pub fn set_slot_error(&self, slot: i32, error: Option<SlotError>) {
        if let Some(entry) = self.core.state.lock().slots.get_mut(slot) {
            entry.info.error = error;
        }
    }

    pub fn set_unit_buffer_health(&self, unit: i32, health: Option<BufferHealth>) {
        let mut st = self.core.state.lock();
        if let Some(meta) = usize::try_from(unit).ok().and_then(|u| st.info.units.get_mut(u)) {
            meta.buffer_health = health;
        }
    }

    /// Slot errors on the last lane of every unit, plus a buffer warning on
    /// the first AFC unit.
    pub fn inject_mock_errors(&self) {
        self.core.inject_mock_errors();
    }
}

impl Default for AmsBackendMock {
    fn default() -> Self {
        Self::new(4)
    }
}

impl Drop for AmsBackendMock {
    fn drop(&mut self) {
        self.core.shutdown();
    }
}

impl AmsBackend for AmsBackendMock {
    // ─── Lifecycle ──────────────────────────────────────────────────

    fn start(&self) -> AmsError {
        self.core.start()
    }

    fn stop(&self) {
        self.core.running.store(false, Ordering::SeqCst);
    }

    fn is_running(&self) -> bool {
        self.core.running.load(Ordering::SeqCst)
    }

    fn set_event_sink(&self, sink: Option<EventSink>) {
        self.core.state.lock().event_sink = sink;
    }

    // ─── Queries ────────────────────────────────────────────────────

    fn get_system_info(&self) -> AmsSystemInfo {
        self.core.state.lock().snapshot()
    }

    fn get_type(&self) -> AmsType {
        self.core.state.lock().info.ams_type
    }

    fn get_slot_info(&self, slot: i32) -> SlotInfo {
        self.core
            .state
            .lock()
            .slots
            .get(slot)
            .map_or_else(SlotInfo::invalid, |e| e.info.clone())
    }

    fn get_current_action(&self) -> AmsAction {
        self.core.state.lock().info.action
    }

    fn get_current_tool(&self) -> i32 {
        self.core.state.lock().info.current_tool
    }

    fn get_current_slot(&self) -> i32 {
        self.core.state.lock().info.current_slot
    }

    fn is_filament_loaded(&self) -> bool {
        self.core.state.lock().info.filament_loaded
    }

    fn get_topology(&self) -> PathTopology {
        self.core.state.lock().topology
    }

    fn get_unit_topology(&self, unit: i32) -> PathTopology {
        let st = self.core.state.lock();
        usize::try_from(unit)
            .ok()
            .and_then(|u| st.unit_topologies.get(u).copied())
            .unwrap_or(st.topology)
    }

    fn get_filament_segment(&self) -> PathSegment {
        self.core.state.lock().segment
    }

    fn get_slot_filament_segment(&self, slot: i32) -> PathSegment {
        let st = self.core.state.lock();
        if slot == st.info.current_slot && st.info.filament_loaded {
            return st.segment;
        }
        let Some(entry) = st.slots.get(slot) else {
            return PathSegment::None;
        };
        match entry.info.status {
            // Tool changers keep every tool primed to the nozzle.
            SlotStatus::Available | SlotStatus::FromBuffer if st.tool_changer_mode => {
                PathSegment::Nozzle
            }
            SlotStatus::Available | SlotStatus::FromBuffer => PathSegment::Prep,
            _ => PathSegment::None,
        }
    }

    fn infer_error_segment(&self) -> PathSegment {
        self.core.state.lock().error_segment
    }

    fn is_bypass_active(&self) -> bool {
        self.core.state.lock().info.current_slot == BYPASS_SLOT
    }

    fn slot_has_prep_sensor(&self, slot: i32) -> bool {
        self.core.state.lock().slots.is_valid_index(slot)
    }

    // ─── Operations ─────────────────────────────────────────────────

    fn load_filament(&self, slot: i32) -> AmsError {
        self.core.load_filament(slot)
    }

    fn unload_filament(&self) -> AmsError {
        let accepted = self.core.accept(|st| {
            st.ensure_idle()?;
            if !st.info.filament_loaded {
                return Err(AmsError::with_messages(
                    AmsResult::WrongState,
                    "No filament loaded",
                    "No filament to unload",
                    "Load filament first",
                ));
            }
            st.set_action(AmsAction::Unloading, "Unloading filament");
            st.segment = PathSegment::Nozzle;
            info!("Mock unloading filament");
            Ok(st.info.current_slot)
        });
        match accepted {
            Ok(slot) => {
                self.core.emit(AmsEvent::StateChanged);
                self.core.schedule(Operation::Unload { slot });
                AmsError::success()
            }
            Err(e) => e,
        }
    }

    fn select_slot(&self, slot: i32) -> AmsError {
        let accepted = self.core.accept(|st| {
            st.ensure_idle()?;
            st.ensure_slot(slot)?;
            st.info.current_slot = slot;
            info!("Mock selected slot {}", slot);
            Ok(())
        });
        if let Err(e) = accepted {
            return e;
        }
        self.core.emit(AmsEvent::StateChanged);
        AmsError::success()
    }

    fn change_tool(&self, tool: i32) -> AmsError {
        let accepted = self.core.accept(|st| {
            st.ensure_idle()?;
            let slot = st.slots.slot_for_tool(tool);
            if slot < 0 {
                return Err(AmsError::with_messages(
                    AmsResult::InvalidTool,
                    format!("Tool {tool} out of range"),
                    "Invalid tool number",
                    "Select a valid tool",
                ));
            }
            st.set_action(AmsAction::Unloading, format!("Tool change to T{tool}"));
            st.info.pending_target_slot = slot;
            info!("Mock tool change to T{} (slot {})", tool, slot);
            Ok(slot)
        });
        match accepted {
            Ok(slot) => {
                self.core.emit(AmsEvent::StateChanged);
                self.core.schedule(Operation::ToolChange { tool, slot });
                AmsError::success()
            }
            Err(e) => e,
        }
    }

    fn recover(&self) -> AmsError {
        let realistic = {
            if let Err(e) = self.core.ensure_running() {
                return e;
            }
            let mut st = self.core.state.lock();
            if !st.realistic {
                st.set_idle();
                st.error_segment = PathSegment::None;
                info!("Mock recovery complete");
            } else {
                // Recovery supersedes whatever is still in flight. The action
                // is claimed here so new operations see BUSY until it ends.
                self.core.cancel_requested.store(true, Ordering::SeqCst);
                st.set_action(AmsAction::Checking, "Checking system state");
                info!("Mock recovery sequence starting");
            }
            st.realistic
        };

        self.core.wake_all();
        self.core.emit(AmsEvent::StateChanged);
        if realistic {
            self.core.schedule(Operation::Recover);
        }
        AmsError::success()
    }

    fn reset(&self) -> AmsError {
        let accepted = self.core.accept(|st| {
            st.ensure_idle()?;
            st.set_action(AmsAction::Resetting, "Resetting system");
            info!("Mock resetting");
            Ok(())
        });
        if let Err(e) = accepted {
            return e;
        }
        self.core.emit(AmsEvent::StateChanged);
        self.core.schedule(Operation::Reset);
        AmsError::success()
    }

    fn reset_lane(&self, slot: i32) -> AmsError {
        {
            let mut st = self.core.state.lock();
            if let Err(e) = st.ensure_slot(slot) {
                return e;
            }
            if let Some(entry) = st.slots.get_mut(slot) {
                entry.info.error = None;
                if entry.info.status == SlotStatus::Blocked {
                    entry.info.status = SlotStatus::Available;
                }
            }
            info!("Mock lane {} reset", slot);
        }
        self.core.emit(AmsEvent::StateChanged);
        AmsError::success()
    }

    fn cancel(&self) -> AmsError {
        {
            let mut st = self.core.state.lock();
            if st.info.action == AmsAction::Idle {
                return AmsError::success();
            }
            st.set_idle();
            self.core.cancel_requested.store(true, Ordering::SeqCst);
            info!("Mock operation cancelled");
        }
        self.core.wake_all();
        self.core.emit(AmsEvent::StateChanged);
        AmsError::success()
    }

    fn set_slot_info(&self, slot: i32, info: &SlotInfo, _persist: bool) -> AmsError {
        {
            let mut st = self.core.state.lock();
            if let Err(e) = st.ensure_slot(slot) {
                return e;
            }
            if let Some(entry) = st.slots.get_mut(slot) {
                entry.info.copy_filament_from(info);
            }
            trace!("Mock slot {} info updated", slot);
        }
        self.core.emit(AmsEvent::SlotChanged { slot });
        AmsError::success()
    }

    fn set_tool_mapping(&self, tool: i32, slot: i32) -> AmsError {
        let mut st = self.core.state.lock();
        let tool_count = st.slots.tool_map().len().max(st.slots.slot_count()) as i32;
        if !(0..tool_count).contains(&tool) {
            return AmsError::with_messages(
                AmsResult::InvalidTool,
                format!("Tool {tool} out of range"),
                "Invalid tool number",
                "",
            );
        }
        if let Err(e) = st.ensure_slot(slot) {
            return e;
        }
        // One tool per slot: the slot's previous tool becomes unmapped.
        st.slots.set_tool_mapping(slot, tool);
        info!("Mock mapped T{} to slot {}", tool, slot);
        AmsError::success()
    }

    fn enable_bypass(&self) -> AmsError {
        self.core.enable_bypass()
    }

    fn disable_bypass(&self) -> AmsError {
        let accepted = self.core.accept(|st| {
            if st.info.current_slot != BYPASS_SLOT {
                return Err(AmsError::with_messages(
                    AmsResult::WrongState,
                    "Bypass not active",
                    "Bypass mode is not currently active",
                    "",
                ));
            }
            st.info.current_slot = -1;
            st.info.filament_loaded = false;
            st.segment = PathSegment::None;
            info!("Mock bypass disabled");
            Ok(())
        });
        if let Err(e) = accepted {
            return e;
        }
        self.core.emit(AmsEvent::StateChanged);
        AmsError::success()
    }

    // ─── Dryer ──────────────────────────────────────────────────────

    fn get_dryer_info(&self) -> DryerInfo {
        self.core.state.lock().dryer.clone()
    }

    fn start_drying(&self, temp_c: f32, duration_min: i32, fan_pct: i32) -> AmsError {
        self.core.start_drying(temp_c, duration_min, fan_pct)
    }

    fn stop_drying(&self) -> AmsError {
        self.core.stop_drying()
    }

    fn update_drying(&self, temp_c: f32, duration_min: i32, fan_pct: i32) -> AmsError {
        self.core.update_drying(temp_c, duration_min, fan_pct)
    }

    // ─── Endless Spool & Tool Mapping ───────────────────────────────

    fn get_endless_spool_capabilities(&self) -> EndlessSpoolCapabilities {
        let st = self.core.state.lock();
        let supported = st.endless_spool_supported;
        let editable = supported && st.endless_spool_editable;
        let description = match (supported, editable) {
            (false, _) => "",
            (true, true) => "Per-slot backup (AFC-style)",
            (true, false) => "Group-based (Happy Hare-style)",
        };
        EndlessSpoolCapabilities {
            supported,
            editable,
            description: description.to_string(),
        }
    }

    fn get_endless_spool_config(&self) -> Vec<EndlessSpoolConfig> {
        let st = self.core.state.lock();
        (0..st.slots.slot_count() as i32)
            .map(|slot| EndlessSpoolConfig {
                slot_index: slot,
                backup_slot: st.slots.backup_for_slot(slot),
            })
            .collect()
    }

    fn set_endless_spool_backup(&self, slot: i32, backup_slot: i32) -> AmsError {
        let mut st = self.core.state.lock();
        if !st.endless_spool_supported {
            return AmsError::not_supported("Endless spool");
        }
        if !st.endless_spool_editable {
            return AmsError::not_supported("Endless spool configuration");
        }
        if let Err(e) = st.ensure_slot(slot) {
            return e;
        }
        if backup_slot == slot {
            return AmsError::with_messages(
                AmsResult::InvalidSlot,
                format!("Cannot set slot {slot} as its own backup"),
                "Invalid backup configuration",
                "Select a different slot as backup",
            );
        }
        if backup_slot != -1 && !st.slots.is_valid_index(backup_slot) {
            return AmsError::invalid_slot(backup_slot, st.max_slot());
        }
        st.slots.set_backup(slot, backup_slot);
        info!("Mock slot {} backup set to {}", slot, backup_slot);
        AmsError::success()
    }

    fn reset_tool_mappings(&self) -> AmsError {
        let mut st = self.core.state.lock();
        let identity: Vec<i32> = (0..st.slots.slot_count() as i32).collect();
        st.slots.set_tool_map(&identity);
        info!("Mock tool mappings reset to 1:1");
        AmsError::success()
    }

    fn reset_endless_spool(&self) -> AmsError {
        let mut st = self.core.state.lock();
        for slot in 0..st.slots.slot_count() as i32 {
            st.slots.set_backup(slot, -1);
        }
        info!("Mock endless spool backups cleared");
        AmsError::success()
    }

    fn get_tool_mapping_capabilities(&self) -> ToolMappingCapabilities {
        let st = self.core.state.lock();
        if st.tool_changer_mode || !st.tool_mapping_supported {
            return ToolMappingCapabilities::default();
        }
        ToolMappingCapabilities {
            supported: true,
            editable: true,
            description: "Mock tool-to-slot mapping".to_string(),
        }
    }

    fn get_tool_mapping(&self) -> Vec<i32> {
        let st = self.core.state.lock();
        if st.tool_changer_mode {
            return Vec::new();
        }
        st.slots.tool_map()
    }

    // ─── Device Actions ─────────────────────────────────────────────

    fn get_device_sections(&self) -> Vec<DeviceSection> {
        self.core.state.lock().device_sections.clone()
    }

    fn get_device_actions(&self) -> Vec<DeviceAction> {
        self.core.state.lock().device_actions.clone()
    }

    fn execute_device_action(&self, action_id: &str, value: Option<ActionValue>) -> AmsError {
        let mut st = self.core.state.lock();
        st.last_action = Some((action_id.to_string(), value.clone()));

        if action_id == "calibration_wizard" {
            let Some(sink) = st.gcode_sink.clone() else {
                warn!("Calibration wizard: no G-code response sink, skipping");
                return AmsError::success();
            };
            drop(st);
            info!("Simulating AFC calibration prompt");
            for line in CALIBRATION_PROMPT {
                sink(line);
            }
            return AmsError::success();
        }

        let Some(action) = st.device_actions.iter_mut().find(|a| a.id == action_id) else {
            return AmsError::not_supported(&format!("Unknown action: {action_id}"));
        };
        if !action.enabled {
            return AmsError::not_supported(&action.disable_reason);
        }
        if value.is_some() {
            action.current_value = value;
        }
        info!("Mock executed device action {}", action_id);
        AmsError::success()
    }

    fn set_gcode_response_sink(&self, sink: Option<GcodeResponseSink>) {
        let mut st = self.core.state.lock();
        debug!(
            "Mock G-code response sink {}",
            if sink.is_some() { "set" } else { "cleared" }
        );
        st.gcode_sink = sink;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quick_mock(slots: usize) -> AmsBackendMock {
        let mock = AmsBackendMock::new(slots);
        mock.set_realistic_mode(false);
        mock.set_operation_delay(0);
        mock
    }

    #[test]
    fn test_construction_defaults() {
        let mock = AmsBackendMock::new(4);
        let info = mock.get_system_info();
        assert_eq!(info.ams_type, AmsType::HappyHare);
        assert_eq!(info.type_name, "Happy Hare (Mock)");
        assert_eq!(info.total_slots, 4);
        assert_eq!(info.units.len(), 1);
        assert_eq!(info.units[0].name, "Mock MMU");
        assert_eq!(info.units[0].firmware_version, "mock-1.0");
        assert_eq!(info.tool_to_slot_map, vec![0, 1, 2, 3]);
        assert_eq!(info.current_slot, 0);
        assert!(info.filament_loaded);
        assert!(info.supports_bypass);
        assert!(!info.has_hardware_bypass_sensor);

        assert_eq!(mock.get_slot_info(0).status, SlotStatus::Loaded);
        assert_eq!(mock.get_slot_info(1).status, SlotStatus::Available);
        assert_eq!(mock.get_slot_info(3).status, SlotStatus::Empty);
        assert_eq!(mock.get_filament_segment(), PathSegment::Nozzle);
        assert!(mock.is_realistic_mode());
    }

    #[test]
    fn test_sample_filament_data() {
        let mock = AmsBackendMock::new(8);
        let slot = mock.get_slot_info(1);
        assert_eq!(slot.color_name, "Silk Blue");
        assert_eq!(slot.material, "Silk PLA");
        assert_eq!(slot.spoolman_id, 2);
        assert_eq!(slot.spool_name, "Silk Blue Silk PLA");
        assert_eq!(slot.remaining_weight_g, 750.0);
        assert_eq!(slot.nozzle_temp_min, 200);

        let pc = mock.get_slot_info(7);
        assert_eq!(pc.material, "PC");
        assert_eq!(pc.remaining_weight_g, 50.0);
    }

    #[test]
    fn test_slot_count_clamped() {
        assert_eq!(AmsBackendMock::new(0).get_system_info().total_slots, 1);
        assert_eq!(AmsBackendMock::new(40).get_system_info().total_slots, 16);
    }

    #[test]
    fn test_operations_require_start() {
        let mock = quick_mock(4);
        assert_eq!(mock.load_filament(1).result, AmsResult::NotConnected);
        assert_eq!(mock.unload_filament().result, AmsResult::NotConnected);
        assert_eq!(mock.change_tool(1).result, AmsResult::NotConnected);
        assert_eq!(mock.enable_bypass().result, AmsResult::NotConnected);
        assert_eq!(mock.resume().result, AmsResult::NotConnected);
    }

    #[test]
    fn test_load_guards() {
        let mock = quick_mock(4);
        assert!(mock.start().is_success());
        assert_eq!(mock.load_filament(9).result, AmsResult::InvalidSlot);
        assert_eq!(mock.load_filament(-1).result, AmsResult::InvalidSlot);
        assert_eq!(mock.load_filament(3).result, AmsResult::SlotNotAvailable);
        assert_eq!(mock.select_slot(7).result, AmsResult::InvalidSlot);
    }

    #[test]
    fn test_start_is_idempotent() {
        let mock = quick_mock(2);
        let (tx, rx) = std::sync::mpsc::channel();
        mock.set_event_sink(Some(EventSink::new(0, tx)));
        assert!(mock.start().is_success());
        assert!(mock.start().is_success());
        assert!(mock.is_running());
        let state_changes = rx
            .try_iter()
            .filter(|e| e.event == AmsEvent::StateChanged)
            .count();
        assert_eq!(state_changes, 1);
        mock.stop();
        assert!(!mock.is_running());
    }

    #[test]
    fn test_cancel_when_idle_is_noop() {
        let mock = quick_mock(4);
        mock.start();
        assert!(mock.cancel().is_success());
        assert_eq!(mock.get_current_action(), AmsAction::Idle);
    }

    #[test]
    fn test_simulate_error_infers_segment() {
        let mock = quick_mock(4);
        mock.simulate_error(AmsResult::FilamentJam);
        assert_eq!(mock.get_current_action(), AmsAction::Error);
        assert_eq!(mock.infer_error_segment(), PathSegment::Hub);

        mock.simulate_error(AmsResult::SlotBlocked);
        assert_eq!(mock.infer_error_segment(), PathSegment::Prep);

        mock.simulate_error(AmsResult::Timeout);
        assert_eq!(mock.infer_error_segment(), PathSegment::Nozzle);
    }

    #[test]
    fn test_simple_recover_clears_error() {
        let mock = quick_mock(4);
        mock.start();
        mock.simulate_error(AmsResult::LoadFailed);
        assert_eq!(mock.infer_error_segment(), PathSegment::Toolhead);
        assert!(mock.recover().is_success());
        assert_eq!(mock.get_current_action(), AmsAction::Idle);
        assert_eq!(mock.infer_error_segment(), PathSegment::None);
    }

    #[test]
    fn test_pause_and_resume() {
        let mock = quick_mock(4);
        mock.start();
        assert!(mock.resume().is_success());

        mock.simulate_pause();
        assert_eq!(mock.get_current_action(), AmsAction::Paused);
        assert!(mock.resume().is_success());
        assert_eq!(mock.get_current_action(), AmsAction::Idle);

        mock.simulate_error(AmsResult::FilamentJam);
        assert_eq!(mock.resume().result, AmsResult::WrongState);
    }

    #[test]
    fn test_bypass_toggle() {
        let mock = quick_mock(4);
        mock.start();
        assert_eq!(mock.disable_bypass().result, AmsResult::WrongState);
        assert!(mock.enable_bypass().is_success());
        assert!(mock.is_bypass_active());
        assert_eq!(mock.get_current_slot(), BYPASS_SLOT);
        assert!(mock.disable_bypass().is_success());
        assert!(!mock.is_bypass_active());
        assert!(!mock.is_filament_loaded());
    }

    #[test]
    fn test_slot_filament_segments() {
        let mock = quick_mock(4);
        assert_eq!(mock.get_slot_filament_segment(0), PathSegment::Nozzle);
        assert_eq!(mock.get_slot_filament_segment(1), PathSegment::Prep);
        assert_eq!(mock.get_slot_filament_segment(3), PathSegment::None);
        assert_eq!(mock.get_slot_filament_segment(42), PathSegment::None);
    }

    #[test]
    fn test_set_slot_info_keeps_status() {
        let mock = quick_mock(4);
        let update = SlotInfo {
            color_name: "Teal".to_string(),
            color_rgb: 0x008080,
            material: "PETG".to_string(),
            status: SlotStatus::Blocked,
            ..SlotInfo::default()
        };
        assert!(mock.set_slot_info(1, &update, true).is_success());
        let slot = mock.get_slot_info(1);
        assert_eq!(slot.color_rgb, 0x008080);
        assert_eq!(slot.status, SlotStatus::Available);
        assert_eq!(slot.slot_index, 1);
        assert_eq!(mock.set_slot_info(9, &update, true).result, AmsResult::InvalidSlot);
    }

    #[test]
    fn test_tool_mapping_edits() {
        let mock = quick_mock(4);
        assert!(mock.set_tool_mapping(0, 2).is_success());
        assert_eq!(mock.get_slot_info(2).mapped_tool, 0);
        assert_eq!(mock.get_slot_info(0).mapped_tool, -1);
        assert_eq!(mock.get_tool_mapping()[0], 2);
        assert_eq!(mock.set_tool_mapping(9, 1).result, AmsResult::InvalidTool);
        assert_eq!(mock.set_tool_mapping(1, 9).result, AmsResult::InvalidSlot);

        assert!(mock.reset_tool_mappings().is_success());
        assert_eq!(mock.get_tool_mapping(), vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_endless_spool_backup_rules() {
        let mock = quick_mock(4);
        let caps = mock.get_endless_spool_capabilities();
        assert!(caps.supported && caps.editable);
        assert_eq!(caps.description, "Per-slot backup (AFC-style)");

        assert!(mock.set_endless_spool_backup(0, 1).is_success());
        assert!(mock.set_endless_spool_backup(1, 2).is_success());
        assert_eq!(mock.set_endless_spool_backup(2, 2).result, AmsResult::InvalidSlot);
        assert_eq!(mock.set_endless_spool_backup(2, 8).result, AmsResult::InvalidSlot);
        assert!(mock.set_endless_spool_backup(1, -1).is_success());
        assert_eq!(mock.get_endless_spool_config()[0].backup_slot, 1);
        assert_eq!(mock.get_endless_spool_config()[1].backup_slot, -1);

        mock.set_endless_spool_editable(false);
        assert_eq!(
            mock.get_endless_spool_capabilities().description,
            "Group-based (Happy Hare-style)"
        );
        assert_eq!(mock.set_endless_spool_backup(0, 2).result, AmsResult::NotSupported);

        mock.set_endless_spool_supported(false);
        assert!(!mock.get_endless_spool_capabilities().supported);
        assert!(mock.reset_endless_spool().is_success());
        assert!(mock.get_endless_spool_config().iter().all(|c| c.backup_slot == -1));
    }

    #[test]
    fn test_device_action_dispatch() {
        let mock = quick_mock(4);
        assert!(mock.execute_device_action("calibrate_bowden", None).is_success());
        assert_eq!(
            mock.last_executed_action(),
            Some(("calibrate_bowden".to_string(), None))
        );

        let unknown = mock.execute_device_action("warp_drive", None);
        assert_eq!(unknown.result, AmsResult::NotSupported);
        assert!(unknown.technical_msg.contains("Unknown action: warp_drive"));

        mock.clear_last_executed_action();
        assert!(mock.last_executed_action().is_none());
    }

    #[test]
    fn test_calibration_wizard_prompt() {
        let mock = quick_mock(4);
        let lines = Arc::new(Mutex::new(Vec::<String>::new()));
        let captured = Arc::clone(&lines);
        mock.set_gcode_response_sink(Some(Arc::new(move |line: &str| {
            captured.lock().push(line.to_string());
        })));

        assert!(mock.execute_device_action("calibration_wizard", None).is_success());
        let lines = lines.lock();
        assert_eq!(lines.len(), 14);
        assert_eq!(lines[0], "// action:prompt_begin AFC Calibration");
        assert_eq!(lines[13], "// action:prompt_show");
    }

    #[test]
    fn test_capability_overrides() {
        let mock = quick_mock(4);
        mock.set_tool_mapping_supported(false);
        assert!(!mock.get_tool_mapping_capabilities().supported);
        assert!(!mock.get_system_info().supports_tool_mapping);
        mock.set_tool_mapping_supported(true);
        assert!(mock.get_tool_mapping_capabilities().editable);

        mock.set_has_hardware_bypass_sensor(true);
        assert!(mock.get_system_info().has_hardware_bypass_sensor);

        mock.set_device_sections(vec![DeviceSection::new("setup", "Setup", 0, "Calibration")]);
        mock.set_device_actions(vec![
            DeviceAction::button("home", "Home", "home", "setup", "Home the selector"),
            DeviceAction::toggle("sync", "Sync", "sync", "setup", "").disabled("Printing"),
        ]);
        assert_eq!(mock.get_device_sections().len(), 1);
        let actions = mock.get_device_actions();
        assert_eq!(actions.len(), 2);
        assert!(!actions[1].enabled);
    }

    #[test]
    fn test_slot_error_and_buffer_health() {
        let mock = quick_mock(4);
        mock.set_slot_error(1, Some(SlotError::new("Runout", SlotErrorSeverity::Warning)));
        assert_eq!(
            mock.get_slot_info(1).error.map(|e| e.severity),
            Some(SlotErrorSeverity::Warning)
        );
        mock.set_slot_error(1, None);
        assert!(mock.get_slot_info(1).error.is_none());
        // Out of range is ignored.
        mock.set_slot_error(9, Some(SlotError::new("x", SlotErrorSeverity::Error)));

        let health = BufferHealth {
            fault_detection_enabled: true,
            distance_to_fault: 12.5,
            state: "Trailing".to_string(),
        };
        mock.set_unit_buffer_health(0, Some(health.clone()));
        assert_eq!(mock.get_system_info().units[0].buffer_health, Some(health));
        mock.set_unit_buffer_health(3, None);
    }

    #[test]
    fn test_inject_errors_on_last_lane() {
        let mock = quick_mock(4);
        mock.inject_mock_errors();
        let slot = mock.get_slot_info(3);
        assert_eq!(
            slot.error.as_ref().map(|e| e.message.as_str()),
            Some("Lane 4 load failed")
        );
        assert!(mock.get_slot_info(0).error.is_none());

        assert!(mock.reset_lane(3).is_success());
        assert!(mock.get_slot_info(3).error.is_none());
    }

    #[test]
    fn test_reset_lane_unblocks() {
        let mock = quick_mock(4);
        mock.force_slot_status(2, SlotStatus::Blocked);
        assert!(mock.reset_lane(2).is_success());
        assert_eq!(mock.get_slot_info(2).status, SlotStatus::Available);
        assert_eq!(mock.reset_lane(10).result, AmsResult::InvalidSlot);
    }

    #[test]
    fn test_drop_during_realistic_load_returns() {
        let mock = AmsBackendMock::new(4);
        mock.start();
        assert!(mock.load_filament(1).is_success());
        let started = Instant::now();
        drop(mock);
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
