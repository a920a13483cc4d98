//! Observable AMS state.
//!
//! [`AmsState`] owns the backends, drains their events on the owner thread
//! and republishes backend state as named cells in [`AmsSubjects`]. It is
//! an explicit context object: build one with [`AmsState::new`], call
//! [`AmsState::init_subjects`], install a backend and pump
//! [`AmsState::process_events`] from the thread that owns the UI.
//!
//! # Lifecycle
//!
//! ```text
//! new() ─► init_subjects() ─► init_mock_backend() / init_backend_from_hardware()
//!                                   │
//!            ┌──────────────────────┘
//!            ▼
//!      process_events() ◄── backend threads (mpsc)
//!            │
//!            ▼
//!      deinit_subjects() / drop
//! ```
//!
//! Backends emit events from their worker threads into an mpsc channel.
//! Nothing touches the subjects except the owner, so no lock is needed on
//! this side.

mod dryer;
mod logo;
mod spoolman;
pub mod subjects;
mod sync;

pub use dryer::{
    DEFAULT_MODAL_DURATION_MIN, DEFAULT_MODAL_TEMP_C, MAX_DRYER_DURATION_MIN, MAX_DRYER_TEMP_C,
    MIN_DRYER_DURATION_MIN, MIN_DRYER_TEMP_C, MODAL_DURATION_STEP_MIN, MODAL_TEMP_STEP_C,
};
pub use logo::logo_for_system;
pub use subjects::{AmsSubjects, IntSubject, SlotSubjects, StringSubject};

use crate::api::PrinterApi;
use crate::backend::{AmsBackend, GcodeResponseSink};
use crate::backend_registry::{BackendError, BackendRegistry, HardwareInfo};
use crate::backends::mock::AmsBackendMock;
use helix_common::ams::{AmsAction, AmsEvent, AmsType, BackendEvent, EventSink, SlotInfo};
use helix_common::config::{AmsConfig, MockMode};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::time::{Duration, Instant};
use tracing::{debug, info, trace, warn};

/// AMS state context.
pub struct AmsState {
    config: AmsConfig,
    registry: BackendRegistry,
    backends: Vec<Box<dyn AmsBackend>>,

    events_tx: Sender<BackendEvent>,
    events_rx: Receiver<BackendEvent>,
    shutdown: Arc<AtomicBool>,

    subjects: AmsSubjects,
    initialized: bool,

    api: Option<Arc<dyn PrinterApi>>,
    last_synced_spoolman_id: i32,
    gcode_sink: Option<GcodeResponseSink>,

    modal_temp_c: i32,
    modal_duration_min: i32,

    spoolman_poll_refs: u32,
    next_spoolman_poll: Option<Instant>,
    /// Weights need a pull on the next full sync (new backend or API).
    weights_stale: bool,

    external_spool: Option<SlotInfo>,
}

impl AmsState {
    pub fn new(config: AmsConfig, registry: BackendRegistry) -> Self {
        let (events_tx, events_rx) = mpsc::channel();
        Self {
            config,
            registry,
            backends: Vec::new(),
            events_tx,
            events_rx,
            shutdown: Arc::new(AtomicBool::new(false)),
            subjects: AmsSubjects::new(),
            initialized: false,
            api: None,
            last_synced_spoolman_id: 0,
            gcode_sink: None,
            modal_temp_c: DEFAULT_MODAL_TEMP_C,
            modal_duration_min: DEFAULT_MODAL_DURATION_MIN,
            spoolman_poll_refs: 0,
            next_spoolman_poll: None,
            weights_stale: false,
            external_spool: None,
        }
    }

    pub fn config(&self) -> &AmsConfig {
        &self.config
    }

    // ─── Subjects ───────────────────────────────────────────────────

    /// Publish the initial cell values. Calling it twice is a no-op.
    pub fn init_subjects(&mut self) {
        if self.initialized {
            trace!("Subjects already initialized");
            return;
        }
        self.modal_temp_c = DEFAULT_MODAL_TEMP_C;
        self.modal_duration_min = DEFAULT_MODAL_DURATION_MIN;
        self.update_modal_texts();
        self.initialized = true;
        debug!("AMS subjects initialized");
    }

    /// Stop and drop every backend, then return all cells to their
    /// initial values. Calling it twice is a no-op.
    pub fn deinit_subjects(&mut self) {
        if !self.initialized {
            return;
        }
        self.clear_backends();
        self.subjects.reset();
        self.initialized = false;
        debug!("AMS subjects deinitialized");
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    pub fn subjects(&self) -> &AmsSubjects {
        &self.subjects
    }

    /// Mutable access, for attaching observers.
    pub fn subjects_mut(&mut self) -> &mut AmsSubjects {
        &mut self.subjects
    }

    pub fn int_value(&self, name: &str) -> Option<i32> {
        self.subjects.int_value(name)
    }

    pub fn string_value(&self, name: &str) -> Option<&str> {
        self.subjects.string_value(name)
    }

    // ─── Backends ───────────────────────────────────────────────────

    /// Replace every backend with `backend`.
    pub fn set_backend(&mut self, backend: Box<dyn AmsBackend>) {
        self.clear_backends();
        let ams_type = backend.get_type();
        self.add_backend(backend);
        debug!("Backend set (type={})", ams_type);
    }

    /// Append a backend and return its index. Index 0 is the primary
    /// backend that drives the system-level cells.
    pub fn add_backend(&mut self, backend: Box<dyn AmsBackend>) -> usize {
        let index = self.backends.len();
        backend.set_event_sink(Some(EventSink::new(index, self.events_tx.clone())));
        if let Some(sink) = &self.gcode_sink {
            backend.set_gcode_response_sink(Some(Arc::clone(sink)));
        }
        if index > 0 {
            let total = backend.get_system_info().total_slots.max(0) as usize;
            self.subjects.secondary.push(SlotSubjects::secondary(index, total));
        }
        if index == 0 {
            self.weights_stale = true;
        }
        self.backends.push(backend);
        self.subjects.backend_count.set(self.backends.len() as i32);
        index
    }

    pub fn backend_count(&self) -> usize {
        self.backends.len()
    }

    pub fn backend(&self, index: usize) -> Option<&dyn AmsBackend> {
        self.backends.get(index).map(|b| b.as_ref())
    }

    /// Run `f` against a backend, if it exists.
    pub fn with_backend<R>(&self, index: usize, f: impl FnOnce(&dyn AmsBackend) -> R) -> Option<R> {
        self.backend(index).map(f)
    }

    /// Stop and drop every backend.
    pub fn clear_backends(&mut self) {
        for backend in &self.backends {
            backend.stop();
        }
        self.backends.clear();
        self.subjects.secondary.clear();
        self.subjects.backend_count.set(0);
        self.subjects.active_backend.set(0);
    }

    /// Select the backend the UI shows. Out-of-range indices are ignored.
    pub fn set_active_backend(&mut self, index: usize) {
        if index < self.backends.len() {
            self.subjects.active_backend.set(index as i32);
        }
    }

    pub fn active_backend_index(&self) -> usize {
        self.subjects.active_backend.get().max(0) as usize
    }

    /// True when a primary backend exists and reports a system type.
    pub fn is_available(&self) -> bool {
        self.backends
            .first()
            .is_some_and(|b| b.get_type() != AmsType::None)
    }

    pub fn set_printer_api(&mut self, api: Option<Arc<dyn PrinterApi>>) {
        debug!(
            "Printer API {} for Spoolman integration",
            if api.is_some() { "set" } else { "cleared" }
        );
        self.weights_stale = api.is_some();
        self.api = api;
        self.last_synced_spoolman_id = 0;
    }

    /// Route G-code console output of current and future backends to `sink`.
    pub fn set_gcode_response_sink(&mut self, sink: Option<GcodeResponseSink>) {
        for backend in &self.backends {
            backend.set_gcode_response_sink(sink.clone());
        }
        debug!(
            "G-code response sink {}",
            if sink.is_some() { "set" } else { "cleared" }
        );
        self.gcode_sink = sink;
    }

    // ─── Initialization ─────────────────────────────────────────────

    /// Install and start a mock backend built from `[mock]` config.
    ///
    /// # Errors
    /// Returns `BackendError::StartFailed` if the mock refuses to start.
    pub fn init_mock_backend(&mut self) -> Result<(), BackendError> {
        let cfg = self.config.mock.clone();
        if !cfg.enabled {
            debug!("Mock mode disabled, not installing mock backend");
            return Ok(());
        }

        let mock = AmsBackendMock::new(cfg.slot_count);
        mock.set_realistic_mode(cfg.realistic);
        mock.set_operation_delay(cfg.operation_delay_ms);
        mock.set_sim_speedup(cfg.sim_speedup);
        mock.set_dryer_enabled(cfg.dryer);
        match cfg.mode {
            MockMode::HappyHare => {}
            MockMode::Afc => mock.set_afc_mode(true),
            MockMode::ToolChanger => mock.set_tool_changer_mode(true),
            MockMode::MultiUnit => mock.set_multi_unit_mode(true),
            MockMode::Mixed => mock.set_mixed_topology_mode(true),
        }
        mock.set_initial_state_scenario(&cfg.scenario);

        self.set_backend(Box::new(mock));
        self.start_backend(0)?;
        self.sync_from_backend();
        info!(
            "Mock AMS backend ready ({} mode, {} slots)",
            cfg.mode.as_str(),
            self.subjects.slot_count.get()
        );
        Ok(())
    }

    /// Create and start the backend for discovered hardware.
    ///
    /// Skipped when nothing was detected, when mock mode is enabled, or
    /// when a backend is already installed.
    ///
    /// # Errors
    /// `BackendNotFound` when the registry has no factory for the detected
    /// type, `StartFailed` when the backend refuses to start.
    pub fn init_backend_from_hardware(
        &mut self,
        hardware: &HardwareInfo,
        api: Option<Arc<dyn PrinterApi>>,
    ) -> Result<(), BackendError> {
        if hardware.detected_type == AmsType::None {
            debug!("No AMS detected, skipping backend initialization");
            return Ok(());
        }
        if self.config.mock.enabled {
            debug!("Mock mode active, skipping hardware backend initialization");
            return Ok(());
        }
        if !self.backends.is_empty() {
            debug!("Backend already initialized, skipping");
            return Ok(());
        }
        if api.is_some() {
            self.set_printer_api(api);
        }

        info!("Creating backend for {}", hardware.detected_type);
        let backend = self.registry.create_for(hardware)?;
        backend.set_discovered_lanes(&hardware.lane_names, &hardware.hub_names);
        backend.set_discovered_tools(&hardware.tool_names);

        let index = self.add_backend(backend);
        self.start_backend(index)?;
        self.sync_backend(index);
        info!("Initialized {} backend(s)", self.backends.len());
        Ok(())
    }

    fn start_backend(&self, index: usize) -> Result<(), BackendError> {
        let backend = self.backend(index).ok_or(BackendError::NotInitialized)?;
        let result = backend.start();
        if result.is_success() {
            debug!("Backend {} started", index);
            Ok(())
        } else {
            warn!("Backend {} failed to start: {}", index, result.technical_msg);
            Err(BackendError::StartFailed(result.technical_msg))
        }
    }

    // ─── Events ─────────────────────────────────────────────────────

    /// Flag polled by `process_events`. Setting it makes the state drop
    /// every pending and future event.
    pub fn shutdown_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    pub fn begin_shutdown(&self) {
        self.shutdown.store(true, Ordering::Release);
    }

    fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Handle every queued backend event and run a Spoolman poll if one
    /// is due. Returns the number of events handled.
    pub fn process_events(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            if self.is_shutting_down() {
                continue;
            }
            self.handle_event(event);
            handled += 1;
        }
        if !self.is_shutting_down() {
            self.poll_spoolman_if_due();
        }
        handled
    }

    /// Block up to `timeout` for the first event, then drain the rest.
    pub fn wait_and_process(&mut self, timeout: Duration) -> usize {
        match self.events_rx.recv_timeout(timeout) {
            Ok(event) => {
                let first = if self.is_shutting_down() {
                    0
                } else {
                    self.handle_event(event);
                    1
                };
                first + self.process_events()
            }
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                self.process_events()
            }
        }
    }

    fn handle_event(&mut self, event: BackendEvent) {
        let index = event.backend_index;
        trace!("Event {} from backend {}", event.event.name(), index);
        match event.event {
            AmsEvent::StateChanged
            | AmsEvent::LoadComplete { .. }
            | AmsEvent::UnloadComplete { .. }
            | AmsEvent::ToolChanged { .. } => self.sync_backend(index),
            AmsEvent::SlotChanged { slot } => self.update_slot_for_backend(index, slot),
            AmsEvent::Error { result, message } => {
                self.sync_backend(index);
                warn!("Backend error ({}): {}", result.as_str(), message);
            }
            AmsEvent::AttentionRequired { message } => {
                self.sync_backend(index);
                warn!("Attention required: {}", message);
            }
        }
    }

    // ─── Action Overrides ───────────────────────────────────────────

    pub fn set_action(&mut self, action: AmsAction) {
        self.subjects.action.set(action as i32);
        debug!("Action set: {}", action.as_str());
    }

    pub fn set_action_detail(&mut self, detail: &str) {
        self.subjects.action_detail.set(detail);
        debug!("Action detail set: {}", detail);
    }

    pub fn set_pending_target_slot(&mut self, slot: i32) {
        self.subjects.pending_target_slot.set(slot);
    }

    /// True while filament is moving past sensors (load, unload, select).
    /// Sensor changes in these states are expected.
    pub fn is_filament_operation_active(&self) -> bool {
        u8::try_from(self.subjects.action.get())
            .ok()
            .and_then(AmsAction::from_u8)
            .is_some_and(AmsAction::is_filament_operation)
    }

    // ─── External Spool ─────────────────────────────────────────────

    /// Spool fed through the bypass.
    pub fn external_spool_info(&self) -> Option<&SlotInfo> {
        self.external_spool.as_ref()
    }

    pub fn set_external_spool_info(&mut self, info: SlotInfo) {
        self.subjects.external_spool_color.set(info.color_rgb as i32);
        self.external_spool = Some(info);
    }

    pub fn clear_external_spool_info(&mut self) {
        self.external_spool = None;
        self.subjects.external_spool_color.set(0);
    }
}

impl Drop for AmsState {
    fn drop(&mut self) {
        self.begin_shutdown();
        self.clear_backends();
    }
}
