//! # Helix AMS Demo Binary
//!
//! Runs the AMS state layer against the mock backend: loads a slot,
//! changes tools, unloads and optionally runs a short drying cycle, while
//! logging the subject changes a UI would bind to. Prints a JSON report of
//! the final system state on exit.
//!
//! # Usage
//!
//! ```bash
//! # Defaults (Happy Hare layout, 4 slots, realistic timing)
//! helix_ams
//!
//! # AFC layout, 10x faster, with a dryer
//! helix_ams --mode afc --speedup 10 --dryer
//!
//! # From a config file, verbose
//! helix_ams --config helix_ams.toml -v
//! ```

#![deny(warnings)]

use clap::Parser;
use helix_ams::backends::register_builtin_backends;
use helix_ams::{AmsBackend, AmsState, BackendError, BackendRegistry};
use helix_common::ams::{AmsAction, AmsError, AmsSystemInfo};
use helix_common::config::{AmsConfig, ConfigError, ConfigLoader, LogLevel, MockMode};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{Level, error, info, warn};
use tracing_subscriber::EnvFilter;

/// How long one demo step may take before it is abandoned (real time).
const STEP_TIMEOUT: Duration = Duration::from_secs(120);
const PUMP_INTERVAL: Duration = Duration::from_millis(50);
/// Length of the demo drying cycle (simulated minutes).
const DEMO_DRY_MIN: i32 = 30;

/// Helix AMS - mock AMS backend driven through the observable state layer
#[derive(Parser, Debug)]
#[command(name = "helix_ams")]
#[command(author = "HelixScreen")]
#[command(version)]
#[command(about = "Drives the AMS state layer against the simulated backend")]
#[command(long_about = None)]
struct Args {
    /// Path to configuration file (helix_ams.toml). Defaults are used when absent.
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Number of slots (1-16)
    #[arg(long)]
    slots: Option<usize>,

    /// Hardware layout: happy_hare, afc, tool_changer, multi_unit, mixed
    #[arg(short, long)]
    mode: Option<String>,

    /// Divide every simulated delay by this factor
    #[arg(long)]
    speedup: Option<f64>,

    /// Initial scenario: loading, bypass, error
    #[arg(long)]
    scenario: Option<String>,

    /// Simulate an integrated dryer and run a drying cycle
    #[arg(long)]
    dryer: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

/// One scripted operation.
#[derive(Debug, Clone, Copy)]
enum DemoStep {
    Load(i32),
    ChangeTool(i32),
    Unload,
}

impl DemoStep {
    fn name(self) -> String {
        match self {
            Self::Load(slot) => format!("load slot {slot}"),
            Self::ChangeTool(tool) => format!("change to T{tool}"),
            Self::Unload => "unload".to_string(),
        }
    }

    fn issue(self, backend: &dyn AmsBackend) -> AmsError {
        match self {
            Self::Load(slot) => backend.load_filament(slot),
            Self::ChangeTool(tool) => backend.change_tool(tool),
            Self::Unload => backend.unload_filament(),
        }
    }
}

#[derive(Debug, Serialize)]
struct StepReport {
    step: String,
    accepted: bool,
    completed: bool,
    message: String,
}

#[derive(Debug, Serialize)]
struct DemoReport {
    version: &'static str,
    mode: &'static str,
    interrupted: bool,
    steps: Vec<StepReport>,
    system: Option<AmsSystemInfo>,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = run() {
        error!("helix_ams failed: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let (mut config, missing_config) = match &args.config {
        Some(path) => match AmsConfig::load(path) {
            Ok(config) => (config, false),
            Err(ConfigError::FileNotFound) => (AmsConfig::default(), true),
            Err(e) => return Err(e.into()),
        },
        None => (AmsConfig::default(), false),
    };

    setup_tracing(&args, config.shared.log_level);
    info!("Helix AMS v{} starting...", env!("CARGO_PKG_VERSION"));
    if missing_config {
        warn!("Config file not found, using defaults");
    }

    apply_overrides(&mut config, &args)?;
    config.validate()?;
    let mode = config.mock.mode;

    let running = Arc::new(AtomicBool::new(true));
    {
        let running = Arc::clone(&running);
        ctrlc::set_handler(move || {
            info!("Received shutdown signal");
            running.store(false, Ordering::SeqCst);
        })?;
    }

    let mut registry = BackendRegistry::new();
    register_builtin_backends(&mut registry);

    let mut state = AmsState::new(config.clone(), registry);
    state.init_subjects();
    watch_subjects(&mut state);
    state.init_mock_backend()?;
    state.process_events();

    let slots = state.int_value("ams_slot_count").unwrap_or(1).max(1);
    let script = [
        DemoStep::Load(1 % slots),
        DemoStep::ChangeTool(2 % slots),
        DemoStep::Unload,
    ];

    let mut steps = Vec::new();
    for step in &script {
        if !running.load(Ordering::SeqCst) {
            break;
        }
        steps.push(run_step(&mut state, &running, step)?);
    }

    if config.mock.dryer && running.load(Ordering::SeqCst) {
        steps.push(run_drying(&mut state, &running)?);
    }

    let interrupted = !running.load(Ordering::SeqCst);
    let report = DemoReport {
        version: env!("CARGO_PKG_VERSION"),
        mode: mode.as_str(),
        interrupted,
        steps,
        system: state.with_backend(0, |b| b.get_system_info()),
    };

    state.deinit_subjects();
    println!("{}", serde_json::to_string_pretty(&report)?);
    info!("Helix AMS shutdown complete");
    Ok(())
}

fn apply_overrides(config: &mut AmsConfig, args: &Args) -> Result<(), ConfigError> {
    config.mock.enabled = true;
    if let Some(slots) = args.slots {
        config.mock.slot_count = slots;
    }
    if let Some(name) = &args.mode {
        config.mock.mode = MockMode::from_name(name)
            .ok_or_else(|| ConfigError::ValidationError(format!("unknown mode '{name}'")))?;
    }
    if let Some(speedup) = args.speedup {
        config.mock.sim_speedup = speedup;
    }
    if let Some(scenario) = &args.scenario {
        config.mock.scenario = scenario.clone();
    }
    if args.dryer {
        config.mock.dryer = true;
    }
    Ok(())
}

/// Log the cells a UI would show.
fn watch_subjects(state: &mut AmsState) {
    let subjects = state.subjects_mut();
    subjects.action.observe(|value| {
        let action = u8::try_from(value).ok().and_then(AmsAction::from_u8);
        info!("Action: {}", action.map_or("?", AmsAction::as_str));
    });
    subjects
        .action_detail
        .observe(|detail| info!("Detail: {}", detail));
    subjects
        .current_tool_text
        .observe(|tool| info!("Tool: {}", tool));
    subjects
        .current_material_text
        .observe(|material| info!("Loaded: {}", material));
    subjects
        .dryer_time_text
        .observe(|text| info!("Dryer: {}", text));
}

/// Issue one operation and pump events until the backend is idle again.
fn run_step(
    state: &mut AmsState,
    running: &AtomicBool,
    step: &DemoStep,
) -> Result<StepReport, BackendError> {
    let name = step.name();
    info!("Step: {}", name);
    let result = state
        .with_backend(0, |b| step.issue(b))
        .ok_or(BackendError::NotInitialized)?;
    if !result.is_success() {
        warn!("Step '{}' rejected: {}", name, result.user_msg);
        return Ok(StepReport {
            step: name,
            accepted: false,
            completed: false,
            message: result.user_msg,
        });
    }

    let completed = pump_until(state, running, |b| {
        b.get_current_action() == AmsAction::Idle
    });
    Ok(StepReport {
        step: name,
        accepted: true,
        completed,
        message: state.string_value("ams_action_detail").unwrap_or_default().to_string(),
    })
}

fn run_drying(state: &mut AmsState, running: &AtomicBool) -> Result<StepReport, BackendError> {
    let temp = state.modal_temp_c() as f32;
    let name = format!("dry {}°C for {} min", temp, DEMO_DRY_MIN);
    info!("Step: {}", name);
    let result = state
        .with_backend(0, |b| b.start_drying(temp, DEMO_DRY_MIN, -1))
        .ok_or(BackendError::NotInitialized)?;
    if !result.is_success() {
        warn!("Drying rejected: {}", result.user_msg);
        return Ok(StepReport {
            step: name,
            accepted: false,
            completed: false,
            message: result.user_msg,
        });
    }

    let completed = pump_until(state, running, |b| !b.get_dryer_info().active);
    if !completed {
        let _ = state.with_backend(0, |b| b.stop_drying());
    }
    Ok(StepReport {
        step: name,
        accepted: true,
        completed,
        message: state.string_value("dryer_current_temp_text").unwrap_or_default().to_string(),
    })
}

/// Pump events until `done` holds, Ctrl-C, or the step timeout.
fn pump_until(
    state: &mut AmsState,
    running: &AtomicBool,
    done: impl Fn(&dyn AmsBackend) -> bool,
) -> bool {
    let started = Instant::now();
    loop {
        if !running.load(Ordering::SeqCst) {
            return false;
        }
        state.wait_and_process(PUMP_INTERVAL);
        if state.with_backend(0, &done).unwrap_or(true) {
            state.process_events();
            return true;
        }
        if started.elapsed() > STEP_TIMEOUT {
            warn!("Step timed out after {:?}", STEP_TIMEOUT);
            return false;
        }
    }
}

/// Setup tracing subscriber from CLI arguments and the configured level.
fn setup_tracing(args: &Args, configured: LogLevel) {
    let level = if args.verbose {
        Level::DEBUG
    } else {
        match configured {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    };

    let filter = EnvFilter::from_default_env().add_directive(level.into());

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
