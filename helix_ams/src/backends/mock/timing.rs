//! Simulated operation durations.
//!
//! Realistic mode splits every operation into phases whose lengths are
//! drawn around a base duration. All delays are divided by the simulation
//! speedup so tests and demos can run the same sequences in milliseconds.

/// Nozzle heating before a load or a cut.
pub const HEATING_BASE_MS: u32 = 3000;
/// Filament cut.
pub const CUTTING_BASE_MS: u32 = 2000;
/// Purge after a load.
pub const PURGING_BASE_MS: u32 = 3000;
/// Sensor check during recovery.
pub const CHECKING_BASE_MS: u32 = 1500;
/// Selector move between unload and load of a tool change.
pub const SELECTING_BASE_MS: u32 = 1000;
/// Full spool-to-nozzle segment animation.
pub const SEGMENT_ANIMATION_BASE_MS: u32 = 15000;

pub const HEATING_VARIANCE: f32 = 0.3;
pub const TIP_VARIANCE: f32 = 0.2;
pub const LOADING_VARIANCE: f32 = 0.2;
pub const PURGING_VARIANCE: f32 = 0.2;
pub const CHECKING_VARIANCE: f32 = 0.2;
pub const SELECTING_VARIANCE: f32 = 0.15;

/// Scale a base duration by the speedup and apply random variance.
///
/// A non-positive speedup counts as real time. The result is at least 1 ms
/// so every phase still yields to the scheduler.
pub fn effective_delay_ms(base_ms: u32, variance: f32, speedup: f64) -> u64 {
    let speedup = if speedup > 0.0 { speedup } else { 1.0 };
    let mut effective = (f64::from(base_ms) / speedup) as u64;
    if variance > 0.0 && effective > 0 {
        let jitter = 1.0 + (rand::random::<f32>() - 0.5) * 2.0 * variance;
        effective = (effective as f32 * jitter) as u64;
    }
    effective.max(1)
}
