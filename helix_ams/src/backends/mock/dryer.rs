//! Simulated filament dryer.
//!
//! A dry cycle runs on its own thread in 100 ms ticks. Each tick advances
//! the simulated clock by `dryer_speed / 10` seconds, so the default speed
//! of 60 runs a cycle at one minute per second. Temperature ramps toward
//! the target for the first five simulated minutes and then wobbles within
//! half a degree of it. When the timer runs out the heater turns off and
//! the chamber cools back to room temperature.

use super::backend::{AmsBackendMock, MockCore};
use super::timing::effective_delay_ms;
use helix_common::ams::dryer::DryerInfo;
use helix_common::ams::{AmsError, AmsEvent, AmsResult};
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::thread;
use tracing::{debug, info, warn};

const ROOM_TEMP_C: f32 = 25.0;
const MIN_TEMP_C: f32 = 35.0;
const MAX_TEMP_C: f32 = 70.0;
const MAX_DURATION_MIN: i32 = 720;
const DEFAULT_FAN_PCT: i32 = 50;

const TICK_MS: u32 = 100;
/// Simulated seconds of exponential ramp before holding at target.
const RAMP_SECS: i64 = 300;
const RAMP_RATE: f32 = 0.05;
const COOL_DOWN_TICKS: usize = 10;

fn not_available() -> AmsError {
    AmsError::new(AmsResult::NotSupported, "Dryer not available")
}

impl MockCore {
    fn dryer_sleep(&self, ms: u64) -> bool {
        self.sleep_unless(ms, || {
            self.dryer_stop.load(Ordering::SeqCst) || self.is_shutting_down()
        })
    }

    /// Stop the dryer thread, if any, and wait for it.
    fn join_dryer_thread(&self) {
        self.dryer_stop.store(true, Ordering::SeqCst);
        self.wake_all();
        if self.dryer_running.swap(false, Ordering::SeqCst) {
            let handle = self.dryer_thread.lock().take();
            if let Some(handle) = handle {
                let _ = handle.join();
            }
        }
    }

    pub(super) fn start_drying(
        self: &Arc<Self>,
        temp_c: f32,
        duration_min: i32,
        fan_pct: i32,
    ) -> AmsError {
        if !self.state.lock().dryer_enabled {
            return not_available();
        }
        self.join_dryer_thread();
        if self.is_shutting_down() {
            return AmsError::success();
        }
        self.dryer_stop.store(false, Ordering::SeqCst);

        {
            let mut st = self.state.lock();
            let dryer = &mut st.dryer;
            dryer.active = true;
            dryer.target_temp_c = temp_c;
            dryer.duration_min = duration_min;
            dryer.remaining_min = duration_min;
            dryer.fan_pct = if fan_pct < 0 { DEFAULT_FAN_PCT } else { fan_pct };
            info!(
                "Mock dryer started: {}°C for {} min, fan {}%",
                temp_c, duration_min, dryer.fan_pct
            );
        }

        self.dryer_running.store(true, Ordering::SeqCst);
        let core = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name("ams-mock-dryer".to_string())
            .spawn(move || core.run_dryer());
        match spawned {
            Ok(handle) => *self.dryer_thread.lock() = Some(handle),
            Err(e) => {
                warn!("Failed to spawn mock dryer thread: {}", e);
                self.dryer_running.store(false, Ordering::SeqCst);
                self.state.lock().dryer.active = false;
            }
        }

        self.emit(AmsEvent::StateChanged);
        AmsError::success()
    }

    pub(super) fn stop_drying(&self) -> AmsError {
        {
            let st = self.state.lock();
            if !st.dryer_enabled {
                return not_available();
            }
            if !st.dryer.active {
                return AmsError::success();
            }
        }

        self.join_dryer_thread();
        {
            let mut st = self.state.lock();
            let dryer = &mut st.dryer;
            dryer.active = false;
            dryer.target_temp_c = 0.0;
            dryer.remaining_min = 0;
            dryer.fan_pct = 0;
        }
        info!("Mock dryer stopped");
        self.emit(AmsEvent::StateChanged);
        AmsError::success()
    }

    pub(super) fn update_drying(&self, temp_c: f32, duration_min: i32, fan_pct: i32) -> AmsError {
        {
            let mut st = self.state.lock();
            if !st.dryer_enabled {
                return not_available();
            }
            if !st.dryer.active {
                return AmsError::wrong_state("dryer idle", "drying");
            }
            let dryer = &mut st.dryer;
            if temp_c >= 0.0 {
                dryer.target_temp_c = temp_c;
            }
            if duration_min >= 0 {
                dryer.duration_min = duration_min;
            }
            if fan_pct >= 0 {
                dryer.fan_pct = fan_pct;
            }
            debug!(
                "Mock dryer updated: {}°C, {} min, fan {}%",
                dryer.target_temp_c, dryer.duration_min, dryer.fan_pct
            );
        }
        self.emit(AmsEvent::StateChanged);
        AmsError::success()
    }

    fn run_dryer(&self) {
        let mut elapsed_s: i64 = 0;

        loop {
            let (tick_ms, step_s) = {
                let st = self.state.lock();
                (
                    effective_delay_ms(TICK_MS, 0.0, st.sim_speedup),
                    i64::from((st.dryer_speed / 10).max(1)),
                )
            };
            if !self.dryer_sleep(tick_ms) {
                return;
            }
            elapsed_s += step_s;

            let finished = {
                let mut st = self.state.lock();
                let dryer = &mut st.dryer;
                if !dryer.active {
                    return;
                }
                let target = dryer.target_temp_c;
                if elapsed_s < RAMP_SECS {
                    let gain = (RAMP_RATE * step_s as f32).min(1.0);
                    dryer.current_temp_c += (target - dryer.current_temp_c) * gain;
                } else {
                    dryer.current_temp_c = target + (rand::random::<f32>() - 0.5);
                }
                dryer.current_temp_c = dryer.current_temp_c.min(target + 1.0).max(ROOM_TEMP_C);

                let remaining_s = (i64::from(dryer.duration_min) * 60 - elapsed_s).max(0);
                dryer.remaining_min = ((remaining_s + 59) / 60) as i32;
                remaining_s == 0
            };
            self.emit(AmsEvent::StateChanged);
            if finished {
                break;
            }
        }

        {
            let mut st = self.state.lock();
            let dryer = &mut st.dryer;
            dryer.active = false;
            dryer.target_temp_c = 0.0;
            dryer.remaining_min = 0;
            dryer.fan_pct = 0;
        }
        info!("Mock dryer cycle complete, cooling down");
        self.emit(AmsEvent::StateChanged);

        for _ in 0..COOL_DOWN_TICKS {
            let tick_ms = effective_delay_ms(TICK_MS, 0.0, self.state.lock().sim_speedup);
            if !self.dryer_sleep(tick_ms) {
                return;
            }
            {
                let mut st = self.state.lock();
                st.dryer.current_temp_c = 0.8 * st.dryer.current_temp_c + 0.2 * ROOM_TEMP_C;
            }
            self.emit(AmsEvent::StateChanged);
        }

        self.state.lock().dryer.current_temp_c = ROOM_TEMP_C;
        self.emit(AmsEvent::StateChanged);
    }
}

impl AmsBackendMock {
    /// Give the mock a dryer. Disabling stops a running cycle.
    pub fn set_dryer_enabled(&self, enabled: bool) {
        if !enabled {
            let _ = self.core.stop_drying();
        }
        let mut st = self.core.state.lock();
        st.dryer_enabled = enabled;
        st.dryer = DryerInfo {
            supported: enabled,
            active: false,
            allows_during_print: true,
            current_temp_c: ROOM_TEMP_C,
            target_temp_c: 0.0,
            duration_min: 0,
            remaining_min: 0,
            fan_pct: 0,
            min_temp_c: MIN_TEMP_C,
            max_temp_c: MAX_TEMP_C,
            max_duration_min: MAX_DURATION_MIN,
            supports_fan_control: true,
        };
        debug!("Mock dryer {}", if enabled { "enabled" } else { "disabled" });
    }

    /// Simulated seconds per real second (minimum 1).
    pub fn set_dryer_speed(&self, speed: i32) {
        self.core.state.lock().dryer_speed = speed.max(1);
    }
}
