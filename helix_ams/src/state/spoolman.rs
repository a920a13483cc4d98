//! Spoolman weight refresh.
//!
//! Linked slots (`spoolman_id > 0`) get their remaining and total weight
//! from Spoolman. Polling is reference-counted: every screen that shows
//! weights calls [`AmsState::start_spoolman_polling`] on open and
//! [`AmsState::stop_spoolman_polling`] on close. While at least one
//! reference is held, `process_events` refreshes every
//! `spoolman.poll_interval_s` seconds.

use super::AmsState;
use std::time::{Duration, Instant};
use tracing::{debug, trace, warn};

impl AmsState {
    /// Pull weights for every linked slot of the primary backend.
    ///
    /// Skipped in mock mode, whose spool ids do not exist in Spoolman.
    /// Weights are written back without persisting: they came from
    /// Spoolman, and persisting would make the firmware echo a status
    /// update that triggers another refresh.
    pub fn refresh_spoolman_weights(&mut self) {
        if self.config.mock.enabled {
            return;
        }
        let Some(api) = self.api.clone() else {
            return;
        };
        let Some(backend) = self.backends.first() else {
            return;
        };

        let slot_count = backend.get_system_info().total_slots;
        let mut linked = 0;
        for index in 0..slot_count {
            let spoolman_id = backend.get_slot_info(index).spoolman_id;
            if spoolman_id <= 0 {
                continue;
            }
            linked += 1;

            let spool = match api.get_spool(spoolman_id) {
                Ok(Some(spool)) => spool,
                Ok(None) => {
                    warn!("Spoolman spool {} not found", spoolman_id);
                    continue;
                }
                Err(e) => {
                    warn!("Failed to fetch Spoolman spool {}: {}", spoolman_id, e);
                    continue;
                }
            };

            let mut slot = backend.get_slot_info(index);
            if slot.spoolman_id != spoolman_id {
                debug!(
                    "Slot {} spoolman_id changed ({} -> {}), skipping stale weight update",
                    index, spoolman_id, slot.spoolman_id
                );
                continue;
            }
            if slot.remaining_weight_g == spool.remaining_weight_g
                && slot.total_weight_g == spool.initial_weight_g
            {
                trace!(
                    "Slot {} weights unchanged ({:.0}g / {:.0}g)",
                    index, spool.remaining_weight_g, spool.initial_weight_g
                );
                continue;
            }

            slot.remaining_weight_g = spool.remaining_weight_g;
            slot.total_weight_g = spool.initial_weight_g;
            let result = backend.set_slot_info(index, &slot, false);
            if !result.is_success() {
                warn!("Slot {} weight update rejected: {}", index, result.technical_msg);
                continue;
            }
            self.subjects.bump_slots_version();
            debug!(
                "Updated slot {} weights: {:.0}g / {:.0}g",
                index, spool.remaining_weight_g, spool.initial_weight_g
            );
        }

        if linked > 0 {
            trace!("Refreshed Spoolman weights for {} linked slots", linked);
        }
    }

    /// Take a polling reference. The first reference refreshes at once.
    pub fn start_spoolman_polling(&mut self) {
        self.spoolman_poll_refs += 1;
        debug!("Starting Spoolman polling (refcount: {})", self.spoolman_poll_refs);
        if self.spoolman_poll_refs == 1 {
            self.next_spoolman_poll = Some(Instant::now() + self.spoolman_poll_interval());
            self.refresh_spoolman_weights();
        }
    }

    /// Drop a polling reference. Polling stops with the last one.
    pub fn stop_spoolman_polling(&mut self) {
        self.spoolman_poll_refs = self.spoolman_poll_refs.saturating_sub(1);
        debug!("Stopping Spoolman polling (refcount: {})", self.spoolman_poll_refs);
        if self.spoolman_poll_refs == 0 {
            self.next_spoolman_poll = None;
        }
    }

    pub fn is_spoolman_polling(&self) -> bool {
        self.spoolman_poll_refs > 0
    }

    pub(super) fn poll_spoolman_if_due(&mut self) {
        let Some(due) = self.next_spoolman_poll else {
            return;
        };
        let now = Instant::now();
        if now < due {
            return;
        }
        self.next_spoolman_poll = Some(now + self.spoolman_poll_interval());
        self.refresh_spoolman_weights();
    }

    fn spoolman_poll_interval(&self) -> Duration {
        Duration::from_secs(self.config.spoolman.poll_interval_s)
    }
}
