//! Printer API seam.
//!
//! `AmsState` talks to Moonraker (and through it, Spoolman) only via the
//! [`PrinterApi`] trait, so the state layer can run against a real client,
//! a recording fake in tests, or nothing at all.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors reported by a [`PrinterApi`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApiError {
    /// Printer or Spoolman not reachable
    #[error("Printer API unavailable")]
    Unavailable,

    /// Request reached the server and failed
    #[error("Request failed: {0}")]
    RequestFailed(String),
}

/// Spool weights as reported by Spoolman.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpoolRecord {
    /// Spoolman spool id.
    pub id: i32,
    /// Filament left on the spool (grams).
    pub remaining_weight_g: f32,
    /// Filament on a full spool (grams).
    pub initial_weight_g: f32,
}

/// Calls the state layer makes against the printer.
pub trait PrinterApi: Send + Sync {
    /// Mark a Spoolman spool as the one currently printing.
    fn set_active_spool(&self, spool_id: i32) -> Result<(), ApiError>;

    /// Look up a spool. `Ok(None)` when Spoolman does not know the id.
    fn get_spool(&self, spool_id: i32) -> Result<Option<SpoolRecord>, ApiError>;
}
