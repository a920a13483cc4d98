//! AMS operation outcome codes and the `AmsError` value.
//!
//! Every backend operation returns an [`AmsError`]. A successful call
//! carries [`AmsResult::Success`]; callers check [`AmsError::is_success`] or
//! convert with [`AmsError::into_result`] to use `?`.
//!
//! Each error carries three messages: a technical one for logs, a short one
//! for the UI, and a suggested remedy.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Outcome codes for AMS operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum AmsResult {
    /// Operation succeeded.
    Success = 0,

    // Communication
    /// Backend not started / printer unreachable.
    NotConnected,
    /// Operation timed out.
    Timeout,
    /// Connection lost during operation.
    ConnectionLost,
    /// G-code command returned an error.
    CommandFailed,

    // State
    /// Backend not initialized.
    NotInitialized,
    /// No AMS/MMU system found.
    NoAmsDetected,
    /// Operation invalid in the current state.
    WrongState,
    /// Another operation in progress.
    Busy,

    // Hardware
    /// Filament jammed in the path.
    FilamentJam,
    /// Slot blocked or inaccessible.
    SlotBlocked,
    /// Filament sensor malfunction.
    SensorError,
    /// Filament encoder malfunction.
    EncoderError,
    /// Selector homing failed.
    HomingFailed,
    /// Extruder too cold.
    ExtruderCold,

    // Operation
    /// Failed to load filament.
    LoadFailed,
    /// Failed to unload filament.
    UnloadFailed,
    /// Tool change failed.
    ToolChangeFailed,
    /// Tip forming failed.
    TipFormingFailed,
    /// Requested slot has no filament.
    SlotNotAvailable,

    // Validation
    /// Slot index out of range.
    InvalidSlot,
    /// Tool index out of range.
    InvalidTool,
    /// Tool-to-slot mapping invalid.
    MappingError,

    // Spoolman
    /// Spoolman service not reachable.
    SpoolmanNotAvailable,
    /// Requested spool id not found.
    SpoolNotFound,

    /// Feature not supported by this backend.
    NotSupported,

    /// Unexpected error condition.
    UnknownError,
}

impl AmsResult {
    /// Human-readable name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::NotConnected => "Not Connected",
            Self::Timeout => "Timeout",
            Self::ConnectionLost => "Connection Lost",
            Self::CommandFailed => "Command Failed",
            Self::NotInitialized => "Not Initialized",
            Self::NoAmsDetected => "No AMS Detected",
            Self::WrongState => "Wrong State",
            Self::Busy => "Busy",
            Self::FilamentJam => "Filament Jam",
            Self::SlotBlocked => "Slot Blocked",
            Self::SensorError => "Sensor Error",
            Self::EncoderError => "Encoder Error",
            Self::HomingFailed => "Homing Failed",
            Self::ExtruderCold => "Extruder Cold",
            Self::LoadFailed => "Load Failed",
            Self::UnloadFailed => "Unload Failed",
            Self::ToolChangeFailed => "Tool Change Failed",
            Self::TipFormingFailed => "Tip Forming Failed",
            Self::SlotNotAvailable => "Slot Not Available",
            Self::InvalidSlot => "Invalid Slot",
            Self::InvalidTool => "Invalid Tool",
            Self::MappingError => "Mapping Error",
            Self::SpoolmanNotAvailable => "Spoolman Not Available",
            Self::SpoolNotFound => "Spool Not Found",
            Self::NotSupported => "Not Supported",
            Self::UnknownError => "Unknown Error",
        }
    }

    /// Errors the user can clear with a retry or `recover()`.
    pub const fn is_recoverable(self) -> bool {
        matches!(
            self,
            Self::FilamentJam
                | Self::SlotBlocked
                | Self::ExtruderCold
                | Self::LoadFailed
                | Self::UnloadFailed
                | Self::TipFormingFailed
                | Self::HomingFailed
        )
    }
}

impl Default for AmsResult {
    fn default() -> Self {
        Self::Success
    }
}

impl fmt::Display for AmsResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of an AMS operation with user-facing context.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{result}: {technical_msg}")]
pub struct AmsError {
    /// Primary outcome code.
    pub result: AmsResult,
    /// Technical details for logging.
    pub technical_msg: String,
    /// Short message for UI display.
    pub user_msg: String,
    /// Suggested recovery action.
    pub suggestion: String,
    /// Slot involved (-1 if not applicable).
    pub slot_index: i32,
}

impl AmsError {
    /// Error with just a code and technical message.
    pub fn new(result: AmsResult, technical_msg: impl Into<String>) -> Self {
        Self {
            result,
            technical_msg: technical_msg.into(),
            user_msg: String::new(),
            suggestion: String::new(),
            slot_index: -1,
        }
    }

    /// Error with all three messages.
    pub fn with_messages(
        result: AmsResult,
        technical_msg: impl Into<String>,
        user_msg: impl Into<String>,
        suggestion: impl Into<String>,
    ) -> Self {
        Self {
            result,
            technical_msg: technical_msg.into(),
            user_msg: user_msg.into(),
            suggestion: suggestion.into(),
            slot_index: -1,
        }
    }

    /// Attach the slot involved.
    pub fn with_slot(mut self, slot_index: i32) -> Self {
        self.slot_index = slot_index;
        self
    }

    /// Successful outcome.
    pub fn success() -> Self {
        Self::new(AmsResult::Success, "")
    }

    /// True for [`AmsResult::Success`].
    pub fn is_success(&self) -> bool {
        self.result == AmsResult::Success
    }

    /// Delegates to [`AmsResult::is_recoverable`].
    pub fn is_recoverable(&self) -> bool {
        self.result.is_recoverable()
    }

    /// Convert into a `Result` so callers can use `?`.
    pub fn into_result(self) -> Result<(), AmsError> {
        if self.is_success() { Ok(()) } else { Err(self) }
    }

    // ─── Factories ──────────────────────────────────────────────────

    /// Backend or printer not reachable.
    pub fn not_connected(detail: &str) -> Self {
        let tech = if detail.is_empty() {
            "No Moonraker connection"
        } else {
            detail
        };
        Self::with_messages(
            AmsResult::NotConnected,
            tech,
            "Printer not connected",
            "Check that the printer is powered on and connected to the network",
        )
    }

    /// No AMS object found during discovery.
    pub fn no_ams_detected() -> Self {
        Self::with_messages(
            AmsResult::NoAmsDetected,
            "No mmu or afc object found in printer state",
            "No multi-filament system detected",
            "Ensure Happy Hare or AFC is installed and configured",
        )
    }

    /// Operation timed out.
    pub fn timeout(operation: &str) -> Self {
        Self::with_messages(
            AmsResult::Timeout,
            format!("{operation} operation timed out"),
            "Operation timed out",
            "Try the operation again. If it persists, check for mechanical issues.",
        )
    }

    /// Another operation is in flight.
    pub fn busy(current_op: &str) -> Self {
        Self::with_messages(
            AmsResult::Busy,
            format!("Cannot start operation: {current_op} in progress"),
            "AMS is busy",
            "Wait for the current operation to complete",
        )
    }

    /// Filament jam, optionally at a named location.
    pub fn filament_jam(slot: i32, location: &str) -> Self {
        let tech = if location.is_empty() {
            "Filament jam detected".to_string()
        } else {
            format!("Filament jam detected at {location}")
        };
        Self::with_messages(
            AmsResult::FilamentJam,
            tech,
            "Filament jam detected",
            "Manually clear the jam and retry the operation",
        )
        .with_slot(slot)
    }

    /// Slot blocked or inaccessible.
    pub fn slot_blocked(slot: i32) -> Self {
        Self::with_messages(
            AmsResult::SlotBlocked,
            format!("Slot {slot} is blocked or inaccessible"),
            format!("Slot {slot} blocked"),
            "Check the slot for obstructions or misaligned filament",
        )
        .with_slot(slot)
    }

    /// Extruder below the temperature required for the operation.
    pub fn extruder_cold(current_temp: i32, required_temp: i32) -> Self {
        Self::with_messages(
            AmsResult::ExtruderCold,
            format!("Extruder at {current_temp}°C, need {required_temp}°C"),
            "Extruder too cold",
            format!("Heat the extruder to at least {required_temp}°C before loading filament"),
        )
    }

    /// Load failed.
    pub fn load_failed(slot: i32, detail: &str) -> Self {
        let tech = if detail.is_empty() {
            "Load operation failed"
        } else {
            detail
        };
        Self::with_messages(
            AmsResult::LoadFailed,
            tech,
            format!("Failed to load filament from slot {slot}"),
            "Check filament path and try again",
        )
        .with_slot(slot)
    }

    /// Unload failed.
    pub fn unload_failed(detail: &str) -> Self {
        let tech = if detail.is_empty() {
            "Unload operation failed"
        } else {
            detail
        };
        Self::with_messages(
            AmsResult::UnloadFailed,
            tech,
            "Failed to unload filament",
            "Check extruder temperature and try again. Manual removal may be required.",
        )
    }

    /// Slot has no filament.
    pub fn slot_not_available(slot: i32) -> Self {
        Self::with_messages(
            AmsResult::SlotNotAvailable,
            format!("Slot {slot} has no filament loaded"),
            format!("Slot {slot} is empty"),
            "Load filament into the slot before selecting it",
        )
        .with_slot(slot)
    }

    /// Slot index out of `0..=max_slot`.
    pub fn invalid_slot(slot: i32, max_slot: i32) -> Self {
        Self::with_messages(
            AmsResult::InvalidSlot,
            format!("Slot {slot} out of range (0-{max_slot})"),
            "Invalid slot number",
            format!("Select a valid slot (0-{max_slot})"),
        )
        .with_slot(slot)
    }

    /// Tool index out of `0..=max_tool`.
    pub fn invalid_tool(tool: i32, max_tool: i32) -> Self {
        Self::with_messages(
            AmsResult::InvalidTool,
            format!("Tool {tool} out of range (0-{max_tool})"),
            "Invalid tool number",
            format!("Select a valid tool (0-{max_tool})"),
        )
    }

    /// Operation invalid in the current state.
    pub fn wrong_state(current_state: &str, required_state: &str) -> Self {
        Self::with_messages(
            AmsResult::WrongState,
            format!("Cannot perform operation in state: {current_state}, need: {required_state}"),
            "Cannot perform this action now",
            "Wait for the current operation to complete or cancel it first",
        )
    }

    /// G-code command rejected by firmware.
    pub fn command_failed(command: &str, response: &str) -> Self {
        Self::with_messages(
            AmsResult::CommandFailed,
            format!("Command '{command}' failed: {response}"),
            "Command failed",
            "Check Klipper console for details",
        )
    }

    /// Capability gated off for this backend.
    pub fn not_supported(feature: &str) -> Self {
        Self::with_messages(
            AmsResult::NotSupported,
            format!("{feature} is not supported by this backend"),
            "Feature not available",
            "This feature requires different hardware or configuration",
        )
    }
}

impl Default for AmsError {
    fn default() -> Self {
        Self::success()
    }
}

impl From<AmsResult> for AmsError {
    fn from(result: AmsResult) -> Self {
        Self::new(result, "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_is_default() {
        let ok = AmsError::success();
        assert!(ok.is_success());
        assert_eq!(ok.slot_index, -1);
        assert!(ok.into_result().is_ok());
    }

    #[test]
    fn test_factory_messages() {
        let err = AmsError::invalid_slot(7, 3);
        assert_eq!(err.result, AmsResult::InvalidSlot);
        assert_eq!(err.technical_msg, "Slot 7 out of range (0-3)");
        assert_eq!(err.user_msg, "Invalid slot number");
        assert_eq!(err.suggestion, "Select a valid slot (0-3)");
        assert_eq!(err.slot_index, 7);

        let err = AmsError::busy("Loading");
        assert_eq!(err.technical_msg, "Cannot start operation: Loading in progress");
        assert_eq!(err.user_msg, "AMS is busy");

        let err = AmsError::slot_not_available(3);
        assert_eq!(err.user_msg, "Slot 3 is empty");

        let err = AmsError::not_connected("");
        assert_eq!(err.technical_msg, "No Moonraker connection");

        let err = AmsError::not_supported("Dryer");
        assert_eq!(err.technical_msg, "Dryer is not supported by this backend");
    }

    #[test]
    fn test_recoverable_codes() {
        assert!(AmsResult::FilamentJam.is_recoverable());
        assert!(AmsResult::HomingFailed.is_recoverable());
        assert!(!AmsResult::Busy.is_recoverable());
        assert!(!AmsResult::NotSupported.is_recoverable());
    }

    #[test]
    fn test_display_and_question_mark() {
        fn run() -> Result<(), AmsError> {
            AmsError::filament_jam(2, "hub").into_result()?;
            Ok(())
        }
        let err = run().unwrap_err();
        assert_eq!(err.slot_index, 2);
        assert_eq!(err.to_string(), "Filament Jam: Filament jam detected at hub");
        assert_eq!(AmsResult::SlotNotAvailable.to_string(), "Slot Not Available");
    }

    #[test]
    fn test_operation_factories() {
        let err = AmsError::load_failed(1, "");
        assert_eq!(err.result, AmsResult::LoadFailed);
        assert_eq!(err.technical_msg, "Load operation failed");
        assert_eq!(err.user_msg, "Failed to load filament from slot 1");
        assert_eq!(err.slot_index, 1);

        let err = AmsError::unload_failed("gear motor stalled");
        assert_eq!(err.result, AmsResult::UnloadFailed);
        assert_eq!(err.technical_msg, "gear motor stalled");

        let err = AmsError::extruder_cold(120, 200);
        assert_eq!(err.result, AmsResult::ExtruderCold);
        assert_eq!(err.technical_msg, "Extruder at 120°C, need 200°C");

        let err = AmsError::slot_blocked(2);
        assert_eq!(err.user_msg, "Slot 2 blocked");
        assert_eq!(err.slot_index, 2);

        let err = AmsError::invalid_tool(9, 3);
        assert_eq!(err.result, AmsResult::InvalidTool);
        assert_eq!(err.suggestion, "Select a valid tool (0-3)");

        let err = AmsError::command_failed("MMU_HOME", "!! Selector stalled");
        assert_eq!(err.technical_msg, "Command 'MMU_HOME' failed: !! Selector stalled");

        let err = AmsError::no_ams_detected();
        assert_eq!(err.result, AmsResult::NoAmsDetected);
        assert!(!err.is_success());
    }
}
