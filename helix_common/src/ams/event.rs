//! Typed backend events and the channel they travel on.
//!
//! Backends emit events from whatever thread runs the operation. The sink
//! is a plain `mpsc::Sender`, so emitting never blocks and never re-enters
//! the consumer; the owner of the receiver drains it on its own thread.

use crate::ams::error::AmsResult;
use std::sync::mpsc::Sender;
use tracing::debug;

/// Notification from a backend to its owner.
#[derive(Debug, Clone, PartialEq)]
pub enum AmsEvent {
    /// Any state change; owner should resync everything.
    StateChanged,
    /// One slot's display data changed.
    SlotChanged {
        /// Global slot index.
        slot: i32,
    },
    /// Load finished.
    LoadComplete {
        /// Loaded slot.
        slot: i32,
    },
    /// Unload finished.
    UnloadComplete {
        /// Slot the filament came from (-1 if unknown).
        slot: i32,
    },
    /// Tool change finished.
    ToolChanged {
        /// Tool now active.
        tool: i32,
    },
    /// Asynchronous failure.
    Error {
        /// Outcome code.
        result: AmsResult,
        /// Description for logs and toasts.
        message: String,
    },
    /// Operation paused waiting for the user.
    AttentionRequired {
        /// What the user needs to do.
        message: String,
    },
}

impl AmsEvent {
    /// Wire name used by Moonraker-side tooling and logs.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::StateChanged => "STATE_CHANGED",
            Self::SlotChanged { .. } => "SLOT_CHANGED",
            Self::LoadComplete { .. } => "LOAD_COMPLETE",
            Self::UnloadComplete { .. } => "UNLOAD_COMPLETE",
            Self::ToolChanged { .. } => "TOOL_CHANGED",
            Self::Error { .. } => "ERROR",
            Self::AttentionRequired { .. } => "ATTENTION_REQUIRED",
        }
    }

    /// Payload rendered as text.
    pub fn data(&self) -> String {
        match self {
            Self::StateChanged => String::new(),
            Self::SlotChanged { slot }
            | Self::LoadComplete { slot }
            | Self::UnloadComplete { slot } => slot.to_string(),
            Self::ToolChanged { tool } => tool.to_string(),
            Self::Error { message, .. } | Self::AttentionRequired { message } => message.clone(),
        }
    }

    /// True for events that only touch one slot.
    pub const fn is_slot_scoped(&self) -> bool {
        matches!(self, Self::SlotChanged { .. })
    }
}

/// An event tagged with the backend that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct BackendEvent {
    /// Index of the backend in its owner.
    pub backend_index: usize,
    /// The event.
    pub event: AmsEvent,
}

/// Sending half handed to a backend.
#[derive(Debug, Clone)]
pub struct EventSink {
    backend_index: usize,
    sender: Sender<BackendEvent>,
}

impl EventSink {
    /// Create a sink that tags every event with `backend_index`.
    pub fn new(backend_index: usize, sender: Sender<BackendEvent>) -> Self {
        Self {
            backend_index,
            sender,
        }
    }

    /// Backend index this sink tags events with.
    pub fn backend_index(&self) -> usize {
        self.backend_index
    }

    /// Send an event. A closed receiver drops the event.
    pub fn emit(&self, event: AmsEvent) {
        let name = event.name();
        if self
            .sender
            .send(BackendEvent {
                backend_index: self.backend_index,
                event,
            })
            .is_err()
        {
            debug!("Event receiver gone, dropping {}", name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn test_event_names() {
        assert_eq!(AmsEvent::StateChanged.name(), "STATE_CHANGED");
        assert_eq!(AmsEvent::ToolChanged { tool: 2 }.name(), "TOOL_CHANGED");
        assert_eq!(AmsEvent::SlotChanged { slot: 3 }.data(), "3");
        let err = AmsEvent::Error {
            result: AmsResult::FilamentJam,
            message: "Filament Jam".to_string(),
        };
        assert_eq!(err.data(), "Filament Jam");
        assert!(AmsEvent::SlotChanged { slot: 0 }.is_slot_scoped());
        assert!(!AmsEvent::StateChanged.is_slot_scoped());
    }

    #[test]
    fn test_sink_tags_backend_index() {
        let (tx, rx) = mpsc::channel();
        let sink = EventSink::new(2, tx);
        sink.emit(AmsEvent::LoadComplete { slot: 1 });

        let received = rx.recv().unwrap();
        assert_eq!(received.backend_index, 2);
        assert_eq!(received.event, AmsEvent::LoadComplete { slot: 1 });
    }

    #[test]
    fn test_emit_after_receiver_dropped() {
        let (tx, rx) = mpsc::channel();
        drop(rx);
        let sink = EventSink::new(0, tx);
        sink.emit(AmsEvent::StateChanged);
    }
}
