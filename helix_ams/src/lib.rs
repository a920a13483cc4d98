//! # Helix AMS Library
//!
//! Backend abstraction for automated material systems with a pluggable
//! backend architecture and an observable state layer.
//!
//! Backends implement the [`AmsBackend`](backend::AmsBackend) trait. The
//! [`AmsState`](state::AmsState) context owns them, drains their events on
//! the owner thread and republishes everything as named observable cells.
//!
//! # Module Structure
//!
//! - [`backend`] - `AmsBackend` trait
//! - [`backend_registry`] - Backend factory registration
//! - [`backends`] - Backend implementations (mock simulation)
//! - [`api`] - Printer / Spoolman API seam
//! - [`state`] - `AmsState` and the subject store
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                     helix_ams (single crate)                     │
//! │  ┌─────────────┐    ┌──────────────┐    ┌─────────────────────┐  │
//! │  │  Subjects   │◄───│  AmsState    │◄──►│  Backend Registry   │  │
//! │  │ (observers) │    │ (owner loop) │    │                     │  │
//! │  └─────────────┘    └──────┬───────┘    └─────────────────────┘  │
//! │                        ▲   │                                     │
//! │              mpsc      │   ▼                                     │
//! │             events ┌───┴────────────┐     ┌──────────────────┐   │
//! │                    │  AmsBackend    │     │  PrinterApi      │   │
//! │                    │  (trait object)│     │  (Spoolman)      │   │
//! │                    └────────────────┘     └──────────────────┘   │
//! └──────────────────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod backend;
pub mod backend_registry;
pub mod backends;
pub mod state;

// Re-export key types for convenience
pub use crate::api::{ApiError, PrinterApi, SpoolRecord};
pub use crate::backend::{AmsBackend, GcodeResponseSink};
pub use crate::backend_registry::{BackendError, BackendRegistry, HardwareInfo};
pub use crate::backends::mock::AmsBackendMock;
pub use crate::state::AmsState;
