//! Core domain logic for the scanpoint attendance-checkpoint controller.
//!
//! This crate contains the scan-and-session reconciliation state machine:
//! - Schedule resolution: which session is active right now for this room
//! - Session tracking: current/previous active session transitions
//! - Scan reconciliation: enrollment check, attendance marking, timeout close
//! - Scan loop: debounce, duplicate-scan cooldown, pass-mode handling
//!
//! Hardware drivers (scanner, relay, display, buzzer) and the remote store
//! are collaborators behind the traits in [`hardware`] and [`gateway`].

pub mod gateway;
pub mod hardware;
pub mod reconcile;
pub mod scan_loop;
pub mod schedule;
pub mod token;
pub mod tracker;
pub mod types;

pub use gateway::{AttendanceGateway, GatewayError, LogEntry, NewLogEntry};
pub use hardware::{Actuator, Indicator, Scanner, Tone};
pub use reconcile::{CloseOutcome, Outcome, Reconciler};
pub use scan_loop::{ScanLoop, ScanLoopConfig};
pub use schedule::{Session, TimeWindow, refresh_schedule, resolve_active};
pub use token::decode_token;
pub use tracker::{ActiveSessionState, SharedState};
pub use types::{ClassId, LogId, ScannerId, UserId, ValidationError};
