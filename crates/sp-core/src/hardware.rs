//! Hardware port traits.
//!
//! The core never talks to pins, displays, or cameras. It emits abstract
//! commands through these traits and consumes raw scanned payloads from
//! [`Scanner`]. Host builds provide logging adapters; device builds provide
//! the real drivers.

use std::future::Future;
use std::time::Duration;

/// Buzzer tone kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    /// Short confirmation beep (successful scan, recorded attendance).
    Short,
    /// Long rejection tone (not enrolled).
    Long,
    /// Attention tone (pass mode).
    Alert,
}

/// The relay/lock actuator.
///
/// Implementations are internally synchronized; the scanning-enabled flag is
/// the mutual-exclusion mechanism that keeps two open sequences from
/// interleaving, not a lock here.
pub trait Actuator: Send + Sync {
    /// Opens (`true`) or closes (`false`) the lock.
    fn set_lock(&self, open: bool);
}

/// The status display and buzzer.
pub trait Indicator: Send + Sync {
    /// Shows a transient status line (scan feedback, error conditions).
    fn show_status(&self, text: &str);

    /// Restores the idle view: room, clock, and the active class name if any.
    fn show_idle(&self, active_class: Option<&str>);

    /// Emits an audible tone.
    fn emit_tone(&self, tone: Tone);
}

/// The token scanner.
///
/// `poll_token` returns the next raw decoded payload if one is presented
/// within `timeout`, or `None`. The raw payload is hex-encoded; identity
/// decoding happens in [`crate::token`].
pub trait Scanner: Send {
    fn poll_token(&mut self, timeout: Duration) -> impl Future<Output = Option<String>> + Send;
}
