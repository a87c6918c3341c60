//! Active-session tracking shared between the refresh task and the scan loop.

use std::sync::Mutex as StdMutex;
use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::Mutex;

use crate::types::ClassId;

/// Which session is active right now, and which one was active before it.
///
/// `previous` is what lets a user scan out of a room after its session has
/// ended or been replaced: the reconciler closes open logs against it before
/// looking at the current session.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ActiveSessionState {
    current: Option<ClassId>,
    previous: Option<ClassId>,
}

impl ActiveSessionState {
    /// Applies a refresh result.
    ///
    /// `previous` is set to the prior `current` exactly when `current`
    /// transitions to a different value (including non-empty to empty) and
    /// was non-empty before. A refresh that reproduces the same active
    /// session never touches `previous`.
    pub fn update(&mut self, new_active: Option<ClassId>) {
        if new_active != self.current && self.current.is_some() {
            self.previous = self.current.take();
        }
        self.current = new_active;
    }

    pub const fn current(&self) -> Option<&ClassId> {
        self.current.as_ref()
    }

    pub const fn previous(&self) -> Option<&ClassId> {
        self.previous.as_ref()
    }
}

/// State shared between the periodic refresh task and the scan loop.
///
/// The tracker is the only piece both tasks mutate-and-read; a reconciliation
/// must observe a consistent `(current, previous)` pair, so it sits behind a
/// mutex. The idle-view slot and the scanning flag are side channels: the
/// refresh task publishes the active class name for the idle display, and the
/// scan path disables scanning for the duration of every actuator-open
/// sequence.
#[derive(Debug)]
pub struct SharedState {
    tracker: Mutex<ActiveSessionState>,
    idle_view: StdMutex<Option<String>>,
    scanning_enabled: AtomicBool,
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedState {
    pub fn new() -> Self {
        Self {
            tracker: Mutex::new(ActiveSessionState::default()),
            idle_view: StdMutex::new(None),
            scanning_enabled: AtomicBool::new(true),
        }
    }

    /// Locks the tracker for a consistent read or update.
    pub const fn tracker(&self) -> &Mutex<ActiveSessionState> {
        &self.tracker
    }

    pub fn scanning_enabled(&self) -> bool {
        self.scanning_enabled.load(Ordering::SeqCst)
    }

    pub fn set_scanning_enabled(&self, enabled: bool) {
        self.scanning_enabled.store(enabled, Ordering::SeqCst);
    }

    /// The active class name to show on the idle display, if any.
    pub fn idle_class_name(&self) -> Option<String> {
        self.idle_view
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    pub fn set_idle_class_name(&self, name: Option<String>) {
        *self
            .idle_view
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = name;
    }
}
