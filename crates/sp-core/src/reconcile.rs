//! The scan reconciler: one decoded token plus a point-in-time session state
//! becomes an access decision, an attendance mutation, and a cross-session
//! timeout update.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDateTime;

use crate::gateway::{AttendanceGateway, NewLogEntry};
use crate::hardware::{Actuator, Indicator, Tone};
use crate::tracker::SharedState;
use crate::types::{ClassId, ScannerId, UserId};

/// Result of reconciling one scan event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Attendance marked and a new open log appended.
    Recorded,
    /// Attendance was already marked; the open log was closed instead.
    TimedOut,
    /// Attendance was already marked but no open log remained to close.
    NoOpenLog,
    /// The user is not enrolled in the active session.
    NotEnrolled,
    /// No session is active; nothing to reconcile against.
    NoActiveSession,
    /// A gateway call failed; the condition was logged and surfaced.
    Failed,
}

/// Result of the timeout-close protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    Closed,
    NoOpenLog,
    Failed,
}

/// Runs the scan decision protocol against the gateway and drives the
/// actuator/indicator collaborators.
#[derive(Debug)]
pub struct Reconciler<G> {
    gateway: G,
    shared: Arc<SharedState>,
    scanner_id: ScannerId,
    dwell: Duration,
}

impl<G: AttendanceGateway> Reconciler<G> {
    pub const fn new(
        gateway: G,
        shared: Arc<SharedState>,
        scanner_id: ScannerId,
        dwell: Duration,
    ) -> Self {
        Self {
            gateway,
            shared,
            scanner_id,
            dwell,
        }
    }

    /// Reconciles one scan event.
    ///
    /// Order matters: the cross-session timeout pass runs first and
    /// unconditionally, because a user may be scanning out of a session that
    /// ended or moved rooms. Only then is the current session evaluated.
    pub async fn reconcile<A, I>(
        &self,
        user: &UserId,
        now: NaiveDateTime,
        actuator: &A,
        indicator: &I,
    ) -> Outcome
    where
        A: Actuator,
        I: Indicator,
    {
        let (current, previous) = {
            let tracker = self.shared.tracker().lock().await;
            (tracker.current().cloned(), tracker.previous().cloned())
        };

        if let Some(previous) = previous {
            tracing::info!(%user, class = %previous, "closing open log for previous session");
            indicator.show_status("Updating Timeout");
            self.close_open_log(user, &previous, now, actuator, indicator)
                .await;
        }

        let Some(current) = current else {
            tracing::info!(%user, "no active class to mark attendance");
            indicator.show_status("No active class");
            return Outcome::NoActiveSession;
        };

        match self.gateway.is_enrolled(user, &current).await {
            // Confirmation beep as soon as an enrolled user is recognized,
            // before any store mutation.
            Ok(true) => indicator.emit_tone(Tone::Short),
            Ok(false) => {
                tracing::info!(%user, class = %current, "user not enrolled in active class");
                indicator.emit_tone(Tone::Long);
                indicator.show_status("Not Enrolled");
                return Outcome::NotEnrolled;
            }
            Err(error) => {
                tracing::warn!(%user, class = %current, %error, "enrollment check failed");
                indicator.show_status("Store error");
                return Outcome::Failed;
            }
        }

        let display_name = self
            .gateway
            .fetch_user_display_name(user)
            .await
            .unwrap_or_else(|_| user.as_str().to_string());
        tracing::info!(%user, name = %display_name, class = %current, "processing attendance");
        indicator.show_status("Processing Attendance");

        // Nothing else may dispatch a scan while the lock is open.
        self.shared.set_scanning_enabled(false);
        actuator.set_lock(true);

        let outcome = match self.gateway.is_attendance_marked(user, &current).await {
            Ok(false) => self.record_time_in(user, &current, now, indicator).await,
            Ok(true) => {
                tracing::info!(%user, class = %current, "attendance already marked, recording time-out");
                match self
                    .close_open_log(user, &current, now, actuator, indicator)
                    .await
                {
                    CloseOutcome::Closed => Outcome::TimedOut,
                    CloseOutcome::NoOpenLog => Outcome::NoOpenLog,
                    CloseOutcome::Failed => Outcome::Failed,
                }
            }
            Err(error) => {
                tracing::warn!(%user, class = %current, %error, "attendance status check failed");
                indicator.show_status("Store error");
                Outcome::Failed
            }
        };

        tokio::time::sleep(self.dwell).await;
        actuator.set_lock(false);
        self.shared.set_scanning_enabled(true);

        outcome
    }

    async fn record_time_in<I: Indicator>(
        &self,
        user: &UserId,
        class: &ClassId,
        now: NaiveDateTime,
        indicator: &I,
    ) -> Outcome {
        if let Err(error) = self.gateway.mark_attendance(user, class).await {
            tracing::warn!(%user, class = %class, %error, "failed to mark attendance");
            indicator.show_status("Store error");
            return Outcome::Failed;
        }

        let entry = NewLogEntry {
            date: now.date(),
            time_in: now.time(),
            scanner_in: self.scanner_id.clone(),
        };
        match self.gateway.append_attendance_log(user, class, entry).await {
            Ok(log) => {
                tracing::info!(%user, class = %class, %log, "time-in recorded");
                indicator.emit_tone(Tone::Short);
                indicator.show_status("Attendance Recorded");
                Outcome::Recorded
            }
            Err(error) => {
                tracing::warn!(%user, class = %class, %error, "failed to append attendance log");
                indicator.show_status("Store error");
                Outcome::Failed
            }
        }
    }

    /// The timeout-close protocol.
    ///
    /// The actuator opens only after an open log is found, never
    /// pre-emptively: a scan with nothing to close must not unlock the door.
    pub async fn close_open_log<A, I>(
        &self,
        user: &UserId,
        class: &ClassId,
        now: NaiveDateTime,
        actuator: &A,
        indicator: &I,
    ) -> CloseOutcome
    where
        A: Actuator,
        I: Indicator,
    {
        let logs = match self.gateway.list_attendance_logs(user, class).await {
            Ok(logs) => logs,
            Err(error) => {
                tracing::warn!(%user, class = %class, %error, "failed to fetch attendance logs");
                indicator.show_status("Store error");
                return CloseOutcome::Failed;
            }
        };

        let Some(open) = logs.iter().find(|entry| entry.is_open()) else {
            tracing::info!(%user, class = %class, "no open attendance log");
            indicator.show_status("No open log");
            return CloseOutcome::NoOpenLog;
        };

        actuator.set_lock(true);

        match self
            .gateway
            .close_attendance_log(user, class, &open.id, now.time(), &self.scanner_id)
            .await
        {
            Ok(()) => {
                tracing::info!(%user, class = %class, log = %open.id, "timeout recorded");
                indicator.emit_tone(Tone::Short);
                indicator.show_status("Timeout Updated");
                tokio::time::sleep(self.dwell).await;
                actuator.set_lock(false);
                CloseOutcome::Closed
            }
            Err(error) => {
                tracing::warn!(%user, class = %class, %error, "failed to record timeout");
                // No dwell on failure.
                actuator.set_lock(false);
                CloseOutcome::Failed
            }
        }
    }
}
