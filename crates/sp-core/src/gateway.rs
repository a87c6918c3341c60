//! The enrollment/attendance gateway consumed by the core.
//!
//! The remote store holds the session schedule, enrollment records, and
//! attendance logs. The core only sees this typed interface; transport and
//! storage format are the adapter's concern (`sp-gateway` for the REST
//! store, scripted fakes in tests).

use std::future::Future;

use chrono::{NaiveDate, NaiveTime};
use thiserror::Error;

use crate::schedule::Session;
use crate::types::{ClassId, LogId, ScannerId, UserId};

/// Gateway errors.
///
/// All of these are non-fatal: the caller logs them, surfaces a status line,
/// and returns to idle. Persistent failure means no attendance gets recorded,
/// which is visible on the display rather than a crash.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The store could not be reached at all.
    #[error("store unreachable: {0}")]
    Unreachable(String),
    /// The store answered with a non-success status.
    #[error("store rejected request: {0}")]
    Rejected(String),
    /// The store answered with a payload the adapter could not decode.
    #[error("invalid store response: {0}")]
    InvalidResponse(String),
}

/// One attendance log entry, typed at the gateway boundary.
///
/// An entry with a `time_in` and no `time_out` is "open": the user is
/// considered inside. The reconciliation protocol keeps at most one entry
/// open per `(user, class)` at a time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub id: LogId,
    pub date: NaiveDate,
    pub time_in: NaiveTime,
    pub scanner_in: ScannerId,
    pub time_out: Option<NaiveTime>,
    pub scanner_out: Option<ScannerId>,
}

impl LogEntry {
    /// Whether this entry still lacks a time-out.
    pub const fn is_open(&self) -> bool {
        self.time_out.is_none()
    }
}

/// A new open log entry to append on a successful time-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLogEntry {
    pub date: NaiveDate,
    pub time_in: NaiveTime,
    pub scanner_in: ScannerId,
}

/// Query/mutate interface over the remote store.
///
/// All calls are awaited inline by the calling task and either succeed within
/// transport defaults or fail immediately; there is no internal retry loop.
pub trait AttendanceGateway: Send + Sync {
    /// Fetches the session schedule for a room.
    fn fetch_schedule(
        &self,
        room: &str,
    ) -> impl Future<Output = Result<Vec<Session>, GatewayError>> + Send;

    /// Whether the user is enrolled in the class.
    fn is_enrolled(
        &self,
        user: &UserId,
        class: &ClassId,
    ) -> impl Future<Output = Result<bool, GatewayError>> + Send;

    /// Whether attendance is already marked for the user in the class.
    fn is_attendance_marked(
        &self,
        user: &UserId,
        class: &ClassId,
    ) -> impl Future<Output = Result<bool, GatewayError>> + Send;

    /// Marks attendance for the user in the class.
    fn mark_attendance(
        &self,
        user: &UserId,
        class: &ClassId,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;

    /// Appends a new open log entry and returns its store-assigned ID.
    fn append_attendance_log(
        &self,
        user: &UserId,
        class: &ClassId,
        entry: NewLogEntry,
    ) -> impl Future<Output = Result<LogId, GatewayError>> + Send;

    /// Lists all attendance log entries for the user in the class.
    fn list_attendance_logs(
        &self,
        user: &UserId,
        class: &ClassId,
    ) -> impl Future<Output = Result<Vec<LogEntry>, GatewayError>> + Send;

    /// Records a time-out on an existing log entry.
    fn close_attendance_log(
        &self,
        user: &UserId,
        class: &ClassId,
        log: &LogId,
        time_out: NaiveTime,
        scanner: &ScannerId,
    ) -> impl Future<Output = Result<(), GatewayError>> + Send;

    /// Fetches the user's display name. Best-effort; callers fall back to
    /// the raw user ID when this fails.
    fn fetch_user_display_name(
        &self,
        user: &UserId,
    ) -> impl Future<Output = Result<String, GatewayError>> + Send;
}
