//! Scripted fakes shared by the integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::NaiveTime;
use sp_core::gateway::{AttendanceGateway, GatewayError, LogEntry, NewLogEntry};
use sp_core::hardware::{Actuator, Indicator, Scanner, Tone};
use sp_core::schedule::Session;
use sp_core::types::{ClassId, LogId, ScannerId, UserId};
use tokio::time::Instant;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// In-memory gateway that records every call it receives.
#[derive(Clone, Default)]
pub struct MockGateway {
    inner: Arc<Mutex<GatewayInner>>,
}

#[derive(Default)]
struct GatewayInner {
    sessions: Vec<Session>,
    enrolled: HashSet<(String, String)>,
    marked: HashSet<(String, String)>,
    logs: HashMap<(String, String), Vec<LogEntry>>,
    names: HashMap<String, String>,
    fail_ops: HashSet<&'static str>,
    calls: Vec<String>,
    next_log: u32,
}

impl MockGateway {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_sessions(&self, sessions: Vec<Session>) {
        lock(&self.inner).sessions = sessions;
    }

    pub fn enroll(&self, user: &UserId, class: &ClassId) {
        lock(&self.inner)
            .enrolled
            .insert((user.to_string(), class.to_string()));
    }

    pub fn set_marked(&self, user: &UserId, class: &ClassId) {
        lock(&self.inner)
            .marked
            .insert((user.to_string(), class.to_string()));
    }

    pub fn set_display_name(&self, user: &UserId, name: &str) {
        lock(&self.inner)
            .names
            .insert(user.to_string(), name.to_string());
    }

    /// Forces the named operation to fail with a rejection.
    pub fn fail_on(&self, op: &'static str) {
        lock(&self.inner).fail_ops.insert(op);
    }

    pub fn add_open_log(&self, user: &UserId, class: &ClassId, time_in: NaiveTime) -> LogId {
        let mut inner = lock(&self.inner);
        inner.next_log += 1;
        let id = LogId::new(format!("log-{}", inner.next_log)).unwrap();
        let entry = LogEntry {
            id: id.clone(),
            date: chrono::NaiveDate::from_ymd_opt(2026, 8, 24).unwrap(),
            time_in,
            scanner_in: ScannerId::new("scanner-test").unwrap(),
            time_out: None,
            scanner_out: None,
        };
        inner
            .logs
            .entry((user.to_string(), class.to_string()))
            .or_default()
            .push(entry);
        id
    }

    pub fn calls(&self) -> Vec<String> {
        lock(&self.inner).calls.clone()
    }

    pub fn calls_named(&self, op: &str) -> usize {
        lock(&self.inner)
            .calls
            .iter()
            .filter(|call| call.starts_with(op))
            .count()
    }

    pub fn logs_for(&self, user: &UserId, class: &ClassId) -> Vec<LogEntry> {
        lock(&self.inner)
            .logs
            .get(&(user.to_string(), class.to_string()))
            .cloned()
            .unwrap_or_default()
    }

    fn record(&self, call: String, op: &'static str) -> Result<(), GatewayError> {
        let mut inner = lock(&self.inner);
        inner.calls.push(call);
        if inner.fail_ops.contains(op) {
            return Err(GatewayError::Rejected(format!("forced failure: {op}")));
        }
        Ok(())
    }
}

impl AttendanceGateway for MockGateway {
    async fn fetch_schedule(&self, room: &str) -> Result<Vec<Session>, GatewayError> {
        self.record(format!("schedule:{room}"), "schedule")?;
        Ok(lock(&self.inner).sessions.clone())
    }

    async fn is_enrolled(&self, user: &UserId, class: &ClassId) -> Result<bool, GatewayError> {
        self.record(format!("enrolled:{user}:{class}"), "enrolled")?;
        Ok(lock(&self.inner)
            .enrolled
            .contains(&(user.to_string(), class.to_string())))
    }

    async fn is_attendance_marked(
        &self,
        user: &UserId,
        class: &ClassId,
    ) -> Result<bool, GatewayError> {
        self.record(format!("marked:{user}:{class}"), "marked")?;
        Ok(lock(&self.inner)
            .marked
            .contains(&(user.to_string(), class.to_string())))
    }

    async fn mark_attendance(&self, user: &UserId, class: &ClassId) -> Result<(), GatewayError> {
        self.record(format!("mark:{user}:{class}"), "mark")?;
        lock(&self.inner)
            .marked
            .insert((user.to_string(), class.to_string()));
        Ok(())
    }

    async fn append_attendance_log(
        &self,
        user: &UserId,
        class: &ClassId,
        entry: NewLogEntry,
    ) -> Result<LogId, GatewayError> {
        self.record(format!("append:{user}:{class}"), "append")?;
        let mut inner = lock(&self.inner);
        inner.next_log += 1;
        let id = LogId::new(format!("log-{}", inner.next_log)).unwrap();
        inner
            .logs
            .entry((user.to_string(), class.to_string()))
            .or_default()
            .push(LogEntry {
                id: id.clone(),
                date: entry.date,
                time_in: entry.time_in,
                scanner_in: entry.scanner_in,
                time_out: None,
                scanner_out: None,
            });
        Ok(id)
    }

    async fn list_attendance_logs(
        &self,
        user: &UserId,
        class: &ClassId,
    ) -> Result<Vec<LogEntry>, GatewayError> {
        self.record(format!("list:{user}:{class}"), "list")?;
        Ok(lock(&self.inner)
            .logs
            .get(&(user.to_string(), class.to_string()))
            .cloned()
            .unwrap_or_default())
    }

    async fn close_attendance_log(
        &self,
        user: &UserId,
        class: &ClassId,
        log: &LogId,
        time_out: NaiveTime,
        scanner: &ScannerId,
    ) -> Result<(), GatewayError> {
        self.record(format!("close:{user}:{class}:{log}"), "close")?;
        let mut inner = lock(&self.inner);
        let entries = inner
            .logs
            .get_mut(&(user.to_string(), class.to_string()))
            .ok_or_else(|| GatewayError::Rejected("no logs for user/class".to_string()))?;
        let entry = entries
            .iter_mut()
            .find(|entry| &entry.id == log)
            .ok_or_else(|| GatewayError::Rejected(format!("unknown log {log}")))?;
        entry.time_out = Some(time_out);
        entry.scanner_out = Some(scanner.clone());
        Ok(())
    }

    async fn fetch_user_display_name(&self, user: &UserId) -> Result<String, GatewayError> {
        self.record(format!("name:{user}"), "name")?;
        Ok(lock(&self.inner)
            .names
            .get(user.as_str())
            .cloned()
            .unwrap_or_else(|| user.to_string()))
    }
}

/// Actuator fake recording every lock transition.
#[derive(Clone, Default)]
pub struct RecordingActuator {
    history: Arc<Mutex<Vec<bool>>>,
}

impl RecordingActuator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> Vec<bool> {
        lock(&self.history).clone()
    }

    pub fn open_count(&self) -> usize {
        lock(&self.history).iter().filter(|open| **open).count()
    }
}

impl Actuator for RecordingActuator {
    fn set_lock(&self, open: bool) {
        lock(&self.history).push(open);
    }
}

/// Indicator fake recording statuses, tones, and idle views.
#[derive(Clone, Default)]
pub struct RecordingIndicator {
    statuses: Arc<Mutex<Vec<String>>>,
    tones: Arc<Mutex<Vec<Tone>>>,
    idles: Arc<Mutex<Vec<Option<String>>>>,
}

impl RecordingIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn statuses(&self) -> Vec<String> {
        lock(&self.statuses).clone()
    }

    pub fn tones(&self) -> Vec<Tone> {
        lock(&self.tones).clone()
    }

    pub fn idles(&self) -> Vec<Option<String>> {
        lock(&self.idles).clone()
    }
}

impl Indicator for RecordingIndicator {
    fn show_status(&self, text: &str) {
        lock(&self.statuses).push(text.to_string());
    }

    fn show_idle(&self, active_class: Option<&str>) {
        lock(&self.idles).push(active_class.map(String::from));
    }

    fn emit_tone(&self, tone: Tone) {
        lock(&self.tones).push(tone);
    }
}

/// Scanner fake that presents tokens during configured time windows,
/// measured from construction. Deterministic under a paused tokio clock.
pub struct WindowScanner {
    start: Instant,
    windows: Vec<(Duration, Duration, String)>,
}

impl WindowScanner {
    pub fn new(windows: Vec<(Duration, Duration, String)>) -> Self {
        Self {
            start: Instant::now(),
            windows,
        }
    }
}

impl Scanner for WindowScanner {
    async fn poll_token(&mut self, timeout: Duration) -> Option<String> {
        tokio::time::sleep(timeout).await;
        let elapsed = self.start.elapsed();
        self.windows
            .iter()
            .find(|(from, to, _)| elapsed >= *from && elapsed < *to)
            .map(|(_, _, token)| token.clone())
    }
}

/// Hex-encodes an identity the way badge payloads carry it.
pub fn hex_token(identity: &str) -> String {
    identity.bytes().map(|b| format!("{b:02x}")).collect()
}
