//! Session schedule and active-session resolution.

use chrono::{Datelike, NaiveDateTime, NaiveTime, Timelike, Weekday};
use serde::Serialize;
use thiserror::Error;

use crate::gateway::{AttendanceGateway, GatewayError};
use crate::hardware::Indicator;
use crate::tracker::SharedState;
use crate::types::ClassId;

/// Schedule parsing errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// A session's time-window string did not parse.
    #[error("malformed time window: {value:?}")]
    MalformedWindow { value: String },
}

/// A session's daily time window, minute resolution, end inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeWindow {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeWindow {
    /// Whether the window contains `time`, comparing minute-of-day with both
    /// ends inclusive. A scan at 10:00:59 still falls inside a window ending
    /// at 10:00.
    pub fn contains(&self, time: NaiveTime) -> bool {
        let minute = minute_of_day(time);
        minute >= minute_of_day(self.start) && minute <= minute_of_day(self.end)
    }
}

impl std::str::FromStr for TimeWindow {
    type Err = ScheduleError;

    /// Parses the store's `"H:MM - H:MM"` shape, e.g. `"9:05 - 10:40"`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || ScheduleError::MalformedWindow {
            value: s.to_string(),
        };
        let (start, end) = s.split_once('-').ok_or_else(malformed)?;
        let start = NaiveTime::parse_from_str(start.trim(), "%H:%M").map_err(|_| malformed())?;
        let end = NaiveTime::parse_from_str(end.trim(), "%H:%M").map_err(|_| malformed())?;
        Ok(Self { start, end })
    }
}

fn minute_of_day(time: NaiveTime) -> u32 {
    time.hour() * 60 + time.minute()
}

/// A scheduled session, snapshotted from the directory on each refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub id: ClassId,
    pub name: String,
    pub room: String,
    pub days: Vec<Weekday>,
    pub window: TimeWindow,
    pub archived: bool,
}

impl Session {
    /// Whether this session is live for `room` at `now`.
    fn is_active(&self, now: NaiveDateTime, room: &str) -> bool {
        !self.archived
            && self.room == room
            && self.days.contains(&now.weekday())
            && self.window.contains(now.time())
    }
}

/// Resolves which session, if any, is active right now for this room.
///
/// First match in iteration order wins. The schedule is not required to be
/// conflict-free; overlapping windows in the same room resolve to whichever
/// session the directory lists first.
pub fn resolve_active(sessions: &[Session], now: NaiveDateTime, room: &str) -> Option<ClassId> {
    sessions
        .iter()
        .find(|session| session.is_active(now, room))
        .map(|session| session.id.clone())
}

/// One schedule-refresh cycle: fetch, resolve, update the tracker, and
/// republish the idle view.
///
/// Fetch failures leave the tracker untouched; the previously resolved state
/// stands until the next cycle.
pub async fn refresh_schedule<G, I>(
    gateway: &G,
    shared: &SharedState,
    indicator: &I,
    room: &str,
    now: NaiveDateTime,
) -> Result<Option<ClassId>, GatewayError>
where
    G: AttendanceGateway,
    I: Indicator,
{
    let sessions = gateway.fetch_schedule(room).await?;
    let active = resolve_active(&sessions, now, room);

    let name = active.as_ref().and_then(|id| {
        sessions
            .iter()
            .find(|session| &session.id == id)
            .map(|session| session.name.clone())
    });

    match (&active, &name) {
        (Some(id), Some(name)) => tracing::info!(class = %id, %name, "active session"),
        _ => tracing::debug!(room, "no active session"),
    }

    shared.tracker().lock().await.update(active.clone());
    shared.set_idle_class_name(name.clone());
    indicator.show_idle(name.as_deref());

    Ok(active)
}
