//! REST adapter for the attendance store.
//!
//! The store is a Firebase-style JSON tree over HTTPS: every node is
//! addressable as `{base}/{path}.json`, absent nodes read as `null`, and
//! collections are JSON maps keyed by store-assigned IDs. This crate maps
//! that layout onto the typed [`AttendanceGateway`] interface:
//!
//! - `classes.json` — the session schedule, one entry per class
//! - `logins/{user}/enrolledClasses/{class}.json` — enrollment (null = not
//!   enrolled)
//! - `.../attendance.json` — the per-class attendance flag
//! - `.../attendanceLogs.json` — the time-in/time-out log collection
//! - `logins/{user}/name.json` — the user's display name

use std::time::Duration;

use chrono::{NaiveDate, NaiveTime, Weekday};
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sp_core::gateway::{AttendanceGateway, GatewayError, LogEntry, NewLogEntry};
use sp_core::schedule::{Session, TimeWindow};
use sp_core::types::{ClassId, LogId, ScannerId, UserId};
use thiserror::Error;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// The store writes clock times in zero-padded 12-hour form, e.g. `"02:05 PM"`.
const CLOCK_FORMAT: &str = "%I:%M %p";
const DATE_FORMAT: &str = "%Y-%m-%d";

/// Errors constructing a [`RestGateway`].
#[derive(Debug, Error)]
pub enum RestGatewayError {
    /// The base URL did not parse or cannot carry path segments.
    #[error("invalid store URL: {0}")]
    InvalidBaseUrl(String),
    /// Failed to build the HTTP client.
    #[error("failed to build HTTP client: {0}")]
    ClientBuild(#[source] reqwest::Error),
}

/// HTTP client for the attendance store.
///
/// Safe to clone and share across tasks; clones share the underlying
/// connection pool.
#[derive(Debug, Clone)]
pub struct RestGateway {
    http: reqwest::Client,
    base: Url,
}

impl RestGateway {
    /// Creates a gateway rooted at `base_url` with the default request
    /// timeout.
    pub fn new(base_url: &str) -> Result<Self, RestGatewayError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self, RestGatewayError> {
        let mut base: Url = base_url
            .parse()
            .map_err(|err| RestGatewayError::InvalidBaseUrl(format!("{base_url}: {err}")))?;
        // Segment pushing only works on URLs that can be a base; reject the
        // rest up front so request-time building cannot fail.
        base.path_segments_mut()
            .map_err(|()| RestGatewayError::InvalidBaseUrl(base_url.to_string()))?
            .pop_if_empty();

        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(RestGatewayError::ClientBuild)?;

        Ok(Self { http, base })
    }

    /// Builds `{base}/{segments...}.json`, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, GatewayError> {
        let mut url = self.base.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| GatewayError::Rejected("store URL cannot carry paths".to_string()))?;
            if let Some((last, rest)) = segments.split_last() {
                path.extend(rest);
                path.push(&format!("{last}.json"));
            }
        }
        Ok(url)
    }

    async fn read(&self, url: Url) -> Result<Value, GatewayError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|err| GatewayError::Unreachable(err.to_string()))?;
        decode_response(response).await
    }

    async fn write<T: Serialize>(
        &self,
        method: reqwest::Method,
        url: Url,
        body: &T,
    ) -> Result<Value, GatewayError> {
        let response = self
            .http
            .request(method, url)
            .json(body)
            .send()
            .await
            .map_err(|err| GatewayError::Unreachable(err.to_string()))?;
        decode_response(response).await
    }

    fn log_collection(&self, user: &UserId, class: &ClassId) -> Result<Url, GatewayError> {
        self.endpoint(&[
            "logins",
            user.as_str(),
            "enrolledClasses",
            class.as_str(),
            "attendanceLogs",
        ])
    }
}

async fn decode_response(response: reqwest::Response) -> Result<Value, GatewayError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|err| GatewayError::Unreachable(err.to_string()))?;
    if !status.is_success() {
        return Err(GatewayError::Rejected(format!("status {status}: {body}")));
    }
    serde_json::from_str(&body).map_err(|err| GatewayError::InvalidResponse(err.to_string()))
}

impl AttendanceGateway for RestGateway {
    async fn fetch_schedule(&self, room: &str) -> Result<Vec<Session>, GatewayError> {
        let url = self.endpoint(&["classes"])?;
        let payload = self.read(url).await?;
        Ok(decode_schedule(payload, room))
    }

    async fn is_enrolled(&self, user: &UserId, class: &ClassId) -> Result<bool, GatewayError> {
        let url = self.endpoint(&["logins", user.as_str(), "enrolledClasses", class.as_str()])?;
        let payload = self.read(url).await?;
        Ok(!payload.is_null())
    }

    async fn is_attendance_marked(
        &self,
        user: &UserId,
        class: &ClassId,
    ) -> Result<bool, GatewayError> {
        let url = self.endpoint(&[
            "logins",
            user.as_str(),
            "enrolledClasses",
            class.as_str(),
            "attendance",
        ])?;
        // Callers check enrollment first; a null flag means the enrollment
        // record exists but attendance was never set, which reads as false.
        match self.read(url).await? {
            Value::Bool(marked) => Ok(marked),
            Value::Null => Ok(false),
            other => Err(GatewayError::InvalidResponse(format!(
                "attendance flag is not a boolean: {other}"
            ))),
        }
    }

    async fn mark_attendance(&self, user: &UserId, class: &ClassId) -> Result<(), GatewayError> {
        let url = self.endpoint(&[
            "logins",
            user.as_str(),
            "enrolledClasses",
            class.as_str(),
            "attendance",
        ])?;
        self.write(reqwest::Method::PUT, url, &true).await?;
        Ok(())
    }

    async fn append_attendance_log(
        &self,
        user: &UserId,
        class: &ClassId,
        entry: NewLogEntry,
    ) -> Result<LogId, GatewayError> {
        let url = self.log_collection(user, class)?;
        let body = LogCreate {
            date: entry.date.format(DATE_FORMAT).to_string(),
            time_in: format_clock(entry.time_in),
            scanner_in: entry.scanner_in.as_str(),
        };
        let payload = self.write(reqwest::Method::POST, url, &body).await?;

        let created: Created = serde_json::from_value(payload)
            .map_err(|err| GatewayError::InvalidResponse(err.to_string()))?;
        LogId::new(created.name)
            .map_err(|err| GatewayError::InvalidResponse(format!("bad log ID: {err}")))
    }

    async fn list_attendance_logs(
        &self,
        user: &UserId,
        class: &ClassId,
    ) -> Result<Vec<LogEntry>, GatewayError> {
        let url = self.log_collection(user, class)?;
        let payload = self.read(url).await?;
        Ok(decode_logs(payload))
    }

    async fn close_attendance_log(
        &self,
        user: &UserId,
        class: &ClassId,
        log: &LogId,
        time_out: NaiveTime,
        scanner: &ScannerId,
    ) -> Result<(), GatewayError> {
        let url = self.endpoint(&[
            "logins",
            user.as_str(),
            "enrolledClasses",
            class.as_str(),
            "attendanceLogs",
            log.as_str(),
        ])?;
        let body = LogClose {
            time_out: format_clock(time_out),
            scanner_out: scanner.as_str(),
        };
        self.write(reqwest::Method::PATCH, url, &body).await?;
        Ok(())
    }

    async fn fetch_user_display_name(&self, user: &UserId) -> Result<String, GatewayError> {
        let url = self.endpoint(&["logins", user.as_str(), "name"])?;
        match self.read(url).await? {
            Value::String(name) if !name.trim().is_empty() => Ok(name),
            _ => Err(GatewayError::InvalidResponse(format!(
                "no display name for {user}"
            ))),
        }
    }
}

#[derive(Debug, Serialize)]
struct LogCreate<'a> {
    date: String,
    time_in: String,
    scanner_in: &'a str,
}

#[derive(Debug, Serialize)]
struct LogClose<'a> {
    time_out: String,
    scanner_out: &'a str,
}

#[derive(Debug, Deserialize)]
struct Created {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawClass {
    name: Option<String>,
    room: Option<String>,
    #[serde(default)]
    days: Vec<String>,
    time: Option<String>,
    #[serde(rename = "archiveClass", default)]
    archived: bool,
}

#[derive(Debug, Deserialize)]
struct RawLog {
    date: Option<String>,
    time_in: Option<String>,
    scanner_in: Option<String>,
    #[serde(default)]
    time_out: Option<String>,
    #[serde(default)]
    scanner_out: Option<String>,
}

/// Decodes the `classes.json` map into sessions for one room.
///
/// The wire format is a JSON map, so entry order is not meaningful; entries
/// are converted in sorted key order to keep overlap resolution stable
/// across refreshes. Malformed entries are skipped with a warning rather
/// than failing the whole schedule.
fn decode_schedule(payload: Value, room: &str) -> Vec<Session> {
    let Value::Object(classes) = payload else {
        if !payload.is_null() {
            tracing::warn!("class schedule is not a map, treating as empty");
        }
        return Vec::new();
    };

    let mut sorted: Vec<_> = classes.into_iter().collect();
    sorted.sort_by(|(a, _), (b, _)| a.cmp(b));

    sorted
        .into_iter()
        .filter_map(|(id, value)| {
            let raw: RawClass = match serde_json::from_value(value) {
                Ok(raw) => raw,
                Err(error) => {
                    tracing::warn!(class = %id, %error, "skipping malformed class entry");
                    return None;
                }
            };
            convert_class(&id, raw)
        })
        .filter(|session| session.room == room)
        .collect()
}

fn convert_class(id: &str, raw: RawClass) -> Option<Session> {
    let skip = |reason: &str| {
        tracing::warn!(class = %id, reason, "skipping class entry");
        None::<Session>
    };

    let Ok(class_id) = ClassId::new(id) else {
        return skip("empty class ID");
    };
    let (Some(name), Some(room), Some(time)) = (raw.name, raw.room, raw.time) else {
        return skip("missing name, room, or time");
    };
    let Ok(window) = time.parse::<TimeWindow>() else {
        return skip("malformed time window");
    };

    let days = raw
        .days
        .iter()
        .filter_map(|day| match day.parse::<Weekday>() {
            Ok(weekday) => Some(weekday),
            Err(_) => {
                tracing::warn!(class = %id, day, "unrecognized day name");
                None
            }
        })
        .collect();

    Some(Session {
        id: class_id,
        name,
        room,
        days,
        window,
        archived: raw.archived,
    })
}

/// Decodes an `attendanceLogs.json` map. Store-assigned IDs sort in creation
/// order, so sorted key order is chronological.
fn decode_logs(payload: Value) -> Vec<LogEntry> {
    let Value::Object(logs) = payload else {
        if !payload.is_null() {
            tracing::warn!("attendance logs are not a map, treating as empty");
        }
        return Vec::new();
    };

    let mut sorted: Vec<_> = logs.into_iter().collect();
    sorted.sort_by(|(a, _), (b, _)| a.cmp(b));

    sorted
        .into_iter()
        .filter_map(|(id, value)| {
            let raw: RawLog = match serde_json::from_value(value) {
                Ok(raw) => raw,
                Err(error) => {
                    tracing::warn!(log = %id, %error, "skipping malformed log entry");
                    return None;
                }
            };
            convert_log(&id, raw)
        })
        .collect()
}

fn convert_log(id: &str, raw: RawLog) -> Option<LogEntry> {
    let skip = |reason: &str| {
        tracing::warn!(log = %id, reason, "skipping log entry");
        None::<LogEntry>
    };

    let Ok(log_id) = LogId::new(id) else {
        return skip("empty log ID");
    };
    let (Some(date), Some(time_in), Some(scanner_in)) =
        (&raw.date, &raw.time_in, &raw.scanner_in)
    else {
        return skip("missing date, time_in, or scanner_in");
    };
    let Ok(date) = NaiveDate::parse_from_str(date, DATE_FORMAT) else {
        return skip("malformed date");
    };
    let Some(time_in) = parse_clock(time_in) else {
        return skip("malformed time_in");
    };
    let Ok(scanner_in) = ScannerId::new(scanner_in.as_str()) else {
        return skip("empty scanner_in");
    };

    // A malformed time_out would make a closed entry look open, so it fails
    // the entry instead of being dropped silently.
    let time_out = match &raw.time_out {
        Some(text) => match parse_clock(text) {
            Some(parsed) => Some(parsed),
            None => return skip("malformed time_out"),
        },
        None => None,
    };
    let scanner_out = raw
        .scanner_out
        .as_ref()
        .and_then(|s| ScannerId::new(s.as_str()).ok());

    Some(LogEntry {
        id: log_id,
        date,
        time_in,
        scanner_in,
        time_out,
        scanner_out,
    })
}

fn parse_clock(text: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(text.trim(), CLOCK_FORMAT).ok()
}

fn format_clock(time: NaiveTime) -> String {
    time.format(CLOCK_FORMAT).to_string()
}
