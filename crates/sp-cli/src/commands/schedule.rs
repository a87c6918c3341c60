//! The `schedule` subcommand: one-shot schedule fetch and resolution.

use anyhow::{Context, Result};
use serde::Serialize;
use sp_core::gateway::AttendanceGateway;
use sp_core::schedule::{Session, resolve_active};
use sp_core::types::ClassId;
use sp_gateway::RestGateway;

use crate::Config;

#[derive(Serialize)]
struct ScheduleOutput<'a> {
    room: &'a str,
    sessions: &'a [Session],
    active: Option<&'a ClassId>,
}

pub async fn run(config: &Config, json: bool) -> Result<()> {
    let gateway =
        RestGateway::new(&config.store_url).context("failed to set up the store client")?;
    let sessions = gateway
        .fetch_schedule(&config.room)
        .await
        .context("failed to fetch the schedule")?;
    let now = chrono::Local::now().naive_local();
    let active = resolve_active(&sessions, now, &config.room);

    if json {
        let output = ScheduleOutput {
            room: &config.room,
            sessions: &sessions,
            active: active.as_ref(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if sessions.is_empty() {
        println!("No sessions scheduled for {}", config.room);
        return Ok(());
    }

    for session in &sessions {
        let days = session
            .days
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let archived = if session.archived { " (archived)" } else { "" };
        println!(
            "{}  {}  {} {}-{}  {}{archived}",
            session.id,
            session.name,
            days,
            session.window.start.format("%H:%M"),
            session.window.end.format("%H:%M"),
            session.room,
        );
    }

    match active {
        Some(id) => println!("Active now: {id}"),
        None => println!("No active session right now"),
    }
    Ok(())
}
