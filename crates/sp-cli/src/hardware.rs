//! Host-side hardware adapters.
//!
//! Stand-ins for the checkpoint's physical peripherals: tokens arrive as
//! lines on stdin, the lock relay and buzzer log their transitions, and the
//! display writes to the console. Device deployments swap these for real
//! drivers behind the same traits.

use std::time::Duration;

use sp_core::hardware::{Actuator, Indicator, Scanner, Tone};
use tokio::io::{AsyncBufReadExt, BufReader, Lines, Stdin};

/// Reads one raw token per stdin line.
pub struct StdinScanner {
    lines: Lines<BufReader<Stdin>>,
}

impl StdinScanner {
    pub fn new() -> Self {
        Self {
            lines: BufReader::new(tokio::io::stdin()).lines(),
        }
    }
}

impl Default for StdinScanner {
    fn default() -> Self {
        Self::new()
    }
}

impl Scanner for StdinScanner {
    async fn poll_token(&mut self, timeout: Duration) -> Option<String> {
        match tokio::time::timeout(timeout, self.lines.next_line()).await {
            Ok(Ok(Some(line))) => {
                let token = line.trim();
                if token.is_empty() {
                    None
                } else {
                    Some(token.to_string())
                }
            }
            // EOF: no more tokens will ever arrive. Sleep out the poll so
            // the loop does not spin.
            Ok(Ok(None)) => {
                tokio::time::sleep(timeout).await;
                None
            }
            Ok(Err(error)) => {
                tracing::warn!(%error, "failed to read from stdin");
                None
            }
            Err(_) => None,
        }
    }
}

/// Lock relay stand-in; logs every transition.
#[derive(Debug, Clone, Copy)]
pub struct LogActuator;

impl Actuator for LogActuator {
    fn set_lock(&self, open: bool) {
        if open {
            tracing::info!("lock opened");
        } else {
            tracing::info!("lock closed");
        }
    }
}

/// Console display and buzzer stand-in.
#[derive(Debug, Clone)]
pub struct ConsoleIndicator {
    room: String,
}

impl ConsoleIndicator {
    pub const fn new(room: String) -> Self {
        Self { room }
    }
}

impl Indicator for ConsoleIndicator {
    fn show_status(&self, text: &str) {
        println!("{text}");
    }

    fn show_idle(&self, active_class: Option<&str>) {
        let clock = chrono::Local::now().format("%H:%M").to_string();
        println!("{}", idle_line(&self.room, &clock, active_class));
    }

    fn emit_tone(&self, tone: Tone) {
        tracing::info!(?tone, "tone");
    }
}

fn idle_line(room: &str, clock: &str, active_class: Option<&str>) -> String {
    match active_class {
        Some(name) => format!("{room} | {clock} | {name}"),
        None => format!("{room} | {clock} | No active class"),
    }
}
