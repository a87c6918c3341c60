//! The scan loop: the concurrency shell around the reconciler.
//!
//! Continuously polls the scanner, applies presence/removal debouncing and
//! the duplicate-scan cooldown, and feeds the reconciler one logical scan
//! event at a time. Runs as its own task alongside the periodic schedule
//! refresh; the two communicate only through [`SharedState`].

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::gateway::AttendanceGateway;
use crate::hardware::{Actuator, Indicator, Scanner, Tone};
use crate::reconcile::Reconciler;
use crate::token::decode_token;
use crate::tracker::SharedState;
use crate::types::UserId;

/// Timing knobs and the pass sentinel for the scan loop.
#[derive(Debug, Clone)]
pub struct ScanLoopConfig {
    /// Scanner poll interval.
    pub poll_interval: Duration,
    /// Window within which a repeat scan of the same user is a duplicate.
    pub user_cooldown: Duration,
    /// Sustained absence required before a token counts as removed.
    pub removal_threshold: Duration,
    /// Pause after each handled scan before polling resumes.
    pub settle: Duration,
    /// How long the lock stays open in pass mode.
    pub pass_dwell: Duration,
    /// Reserved token that opens the lock without any attendance logic.
    pub pass_token: String,
}

impl Default for ScanLoopConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            user_cooldown: Duration::from_secs(5),
            removal_threshold: Duration::from_secs(2),
            settle: Duration::from_secs(2),
            pass_dwell: Duration::from_secs(2),
            pass_token: "hallpasstest".to_string(),
        }
    }
}

/// The long-running scanning task.
pub struct ScanLoop<S, A, I, G> {
    scanner: S,
    actuator: A,
    indicator: I,
    reconciler: Reconciler<G>,
    shared: Arc<SharedState>,
    config: ScanLoopConfig,
    last_user: Option<UserId>,
    last_scan: Option<Instant>,
}

impl<S, A, I, G> ScanLoop<S, A, I, G>
where
    S: Scanner,
    A: Actuator,
    I: Indicator,
    G: AttendanceGateway,
{
    pub fn new(
        scanner: S,
        actuator: A,
        indicator: I,
        reconciler: Reconciler<G>,
        shared: Arc<SharedState>,
        config: ScanLoopConfig,
    ) -> Self {
        Self {
            scanner,
            actuator,
            indicator,
            reconciler,
            shared,
            config,
            last_user: None,
            last_scan: None,
        }
    }

    /// Runs until cancelled. Each reconciliation runs to completion; the
    /// token is only observed between scan cycles.
    pub async fn run(mut self, cancel: CancellationToken) {
        loop {
            if cancel.is_cancelled() {
                break;
            }

            if !self.shared.scanning_enabled() {
                tokio::select! {
                    () = cancel.cancelled() => break,
                    () = tokio::time::sleep(self.config.poll_interval) => {}
                }
                continue;
            }

            let polled = tokio::select! {
                () = cancel.cancelled() => break,
                token = self.scanner.poll_token(self.config.poll_interval) => token,
            };

            if let Some(raw) = polled {
                self.handle_scan(&raw).await;
            }
        }
        tracing::info!("scan loop shutting down");
    }

    async fn handle_scan(&mut self, raw: &str) {
        let decoded = match decode_token(raw) {
            Ok(decoded) => decoded,
            Err(error) => {
                tracing::warn!(%error, "token detected but invalid");
                return;
            }
        };

        if decoded == self.config.pass_token {
            self.handle_pass_mode().await;
            return;
        }

        let user = match UserId::new(decoded) {
            Ok(user) => user,
            Err(error) => {
                tracing::warn!(%error, "decoded token is not a usable identity");
                return;
            }
        };
        tracing::debug!(%user, "token scanned");

        if self.is_duplicate(&user) {
            tracing::info!(%user, "duplicate scan ignored");
            self.indicator.show_status("Duplicate scan");
            self.wait_for_removal().await;
            tokio::time::sleep(self.config.settle).await;
            self.restore_idle_view();
            return;
        }

        self.last_user = Some(user.clone());
        self.last_scan = Some(Instant::now());

        let now = chrono::Local::now().naive_local();
        let outcome = self
            .reconciler
            .reconcile(&user, now, &self.actuator, &self.indicator)
            .await;
        tracing::debug!(%user, ?outcome, "scan reconciled");

        // Dedup state is kept until the cooldown expires on its own; a
        // re-presentation of the same badge inside the window is a duplicate
        // even after the removal wait.
        self.wait_for_removal().await;
        tokio::time::sleep(self.config.settle).await;
        self.restore_idle_view();
    }

    fn restore_idle_view(&self) {
        self.indicator
            .show_idle(self.shared.idle_class_name().as_deref());
    }

    /// Pass mode: open the lock for the sentinel token, no attendance or
    /// enrollment logic.
    async fn handle_pass_mode(&mut self) {
        tracing::info!("pass token detected, opening lock");
        self.shared.set_scanning_enabled(false);
        self.indicator.emit_tone(Tone::Alert);
        self.actuator.set_lock(true);
        self.indicator.show_status("Hall Pass");

        self.wait_for_removal().await;
        tokio::time::sleep(self.config.pass_dwell).await;
        self.actuator.set_lock(false);

        self.restore_idle_view();
        self.shared.set_scanning_enabled(true);
        self.last_user = None;
        self.last_scan = None;
    }

    fn is_duplicate(&self, user: &UserId) -> bool {
        self.last_user.as_ref() == Some(user)
            && self
                .last_scan
                .is_some_and(|at| at.elapsed() < self.config.user_cooldown)
    }

    /// Blocks this task until the token has been absent for the removal
    /// threshold. Presence resets the absence clock.
    async fn wait_for_removal(&mut self) {
        let mut absence_start = Instant::now();
        loop {
            let poll_started = Instant::now();
            if self
                .scanner
                .poll_token(self.config.poll_interval)
                .await
                .is_some()
            {
                absence_start = Instant::now();
            } else if absence_start.elapsed() >= self.config.removal_threshold {
                return;
            }
            // A poll that returned early still counts as one interval.
            if let Some(rest) = self.config.poll_interval.checked_sub(poll_started.elapsed()) {
                tokio::time::sleep(rest).await;
            }
        }
    }
}
