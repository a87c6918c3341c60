//! Scan loop behavior under a paused tokio clock: debounce, duplicate-scan
//! cooldown, and pass mode.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{MockGateway, RecordingActuator, RecordingIndicator, WindowScanner, hex_token};
use sp_core::hardware::{Scanner, Tone};
use sp_core::reconcile::Reconciler;
use sp_core::scan_loop::{ScanLoop, ScanLoopConfig};
use sp_core::tracker::SharedState;
use sp_core::types::{ClassId, ScannerId, UserId};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

const fn ms(value: u64) -> Duration {
    Duration::from_millis(value)
}

struct Rig {
    gateway: MockGateway,
    shared: Arc<SharedState>,
    actuator: RecordingActuator,
    indicator: RecordingIndicator,
}

impl Rig {
    fn new() -> Self {
        Self {
            gateway: MockGateway::new(),
            shared: Arc::new(SharedState::new()),
            actuator: RecordingActuator::new(),
            indicator: RecordingIndicator::new(),
        }
    }

    async fn with_active_class(self, id: &str) -> Self {
        let class = ClassId::new(id).unwrap();
        self.shared.tracker().lock().await.update(Some(class));
        self
    }

    fn spawn(
        &self,
        windows: Vec<(Duration, Duration, String)>,
    ) -> (CancellationToken, tokio::task::JoinHandle<()>) {
        self.spawn_with(WindowScanner::new(windows))
    }

    fn spawn_with<S: Scanner + 'static>(
        &self,
        scanner: S,
    ) -> (CancellationToken, tokio::task::JoinHandle<()>) {
        let reconciler = Reconciler::new(
            self.gateway.clone(),
            Arc::clone(&self.shared),
            ScannerId::new("room_1_reader_1").unwrap(),
            Duration::ZERO,
        );
        let scan_loop = ScanLoop::new(
            scanner,
            self.actuator.clone(),
            self.indicator.clone(),
            reconciler,
            Arc::clone(&self.shared),
            ScanLoopConfig::default(),
        );
        let cancel = CancellationToken::new();
        let handle = tokio::spawn(scan_loop.run(cancel.clone()));
        (cancel, handle)
    }
}

/// Reports a present token without consuming the poll budget; absence
/// consumes the whole poll, like a blocking camera read.
struct EagerScanner {
    start: Instant,
    windows: Vec<(Duration, Duration, String)>,
}

impl EagerScanner {
    fn new(windows: Vec<(Duration, Duration, String)>) -> Self {
        Self {
            start: Instant::now(),
            windows,
        }
    }
}

impl Scanner for EagerScanner {
    async fn poll_token(&mut self, timeout: Duration) -> Option<String> {
        let elapsed = self.start.elapsed();
        let hit = self
            .windows
            .iter()
            .find(|(from, to, _)| elapsed >= *from && elapsed < *to)
            .map(|(_, _, token)| token.clone());
        if hit.is_none() {
            tokio::time::sleep(timeout).await;
        }
        hit
    }
}

async fn run_for(cancel: CancellationToken, handle: tokio::task::JoinHandle<()>, dur: Duration) {
    tokio::time::sleep(dur).await;
    cancel.cancel();
    handle.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn duplicate_scan_within_cooldown_reconciles_once() {
    let rig = Rig::new().with_active_class("c1").await;
    let user = UserId::new("u1").unwrap();
    let class = ClassId::new("c1").unwrap();
    rig.gateway.enroll(&user, &class);

    // Same badge presented twice, the second time 4.5s after the first scan:
    // inside the 5s cooldown.
    let (cancel, handle) = rig.spawn(vec![
        (ms(0), ms(300), hex_token("u1")),
        (ms(4500), ms(4900), hex_token("u1")),
    ]);
    run_for(cancel, handle, Duration::from_secs(12)).await;

    assert_eq!(rig.gateway.calls_named("enrolled:"), 1);
    assert_eq!(rig.gateway.calls_named("mark:"), 1);
    assert!(
        rig.indicator
            .statuses()
            .contains(&"Duplicate scan".to_string())
    );
}

#[tokio::test(start_paused = true)]
async fn rescan_after_cooldown_reconciles_again() {
    let rig = Rig::new().with_active_class("c1").await;
    let user = UserId::new("u1").unwrap();
    let class = ClassId::new("c1").unwrap();
    rig.gateway.enroll(&user, &class);

    // Second presentation well past the 5s cooldown window.
    let (cancel, handle) = rig.spawn(vec![
        (ms(0), ms(300), hex_token("u1")),
        (ms(5300), ms(5600), hex_token("u1")),
    ]);
    run_for(cancel, handle, Duration::from_secs(12)).await;

    assert_eq!(rig.gateway.calls_named("enrolled:"), 2);
    // First scan marked and opened a log; the second closed it.
    assert_eq!(rig.gateway.calls_named("mark:"), 1);
    assert_eq!(rig.gateway.calls_named("close:"), 1);
    let logs = rig.gateway.logs_for(&user, &class);
    assert_eq!(logs.len(), 1);
    assert!(!logs[0].is_open());
}

#[tokio::test(start_paused = true)]
async fn pass_token_opens_lock_without_attendance_logic() {
    let rig = Rig::new().with_active_class("c1").await;
    rig.shared
        .set_idle_class_name(Some("Physics 101".to_string()));

    let (cancel, handle) = rig.spawn(vec![(ms(0), ms(300), hex_token("hallpasstest"))]);
    run_for(cancel, handle, Duration::from_secs(8)).await;

    assert!(rig.gateway.calls().is_empty());
    assert_eq!(rig.actuator.history(), vec![true, false]);
    assert_eq!(rig.indicator.tones(), vec![Tone::Alert]);
    assert!(rig.indicator.statuses().contains(&"Hall Pass".to_string()));
    assert_eq!(
        rig.indicator.idles(),
        vec![Some("Physics 101".to_string())]
    );
    assert!(rig.shared.scanning_enabled());
}

#[tokio::test(start_paused = true)]
async fn removal_debounce_completes_within_one_poll_of_threshold() {
    let rig = Rig::new().with_active_class("c1").await;

    // Token present for 250ms, reported instantly on each poll. The last
    // presence poll lands at 200ms, the 2s absence threshold is met at 2.2s,
    // and the 2s pass dwell closes the lock by 4.2s. Double-paying the poll
    // interval after an early-returning poll would push the close past this
    // deadline.
    let (cancel, handle) = rig.spawn_with(EagerScanner::new(vec![(
        ms(0),
        ms(250),
        hex_token("hallpasstest"),
    )]));
    run_for(cancel, handle, ms(4300)).await;

    assert_eq!(rig.actuator.history(), vec![true, false]);
    assert!(rig.shared.scanning_enabled());
    assert!(rig.gateway.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn invalid_payload_is_ignored() {
    let rig = Rig::new().with_active_class("c1").await;

    let (cancel, handle) = rig.spawn(vec![(ms(0), ms(300), "not-hex!".to_string())]);
    run_for(cancel, handle, Duration::from_secs(3)).await;

    assert!(rig.gateway.calls().is_empty());
    assert!(rig.actuator.history().is_empty());
}
