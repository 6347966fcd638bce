//! Tokio task owning one page's `PageDriver` and scroll surface.
//!
//! Commands arrive from the `PageRouter`; everything else (local timer
//! ticks, liveness checks, ping outcomes, visibility changes, unload) comes
//! through the page's own event channel. Notices to the orchestrator run on
//! spawned tasks so the page keeps answering commands while they are in
//! flight.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::managers::page_driver::{PageDriver, TimerChange, VisibilityAction};
use crate::managers::viewport::ScrollSurface;
use crate::runtime::orchestrator_task::OrchestratorLink;
use crate::runtime::timer::RepeatingTask;
use crate::runtime::transport::{PageEnvelope, PageRouter};
use crate::types::errors::DeliveryError;
use crate::types::protocol::{NoticeReply, PageNotice};
use crate::types::session::PageId;
use crate::types::settings::{ScrollSettings, TimingConfig};

const COMMAND_CAPACITY: usize = 64;
const EVENT_CAPACITY: usize = 64;

/// Page-local inputs other than orchestrator commands.
#[derive(Debug)]
pub enum PageEvent {
    LocalTick,
    LivenessCheck,
    PingResult {
        sent_at: u64,
        result: Result<NoticeReply, DeliveryError>,
    },
    Visibility { hidden: bool },
    HandBackResult {
        settings: ScrollSettings,
        result: Result<NoticeReply, DeliveryError>,
    },
    /// Navigation away: tell the orchestrator, then exit.
    Unload,
    /// Tab removed: exit without messaging anyone.
    Close,
}

/// Host-side handle to a running page task.
#[derive(Clone)]
pub struct PageHandle {
    page_id: PageId,
    events: mpsc::Sender<PageEvent>,
}

impl PageHandle {
    pub async fn set_hidden(&self, hidden: bool) -> Result<(), DeliveryError> {
        self.post(PageEvent::Visibility { hidden }).await
    }

    pub async fn unload(&self) -> Result<(), DeliveryError> {
        self.post(PageEvent::Unload).await
    }

    pub async fn close(&self) -> Result<(), DeliveryError> {
        self.post(PageEvent::Close).await
    }

    async fn post(&self, event: PageEvent) -> Result<(), DeliveryError> {
        self.events
            .send(event)
            .await
            .map_err(|_| DeliveryError::Unreachable(self.page_id.to_string()))
    }
}

/// Registers the page with `router` and spawns its task.
pub async fn spawn_page(
    page_id: PageId,
    surface: Box<dyn ScrollSurface>,
    router: &PageRouter,
    link: OrchestratorLink,
    timing: TimingConfig,
) -> (PageHandle, JoinHandle<()>) {
    let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
    let (event_tx, event_rx) = mpsc::channel(EVENT_CAPACITY);
    router.register(page_id.clone(), command_tx).await;

    let epoch = Instant::now();
    let task = PageTask {
        page_id: page_id.clone(),
        driver: PageDriver::new(timing.throttle_threshold_ms(), 0),
        surface,
        link,
        router: router.clone(),
        events: event_tx.downgrade(),
        timing,
        epoch,
        local_timer: None,
    };
    let join = tokio::spawn(task.run(command_rx, event_rx));
    let handle = PageHandle {
        page_id,
        events: event_tx,
    };
    (handle, join)
}

struct PageTask {
    page_id: PageId,
    driver: PageDriver,
    surface: Box<dyn ScrollSurface>,
    link: OrchestratorLink,
    router: PageRouter,
    events: mpsc::WeakSender<PageEvent>,
    timing: TimingConfig,
    epoch: Instant,
    local_timer: Option<RepeatingTask>,
}

impl PageTask {
    async fn run(mut self, mut commands: mpsc::Receiver<PageEnvelope>, mut events: mpsc::Receiver<PageEvent>) {
        debug!(page_id = %self.page_id, "page driver started");
        self.notify_detached(PageNotice::PageReady);
        let _liveness = self.event_timer("page-liveness", self.timing.liveness_tick, || PageEvent::LivenessCheck);

        loop {
            tokio::select! {
                Some(envelope) = commands.recv() => self.handle_envelope(envelope),
                maybe_event = events.recv() => match maybe_event {
                    Some(PageEvent::Unload) => {
                        self.shutdown(true).await;
                        break;
                    }
                    Some(PageEvent::Close) | None => {
                        self.shutdown(false).await;
                        break;
                    }
                    Some(event) => self.handle_event(event),
                },
            }
        }
        debug!(page_id = %self.page_id, "page driver exited");
    }

    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    fn handle_envelope(&mut self, envelope: PageEnvelope) {
        let now = self.now_ms();
        let PageEnvelope { command, reply } = envelope;
        trace!(page_id = %self.page_id, command = command.kind(), "command");
        let (answer, change) = self.driver.handle_command(command, self.surface.as_mut(), now);
        if let Some(change) = change {
            self.apply_timer(change);
        }
        if reply.send(answer).is_err() {
            trace!(page_id = %self.page_id, "sender gave up before the reply");
        }
    }

    fn handle_event(&mut self, event: PageEvent) {
        let now = self.now_ms();
        match event {
            PageEvent::LocalTick => {
                self.driver.local_tick(self.surface.as_mut());
            }
            PageEvent::LivenessCheck => {
                if let Some(change) = self.driver.check_liveness(now) {
                    info!(event = "self_detected_throttling", page_id = %self.page_id);
                    self.apply_timer(change);
                }
                if self.driver.should_ping() {
                    self.ping();
                }
            }
            PageEvent::PingResult { sent_at, result } => {
                if let Some(change) = self.driver.on_ping_result(&result, sent_at, now) {
                    info!(event = "ping_failed_self_drive", page_id = %self.page_id);
                    self.apply_timer(change);
                }
            }
            PageEvent::Visibility { hidden: true } => {
                if let VisibilityAction::Timer(change) = self.driver.on_hidden() {
                    info!(event = "hidden_self_drive", page_id = %self.page_id);
                    self.apply_timer(change);
                }
            }
            PageEvent::Visibility { hidden: false } => match self.driver.on_visible() {
                VisibilityAction::HandBack { timer, settings } => {
                    self.apply_timer(timer);
                    self.hand_back(settings);
                }
                VisibilityAction::Timer(change) => self.apply_timer(change),
                VisibilityAction::Nothing => {}
            },
            PageEvent::HandBackResult { settings, result } => match result {
                Ok(NoticeReply::Ack { success: true }) => {
                    info!(event = "handback_complete", page_id = %self.page_id);
                }
                other => {
                    warn!(page_id = %self.page_id, outcome = ?other, "handback failed, resuming local driving");
                    let change = self.driver.on_hand_back_failed(settings);
                    self.apply_timer(change);
                }
            },
            PageEvent::Unload | PageEvent::Close => {}
        }
    }

    async fn shutdown(&mut self, announce: bool) {
        let change = self.driver.teardown();
        self.apply_timer(change);
        self.router.unregister(&self.page_id).await;
        if announce {
            self.notify_detached(PageNotice::PageUnloading);
        }
        info!(event = "page_torn_down", page_id = %self.page_id, announced = announce);
    }

    /// Keeps at most one local timer alive.
    fn apply_timer(&mut self, change: TimerChange) {
        match change {
            TimerChange::Arm(period) => {
                self.local_timer = Some(self.event_timer("page-local", period, || PageEvent::LocalTick));
            }
            TimerChange::Disarm => {
                self.local_timer = None;
            }
        }
    }

    fn event_timer(&self, name: &'static str, period: Duration, make: fn() -> PageEvent) -> RepeatingTask {
        let events = self.events.clone();
        RepeatingTask::spawn(name, period, move || match events.upgrade() {
            Some(tx) => !matches!(tx.try_send(make()), Err(TrySendError::Closed(_))),
            None => false,
        })
    }

    fn ping(&self) {
        let link = self.link.clone();
        let page_id = self.page_id.clone();
        let events = self.events.clone();
        let timestamp = self.now_ms();
        tokio::spawn(async move {
            let result = link.notify(&page_id, PageNotice::LivenessPing { timestamp }).await;
            if let Some(tx) = events.upgrade() {
                let _ = tx
                    .send(PageEvent::PingResult {
                        sent_at: timestamp,
                        result,
                    })
                    .await;
            }
        });
    }

    fn hand_back(&self, settings: ScrollSettings) {
        let link = self.link.clone();
        let page_id = self.page_id.clone();
        let events = self.events.clone();
        tokio::spawn(async move {
            let result = link.notify(&page_id, PageNotice::PageVisible { settings }).await;
            if let Some(tx) = events.upgrade() {
                let _ = tx.send(PageEvent::HandBackResult { settings, result }).await;
            }
        });
    }

    /// Best-effort notice whose reply nobody waits for.
    fn notify_detached(&self, notice: PageNotice) {
        let link = self.link.clone();
        let page_id = self.page_id.clone();
        tokio::spawn(async move {
            let kind = notice.kind();
            if let Err(err) = link.notify(&page_id, notice).await {
                debug!(page_id = %page_id, notice = kind, error = %err, "notice not delivered");
            }
        });
    }
}
