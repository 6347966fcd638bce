//! Tokio task owning the `ScrollOrchestrator`.
//!
//! Every input (control requests, page notices, timer ticks, delivery
//! outcomes) arrives through one mailbox, so session state is only touched
//! from this task. Deliveries to pages run as spawned tasks and report back
//! as `Delivered` events; the task never waits on a page while holding state.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, info, trace};

use crate::managers::scroll_orchestrator::{ScrollOrchestrator, ScrollOrchestratorTrait, ToggleOutcome};
use crate::runtime::timer::RepeatingTask;
use crate::runtime::transport::PageRouter;
use crate::types::errors::DeliveryError;
use crate::types::protocol::{ControlReply, ControlRequest, NoticeReply, Outbound, PageCommand, PageNotice, PageReply};
use crate::types::session::{PageId, SessionStatus};
use crate::types::settings::{ScrollSettings, TimingConfig};

const MAILBOX_CAPACITY: usize = 256;

/// Everything the orchestrator task reacts to.
#[derive(Debug)]
pub enum OrchestratorEvent {
    Control {
        request: ControlRequest,
        reply: oneshot::Sender<ControlReply>,
    },
    Notice {
        page_id: PageId,
        notice: PageNotice,
        reply: oneshot::Sender<NoticeReply>,
    },
    PageFocused(PageId),
    /// Answered once the session is gone, so no later tick can target the page.
    PageClosed {
        page_id: PageId,
        reply: oneshot::Sender<bool>,
    },
    SetDefaults(ScrollSettings),
    StepTick,
    LivenessTick,
    Delivered {
        page_id: PageId,
        command: PageCommand,
        result: Result<PageReply, DeliveryError>,
    },
    Shutdown,
}

/// Cloneable front door to a running orchestrator task.
#[derive(Clone)]
pub struct OrchestratorHandle {
    mailbox: mpsc::Sender<OrchestratorEvent>,
    throttled: Arc<AtomicBool>,
    reply_timeout: Duration,
}

/// The page-side view of the orchestrator: notices only.
#[derive(Clone)]
pub struct OrchestratorLink {
    mailbox: mpsc::Sender<OrchestratorEvent>,
    throttled: Arc<AtomicBool>,
    reply_timeout: Duration,
}

impl OrchestratorLink {
    /// Sends a notice and waits (bounded) for the orchestrator's reply.
    pub async fn notify(&self, page_id: &PageId, notice: PageNotice) -> Result<NoticeReply, DeliveryError> {
        if self.throttled.load(Ordering::SeqCst) {
            time::sleep(self.reply_timeout).await;
            return Err(DeliveryError::TimedOut("orchestrator".to_string()));
        }
        let exchange = async {
            let (reply_tx, reply_rx) = oneshot::channel();
            self.mailbox
                .send(OrchestratorEvent::Notice {
                    page_id: page_id.clone(),
                    notice,
                    reply: reply_tx,
                })
                .await
                .map_err(|_| DeliveryError::Unreachable("orchestrator".to_string()))?;
            reply_rx
                .await
                .map_err(|_| DeliveryError::Unreachable("orchestrator".to_string()))
        };
        match time::timeout(self.reply_timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(DeliveryError::TimedOut("orchestrator".to_string())),
        }
    }
}

impl OrchestratorHandle {
    /// Spawns the orchestrator task.
    pub fn spawn(router: PageRouter, defaults: ScrollSettings, timing: TimingConfig) -> (Self, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(MAILBOX_CAPACITY);
        let throttled = Arc::new(AtomicBool::new(false));
        let task = OrchestratorTask {
            core: ScrollOrchestrator::new(defaults, timing.throttle_threshold_ms()),
            router,
            mailbox: tx.downgrade(),
            timing,
            epoch: Instant::now(),
            throttled: throttled.clone(),
            step_timer: None,
            liveness_timer: None,
        };
        let join = tokio::spawn(task.run(rx));
        let handle = Self {
            mailbox: tx,
            throttled,
            reply_timeout: timing.reply_timeout,
        };
        (handle, join)
    }

    pub fn link(&self) -> OrchestratorLink {
        OrchestratorLink {
            mailbox: self.mailbox.clone(),
            throttled: self.throttled.clone(),
            reply_timeout: self.reply_timeout,
        }
    }

    async fn post(&self, event: OrchestratorEvent) -> Result<(), DeliveryError> {
        self.mailbox
            .send(event)
            .await
            .map_err(|_| DeliveryError::Unreachable("orchestrator".to_string()))
    }

    pub async fn request(&self, request: ControlRequest) -> Result<ControlReply, DeliveryError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.post(OrchestratorEvent::Control {
            request,
            reply: reply_tx,
        })
        .await?;
        reply_rx
            .await
            .map_err(|_| DeliveryError::Unreachable("orchestrator".to_string()))
    }

    pub async fn start(&self, page_id: &PageId, settings: Option<ScrollSettings>) -> Result<ControlReply, DeliveryError> {
        self.request(ControlRequest::StartScrolling {
            page_id: page_id.clone(),
            settings,
        })
        .await
    }

    pub async fn stop(&self, page_id: &PageId) -> Result<ControlReply, DeliveryError> {
        self.request(ControlRequest::StopScrolling {
            page_id: page_id.clone(),
        })
        .await
    }

    pub async fn toggle(&self, page_id: &PageId) -> Result<ControlReply, DeliveryError> {
        self.request(ControlRequest::ToggleScrolling {
            page_id: page_id.clone(),
        })
        .await
    }

    pub async fn status(&self, page_id: &PageId) -> Result<SessionStatus, DeliveryError> {
        match self
            .request(ControlRequest::GetStatus {
                page_id: page_id.clone(),
            })
            .await?
        {
            ControlReply::Status(status) => Ok(status),
            ControlReply::Ack { .. } => Ok(SessionStatus::inactive()),
        }
    }

    pub async fn page_focused(&self, page_id: &PageId) -> Result<(), DeliveryError> {
        self.post(OrchestratorEvent::PageFocused(page_id.clone())).await
    }

    /// Returns whether a session existed for the page.
    pub async fn page_closed(&self, page_id: &PageId) -> Result<bool, DeliveryError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.post(OrchestratorEvent::PageClosed {
            page_id: page_id.clone(),
            reply: reply_tx,
        })
        .await?;
        reply_rx
            .await
            .map_err(|_| DeliveryError::Unreachable("orchestrator".to_string()))
    }

    pub async fn set_defaults(&self, settings: ScrollSettings) -> Result<(), DeliveryError> {
        self.post(OrchestratorEvent::SetDefaults(settings)).await
    }

    /// Simulates host throttling: ticks are dropped and page notices time out.
    /// Control requests are still served.
    pub fn set_throttled(&self, throttled: bool) {
        info!(event = "orchestrator_throttled", throttled = throttled);
        self.throttled.store(throttled, Ordering::SeqCst);
    }

    pub fn is_throttled(&self) -> bool {
        self.throttled.load(Ordering::SeqCst)
    }

    pub async fn shutdown(&self) {
        let _ = self.mailbox.send(OrchestratorEvent::Shutdown).await;
    }
}

struct OrchestratorTask {
    core: ScrollOrchestrator,
    router: PageRouter,
    mailbox: mpsc::WeakSender<OrchestratorEvent>,
    timing: TimingConfig,
    epoch: Instant,
    throttled: Arc<AtomicBool>,
    step_timer: Option<RepeatingTask>,
    liveness_timer: Option<RepeatingTask>,
}

impl OrchestratorTask {
    async fn run(mut self, mut rx: mpsc::Receiver<OrchestratorEvent>) {
        info!(event = "orchestrator_started");
        while let Some(event) = rx.recv().await {
            if !self.handle_event(event) {
                break;
            }
            self.sync_timers();
        }
        self.step_timer = None;
        self.liveness_timer = None;
        info!(event = "orchestrator_stopped", sessions = self.core.session_count());
    }

    fn now_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }

    fn handle_event(&mut self, event: OrchestratorEvent) -> bool {
        let now = self.now_ms();
        match event {
            OrchestratorEvent::Control { request, reply } => {
                let answer = self.handle_control(request, now);
                let _ = reply.send(answer);
            }
            OrchestratorEvent::Notice { page_id, notice, reply } => {
                trace!(page_id = %page_id, notice = notice.kind(), "notice");
                let (answer, outbound) = self.core.on_page_notice(&page_id, &notice, now);
                let _ = reply.send(answer);
                self.dispatch(outbound);
            }
            OrchestratorEvent::PageFocused(page_id) => {
                let outbound = self.core.on_page_focused(&page_id, now);
                self.dispatch(outbound);
            }
            OrchestratorEvent::PageClosed { page_id, reply } => {
                let removed = self.core.on_page_closed(&page_id);
                let _ = reply.send(removed);
            }
            OrchestratorEvent::SetDefaults(settings) => {
                debug!(
                    pixels = settings.pixels_per_step,
                    interval_ms = settings.step_interval_ms,
                    "defaults updated"
                );
                self.core.set_defaults(settings);
            }
            OrchestratorEvent::StepTick => {
                if !self.is_throttled() {
                    let outbound = self.core.step_tick(now);
                    self.dispatch(outbound);
                }
            }
            OrchestratorEvent::LivenessTick => {
                if !self.is_throttled() {
                    let outbound = self.core.liveness_tick(now);
                    self.dispatch(outbound);
                }
            }
            OrchestratorEvent::Delivered {
                page_id,
                command,
                result,
            } => {
                let outbound = self.core.on_delivery(&page_id, &command, &result, now);
                self.dispatch(outbound);
            }
            OrchestratorEvent::Shutdown => return false,
        }
        true
    }

    fn handle_control(&mut self, request: ControlRequest, now: u64) -> ControlReply {
        match request {
            ControlRequest::StartScrolling { page_id, settings } => {
                self.core.start(&page_id, settings, now);
                ControlReply::Ack { success: true }
            }
            ControlRequest::StopScrolling { page_id } => {
                let outbound = self.core.stop(&page_id);
                self.dispatch(outbound);
                ControlReply::Ack { success: true }
            }
            ControlRequest::ToggleScrolling { page_id } => {
                if let ToggleOutcome::Stopped(outbound) = self.core.toggle(&page_id, now) {
                    self.dispatch(Some(outbound));
                }
                ControlReply::Ack { success: true }
            }
            ControlRequest::GetStatus { page_id } => ControlReply::Status(self.core.status(&page_id)),
        }
    }

    fn is_throttled(&self) -> bool {
        self.throttled.load(Ordering::SeqCst)
    }

    /// Delivers each command on its own task; outcomes return as `Delivered`.
    fn dispatch(&self, outbound: impl IntoIterator<Item = Outbound>) {
        for Outbound { page_id, command } in outbound {
            let router = self.router.clone();
            let mailbox = self.mailbox.clone();
            tokio::spawn(async move {
                let result = router.deliver(&page_id, command.clone()).await;
                if let Some(mailbox) = mailbox.upgrade() {
                    let _ = mailbox
                        .send(OrchestratorEvent::Delivered {
                            page_id,
                            command,
                            result,
                        })
                        .await;
                }
            });
        }
    }

    /// Both timers run exactly while at least one session exists.
    fn sync_timers(&mut self) {
        let wanted = self.core.session_count() > 0;
        if wanted && self.step_timer.is_none() {
            debug!("arming orchestrator timers");
            self.step_timer = Some(self.tick_timer("step", self.timing.step_tick, || OrchestratorEvent::StepTick));
            self.liveness_timer = Some(self.tick_timer("liveness", self.timing.liveness_tick, || {
                OrchestratorEvent::LivenessTick
            }));
        } else if !wanted && self.step_timer.is_some() {
            debug!("disarming orchestrator timers");
            self.step_timer = None;
            self.liveness_timer = None;
        }
    }

    fn tick_timer(
        &self,
        name: &'static str,
        period: Duration,
        make: fn() -> OrchestratorEvent,
    ) -> RepeatingTask {
        let mailbox = self.mailbox.clone();
        RepeatingTask::spawn(name, period, move || match mailbox.upgrade() {
            // A full mailbox means the previous tick is still queued.
            Some(tx) => !matches!(tx.try_send(make()), Err(TrySendError::Closed(_))),
            None => false,
        })
    }
}
