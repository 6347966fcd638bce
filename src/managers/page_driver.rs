//! Page Driver state machine.
//!
//! Runs inside each scrolled page: applies scroll steps to the page's
//! scroll targets, answers liveness probes, and decides when the page must
//! self-drive because the orchestrator has gone quiet. Timer arming is
//! returned as a `TimerChange` so the owning task can keep exactly one
//! local timer alive.

use std::time::Duration;

use tracing::{debug, info, trace};

use crate::managers::viewport::{ScrollSurface, ScrollTarget};
use crate::types::errors::DeliveryError;
use crate::types::protocol::{NoticeReply, PageCommand, PageInfo, PageReply};
use crate::types::settings::ScrollSettings;

/// Scroll percentage above which the end of the region is considered reached.
pub const LOOP_END_PERCENTAGE: f64 = 0.99;
/// Scroll percentage below which a loop reset is considered complete.
pub const LOOP_RESET_PERCENTAGE: f64 = 0.01;

/// Instruction for the task that owns the local stepping timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerChange {
    /// Start (or replace) the local timer with this period.
    Arm(Duration),
    /// Cancel the local timer.
    Disarm,
}

/// What the page should do after a visibility transition.
#[derive(Debug, Clone, PartialEq)]
pub enum VisibilityAction {
    Nothing,
    /// Only the local timer changes.
    Timer(TimerChange),
    /// Stop self-driving and tell the orchestrator to resume with `settings`.
    HandBack {
        timer: TimerChange,
        settings: ScrollSettings,
    },
}

/// Per-page mutable scroll state.
#[derive(Debug, Clone, PartialEq)]
pub struct PageScrollState {
    pub loop_armed: bool,
    pub local_settings: Option<ScrollSettings>,
    pub local_driving: bool,
    /// Page clock, milliseconds.
    pub last_liveness_at: u64,
    pub hidden: bool,
}

/// Page-side half of the coordination protocol.
pub struct PageDriver {
    state: PageScrollState,
    throttle_threshold_ms: u64,
}

impl PageDriver {
    pub fn new(throttle_threshold_ms: u64, now: u64) -> Self {
        Self {
            state: PageScrollState {
                loop_armed: false,
                local_settings: None,
                local_driving: false,
                last_liveness_at: now,
                hidden: false,
            },
            throttle_threshold_ms,
        }
    }

    pub fn state(&self) -> &PageScrollState {
        &self.state
    }

    pub fn is_local_driving(&self) -> bool {
        self.state.local_driving
    }

    /// Applies one step to the first candidate target that actually moves.
    ///
    /// Returns the observed offset change of that target, or `0.0` when no
    /// candidate moved.
    pub fn apply_scroll_step(&mut self, surface: &mut dyn ScrollSurface, pixels: i32, looping: bool) -> f64 {
        for target in surface.targets() {
            let delta = self.step_target(target, pixels as f64, looping);
            if delta != 0.0 {
                return delta;
            }
        }
        0.0
    }

    fn step_target(&mut self, target: &mut dyn ScrollTarget, amount: f64, looping: bool) -> f64 {
        let percentage = match target.scroll_percentage() {
            Some(p) if p.is_finite() => p,
            _ => return 0.0,
        };
        let at_end = percentage > LOOP_END_PERCENTAGE;
        let before = target.scroll_offset();

        if self.state.loop_armed {
            if percentage < LOOP_RESET_PERCENTAGE {
                self.state.loop_armed = false;
            }
        } else {
            target.scroll_to(before + amount);
        }

        let delta = target.scroll_offset() - before;

        if at_end && looping {
            self.state.loop_armed = true;
            target.scroll_to(0.0);
        }

        delta
    }

    /// Caches `settings` and starts self-driving. Always re-arms, so an
    /// existing local timer is replaced rather than duplicated.
    pub fn start_local_driving(&mut self, settings: ScrollSettings) -> TimerChange {
        self.state.local_settings = Some(settings);
        self.state.local_driving = true;
        info!(
            event = "local_driving_started",
            interval_ms = settings.step_interval_ms,
            pixels = settings.pixels_per_step
        );
        TimerChange::Arm(settings.interval())
    }

    /// Stops self-driving and forgets the cached settings.
    pub fn stop_local_driving(&mut self) -> TimerChange {
        if self.state.local_driving {
            info!(event = "local_driving_stopped");
        }
        self.state.local_driving = false;
        self.state.local_settings = None;
        TimerChange::Disarm
    }

    /// One tick of the local timer.
    pub fn local_tick(&mut self, surface: &mut dyn ScrollSurface) -> f64 {
        if !self.state.local_driving {
            return 0.0;
        }
        match self.state.local_settings {
            Some(settings) => self.apply_scroll_step(surface, settings.pixels_per_step, settings.looping),
            None => 0.0,
        }
    }

    /// Handles one command from the orchestrator or the control surface.
    pub fn handle_command(
        &mut self,
        command: PageCommand,
        surface: &mut dyn ScrollSurface,
        now: u64,
    ) -> (PageReply, Option<TimerChange>) {
        if command.from_orchestrator() {
            self.state.last_liveness_at = now;
        }
        match command {
            PageCommand::ScrollStep { settings } => {
                self.state.local_settings = Some(settings);
                // The local timer is the stepper until the page hands control back.
                if self.state.local_driving {
                    debug!(event = "orchestrator_step_skipped");
                } else {
                    self.apply_scroll_step(surface, settings.pixels_per_step, settings.looping);
                }
                (PageReply::Ack { success: true }, None)
            }
            PageCommand::StartLocalDriving { settings } => {
                let change = self.start_local_driving(settings);
                (PageReply::Ack { success: true }, Some(change))
            }
            PageCommand::StopLocalDriving => {
                let change = self.stop_local_driving();
                (PageReply::Ack { success: true }, Some(change))
            }
            PageCommand::ResetLoop => {
                self.state.loop_armed = false;
                (PageReply::Ack { success: true }, None)
            }
            PageCommand::LivenessProbe { .. } => (
                PageReply::Liveness {
                    local_driving: self.state.local_driving,
                },
                None,
            ),
            PageCommand::GetPageInfo => (PageReply::PageInfo(self.page_info(surface)), None),
        }
    }

    /// Self-initiated throttling check, run on the page's liveness tick.
    pub fn check_liveness(&mut self, now: u64) -> Option<TimerChange> {
        let silent_for = now.saturating_sub(self.state.last_liveness_at);
        if silent_for > self.throttle_threshold_ms && !self.state.local_driving {
            if let Some(settings) = self.state.local_settings {
                debug!(event = "orchestrator_silent", silent_ms = silent_for);
                return Some(self.start_local_driving(settings));
            }
        }
        None
    }

    /// Whether the liveness tick should also ping the orchestrator.
    pub fn should_ping(&self) -> bool {
        self.state.local_settings.is_some()
    }

    /// Outcome of an active ping sent at `sent_at`. Failure is a redundant
    /// throttling trigger, unless the orchestrator was heard from since.
    ///
    /// A pong does not refresh `last_liveness_at`: only traffic from the
    /// orchestrator proves it can still reach the page, so a one-way outage
    /// (pings answered, probes and steps lost) still trips `check_liveness`.
    pub fn on_ping_result(
        &mut self,
        result: &Result<NoticeReply, DeliveryError>,
        sent_at: u64,
        now: u64,
    ) -> Option<TimerChange> {
        match result {
            Ok(NoticeReply::Pong { success: true, .. }) | Ok(NoticeReply::Ack { success: true }) => {
                trace!(round_trip_ms = now.saturating_sub(sent_at), "pong");
                None
            }
            _ => {
                if self.state.local_driving || self.state.last_liveness_at > sent_at {
                    return None;
                }
                let settings = self.state.local_settings?;
                debug!(event = "ping_failed");
                Some(self.start_local_driving(settings))
            }
        }
    }

    /// Page went to the background: self-drive before throttling kicks in.
    pub fn on_hidden(&mut self) -> VisibilityAction {
        self.state.hidden = true;
        if self.state.local_driving {
            return VisibilityAction::Nothing;
        }
        match self.state.local_settings {
            Some(settings) => VisibilityAction::Timer(self.start_local_driving(settings)),
            None => VisibilityAction::Nothing,
        }
    }

    /// Page came back to the foreground: hand control back if self-driving.
    ///
    /// This is the only page-initiated handback. A page that started
    /// self-driving while it stayed visible keeps driving until it is hidden
    /// and shown again, or until the orchestrator reclaims it on focus.
    pub fn on_visible(&mut self) -> VisibilityAction {
        self.state.hidden = false;
        if !self.state.local_driving {
            return VisibilityAction::Nothing;
        }
        let cached = self.state.local_settings;
        let timer = self.stop_local_driving();
        match cached {
            Some(settings) => VisibilityAction::HandBack { timer, settings },
            None => VisibilityAction::Timer(timer),
        }
    }

    /// The page-visible notice could not be delivered: keep the page moving.
    pub fn on_hand_back_failed(&mut self, settings: ScrollSettings) -> TimerChange {
        self.start_local_driving(settings)
    }

    /// Page unload: stop every local activity.
    pub fn teardown(&mut self) -> TimerChange {
        self.stop_local_driving()
    }

    pub fn page_info(&self, surface: &dyn ScrollSurface) -> PageInfo {
        match surface.primary() {
            Some(target) => PageInfo {
                offset: target.scroll_offset(),
                extent: target.scroll_extent(),
                viewport_extent: target.viewport_extent(),
                percentage: target.scroll_percentage(),
                local_driving: self.state.local_driving,
            },
            None => PageInfo {
                offset: 0.0,
                extent: 0.0,
                viewport_extent: 0.0,
                percentage: None,
                local_driving: self.state.local_driving,
            },
        }
    }
}
