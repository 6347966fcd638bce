//! Scroll Orchestrator state machine.
//!
//! Owns the registry of scroll sessions (one per page) and decides, for each
//! tick, which commands go to which page. Deliveries happen elsewhere; their
//! outcomes come back through `on_delivery`. All methods take the current
//! orchestrator clock in milliseconds.

use std::collections::HashMap;

use tracing::{debug, info, warn};

use crate::types::errors::DeliveryError;
use crate::types::protocol::{NoticeReply, Outbound, PageCommand, PageNotice, PageReply};
use crate::types::session::{DriverMode, PageId, ScrollSession, SessionStatus};
use crate::types::settings::ScrollSettings;

/// Result of a toggle request.
#[derive(Debug, Clone, PartialEq)]
pub enum ToggleOutcome {
    Started,
    Stopped(Outbound),
}

/// Trait defining the orchestrator's operations.
pub trait ScrollOrchestratorTrait {
    fn start(&mut self, page_id: &PageId, settings: Option<ScrollSettings>, now: u64) -> bool;
    fn stop(&mut self, page_id: &PageId) -> Option<Outbound>;
    fn toggle(&mut self, page_id: &PageId, now: u64) -> ToggleOutcome;
    fn status(&self, page_id: &PageId) -> SessionStatus;
    fn step_tick(&mut self, now: u64) -> Vec<Outbound>;
    fn liveness_tick(&mut self, now: u64) -> Vec<Outbound>;
    fn on_delivery(
        &mut self,
        page_id: &PageId,
        command: &PageCommand,
        result: &Result<PageReply, DeliveryError>,
        now: u64,
    ) -> Vec<Outbound>;
    fn on_page_focused(&mut self, page_id: &PageId, now: u64) -> Option<Outbound>;
    fn on_page_closed(&mut self, page_id: &PageId) -> bool;
    fn on_page_notice(&mut self, page_id: &PageId, notice: &PageNotice, now: u64) -> (NoticeReply, Option<Outbound>);
    fn session_count(&self) -> usize;
    fn defaults(&self) -> ScrollSettings;
    fn set_defaults(&mut self, settings: ScrollSettings);
}

/// In-memory session registry plus the stepping and liveness policies.
pub struct ScrollOrchestrator {
    sessions: HashMap<PageId, ScrollSession>,
    defaults: ScrollSettings,
    throttle_threshold_ms: u64,
}

impl ScrollOrchestrator {
    pub fn new(defaults: ScrollSettings, throttle_threshold_ms: u64) -> Self {
        Self {
            sessions: HashMap::new(),
            defaults,
            throttle_threshold_ms,
        }
    }

    pub fn session(&self, page_id: &PageId) -> Option<&ScrollSession> {
        self.sessions.get(page_id)
    }

    pub fn page_ids(&self) -> Vec<PageId> {
        let mut ids: Vec<PageId> = self.sessions.keys().cloned().collect();
        ids.sort();
        ids
    }

    fn on_probe_failed(&mut self, page_id: &PageId, err: &DeliveryError, now: u64) -> Vec<Outbound> {
        let threshold = self.throttle_threshold_ms;
        let Some(session) = self.sessions.get_mut(page_id) else {
            return Vec::new();
        };
        let silent_for = now.saturating_sub(session.last_liveness_at);
        if silent_for <= threshold || session.driver_mode == DriverMode::LocallyDriven {
            debug!(page_id = %page_id, silent_ms = silent_for, error = %err, "liveness probe failed");
            return Vec::new();
        }
        session.driver_mode = DriverMode::LocallyDriven;
        info!(
            event = "handoff_to_page",
            page_id = %page_id,
            silent_ms = silent_for
        );
        vec![Outbound::new(
            page_id.clone(),
            PageCommand::StartLocalDriving {
                settings: session.settings,
            },
        )]
    }
}

impl ScrollOrchestratorTrait for ScrollOrchestrator {
    /// Creates a session for `page_id` unless one already exists.
    /// Returns whether a session was created.
    fn start(&mut self, page_id: &PageId, settings: Option<ScrollSettings>, now: u64) -> bool {
        if self.sessions.contains_key(page_id) {
            debug!(page_id = %page_id, "start ignored, session already active");
            return false;
        }
        let settings = settings.unwrap_or(self.defaults);
        info!(
            event = "session_started",
            page_id = %page_id,
            pixels = settings.pixels_per_step,
            interval_ms = settings.step_interval_ms,
            looping = settings.looping
        );
        self.sessions
            .insert(page_id.clone(), ScrollSession::new(page_id.clone(), settings, now));
        true
    }

    /// Deletes the session and returns the stop-local-driving command for the page.
    fn stop(&mut self, page_id: &PageId) -> Option<Outbound> {
        self.sessions.remove(page_id)?;
        info!(event = "session_stopped", page_id = %page_id);
        Some(Outbound::new(page_id.clone(), PageCommand::StopLocalDriving))
    }

    fn toggle(&mut self, page_id: &PageId, now: u64) -> ToggleOutcome {
        match self.stop(page_id) {
            Some(outbound) => ToggleOutcome::Stopped(outbound),
            None => {
                self.start(page_id, None, now);
                ToggleOutcome::Started
            }
        }
    }

    fn status(&self, page_id: &PageId) -> SessionStatus {
        match self.sessions.get(page_id) {
            Some(session) => SessionStatus {
                active: true,
                session: Some(session.clone()),
            },
            None => SessionStatus::inactive(),
        }
    }

    /// Emits a scroll step for every orchestrator-driven session that is due.
    /// `last_step_at` advances whether or not the step is later delivered.
    fn step_tick(&mut self, now: u64) -> Vec<Outbound> {
        let mut out = Vec::new();
        for session in self.sessions.values_mut() {
            if !session.step_due(now) {
                continue;
            }
            session.last_step_at = now;
            out.push(Outbound::new(
                session.page_id.clone(),
                PageCommand::ScrollStep {
                    settings: session.settings,
                },
            ));
        }
        out
    }

    fn liveness_tick(&mut self, now: u64) -> Vec<Outbound> {
        self.sessions
            .keys()
            .map(|page_id| Outbound::new(page_id.clone(), PageCommand::LivenessProbe { timestamp: now }))
            .collect()
    }

    fn on_delivery(
        &mut self,
        page_id: &PageId,
        command: &PageCommand,
        result: &Result<PageReply, DeliveryError>,
        now: u64,
    ) -> Vec<Outbound> {
        if !self.sessions.contains_key(page_id) {
            return Vec::new();
        }
        match (command, result) {
            (PageCommand::LivenessProbe { .. }, Ok(reply)) => {
                if let Some(session) = self.sessions.get_mut(page_id) {
                    session.last_liveness_at = now;
                    let page_self_driving = matches!(reply, PageReply::Liveness { local_driving: true });
                    let mode = session.driver_mode;
                    match mode {
                        DriverMode::OrchestratorDriven if page_self_driving => {
                            // Handback waits for the page's own page-visible notice.
                            debug!(page_id = %page_id, "page reports local driving while orchestrator-driven");
                        }
                        DriverMode::LocallyDriven
                            if matches!(reply, PageReply::Liveness { local_driving: false }) =>
                        {
                            warn!(page_id = %page_id, "page lost local driving, resuming orchestrator stepping");
                            session.driver_mode = DriverMode::OrchestratorDriven;
                        }
                        _ => {}
                    }
                }
                Vec::new()
            }
            (PageCommand::LivenessProbe { .. }, Err(err)) => self.on_probe_failed(page_id, err, now),
            (_, Err(err)) if err.is_unreachable() => {
                info!(
                    event = "page_unreachable",
                    page_id = %page_id,
                    command = command.kind()
                );
                self.sessions.remove(page_id);
                Vec::new()
            }
            (_, Err(err)) => {
                debug!(page_id = %page_id, command = command.kind(), error = %err, "delivery failed");
                Vec::new()
            }
            (_, Ok(_)) => Vec::new(),
        }
    }

    /// Foreground reconciliation: take stepping back from a self-driving page.
    fn on_page_focused(&mut self, page_id: &PageId, now: u64) -> Option<Outbound> {
        let session = self.sessions.get_mut(page_id)?;
        if session.driver_mode != DriverMode::LocallyDriven {
            return None;
        }
        session.driver_mode = DriverMode::OrchestratorDriven;
        session.last_liveness_at = now;
        info!(event = "handback_on_focus", page_id = %page_id);
        Some(Outbound::new(page_id.clone(), PageCommand::StopLocalDriving))
    }

    /// Page removed: drop the session without messaging the page.
    fn on_page_closed(&mut self, page_id: &PageId) -> bool {
        let removed = self.sessions.remove(page_id).is_some();
        if removed {
            info!(event = "session_closed", page_id = %page_id);
        }
        removed
    }

    fn on_page_notice(&mut self, page_id: &PageId, notice: &PageNotice, now: u64) -> (NoticeReply, Option<Outbound>) {
        match notice {
            PageNotice::LivenessPing { .. } => (
                NoticeReply::Pong {
                    success: true,
                    timestamp: now,
                },
                None,
            ),
            PageNotice::PageVisible { settings } => {
                if let Some(session) = self.sessions.get_mut(page_id) {
                    session.settings = *settings;
                    session.driver_mode = DriverMode::OrchestratorDriven;
                    session.last_liveness_at = now;
                    session.last_step_at = now;
                    info!(event = "handback_on_visible", page_id = %page_id);
                }
                (NoticeReply::Ack { success: true }, None)
            }
            PageNotice::PageUnloading => {
                let outbound = self.stop(page_id);
                (NoticeReply::Ack { success: true }, outbound)
            }
            PageNotice::PageReady => {
                debug!(page_id = %page_id, "page driver ready");
                (NoticeReply::Ack { success: true }, None)
            }
        }
    }

    fn session_count(&self) -> usize {
        self.sessions.len()
    }

    fn defaults(&self) -> ScrollSettings {
        self.defaults
    }

    fn set_defaults(&mut self, settings: ScrollSettings) {
        self.defaults = settings;
    }
}
