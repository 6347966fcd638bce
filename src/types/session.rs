use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::settings::ScrollSettings;

/// Opaque handle identifying one page (tab).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageId(String);

impl PageId {
    /// Allocates a fresh random page id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PageId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for PageId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Which side currently owns stepping for a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DriverMode {
    OrchestratorDriven,
    LocallyDriven,
}

/// An active scrolling task for one page. Exists only while active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScrollSession {
    pub page_id: PageId,
    #[serde(flatten)]
    pub settings: ScrollSettings,
    pub active: bool,
    /// Orchestrator clock, milliseconds.
    pub last_step_at: u64,
    /// Orchestrator clock, milliseconds.
    pub last_liveness_at: u64,
    pub driver_mode: DriverMode,
}

impl ScrollSession {
    pub fn new(page_id: PageId, settings: ScrollSettings, now: u64) -> Self {
        Self {
            page_id,
            settings,
            active: true,
            last_step_at: now,
            last_liveness_at: now,
            driver_mode: DriverMode::OrchestratorDriven,
        }
    }

    /// Whether a step is due at `now` under orchestrator driving.
    pub fn step_due(&self, now: u64) -> bool {
        self.driver_mode == DriverMode::OrchestratorDriven
            && now.saturating_sub(self.last_step_at) >= self.settings.step_interval_ms as u64
    }
}

/// Answer to a status query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStatus {
    pub active: bool,
    pub session: Option<ScrollSession>,
}

impl SessionStatus {
    pub fn inactive() -> Self {
        Self {
            active: false,
            session: None,
        }
    }
}
