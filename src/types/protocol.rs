//! Logical messages exchanged between the control surface, the orchestrator
//! and page drivers. Each enum is tagged by `type` with kebab-case names.

use serde::{Deserialize, Serialize};

use super::session::{PageId, SessionStatus};
use super::settings::ScrollSettings;

/// Control surface → orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ControlRequest {
    StartScrolling {
        page_id: PageId,
        settings: Option<ScrollSettings>,
    },
    StopScrolling {
        page_id: PageId,
    },
    ToggleScrolling {
        page_id: PageId,
    },
    GetStatus {
        page_id: PageId,
    },
}

/// Orchestrator → control surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ControlReply {
    Ack { success: bool },
    Status(SessionStatus),
}

/// Orchestrator (or control surface) → page driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PageCommand {
    /// Carries the full settings so the page can self-drive at the same cadence.
    ScrollStep { settings: ScrollSettings },
    StartLocalDriving { settings: ScrollSettings },
    StopLocalDriving,
    ResetLoop,
    LivenessProbe { timestamp: u64 },
    GetPageInfo,
}

impl PageCommand {
    /// Short name used in log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            PageCommand::ScrollStep { .. } => "scroll-step",
            PageCommand::StartLocalDriving { .. } => "start-local-driving",
            PageCommand::StopLocalDriving => "stop-local-driving",
            PageCommand::ResetLoop => "reset-loop",
            PageCommand::LivenessProbe { .. } => "liveness-probe",
            PageCommand::GetPageInfo => "get-page-info",
        }
    }

    /// Whether receiving this command proves the orchestrator is alive.
    pub fn from_orchestrator(&self) -> bool {
        !matches!(self, PageCommand::ResetLoop | PageCommand::GetPageInfo)
    }
}

/// Page driver → sender of a `PageCommand`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PageReply {
    Ack {
        success: bool,
    },
    #[serde(rename_all = "camelCase")]
    Liveness {
        local_driving: bool,
    },
    PageInfo(PageInfo),
}

/// Geometry and driving state of a page's primary scroll target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub offset: f64,
    pub extent: f64,
    pub viewport_extent: f64,
    /// `None` when the target cannot scroll.
    pub percentage: Option<f64>,
    pub local_driving: bool,
}

/// Page driver → orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PageNotice {
    PageReady,
    LivenessPing { timestamp: u64 },
    PageVisible { settings: ScrollSettings },
    PageUnloading,
}

impl PageNotice {
    pub fn kind(&self) -> &'static str {
        match self {
            PageNotice::PageReady => "page-ready",
            PageNotice::LivenessPing { .. } => "liveness-ping",
            PageNotice::PageVisible { .. } => "page-visible",
            PageNotice::PageUnloading => "page-unloading",
        }
    }
}

/// Orchestrator → page driver, answering a `PageNotice`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum NoticeReply {
    Ack { success: bool },
    Pong { success: bool, timestamp: u64 },
}

/// A command the orchestrator wants delivered to one page.
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub page_id: PageId,
    pub command: PageCommand,
}

impl Outbound {
    pub fn new(page_id: PageId, command: PageCommand) -> Self {
        Self { page_id, command }
    }
}
