// Autoscroll Control Surface
// User-facing request/response facade: parses and validates the settings form,
// starts, stops and toggles scrolling, reports status and driving mode, saves the
// default settings and dispatches keyboard shortcut commands.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::runtime::orchestrator_task::OrchestratorHandle;
use crate::runtime::transport::PageRouter;
use crate::services::settings_store::{DefaultSettingsStore, SettingsStoreTrait};
use crate::types::errors::{ControlError, DeliveryError, ValidationError};
use crate::types::protocol::PageInfo;
use crate::types::session::{PageId, SessionStatus};
use crate::types::settings::ScrollSettings;

/// Shortcut command that toggles scrolling on the focused page.
pub const TOGGLE_COMMAND: &str = "toggle-autoscroll";

/// Parses a leading base-10 integer the way a settings form does: leading
/// whitespace and one sign are accepted, parsing stops at the first non-digit,
/// and no digits at all is `None`. Values beyond `i64` saturate.
pub fn parse_int(input: &str) -> Option<i64> {
    let trimmed = input.trim_start();
    let (negative, digits) = match trimmed.as_bytes().first() {
        Some(b'-') => (true, &trimmed[1..]),
        Some(b'+') => (false, &trimmed[1..]),
        _ => (false, trimmed),
    };
    let digits: &str = {
        let end = digits.find(|c: char| !c.is_ascii_digit()).unwrap_or(digits.len());
        &digits[..end]
    };
    if digits.is_empty() {
        return None;
    }
    let mut value: i64 = 0;
    for b in digits.bytes() {
        value = value.saturating_mul(10).saturating_add((b - b'0') as i64);
    }
    Some(if negative { -value } else { value })
}

/// Raw settings form input, as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScrollForm {
    pub pixels: String,
    pub interval: String,
    #[serde(rename = "loop", default)]
    pub looping: bool,
}

impl ScrollForm {
    pub fn new(pixels: impl Into<String>, interval: impl Into<String>, looping: bool) -> Self {
        Self {
            pixels: pixels.into(),
            interval: interval.into(),
            looping,
        }
    }

    /// Validates the form, reporting the first failing rule.
    pub fn parse(&self) -> Result<ScrollSettings, ValidationError> {
        let pixels = match parse_int(&self.pixels) {
            Some(p) if p != 0 => p,
            _ => return Err(ValidationError::ZeroPixels),
        };
        let interval = parse_int(&self.interval)
            .ok_or_else(|| ValidationError::IntervalNotANumber(self.interval.clone()))?;
        ScrollSettings::new(pixels, interval, self.looping)
    }
}

impl From<ScrollSettings> for ScrollForm {
    fn from(settings: ScrollSettings) -> Self {
        Self::new(
            settings.pixels_per_step.to_string(),
            settings.step_interval_ms.to_string(),
            settings.looping,
        )
    }
}

/// What the status line shows for a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScrollMode {
    Ready,
    Scrolling,
    ScrollingLocal,
}

impl ScrollMode {
    pub fn label(&self) -> &'static str {
        match self {
            ScrollMode::Ready => "Ready",
            ScrollMode::Scrolling => "Scrolling",
            ScrollMode::ScrollingLocal => "Scrolling (Local Mode)",
        }
    }
}

fn orchestrator_down(err: DeliveryError) -> ControlError {
    warn!(error = %err, "orchestrator request failed");
    ControlError::OrchestratorUnavailable
}

/// Facade over the orchestrator, the page router and the defaults store.
pub struct ControlSurface {
    orchestrator: OrchestratorHandle,
    router: PageRouter,
    store: DefaultSettingsStore,
}

impl ControlSurface {
    pub fn new(orchestrator: OrchestratorHandle, router: PageRouter, store: DefaultSettingsStore) -> Self {
        Self {
            orchestrator,
            router,
            store,
        }
    }

    /// Reads the defaults record (writing built-in defaults on first run) and
    /// hands it to the orchestrator. An unreadable, malformed or out-of-bounds
    /// record is left on disk untouched and the built-in defaults are used.
    pub async fn load_defaults(&mut self) -> Result<ScrollSettings, ControlError> {
        let settings = match self.store.load() {
            Ok(settings) => settings,
            Err(err) => {
                warn!(
                    error = %err,
                    path = %self.store.get_config_path(),
                    "default settings unusable, falling back to built-in defaults"
                );
                ScrollSettings::default()
            }
        };
        self.orchestrator
            .set_defaults(settings)
            .await
            .map_err(orchestrator_down)?;
        Ok(settings)
    }

    pub fn defaults(&self) -> ScrollSettings {
        *self.store.get_settings()
    }

    pub fn config_path(&self) -> &str {
        self.store.get_config_path()
    }

    /// Validates the form and starts scrolling with it. Invalid input sends nothing.
    pub async fn start(&self, page_id: &PageId, form: &ScrollForm) -> Result<ScrollSettings, ControlError> {
        let settings = form.parse()?;
        self.start_with(page_id, Some(settings)).await?;
        Ok(settings)
    }

    /// Starts scrolling with already validated settings, or the defaults.
    pub async fn start_with(&self, page_id: &PageId, settings: Option<ScrollSettings>) -> Result<(), ControlError> {
        if let Some(settings) = settings {
            settings.validate()?;
        }
        self.orchestrator
            .start(page_id, settings)
            .await
            .map_err(orchestrator_down)?;
        debug!(page_id = %page_id, "start requested");
        Ok(())
    }

    pub async fn stop(&self, page_id: &PageId) -> Result<(), ControlError> {
        self.orchestrator.stop(page_id).await.map_err(orchestrator_down)?;
        debug!(page_id = %page_id, "stop requested");
        Ok(())
    }

    pub async fn toggle(&self, page_id: &PageId) -> Result<(), ControlError> {
        self.orchestrator.toggle(page_id).await.map_err(orchestrator_down)?;
        Ok(())
    }

    pub async fn status(&self, page_id: &PageId) -> Result<SessionStatus, ControlError> {
        self.orchestrator.status(page_id).await.map_err(orchestrator_down)
    }

    pub async fn page_info(&self, page_id: &PageId) -> Result<PageInfo, ControlError> {
        self.router
            .page_info(page_id)
            .await
            .map_err(|e| ControlError::PageUnavailable(e.to_string()))
    }

    /// `ScrollingLocal` when the page reports it is self-driving. A page that
    /// cannot be queried falls back to `Scrolling`.
    pub async fn mode(&self, page_id: &PageId) -> Result<ScrollMode, ControlError> {
        let status = self.status(page_id).await?;
        if !status.active {
            return Ok(ScrollMode::Ready);
        }
        match self.router.page_info(page_id).await {
            Ok(info) if info.local_driving => Ok(ScrollMode::ScrollingLocal),
            Ok(_) => Ok(ScrollMode::Scrolling),
            Err(err) => {
                debug!(page_id = %page_id, error = %err, "page info unavailable, assuming orchestrator stepping");
                Ok(ScrollMode::Scrolling)
            }
        }
    }

    /// Validates, persists, then pushes the new defaults to the orchestrator.
    /// Nothing is stored when validation fails.
    pub async fn save_as_default(&mut self, form: &ScrollForm) -> Result<ScrollSettings, ControlError> {
        let settings = form.parse()?;
        self.store.set_defaults(settings)?;
        self.orchestrator
            .set_defaults(settings)
            .await
            .map_err(orchestrator_down)?;
        Ok(settings)
    }

    /// Keyboard shortcut dispatch.
    pub async fn handle_command(&self, name: &str, page_id: &PageId) -> Result<(), ControlError> {
        match name {
            TOGGLE_COMMAND => {
                info!(event = "shortcut", command = name, page_id = %page_id);
                self.toggle(page_id).await
            }
            other => Err(ControlError::UnknownCommand(other.to_string())),
        }
    }
}
