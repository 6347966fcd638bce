//! Headless host for Autoscroll.
//!
//! Wires the orchestrator task, the page router, one page task per open page
//! and the control surface, and exposes the page lifecycle events a browser
//! would deliver (open, focus, visibility, unload, close).

use std::collections::HashMap;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::managers::viewport::{ScrollSurface, VirtualPage, VirtualViewport};
use crate::runtime::orchestrator_task::OrchestratorHandle;
use crate::runtime::page_task::{spawn_page, PageHandle};
use crate::runtime::transport::PageRouter;
use crate::services::control_surface::ControlSurface;
use crate::services::settings_store::DefaultSettingsStore;
use crate::types::errors::{ControlError, HostError};
use crate::types::session::PageId;
use crate::types::settings::TimingConfig;

fn check_geometry(extent: f64, viewport: f64) -> Result<(), HostError> {
    if !(extent.is_finite() && viewport.is_finite()) || viewport <= 0.0 || extent < 0.0 {
        return Err(HostError::InvalidGeometry(format!(
            "extent {} / viewport {}",
            extent, viewport
        )));
    }
    Ok(())
}

struct OpenPage {
    handle: PageHandle,
    task: JoinHandle<()>,
}

/// Central struct owning every running task.
pub struct AutoscrollHost {
    pub control: ControlSurface,
    orchestrator: OrchestratorHandle,
    orchestrator_task: JoinHandle<()>,
    router: PageRouter,
    pages: HashMap<PageId, OpenPage>,
    timing: TimingConfig,
}

impl AutoscrollHost {
    /// Starts the orchestrator and loads the persisted defaults into it.
    pub async fn new(store: DefaultSettingsStore, timing: TimingConfig) -> Result<Self, ControlError> {
        let router = PageRouter::new(timing.reply_timeout);
        let (orchestrator, orchestrator_task) =
            OrchestratorHandle::spawn(router.clone(), Default::default(), timing);
        let mut control = ControlSurface::new(orchestrator.clone(), router.clone(), store);
        let defaults = control.load_defaults().await?;
        info!(
            event = "host_started",
            pixels = defaults.pixels_per_step,
            interval_ms = defaults.step_interval_ms,
            config = %control.config_path()
        );
        Ok(Self {
            control,
            orchestrator,
            orchestrator_task,
            router,
            pages: HashMap::new(),
            timing,
        })
    }

    pub fn orchestrator(&self) -> &OrchestratorHandle {
        &self.orchestrator
    }

    pub fn router(&self) -> &PageRouter {
        &self.router
    }

    pub fn page_ids(&self) -> Vec<PageId> {
        let mut ids: Vec<PageId> = self.pages.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Opens a document page with the given content and viewport heights.
    pub async fn open_document(&mut self, extent: f64, viewport: f64) -> Result<PageId, HostError> {
        check_geometry(extent, viewport)?;
        Ok(self.open_page(Box::new(VirtualPage::document(extent, viewport))).await)
    }

    /// Opens a page whose only scrollable element is an editor surface.
    pub async fn open_editor(&mut self, extent: f64, viewport: f64) -> Result<PageId, HostError> {
        check_geometry(extent, viewport)?;
        let page = VirtualPage::new(
            Some(VirtualViewport::new(extent, viewport)),
            Some(VirtualViewport::new(viewport, viewport)),
            None,
        );
        Ok(self.open_page(Box::new(page)).await)
    }

    /// Spawns a page task for `surface` and returns its new id.
    pub async fn open_page(&mut self, surface: Box<dyn ScrollSurface>) -> PageId {
        let page_id = PageId::generate();
        let (handle, task) = spawn_page(
            page_id.clone(),
            surface,
            &self.router,
            self.orchestrator.link(),
            self.timing,
        )
        .await;
        self.pages.insert(page_id.clone(), OpenPage { handle, task });
        info!(event = "page_opened", page_id = %page_id);
        page_id
    }

    fn page(&self, page_id: &PageId) -> Result<&OpenPage, HostError> {
        self.pages
            .get(page_id)
            .ok_or_else(|| HostError::PageNotFound(page_id.to_string()))
    }

    /// The page became the active tab.
    pub async fn focus_page(&self, page_id: &PageId) -> Result<(), HostError> {
        self.page(page_id)?;
        if let Err(err) = self.orchestrator.page_focused(page_id).await {
            warn!(page_id = %page_id, error = %err, "focus not delivered");
        }
        Ok(())
    }

    pub async fn set_page_hidden(&self, page_id: &PageId, hidden: bool) -> Result<(), HostError> {
        let page = self.page(page_id)?;
        page.handle
            .set_hidden(hidden)
            .await
            .map_err(|_| HostError::PageNotFound(page_id.to_string()))
    }

    /// Navigation away: the page announces its unload, then goes away.
    pub async fn unload_page(&mut self, page_id: &PageId) -> Result<(), HostError> {
        let page = self
            .pages
            .remove(page_id)
            .ok_or_else(|| HostError::PageNotFound(page_id.to_string()))?;
        let _ = page.handle.unload().await;
        if let Err(err) = page.task.await {
            warn!(page_id = %page_id, error = %err, "page task ended abnormally");
        }
        Ok(())
    }

    /// Tab removed: the session is dropped and the page is never messaged again.
    pub async fn close_page(&mut self, page_id: &PageId) -> Result<(), HostError> {
        let page = self
            .pages
            .remove(page_id)
            .ok_or_else(|| HostError::PageNotFound(page_id.to_string()))?;
        if let Err(err) = self.orchestrator.page_closed(page_id).await {
            debug!(page_id = %page_id, error = %err, "orchestrator already gone");
        }
        self.router.unregister(page_id).await;
        let _ = page.handle.close().await;
        if let Err(err) = page.task.await {
            warn!(page_id = %page_id, error = %err, "page task ended abnormally");
        }
        info!(event = "page_closed", page_id = %page_id);
        Ok(())
    }

    /// Closes every page, then stops the orchestrator.
    pub async fn shutdown(mut self) {
        for page_id in self.page_ids() {
            let _ = self.close_page(&page_id).await;
        }
        self.orchestrator.shutdown().await;
        if let Err(err) = self.orchestrator_task.await {
            warn!(error = %err, "orchestrator task ended abnormally");
        }
        info!(event = "host_stopped");
    }
}
