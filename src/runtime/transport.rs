//! Page-scoped request/response channel from the orchestrator (and control
//! surface) to page drivers.
//!
//! Every request either yields the page's reply within `reply_timeout` or an
//! explicit `DeliveryError`.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, RwLock};
use tokio::time;
use tracing::{debug, trace};

use crate::types::errors::DeliveryError;
use crate::types::protocol::{PageCommand, PageInfo, PageReply};
use crate::types::session::PageId;

/// A command in flight to a page, with the slot for its reply.
#[derive(Debug)]
pub struct PageEnvelope {
    pub command: PageCommand,
    pub reply: oneshot::Sender<PageReply>,
}

#[derive(Default)]
struct Routes {
    pages: HashMap<PageId, mpsc::Sender<PageEnvelope>>,
    /// Pages whose replies are withheld, as if the page were frozen.
    stalled: HashSet<PageId>,
}

/// Registry of reachable pages, keyed by page id.
#[derive(Clone)]
pub struct PageRouter {
    routes: Arc<RwLock<Routes>>,
    reply_timeout: Duration,
}

impl PageRouter {
    pub fn new(reply_timeout: Duration) -> Self {
        Self {
            routes: Arc::new(RwLock::new(Routes::default())),
            reply_timeout,
        }
    }

    pub async fn register(&self, page_id: PageId, sender: mpsc::Sender<PageEnvelope>) {
        self.routes.write().await.pages.insert(page_id, sender);
    }

    /// Removes the route; later deliveries to this page are `Unreachable`.
    pub async fn unregister(&self, page_id: &PageId) -> bool {
        let mut routes = self.routes.write().await;
        routes.stalled.remove(page_id);
        routes.pages.remove(page_id).is_some()
    }

    pub async fn is_registered(&self, page_id: &PageId) -> bool {
        self.routes.read().await.pages.contains_key(page_id)
    }

    /// Makes deliveries to the page time out without reaching it.
    pub async fn set_stalled(&self, page_id: &PageId, stalled: bool) {
        let mut routes = self.routes.write().await;
        if stalled {
            routes.stalled.insert(page_id.clone());
        } else {
            routes.stalled.remove(page_id);
        }
    }

    /// Sends `command` to the page and waits (bounded) for its reply.
    pub async fn deliver(&self, page_id: &PageId, command: PageCommand) -> Result<PageReply, DeliveryError> {
        let (sender, stalled) = {
            let routes = self.routes.read().await;
            (routes.pages.get(page_id).cloned(), routes.stalled.contains(page_id))
        };
        let Some(sender) = sender else {
            return Err(DeliveryError::Unreachable(page_id.to_string()));
        };
        if stalled {
            time::sleep(self.reply_timeout).await;
            return Err(DeliveryError::TimedOut(page_id.to_string()));
        }

        trace!(page_id = %page_id, command = command.kind(), "deliver");
        let exchange = async {
            let (reply_tx, reply_rx) = oneshot::channel();
            sender
                .send(PageEnvelope {
                    command,
                    reply: reply_tx,
                })
                .await
                .map_err(|_| DeliveryError::Unreachable(page_id.to_string()))?;
            reply_rx
                .await
                .map_err(|_| DeliveryError::Unreachable(page_id.to_string()))
        };

        match time::timeout(self.reply_timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(DeliveryError::TimedOut(page_id.to_string())),
        }
    }

    /// Asks the page for its primary target's geometry.
    pub async fn page_info(&self, page_id: &PageId) -> Result<PageInfo, DeliveryError> {
        match self.deliver(page_id, PageCommand::GetPageInfo).await? {
            PageReply::PageInfo(info) => Ok(info),
            other => {
                debug!(page_id = %page_id, reply = ?other, "unexpected reply to get-page-info");
                Err(DeliveryError::Unreachable(page_id.to_string()))
            }
        }
    }
}
