//! RPC method handler for the Autoscroll JSON-RPC protocol.
//!
//! Extracted from `rpc_server.rs` so it can be unit-tested independently.
//! `handle_method` dispatches one call to the host's control surface or page
//! lifecycle operations.

use tokio::sync::Mutex;

use crate::app::AutoscrollHost;
use crate::services::control_surface::ScrollForm;
use crate::types::session::PageId;

use serde_json::{json, Value};

fn page_param(params: &Value) -> Result<PageId, String> {
    params
        .get("page_id")
        .and_then(|v| v.as_str())
        .map(PageId::from)
        .ok_or_else(|| "missing page_id".to_string())
}

fn number_param(params: &Value, key: &str, default: f64) -> Result<f64, String> {
    match params.get(key) {
        None | Some(Value::Null) => Ok(default),
        Some(v) => v.as_f64().ok_or_else(|| format!("invalid {}", key)),
    }
}

/// Form fields may arrive as strings (raw input) or numbers.
fn form_param(params: &Value) -> Option<ScrollForm> {
    let field = |key: &str| match params.get(key) {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    };
    let pixels = field("pixels");
    let interval = field("interval");
    if pixels.is_none() && interval.is_none() {
        return None;
    }
    Some(ScrollForm::new(
        pixels.unwrap_or_default(),
        interval.unwrap_or_default(),
        params.get("loop").and_then(|v| v.as_bool()).unwrap_or(false),
    ))
}

/// Dispatch a JSON-RPC method call to the appropriate handler.
///
/// Returns `Ok(Value)` on success or `Err(String)` with an error message.
pub async fn handle_method(host: &Mutex<AutoscrollHost>, method: &str, params: &Value) -> Result<Value, String> {
    match method {
        "ping" => Ok(json!({"pong": true})),

        // ─── Pages ───
        "page.open" => {
            let extent = number_param(params, "extent", 4000.0)?;
            let viewport = number_param(params, "viewport", 800.0)?;
            let kind = params.get("kind").and_then(|v| v.as_str()).unwrap_or("document");
            let mut h = host.lock().await;
            let page_id = match kind {
                "document" => h.open_document(extent, viewport).await,
                "editor" => h.open_editor(extent, viewport).await,
                other => return Err(format!("unknown page kind: {}", other)),
            }
            .map_err(|e| e.to_string())?;
            Ok(json!({"page_id": page_id}))
        }
        "page.close" => {
            let page_id = page_param(params)?;
            let mut h = host.lock().await;
            h.close_page(&page_id).await.map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "page.focus" => {
            let page_id = page_param(params)?;
            let h = host.lock().await;
            h.focus_page(&page_id).await.map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "page.visibility" => {
            let page_id = page_param(params)?;
            let hidden = params.get("hidden").and_then(|v| v.as_bool()).ok_or("missing hidden")?;
            let h = host.lock().await;
            h.set_page_hidden(&page_id, hidden).await.map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "page.unload" => {
            let page_id = page_param(params)?;
            let mut h = host.lock().await;
            h.unload_page(&page_id).await.map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }
        "page.info" => {
            let page_id = page_param(params)?;
            let h = host.lock().await;
            let info = h.control.page_info(&page_id).await.map_err(|e| e.to_string())?;
            serde_json::to_value(info).map_err(|e| e.to_string())
        }
        "page.list" => {
            let h = host.lock().await;
            Ok(json!(h.page_ids()))
        }

        // ─── Scrolling ───
        "scroll.start" => {
            let page_id = page_param(params)?;
            let h = host.lock().await;
            match form_param(params) {
                Some(form) => {
                    let settings = h.control.start(&page_id, &form).await.map_err(|e| e.to_string())?;
                    Ok(json!({"success": true, "settings": settings}))
                }
                None => {
                    h.control.start_with(&page_id, None).await.map_err(|e| e.to_string())?;
                    Ok(json!({"success": true}))
                }
            }
        }
        "scroll.stop" => {
            let page_id = page_param(params)?;
            let h = host.lock().await;
            h.control.stop(&page_id).await.map_err(|e| e.to_string())?;
            Ok(json!({"success": true}))
        }
        "scroll.toggle" => {
            let page_id = page_param(params)?;
            let h = host.lock().await;
            h.control.toggle(&page_id).await.map_err(|e| e.to_string())?;
            Ok(json!({"success": true}))
        }
        "scroll.status" => {
            let page_id = page_param(params)?;
            let h = host.lock().await;
            let status = h.control.status(&page_id).await.map_err(|e| e.to_string())?;
            serde_json::to_value(status).map_err(|e| e.to_string())
        }
        "scroll.mode" => {
            let page_id = page_param(params)?;
            let h = host.lock().await;
            let mode = h.control.mode(&page_id).await.map_err(|e| e.to_string())?;
            Ok(json!({"mode": mode, "label": mode.label()}))
        }
        "scroll.throttle" => {
            let throttled = params.get("throttled").and_then(|v| v.as_bool()).ok_or("missing throttled")?;
            let h = host.lock().await;
            h.orchestrator().set_throttled(throttled);
            Ok(json!({"throttled": throttled}))
        }

        // ─── Settings ───
        "settings.get" => {
            let h = host.lock().await;
            serde_json::to_value(h.control.defaults()).map_err(|e| e.to_string())
        }
        "settings.save" => {
            let form = form_param(params).ok_or("missing pixels and interval")?;
            let mut h = host.lock().await;
            let settings = h.control.save_as_default(&form).await.map_err(|e| e.to_string())?;
            serde_json::to_value(settings).map_err(|e| e.to_string())
        }

        // ─── Shortcuts ───
        "command" => {
            let name = params.get("name").and_then(|v| v.as_str()).ok_or("missing name")?;
            let page_id = page_param(params)?;
            let h = host.lock().await;
            h.control.handle_command(name, &page_id).await.map_err(|e| e.to_string())?;
            Ok(json!({"ok": true}))
        }

        _ => Err(format!("unknown method: {}", method)),
    }
}
