//! Autoscroll RPC Server: JSON-RPC over stdin/stdout for a browser shell.
//!
//! Protocol: one JSON object per line (newline-delimited JSON).
//! Request:  {"id":1, "method":"scroll.start", "params":{"page_id":"...","pixels":"5","interval":"25"}}
//! Response: {"id":1, "result":{...}} or {"id":1, "error":"..."}
//!
//! Logs go to stderr (filter with `RUST_LOG`) so stdout stays the RPC channel.

use std::time::Instant;

use autoscroll::app::AutoscrollHost;
use autoscroll::rpc_handler::handle_method;
use autoscroll::services::settings_store::DefaultSettingsStore;
use autoscroll::types::settings::TimingConfig;

use serde_json::{json, Value};
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Simple rate limiter: max requests per second.
struct RateLimiter {
    window_start: Instant,
    request_count: u32,
    max_per_second: u32,
}

impl RateLimiter {
    fn new(max_per_second: u32) -> Self {
        Self { window_start: Instant::now(), request_count: 0, max_per_second }
    }

    /// Returns true if the request is allowed, false if rate-limited.
    fn check(&mut self) -> bool {
        if self.window_start.elapsed().as_secs() >= 1 {
            self.window_start = Instant::now();
            self.request_count = 0;
        }
        self.request_count += 1;
        self.request_count <= self.max_per_second
    }
}

async fn write_line(stdout: &mut io::Stdout, value: &Value) -> std::io::Result<()> {
    stdout.write_all(value.to_string().as_bytes()).await?;
    stdout.write_all(b"\n").await?;
    stdout.flush().await
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    // The store falls back to $AUTOSCROLL_CONFIG_DIR or the platform config dir.
    let store = DefaultSettingsStore::new(None);
    let host = match AutoscrollHost::new(store, TimingConfig::default()).await {
        Ok(host) => Mutex::new(host),
        Err(err) => {
            error!(error = %err, "failed to start autoscroll host");
            std::process::exit(1);
        }
    };

    let mut stdout = io::stdout();
    let ready = json!({"event":"ready","version":env!("CARGO_PKG_VERSION")});
    if write_line(&mut stdout, &ready).await.is_err() {
        return;
    }

    let mut rate_limiter = RateLimiter::new(200);
    let mut lines = BufReader::new(io::stdin()).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        if line.trim().is_empty() {
            continue;
        }

        let response = match serde_json::from_str::<Value>(&line) {
            Err(e) => json!({"id":null,"error":format!("parse error: {}",e)}),
            Ok(req) => {
                let id = req.get("id").cloned().unwrap_or(Value::Null);
                if !rate_limiter.check() {
                    json!({"id": id, "error": "rate limit exceeded"})
                } else {
                    let method = req.get("method").and_then(|v| v.as_str()).unwrap_or("");
                    let params = req.get("params").cloned().unwrap_or(json!({}));
                    match handle_method(&host, method, &params).await {
                        Ok(val) => json!({"id": id, "result": val}),
                        Err(err) => json!({"id": id, "error": err}),
                    }
                }
            }
        };

        if write_line(&mut stdout, &response).await.is_err() {
            break;
        }
    }

    info!("stdin closed, shutting down");
    host.into_inner().shutdown().await;
}
