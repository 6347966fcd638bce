//! Autoscroll: dual-driver page autoscroller with a throttling fallback.
//!
//! Entry point: runs a console demo of the coordination protocol against
//! in-memory pages. Use the `autoscroll-rpc` binary for the line protocol.

use std::error::Error;
use std::time::Duration;

use autoscroll::app::AutoscrollHost;
use autoscroll::services::control_surface::ScrollForm;
use autoscroll::services::settings_store::DefaultSettingsStore;
use autoscroll::types::session::PageId;
use autoscroll::types::settings::TimingConfig;
use tokio::time::sleep;
use tracing_subscriber::EnvFilter;

fn section(name: &str) {
    println!("───────────────────────────────────────────────────────────────");
    println!("  📦 {}", name);
    println!("───────────────────────────────────────────────────────────────");
}

async fn show_position(host: &AutoscrollHost, page_id: &PageId, label: &str) -> Result<f64, Box<dyn Error>> {
    let info = host.control.page_info(page_id).await?;
    let mode = host.control.mode(page_id).await?;
    println!(
        "  {:<28} offset {:>7.1} / {:>6.1}  [{}]",
        label,
        info.offset,
        info.extent - info.viewport_extent,
        mode.label()
    );
    Ok(info.offset)
}

fn demo_validation() {
    section("Settings Form Validation");
    let forms = [
        ScrollForm::new("5", "25", false),
        ScrollForm::new("0", "25", false),
        ScrollForm::new("5", "0", false),
        ScrollForm::new("-6000", "25", false),
        ScrollForm::new("5", "700000", false),
        ScrollForm::new("12px", "40ms", true),
    ];
    for form in &forms {
        match form.parse() {
            Ok(settings) => println!(
                "  {:>6} px / {:>7} ms → ok ({} px every {} ms, loop {})",
                form.pixels, form.interval, settings.pixels_per_step, settings.step_interval_ms, settings.looping
            ),
            Err(err) => println!("  {:>6} px / {:>7} ms → {}", form.pixels, form.interval, err),
        }
    }
    println!();
}

async fn demo_handoff(host: &mut AutoscrollHost) -> Result<(), Box<dyn Error>> {
    section("Orchestrator Stepping and Throttling Handoff");
    let page = host.open_document(20_000.0, 800.0).await?;
    host.focus_page(&page).await?;
    host.control.start(&page, &ScrollForm::new("4", "20", false)).await?;

    sleep(Duration::from_millis(300)).await;
    show_position(host, &page, "orchestrator-driven").await?;

    host.set_page_hidden(&page, true).await?;
    host.orchestrator().set_throttled(true);
    println!("  page hidden, orchestrator throttled");
    sleep(Duration::from_millis(400)).await;
    show_position(host, &page, "throttled").await?;

    host.orchestrator().set_throttled(false);
    host.set_page_hidden(&page, false).await?;
    sleep(Duration::from_millis(100)).await;
    show_position(host, &page, "after page-visible").await?;

    host.control.stop(&page).await?;
    let before = show_position(host, &page, "stopped").await?;
    sleep(Duration::from_millis(200)).await;
    let after = host.control.page_info(&page).await?.offset;
    println!("  ✓ no movement after stop: {}", before == after);
    host.close_page(&page).await?;
    println!();
    Ok(())
}

async fn demo_loop(host: &mut AutoscrollHost) -> Result<(), Box<dyn Error>> {
    section("Loop Mode");
    let page = host.open_document(1_000.0, 800.0).await?;
    host.control.start(&page, &ScrollForm::new("50", "10", true)).await?;
    for _ in 0..4 {
        sleep(Duration::from_millis(30)).await;
        show_position(host, &page, "looping").await?;
    }
    host.close_page(&page).await?;
    let status = host.control.status(&page).await?;
    println!("  ✓ closed page has no session: {}", !status.active);
    println!();
    Ok(())
}

async fn demo_editor_and_shortcut(host: &mut AutoscrollHost) -> Result<(), Box<dyn Error>> {
    section("Editor Surface and Shortcut Toggle");
    let page = host.open_editor(5_000.0, 600.0).await?;
    host.control.handle_command("toggle-autoscroll", &page).await?;
    sleep(Duration::from_millis(200)).await;
    show_position(host, &page, "toggled on (defaults)").await?;
    host.control.handle_command("toggle-autoscroll", &page).await?;
    show_position(host, &page, "toggled off").await?;
    host.close_page(&page).await?;
    println!();
    Ok(())
}

async fn run() -> Result<(), Box<dyn Error>> {
    let settings_path = std::env::temp_dir().join("autoscroll-demo").join("settings.json");
    let store = DefaultSettingsStore::new(Some(settings_path.to_string_lossy().to_string()));
    let mut host = AutoscrollHost::new(store, TimingConfig::default()).await?;
    println!("  defaults from {}", host.control.config_path());
    println!();

    demo_validation();
    demo_handoff(&mut host).await?;
    demo_loop(&mut host).await?;
    demo_editor_and_shortcut(&mut host).await?;

    host.shutdown().await;
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║                 Autoscroll v{} — Demo Mode                ║", env!("CARGO_PKG_VERSION"));
    println!("║   Orchestrator stepping with a page-local fallback driver    ║");
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();

    if let Err(err) = run().await {
        eprintln!("  ✗ demo failed: {}", err);
        std::process::exit(1);
    }

    println!("═══════════════════════════════════════════════════════════════");
    println!("  ✅ Demo complete");
    println!("═══════════════════════════════════════════════════════════════");
}
