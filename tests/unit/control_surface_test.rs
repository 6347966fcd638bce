//! Unit tests for the Control Surface: form validation messages, saving
//! defaults, status modes and shortcut dispatch.

use std::fs;
use std::time::Duration;

use autoscroll::app::AutoscrollHost;
use autoscroll::services::control_surface::{parse_int, ScrollForm, ScrollMode, TOGGLE_COMMAND};
use autoscroll::services::settings_store::DefaultSettingsStore;
use autoscroll::types::errors::{ControlError, ValidationError};
use autoscroll::types::session::PageId;
use autoscroll::types::settings::{ScrollSettings, TimingConfig};
use rstest::rstest;
use tempfile::TempDir;

async fn host() -> (AutoscrollHost, TempDir) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json").to_string_lossy().to_string();
    let host = AutoscrollHost::new(DefaultSettingsStore::new(Some(path)), TimingConfig::default())
        .await
        .unwrap();
    (host, dir)
}

// ─── Form validation ───

#[rstest]
#[case("0",     "25",     "Scroll pixels must be a non-zero number")]
#[case("",      "25",     "Scroll pixels must be a non-zero number")]
#[case("fast",  "25",     "Scroll pixels must be a non-zero number")]
#[case("5",     "0",      "Duration must be at least 1 millisecond")]
#[case("5",     "-10",    "Duration must be at least 1 millisecond")]
#[case("5",     "",       "Duration must be at least 1 millisecond")]
#[case("5001",  "25",     "Scroll pixels should be between -5000 and 5000")]
#[case("-5001", "25",     "Scroll pixels should be between -5000 and 5000")]
#[case("5",     "600001", "Duration should not exceed 600,000 milliseconds (10 minutes)")]
#[case("0",     "0",      "Scroll pixels must be a non-zero number")]
fn test_invalid_form_message(#[case] pixels: &str, #[case] interval: &str, #[case] expected: &str) {
    let err = ScrollForm::new(pixels, interval, false).parse().unwrap_err();
    assert_eq!(err.to_string(), expected);
}

#[rstest]
#[case("5",     "25",     5,     25)]
#[case("-5000", "1",      -5000, 1)]
#[case("5000",  "600000", 5000,  600_000)]
#[case(" 12px", "40ms",   12,    40)]
fn test_valid_form_parses(#[case] pixels: &str, #[case] interval: &str, #[case] px: i32, #[case] ms: u32) {
    let settings = ScrollForm::new(pixels, interval, true).parse().unwrap();
    assert_eq!(settings.pixels_per_step, px);
    assert_eq!(settings.step_interval_ms, ms);
    assert!(settings.looping);
}

#[test]
fn test_parse_int_saturates_huge_input() {
    assert_eq!(parse_int("99999999999999999999999"), Some(i64::MAX));
    let err = ScrollForm::new("99999999999999999999999", "25", false).parse().unwrap_err();
    assert!(matches!(err, ValidationError::PixelsOutOfRange(_)));
}

// ─── Start / stop ───

#[tokio::test(start_paused = true)]
async fn test_invalid_start_creates_no_session() {
    let (mut host, _dir) = host().await;
    let page = host.open_document(10_000.0, 800.0).await.unwrap();

    let result = host.control.start(&page, &ScrollForm::new("0", "25", false)).await;

    assert!(matches!(result, Err(ControlError::Invalid(ValidationError::ZeroPixels))));
    assert!(!host.control.status(&page).await.unwrap().active);
    host.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_start_uses_form_values() {
    let (mut host, _dir) = host().await;
    let page = host.open_document(10_000.0, 800.0).await.unwrap();

    let settings = host.control.start(&page, &ScrollForm::new("-3", "70", true)).await.unwrap();

    let session = host.control.status(&page).await.unwrap().session.unwrap();
    assert_eq!(session.settings, settings);
    assert_eq!(session.settings.pixels_per_step, -3);
    host.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_start_without_settings_uses_defaults() {
    let (mut host, _dir) = host().await;
    let page = host.open_document(10_000.0, 800.0).await.unwrap();

    host.control.start_with(&page, None).await.unwrap();

    let session = host.control.status(&page).await.unwrap().session.unwrap();
    assert_eq!(session.settings, ScrollSettings::default());
    host.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_mode_follows_session() {
    let (mut host, _dir) = host().await;
    let page = host.open_document(10_000.0, 800.0).await.unwrap();
    assert_eq!(host.control.mode(&page).await.unwrap(), ScrollMode::Ready);

    host.control.start_with(&page, None).await.unwrap();
    assert_eq!(host.control.mode(&page).await.unwrap(), ScrollMode::Scrolling);

    host.control.stop(&page).await.unwrap();
    assert_eq!(host.control.mode(&page).await.unwrap(), ScrollMode::Ready);
    host.shutdown().await;
}

// ─── Defaults ───

#[tokio::test(start_paused = true)]
async fn test_save_as_default_applies_to_next_start() {
    let (mut host, dir) = host().await;
    let page = host.open_document(10_000.0, 800.0).await.unwrap();

    let saved = host
        .control
        .save_as_default(&ScrollForm::new("15", "45", true))
        .await
        .unwrap();
    host.control.start_with(&page, None).await.unwrap();

    assert_eq!(host.control.defaults(), saved);
    assert_eq!(host.control.status(&page).await.unwrap().session.unwrap().settings, saved);
    let on_disk = fs::read_to_string(dir.path().join("settings.json")).unwrap();
    assert!(on_disk.contains("\"pixelsPerStep\": 15"));
    host.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_invalid_save_leaves_defaults_untouched() {
    let (mut host, dir) = host().await;
    let before = fs::read_to_string(dir.path().join("settings.json")).unwrap();

    let result = host.control.save_as_default(&ScrollForm::new("5", "0", false)).await;

    assert!(matches!(
        result,
        Err(ControlError::Invalid(ValidationError::IntervalTooShort(0)))
    ));
    assert_eq!(host.control.defaults(), ScrollSettings::default());
    assert_eq!(fs::read_to_string(dir.path().join("settings.json")).unwrap(), before);
    host.shutdown().await;
}

#[rstest]
#[case("{not json")]
#[case(r#"{"defaultSettings":{"pixelsPerStep":0,"stepIntervalMs":25}}"#)]
#[case(r#"{"defaultSettings":{"pixelsPerStep":5,"stepIntervalMs":900000,"loop":true}}"#)]
#[tokio::test(start_paused = true)]
async fn test_unusable_record_falls_back_to_built_in_defaults(#[case] content: &str) {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("settings.json");
    fs::write(&path, content).unwrap();

    let mut host = AutoscrollHost::new(
        DefaultSettingsStore::new(Some(path.to_string_lossy().to_string())),
        TimingConfig::default(),
    )
    .await
    .unwrap();

    assert_eq!(host.control.defaults(), ScrollSettings::default());
    assert_eq!(fs::read_to_string(&path).unwrap(), content, "record is not rewritten on load");

    let page = host.open_document(10_000.0, 800.0).await.unwrap();
    host.control.start_with(&page, None).await.unwrap();
    let session = host.control.status(&page).await.unwrap().session.unwrap();
    assert_eq!(session.settings, ScrollSettings::default());

    // A later save replaces the unusable record.
    let saved = host.control.save_as_default(&ScrollForm::new("7", "30", false)).await.unwrap();
    assert!(fs::read_to_string(&path).unwrap().contains("\"pixelsPerStep\": 7"));
    assert_eq!(host.control.defaults(), saved);
    host.shutdown().await;
}

// ─── Shortcuts ───

#[tokio::test(start_paused = true)]
async fn test_toggle_shortcut_starts_and_stops() {
    let (mut host, _dir) = host().await;
    let page = host.open_document(10_000.0, 800.0).await.unwrap();

    host.control.handle_command(TOGGLE_COMMAND, &page).await.unwrap();
    assert!(host.control.status(&page).await.unwrap().active);

    tokio::time::sleep(Duration::from_millis(30)).await;
    host.control.handle_command(TOGGLE_COMMAND, &page).await.unwrap();
    assert!(!host.control.status(&page).await.unwrap().active);
    host.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_unknown_shortcut_is_rejected() {
    let (mut host, _dir) = host().await;
    let page = host.open_document(10_000.0, 800.0).await.unwrap();

    let err = host.control.handle_command("scroll-faster", &page).await.unwrap_err();

    assert_eq!(err.to_string(), "Unknown command: scroll-faster");
    assert!(!host.control.status(&page).await.unwrap().active);
    host.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn test_page_info_for_unknown_page() {
    let (host, _dir) = host().await;
    let result = host.control.page_info(&PageId::from("nowhere")).await;
    assert!(matches!(result, Err(ControlError::PageUnavailable(_))));
    host.shutdown().await;
}
