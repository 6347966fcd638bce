//! Property-based tests for ScrollSettings validation and persistence.
//!
//! These tests verify that every in-bounds settings value survives the JSON
//! wire format and the on-disk defaults record, and that the settings form
//! accepts exactly the values the bounds allow.

use autoscroll::services::control_surface::ScrollForm;
use autoscroll::services::settings_store::{DefaultSettingsStore, SettingsStoreTrait};
use autoscroll::types::settings::ScrollSettings;
use proptest::prelude::*;
use tempfile::TempDir;

fn arb_pixels() -> impl Strategy<Value = i64> {
    prop_oneof![-5000i64..=-1, 1i64..=5000]
}

fn arb_settings() -> impl Strategy<Value = ScrollSettings> {
    (arb_pixels(), 1i64..=600_000, any::<bool>())
        .prop_map(|(pixels, interval, looping)| ScrollSettings::new(pixels, interval, looping).unwrap())
}

// **Property 1: Settings wire round-trip**
//
// *For any* valid ScrollSettings, serializing to JSON and deserializing SHALL
// produce an identical value.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    #[test]
    fn settings_json_roundtrip(settings in arb_settings()) {
        let json = serde_json::to_string(&settings).unwrap();
        let parsed: ScrollSettings = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(parsed, settings);
    }
}

// **Property 2: Defaults record persistence**
//
// *For any* valid ScrollSettings saved as the default, a fresh store reading
// the same file SHALL load the identical value.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    #[test]
    fn defaults_survive_reload(settings in arb_settings()) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json").to_string_lossy().to_string();

        let mut store = DefaultSettingsStore::new(Some(path.clone()));
        store.load().unwrap();
        store.set_defaults(settings).unwrap();

        let mut reread = DefaultSettingsStore::new(Some(path));
        prop_assert_eq!(reread.load().unwrap(), settings);
    }
}

// **Property 3: Form accepts exactly the bounded range**
//
// *For any* pixel and interval integers, the settings form SHALL accept the
// pair iff pixels is non-zero with magnitude at most 5000 and the interval
// lies in 1..=600000; an accepted form yields exactly the typed values.
proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    #[test]
    fn form_validation_matches_bounds(pixels in -6000i64..6000, interval in -10i64..700_000) {
        let form = ScrollForm::new(pixels.to_string(), interval.to_string(), false);
        let valid = pixels != 0 && pixels.abs() <= 5000 && (1..=600_000).contains(&interval);

        match form.parse() {
            Ok(settings) => {
                prop_assert!(valid);
                prop_assert_eq!(settings.pixels_per_step as i64, pixels);
                prop_assert_eq!(settings.step_interval_ms as i64, interval);
            }
            Err(_) => prop_assert!(!valid),
        }
    }
}
