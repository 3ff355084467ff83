// SPDX-License-Identifier: GPL-3.0-only

//! Integration tests for configuration module

use photo_booth::config::{CaptureFailurePolicy, SequenceTiming};
use photo_booth::{Config, FilterType, LayoutType, ThemeType};
use std::time::Duration;

#[test]
fn test_config_default() {
    let config = Config::default();

    assert!(config.mirror, "Stills should be mirrored by default");
    assert_eq!((config.ideal_width, config.ideal_height), (1280, 720));
    assert_eq!(config.composite.layout, LayoutType::Strip);
    assert_eq!(config.composite.filter, FilterType::Normal);
    assert_eq!(config.composite.theme, ThemeType::Milk);
    assert_eq!(
        config.capture_failure,
        CaptureFailurePolicy::Retry { max_attempts: 3 }
    );
}

#[test]
fn test_default_timing_matches_booth_schedule() {
    let timing = SequenceTiming::default();

    assert_eq!(timing.countdown_from, 3);
    assert_eq!(timing.tick(), Duration::from_millis(1000));
    assert_eq!(timing.intermission(), Duration::from_millis(2000));
    assert_eq!(timing.flash(), Duration::from_millis(200));
    assert_eq!(timing.settle(), Duration::from_millis(300));
    assert_eq!(timing.processing(), Duration::from_millis(1000));
    assert_eq!(timing.sequence_duration(4), Duration::from_millis(20_000));
}

#[test]
fn test_flash_never_exceeds_post_capture() {
    let timing = SequenceTiming {
        flash_ms: 800,
        post_capture_ms: 500,
        ..SequenceTiming::default()
    };
    assert_eq!(timing.flash(), Duration::from_millis(500));
    assert_eq!(timing.settle(), Duration::ZERO);
}

#[test]
fn test_partial_json_keeps_defaults() {
    let config: Config = serde_json::from_str(
        r#"{"mirror": false, "composite": {"theme": "peach"}, "timing": {"tick_ms": 10}}"#,
    )
    .unwrap();

    assert!(!config.mirror);
    assert_eq!(config.composite.theme, ThemeType::Peach);
    assert_eq!(config.composite.layout, LayoutType::Strip);
    assert_eq!(config.timing.tick_ms, 10);
    assert_eq!(config.timing.intermission_ms, 2000);
    assert_eq!(config.jpeg_quality, Config::default().jpeg_quality);
}

#[test]
fn test_failure_policy_format() {
    let skip: CaptureFailurePolicy = serde_json::from_str(r#"{"mode": "skip"}"#).unwrap();
    assert_eq!(skip, CaptureFailurePolicy::Skip);

    let retry: CaptureFailurePolicy =
        serde_json::from_str(r#"{"mode": "retry", "max_attempts": 5}"#).unwrap();
    assert_eq!(retry, CaptureFailurePolicy::Retry { max_attempts: 5 });

    assert_eq!(
        serde_json::to_string(&CaptureFailurePolicy::Abort).unwrap(),
        r#"{"mode":"abort"}"#
    );
}

#[test]
fn test_save_and_load_file() {
    let dir = std::env::temp_dir().join(format!("photo-booth-config-{}", std::process::id()));
    let path = dir.join("nested").join("config.json");

    let config = Config {
        camera_index: 2,
        capture_failure: CaptureFailurePolicy::Skip,
        output_dir: Some(dir.join("out")),
        ..Config::default()
    };
    config.save_to(&path).unwrap();

    let loaded = Config::load_from(&path).unwrap();
    assert_eq!(loaded, config);
    assert_eq!(loaded.output_dir(), dir.join("out"));

    std::fs::write(&path, "{ not json").unwrap();
    assert!(Config::load_from(&path).is_err(), "Malformed config should be rejected");

    let _ = std::fs::remove_dir_all(&dir);
}
