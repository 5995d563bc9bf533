//! Config Validation Tests
//!
//! Typo detection on raw TOML, range validation on parsed configs, and the
//! file round-trip used by `pulsecam dump-config`.
//!
//! These tests exercise the config layer independently from the pipeline.

use pulsecam::config::validation::{
    known_config_keys, suggest_correction, validate_signal_ranges, validate_unknown_keys,
};
use pulsecam::config::{FaceDetectorKind, MonitorConfig};
use pulsecam::{BoundingBox, ConfigError};

// ============================================================================
// Typo Detection
// ============================================================================

#[test]
fn typo_in_magnification_key_warns_with_suggestion() {
    let toml_str = r#"
[magnification]
aplha = 120.0
"#;
    let warnings = validate_unknown_keys(toml_str);
    assert_eq!(warnings.len(), 1, "Expected exactly 1 warning");
    assert_eq!(warnings[0].field, "magnification.aplha");
    assert_eq!(warnings[0].suggestion.as_deref(), Some("magnification.alpha"));
    assert!(warnings[0].to_string().contains("did you mean 'magnification.alpha'?"));
}

#[test]
fn typo_in_section_name_warns_for_section_and_keys() {
    let toml_str = r#"
[webcm]
video_frame_rate = 30
"#;
    let warnings = validate_unknown_keys(toml_str);
    let fields: Vec<&str> = warnings.iter().map(|w| w.field.as_str()).collect();
    assert_eq!(fields, vec!["webcm", "webcm.video_frame_rate"]);
    assert_eq!(warnings[0].suggestion.as_deref(), Some("webcam"));
}

#[test]
fn unrelated_key_gets_no_suggestion() {
    let warnings = validate_unknown_keys("[heart_rate]\ncompletely_unrelated_setting = 1\n");
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].suggestion.is_none());
}

#[test]
fn valid_config_produces_zero_warnings() {
    let toml_str = r#"
[webcam]
real_width = 1280
real_height = 720
video_width = 160
video_height = 120
video_channels = 3
video_frame_rate = 30

[magnification]
levels = 3
alpha = 120.0
min_frequency = 0.8
max_frequency = 2.5
buffer_size = 300

[heart_rate]
bpm_buffer_size = 5
min_valid_bpm = 40.0
max_valid_bpm = 180.0
min_resting_bpm = 50.0
max_resting_bpm = 100.0
report_interval_secs = 30

[face]
detector = "fixed"
center_fraction = 0.5

[face.fixed_region]
x = 400
y = 160
width = 320
height = 400
"#;
    assert!(validate_unknown_keys(toml_str).is_empty());

    let config = MonitorConfig::from_toml_str(toml_str).expect("valid config");
    assert_eq!(config.webcam.video_frame_rate, 30);
    assert_eq!(config.magnification.buffer_size, 300);
    assert_eq!(config.face.detector, FaceDetectorKind::Fixed);
    assert_eq!(config.face.fixed_region, Some(BoundingBox::new(400, 160, 320, 400)));
}

#[test]
fn malformed_toml_yields_no_key_warnings() {
    assert!(validate_unknown_keys("[magnification\nalpha = ").is_empty());
}

#[test]
fn every_known_key_suggests_itself() {
    let known = known_config_keys();
    for key in &known {
        assert_eq!(suggest_correction(key, &known).as_deref(), Some(*key));
    }
}

// ============================================================================
// Range Validation
// ============================================================================

#[test]
fn empty_file_loads_defaults() {
    let config = MonitorConfig::from_toml_str("").expect("defaults");
    assert_eq!(config, MonitorConfig::default());
}

#[test]
fn inverted_band_is_rejected() {
    let err = MonitorConfig::from_toml_str("[magnification]\nmin_frequency = 3.0\nmax_frequency = 1.0\n")
        .expect_err("inverted band");
    match err {
        ConfigError::Validation(problems) => {
            assert!(problems.iter().any(|p| p.contains("min_frequency")), "{problems:?}");
        }
        other => panic!("expected validation error, got {other}"),
    }
}

#[test]
fn all_problems_are_reported_together() {
    let toml_str = r#"
[webcam]
video_frame_rate = 0

[heart_rate]
bpm_buffer_size = 0
min_valid_bpm = 150.0
max_valid_bpm = 100.0
"#;
    match MonitorConfig::from_toml_str(toml_str) {
        Err(ConfigError::Validation(problems)) => assert!(problems.len() >= 3, "{problems:?}"),
        other => panic!("expected validation error, got {other:?}"),
    }
}

#[test]
fn too_many_pyramid_levels_is_rejected() {
    let err = MonitorConfig::from_toml_str("[magnification]\nlevels = 12\n").expect_err("levels");
    assert!(err.to_string().contains("magnification.levels"));
}

#[test]
fn fixed_detector_requires_region() {
    let err = MonitorConfig::from_toml_str("[face]\ndetector = \"fixed\"\n").expect_err("no region");
    assert!(err.to_string().contains("fixed_region"));
}

#[test]
fn passband_outside_valid_bpm_is_an_error() {
    let mut config = MonitorConfig::default();
    config.magnification.min_frequency = 4.0;
    config.magnification.max_frequency = 5.0;

    let (errors, _) = validate_signal_ranges(&config);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].contains("240-300 BPM"));
}

#[test]
fn band_between_bins_warns_but_validates() {
    let mut config = MonitorConfig::default();
    // 0.1 Hz bins: nothing lies strictly inside 1.01..1.09
    config.magnification.min_frequency = 1.01;
    config.magnification.max_frequency = 1.09;

    let (errors, warnings) = validate_signal_ranges(&config);
    assert!(errors.is_empty());
    assert!(warnings.iter().any(|w| w.message.contains("contains no FFT bin")));
    assert!(config.validate().is_ok());
}

#[test]
fn defaults_have_no_range_findings() {
    let (errors, warnings) = validate_signal_ranges(&MonitorConfig::default());
    assert!(errors.is_empty());
    assert!(warnings.is_empty());
}

// ============================================================================
// File Round-Trip
// ============================================================================

#[test]
fn saved_config_loads_back_identically() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("pulsecam.toml");

    let mut config = MonitorConfig::default();
    config.magnification.alpha = 95.0;
    config.heart_rate.report_interval_secs = 15;
    config.save_to_file(&path).expect("save");

    let loaded = MonitorConfig::load_from_file(&path).expect("load");
    assert_eq!(loaded, config);
}

#[test]
fn parse_error_names_the_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "[magnification]\nalpha = \"loud\"\n").expect("write");

    let err = MonitorConfig::load_from_file(&path).expect_err("type error");
    assert!(matches!(err, ConfigError::Parse(ref p, _) if p == &path));
    assert!(err.to_string().contains("broken.toml"));
}

#[test]
fn missing_file_is_an_io_error() {
    let err = MonitorConfig::load_from_file(std::path::Path::new("/nonexistent/pulsecam.toml"))
        .expect_err("missing");
    assert!(matches!(err, ConfigError::Io(..)));
}
