//! Config validation: unknown-key detection with Levenshtein suggestions
//! and signal-range checks.
//!
//! Two-pass parse approach: first deserialize raw TOML into `toml::Value`,
//! walk the key tree, compare against known field names, and emit warnings
//! with "did you mean?" suggestions. Then proceed with normal serde
//! deserialization. Warnings never break existing configs.

use std::collections::HashSet;

use crate::processing::FrequencyMask;

/// A non-fatal config warning (typo, suspicious value).
#[derive(Debug, Clone)]
pub struct ValidationWarning {
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl std::fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(ref s) = self.suggestion {
            write!(f, ", did you mean '{s}'?")?;
        }
        Ok(())
    }
}

// ============================================================================
// Known Config Keys
// ============================================================================

/// Every valid dotted key path of `MonitorConfig`.
///
/// Kept in step with the structs in monitor_config.rs by hand.
pub fn known_config_keys() -> HashSet<&'static str> {
    let keys: &[&str] = &[
        // [webcam]
        "webcam",
        "webcam.real_width",
        "webcam.real_height",
        "webcam.video_width",
        "webcam.video_height",
        "webcam.video_channels",
        "webcam.video_frame_rate",
        // [magnification]
        "magnification",
        "magnification.levels",
        "magnification.alpha",
        "magnification.min_frequency",
        "magnification.max_frequency",
        "magnification.buffer_size",
        // [heart_rate]
        "heart_rate",
        "heart_rate.bpm_buffer_size",
        "heart_rate.min_valid_bpm",
        "heart_rate.max_valid_bpm",
        "heart_rate.min_resting_bpm",
        "heart_rate.max_resting_bpm",
        "heart_rate.report_interval_secs",
        // [face]
        "face",
        "face.detector",
        "face.center_fraction",
        "face.fixed_region",
        "face.fixed_region.x",
        "face.fixed_region.y",
        "face.fixed_region.width",
        "face.fixed_region.height",
    ];
    keys.iter().copied().collect()
}

// ============================================================================
// TOML Key Walking
// ============================================================================

/// Recursively walks a `toml::Value` tree and collects all dotted key paths.
///
/// For example, a table `{ a = { b = 1, c = 2 } }` yields:
/// `["a", "a.b", "a.c"]`
pub fn walk_toml_keys(value: &toml::Value, prefix: &str) -> Vec<String> {
    let mut keys = Vec::new();
    if let Some(table) = value.as_table() {
        for (k, v) in table {
            let path = if prefix.is_empty() {
                k.clone()
            } else {
                format!("{prefix}.{k}")
            };
            keys.push(path.clone());
            if v.is_table() {
                keys.extend(walk_toml_keys(v, &path));
            }
        }
    }
    keys
}

// ============================================================================
// Levenshtein Distance
// ============================================================================

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Closest known key within edit distance 3. Ties go to the
/// lexicographically smallest key so the suggestion is stable.
pub fn suggest_correction(unknown: &str, known: &HashSet<&str>) -> Option<String> {
    known
        .iter()
        .map(|&k| (levenshtein(unknown, k), k))
        .filter(|&(dist, _)| dist <= 3)
        .min()
        .map(|(_, k)| k.to_string())
}

// ============================================================================
// Unknown Key Validation (entry point)
// ============================================================================

/// Warnings for every key in `raw_toml` that `MonitorConfig` does not know.
///
/// Never fails: TOML syntax errors are reported later by serde.
pub fn validate_unknown_keys(raw_toml: &str) -> Vec<ValidationWarning> {
    let value: toml::Value = match raw_toml.parse() {
        Ok(v) => v,
        Err(_) => return Vec::new(),
    };

    let known = known_config_keys();
    let mut found = walk_toml_keys(&value, "");
    found.sort();

    found
        .into_iter()
        .filter(|key| !known.contains(key.as_str()))
        .map(|key| ValidationWarning {
            suggestion: suggest_correction(&key, &known),
            message: format!("Unknown config key '{key}'"),
            field: key,
        })
        .collect()
}

// ============================================================================
// Signal Range Validation
// ============================================================================

/// Check that the passband can actually be observed at the configured rate.
///
/// Returns (errors, warnings). Errors are values that make the pipeline
/// meaningless; warnings are configurations that run but cannot find a pulse.
pub fn validate_signal_ranges(config: &super::MonitorConfig) -> (Vec<String>, Vec<ValidationWarning>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    let w = &config.webcam;
    let m = &config.magnification;
    if w.video_frame_rate == 0 || m.buffer_size == 0 {
        return (errors, warnings);
    }

    let nyquist = f64::from(w.video_frame_rate) / 2.0;
    if m.min_frequency > nyquist {
        warnings.push(ValidationWarning {
            field: "magnification.min_frequency".to_string(),
            message: format!(
                "passband starts at {:.2} Hz, above the {:.2} Hz Nyquist limit of {} fps",
                m.min_frequency, nyquist, w.video_frame_rate
            ),
            suggestion: None,
        });
    }

    let mask = FrequencyMask::from_configs(w, m);
    if mask.is_degenerate() {
        warnings.push(ValidationWarning {
            field: "magnification".to_string(),
            message: format!(
                "passband {:.2}-{:.2} Hz contains no FFT bin (resolution {:.3} Hz), output will be unmodified",
                m.min_frequency,
                m.max_frequency,
                mask.resolution()
            ),
            suggestion: None,
        });
    }

    if w.real_width < w.video_width || w.real_height < w.video_height {
        warnings.push(ValidationWarning {
            field: "webcam".to_string(),
            message: format!(
                "capture {}x{} is smaller than working size {}x{}, face crops will be upscaled",
                w.real_width, w.real_height, w.video_width, w.video_height
            ),
            suggestion: None,
        });
    }

    if w.video_channels != 3 {
        warnings.push(ValidationWarning {
            field: "webcam.video_channels".to_string(),
            message: format!(
                "video_channels = {} but decoded image frames are RGB, every image frame will fail at buffer_written",
                w.video_channels
            ),
            suggestion: None,
        });
    }

    let hr = &config.heart_rate;
    let band_bpm = (m.min_frequency * 60.0, m.max_frequency * 60.0);
    if band_bpm.1 < hr.min_valid_bpm || band_bpm.0 > hr.max_valid_bpm {
        errors.push(format!(
            "passband {:.0}-{:.0} BPM lies outside the valid heart-rate range {:.0}-{:.0} BPM",
            band_bpm.0, band_bpm.1, hr.min_valid_bpm, hr.max_valid_bpm
        ));
    }

    (errors, warnings)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MonitorConfig;

    #[test]
    fn test_levenshtein_identical() {
        assert_eq!(levenshtein("alpha", "alpha"), 0);
    }

    #[test]
    fn test_levenshtein_one_edit() {
        assert_eq!(levenshtein("aplha", "alpha"), 2);
        assert_eq!(levenshtein("buffer_sise", "buffer_size"), 1);
    }

    #[test]
    fn test_levenshtein_empty() {
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("abc", ""), 3);
    }

    #[test]
    fn test_walk_toml_keys_nested() {
        let toml: toml::Value = r#"
            [face]
            [face.fixed_region]
            x = 10
        "#
        .parse()
        .expect("toml");
        let keys = walk_toml_keys(&toml, "");
        assert!(keys.contains(&"face".to_string()));
        assert!(keys.contains(&"face.fixed_region".to_string()));
        assert!(keys.contains(&"face.fixed_region.x".to_string()));
    }

    #[test]
    fn test_typo_key_produces_warning_with_suggestion() {
        let toml_str = r#"
[magnification]
buffer_sise = 150
"#;
        let warnings = validate_unknown_keys(toml_str);
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "magnification.buffer_sise");
        assert_eq!(
            warnings[0].suggestion.as_deref(),
            Some("magnification.buffer_size")
        );
        assert!(warnings[0].to_string().contains("did you mean"));
    }

    #[test]
    fn test_all_valid_keys_produce_zero_warnings() {
        let toml_str = r#"
[webcam]
video_frame_rate = 30

[magnification]
alpha = 100.0
levels = 2

[heart_rate]
report_interval_secs = 30

[face]
detector = "centered"
"#;
        let warnings = validate_unknown_keys(toml_str);
        assert!(warnings.is_empty(), "Expected 0 warnings, got: {warnings:?}");
    }

    #[test]
    fn test_unknown_section_without_suggestion() {
        let warnings = validate_unknown_keys("[display]\nwindow_title = \"x\"\n");
        assert!(!warnings.is_empty());
        assert!(warnings.iter().all(|w| w.suggestion.is_none()));
    }

    #[test]
    fn test_known_keys_match_serialized_defaults() {
        let text = MonitorConfig::default().to_toml().expect("serialize");
        assert!(validate_unknown_keys(&text).is_empty());
    }

    #[test]
    fn test_defaults_have_clean_ranges() {
        let (errors, warnings) = validate_signal_ranges(&MonitorConfig::default());
        assert!(errors.is_empty(), "{errors:?}");
        assert!(warnings.is_empty(), "{warnings:?}");
    }

    #[test]
    fn test_band_above_nyquist_warns() {
        let mut config = MonitorConfig::default();
        config.magnification.min_frequency = 9.0;
        config.magnification.max_frequency = 10.0;
        config.heart_rate.max_valid_bpm = 1000.0;

        let (errors, warnings) = validate_signal_ranges(&config);
        assert!(errors.is_empty(), "{errors:?}");
        assert!(warnings.iter().any(|w| w.field == "magnification.min_frequency"));
    }

    #[test]
    fn test_empty_band_warns() {
        let mut config = MonitorConfig::default();
        config.magnification.min_frequency = 1.01;
        config.magnification.max_frequency = 1.09;

        let (_, warnings) = validate_signal_ranges(&config);
        assert!(warnings.iter().any(|w| w.message.contains("no FFT bin")));
    }

    #[test]
    fn test_non_rgb_channels_warn() {
        let mut config = MonitorConfig::default();
        config.webcam.video_channels = 1;

        let (errors, warnings) = validate_signal_ranges(&config);
        assert!(errors.is_empty(), "{errors:?}");
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].field, "webcam.video_channels");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_band_outside_valid_bpm_is_error() {
        let mut config = MonitorConfig::default();
        config.magnification.min_frequency = 4.0;
        config.magnification.max_frequency = 5.0;

        let (errors, _) = validate_signal_ranges(&config);
        assert_eq!(errors.len(), 1);
    }
}
