use std::collections::HashMap;

use autoflight_core::error::ValidationError;
use autoflight_core::pipeline::{EnvOverrides, RunConfig, RunOptions};
use autoflight_core::security::SecurityLimits;
use autoflight_core::StitchMode;

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key: &str| map.get(key).cloned()
}

#[test]
fn test_defaults() {
    let config = RunConfig::default();
    assert!(config.parallel);
    assert!(config.max_workers >= 1 && config.max_workers <= 8);
    assert_eq!(config.jpeg_quality, 95);
    assert_eq!(config.png_level, 3);
    assert_eq!(config.mode, StitchMode::Panorama);
    assert!(!config.verbose);
    assert!(!config.strict);
    assert!(config.validate().is_ok());
}

#[test]
fn test_env_overrides_parse() {
    let env = EnvOverrides::from_lookup(lookup(&[
        ("AUTOFLIGHT_PARALLEL", "0"),
        ("AUTOFLIGHT_MAX_WORKERS", "3"),
        ("AUTOFLIGHT_JPEG_QUALITY", "80"),
        ("AUTOFLIGHT_PNG_COMPRESSION", "9"),
        ("AUTOFLIGHT_MODE", "scans"),
        ("AUTOFLIGHT_VERBOSE", "true"),
    ]))
    .unwrap();

    assert_eq!(env.parallel, Some(false));
    assert_eq!(env.max_workers, Some(3));
    assert_eq!(env.jpeg_quality, Some(80));
    assert_eq!(env.png_level, Some(9));
    assert_eq!(env.mode, Some(StitchMode::Scans));
    assert_eq!(env.verbose, Some(true));
}

#[test]
fn test_unset_env_changes_nothing() {
    let env = EnvOverrides::from_lookup(|_| None).unwrap();
    assert_eq!(env, EnvOverrides::default());

    let config = RunConfig::resolve(&RunOptions::default(), &env).unwrap();
    assert_eq!(config, RunConfig::default());
}

#[test]
fn test_invalid_env_values_are_rejected() {
    let err = EnvOverrides::from_lookup(lookup(&[("AUTOFLIGHT_PARALLEL", "sometimes")])).unwrap_err();
    assert_eq!(
        err,
        ValidationError::InvalidEnv {
            var: "AUTOFLIGHT_PARALLEL".to_string(),
            value: "sometimes".to_string()
        }
    );

    let err = EnvOverrides::from_lookup(lookup(&[("AUTOFLIGHT_JPEG_QUALITY", "150")])).unwrap_err();
    assert_eq!(err, ValidationError::QualityOutOfRange(150));

    let err = EnvOverrides::from_lookup(lookup(&[("AUTOFLIGHT_MAX_WORKERS", "many")])).unwrap_err();
    assert!(matches!(err, ValidationError::InvalidEnv { .. }));

    let err = EnvOverrides::from_lookup(lookup(&[("AUTOFLIGHT_MODE", "affine")])).unwrap_err();
    assert_eq!(err, ValidationError::UnknownMode("affine".to_string()));
}

#[test]
fn test_explicit_options_beat_env_beat_defaults() {
    let env = EnvOverrides::from_lookup(lookup(&[
        ("AUTOFLIGHT_JPEG_QUALITY", "70"),
        ("AUTOFLIGHT_MODE", "scans"),
        ("AUTOFLIGHT_MAX_WORKERS", "2"),
    ]))
    .unwrap();
    let options = RunOptions {
        quality: Some(50),
        ..Default::default()
    };

    let config = RunConfig::resolve(&options, &env).unwrap();
    assert_eq!(config.jpeg_quality, 50);
    assert_eq!(config.mode, StitchMode::Scans);
    assert_eq!(config.max_workers, 2);
    assert_eq!(config.png_level, 3);
}

#[test]
fn test_base_layer_replaces_defaults() {
    let base = RunConfig {
        png_level: 8,
        parallel: false,
        ..Default::default()
    };
    let options = RunOptions {
        base: Some(base),
        parallel: Some(true),
        ..Default::default()
    };

    let config = RunConfig::resolve(&options, &EnvOverrides::default()).unwrap();
    assert_eq!(config.png_level, 8);
    assert!(config.parallel);
}

#[test]
fn test_resolve_validates_explicit_values() {
    let zero_quality = RunOptions {
        quality: Some(0),
        ..Default::default()
    };
    assert_eq!(
        RunConfig::resolve(&zero_quality, &EnvOverrides::default()).unwrap_err(),
        ValidationError::QualityOutOfRange(0)
    );

    let png = RunOptions {
        png_level: Some(10),
        ..Default::default()
    };
    assert_eq!(
        RunConfig::resolve(&png, &EnvOverrides::default()).unwrap_err(),
        ValidationError::PngLevelOutOfRange(10)
    );

    let workers = RunOptions {
        max_workers: Some(0),
        ..Default::default()
    };
    assert_eq!(
        RunConfig::resolve(&workers, &EnvOverrides::default()).unwrap_err(),
        ValidationError::ZeroWorkers
    );
}

#[test]
fn test_config_toml_roundtrip() {
    let config = RunConfig {
        mode: StitchMode::Scans,
        jpeg_quality: 88,
        strict: true,
        ..Default::default()
    };
    let text = toml::to_string_pretty(&config).unwrap();
    assert!(text.contains("mode = \"scans\""));

    let parsed: RunConfig = toml::from_str(&text).unwrap();
    assert_eq!(parsed, config);
}

#[test]
fn test_partial_toml_fills_defaults() {
    let parsed: RunConfig = toml::from_str("jpeg_quality = 60\n").unwrap();
    assert_eq!(parsed.jpeg_quality, 60);
    assert_eq!(parsed.png_level, 3);
    assert_eq!(parsed.mode, StitchMode::Panorama);

    let limits: SecurityLimits = toml::from_str("max_file_count = 10\n").unwrap();
    assert_eq!(limits.max_file_count, 10);
    assert_eq!(limits.max_file_size_bytes, 500_000_000);
}

#[test]
fn test_limits_json_roundtrip() {
    let limits = SecurityLimits {
        max_file_size_bytes: 1_000,
        max_image_pixels: 4_000,
        max_file_count: 7,
    };
    let json = serde_json::to_string(&limits).unwrap();
    let parsed: SecurityLimits = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed, limits);

    let mode: StitchMode = serde_json::from_str("\"scans\"").unwrap();
    assert_eq!(mode, StitchMode::Scans);
}
