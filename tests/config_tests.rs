use spatial_viewer::config::{Configuration, from_yaml_file};
use std::time::Duration;

#[test]
fn empty_config_uses_defaults() {
    let cfg: Configuration = serde_yaml::from_str("{}").unwrap();
    assert!((cfg.max_height_m - 2.0).abs() < f32::EPSILON);
    assert!((cfg.viewing_distance_m - 2.0).abs() < f32::EPSILON);
    assert_eq!(cfg.loading_pulse_period, Duration::from_millis(1200));
    assert!((cfg.fov.initial_degrees - 75.0).abs() < f32::EPSILON);
    assert!((cfg.fov.narrow_degrees - 120.0).abs() < f32::EPSILON);
    assert!((cfg.fov.wide_degrees - 70.0).abs() < f32::EPSILON);
    cfg.validate().unwrap();
}

#[test]
fn parse_kebab_case_overrides() {
    let yaml = r#"
max-height-m: 1.5
viewing-distance-m: 3.0
loading-pulse-period: 750ms
fov:
  narrow-aspect: 0.5
  wide-aspect: 2.0
"#;
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert!((cfg.max_height_m - 1.5).abs() < f32::EPSILON);
    assert!((cfg.viewing_distance_m - 3.0).abs() < f32::EPSILON);
    assert_eq!(cfg.loading_pulse_period, Duration::from_millis(750));
    assert!((cfg.fov.narrow_aspect - 0.5).abs() < f32::EPSILON);
    // Untouched fields keep their defaults.
    assert!((cfg.fov.narrow_degrees - 120.0).abs() < f32::EPSILON);
    cfg.validate().unwrap();
}

#[test]
fn unknown_fields_are_rejected() {
    let err = serde_yaml::from_str::<Configuration>("slideshow-delay: 3s\n").unwrap_err();
    assert!(err.to_string().contains("slideshow-delay"));
}

#[test]
fn validate_rejects_non_positive_height() {
    let cfg: Configuration = serde_yaml::from_str("max-height-m: 0.0").unwrap();
    assert!(cfg.validate().is_err());
}

#[test]
fn validate_rejects_out_of_range_fov() {
    let cfg: Configuration = serde_yaml::from_str("fov:\n  narrow-degrees: 200.0\n").unwrap();
    assert!(cfg.validate().is_err());
}

#[test]
fn validate_rejects_inverted_aspect_endpoints() {
    let yaml = "fov:\n  narrow-aspect: 3.0\n  wide-aspect: 1.0\n";
    let cfg: Configuration = serde_yaml::from_str(yaml).unwrap();
    assert!(cfg.validate().is_err());
}

#[test]
fn loads_from_yaml_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("viewer.yaml");
    std::fs::write(&path, "max-height-m: 2.5\n").unwrap();
    let cfg = from_yaml_file(&path).unwrap();
    assert!((cfg.max_height_m - 2.5).abs() < f32::EPSILON);
}

#[test]
fn missing_file_is_an_error() {
    let err = from_yaml_file(std::path::Path::new("/no/such/viewer.yaml")).unwrap_err();
    assert!(err.to_string().contains("/no/such/viewer.yaml"));
}
