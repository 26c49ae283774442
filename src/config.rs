use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;

/// Viewer configuration, loaded from a kebab-case YAML file. Every
/// field has a default so an empty file (or no file) is valid.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Configuration {
    /// Physical height of the photo quad in scene metres; width is
    /// derived from the composite aspect ratio.
    #[serde(default = "Configuration::default_max_height_m")]
    pub max_height_m: f32,

    /// Distance from the camera to the photo quad, used to project
    /// physical metres into the viewport.
    #[serde(default = "Configuration::default_viewing_distance_m")]
    pub viewing_distance_m: f32,

    /// Pulse period of the loading indicator.
    #[serde(
        default = "Configuration::default_loading_pulse_period",
        with = "humantime_serde"
    )]
    pub loading_pulse_period: Duration,

    #[serde(default)]
    pub fov: FovConfig,
}

/// Field-of-view policy outside an immersive session: a clamped
/// linear ramp over the viewport aspect ratio. The endpoints are the
/// experimentally chosen values from the original viewer.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FovConfig {
    #[serde(default = "FovConfig::default_initial_degrees")]
    pub initial_degrees: f32,
    #[serde(default = "FovConfig::default_narrow_aspect")]
    pub narrow_aspect: f32,
    #[serde(default = "FovConfig::default_wide_aspect")]
    pub wide_aspect: f32,
    #[serde(default = "FovConfig::default_narrow_degrees")]
    pub narrow_degrees: f32,
    #[serde(default = "FovConfig::default_wide_degrees")]
    pub wide_degrees: f32,
}

impl Configuration {
    fn default_max_height_m() -> f32 {
        2.0
    }

    fn default_viewing_distance_m() -> f32 {
        2.0
    }

    fn default_loading_pulse_period() -> Duration {
        Duration::from_millis(1200)
    }

    /// # Errors
    /// Returns an error when a field is outside its usable range.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.max_height_m > 0.0, "max-height-m must be positive");
        ensure!(
            self.viewing_distance_m > 0.0,
            "viewing-distance-m must be positive"
        );
        ensure!(
            !self.loading_pulse_period.is_zero(),
            "loading-pulse-period must be positive"
        );
        self.fov.validate()
    }
}

impl FovConfig {
    fn default_initial_degrees() -> f32 {
        75.0
    }

    fn default_narrow_aspect() -> f32 {
        0.30
    }

    fn default_wide_aspect() -> f32 {
        2.5
    }

    fn default_narrow_degrees() -> f32 {
        120.0
    }

    fn default_wide_degrees() -> f32 {
        70.0
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("fov.initial-degrees", self.initial_degrees),
            ("fov.narrow-degrees", self.narrow_degrees),
            ("fov.wide-degrees", self.wide_degrees),
        ] {
            ensure!(
                value > 0.0 && value < 180.0,
                "{name} must be in (0, 180), got {value}"
            );
        }
        ensure!(
            self.narrow_aspect > 0.0 && self.narrow_aspect < self.wide_aspect,
            "fov aspect endpoints must satisfy 0 < narrow-aspect < wide-aspect"
        );
        Ok(())
    }
}

impl Default for Configuration {
    fn default() -> Self {
        serde_yaml::from_str("{}").expect("default configuration must deserialize")
    }
}

impl Default for FovConfig {
    fn default() -> Self {
        serde_yaml::from_str("{}").expect("default fov configuration must deserialize")
    }
}

/// # Errors
/// Returns an error if the file cannot be read or parsed.
pub fn from_yaml_file(path: &Path) -> Result<Configuration> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    let cfg: Configuration = serde_yaml::from_str(&text)
        .with_context(|| format!("parsing config file {}", path.display()))?;
    Ok(cfg)
}
