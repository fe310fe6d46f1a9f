//! Tunable heuristics for localization and sampling
//!
//! Every threshold the pipeline relies on is a named constant here, so the
//! values can be tuned and tested apart from the control flow that uses them.

use crate::core::error::ConfigError;
use crate::core::vision::HsvRange;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Frames wider than this are downscaled before localization.
pub const WORKING_WIDTH: u32 = 480;
/// Gaussian sigma of the pre-segmentation blur (OpenCV's 5x5 default sigma).
pub const BLUR_SIGMA: f32 = 1.1;
/// Side of the square structuring element used for open/close.
pub const MORPH_KERNEL_SIZE: u32 = 3;
/// Minimum contour area in working-resolution pixels.
pub const MIN_CONTOUR_AREA: f64 = 15.0;
/// `circularity * area` at which confidence saturates to 1.0.
pub const CONFIDENCE_DIVISOR: f64 = 1500.0;

/// Red wraps around the hue circle, so it needs a low and a high band.
/// Hue is on the 0..180 scale, saturation and value on 0..255.
pub const RED_LOW_BAND: HsvRange = HsvRange::new([0, 120, 70], [10, 255, 255]);
pub const RED_HIGH_BAND: HsvRange = HsvRange::new([170, 120, 70], [180, 255, 255]);

/// Sampling never runs denser than this, in seconds.
pub const SAMPLE_FLOOR_SECS: f64 = 0.08;
/// Upper bound on sampled steps per clip.
pub const MAX_SAMPLES: u32 = 320;
/// A source already within this distance of the target is not re-seeked.
pub const SEEK_TOLERANCE_SECS: f64 = 0.01;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalizerConfig {
    pub working_width: u32,
    pub blur_sigma: f32,
    /// Bands are unioned into one mask.
    pub hue_bands: Vec<HsvRange>,
    pub morph_kernel_size: u32,
    pub min_contour_area: f64,
    pub confidence_divisor: f64,
}

impl Default for LocalizerConfig {
    fn default() -> Self {
        Self {
            working_width: WORKING_WIDTH,
            blur_sigma: BLUR_SIGMA,
            hue_bands: vec![RED_LOW_BAND, RED_HIGH_BAND],
            morph_kernel_size: MORPH_KERNEL_SIZE,
            min_contour_area: MIN_CONTOUR_AREA,
            confidence_divisor: CONFIDENCE_DIVISOR,
        }
    }
}

impl LocalizerConfig {
    /// White limited-overs ball: any hue, low saturation, bright.
    pub fn for_white_ball() -> Self {
        Self {
            hue_bands: vec![HsvRange::new([0, 0, 200], [180, 40, 255])],
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.working_width == 0 {
            return Err(ConfigError::Invalid("working_width must be > 0".into()));
        }
        if !(self.blur_sigma.is_finite() && self.blur_sigma > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "blur_sigma must be positive, got {}",
                self.blur_sigma
            )));
        }
        if self.hue_bands.is_empty() {
            return Err(ConfigError::Invalid("at least one hue band is required".into()));
        }
        if let Some(band) = self.hue_bands.iter().find(|b| !b.is_ordered()) {
            return Err(ConfigError::Invalid(format!("inverted hue band: {:?}", band)));
        }
        if self.morph_kernel_size == 0 || self.morph_kernel_size % 2 == 0 {
            return Err(ConfigError::Invalid(format!(
                "morph_kernel_size must be odd, got {}",
                self.morph_kernel_size
            )));
        }
        if !(self.min_contour_area >= 0.0) {
            return Err(ConfigError::Invalid("min_contour_area must be >= 0".into()));
        }
        if !(self.confidence_divisor > 0.0) {
            return Err(ConfigError::Invalid("confidence_divisor must be > 0".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplerConfig {
    pub floor_interval: f64,
    pub max_samples: u32,
    pub seek_tolerance: f64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            floor_interval: SAMPLE_FLOOR_SECS,
            max_samples: MAX_SAMPLES,
            seek_tolerance: SEEK_TOLERANCE_SECS,
        }
    }
}

impl SamplerConfig {
    /// Denser cadence for high-speed captures (120 fps and up).
    pub fn for_high_frame_rate() -> Self {
        Self {
            floor_interval: 0.04,
            max_samples: 640,
            seek_tolerance: 0.005,
        }
    }

    /// `max(floor, duration / max_samples)`
    pub fn interval_for(&self, duration: f64) -> f64 {
        self.floor_interval.max(duration / self.max_samples as f64)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.floor_interval.is_finite() && self.floor_interval > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "floor_interval must be positive, got {}",
                self.floor_interval
            )));
        }
        if self.max_samples == 0 {
            return Err(ConfigError::Invalid("max_samples must be > 0".into()));
        }
        if !(self.seek_tolerance >= 0.0) {
            return Err(ConfigError::Invalid("seek_tolerance must be >= 0".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub localizer: LocalizerConfig,
    pub sampler: SamplerConfig,
}

impl AnalysisConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Lenient parsing for hand-edited files (comments, trailing commas).
    pub fn from_json5_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = json5::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// `.json5` files go through the lenient parser, everything else is strict JSON.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("json5") => Self::from_json5_str(&content),
            _ => Self::from_json_str(&content),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.localizer.validate()?;
        self.sampler.validate()
    }
}
