//! 视觉原语能力接口
//!
//! The localizer only talks to [`VisionOps`]; any backend (the in-process
//! [`NativeVision`], or a binding to a native imaging library) can be injected
//! through a [`VisionEngine`] handle.

pub mod contour;
pub mod engine;
pub mod native;

pub use engine::VisionEngine;
pub use native::NativeVision;

use crate::core::error::VisionError;
use image::{GrayImage, RgbImage};
use serde::{Deserialize, Serialize};

/// HSV image stored channel-wise in an `RgbImage`: H in 0..180, S and V in 0..255.
pub type HsvImage = RgbImage;

/// Binary mask, 0 or 255 per pixel.
pub type Mask = GrayImage;

/// Inclusive per-channel HSV bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HsvRange {
    pub lower: [u8; 3],
    pub upper: [u8; 3],
}

impl HsvRange {
    pub const fn new(lower: [u8; 3], upper: [u8; 3]) -> Self {
        Self { lower, upper }
    }

    #[inline]
    pub fn contains(&self, hsv: [u8; 3]) -> bool {
        (0..3).all(|c| hsv[c] >= self.lower[c] && hsv[c] <= self.upper[c])
    }

    pub fn is_ordered(&self) -> bool {
        (0..3).all(|c| self.lower[c] <= self.upper[c])
    }
}

/// Closed boundary as a chain of pixel coordinates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Contour {
    pub points: Vec<(i32, i32)>,
}

impl Contour {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Spatial moments up to first order.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Moments {
    pub m00: f64,
    pub m10: f64,
    pub m01: f64,
}

impl Moments {
    /// `(m10/m00, m01/m00)`, `None` for a degenerate (zero-area) shape.
    pub fn centroid(&self) -> Option<(f64, f64)> {
        if self.m00.abs() < f64::EPSILON {
            return None;
        }
        Some((self.m10 / self.m00, self.m01 / self.m00))
    }
}

pub trait VisionOps: Send + Sync {
    fn name(&self) -> &str;

    /// Area-weighted resize, no aliasing on downscale.
    fn resize_area(&self, image: &RgbImage, width: u32, height: u32) -> RgbImage;

    fn blur(&self, image: &RgbImage, sigma: f32) -> RgbImage;

    fn to_hsv(&self, image: &RgbImage) -> HsvImage;

    fn in_range(&self, hsv: &HsvImage, range: &HsvRange) -> Mask;

    fn bitwise_or(&self, a: &Mask, b: &Mask) -> Result<Mask, VisionError>;

    /// Erode then dilate with a `kernel_size` square element.
    fn morph_open(&self, mask: &Mask, kernel_size: u32) -> Mask;

    /// Dilate then erode with a `kernel_size` square element.
    fn morph_close(&self, mask: &Mask, kernel_size: u32) -> Mask;

    /// Outer borders only; shapes nested inside holes are not reported.
    fn find_external_contours(&self, mask: &Mask) -> Vec<Contour>;

    fn contour_area(&self, contour: &Contour) -> f64 {
        contour::polygon_area(contour)
    }

    fn arc_length(&self, contour: &Contour) -> f64 {
        contour::closed_arc_length(contour)
    }

    fn moments(&self, contour: &Contour) -> Moments {
        contour::polygon_moments(contour)
    }
}
