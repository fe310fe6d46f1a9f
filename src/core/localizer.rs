//! 单帧球体定位
//!
//! Colour + shape heuristic tuned for a saturated ball against pitch and sky:
//! downscale, blur, HSV band mask, open/close, then pick the external contour
//! with the best `circularity * area`.

use crate::core::config::LocalizerConfig;
use crate::core::error::VisionError;
use crate::core::frame::Frame;
use crate::core::models::BallCandidate;
use crate::core::vision::{Contour, HsvImage, Mask, VisionEngine, VisionOps};
use image::RgbImage;
use log::{debug, warn};
use std::f64::consts::PI;
use std::sync::Arc;

/// Stateless: every `locate` call is independent of the previous one.
pub struct BallLocalizer {
    vision: Arc<dyn VisionOps>,
    config: LocalizerConfig,
}

#[derive(Debug, Clone, Copy)]
struct ScoredContour<'a> {
    contour: &'a Contour,
    score: f64,
}

impl BallLocalizer {
    pub fn new(vision: Arc<dyn VisionOps>, config: LocalizerConfig) -> Result<Self, VisionError> {
        config
            .validate()
            .map_err(|e| VisionError::InvalidParameter(e.to_string()))?;
        Ok(Self { vision, config })
    }

    pub fn from_engine(engine: &VisionEngine, config: LocalizerConfig) -> Result<Self, VisionError> {
        Self::new(engine.ops()?, config)
    }

    pub fn config(&self) -> &LocalizerConfig {
        &self.config
    }

    /// Returns the ball position in original-frame pixels, or `None` when no
    /// contour survives filtering or the frame is unusable.
    pub fn locate(&self, frame: &Frame) -> Option<BallCandidate> {
        if !frame.is_valid() {
            debug!("Skipping invalid frame {}x{}", frame.width, frame.height);
            return None;
        }

        let scale = self.scale_for(frame.width);
        let (work_w, work_h) = (
            ((frame.width as f64 * scale).round() as u32).max(1),
            ((frame.height as f64 * scale).round() as u32).max(1),
        );

        let working = {
            let rgb = RgbImage::from_raw(frame.width, frame.height, frame.to_rgb())?;
            self.vision.resize_area(&rgb, work_w, work_h)
        };
        let blurred = self.vision.blur(&working, self.config.blur_sigma);
        let hsv = self.vision.to_hsv(&blurred);

        let mask = match self.color_mask(&hsv) {
            Ok(mask) => mask,
            Err(e) => {
                warn!("⚠️ Colour mask failed: {}", e);
                return None;
            }
        };
        let k = self.config.morph_kernel_size;
        let mask = self.vision.morph_close(&self.vision.morph_open(&mask, k), k);

        let contours = self.vision.find_external_contours(&mask);
        let best = self.best_contour(&contours)?;

        let Some((cx, cy)) = self.vision.moments(best.contour).centroid() else {
            debug!("Best contour has zero moment, rejecting");
            return None;
        };

        let x = ((cx / scale).round().max(0.0) as u32).min(frame.width - 1);
        let y = ((cy / scale).round().max(0.0) as u32).min(frame.height - 1);
        let confidence = (best.score / self.config.confidence_divisor).clamp(0.0, 1.0);

        debug!(
            "Ball at ({}, {}) score {:.1} from {} contour(s)",
            x,
            y,
            best.score,
            contours.len()
        );

        Some(BallCandidate { x, y, confidence })
    }

    /// Working/original ratio, never upscaling.
    fn scale_for(&self, width: u32) -> f64 {
        if width > self.config.working_width {
            self.config.working_width as f64 / width as f64
        } else {
            1.0
        }
    }

    fn color_mask(&self, hsv: &HsvImage) -> Result<Mask, VisionError> {
        let mut bands = self.config.hue_bands.iter();
        let first = bands
            .next()
            .ok_or_else(|| VisionError::InvalidParameter("no hue bands".into()))?;
        let mut mask = self.vision.in_range(hsv, first);
        for band in bands {
            mask = self.vision.bitwise_or(&mask, &self.vision.in_range(hsv, band))?;
        }
        Ok(mask)
    }

    fn best_contour<'a>(&self, contours: &'a [Contour]) -> Option<ScoredContour<'a>> {
        let mut best: Option<ScoredContour<'a>> = None;

        for contour in contours {
            let area = self.vision.contour_area(contour);
            if area < self.config.min_contour_area {
                continue;
            }
            let perimeter = self.vision.arc_length(contour);
            if perimeter <= 0.0 {
                continue;
            }

            let circularity = 4.0 * PI * area / (perimeter * perimeter);
            let score = circularity * area;
            if best.map_or(true, |b| score > b.score) {
                best = Some(ScoredContour { contour, score });
            }
        }

        best
    }
}
