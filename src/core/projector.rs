//! Pixel -> pitch projection
//!
//! Camera model: an elevated end-on view from behind the bowler. The bottom of
//! the image is the release end and the top is the batting end, so the
//! vertical image position maps linearly onto distance down the pitch. The
//! horizontal position maps onto lateral offset about the centre line.
//!
//! Height is not measured. A single camera gives no depth, so height is a fixed
//! arc of `APEX_HEIGHT_M` over distance, zero at both creases and peaking at
//! mid-pitch. It depends on `normY` alone, which makes any height-derived
//! figure (peak height, bounce point) a property of where the ball was seen,
//! not of how it actually flew.

use crate::core::models::{DetectionPoint, HawkEyePoint};

/// Stumps to stumps.
pub const PITCH_LENGTH_M: f64 = 20.12;
pub const PITCH_WIDTH_M: f64 = 3.05;
pub const LATERAL_MARGIN_M: f64 = 0.6;
/// Half pitch width plus margin; lateral values stay inside `±LATERAL_EXTENT_M`.
pub const LATERAL_EXTENT_M: f64 = PITCH_WIDTH_M / 2.0 + LATERAL_MARGIN_M;
pub const APEX_HEIGHT_M: f64 = 2.4;

#[derive(Debug, Clone, Copy, Default)]
pub struct TrajectoryProjector;

impl TrajectoryProjector {
    pub fn new() -> Self {
        Self
    }

    /// Length- and order-preserving; time and confidence pass through.
    pub fn project(&self, detections: &[DetectionPoint]) -> Vec<HawkEyePoint> {
        detections.iter().map(|d| self.project_point(d)).collect()
    }

    pub fn project_point(&self, detection: &DetectionPoint) -> HawkEyePoint {
        let nx = clamp_unit(detection.norm_x);
        let ny = clamp_unit(detection.norm_y);

        // 0 at the bottom edge (release), 1 at the top edge (batting end)
        let travel = 1.0 - ny;

        let distance = travel * PITCH_LENGTH_M;
        let lateral = ((nx - 0.5) * 2.0 * LATERAL_EXTENT_M).clamp(-LATERAL_EXTENT_M, LATERAL_EXTENT_M);
        let height = APEX_HEIGHT_M * 4.0 * travel * (1.0 - travel);

        HawkEyePoint {
            time: detection.time,
            distance,
            lateral,
            height,
            confidence: detection.confidence,
        }
    }
}

fn clamp_unit(v: f64) -> f64 {
    if v.is_nan() {
        0.5
    } else {
        v.clamp(0.0, 1.0)
    }
}
