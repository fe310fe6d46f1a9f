//! 轨迹统计：出手速度、最高点、落点、侧向偏移、置信度
//!
//! Peak height and bounce distance are read off the projected heights. With
//! the fixed arc from [`TrajectoryProjector`](crate::core::projector::TrajectoryProjector)
//! the peak is the sample nearest mid-pitch and the bounce is the first sample
//! past it, so both are nominal placements rather than measurements.

use crate::core::models::{DetectionPoint, HawkEyePoint, TrajectorySummary};

/// Number of leading trajectory points used for the release-speed estimate.
pub const RELEASE_WINDOW: usize = 4;
const MPS_TO_KMH: f64 = 3.6;

#[derive(Debug, Clone, Copy)]
pub struct TrajectorySummarizer {
    release_window: usize,
}

impl Default for TrajectorySummarizer {
    fn default() -> Self {
        Self::new()
    }
}

impl TrajectorySummarizer {
    pub fn new() -> Self {
        Self {
            release_window: RELEASE_WINDOW,
        }
    }

    pub fn with_release_window(release_window: usize) -> Self {
        Self {
            release_window: release_window.max(2),
        }
    }

    /// Total: missing data yields `None` fields, never an error or a zero.
    pub fn summarize(
        &self,
        detections: &[DetectionPoint],
        trajectory: &[HawkEyePoint],
    ) -> TrajectorySummary {
        if trajectory.is_empty() {
            return TrajectorySummary::default();
        }

        TrajectorySummary {
            release_speed: self.release_speed(detections, trajectory),
            peak_height: peak_height(trajectory),
            bounce_distance: bounce_distance(trajectory),
            lateral_movement: lateral_movement(trajectory),
            confidence: mean_confidence(trajectory),
        }
    }

    /// Mean `|Δdistance| / Δt` over the first points, in km/h. A point is
    /// usable when it still lines up with its source detection.
    fn release_speed(
        &self,
        detections: &[DetectionPoint],
        trajectory: &[HawkEyePoint],
    ) -> Option<f64> {
        let early: Vec<&HawkEyePoint> = trajectory
            .iter()
            .enumerate()
            .filter(|(i, p)| detections.get(*i).map_or(false, |d| d.time == p.time))
            .map(|(_, p)| p)
            .take(self.release_window)
            .collect();

        let speeds: Vec<f64> = early
            .windows(2)
            .filter_map(|w| {
                let dt = w[1].time - w[0].time;
                (dt > 0.0).then(|| (w[1].distance - w[0].distance).abs() / dt)
            })
            .collect();

        if speeds.is_empty() {
            return None;
        }
        Some(speeds.iter().sum::<f64>() / speeds.len() as f64 * MPS_TO_KMH)
    }
}

fn peak_height(trajectory: &[HawkEyePoint]) -> Option<f64> {
    trajectory.iter().map(|p| p.height).reduce(f64::max)
}

/// Distance of the first point lower than its predecessor.
fn bounce_distance(trajectory: &[HawkEyePoint]) -> Option<f64> {
    trajectory
        .windows(2)
        .find(|w| w[1].height < w[0].height)
        .map(|w| w[1].distance)
}

/// Spread between the extreme lateral positions.
fn lateral_movement(trajectory: &[HawkEyePoint]) -> Option<f64> {
    if trajectory.len() < 2 {
        return None;
    }
    let min = trajectory.iter().map(|p| p.lateral).reduce(f64::min)?;
    let max = trajectory.iter().map(|p| p.lateral).reduce(f64::max)?;
    Some(max - min)
}

fn mean_confidence(trajectory: &[HawkEyePoint]) -> Option<f64> {
    if trajectory.is_empty() {
        return None;
    }
    let mean = trajectory.iter().map(|p| p.confidence).sum::<f64>() / trajectory.len() as f64;
    Some(mean.clamp(0.0, 1.0))
}
