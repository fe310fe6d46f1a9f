use serde::{Deserialize, Serialize};

/// 单帧定位结果（原始帧像素坐标）
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BallCandidate {
    pub x: u32,
    pub y: u32,
    /// `min(1, score / divisor)`, a ranking value rather than a probability.
    pub confidence: f64,
}

/// One successful localization at a sampled time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionPoint {
    pub time: f64,
    pub x: u32,
    pub y: u32,
    pub norm_x: f64,
    pub norm_y: f64,
    pub confidence: f64,
}

/// A trajectory sample in pitch coordinates, metres.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HawkEyePoint {
    pub time: f64,
    /// Down the pitch from the bowling end.
    pub distance: f64,
    /// Signed offset from the centre line.
    pub lateral: f64,
    /// Above the pitch surface.
    pub height: f64,
    pub confidence: f64,
}

/// Derived flight metrics. `None` means "not enough data", never zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrajectorySummary {
    /// km/h
    pub release_speed: Option<f64>,
    pub peak_height: Option<f64>,
    pub bounce_distance: Option<f64>,
    pub lateral_movement: Option<f64>,
    pub confidence: Option<f64>,
}

impl TrajectorySummary {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
