//! 投球轨迹分析器
//!
//! ```ignore
//! let analyzer = DeliveryAnalyzer::with_defaults()?;
//! let report = analyzer.analyze(&mut source, |p| println!("{:.0}%", p * 100.0), &cancel).await?;
//! println!("{}", report.to_json()?);
//! ```

use crate::core::config::AnalysisConfig;
use crate::core::error::AnalysisError;
use crate::core::localizer::BallLocalizer;
use crate::core::models::{DetectionPoint, HawkEyePoint, TrajectorySummary};
use crate::core::projector::TrajectoryProjector;
use crate::core::sampler::{CancelToken, FrameSource, TemporalSampler};
use crate::core::summary::TrajectorySummarizer;
use crate::core::vision::VisionEngine;
use log::{error, info};
use serde::{Deserialize, Serialize};

/// Everything a presentation layer needs from one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub detections: Vec<DetectionPoint>,
    pub trajectory: Vec<HawkEyePoint>,
    pub summary: TrajectorySummary,
}

impl AnalysisReport {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Holds no per-run state; runs may be issued one after another.
pub struct DeliveryAnalyzer {
    localizer: BallLocalizer,
    config: AnalysisConfig,
    projector: TrajectoryProjector,
    summarizer: TrajectorySummarizer,
}

impl DeliveryAnalyzer {
    pub fn new(engine: &VisionEngine, config: AnalysisConfig) -> Result<Self, AnalysisError> {
        crate::init_logging();
        config.validate()?;
        let localizer = BallLocalizer::from_engine(engine, config.localizer.clone())?;
        info!("🏏 DeliveryAnalyzer: created");
        Ok(Self {
            localizer,
            config,
            projector: TrajectoryProjector::new(),
            summarizer: TrajectorySummarizer::new(),
        })
    }

    /// Default config on the process-wide vision engine.
    pub fn with_defaults() -> Result<Self, AnalysisError> {
        Self::new(VisionEngine::global()?, AnalysisConfig::default())
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Samples the clip, then projects and summarizes the detections.
    ///
    /// Fails on missing metadata, on the first undecodable frame, on
    /// cancellation, and when the whole pass finds no ball at all.
    pub async fn analyze<S, P>(
        &self,
        source: &mut S,
        on_progress: P,
        cancel: &CancelToken,
    ) -> Result<AnalysisReport, AnalysisError>
    where
        S: FrameSource + ?Sized,
        P: FnMut(f64),
    {
        info!("🎬 Analysis started ({:.2}s clip)", source.duration());

        let sampler = TemporalSampler::new(&self.localizer, self.config.sampler.clone());
        let detections = match sampler.sample(source, on_progress, cancel).await {
            Ok(detections) => detections,
            Err(e) => {
                error!("❌ Analysis failed: {}", e);
                return Err(e);
            }
        };

        if detections.is_empty() {
            error!("❌ Analysis failed: no detections");
            return Err(AnalysisError::NoDetections);
        }

        let report = self.rebuild(detections);
        info!(
            "✅ Analysis complete: {} point(s), speed {:?} km/h",
            report.trajectory.len(),
            report.summary.release_speed
        );
        Ok(report)
    }

    /// Re-derives trajectory and summary from an existing detection list.
    pub fn rebuild(&self, detections: Vec<DetectionPoint>) -> AnalysisReport {
        let trajectory = self.projector.project(&detections);
        let summary = self.summarizer.summarize(&detections, &trajectory);
        AnalysisReport {
            detections,
            trajectory,
            summary,
        }
    }
}

impl Drop for DeliveryAnalyzer {
    fn drop(&mut self) {
        info!("🗑️ DeliveryAnalyzer: released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::frame::Frame;
    use crate::core::source::FrameSequence;

    const WIDTH: u32 = 160;
    const HEIGHT: u32 = 120;

    fn analyzer() -> DeliveryAnalyzer {
        let engine = VisionEngine::init().unwrap();
        DeliveryAnalyzer::new(&engine, AnalysisConfig::default()).unwrap()
    }

    /// Red disc moving linearly between two normalised positions over the clip.
    fn moving_ball_clip(from: (f64, f64), to: (f64, f64), duration: f64, fps: f64) -> FrameSequence {
        let count = (duration * fps).round() as usize;
        FrameSequence::from_fn(WIDTH, HEIGHT, fps, count, |i, _| {
            let t = i as f64 / (count - 1) as f64;
            let cx = (from.0 + (to.0 - from.0) * t) * WIDTH as f64;
            let cy = (from.1 + (to.1 - from.1) * t) * HEIGHT as f64;
            let mut data = Vec::with_capacity((WIDTH * HEIGHT * 4) as usize);
            for y in 0..HEIGHT {
                for x in 0..WIDTH {
                    let (dx, dy) = (x as f64 - cx, y as f64 - cy);
                    if dx * dx + dy * dy <= 36.0 {
                        data.extend_from_slice(&[225, 25, 25, 255]);
                    } else {
                        data.extend_from_slice(&[110, 130, 110, 255]);
                    }
                }
            }
            Frame::new(WIDTH, HEIGHT, data, 0.0)
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_end_to_end_straight_delivery() {
        let mut source = moving_ball_clip((0.5, 0.9), (0.5, 0.1), 1.0, 30.0);
        let mut last_progress = 0.0;

        let report = analyzer()
            .analyze(&mut source, |p| last_progress = p, &CancelToken::new())
            .await
            .unwrap();

        assert_eq!(last_progress, 1.0);
        assert!(report.trajectory.len() >= 10);
        assert_eq!(report.trajectory.len(), report.detections.len());
        assert!(report
            .trajectory
            .windows(2)
            .all(|w| w[1].distance > w[0].distance));

        let first_lateral = report.trajectory[0].lateral;
        assert!(report
            .trajectory
            .iter()
            .all(|p| (p.lateral - first_lateral).abs() < 0.1));

        let speed = report.summary.release_speed.unwrap();
        assert!(speed > 0.0);
        assert!(report.summary.confidence.unwrap() > 0.0);
        assert!(report.summary.peak_height.is_some());
    }

    #[tokio::test]
    async fn test_blank_clip_is_no_detections() {
        let mut source = FrameSequence::from_fn(64, 48, 25.0, 25, |_, _| {
            Frame::new(64, 48, vec![90u8; 64 * 48 * 4], 0.0)
        })
        .unwrap();

        let err = analyzer()
            .analyze(&mut source, |_| {}, &CancelToken::new())
            .await
            .unwrap_err();
        assert!(err.is_no_detections());
        assert!(err.to_string().contains("contrast"));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let mut source = moving_ball_clip((0.5, 0.9), (0.5, 0.1), 1.0, 30.0);
        let cancel = CancelToken::new();
        cancel.cancel();

        let result = analyzer().analyze(&mut source, |_| {}, &cancel).await;
        assert!(matches!(result, Err(AnalysisError::Cancelled)));
    }

    #[test]
    fn test_rebuild_empty_detections() {
        let report = analyzer().rebuild(Vec::new());
        assert!(report.trajectory.is_empty());
        assert!(report.summary.is_empty());
    }

    #[test]
    fn test_report_json_shape() {
        let detections = vec![DetectionPoint {
            time: 0.0,
            x: 80,
            y: 108,
            norm_x: 0.5,
            norm_y: 0.9,
            confidence: 0.4,
        }];
        let json = analyzer().rebuild(detections).to_json().unwrap();
        assert!(json.contains("\"normX\":0.5"));
        assert!(json.contains("\"peakHeight\""));
        assert!(json.contains("\"releaseSpeed\":null"));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let engine = VisionEngine::init().unwrap();
        let mut config = AnalysisConfig::default();
        config.sampler.max_samples = 0;
        assert!(matches!(
            DeliveryAnalyzer::new(&engine, config),
            Err(AnalysisError::Config(_))
        ));
    }
}
