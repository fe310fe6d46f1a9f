//! 定步长时间采样
//!
//! Walks a [`FrameSource`] at `max(floor, duration / max_samples)` and runs the
//! localizer on every step, producing a sparse, time-ordered detection list.

use crate::core::config::SamplerConfig;
use crate::core::error::{AnalysisError, SourceError};
use crate::core::frame::Frame;
use crate::core::localizer::BallLocalizer;
use crate::core::models::DetectionPoint;
use async_trait::async_trait;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A decodable, seekable clip.
#[async_trait]
pub trait FrameSource: Send {
    /// Intrinsic pixel size, `None` until metadata is available.
    fn dimensions(&self) -> Option<(u32, u32)>;

    /// Total length in seconds.
    fn duration(&self) -> f64;

    /// Time of the currently positioned frame.
    fn current_time(&self) -> f64;

    /// Positions the source at `time` (clamped to `[0, duration]`) and waits
    /// until that frame is decoded.
    async fn seek(&mut self, time: f64) -> Result<(), SourceError>;

    /// Copies the currently positioned frame at intrinsic size.
    fn capture(&mut self) -> Result<Frame, SourceError>;
}

/// Cooperative cancellation flag shared between the caller and a running analysis.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct TemporalSampler<'a> {
    localizer: &'a BallLocalizer,
    config: SamplerConfig,
}

impl<'a> TemporalSampler<'a> {
    pub fn new(localizer: &'a BallLocalizer, config: SamplerConfig) -> Self {
        Self { localizer, config }
    }

    /// Sample times `0, i, 2i, ...` up to `duration`, at most `max_samples + 1` of them.
    pub fn schedule(&self, duration: f64) -> Vec<f64> {
        let interval = self.config.interval_for(duration);
        let mut times = Vec::new();
        let mut step: u32 = 0;
        loop {
            // Multiplying instead of accumulating keeps drift out of the tail.
            let time = step as f64 * interval;
            if time > duration || step > self.config.max_samples {
                break;
            }
            times.push(time);
            step += 1;
        }
        times
    }

    /// Runs the sampling pass. Progress is reported after every step, hit or
    /// miss, and always ends at 1.0. No new step starts once `cancel` is set.
    pub async fn sample<S, P>(
        &self,
        source: &mut S,
        mut on_progress: P,
        cancel: &CancelToken,
    ) -> Result<Vec<DetectionPoint>, AnalysisError>
    where
        S: FrameSource + ?Sized,
        P: FnMut(f64),
    {
        let (width, height) = source
            .dimensions()
            .filter(|&(w, h)| w > 0 && h > 0)
            .ok_or_else(|| {
                AnalysisError::Precondition(
                    "video dimensions are not available yet; load the video metadata first".into(),
                )
            })?;

        let duration = source.duration();
        if !duration.is_finite() || duration < 0.0 {
            return Err(AnalysisError::Precondition(format!(
                "video duration is not usable: {}",
                duration
            )));
        }

        let times = self.schedule(duration);
        info!(
            "🎯 Sampling {:.2}s clip ({}x{}) at {:.3}s interval, {} steps",
            duration,
            width,
            height,
            self.config.interval_for(duration),
            times.len()
        );

        let mut detections = Vec::new();
        let mut last_progress = 0.0;

        for &time in &times {
            if cancel.is_cancelled() {
                warn!("⚠️ Sampling cancelled at {:.3}s", time);
                return Err(AnalysisError::Cancelled);
            }

            let target = time.min(duration);
            if (source.current_time() - target).abs() > self.config.seek_tolerance {
                source.seek(target).await?;
            }

            let frame = source.capture()?;
            if (frame.width, frame.height) != (width, height) {
                return Err(SourceError::Decode {
                    time: target,
                    reason: format!(
                        "captured {}x{} frame, expected {}x{}",
                        frame.width, frame.height, width, height
                    ),
                }
                .into());
            }

            match self.localizer.locate(&frame) {
                Some(candidate) => {
                    debug!(
                        "t={:.3}s ball at ({}, {}) conf {:.2}",
                        target, candidate.x, candidate.y, candidate.confidence
                    );
                    detections.push(DetectionPoint {
                        time: target,
                        x: candidate.x,
                        y: candidate.y,
                        norm_x: candidate.x as f64 / width as f64,
                        norm_y: candidate.y as f64 / height as f64,
                        confidence: candidate.confidence,
                    });
                }
                None => debug!("t={:.3}s no ball", target),
            }

            let progress = if duration > 0.0 {
                (time / duration).min(1.0)
            } else {
                1.0
            };
            on_progress(progress);
            last_progress = progress;
        }

        if last_progress < 1.0 {
            on_progress(1.0);
        }

        info!(
            "✅ Sampling complete: {} detection(s) from {} step(s)",
            detections.len(),
            times.len()
        );
        Ok(detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::LocalizerConfig;
    use crate::core::source::FrameSequence;
    use crate::core::vision::VisionEngine;

    fn localizer() -> BallLocalizer {
        let engine = VisionEngine::init().unwrap();
        BallLocalizer::from_engine(&engine, LocalizerConfig::default()).unwrap()
    }

    fn blank_clip(duration: f64, fps: f64) -> FrameSequence {
        let count = (duration * fps).round() as usize;
        FrameSequence::from_fn(64, 48, fps, count, |_, _| {
            Frame::new(64, 48, vec![128u8; 64 * 48 * 4], 0.0)
        })
        .unwrap()
    }

    /// Red square on every frame.
    fn ball_clip(duration: f64, fps: f64) -> FrameSequence {
        let count = (duration * fps).round() as usize;
        FrameSequence::from_fn(64, 48, fps, count, |_, _| {
            let mut data = vec![128u8; 64 * 48 * 4];
            for y in 20..30 {
                for x in 30..40 {
                    let i = (y * 64 + x) * 4;
                    data[i..i + 4].copy_from_slice(&[230, 20, 20, 255]);
                }
            }
            Frame::new(64, 48, data, 0.0)
        })
        .unwrap()
    }

    /// Source that fails to decode past a given time.
    struct BrokenSource {
        inner: FrameSequence,
        fail_after: f64,
    }

    #[async_trait]
    impl FrameSource for BrokenSource {
        fn dimensions(&self) -> Option<(u32, u32)> {
            self.inner.dimensions()
        }
        fn duration(&self) -> f64 {
            self.inner.duration()
        }
        fn current_time(&self) -> f64 {
            self.inner.current_time()
        }
        async fn seek(&mut self, time: f64) -> Result<(), SourceError> {
            if time > self.fail_after {
                return Err(SourceError::Decode {
                    time,
                    reason: "corrupt packet".into(),
                });
            }
            self.inner.seek(time).await
        }
        fn capture(&mut self) -> Result<Frame, SourceError> {
            self.inner.capture()
        }
    }

    /// Source whose metadata never arrives.
    struct NoMetadata;

    #[async_trait]
    impl FrameSource for NoMetadata {
        fn dimensions(&self) -> Option<(u32, u32)> {
            None
        }
        fn duration(&self) -> f64 {
            1.0
        }
        fn current_time(&self) -> f64 {
            0.0
        }
        async fn seek(&mut self, _time: f64) -> Result<(), SourceError> {
            Ok(())
        }
        fn capture(&mut self) -> Result<Frame, SourceError> {
            Err(SourceError::MissingDimensions)
        }
    }

    /// Source that reports one size and delivers another.
    struct ResizingSource {
        inner: FrameSequence,
    }

    #[async_trait]
    impl FrameSource for ResizingSource {
        fn dimensions(&self) -> Option<(u32, u32)> {
            self.inner.dimensions()
        }
        fn duration(&self) -> f64 {
            self.inner.duration()
        }
        fn current_time(&self) -> f64 {
            self.inner.current_time()
        }
        async fn seek(&mut self, time: f64) -> Result<(), SourceError> {
            self.inner.seek(time).await
        }
        fn capture(&mut self) -> Result<Frame, SourceError> {
            Ok(Frame::new(32, 24, vec![128u8; 32 * 24 * 4], self.current_time()))
        }
    }

    #[test]
    fn test_schedule_bounds_for_two_second_clip() {
        let localizer = localizer();
        let sampler = TemporalSampler::new(&localizer, SamplerConfig::default());
        let times = sampler.schedule(2.0);

        assert!(times.len() <= (2.0f64 / 0.08).ceil() as usize + 1);
        assert!(times.len() >= 25);
        assert_eq!(times[0], 0.0);
        assert!(times.windows(2).all(|w| w[1] > w[0]));
        assert!(times.iter().all(|&t| t <= 2.0));
    }

    #[test]
    fn test_schedule_subsamples_long_clips() {
        let localizer = localizer();
        let sampler = TemporalSampler::new(&localizer, SamplerConfig::default());
        let times = sampler.schedule(600.0);
        assert!(times.len() <= 321);
        assert!((times[1] - 600.0 / 320.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_progress_monotonic_and_complete() {
        let localizer = localizer();
        let sampler = TemporalSampler::new(&localizer, SamplerConfig::default());
        let mut source = blank_clip(2.0, 25.0);
        let mut progress = Vec::new();

        let detections = sampler
            .sample(&mut source, |p| progress.push(p), &CancelToken::new())
            .await
            .unwrap();

        assert!(detections.is_empty());
        assert!(progress.len() <= 27);
        assert!(progress.windows(2).all(|w| w[1] >= w[0]));
        assert_eq!(*progress.last().unwrap(), 1.0);
    }

    #[tokio::test]
    async fn test_detections_are_normalised_and_ordered() {
        let localizer = localizer();
        let sampler = TemporalSampler::new(&localizer, SamplerConfig::default());
        let mut source = ball_clip(1.0, 30.0);

        let detections = sampler
            .sample(&mut source, |_| {}, &CancelToken::new())
            .await
            .unwrap();

        assert!(!detections.is_empty());
        assert!(detections.windows(2).all(|w| w[1].time > w[0].time));
        for d in &detections {
            assert_eq!(d.norm_x, d.x as f64 / 64.0);
            assert_eq!(d.norm_y, d.y as f64 / 48.0);
            assert!((0.0..=1.0).contains(&d.confidence));
        }
    }

    #[tokio::test]
    async fn test_no_reseek_within_tolerance() {
        let localizer = localizer();
        let sampler = TemporalSampler::new(&localizer, SamplerConfig::default());
        let mut source = blank_clip(0.5, 25.0);
        let steps = sampler.schedule(source.duration()).len();

        sampler
            .sample(&mut source, |_| {}, &CancelToken::new())
            .await
            .unwrap();

        // t = 0 is already positioned; every later step seeks once.
        assert_eq!(source.seek_count(), steps - 1);
    }

    #[tokio::test]
    async fn test_missing_dimensions_is_precondition_failure() {
        let localizer = localizer();
        let sampler = TemporalSampler::new(&localizer, SamplerConfig::default());
        let result = sampler
            .sample(&mut NoMetadata, |_| {}, &CancelToken::new())
            .await;
        assert!(matches!(result, Err(AnalysisError::Precondition(_))));
    }

    #[tokio::test]
    async fn test_decode_failure_ends_run() {
        let localizer = localizer();
        let sampler = TemporalSampler::new(&localizer, SamplerConfig::default());
        let mut source = BrokenSource {
            inner: ball_clip(1.0, 30.0),
            fail_after: 0.3,
        };
        let result = sampler
            .sample(&mut source, |_| {}, &CancelToken::new())
            .await;
        assert!(matches!(
            result,
            Err(AnalysisError::Decode(SourceError::Decode { .. }))
        ));
    }

    #[tokio::test]
    async fn test_frame_size_change_is_decode_error() {
        let localizer = localizer();
        let sampler = TemporalSampler::new(&localizer, SamplerConfig::default());
        let mut source = ResizingSource {
            inner: blank_clip(1.0, 25.0),
        };
        let mut progress = Vec::new();

        let result = sampler
            .sample(&mut source, |p| progress.push(p), &CancelToken::new())
            .await;

        match result {
            Err(AnalysisError::Decode(SourceError::Decode { time, reason })) => {
                assert_eq!(time, 0.0);
                assert!(reason.contains("32x24"));
            }
            other => panic!("expected decode error, got {:?}", other),
        }
        assert!(progress.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_stops_before_next_step() {
        let localizer = localizer();
        let sampler = TemporalSampler::new(&localizer, SamplerConfig::default());
        let mut source = blank_clip(2.0, 25.0);
        let cancel = CancelToken::new();
        let mut steps = 0;

        let result = sampler
            .sample(
                &mut source,
                |_| {
                    steps += 1;
                    if steps == 3 {
                        cancel.cancel();
                    }
                },
                &cancel,
            )
            .await;

        assert!(matches!(result, Err(AnalysisError::Cancelled)));
        assert_eq!(steps, 3);
    }
}
