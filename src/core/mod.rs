//! 投球轨迹重建核心
//!
//! Data flows one way: `FrameSource` -> `TemporalSampler` (+ `BallLocalizer`)
//! -> detections -> `TrajectoryProjector` -> trajectory -> `TrajectorySummarizer`.

pub mod config;
pub mod error;
pub mod frame;
pub mod localizer;
pub mod models;
pub mod projector;
pub mod sampler;
pub mod source;
pub mod summary;
pub mod vision;

pub use config::{AnalysisConfig, LocalizerConfig, SamplerConfig};
pub use error::{AnalysisError, ConfigError, SourceError, VisionError};
pub use frame::Frame;
pub use localizer::BallLocalizer;
pub use models::{BallCandidate, DetectionPoint, HawkEyePoint, TrajectorySummary};
pub use projector::TrajectoryProjector;
pub use sampler::{CancelToken, FrameSource, TemporalSampler};
pub use source::{FrameSequence, ImageSequenceSource};
pub use summary::TrajectorySummarizer;
pub use vision::{NativeVision, VisionEngine, VisionOps};
