use thiserror::Error;

/// Failures raised by a [`FrameSource`](crate::core::sampler::FrameSource).
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Video dimensions are not available")]
    MissingDimensions,
    #[error("Failed to decode frame at {time:.3}s: {reason}")]
    Decode { time: f64, reason: String },
    #[error("Video source contains no frames")]
    Empty,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image decode error: {0}")]
    Image(#[from] image::ImageError),
}

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("Invalid vision parameter: {0}")]
    InvalidParameter(String),
    #[error("Vision engine not initialized")]
    NotReady,
    #[error("Vision backend self-check failed: {0}")]
    SelfCheck(String),
    #[error("Pixel buffer size mismatch: expected {expected}, got {actual}")]
    BufferMismatch { expected: usize, actual: usize },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON config error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("JSON5 config error: {0}")]
    Json5(#[from] json5::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Terminal outcome of a failed analysis run.
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Cannot analyze video: {0}")]
    Precondition(String),
    #[error("Video could not be decoded: {0}")]
    Decode(#[from] SourceError),
    #[error(
        "No ball detected in the clip. Try a clip with better lighting, higher contrast \
         between ball and background, and the ball visible for the whole delivery"
    )]
    NoDetections,
    #[error("Analysis cancelled")]
    Cancelled,
    #[error("Vision engine error: {0}")]
    Vision(#[from] VisionError),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl AnalysisError {
    /// True for the empty-result failure the caller should answer with
    /// visibility/contrast advice rather than a generic error.
    pub fn is_no_detections(&self) -> bool {
        matches!(self, AnalysisError::NoDetections)
    }
}
