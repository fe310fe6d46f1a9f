pub mod analyzer;

pub use analyzer::{AnalysisReport, DeliveryAnalyzer};
pub use crate::core::models::{DetectionPoint, HawkEyePoint, TrajectorySummary};
