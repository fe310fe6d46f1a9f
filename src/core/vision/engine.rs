//! Vision engine handle
//!
//! 显式生命周期：init -> ready -> shutdown，不依赖全局状态探测

use super::{HsvRange, NativeVision, VisionOps};
use crate::core::error::VisionError;
use image::{Rgb, RgbImage};
use log::{debug, info};
use once_cell::sync::OnceCell;
use std::sync::Arc;

static GLOBAL_ENGINE: OnceCell<VisionEngine> = OnceCell::new();

/// Owns a ready [`VisionOps`] backend. Cloning the ops out keeps the backend
/// alive for in-flight work even after the handle is shut down.
pub struct VisionEngine {
    ops: Option<Arc<dyn VisionOps>>,
}

impl VisionEngine {
    /// Builds the in-process backend.
    pub fn init() -> Result<Self, VisionError> {
        Self::with_backend(Arc::new(NativeVision::new()))
    }

    /// Wraps a caller-supplied backend. The backend must pass a probe on a
    /// tiny synthetic image before the engine reports ready.
    pub fn with_backend(ops: Arc<dyn VisionOps>) -> Result<Self, VisionError> {
        info!("🔧 VisionEngine: initializing backend '{}'", ops.name());
        Self::self_check(ops.as_ref())?;
        info!("✅ VisionEngine: ready");
        Ok(Self { ops: Some(ops) })
    }

    /// Process-wide engine, constructed once on first use.
    pub fn global() -> Result<&'static VisionEngine, VisionError> {
        GLOBAL_ENGINE.get_or_try_init(Self::init)
    }

    pub fn is_ready(&self) -> bool {
        self.ops.is_some()
    }

    pub fn ops(&self) -> Result<Arc<dyn VisionOps>, VisionError> {
        self.ops.clone().ok_or(VisionError::NotReady)
    }

    pub fn shutdown(&mut self) {
        if let Some(ops) = self.ops.take() {
            info!("🗑️ VisionEngine: releasing backend '{}'", ops.name());
        }
    }

    fn self_check(ops: &dyn VisionOps) -> Result<(), VisionError> {
        let probe = RgbImage::from_fn(8, 8, |x, y| {
            if (2..6).contains(&x) && (2..6).contains(&y) {
                Rgb([255, 0, 0])
            } else {
                Rgb([128, 128, 128])
            }
        });
        let hsv = ops.to_hsv(&probe);
        let mask = ops.in_range(&hsv, &HsvRange::new([0, 100, 100], [10, 255, 255]));
        let contours = ops.find_external_contours(&mask);
        debug!("VisionEngine self-check: {} contour(s)", contours.len());

        match contours.as_slice() {
            [only] if ops.contour_area(only) > 0.0 => Ok(()),
            _ => Err(VisionError::SelfCheck(format!(
                "expected one red probe contour, found {}",
                contours.len()
            ))),
        }
    }
}

impl Drop for VisionEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
