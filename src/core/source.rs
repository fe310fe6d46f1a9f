//! Frame sources backed by memory or by numbered stills on disk

use crate::core::error::SourceError;
use crate::core::frame::Frame;
use crate::core::sampler::FrameSource;
use async_trait::async_trait;
use log::{debug, info};
use std::path::{Path, PathBuf};

const IMAGE_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "bmp"];

fn check_fps(fps: f64) -> Result<(), SourceError> {
    if fps.is_finite() && fps > 0.0 {
        Ok(())
    } else {
        Err(SourceError::Decode {
            time: 0.0,
            reason: format!("invalid frame rate {}", fps),
        })
    }
}

/// Orders stills by the number at the end of the file stem, so `out2.png`
/// plays before `out10.png`. Stems without a number fall back to name order.
fn sequence_key(path: &Path) -> (String, Option<u64>, String) {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let prefix = stem.trim_end_matches(|c: char| c.is_ascii_digit());
    let number = stem[prefix.len()..].parse::<u64>().ok();
    (prefix.to_string(), number, name)
}

/// Index of the frame shown at `time` for a clip of `count` frames.
fn frame_index(time: f64, fps: f64, count: usize) -> usize {
    // Nudge so 0.08s at 25fps lands on frame 2, not 1.999...
    let idx = (time * fps + 1e-9).floor().max(0.0) as usize;
    idx.min(count.saturating_sub(1))
}

/// In-memory clip at a constant frame rate.
#[derive(Debug, Clone)]
pub struct FrameSequence {
    frames: Vec<Frame>,
    fps: f64,
    width: u32,
    height: u32,
    position: f64,
    seek_count: usize,
}

impl FrameSequence {
    pub fn new(frames: Vec<Frame>, fps: f64) -> Result<Self, SourceError> {
        check_fps(fps)?;
        let first = frames.first().ok_or(SourceError::Empty)?;
        let (width, height) = (first.width, first.height);
        if let Some((i, bad)) = frames
            .iter()
            .enumerate()
            .find(|(_, f)| (f.width, f.height) != (width, height))
        {
            return Err(SourceError::Decode {
                time: i as f64 / fps,
                reason: format!(
                    "frame {} is {}x{}, clip is {}x{}",
                    i, bad.width, bad.height, width, height
                ),
            });
        }

        Ok(Self {
            frames,
            fps,
            width,
            height,
            position: 0.0,
            seek_count: 0,
        })
    }

    /// Synthetic clip: `generate(index, time)` is called once per frame.
    pub fn from_fn<F>(
        width: u32,
        height: u32,
        fps: f64,
        frame_count: usize,
        mut generate: F,
    ) -> Result<Self, SourceError>
    where
        F: FnMut(usize, f64) -> Frame,
    {
        check_fps(fps)?;
        let frames = (0..frame_count)
            .map(|i| {
                let time = i as f64 / fps;
                generate(i, time).with_timestamp(time)
            })
            .collect();
        let sequence = Self::new(frames, fps)?;
        if (sequence.width, sequence.height) != (width, height) {
            return Err(SourceError::Decode {
                time: 0.0,
                reason: format!(
                    "generated {}x{} frames, expected {}x{}",
                    sequence.width, sequence.height, width, height
                ),
            });
        }
        Ok(sequence)
    }

    pub fn fps(&self) -> f64 {
        self.fps
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Number of real seeks performed so far.
    pub fn seek_count(&self) -> usize {
        self.seek_count
    }
}

#[async_trait]
impl FrameSource for FrameSequence {
    fn dimensions(&self) -> Option<(u32, u32)> {
        Some((self.width, self.height))
    }

    fn duration(&self) -> f64 {
        self.frames.len() as f64 / self.fps
    }

    fn current_time(&self) -> f64 {
        self.position
    }

    async fn seek(&mut self, time: f64) -> Result<(), SourceError> {
        self.position = time.clamp(0.0, self.duration());
        self.seek_count += 1;
        Ok(())
    }

    fn capture(&mut self) -> Result<Frame, SourceError> {
        let idx = frame_index(self.position, self.fps, self.frames.len());
        self.frames
            .get(idx)
            .map(|f| f.clone().with_timestamp(self.position))
            .ok_or(SourceError::Empty)
    }
}

/// A directory of numbered stills (`png`, `jpg`, `bmp`), ordered by frame
/// number and played back at a fixed frame rate. Frames are decoded on demand.
pub struct ImageSequenceSource {
    paths: Vec<PathBuf>,
    fps: f64,
    width: u32,
    height: u32,
    position: f64,
    current: Option<(usize, Frame)>,
}

impl ImageSequenceSource {
    pub fn open(dir: impl AsRef<Path>, fps: f64) -> Result<Self, SourceError> {
        check_fps(fps)?;
        let dir = dir.as_ref();

        let mut paths: Vec<PathBuf> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                p.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| IMAGE_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                    .unwrap_or(false)
            })
            .collect();
        paths.sort_by_cached_key(|p| sequence_key(p));

        let first = paths.first().ok_or(SourceError::Empty)?;
        let (width, height) = image::image_dimensions(first)?;

        info!(
            "📂 ImageSequenceSource: {} frame(s) {}x{} @ {}fps from {:?}",
            paths.len(),
            width,
            height,
            fps,
            dir
        );

        Ok(Self {
            paths,
            fps,
            width,
            height,
            position: 0.0,
            current: None,
        })
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    fn decode(&self, idx: usize, time: f64) -> Result<Frame, SourceError> {
        let path = &self.paths[idx];
        debug!("Decoding {:?} for t={:.3}s", path, time);

        let image = image::open(path)
            .map_err(|e| SourceError::Decode {
                time,
                reason: format!("{:?}: {}", path, e),
            })?
            .to_rgba8();

        if image.dimensions() != (self.width, self.height) {
            return Err(SourceError::Decode {
                time,
                reason: format!(
                    "{:?} is {}x{}, clip is {}x{}",
                    path,
                    image.width(),
                    image.height(),
                    self.width,
                    self.height
                ),
            });
        }
        Ok(Frame::from_image(image, time))
    }

    fn load_current(&mut self) -> Result<&Frame, SourceError> {
        let idx = frame_index(self.position, self.fps, self.paths.len());
        let stale = self.current.as_ref().map_or(true, |(i, _)| *i != idx);
        if stale {
            let frame = self.decode(idx, self.position)?;
            self.current = Some((idx, frame));
        }
        self.current
            .as_ref()
            .map(|(_, f)| f)
            .ok_or(SourceError::Empty)
    }
}

#[async_trait]
impl FrameSource for ImageSequenceSource {
    fn dimensions(&self) -> Option<(u32, u32)> {
        Some((self.width, self.height))
    }

    fn duration(&self) -> f64 {
        self.paths.len() as f64 / self.fps
    }

    fn current_time(&self) -> f64 {
        self.position
    }

    async fn seek(&mut self, time: f64) -> Result<(), SourceError> {
        self.position = time.clamp(0.0, self.duration());
        self.load_current()?;
        Ok(())
    }

    fn capture(&mut self) -> Result<Frame, SourceError> {
        let position = self.position;
        Ok(self.load_current()?.clone().with_timestamp(position))
    }
}
