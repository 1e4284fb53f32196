//! The sequential decode → rasterize → append loop.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::estimate::estimate_range;
use crate::grid::{Animation, GridSize, DEFAULT_CELL_ASPECT};
use crate::quantize::{BrightnessRange, Channel, Normalization};
use crate::ramp::GlyphRamp;
use crate::raster::rasterize;
use crate::resample::Resampler;
use crate::source::FrameSource;

/// Represents the current phase of a conversion operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressPhase {
    /// Opening and probing the input
    Probing,
    /// Analyzing the first frames for the brightness range
    EstimatingRange,
    /// Converting frames to glyph grids
    ConvertingFrames,
    /// Serializing the animation
    Writing,
    /// Conversion completed successfully
    Complete,
}

/// Progress information for conversion operations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Progress {
    /// Current phase of the conversion
    pub phase: ProgressPhase,
    /// Number of items completed in the current phase
    pub completed: usize,
    /// Total number of items in the current phase (0 if unknown/indeterminate)
    pub total: usize,
    /// Percentage complete (0.0 to 100.0)
    pub percentage: f64,
    /// Human-readable message describing current status
    pub message: String,
}

impl Progress {
    fn indeterminate(phase: ProgressPhase, message: &str) -> Self {
        Self {
            phase,
            completed: 0,
            total: 0,
            percentage: 0.0,
            message: message.to_string(),
        }
    }

    pub fn probing() -> Self {
        Self::indeterminate(ProgressPhase::Probing, "Opening source...")
    }

    pub fn estimating_range() -> Self {
        Self::indeterminate(ProgressPhase::EstimatingRange, "Estimating brightness range...")
    }

    pub fn converting_frames(completed: usize, total: usize) -> Self {
        let percentage = if total > 0 {
            (completed as f64 / total as f64 * 100.0).min(100.0)
        } else {
            0.0
        };
        let message = if total > 0 {
            format!("Converting frame {} of {}", completed, total)
        } else {
            format!("Converting frame {}", completed)
        };
        Self {
            phase: ProgressPhase::ConvertingFrames,
            completed,
            total,
            percentage,
            message,
        }
    }

    pub fn writing(completed: usize, total: usize) -> Self {
        let percentage = if total > 0 { completed as f64 / total as f64 * 100.0 } else { 0.0 };
        Self {
            phase: ProgressPhase::Writing,
            completed,
            total,
            percentage,
            message: format!("Writing {} of {}", completed, total),
        }
    }

    pub fn complete(total_frames: usize) -> Self {
        Self {
            phase: ProgressPhase::Complete,
            completed: total_frames,
            total: total_frames,
            percentage: 100.0,
            message: format!("Conversion complete: {} frames", total_frames),
        }
    }
}

/// Where the brightness range comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeMode {
    /// Observed over the first `n` frames.
    Estimate(usize),
    /// The full channel, `(0, 255)`.
    Full,
    Fixed(BrightnessRange),
}

/// Options for one conversion
#[derive(Debug, Clone)]
pub struct ConvertOptions {
    /// Output width in glyph columns.
    pub width: u32,
    /// Output height in rows; derived from the source aspect when unset.
    pub height: Option<u32>,
    /// Glyph cell width:height ratio used to derive the height.
    pub cell_aspect: f32,
    /// Rate the source is resampled to.
    pub target_fps: f64,
    /// Playback rate written into the animation, overriding the resampled rate.
    pub playback_fps: Option<f64>,
    pub ramp: GlyphRamp,
    /// Keep one color per cell.
    pub color: bool,
    /// Brightness channel; luma for monochrome, HSV value for color when unset.
    pub channel: Option<Channel>,
    pub range: RangeMode,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            width: 100,
            height: None,
            cell_aspect: DEFAULT_CELL_ASPECT,
            target_fps: 30.0,
            playback_fps: None,
            ramp: GlyphRamp::default(),
            color: false,
            channel: None,
            range: RangeMode::Estimate(5),
        }
    }
}

impl ConvertOptions {
    pub fn with_width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = Some(height);
        self
    }

    pub fn with_cell_aspect(mut self, cell_aspect: f32) -> Self {
        self.cell_aspect = cell_aspect;
        self
    }

    pub fn with_target_fps(mut self, fps: f64) -> Self {
        self.target_fps = fps;
        self
    }

    pub fn with_playback_fps(mut self, fps: f64) -> Self {
        self.playback_fps = Some(fps);
        self
    }

    pub fn with_ramp(mut self, ramp: GlyphRamp) -> Self {
        self.ramp = ramp;
        self
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn with_channel(mut self, channel: Channel) -> Self {
        self.channel = Some(channel);
        self
    }

    pub fn with_range(mut self, range: RangeMode) -> Self {
        self.range = range;
        self
    }

    pub fn channel(&self) -> Channel {
        self.channel.unwrap_or(if self.color { Channel::Value } else { Channel::Luma })
    }

    fn validate(&self) -> Result<()> {
        if self.width == 0 {
            return Err(Error::InvalidConfig("width must be positive".into()));
        }
        if !(self.target_fps.is_finite() && self.target_fps > 0.0) {
            return Err(Error::InvalidConfig(format!("fps must be positive, got {}", self.target_fps)));
        }
        if let Some(fps) = self.playback_fps {
            if !(fps.is_finite() && fps > 0.0) {
                return Err(Error::InvalidConfig(format!("playback fps must be positive, got {}", fps)));
            }
        }
        Ok(())
    }
}

/// Converts every selected frame of `source` into an [`Animation`].
///
/// A read error after at least one frame was produced ends the stream early
/// and keeps what was converted; with no frame produced it is returned.
pub fn convert<S, F>(source: &mut S, opts: &ConvertOptions, progress: F) -> Result<Animation>
where
    S: FrameSource + ?Sized,
    F: Fn(Progress),
{
    opts.validate()?;
    let info = source.info();
    let channel = opts.channel();

    let (range, estimated) = match opts.range {
        RangeMode::Estimate(sample_frames) => {
            progress(Progress::estimating_range());
            (estimate_range(source, channel, sample_frames)?, true)
        }
        RangeMode::Full => (BrightnessRange::full(), false),
        RangeMode::Fixed(range) => (range, false),
    };
    let norm = Normalization::new(range, opts.ramp.clone(), channel);

    let size = match opts.height {
        Some(height) => GridSize::new(opts.width, height)?,
        None => GridSize::for_source(info.width, info.height, opts.width, opts.cell_aspect)?,
    };

    let mut resampler = Resampler::for_rates(info.fps, opts.target_fps);
    let fps = opts
        .playback_fps
        .or_else(|| info.fps.map(|src| resampler.output_rate(src)))
        .unwrap_or(opts.target_fps);
    let total = info.frame_count.map_or(0, |n| resampler.output_count(n) as usize);

    // Sources that drop frames themselves already restart from frame 0.
    let stride = resampler.stride();
    if stride > 1 && source.decimate(stride)? {
        log::debug!("source decimates by {} itself", stride);
        resampler = Resampler::new(1);
    } else if estimated {
        source.rewind()?;
    }
    log::info!(
        "converting to {}x{} glyphs, stride {}, playback {:.3} fps",
        size.width,
        size.height,
        stride,
        fps
    );

    let mut frames = Vec::with_capacity(total);
    progress(Progress::converting_frames(0, total));

    loop {
        match source.grab() {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) if frames.is_empty() => return Err(e),
            Err(e) => {
                log::warn!("stream ended early after {} frames: {}", frames.len(), e);
                break;
            }
        }
        if !resampler.next_keep() {
            continue;
        }
        let frame = match source.retrieve() {
            Ok(frame) => frame,
            Err(e) if frames.is_empty() => return Err(e),
            Err(e) => {
                log::warn!("stream ended early after {} frames: {}", frames.len(), e);
                break;
            }
        };
        frames.push(rasterize(&frame, &norm, size, opts.color));
        progress(Progress::converting_frames(frames.len(), total));
    }

    if frames.is_empty() {
        return Err(Error::NoFramesProduced);
    }
    log::info!("converted {} frames", frames.len());

    Ok(Animation { frames, fps, size, range })
}
