//! # asciivid - video to character-art animation
//!
//! `asciivid` turns a video (or a still image) into an animation of glyph
//! grids and serializes it as a self-contained HTML player, a PNG sequence
//! or a directory of text frames.
//!
//! Every frame is sampled into a grid of cells whose brightness is
//! normalized against a range observed over the first few frames, then
//! mapped onto a glyph ramp ordered from sparse to dense.
//!
//! ## Example
//!
//! ```no_run
//! use asciivid::{AsciiConverter, OutputFormat, VideoSpan};
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let converter = AsciiConverter::new();
//! let options = converter.options_from_preset("small")?;
//! let style = converter.style()?;
//! converter.convert_file(
//!     Path::new("clip.mp4"),
//!     Path::new("clip.html"),
//!     OutputFormat::Html,
//!     &VideoSpan::default(),
//!     &options,
//!     &style,
//!     |_| {},
//! )?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Progress Reporting
//!
//! ```no_run
//! use asciivid::{AsciiConverter, ConvertOptions, OutputFormat, ProgressPhase, Style, VideoSpan};
//! use std::path::Path;
//!
//! let converter = AsciiConverter::new();
//! converter
//!     .convert_file(
//!         Path::new("clip.mp4"),
//!         Path::new("frames"),
//!         OutputFormat::Images,
//!         &VideoSpan::default(),
//!         &ConvertOptions::default(),
//!         &Style::default(),
//!         |progress| match progress.phase {
//!             ProgressPhase::ConvertingFrames => {
//!                 println!("{}/{} ({:.1}%)", progress.completed, progress.total, progress.percentage)
//!             }
//!             ProgressPhase::Complete => println!("Done!"),
//!             _ => println!("{}", progress.message),
//!         },
//!     )
//!     .unwrap();
//! ```

pub mod config;
pub mod error;
pub mod estimate;
pub mod ffmpeg;
pub mod grid;
pub mod pipeline;
pub mod quantize;
pub mod ramp;
pub mod raster;
pub mod render;
pub mod resample;
pub mod source;

use std::path::{Path, PathBuf};

pub use config::{AppConfig, FfmpegConfig, Preset};
pub use error::{Error, Result};
pub use ffmpeg::VideoSpan;
pub use grid::{Animation, GlyphGrid, GridSize};
pub use pipeline::{convert, ConvertOptions, Progress, ProgressPhase, RangeMode};
pub use quantize::{BrightnessRange, Channel, Normalization};
pub use ramp::GlyphRamp;
pub use render::{Color, OutputFormat, Style};
pub use source::{FrameSource, MemorySource, SourceInfo};

/// What a finished conversion produced.
#[derive(Debug, Clone)]
pub struct ConversionSummary {
    pub frames: usize,
    pub fps: f64,
    pub size: GridSize,
    pub range: BrightnessRange,
    /// Every file written, in frame order for directory formats.
    pub written: Vec<PathBuf>,
}

/// Main converter, holding the configuration presets and styling come from.
pub struct AsciiConverter {
    config: AppConfig,
}

impl AsciiConverter {
    /// Create a new converter with the built-in configuration
    pub fn new() -> Self {
        Self {
            config: AppConfig::default(),
        }
    }

    /// Create a converter with custom configuration
    pub fn with_config(config: AppConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Load configuration from a `.toml` or `.json` file
    pub fn from_config_file(path: &Path) -> Result<Self> {
        Ok(Self {
            config: AppConfig::from_file(path)?,
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Conversion options from a named preset and the configured ramp.
    pub fn options_from_preset(&self, preset_name: &str) -> Result<ConvertOptions> {
        let preset = self.config.preset(preset_name)?;
        Ok(ConvertOptions::default()
            .with_width(preset.width)
            .with_target_fps(preset.fps)
            .with_cell_aspect(preset.cell_aspect)
            .with_ramp(self.config.glyph_ramp()?)
            .with_range(RangeMode::Estimate(preset.sample_frames)))
    }

    /// Renderer styling from the configuration.
    pub fn style(&self) -> Result<Style> {
        Style::from_config(&self.config)
    }

    /// Opens `input` as a still image or an ffmpeg-decoded video.
    pub fn open(&self, input: &Path, span: &VideoSpan) -> Result<Box<dyn FrameSource>> {
        source::open(input, span, &self.config.ffmpeg)
    }

    /// Converts `input` into an in-memory animation without writing anything.
    ///
    /// Color is kept for the colored formats regardless of `options.color`.
    pub fn animate<F>(&self, input: &Path, format: OutputFormat, span: &VideoSpan, options: &ConvertOptions, progress: F) -> Result<Animation>
    where
        F: Fn(Progress),
    {
        progress(Progress::probing());
        let mut source = self.open(input, span)?;
        let options = options.clone().with_color(options.color || format.is_colored());
        convert(&mut source, &options, progress)
    }

    /// Converts `input` and writes the result to `output` in `format`.
    ///
    /// Nothing is written unless the whole animation was built.
    #[allow(clippy::too_many_arguments)]
    pub fn convert_file<F>(
        &self,
        input: &Path,
        output: &Path,
        format: OutputFormat,
        span: &VideoSpan,
        options: &ConvertOptions,
        style: &Style,
        progress: F,
    ) -> Result<ConversionSummary>
    where
        F: Fn(Progress) + Send + Sync,
    {
        let animation = self.animate(input, format, span, options, &progress)?;
        let written = render::write_output(&animation, format, style, output, &progress)?;
        progress(Progress::complete(animation.len()));

        Ok(ConversionSummary {
            frames: animation.len(),
            fps: animation.fps,
            size: animation.size,
            range: animation.range,
            written,
        })
    }

    /// First frame of `input` as plain text rows.
    pub fn image_to_string(&self, input: &Path, options: &ConvertOptions) -> Result<String> {
        let mut source = self.open(input, &VideoSpan::default())?;
        let options = options.clone().with_color(false);
        let animation = convert(&mut source, &options, |_| {})?;
        animation
            .frames
            .first()
            .map(GlyphGrid::to_text)
            .ok_or(Error::NoFramesProduced)
    }
}

impl Default for AsciiConverter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_become_options() {
        let converter = AsciiConverter::new();
        let opts = converter.options_from_preset("large").unwrap();
        assert_eq!(opts.width, 360);
        assert_eq!(opts.target_fps, 60.0);
        assert_eq!(opts.range, RangeMode::Estimate(5));
        assert!(converter.options_from_preset("huge").is_err());
    }

    #[test]
    fn image_input_converts_to_text() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ramp.png");
        image::RgbImage::from_fn(4, 4, |x, _| image::Rgb([if x < 2 { 0 } else { 255 }; 3]))
            .save(&path)
            .unwrap();

        let opts = ConvertOptions::default()
            .with_size(4, 1)
            .with_ramp(GlyphRamp::new(" #").unwrap());
        let text = AsciiConverter::new().image_to_string(&path, &opts).unwrap();
        assert_eq!(text, "  ##");
    }

    #[test]
    fn missing_input_is_source_not_found() {
        let converter = AsciiConverter::new();
        let err = converter
            .animate(Path::new("/no/such/clip.mp4"), OutputFormat::Html, &VideoSpan::default(), &ConvertOptions::default(), |_| {})
            .unwrap_err();
        assert!(matches!(err, Error::SourceNotFound { .. }));
    }
}
