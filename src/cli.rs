use std::path::PathBuf;

use anyhow::{anyhow, Result};
use asciivid::{AppConfig, BrightnessRange, Color, ConvertOptions, GlyphRamp, OutputFormat, RangeMode, Style, VideoSpan};
use clap::{Parser, ValueEnum};

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormatArg {
    /// Monochrome HTML player
    Html,
    /// HTML player with one color per glyph
    ColorHtml,
    /// One PNG per frame
    Images,
    /// One text file per frame
    Text,
}

impl From<FormatArg> for OutputFormat {
    fn from(f: FormatArg) -> Self {
        match f {
            FormatArg::Html => OutputFormat::Html,
            FormatArg::ColorHtml => OutputFormat::ColorHtml,
            FormatArg::Images => OutputFormat::Images,
            FormatArg::Text => OutputFormat::Text,
        }
    }
}

#[derive(Parser, Debug)]
#[command(version, about = "Convert videos and images into character-art animations.")]
pub struct Args {
    /// Input video or image file
    pub input: Option<PathBuf>,

    /// Output file (HTML) or directory (images, text)
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(long, short, value_enum, default_value_t = FormatArg::Html)]
    pub format: FormatArg,

    /// Output width in glyph columns
    #[arg(long, short)]
    pub width: Option<u32>,

    /// Output height in rows (derived from the source aspect by default)
    #[arg(long)]
    pub height: Option<u32>,

    /// Target frame rate the source is resampled to
    #[arg(long)]
    pub fps: Option<f64>,

    /// Playback rate written into the output, overriding the resampled rate
    #[arg(long)]
    pub playback_fps: Option<f64>,

    /// Glyph cell width:height ratio
    #[arg(long)]
    pub cell_aspect: Option<f32>,

    /// Glyph ramp from sparse to dense, e.g. " .:#"
    #[arg(long, conflicts_with = "ramp_preset")]
    pub ramp: Option<String>,

    /// Named glyph ramp: classic, standard, compact, blocks
    #[arg(long)]
    pub ramp_preset: Option<String>,

    /// Frames analyzed for the brightness range
    #[arg(long)]
    pub sample_frames: Option<usize>,

    /// Normalize against the full 0-255 range instead of an estimate
    #[arg(long, default_value_t = false)]
    pub full_range: bool,

    /// Start time (e.g., 00:01:23.456 or 83.456)
    #[arg(long)]
    pub start: Option<String>,

    /// End time (e.g., 00:01:23.456 or 83.456)
    #[arg(long)]
    pub end: Option<String>,

    /// Background color, #rrggbb
    #[arg(long)]
    pub background: Option<String>,

    /// Foreground color for monochrome output, #rrggbb
    #[arg(long)]
    pub foreground: Option<String>,

    /// TrueType font for image output
    #[arg(long)]
    pub font: Option<PathBuf>,

    /// Font size in px
    #[arg(long)]
    pub font_size: Option<u32>,

    /// Named quality preset from the config
    #[arg(long, conflicts_with_all = &["small", "large"])]
    pub preset: Option<String>,

    /// Use the small preset
    #[arg(long, short, default_value_t = false, conflicts_with = "large")]
    pub small: bool,

    /// Use the large preset
    #[arg(long, short, default_value_t = false)]
    pub large: bool,

    /// Config file (.toml or .json)
    #[arg(long, short)]
    pub config: Option<PathBuf>,

    /// Overwrite existing output without asking
    #[arg(long, short, default_value_t = false)]
    pub yes: bool,

    /// Log level: off, error, warn, info, debug, trace
    #[arg(long, default_value = "warn", value_parser = parse_level)]
    pub log_level: log::LevelFilter,
}

impl Args {
    pub fn preset_name<'a>(&'a self, config: &'a AppConfig) -> &'a str {
        if self.small {
            "small"
        } else if self.large {
            "large"
        } else {
            self.preset.as_deref().unwrap_or(config.default_preset.as_str())
        }
    }

    pub fn span(&self) -> VideoSpan {
        VideoSpan {
            start: self.start.clone(),
            end: self.end.clone(),
        }
    }

    /// Preset values with every flag given on the command line applied on top.
    pub fn convert_options(&self, config: &AppConfig) -> Result<ConvertOptions> {
        let name = self.preset_name(config);
        let preset = config
            .presets
            .get(name)
            .ok_or_else(|| anyhow!("Missing preset '{}' in config", name))?;

        let ramp = match (&self.ramp, &self.ramp_preset) {
            (Some(glyphs), _) => GlyphRamp::new(glyphs)?,
            (None, Some(name)) => GlyphRamp::preset(name)?,
            (None, None) => config.glyph_ramp()?,
        };
        let range = if self.full_range {
            RangeMode::Full
        } else {
            // Colored output analyzes only the first frame unless told otherwise.
            let colored = OutputFormat::from(self.format).is_colored();
            RangeMode::Estimate(self.sample_frames.unwrap_or(if colored { 1 } else { preset.sample_frames }))
        };

        let width = self.width.unwrap_or(preset.width);
        let mut opts = ConvertOptions::default()
            .with_width(width)
            .with_target_fps(self.fps.unwrap_or(preset.fps))
            .with_cell_aspect(self.cell_aspect.unwrap_or(preset.cell_aspect))
            .with_ramp(ramp)
            .with_range(range);
        if let Some(height) = self.height {
            opts = opts.with_size(width, height);
        }
        if let Some(fps) = self.playback_fps {
            opts = opts.with_playback_fps(fps);
        }
        Ok(opts)
    }

    pub fn style(&self, config: &AppConfig) -> Result<Style> {
        let mut style = Style::from_config(config)?;
        if let Some(bg) = &self.background {
            style.background = Color::parse(bg)?;
        }
        if let Some(fg) = &self.foreground {
            style.foreground = Color::parse(fg)?;
        }
        if let Some(size) = self.font_size {
            style.font_size = size.max(1);
        }
        if let Some(font) = &self.font {
            style.font_path = Some(font.clone());
        }
        if let Some(name) = self.input.as_ref().and_then(|p| p.file_stem()) {
            style.title = name.to_string_lossy().into_owned();
        }
        Ok(style)
    }
}

fn parse_level(s: &str) -> std::result::Result<log::LevelFilter, String> {
    s.parse()
        .map_err(|_| format!("invalid log level '{}', expected off, error, warn, info, debug or trace", s))
}

/// `details.md` contents written next to directory outputs.
pub fn details(frames: usize, fps: f64, width: u32, height: u32, range: BrightnessRange, ramp: &GlyphRamp) -> String {
    format!(
        "Version: {}\nFrames: {}\nFPS: {}\nColumns: {}\nRows: {}\nRange: {}-{}\nRamp: \"{}\"\n",
        env!("CARGO_PKG_VERSION"),
        frames,
        fps,
        width,
        height,
        range.min(),
        range.max(),
        ramp
    )
}
