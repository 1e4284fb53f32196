//! Serializers turning an [`Animation`](crate::Animation) into files.

pub mod html;
pub mod images;
pub mod text;

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::AppConfig;
use crate::error::{Error, Result};
use crate::grid::Animation;
use crate::pipeline::Progress;

/// Output artifact kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// One HTML player, monochrome text.
    #[default]
    Html,
    /// One HTML player, one color per glyph.
    ColorHtml,
    /// One PNG per frame.
    Images,
    /// One `.txt` per frame.
    Text,
}

impl OutputFormat {
    pub fn is_colored(self) -> bool {
        matches!(self, OutputFormat::ColorHtml | OutputFormat::Images)
    }

    /// Whether the output is a directory of frame files.
    pub fn is_directory(self) -> bool {
        matches!(self, OutputFormat::Images | OutputFormat::Text)
    }

    /// Default output next to `input`: `<stem>.html` or a `<stem>` directory.
    pub fn default_output(self, input: &Path) -> PathBuf {
        let mut name = input
            .file_stem()
            .map(|s| s.to_os_string())
            .unwrap_or_else(|| "asciivid_output".into());
        if !self.is_directory() {
            name.push(".html");
        }
        input.with_file_name(name)
    }
}

/// An `#rrggbb` color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color(pub [u8; 3]);

impl Color {
    /// Parses `#rgb`, `#rrggbb` (leading `#` optional), `black` or `white`.
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "black" => return Ok(Color([0, 0, 0])),
            "white" => return Ok(Color([255, 255, 255])),
            _ => {}
        }
        let hex = s.strip_prefix('#').unwrap_or(s);
        let bad = || Error::InvalidConfig(format!("invalid color '{}', expected #rgb or #rrggbb", s));
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(bad());
        }
        let channel = |i: usize, n: usize| u8::from_str_radix(&hex[i..i + n], 16).map_err(|_| bad());
        match hex.len() {
            3 => {
                let [r, g, b] = [channel(0, 1)?, channel(1, 1)?, channel(2, 1)?];
                Ok(Color([r * 17, g * 17, b * 17]))
            }
            6 => Ok(Color([channel(0, 2)?, channel(2, 2)?, channel(4, 2)?])),
            _ => Err(bad()),
        }
    }

    pub fn hex(&self) -> String {
        let [r, g, b] = self.0;
        format!("#{:02x}{:02x}{:02x}", r, g, b)
    }
}

/// Presentation settings shared by the renderers.
#[derive(Debug, Clone)]
pub struct Style {
    pub background: Color,
    pub foreground: Color,
    /// Glyph size in px, for both the HTML page and image output.
    pub font_size: u32,
    pub title: String,
    /// Image output cell pitch in px.
    pub cell_width: u32,
    pub cell_height: u32,
    pub font_path: Option<PathBuf>,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            background: Color([0, 0, 0]),
            foreground: Color([255, 255, 255]),
            font_size: 12,
            title: "ASCII Video".to_string(),
            cell_width: 8,
            cell_height: 16,
            font_path: None,
        }
    }
}

impl Style {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            background: Color::parse(&config.background)?,
            foreground: Color::parse(&config.foreground)?,
            font_size: config.font_size.max(1),
            cell_width: config.cell_width,
            cell_height: config.cell_height,
            font_path: config.font_path.clone(),
            ..Self::default()
        })
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }
}

/// Serializes `animation` to `output` in `format` and returns the files written.
///
/// HTML formats write the single file `output`; the frame formats treat
/// `output` as a directory.
pub fn write_output<F>(animation: &Animation, format: OutputFormat, style: &Style, output: &Path, progress: F) -> Result<Vec<PathBuf>>
where
    F: Fn(Progress) + Send + Sync,
{
    match format {
        OutputFormat::Html | OutputFormat::ColorHtml => {
            progress(Progress::writing(0, 1));
            html::write_html(animation, style, output)?;
            progress(Progress::writing(1, 1));
            Ok(vec![output.to_path_buf()])
        }
        OutputFormat::Images => images::write_images(animation, style, output, progress),
        OutputFormat::Text => text::write_text_frames(animation, output, progress),
    }
}

/// Writes `contents` to a sibling temporary file, then renames it over `path`.
pub(crate) fn write_atomically(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::write_failed(parent, e))?;
    }
    let mut tmp_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    tmp_name.push(".partial");
    let tmp = path.with_file_name(tmp_name);

    fs::write(&tmp, contents).map_err(|e| Error::write_failed(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| {
        let _ = fs::remove_file(&tmp);
        Error::write_failed(path, e)
    })
}

/// Name of frame `index` in a frame directory.
pub fn frame_file_name(index: usize, extension: &str) -> String {
    format!("frame_{:05}.{}", index, extension)
}

/// Removes already written frame files after a failed write.
pub(crate) fn remove_written(paths: &[PathBuf]) {
    for path in paths {
        if let Err(e) = fs::remove_file(path) {
            log::debug!("cleanup of {} failed: {}", path.display(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn colors_parse_short_long_and_named() {
        assert_eq!(Color::parse("#fff").unwrap(), Color([255, 255, 255]));
        assert_eq!(Color::parse("#0a0").unwrap(), Color([0, 170, 0]));
        assert_eq!(Color::parse("12ab34").unwrap(), Color([0x12, 0xab, 0x34]));
        assert_eq!(Color::parse("Black").unwrap().hex(), "#000000");
    }

    #[test]
    fn colors_reject_garbage() {
        for bad in ["", "#12", "#gggggg", "red;}", "#1234567"] {
            assert!(Color::parse(bad).is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn atomic_write_leaves_no_partial_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("out.html");
        write_atomically(&path, b"hello").unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "hello");
        assert!(!dir.path().join("nested").join("out.html.partial").exists());
    }

    #[test]
    fn default_outputs_sit_next_to_the_input() {
        let input = Path::new("clips/intro.mp4");
        assert_eq!(OutputFormat::Html.default_output(input), PathBuf::from("clips/intro.html"));
        assert_eq!(OutputFormat::Images.default_output(input), PathBuf::from("clips/intro"));
        assert_eq!(OutputFormat::ColorHtml.default_output(Path::new("a.b.mov")), PathBuf::from("a.b.html"));
    }

    #[test]
    fn frame_names_are_zero_padded() {
        assert_eq!(frame_file_name(7, "png"), "frame_00007.png");
    }
}
