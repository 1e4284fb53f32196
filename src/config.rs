use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::grid::DEFAULT_CELL_ASPECT;
use crate::ramp::{GlyphRamp, DEFAULT_RAMP};

/// Config file stem searched in the data directory and the working directory.
pub const CONFIG_STEM: &str = "asciivid";

/// Quality settings selectable by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preset {
    /// Output width in glyph columns.
    pub width: u32,
    /// Target output frame rate.
    pub fps: f64,
    #[serde(default = "default_cell_aspect")]
    pub cell_aspect: f32,
    /// Frames analyzed for the brightness range.
    #[serde(default = "default_sample_frames")]
    pub sample_frames: usize,
}

fn default_cell_aspect() -> f32 {
    DEFAULT_CELL_ASPECT
}

fn default_sample_frames() -> usize {
    5
}

fn default_ramp() -> String {
    DEFAULT_RAMP.to_string()
}

fn default_background() -> String {
    "#000000".to_string()
}

fn default_foreground() -> String {
    "#ffffff".to_string()
}

fn default_font_size() -> u32 {
    12
}

fn default_cell_width() -> u32 {
    8
}

fn default_cell_height() -> u32 {
    16
}

fn default_preset_name() -> String {
    "default".to_string()
}

/// Names of the external decoder binaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FfmpegConfig {
    #[serde(default = "FfmpegConfig::default_ffmpeg")]
    pub ffmpeg: String,
    #[serde(default = "FfmpegConfig::default_ffprobe")]
    pub ffprobe: String,
}

impl FfmpegConfig {
    fn default_ffmpeg() -> String {
        "ffmpeg".to_string()
    }

    fn default_ffprobe() -> String {
        "ffprobe".to_string()
    }

    pub fn ffmpeg_cmd(&self) -> &str {
        &self.ffmpeg
    }

    pub fn ffprobe_cmd(&self) -> &str {
        &self.ffprobe
    }
}

impl Default for FfmpegConfig {
    fn default() -> Self {
        Self {
            ffmpeg: Self::default_ffmpeg(),
            ffprobe: Self::default_ffprobe(),
        }
    }
}

/// Application configuration: presets, ramp, styling and tool paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "builtin_presets")]
    pub presets: HashMap<String, Preset>,
    #[serde(default = "default_preset_name")]
    pub default_preset: String,
    #[serde(default = "default_ramp")]
    pub ramp: String,
    #[serde(default = "default_background")]
    pub background: String,
    #[serde(default = "default_foreground")]
    pub foreground: String,
    /// HTML font size in px.
    #[serde(default = "default_font_size")]
    pub font_size: u32,
    /// TrueType/OpenType font for image output.
    #[serde(default)]
    pub font_path: Option<PathBuf>,
    /// Image output cell pitch in px.
    #[serde(default = "default_cell_width")]
    pub cell_width: u32,
    #[serde(default = "default_cell_height")]
    pub cell_height: u32,
    #[serde(default)]
    pub ffmpeg: FfmpegConfig,
}

fn builtin_presets() -> HashMap<String, Preset> {
    let preset = |width, fps| Preset {
        width,
        fps,
        cell_aspect: DEFAULT_CELL_ASPECT,
        sample_frames: default_sample_frames(),
    };
    HashMap::from([
        ("small".to_string(), preset(100, 30.0)),
        ("default".to_string(), preset(240, 30.0)),
        ("large".to_string(), preset(360, 60.0)),
    ])
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            presets: builtin_presets(),
            default_preset: default_preset_name(),
            ramp: default_ramp(),
            background: default_background(),
            foreground: default_foreground(),
            font_size: default_font_size(),
            font_path: None,
            cell_width: default_cell_width(),
            cell_height: default_cell_height(),
            ffmpeg: FfmpegConfig::default(),
        }
    }
}

impl AppConfig {
    /// Parses a config file, TOML for `.toml` and JSON otherwise.
    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .map_err(|e| Error::InvalidConfig(format!("reading config {}: {}", path.display(), e)))?;
        let is_toml = path.extension().is_some_and(|e| e.eq_ignore_ascii_case("toml"));
        let config: AppConfig = if is_toml {
            toml::from_str(&text).map_err(|e| Error::InvalidConfig(format!("parsing {}: {}", path.display(), e)))?
        } else {
            serde_json::from_str(&text).map_err(|e| Error::InvalidConfig(format!("parsing {}: {}", path.display(), e)))?
        };
        config.validate()?;
        log::info!("loaded config {}", path.display());
        Ok(config)
    }

    /// `explicit` if given, else the first config found in the data
    /// directory or the working directory, else the built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_file(path);
        }
        for path in Self::search_paths() {
            if path.is_file() {
                return Self::from_file(&path);
            }
        }
        log::debug!("no config file found, using built-in defaults");
        Ok(Self::default())
    }

    pub fn search_paths() -> Vec<PathBuf> {
        let mut dirs_to_try: Vec<PathBuf> = Vec::new();
        if let Some(mut d) = dirs::data_dir() {
            d.push(CONFIG_STEM);
            dirs_to_try.push(d);
        }
        dirs_to_try.push(PathBuf::from("."));

        dirs_to_try
            .into_iter()
            .flat_map(|d| ["toml", "json"].map(|ext| d.join(format!("{}.{}", CONFIG_STEM, ext))))
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        GlyphRamp::new(&self.ramp)?;
        if !self.presets.contains_key(&self.default_preset) {
            return Err(Error::InvalidConfig(format!("default preset '{}' is not defined", self.default_preset)));
        }
        for (name, preset) in &self.presets {
            if preset.width == 0 || !(preset.fps.is_finite() && preset.fps > 0.0) {
                return Err(Error::InvalidConfig(format!("preset '{}' needs a positive width and fps", name)));
            }
        }
        if self.cell_width == 0 || self.cell_height == 0 {
            return Err(Error::InvalidConfig("cell_width and cell_height must be positive".into()));
        }
        Ok(())
    }

    pub fn preset(&self, name: &str) -> Result<&Preset> {
        self.presets
            .get(name)
            .ok_or_else(|| Error::InvalidConfig(format!("preset '{}' not found", name)))
    }

    pub fn glyph_ramp(&self) -> Result<GlyphRamp> {
        GlyphRamp::new(&self.ramp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_config_is_valid() {
        let cfg = AppConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.preset("default").unwrap().width, 240);
        assert_eq!(cfg.glyph_ramp().unwrap().len(), 13);
    }

    #[test]
    fn json_and_toml_fill_in_defaults() {
        let dir = tempfile::tempdir().unwrap();

        let json = dir.path().join("asciivid.json");
        fs::write(&json, r#"{"ramp": " .#", "presets": {"tiny": {"width": 20, "fps": 5}}, "default_preset": "tiny"}"#).unwrap();
        let cfg = AppConfig::from_file(&json).unwrap();
        assert_eq!(cfg.ramp, " .#");
        assert_eq!(cfg.preset("tiny").unwrap().sample_frames, 5);
        assert_eq!(cfg.background, "#000000");

        let toml_path = dir.path().join("asciivid.toml");
        fs::write(&toml_path, "foreground = \"#0f0\"\n[ffmpeg]\nffmpeg = \"/opt/ffmpeg\"\n").unwrap();
        let cfg = AppConfig::from_file(&toml_path).unwrap();
        assert_eq!(cfg.foreground, "#0f0");
        assert_eq!(cfg.ffmpeg.ffmpeg_cmd(), "/opt/ffmpeg");
        assert_eq!(cfg.ffmpeg.ffprobe_cmd(), "ffprobe");
        assert_eq!(cfg.default_preset, "default");
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, r#"{"default_preset": "missing"}"#).unwrap();
        assert!(matches!(AppConfig::from_file(&path), Err(Error::InvalidConfig(_))));

        fs::write(&path, r#"{"ramp": ""}"#).unwrap();
        assert!(matches!(AppConfig::from_file(&path), Err(Error::InvalidConfig(_))));

        fs::write(&path, "not json").unwrap();
        assert!(matches!(AppConfig::from_file(&path), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn search_paths_end_in_working_directory() {
        let paths = AppConfig::search_paths();
        assert_eq!(paths.last().unwrap(), &PathBuf::from("./asciivid.json"));
    }
}
