//! Video decoding through the `ffmpeg` and `ffprobe` command line tools.
//!
//! `ffprobe` supplies the stream geometry and rate; `ffmpeg` then writes raw
//! `rgb24` frames at the native rate to its stdout, where `grab` reads one
//! frame's bytes into a reused buffer and `retrieve` wraps them as an image.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command as ProcCommand, Stdio};

use image::RgbImage;

use crate::config::FfmpegConfig;
use crate::error::{Error, Result};
use crate::source::{FrameSource, SourceInfo};

/// Optional sub-span of the input, as `HH:MM:SS.mmm` or plain seconds.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VideoSpan {
    pub start: Option<String>,
    pub end: Option<String>,
}

impl VideoSpan {
    fn start(&self) -> Option<&str> {
        self.start.as_deref().map(str::trim).filter(|s| !s.is_empty() && *s != "0")
    }

    fn end(&self) -> Option<&str> {
        self.end.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// `-ss`/`-t` arguments; `-ss` goes before `-i`, `-t` after.
    fn ffmpeg_args(&self) -> (Vec<String>, Vec<String>) {
        let mut before = Vec::new();
        let mut after = Vec::new();
        if let Some(s) = self.start() {
            before.push("-ss".into());
            before.push(s.to_string());
        }
        if let Some(e) = self.end() {
            match self.start() {
                Some(s) => {
                    let duration = parse_timestamp(e) - parse_timestamp(s);
                    if duration > 0.0 {
                        after.push("-t".into());
                        after.push(duration.to_string());
                    }
                }
                None => {
                    after.push("-t".into());
                    after.push(e.to_string());
                }
            }
        }
        (before, after)
    }
}

/// Seconds in `HH:MM:SS.mmm`, `MM:SS` or `SS.mmm`. Unparseable parts count as 0.
pub fn parse_timestamp(s: &str) -> f64 {
    s.split(':').rev().enumerate().fold(0.0, |acc, (i, v)| {
        acc + v.trim().parse::<f64>().unwrap_or(0.0) * 60f64.powi(i as i32)
    })
}

/// Parses ffprobe's `default=noprint_wrappers=1` output.
fn parse_probe_output(text: &str) -> Option<SourceInfo> {
    let mut width = 0u32;
    let mut height = 0u32;
    let mut fps = None;
    let mut frame_count = None;

    for line in text.lines() {
        if let Some(val) = line.strip_prefix("width=") {
            width = val.trim().parse().unwrap_or(0);
        } else if let Some(val) = line.strip_prefix("height=") {
            height = val.trim().parse().unwrap_or(0);
        } else if let Some(val) = line.strip_prefix("r_frame_rate=") {
            // "24/1", "30000/1001"
            let mut parts = val.trim().splitn(2, '/');
            let num: Option<f64> = parts.next().and_then(|s| s.parse().ok());
            let den: f64 = parts.next().and_then(|s| s.parse().ok()).unwrap_or(1.0);
            fps = num.filter(|n| *n > 0.0 && den > 0.0).map(|n| n / den);
        } else if let Some(val) = line.strip_prefix("nb_frames=") {
            frame_count = val.trim().parse().ok().filter(|n| *n > 0);
        }
    }

    (width > 0 && height > 0).then_some(SourceInfo { width, height, fps, frame_count })
}

/// Queries `ffprobe` for the first video stream.
pub fn probe_video(path: &Path, config: &FfmpegConfig) -> Result<SourceInfo> {
    let output = ProcCommand::new(config.ffprobe_cmd())
        .args(["-v", "error", "-select_streams", "v:0", "-show_entries"])
        .arg("stream=width,height,r_frame_rate,nb_frames")
        .args(["-of", "default=noprint_wrappers=1"])
        .arg(path)
        .stdin(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .map_err(|e| Error::unreadable(path, format!("cannot run {} (is it installed and on PATH?): {}", config.ffprobe_cmd(), e)))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::unreadable(path, format!("ffprobe failed: {}", stderr.trim())));
    }

    let text = String::from_utf8_lossy(&output.stdout);
    let info = parse_probe_output(&text).ok_or_else(|| Error::unreadable(path, "no decodable video stream"))?;
    log::info!(
        "probe_video: {}x{} @ {} fps, {} frames - {}",
        info.width,
        info.height,
        info.fps.map_or_else(|| "?".to_string(), |f| format!("{:.3}", f)),
        info.frame_count.map_or_else(|| "?".to_string(), |n| n.to_string()),
        path.display()
    );
    Ok(info)
}

/// Reads exactly `buf.len()` bytes. `Ok(false)` on EOF before completion.
pub fn read_exact_or_eof<R: Read>(reader: &mut R, buf: &mut [u8]) -> std::io::Result<bool> {
    let mut total = 0usize;
    while total < buf.len() {
        match reader.read(&mut buf[total..]) {
            Ok(0) => {
                if total > 0 {
                    log::warn!("truncated frame: {} of {} bytes", total, buf.len());
                }
                return Ok(false);
            }
            Ok(n) => total += n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(true)
}

/// A video file decoded by an `ffmpeg` child process.
pub struct FfmpegSource {
    path: PathBuf,
    span: VideoSpan,
    config: FfmpegConfig,
    info: SourceInfo,
    child: Option<Child>,
    stdout: Option<ChildStdout>,
    buf: Vec<u8>,
    grabbed: u64,
    has_frame: bool,
    /// Every `stride`-th frame is selected inside ffmpeg.
    stride: usize,
}

impl FfmpegSource {
    /// Probes `path`; the decoder process starts on the first `grab`.
    pub fn open(path: &Path, span: VideoSpan, config: FfmpegConfig) -> Result<Self> {
        if !path.exists() {
            return Err(Error::SourceNotFound { path: path.to_path_buf() });
        }
        let mut info = probe_video(path, &config)?;
        if span.start().is_some() || span.end().is_some() {
            // The container count covers the whole file, not the span.
            info.frame_count = None;
        }
        let frame_bytes = info.width as usize * info.height as usize * 3;
        Ok(Self {
            path: path.to_path_buf(),
            span,
            config,
            info,
            child: None,
            stdout: None,
            buf: vec![0u8; frame_bytes],
            grabbed: 0,
            has_frame: false,
            stride: 1,
        })
    }

    fn spawn(&mut self) -> Result<()> {
        let (before, after) = self.span.ffmpeg_args();
        let mut cmd = ProcCommand::new(self.config.ffmpeg_cmd());
        cmd.args(["-hide_banner", "-loglevel", "error", "-nostdin", "-noautorotate"])
            .args(&before)
            .arg("-i")
            .arg(&self.path)
            .args(&after)
            .args(self.select_filter())
            .args(["-an", "-vsync", "passthrough", "-f", "rawvideo", "-pix_fmt", "rgb24", "pipe:1"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        log::debug!("spawning {:?}", cmd);

        let mut child = cmd
            .spawn()
            .map_err(|e| Error::unreadable(&self.path, format!("cannot run {} (is it installed and on PATH?): {}", self.config.ffmpeg_cmd(), e)))?;
        self.stdout = child.stdout.take();
        self.child = Some(child);
        self.grabbed = 0;
        self.has_frame = false;
        Ok(())
    }

    /// `-vf select=...` so unselected frames never cross the pipe.
    fn select_filter(&self) -> Vec<String> {
        if self.stride <= 1 {
            return Vec::new();
        }
        vec!["-vf".into(), format!("select=not(mod(n\\,{}))", self.stride)]
    }

    fn stop(&mut self) {
        self.stdout = None;
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }

    /// Reaps the process after EOF; a failed exit with no frames decoded is an error.
    fn finish(&mut self) -> Result<()> {
        self.stdout = None;
        let Some(mut child) = self.child.take() else {
            return Ok(());
        };
        let status = child.wait().map_err(|e| Error::unreadable(&self.path, e))?;
        if !status.success() {
            if self.grabbed == 0 {
                return Err(Error::unreadable(&self.path, format!("ffmpeg exited with {}", status)));
            }
            log::warn!("ffmpeg exited with {} after {} frames", status, self.grabbed);
        }
        log::debug!("ffmpeg finished after {} frames", self.grabbed);
        Ok(())
    }
}

impl FrameSource for FfmpegSource {
    fn info(&self) -> SourceInfo {
        self.info
    }

    fn grab(&mut self) -> Result<bool> {
        if self.child.is_none() {
            if self.has_frame || self.grabbed > 0 {
                // Exhausted; rewind() restarts.
                return Ok(false);
            }
            self.spawn()?;
        }
        let Some(stdout) = self.stdout.as_mut() else {
            return Ok(false);
        };
        match read_exact_or_eof(stdout, &mut self.buf) {
            Ok(true) => {
                self.grabbed += 1;
                self.has_frame = true;
                Ok(true)
            }
            Ok(false) => {
                self.has_frame = false;
                self.finish()?;
                // Keep `grabbed` so later grabs report exhaustion instead of respawning.
                self.grabbed = self.grabbed.max(1);
                Ok(false)
            }
            Err(e) => {
                self.stop();
                Err(Error::unreadable(&self.path, e))
            }
        }
    }

    fn retrieve(&mut self) -> Result<RgbImage> {
        if !self.has_frame {
            return Err(Error::unreadable(&self.path, "retrieve called without a grabbed frame"));
        }
        RgbImage::from_raw(self.info.width, self.info.height, self.buf.clone())
            .ok_or_else(|| Error::unreadable(&self.path, "frame buffer size mismatch"))
    }

    fn rewind(&mut self) -> Result<()> {
        self.stop();
        self.spawn()
    }

    fn decimate(&mut self, stride: usize) -> Result<bool> {
        self.stop();
        self.stride = stride.max(1);
        // Respawned lazily by the next grab.
        self.grabbed = 0;
        self.has_frame = false;
        Ok(true)
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        self.stop();
    }
}
