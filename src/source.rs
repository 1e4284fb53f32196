//! Frame sources: anything that hands out decoded frames in order.

use std::path::Path;

use image::RgbImage;

use crate::error::{Error, Result};

/// Stream properties known before decoding starts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceInfo {
    pub width: u32,
    pub height: u32,
    /// Native frame rate, if the container reports one.
    pub fps: Option<f64>,
    /// Frame count, if the container reports one.
    pub frame_count: Option<u64>,
}

/// Ordered frame supply with a cheap skip step.
///
/// `grab` advances past one frame without materializing it; `retrieve`
/// builds the image of the most recently grabbed frame. Skipping a frame is
/// a `grab` with no `retrieve`.
pub trait FrameSource {
    fn info(&self) -> SourceInfo;

    /// Advances to the next frame. `Ok(false)` means the stream is exhausted.
    fn grab(&mut self) -> Result<bool>;

    /// Decodes the frame selected by the last successful `grab`.
    fn retrieve(&mut self) -> Result<RgbImage>;

    /// Restarts the stream from its first frame.
    fn rewind(&mut self) -> Result<()>;

    /// Asks the source to hand out only every `stride`-th frame itself, so
    /// skipped frames are never decoded. On `Ok(true)` the stream restarts
    /// from its first frame; `Ok(false)` leaves it untouched and the caller
    /// skips frames with `grab`.
    fn decimate(&mut self, stride: usize) -> Result<bool> {
        let _ = stride;
        Ok(false)
    }

    /// `grab` followed by `retrieve`.
    fn read(&mut self) -> Result<Option<RgbImage>> {
        if !self.grab()? {
            return Ok(None);
        }
        self.retrieve().map(Some)
    }
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn info(&self) -> SourceInfo {
        (**self).info()
    }

    fn grab(&mut self) -> Result<bool> {
        (**self).grab()
    }

    fn retrieve(&mut self) -> Result<RgbImage> {
        (**self).retrieve()
    }

    fn rewind(&mut self) -> Result<()> {
        (**self).rewind()
    }

    fn decimate(&mut self, stride: usize) -> Result<bool> {
        (**self).decimate(stride)
    }
}

/// Frames already held in memory: still images and tests.
#[derive(Debug, Clone)]
pub struct MemorySource {
    frames: Vec<RgbImage>,
    fps: Option<f64>,
    /// Index of the next frame `grab` will select.
    next: usize,
}

impl MemorySource {
    pub fn new(frames: Vec<RgbImage>, fps: Option<f64>) -> Self {
        Self { frames, fps, next: 0 }
    }

    /// Opens a still image as a one-frame source.
    pub fn from_image(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::SourceNotFound { path: path.to_path_buf() });
        }
        let img = image::open(path).map_err(|e| Error::unreadable(path, e))?.to_rgb8();
        log::info!("opened image {} ({}x{})", path.display(), img.width(), img.height());
        Ok(Self::new(vec![img], None))
    }

    /// Builds a source of gray frames from rows of brightness values.
    pub fn from_gray_rows(frames: &[Vec<Vec<u8>>], fps: Option<f64>) -> Self {
        let images = frames
            .iter()
            .map(|rows| {
                let height = rows.len() as u32;
                let width = rows.first().map_or(0, Vec::len) as u32;
                RgbImage::from_fn(width, height, |x, y| {
                    let v = rows[y as usize][x as usize];
                    image::Rgb([v, v, v])
                })
            })
            .collect();
        Self::new(images, fps)
    }
}

impl FrameSource for MemorySource {
    fn info(&self) -> SourceInfo {
        let (width, height) = self.frames.first().map_or((0, 0), RgbImage::dimensions);
        SourceInfo {
            width,
            height,
            fps: self.fps,
            frame_count: Some(self.frames.len() as u64),
        }
    }

    fn grab(&mut self) -> Result<bool> {
        if self.next >= self.frames.len() {
            return Ok(false);
        }
        self.next += 1;
        Ok(true)
    }

    fn retrieve(&mut self) -> Result<RgbImage> {
        self.next
            .checked_sub(1)
            .and_then(|i| self.frames.get(i))
            .cloned()
            .ok_or_else(|| Error::unreadable("<memory>", "retrieve called before grab"))
    }

    fn rewind(&mut self) -> Result<()> {
        self.next = 0;
        Ok(())
    }
}

pub(crate) fn is_image_path(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| matches!(e.to_ascii_lowercase().as_str(), "png" | "jpg" | "jpeg" | "bmp" | "gif"))
}

/// Opens `path` as a still image or, for anything else, as an ffmpeg-decoded video.
pub fn open(path: &Path, video: &crate::ffmpeg::VideoSpan, ffmpeg: &crate::config::FfmpegConfig) -> Result<Box<dyn FrameSource>> {
    if !path.exists() {
        return Err(Error::SourceNotFound { path: path.to_path_buf() });
    }
    if is_image_path(path) {
        Ok(Box::new(MemorySource::from_image(path)?))
    } else {
        Ok(Box::new(crate::ffmpeg::FfmpegSource::open(path, video.clone(), ffmpeg.clone())?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_source_grabs_in_order_then_ends() {
        let mut src = MemorySource::from_gray_rows(&[vec![vec![1]], vec![vec![2]]], Some(25.0));
        assert_eq!(src.info().frame_count, Some(2));
        assert_eq!(src.read().unwrap().unwrap().get_pixel(0, 0)[0], 1);
        assert!(src.grab().unwrap());
        assert_eq!(src.retrieve().unwrap().get_pixel(0, 0)[0], 2);
        assert!(!src.grab().unwrap());
        src.rewind().unwrap();
        assert_eq!(src.read().unwrap().unwrap().get_pixel(0, 0)[0], 1);
    }

    #[test]
    fn retrieve_before_grab_fails() {
        let mut src = MemorySource::from_gray_rows(&[vec![vec![1]]], None);
        assert!(matches!(src.retrieve(), Err(Error::SourceUnreadable { .. })));
    }

    #[test]
    fn missing_image_is_source_not_found() {
        let err = MemorySource::from_image(Path::new("/definitely/not/here.png")).unwrap_err();
        assert!(matches!(err, Error::SourceNotFound { .. }));
    }

    #[test]
    fn image_extensions_are_case_insensitive() {
        assert!(is_image_path(Path::new("a.PNG")));
        assert!(is_image_path(Path::new("a.jpeg")));
        assert!(!is_image_path(Path::new("a.mp4")));
    }
}
