use image::RgbImage;

use crate::error::{Error, Result};
use crate::quantize::{BrightnessRange, Channel};
use crate::source::FrameSource;

/// `(min, max)` of `channel` over every pixel of `frame`.
pub fn frame_range(frame: &RgbImage, channel: Channel) -> Option<BrightnessRange> {
    let mut pixels = frame.pixels().map(|p| channel.sample(p.0));
    let first = pixels.next()?;
    let (min, max) = pixels.fold((first, first), |(lo, hi), v| (lo.min(v), hi.max(v)));
    BrightnessRange::new(min, max).ok()
}

/// Estimates the brightness range from the first `sample_frames` frames.
///
/// Only a prefix is analyzed, so later frames of a long or non-stationary
/// video can fall outside the returned range; the quantizer clamps those
/// samples to the ramp ends. Fewer frames than requested is fine, none at all
/// is [`Error::NoFramesAvailable`].
///
/// Leaves the source positioned after the analyzed frames; callers rewind.
pub fn estimate_range<S: FrameSource + ?Sized>(source: &mut S, channel: Channel, sample_frames: usize) -> Result<BrightnessRange> {
    let wanted = sample_frames.max(1);
    let mut range: Option<BrightnessRange> = None;
    let mut analyzed = 0usize;

    while analyzed < wanted {
        let Some(frame) = source.read()? else {
            break;
        };
        if let Some(r) = frame_range(&frame, channel) {
            log::debug!("frame {}: brightness min={} max={}", analyzed + 1, r.min(), r.max());
            range = Some(range.map_or(r, |acc| acc.union(r)));
        }
        analyzed += 1;
    }

    let range = range.ok_or(Error::NoFramesAvailable)?;
    log::info!(
        "brightness range {}-{} ({:?}) from {} frame(s)",
        range.min(),
        range.max(),
        channel,
        analyzed
    );
    Ok(range)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;

    #[test]
    fn range_covers_prefix_only() {
        let mut src = MemorySource::from_gray_rows(
            &[vec![vec![10, 20]], vec![vec![5, 30]], vec![vec![0, 255]]],
            None,
        );
        let r = estimate_range(&mut src, Channel::Luma, 2).unwrap();
        assert_eq!((r.min(), r.max()), (5, 30));
    }

    #[test]
    fn short_source_uses_what_it_has() {
        let mut src = MemorySource::from_gray_rows(&[vec![vec![40, 60]]], None);
        let r = estimate_range(&mut src, Channel::Value, 5).unwrap();
        assert_eq!((r.min(), r.max()), (40, 60));
    }

    #[test]
    fn empty_source_has_no_frames_available() {
        let mut src = MemorySource::new(Vec::new(), None);
        assert!(matches!(estimate_range(&mut src, Channel::Luma, 5), Err(Error::NoFramesAvailable)));
    }

    #[test]
    fn value_channel_uses_brightest_component() {
        let frame = RgbImage::from_fn(2, 1, |x, _| if x == 0 { image::Rgb([0, 0, 90]) } else { image::Rgb([200, 10, 10]) });
        let r = frame_range(&frame, Channel::Value).unwrap();
        assert_eq!((r.min(), r.max()), (90, 200));
    }
}
