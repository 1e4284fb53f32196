//! Brightness-to-glyph quantization.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::ramp::GlyphRamp;

/// Lower bound on the normalization span, so a flat range never divides by zero.
pub const EPSILON: f64 = 1e-5;

/// Which per-pixel value drives glyph selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    /// BT.601 gray, `0.299 R + 0.587 G + 0.114 B`.
    #[default]
    Luma,
    /// HSV value, `max(R, G, B)`.
    Value,
}

impl Channel {
    #[inline]
    pub fn sample(self, rgb: [u8; 3]) -> u8 {
        let [r, g, b] = rgb;
        match self {
            Channel::Luma => ((u32::from(r) * 299 + u32::from(g) * 587 + u32::from(b) * 114 + 500) / 1000) as u8,
            Channel::Value => r.max(g).max(b),
        }
    }
}

/// Observed `(min, max)` of a brightness channel. `max >= min` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrightnessRange {
    min: u8,
    max: u8,
}

impl BrightnessRange {
    pub fn new(min: u8, max: u8) -> Result<Self> {
        if max < min {
            return Err(Error::InvalidConfig(format!(
                "brightness range max ({}) is below min ({})",
                max, min
            )));
        }
        Ok(Self { min, max })
    }

    /// The whole channel, `(0, 255)`.
    pub const fn full() -> Self {
        Self { min: 0, max: 255 }
    }

    pub fn min(&self) -> u8 {
        self.min
    }

    pub fn max(&self) -> u8 {
        self.max
    }

    pub fn span(&self) -> u8 {
        self.max - self.min
    }

    /// Smallest range covering both `self` and `other`.
    pub fn union(self, other: Self) -> Self {
        Self {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }
}

/// Maps one sample to a ramp index in `[0, len - 1]`.
///
/// Samples outside the range clamp to the ends. The result is non-decreasing
/// in `sample` and total for any range, including `min == max`.
#[inline]
pub fn quantize_index(sample: u8, range: BrightnessRange, len: usize) -> usize {
    if len <= 1 {
        return 0;
    }
    let last = len - 1;
    let span = f64::from(range.span()).max(EPSILON);
    let normalized = ((f64::from(sample) - f64::from(range.min)) / span).clamp(0.0, 1.0);
    let index = (normalized * last as f64).floor() as usize;
    index.min(last)
}

/// Read-only normalization context shared by every frame of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct Normalization {
    pub range: BrightnessRange,
    pub ramp: GlyphRamp,
    pub channel: Channel,
}

impl Normalization {
    pub fn new(range: BrightnessRange, ramp: GlyphRamp, channel: Channel) -> Self {
        Self { range, ramp, channel }
    }

    #[inline]
    pub fn glyph_for_sample(&self, sample: u8) -> char {
        self.ramp.glyph(quantize_index(sample, self.range, self.ramp.len()))
    }

    #[inline]
    pub fn glyph_for_pixel(&self, rgb: [u8; 3]) -> char {
        self.glyph_for_sample(self.channel.sample(rgb))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn range(min: u8, max: u8) -> BrightnessRange {
        BrightnessRange::new(min, max).unwrap()
    }

    #[test]
    fn index_stays_in_bounds_and_is_monotonic() {
        for (min, max) in [(0u8, 255u8), (10, 20), (100, 101), (0, 1), (254, 255)] {
            for len in [1usize, 2, 3, 13, 70] {
                let mut prev = 0;
                for s in min..=max {
                    let idx = quantize_index(s, range(min, max), len);
                    assert!(idx < len, "index {idx} out of bounds for len {len}");
                    assert!(idx >= prev, "not monotonic at sample {s} for ({min},{max})");
                    prev = idx;
                }
            }
        }
    }

    #[test]
    fn range_ends_hit_ramp_ends() {
        assert_eq!(quantize_index(0, range(0, 255), 13), 0);
        assert_eq!(quantize_index(255, range(0, 255), 13), 12);
        assert_eq!(quantize_index(20, range(20, 40), 3), 0);
        assert_eq!(quantize_index(40, range(20, 40), 3), 2);
    }

    #[test]
    fn flat_range_is_total_and_stable() {
        let flat = range(128, 128);
        for s in 0..=255u8 {
            let idx = quantize_index(s, flat, 13);
            assert!(idx < 13);
            assert_eq!(idx, quantize_index(s, flat, 13));
        }
        assert_eq!(quantize_index(128, flat, 13), 0);
    }

    #[test]
    fn out_of_range_samples_clamp() {
        assert_eq!(quantize_index(5, range(50, 200), 10), 0);
        assert_eq!(quantize_index(250, range(50, 200), 10), 9);
    }

    #[test]
    fn midpoint_lands_on_middle_glyph() {
        let norm = Normalization::new(range(0, 255), GlyphRamp::new(" .#").unwrap(), Channel::Luma);
        assert_eq!(norm.glyph_for_sample(128), '.');
        assert_eq!(norm.glyph_for_sample(0), ' ');
        assert_eq!(norm.glyph_for_sample(255), '#');
    }

    #[test]
    fn channels_agree_on_gray() {
        for v in [0u8, 1, 77, 128, 254, 255] {
            assert_eq!(Channel::Luma.sample([v, v, v]), v);
            assert_eq!(Channel::Value.sample([v, v, v]), v);
        }
        assert_eq!(Channel::Value.sample([10, 200, 30]), 200);
        assert_eq!(Channel::Luma.sample([255, 0, 0]), 76);
    }

    #[test]
    fn inverted_range_is_rejected() {
        assert!(BrightnessRange::new(9, 3).is_err());
        assert_eq!(range(3, 9).union(range(1, 5)), range(1, 9));
    }
}
