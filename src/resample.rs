/// Source frames per emitted frame: `max(1, round(source / target))`.
///
/// Never below 1, so a target above the source rate keeps every frame
/// without duplicating any. Unknown or nonsensical rates give 1.
pub fn stride(source_rate: f64, target_rate: f64) -> usize {
    if !(source_rate.is_finite() && target_rate.is_finite()) || source_rate <= 0.0 || target_rate <= 0.0 {
        return 1;
    }
    ((source_rate / target_rate).round() as usize).max(1)
}

/// Decides, frame by frame, which source frames to decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resampler {
    stride: usize,
    index: u64,
}

impl Resampler {
    pub fn new(stride: usize) -> Self {
        Self { stride: stride.max(1), index: 0 }
    }

    pub fn for_rates(source_rate: Option<f64>, target_rate: f64) -> Self {
        Self::new(source_rate.map_or(1, |src| stride(src, target_rate)))
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Consumes one source frame index; true when that frame is emitted.
    pub fn next_keep(&mut self) -> bool {
        let keep = self.index % self.stride as u64 == 0;
        self.index += 1;
        keep
    }

    /// Emitted frames out of `source_frames`.
    pub fn output_count(&self, source_frames: u64) -> u64 {
        source_frames.div_ceil(self.stride as u64)
    }

    /// Playback rate matching the emitted frames.
    pub fn output_rate(&self, source_rate: f64) -> f64 {
        source_rate / self.stride as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn downsamples_by_rounded_ratio() {
        assert_eq!(stride(30.0, 10.0), 3);
        assert_eq!(stride(60.0, 25.0), 2);
        assert_eq!(stride(29.97, 10.0), 3);
    }

    #[test]
    fn never_upsamples() {
        assert_eq!(stride(24.0, 60.0), 1);
        assert_eq!(stride(24.0, 24.0), 1);
    }

    #[test]
    fn bad_rates_fall_back_to_every_frame() {
        assert_eq!(stride(0.0, 10.0), 1);
        assert_eq!(stride(30.0, 0.0), 1);
        assert_eq!(stride(f64::NAN, 10.0), 1);
        assert_eq!(Resampler::for_rates(None, 10.0).stride(), 1);
    }

    #[test]
    fn keeps_exact_multiples_of_stride() {
        let mut r = Resampler::new(3);
        let kept: Vec<bool> = (0..7).map(|_| r.next_keep()).collect();
        assert_eq!(kept, vec![true, false, false, true, false, false, true]);
        assert_eq!(r.output_count(7), 3);
        assert_eq!(r.output_rate(30.0), 10.0);
    }
}
