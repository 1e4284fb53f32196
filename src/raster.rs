use image::imageops::{self, FilterType};
use image::RgbImage;

use crate::grid::{GlyphGrid, GridSize};
use crate::quantize::Normalization;

/// Converts one decoded frame into a glyph grid of exactly `size` cells.
///
/// The frame is resized (bilinear) unless it already has that size; every
/// resized pixel is quantized through `norm`. With `color` set the grid keeps
/// the resized pixel's RGB per cell.
pub fn rasterize(frame: &RgbImage, norm: &Normalization, size: GridSize, color: bool) -> GlyphGrid {
    let resized;
    let img = if frame.dimensions() == (size.width, size.height) {
        frame
    } else {
        resized = imageops::resize(frame, size.width, size.height, FilterType::Triangle);
        &resized
    };

    let mut glyphs = Vec::with_capacity(size.cells());
    let mut colors = color.then(|| Vec::with_capacity(size.cells()));

    for px in img.pixels() {
        glyphs.push(norm.glyph_for_pixel(px.0));
        if let Some(colors) = colors.as_mut() {
            colors.push(px.0);
        }
    }

    GlyphGrid::from_parts(size, glyphs, colors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::quantize::{BrightnessRange, Channel};
    use crate::ramp::GlyphRamp;

    fn norm() -> Normalization {
        Normalization::new(BrightnessRange::full(), GlyphRamp::new(" .#").unwrap(), Channel::Luma)
    }

    #[test]
    fn output_matches_requested_size() {
        let frame = RgbImage::from_pixel(37, 11, image::Rgb([128, 128, 128]));
        for (w, h) in [(1, 1), (5, 3), (80, 40), (37, 11)] {
            let grid = rasterize(&frame, &norm(), GridSize::new(w, h).unwrap(), false);
            assert_eq!((grid.width(), grid.height()), (w, h));
            assert_eq!(grid.rows().count(), h as usize);
            assert!(grid.rows().all(|r| r.len() == w as usize));
        }
    }

    #[test]
    fn same_size_frame_maps_pixel_for_pixel() {
        let frame = RgbImage::from_fn(2, 2, |x, y| {
            let v = if x == y { 0 } else { 255 };
            image::Rgb([v, v, v])
        });
        let grid = rasterize(&frame, &norm(), GridSize::new(2, 2).unwrap(), false);
        assert_eq!(grid.to_text(), " #\n# ");
    }

    #[test]
    fn color_grid_keeps_pixel_colors() {
        let frame = RgbImage::from_pixel(3, 2, image::Rgb([250, 20, 10]));
        let grid = rasterize(&frame, &norm(), GridSize::new(3, 2).unwrap(), true);
        assert!(grid.is_colored());
        assert_eq!(grid.color(2, 1), Some([250, 20, 10]));
    }
}
