use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::quantize::BrightnessRange;

/// Glyph cells are roughly twice as tall as they are wide in common
/// monospace fonts; rows are scaled by this to keep the source aspect.
pub const DEFAULT_CELL_ASPECT: f32 = 0.5;

/// Output grid size in cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSize {
    pub width: u32,
    pub height: u32,
}

impl GridSize {
    pub fn new(width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::InvalidConfig(format!("grid size must be non-zero, got {}x{}", width, height)));
        }
        Ok(Self { width, height })
    }

    /// `height = round(width * src_h / src_w * cell_aspect)`, at least 1.
    pub fn for_source(src_width: u32, src_height: u32, width: u32, cell_aspect: f32) -> Result<Self> {
        if src_width == 0 || src_height == 0 {
            return Err(Error::InvalidConfig(format!("source has no pixels ({}x{})", src_width, src_height)));
        }
        if !(cell_aspect.is_finite() && cell_aspect > 0.0) {
            return Err(Error::InvalidConfig(format!("cell aspect must be positive, got {}", cell_aspect)));
        }
        let height = (f64::from(width) * f64::from(src_height) / f64::from(src_width) * f64::from(cell_aspect)).round() as u32;
        Self::new(width, height.max(1))
    }

    pub fn cells(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

/// One rendered frame: glyphs in row-major order, with one RGB color per
/// cell for colored grids.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphGrid {
    width: u32,
    height: u32,
    glyphs: Vec<char>,
    colors: Option<Vec<[u8; 3]>>,
}

impl GlyphGrid {
    pub(crate) fn from_parts(size: GridSize, glyphs: Vec<char>, colors: Option<Vec<[u8; 3]>>) -> Self {
        debug_assert_eq!(glyphs.len(), size.cells());
        debug_assert!(colors.as_ref().map_or(true, |c| c.len() == size.cells()));
        Self {
            width: size.width,
            height: size.height,
            glyphs,
            colors,
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn size(&self) -> GridSize {
        GridSize { width: self.width, height: self.height }
    }

    pub fn is_colored(&self) -> bool {
        self.colors.is_some()
    }

    pub fn glyph(&self, x: u32, y: u32) -> char {
        self.glyphs[(y * self.width + x) as usize]
    }

    pub fn color(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        self.colors.as_ref().map(|c| c[(y * self.width + x) as usize])
    }

    pub fn row(&self, y: u32) -> &[char] {
        let start = (y * self.width) as usize;
        &self.glyphs[start..start + self.width as usize]
    }

    /// Cells of row `y` as `(glyph, color)` pairs.
    pub fn row_cells(&self, y: u32) -> impl Iterator<Item = (char, Option<[u8; 3]>)> + '_ {
        (0..self.width).map(move |x| (self.glyph(x, y), self.color(x, y)))
    }

    pub fn rows(&self) -> impl Iterator<Item = &[char]> + '_ {
        self.glyphs.chunks(self.width as usize)
    }

    /// Rows joined by `\n`, without a trailing line break.
    pub fn to_text(&self) -> String {
        let mut out = String::with_capacity((self.width as usize + 1) * self.height as usize);
        for (i, row) in self.rows().enumerate() {
            if i > 0 {
                out.push('\n');
            }
            out.extend(row.iter());
        }
        out
    }
}

/// Every frame of a conversion plus its playback rate and the brightness
/// range the frames were normalized against.
///
/// All grids are held in memory until a renderer serializes them, which
/// bounds practical clip length by available memory.
#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    pub frames: Vec<GlyphGrid>,
    pub fps: f64,
    pub size: GridSize,
    pub range: BrightnessRange,
}

impl Animation {
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn is_colored(&self) -> bool {
        self.frames.first().is_some_and(GlyphGrid::is_colored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn height_halves_for_tall_cells() {
        let size = GridSize::for_source(1920, 1080, 100, DEFAULT_CELL_ASPECT).unwrap();
        assert_eq!(size, GridSize { width: 100, height: 28 });
        let size = GridSize::for_source(640, 480, 80, 1.0).unwrap();
        assert_eq!(size.height, 60);
    }

    #[test]
    fn height_never_drops_to_zero() {
        let size = GridSize::for_source(1000, 10, 10, DEFAULT_CELL_ASPECT).unwrap();
        assert_eq!(size.height, 1);
    }

    #[test]
    fn degenerate_inputs_are_rejected() {
        assert!(GridSize::for_source(0, 10, 10, 0.5).is_err());
        assert!(GridSize::for_source(10, 10, 10, 0.0).is_err());
        assert!(GridSize::new(0, 3).is_err());
    }

    #[test]
    fn text_joins_rows_without_trailing_newline() {
        let grid = GlyphGrid::from_parts(GridSize { width: 2, height: 2 }, vec!['a', 'b', 'c', 'd'], None);
        assert_eq!(grid.to_text(), "ab\ncd");
        assert_eq!(grid.row(1), &['c', 'd']);
        assert_eq!(grid.color(0, 0), None);
    }

    #[test]
    fn colored_cells_pair_glyph_and_color() {
        let grid = GlyphGrid::from_parts(
            GridSize { width: 2, height: 1 },
            vec!['x', 'y'],
            Some(vec![[1, 2, 3], [4, 5, 6]]),
        );
        let cells: Vec<_> = grid.row_cells(0).collect();
        assert_eq!(cells, vec![('x', Some([1, 2, 3])), ('y', Some([4, 5, 6]))]);
    }
}
