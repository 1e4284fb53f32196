use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use ab_glyph::{point, Font, FontVec, PxScale, ScaleFont};
use image::RgbImage;
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::grid::{Animation, GlyphGrid};
use crate::pipeline::Progress;
use crate::render::{frame_file_name, remove_written, Color, Style};

/// Monospace fonts tried, in order, when no font is configured.
const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/TTF/DejaVuSansMono.ttf",
    "/usr/share/fonts/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/dejavu-sans-mono-fonts/DejaVuSansMono.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationMono-Regular.ttf",
    "/usr/share/fonts/liberation-mono/LiberationMono-Regular.ttf",
    "/usr/share/fonts/truetype/ubuntu/UbuntuMono-R.ttf",
    "/System/Library/Fonts/Menlo.ttc",
    "/System/Library/Fonts/Monaco.ttf",
    "/Library/Fonts/Courier New.ttf",
    "C:\\Windows\\Fonts\\cour.ttf",
    "C:\\Windows\\Fonts\\consola.ttf",
];

pub fn find_system_font() -> Option<PathBuf> {
    SYSTEM_FONTS.iter().map(PathBuf::from).find(|p| p.is_file())
}

/// Loads the configured font, else the first system monospace font found.
pub fn load_font(path: Option<&Path>) -> Result<FontVec> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => find_system_font().ok_or_else(|| {
            Error::FontUnavailable("no monospace system font found; set font_path in the config or pass --font".into())
        })?,
    };
    let data = fs::read(&path).map_err(|e| Error::FontUnavailable(format!("{}: {}", path.display(), e)))?;
    let font = FontVec::try_from_vec_and_index(data, 0)
        .map_err(|e| Error::FontUnavailable(format!("{}: {}", path.display(), e)))?;
    log::info!("using font {}", path.display());
    Ok(font)
}

/// Per-glyph coverage bitmaps, one `cell_width * cell_height` buffer each.
pub struct GlyphAtlas {
    cell_width: u32,
    cell_height: u32,
    glyphs: HashMap<char, Vec<u8>>,
    empty: Vec<u8>,
}

impl GlyphAtlas {
    /// Rasterizes `chars` at `font_px`, centered in the cell.
    pub fn new(font: &FontVec, font_px: f32, cell_width: u32, cell_height: u32, chars: impl IntoIterator<Item = char>) -> Self {
        let mut atlas = Self::empty(cell_width, cell_height);
        let scale = PxScale::from(font_px);
        let scaled = font.as_scaled(scale);
        let line_height = scaled.ascent() - scaled.descent();
        let pad_y = ((cell_height as f32 - line_height) / 2.0).max(0.0);

        for ch in chars {
            let id = font.glyph_id(ch);
            if id.0 == 0 && !ch.is_whitespace() {
                log::debug!("font has no glyph for {:?}", ch);
            }
            let pad_x = ((cell_width as f32 - scaled.h_advance(id)) / 2.0).max(0.0);
            let glyph = id.with_scale_and_position(scale, point(pad_x, pad_y + scaled.ascent()));
            let mut buffer = vec![0u8; atlas.empty.len()];

            if let Some(outline) = font.outline_glyph(glyph) {
                let bounds = outline.px_bounds();
                outline.draw(|x, y, v| {
                    let px = x as i32 + bounds.min.x as i32;
                    let py = y as i32 + bounds.min.y as i32;
                    if px >= 0 && py >= 0 && (px as u32) < cell_width && (py as u32) < cell_height {
                        let idx = (py as u32 * cell_width + px as u32) as usize;
                        buffer[idx] = buffer[idx].max((v * 255.0).round() as u8);
                    }
                });
            }
            atlas.glyphs.insert(ch, buffer);
        }
        atlas
    }

    fn empty(cell_width: u32, cell_height: u32) -> Self {
        Self {
            cell_width,
            cell_height,
            glyphs: HashMap::new(),
            empty: vec![0u8; (cell_width * cell_height) as usize],
        }
    }

    pub fn cell_size(&self) -> (u32, u32) {
        (self.cell_width, self.cell_height)
    }

    fn coverage(&self, ch: char) -> &[u8] {
        self.glyphs.get(&ch).unwrap_or(&self.empty)
    }

    /// Draws `grid` at a fixed cell pitch. Each glyph takes its cell color,
    /// or `foreground` for monochrome grids, blended over `background`.
    pub fn draw(&self, grid: &GlyphGrid, foreground: Color, background: Color) -> RgbImage {
        let (cw, ch) = (self.cell_width, self.cell_height);
        let mut img = RgbImage::from_pixel(grid.width() * cw, grid.height() * ch, image::Rgb(background.0));
        let bg = background.0.map(f32::from);

        for gy in 0..grid.height() {
            for (gx, (glyph, color)) in grid.row_cells(gy).enumerate() {
                let coverage = self.coverage(glyph);
                let fg = color.unwrap_or(foreground.0).map(f32::from);
                for cy in 0..ch {
                    for cx in 0..cw {
                        let alpha = coverage[(cy * cw + cx) as usize];
                        if alpha == 0 {
                            continue;
                        }
                        let a = f32::from(alpha) / 255.0;
                        let blend = |i: usize| (fg[i] * a + bg[i] * (1.0 - a)).round() as u8;
                        img.put_pixel(gx as u32 * cw + cx, gy * ch + cy, image::Rgb([blend(0), blend(1), blend(2)]));
                    }
                }
            }
        }
        img
    }
}

/// Every distinct glyph used by the animation.
fn used_glyphs(animation: &Animation) -> BTreeSet<char> {
    animation.frames.iter().flat_map(|grid| grid.rows().flatten().copied()).collect()
}

/// Draws every frame into `out_dir` as `frame_00000.png`, ...
///
/// Frames are independent, so they are drawn and encoded in parallel. On
/// failure the frames already written are removed again.
pub fn write_images<F>(animation: &Animation, style: &Style, out_dir: &Path, progress: F) -> Result<Vec<PathBuf>>
where
    F: Fn(Progress) + Send + Sync,
{
    let font = load_font(style.font_path.as_deref())?;
    let atlas = GlyphAtlas::new(&font, style.font_size as f32, style.cell_width, style.cell_height, used_glyphs(animation));
    write_images_with_atlas(animation, &atlas, style, out_dir, progress)
}

pub fn write_images_with_atlas<F>(animation: &Animation, atlas: &GlyphAtlas, style: &Style, out_dir: &Path, progress: F) -> Result<Vec<PathBuf>>
where
    F: Fn(Progress) + Send + Sync,
{
    fs::create_dir_all(out_dir).map_err(|e| Error::write_failed(out_dir, e))?;
    let total = animation.len();
    let completed = AtomicUsize::new(0);
    let written = Mutex::new(Vec::with_capacity(total));
    progress(Progress::writing(0, total));

    let result = animation.frames.par_iter().enumerate().try_for_each(|(index, grid)| -> Result<()> {
        let path = out_dir.join(frame_file_name(index, "png"));
        atlas
            .draw(grid, style.foreground, style.background)
            .save(&path)
            .map_err(|e| Error::write_failed(&path, std::io::Error::other(e)))?;
        record(&written, path);
        let current = completed.fetch_add(1, Ordering::SeqCst) + 1;
        progress(Progress::writing(current, total));
        Ok(())
    });

    let mut written = written.into_inner().unwrap_or_else(PoisonError::into_inner);
    if let Err(e) = result {
        remove_written(&written);
        return Err(e);
    }
    written.sort();
    let (cw, ch) = atlas.cell_size();
    log::info!(
        "wrote {} images of {}x{} px to {}",
        written.len(),
        animation.size.width * cw,
        animation.size.height * ch,
        out_dir.display()
    );
    Ok(written)
}

/// Remembers a finished frame for cleanup, even behind a poisoned lock.
fn record(written: &Mutex<Vec<PathBuf>>, path: PathBuf) {
    written.lock().unwrap_or_else(PoisonError::into_inner).push(path);
}
