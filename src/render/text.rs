use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::grid::Animation;
use crate::pipeline::Progress;
use crate::render::{frame_file_name, remove_written};

/// Writes each frame as `frame_00000.txt`, ... with a trailing newline.
pub fn write_text_frames<F>(animation: &Animation, out_dir: &Path, progress: F) -> Result<Vec<PathBuf>>
where
    F: Fn(Progress),
{
    fs::create_dir_all(out_dir).map_err(|e| Error::write_failed(out_dir, e))?;
    let total = animation.len();
    let mut written = Vec::with_capacity(total);

    for (index, grid) in animation.frames.iter().enumerate() {
        let path = out_dir.join(frame_file_name(index, "txt"));
        let mut text = grid.to_text();
        text.push('\n');
        if let Err(e) = fs::write(&path, text) {
            remove_written(&written);
            return Err(Error::write_failed(path, e));
        }
        written.push(path);
        progress(Progress::writing(index + 1, total));
    }

    log::info!("wrote {} text frames to {}", written.len(), out_dir.display());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::{GlyphGrid, GridSize};
    use crate::quantize::BrightnessRange;

    #[test]
    fn frames_are_numbered_text_files() {
        let dir = tempfile::tempdir().unwrap();
        let size = GridSize::new(2, 2).unwrap();
        let anim = Animation {
            frames: vec![
                GlyphGrid::from_parts(size, " ##.".chars().collect(), None),
                GlyphGrid::from_parts(size, "....".chars().collect(), None),
            ],
            fps: 15.0,
            size,
            range: BrightnessRange::full(),
        };
        let seen = std::cell::Cell::new(0);
        let written = write_text_frames(&anim, dir.path(), |p| seen.set(p.completed)).unwrap();

        assert_eq!(written.len(), 2);
        assert_eq!(fs::read_to_string(dir.path().join("frame_00000.txt")).unwrap(), " #\n#.\n");
        assert_eq!(fs::read_to_string(dir.path().join("frame_00001.txt")).unwrap(), "..\n..\n");
        assert_eq!(seen.get(), 2);
    }
}
