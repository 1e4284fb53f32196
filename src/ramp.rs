use crate::error::{Error, Result};

/// Default ramp, sparsest to densest.
pub const DEFAULT_RAMP: &str = " .,-~:;=!*#$@";

/// Paul Bourke's 70-level ramp.
pub const STANDARD_RAMP: &str = " .'`^\",:;Il!i><~+_-?][}{1)(|/tfjrxnuvczXYUJCLQ0OZmwqpdbkhao*#MW&8%B@$";

pub const COMPACT_RAMP: &str = " .:-=+*#%@";

pub const BLOCK_RAMP: &str = " ░▒▓█";

/// Named ramps selectable from the command line.
pub const RAMP_PRESETS: &[(&str, &str)] = &[
    ("classic", DEFAULT_RAMP),
    ("standard", STANDARD_RAMP),
    ("compact", COMPACT_RAMP),
    ("blocks", BLOCK_RAMP),
];

/// Ordered glyphs from darkest (index 0) to brightest (index `len - 1`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GlyphRamp {
    glyphs: Vec<char>,
}

impl GlyphRamp {
    /// Builds a ramp from a string, one glyph per `char`.
    ///
    /// Rejects empty ramps and ramps holding control characters (line breaks
    /// would corrupt the row structure of every frame).
    pub fn new(glyphs: &str) -> Result<Self> {
        let glyphs: Vec<char> = glyphs.chars().collect();
        if glyphs.is_empty() {
            return Err(Error::InvalidConfig("glyph ramp cannot be empty".into()));
        }
        if let Some(bad) = glyphs.iter().find(|c| c.is_control()) {
            return Err(Error::InvalidConfig(format!(
                "glyph ramp contains control character {:?}",
                bad
            )));
        }
        Ok(Self { glyphs })
    }

    /// Looks up a ramp by preset name (case-insensitive).
    pub fn preset(name: &str) -> Result<Self> {
        let (_, glyphs) = RAMP_PRESETS
            .iter()
            .find(|(preset, _)| preset.eq_ignore_ascii_case(name.trim()))
            .ok_or_else(|| {
                let available = RAMP_PRESETS.iter().map(|(n, _)| *n).collect::<Vec<_>>().join(", ");
                Error::InvalidConfig(format!("unknown ramp preset '{}'. Available presets: {}", name, available))
            })?;
        Self::new(glyphs)
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    /// Always false for a constructed ramp.
    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }

    /// Glyph at `index`, saturating at the densest glyph.
    pub fn glyph(&self, index: usize) -> char {
        self.glyphs[index.min(self.glyphs.len() - 1)]
    }

    pub fn glyphs(&self) -> &[char] {
        &self.glyphs
    }
}

impl Default for GlyphRamp {
    fn default() -> Self {
        Self {
            glyphs: DEFAULT_RAMP.chars().collect(),
        }
    }
}

impl std::fmt::Display for GlyphRamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.glyphs.iter().try_for_each(|c| write!(f, "{}", c))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ramp_runs_space_to_at() {
        let ramp = GlyphRamp::default();
        assert_eq!(ramp.len(), 13);
        assert_eq!(ramp.glyph(0), ' ');
        assert_eq!(ramp.glyph(12), '@');
    }

    #[test]
    fn glyph_saturates_past_end() {
        let ramp = GlyphRamp::new(" .#").unwrap();
        assert_eq!(ramp.glyph(99), '#');
    }

    #[test]
    fn rejects_empty_and_control_ramps() {
        assert!(matches!(GlyphRamp::new(""), Err(Error::InvalidConfig(_))));
        assert!(matches!(GlyphRamp::new(" .\n#"), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn unicode_ramp_counts_chars_not_bytes() {
        let ramp = GlyphRamp::preset("blocks").unwrap();
        assert_eq!(ramp.len(), 5);
        assert_eq!(ramp.glyph(4), '█');
        assert_eq!(ramp.to_string(), BLOCK_RAMP);
    }

    #[test]
    fn unknown_preset_lists_available() {
        let err = GlyphRamp::preset("nope").unwrap_err().to_string();
        assert!(err.contains("classic"));
    }
}
