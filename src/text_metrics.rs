use crate::error::{RenderError, Result};
use resvg::tiny_skia::{Path, PathBuilder};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use ttf_parser::{Face, OutlineBuilder};
use unicode_segmentation::UnicodeSegmentation;

/// Horizontal metrics and (optionally) outlines of one font at one size.
pub trait Typeface: Send + Sync {
    fn size(&self) -> f32;

    /// Advance of `ch` in pixels.
    fn advance(&self, ch: char) -> f32;

    fn ascent(&self) -> f32;

    /// Distance below the baseline, positive.
    fn descent(&self) -> f32;

    /// Glyph outline in pixels, origin on the baseline at the pen position,
    /// y pointing down. `None` for blank glyphs or metric-only faces.
    fn outline(&self, _ch: char) -> Option<Path> {
        None
    }
}

/// A TrueType/OpenType face at a fixed pixel size.
pub struct Font {
    name: String,
    data: Arc<Vec<u8>>,
    index: u32,
    size: f32,
    scale: f32,
    ascent: f32,
    descent: f32,
    ascii_advances: [u16; 128],
    glyphs: Mutex<HashMap<char, Glyph>>,
}

/// Scaled metrics of one character, filled on first use.
#[derive(Clone)]
struct Glyph {
    advance: f32,
    outline: Option<Path>,
}

impl Font {
    pub fn from_data(name: &str, data: Arc<Vec<u8>>, index: u32, size: f32) -> Result<Self> {
        let face = Face::parse(&data, index).map_err(|err| RenderError::InvalidFont {
            name: name.to_string(),
            reason: err.to_string(),
        })?;
        let units_per_em = face.units_per_em().max(1);
        let scale = size / units_per_em as f32;
        let mut ascii_advances = [0u16; 128];
        for byte in 0u8..=127 {
            if let Some(glyph_id) = face.glyph_index(byte as char) {
                ascii_advances[byte as usize] = face.glyph_hor_advance(glyph_id).unwrap_or(0);
            }
        }
        let ascent = face.ascender() as f32 * scale;
        let descent = -(face.descender() as f32) * scale;
        Ok(Self {
            name: name.to_string(),
            data,
            index,
            size,
            scale,
            ascent,
            descent,
            ascii_advances,
            glyphs: Mutex::new(HashMap::new()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn glyph(&self, ch: char) -> Glyph {
        if let Ok(cache) = self.glyphs.lock()
            && let Some(glyph) = cache.get(&ch)
        {
            return glyph.clone();
        }
        let glyph = self.load_glyph(ch);
        if let Ok(mut cache) = self.glyphs.lock() {
            cache.insert(ch, glyph.clone());
        }
        glyph
    }

    fn load_glyph(&self, ch: char) -> Glyph {
        let missing = Glyph {
            advance: self.fallback_advance(),
            outline: None,
        };
        let Ok(face) = Face::parse(&self.data, self.index) else {
            return missing;
        };
        let Some(glyph_id) = face.glyph_index(ch) else {
            return missing;
        };
        let mut builder = GlyphPathBuilder {
            builder: PathBuilder::new(),
            scale: self.scale,
        };
        let outline = face
            .outline_glyph(glyph_id, &mut builder)
            .and_then(|_| builder.builder.finish());
        Glyph {
            advance: face.glyph_hor_advance(glyph_id).unwrap_or(0) as f32 * self.scale,
            outline,
        }
    }

    fn fallback_advance(&self) -> f32 {
        self.size * 0.56
    }
}

impl Typeface for Font {
    fn size(&self) -> f32 {
        self.size
    }

    fn advance(&self, ch: char) -> f32 {
        if ch.is_ascii() {
            let advance = self.ascii_advances[ch as usize];
            return if advance == 0 && !ch.is_ascii_control() {
                self.fallback_advance()
            } else {
                advance as f32 * self.scale
            };
        }
        self.glyph(ch).advance
    }

    fn ascent(&self) -> f32 {
        self.ascent
    }

    fn descent(&self) -> f32 {
        self.descent
    }

    fn outline(&self, ch: char) -> Option<Path> {
        self.glyph(ch).outline
    }
}

/// Converts font-unit outlines (y up) into pixel paths (y down).
struct GlyphPathBuilder {
    builder: PathBuilder,
    scale: f32,
}

impl OutlineBuilder for GlyphPathBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        self.builder.move_to(x * self.scale, -y * self.scale);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.builder.line_to(x * self.scale, -y * self.scale);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let s = self.scale;
        self.builder.quad_to(x1 * s, -y1 * s, x * s, -y * s);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let s = self.scale;
        self.builder
            .cubic_to(x1 * s, -y1 * s, x2 * s, -y2 * s, x * s, -y * s);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}

/// Metric-only typeface for layout work without a font file: calibrated
/// per-character widths, or a fixed advance for every character.
#[derive(Debug, Clone, Copy)]
pub struct ApproxMetrics {
    size: f32,
    fixed_advance: Option<f32>,
}

impl ApproxMetrics {
    pub fn new(size: f32) -> Self {
        Self {
            size,
            fixed_advance: None,
        }
    }

    pub fn fixed(size: f32, advance: f32) -> Self {
        Self {
            size,
            fixed_advance: Some(advance),
        }
    }
}

impl Typeface for ApproxMetrics {
    fn size(&self) -> f32 {
        self.size
    }

    fn advance(&self, ch: char) -> f32 {
        match self.fixed_advance {
            Some(advance) => advance,
            None => char_width_factor(ch) * self.size,
        }
    }

    fn ascent(&self) -> f32 {
        self.size * 0.9
    }

    fn descent(&self) -> f32 {
        self.size * 0.25
    }
}

pub(crate) fn char_width_factor(ch: char) -> f32 {
    // Arial-like proportions at 1px per em.
    match ch {
        ' ' => 0.278,
        '\u{200D}' | '\u{FE00}'..='\u{FE0F}' => 0.0,
        '\\' | '.' | ',' | ':' | ';' | '|' | '!' | '(' | ')' | '[' | ']' | '{' | '}' => 0.321,
        'A' => 0.652,
        'B' => 0.648,
        'C' => 0.734,
        'D' => 0.723,
        'E' => 0.594,
        'F' => 0.575,
        'G' | 'H' => 0.742,
        'I' => 0.272,
        'J' => 0.557,
        'K' => 0.648,
        'L' => 0.559,
        'M' => 0.903,
        'N' => 0.763,
        'O' => 0.754,
        'P' => 0.623,
        'Q' => 0.755,
        'R' => 0.637,
        'S' => 0.633,
        'T' => 0.599,
        'U' => 0.746,
        'V' => 0.661,
        'W' => 0.958,
        'X' => 0.655,
        'Y' => 0.646,
        'Z' => 0.621,
        'a' => 0.550,
        'b' => 0.603,
        'c' => 0.547,
        'd' => 0.609,
        'e' => 0.570,
        'f' => 0.340,
        'g' | 'h' => 0.600,
        'i' => 0.235,
        'j' => 0.227,
        'k' => 0.522,
        'l' => 0.239,
        'm' => 0.867,
        'n' => 0.585,
        'o' => 0.574,
        'p' => 0.595,
        'q' => 0.585,
        'r' => 0.364,
        's' => 0.523,
        't' => 0.305,
        'u' => 0.585,
        'v' => 0.545,
        'w' => 0.811,
        'x' => 0.538,
        'y' => 0.556,
        'z' => 0.550,
        '0' => 0.613,
        '1' => 0.396,
        '2' => 0.609,
        '3' => 0.597,
        '4' => 0.614,
        '5' => 0.586,
        '6' => 0.608,
        '7' => 0.559,
        '8' => 0.611,
        '9' => 0.595,
        '@' | '#' | '%' | '&' => 0.946,
        _ => 0.568,
    }
}

/// True when the grapheme cluster should be drawn from the emoji bitmap
/// source instead of font outlines.
pub fn is_emoji_cluster(cluster: &str) -> bool {
    cluster.chars().any(|ch| {
        matches!(ch as u32,
            0x1F000..=0x1FAFF
            | 0x2600..=0x27BF
            | 0x2B00..=0x2BFF
            | 0x231A..=0x23FF
            | 0xFE0F)
    })
}

/// Asset key of an emoji cluster: lowercase hex code points joined by `-`,
/// without the emoji presentation selector (`"1f469-200d-1f4bb"`).
pub fn emoji_key(cluster: &str) -> String {
    cluster
        .chars()
        .filter(|ch| *ch != '\u{FE0F}')
        .map(|ch| format!("{:x}", ch as u32))
        .collect::<Vec<_>>()
        .join("-")
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TextSize {
    pub width: f32,
    pub height: f32,
}

/// Measures text against one typeface. The same measurer serves the layout
/// pass and the draw pass, so both agree on every advance.
#[derive(Clone)]
pub struct TextMeasurer {
    face: Arc<dyn Typeface>,
}

impl TextMeasurer {
    pub fn new(face: Arc<dyn Typeface>) -> Self {
        Self { face }
    }

    pub fn typeface(&self) -> &dyn Typeface {
        self.face.as_ref()
    }

    pub fn font_size(&self) -> f32 {
        self.face.size()
    }

    pub fn ascent(&self) -> f32 {
        self.face.ascent()
    }

    pub fn line_height(&self) -> f32 {
        self.face.ascent() + self.face.descent()
    }

    /// Emoji clusters take exactly one em; everything else is the sum of
    /// its characters' advances.
    pub fn cluster_advance(&self, cluster: &str) -> f32 {
        if is_emoji_cluster(cluster) {
            return self.face.size();
        }
        cluster.chars().map(|ch| self.face.advance(ch)).sum()
    }

    pub fn text_width(&self, text: &str) -> f32 {
        text.graphemes(true)
            .filter(|g| *g != "\n")
            .map(|g| self.cluster_advance(g))
            .sum::<f32>()
            .max(0.0)
    }

    /// Size of a single line of text.
    pub fn measure(&self, text: &str) -> TextSize {
        TextSize {
            width: self.text_width(text),
            height: self.line_height(),
        }
    }

    /// Size of already wrapped lines stacked with `spacing` between them.
    pub fn block_size(&self, lines: &[String], spacing: f32) -> TextSize {
        if lines.is_empty() {
            return TextSize::default();
        }
        let width = lines
            .iter()
            .map(|line| self.text_width(line))
            .fold(0.0, f32::max);
        let count = lines.len() as f32;
        TextSize {
            width,
            height: count * self.line_height() + (count - 1.0) * spacing,
        }
    }
}
