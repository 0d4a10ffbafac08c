//! Font loading, text measurement and glyph outlines using `ttf-parser`.
//!
//! Families are looked up by name through the comma-separated preference list
//! of a [`FontDescriptor`]. [`FontManager::default`] registers the Helvetica,
//! Times and Courier faces bundled with printpdf, and common family names
//! (`Arial`, `Georgia`, `serif`, `monospace`, ...) resolve to them unless a
//! font with that name was loaded. A manager with no faces at all falls back
//! to Helvetica-like synthetic metrics: text can still be measured and
//! positioned, but has no outlines to paint.

use std::collections::HashMap;
use std::path::Path;

use printpdf::BuiltinFont;
use tiny_skia::{Path as SkPath, PathBuilder};
use ttf_parser::{name_id, Face, GlyphId, OutlineBuilder};

use crate::layout_config::FontDescriptor;

/// Faces bundled with printpdf: (family, bold, face).
const BUILTIN_FACES: [(&str, bool, BuiltinFont); 6] = [
    ("Helvetica", false, BuiltinFont::Helvetica),
    ("Helvetica", true, BuiltinFont::HelveticaBold),
    ("Times", false, BuiltinFont::TimesRoman),
    ("Times", true, BuiltinFont::TimesBold),
    ("Courier", false, BuiltinFont::Courier),
    ("Courier", true, BuiltinFont::CourierBold),
];

/// Family names served by a bundled face when no font of that name is loaded.
const FAMILY_ALIASES: [(&str, &str); 10] = [
    ("arial", "helvetica"),
    ("sans-serif", "helvetica"),
    ("georgia", "times"),
    ("times new roman", "times"),
    ("serif", "times"),
    ("courier new", "courier"),
    ("consolas", "courier"),
    ("monospace", "courier"),
    ("system-ui", "helvetica"),
    ("cursive", "times"),
];

/// Advance used for whitespace the font has no glyph for, in ems.
const MISSING_SPACE_ADVANCE: f32 = 0.28;

/// A loaded font face with metrics.
#[derive(Clone)]
pub struct FontData {
    /// Raw font bytes (kept alive for ttf-parser's zero-copy API). Empty for
    /// the synthetic fallback.
    pub bytes: Vec<u8>,
    pub units_per_em: f32,
    pub ascender: f32,
    pub descender: f32,
}

impl FontData {
    fn synthetic() -> Self {
        Self {
            bytes: Vec::new(),
            units_per_em: 1000.0,
            ascender: 750.0,
            descender: -250.0,
        }
    }
}

#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct FontKey {
    /// Lowercased family name.
    pub family: String,
    pub bold: bool,
    pub italic: bool,
}

impl FontKey {
    pub fn new(family: &str, bold: bool, italic: bool) -> Self {
        Self {
            family: family.trim().to_lowercase(),
            bold,
            italic,
        }
    }
}

/// Manages loaded fonts.
pub struct FontManager {
    fonts: HashMap<FontKey, FontData>,
    default_key: FontKey,
}

impl FontManager {
    /// An empty manager. Until a font is loaded, text is measured with
    /// synthetic metrics and has no outlines.
    pub fn new() -> Self {
        Self {
            fonts: HashMap::new(),
            default_key: FontKey::new("Helvetica", false, false),
        }
    }

    /// Load a TTF/OTF font from bytes under an explicit family name.
    pub fn load_font(
        &mut self,
        family: &str,
        bold: bool,
        italic: bool,
        bytes: Vec<u8>,
    ) -> Result<(), String> {
        let face = Face::parse(&bytes, 0).map_err(|e| format!("Failed to parse font: {e}"))?;
        let data = FontData {
            units_per_em: face.units_per_em() as f32,
            ascender: face.ascender() as f32,
            descender: face.descender() as f32,
            bytes,
        };
        let key = FontKey::new(family, bold, italic);
        if !self.has_real_fonts() {
            self.default_key = key.clone();
        }
        self.fonts.insert(key, data);
        Ok(())
    }

    /// Load a font file, taking family and style from the font's own tables.
    pub fn load_file(&mut self, path: &Path) -> Result<String, String> {
        let bytes = std::fs::read(path).map_err(|e| format!("{}: {e}", path.display()))?;
        let (family, bold, italic) = {
            let face = Face::parse(&bytes, 0)
                .map_err(|e| format!("Failed to parse font {}: {e}", path.display()))?;
            let family = face
                .names()
                .into_iter()
                .filter(|n| n.name_id == name_id::FAMILY)
                .find_map(|n| n.to_string())
                .ok_or_else(|| format!("{} has no family name", path.display()))?;
            // Some faces only declare boldness through the weight class.
            let bold = face.is_bold() || face.weight().to_number() >= 600;
            (family, bold, face.is_italic())
        };
        self.load_font(&family, bold, italic, bytes)?;
        log::debug!("Loaded font '{family}' (bold={bold}, italic={italic}) from {}", path.display());
        Ok(family)
    }

    /// Load every `.ttf` / `.otf` file in `dir`. Unreadable files are skipped
    /// with a warning. Returns how many fonts were registered.
    pub fn load_dir(&mut self, dir: &Path) -> std::io::Result<usize> {
        let mut loaded = 0;
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let is_font = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| matches!(e.to_ascii_lowercase().as_str(), "ttf" | "otf"))
                .unwrap_or(false);
            if !is_font {
                continue;
            }
            match self.load_file(&path) {
                Ok(_) => loaded += 1,
                Err(e) => log::warn!("Skipping font: {e}"),
            }
        }
        Ok(loaded)
    }

    /// Register the faces bundled with printpdf. Helvetica becomes the
    /// default unless real fonts were loaded before.
    pub fn load_builtin_fonts(&mut self) {
        for (family, bold, builtin) in BUILTIN_FACES {
            let bytes = builtin.get_subset_font().bytes;
            if let Err(e) = self.load_font(family, bold, false, bytes) {
                log::warn!("Bundled font {builtin:?} unusable: {e}");
            }
        }
    }

    /// Resolve a descriptor to loaded font data.
    ///
    /// Tries each family in preference order, first by its own name and then
    /// through [`FAMILY_ALIASES`], each with the requested weight before the
    /// other one. Falls back to the default font.
    pub fn resolve(&self, font: &FontDescriptor) -> &FontData {
        let bold = font.is_bold();
        for family in font.families() {
            let family = family.to_lowercase();
            let alias = FAMILY_ALIASES
                .iter()
                .find(|(name, _)| *name == family)
                .map(|(_, target)| *target);
            for name in std::iter::once(family.as_str()).chain(alias) {
                for weight in [bold, !bold] {
                    if let Some(data) = self.fonts.get(&FontKey::new(name, weight, false)) {
                        return data;
                    }
                }
            }
        }
        self.default_data()
    }

    fn default_data(&self) -> &FontData {
        static SYNTHETIC: std::sync::OnceLock<FontData> = std::sync::OnceLock::new();
        self.fonts
            .get(&self.default_key)
            .unwrap_or_else(|| SYNTHETIC.get_or_init(FontData::synthetic))
    }

    /// Width of `text` in pixels. Real glyph advances when font bytes are
    /// loaded, otherwise ≈ 0.5 × size per char (0.55 for bold).
    pub fn measure_text_width(&self, text: &str, font: &FontDescriptor) -> f32 {
        let data = self.resolve(font);
        if data.bytes.is_empty() {
            let avg = if font.is_bold() { 0.55 } else { 0.5 };
            return text.chars().count() as f32 * font.size * avg;
        }
        match Face::parse(&data.bytes, 0) {
            Ok(face) => {
                let scale = font.size / data.units_per_em;
                text.chars()
                    .map(|ch| glyph_advance(&face, ch, scale, font.size).1)
                    .sum()
            }
            Err(_) => text.chars().count() as f32 * font.size * 0.5,
        }
    }

    /// Offset from the anchor y to the baseline so the em box is vertically
    /// centred on the anchor.
    pub fn middle_baseline_offset(&self, font: &FontDescriptor) -> f32 {
        let data = self.resolve(font);
        let scale = font.size / data.units_per_em;
        (data.ascender + data.descender) / 2.0 * scale
    }

    /// Outline of `text` with its baseline starting at `(x, baseline)`.
    ///
    /// `None` when the resolved font has no outlines (synthetic metrics) or
    /// the text has no visible glyphs.
    pub fn text_path(&self, text: &str, font: &FontDescriptor, x: f32, baseline: f32) -> Option<SkPath> {
        let data = self.resolve(font);
        if data.bytes.is_empty() {
            return None;
        }
        let face = Face::parse(&data.bytes, 0).ok()?;
        let scale = font.size / data.units_per_em;
        let mut sink = GlyphSink {
            builder: PathBuilder::new(),
            scale,
            origin_x: x,
            baseline,
        };
        for ch in text.chars() {
            let (glyph, advance) = glyph_advance(&face, ch, scale, font.size);
            if let Some(gid) = glyph {
                face.outline_glyph(gid, &mut sink);
            }
            sink.origin_x += advance;
        }
        sink.builder.finish()
    }

    /// Whether the default font has real bytes (and therefore outlines).
    pub fn has_real_fonts(&self) -> bool {
        self.fonts
            .get(&self.default_key)
            .map(|d| !d.bytes.is_empty())
            .unwrap_or(false)
    }
}

impl Default for FontManager {
    fn default() -> Self {
        let mut mgr = Self::new();
        mgr.load_builtin_fonts();
        mgr
    }
}

/// Glyph for `ch` (never `.notdef`) and its advance in pixels.
fn glyph_advance(face: &Face<'_>, ch: char, scale: f32, size: f32) -> (Option<GlyphId>, f32) {
    match face.glyph_index(ch).filter(|gid| gid.0 != 0) {
        Some(gid) => (Some(gid), face.glyph_hor_advance(gid).unwrap_or(0) as f32 * scale),
        None if ch.is_whitespace() => (None, size * MISSING_SPACE_ADVANCE),
        None => (None, size * 0.5),
    }
}

/// Converts font-unit outlines (y up) into canvas pixels (y down).
struct GlyphSink {
    builder: PathBuilder,
    scale: f32,
    origin_x: f32,
    baseline: f32,
}

impl GlyphSink {
    fn pt(&self, x: f32, y: f32) -> (f32, f32) {
        (self.origin_x + x * self.scale, self.baseline - y * self.scale)
    }
}

impl OutlineBuilder for GlyphSink {
    fn move_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.pt(x, y);
        self.builder.move_to(x, y);
    }

    fn line_to(&mut self, x: f32, y: f32) {
        let (x, y) = self.pt(x, y);
        self.builder.line_to(x, y);
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        let (x1, y1) = self.pt(x1, y1);
        let (x, y) = self.pt(x, y);
        self.builder.quad_to(x1, y1, x, y);
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        let (x1, y1) = self.pt(x1, y1);
        let (x2, y2) = self.pt(x2, y2);
        let (x, y) = self.pt(x, y);
        self.builder.cubic_to(x1, y1, x2, y2, x, y);
    }

    fn close(&mut self) {
        self.builder.close();
    }
}
