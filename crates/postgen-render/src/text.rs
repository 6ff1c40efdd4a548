//! Text layout and rasterization.
//!
//! Layout is greedy word wrapping against real font metrics, followed by
//! top-down or bottom-up baseline placement. Measuring requires a
//! [`Typeface`], which only exists once a font has been resolved, so wrapping
//! against a not-yet-loaded font cannot happen. A bold sans face ships inside
//! the crate, so text is drawn even on hosts without system fonts.

use std::fmt;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use fontdue::{Font, FontSettings};
use postgen_core::{AnchorMode, Color, FrameBuffer, PostError, PostResult, TextConfig, TextPlacement};

use crate::blur::blur_plane;

/// Families tried after the configured one when searching system fonts.
const FALLBACK_FAMILIES: [&str; 5] = ["Helvetica", "Arial", "DejaVu Sans", "Liberation Sans", "Noto Sans"];

/// Built-in face (DejaVu Sans Bold, Bitstream Vera license; see
/// `assets/DejaVuSans-LICENSE.txt`).
static EMBEDDED_FONT_BYTES: &[u8] = include_bytes!("../assets/DejaVuSans-Bold.ttf");

static EMBEDDED_FONT: OnceLock<Option<Arc<Font>>> = OnceLock::new();

/// Parse the built-in face once per process.
fn embedded_font() -> Option<Arc<Font>> {
    EMBEDDED_FONT
        .get_or_init(|| match Font::from_bytes(EMBEDDED_FONT_BYTES, FontSettings::default()) {
            Ok(font) => Some(Arc::new(font)),
            Err(e) => {
                tracing::error!("Embedded font failed to parse: {}", e);
                None
            }
        })
        .clone()
}

/// Advance of a non-space glyph under fallback metrics, in em.
const FALLBACK_ADVANCE_EM: f32 = 0.55;
/// Advance of a space under fallback metrics, in em.
const FALLBACK_SPACE_EM: f32 = 0.28;

/// A font that is ready for measuring and drawing, or the fallback used
/// when no font could be loaded.
#[derive(Clone)]
pub enum Typeface {
    Ready(Arc<Font>),
    /// Approximate fixed-advance metrics; draws nothing. Only reached when
    /// even the built-in face cannot be parsed.
    Fallback,
}

impl fmt::Debug for Typeface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Typeface::Ready(_) => f.write_str("Typeface::Ready"),
            Typeface::Fallback => f.write_str("Typeface::Fallback"),
        }
    }
}

impl Typeface {
    /// Resolve the configured font: explicit file first, then a bold system
    /// face of the configured family or common sans-serif families, then the
    /// built-in face.
    pub fn load(config: &TextConfig) -> Typeface {
        if let Some(path) = &config.font_path {
            match Self::from_file(path) {
                Ok(face) => {
                    tracing::info!("Loaded font from {}", path.display());
                    return face;
                }
                Err(e) => tracing::warn!("Configured font unusable: {}", e),
            }
        }

        if let Some((data, index)) = find_system_font(&config.font_family) {
            match Self::from_bytes_indexed(data, index) {
                Ok(face) => {
                    tracing::info!("Loaded system font for family '{}'", config.font_family);
                    return face;
                }
                Err(e) => tracing::warn!("System font for '{}' unusable: {}", config.font_family, e),
            }
        }

        tracing::info!("No system font for '{}'; using the built-in face", config.font_family);
        Self::embedded()
    }

    /// The built-in face, or `Fallback` if it cannot be parsed.
    pub fn embedded() -> Typeface {
        match embedded_font() {
            Some(font) => Typeface::Ready(font),
            None => {
                tracing::warn!("Text will be measured with fallback metrics and not drawn");
                Typeface::Fallback
            }
        }
    }

    /// Parse a TTF/OTF file.
    pub fn from_file(path: &Path) -> PostResult<Typeface> {
        let data = std::fs::read(path)
            .map_err(|e| PostError::Font(format!("failed to read font file {}: {}", path.display(), e)))?;
        Self::from_bytes(data)
    }

    /// Parse TTF/OTF bytes.
    pub fn from_bytes(data: Vec<u8>) -> PostResult<Typeface> {
        Self::from_bytes_indexed(data, 0)
    }

    fn from_bytes_indexed(data: Vec<u8>, collection_index: u32) -> PostResult<Typeface> {
        let settings = FontSettings {
            collection_index,
            ..FontSettings::default()
        };
        let font = Font::from_bytes(data, settings)
            .map_err(|e| PostError::Font(format!("failed to parse font: {}", e)))?;
        Ok(Typeface::Ready(Arc::new(font)))
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Typeface::Ready(_))
    }

    /// Advance width of `text` at `font_size` pixels.
    pub fn measure(&self, text: &str, font_size: f32) -> f32 {
        match self {
            Typeface::Ready(font) => {
                let mut width = 0.0;
                let mut prev: Option<char> = None;
                for ch in text.chars() {
                    if let Some(left) = prev {
                        width += font.horizontal_kern(left, ch, font_size).unwrap_or(0.0);
                    }
                    width += font.metrics(ch, font_size).advance_width;
                    prev = Some(ch);
                }
                width
            }
            Typeface::Fallback => text
                .chars()
                .map(|ch| {
                    if ch.is_whitespace() {
                        FALLBACK_SPACE_EM * font_size
                    } else {
                        FALLBACK_ADVANCE_EM * font_size
                    }
                })
                .sum(),
        }
    }
}

fn find_system_font(family: &str) -> Option<(Vec<u8>, u32)> {
    let mut db = fontdb::Database::new();
    db.load_system_fonts();

    let mut families = vec![fontdb::Family::Name(family)];
    families.extend(FALLBACK_FAMILIES.iter().map(|name| fontdb::Family::Name(name)));
    families.push(fontdb::Family::SansSerif);

    let query = fontdb::Query {
        families: &families,
        weight: fontdb::Weight::BOLD,
        ..fontdb::Query::default()
    };
    let id = db.query(&query)?;
    db.with_face_data(id, |data, index| (data.to_vec(), index))
}

/// Greedy word wrap. Words are whitespace-delimited and joined by single
/// spaces; a line only breaks between words, so a word wider than
/// `max_width` stays whole on a line of its own.
pub fn wrap(text: &str, typeface: &Typeface, font_size: f32, max_width: f32) -> Vec<String> {
    let mut lines = Vec::new();
    let mut line = String::new();

    for word in text.split_whitespace() {
        if line.is_empty() {
            line.push_str(word);
            continue;
        }
        let candidate = format!("{} {}", line, word);
        if typeface.measure(&candidate, font_size) > max_width {
            lines.push(std::mem::replace(&mut line, word.to_string()));
        } else {
            line = candidate;
        }
    }
    if !line.is_empty() {
        lines.push(line);
    }
    lines
}

/// Baseline y for each of `count` lines.
///
/// Top-down: line `i` sits at `anchor_y + i * line_height`.
/// Bottom-up: the last line sits exactly at `anchor_y`, earlier lines above.
pub fn baselines(count: usize, anchor_y: f32, line_height: f32, mode: AnchorMode) -> Vec<f32> {
    (0..count)
        .map(|i| match mode {
            AnchorMode::TopDown => anchor_y + i as f32 * line_height,
            AnchorMode::BottomUp => anchor_y - (count - 1 - i) as f32 * line_height,
        })
        .collect()
}

/// A wrapped line with its pen origin.
#[derive(Debug, Clone, PartialEq)]
pub struct LaidOutLine {
    pub text: String,
    pub x: f32,
    pub baseline: f32,
}

/// Wrap and position `text` according to `placement`.
pub fn layout(text: &str, typeface: &Typeface, placement: &TextPlacement) -> Vec<LaidOutLine> {
    let lines = wrap(text, typeface, placement.font_size, placement.max_width);
    let ys = baselines(lines.len(), placement.anchor_y, placement.line_height, placement.mode);
    lines
        .into_iter()
        .zip(ys)
        .map(|(text, baseline)| LaidOutLine {
            text,
            x: placement.anchor_x,
            baseline,
        })
        .collect()
}

/// Fill and drop-shadow settings for slide text.
#[derive(Debug, Clone)]
pub struct TextStyle {
    pub color: Color,
    pub shadow_color: Color,
    /// Shadow blur in canvas units; the Gaussian sigma is half of this.
    pub shadow_blur: f32,
    pub shadow_offset: (i32, i32),
}

impl From<&TextConfig> for TextStyle {
    fn from(config: &TextConfig) -> Self {
        Self {
            color: config.color,
            shadow_color: config.shadow_color,
            shadow_blur: config.shadow_blur,
            shadow_offset: (config.shadow_offset_x, config.shadow_offset_y),
        }
    }
}

/// Draws laid-out text with a soft drop shadow onto a frame buffer.
#[derive(Debug, Clone)]
pub struct TextRenderer {
    typeface: Typeface,
    style: TextStyle,
}

impl TextRenderer {
    pub fn new(typeface: Typeface, style: TextStyle) -> Self {
        Self { typeface, style }
    }

    /// Lay out and draw `text`. Empty text draws nothing; returns the lines
    /// that were laid out.
    pub fn draw(&self, fb: &mut FrameBuffer, text: &str, placement: &TextPlacement) -> Vec<LaidOutLine> {
        let lines = layout(text, &self.typeface, placement);
        if lines.is_empty() {
            return lines;
        }

        let font = match &self.typeface {
            Typeface::Ready(font) => font,
            Typeface::Fallback => {
                tracing::debug!("Skipping glyph drawing for {} line(s): no font", lines.len());
                return lines;
            }
        };

        let coverage = rasterize_coverage(font, &lines, placement.font_size, fb.width, fb.height);

        let [sr, sg, sb, sa] = self.style.shadow_color.to_rgba8();
        if sa > 0 {
            let (ox, oy) = self.style.shadow_offset;
            let shifted = shift_plane(&coverage, fb.width, fb.height, ox, oy);
            let shadow = blur_plane(&shifted, fb.width, fb.height, self.style.shadow_blur / 2.0);
            paint_plane(fb, &shadow, [sr, sg, sb, sa]);
        }
        paint_plane(fb, &coverage, self.style.color.to_rgba8());

        lines
    }
}

/// Rasterize every line into one canvas-sized coverage plane.
fn rasterize_coverage(font: &Font, lines: &[LaidOutLine], font_size: f32, width: u32, height: u32) -> Vec<u8> {
    let (w, h) = (width as i32, height as i32);
    let mut plane = vec![0u8; (width as usize) * (height as usize)];

    for line in lines {
        let mut pen_x = line.x;
        let baseline = line.baseline.round() as i32;
        let mut prev: Option<char> = None;

        for ch in line.text.chars() {
            if let Some(left) = prev {
                pen_x += font.horizontal_kern(left, ch, font_size).unwrap_or(0.0);
            }
            let (metrics, bitmap) = font.rasterize(ch, font_size);
            let glyph_x = pen_x.round() as i32 + metrics.xmin;
            let glyph_y = baseline - (metrics.height as i32 + metrics.ymin);

            for gy in 0..metrics.height {
                let py = glyph_y + gy as i32;
                if py < 0 || py >= h {
                    continue;
                }
                for gx in 0..metrics.width {
                    let px = glyph_x + gx as i32;
                    if px < 0 || px >= w {
                        continue;
                    }
                    let idx = (py as usize) * (width as usize) + px as usize;
                    plane[idx] = plane[idx].max(bitmap[gy * metrics.width + gx]);
                }
            }

            pen_x += metrics.advance_width;
            prev = Some(ch);
        }
    }

    plane
}

/// Translate a plane by (dx, dy), filling vacated samples with zero.
fn shift_plane(src: &[u8], width: u32, height: u32, dx: i32, dy: i32) -> Vec<u8> {
    let (w, h) = (width as i32, height as i32);
    let mut out = vec![0u8; src.len()];
    for y in 0..h {
        let sy = y - dy;
        if sy < 0 || sy >= h {
            continue;
        }
        for x in 0..w {
            let sx = x - dx;
            if sx < 0 || sx >= w {
                continue;
            }
            out[(y * w + x) as usize] = src[(sy * w + sx) as usize];
        }
    }
    out
}

/// Blend `rgba` through a coverage plane onto the frame buffer.
fn paint_plane(fb: &mut FrameBuffer, plane: &[u8], rgba: [u8; 4]) {
    let width = fb.width as usize;
    for (idx, &coverage) in plane.iter().enumerate() {
        if coverage == 0 {
            continue;
        }
        let alpha = (u32::from(coverage) * u32::from(rgba[3]) + 127) / 255;
        let x = (idx % width) as i32;
        let y = (idx / width) as i32;
        fb.blend_pixel(x, y, [rgba[0], rgba[1], rgba[2], alpha as u8]);
    }
}
