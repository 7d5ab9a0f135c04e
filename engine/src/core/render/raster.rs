//! Software raster surface
//!
//! An RGBA8 buffer implementing [`FrameSurface`] with fontdue glyph
//! rasterization. Text is composed into a coverage mask; strokes dilate the
//! mask by the line radius and shadows are an offset, box-blurred copy.

use std::collections::HashMap;
use std::path::Path;

use fontdue::{Font, FontSettings, Metrics};

use super::frames::{FontSpec, FrameSurface, ShadowSpec};
use super::{RenderError, RenderResult};

/// Horizontal shear applied for italic text
const ITALIC_SHEAR: f32 = 0.2;

type GlyphKey = (char, u32);

/// RGBA8 frame buffer with a single loaded font
pub struct RasterSurface {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
    font: Font,
    glyph_cache: HashMap<GlyphKey, (Metrics, Vec<u8>)>,
}

impl RasterSurface {
    /// Creates a transparent surface drawing with the given TTF/OTF bytes
    pub fn new(width: u32, height: u32, font_bytes: Vec<u8>) -> RenderResult<Self> {
        if width == 0 || height == 0 {
            return Err(RenderError::InvalidDimensions { width, height });
        }
        let font = Font::from_bytes(font_bytes, FontSettings::default())
            .map_err(|e| RenderError::FontLoad(e.to_string()))?;

        Ok(Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4],
            font,
            glyph_cache: HashMap::new(),
        })
    }

    /// Loads the font from a file
    pub fn from_font_file(width: u32, height: u32, font_path: &Path) -> RenderResult<Self> {
        let bytes = std::fs::read(font_path).map_err(|e| {
            RenderError::FontLoad(format!("{}: {}", font_path.display(), e))
        })?;
        Self::new(width, height, bytes)
    }

    fn glyph(&mut self, c: char, size: f32) -> &(Metrics, Vec<u8>) {
        let font = &self.font;
        self.glyph_cache
            .entry((c, size.to_bits()))
            .or_insert_with(|| font.rasterize(c, size))
    }

    /// Coverage mask of `text` anchored at centre-x / bottom-y, padded by `pad`
    fn text_mask(&mut self, text: &str, x: f32, y: f32, font: &FontSpec, pad: usize) -> Option<Mask> {
        let size = font.size_px.max(1.0);
        let width = self.measure_text(text, font);
        let descent = self
            .font
            .horizontal_line_metrics(size)
            .map(|m| m.descent)
            .unwrap_or(-size * 0.2);
        let baseline = y + descent;

        let mut pen = x - width / 2.0;
        let mut placed = Vec::new();
        for c in text.chars() {
            let (metrics, bitmap) = self.glyph(c, size).clone();
            if metrics.width > 0 && metrics.height > 0 {
                let gx = (pen + metrics.xmin as f32).round() as i32;
                let gy = (baseline - metrics.height as f32 - metrics.ymin as f32).round() as i32;
                placed.push((gx, gy, metrics, bitmap));
            }
            pen += metrics.advance_width;
        }

        if placed.is_empty() {
            return None;
        }

        let bold_extra = i32::from(font.bold);
        let italic_extra = if font.italic {
            (size * ITALIC_SHEAR).ceil() as i32
        } else {
            0
        };
        let extra_x = bold_extra + italic_extra;
        let min_x = placed.iter().map(|(gx, ..)| *gx).min()? - pad as i32;
        let min_y = placed.iter().map(|(_, gy, ..)| *gy).min()? - pad as i32;
        let max_x = placed.iter().map(|(gx, _, m, _)| gx + m.width as i32).max()? + extra_x + pad as i32;
        let max_y = placed.iter().map(|(_, gy, m, _)| gy + m.height as i32).max()? + pad as i32;

        let mut mask = Mask::new(min_x, min_y, (max_x - min_x) as usize, (max_y - min_y) as usize);
        let stamps: &[i32] = if font.bold { &[0, 1] } else { &[0] };

        for (gx, gy, metrics, bitmap) in &placed {
            for row in 0..metrics.height {
                let py = gy + row as i32;
                let shear = if font.italic {
                    ((baseline - py as f32) * ITALIC_SHEAR).round() as i32
                } else {
                    0
                };
                for col in 0..metrics.width {
                    let coverage = bitmap[row * metrics.width + col];
                    if coverage == 0 {
                        continue;
                    }
                    for dx in stamps {
                        mask.max_at(gx + col as i32 + shear + dx, py, coverage);
                    }
                }
            }
        }

        Some(mask)
    }

    fn blend_mask(&mut self, mask: &Mask, offset_x: i32, offset_y: i32, color: [u8; 4]) {
        for row in 0..mask.h {
            let py = mask.y0 + row as i32 + offset_y;
            if py < 0 || py >= self.height as i32 {
                continue;
            }
            for col in 0..mask.w {
                let px = mask.x0 + col as i32 + offset_x;
                if px < 0 || px >= self.width as i32 {
                    continue;
                }
                let coverage = mask.data[row * mask.w + col];
                if coverage == 0 {
                    continue;
                }
                let idx = (py as usize * self.width as usize + px as usize) * 4;
                blend_pixel(&mut self.pixels[idx..idx + 4], color, coverage);
            }
        }
    }
}

impl FrameSurface for RasterSurface {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn clear(&mut self) {
        self.pixels.fill(0);
    }

    fn measure_text(&mut self, text: &str, font: &FontSpec) -> f32 {
        let size = font.size_px.max(1.0);
        text.chars()
            .map(|c| self.font.metrics(c, size).advance_width)
            .sum()
    }

    fn fill_rect(&mut self, x: f32, y: f32, width: f32, height: f32, color: [u8; 4]) {
        let x0 = x.round().max(0.0) as u32;
        let y0 = y.round().max(0.0) as u32;
        let x1 = ((x + width).round().max(0.0) as u32).min(self.width);
        let y1 = ((y + height).round().max(0.0) as u32).min(self.height);

        for py in y0..y1 {
            for px in x0..x1 {
                let idx = (py as usize * self.width as usize + px as usize) * 4;
                blend_pixel(&mut self.pixels[idx..idx + 4], color, 255);
            }
        }
    }

    fn stroke_text(
        &mut self,
        text: &str,
        x: f32,
        y: f32,
        font: &FontSpec,
        line_width: f32,
        color: [u8; 4],
        shadow: Option<&ShadowSpec>,
    ) {
        let radius = (line_width / 2.0).max(0.0);
        let blur = shadow.map(|s| (s.blur / 2.0).ceil() as usize).unwrap_or(0);
        let pad = radius.ceil() as usize + blur;

        let Some(mask) = self.text_mask(text, x, y, font, pad) else {
            return;
        };
        let outline = mask.dilate(radius);

        if let Some(shadow) = shadow {
            let shadow_mask = outline.box_blur(blur);
            self.blend_mask(
                &shadow_mask,
                shadow.offset_x.round() as i32,
                shadow.offset_y.round() as i32,
                shadow.color,
            );
        }

        self.blend_mask(&outline, 0, 0, color);
    }

    fn fill_text(&mut self, text: &str, x: f32, y: f32, font: &FontSpec, color: [u8; 4]) {
        if let Some(mask) = self.text_mask(text, x, y, font, 0) {
            self.blend_mask(&mask, 0, 0, color);
        }
    }

    fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

// =============================================================================
// Coverage Mask
// =============================================================================

#[derive(Clone, Debug)]
struct Mask {
    x0: i32,
    y0: i32,
    w: usize,
    h: usize,
    data: Vec<u8>,
}

impl Mask {
    fn new(x0: i32, y0: i32, w: usize, h: usize) -> Self {
        Self {
            x0,
            y0,
            w,
            h,
            data: vec![0; w * h],
        }
    }

    fn max_at(&mut self, x: i32, y: i32, value: u8) {
        let lx = x - self.x0;
        let ly = y - self.y0;
        if lx < 0 || ly < 0 || lx as usize >= self.w || ly as usize >= self.h {
            return;
        }
        let idx = ly as usize * self.w + lx as usize;
        self.data[idx] = self.data[idx].max(value);
    }

    fn get(&self, lx: i32, ly: i32) -> u8 {
        if lx < 0 || ly < 0 || lx as usize >= self.w || ly as usize >= self.h {
            return 0;
        }
        self.data[ly as usize * self.w + lx as usize]
    }

    /// Max-filter over a disc of the given radius
    fn dilate(&self, radius: f32) -> Mask {
        if radius <= 0.0 {
            return self.clone();
        }
        let r = radius.ceil() as i32;
        let r2 = radius * radius;
        let offsets: Vec<(i32, i32)> = (-r..=r)
            .flat_map(|dy| (-r..=r).map(move |dx| (dx, dy)))
            .filter(|(dx, dy)| (dx * dx + dy * dy) as f32 <= r2)
            .collect();

        let mut out = Mask::new(self.x0, self.y0, self.w, self.h);
        for ly in 0..self.h as i32 {
            for lx in 0..self.w as i32 {
                let value = offsets
                    .iter()
                    .map(|(dx, dy)| self.get(lx + dx, ly + dy))
                    .max()
                    .unwrap_or(0);
                out.data[ly as usize * self.w + lx as usize] = value;
            }
        }
        out
    }

    /// Separable box blur
    fn box_blur(&self, radius: usize) -> Mask {
        if radius == 0 {
            return self.clone();
        }
        let r = radius as i32;
        let window = (2 * r + 1) as u32;

        let mut horizontal = Mask::new(self.x0, self.y0, self.w, self.h);
        for ly in 0..self.h as i32 {
            for lx in 0..self.w as i32 {
                let sum: u32 = (-r..=r).map(|d| self.get(lx + d, ly) as u32).sum();
                horizontal.data[ly as usize * self.w + lx as usize] = (sum / window) as u8;
            }
        }

        let mut out = Mask::new(self.x0, self.y0, self.w, self.h);
        for ly in 0..self.h as i32 {
            for lx in 0..self.w as i32 {
                let sum: u32 = (-r..=r).map(|d| horizontal.get(lx, ly + d) as u32).sum();
                out.data[ly as usize * self.w + lx as usize] = (sum / window) as u8;
            }
        }
        out
    }
}

/// Source-over compositing of `color` scaled by `coverage` onto straight-alpha RGBA
fn blend_pixel(dst: &mut [u8], color: [u8; 4], coverage: u8) {
    let src_a = (color[3] as f32 / 255.0) * (coverage as f32 / 255.0);
    if src_a <= 0.0 {
        return;
    }
    let dst_a = dst[3] as f32 / 255.0;
    let out_a = src_a + dst_a * (1.0 - src_a);

    for channel in 0..3 {
        let src_c = color[channel] as f32;
        let dst_c = dst[channel] as f32;
        dst[channel] = ((src_c * src_a + dst_c * dst_a * (1.0 - src_a)) / out_a).round() as u8;
    }
    dst[3] = (out_a * 255.0).round() as u8;
}
