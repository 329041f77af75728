//! Outline highlighting around the opaque shapes of packed fragments.

use serde::Deserialize;

/// Outline settings.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct OutlineConfig {
    /// Line width in source pixels; below 1 the canvas is upscaled so the
    /// one-pixel line comes out at this width.
    pub width: f64,
    pub color: [u8; 3],
    pub opacity: f64,
    /// Pixels with alpha below this count as transparent.
    pub alpha_threshold: u8,
}

impl Default for OutlineConfig {
    fn default() -> Self {
        Self {
            width: 0.25,
            color: [0, 0, 0],
            opacity: 1.0,
            alpha_threshold: 1,
        }
    }
}

/// Largest canvas upscale the outline pass will do.
pub const MAX_SCALE_FACTOR: u32 = 16;

impl OutlineConfig {
    /// Integer upscale factor that makes the line at least one pixel wide,
    /// capped at [`MAX_SCALE_FACTOR`].
    pub fn scale_factor(&self) -> u32 {
        if self.width > 0.0 && self.width < 1.0 {
            (1.0 / self.width)
                .round()
                .clamp(1.0, MAX_SCALE_FACTOR as f64) as u32
        } else {
            1
        }
    }
}

/// Nearest-neighbour upscale of an RGBA8 buffer.
pub fn upscale(pixels: &[u8], width: u32, height: u32, factor: u32) -> Vec<u8> {
    if factor <= 1 {
        return pixels.to_vec();
    }
    let (width, height, factor) = (width as usize, height as usize, factor as usize);
    let out_width = width * factor;
    let mut out = vec![0u8; out_width * height * factor * 4];
    for y in 0..height * factor {
        for x in 0..out_width {
            let src = ((y / factor) * width + x / factor) * 4;
            let dst = (y * out_width + x) * 4;
            out[dst..dst + 4].copy_from_slice(&pixels[src..src + 4]);
        }
    }
    out
}

/// A packed rectangle in source (pre-upscale) pixels.
#[derive(Debug, Clone, Copy)]
pub struct Region {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Stamp outlines for every region onto an already upscaled canvas.
///
/// `source` is the canvas before upscaling; edges are found there, then
/// drawn at `factor` times the coordinates.
pub fn draw_outlines(
    canvas: &mut [u8],
    source: &[u8],
    source_width: u32,
    regions: &[Region],
    config: &OutlineConfig,
) {
    let factor = config.scale_factor();
    let out_width = source_width as usize * factor as usize;
    let alpha_at = |x: u32, y: u32| source[(y as usize * source_width as usize + x as usize) * 4 + 3];

    for region in regions {
        let opaque = |x: i64, y: i64| -> bool {
            x >= region.x as i64
                && y >= region.y as i64
                && x < (region.x + region.width) as i64
                && y < (region.y + region.height) as i64
                && alpha_at(x as u32, y as u32) >= config.alpha_threshold
        };

        for y in region.y..region.y + region.height {
            for x in region.x..region.x + region.width {
                let (xi, yi) = (x as i64, y as i64);
                if !opaque(xi, yi) {
                    continue;
                }

                let left = !opaque(xi - 1, yi);
                let right = !opaque(xi + 1, yi);
                let top = !opaque(xi, yi - 1);
                let bottom = !opaque(xi, yi + 1);
                let corners = [
                    (!opaque(xi - 1, yi - 1), 0, 0),
                    (!opaque(xi + 1, yi - 1), 1, 0),
                    (!opaque(xi - 1, yi + 1), 0, 1),
                    (!opaque(xi + 1, yi + 1), 1, 1),
                ];
                if !(left || right || top || bottom || corners.iter().any(|c| c.0)) {
                    continue;
                }

                // One output pixel wide, along the sides of the upscaled block.
                let (ox, oy, span) = (x * factor, y * factor, factor);
                let mut stamp = |x0: u32, y0: u32, w: u32, h: u32| {
                    for py in y0..y0 + h {
                        for px in x0..x0 + w {
                            blend(canvas, (py as usize * out_width + px as usize) * 4, config);
                        }
                    }
                };
                if left {
                    stamp(ox, oy, 1, span);
                }
                if right {
                    stamp(ox + span - 1, oy, 1, span);
                }
                if top {
                    stamp(ox, oy, span, 1);
                }
                if bottom {
                    stamp(ox, oy + span - 1, span, 1);
                }
                for (transparent, cx, cy) in corners {
                    if transparent {
                        stamp(ox + cx * (span - 1), oy + cy * (span - 1), 1, 1);
                    }
                }
            }
        }
    }
}

/// Alpha-over the outline colour onto one pixel.
fn blend(canvas: &mut [u8], idx: usize, config: &OutlineConfig) {
    let opacity = config.opacity.clamp(0.0, 1.0);
    let pixel = &mut canvas[idx..idx + 4];
    for (channel, color) in pixel.iter_mut().zip(config.color) {
        *channel = (color as f64 * opacity + *channel as f64 * (1.0 - opacity)).round() as u8;
    }
    let alpha = pixel[3] as f64 / 255.0;
    pixel[3] = ((opacity + alpha * (1.0 - opacity)) * 255.0).round() as u8;
}
