//! Texture atlas building.
//!
//! Processed fragments are trimmed to whole pixels, packed into one image and
//! composited. Each fragment gets a [`Placement`] in atlas pixels that keeps
//! the sub-pixel part of its source rectangle, so fractional crops still land
//! on the right texels.

pub mod outline;
mod packer;

pub use outline::OutlineConfig;
pub use packer::{pack, Packing, RectSize};

use crate::error::{CompilerError, Result};
use crate::texture::{Crop, ImageFragment};
use image::ImageEncoder;
use outline::Region;
use serde::Serialize;

/// Where one fragment ended up in the atlas, in atlas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Placement {
    pub uv: [f64; 2],
    pub uv_size: [f64; 2],
    /// Crop applied while processing, to be mirrored onto the geometry.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crop: Option<Crop>,
}

/// A built texture atlas.
#[derive(Debug, Clone)]
pub struct TextureAtlas {
    /// Width of the atlas in pixels.
    pub width: u32,
    /// Height of the atlas in pixels.
    pub height: u32,
    /// RGBA pixel data.
    pub pixels: Vec<u8>,
    /// One placement per input fragment, in input order.
    pub placements: Vec<Placement>,
    /// Packed area over atlas area, before any outline upscale.
    pub efficiency: f64,
    /// Integer upscale applied by the outline pass (1 without outlines).
    pub scale_factor: u32,
}

impl TextureAtlas {
    /// A transparent 16x16 atlas for runs without any fragment.
    pub fn empty() -> Self {
        Self {
            width: 16,
            height: 16,
            pixels: vec![0; 16 * 16 * 4],
            placements: Vec::new(),
            efficiency: 1.0,
            scale_factor: 1,
        }
    }

    /// Copy of the atlas with every alpha value multiplied by `opacity`.
    pub fn with_opacity(&self, opacity: f64) -> Self {
        let opacity = opacity.clamp(0.0, 1.0);
        let mut atlas = self.clone();
        if opacity < 1.0 {
            for pixel in atlas.pixels.chunks_exact_mut(4) {
                pixel[3] = (pixel[3] as f64 * opacity).round() as u8;
            }
        }
        atlas
    }

    /// Export the atlas as PNG bytes.
    pub fn to_png(&self) -> Result<Vec<u8>> {
        let mut bytes = Vec::new();
        let cursor = std::io::Cursor::new(&mut bytes);
        let encoder = image::codecs::png::PngEncoder::new(cursor);

        encoder
            .write_image(
                &self.pixels,
                self.width,
                self.height,
                image::ExtendedColorType::Rgba8,
            )
            .map_err(|e| CompilerError::AtlasBuild(format!("Failed to encode PNG: {}", e)))?;

        Ok(bytes)
    }
}

/// A fragment's source rectangle widened to whole pixels.
struct PixelRect {
    x: u32,
    y: u32,
    width: u32,
    height: u32,
    /// How far the fractional origin lies inside the pixel rectangle.
    remainder: [f64; 2],
    /// Fractional size reported back in the placement.
    size: [f64; 2],
}

impl PixelRect {
    fn of(fragment: &ImageFragment) -> Self {
        let image = &fragment.image;
        let [ox, oy] = fragment.source_offset;
        let [sw, sh] = fragment.source_size;

        if ![ox, oy, sw, sh].iter().all(|v| v.is_finite()) {
            log::error!(
                "Skipping fragment with non-finite source rect {:?} {:?}",
                fragment.source_offset,
                fragment.source_size
            );
            return Self {
                x: 0,
                y: 0,
                width: 0,
                height: 0,
                remainder: [0.0, 0.0],
                size: [0.0, 0.0],
            };
        }

        let (w, h) = (image.width as f64, image.height as f64);
        let x0 = ox.floor().max(0.0).min(w);
        let y0 = oy.floor().max(0.0).min(h);
        let x1 = (ox + sw).ceil().max(x0).min(w);
        let y1 = (oy + sh).ceil().max(y0).min(h);

        Self {
            x: x0 as u32,
            y: y0 as u32,
            width: (x1 - x0) as u32,
            height: (y1 - y0) as u32,
            remainder: [ox - x0, oy - y0],
            size: fragment.source_size,
        }
    }
}

/// Pack and composite fragments into one atlas.
pub fn build_atlas(fragments: &[ImageFragment], outline: Option<&OutlineConfig>) -> TextureAtlas {
    if fragments.is_empty() {
        return TextureAtlas::empty();
    }

    let rects: Vec<PixelRect> = fragments.iter().map(PixelRect::of).collect();
    let sizes: Vec<RectSize> = rects.iter().map(|r| RectSize::new(r.width, r.height)).collect();
    let packing = pack(&sizes);
    let efficiency = packing.efficiency(&sizes);
    let (width, height) = (packing.width.max(1), packing.height.max(1));

    let mut pixels = vec![0u8; width as usize * height as usize * 4];
    for ((fragment, rect), &[dx, dy]) in fragments.iter().zip(&rects).zip(&packing.positions) {
        let len = rect.width as usize * 4;
        for row in 0..rect.height as usize {
            let src = ((rect.y as usize + row) * fragment.image.width as usize + rect.x as usize) * 4;
            let dst = ((dy as usize + row) * width as usize + dx as usize) * 4;
            pixels[dst..dst + len].copy_from_slice(&fragment.image.pixels[src..src + len]);
        }
    }

    let mut placements: Vec<Placement> = fragments
        .iter()
        .zip(&rects)
        .zip(&packing.positions)
        .map(|((fragment, rect), &[dx, dy])| Placement {
            uv: [dx as f64 + rect.remainder[0], dy as f64 + rect.remainder[1]],
            uv_size: rect.size,
            crop: fragment.crop,
        })
        .collect();

    log::info!(
        "Packed {} fragments into a {}x{} atlas ({:.1}% filled)",
        fragments.len(),
        width,
        height,
        efficiency * 100.0
    );

    let Some(config) = outline else {
        return TextureAtlas {
            width,
            height,
            pixels,
            placements,
            efficiency,
            scale_factor: 1,
        };
    };

    let factor = config.scale_factor();
    let regions: Vec<Region> = rects
        .iter()
        .zip(&packing.positions)
        .map(|(rect, &[x, y])| Region {
            x,
            y,
            width: rect.width,
            height: rect.height,
        })
        .collect();
    let mut canvas = outline::upscale(&pixels, width, height, factor);
    outline::draw_outlines(&mut canvas, &pixels, width, &regions, config);

    let scale = factor as f64;
    for placement in &mut placements {
        placement.uv = placement.uv.map(|v| v * scale);
        placement.uv_size = placement.uv_size.map(|v| v * scale);
    }

    TextureAtlas {
        width: width * factor,
        height: height * factor,
        pixels: canvas,
        placements,
        efficiency,
        scale_factor: factor,
    }
}
