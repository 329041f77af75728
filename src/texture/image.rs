//! Image fetching, decoding and per-fragment processing.
//!
//! Every distinct path is fetched and decoded once, in parallel. Each
//! [`TextureFragment`] then gets its own processed copy: tint, opacity,
//! flipbook frame selection and optional crop to opaque bounds.

use super::{TextureFragment, Tint};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::Result;
use crate::rules::RuleTables;
use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashMap;
use std::io::Read;
use std::path::PathBuf;

/// Extensions tried in order; the second is the legacy format.
const EXTENSIONS: [(&str, bool); 2] = [(".png", false), (".tga", true)];

/// Fetches raw image bytes by path.
pub trait ImageSource: Sync {
    /// Bytes for a full path (extension included), or `None` if absent.
    fn fetch(&self, path: &str) -> Option<Vec<u8>>;
}

/// Images read from a directory (an unpacked resource pack).
#[derive(Debug, Clone)]
pub struct DirectorySource {
    root: PathBuf,
}

impl DirectorySource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ImageSource for DirectorySource {
    fn fetch(&self, path: &str) -> Option<Vec<u8>> {
        std::fs::read(self.root.join(path)).ok()
    }
}

/// Images held in memory, keyed by path.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    files: HashMap<String, Vec<u8>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, bytes: Vec<u8>) {
        self.files.insert(path.into(), bytes);
    }

    /// Every file of a ZIP archive (a zipped resource pack).
    pub fn from_zip_bytes(data: &[u8]) -> Result<Self> {
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(data))?;
        let mut source = Self::new();

        for i in 0..archive.len() {
            let mut file = archive.by_index(i)?;
            if file.is_dir() {
                continue;
            }
            let name = file.name().trim_start_matches('/').to_string();
            let mut bytes = Vec::new();
            file.read_to_end(&mut bytes)?;
            source.insert(name, bytes);
        }

        Ok(source)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl ImageSource for MemorySource {
    fn fetch(&self, path: &str) -> Option<Vec<u8>> {
        self.files.get(path).cloned()
    }
}

/// Decoded RGBA8 pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageData {
    pub width: u32,
    pub height: u32,
    /// RGBA8 pixel data (4 bytes per pixel).
    pub pixels: Vec<u8>,
}

impl ImageData {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Magenta/black checkerboard used when an image cannot be loaded.
    pub fn placeholder() -> Self {
        let size = 16;
        let mut pixels = vec![0u8; (size * size * 4) as usize];

        for y in 0..size {
            for x in 0..size {
                let idx = ((y * size + x) * 4) as usize;
                if ((x / 2) + (y / 2)) % 2 == 0 {
                    pixels[idx] = 255;
                    pixels[idx + 2] = 255;
                }
                pixels[idx + 3] = 255;
            }
        }

        Self::new(size, size, pixels)
    }

    /// Decode PNG (sniffed) or legacy TGA bytes, which carry no magic number.
    pub fn decode(bytes: &[u8], legacy: bool) -> std::result::Result<Self, image::ImageError> {
        let decoded = if legacy {
            image::load_from_memory_with_format(bytes, image::ImageFormat::Tga)?
        } else {
            image::load_from_memory(bytes)?
        };
        let rgba = decoded.to_rgba8();
        let (width, height) = rgba.dimensions();
        Ok(Self::new(width, height, rgba.into_raw()))
    }

    pub fn get_pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let idx = ((y * self.width + x) * 4) as usize;
        [
            self.pixels[idx],
            self.pixels[idx + 1],
            self.pixels[idx + 2],
            self.pixels[idx + 3],
        ]
    }

    pub fn alpha(&self, x: u32, y: u32) -> u8 {
        self.pixels[((y * self.width + x) * 4 + 3) as usize]
    }

    /// The top `frame_height` rows of a vertical flipbook strip.
    pub fn first_frame(&self, frame_height: u32) -> ImageData {
        let frame_height = frame_height.clamp(1, self.height.max(1));
        if frame_height >= self.height {
            return self.clone();
        }
        let frame_len = (self.width * frame_height * 4) as usize;
        Self::new(self.width, frame_height, self.pixels[..frame_len].to_vec())
    }

    /// Multiply RGB. The legacy rule only touches visible pixels and makes
    /// them fully opaque.
    fn apply_tint(&mut self, rgb: [f64; 3], legacy: bool) {
        for pixel in self.pixels.chunks_exact_mut(4) {
            if legacy {
                if pixel[3] == 0 {
                    continue;
                }
                pixel[3] = 255;
            }
            for (channel, factor) in pixel.iter_mut().zip(rgb) {
                *channel = (*channel as f64 * factor).round().clamp(0.0, 255.0) as u8;
            }
        }
    }

    fn apply_opacity(&mut self, opacity: f64) {
        if opacity >= 1.0 {
            return;
        }
        for pixel in self.pixels.chunks_exact_mut(4) {
            pixel[3] = (pixel[3] as f64 * opacity).round().clamp(0.0, 255.0) as u8;
        }
    }

    /// Bounding box `(x, y, w, h)` of pixels with nonzero alpha inside a rect.
    fn opaque_bounds(&self, x0: u32, y0: u32, x1: u32, y1: u32) -> Option<(u32, u32, u32, u32)> {
        let mut bounds: Option<(u32, u32, u32, u32)> = None;
        for y in y0..y1.min(self.height) {
            for x in x0..x1.min(self.width) {
                if self.alpha(x, y) == 0 {
                    continue;
                }
                bounds = Some(match bounds {
                    None => (x, y, x, y),
                    Some((min_x, min_y, max_x, max_y)) => {
                        (min_x.min(x), min_y.min(y), max_x.max(x), max_y.max(y))
                    }
                });
            }
        }
        bounds.map(|(min_x, min_y, max_x, max_y)| (min_x, min_y, max_x - min_x + 1, max_y - min_y + 1))
    }
}

/// Visible part of a requested rectangle, as fractions of it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Crop {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

/// A processed image region ready for packing.
#[derive(Debug, Clone)]
pub struct ImageFragment {
    pub image: ImageData,
    /// Source rectangle in pixels; may be fractional.
    pub source_offset: [f64; 2],
    pub source_size: [f64; 2],
    pub crop: Option<Crop>,
}

/// A decoded image and whether it came from the legacy format.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub data: ImageData,
    pub legacy: bool,
}

/// Loads and processes fragment images.
pub struct ImageLoader<'a> {
    source: &'a dyn ImageSource,
    rules: &'a RuleTables,
    diagnostics: &'a Diagnostics,
}

impl<'a> ImageLoader<'a> {
    pub fn new(source: &'a dyn ImageSource, rules: &'a RuleTables, diagnostics: &'a Diagnostics) -> Self {
        Self {
            source,
            rules,
            diagnostics,
        }
    }

    /// Load every distinct fragment path once, then process each fragment.
    /// Output order matches `fragments`.
    pub fn load_fragments(&self, fragments: &[TextureFragment]) -> Vec<ImageFragment> {
        let mut paths: Vec<&str> = fragments.iter().map(|f| f.path.as_str()).collect();
        paths.sort_unstable();
        paths.dedup();

        let images: HashMap<&str, Option<LoadedImage>> = paths
            .par_iter()
            .map(|&path| (path, self.load(path)))
            .collect();
        log::debug!("Loaded {} distinct images for {} fragments", images.len(), fragments.len());

        fragments
            .par_iter()
            .map(|fragment| {
                let loaded = images.get(fragment.path.as_str()).and_then(Option::as_ref);
                process(fragment, loaded)
            })
            .collect()
    }

    /// Fetch and decode one path, trying the normal format before the legacy one.
    pub fn load(&self, path: &str) -> Option<LoadedImage> {
        let candidates: Vec<(String, bool)> = match EXTENSIONS.iter().find(|(ext, _)| path.ends_with(ext)) {
            Some(&(_, legacy)) => vec![(path.to_string(), legacy)],
            None => EXTENSIONS
                .iter()
                .map(|(ext, legacy)| (format!("{}{}", path, ext), *legacy))
                .collect(),
        };

        for (full_path, legacy) in candidates {
            let Some(bytes) = self.source.fetch(&full_path) else {
                continue;
            };
            return match ImageData::decode(&bytes, legacy) {
                Ok(data) => Some(LoadedImage {
                    data: self.flipbook_frame(path, data),
                    legacy,
                }),
                Err(e) => {
                    self.diagnostics.warn(
                        DiagnosticKind::ImageLoad,
                        format!("Failed to decode {}: {}", full_path, e),
                    );
                    None
                }
            };
        }

        self.diagnostics.warn(
            DiagnosticKind::ImageLoad,
            format!("Image {} not found, using placeholder", path),
        );
        None
    }

    fn flipbook_frame(&self, path: &str, data: ImageData) -> ImageData {
        match self.rules.flipbook_sizes.get(path) {
            Some(&frame) => {
                let frame = if frame == 0 { data.width } else { frame };
                data.first_frame(frame)
            }
            None => data,
        }
    }
}

/// Tint, fade and crop one fragment. Missing images become the placeholder
/// with the whole image as source rectangle.
pub fn process(fragment: &TextureFragment, loaded: Option<&LoadedImage>) -> ImageFragment {
    let Some(loaded) = loaded else {
        let image = ImageData::placeholder();
        let size = [image.width as f64, image.height as f64];
        return ImageFragment {
            image,
            source_offset: [0.0, 0.0],
            source_size: size,
            crop: None,
        };
    };

    let mut image = loaded.data.clone();
    if let Some(Tint { rgb, tint_like_png }) = fragment.tint {
        image.apply_tint(rgb, loaded.legacy && !tint_like_png);
    }
    image.apply_opacity(fragment.opacity);

    let (width, height) = (image.width as f64, image.height as f64);
    let source_offset = [fragment.uv[0] * width, fragment.uv[1] * height];
    let source_size = [fragment.uv_size[0] * width, fragment.uv_size[1] * height];

    if fragment.croppable {
        if let Some((offset, size, crop)) = crop_to_opaque(&image, source_offset, source_size) {
            return ImageFragment {
                image,
                source_offset: offset,
                source_size: size,
                crop: Some(crop),
            };
        }
    }

    ImageFragment {
        image,
        source_offset,
        source_size,
        crop: None,
    }
}

/// Shrink a source rectangle to its opaque pixels. `None` when nothing changes
/// or the rectangle is fully transparent.
fn crop_to_opaque(image: &ImageData, offset: [f64; 2], size: [f64; 2]) -> Option<([f64; 2], [f64; 2], Crop)> {
    let finite = offset.iter().chain(&size).all(|v| v.is_finite());
    if !finite || size[0] <= 0.0 || size[1] <= 0.0 {
        return None;
    }
    let x0 = offset[0].floor().max(0.0) as u32;
    let y0 = offset[1].floor().max(0.0) as u32;
    let x1 = (offset[0] + size[0]).ceil().max(0.0) as u32;
    let y1 = (offset[1] + size[1]).ceil().max(0.0) as u32;

    let (bx, by, bw, bh) = image.opaque_bounds(x0, y0, x1, y1)?;
    let start = [(bx as f64).max(offset[0]), (by as f64).max(offset[1])];
    let end = [
        ((bx + bw) as f64).min(offset[0] + size[0]),
        ((by + bh) as f64).min(offset[1] + size[1]),
    ];
    let crop = Crop {
        x: (start[0] - offset[0]) / size[0],
        y: (start[1] - offset[1]) / size[1],
        w: (end[0] - start[0]) / size[0],
        h: (end[1] - start[1]) / size[1],
    };
    if crop == (Crop { x: 0.0, y: 0.0, w: 1.0, h: 1.0 }) {
        return None;
    }

    Some((start, [end[0] - start[0], end[1] - start[1]], crop))
}
