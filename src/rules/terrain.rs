//! Texture-side tables: block face tables, terrain texture entries and tints.

use crate::types::Face;
use serde::Deserialize;
use std::collections::BTreeMap;

/// A block's face -> terrain texture key table.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum FaceTextures {
    /// One key for every face.
    All(String),
    /// Keys by face name, with optional "side" and "*" fallbacks.
    PerFace(BTreeMap<String, String>),
}

/// Result of looking a face up in a [`FaceTextures`] table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaceLookup<'a> {
    Found(&'a str),
    /// No rule matched; the first declared entry was used.
    FirstDeclared(&'a str),
    Missing,
}

impl FaceTextures {
    /// Exact face name, else "side" for horizontal faces, else "*", else the first entry.
    pub fn lookup(&self, face: &str) -> FaceLookup<'_> {
        match self {
            FaceTextures::All(key) => FaceLookup::Found(key),
            FaceTextures::PerFace(map) => {
                if let Some(key) = map.get(face) {
                    return FaceLookup::Found(key);
                }
                let is_side = Face::from_name(face).map(|f| f.is_side()).unwrap_or(false);
                if is_side {
                    if let Some(key) = map.get("side") {
                        return FaceLookup::Found(key);
                    }
                }
                if let Some(key) = map.get("*") {
                    return FaceLookup::Found(key);
                }
                match map.values().next() {
                    Some(key) => FaceLookup::FirstDeclared(key),
                    None => FaceLookup::Missing,
                }
            }
        }
    }
}

/// One path entry in the terrain texture table.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TerrainVariant {
    Path(String),
    Detailed {
        path: String,
        #[serde(default)]
        tint_color: Option<String>,
    },
}

impl TerrainVariant {
    pub fn path(&self) -> &str {
        match self {
            TerrainVariant::Path(path) => path,
            TerrainVariant::Detailed { path, .. } => path,
        }
    }

    pub fn tint_color(&self) -> Option<&str> {
        match self {
            TerrainVariant::Path(_) => None,
            TerrainVariant::Detailed { tint_color, .. } => tint_color.as_deref(),
        }
    }
}

/// A terrain texture table entry: one path, a variant list, or a wrapped form.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TerrainTextures {
    One(TerrainVariant),
    Many(Vec<TerrainVariant>),
    Wrapped { textures: Box<TerrainTextures> },
}

impl TerrainTextures {
    /// All variants in declaration order.
    pub fn variants(&self) -> Vec<&TerrainVariant> {
        match self {
            TerrainTextures::One(variant) => vec![variant],
            TerrainTextures::Many(variants) => variants.iter().collect(),
            TerrainTextures::Wrapped { textures } => textures.variants(),
        }
    }
}

/// A tint side-table entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TintEntry {
    Hex(String),
    Detailed {
        color: String,
        #[serde(default, alias = "tintLikePng")]
        tint_like_png: bool,
    },
}

impl TintEntry {
    pub fn color(&self) -> &str {
        match self {
            TintEntry::Hex(color) => color,
            TintEntry::Detailed { color, .. } => color,
        }
    }

    pub fn tint_like_png(&self) -> bool {
        matches!(self, TintEntry::Detailed { tint_like_png: true, .. })
    }
}

/// Parse "#rrggbb" (or "rrggbb") into an RGB triple in 0..1.
pub fn parse_hex_color(color: &str) -> Option<[f64; 3]> {
    let hex = color.trim().trim_start_matches('#');
    if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok().map(|c| c as f64 / 255.0);
    Some([channel(0)?, channel(2)?, channel(4)?])
}
