//! Static rule tables and their lookups.
//!
//! All tables are plain data, loaded once per run and passed into the
//! [`Compiler`](crate::Compiler) explicitly. Nothing here is global, so tests
//! build minimal fixtures in code.

pub mod loader;
pub mod rotation;
pub mod shape;
pub mod terrain;
pub mod variant;

pub use rotation::{RotationResolver, RotationRules, StateRotations};
pub use shape::{split_special_texture, ShapeResolver, DEFAULT_SHAPE};
pub use terrain::{parse_hex_color, FaceLookup, FaceTextures, TerrainTextures, TerrainVariant, TintEntry};
pub use variant::{VariantResolver, VariantRules, VariantTable, UNKNOWN_VARIANT};

use crate::expand::CubeTemplate;
use regex::Regex;
use serde::{Deserialize, Deserializer};
use std::collections::{BTreeMap, BTreeSet};

/// A compiled block name pattern.
#[derive(Debug, Clone)]
pub struct NamePattern(Regex);

impl NamePattern {
    pub fn new(pattern: &str) -> crate::Result<Self> {
        Regex::new(pattern)
            .map(NamePattern)
            .map_err(|e| crate::CompilerError::InvalidPattern {
                pattern: pattern.to_string(),
                reason: e.to_string(),
            })
    }

    pub fn is_match(&self, name: &str) -> bool {
        self.0.is_match(name)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl<'de> Deserialize<'de> for NamePattern {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let pattern = String::deserialize(deserializer)?;
        Regex::new(&pattern)
            .map(NamePattern)
            .map_err(serde::de::Error::custom)
    }
}

/// Every table the pipeline reads. Block names are keyed without namespace.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RuleTables {
    /// Exact block name -> shape id.
    pub shapes_by_name: BTreeMap<String, String>,
    /// Ordered (pattern, shape id) fallbacks; first match wins.
    pub shapes_by_pattern: Vec<(NamePattern, String)>,
    /// Shape id -> cube templates.
    pub shape_geometry: BTreeMap<String, Vec<CubeTemplate>>,
    /// Bone rotations driven by block states.
    pub rotations: RotationRules,
    /// Texture variant indices driven by block states.
    pub variants: VariantRules,
    /// Terrain texture key -> image path(s).
    pub terrain_textures: BTreeMap<String, TerrainTextures>,
    /// Block name -> face -> terrain texture key.
    pub block_textures: BTreeMap<String, FaceTextures>,
    /// Block name -> carried (item form) face table.
    pub carried_textures: BTreeMap<String, FaceTextures>,
    /// Blocks that always use their carried face table.
    pub use_carried_textures: BTreeSet<String>,
    /// Block name -> block name whose face table to use instead.
    pub block_name_remaps: BTreeMap<String, String>,
    /// Terrain texture key -> tint.
    pub tints: BTreeMap<String, TintEntry>,
    /// Block name -> opacity for semi-transparent blocks.
    pub transparency: BTreeMap<String, f64>,
    /// Texture path -> flipbook frame size in pixels.
    pub flipbook_sizes: BTreeMap<String, u32>,
    /// Blocks that produce no geometry and are never copied.
    pub ignored_blocks: BTreeSet<String>,
    /// Blocks whose entity data is dropped before expansion.
    pub ignored_block_entities: BTreeSet<String>,
}

impl RuleTables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cube templates for a shape id, if any.
    pub fn geometry(&self, shape_id: &str) -> Option<&Vec<CubeTemplate>> {
        self.shape_geometry.get(shape_id)
    }

    pub fn is_ignored(&self, block_name: &str) -> bool {
        self.ignored_blocks
            .contains(crate::types::strip_namespace(block_name))
    }
}
