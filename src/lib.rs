//! # Schematic Bones
//!
//! Compile a palette of blocks into cuboid bone geometry and one packed
//! texture atlas, driven entirely by data tables.
//!
//! ## Overview
//!
//! Each palette entry is resolved to a shape, the shape's cube templates are
//! expanded (conditions, interpolation, copies), adjacent plain cubes are
//! merged, and every visible face records a texture reference. References
//! are deduplicated, resolved through the terrain texture tables, loaded,
//! processed and packed into the atlas.
//!
//! ## Quick Start
//!
//! ```ignore
//! use schematic_bones::{load_rules, Block, Compiler, DirectorySource};
//!
//! let rules = load_rules("path/to/rules.zip")?;
//! let textures = DirectorySource::new("path/to/resource_pack");
//! let palette = vec![Block::new("minecraft:stone")];
//!
//! let output = Compiler::new(&rules).compile(&palette, &textures)?;
//! let png = output.atlases[0].atlas.to_png()?;
//!
//! // Place the first palette entry at a block position.
//! let bone = output.bones[0].place([3, 0, 1]);
//! ```

pub mod atlas;
pub mod compiler;
pub mod diagnostics;
pub mod error;
pub mod expand;
pub mod mesher;
pub mod rules;
pub mod texture;
pub mod types;

// Re-export main types for convenience
pub use atlas::{OutlineConfig, Placement, TextureAtlas};
pub use compiler::{AtlasVariant, Compiler, CompilerConfig, CompilerOutput};
pub use diagnostics::{Diagnostic, DiagnosticKind, Diagnostics, Severity};
pub use error::{CompilerError, Result};
pub use mesher::{BoneCube, BoneTemplate, FaceUv};
pub use rules::RuleTables;
pub use texture::{DirectorySource, ImageSource, MemorySource, TextureFragment, TextureReference};
pub use types::{Block, Face, StateValue};

/// Load rule tables from a file path (ZIP, directory or single JSON file).
pub fn load_rules<P: AsRef<std::path::Path>>(path: P) -> Result<RuleTables> {
    rules::loader::load_from_path(path)
}

/// Load rule tables from ZIP bytes.
pub fn load_rules_from_bytes(data: &[u8]) -> Result<RuleTables> {
    rules::loader::load_from_bytes(data)
}
