//! Compile a block palette into bones and a texture atlas.

use crate::atlas::{build_atlas, OutlineConfig, Placement, TextureAtlas};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::error::Result;
use crate::expand::{CubeExpander, DEFAULT_MAX_COPY_DEPTH};
use crate::mesher::{BoneBuilder, BoneTemplate, FaceUv};
use crate::rules::{RuleTables, ShapeResolver};
use crate::texture::{DedupSet, ImageLoader, ImageSource, TextureFragment, TextureReference, TextureResolver};
use crate::types::{strip_namespace, Block};
use serde::Deserialize;

/// Compiler configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Global scale applied to every cube, pivot and instance offset.
    pub scale: f64,
    /// Fail on self-copies and runaway nesting instead of skipping them.
    pub strict: bool,
    /// Limit on nested copy / copy_block levels.
    pub max_copy_depth: usize,
    /// Opacity of the single atlas image when no levels are given.
    pub texture_opacity: f64,
    /// Render one atlas image per opacity level.
    pub opacity_levels: Option<Vec<f64>>,
    /// Draw outlines around opaque texture shapes.
    pub outline: Option<OutlineConfig>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            scale: 1.0,
            strict: false,
            max_copy_depth: DEFAULT_MAX_COPY_DEPTH,
            texture_opacity: 1.0,
            opacity_levels: None,
            outline: None,
        }
    }
}

impl CompilerConfig {
    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_max_copy_depth(mut self, max_copy_depth: usize) -> Self {
        self.max_copy_depth = max_copy_depth;
        self
    }

    pub fn with_opacity_levels(mut self, levels: Vec<f64>) -> Self {
        self.opacity_levels = Some(levels);
        self
    }

    pub fn with_outline(mut self, outline: OutlineConfig) -> Self {
        self.outline = Some(outline);
        self
    }
}

/// One rendered atlas image.
#[derive(Debug, Clone)]
pub struct AtlasVariant {
    pub opacity: f64,
    pub atlas: TextureAtlas,
}

/// Everything a compile run produces.
#[derive(Debug)]
pub struct CompilerOutput {
    /// One bone template per palette entry, in palette order.
    pub bones: Vec<BoneTemplate>,
    /// Deduplicated face references; face UVs index into this list.
    pub texture_references: Vec<TextureReference>,
    /// Deduplicated resolved textures, one atlas slot each.
    pub fragments: Vec<TextureFragment>,
    /// Fragment index per texture reference.
    pub reference_fragments: Vec<usize>,
    /// Atlas placement per texture reference.
    pub uv_table: Vec<Placement>,
    /// Atlas images, one per opacity level.
    pub atlases: Vec<AtlasVariant>,
    pub atlas_width: u32,
    pub atlas_height: u32,
    /// Packed area over atlas area.
    pub efficiency: f64,
    pub diagnostics: Vec<Diagnostic>,
}

impl CompilerOutput {
    /// Final atlas UV origin and size for a bone face.
    pub fn face_uv(&self, face: &FaceUv) -> Option<([f64; 2], [f64; 2])> {
        self.uv_table
            .get(face.texture_index)
            .map(|placement| face.atlas_uv(placement))
    }
}

/// The main compiler.
pub struct Compiler<'r> {
    rules: &'r RuleTables,
    config: CompilerConfig,
}

impl<'r> Compiler<'r> {
    /// Create a compiler with default configuration.
    pub fn new(rules: &'r RuleTables) -> Self {
        Self::with_config(rules, CompilerConfig::default())
    }

    pub fn with_config(rules: &'r RuleTables, config: CompilerConfig) -> Self {
        Self { rules, config }
    }

    pub fn config(&self) -> &CompilerConfig {
        &self.config
    }

    /// Run the whole pipeline over a palette.
    pub fn compile(&self, palette: &[Block], source: &dyn ImageSource) -> Result<CompilerOutput> {
        let diagnostics = Diagnostics::new();
        let mut references = DedupSet::new();

        let mut bones = Vec::with_capacity(palette.len());
        {
            let shapes = ShapeResolver::new(self.rules, &diagnostics);
            let expander = CubeExpander::new(self.rules, &shapes, &diagnostics)
                .with_strict(self.config.strict)
                .with_max_copy_depth(self.config.max_copy_depth);
            let builder = BoneBuilder::new(self.rules, &diagnostics, self.config.scale);

            for block in palette {
                if self.rules.is_ignored(&block.name) {
                    bones.push(BoneTemplate::empty(block.short_name(), self.config.scale));
                    continue;
                }
                let mut block = block.clone();
                if self
                    .rules
                    .ignored_block_entities
                    .contains(strip_namespace(&block.name))
                {
                    block.block_entity_data = None;
                }

                let shape_id = shapes.resolve(&block.name);
                let cubes = expander.expand(&block, &shape_id)?;
                bones.push(builder.build(&block, &shape_id, &cubes, &mut references));
            }
            log::debug!("Resolved shapes for {} distinct block names", shapes.cached_count());
        }

        let resolver = TextureResolver::new(self.rules, &diagnostics);
        let mut fragments = DedupSet::new();
        let reference_fragments: Vec<usize> = references
            .iter()
            .map(|reference| fragments.insert(resolver.resolve(reference)))
            .collect();
        let fragments = fragments.into_vec();
        log::info!(
            "{} palette entries, {} texture references, {} unique fragments",
            palette.len(),
            reference_fragments.len(),
            fragments.len()
        );

        let images = ImageLoader::new(source, self.rules, &diagnostics).load_fragments(&fragments);
        let atlas = build_atlas(&images, self.config.outline.as_ref());

        let uv_table: Vec<Placement> = reference_fragments
            .iter()
            .map(|&fragment| atlas.placements[fragment])
            .collect();

        for cube in bones.iter_mut().flat_map(|bone| bone.cubes.iter_mut()) {
            if cube.faces.len() != 1 {
                continue;
            }
            let crop = cube
                .faces
                .iter()
                .next()
                .and_then(|(&face, uv)| uv_table[uv.texture_index].crop.map(|crop| (face, crop)));
            if let Some((face, crop)) = crop {
                cube.apply_crop(face, &crop);
            }
        }

        let levels = self
            .config
            .opacity_levels
            .clone()
            .unwrap_or_else(|| vec![self.config.texture_opacity]);
        let atlases = levels
            .into_iter()
            .map(|opacity| AtlasVariant {
                opacity,
                atlas: atlas.with_opacity(opacity),
            })
            .collect();

        Ok(CompilerOutput {
            bones,
            texture_references: references.into_vec(),
            fragments,
            reference_fragments,
            uv_table,
            atlases,
            atlas_width: atlas.width,
            atlas_height: atlas.height,
            efficiency: atlas.efficiency,
            diagnostics: diagnostics.into_vec(),
        })
    }
}
