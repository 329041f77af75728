//! Bones: positioned cubes whose faces point into the texture reference table.

use super::uv::{face_uvs, FaceRect};
use crate::atlas::Placement;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::expand::ResolvedCube;
use crate::rules::{parse_hex_color, split_special_texture, RotationResolver, RuleTables, VariantResolver};
use crate::texture::{Crop, DedupSet, TextureReference, TextureSource};
use crate::types::{strip_namespace, Axis, Block, Face, Rotation, DEFAULT_PIVOT};
use glam::DVec3;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// A face's texture: an index into the reference table plus final UV flips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FaceUv {
    pub texture_index: usize,
    pub flip_u: bool,
    pub flip_v: bool,
}

impl FaceUv {
    /// Final UV origin and size in atlas pixels. A flipped axis starts at the
    /// far edge and has a negative size.
    pub fn atlas_uv(&self, placement: &Placement) -> ([f64; 2], [f64; 2]) {
        let mut uv = placement.uv;
        let mut size = placement.uv_size;
        if self.flip_u {
            uv[0] += size[0];
            size[0] = -size[0];
        }
        if self.flip_v {
            uv[1] += size[1];
            size[1] = -size[1];
        }
        (uv, size)
    }
}

/// A cube in bone space, already translated and scaled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoneCube {
    pub origin: [f64; 3],
    pub size: [f64; 3],
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<Rotation>,
    /// Nested rotations for wrapper bones, outermost first.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extra_rotations: Vec<Rotation>,
    pub faces: BTreeMap<Face, FaceUv>,
}

impl BoneCube {
    /// Move the cube and its pivots.
    pub fn offset(&mut self, offset: [f64; 3]) {
        self.origin = (DVec3::from_array(self.origin) + DVec3::from_array(offset)).to_array();
        self.rotation = self.rotation.map(|r| r.translated(offset));
        for extra in &mut self.extra_rotations {
            *extra = extra.translated(offset);
        }
    }

    /// Shrink the cube to the visible part of one face's texture.
    ///
    /// `crop` is relative to the face's source rectangle; its horizontal and
    /// vertical parts land on the two in-plane axes of the face.
    pub fn apply_crop(&mut self, face: Face, crop: &Crop) {
        let Some(face_uv) = self.faces.get(&face) else {
            return;
        };
        let vertical = face.is_vertical_facing();
        let ((u_axis, u_forward), (v_axis, v_forward)) = crop_axes(face);
        let u_forward = u_forward != (face_uv.flip_u != vertical);
        let v_forward = v_forward != (face_uv.flip_v != vertical);

        self.crop_axis(u_axis, u_forward, crop.x, crop.w);
        self.crop_axis(v_axis, v_forward, crop.y, crop.h);
    }

    fn crop_axis(&mut self, axis: Axis, forward: bool, start: f64, length: f64) {
        let i = axis.index();
        let full = self.size[i];
        let skipped = if forward { start } else { 1.0 - start - length };
        self.origin[i] += skipped * full;
        self.size[i] = length * full;
    }
}

/// Geometry axis and direction that texture u and v run along on a face.
fn crop_axes(face: Face) -> ((Axis, bool), (Axis, bool)) {
    match face {
        Face::West => ((Axis::Z, true), (Axis::Y, false)),
        Face::East => ((Axis::Z, false), (Axis::Y, false)),
        Face::North => ((Axis::X, false), (Axis::Y, false)),
        Face::South => ((Axis::X, true), (Axis::Y, false)),
        Face::Up => ((Axis::X, true), (Axis::Z, true)),
        Face::Down => ((Axis::X, true), (Axis::Z, false)),
    }
}

/// All cubes of one palette entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BoneTemplate {
    pub block_name: String,
    pub cubes: Vec<BoneCube>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<[f64; 3]>,
    pub pivot: [f64; 3],
    pub scale: f64,
}

impl BoneTemplate {
    /// A template without geometry, for ignored blocks.
    pub fn empty(block_name: impl Into<String>, scale: f64) -> Self {
        Self {
            block_name: block_name.into(),
            cubes: Vec::new(),
            rotation: None,
            pivot: (DVec3::from_array(DEFAULT_PIVOT) * scale).to_array(),
            scale,
        }
    }

    /// Copy of the template moved to a block position.
    pub fn place(&self, position: [i32; 3]) -> BoneTemplate {
        let offset = position.map(|p| p as f64 * 16.0 * self.scale);
        let mut placed = self.clone();
        for cube in &mut placed.cubes {
            cube.offset(offset);
        }
        placed.pivot = (DVec3::from_array(self.pivot) + DVec3::from_array(offset)).to_array();
        placed
    }
}

/// Turns expanded cubes into bone cubes and records their texture references.
pub struct BoneBuilder<'a> {
    rules: &'a RuleTables,
    diagnostics: &'a Diagnostics,
    rotations: RotationResolver<'a>,
    variants: VariantResolver<'a>,
    scale: f64,
}

impl<'a> BoneBuilder<'a> {
    pub fn new(rules: &'a RuleTables, diagnostics: &'a Diagnostics, scale: f64) -> Self {
        Self {
            rules,
            diagnostics,
            rotations: RotationResolver::new(&rules.rotations),
            variants: VariantResolver::new(&rules.variants),
            scale,
        }
    }

    /// Build the bone for `block`, inserting every face reference into `references`.
    pub fn build(
        &self,
        block: &Block,
        shape_id: &str,
        cubes: &[ResolvedCube],
        references: &mut DedupSet<TextureReference>,
    ) -> BoneTemplate {
        let (shape_key, _) = split_special_texture(shape_id);
        let cubes = cubes
            .iter()
            .map(|cube| self.build_cube(block, cube, references))
            .collect();

        BoneTemplate {
            block_name: block.short_name().to_string(),
            cubes,
            rotation: self.rotations.resolve(block, shape_key),
            pivot: (DVec3::from_array(DEFAULT_PIVOT) * self.scale).to_array(),
            scale: self.scale,
        }
    }

    fn build_cube(
        &self,
        palette_block: &Block,
        cube: &ResolvedCube,
        references: &mut DedupSet<TextureReference>,
    ) -> BoneCube {
        let block = cube.block.as_ref().unwrap_or(palette_block);
        let uvs = face_uvs(cube, self.diagnostics);
        let croppable = cube.meta.croppable.unwrap_or(false) && uvs.len() == 1;
        let variant = self.variant(block, cube);
        let tint = self.tint(cube);

        let faces = uvs
            .into_iter()
            .map(|(face, FaceRect { uv, uv_size })| {
                let reference = TextureReference {
                    uv,
                    uv_size,
                    source: self.source(block, cube, face, variant),
                    tint,
                    croppable,
                };
                let face_uv = FaceUv {
                    texture_index: references.insert(reference),
                    flip_u: flips(&cube.meta.flip_textures_horizontally, face) != face.is_vertical_facing(),
                    flip_v: flips(&cube.meta.flip_textures_vertically, face) != face.is_vertical_facing(),
                };
                (face, face_uv)
            })
            .collect();

        let translate = cube.meta.translate.unwrap_or([0.0; 3]);
        let place = |rotation: Rotation| rotation.translated(translate).scaled(self.scale);
        BoneCube {
            origin: ((DVec3::from_array(cube.pos) + DVec3::from_array(translate)) * self.scale).to_array(),
            size: (DVec3::from_array(cube.size) * self.scale).to_array(),
            rotation: cube.rotation.map(place),
            extra_rotations: cube.extra_rotations.iter().copied().map(place).collect(),
            faces,
        }
    }

    fn source(&self, block: &Block, cube: &ResolvedCube, face: Face, variant: i64) -> TextureSource {
        if let Some(path) = &cube.meta.texture_path {
            return TextureSource::Path { path: path.clone() };
        }
        let block_name = strip_namespace(&block.name).to_string();
        match &cube.meta.terrain_texture {
            Some(key) => TextureSource::TerrainKey {
                block_name,
                key: key.clone(),
                variant,
            },
            None => TextureSource::Block {
                block_name,
                face: super::uv::face_selector(cube, face).to_string(),
                variant,
            },
        }
    }

    /// Eigenvariant, then the cube's own variant, then the variant tables.
    fn variant(&self, block: &Block, cube: &ResolvedCube) -> i64 {
        let ignore_eigenvariant = cube.meta.ignore_eigenvariant.unwrap_or(false);
        let eigenvariant = if ignore_eigenvariant {
            None
        } else {
            self.rules.variants.eigenvariants.get(strip_namespace(&block.name)).copied()
        };
        let (shape_key, _) = split_special_texture(&cube.shape_id);
        eigenvariant
            .or(cube.meta.variant)
            .unwrap_or_else(|| self.variants.resolve(block, shape_key, true))
    }

    fn tint(&self, cube: &ResolvedCube) -> Option<[f64; 3]> {
        let color = cube.meta.tint.as_deref()?;
        let rgb = parse_hex_color(color);
        if rgb.is_none() {
            self.diagnostics.warn(
                DiagnosticKind::InvalidTint,
                format!("Invalid cube tint {:?} in shape {}", color, cube.shape_id),
            );
        }
        rgb
    }
}

fn flips(set: &Option<BTreeSet<String>>, face: Face) -> bool {
    set.as_ref().is_some_and(|faces| faces.contains(face.name()))
}
