//! Cube expansion: shape templates to concrete cubes.
//!
//! The expander works through a queue of templates. `copy` directives push
//! the copied shape's templates back onto the queue, `copy_block` directives
//! expand another block entirely and append its cubes to the output as-is.

pub mod condition;
pub mod interpolate;
mod template;

pub use template::CubeTemplate;

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::error::{CompilerError, Result};
use crate::mesher::merge::{merge_cuboids, Cuboid};
use crate::rules::{split_special_texture, RuleTables, ShapeResolver, DEFAULT_SHAPE};
use crate::types::{strip_namespace, Block, Rotation, StateValue};
use glam::DVec3;
use serde_json::Value;
use std::collections::{BTreeMap, VecDeque};

/// Default limit on nested `copy` / `copy_block` levels.
pub const DEFAULT_MAX_COPY_DEPTH: usize = 8;

/// A concrete cube produced by expansion.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCube {
    pub pos: [f64; 3],
    pub size: [f64; 3],
    pub rotation: Option<Rotation>,
    /// Outer rotations from copy chains, outermost first.
    pub extra_rotations: Vec<Rotation>,
    /// Remaining per-cube fields: textures, UVs, tint, flips, translate.
    pub meta: CubeTemplate,
    /// Block the faces resolve against when it is not the palette block
    /// (state overrides or a copy_block target).
    pub block: Option<Block>,
    /// Shape the cube's block resolved to.
    pub shape_id: String,
}

impl ResolvedCube {
    fn from_template(mut template: CubeTemplate, block: Option<Block>, shape_id: &str) -> Self {
        let rotation = template.rotation();
        let pos = template.pos.take().unwrap_or([0.0; 3]);
        let size = template.size.take().unwrap_or([16.0; 3]);
        let extra_rotations = std::mem::take(&mut template.extra_rotations);

        // Consumed during expansion.
        template.rot = None;
        template.pivot = None;
        template.condition = None;
        template.copy = None;
        template.copy_block = None;
        template.block_states = None;
        template.arrays = None;

        Self {
            pos,
            size,
            rotation,
            extra_rotations,
            meta: template,
            block,
            shape_id: shape_id.to_string(),
        }
    }

    pub fn x(&self) -> f64 {
        self.pos[0]
    }

    pub fn y(&self) -> f64 {
        self.pos[1]
    }

    pub fn z(&self) -> f64 {
        self.pos[2]
    }

    pub fn w(&self) -> f64 {
        self.size[0]
    }

    pub fn h(&self) -> f64 {
        self.size[1]
    }

    pub fn d(&self) -> f64 {
        self.size[2]
    }

    /// Only a position and a size, nonzero on every axis. Bare cubes are
    /// the only merge candidates.
    pub fn is_bare(&self) -> bool {
        self.meta == CubeTemplate::default()
            && self.block.is_none()
            && self.rotation.is_none()
            && self.extra_rotations.is_empty()
            && self.size.iter().all(|&s| s != 0.0)
    }

    /// Move the cube and every pivot it carries.
    pub fn translate_by(&mut self, offset: [f64; 3]) {
        self.pos = (DVec3::from_array(self.pos) + DVec3::from_array(offset)).to_array();
        self.rotation = self.rotation.map(|r| r.translated(offset));
        for extra in &mut self.extra_rotations {
            *extra = extra.translated(offset);
        }
    }

    fn bare(cuboid: Cuboid, shape_id: &str) -> Self {
        Self {
            pos: cuboid.pos,
            size: cuboid.size,
            rotation: None,
            extra_rotations: Vec::new(),
            meta: CubeTemplate::default(),
            block: None,
            shape_id: shape_id.to_string(),
        }
    }
}

struct Pending {
    template: CubeTemplate,
    /// Shapes this template was copied through, root first.
    chain: Vec<String>,
}

/// Expands blocks into resolved cubes.
pub struct CubeExpander<'a> {
    rules: &'a RuleTables,
    shapes: &'a ShapeResolver<'a>,
    diagnostics: &'a Diagnostics,
    strict: bool,
    max_depth: usize,
}

impl<'a> CubeExpander<'a> {
    pub fn new(rules: &'a RuleTables, shapes: &'a ShapeResolver<'a>, diagnostics: &'a Diagnostics) -> Self {
        Self {
            rules,
            shapes,
            diagnostics,
            strict: false,
            max_depth: DEFAULT_MAX_COPY_DEPTH,
        }
    }

    /// Make self-copies and runaway nesting fatal.
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn with_max_copy_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Expand a block's shape into concrete cubes.
    ///
    /// Only strict-mode programmer errors return `Err`; data gaps are
    /// recorded as diagnostics and expansion carries on.
    pub fn expand(&self, block: &Block, shape_id: &str) -> Result<Vec<ResolvedCube>> {
        self.expand_at_depth(block, shape_id, 0)
    }

    fn expand_at_depth(&self, block: &Block, shape_id: &str, depth: usize) -> Result<Vec<ResolvedCube>> {
        let (shape_key, special_path) = split_special_texture(shape_id);
        let (shape_key, templates) = match self.rules.geometry(shape_key) {
            Some(templates) => (shape_key, templates),
            None => {
                self.diagnostics.warn(
                    DiagnosticKind::MissingShape,
                    format!("No geometry for shape {} (block {}), using {}", shape_key, block.name, DEFAULT_SHAPE),
                );
                match self.rules.geometry(DEFAULT_SHAPE) {
                    Some(templates) => (DEFAULT_SHAPE, templates),
                    None => return Ok(Vec::new()),
                }
            }
        };

        let mut queue: VecDeque<Pending> = templates
            .iter()
            .map(|template| Pending {
                template: with_special_path(template.clone(), special_path),
                chain: vec![shape_key.to_string()],
            })
            .collect();

        let mut filtered = Vec::new();
        let mut finals = Vec::new();

        while let Some(Pending { mut template, chain }) = queue.pop_front() {
            let override_block = template.block_states.as_ref().map(|states| {
                let states: BTreeMap<String, StateValue> = states
                    .iter()
                    .map(|(key, value)| {
                        (key.clone(), self.interpolate_state(block, value, template.arrays.as_ref()))
                    })
                    .collect();
                block.with_states_merged(&states)
            });
            let context = override_block.as_ref().unwrap_or(block);

            if let Some(expression) = &template.condition {
                if !condition::evaluate(context, expression, self.diagnostics) {
                    continue;
                }
            }

            self.interpolate_field(context, &mut template.terrain_texture, template.arrays.as_ref());
            self.interpolate_field(context, &mut template.texture_path, template.arrays.as_ref());
            self.interpolate_field(context, &mut template.tint, template.arrays.as_ref());

            if let Some(target) = template.copy.take() {
                self.push_copy(&mut queue, template, &target, chain, block)?;
                continue;
            }

            if let Some(directive) = template.copy_block.take() {
                finals.extend(self.copy_block(context, &directive, &template, depth)?);
                continue;
            }

            filtered.push(ResolvedCube::from_template(template, override_block, shape_key));
        }

        let (bare, rest): (Vec<_>, Vec<_>) = filtered.into_iter().partition(ResolvedCube::is_bare);
        let merged = merge_cuboids(
            bare.into_iter()
                .map(|cube| Cuboid::new(cube.pos, cube.size))
                .collect(),
        );

        let mut cubes: Vec<ResolvedCube> = merged
            .into_iter()
            .map(|cuboid| ResolvedCube::bare(cuboid, shape_key))
            .collect();
        cubes.extend(rest);
        cubes.extend(finals);
        Ok(cubes)
    }

    fn push_copy(
        &self,
        queue: &mut VecDeque<Pending>,
        parent: CubeTemplate,
        target: &str,
        chain: Vec<String>,
        block: &Block,
    ) -> Result<()> {
        let (target_key, special_path) = split_special_texture(target);

        if chain.iter().any(|shape| shape == target_key) {
            let message = format!(
                "Shape {} copies {} which is already being expanded ({}), skipping",
                chain.last().map(String::as_str).unwrap_or(target_key),
                target_key,
                chain.join(" -> ")
            );
            if self.strict {
                return Err(CompilerError::SelfReferentialCopy(target_key.to_string()));
            }
            self.diagnostics.error(DiagnosticKind::SelfCopy, message);
            return Ok(());
        }

        if chain.len() > self.max_depth {
            if self.strict {
                return Err(CompilerError::CopyDepthExceeded {
                    shape: target_key.to_string(),
                    limit: self.max_depth,
                });
            }
            self.diagnostics.error(
                DiagnosticKind::CopyDepth,
                format!("Copy chain {} too deep for {}, skipping", chain.join(" -> "), block.name),
            );
            return Ok(());
        }

        let Some(templates) = self.rules.geometry(target_key) else {
            self.diagnostics.warn(
                DiagnosticKind::MissingShape,
                format!("Copied shape {} has no geometry (block {})", target_key, block.name),
            );
            return Ok(());
        };

        let mut sub_chain = chain;
        sub_chain.push(target_key.to_string());
        for sub in templates {
            let mut sub = with_special_path(sub.clone(), special_path);
            sub.inherit_from(&parent);
            queue.push_back(Pending {
                template: sub,
                chain: sub_chain.clone(),
            });
        }
        Ok(())
    }

    fn copy_block(
        &self,
        block: &Block,
        directive: &str,
        template: &CubeTemplate,
        depth: usize,
    ) -> Result<Vec<ResolvedCube>> {
        let Some(property) = directive.strip_prefix("entity.") else {
            self.diagnostics.warn(
                DiagnosticKind::CopyBlock,
                format!("copy_block {:?} on {} is not entity.<property>", directive, block.name),
            );
            return Ok(Vec::new());
        };

        let copied = match block.entity_value(property) {
            Some(Value::String(name)) => Some(Block::new(strip_namespace(name))),
            Some(value @ Value::Object(_)) => serde_json::from_value::<Block>(value.clone()).ok(),
            _ => None,
        };
        let Some(mut copied) = copied else {
            self.diagnostics.warn(
                DiagnosticKind::CopyBlock,
                format!("copy_block {:?} on {} found no block", directive, block.name),
            );
            return Ok(Vec::new());
        };

        copied.name = strip_namespace(&copied.name).to_string();
        if self.rules.is_ignored(&copied.name) {
            return Ok(Vec::new());
        }

        if depth >= self.max_depth {
            if self.strict {
                return Err(CompilerError::CopyDepthExceeded {
                    shape: copied.name,
                    limit: self.max_depth,
                });
            }
            self.diagnostics.error(
                DiagnosticKind::CopyDepth,
                format!("copy_block nesting too deep at {} inside {}, skipping", copied.name, block.name),
            );
            return Ok(Vec::new());
        }

        if self.rules.ignored_block_entities.contains(&copied.name) {
            copied.block_entity_data = None;
        }
        copied.copied_via_copy_block = true;

        let shape_id = self.shapes.resolve(&copied.name);
        let mut cubes = self.expand_at_depth(&copied, &shape_id, depth + 1)?;
        let offset = template.translate.unwrap_or([0.0; 3]);
        for cube in &mut cubes {
            cube.translate_by(offset);
            if cube.block.is_none() {
                cube.block = Some(copied.clone());
            }
        }
        Ok(cubes)
    }

    fn interpolate_state(
        &self,
        block: &Block,
        value: &StateValue,
        arrays: Option<&BTreeMap<String, Vec<Value>>>,
    ) -> StateValue {
        match value {
            StateValue::Str(s) if s.contains("${") => {
                let resolved = interpolate::interpolate(block, s, arrays, self.diagnostics);
                match resolved.parse::<i64>() {
                    Ok(i) => StateValue::Int(i),
                    Err(_) => StateValue::Str(resolved),
                }
            }
            other => other.clone(),
        }
    }

    fn interpolate_field(
        &self,
        block: &Block,
        field: &mut Option<String>,
        arrays: Option<&BTreeMap<String, Vec<Value>>>,
    ) {
        if let Some(value) = field.as_mut() {
            if value.contains("${") {
                *value = interpolate::interpolate(block, value, arrays, self.diagnostics);
            }
        }
    }
}

fn with_special_path(mut template: CubeTemplate, special_path: Option<&str>) -> CubeTemplate {
    if let Some(path) = special_path {
        if template.texture_path.is_none() {
            template.texture_path = Some(path.to_string());
        }
    }
    template
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tables(geometry: Value) -> RuleTables {
        serde_json::from_value(json!({
            "shapes_by_name": {"flower_pot": "flower_pot", "red_flower": "cross", "stone": "block"},
            "shape_geometry": geometry,
            "ignored_blocks": ["air"]
        }))
        .unwrap()
    }

    fn expand(rules: &RuleTables, block: &Block, shape_id: &str) -> (Vec<ResolvedCube>, Diagnostics) {
        let diagnostics = Diagnostics::new();
        let cubes = {
            let shapes = ShapeResolver::new(rules, &diagnostics);
            CubeExpander::new(rules, &shapes, &diagnostics)
                .expand(block, shape_id)
                .unwrap()
        };
        (cubes, diagnostics)
    }

    #[test]
    fn test_plain_block_is_bare() {
        let rules = tables(json!({"block": [{"pos": [0, 0, 0], "size": [16, 16, 16]}]}));
        let (cubes, diagnostics) = expand(&rules, &Block::new("stone"), "block");
        assert_eq!(cubes.len(), 1);
        assert!(cubes[0].is_bare());
        assert_eq!((cubes[0].w(), cubes[0].h(), cubes[0].d()), (16.0, 16.0, 16.0));
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_missing_shape_falls_back() {
        let rules = tables(json!({"block": [{"pos": [0, 0, 0], "size": [16, 16, 16]}]}));
        let (cubes, diagnostics) = expand(&rules, &Block::new("mystery"), "mystery_shape");
        assert_eq!(cubes.len(), 1);
        assert_eq!(cubes[0].shape_id, "block");
        assert_eq!(diagnostics.count(DiagnosticKind::MissingShape), 1);
    }

    #[test]
    fn test_bare_halves_merge() {
        let rules = tables(json!({"double_slab": [
            {"pos": [0, 0, 0], "size": [16, 8, 16]},
            {"pos": [0, 8, 0], "size": [16, 8, 16]},
            {"pos": [0, 0, 0], "size": [0, 4, 5], "textures": {"*": "side"}}
        ]}));
        let (cubes, _) = expand(&rules, &Block::new("double_slab"), "double_slab");
        assert_eq!(cubes.len(), 2);
        assert_eq!(cubes[0].size, [16.0, 16.0, 16.0]);
        assert!(!cubes[1].is_bare());
    }

    #[test]
    fn test_zero_width_cube_not_bare() {
        let rules = tables(json!({"decal": [{"pos": [0, 2, 3], "size": [0, 4, 5]}]}));
        let (cubes, _) = expand(&rules, &Block::new("decal"), "decal");
        assert_eq!(cubes.len(), 1);
        assert!(!cubes[0].is_bare());
    }

    #[test]
    fn test_conditions_filter_cubes() {
        let rules = tables(json!({"slab": [
            {"if": "top_slot_bit == 0", "pos": [0, 0, 0], "size": [16, 8, 16]},
            {"if": "top_slot_bit == 1", "pos": [0, 8, 0], "size": [16, 8, 16]}
        ]}));
        let block = Block::new("stone_slab").with_state("top_slot_bit", StateValue::Bool(true));
        let (cubes, _) = expand(&rules, &block, "slab");
        assert_eq!(cubes.len(), 1);
        assert_eq!(cubes[0].pos, [0.0, 8.0, 0.0]);
    }

    #[test]
    fn test_block_state_override_feeds_condition() {
        let rules = tables(json!({"stairs": [
            {"block_states": {"top_slot_bit": 1}, "if": "top_slot_bit == 1",
             "pos": [0, 8, 0], "size": [16, 8, 16]}
        ]}));
        let block = Block::new("oak_stairs").with_state("top_slot_bit", StateValue::Int(0));
        let (cubes, _) = expand(&rules, &block, "stairs");
        assert_eq!(cubes.len(), 1);
        let override_block = cubes[0].block.as_ref().unwrap();
        assert_eq!(override_block.state("top_slot_bit"), Some(&StateValue::Int(1)));
    }

    #[test]
    fn test_copy_inherits_translate_and_rotation() {
        let rules = tables(json!({
            "half": [{"pos": [0, 0, 0], "size": [16, 8, 16], "textures": {"*": "side"}}],
            "lever": [{"copy": "half", "translate": [0, 8, 0], "rot": [0, 90, 0]}]
        }));
        let (cubes, _) = expand(&rules, &Block::new("lever"), "lever");
        assert_eq!(cubes.len(), 1);
        assert_eq!(cubes[0].meta.translate, Some([0.0, 8.0, 0.0]));
        assert_eq!(cubes[0].rotation, Some(Rotation::new([0.0, 90.0, 0.0], [8.0, 8.0, 8.0])));
        assert!(cubes[0].extra_rotations.is_empty());
    }

    #[test]
    fn test_self_copy_is_skipped() {
        let rules = tables(json!({
            "loop_a": [{"copy": "loop_b"}],
            "loop_b": [{"copy": "loop_a"}, {"pos": [0, 0, 0], "size": [16, 1, 16], "tint": "#ffffff"}]
        }));
        let (cubes, diagnostics) = expand(&rules, &Block::new("loop"), "loop_a");
        assert_eq!(cubes.len(), 1);
        assert_eq!(diagnostics.count(DiagnosticKind::SelfCopy), 1);
    }

    #[test]
    fn test_self_copy_strict_is_fatal() {
        let rules = tables(json!({"loop": [{"copy": "loop"}]}));
        let diagnostics = Diagnostics::new();
        let shapes = ShapeResolver::new(&rules, &diagnostics);
        let result = CubeExpander::new(&rules, &shapes, &diagnostics)
            .with_strict(true)
            .expand(&Block::new("loop"), "loop");
        assert!(matches!(result, Err(CompilerError::SelfReferentialCopy(_))));
    }

    fn copy_chain_tables() -> RuleTables {
        tables(json!({
            "c0": [{"copy": "c1"}],
            "c1": [{"copy": "c2"}],
            "c2": [{"copy": "c3"}],
            "c3": [{"pos": [0, 0, 0], "size": [16, 1, 16], "tint": "#ffffff"}]
        }))
    }

    #[test]
    fn test_copy_chain_depth_limit() {
        let rules = copy_chain_tables();
        let block = Block::new("chain");

        let diagnostics = Diagnostics::new();
        let shapes = ShapeResolver::new(&rules, &diagnostics);
        let within = CubeExpander::new(&rules, &shapes, &diagnostics)
            .with_max_copy_depth(3)
            .expand(&block, "c0")
            .unwrap();
        assert_eq!(within.len(), 1);
        assert_eq!(diagnostics.count(DiagnosticKind::CopyDepth), 0);

        let too_deep = CubeExpander::new(&rules, &shapes, &diagnostics)
            .with_max_copy_depth(2)
            .expand(&block, "c0")
            .unwrap();
        assert!(too_deep.is_empty());
        assert_eq!(diagnostics.count(DiagnosticKind::CopyDepth), 1);
        assert_eq!(diagnostics.count(DiagnosticKind::SelfCopy), 0);
    }

    #[test]
    fn test_copy_chain_depth_limit_strict() {
        let rules = copy_chain_tables();
        let diagnostics = Diagnostics::new();
        let shapes = ShapeResolver::new(&rules, &diagnostics);
        let result = CubeExpander::new(&rules, &shapes, &diagnostics)
            .with_strict(true)
            .with_max_copy_depth(2)
            .expand(&Block::new("chain"), "c0");
        assert!(matches!(
            result,
            Err(CompilerError::CopyDepthExceeded { ref shape, limit: 2 }) if shape == "c3"
        ));
    }

    fn nested_shelf() -> (RuleTables, Block) {
        let rules: RuleTables = serde_json::from_value(json!({
            "shapes_by_name": {"shelf": "shelf"},
            "shape_geometry": {
                "shelf": [
                    {"pos": [0, 0, 0], "size": [16, 2, 16], "tint": "#ffffff"},
                    {"copy_block": "entity.Inner", "translate": [0, 2, 0]}
                ]
            }
        }))
        .unwrap();
        let block = Block::new("shelf").with_entity_data(
            "Inner",
            json!({"name": "shelf", "block_entity_data": {"Inner": {"name": "shelf"}}}),
        );
        (rules, block)
    }

    #[test]
    fn test_copy_block_nesting_limit() {
        let (rules, block) = nested_shelf();
        let diagnostics = Diagnostics::new();
        let shapes = ShapeResolver::new(&rules, &diagnostics);
        let cubes = CubeExpander::new(&rules, &shapes, &diagnostics)
            .with_max_copy_depth(1)
            .expand(&block, "shelf")
            .unwrap();

        // The outer shelf and one embedded copy; the third level is cut off.
        assert_eq!(cubes.len(), 2);
        assert_eq!(cubes[1].pos, [0.0, 2.0, 0.0]);
        assert_eq!(diagnostics.count(DiagnosticKind::CopyDepth), 1);
    }

    #[test]
    fn test_copy_block_nesting_limit_strict() {
        let (rules, block) = nested_shelf();
        let diagnostics = Diagnostics::new();
        let shapes = ShapeResolver::new(&rules, &diagnostics);
        let result = CubeExpander::new(&rules, &shapes, &diagnostics)
            .with_strict(true)
            .with_max_copy_depth(1)
            .expand(&block, "shelf");
        assert!(matches!(
            result,
            Err(CompilerError::CopyDepthExceeded { ref shape, limit: 1 }) if shape == "shelf"
        ));
    }

    #[test]
    fn test_copy_block_embeds_entity_block() {
        let rules = tables(json!({
            "flower_pot": [
                {"pos": [5, 0, 5], "size": [6, 6, 6], "textures": {"*": "side"}},
                {"copy_block": "entity.PlantBlock", "translate": [0, 4, 0]}
            ],
            "cross": [
                {"if": "#copied_via_copy_block", "pos": [8, 0, 0], "size": [0, 16, 16], "rot": [0, 45, 0]}
            ]
        }));
        let pot = Block::new("flower_pot").with_entity_data(
            "PlantBlock",
            json!({"name": "minecraft:red_flower", "states": {"flower_type": "tulip_red"}}),
        );
        let (cubes, _) = expand(&rules, &pot, "flower_pot");
        assert_eq!(cubes.len(), 2);

        let plant = &cubes[1];
        assert_eq!(plant.pos, [8.0, 4.0, 0.0]);
        assert_eq!(plant.rotation.unwrap().pivot, [8.0, 12.0, 8.0]);
        let copied = plant.block.as_ref().unwrap();
        assert_eq!(copied.name, "red_flower");
        assert!(copied.copied_via_copy_block);
        assert_eq!(plant.shape_id, "cross");
    }

    #[test]
    fn test_copy_block_skips_ignored() {
        let rules = tables(json!({
            "flower_pot": [{"copy_block": "entity.PlantBlock"}]
        }));
        let pot = Block::new("flower_pot").with_entity_data("PlantBlock", json!("minecraft:air"));
        let (cubes, diagnostics) = expand(&rules, &pot, "flower_pot");
        assert!(cubes.is_empty());
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_special_texture_path_applies() {
        let rules = tables(json!({"pane": [
            {"pos": [0, 0, 7], "size": [16, 16, 2]},
            {"pos": [0, 0, 0], "size": [16, 16, 0], "texture_path": "textures/blocks/own"}
        ]}));
        let (cubes, _) = expand(&rules, &Block::new("glass_pane"), "pane{textures/blocks/glass}");
        assert_eq!(cubes.len(), 2);
        assert_eq!(cubes[0].meta.texture_path.as_deref(), Some("textures/blocks/glass"));
        assert_eq!(cubes[1].meta.texture_path.as_deref(), Some("textures/blocks/own"));
    }

    #[test]
    fn test_terrain_texture_interpolated() {
        let rules = tables(json!({"bed": [
            {"pos": [0, 0, 0], "size": [16, 9, 16], "terrain_texture": "bed_${Array.colors[entity.color]}",
             "arrays": {"colors": ["white", "orange"]}}
        ]}));
        let bed = Block::new("bed").with_entity_data("color", json!(1));
        let (cubes, _) = expand(&rules, &bed, "bed");
        assert_eq!(cubes[0].meta.terrain_texture.as_deref(), Some("bed_orange"));
        assert!(cubes[0].meta.arrays.is_none());
    }
}
