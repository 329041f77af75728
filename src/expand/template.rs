//! Cube templates as they appear in the shape geometry table.

use crate::types::{Rotation, StateValue, DEFAULT_PIVOT};
use glam::DVec3;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};

/// A declarative cube record. Every field is optional; positions and sizes
/// are in 1/16-block units.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CubeTemplate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pos: Option<[f64; 3]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<[f64; 3]>,
    /// Geometry face (or "side" / "*") -> face name in the block's face table, or "none".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub textures: Option<BTreeMap<String, String>>,
    /// Explicit per-face UV origins.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uv: Option<BTreeMap<String, [f64; 2]>>,
    /// Explicit per-face UV sizes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uv_sizes: Option<BTreeMap<String, [f64; 2]>>,
    /// Box-UV anchor; switches the cube to box-UV mode.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub box_uv: Option<[f64; 2]>,
    /// Box-UV box size; defaults to the cube size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub box_uv_size: Option<[f64; 3]>,
    /// Size of the texture the UVs are written against; defaults to 16x16.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub texture_size: Option<[f64; 2]>,
    /// Block state overrides used for this cube's conditions and textures.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_states: Option<BTreeMap<String, StateValue>>,
    #[serde(rename = "if", skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    /// Shape id whose cubes replace this one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copy: Option<String>,
    /// `entity.<property>` naming a block to embed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copy_block: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rot: Option<[f64; 3]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pivot: Option<[f64; 3]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub translate: Option<[f64; 3]>,
    /// Hex tint, may contain placeholders.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tint: Option<String>,
    /// Terrain texture key override, may contain placeholders.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub terrain_texture: Option<String>,
    /// Direct image path override, may contain placeholders.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub texture_path: Option<String>,
    /// Fixed texture variant index.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ignore_eigenvariant: Option<bool>,
    /// Allow trimming this cube's texture to its opaque bounds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub croppable: Option<bool>,
    /// Lookup arrays for `${Array.<name>[...]}` placeholders.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub arrays: Option<BTreeMap<String, Vec<Value>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flip_textures_horizontally: Option<BTreeSet<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flip_textures_vertically: Option<BTreeSet<String>>,
    /// Outer rotations collected while copying, outermost first.
    #[serde(skip)]
    pub extra_rotations: Vec<Rotation>,
}

impl CubeTemplate {
    /// Fold a `copy` parent into this copied sub-cube.
    ///
    /// Keyed objects merge with this cube's entries winning, flip sets XOR,
    /// translates add, and scalar fields are only filled when absent. A parent
    /// rotation never overwrites this cube's own rotation; it is queued as an
    /// extra rotation instead.
    pub fn inherit_from(&mut self, parent: &CubeTemplate) {
        self.translate = match (self.translate, parent.translate) {
            (Some(own), Some(theirs)) => {
                Some((DVec3::from_array(own) + DVec3::from_array(theirs)).to_array())
            }
            (own, theirs) => own.or(theirs),
        };

        xor_faces(&mut self.flip_textures_horizontally, &parent.flip_textures_horizontally);
        xor_faces(&mut self.flip_textures_vertically, &parent.flip_textures_vertically);

        merge_keyed(&mut self.textures, &parent.textures);
        merge_keyed(&mut self.uv, &parent.uv);
        merge_keyed(&mut self.uv_sizes, &parent.uv_sizes);
        merge_keyed(&mut self.block_states, &parent.block_states);
        merge_keyed(&mut self.arrays, &parent.arrays);

        fill(&mut self.pos, &parent.pos);
        fill(&mut self.size, &parent.size);
        fill(&mut self.box_uv, &parent.box_uv);
        fill(&mut self.box_uv_size, &parent.box_uv_size);
        fill(&mut self.texture_size, &parent.texture_size);
        fill(&mut self.condition, &parent.condition);
        fill(&mut self.copy_block, &parent.copy_block);
        fill(&mut self.tint, &parent.tint);
        fill(&mut self.terrain_texture, &parent.terrain_texture);
        fill(&mut self.texture_path, &parent.texture_path);
        fill(&mut self.variant, &parent.variant);
        fill(&mut self.ignore_eigenvariant, &parent.ignore_eigenvariant);
        fill(&mut self.croppable, &parent.croppable);

        let mut extra = parent.extra_rotations.clone();
        match (self.rot, parent.rot) {
            (Some(_), Some(parent_rot)) => {
                extra.push(Rotation::new(parent_rot, parent.pivot.unwrap_or(DEFAULT_PIVOT)));
            }
            (None, Some(parent_rot)) => {
                self.rot = Some(parent_rot);
                if self.pivot.is_none() {
                    self.pivot = parent.pivot;
                }
            }
            _ => {}
        }
        extra.append(&mut self.extra_rotations);
        self.extra_rotations = extra;
    }

    /// The rotation this cube declares, with its pivot defaulted.
    pub fn rotation(&self) -> Option<Rotation> {
        self.rot
            .map(|rot| Rotation::new(rot, self.pivot.unwrap_or(DEFAULT_PIVOT)))
    }
}

fn fill<T: Clone>(own: &mut Option<T>, parent: &Option<T>) {
    if own.is_none() {
        own.clone_from(parent);
    }
}

fn merge_keyed<V: Clone>(own: &mut Option<BTreeMap<String, V>>, parent: &Option<BTreeMap<String, V>>) {
    let Some(parent) = parent else {
        return;
    };
    let merged = own.get_or_insert_with(BTreeMap::new);
    for (key, value) in parent {
        merged.entry(key.clone()).or_insert_with(|| value.clone());
    }
}

fn xor_faces(own: &mut Option<BTreeSet<String>>, parent: &Option<BTreeSet<String>>) {
    let Some(parent) = parent else {
        return;
    };
    let current = own.take().unwrap_or_default();
    let flipped: BTreeSet<String> = current.symmetric_difference(parent).cloned().collect();
    *own = if flipped.is_empty() { None } else { Some(flipped) };
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(json: &str) -> CubeTemplate {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_parse_template() {
        let cube = parse(
            r##"{
                "pos": [0, 0, 0], "size": [16, 8, 16],
                "if": "top_slot_bit == 0",
                "textures": {"*": "side"},
                "tint": "#ff0000"
            }"##,
        );
        assert_eq!(cube.size, Some([16.0, 8.0, 16.0]));
        assert_eq!(cube.condition.as_deref(), Some("top_slot_bit == 0"));
        assert!(cube.extra_rotations.is_empty());
    }

    #[test]
    fn test_inherit_merges_and_fills() {
        let parent = parse(
            r#"{
                "copy": "slab", "translate": [0, 8, 0],
                "textures": {"up": "top", "north": "front"},
                "tint": "parent_tint", "croppable": true
            }"#,
        );
        let mut sub = parse(
            r#"{"pos": [0, 0, 0], "size": [16, 8, 16], "translate": [1, 0, 0],
                "textures": {"up": "own_top"}, "tint": "own_tint"}"#,
        );
        sub.inherit_from(&parent);

        assert_eq!(sub.translate, Some([1.0, 8.0, 0.0]));
        let textures = sub.textures.as_ref().unwrap();
        assert_eq!(textures.get("up").map(String::as_str), Some("own_top"));
        assert_eq!(textures.get("north").map(String::as_str), Some("front"));
        assert_eq!(sub.tint.as_deref(), Some("own_tint"));
        assert_eq!(sub.croppable, Some(true));
        assert!(sub.copy.is_none());
    }

    #[test]
    fn test_inherit_flip_sets_xor() {
        let parent = parse(r#"{"flip_textures_horizontally": ["up", "north"]}"#);
        let mut sub = parse(r#"{"flip_textures_horizontally": ["up", "west"]}"#);
        sub.inherit_from(&parent);
        let flips: Vec<_> = sub.flip_textures_horizontally.unwrap().into_iter().collect();
        assert_eq!(flips, vec!["north".to_string(), "west".to_string()]);
    }

    #[test]
    fn test_inherit_rotation_goes_to_extra() {
        let parent = parse(r#"{"rot": [0, 90, 0], "pivot": [8, 0, 8]}"#);
        let mut sub = parse(r#"{"rot": [22.5, 0, 0], "pivot": [8, 4, 8]}"#);
        sub.inherit_from(&parent);

        assert_eq!(sub.rot, Some([22.5, 0.0, 0.0]));
        assert_eq!(sub.pivot, Some([8.0, 4.0, 8.0]));
        assert_eq!(sub.extra_rotations, vec![Rotation::new([0.0, 90.0, 0.0], [8.0, 0.0, 8.0])]);

        // A second copy level puts its rotation in front.
        let grandparent = parse(r#"{"rot": [0, 0, 45]}"#);
        let mut parent_with_extra = parse(r#"{"rot": [0, 90, 0]}"#);
        parent_with_extra.inherit_from(&grandparent);
        let mut leaf = parse(r#"{"rot": [10, 0, 0]}"#);
        leaf.inherit_from(&parent_with_extra);
        assert_eq!(leaf.extra_rotations.len(), 2);
        assert_eq!(leaf.extra_rotations[0].rot, [0.0, 0.0, 45.0]);
        assert_eq!(leaf.extra_rotations[1].rot, [0.0, 90.0, 0.0]);
    }

    #[test]
    fn test_inherit_parent_rotation_only() {
        let parent = parse(r#"{"rot": [0, 90, 0], "pivot": [8, 0, 8]}"#);
        let mut sub = parse(r#"{"pos": [0, 0, 0], "size": [16, 16, 16]}"#);
        sub.inherit_from(&parent);
        assert_eq!(sub.rotation(), Some(Rotation::new([0.0, 90.0, 0.0], [8.0, 0.0, 8.0])));
        assert!(sub.extra_rotations.is_empty());

        let mut pivoted = parse(r#"{"pivot": [1, 2, 3]}"#);
        pivoted.inherit_from(&parent);
        assert_eq!(pivoted.pivot, Some([1.0, 2.0, 3.0]));
    }
}
