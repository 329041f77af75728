//! Face visibility and UV rectangles for resolved cubes.
//!
//! UVs come out in 0..1 units of the face texture. Auto-projected UVs treat
//! the texture as a 16x16 view through the block; up and down are defined
//! rotated 180 degrees and get flipped when final UVs are built.

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::expand::ResolvedCube;
use crate::types::{Axis, Face};
use std::collections::BTreeMap;

/// Face selector that hides a face.
pub const HIDDEN_FACE: &str = "none";

const DEFAULT_TEXTURE_SIZE: [f64; 2] = [16.0, 16.0];

/// A UV rectangle in 0..1 texture units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FaceRect {
    pub uv: [f64; 2],
    pub uv_size: [f64; 2],
}

/// Look up a per-face entry: exact face, then "side" for horizontal faces, then "*".
pub fn face_entry<'m, V>(map: Option<&'m BTreeMap<String, V>>, face: Face) -> Option<&'m V> {
    let map = map?;
    map.get(face.name())
        .or_else(|| if face.is_side() { map.get("side") } else { None })
        .or_else(|| map.get("*"))
}

/// Name in the block's face table that this face reads from.
pub fn face_selector(cube: &ResolvedCube, face: Face) -> &str {
    face_entry(cube.meta.textures.as_ref(), face)
        .map(String::as_str)
        .unwrap_or(face.name())
}

/// Faces that render. A cube flat on one axis renders a single face; a
/// `"none"` selector hides a face.
pub fn visible_faces(cube: &ResolvedCube) -> Vec<Face> {
    let candidates: Vec<Face> = match Axis::ALL.iter().find(|a| cube.size[a.index()] == 0.0) {
        Some(&axis) => vec![Face::for_flat_axis(axis)],
        None => Face::ALL.to_vec(),
    };
    candidates
        .into_iter()
        .filter(|&face| face_selector(cube, face) != HIDDEN_FACE)
        .collect()
}

/// UV rectangles for every visible face.
pub fn face_uvs(cube: &ResolvedCube, diagnostics: &Diagnostics) -> BTreeMap<Face, FaceRect> {
    let texture_size = match cube.meta.texture_size {
        Some(size) if size.iter().all(|v| v.is_finite() && *v > 0.0) => size,
        Some(size) => {
            diagnostics.warn(
                DiagnosticKind::InvalidTextureSize,
                format!(
                    "Shape {} has texture_size {:?}; using {:?}",
                    cube.shape_id, size, DEFAULT_TEXTURE_SIZE
                ),
            );
            DEFAULT_TEXTURE_SIZE
        }
        None => DEFAULT_TEXTURE_SIZE,
    };
    let normalize = |uv: [f64; 2], size: [f64; 2]| FaceRect {
        uv: [uv[0] / texture_size[0], uv[1] / texture_size[1]],
        uv_size: [size[0] / texture_size[0], size[1] / texture_size[1]],
    };

    visible_faces(cube)
        .into_iter()
        .map(|face| {
            let (uv, size) = match cube.meta.box_uv {
                Some(anchor) => box_uv(anchor, cube.meta.box_uv_size.unwrap_or(cube.size), face),
                None => {
                    let (auto_uv, auto_size) = auto_uv(cube, face);
                    let uv = face_entry(cube.meta.uv.as_ref(), face).copied().unwrap_or(auto_uv);
                    let size = face_entry(cube.meta.uv_sizes.as_ref(), face)
                        .copied()
                        .unwrap_or(auto_size);
                    (uv, size)
                }
            };
            (face, normalize(uv, size))
        })
        .collect()
}

/// Projection "looking through the block" onto a 16x16 texture.
fn auto_uv(cube: &ResolvedCube, face: Face) -> ([f64; 2], [f64; 2]) {
    let (x, y, z) = (cube.x(), cube.y(), cube.z());
    let (w, h, d) = (cube.w(), cube.h(), cube.d());
    match face {
        Face::West => ([z, 16.0 - y - h], [d, h]),
        Face::East => ([16.0 - z - d, 16.0 - y - h], [d, h]),
        Face::North => ([16.0 - x - w, 16.0 - y - h], [w, h]),
        Face::South => ([x, 16.0 - y - h], [w, h]),
        Face::Up => ([x, z], [w, d]),
        Face::Down => ([x, 16.0 - z - d], [w, d]),
    }
}

/// Unwrapped box layout: a top strip of up/down over a side strip of
/// east/north/west/south.
fn box_uv(anchor: [f64; 2], box_size: [f64; 3], face: Face) -> ([f64; 2], [f64; 2]) {
    let [u, v] = anchor;
    let [w, h, d] = box_size;
    match face {
        Face::East => ([u, v + d], [d, h]),
        Face::North => ([u + d, v + d], [w, h]),
        Face::West => ([u + d + w, v + d], [d, h]),
        Face::South => ([u + 2.0 * d + w, v + d], [w, h]),
        Face::Up => ([u + d, v], [w, d]),
        Face::Down => ([u + d + w, v], [w, d]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expand::CubeTemplate;

    fn cube(pos: [f64; 3], size: [f64; 3], meta: CubeTemplate) -> ResolvedCube {
        ResolvedCube {
            pos,
            size,
            rotation: None,
            extra_rotations: Vec::new(),
            meta,
            block: None,
            shape_id: "test".to_string(),
        }
    }

    fn meta(json: &str) -> CubeTemplate {
        serde_json::from_str(json).unwrap()
    }

    fn uvs_of(cube: &ResolvedCube) -> BTreeMap<Face, FaceRect> {
        face_uvs(cube, &Diagnostics::new())
    }

    #[test]
    fn test_zero_width_renders_west_only() {
        let decal = cube([0.0, 2.0, 3.0], [0.0, 4.0, 5.0], CubeTemplate::default());
        let uvs = uvs_of(&decal);
        assert_eq!(uvs.len(), 1);
        let west = uvs[&Face::West];
        assert_eq!(west.uv, [3.0 / 16.0, 10.0 / 16.0]);
        assert_eq!(west.uv_size, [5.0 / 16.0, 4.0 / 16.0]);
        assert!(!decal.is_bare());
    }

    #[test]
    fn test_flat_faces_per_axis() {
        let carpet = cube([0.0, 1.0, 0.0], [16.0, 0.0, 16.0], CubeTemplate::default());
        assert_eq!(visible_faces(&carpet), vec![Face::Up]);
        let pane = cube([0.0, 0.0, 8.0], [16.0, 16.0, 0.0], CubeTemplate::default());
        assert_eq!(visible_faces(&pane), vec![Face::North]);
    }

    #[test]
    fn test_auto_uv_slab() {
        let slab = cube([0.0, 0.0, 0.0], [16.0, 8.0, 16.0], CubeTemplate::default());
        let uvs = uvs_of(&slab);
        assert_eq!(uvs.len(), 6);
        assert_eq!(uvs[&Face::North].uv, [0.0, 0.5]);
        assert_eq!(uvs[&Face::North].uv_size, [1.0, 0.5]);
        assert_eq!(uvs[&Face::Up].uv, [0.0, 0.0]);
        assert_eq!(uvs[&Face::Up].uv_size, [1.0, 1.0]);
    }

    #[test]
    fn test_auto_uv_offsets() {
        let post = cube([6.0, 0.0, 2.0], [4.0, 16.0, 3.0], CubeTemplate::default());
        let uvs = uvs_of(&post);
        assert_eq!(uvs[&Face::East].uv, [11.0 / 16.0, 0.0]);
        assert_eq!(uvs[&Face::North].uv, [6.0 / 16.0, 0.0]);
        assert_eq!(uvs[&Face::Down].uv, [6.0 / 16.0, 11.0 / 16.0]);
    }

    #[test]
    fn test_explicit_uv_falls_back_through_side() {
        let m = meta(r#"{"uv": {"side": [4, 4], "up": [0, 0]}, "uv_sizes": {"*": [8, 8]}}"#);
        let c = cube([0.0; 3], [16.0; 3], m);
        let uvs = uvs_of(&c);
        assert_eq!(uvs[&Face::South].uv, [0.25, 0.25]);
        assert_eq!(uvs[&Face::South].uv_size, [0.5, 0.5]);
        assert_eq!(uvs[&Face::Up].uv, [0.0, 0.0]);
        // Down has no explicit origin, so it keeps the projected one.
        assert_eq!(uvs[&Face::Down].uv, [0.0, 0.0]);
        assert_eq!(uvs[&Face::Down].uv_size, [0.5, 0.5]);
    }

    #[test]
    fn test_box_uv_layout() {
        let m = meta(r#"{"box_uv": [0, 0], "texture_size": [64, 64]}"#);
        let head = cube([4.0, 0.0, 4.0], [8.0, 8.0, 8.0], m);
        let uvs = uvs_of(&head);
        let px = |rect: FaceRect| (rect.uv.map(|v| v * 64.0), rect.uv_size.map(|v| v * 64.0));
        assert_eq!(px(uvs[&Face::Up]), ([8.0, 0.0], [8.0, 8.0]));
        assert_eq!(px(uvs[&Face::Down]), ([16.0, 0.0], [8.0, 8.0]));
        assert_eq!(px(uvs[&Face::East]), ([0.0, 8.0], [8.0, 8.0]));
        assert_eq!(px(uvs[&Face::North]), ([8.0, 8.0], [8.0, 8.0]));
        assert_eq!(px(uvs[&Face::West]), ([16.0, 8.0], [8.0, 8.0]));
        assert_eq!(px(uvs[&Face::South]), ([24.0, 8.0], [8.0, 8.0]));
    }

    #[test]
    fn test_hidden_faces() {
        let m = meta(r#"{"textures": {"up": "none", "down": "none", "side": "side"}}"#);
        let c = cube([0.0; 3], [16.0; 3], m);
        let faces = visible_faces(&c);
        assert_eq!(faces, vec![Face::West, Face::East, Face::North, Face::South]);
        assert_eq!(face_selector(&c, Face::North), "side");
    }

    #[test]
    fn test_invalid_texture_size_falls_back() {
        let diagnostics = Diagnostics::new();
        for bad in ["[0, 16]", "[16, -4]"] {
            let m = meta(&format!(r#"{{"texture_size": {}}}"#, bad));
            let c = cube([0.0; 3], [16.0; 3], m);
            let uvs = face_uvs(&c, &diagnostics);
            for rect in uvs.values() {
                assert!(rect.uv.iter().chain(&rect.uv_size).all(|v| v.is_finite()));
            }
            assert_eq!(uvs[&Face::North].uv_size, [1.0, 1.0]);
        }
        assert_eq!(diagnostics.count(DiagnosticKind::InvalidTextureSize), 2);
    }
}
