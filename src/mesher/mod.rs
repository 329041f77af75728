//! Geometry stages after expansion: cube merging, face UVs and bone building.

pub mod bone;
pub mod merge;
pub mod uv;

pub use bone::{BoneBuilder, BoneCube, BoneTemplate, FaceUv};
pub use merge::{merge_cuboids, Cuboid};
pub use uv::{face_uvs, visible_faces, FaceRect};
