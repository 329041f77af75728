//! Texture references, resolved fragments and structural deduplication.
//!
//! A [`TextureReference`] records one face's texture usage. References are
//! resolved to [`TextureFragment`]s (concrete image path, tint, opacity and
//! source rectangle) and both are deduplicated by structural equality, so the
//! index of a reference or fragment is stable for the whole run.

pub mod image;
pub mod resolver;

pub use image::{Crop, DirectorySource, ImageFragment, ImageLoader, ImageSource, MemorySource};
pub use resolver::TextureResolver;

use serde::Serialize;
use std::collections::HashMap;

/// Where a face texture comes from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TextureSource {
    /// The block's face table entry for a face name.
    Block {
        block_name: String,
        face: String,
        variant: i64,
    },
    /// A terrain texture key chosen by the cube.
    TerrainKey {
        block_name: String,
        key: String,
        variant: i64,
    },
    /// A direct image path; no variant or tint lookup happens.
    Path { path: String },
}

/// One face's texture usage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextureReference {
    /// Origin in 0..1 face units.
    pub uv: [f64; 2],
    pub uv_size: [f64; 2],
    pub source: TextureSource,
    /// RGB multiplier in 0..1, set by the cube.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tint: Option<[f64; 3]>,
    pub croppable: bool,
}

/// A tint multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Tint {
    pub rgb: [f64; 3],
    /// Apply the normal tint rule even to legacy-format images.
    pub tint_like_png: bool,
}

impl Tint {
    pub fn new(rgb: [f64; 3]) -> Self {
        Self {
            rgb,
            tint_like_png: false,
        }
    }
}

/// A resolved texture: one atlas slot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TextureFragment {
    /// Image path without extension.
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tint: Option<Tint>,
    pub opacity: f64,
    /// Source rectangle in 0..1 image units.
    pub uv: [f64; 2],
    pub uv_size: [f64; 2],
    pub croppable: bool,
}

/// Insertion-ordered set keyed by structural equality.
///
/// Items are keyed by their canonical JSON, which covers floats and nested
/// enums without requiring `Eq + Hash` on every record.
#[derive(Debug, Clone)]
pub struct DedupSet<T> {
    items: Vec<T>,
    index: HashMap<String, usize>,
}

impl<T> Default for DedupSet<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T: Serialize> DedupSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an item, returning the index of it or of its structural twin.
    pub fn insert(&mut self, item: T) -> usize {
        let key = match serde_json::to_string(&item) {
            Ok(key) => key,
            // Unserialisable items are never deduplicated.
            Err(_) => {
                self.items.push(item);
                return self.items.len() - 1;
            }
        };
        if let Some(&i) = self.index.get(&key) {
            return i;
        }
        let i = self.items.len();
        self.items.push(item);
        self.index.insert(key, i);
        i
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference(tint: Option<[f64; 3]>) -> TextureReference {
        TextureReference {
            uv: [0.0, 0.5],
            uv_size: [1.0, 0.5],
            source: TextureSource::Block {
                block_name: "stone_slab".to_string(),
                face: "side".to_string(),
                variant: -1,
            },
            tint,
            croppable: false,
        }
    }

    #[test]
    fn test_identical_references_share_index() {
        let mut set = DedupSet::new();
        let a = set.insert(reference(None));
        let b = set.insert(reference(None));
        assert_eq!(a, b);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_tint_keeps_references_apart() {
        let mut set = DedupSet::new();
        let plain = set.insert(reference(None));
        let tinted = set.insert(reference(Some([0.5, 0.8, 0.3])));
        assert_ne!(plain, tinted);
        assert_eq!(set.get(tinted).and_then(|r| r.tint), Some([0.5, 0.8, 0.3]));
    }

    #[test]
    fn test_insertion_order_is_index() {
        let mut set = DedupSet::new();
        for path in ["a", "b", "a", "c"] {
            set.insert(TextureSource::Path { path: path.to_string() });
        }
        let paths: Vec<_> = set
            .iter()
            .map(|s| match s {
                TextureSource::Path { path } => path.as_str(),
                _ => "",
            })
            .collect();
        assert_eq!(paths, vec!["a", "b", "c"]);
    }
}
