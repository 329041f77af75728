//! Rotation records for cubes and bones.

use glam::DVec3;
use serde::{Deserialize, Serialize};

/// Pivot used when a rotation does not name one: the block centre.
pub const DEFAULT_PIVOT: [f64; 3] = [8.0, 8.0, 8.0];

/// A rotation in degrees around a pivot, both in 1/16-block units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rotation {
    pub rot: [f64; 3],
    #[serde(default = "default_pivot")]
    pub pivot: [f64; 3],
}

fn default_pivot() -> [f64; 3] {
    DEFAULT_PIVOT
}

impl Rotation {
    pub fn new(rot: [f64; 3], pivot: [f64; 3]) -> Self {
        Self { rot, pivot }
    }

    /// Shift the pivot by a translation.
    pub fn translated(&self, offset: [f64; 3]) -> Self {
        Self {
            rot: self.rot,
            pivot: (DVec3::from_array(self.pivot) + DVec3::from_array(offset)).to_array(),
        }
    }

    /// Scale the pivot; angles are unaffected.
    pub fn scaled(&self, scale: f64) -> Self {
        Self {
            rot: self.rot,
            pivot: (DVec3::from_array(self.pivot) * scale).to_array(),
        }
    }
}
