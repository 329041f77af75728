//! Greedy merging of bare axis-aligned cubes.
//!
//! Two cubes fold into one when they match exactly on two axes and touch
//! face to face on the third. Every fold restarts the scan, because the
//! grown cube may now fit cubes it was already compared against.

use crate::types::Axis;

/// An axis-aligned box in 1/16-block units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Cuboid {
    pub pos: [f64; 3],
    pub size: [f64; 3],
}

impl Cuboid {
    pub fn new(pos: [f64; 3], size: [f64; 3]) -> Self {
        Self { pos, size }
    }

    pub fn volume(&self) -> f64 {
        self.size.iter().product()
    }

    /// End coordinate on an axis.
    fn end(&self, axis: Axis) -> f64 {
        self.pos[axis.index()] + self.size[axis.index()]
    }

    /// Grow `self` by `other` if it sits directly past `self` on some axis.
    fn absorb(&mut self, other: &Cuboid) -> bool {
        for axis in Axis::ALL {
            let aligned = axis.others().iter().all(|a| {
                let i = a.index();
                self.pos[i] == other.pos[i] && self.size[i] == other.size[i]
            });
            if aligned && self.end(axis) == other.pos[axis.index()] {
                self.size[axis.index()] += other.size[axis.index()];
                return true;
            }
        }
        false
    }
}

/// Merge adjacent cuboids. Total volume and covered space are preserved;
/// which cube survives a fold depends on input order.
pub fn merge_cuboids(cuboids: Vec<Cuboid>) -> Vec<Cuboid> {
    let mut merged: Vec<Cuboid> = Vec::with_capacity(cuboids.len());

    for mut candidate in cuboids {
        'scan: loop {
            for i in 0..merged.len() {
                let existing = merged[i];
                if candidate.absorb(&existing) {
                    merged.remove(i);
                    continue 'scan;
                }
                let mut grown = existing;
                if grown.absorb(&candidate) {
                    candidate = grown;
                    merged.remove(i);
                    continue 'scan;
                }
            }
            merged.push(candidate);
            break;
        }
    }

    merged
}
