//! Face and axis types for cube faces and extents.

use serde::{Deserialize, Serialize};

/// The six faces of a cube, named by the direction they look towards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Face {
    Down,
    Up,
    North,
    South,
    West,
    East,
}

impl Face {
    /// All six faces in output order.
    pub const ALL: [Face; 6] = [
        Face::West,
        Face::East,
        Face::Down,
        Face::Up,
        Face::North,
        Face::South,
    ];

    /// Whether this is one of the four horizontal faces (the "side" group).
    pub fn is_side(&self) -> bool {
        !matches!(self, Face::Down | Face::Up)
    }

    /// Whether this face's UVs are defined rotated 180 degrees from the geometry.
    pub fn is_vertical_facing(&self) -> bool {
        matches!(self, Face::Down | Face::Up)
    }

    /// The face rendered when a cube is flat along `axis`.
    pub fn for_flat_axis(axis: Axis) -> Face {
        match axis {
            Axis::X => Face::West,
            Axis::Y => Face::Up,
            Axis::Z => Face::North,
        }
    }

    /// Parse from string (case-insensitive).
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "down" => Some(Face::Down),
            "up" => Some(Face::Up),
            "north" => Some(Face::North),
            "south" => Some(Face::South),
            "west" => Some(Face::West),
            "east" => Some(Face::East),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Face::Down => "down",
            Face::Up => "up",
            Face::North => "north",
            Face::South => "south",
            Face::West => "west",
            Face::East => "east",
        }
    }
}

impl std::fmt::Display for Face {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// The three axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    /// Component index into `[x, y, z]` arrays.
    pub fn index(&self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    /// The two other axes.
    pub fn others(&self) -> [Axis; 2] {
        match self {
            Axis::X => [Axis::Y, Axis::Z],
            Axis::Y => [Axis::X, Axis::Z],
            Axis::Z => [Axis::X, Axis::Y],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_face_roundtrip_names() {
        for face in Face::ALL {
            assert_eq!(Face::from_name(face.name()), Some(face));
        }
        assert_eq!(Face::from_name("WEST"), Some(Face::West));
        assert_eq!(Face::from_name("side"), None);
    }

    #[test]
    fn test_side_faces() {
        let sides: Vec<_> = Face::ALL.iter().filter(|f| f.is_side()).collect();
        assert_eq!(sides.len(), 4);
        assert!(Face::Up.is_vertical_facing());
        assert!(!Face::North.is_vertical_facing());
    }

    #[test]
    fn test_axis_others() {
        assert_eq!(Axis::Y.others(), [Axis::X, Axis::Z]);
        assert_eq!(Face::for_flat_axis(Axis::X), Face::West);
    }
}
