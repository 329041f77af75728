//! Block-state driven bone rotations.

use super::NamePattern;
use crate::types::{strip_namespace, Block};
use serde::Deserialize;
use std::collections::BTreeMap;

/// State name -> state value -> rotation in degrees.
pub type StateRotations = BTreeMap<String, BTreeMap<String, [f64; 3]>>;

/// Rotation tables, consulted global, shape, name, then name pattern.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RotationRules {
    pub global: StateRotations,
    pub by_shape: BTreeMap<String, StateRotations>,
    pub by_name: BTreeMap<String, StateRotations>,
    pub by_pattern: Vec<(NamePattern, StateRotations)>,
}

/// Resolves the bone rotation for a block.
pub struct RotationResolver<'a> {
    rules: &'a RotationRules,
}

impl<'a> RotationResolver<'a> {
    pub fn new(rules: &'a RotationRules) -> Self {
        Self { rules }
    }

    /// The first table with any matching state wins; its matches are summed.
    pub fn resolve(&self, block: &Block, shape_id: &str) -> Option<[f64; 3]> {
        let name = strip_namespace(&block.name);
        let pattern_table = self
            .rules
            .by_pattern
            .iter()
            .find(|(pattern, _)| pattern.is_match(name))
            .map(|(_, table)| table);

        [
            Some(&self.rules.global),
            self.rules.by_shape.get(shape_id),
            self.rules.by_name.get(name),
            pattern_table,
        ]
        .into_iter()
        .flatten()
        .find_map(|table| sum_matching(table, block))
    }
}

fn sum_matching(table: &StateRotations, block: &Block) -> Option<[f64; 3]> {
    let mut total: Option<[f64; 3]> = None;
    for (state, values) in table {
        let Some(value) = block.state(state) else {
            continue;
        };
        if let Some(rot) = values.get(&value.to_string()) {
            let sum = total.get_or_insert([0.0; 3]);
            for i in 0..3 {
                sum[i] += rot[i];
            }
        }
    }
    total
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StateValue;

    fn rules() -> RotationRules {
        serde_json::from_str(
            r#"{
                "global": {
                    "facing_direction": {"2": [0, 180, 0], "4": [0, 90, 0]},
                    "upside_down_bit": {"true": [180, 0, 0]}
                },
                "by_shape": {"stairs": {"weirdo_direction": {"1": [0, -90, 0]}}},
                "by_name": {"lever": {"lever_direction": {"up_north_south": [0, 0, 90]}}},
                "by_pattern": [["_button$", {"facing_direction": {"0": [180, 0, 0]}}]]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_global_states_sum() {
        let rules = rules();
        let resolver = RotationResolver::new(&rules);
        let block = Block::new("observer")
            .with_state("facing_direction", StateValue::Int(4))
            .with_state("upside_down_bit", StateValue::Bool(true));
        assert_eq!(resolver.resolve(&block, "block"), Some([180.0, 90.0, 0.0]));
    }

    #[test]
    fn test_priority_global_first() {
        let rules = rules();
        let resolver = RotationResolver::new(&rules);
        // Matches global and the shape table; global wins.
        let block = Block::new("oak_stairs")
            .with_state("facing_direction", StateValue::Int(2))
            .with_state("weirdo_direction", StateValue::Int(1));
        assert_eq!(resolver.resolve(&block, "stairs"), Some([0.0, 180.0, 0.0]));

        let shape_only = Block::new("oak_stairs").with_state("weirdo_direction", StateValue::Int(1));
        assert_eq!(resolver.resolve(&shape_only, "stairs"), Some([0.0, -90.0, 0.0]));
    }

    #[test]
    fn test_name_and_pattern_tables() {
        let rules = rules();
        let resolver = RotationResolver::new(&rules);
        let lever = Block::new("minecraft:lever")
            .with_state("lever_direction", StateValue::Str("up_north_south".into()));
        assert_eq!(resolver.resolve(&lever, "lever"), Some([0.0, 0.0, 90.0]));

        // facing_direction 0 is not in the global table, so the pattern table answers.
        let button = Block::new("stone_button").with_state("facing_direction", StateValue::Int(0));
        assert_eq!(resolver.resolve(&button, "button"), Some([180.0, 0.0, 0.0]));

        assert_eq!(resolver.resolve(&Block::new("stone"), "block"), None);
    }
}
