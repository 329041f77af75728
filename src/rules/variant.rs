//! Texture variant index resolution.

use super::NamePattern;
use crate::types::{strip_namespace, Block};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Variant index meaning "not determined"; resolution falls back to the first entry.
pub const UNKNOWN_VARIANT: i64 = -1;

/// One state-driven variant table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VariantTable {
    /// Sum the contributions of every matching state instead of taking the first.
    pub exclusive_add: bool,
    /// State name -> state value -> variant index (or contribution).
    pub states: BTreeMap<String, BTreeMap<String, i64>>,
}

impl VariantTable {
    fn evaluate(&self, block: &Block) -> Option<i64> {
        let mut matches = self.states.iter().filter_map(|(state, values)| {
            block
                .state(state)
                .and_then(|value| values.get(&value.to_string()))
                .copied()
        });

        if self.exclusive_add {
            let mut total = None;
            for contribution in matches {
                *total.get_or_insert(0) += contribution;
            }
            total
        } else {
            matches.next()
        }
    }
}

/// Variant tables; eigenvariants bypass everything else.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct VariantRules {
    /// Block name -> fixed variant index.
    pub eigenvariants: BTreeMap<String, i64>,
    pub global: VariantTable,
    pub by_shape: BTreeMap<String, VariantTable>,
    pub by_name: BTreeMap<String, VariantTable>,
    pub by_pattern: Vec<(NamePattern, VariantTable)>,
}

/// Resolves the texture variant index of a block.
pub struct VariantResolver<'a> {
    rules: &'a VariantRules,
}

impl<'a> VariantResolver<'a> {
    pub fn new(rules: &'a VariantRules) -> Self {
        Self { rules }
    }

    /// Name, then name pattern, then shape, then global. Returns [`UNKNOWN_VARIANT`] when nothing matches.
    pub fn resolve(&self, block: &Block, shape_id: &str, ignore_eigenvariant: bool) -> i64 {
        let name = strip_namespace(&block.name);
        if !ignore_eigenvariant {
            if let Some(&variant) = self.rules.eigenvariants.get(name) {
                return variant;
            }
        }

        let pattern_table = self
            .rules
            .by_pattern
            .iter()
            .find(|(pattern, _)| pattern.is_match(name))
            .map(|(_, table)| table);

        [
            self.rules.by_name.get(name),
            pattern_table,
            self.rules.by_shape.get(shape_id),
            Some(&self.rules.global),
        ]
        .into_iter()
        .flatten()
        .find_map(|table| table.evaluate(block))
        .unwrap_or(UNKNOWN_VARIANT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StateValue;

    fn rules() -> VariantRules {
        serde_json::from_str(
            r#"{
                "eigenvariants": {"chiseled_sandstone": 2},
                "global": {"states": {"color": {"white": 0, "red": 14}}},
                "by_shape": {"slab": {"states": {"stone_slab_type": {"brick": 4}}}},
                "by_name": {"sandstone": {"states": {"sand_stone_type": {"cut": 1}}}},
                "by_pattern": [["_log$", {"exclusive_add": true, "states": {
                    "old_log_type": {"oak": 0, "birch": 2},
                    "stripped_bit": {"true": 4}
                }}]]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_eigenvariant_short_circuits() {
        let rules = rules();
        let resolver = VariantResolver::new(&rules);
        let block = Block::new("chiseled_sandstone").with_state("color", StateValue::Str("red".into()));
        assert_eq!(resolver.resolve(&block, "block", false), 2);
        assert_eq!(resolver.resolve(&block, "block", true), 14);
    }

    #[test]
    fn test_table_priority() {
        let rules = rules();
        let resolver = VariantResolver::new(&rules);
        let cut = Block::new("sandstone")
            .with_state("sand_stone_type", StateValue::Str("cut".into()))
            .with_state("color", StateValue::Str("red".into()));
        assert_eq!(resolver.resolve(&cut, "block", false), 1);

        let slab = Block::new("stone_slab")
            .with_state("stone_slab_type", StateValue::Str("brick".into()))
            .with_state("color", StateValue::Str("white".into()));
        assert_eq!(resolver.resolve(&slab, "slab", false), 4);
    }

    #[test]
    fn test_exclusive_add_sums() {
        let rules = rules();
        let resolver = VariantResolver::new(&rules);
        let log = Block::new("oak_log")
            .with_state("old_log_type", StateValue::Str("birch".into()))
            .with_state("stripped_bit", StateValue::Bool(true));
        assert_eq!(resolver.resolve(&log, "log", false), 6);
    }

    #[test]
    fn test_unknown_variant() {
        let rules = rules();
        let resolver = VariantResolver::new(&rules);
        assert_eq!(resolver.resolve(&Block::new("dirt"), "block", false), UNKNOWN_VARIANT);
    }
}
