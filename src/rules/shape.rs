//! Block name to shape id resolution.

use super::RuleTables;
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::types::strip_namespace;
use std::cell::RefCell;
use std::collections::HashMap;

/// Shape used when no rule matches, and when a shape has no geometry.
pub const DEFAULT_SHAPE: &str = "block";

/// Resolves block names to shape ids, memoised per name.
///
/// Exact names win over patterns; among patterns the first match wins and
/// later matching patterns are never consulted.
pub struct ShapeResolver<'a> {
    rules: &'a RuleTables,
    diagnostics: &'a Diagnostics,
    memo: RefCell<HashMap<String, String>>,
}

impl<'a> ShapeResolver<'a> {
    pub fn new(rules: &'a RuleTables, diagnostics: &'a Diagnostics) -> Self {
        Self {
            rules,
            diagnostics,
            memo: RefCell::new(HashMap::new()),
        }
    }

    /// Resolve a block name (with or without namespace) to a shape id.
    pub fn resolve(&self, block_name: &str) -> String {
        let name = strip_namespace(block_name);
        if let Some(shape) = self.memo.borrow().get(name) {
            return shape.clone();
        }

        let shape = self.lookup(name);
        self.memo
            .borrow_mut()
            .insert(name.to_string(), shape.clone());
        shape
    }

    fn lookup(&self, name: &str) -> String {
        if let Some(shape) = self.rules.shapes_by_name.get(name) {
            return shape.clone();
        }

        if let Some((_, shape)) = self
            .rules
            .shapes_by_pattern
            .iter()
            .find(|(pattern, _)| pattern.is_match(name))
        {
            return shape.clone();
        }

        self.diagnostics.info(
            DiagnosticKind::DefaultShape,
            format!("No shape rule for {}, using {}", name, DEFAULT_SHAPE),
        );
        DEFAULT_SHAPE.to_string()
    }

    /// Number of memoised names.
    pub fn cached_count(&self) -> usize {
        self.memo.borrow().len()
    }
}

/// Split `shape{path}` into the shape key and its special texture path.
pub fn split_special_texture(shape_id: &str) -> (&str, Option<&str>) {
    match shape_id.split_once('{') {
        Some((shape, rest)) if rest.ends_with('}') => {
            let path = &rest[..rest.len() - 1];
            (shape, if path.is_empty() { None } else { Some(path) })
        }
        _ => (shape_id, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::NamePattern;

    fn tables() -> RuleTables {
        let mut rules = RuleTables::new();
        rules
            .shapes_by_name
            .insert("smooth_stone_slab".to_string(), "special_slab".to_string());
        rules.shapes_by_pattern = vec![
            (NamePattern::new("_slab$").unwrap(), "slab".to_string()),
            (NamePattern::new("stone").unwrap(), "shadowed".to_string()),
        ];
        rules
    }

    #[test]
    fn test_exact_outranks_pattern() {
        let rules = tables();
        let diagnostics = Diagnostics::new();
        let resolver = ShapeResolver::new(&rules, &diagnostics);
        assert_eq!(resolver.resolve("minecraft:smooth_stone_slab"), "special_slab");
        assert_eq!(resolver.resolve("oak_slab"), "slab");
    }

    #[test]
    fn test_first_pattern_wins() {
        let rules = tables();
        let diagnostics = Diagnostics::new();
        let resolver = ShapeResolver::new(&rules, &diagnostics);
        // Both patterns match; the earlier one is authoritative.
        assert_eq!(resolver.resolve("stone_slab"), "slab");
        assert_eq!(resolver.resolve("cobblestone"), "shadowed");
    }

    #[test]
    fn test_fallback_and_memo() {
        let rules = tables();
        let diagnostics = Diagnostics::new();
        let resolver = ShapeResolver::new(&rules, &diagnostics);
        assert_eq!(resolver.resolve("dirt"), DEFAULT_SHAPE);
        assert_eq!(resolver.resolve("minecraft:dirt"), DEFAULT_SHAPE);
        assert_eq!(resolver.resolve("dirt"), resolver.resolve("dirt"));
        assert_eq!(resolver.cached_count(), 1);
        // Fallback is logged once thanks to the memo.
        assert_eq!(diagnostics.count(DiagnosticKind::DefaultShape), 1);
    }

    #[test]
    fn test_split_special_texture() {
        assert_eq!(split_special_texture("slab"), ("slab", None));
        assert_eq!(
            split_special_texture("pane{textures/blocks/glass}"),
            ("pane", Some("textures/blocks/glass"))
        );
        assert_eq!(split_special_texture("pane{}"), ("pane", None));
    }
}
