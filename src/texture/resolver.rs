//! Texture reference resolution through the terrain texture key chain.
//!
//! block name -> remap -> face table (or carried table) -> terrain key ->
//! variant path + tint. Gaps in any table are recorded and replaced by the
//! missing-texture path so the run still produces an atlas.

use super::{TextureFragment, TextureReference, TextureSource, Tint};
use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::rules::{parse_hex_color, FaceLookup, FaceTextures, RuleTables, UNKNOWN_VARIANT};
use crate::types::strip_namespace;

/// Image path used when a terrain key has no entry.
pub const MISSING_TEXTURE: &str = "textures/misc/missing_texture";

/// Face name prefix that selects the carried (item form) face table.
pub const CARRIED_PREFIX: &str = "carried_";

/// Resolves texture references into fragments.
pub struct TextureResolver<'a> {
    rules: &'a RuleTables,
    diagnostics: &'a Diagnostics,
}

impl<'a> TextureResolver<'a> {
    pub fn new(rules: &'a RuleTables, diagnostics: &'a Diagnostics) -> Self {
        Self { rules, diagnostics }
    }

    /// Resolve one reference. Never fails; gaps become diagnostics.
    pub fn resolve(&self, reference: &TextureReference) -> TextureFragment {
        let own_tint = reference.tint.map(Tint::new);

        let (path, tint, opacity) = match &reference.source {
            TextureSource::Path { path } => (path.clone(), own_tint, 1.0),
            TextureSource::Block {
                block_name,
                face,
                variant,
            } => {
                let carried = self.uses_carried(block_name);
                let block_name = self.remap(block_name);
                let key = self.terrain_key(block_name, face, carried);
                let (path, tint) = self.resolve_key(&key, *variant, own_tint);
                (path, tint, self.opacity(block_name))
            }
            TextureSource::TerrainKey {
                block_name,
                key,
                variant,
            } => {
                let (path, tint) = self.resolve_key(key, *variant, own_tint);
                (path, tint, self.opacity(self.remap(block_name)))
            }
        };

        TextureFragment {
            path,
            tint,
            opacity,
            uv: reference.uv,
            uv_size: reference.uv_size,
            croppable: reference.croppable,
        }
    }

    fn remap<'n>(&'n self, block_name: &'n str) -> &'n str {
        let name = strip_namespace(block_name);
        self.rules
            .block_name_remaps
            .get(name)
            .map(String::as_str)
            .unwrap_or(name)
    }

    /// Whether the block always uses its carried face table, before or after remapping.
    fn uses_carried(&self, block_name: &str) -> bool {
        let name = strip_namespace(block_name);
        self.rules.use_carried_textures.contains(name)
            || self.rules.use_carried_textures.contains(self.remap(name))
    }

    /// Face table lookup; the block name doubles as the key when there is no table.
    fn terrain_key(&self, block_name: &str, face: &str, carried: bool) -> String {
        let (table, face) = match face.strip_prefix(CARRIED_PREFIX) {
            Some(face) => (self.carried_table(block_name), face),
            None if carried => (self.carried_table(block_name), face),
            None => (self.rules.block_textures.get(block_name), face),
        };

        let Some(table) = table else {
            self.diagnostics.warn(
                DiagnosticKind::MissingFace,
                format!("No face table for {}, using the block name as terrain key", block_name),
            );
            return block_name.to_string();
        };

        match table.lookup(face) {
            FaceLookup::Found(key) => key.to_string(),
            FaceLookup::FirstDeclared(key) => {
                self.diagnostics.warn(
                    DiagnosticKind::MissingFace,
                    format!("No {} face for {}, using first declared face ({})", face, block_name, key),
                );
                key.to_string()
            }
            FaceLookup::Missing => {
                self.diagnostics.warn(
                    DiagnosticKind::MissingFace,
                    format!("Empty face table for {}", block_name),
                );
                block_name.to_string()
            }
        }
    }

    fn carried_table(&self, block_name: &str) -> Option<&'a FaceTextures> {
        self.rules
            .carried_textures
            .get(block_name)
            .or_else(|| self.rules.block_textures.get(block_name))
    }

    /// Terrain key -> (image path, tint).
    fn resolve_key(&self, key: &str, variant: i64, own_tint: Option<Tint>) -> (String, Option<Tint>) {
        let Some(entry) = self.rules.terrain_textures.get(key) else {
            self.diagnostics.warn(
                DiagnosticKind::MissingTerrainTexture,
                format!("No terrain texture entry for {}", key),
            );
            return (MISSING_TEXTURE.to_string(), own_tint);
        };

        let variants = entry.variants();
        let Some(first) = variants.first() else {
            self.diagnostics.warn(
                DiagnosticKind::MissingTerrainTexture,
                format!("Terrain texture {} has no paths", key),
            );
            return (MISSING_TEXTURE.to_string(), own_tint);
        };

        let chosen = match usize::try_from(variant).ok().and_then(|i| variants.get(i)) {
            Some(chosen) => chosen,
            None => {
                if variant != UNKNOWN_VARIANT || variants.len() > 1 {
                    self.diagnostics.warn(
                        DiagnosticKind::UnknownVariant,
                        format!(
                            "Variant {} of {} not available ({} declared), using the first",
                            variant,
                            key,
                            variants.len()
                        ),
                    );
                }
                first
            }
        };

        let tint = own_tint
            .or_else(|| chosen.tint_color().and_then(|color| self.parse_tint(key, color)))
            .or_else(|| {
                self.rules.tints.get(key).and_then(|entry| {
                    self.parse_tint(key, entry.color()).map(|tint| Tint {
                        tint_like_png: entry.tint_like_png(),
                        ..tint
                    })
                })
            });

        (chosen.path().to_string(), tint)
    }

    fn parse_tint(&self, key: &str, color: &str) -> Option<Tint> {
        let rgb = parse_hex_color(color);
        if rgb.is_none() {
            self.diagnostics.warn(
                DiagnosticKind::InvalidTint,
                format!("Invalid tint {:?} for {}", color, key),
            );
        }
        rgb.map(Tint::new)
    }

    fn opacity(&self, block_name: &str) -> f64 {
        self.rules
            .transparency
            .get(block_name)
            .copied()
            .unwrap_or(1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rules() -> RuleTables {
        serde_json::from_value(json!({
            "block_textures": {
                "grass": {"up": "grass_top", "down": "dirt", "side": "grass_side"},
                "wool": "wool",
                "stained_glass": "glass",
                "odd": {"up": "odd_top"}
            },
            "carried_textures": {"grass": {"up": "grass_carried", "side": "grass_side_carried"}},
            "use_carried_textures": ["leaves_item"],
            "block_name_remaps": {"leaves_item": "grass"},
            "terrain_textures": {
                "grass_top": {"textures": {"path": "textures/blocks/grass_top", "tint_color": "#79c05a"}},
                "grass_side": "textures/blocks/grass_side",
                "grass_carried": "textures/blocks/grass_carried",
                "grass_side_carried": "textures/blocks/grass_side_carried",
                "dirt": "textures/blocks/dirt",
                "wool": ["textures/blocks/wool_white", "textures/blocks/wool_orange"],
                "glass": "textures/blocks/glass",
                "odd_top": "textures/blocks/odd"
            },
            "tints": {"grass_side": {"color": "#ff0000", "tintLikePng": true}},
            "transparency": {"stained_glass": 0.5}
        }))
        .unwrap()
    }

    fn block_ref(block_name: &str, face: &str, variant: i64) -> TextureReference {
        TextureReference {
            uv: [0.0, 0.0],
            uv_size: [1.0, 1.0],
            source: TextureSource::Block {
                block_name: block_name.to_string(),
                face: face.to_string(),
                variant,
            },
            tint: None,
            croppable: false,
        }
    }

    #[test]
    fn test_face_chain_and_entry_tint() {
        let rules = rules();
        let diagnostics = Diagnostics::new();
        let resolver = TextureResolver::new(&rules, &diagnostics);

        let top = resolver.resolve(&block_ref("minecraft:grass", "up", -1));
        assert_eq!(top.path, "textures/blocks/grass_top");
        assert_eq!(top.tint.map(|t| t.rgb), parse_hex_color("#79c05a"));

        let side = resolver.resolve(&block_ref("grass", "north", -1));
        assert_eq!(side.path, "textures/blocks/grass_side");
        let tint = side.tint.unwrap();
        assert_eq!(tint.rgb, [1.0, 0.0, 0.0]);
        assert!(tint.tint_like_png);
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_own_tint_wins() {
        let rules = rules();
        let diagnostics = Diagnostics::new();
        let resolver = TextureResolver::new(&rules, &diagnostics);
        let mut reference = block_ref("grass", "up", -1);
        reference.tint = Some([0.1, 0.2, 0.3]);
        assert_eq!(resolver.resolve(&reference).tint, Some(Tint::new([0.1, 0.2, 0.3])));
    }

    #[test]
    fn test_carried_tables() {
        let rules = rules();
        let diagnostics = Diagnostics::new();
        let resolver = TextureResolver::new(&rules, &diagnostics);
        assert_eq!(
            resolver.resolve(&block_ref("grass", "carried_up", -1)).path,
            "textures/blocks/grass_carried"
        );
        // Remapped to grass, and always carried.
        assert_eq!(
            resolver.resolve(&block_ref("leaves_item", "west", -1)).path,
            "textures/blocks/grass_side_carried"
        );
    }

    #[test]
    fn test_variants() {
        let rules = rules();
        let diagnostics = Diagnostics::new();
        let resolver = TextureResolver::new(&rules, &diagnostics);
        assert_eq!(resolver.resolve(&block_ref("wool", "up", 1)).path, "textures/blocks/wool_orange");
        assert!(diagnostics.is_empty());

        assert_eq!(resolver.resolve(&block_ref("wool", "up", -1)).path, "textures/blocks/wool_white");
        assert_eq!(resolver.resolve(&block_ref("wool", "up", 9)).path, "textures/blocks/wool_white");
        assert_eq!(diagnostics.count(DiagnosticKind::UnknownVariant), 2);
    }

    #[test]
    fn test_gaps_are_recorded() {
        let rules = rules();
        let diagnostics = Diagnostics::new();
        let resolver = TextureResolver::new(&rules, &diagnostics);

        let odd = resolver.resolve(&block_ref("odd", "north", -1));
        assert_eq!(odd.path, "textures/blocks/odd");
        assert_eq!(diagnostics.count(DiagnosticKind::MissingFace), 1);

        let unknown = resolver.resolve(&block_ref("mystery", "up", -1));
        assert_eq!(unknown.path, MISSING_TEXTURE);
        assert_eq!(diagnostics.count(DiagnosticKind::MissingTerrainTexture), 1);
    }

    #[test]
    fn test_path_override_and_opacity() {
        let rules = rules();
        let diagnostics = Diagnostics::new();
        let resolver = TextureResolver::new(&rules, &diagnostics);

        let direct = TextureReference {
            source: TextureSource::Path {
                path: "textures/entity/chest/normal".to_string(),
            },
            ..block_ref("grass", "up", 3)
        };
        let fragment = resolver.resolve(&direct);
        assert_eq!(fragment.path, "textures/entity/chest/normal");
        assert_eq!(fragment.tint, None);

        assert_eq!(resolver.resolve(&block_ref("stained_glass", "up", -1)).opacity, 0.5);
        assert!(diagnostics.is_empty());
    }
}
