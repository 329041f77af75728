//! Shared types used throughout the library.

mod direction;
mod transform;

pub use direction::{Axis, Face};
pub use transform::{Rotation, DEFAULT_PIVOT};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// A block state value, as stored in the palette.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StateValue {
    Bool(bool),
    Int(i64),
    Str(String),
}

impl StateValue {
    /// Numeric view; booleans count as 0/1.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            StateValue::Bool(b) => Some(*b as i64),
            StateValue::Int(i) => Some(*i),
            StateValue::Str(_) => None,
        }
    }

    /// Convert a JSON value (from block entity data or interpolation results).
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Bool(b) => Some(StateValue::Bool(*b)),
            Value::Number(n) => n.as_i64().map(StateValue::Int),
            Value::String(s) => Some(StateValue::Str(s.clone())),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            StateValue::Bool(b) => Value::Bool(*b),
            StateValue::Int(i) => Value::from(*i),
            StateValue::Str(s) => Value::String(s.clone()),
        }
    }
}

impl std::fmt::Display for StateValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StateValue::Bool(b) => write!(f, "{}", b),
            StateValue::Int(i) => write!(f, "{}", i),
            StateValue::Str(s) => f.write_str(s),
        }
    }
}

/// One palette entry: block name, states and optional block entity data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    /// Block name, e.g. "minecraft:stone_slab" or "stone_slab".
    pub name: String,
    /// Block states, e.g. {"top_slot_bit": false}.
    #[serde(default)]
    pub states: BTreeMap<String, StateValue>,
    /// Embedded block entity data (chest contents, flower pot plants, ...).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_entity_data: Option<Map<String, Value>>,
    /// Set on blocks synthesised by a copy_block directive.
    #[serde(skip)]
    pub copied_via_copy_block: bool,
}

impl Block {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            states: BTreeMap::new(),
            block_entity_data: None,
            copied_via_copy_block: false,
        }
    }

    pub fn with_state(mut self, key: impl Into<String>, value: StateValue) -> Self {
        self.states.insert(key.into(), value);
        self
    }

    pub fn with_entity_data(mut self, key: impl Into<String>, value: Value) -> Self {
        self.block_entity_data
            .get_or_insert_with(Map::new)
            .insert(key.into(), value);
        self
    }

    /// Block name without namespace (e.g. "stone" for "minecraft:stone").
    pub fn short_name(&self) -> &str {
        strip_namespace(&self.name)
    }

    pub fn state(&self, key: &str) -> Option<&StateValue> {
        self.states.get(key)
    }

    /// Look up a property in the block entity data.
    pub fn entity_value(&self, key: &str) -> Option<&Value> {
        self.block_entity_data.as_ref().and_then(|data| data.get(key))
    }

    /// Clone with extra states layered on top.
    pub fn with_states_merged(&self, overrides: &BTreeMap<String, StateValue>) -> Block {
        let mut block = self.clone();
        for (key, value) in overrides {
            block.states.insert(key.clone(), value.clone());
        }
        block
    }

    /// The block states as a JSON object, for path expressions.
    pub fn states_json(&self) -> Value {
        Value::Object(
            self.states
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }

    /// Identity key: name plus sorted states plus entity data.
    pub fn cache_key(&self) -> String {
        let mut key = self.short_name().to_string();
        if !self.states.is_empty() {
            key.push('|');
            let states: Vec<String> = self
                .states
                .iter()
                .map(|(k, v)| format!("{}={}", k, v))
                .collect();
            key.push_str(&states.join(","));
        }
        if let Some(data) = &self.block_entity_data {
            key.push('|');
            key.push_str(&Value::Object(data.clone()).to_string());
        }
        if self.copied_via_copy_block {
            key.push_str("|copied");
        }
        key
    }
}

/// Strip a leading "namespace:" from a block name.
pub fn strip_namespace(name: &str) -> &str {
    name.split_once(':').map(|(_, id)| id).unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_block_from_json() {
        let json = r#"{
            "name": "minecraft:wool",
            "states": {"color": "red", "age": 3, "open_bit": true}
        }"#;
        let block: Block = serde_json::from_str(json).unwrap();
        assert_eq!(block.short_name(), "wool");
        assert_eq!(block.state("color"), Some(&StateValue::Str("red".into())));
        assert_eq!(block.state("age").and_then(StateValue::as_i64), Some(3));
        assert_eq!(block.state("open_bit").and_then(StateValue::as_i64), Some(1));
        assert!(!block.copied_via_copy_block);
    }

    #[test]
    fn test_merge_states_keeps_original() {
        let block = Block::new("stairs").with_state("weirdo_direction", StateValue::Int(0));
        let overrides: BTreeMap<_, _> =
            [("weirdo_direction".to_string(), StateValue::Int(2))].into_iter().collect();
        let merged = block.with_states_merged(&overrides);
        assert_eq!(merged.state("weirdo_direction"), Some(&StateValue::Int(2)));
        assert_eq!(block.state("weirdo_direction"), Some(&StateValue::Int(0)));
    }

    #[test]
    fn test_cache_key_distinguishes_states() {
        let a = Block::new("minecraft:slab").with_state("top", StateValue::Bool(true));
        let b = Block::new("slab").with_state("top", StateValue::Bool(false));
        assert_ne!(a.cache_key(), b.cache_key());
        assert_eq!(a.cache_key(), Block::new("slab").with_state("top", StateValue::Bool(true)).cache_key());
    }

    #[test]
    fn test_strip_namespace() {
        assert_eq!(strip_namespace("minecraft:stone"), "stone");
        assert_eq!(strip_namespace("stone"), "stone");
    }
}
