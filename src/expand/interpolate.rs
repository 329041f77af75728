//! `${...}` placeholder substitution in template strings.
//!
//! Two placeholder forms are understood:
//!
//! - `Array.<name>[<index>]` where `<index>` is `entity.<prop>` or a block
//!   state name, looked up in the cube's `arrays` table.
//! - A path starting at `#block_name`, `#block_states` or
//!   `#block_entity_data`, followed by `.prop` / `[i]` accessors and an
//!   optional trailing `[a:b]` slice.
//!
//! Either form may end in `?? <default>`. The default
//! `SET_WHOLE_STRING(<literal>)` replaces the whole template string.

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::types::Block;
use serde_json::Value;
use std::collections::BTreeMap;

const WHOLE_STRING_PREFIX: &str = "SET_WHOLE_STRING(";

/// Substitute every placeholder in `template`.
pub fn interpolate(
    block: &Block,
    template: &str,
    arrays: Option<&BTreeMap<String, Vec<Value>>>,
    diagnostics: &Diagnostics,
) -> String {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("${") {
        output.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            diagnostics.warn(
                DiagnosticKind::MalformedExpression,
                format!("Unclosed placeholder in {:?} for {}", template, block.name),
            );
            output.push_str(&rest[start..]);
            return output;
        };

        match substitute(block, &after[..end], arrays, diagnostics) {
            Substitution::Value(value) => output.push_str(&value),
            Substitution::WholeString(value) => return value,
        }
        rest = &after[end + 1..];
    }

    output.push_str(rest);
    output
}

enum Substitution {
    Value(String),
    WholeString(String),
}

fn substitute(
    block: &Block,
    placeholder: &str,
    arrays: Option<&BTreeMap<String, Vec<Value>>>,
    diagnostics: &Diagnostics,
) -> Substitution {
    let (expression, default) = match placeholder.split_once("??") {
        Some((expression, default)) => (expression.trim(), Some(default.trim())),
        None => (placeholder.trim(), None),
    };

    let resolved = if let Some(array_expr) = expression.strip_prefix("Array.") {
        lookup_array(block, array_expr, arrays)
    } else if expression.starts_with('#') {
        match resolve_path(block, expression) {
            Ok(value) => value,
            Err(reason) => {
                diagnostics.warn(
                    DiagnosticKind::MalformedExpression,
                    format!("Malformed placeholder {:?} for {}: {}", placeholder, block.name, reason),
                );
                return Substitution::Value(String::new());
            }
        }
    } else {
        diagnostics.warn(
            DiagnosticKind::MalformedExpression,
            format!("Unknown placeholder {:?} for {}", placeholder, block.name),
        );
        return Substitution::Value(String::new());
    };

    if let Some(value) = resolved.filter(|v| !v.is_empty()) {
        return Substitution::Value(value);
    }

    match default {
        Some(default) => match default
            .strip_prefix(WHOLE_STRING_PREFIX)
            .and_then(|inner| inner.strip_suffix(')'))
        {
            Some(literal) => Substitution::WholeString(unquote(literal.trim()).to_string()),
            None => Substitution::Value(unquote(default).to_string()),
        },
        None => {
            let kind = if expression.starts_with("Array.") {
                DiagnosticKind::MissingArrayValue
            } else {
                DiagnosticKind::MissingState
            };
            diagnostics.warn(
                kind,
                format!("Placeholder {:?} resolved to nothing for {}", placeholder, block.cache_key()),
            );
            Substitution::Value(String::new())
        }
    }
}

/// `name[index_expr]` against the cube's arrays.
fn lookup_array(
    block: &Block,
    expression: &str,
    arrays: Option<&BTreeMap<String, Vec<Value>>>,
) -> Option<String> {
    let (name, index_expr) = expression.split_once('[')?;
    let index_expr = index_expr.strip_suffix(']')?.trim();

    let index_value = match index_expr.strip_prefix("entity.") {
        Some(prop) => block.entity_value(prop).cloned()?,
        None => block.state(index_expr)?.to_json(),
    };
    let index = match &index_value {
        Value::Number(n) => n.as_u64()?,
        Value::Bool(b) => *b as u64,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };

    let entry = arrays?.get(name.trim())?.get(usize::try_from(index).ok()?)?;
    value_to_string(entry)
}

/// Walk a `#root.prop[i][a:b]` path.
fn resolve_path(block: &Block, expression: &str) -> Result<Option<String>, String> {
    let root_end = expression
        .find(['.', '['])
        .unwrap_or(expression.len());
    let mut current = match &expression[..root_end] {
        "#block_name" => Value::String(block.short_name().to_string()),
        "#block_states" => block.states_json(),
        "#block_entity_data" => block
            .block_entity_data
            .clone()
            .map(Value::Object)
            .unwrap_or(Value::Null),
        other => return Err(format!("unknown root {}", other)),
    };

    let mut rest = &expression[root_end..];
    while !rest.is_empty() {
        if let Some(after_dot) = rest.strip_prefix('.') {
            let end = after_dot.find(['.', '[']).unwrap_or(after_dot.len());
            let key = &after_dot[..end];
            if key.is_empty() {
                return Err("empty property name".to_string());
            }
            current = current.get(key).cloned().unwrap_or(Value::Null);
            rest = &after_dot[end..];
        } else if let Some(after_bracket) = rest.strip_prefix('[') {
            let end = after_bracket
                .find(']')
                .ok_or_else(|| "unclosed [".to_string())?;
            let accessor = after_bracket[..end].trim();
            current = match accessor.split_once(':') {
                Some((from, to)) => slice(&current, from.trim(), to.trim())?,
                None => index(&current, accessor),
            };
            rest = &after_bracket[end + 1..];
        } else {
            return Err(format!("unexpected {:?}", rest));
        }
    }

    Ok(value_to_string(&current))
}

fn index(value: &Value, accessor: &str) -> Value {
    let key = unquote(accessor);
    match (value, key.parse::<usize>()) {
        (Value::Array(items), Ok(i)) => items.get(i).cloned().unwrap_or(Value::Null),
        (Value::String(s), Ok(i)) => s
            .chars()
            .nth(i)
            .map(|c| Value::String(c.to_string()))
            .unwrap_or(Value::Null),
        _ => value.get(key).cloned().unwrap_or(Value::Null),
    }
}

/// Python-style slice with optional bounds; negative bounds count from the end.
fn slice(value: &Value, from: &str, to: &str) -> Result<Value, String> {
    let bound = |s: &str| -> Result<Option<i64>, String> {
        if s.is_empty() {
            Ok(None)
        } else {
            s.parse()
                .map(Some)
                .map_err(|_| format!("slice bound {:?} is not an integer", s))
        }
    };
    let (from, to) = (bound(from)?, bound(to)?);
    let clamp = |bound: Option<i64>, len: usize, default: usize| -> usize {
        match bound {
            None => default,
            Some(b) if b < 0 => len.saturating_sub(b.unsigned_abs() as usize),
            Some(b) => (b as usize).min(len),
        }
    };

    Ok(match value {
        Value::String(s) => {
            let chars: Vec<char> = s.chars().collect();
            let (a, b) = (clamp(from, chars.len(), 0), clamp(to, chars.len(), chars.len()));
            Value::String(if a < b { chars[a..b].iter().collect() } else { String::new() })
        }
        Value::Array(items) => {
            let (a, b) = (clamp(from, items.len(), 0), clamp(to, items.len(), items.len()));
            Value::Array(if a < b { items[a..b].to_vec() } else { Vec::new() })
        }
        _ => Value::Null,
    })
}

fn value_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        other => Some(other.to_string()),
    }
}

fn unquote(s: &str) -> &str {
    for quote in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(quote) && s.ends_with(quote) {
            return &s[1..s.len() - 1];
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StateValue;
    use serde_json::json;

    fn wool() -> Block {
        Block::new("minecraft:wool").with_state("color", StateValue::Str("red".into()))
    }

    #[test]
    fn test_state_placeholder() {
        let diagnostics = Diagnostics::new();
        assert_eq!(
            interpolate(&wool(), "a/${#block_states.color}/b", None, &diagnostics),
            "a/red/b"
        );
        assert_eq!(
            interpolate(&wool(), "textures/blocks/${#block_name}", None, &diagnostics),
            "textures/blocks/wool"
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_missing_value_yields_empty() {
        let diagnostics = Diagnostics::new();
        assert_eq!(
            interpolate(&wool(), "x${#block_states.age}y", None, &diagnostics),
            "xy"
        );
        assert_eq!(diagnostics.count(DiagnosticKind::MissingState), 1);
    }

    #[test]
    fn test_default_and_whole_string() {
        let diagnostics = Diagnostics::new();
        assert_eq!(
            interpolate(&wool(), "x${#block_states.age ?? 7}y", None, &diagnostics),
            "x7y"
        );
        assert_eq!(
            interpolate(
                &wool(),
                "prefix/${#block_states.color}/${#block_entity_data.Item ?? SET_WHOLE_STRING(empty)}/suffix",
                None,
                &diagnostics
            ),
            "empty"
        );
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_entity_path_and_slice() {
        let diagnostics = Diagnostics::new();
        let pot = Block::new("flower_pot").with_entity_data(
            "PlantBlock",
            json!({"name": "minecraft:red_flower", "states": {"flower_type": "tulip_red"}}),
        );
        assert_eq!(
            interpolate(&pot, "${#block_entity_data.PlantBlock.name[10:]}", None, &diagnostics),
            "red_flower"
        );
        assert_eq!(
            interpolate(&pot, "${#block_entity_data.PlantBlock.states.flower_type[:5]}", None, &diagnostics),
            "tulip"
        );
        assert_eq!(
            interpolate(&pot, "${#block_entity_data[PlantBlock][name][-6:]}", None, &diagnostics),
            "flower"
        );
    }

    #[test]
    fn test_array_lookup() {
        let diagnostics = Diagnostics::new();
        let arrays: BTreeMap<String, Vec<Value>> = [(
            "colors".to_string(),
            vec![json!("white"), json!("orange"), json!("magenta")],
        )]
        .into_iter()
        .collect();

        let bed = Block::new("bed")
            .with_state("head_piece_bit", StateValue::Bool(true))
            .with_entity_data("color", json!(2));
        assert_eq!(
            interpolate(&bed, "bed_${Array.colors[entity.color]}", Some(&arrays), &diagnostics),
            "bed_magenta"
        );
        assert_eq!(
            interpolate(&bed, "${Array.colors[head_piece_bit]}", Some(&arrays), &diagnostics),
            "orange"
        );
        assert!(diagnostics.is_empty());

        assert_eq!(
            interpolate(&bed, "${Array.colors[age]}", Some(&arrays), &diagnostics),
            ""
        );
        assert_eq!(diagnostics.count(DiagnosticKind::MissingArrayValue), 1);
    }

    #[test]
    fn test_malformed_placeholders() {
        let diagnostics = Diagnostics::new();
        assert_eq!(interpolate(&wool(), "a${nope}b", None, &diagnostics), "ab");
        assert_eq!(interpolate(&wool(), "a${#block_states", None, &diagnostics), "a${#block_states");
        assert_eq!(diagnostics.count(DiagnosticKind::MalformedExpression), 2);
    }

    #[test]
    fn test_plain_strings_pass_through() {
        let diagnostics = Diagnostics::new();
        assert_eq!(interpolate(&wool(), "textures/blocks/stone", None, &diagnostics), "textures/blocks/stone");
    }
}
