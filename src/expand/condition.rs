//! Conditional expressions on cube templates (`"if"` fields).
//!
//! Grammar: terms joined by `&&` and `||`, with `&&` binding tighter. A term is
//! `#copied_via_copy_block`, its negation, or `[entity.]name[(??|&)n] op value`
//! with `op` one of `== != >= <= > <`.
//!
//! Errors fail open: a malformed term or a missing state evaluates to `true`
//! so the affected geometry shows up instead of silently disappearing.

use crate::diagnostics::{DiagnosticKind, Diagnostics};
use crate::types::{Block, StateValue};

const COPIED_SENTINEL: &str = "#copied_via_copy_block";

/// Comparison operators, two-character ones first so `>=` is not read as `>`.
const OPERATORS: [&str; 6] = ["==", "!=", ">=", "<=", ">", "<"];

/// Evaluate a conditional expression against a block.
pub fn evaluate(block: &Block, expression: &str, diagnostics: &Diagnostics) -> bool {
    if expression.trim().is_empty() {
        diagnostics.warn(
            DiagnosticKind::MalformedExpression,
            format!("Empty condition on {}", block.name),
        );
        return true;
    }

    expression.split("||").any(|group| {
        group
            .split("&&")
            .all(|term| evaluate_term(block, term.trim(), diagnostics))
    })
}

fn evaluate_term(block: &Block, term: &str, diagnostics: &Diagnostics) -> bool {
    if term == COPIED_SENTINEL {
        return block.copied_via_copy_block;
    }
    if term.strip_prefix('!') == Some(COPIED_SENTINEL) {
        return !block.copied_via_copy_block;
    }

    let malformed = |reason: &str| {
        diagnostics.warn(
            DiagnosticKind::MalformedExpression,
            format!("Malformed condition term {:?} on {}: {}", term, block.name, reason),
        );
        true
    };

    let Some((left, op, right)) = split_comparison(term) else {
        return malformed("no comparison operator");
    };

    let (from_entity, state_term) = match left.strip_prefix("entity.") {
        Some(rest) => (true, rest),
        None => (false, left),
    };

    let (name, modifier) = match state_term.split_once("??") {
        Some((name, operand)) => (name.trim(), Some(("??", operand.trim()))),
        None => match state_term.split_once('&') {
            Some((name, operand)) => (name.trim(), Some(("&", operand.trim()))),
            None => (state_term.trim(), None),
        },
    };
    if name.is_empty() {
        return malformed("missing state name");
    }

    let stored = if from_entity {
        block.entity_value(name).and_then(StateValue::from_json)
    } else {
        block.state(name).cloned()
    };

    let value = match modifier {
        None => stored,
        Some((symbol, operand)) => {
            let Ok(operand) = operand.parse::<i64>() else {
                return malformed("operand is not an integer");
            };
            match (symbol, stored) {
                ("??", stored) => Some(stored.unwrap_or(StateValue::Int(operand))),
                (_, Some(stored)) => match stored.as_i64() {
                    Some(v) => Some(StateValue::Int(v & operand)),
                    None => return malformed("bitwise AND on a non-numeric value"),
                },
                (_, None) => None,
            }
        }
    };

    let Some(value) = value else {
        diagnostics.error(
            DiagnosticKind::MissingState,
            format!(
                "Condition {:?} references missing {} {} on {}",
                term,
                if from_entity { "entity property" } else { "state" },
                name,
                block.name
            ),
        );
        return true;
    };

    match compare(&value, op, unquote(right.trim())) {
        Some(result) => result,
        None => malformed("ordering comparison on a non-numeric value"),
    }
}

/// Find the first comparison operator, scanning left to right.
fn split_comparison(term: &str) -> Option<(&str, &str, &str)> {
    for (i, _) in term.char_indices() {
        for op in OPERATORS {
            if term[i..].starts_with(op) {
                return Some((term[..i].trim(), op, &term[i + op.len()..]));
            }
        }
    }
    None
}

fn compare(value: &StateValue, op: &str, literal: &str) -> Option<bool> {
    if let (Some(left), Ok(right)) = (value.as_i64(), literal.parse::<f64>()) {
        let left = left as f64;
        return Some(match op {
            "==" => left == right,
            "!=" => left != right,
            ">=" => left >= right,
            "<=" => left <= right,
            ">" => left > right,
            "<" => left < right,
            _ => return None,
        });
    }

    let left = value.to_string();
    match op {
        "==" => Some(left == literal),
        "!=" => Some(left != literal),
        _ => None,
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
