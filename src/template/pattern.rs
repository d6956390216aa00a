use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;

use crate::graph::Graph;

const PLACEHOLDER: &str = r"\*\*(?P<name>[\w_]+)\[(?P<type>\w+)\](?:\((?P<options>[^\)]+)\))?\*\*";

/// `**name[type]**` or `**name[type](a|b|c)**` anywhere in a string.
pub static VAR_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(PLACEHOLDER).expect("placeholder pattern compiles")
});

/// Same grammar, anchored to the whole string.
static VAR_FULL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!("^(?:{PLACEHOLDER})$")).expect("anchored placeholder pattern compiles")
});

/// A variable addressed by placeholder syntax inside a string leaf.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    pub name: String,
    #[serde(rename = "type")]
    pub var_type: String,
    pub options: Vec<String>,
    pub raw: String,
    pub mode: String,
}

impl Variable {
    fn from_captures(caps: &Captures<'_>) -> Self {
        Self {
            name: caps["name"].to_string(),
            var_type: caps["type"].to_string(),
            options: caps
                .name("options")
                .map(|m| m.as_str().split('|').map(str::to_string).collect())
                .unwrap_or_default(),
            raw: caps[0].to_string(),
            mode: "pattern".to_string(),
        }
    }
}

/// Returns the variable name when `text` is exactly one placeholder.
pub(crate) fn full_match_name(text: &str) -> Option<&str> {
    VAR_FULL_PATTERN
        .captures(text)
        .and_then(|caps| caps.name("name"))
        .map(|m| m.as_str())
}

/// Lists placeholder variables in traversal order, first occurrence per name.
pub fn extract_variables(graph: &Graph) -> Vec<Variable> {
    let mut seen = HashSet::new();
    let mut found = Vec::new();
    for (_, node) in graph.nodes() {
        collect(node, &mut seen, &mut found);
    }
    found
}

fn collect(value: &Value, seen: &mut HashSet<String>, found: &mut Vec<Variable>) {
    match value {
        Value::String(text) => {
            for caps in VAR_PATTERN.captures_iter(text) {
                if seen.insert(caps["name"].to_string()) {
                    found.push(Variable::from_captures(&caps));
                }
            }
        }
        Value::Object(map) => map.values().for_each(|v| collect(v, seen, found)),
        Value::Array(items) => items.iter().for_each(|v| collect(v, seen, found)),
        _ => {}
    }
}
