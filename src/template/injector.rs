use serde_json::Value;

use super::cast::cast_value;
use super::pattern::{VAR_PATTERN, full_match_name};
use super::InputSet;
use crate::graph::{Graph, INPUTS};

/// Produces a concrete graph from `graph` and `values`; `graph` is not touched.
///
/// Composite keys (`<node>.<field>`) are applied first and overwrite the field
/// outright, links included. Bare names then fill placeholders. Unknown nodes
/// and unknown variables are ignored.
pub fn inject(graph: &Graph, values: &InputSet) -> Graph {
    let mut working = graph.clone();
    apply_direct(&mut working, values);

    let nodes = working
        .into_map()
        .into_iter()
        .map(|(id, node)| (id, rewrite(node, values)))
        .collect();
    Graph::from_map(nodes)
}

fn apply_direct(graph: &mut Graph, values: &InputSet) {
    for (key, value) in values {
        let Some((node_id, field)) = key.split_once('.') else {
            continue;
        };
        let target = graph
            .as_map_mut()
            .get_mut(node_id)
            .and_then(|node| node.get_mut(INPUTS))
            .and_then(Value::as_object_mut);
        if let Some(inputs) = target {
            inputs.insert(field.to_string(), cast_value(value));
        }
    }
}

fn rewrite(value: Value, values: &InputSet) -> Value {
    match value {
        Value::String(text) => substitute(text, values),
        Value::Object(map) => Value::Object(map.into_iter().map(|(k, v)| (k, rewrite(v, values))).collect()),
        Value::Array(items) => Value::Array(items.into_iter().map(|v| rewrite(v, values)).collect()),
        other => other,
    }
}

fn substitute(text: String, values: &InputSet) -> Value {
    if let Some(replacement) = full_match_name(&text).and_then(|name| values.get(name)) {
        return cast_value(replacement);
    }

    let spans: Vec<_> = VAR_PATTERN
        .captures_iter(&text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            values.get(&caps["name"]).map(|v| (whole.range(), v))
        })
        .collect();
    if spans.is_empty() {
        return Value::String(text);
    }

    let mut out = text;
    for (range, replacement) in spans.into_iter().rev() {
        out.replace_range(range, &display_text(replacement));
    }
    Value::String(out)
}

/// Text used when a value is spliced into a larger string.
fn display_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
