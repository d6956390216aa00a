use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::graph::{Graph, INPUTS, is_link, node_title};

/// A literal node input that can be overridden by composite key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputDescriptor {
    /// `<node>.<field>`
    pub id: String,
    pub node_id: String,
    pub node_title: String,
    pub field: String,
    pub value: Value,
    #[serde(rename = "type")]
    pub input_type: String,
}

/// Lists the immediate literal inputs of every node.
///
/// Links and fields that are exactly a `**...**` placeholder are left out.
/// Strings mixing literal text with a placeholder are still listed.
pub fn scan_inputs(graph: &Graph) -> Vec<InputDescriptor> {
    let mut inputs = Vec::new();

    for (node_id, node) in graph.nodes() {
        let Some(fields) = node.get(INPUTS).and_then(Value::as_object) else {
            continue;
        };
        let title = node_title(node, "Unknown");

        for (field, value) in fields {
            if is_link(value) {
                continue;
            }
            if let Value::String(text) = value {
                if text.starts_with("**") && text.ends_with("**") {
                    continue;
                }
            }

            let input_type = if value.is_number() { "number" } else { "text" };
            inputs.push(InputDescriptor {
                id: format!("{node_id}.{field}"),
                node_id: node_id.clone(),
                node_title: title.to_string(),
                field: field.clone(),
                value: value.clone(),
                input_type: input_type.to_string(),
            });
        }
    }

    inputs
}
