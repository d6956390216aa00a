use anyhow::anyhow;
use serde_json::Value;
use tracing::debug;

use super::{CLASS_TYPE, Graph, INPUTS, META};
use crate::error::{FormatError, NodeIssue};

/// Converts the UI (node-list + links) representation to the flat form.
///
/// Output is trusted as-is; [`normalize`] does not re-validate it.
pub trait GraphConverter: Send + Sync {
    fn convert(&self, ui_graph: Value) -> anyhow::Result<Graph>;
}

/// Converter for hosts that only accept API-format exports.
#[derive(Debug, Default)]
pub struct UnsupportedConverter;

impl GraphConverter for UnsupportedConverter {
    fn convert(&self, _ui_graph: Value) -> anyhow::Result<Graph> {
        Err(anyhow!("UI-format workflows are not supported here; export the workflow in API format"))
    }
}

/// True when the document exposes a `nodes` list and a `links` member.
pub fn is_ui_format(doc: &Value) -> bool {
    doc.get("nodes").is_some_and(Value::is_array) && doc.get("links").is_some()
}

/// Brings an externally supplied workflow into the flat form.
///
/// UI documents go to `converter` unconditionally. Anything else must already
/// be flat; every entry with an `inputs` block must carry `class_type`, and
/// all offenders are reported together.
pub fn normalize(doc: Value, converter: &dyn GraphConverter) -> Result<Graph, FormatError> {
    if is_ui_format(&doc) {
        debug!("Converting UI-format workflow");
        return converter.convert(doc).map_err(FormatError::Conversion);
    }

    let nodes = match doc {
        Value::Object(map) => map,
        Value::Null => return Err(FormatError::NotAnObject("null")),
        Value::Bool(_) => return Err(FormatError::NotAnObject("a boolean")),
        Value::Number(_) => return Err(FormatError::NotAnObject("a number")),
        Value::String(_) => return Err(FormatError::NotAnObject("a string")),
        Value::Array(_) => return Err(FormatError::NotAnObject("an array")),
    };

    let issues: Vec<NodeIssue> = nodes
        .iter()
        .filter(|(_, node)| node.get(INPUTS).is_some() && node.get(CLASS_TYPE).is_none())
        .map(|(id, node)| NodeIssue {
            node_id: id.clone(),
            title: node
                .get(META)
                .and_then(|m| m.get("title"))
                .and_then(Value::as_str)
                .unwrap_or("Unknown")
                .to_string(),
        })
        .collect();

    if !issues.is_empty() {
        return Err(FormatError::MissingClassType { issues });
    }

    Ok(Graph::from_map(nodes))
}
