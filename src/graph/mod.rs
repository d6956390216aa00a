pub mod format;

use serde::Serialize;
use serde_json::{Map, Value};

pub use format::{GraphConverter, UnsupportedConverter, is_ui_format, normalize};

/// Field holding the operation identity of a node.
pub const CLASS_TYPE: &str = "class_type";
/// Field holding the per-node input map.
pub const INPUTS: &str = "inputs";
/// Display metadata block (`{"title": ...}`).
pub const META: &str = "_meta";

/// Workflow graph in the flat "API" form: node id -> node record.
///
/// Only [`normalize`] produces one from untrusted input, so every templating
/// operation can assume the `class_type` invariant already holds.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Graph {
    nodes: Map<String, Value>,
}

impl Graph {
    /// Wraps a node map without validation. Meant for converter output,
    /// which is trusted to already be flat.
    pub fn from_map(nodes: Map<String, Value>) -> Self {
        Self { nodes }
    }

    pub fn node(&self, id: &str) -> Option<&Value> {
        self.nodes.get(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn as_map_mut(&mut self) -> &mut Map<String, Value> {
        &mut self.nodes
    }

    pub(crate) fn into_map(self) -> Map<String, Value> {
        self.nodes
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.nodes)
    }
}

/// Display title of a node: `_meta.title`, then `class_type`, then `fallback`.
pub fn node_title<'a>(node: &'a Value, fallback: &'a str) -> &'a str {
    node.get(META)
        .and_then(|m| m.get("title"))
        .and_then(Value::as_str)
        .or_else(|| node.get(CLASS_TYPE).and_then(Value::as_str))
        .unwrap_or(fallback)
}

/// A wiring reference `[node_id, slot]` to another node's output.
pub fn is_link(value: &Value) -> bool {
    matches!(value, Value::Array(items) if items.len() == 2 && items[0].is_string())
}
