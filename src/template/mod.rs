pub mod cast;
pub mod injector;
pub mod pattern;
pub mod scanner;

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::graph::Graph;

pub use cast::cast_value;
pub use injector::inject;
pub use pattern::{Variable, extract_variables};
pub use scanner::{InputDescriptor, scan_inputs};

/// Named inputs for one run. Keys are bare variable names or `<node>.<field>`.
pub type InputSet = Map<String, Value>;

/// Saved template: a workflow plus the variables the user exposed on it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub workflow: Value,
    #[serde(default)]
    pub variables: Vec<TemplateVariable>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateVariable {
    /// Bare name or composite `<node>.<field>` key.
    pub id: String,
    #[serde(rename = "type", default = "default_var_type")]
    pub var_type: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_var_type() -> String {
    "text".to_string()
}

/// Declared type per input key: pattern variables first, template entries win.
pub fn var_types(graph: &Graph, template: Option<&Template>) -> HashMap<String, String> {
    let mut types: HashMap<String, String> = extract_variables(graph)
        .into_iter()
        .map(|v| (v.name, v.var_type))
        .collect();
    if let Some(template) = template {
        for var in &template.variables {
            types.insert(var.id.clone(), var.var_type.clone());
        }
    }
    types
}
