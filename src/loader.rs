use std::fs;
use std::path::Path;

use anyhow::{Context as _, Result, anyhow, bail};
use serde_json::Value;

use crate::template::{InputSet, Template};

/// Reads a JSON document, or YAML when the extension is `.yaml`/`.yml`.
pub fn load_document(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read file from {}", path.display()))?;

    let is_yaml = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("yaml") || e.eq_ignore_ascii_case("yml"));
    if is_yaml {
        serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to deserialize YAML content from {}", path.display()))
    } else {
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to deserialize JSON content from {}", path.display()))
    }
}

pub fn load_template(path: &Path) -> Result<Template> {
    let doc = load_document(path)?;
    serde_json::from_value(doc).with_context(|| format!("Invalid template in {}", path.display()))
}

/// A batch file holds a list of input sets, or a single input set.
pub fn load_batch(path: &Path) -> Result<Vec<InputSet>> {
    match load_document(path)? {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::Object(set) => Ok(set),
                other => Err(anyhow!("Batch entry {} is not an object: {}", i, other)),
            })
            .collect(),
        Value::Object(set) => Ok(vec![set]),
        other => bail!("Batch file {} must hold an object or a list, got {}", path.display(), other),
    }
}

/// Splits `key=value` at the first `=`; the value stays text.
pub fn parse_assignment(s: &str) -> Result<(String, Value), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("invalid KEY=value: no `=` found in `{}`", s))?;
    Ok((key.to_string(), Value::String(value.to_string())))
}
