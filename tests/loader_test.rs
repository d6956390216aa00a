use std::fs;

use flowbatch::loader::{load_batch, load_document, load_template, parse_assignment};
use serde_json::json;

#[test]
fn test_load_batch_list_from_json() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let file_path = temp_dir.path().join("batch.json");
    fs::write(&file_path, r#"[{"seed": "1"}, {"seed": "2", "3.steps": 30}]"#)
        .expect("Failed to write temp file");

    let sets = load_batch(&file_path).expect("Failed to load batch");
    assert_eq!(sets.len(), 2);
    assert_eq!(sets[1]["3.steps"], json!(30));
}

#[test]
fn test_load_batch_single_object_from_yaml() {
    let yaml_content = r#"
subject: "a red fox"
seed: 42
"#;
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let file_path = temp_dir.path().join("batch.yaml");
    fs::write(&file_path, yaml_content).expect("Failed to write temp file");

    let sets = load_batch(&file_path).expect("Failed to load batch");
    assert_eq!(sets.len(), 1);
    assert_eq!(sets[0]["subject"], json!("a red fox"));
    assert_eq!(sets[0]["seed"], json!(42));
}

#[test]
fn test_load_batch_rejects_scalar_entries() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let file_path = temp_dir.path().join("batch.json");
    fs::write(&file_path, r#"[{"seed": "1"}, 5]"#).expect("Failed to write temp file");

    assert!(load_batch(&file_path).is_err());
}

#[test]
fn test_load_template() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let file_path = temp_dir.path().join("portrait.json");
    let doc = json!({
        "name": "portrait",
        "workflow": { "3": { "class_type": "KSampler", "inputs": {} } },
        "variables": [{ "id": "3.seed", "type": "number", "label": "Seed" }]
    });
    fs::write(&file_path, doc.to_string()).expect("Failed to write temp file");

    let template = load_template(&file_path).expect("Failed to load template");
    assert_eq!(template.variables.len(), 1);
    assert_eq!(template.variables[0].id, "3.seed");
    assert_eq!(template.variables[0].var_type, "number");
    assert_eq!(template.variables[0].extra["label"], json!("Seed"));

    let raw = load_document(&file_path).expect("Failed to load document");
    assert_eq!(raw, doc);
}

#[test]
fn test_missing_file_reports_path() {
    let err = load_document(std::path::Path::new("/definitely/not/here.json")).unwrap_err();
    assert!(format!("{err:#}").contains("/definitely/not/here.json"));
}

#[test]
fn test_parse_assignment_splits_at_first_equals() {
    assert_eq!(parse_assignment("prompt=a=b").unwrap(), ("prompt".to_string(), json!("a=b")));
    assert_eq!(parse_assignment("seed=42").unwrap(), ("seed".to_string(), json!("42")));
    assert!(parse_assignment("novalue").is_err());
}
