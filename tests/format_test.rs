use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use flowbatch::error::FormatError;
use flowbatch::graph::{Graph, GraphConverter, UnsupportedConverter, is_link, is_ui_format, normalize};
use serde_json::{Value, json};

#[derive(Default)]
struct CountingConverter {
    calls: Arc<AtomicUsize>,
}

impl GraphConverter for CountingConverter {
    fn convert(&self, _ui_graph: Value) -> anyhow::Result<Graph> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let converted = json!({ "1": { "inputs": { "text": "converted" } } });
        match converted {
            Value::Object(map) => Ok(Graph::from_map(map)),
            _ => unreachable!(),
        }
    }
}

fn flat_workflow() -> Value {
    json!({
        "3": { "class_type": "KSampler", "inputs": { "seed": 5, "model": ["4", 0] } },
        "4": { "class_type": "CheckpointLoaderSimple", "_meta": { "title": "Load Checkpoint" }, "inputs": {} },
        "note": "free-form entries without inputs are allowed"
    })
}

#[test]
fn test_normalize_flat_graph_is_unchanged() {
    let doc = flat_workflow();
    let graph = normalize(doc.clone(), &UnsupportedConverter).expect("valid graph");
    assert_eq!(graph.clone().into_value(), doc);

    // normalizing an already normalized graph changes nothing
    let again = normalize(graph.clone().into_value(), &UnsupportedConverter).expect("still valid");
    assert_eq!(again, graph);
}

#[test]
fn test_normalize_reports_every_missing_class_type() {
    let doc = json!({
        "1": { "inputs": { "a": 1 }, "_meta": { "title": "First" } },
        "2": { "class_type": "Ok", "inputs": {} },
        "3": { "inputs": {} }
    });

    let err = normalize(doc, &UnsupportedConverter).expect_err("should be rejected");
    match &err {
        FormatError::MissingClassType { issues } => {
            assert_eq!(issues.len(), 2);
            assert_eq!(issues[0].node_id, "1");
            assert_eq!(issues[0].title, "First");
            assert_eq!(issues[1].node_id, "3");
            assert_eq!(issues[1].title, "Unknown");
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let message = err.to_string();
    assert!(message.contains("Node #1 (First) is missing 'class_type'"));
    assert!(message.contains("Node #3 (Unknown) is missing 'class_type'"));
}

#[test]
fn test_ui_format_is_delegated_without_validation() {
    let ui = json!({
        "nodes": [{ "id": 1, "type": "KSampler" }],
        "links": [],
        "version": 0.4
    });
    assert!(is_ui_format(&ui));

    let calls = Arc::new(AtomicUsize::new(0));
    let converter = CountingConverter { calls: calls.clone() };
    let graph = normalize(ui, &converter).expect("converter output is trusted");

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    // converted node lacks class_type but is not re-validated
    assert_eq!(graph.node("1"), Some(&json!({ "inputs": { "text": "converted" } })));
}

#[test]
fn test_ui_detection_needs_both_members() {
    assert!(!is_ui_format(&json!({ "nodes": [] })));
    assert!(!is_ui_format(&json!({ "links": [] })));
    assert!(!is_ui_format(&json!({ "nodes": {}, "links": [] })));
}

#[test]
fn test_unsupported_converter_surfaces_conversion_error() {
    let ui = json!({ "nodes": [], "links": [] });
    let err = normalize(ui, &UnsupportedConverter).expect_err("no converter available");
    assert!(matches!(err, FormatError::Conversion(_)));
}

#[test]
fn test_non_object_documents_are_rejected() {
    let err = normalize(json!([1, 2]), &UnsupportedConverter).expect_err("array is not a graph");
    assert!(matches!(err, FormatError::NotAnObject("an array")));
}

#[test]
fn test_link_detection() {
    assert!(is_link(&json!(["4", 0])));
    assert!(!is_link(&json!([4, 0])));
    assert!(!is_link(&json!(["4", 0, 1])));
    assert!(!is_link(&json!("4")));
}
