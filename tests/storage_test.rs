use std::fs;

use flowbatch::error::BatchError;
use flowbatch::storage::{
    DocumentKind, DocumentStore, FileDocumentStore, InMemoryDocumentStore, OutputStore,
    sanitize_name,
};
use serde_json::json;

#[test]
fn test_sanitize_name() {
    assert_eq!(sanitize_name("  my flow/v2!  ").unwrap(), "myflowv2");
    assert_eq!(sanitize_name("ok-name_1").unwrap(), "ok-name_1");
    assert!(sanitize_name("../..").is_err());
    assert!(sanitize_name("").is_err());
}

async fn exercise(store: &dyn DocumentStore) {
    let doc = json!({ "3": { "class_type": "KSampler", "inputs": {} } });

    let saved = store.save(DocumentKind::Workflow, "my flow", &doc).await.unwrap();
    assert_eq!(saved, "myflow");
    store.save(DocumentKind::Workflow, "alpha", &doc).await.unwrap();
    store.save(DocumentKind::Template, "tpl", &json!({ "workflow": doc })).await.unwrap();

    assert_eq!(store.list(DocumentKind::Workflow).await.unwrap(), vec!["alpha", "myflow"]);
    assert_eq!(store.list(DocumentKind::Template).await.unwrap(), vec!["tpl"]);
    assert_eq!(store.load(DocumentKind::Workflow, "myflow").await.unwrap(), doc);

    store.delete(DocumentKind::Workflow, "myflow").await.unwrap();
    // deleting twice is fine
    store.delete(DocumentKind::Workflow, "myflow").await.unwrap();
    assert!(store.load(DocumentKind::Workflow, "myflow").await.is_err());
    assert_eq!(store.list(DocumentKind::Workflow).await.unwrap(), vec!["alpha"]);
}

#[tokio::test]
async fn test_file_document_store() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let store = FileDocumentStore::new(temp_dir.path().join("workflows"), temp_dir.path().join("templates"));
    exercise(&store).await;
    assert!(temp_dir.path().join("workflows/alpha.json").is_file());
}

#[tokio::test]
async fn test_in_memory_document_store() {
    let store = InMemoryDocumentStore::new();
    exercise(&store).await;
}

#[tokio::test]
async fn test_output_store_listing() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let root = temp_dir.path();
    fs::create_dir_all(root.join("batch_100_aaaaaa")).unwrap();
    fs::create_dir_all(root.join("batch_200_bbbbbb")).unwrap();
    fs::write(root.join("batch_100_aaaaaa/run_0_9.png"), b"png").unwrap();
    fs::write(root.join("batch_200_bbbbbb/run_1_9.png"), b"png").unwrap();
    fs::write(root.join("batch_200_bbbbbb/run_0_9.png"), b"png").unwrap();
    fs::write(root.join("batch_200_bbbbbb/run_0_12.txt"), b"text").unwrap();
    fs::write(root.join("stray.txt"), b"ignored").unwrap();

    let store = OutputStore::new(root);
    let jobs = store.list_jobs().await.unwrap();
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0].job_id, "batch_200_bbbbbb");
    assert_eq!(jobs[0].file_count, 2);
    assert_eq!(jobs[1].file_count, 1);

    let files = store.list_files("batch_200_bbbbbb").await.unwrap();
    assert_eq!(files[0].filename, "run_0_9.png");
    assert_eq!(files[0].url, "/api/outputs/batch_200_bbbbbb/run_0_9.png");

    assert!(store.file_path("batch_100_aaaaaa", "run_0_9.png").await.is_ok());
    assert!(matches!(
        store.file_path("batch_100_aaaaaa", "../stray.txt").await,
        Err(BatchError::NotFound(_))
    ));
    assert!(matches!(store.list_files("missing").await, Err(BatchError::NotFound(_))));
}
