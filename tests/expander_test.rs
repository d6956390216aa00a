use std::collections::HashMap;
use std::fs;
use std::path::Path;

use flowbatch::runtime::FolderExpander;
use flowbatch::template::InputSet;
use serde_json::{Value, json};

fn touch(dir: &Path, names: &[&str]) {
    for name in names {
        fs::write(dir.join(name), b"x").expect("Failed to write temp file");
    }
}

fn inputs(doc: Value) -> InputSet {
    doc.as_object().cloned().expect("object")
}

fn path_str(dir: &Path, name: &str) -> Value {
    json!(dir.join(name).to_string_lossy())
}

#[test]
fn test_primary_folder_drives_job_count_and_secondary_repeats_last() {
    let primary = tempfile::tempdir().expect("Failed to create temp dir");
    let secondary = tempfile::tempdir().expect("Failed to create temp dir");
    touch(primary.path(), &["e.png", "a.png", "c.PNG", "b.jpg", "d.webp", "notes.txt"]);
    touch(secondary.path(), &["mask2.png", "mask1.png"]);

    let set = inputs(json!({
        "image": primary.path().to_string_lossy(),
        "mask_image": secondary.path().to_string_lossy(),
        "seed": "7"
    }));
    let types = HashMap::new();
    let jobs = FolderExpander::new(&types).expand(&set).expect("expansion");

    assert_eq!(jobs.len(), 5);
    let images: Vec<_> = jobs.iter().map(|j| j["image"].clone()).collect();
    assert_eq!(
        images,
        vec![
            path_str(primary.path(), "a.png"),
            path_str(primary.path(), "b.jpg"),
            path_str(primary.path(), "c.PNG"),
            path_str(primary.path(), "d.webp"),
            path_str(primary.path(), "e.png"),
        ]
    );

    assert_eq!(jobs[0]["mask_image"], path_str(secondary.path(), "mask1.png"));
    assert_eq!(jobs[1]["mask_image"], path_str(secondary.path(), "mask2.png"));
    for job in &jobs[2..] {
        assert_eq!(job["mask_image"], path_str(secondary.path(), "mask2.png"));
    }
    assert!(jobs.iter().all(|j| j["seed"] == json!("7")));
}

#[test]
fn test_declared_type_selects_extensions() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    touch(dir.path(), &["clip.mp4", "clip2.MOV", "frame.png", "voice.wav"]);

    let set = inputs(json!({ "source": dir.path().to_string_lossy() }));
    let types = HashMap::from([("source".to_string(), "video".to_string())]);
    let jobs = FolderExpander::new(&types).expand(&set).expect("expansion");

    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0]["source"], path_str(dir.path(), "clip.mp4"));
    assert_eq!(jobs[1]["source"], path_str(dir.path(), "clip2.MOV"));
}

#[test]
fn test_untyped_folder_takes_all_media() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    touch(dir.path(), &["a.mp3", "b.png", "c.mkv", "d.json"]);

    let set = inputs(json!({ "media": dir.path().to_string_lossy() }));
    let types = HashMap::new();
    let jobs = FolderExpander::new(&types).expand(&set).expect("expansion");
    assert_eq!(jobs.len(), 3);
}

#[test]
fn test_folder_without_matches_stays_a_plain_value() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    touch(dir.path(), &["readme.md"]);

    let set = inputs(json!({ "image": dir.path().to_string_lossy(), "seed": 1 }));
    let types = HashMap::new();
    let jobs = FolderExpander::new(&types).expand(&set).expect("expansion");
    assert_eq!(jobs, vec![set]);
}

#[test]
fn test_expand_all_concatenates_input_sets() {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    touch(dir.path(), &["1.png", "2.png"]);

    let sets = vec![
        inputs(json!({ "image": dir.path().to_string_lossy(), "prompt": "a" })),
        inputs(json!({ "prompt": "b" })),
    ];
    let types = HashMap::new();
    let jobs = FolderExpander::new(&types).expand_all(&sets).expect("expansion");

    assert_eq!(jobs.len(), 3);
    assert_eq!(jobs[2], sets[1]);
}
