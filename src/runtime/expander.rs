use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::info;

use crate::template::InputSet;

pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp", "bmp", "gif"];
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "webm", "mkv"];
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "flac", "ogg", "aac"];

/// Turns folder-valued inputs into one input set per file.
///
/// The first folder variable (in input order) drives the job count. Other
/// folder variables are zipped by index and repeat their last file once they
/// run out. Folders without a matching file are left as plain values.
pub struct FolderExpander<'a> {
    var_types: &'a HashMap<String, String>,
}

impl<'a> FolderExpander<'a> {
    pub fn new(var_types: &'a HashMap<String, String>) -> Self {
        Self { var_types }
    }

    pub fn expand_all(&self, input_sets: &[InputSet]) -> io::Result<Vec<InputSet>> {
        let mut jobs = Vec::new();
        for inputs in input_sets {
            jobs.extend(self.expand(inputs)?);
        }
        Ok(jobs)
    }

    pub fn expand(&self, inputs: &InputSet) -> io::Result<Vec<InputSet>> {
        let mut folders: Vec<(&String, Vec<PathBuf>)> = Vec::new();

        for (key, value) in inputs {
            let Some(dir) = value.as_str().map(Path::new).filter(|p| p.is_dir()) else {
                continue;
            };
            let var_type = self.var_types.get(key).map(String::as_str).unwrap_or("file");
            let files = list_media_files(dir, extensions_for(key, var_type))?;
            if files.is_empty() {
                continue;
            }
            info!(variable = %key, folder = %dir.display(), count = files.len(), "Found files in folder");
            folders.push((key, files));
        }

        let Some(((primary_key, primary_files), secondary)) = folders.split_first() else {
            return Ok(vec![inputs.clone()]);
        };

        let jobs = primary_files
            .iter()
            .enumerate()
            .map(|(idx, file)| {
                let mut job = inputs.clone();
                job.insert((*primary_key).clone(), path_value(file));
                for (key, files) in secondary {
                    // non-empty by construction
                    let pick = files.get(idx).or_else(|| files.last());
                    if let Some(path) = pick {
                        job.insert((*key).clone(), path_value(path));
                    }
                }
                job
            })
            .collect();
        Ok(jobs)
    }
}

fn extensions_for(key: &str, var_type: &str) -> Vec<&'static str> {
    let key = key.to_lowercase();
    if var_type == "image" || key.contains("image") {
        IMAGE_EXTENSIONS.to_vec()
    } else if var_type == "video" || key.contains("video") {
        VIDEO_EXTENSIONS.to_vec()
    } else if var_type == "audio" || key.contains("audio") {
        AUDIO_EXTENSIONS.to_vec()
    } else {
        [IMAGE_EXTENSIONS, VIDEO_EXTENSIONS, AUDIO_EXTENSIONS].concat()
    }
}

/// Files in `dir` whose extension (case-insensitive) is in `extensions`, sorted by name.
fn list_media_files(dir: &Path, extensions: Vec<&str>) -> io::Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| extensions.contains(&e.to_lowercase().as_str()));
        if matches && path.is_file() {
            files.push(path);
        }
    }
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(files)
}

fn path_value(path: &Path) -> Value {
    Value::String(path.to_string_lossy().into_owned())
}
