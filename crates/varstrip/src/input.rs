//! JSON inputs the host pipeline hands over: snippet batches for the build
//! hook and the scene description for material analysis.
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use stripper::{MaterialInfo, Snippet};

/// One snippet and the keyword lists the pipeline wants to compile for it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct SnippetBatch {
    #[serde(flatten)]
    pub snippet: Snippet,
    #[serde(default)]
    pub variants: Vec<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Scene {
    /// Keywords the rendering context currently enables globally.
    #[serde(default)]
    pub globally_enabled: BTreeSet<String>,
    #[serde(default)]
    pub materials: Vec<MaterialInfo>,
}

pub fn parse_batches(text: &str) -> Result<Vec<SnippetBatch>> {
    text.lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(index, line)| {
            serde_json::from_str(line)
                .with_context(|| format!("invalid snippet on line {}", index + 1))
        })
        .collect()
}

pub fn read_batches(path: &Path) -> Result<Vec<SnippetBatch>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read snippets at {}", path.display()))?;
    parse_batches(&text).with_context(|| format!("failed to parse snippets at {}", path.display()))
}

pub fn read_scene(path: &Path) -> Result<Scene> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read scene at {}", path.display()))?;
    serde_json::from_str(&text)
        .with_context(|| format!("failed to parse scene at {}", path.display()))
}
