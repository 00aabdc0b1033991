//! Reads the compiler output of a player build and turns every
//! `Compiled shader: ` line into a `VariantKey`, giving the detectors a ground
//! truth of which variants the running game actually requested.
//!
//! Types:
//!
//! - `LogParseError` reports the 1-based line number and text of a line that
//!   carries the prefix but does not split into its four fields.
//! - `CompiledVariantIndex` maps lowercased shader names to the set of keys
//!   observed for that shader.
//!
//! Functions:
//!
//! - `parse_log` performs the strict parse; one malformed line aborts it.
//! - `filter_compiled_lines` keeps only the lines relevant to the parser so a
//!   large player log can be trimmed before it is stored alongside settings.
use std::collections::{HashMap, HashSet};

use thiserror::Error;
use tracing::debug;

use crate::key::VariantKey;

pub const LINE_PREFIX: &str = "Compiled shader: ";
const PASS_SEPARATOR: &str = ", pass: ";
const STAGE_SEPARATOR: &str = ", stage: ";
const KEYWORDS_SEPARATOR: &str = ", keywords ";
const NO_KEYWORDS: &str = "no keywords";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed compiled shader entry at line {line} (missing '{missing}'): {content}")]
pub struct LogParseError {
    pub line: usize,
    pub content: String,
    pub missing: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CompiledLine<'a> {
    shader: &'a str,
    pass: &'a str,
    keywords: Vec<&'a str>,
}

pub type CompiledShaders = HashMap<String, HashSet<VariantKey>>;

pub fn parse_log(text: &str) -> Result<CompiledShaders, LogParseError> {
    let mut result = CompiledShaders::new();
    for (index, line) in text.lines().enumerate() {
        let Some(body) = line.strip_prefix(LINE_PREFIX) else {
            continue;
        };
        let parsed = split_fields(body).map_err(|missing| LogParseError {
            line: index + 1,
            content: line.to_string(),
            missing,
        })?;
        let key = VariantKey::new(parsed.shader, parsed.pass, parsed.keywords);
        result
            .entry(key.shader().to_string())
            .or_default()
            .insert(key);
    }
    Ok(result)
}

fn split_fields(body: &str) -> Result<CompiledLine<'_>, &'static str> {
    let (shader, rest) = body.split_once(PASS_SEPARATOR).ok_or(PASS_SEPARATOR)?;
    let (pass, rest) = rest.split_once(STAGE_SEPARATOR).ok_or(STAGE_SEPARATOR)?;
    let (_stage, keywords) = rest
        .split_once(KEYWORDS_SEPARATOR)
        .ok_or(KEYWORDS_SEPARATOR)?;
    let keywords = if keywords.contains(NO_KEYWORDS) {
        Vec::new()
    } else {
        keywords.split(' ').collect()
    };
    Ok(CompiledLine {
        shader,
        pass,
        keywords,
    })
}

pub fn filter_compiled_lines(text: &str) -> String {
    let kept: Vec<&str> = text
        .lines()
        .filter(|line| line.contains(LINE_PREFIX))
        .collect();
    kept.join("\n")
}

#[derive(Debug, Clone, Default)]
pub struct CompiledVariantIndex {
    shaders: CompiledShaders,
}

impl CompiledVariantIndex {
    pub fn from_log(text: &str) -> Result<Self, LogParseError> {
        let shaders = parse_log(text)?;
        debug!(
            shaders = shaders.len(),
            variants = shaders.values().map(HashSet::len).sum::<usize>(),
            "indexed compiled shader variants"
        );
        Ok(Self { shaders })
    }

    /// Absent shaders yield an empty set.
    pub fn variants_for(&self, shader: &str) -> impl Iterator<Item = &VariantKey> {
        self.shaders
            .get(&shader.to_lowercase())
            .into_iter()
            .flat_map(HashSet::iter)
    }

    pub fn contains(&self, key: &VariantKey) -> bool {
        self.shaders
            .get(key.shader())
            .is_some_and(|variants| variants.contains(key))
    }

    pub fn shader_count(&self) -> usize {
        self.shaders.len()
    }

    pub fn variant_count(&self) -> usize {
        self.shaders.values().map(HashSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shaders.is_empty()
    }

    /// Shader names with their variant counts, sorted by name.
    pub fn summary(&self) -> Vec<(&str, usize)> {
        let mut rows: Vec<(&str, usize)> = self
            .shaders
            .iter()
            .map(|(name, variants)| (name.as_str(), variants.len()))
            .collect();
        rows.sort_unstable();
        rows
    }

    pub fn into_inner(self) -> CompiledShaders {
        self.shaders
    }
}
