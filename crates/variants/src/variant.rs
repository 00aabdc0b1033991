//! Variant identities as the persisted allow/deny collections store them.
//!
//! Unlike `VariantKey`, a `ShaderVariant` keeps the shader name verbatim and
//! identifies the pass by its `PassType`; two variants are equal when shader,
//! pass type, and keyword set match exactly. Keyword order and repeated
//! keywords do not matter.
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub enum PassType {
    Normal,
    Vertex,
    VertexLM,
    ForwardBase,
    ForwardAdd,
    ShadowCaster,
    Deferred,
    Meta,
    MotionVectors,
    ScriptableRenderPipeline,
    ScriptableRenderPipelineDefaultUnlit,
    GrabPass,
}

impl PassType {
    pub const ALL: [PassType; 12] = [
        Self::Normal,
        Self::Vertex,
        Self::VertexLM,
        Self::ForwardBase,
        Self::ForwardAdd,
        Self::ShadowCaster,
        Self::Deferred,
        Self::Meta,
        Self::MotionVectors,
        Self::ScriptableRenderPipeline,
        Self::ScriptableRenderPipelineDefaultUnlit,
        Self::GrabPass,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Normal => "Normal",
            Self::Vertex => "Vertex",
            Self::VertexLM => "VertexLM",
            Self::ForwardBase => "ForwardBase",
            Self::ForwardAdd => "ForwardAdd",
            Self::ShadowCaster => "ShadowCaster",
            Self::Deferred => "Deferred",
            Self::Meta => "Meta",
            Self::MotionVectors => "MotionVectors",
            Self::ScriptableRenderPipeline => "ScriptableRenderPipeline",
            Self::ScriptableRenderPipelineDefaultUnlit => "ScriptableRenderPipelineDefaultUnlit",
            Self::GrabPass => "GrabPass",
        }
    }
}

impl fmt::Display for PassType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PassType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Self::ALL
            .into_iter()
            .find(|pass| pass.as_str().eq_ignore_ascii_case(trimmed))
            .ok_or_else(|| format!("unknown pass type '{trimmed}'"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ShaderStage {
    Vertex,
    Fragment,
    Geometry,
    Hull,
    Domain,
    Surface,
    RayTracing,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Vertex => "vertex",
            Self::Fragment => "fragment",
            Self::Geometry => "geometry",
            Self::Hull => "hull",
            Self::Domain => "domain",
            Self::Surface => "surface",
            Self::RayTracing => "ray-tracing",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Eq, Deserialize, Serialize)]
pub struct ShaderVariant {
    pub shader: String,
    pub pass_type: PassType,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl ShaderVariant {
    pub fn new<I, S>(shader: impl Into<String>, pass_type: PassType, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            shader: shader.into(),
            pass_type,
            keywords: keywords
                .into_iter()
                .map(Into::into)
                .filter(|keyword: &String| !keyword.is_empty())
                .collect(),
        }
    }

    /// Distinct, non-empty keywords in sorted order.
    pub fn keyword_set(&self) -> BTreeSet<&str> {
        self.keywords
            .iter()
            .map(String::as_str)
            .filter(|keyword| !keyword.is_empty())
            .collect()
    }

    pub fn joined_keywords(&self) -> String {
        self.keywords.join(" ")
    }
}

impl PartialEq for ShaderVariant {
    fn eq(&self, other: &Self) -> bool {
        self.shader == other.shader
            && self.pass_type == other.pass_type
            && self.keyword_set() == other.keyword_set()
    }
}

impl Hash for ShaderVariant {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.shader.hash(state);
        self.pass_type.hash(state);
        self.keyword_set().hash(state);
    }
}

impl fmt::Display for ShaderVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.shader, self.pass_type, self.joined_keywords())
    }
}

/// Add/remove/contains contract of a persisted variant collection.
pub trait VariantCollection {
    /// Returns `true` when the variant was not present before.
    fn add(&mut self, variant: &ShaderVariant) -> bool;
    /// Returns `true` when the variant was present.
    fn remove(&mut self, variant: &ShaderVariant) -> bool;
    fn contains(&self, variant: &ShaderVariant) -> bool;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<C: VariantCollection + ?Sized> VariantCollection for &mut C {
    fn add(&mut self, variant: &ShaderVariant) -> bool {
        (**self).add(variant)
    }

    fn remove(&mut self, variant: &ShaderVariant) -> bool {
        (**self).remove(variant)
    }

    fn contains(&self, variant: &ShaderVariant) -> bool {
        (**self).contains(variant)
    }

    fn len(&self) -> usize {
        (**self).len()
    }
}

/// In-memory collection that remembers insertion order for stable output.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(from = "Vec<ShaderVariant>", into = "Vec<ShaderVariant>")]
pub struct VariantSet {
    entries: Vec<ShaderVariant>,
    lookup: HashSet<ShaderVariant>,
}

impl VariantSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ShaderVariant> {
        self.entries.iter()
    }

    /// Distinct shader names, in order of first appearance.
    pub fn shaders(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .map(|variant| variant.shader.as_str())
            .filter(|shader| seen.insert(*shader))
            .collect()
    }
}

impl VariantCollection for VariantSet {
    fn add(&mut self, variant: &ShaderVariant) -> bool {
        if !self.lookup.insert(variant.clone()) {
            return false;
        }
        self.entries.push(variant.clone());
        true
    }

    fn remove(&mut self, variant: &ShaderVariant) -> bool {
        if !self.lookup.remove(variant) {
            return false;
        }
        self.entries.retain(|entry| entry != variant);
        true
    }

    fn contains(&self, variant: &ShaderVariant) -> bool {
        self.lookup.contains(variant)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

impl From<Vec<ShaderVariant>> for VariantSet {
    fn from(variants: Vec<ShaderVariant>) -> Self {
        let mut set = Self::new();
        for variant in &variants {
            set.add(variant);
        }
        set
    }
}

impl From<VariantSet> for Vec<ShaderVariant> {
    fn from(set: VariantSet) -> Self {
        set.entries
    }
}
