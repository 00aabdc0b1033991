//! Splits a material's keyword state into local and global keywords.
//!
//! Only keywords that some build actually compiled take part; anything else is
//! ignored. Overridable keywords that the rendering context has switched on
//! are recorded in the shared `GlobalKeywords` accumulator instead of being
//! attributed to the material.
use std::collections::{BTreeSet, HashSet};
use std::hash::BuildHasher;

use serde::{Deserialize, Serialize};

use crate::combos;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ShaderKeyword {
    pub name: String,
    #[serde(default)]
    pub overridable: bool,
}

impl ShaderKeyword {
    pub fn local(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            overridable: false,
        }
    }

    pub fn overridable(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            overridable: true,
        }
    }
}

/// Membership test over keyword names, implemented for the collections hosts
/// typically hand over.
pub trait KeywordSet {
    fn has_keyword(&self, keyword: &str) -> bool;
}

impl<S: BuildHasher> KeywordSet for HashSet<String, S> {
    fn has_keyword(&self, keyword: &str) -> bool {
        self.contains(keyword)
    }
}

impl KeywordSet for BTreeSet<String> {
    fn has_keyword(&self, keyword: &str) -> bool {
        self.contains(keyword)
    }
}

impl KeywordSet for [String] {
    fn has_keyword(&self, keyword: &str) -> bool {
        self.iter().any(|candidate| candidate == keyword)
    }
}

impl KeywordSet for Vec<String> {
    fn has_keyword(&self, keyword: &str) -> bool {
        self.as_slice().has_keyword(keyword)
    }
}

/// Ordered, duplicate-free list of keywords driven by the rendering context.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GlobalKeywords {
    names: Vec<String>,
}

impl GlobalKeywords {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut globals = Self::new();
        for name in names {
            globals.insert(name);
        }
        globals
    }

    /// Returns `true` when the keyword was not yet recorded.
    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if name.is_empty() || self.contains(&name) {
            return false;
        }
        self.names.push(name);
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|known| known == name)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Every subset of the current list, full list first and the empty
    /// combination last.
    pub fn combinations(&self) -> Vec<Vec<String>> {
        combos::with_empty(&self.names)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordPartition {
    pub enabled: Vec<String>,
    pub disabled: Vec<String>,
    /// Globals first recorded by this call.
    pub discovered_globals: Vec<String>,
}

pub fn classify_keywords<M, C, K>(
    keyword_space: &[ShaderKeyword],
    material_enabled: &M,
    context_enabled: &C,
    compiled: &K,
    globals: &mut GlobalKeywords,
) -> KeywordPartition
where
    M: KeywordSet + ?Sized,
    C: KeywordSet + ?Sized,
    K: KeywordSet + ?Sized,
{
    let mut partition = KeywordPartition::default();
    for keyword in keyword_space {
        let name = keyword.name.as_str();
        if !compiled.has_keyword(name) {
            continue;
        }

        if keyword.overridable {
            if context_enabled.has_keyword(name) {
                if globals.insert(name) {
                    partition.discovered_globals.push(name.to_string());
                }
                continue;
            }
            // Already tracked as global; it is accounted for there.
            if globals.contains(name) {
                continue;
            }
        }

        if material_enabled.has_keyword(name) {
            partition.enabled.push(name.to_string());
        } else {
            partition.disabled.push(name.to_string());
        }
    }
    partition
}
