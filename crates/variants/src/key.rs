//! Canonical identity for one observed shader variant, used to compare what
//! the player log says was compiled against what the build pipeline offers.
//!
//! Types:
//!
//! - `VariantKey` folds shader name, pass name, and keywords to lowercase and
//!   stores keywords as a set so that comparison ignores ordering and case.
//!
//! Equality is deliberately loose on pass names: two passes that are both
//! *unnamed* (empty, containing `unnamed`, or auto-numbered like `pass 2`)
//! match each other regardless of their literal text. Any other pass name has
//! to match exactly after case folding.
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, Eq)]
pub struct VariantKey {
    shader: String,
    pass: String,
    unnamed_pass: bool,
    keywords: BTreeSet<String>,
}

impl VariantKey {
    pub fn new<I, S>(shader: &str, pass: &str, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let pass = pass.to_lowercase();
        let unnamed_pass = is_unnamed_pass(&pass);
        let keywords = keywords
            .into_iter()
            .filter_map(|keyword| {
                let keyword = keyword.as_ref();
                (!keyword.is_empty()).then(|| keyword.to_lowercase())
            })
            .collect();
        Self {
            shader: shader.to_lowercase(),
            pass,
            unnamed_pass,
            keywords,
        }
    }

    pub fn shader(&self) -> &str {
        &self.shader
    }

    pub fn pass(&self) -> &str {
        &self.pass
    }

    pub fn is_unnamed_pass(&self) -> bool {
        self.unnamed_pass
    }

    pub fn keywords(&self) -> impl Iterator<Item = &str> {
        self.keywords.iter().map(String::as_str)
    }

    pub fn keyword_count(&self) -> usize {
        self.keywords.len()
    }
}

impl PartialEq for VariantKey {
    fn eq(&self, other: &Self) -> bool {
        self.shader == other.shader
            && self.keywords == other.keywords
            && ((self.unnamed_pass && other.unnamed_pass) || self.pass == other.pass)
    }
}

impl Hash for VariantKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.shader.hash(state);
        // Every unnamed pass lands in the same bucket.
        if self.unnamed_pass {
            None::<&str>.hash(state);
        } else {
            Some(self.pass.as_str()).hash(state);
        }
        self.keywords.hash(state);
    }
}

impl fmt::Display for VariantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} pass: {} keywords: ", self.shader, self.pass)?;
        if self.keywords.is_empty() {
            f.write_str("no keywords")
        } else {
            let joined: Vec<&str> = self.keywords().collect();
            f.write_str(&joined.join(" "))
        }
    }
}

/// Expects an already lowercased pass name.
fn is_unnamed_pass(pass: &str) -> bool {
    pass.is_empty() || pass.contains("unnamed") || has_numbered_pass(pass)
}

/// Looks for `pass`, then whitespace, then at least one digit.
fn has_numbered_pass(pass: &str) -> bool {
    pass.match_indices("pass").any(|(start, token)| {
        let rest = &pass[start + token.len()..];
        let after_space = rest.trim_start();
        after_space.len() < rest.len()
            && after_space
                .chars()
                .next()
                .is_some_and(|ch| ch.is_ascii_digit())
    })
}
