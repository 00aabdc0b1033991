//! Pass/fail detectors consulted by the build hook. A variant passes when any
//! configured detector vouches for it.
use tracing::trace;

use crate::key::VariantKey;
use crate::log::CompiledVariantIndex;
use crate::variant::PassType;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderPass {
    pub name: String,
    pub pass_type: PassType,
}

impl ShaderPass {
    pub fn new(name: impl Into<String>, pass_type: PassType) -> Self {
        Self {
            name: name.into(),
            pass_type,
        }
    }
}

pub trait VariantDetector {
    fn is_passed(&self, shader: &str, pass: &ShaderPass, keywords: &[String]) -> bool;
}

/// Passes variants that the player log reports as compiled.
#[derive(Debug, Clone, Default)]
pub struct LogDetector {
    index: CompiledVariantIndex,
}

impl LogDetector {
    pub fn new(index: CompiledVariantIndex) -> Self {
        Self { index }
    }

    pub fn index(&self) -> &CompiledVariantIndex {
        &self.index
    }
}

impl VariantDetector for LogDetector {
    fn is_passed(&self, shader: &str, pass: &ShaderPass, keywords: &[String]) -> bool {
        let candidate = VariantKey::new(shader, &pass.name, keywords);
        let passed = self.index.contains(&candidate);
        trace!(%candidate, passed, "log detector");
        passed
    }
}

/// Logical OR over a list of detectors. An empty list passes nothing.
#[derive(Default)]
pub struct AnyDetector {
    detectors: Vec<Box<dyn VariantDetector>>,
}

impl AnyDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, detector: impl VariantDetector + 'static) -> Self {
        self.push(detector);
        self
    }

    pub fn push(&mut self, detector: impl VariantDetector + 'static) {
        self.detectors.push(Box::new(detector));
    }

    pub fn len(&self) -> usize {
        self.detectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detectors.is_empty()
    }
}

impl VariantDetector for AnyDetector {
    fn is_passed(&self, shader: &str, pass: &ShaderPass, keywords: &[String]) -> bool {
        self.detectors
            .iter()
            .any(|detector| detector.is_passed(shader, pass, keywords))
    }
}

impl<F> VariantDetector for F
where
    F: Fn(&str, &ShaderPass, &[String]) -> bool,
{
    fn is_passed(&self, shader: &str, pass: &ShaderPass, keywords: &[String]) -> bool {
        self(shader, pass, keywords)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOG: &str = "\
Compiled shader: Custom/Lit, pass: Forward, stage: vertex, keywords FOG_LINEAR _EMISSION
Compiled shader: Custom/Lit, pass: , stage: vertex, keywords no keywords
Compiled shader: Custom/Lit, pass: ShadowCaster, stage: vertex, keywords SHADOWS_DEPTH";

    fn keywords(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    fn detector() -> LogDetector {
        LogDetector::new(CompiledVariantIndex::from_log(LOG).unwrap())
    }

    #[test]
    fn every_logged_variant_passes() {
        let detector = detector();
        for (shader, variants) in detector.index().clone().into_inner() {
            for key in variants {
                let pass = ShaderPass::new(key.pass(), PassType::Normal);
                let words: Vec<String> = key.keywords().map(str::to_string).collect();
                assert!(detector.is_passed(&shader, &pass, &words), "{key}");
            }
        }
    }

    #[test]
    fn added_or_removed_keyword_fails() {
        let detector = detector();
        let pass = ShaderPass::new("Forward", PassType::ForwardBase);
        assert!(detector.is_passed("Custom/Lit", &pass, &keywords(&["_EMISSION", "FOG_LINEAR"])));
        assert!(!detector.is_passed("Custom/Lit", &pass, &keywords(&["FOG_LINEAR"])));
        assert!(!detector.is_passed(
            "Custom/Lit",
            &pass,
            &keywords(&["FOG_LINEAR", "_EMISSION", "_DETAIL"])
        ));
    }

    #[test]
    fn unnamed_pass_matches_any_unnamed_pass() {
        let detector = detector();
        let pass = ShaderPass::new("Unnamed 3", PassType::Normal);
        assert!(detector.is_passed("custom/lit", &pass, &[]));
    }

    #[test]
    fn unknown_shader_is_not_passed() {
        let detector = detector();
        let pass = ShaderPass::new("Forward", PassType::ForwardBase);
        assert!(!detector.is_passed("Other", &pass, &keywords(&["FOG_LINEAR", "_EMISSION"])));
    }

    #[test]
    fn any_detector_combines_with_or() {
        let pass = ShaderPass::new("Forward", PassType::ForwardBase);
        let empty = AnyDetector::new();
        assert!(!empty.is_passed("Custom/Lit", &pass, &[]));

        let combined = AnyDetector::new()
            .with(detector())
            .with(|shader: &str, _: &ShaderPass, _: &[String]| shader == "Always");
        assert_eq!(combined.len(), 2);
        assert!(combined.is_passed("Always", &pass, &[]));
        assert!(combined.is_passed("Custom/Lit", &pass, &keywords(&["FOG_LINEAR", "_EMISSION"])));
        assert!(!combined.is_passed("Custom/Lit", &pass, &keywords(&["FOG_LINEAR"])));
    }
}
