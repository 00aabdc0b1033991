//! Building blocks for deciding which shader variants a build should keep:
//! canonical variant keys, the player-log parser, keyword subset generation,
//! keyword classification, the persisted collection contract, and the
//! detectors that consult them.
mod classify;
mod combos;
mod detect;
mod key;
mod log;
mod store;
mod variant;

pub use classify::{classify_keywords, GlobalKeywords, KeywordPartition, KeywordSet, ShaderKeyword};
pub use combos::{combinations, exhaustive_subsets, with_empty};
pub use detect::{AnyDetector, LogDetector, ShaderPass, VariantDetector};
pub use key::VariantKey;
pub use log::{
    filter_compiled_lines, parse_log, CompiledShaders, CompiledVariantIndex, LogParseError,
    LINE_PREFIX,
};
pub use store::{SeenVariants, StoreError, VariantLists, VariantStore};
pub use variant::{PassType, ShaderStage, ShaderVariant, VariantCollection, VariantSet};

/// Shaders whose name carries this marker are engine internals and are never
/// stripped or collected.
pub const INTERNAL_SHADER_MARKER: &str = "Hidden";

pub fn is_internal_shader(name: &str) -> bool {
    name.contains(INTERNAL_SHADER_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn internal_marker_is_case_sensitive() {
        assert!(is_internal_shader("Hidden/BlitCopy"));
        assert!(is_internal_shader("HiddenFoo"));
        assert!(!is_internal_shader("hidden/blit"));
        assert!(!is_internal_shader("Custom/Lit"));
    }
}
