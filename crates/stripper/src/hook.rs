//! Build-time decision for every variant the pipeline is about to compile.
//!
//! In collect mode each variant is filed into the compiled collection and then
//! into the whitelist or blacklist depending on whether a detector vouches for
//! it. The strip modes consult those collections and drop what they reject.
//! Internal shaders are always left alone.
use serde::{Deserialize, Serialize};
use stripconfig::{StripMode, StripSettings};
use tracing::{debug, info, warn};
use variants::{
    is_internal_shader, AnyDetector, CompiledVariantIndex, LogDetector, PassType, SeenVariants,
    ShaderPass, ShaderStage, ShaderVariant, VariantCollection, VariantDetector, VariantLists,
};

use crate::report::{Report, ReportAction};

/// One shader program stage in one pass, as offered by the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Snippet {
    pub shader: String,
    #[serde(default)]
    pub pass_name: String,
    pub pass_type: PassType,
    pub stage: ShaderStage,
}

impl Snippet {
    pub fn new(
        shader: impl Into<String>,
        pass_name: impl Into<String>,
        pass_type: PassType,
        stage: ShaderStage,
    ) -> Self {
        Self {
            shader: shader.into(),
            pass_name: pass_name.into(),
            pass_type,
            stage,
        }
    }

    fn pass(&self) -> ShaderPass {
        ShaderPass::new(self.pass_name.clone(), self.pass_type)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Internal,
    Keep,
    Strip,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BuildStats {
    pub offered: usize,
    pub kept: usize,
    pub stripped: usize,
    pub collected: usize,
    pub passed: usize,
    pub internal: usize,
}

pub struct BuildStripper<'a, C> {
    mode: Option<StripMode>,
    detector: AnyDetector,
    lists: VariantLists<C>,
    seen: &'a mut SeenVariants,
    report: Report,
    stats: BuildStats,
}

impl<'a, C: VariantCollection> BuildStripper<'a, C> {
    pub fn new(
        mode: StripMode,
        detector: AnyDetector,
        lists: VariantLists<C>,
        seen: &'a mut SeenVariants,
    ) -> Self {
        Self {
            mode: Some(mode),
            detector,
            lists,
            seen,
            report: Report::new(),
            stats: BuildStats::default(),
        }
    }

    /// Keeps every variant and records nothing.
    pub fn pass_through(lists: VariantLists<C>, seen: &'a mut SeenVariants) -> Self {
        Self {
            mode: None,
            detector: AnyDetector::new(),
            lists,
            seen,
            report: Report::new(),
            stats: BuildStats::default(),
        }
    }

    /// Wires the log detector from settings; degrades to pass-through when
    /// either the settings or the parsed player log is missing.
    pub fn from_settings(
        settings: Option<&StripSettings>,
        index: Option<CompiledVariantIndex>,
        lists: VariantLists<C>,
        seen: &'a mut SeenVariants,
    ) -> Self {
        match (settings, index) {
            (Some(settings), Some(index)) => {
                info!(
                    mode = %settings.mode,
                    shaders = index.shader_count(),
                    variants = index.variant_count(),
                    "shader stripping enabled"
                );
                let detector = AnyDetector::new().with(LogDetector::new(index));
                Self::new(settings.mode, detector, lists, seen)
            }
            (settings, index) => {
                warn!(
                    settings = settings.is_some(),
                    player_log = index.is_some(),
                    "stripping configuration incomplete; keeping every variant"
                );
                Self::pass_through(lists, seen)
            }
        }
    }

    pub fn is_active(&self) -> bool {
        self.mode.is_some()
    }

    /// Decides a single variant. Internal shaders log one line per call.
    pub fn decide(&mut self, snippet: &Snippet, keywords: &[String]) -> Decision {
        if self.mode.is_none() {
            self.stats.offered += 1;
            self.stats.kept += 1;
            return Decision::Keep;
        }
        if is_internal_shader(&snippet.shader) {
            self.stats.offered += 1;
            self.stats.internal += 1;
            self.report.push_internal(&snippet.shader);
            return Decision::Internal;
        }
        self.decide_variant(snippet, keywords)
    }

    /// Filters the snippet's variant list in place and returns how many were
    /// stripped. Internal shaders are reported once per snippet.
    pub fn process_snippet(&mut self, snippet: &Snippet, variants: &mut Vec<Vec<String>>) -> usize {
        if self.mode.is_none() {
            self.stats.offered += variants.len();
            self.stats.kept += variants.len();
            return 0;
        }
        if is_internal_shader(&snippet.shader) {
            self.stats.offered += variants.len();
            self.stats.internal += variants.len();
            self.report.push_internal(&snippet.shader);
            return 0;
        }

        let before = variants.len();
        variants.retain(|keywords| self.decide_variant(snippet, keywords) != Decision::Strip);
        let stripped = before - variants.len();
        debug!(
            shader = %snippet.shader,
            pass = %snippet.pass_type,
            stage = %snippet.stage,
            offered = before,
            stripped,
            "processed shader snippet"
        );
        stripped
    }

    fn decide_variant(&mut self, snippet: &Snippet, keywords: &[String]) -> Decision {
        let Some(mode) = self.mode else {
            return Decision::Keep;
        };
        self.stats.offered += 1;
        let variant = ShaderVariant::new(snippet.shader.as_str(), snippet.pass_type, keywords);

        let action = match mode {
            StripMode::Collect => {
                let passed = self
                    .detector
                    .is_passed(&snippet.shader, &snippet.pass(), keywords);
                self.collect(&variant, passed);
                Some(ReportAction::Collected)
            }
            StripMode::StripWithWhitelist if !self.lists.whitelist.contains(&variant) => {
                Some(ReportAction::StrippedWithWhitelist)
            }
            StripMode::StripWithBlacklist if self.lists.blacklist.contains(&variant) => {
                Some(ReportAction::StrippedWithBlacklist)
            }
            _ => None,
        };

        if let Some(action) = action {
            self.report.push_variant(
                action,
                &snippet.shader,
                snippet.pass_type,
                snippet.stage,
                &variant.keywords,
            );
        }

        match action {
            Some(ReportAction::StrippedWithWhitelist | ReportAction::StrippedWithBlacklist) => {
                self.stats.stripped += 1;
                Decision::Strip
            }
            _ => {
                self.stats.kept += 1;
                Decision::Keep
            }
        }
    }

    fn collect(&mut self, variant: &ShaderVariant, passed: bool) {
        self.seen.record_pass_type(variant.pass_type);
        for keyword in &variant.keywords {
            self.seen.record_keyword(keyword);
        }
        self.lists.compiled.add(variant);
        if passed {
            self.stats.passed += 1;
            self.lists.whitelist.add(variant);
        } else {
            self.lists.blacklist.add(variant);
        }
        self.stats.collected += 1;
    }

    pub fn report(&self) -> &Report {
        &self.report
    }

    pub fn take_report(&mut self) -> Report {
        self.report.take()
    }

    pub fn stats(&self) -> BuildStats {
        self.stats
    }

    pub fn lists(&self) -> &VariantLists<C> {
        &self.lists
    }

    pub fn into_lists(self) -> VariantLists<C> {
        self.lists
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use variants::{VariantSet, VariantStore};

    const LOG: &str = "\
Compiled shader: Custom/Lit, pass: Forward, stage: vertex, keywords FOG_LINEAR
Compiled shader: Custom/Lit, pass: ShadowCaster, stage: vertex, keywords no keywords";

    fn words(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    fn forward() -> Snippet {
        Snippet::new("Custom/Lit", "Forward", PassType::ForwardBase, ShaderStage::Vertex)
    }

    fn collector<'a>(
        store: &'a mut VariantStore,
        mode: StripMode,
    ) -> BuildStripper<'a, &'a mut VariantSet> {
        let mut settings = StripSettings::default();
        settings.mode = mode;
        let index = CompiledVariantIndex::from_log(LOG).unwrap();
        let (lists, seen) = store.parts_mut();
        BuildStripper::from_settings(Some(&settings), Some(index), lists, seen)
    }

    #[test]
    fn collect_files_variants_by_detector_verdict() {
        let mut store = VariantStore::default();
        let mut stripper = collector(&mut store, StripMode::Collect);

        let mut variants = vec![words(&["FOG_LINEAR"]), words(&["FOG_LINEAR", "_EMISSION"])];
        let stripped = stripper.process_snippet(&forward(), &mut variants);
        assert_eq!(stripped, 0);
        assert_eq!(variants.len(), 2);
        assert_eq!(stripper.stats().passed, 1);
        assert_eq!(stripper.report().len(), 2);
        assert!(stripper.report().lines()[0].starts_with("collected shader: Custom/Lit"));
        drop(stripper);

        assert_eq!(store.compiled.len(), 2);
        assert!(store.whitelist.contains(&ShaderVariant::new(
            "Custom/Lit",
            PassType::ForwardBase,
            ["FOG_LINEAR"]
        )));
        assert!(store.blacklist.contains(&ShaderVariant::new(
            "Custom/Lit",
            PassType::ForwardBase,
            ["_EMISSION", "FOG_LINEAR"]
        )));
        assert_eq!(store.seen.pass_types, vec![PassType::ForwardBase]);
        assert_eq!(store.seen.keywords, vec!["FOG_LINEAR", "_EMISSION"]);
    }

    #[test]
    fn hidden_shaders_are_never_collected() {
        let mut store = VariantStore::default();
        let mut stripper = collector(&mut store, StripMode::Collect);
        let snippet = Snippet::new("HiddenFoo", "", PassType::Normal, ShaderStage::Fragment);

        let mut variants = vec![words(&["A"]), words(&[]), words(&["A", "B"])];
        stripper.process_snippet(&snippet, &mut variants);
        assert_eq!(stripper.decide(&snippet, &words(&["C"])), Decision::Internal);
        assert_eq!(variants.len(), 3);
        assert_eq!(
            stripper.report().lines(),
            [
                "internal shader: HiddenFoo".to_string(),
                "internal shader: HiddenFoo".to_string()
            ]
        );
        drop(stripper);

        assert!(store.compiled.is_empty());
        assert!(store.whitelist.is_empty());
        assert!(store.blacklist.is_empty());
        assert!(store.seen.keywords.is_empty());
    }

    #[test]
    fn whitelist_mode_strips_unlisted_variants() {
        let mut store = VariantStore::default();
        store.whitelist.add(&ShaderVariant::new(
            "Custom/Lit",
            PassType::ForwardBase,
            ["FOG_LINEAR"],
        ));
        let mut stripper = collector(&mut store, StripMode::StripWithWhitelist);

        let mut variants = vec![words(&["FOG_LINEAR"]), words(&["_EMISSION"]), words(&[])];
        let stripped = stripper.process_snippet(&forward(), &mut variants);
        assert_eq!(stripped, 2);
        assert_eq!(variants, vec![words(&["FOG_LINEAR"])]);
        assert!(stripper
            .report()
            .lines()
            .iter()
            .all(|line| line.starts_with("stripped with whitelist: ")));
    }

    #[test]
    fn blacklist_mode_strips_only_listed_variants() {
        let mut store = VariantStore::default();
        store.blacklist.add(&ShaderVariant::new(
            "Custom/Lit",
            PassType::ForwardBase,
            ["_EMISSION", "FOG_LINEAR"],
        ));
        let mut stripper = collector(&mut store, StripMode::StripWithBlacklist);

        assert_eq!(
            stripper.decide(&forward(), &words(&["FOG_LINEAR", "_EMISSION"])),
            Decision::Strip
        );
        assert_eq!(stripper.decide(&forward(), &words(&["FOG_LINEAR"])), Decision::Keep);
        let shadow = Snippet::new("Custom/Lit", "ShadowCaster", PassType::ShadowCaster, ShaderStage::Vertex);
        assert_eq!(
            stripper.decide(&shadow, &words(&["FOG_LINEAR", "_EMISSION"])),
            Decision::Keep
        );
        assert_eq!(stripper.report().len(), 1);
        assert_eq!(
            stripper.stats(),
            BuildStats {
                offered: 3,
                kept: 2,
                stripped: 1,
                ..BuildStats::default()
            }
        );
    }

    #[test]
    fn missing_log_keeps_everything() {
        let mut store = VariantStore::default();
        store.blacklist.add(&ShaderVariant::new(
            "Custom/Lit",
            PassType::ForwardBase,
            ["FOG_LINEAR"],
        ));
        let mut settings = StripSettings::default();
        settings.mode = StripMode::StripWithBlacklist;
        let (lists, seen) = store.parts_mut();
        let mut stripper = BuildStripper::from_settings(Some(&settings), None, lists, seen);
        assert!(!stripper.is_active());

        let mut variants = vec![words(&["FOG_LINEAR"])];
        assert_eq!(stripper.process_snippet(&forward(), &mut variants), 0);
        assert_eq!(variants.len(), 1);
        assert!(stripper.report().is_empty());
    }

    #[test]
    fn missing_settings_collects_nothing() {
        let mut store = VariantStore::default();
        let index = CompiledVariantIndex::from_log(LOG).unwrap();
        let (lists, seen) = store.parts_mut();
        let mut stripper = BuildStripper::from_settings(None, Some(index), lists, seen);
        assert_eq!(stripper.decide(&forward(), &words(&["FOG_LINEAR"])), Decision::Keep);
        drop(stripper);
        assert!(store.compiled.is_empty());
    }
}
