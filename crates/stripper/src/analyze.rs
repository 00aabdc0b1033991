//! Post-hoc check of materials against the blacklist.
//!
//! For each material the analyzer works out which local keywords it enables,
//! expands them (and the global keywords) into the keyword strings the
//! material could request at runtime, and looks every one of them up in the
//! blacklist for every pass type seen during collection. Hits are warnings:
//! the build would strip a variant the material needs.
use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use stripconfig::{AnalysisSettings, StripSettings};
use thiserror::Error;
use tracing::{debug, info, warn};
use variants::{
    classify_keywords, exhaustive_subsets, is_internal_shader, GlobalKeywords, SeenVariants,
    ShaderKeyword, ShaderVariant, VariantCollection, VariantLists,
};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("material '{0}' not found")]
    UnknownMaterial(String),
    #[error("no material uses shader '{0}'")]
    UnknownShader(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct MaterialInfo {
    pub name: String,
    pub shader: String,
    /// The shader's full keyword space.
    #[serde(default)]
    pub keywords: Vec<ShaderKeyword>,
    /// Keywords switched on for this material.
    #[serde(default)]
    pub enabled: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisScope {
    Project,
    Material(String),
    Shader(String),
}

pub fn select_materials<'m>(
    materials: &'m [MaterialInfo],
    scope: &AnalysisScope,
) -> Result<Vec<&'m MaterialInfo>, AnalysisError> {
    match scope {
        AnalysisScope::Project => Ok(materials
            .iter()
            .filter(|material| !is_internal_shader(&material.shader))
            .collect()),
        AnalysisScope::Material(name) => materials
            .iter()
            .find(|material| &material.name == name)
            .map(|material| vec![material])
            .ok_or_else(|| AnalysisError::UnknownMaterial(name.clone())),
        AnalysisScope::Shader(shader) => {
            let selected: Vec<&MaterialInfo> = materials
                .iter()
                .filter(|material| &material.shader == shader)
                .collect();
            if selected.is_empty() {
                Err(AnalysisError::UnknownShader(shader.clone()))
            } else {
                Ok(selected)
            }
        }
    }
}

/// Whether local and global keywords are matched as the single enabled set
/// (strict) or expanded into every sub-combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strictness {
    pub local: bool,
    pub global: bool,
}

impl Default for Strictness {
    fn default() -> Self {
        Self {
            local: true,
            global: true,
        }
    }
}

impl From<AnalysisSettings> for Strictness {
    fn from(settings: AnalysisSettings) -> Self {
        Self {
            local: settings.strict_local,
            global: settings.strict_global,
        }
    }
}

/// Space-joined keyword strings a material may request, deduplicated in order
/// of first generation.
pub fn candidate_keyword_strings(
    globals: &GlobalKeywords,
    local_enabled: &[String],
    strictness: Strictness,
) -> Vec<String> {
    let global_full = globals.as_slice();
    let local_combinations = exhaustive_subsets(local_enabled);

    let pairs: Vec<(&[String], &[String])> = match (strictness.global, strictness.local) {
        (true, true) => vec![(global_full, local_enabled)],
        (true, false) => local_combinations
            .iter()
            .map(|local| (global_full, local.as_slice()))
            .collect(),
        (false, true) => {
            return join_unique(
                globals
                    .combinations()
                    .iter()
                    .map(|global| (global.as_slice(), local_enabled)),
            )
        }
        (false, false) => {
            let global_combinations = globals.combinations();
            return join_unique(global_combinations.iter().flat_map(|global| {
                local_combinations
                    .iter()
                    .map(move |local| (global.as_slice(), local.as_slice()))
            }));
        }
    };
    join_unique(pairs.into_iter())
}

fn join_unique<'k>(pairs: impl Iterator<Item = (&'k [String], &'k [String])>) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut result = Vec::new();
    for (global, local) in pairs {
        let joined = global
            .iter()
            .chain(local.iter())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ");
        if seen.insert(joined.clone()) {
            result.push(joined);
        }
    }
    result
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MaterialReport {
    pub material: String,
    pub shader: String,
    pub enabled: Vec<String>,
    pub disabled: Vec<String>,
    pub discovered_globals: Vec<String>,
    /// Blacklisted variants the material can reach at runtime.
    pub reachable_blacklisted: Vec<ShaderVariant>,
    /// Compiled before and not blacklisted.
    pub previously_compiled: Vec<ShaderVariant>,
}

impl MaterialReport {
    pub fn has_warnings(&self) -> bool {
        !self.reachable_blacklisted.is_empty()
    }

    /// Removes one flagged variant from the blacklist and from this report.
    pub fn resolve<C: VariantCollection + ?Sized>(
        &mut self,
        blacklist: &mut C,
        variant: &ShaderVariant,
    ) -> bool {
        let Some(position) = self
            .reachable_blacklisted
            .iter()
            .position(|flagged| flagged == variant)
        else {
            return false;
        };
        blacklist.remove(variant);
        let resolved = self.reachable_blacklisted.remove(position);
        info!(material = %self.material, variant = %resolved, "removed variant from blacklist");
        true
    }

    /// Removes every flagged variant from the blacklist; returns how many.
    pub fn resolve_all<C: VariantCollection + ?Sized>(&mut self, blacklist: &mut C) -> usize {
        let flagged = std::mem::take(&mut self.reachable_blacklisted);
        for variant in &flagged {
            blacklist.remove(variant);
        }
        if !flagged.is_empty() {
            info!(
                material = %self.material,
                removed = flagged.len(),
                "removed reachable variants from blacklist"
            );
        }
        flagged.len()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunOptions {
    pub fix_all: bool,
}

#[derive(Debug, Clone, Default)]
pub struct AnalysisRun {
    pub reports: Vec<MaterialReport>,
    pub resolved: usize,
    pub cancelled: bool,
}

impl AnalysisRun {
    pub fn warnings(&self) -> usize {
        self.reports
            .iter()
            .map(|report| report.reachable_blacklisted.len())
            .sum()
    }
}

pub struct Analyzer<'a> {
    strictness: Strictness,
    globals: GlobalKeywords,
    context_enabled: &'a BTreeSet<String>,
    seen: &'a SeenVariants,
}

impl<'a> Analyzer<'a> {
    pub fn new(
        strictness: Strictness,
        globals: GlobalKeywords,
        context_enabled: &'a BTreeSet<String>,
        seen: &'a SeenVariants,
    ) -> Self {
        Self {
            strictness,
            globals,
            context_enabled,
            seen,
        }
    }

    pub fn from_settings(
        settings: &StripSettings,
        context_enabled: &'a BTreeSet<String>,
        seen: &'a SeenVariants,
    ) -> Self {
        Self::new(
            settings.analysis.into(),
            GlobalKeywords::from_names(settings.global_keywords.iter().cloned()),
            context_enabled,
            seen,
        )
    }

    pub fn strictness(&self) -> Strictness {
        self.strictness
    }

    pub fn globals(&self) -> &GlobalKeywords {
        &self.globals
    }

    pub fn analyze_material<C: VariantCollection>(
        &mut self,
        material: &MaterialInfo,
        lists: &VariantLists<C>,
    ) -> MaterialReport {
        let partition = classify_keywords(
            &material.keywords,
            &material.enabled,
            self.context_enabled,
            &self.seen.keywords,
            &mut self.globals,
        );
        let candidates = candidate_keyword_strings(&self.globals, &partition.enabled, self.strictness);

        let mut report = MaterialReport {
            material: material.name.clone(),
            shader: material.shader.clone(),
            enabled: partition.enabled,
            disabled: partition.disabled,
            discovered_globals: partition.discovered_globals,
            ..MaterialReport::default()
        };

        for candidate in &candidates {
            for pass_type in &self.seen.pass_types {
                let variant =
                    ShaderVariant::new(material.shader.as_str(), *pass_type, candidate.split(' '));
                if lists.blacklist.contains(&variant) {
                    report.reachable_blacklisted.push(variant);
                } else if lists.compiled.contains(&variant) {
                    report.previously_compiled.push(variant);
                }
            }
        }

        debug!(
            material = %report.material,
            shader = %report.shader,
            candidates = candidates.len(),
            warnings = report.reachable_blacklisted.len(),
            compiled = report.previously_compiled.len(),
            "analyzed material"
        );
        report
    }

    /// Analyzes materials one by one, stopping between materials once `cancel`
    /// is set. With `fix_all`, each material's warnings are resolved before
    /// the next material is looked at.
    pub fn run<C: VariantCollection>(
        &mut self,
        materials: &[&MaterialInfo],
        lists: &mut VariantLists<C>,
        options: RunOptions,
        cancel: &AtomicBool,
    ) -> AnalysisRun {
        let mut run = AnalysisRun::default();
        for material in materials {
            if cancel.load(Ordering::Relaxed) {
                warn!(
                    analyzed = run.reports.len(),
                    remaining = materials.len() - run.reports.len(),
                    "analysis cancelled"
                );
                run.cancelled = true;
                break;
            }
            let mut report = self.analyze_material(material, lists);
            if options.fix_all {
                run.resolved += report.resolve_all(&mut lists.blacklist);
            }
            run.reports.push(report);
        }
        info!(
            materials = run.reports.len(),
            warnings = run.warnings(),
            resolved = run.resolved,
            globals = self.globals.len(),
            "material analysis finished"
        );
        run
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use variants::{PassType, VariantSet};

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    fn strict(local: bool, global: bool) -> Strictness {
        Strictness { local, global }
    }

    #[test]
    fn both_strict_yields_single_candidate() {
        let globals = GlobalKeywords::from_names(["G1"]);
        let locals = strings(&["L1", "L2"]);
        assert_eq!(
            candidate_keyword_strings(&globals, &locals, strict(true, true)),
            vec!["G1 L1 L2"]
        );
    }

    #[test]
    fn strict_global_expands_locals() {
        let globals = GlobalKeywords::from_names(["G1"]);
        let locals = strings(&["L1", "L2"]);
        assert_eq!(
            candidate_keyword_strings(&globals, &locals, strict(false, true)),
            vec!["G1 L1 L2", "G1 L2", "G1 L1"]
        );
    }

    #[test]
    fn strict_local_expands_globals_including_none() {
        let globals = GlobalKeywords::from_names(["G1", "G2"]);
        let locals = strings(&["L1"]);
        assert_eq!(
            candidate_keyword_strings(&globals, &locals, strict(true, false)),
            vec!["G1 G2 L1", "G2 L1", "G1 L1", "L1"]
        );
    }

    #[test]
    fn non_strict_takes_cartesian_product() {
        let globals = GlobalKeywords::from_names(["G1"]);
        let locals = strings(&["L1", "L2"]);
        let candidates = candidate_keyword_strings(&globals, &locals, strict(false, false));
        assert_eq!(
            candidates,
            vec!["G1 L1 L2", "G1 L2", "G1 L1", "L1 L2", "L2", "L1"]
        );
    }

    #[test]
    fn empty_inputs_yield_empty_candidate() {
        let globals = GlobalKeywords::new();
        for (local, global) in [(true, true), (true, false), (false, true), (false, false)] {
            assert_eq!(
                candidate_keyword_strings(&globals, &[], strict(local, global)),
                vec![""]
            );
        }
    }

    #[test]
    fn candidates_are_deduplicated() {
        let globals = GlobalKeywords::new();
        let locals = strings(&["L1"]);
        assert_eq!(
            candidate_keyword_strings(&globals, &locals, strict(true, false)),
            vec!["L1"]
        );
    }

    fn lit_material() -> MaterialInfo {
        MaterialInfo {
            name: "Rock".into(),
            shader: "Custom/Lit".into(),
            keywords: vec![
                ShaderKeyword::local("_NORMALMAP"),
                ShaderKeyword::local("_EMISSION"),
                ShaderKeyword::overridable("FOG_LINEAR"),
            ],
            enabled: ["_NORMALMAP".to_string()].into_iter().collect(),
        }
    }

    fn seen() -> SeenVariants {
        SeenVariants {
            pass_types: vec![PassType::ForwardBase, PassType::ShadowCaster],
            keywords: strings(&["_NORMALMAP", "_EMISSION", "FOG_LINEAR"]),
        }
    }

    fn lists() -> VariantLists<VariantSet> {
        let mut lists = VariantLists::<VariantSet>::default();
        let reachable =
            ShaderVariant::new("Custom/Lit", PassType::ForwardBase, ["FOG_LINEAR", "_NORMALMAP"]);
        let compiled_only =
            ShaderVariant::new("Custom/Lit", PassType::ShadowCaster, ["_NORMALMAP", "FOG_LINEAR"]);
        let unreachable = ShaderVariant::new("Custom/Lit", PassType::ForwardBase, ["_EMISSION"]);
        for variant in [&reachable, &compiled_only, &unreachable] {
            lists.compiled.add(variant);
        }
        lists.blacklist.add(&reachable);
        lists.blacklist.add(&unreachable);
        lists
    }

    #[test]
    fn flags_reachable_blacklisted_variants() {
        let context: BTreeSet<String> = ["FOG_LINEAR".to_string()].into_iter().collect();
        let seen = seen();
        let lists = lists();
        let mut analyzer = Analyzer::new(Strictness::default(), GlobalKeywords::new(), &context, &seen);

        let report = analyzer.analyze_material(&lit_material(), &lists);
        assert_eq!(report.enabled, vec!["_NORMALMAP"]);
        assert_eq!(report.disabled, vec!["_EMISSION"]);
        assert_eq!(report.discovered_globals, vec!["FOG_LINEAR"]);
        assert!(report.has_warnings());
        assert_eq!(
            report.reachable_blacklisted,
            vec![ShaderVariant::new(
                "Custom/Lit",
                PassType::ForwardBase,
                ["FOG_LINEAR", "_NORMALMAP"]
            )]
        );
        assert_eq!(report.previously_compiled.len(), 1);
        assert_eq!(report.previously_compiled[0].pass_type, PassType::ShadowCaster);
    }

    #[test]
    fn resolving_removes_from_blacklist() {
        let context: BTreeSet<String> = ["FOG_LINEAR".to_string()].into_iter().collect();
        let seen = seen();
        let mut lists = lists();
        let mut analyzer = Analyzer::new(Strictness::default(), GlobalKeywords::new(), &context, &seen);

        let mut report = analyzer.analyze_material(&lit_material(), &lists);
        let flagged = report.reachable_blacklisted[0].clone();
        assert!(report.resolve(&mut lists.blacklist, &flagged));
        assert!(!report.resolve(&mut lists.blacklist, &flagged));
        assert!(!lists.blacklist.contains(&flagged));
        assert_eq!(lists.blacklist.len(), 1);
        assert!(!report.has_warnings());
    }

    #[test]
    fn run_fixes_all_and_honours_cancellation() {
        let context: BTreeSet<String> = ["FOG_LINEAR".to_string()].into_iter().collect();
        let seen = seen();
        let mut lists = lists();
        let material = lit_material();
        let materials = vec![&material, &material];
        let mut analyzer = Analyzer::new(Strictness::default(), GlobalKeywords::new(), &context, &seen);

        let cancel = AtomicBool::new(true);
        let cancelled = analyzer.run(&materials, &mut lists, RunOptions { fix_all: true }, &cancel);
        assert!(cancelled.cancelled);
        assert!(cancelled.reports.is_empty());
        assert_eq!(lists.blacklist.len(), 2);

        cancel.store(false, Ordering::Relaxed);
        let run = analyzer.run(&materials, &mut lists, RunOptions { fix_all: true }, &cancel);
        assert!(!run.cancelled);
        assert_eq!(run.reports.len(), 2);
        assert_eq!(run.resolved, 1);
        assert_eq!(run.warnings(), 0);
        assert_eq!(lists.blacklist.len(), 1);
    }

    #[test]
    fn settings_seed_globals_and_strictness() {
        let mut settings = StripSettings::default();
        settings.global_keywords = strings(&["LIGHTMAP_ON", "FOG_LINEAR"]);
        settings.analysis = AnalysisSettings {
            strict_local: false,
            strict_global: true,
        };
        let context = BTreeSet::new();
        let seen = SeenVariants::default();
        let analyzer = Analyzer::from_settings(&settings, &context, &seen);
        assert_eq!(analyzer.strictness(), strict(false, true));
        assert_eq!(analyzer.globals().as_slice(), ["LIGHTMAP_ON", "FOG_LINEAR"]);
    }

    #[test]
    fn selects_materials_by_scope() {
        let mut hidden = lit_material();
        hidden.name = "Blit".into();
        hidden.shader = "Hidden/Blit".into();
        let materials = vec![lit_material(), hidden];

        assert_eq!(select_materials(&materials, &AnalysisScope::Project).unwrap().len(), 1);
        assert_eq!(
            select_materials(&materials, &AnalysisScope::Material("Blit".into()))
                .unwrap()
                .len(),
            1
        );
        assert_eq!(
            select_materials(&materials, &AnalysisScope::Shader("Other".into())),
            Err(AnalysisError::UnknownShader("Other".into()))
        );
        assert_eq!(
            select_materials(&materials, &AnalysisScope::Material("Missing".into())),
            Err(AnalysisError::UnknownMaterial("Missing".into()))
        );
    }
}
