use std::fs;
use std::io::{self, Write};
use std::path::Path;
use std::sync::atomic::AtomicBool;

use anyhow::{bail, Context, Result};
use stripconfig::{StripMode, StripSettings};
use stripper::{
    select_materials, AnalysisScope, Analyzer, BuildStripper, MaterialReport, Report, RunOptions,
    Strictness,
};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use variants::{
    filter_compiled_lines, CompiledVariantIndex, GlobalKeywords, ShaderVariant, VariantCollection,
    VariantStore,
};

use crate::cli::{AnalyzeArgs, BuildArgs, ResolveArgs};
use crate::input::{self, SnippetBatch};
use crate::paths::AppPaths;

pub fn initialise_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Settings plus the player log they point at, parsed up front so a broken
/// log is reported before anything else happens.
pub struct LoadedSettings {
    pub settings: StripSettings,
    pub player_log: Option<CompiledVariantIndex>,
}

pub fn load_settings(path: &Path) -> Result<Option<LoadedSettings>> {
    if !path.exists() {
        debug!(path = %path.display(), "settings file not found");
        return Ok(None);
    }
    let settings = StripSettings::load(path)
        .with_context(|| format!("failed to load settings at {}", path.display()))?;
    let player_log = load_player_log(&settings)?;
    Ok(Some(LoadedSettings {
        settings,
        player_log,
    }))
}

fn require_settings(paths: &AppPaths) -> Result<LoadedSettings> {
    let path = paths.settings_file();
    match load_settings(path)? {
        Some(loaded) => Ok(loaded),
        None => bail!(
            "settings file {} not found; pass --settings or set VARSTRIP_SETTINGS",
            path.display()
        ),
    }
}

fn load_player_log(settings: &StripSettings) -> Result<Option<CompiledVariantIndex>> {
    let Some(path) = settings.player_log_path() else {
        return Ok(None);
    };
    if !path.exists() {
        warn!(path = %path.display(), "configured player log does not exist");
        return Ok(None);
    }
    let text = fs::read_to_string(&path)
        .with_context(|| format!("failed to read player log at {}", path.display()))?;
    let index = CompiledVariantIndex::from_log(&text)
        .with_context(|| format!("failed to parse player log at {}", path.display()))?;
    Ok(Some(index))
}

fn load_store(settings: &StripSettings) -> Result<VariantStore> {
    let path = settings.store_path();
    VariantStore::load_or_default(&path)
        .with_context(|| format!("failed to load variant store at {}", path.display()))
}

fn persist_store(settings: &StripSettings, store: &VariantStore) -> Result<()> {
    let path = settings.store_path();
    store
        .persist(&path)
        .with_context(|| format!("failed to write variant store to {}", path.display()))
}

pub fn log_check(file: &Path, prune: bool) -> Result<()> {
    let text = fs::read_to_string(file)
        .with_context(|| format!("failed to read player log at {}", file.display()))?;
    let index = CompiledVariantIndex::from_log(&text)
        .with_context(|| format!("failed to parse player log at {}", file.display()))?;

    println!(
        "{} compiled variant(s) across {} shader(s)",
        index.variant_count(),
        index.shader_count()
    );
    for (shader, count) in index.summary() {
        println!("  {count:>6}  {shader}");
    }

    if prune {
        let pruned = filter_compiled_lines(&text);
        fs::write(file, &pruned)
            .with_context(|| format!("failed to rewrite player log at {}", file.display()))?;
        info!(
            path = %file.display(),
            before = text.lines().count(),
            after = pruned.lines().count(),
            "pruned player log"
        );
    }
    Ok(())
}

pub fn build(paths: &AppPaths, args: BuildArgs) -> Result<()> {
    let batches = input::read_batches(&args.variants)?;
    let loaded = load_settings(paths.settings_file())?;
    let (settings, index) = match loaded {
        Some(loaded) => (Some(loaded.settings), loaded.player_log),
        None => (None, None),
    };
    let mut store = match &settings {
        Some(settings) => load_store(settings)?,
        None => VariantStore::default(),
    };

    let (lists, seen) = store.parts_mut();
    let mut stripper = BuildStripper::from_settings(settings.as_ref(), index, lists, seen);
    let active = stripper.is_active();
    let mut surviving = Vec::with_capacity(batches.len());
    for mut batch in batches {
        stripper.process_snippet(&batch.snippet, &mut batch.variants);
        surviving.push(batch);
    }
    let stats = stripper.stats();
    let report = stripper.take_report();
    drop(stripper);

    write_batches(args.output.as_deref(), &surviving)?;

    if let Some(settings) = settings.as_ref().filter(|_| active) {
        if settings.mode == StripMode::Collect {
            persist_store(settings, &store)?;
            let (compiled, whitelist, blacklist) = (
                store.compiled.len(),
                store.whitelist.len(),
                store.blacklist.len(),
            );
            info!(compiled, whitelist, blacklist, "variant store updated");
        }
        if settings.generate_report {
            write_report(&settings.report_path(), &report)?;
        }
    }

    info!(
        offered = stats.offered,
        kept = stats.kept,
        stripped = stats.stripped,
        collected = stats.collected,
        internal = stats.internal,
        "build finished"
    );
    Ok(())
}

fn write_batches(output: Option<&Path>, batches: &[SnippetBatch]) -> Result<()> {
    let mut rendered = String::new();
    for batch in batches {
        let line = serde_json::to_string(batch).context("failed to serialize snippet")?;
        rendered.push_str(&line);
        rendered.push('\n');
    }
    match output {
        Some(path) => fs::write(path, rendered)
            .with_context(|| format!("failed to write snippets to {}", path.display())),
        None => io::stdout()
            .lock()
            .write_all(rendered.as_bytes())
            .context("failed to write snippets to stdout"),
    }
}

fn write_report(path: &Path, report: &Report) -> Result<()> {
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir).with_context(|| {
            format!("failed to prepare directory for report at {}", dir.display())
        })?;
    }
    fs::write(path, report.to_string())
        .with_context(|| format!("failed to write report to {}", path.display()))?;
    debug!(path = %path.display(), lines = report.len(), "report written");
    Ok(())
}

pub fn analyze(paths: &AppPaths, args: AnalyzeArgs) -> Result<()> {
    let LoadedSettings { settings, .. } = require_settings(paths)?;
    if settings.mode != StripMode::StripWithBlacklist {
        bail!(
            "material analysis needs mode = \"strip-with-blacklist\" (current mode: {})",
            settings.mode
        );
    }
    let mut store = load_store(&settings)?;
    if store.blacklist.is_empty() {
        bail!(
            "blacklist in {} is empty; run a collect build first",
            settings.store_path().display()
        );
    }

    let scene = input::read_scene(&args.materials)?;
    let scope = match (args.material, args.shader) {
        (Some(name), _) => AnalysisScope::Material(name),
        (None, Some(shader)) => AnalysisScope::Shader(shader),
        (None, None) => AnalysisScope::Project,
    };
    let selected = select_materials(&scene.materials, &scope)?;

    let mut strictness = Strictness::from(settings.analysis);
    if let Some(local) = args.strict_local {
        strictness.local = local;
    }
    if let Some(global) = args.strict_global {
        strictness.global = global;
    }
    debug!(?scope, ?strictness, materials = selected.len(), "starting material analysis");

    let cancel = AtomicBool::new(false);
    let (mut lists, seen) = store.parts_mut();
    let mut analyzer = Analyzer::new(
        strictness,
        GlobalKeywords::from_names(settings.global_keywords.iter().cloned()),
        &scene.globally_enabled,
        seen,
    );
    let run = analyzer.run(
        &selected,
        &mut lists,
        RunOptions {
            fix_all: args.fix_all,
        },
        &cancel,
    );

    for report in run
        .reports
        .iter()
        .filter(|report| !args.warnings_only || report.has_warnings())
    {
        print_material_report(report);
    }
    println!(
        "{} material(s) analyzed, {} warning(s), {} resolved",
        run.reports.len(),
        run.warnings(),
        run.resolved
    );

    if run.resolved > 0 {
        persist_store(&settings, &store)?;
    }
    Ok(())
}

fn print_material_report(report: &MaterialReport) {
    println!("{} ({})", report.material, report.shader);
    println!("  enabled:  {}", joined_or_none(&report.enabled));
    println!("  disabled: {}", joined_or_none(&report.disabled));
    if !report.discovered_globals.is_empty() {
        println!("  globals:  {}", report.discovered_globals.join(" "));
    }
    for variant in &report.reachable_blacklisted {
        println!("  warning   {variant}");
    }
    for variant in &report.previously_compiled {
        println!("  compiled  {variant}");
    }
}

fn joined_or_none(keywords: &[String]) -> String {
    if keywords.is_empty() {
        "(none)".to_string()
    } else {
        keywords.join(" ")
    }
}

pub fn resolve(paths: &AppPaths, args: ResolveArgs) -> Result<()> {
    let LoadedSettings { settings, .. } = require_settings(paths)?;
    let mut store = load_store(&settings)?;
    let variant = ShaderVariant::new(args.shader, args.pass_type, args.keywords.split_whitespace());
    if !store.blacklist.remove(&variant) {
        bail!("{variant} is not in the blacklist");
    }
    persist_store(&settings, &store)?;
    info!(%variant, "removed variant from blacklist");
    println!("Removed {variant} from the blacklist.");
    Ok(())
}

pub fn describe(paths: &AppPaths) -> Result<()> {
    let settings_file = paths.settings_file();
    println!("Configuration:");
    println!("  config:     {}", paths.config_dir().display());
    println!("  settings:   {}", settings_file.display());

    let Some(LoadedSettings {
        settings,
        player_log,
    }) = load_settings(settings_file)?
    else {
        println!("Settings file not found; builds keep every variant.");
        return Ok(());
    };

    println!("  mode:       {}", settings.mode);
    match settings.player_log_path() {
        Some(path) => println!("  player log: {}", path.display()),
        None => println!("  player log: (not configured)"),
    }
    if let Some(index) = &player_log {
        println!(
            "              {} variant(s) across {} shader(s)",
            index.variant_count(),
            index.shader_count()
        );
    }
    println!("  store:      {}", settings.store_path().display());
    if settings.generate_report {
        println!("  report:     {}", settings.report_path().display());
    } else {
        println!("  report:     (disabled)");
    }
    Ok(())
}
