use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use variants::PassType;

#[derive(Parser, Debug)]
#[command(
    name = "varstrip",
    author,
    version,
    about = "Shader variant collector and stripper"
)]
pub struct Cli {
    /// Settings file; defaults to `settings.toml` in the varstrip config directory.
    #[arg(long, global = true, env = "VARSTRIP_SETTINGS", value_name = "FILE")]
    pub settings: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Inspect a player log.
    Log(LogCommand),
    /// Run the build-time decision over a batch of shader snippets.
    Build(BuildArgs),
    /// Check materials for blacklisted variants they can still reach.
    Analyze(AnalyzeArgs),
    /// Remove one variant from the blacklist.
    Resolve(ResolveArgs),
    /// Print the resolved settings file and the paths it references.
    Where,
}

#[derive(Parser, Debug)]
pub struct LogCommand {
    #[command(subcommand)]
    pub action: LogAction,
}

#[derive(Subcommand, Debug)]
pub enum LogAction {
    /// Parse the log and print per-shader variant counts.
    Check {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// Rewrite the file keeping only `Compiled shader: ` lines.
        #[arg(long)]
        prune: bool,
    },
}

#[derive(Args, Debug)]
pub struct BuildArgs {
    /// JSON lines, one snippet per line with its candidate keyword lists.
    #[arg(long, value_name = "FILE")]
    pub variants: PathBuf,
    /// Where to write the surviving snippets (stdout when omitted).
    #[arg(long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

#[derive(Args, Debug)]
pub struct AnalyzeArgs {
    /// JSON scene description with the globally enabled keywords and materials.
    #[arg(long, value_name = "FILE")]
    pub materials: PathBuf,
    /// Only analyze the named material.
    #[arg(long, value_name = "NAME", conflicts_with = "shader")]
    pub material: Option<String>,
    /// Only analyze materials using this shader.
    #[arg(long, value_name = "NAME")]
    pub shader: Option<String>,
    /// Skip materials without warnings in the listing.
    #[arg(long)]
    pub warnings_only: bool,
    /// Remove every reachable variant from the blacklist.
    #[arg(long)]
    pub fix_all: bool,
    /// Override `analysis.strict_local` from the settings.
    #[arg(long, value_name = "BOOL")]
    pub strict_local: Option<bool>,
    /// Override `analysis.strict_global` from the settings.
    #[arg(long, value_name = "BOOL")]
    pub strict_global: Option<bool>,
}

#[derive(Args, Debug)]
pub struct ResolveArgs {
    #[arg(long, value_name = "NAME")]
    pub shader: String,
    #[arg(long, value_name = "PASS", value_parser = parse_pass_type)]
    pub pass_type: PassType,
    /// Space separated keywords of the variant.
    #[arg(long, value_name = "KEYWORDS", default_value = "")]
    pub keywords: String,
}

pub fn parse() -> Cli {
    Cli::parse()
}

pub fn parse_pass_type(value: &str) -> Result<PassType, String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err("pass type must not be empty".to_string());
    }
    trimmed.parse()
}
