//! Shader variant stripping: the build hook that collects or strips variants,
//! the text report it produces, and the material analysis that flags
//! blacklisted variants a material can still reach.
mod analyze;
mod hook;
mod report;

pub use analyze::{
    candidate_keyword_strings, select_materials, AnalysisError, AnalysisRun, AnalysisScope,
    Analyzer, MaterialInfo, MaterialReport, RunOptions, Strictness,
};
pub use hook::{BuildStats, BuildStripper, Decision, Snippet};
pub use report::{Report, ReportAction};
