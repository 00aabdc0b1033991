use std::fmt;

use variants::{PassType, ShaderStage};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportAction {
    Internal,
    Collected,
    StrippedWithWhitelist,
    StrippedWithBlacklist,
}

impl ReportAction {
    pub fn tag(self) -> &'static str {
        match self {
            Self::Internal => "internal shader:",
            Self::Collected => "collected shader:",
            Self::StrippedWithWhitelist => "stripped with whitelist:",
            Self::StrippedWithBlacklist => "stripped with blacklist:",
        }
    }
}

/// In-memory report of build hook actions; writing it out is the caller's job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Report {
    lines: Vec<String>,
}

impl Report {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_internal(&mut self, shader: &str) {
        self.lines
            .push(format!("{} {shader}", ReportAction::Internal.tag()));
    }

    pub fn push_variant(
        &mut self,
        action: ReportAction,
        shader: &str,
        pass_type: PassType,
        stage: ShaderStage,
        keywords: &[String],
    ) {
        self.lines.push(format!(
            "{} {shader}, pass: {pass_type}, stage: {stage}, keywords: {}",
            action.tag(),
            keywords.join(" ")
        ));
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn take(&mut self) -> Report {
        std::mem::take(self)
    }
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in &self.lines {
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}
