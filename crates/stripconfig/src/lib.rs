use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read settings at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse settings: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid settings: {0}")]
    Invalid(String),
}

/// What the build hook does with each variant it is offered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum StripMode {
    #[default]
    Collect,
    StripWithWhitelist,
    StripWithBlacklist,
}

impl fmt::Display for StripMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Collect => "collect",
            Self::StripWithWhitelist => "strip-with-whitelist",
            Self::StripWithBlacklist => "strip-with-blacklist",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct AnalysisSettings {
    #[serde(default = "default_true")]
    pub strict_local: bool,
    #[serde(default = "default_true")]
    pub strict_global: bool,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            strict_local: true,
            strict_global: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StripSettings {
    pub version: u32,
    #[serde(default)]
    pub mode: StripMode,
    #[serde(default = "default_true")]
    pub generate_report: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub player_log: Option<PathBuf>,
    #[serde(default = "default_report")]
    pub report: PathBuf,
    #[serde(default = "default_store")]
    pub store: PathBuf,
    #[serde(default)]
    pub global_keywords: Vec<String>,
    #[serde(default)]
    pub analysis: AnalysisSettings,
    #[serde(skip)]
    base_dir: Option<PathBuf>,
}

fn default_true() -> bool {
    true
}

fn default_report() -> PathBuf {
    PathBuf::from("report.txt")
}

fn default_store() -> PathBuf {
    PathBuf::from("variants.toml")
}

impl Default for StripSettings {
    fn default() -> Self {
        Self {
            version: 1,
            mode: StripMode::default(),
            generate_report: true,
            player_log: None,
            report: default_report(),
            store: default_store(),
            global_keywords: Vec::new(),
            analysis: AnalysisSettings::default(),
            base_dir: None,
        }
    }
}

impl StripSettings {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        let raw: StripSettings = toml::from_str(input)?;
        raw.validate()?;
        Ok(raw)
    }

    /// Reads a settings file; relative paths inside it resolve against the
    /// file's own directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut settings = Self::from_toml_str(&contents)?;
        settings.base_dir = path.parent().map(Path::to_path_buf);
        Ok(settings)
    }

    pub fn to_toml_string(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    pub fn base_dir(&self) -> Option<&Path> {
        self.base_dir.as_deref()
    }

    pub fn player_log_path(&self) -> Option<PathBuf> {
        self.player_log.as_deref().map(|path| self.resolve(path))
    }

    pub fn report_path(&self) -> PathBuf {
        self.resolve(&self.report)
    }

    pub fn store_path(&self) -> PathBuf {
        self.resolve(&self.store)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != 1 {
            return Err(ConfigError::Invalid(format!(
                "unsupported settings version {}; expected 1",
                self.version
            )));
        }

        if self.report.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("report path may not be empty".into()));
        }

        if self.store.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("store path may not be empty".into()));
        }

        if let Some(log) = &self.player_log {
            if log.as_os_str().is_empty() {
                return Err(ConfigError::Invalid(
                    "player_log may not be empty; omit it instead".into(),
                ));
            }
        }

        let mut seen = HashSet::new();
        for keyword in &self.global_keywords {
            let trimmed = keyword.trim();
            if trimmed.is_empty() {
                return Err(ConfigError::Invalid(
                    "global_keywords contains an empty keyword".into(),
                ));
            }
            if trimmed.contains(char::is_whitespace) {
                return Err(ConfigError::Invalid(format!(
                    "global keyword '{trimmed}' may not contain whitespace"
                )));
            }
            if !seen.insert(trimmed) {
                return Err(ConfigError::Invalid(format!(
                    "global keyword '{trimmed}' is listed more than once"
                )));
            }
        }

        Ok(())
    }
}
