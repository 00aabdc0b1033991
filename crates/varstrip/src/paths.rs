use std::env;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Result};
use directories_next::ProjectDirs;

pub const ENV_CONFIG_DIR: &str = "VARSTRIP_CONFIG_DIR";

const QUALIFIER: &str = "org";
const ORGANISATION: &str = "Varstrip";
const APPLICATION: &str = "varstrip";
const SETTINGS_FILE: &str = "settings.toml";

#[derive(Debug, Clone)]
pub struct AppPaths {
    config_dir: PathBuf,
    settings_file: PathBuf,
}

impl AppPaths {
    /// Resolves the settings file: an explicit path wins, then
    /// `VARSTRIP_CONFIG_DIR`, then the platform config directory.
    pub fn discover(explicit_settings: Option<&Path>) -> Result<Self> {
        let config_dir = match env_override(ENV_CONFIG_DIR) {
            Some(dir) => dir,
            None => ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION)
                .ok_or_else(|| anyhow!("failed to determine user directories"))?
                .config_dir()
                .to_path_buf(),
        };
        let settings_file = explicit_settings
            .map(Path::to_path_buf)
            .unwrap_or_else(|| config_dir.join(SETTINGS_FILE));
        Ok(Self {
            config_dir,
            settings_file,
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn settings_file(&self) -> &Path {
        &self.settings_file
    }
}

fn env_override(name: &str) -> Option<PathBuf> {
    match env::var_os(name) {
        Some(value) if !value.as_os_str().is_empty() => Some(PathBuf::from(value)),
        _ => None,
    }
}
