use std::env;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use directories_next::ProjectDirs;

pub const ENV_CONFIG_DIR: &str = "LINESWALL_CONFIG_DIR";

const QUALIFIER: &str = "net";
const ORGANISATION: &str = "cxa";
const APPLICATION: &str = "lineswall";
const SETTINGS_FILE: &str = "settings.toml";

#[derive(Debug, Clone)]
pub struct AppPaths {
    config_dir: PathBuf,
}

impl AppPaths {
    pub fn discover() -> Result<Self> {
        let config_dir = match env::var_os(ENV_CONFIG_DIR) {
            Some(value) if !value.is_empty() => absolutize(PathBuf::from(value))
                .with_context(|| format!("failed to resolve {ENV_CONFIG_DIR}"))?,
            _ => ProjectDirs::from(QUALIFIER, ORGANISATION, APPLICATION)
                .ok_or_else(|| anyhow!("failed to determine user directories"))?
                .config_dir()
                .to_path_buf(),
        };
        Ok(Self { config_dir })
    }

    #[cfg(test)]
    pub fn with_config_dir(config_dir: PathBuf) -> Self {
        Self { config_dir }
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn settings_file(&self) -> PathBuf {
        self.config_dir.join(SETTINGS_FILE)
    }

    /// `explicit` when given, otherwise the default settings file.
    pub fn resolve_settings(&self, explicit: Option<&Path>) -> PathBuf {
        explicit
            .map(Path::to_path_buf)
            .unwrap_or_else(|| self.settings_file())
    }
}

fn absolutize(path: PathBuf) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path)
    } else {
        Ok(env::current_dir()
            .context("failed to read current directory")?
            .join(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn settings_file_lives_in_config_dir() {
        let paths = AppPaths::with_config_dir(PathBuf::from("/tmp/lineswall-config"));
        assert_eq!(
            paths.settings_file(),
            PathBuf::from("/tmp/lineswall-config/settings.toml")
        );
        assert_eq!(paths.config_dir(), Path::new("/tmp/lineswall-config"));
    }

    #[test]
    fn explicit_settings_path_wins() {
        let paths = AppPaths::with_config_dir(PathBuf::from("/tmp/lineswall-config"));
        let explicit = PathBuf::from("/elsewhere/custom.toml");
        assert_eq!(paths.resolve_settings(Some(&explicit)), explicit);
        assert_eq!(paths.resolve_settings(None), paths.settings_file());
    }
}
