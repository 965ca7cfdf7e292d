use std::path::Path;

use anyhow::{Context, Result};
use linesettings::{SettingKey, Settings};
use tracing::info;

use crate::cli::SettingsAction;

pub fn run(action: &SettingsAction, path: &Path) -> Result<()> {
    match action {
        SettingsAction::Where => {
            println!("{}", path.display());
        }
        SettingsAction::Show { json } => {
            let settings = Settings::load_or_default(path)?;
            print!("{}", render(&settings, *json)?);
        }
        SettingsAction::Get { key } => {
            let key: SettingKey = key.parse()?;
            let settings = Settings::load_or_default(path)?;
            println!("{}", settings.get(key));
        }
        SettingsAction::Set { key, value } => {
            let key: SettingKey = key.parse()?;
            let mut settings = Settings::load_or_default(path)?;
            settings.set(key, value)?;
            settings
                .persist(path)
                .with_context(|| format!("failed to store {key}"))?;
            info!(%key, value = %settings.get(key), path = %path.display(), "setting stored");
            println!("{}", settings.get(key));
        }
        SettingsAction::Reset => {
            Settings::default().persist(path)?;
            info!(path = %path.display(), "settings reset to defaults");
        }
    }
    Ok(())
}

fn render(settings: &Settings, json: bool) -> Result<String> {
    if json {
        let mut text =
            serde_json::to_string_pretty(settings).context("failed to encode settings as JSON")?;
        text.push('\n');
        Ok(text)
    } else {
        Ok(settings.to_toml_string()?)
    }
}
