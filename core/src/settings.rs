//! Loading and saving engine settings.
//!
//! Settings live in a YAML file; every field is optional. A few fields can
//! be overridden from the environment, which wins over the file.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::types::settings::Settings;

pub const ENV_PARALLEL_CHAINS: &str = "LZ_WIRE_PARALLEL_CHAINS";
pub const ENV_MAX_RETRIES: &str = "LZ_WIRE_MAX_RETRIES";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid settings: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("invalid value '{value}' for {name}")]
    Env { name: &'static str, value: String },
}

/// Load settings from `path`, then apply environment overrides.
pub fn load(path: &Path) -> Result<Settings, SettingsError> {
    let content = std::fs::read_to_string(path).map_err(|source| SettingsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let mut settings = parse(&content)?;
    apply_env(&mut settings, |name| std::env::var(name).ok())?;
    Ok(settings)
}

/// Defaults plus environment overrides, for runs without a settings file.
pub fn from_env() -> Result<Settings, SettingsError> {
    let mut settings = Settings::default();
    apply_env(&mut settings, |name| std::env::var(name).ok())?;
    Ok(settings)
}

pub fn save(path: &Path, settings: &Settings) -> Result<(), SettingsError> {
    let content = serde_yaml::to_string(settings)?;
    std::fs::write(path, content).map_err(|source| SettingsError::Write {
        path: path.to_path_buf(),
        source,
    })
}

pub fn parse(content: &str) -> Result<Settings, SettingsError> {
    if content.trim().is_empty() {
        return Ok(Settings::default());
    }
    Ok(serde_yaml::from_str(content)?)
}

/// Applies overrides read through `lookup`.
pub fn apply_env<F>(settings: &mut Settings, lookup: F) -> Result<(), SettingsError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup(ENV_PARALLEL_CHAINS) {
        settings.parallel_chains = parse_bool(&value).ok_or(SettingsError::Env {
            name: ENV_PARALLEL_CHAINS,
            value: value.clone(),
        })?;
    }
    if let Some(value) = lookup(ENV_MAX_RETRIES) {
        settings.retry.max_retries = value.trim().parse().map_err(|_| SettingsError::Env {
            name: ENV_MAX_RETRIES,
            value: value.clone(),
        })?;
    }
    Ok(())
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
