#![allow(clippy::module_name_repetitions)]
//! Launcher configuration: YAML file plus environment overrides.
//!
//! Lookup order for the file: `--config`, `LABBOX_LAUNCHER_CONFIG`,
//! `~/.labbox-launcher.yml`. A missing default file yields the defaults; a
//! missing file that was named explicitly is an error.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::collector::{PromptField, Schema, DEFAULT_PROMPT_RETRIES};
use crate::errors::LauncherError;
use crate::model::valid_env_key;

pub const DEFAULT_RUNTIME: &str = "docker";
pub const DEFAULT_KACHERY_CAT: &str = "kachery-cat";
const DEFAULT_CONFIG_FILE: &str = ".labbox-launcher.yml";

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    runtime: Option<String>,
    kachery_storage_dir: Option<PathBuf>,
    kachery_cat: Option<String>,
    prompt_retries: Option<u32>,
    images: Vec<String>,
    prompts: Vec<PromptField>,
    default_env: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Runtime binary name (`docker`, `podman`) or explicit path.
    pub runtime: String,
    pub kachery_storage_dir: Option<PathBuf>,
    pub kachery_cat: String,
    /// Attempts per prompt before giving up.
    pub prompt_retries: u32,
    pub images: Vec<String>,
    pub schema: Schema,
    /// Environment applied under any `--env` flags.
    pub default_env: BTreeMap<String, String>,
    /// File the configuration was read from, if any.
    pub source: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            runtime: DEFAULT_RUNTIME.to_string(),
            kachery_storage_dir: None,
            kachery_cat: DEFAULT_KACHERY_CAT.to_string(),
            prompt_retries: DEFAULT_PROMPT_RETRIES,
            images: Vec::new(),
            schema: Schema::builtin(&[]),
            default_env: BTreeMap::new(),
            source: None,
        }
    }
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl Config {
    pub fn from_yaml_str(content: &str) -> Result<Self, LauncherError> {
        let file: ConfigFile = if content.trim().is_empty() {
            ConfigFile::default()
        } else {
            serde_yaml::from_str(content)
                .map_err(|e| LauncherError::Configuration(format!("invalid config: {e}")))?
        };

        for key in file.default_env.keys() {
            if !valid_env_key(key) {
                return Err(LauncherError::Configuration(format!(
                    "invalid default_env key '{key}'"
                )));
            }
        }
        if file.prompt_retries == Some(0) {
            return Err(LauncherError::Configuration(
                "prompt_retries must be at least 1".to_string(),
            ));
        }
        let schema = if file.prompts.is_empty() {
            Schema::builtin(&file.images)
        } else {
            Schema::new(file.prompts)?
        };

        let defaults = Config::default();
        Ok(Config {
            runtime: non_empty(file.runtime).unwrap_or(defaults.runtime),
            kachery_storage_dir: file.kachery_storage_dir,
            kachery_cat: non_empty(file.kachery_cat).unwrap_or(defaults.kachery_cat),
            prompt_retries: file.prompt_retries.unwrap_or(defaults.prompt_retries),
            images: file.images,
            schema,
            default_env: file.default_env,
            source: None,
        })
    }

    pub fn from_path(path: &Path) -> Result<Self, LauncherError> {
        let content = fs::read_to_string(path).map_err(|e| {
            LauncherError::Configuration(format!("cannot read config {}: {e}", path.display()))
        })?;
        let mut cfg = Self::from_yaml_str(&content).map_err(|e| match e {
            LauncherError::Configuration(msg) => {
                LauncherError::Configuration(format!("{}: {msg}", path.display()))
            }
            other => other,
        })?;
        cfg.source = Some(path.to_path_buf());
        Ok(cfg)
    }

    /// Locate and read the configuration file, then apply environment overrides.
    pub fn load(explicit: Option<&Path>) -> Result<Self, LauncherError> {
        let env_path = non_empty(std::env::var("LABBOX_LAUNCHER_CONFIG").ok()).map(PathBuf::from);
        let mut cfg = match explicit.map(Path::to_path_buf).or(env_path) {
            Some(p) => Self::from_path(&p)?,
            None => match default_config_path() {
                Some(p) if p.is_file() => Self::from_path(&p)?,
                _ => {
                    debug!("no config file found; using defaults");
                    Self::default()
                }
            },
        };
        cfg.apply_env_overrides(|k| std::env::var(k).ok())?;
        Ok(cfg)
    }

    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), LauncherError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(rt) = non_empty(lookup("LABBOX_LAUNCHER_RUNTIME")) {
            self.runtime = rt;
        }
        if let Some(dir) = non_empty(lookup("KACHERY_STORAGE_DIR")) {
            self.kachery_storage_dir = Some(PathBuf::from(dir));
        }
        if let Some(raw) = non_empty(lookup("LABBOX_LAUNCHER_PROMPT_RETRIES")) {
            self.prompt_retries = match raw.parse::<u32>() {
                Ok(n) if n >= 1 => n,
                _ => {
                    return Err(LauncherError::Configuration(format!(
                        "LABBOX_LAUNCHER_PROMPT_RETRIES must be a positive integer, got '{raw}'"
                    )))
                }
            };
        }
        Ok(())
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    home::home_dir().map(|h| h.join(DEFAULT_CONFIG_FILE))
}
