use std::{
    env, fs,
    path::{Path, PathBuf},
};

use directories::BaseDirs;
use lazy_static::lazy_static;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::services::ColumnsConfig;
use crate::tui::{DebounceConfig, KeyBinding, KeyBindings, ThemeName};

const CONFIG: &str = include_str!("../.config/config.json5");

lazy_static! {
    pub static ref PROJECT_NAME: String = env!("CARGO_CRATE_NAME").to_uppercase().to_string();
    pub static ref CONFIG_FOLDER: Option<PathBuf> = env::var(format!("{}_CONFIG", PROJECT_NAME.clone()))
        .ok()
        .map(PathBuf::from);
}

fn default_server_url() -> String {
    "http://localhost:8888".to_string()
}

#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct Config {
    #[serde(default = "default_server_url")]
    pub server_url: String,
    #[serde(default)]
    pub debounce: DebounceConfig,
    #[serde(default)]
    pub columns: ColumnsConfig,
    #[serde(default)]
    pub theme: ThemeName,
    /// Overrides of the default bindings
    #[serde(default)]
    pub keybindings: Vec<KeyBinding>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            debounce: DebounceConfig::default(),
            columns: ColumnsConfig::default(),
            theme: ThemeName::default(),
            keybindings: Vec::new(),
        }
    }
}

impl Config {
    /// Layer the embedded defaults, the user file and `PREPGRID_*` variables
    ///
    /// Without an explicit path the file lives in the config folder and is
    /// created from the defaults on first run.
    pub fn from_path(config_path: Option<&PathBuf>) -> Result<Self, config::ConfigError> {
        let (selected_path, required) = match config_path {
            Some(path) => (expand_tilde(path), true),
            None => {
                let path = default_config_path();
                if !path.exists() {
                    write_defaults(&path);
                }
                (path, false)
            }
        };
        debug!(path = %selected_path.display(), "loading configuration");

        config::Config::builder()
            .add_source(config::File::from_str(CONFIG, config::FileFormat::Json5))
            .add_source(
                config::File::from(selected_path)
                    .format(config::FileFormat::Json5)
                    .required(required),
            )
            .add_source(
                config::Environment::with_prefix(&PROJECT_NAME)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Default bindings with the configured overrides applied
    pub fn key_bindings(&self) -> KeyBindings {
        let bindings = KeyBindings::with_overrides(&self.keybindings);
        for problem in bindings.validate() {
            warn!("{problem}");
        }
        bindings
    }
}

fn write_defaults(path: &Path) {
    if let Some(parent) = path.parent() {
        let _ = fs::create_dir_all(parent);
    }
    if let Err(e) = fs::write(path, CONFIG) {
        warn!(path = %path.display(), error = %e, "unable to write default configuration");
    }
}

fn expand_tilde(path: &Path) -> PathBuf {
    if let Some(s) = path.to_str() {
        if s.starts_with('~') {
            if let Some(base) = BaseDirs::new() {
                return PathBuf::from(s.replacen('~', base.home_dir().to_str().unwrap_or(""), 1));
            }
        }
    }
    path.to_path_buf()
}

fn default_config_path() -> PathBuf {
    if let Some(folder) = CONFIG_FOLDER.clone() {
        return folder.join("config.json5");
    }
    if let Some(base) = BaseDirs::new() {
        return base.home_dir().join(".prepgrid-config.json5");
    }
    PathBuf::from(".prepgrid-config.json5")
}
