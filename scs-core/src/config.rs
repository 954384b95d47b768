//! Project configuration (`scs.yaml`) and API key lookup.
//!
//! # File layout
//!
//! ```yaml
//! universe_id: "1234567"
//! place_id: "7654321"
//! mirror_dir: ScriptExplorer
//! allow_list: [ServerScriptService, StarterPlayer]
//! traversal: folders_and_allow_list
//! ```
//!
//! The camelCase keys of older JSON configs (`universeId`, `placeId`,
//! `version_control_name_whitelist`) are accepted as aliases; YAML parses the
//! JSON form unchanged.
//!
//! # API pattern
//!
//! Functions that touch the filesystem take an explicit path (`load_at`,
//! `write_template_at`); tests always pass a `TempDir` path.

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{io_err, ConfigError};
use crate::naming::DEFAULT_EXTENSION;

/// Config file name looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "scs.yaml";
/// Env file loaded before reading the API key.
pub const DEFAULT_ENV_FILE: &str = ".env";
/// Env vars consulted for the API key, in order.
pub const API_KEY_VARS: &[&str] = &["SCS_API_KEY", "API_KEY", "apiKey"];

pub const DEFAULT_BASE_URL: &str = "https://apis.roblox.com/cloud/v2";
pub const DEFAULT_MIRROR_DIR: &str = "ScriptExplorer";
pub const DEFAULT_MONITOR_INTERVAL_SECS: u64 = 3;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Which remote containers the walker descends into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraversalPolicy {
    /// Containers typed `Folder`, plus any container whose name is allow-listed.
    #[default]
    FoldersAndAllowList,
    /// Every node that reports children.
    AllContainers,
}

impl fmt::Display for TraversalPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraversalPolicy::FoldersAndAllowList => write!(f, "folders_and_allow_list"),
            TraversalPolicy::AllContainers => write!(f, "all_containers"),
        }
    }
}

/// Contents of `scs.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectConfig {
    #[serde(alias = "universeId", deserialize_with = "string_or_number")]
    pub universe_id: String,
    #[serde(alias = "placeId", deserialize_with = "string_or_number")]
    pub place_id: String,
    #[serde(default = "default_mirror_dir")]
    pub mirror_dir: PathBuf,
    #[serde(default = "default_extension")]
    pub file_extension: String,
    /// Container names the walker always descends into.
    #[serde(
        default,
        alias = "version_control_name_whitelist",
        alias = "verion_control_name_whitelist"
    )]
    pub allow_list: Vec<String>,
    #[serde(default)]
    pub traversal: TraversalPolicy,
    /// Walker pool size; `None` means available parallelism.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workers: Option<usize>,
    #[serde(default = "default_monitor_interval")]
    pub monitor_interval_secs: u64,
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl ProjectConfig {
    /// A config with defaults for everything except the place coordinates.
    pub fn new(universe_id: impl Into<String>, place_id: impl Into<String>) -> Self {
        Self {
            universe_id: universe_id.into(),
            place_id: place_id.into(),
            mirror_dir: default_mirror_dir(),
            file_extension: default_extension(),
            allow_list: Vec::new(),
            traversal: TraversalPolicy::default(),
            workers: None,
            monitor_interval_secs: default_monitor_interval(),
            base_url: default_base_url(),
        }
    }

    pub fn monitor_interval(&self) -> Duration {
        Duration::from_secs(self.monitor_interval_secs)
    }

    /// Configured pool size, or the machine's available parallelism.
    pub fn worker_count(&self) -> usize {
        self.workers
            .filter(|n| *n > 0)
            .or_else(|| std::thread::available_parallelism().ok().map(|n| n.get()))
            .unwrap_or(1)
    }

    /// Resolve `mirror_dir` against the directory holding the config file.
    pub fn mirror_dir_in(&self, base: &Path) -> PathBuf {
        if self.mirror_dir.is_absolute() {
            self.mirror_dir.clone()
        } else {
            base.join(&self.mirror_dir)
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.universe_id.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "universe_id" });
        }
        if self.place_id.trim().is_empty() {
            return Err(ConfigError::MissingField { field: "place_id" });
        }
        Ok(())
    }
}

fn default_mirror_dir() -> PathBuf {
    PathBuf::from(DEFAULT_MIRROR_DIR)
}

fn default_extension() -> String {
    DEFAULT_EXTENSION.to_owned()
}

fn default_monitor_interval() -> u64 {
    DEFAULT_MONITOR_INTERVAL_SECS
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_owned()
}

/// Ids are usually written as bare numbers in hand-edited configs.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Str(String),
        Int(u64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Str(s) => s,
        Raw::Int(n) => n.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Load / write
// ---------------------------------------------------------------------------

/// Load and validate the config at `path`.
///
/// Returns `ConfigError::ConfigNotFound` if absent,
/// `ConfigError::Parse` (with path + line context) if malformed.
pub fn load_at(path: &Path) -> Result<ProjectConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::ConfigNotFound {
            path: path.to_path_buf(),
        });
    }
    let contents = std::fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let config: ProjectConfig = serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
        path: path.to_path_buf(),
        source: e,
    })?;
    config.validate()?;
    Ok(config)
}

/// Write `config` to `path` via `<path>.tmp` + rename.
///
/// Refuses to replace an existing file unless `force` is set.
pub fn write_template_at(
    path: &Path,
    config: &ProjectConfig,
    force: bool,
) -> Result<(), ConfigError> {
    if path.exists() && !force {
        return Err(ConfigError::AlreadyExists {
            path: path.to_path_buf(),
        });
    }
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| io_err(parent, e))?;
    }
    let yaml = serde_yaml::to_string(config)?;
    let tmp = path.with_extension("yaml.tmp");
    std::fs::write(&tmp, yaml).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(path, e));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Environment
// ---------------------------------------------------------------------------

/// Load `path` into the process environment if it exists.
///
/// Variables already set in the environment win. Returns whether a file was
/// loaded.
pub fn load_env_file(path: &Path) -> Result<bool, ConfigError> {
    if !path.exists() {
        return Ok(false);
    }
    dotenvy::from_path(path).map_err(|source| ConfigError::EnvFile {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(true)
}

/// First non-empty value among [`API_KEY_VARS`], read through `lookup`.
pub fn api_key_from<F>(lookup: F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    API_KEY_VARS
        .iter()
        .filter_map(|var| lookup(var))
        .map(|value| value.trim().to_owned())
        .find(|value| !value.is_empty())
        .ok_or(ConfigError::MissingApiKey)
}

/// [`api_key_from`] against the process environment.
pub fn api_key_from_env() -> Result<String, ConfigError> {
    api_key_from(|var| std::env::var(var).ok())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
