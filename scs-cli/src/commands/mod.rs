//! Subcommands and the project context they share.

pub mod init;
pub mod monitor;
pub mod pull;
pub mod push;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;

use scs_core::config::{self, DEFAULT_CONFIG_FILE, DEFAULT_ENV_FILE};
use scs_core::ProjectConfig;
use scs_remote::{RemoteClient, RemoteConfig, UreqTransport};

/// Flags accepted by every subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct GlobalArgs {
    /// Project config file.
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Mirror directory, overriding `mirror_dir` from the config.
    #[arg(long, global = true, value_name = "DIR")]
    pub mirror: Option<PathBuf>,
}

/// A loaded project: its config plus the resolved mirror directory.
#[derive(Debug, Clone)]
pub struct Project {
    pub config: ProjectConfig,
    pub mirror_dir: PathBuf,
}

impl GlobalArgs {
    pub fn config_path(&self) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE))
    }

    /// Mirror directory for `config`: `--mirror` if given, else the config's
    /// `mirror_dir` relative to the config file.
    pub fn mirror_dir(&self, config: &ProjectConfig) -> PathBuf {
        match &self.mirror {
            Some(dir) => dir.clone(),
            None => {
                let path = self.config_path();
                let base = path
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .unwrap_or(Path::new("."));
                config.mirror_dir_in(base)
            }
        }
    }

    pub fn load_project(&self) -> Result<Project> {
        let path = self.config_path();
        let config = config::load_at(&path)
            .with_context(|| format!("failed to load config '{}'", path.display()))?;
        let mirror_dir = self.mirror_dir(&config);
        Ok(Project { config, mirror_dir })
    }
}

/// Build a client for `config`, reading the API key from `.env` or the
/// environment.
pub fn connect(config: &ProjectConfig) -> Result<Arc<RemoteClient>> {
    let env_file = Path::new(DEFAULT_ENV_FILE);
    if config::load_env_file(env_file).context("failed to load .env")? {
        tracing::debug!(path = %env_file.display(), "loaded env file");
    }
    let api_key = config::api_key_from_env().context("cannot talk to the place API")?;

    let remote = RemoteConfig::from_project(config);
    tracing::debug!(
        base_url = %remote.base_url,
        universe = %remote.universe_id,
        place = %remote.place_id,
        "connecting",
    );
    Ok(Arc::new(RemoteClient::new(
        remote,
        Arc::new(UreqTransport::new(api_key)),
    )))
}

/// Multi-threaded runtime for the async sync entry points.
pub fn runtime() -> Result<tokio::runtime::Runtime> {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to start tokio runtime")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mirror_dir_is_relative_to_config_file() {
        let global = GlobalArgs {
            config: Some(PathBuf::from("/work/game/scs.yaml")),
            mirror: None,
        };
        let config = ProjectConfig::new("1", "2");
        assert_eq!(
            global.mirror_dir(&config),
            PathBuf::from("/work/game/ScriptExplorer")
        );
    }

    #[test]
    fn mirror_flag_wins() {
        let global = GlobalArgs {
            config: None,
            mirror: Some(PathBuf::from("elsewhere")),
        };
        let config = ProjectConfig::new("1", "2");
        assert_eq!(global.mirror_dir(&config), PathBuf::from("elsewhere"));
    }

    #[test]
    fn default_config_resolves_against_cwd() {
        let global = GlobalArgs::default();
        let config = ProjectConfig::new("1", "2");
        assert_eq!(global.config_path(), PathBuf::from("scs.yaml"));
        assert_eq!(
            global.mirror_dir(&config),
            PathBuf::from(".").join("ScriptExplorer")
        );
    }
}
