use crate::error::{CliError, Result};
use directories::BaseDirs;
use std::path::{Path, PathBuf};
use tracing::debug;

const APP_DIR: &str = ".alphasub";
const SERVERS_FILE: &str = "servers.json";

/// Where the per-user files live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppPaths {
    pub servers_file: PathBuf,
    pub ssh_config: PathBuf,
}

impl AppPaths {
    /// Resolves the defaults under the home directory, keeping any explicit override.
    pub fn resolve(servers_file: Option<PathBuf>, ssh_config: Option<PathBuf>) -> Result<Self> {
        let home = match (&servers_file, &ssh_config) {
            (Some(_), Some(_)) => None,
            _ => Some(Self::home_dir()?),
        };
        let paths = Self {
            servers_file: servers_file
                .or_else(|| home.as_deref().map(Self::default_servers_file))
                .ok_or_else(|| CliError::Config("No server file path.".to_string()))?,
            ssh_config: ssh_config
                .or_else(|| home.as_deref().map(Self::default_ssh_config))
                .ok_or_else(|| CliError::Config("No SSH config path.".to_string()))?,
        };
        debug!("Resolved application paths: {:?}", paths);
        Ok(paths)
    }

    pub fn default_servers_file(home: &Path) -> PathBuf {
        home.join(APP_DIR).join(SERVERS_FILE)
    }

    pub fn default_ssh_config(home: &Path) -> PathBuf {
        home.join(".ssh").join("config")
    }

    fn home_dir() -> Result<PathBuf> {
        BaseDirs::new()
            .map(|dirs| dirs.home_dir().to_path_buf())
            .ok_or_else(|| CliError::Config("Could not determine the home directory.".to_string()))
    }
}
