//! # Profile Module
//!
//! Server profiles describe how to reach a compute host and where the ColabFold resources
//! live on it. They are loaded from the per-user `servers.json` file ([`store`]) and, for
//! hosts behind a gateway, mirrored into `~/.ssh/config` ([`ssh_config`]).

pub mod ssh_config;
pub mod store;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use store::{ProfileError, ProfileStore};

/// Name of the fallback profile that runs everything on the local machine.
pub const LOCAL_PROFILE: &str = "local";

const DEFAULT_SSH_PORT: u16 = 22;
const DEFAULT_EXECUTOR: &str = "bash";
const DEFAULT_CPUS: u32 = 8;

/// Connection and resource settings for one compute host.
///
/// Field names on disk follow the historical `servers.json` layout (`passerelle` for the
/// gateway, `server` for the host address, `NGPU` for the GPU count).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerProfile {
    #[serde(rename = "passerelle", default)]
    pub proxy_address: String,
    #[serde(rename = "server", default)]
    pub address: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub user: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workdir: Option<String>,
    #[serde(default)]
    pub database_folder: String,
    #[serde(default)]
    pub singularity_image: String,
    #[serde(default)]
    pub params_folder: String,
    #[serde(default = "default_executor")]
    pub executor: String,
    #[serde(rename = "NGPU", default = "default_gpu_count")]
    pub gpu_count: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub nodes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pbs_queue: Option<String>,
    #[serde(default = "default_cpus")]
    pub ncpus: u32,
}

fn default_port() -> u16 {
    DEFAULT_SSH_PORT
}

fn default_executor() -> String {
    DEFAULT_EXECUTOR.to_string()
}

fn default_gpu_count() -> u32 {
    1
}

fn default_cpus() -> u32 {
    DEFAULT_CPUS
}

impl ServerProfile {
    /// The entry written to a fresh `servers.json`.
    pub fn local_default() -> Self {
        Self {
            proxy_address: String::new(),
            address: String::new(),
            port: DEFAULT_SSH_PORT,
            user: "default".to_string(),
            identity_file: None,
            workdir: None,
            database_folder: String::new(),
            singularity_image: String::new(),
            params_folder: String::new(),
            executor: DEFAULT_EXECUTOR.to_string(),
            gpu_count: 1,
            nodes: Vec::new(),
            pbs_queue: None,
            ncpus: DEFAULT_CPUS,
        }
    }

    /// A profile without an address runs on this machine.
    pub fn is_local(&self) -> bool {
        self.address.trim().is_empty()
    }

    pub fn uses_proxy(&self) -> bool {
        !self.proxy_address.trim().is_empty()
    }

    /// `user@address`, or the bare address when no user is configured.
    pub fn destination(&self) -> String {
        if self.user.is_empty() {
            self.address.clone()
        } else {
            format!("{}@{}", self.user, self.address)
        }
    }

    /// Numeric ids of the compute nodes listed for this host, in declaration order.
    pub fn node_ids(&self) -> Vec<u32> {
        self.nodes
            .iter()
            .filter_map(|label| parse_node_label(label))
            .collect()
    }

    pub fn default_node(&self) -> Option<u32> {
        self.node_ids().into_iter().next()
    }
}

/// PBS queue names, optionally with `@server`: letters, digits, `.`, `_`, `-` and `@`.
pub fn is_valid_pbs_queue(queue: &str) -> bool {
    !queue.is_empty()
        && queue
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-' | '@'))
}

/// Extracts the node number from labels such as `"38 (GTX1080Ti)"`.
pub fn parse_node_label(label: &str) -> Option<u32> {
    let digits: String = label
        .trim()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}
