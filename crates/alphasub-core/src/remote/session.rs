use super::error::RemoteError;
use super::gpu::{
    FREE_GPU_MEMORY_THRESHOLD_MIB, GPU_QUERY_COMMAND, GpuDevice, parse_gpu_table,
    select_free_gpu,
};
use super::local::LocalShell;
use super::openssh::{DEFAULT_CONTROL_PERSIST_SECS, OpenSshShell};
use super::shell::{CommandOutput, RemoteShell, with_cwd};
use crate::profile::{ServerProfile, ssh_config};
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Makes `ssh node<N>` from the login host work without a password.
const AUTHORIZE_NODE_ACCESS_SCRIPT: &str = r#"set -e
mkdir -p ~/.ssh
chmod 700 ~/.ssh
[ -f ~/.ssh/id_rsa ] || ssh-keygen -t rsa -f ~/.ssh/id_rsa -q -N ""
touch ~/.ssh/authorized_keys
key=$(cat ~/.ssh/id_rsa.pub)
grep -Fxq "$key" ~/.ssh/authorized_keys || echo "$key" >> ~/.ssh/authorized_keys
"#;

#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub password: Option<String>,
    /// The OpenSSH client config to read proxy commands from and append host entries to.
    pub ssh_config_path: Option<PathBuf>,
    /// Compute node to target; defaults to the first node of the profile.
    pub node: Option<u32>,
    pub control_persist_secs: u32,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            password: None,
            ssh_config_path: None,
            node: None,
            control_persist_secs: DEFAULT_CONTROL_PERSIST_SECS,
        }
    }
}

/// The connection-free part of a session: everything the run script needs to know about
/// where it will execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInfo {
    pub server_name: String,
    pub profile: ServerProfile,
    pub node: Option<u32>,
    pub gpu: Option<u32>,
    pub workdir: String,
}

impl SessionInfo {
    pub fn new(server_name: &str, profile: ServerProfile) -> Self {
        Self {
            server_name: server_name.to_string(),
            workdir: profile.workdir.clone().unwrap_or_default(),
            profile,
            node: None,
            gpu: None,
        }
    }

    pub fn with_node(mut self, node: Option<u32>) -> Self {
        self.node = node;
        self
    }

    pub fn with_gpu(mut self, gpu: Option<u32>) -> Self {
        self.gpu = gpu;
        self
    }

    pub fn with_workdir(mut self, workdir: impl Into<String>) -> Self {
        self.workdir = workdir.into();
        self
    }

    /// PBS resource request for one GPU, pinned to the selected node when there is one.
    pub fn pbs_directives(&self) -> String {
        let mut select = format!("#PBS -l select=1:ncpus={}", self.profile.ncpus);
        if let Some(node) = self.node {
            select.push_str(&format!(":host=node{node}"));
        }
        select.push_str(":ngpus=1");
        match &self.profile.pbs_queue {
            Some(queue) if !queue.is_empty() => format!("{select}\n#PBS -q {queue}"),
            _ => select,
        }
    }
}

/// A live connection to one compute host.
pub struct Session {
    info: SessionInfo,
    shell: Box<dyn RemoteShell>,
    gpus: Vec<GpuDevice>,
}

impl Session {
    pub fn new(info: SessionInfo, shell: Box<dyn RemoteShell>) -> Self {
        Self {
            info,
            shell,
            gpus: Vec::new(),
        }
    }

    pub fn info(&self) -> &SessionInfo {
        &self.info
    }

    pub fn info_mut(&mut self) -> &mut SessionInfo {
        &mut self.info
    }

    /// The table from the last GPU query.
    pub fn gpus(&self) -> &[GpuDevice] {
        &self.gpus
    }

    /// Runs `command`, optionally from `cwd`, and logs what it printed. The exit status is
    /// returned, not checked.
    pub fn run_command(
        &self,
        command: &str,
        cwd: Option<&str>,
    ) -> Result<CommandOutput, RemoteError> {
        let full_command = with_cwd(command, cwd);
        let output = self.shell.exec(&full_command)?;
        let stdout = output.stdout.trim_end();
        let stderr = output.stderr.trim_end();
        if !stdout.is_empty() {
            info!("[{}] {}", self.shell.describe(), stdout);
        }
        if !stderr.is_empty() {
            if output.success() {
                info!("[{}] {}", self.shell.describe(), stderr);
            } else {
                warn!("[{}] {}", self.shell.describe(), stderr);
            }
        }
        debug!("`{}` exited with status {}", full_command, output.status);
        Ok(output)
    }

    pub fn upload(&self, contents: &[u8], remote_path: &str) -> Result<(), RemoteError> {
        self.shell.upload(contents, remote_path)
    }

    pub fn hostname(&self) -> Result<String, RemoteError> {
        let output = self.run_command("hostname", None)?.check("hostname")?;
        Ok(output.stdout.trim().to_string())
    }

    /// The GPU query, routed through `ssh node<N>` when a compute node is selected.
    pub fn gpu_query_command(&self) -> String {
        match self.info.node {
            Some(node) => format!("ssh node{node} {GPU_QUERY_COMMAND}"),
            None => GPU_QUERY_COMMAND.to_string(),
        }
    }

    pub fn query_gpus(&mut self) -> Result<&[GpuDevice], RemoteError> {
        let command = self.gpu_query_command();
        let output = self.shell.exec(&command)?.check(&command)?;
        self.gpus = parse_gpu_table(&output.stdout)?;
        debug!("GPU query returned {} device(s).", self.gpus.len());
        Ok(&self.gpus)
    }

    /// Queries the GPUs and records the idlest one below the memory threshold as the
    /// session's GPU. `None` when every device is busy.
    ///
    /// The choice is not re-validated later; another user can claim the device before
    /// the job starts.
    pub fn select_free_gpu(&mut self) -> Result<Option<u32>, RemoteError> {
        self.query_gpus()?;
        let selected = select_free_gpu(&self.gpus, FREE_GPU_MEMORY_THRESHOLD_MIB);
        match selected {
            Some(index) => info!(
                "Selected GPU {} on {}.",
                index,
                self.shell.describe()
            ),
            None => warn!(
                "No GPU below {} MiB of used memory on {}.",
                FREE_GPU_MEMORY_THRESHOLD_MIB,
                self.shell.describe()
            ),
        }
        self.info.gpu = selected;
        Ok(selected)
    }

    pub fn authorize_node_access(&self) -> Result<(), RemoteError> {
        info!("Ensuring the login host's key is authorized for node access.");
        self.run_command(AUTHORIZE_NODE_ACCESS_SCRIPT, None)?
            .check("authorize node access")?;
        Ok(())
    }
}

/// Opens a session for `profile`. Local profiles get a [`LocalShell`]; remote ones an
/// OpenSSH control master, proxied when the profile names a gateway.
pub fn connect(
    server_name: &str,
    profile: &ServerProfile,
    options: &ConnectOptions,
) -> Result<Session, RemoteError> {
    let info = SessionInfo::new(server_name, profile.clone())
        .with_node(options.node.or_else(|| profile.default_node()));

    if profile.is_local() {
        info!(
            "Server '{}' has no address; running commands on this machine.",
            server_name
        );
        return Ok(Session::new(info, Box::new(LocalShell::new())));
    }

    let mut proxy_from_config = None;
    if let Some(path) = &options.ssh_config_path {
        ssh_config::ensure_host_entry(path, server_name, profile)?;
        if profile.uses_proxy() {
            proxy_from_config = ssh_config::read_proxy_command(path, server_name)?;
        }
    }
    let proxy_command = profile
        .uses_proxy()
        .then(|| proxy_from_config.unwrap_or_else(|| ssh_config::default_proxy_command(profile)));

    let shell = OpenSshShell::new(
        profile,
        proxy_command.as_deref(),
        options.control_persist_secs,
    );
    shell.establish(options.password.as_deref())?;
    Ok(Session::new(info, Box::new(shell)))
}
