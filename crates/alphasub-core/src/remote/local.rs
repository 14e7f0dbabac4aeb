use super::error::RemoteError;
use super::shell::{CommandOutput, RemoteShell};
use std::fs;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::debug;

const LOCAL_SHELL: &str = "bash";

/// Runs commands on this machine, for the `local` server profile.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalShell;

impl LocalShell {
    pub fn new() -> Self {
        Self
    }
}

impl RemoteShell for LocalShell {
    fn exec(&self, command: &str) -> Result<CommandOutput, RemoteError> {
        debug!("[local] $ {}", command);
        let output = Command::new(LOCAL_SHELL)
            .arg("-c")
            .arg(command)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| RemoteError::Spawn {
                program: LOCAL_SHELL.to_string(),
                source: e,
            })?;
        Ok(CommandOutput {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }

    fn upload(&self, contents: &[u8], remote_path: &str) -> Result<(), RemoteError> {
        let path = Path::new(remote_path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, contents).map_err(|e| RemoteError::Upload {
            path: remote_path.to_string(),
            message: e.to_string(),
        })
    }

    fn describe(&self) -> String {
        "local".to_string()
    }
}
