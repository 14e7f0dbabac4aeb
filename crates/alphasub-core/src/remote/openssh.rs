//! Transport backed by the system `ssh` client.
//!
//! The first connection starts an OpenSSH control master; every later command, including
//! file transfers, is multiplexed over it. The master outlives the process for
//! [`DEFAULT_CONTROL_PERSIST_SECS`] so consecutive invocations reuse the authenticated
//! connection.

use super::error::RemoteError;
use super::shell::{CommandOutput, RemoteShell, shell_quote};
use crate::profile::ServerProfile;
use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info, warn};

pub const DEFAULT_CONTROL_PERSIST_SECS: u32 = 300;

const SSH_PROGRAM: &str = "ssh";
const ASKPASS_PASSWORD_ENV: &str = "ALPHASUB_SSH_PASSWORD";

pub struct OpenSshShell {
    destination: String,
    args: Vec<String>,
}

impl OpenSshShell {
    /// Builds the transport without touching the network.
    pub fn new(
        profile: &ServerProfile,
        proxy_command: Option<&str>,
        control_persist_secs: u32,
    ) -> Self {
        let control_path = control_path_for(profile);
        Self {
            destination: profile.address.clone(),
            args: connection_args(profile, proxy_command, &control_path, control_persist_secs),
        }
    }

    /// Opens (or reuses) the control master. Authentication and network failures are
    /// returned as [`RemoteError::Connection`].
    pub fn establish(&self, password: Option<&str>) -> Result<(), RemoteError> {
        info!("Opening SSH connection to {}", self.describe());
        let batch_mode: &[&str] = if password.is_some() {
            &[]
        } else {
            &["-o", "BatchMode=yes"]
        };
        let mut command = self.command_with(batch_mode);
        command.arg("true").stdin(Stdio::null());

        let askpass = match password {
            Some(secret) => {
                let script = write_askpass_script()?;
                command
                    .env("SSH_ASKPASS", &script)
                    .env("SSH_ASKPASS_REQUIRE", "force")
                    .env(ASKPASS_PASSWORD_ENV, secret);
                Some(script)
            }
            None => None,
        };

        let result = run_output(&mut command);
        if let Some(script) = askpass {
            if let Err(e) = fs::remove_file(&script) {
                warn!("Could not remove askpass helper {:?}: {}", script, e);
            }
        }

        let output = result?;
        if !output.success() {
            return Err(RemoteError::Connection {
                destination: self.describe(),
                message: output.stderr.trim().to_string(),
            });
        }
        debug!("Control master for {} is up.", self.describe());
        Ok(())
    }

    /// Asks the control master to exit.
    pub fn close(&self) -> Result<(), RemoteError> {
        let mut command = self.command_with(&["-O", "exit"]);
        command.stdin(Stdio::null());
        let output = run_output(&mut command)?;
        if !output.success() {
            debug!(
                "No control master to stop for {}: {}",
                self.describe(),
                output.stderr.trim()
            );
        }
        Ok(())
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }

    fn command(&self) -> Command {
        self.command_with(&[])
    }

    /// `ssh <connection args> <extra options> <destination>`; the remote command goes last.
    fn command_with(&self, extra_options: &[&str]) -> Command {
        let mut command = Command::new(SSH_PROGRAM);
        command
            .args(&self.args)
            .args(extra_options)
            .arg(&self.destination);
        command
    }
}

impl RemoteShell for OpenSshShell {
    fn exec(&self, remote_command: &str) -> Result<CommandOutput, RemoteError> {
        debug!("[{}] $ {}", self.describe(), remote_command);
        let mut command = self.command();
        command.arg(remote_command).stdin(Stdio::null());
        run_output(&mut command)
    }

    fn upload(&self, contents: &[u8], remote_path: &str) -> Result<(), RemoteError> {
        debug!(
            "[{}] uploading {} bytes to {}",
            self.describe(),
            contents.len(),
            remote_path
        );
        let mut command = self.command();
        command.arg(format!("cat > {}", shell_quote(remote_path)));
        pipe_into(&mut command, contents, remote_path)
    }

    fn describe(&self) -> String {
        self.destination.clone()
    }
}

/// Options passed to every `ssh` invocation for `profile`.
pub fn connection_args(
    profile: &ServerProfile,
    proxy_command: Option<&str>,
    control_path: &Path,
    control_persist_secs: u32,
) -> Vec<String> {
    let mut args = vec![
        "-p".to_string(),
        profile.port.to_string(),
        "-o".to_string(),
        "ControlMaster=auto".to_string(),
        "-o".to_string(),
        format!("ControlPath={}", control_path.display()),
        "-o".to_string(),
        format!("ControlPersist={control_persist_secs}"),
        "-o".to_string(),
        "StrictHostKeyChecking=accept-new".to_string(),
    ];
    if !profile.user.is_empty() {
        args.push("-l".to_string());
        args.push(profile.user.clone());
    }
    if let Some(identity) = &profile.identity_file {
        args.push("-i".to_string());
        args.push(identity.display().to_string());
    }
    if let Some(proxy) = proxy_command {
        args.push("-o".to_string());
        args.push(format!("ProxyCommand={proxy}"));
    }
    args
}

/// Socket path shared by every process talking to the same `user@host:port`.
pub fn control_path_for(profile: &ServerProfile) -> PathBuf {
    let mut hasher = DefaultHasher::new();
    profile.user.hash(&mut hasher);
    profile.address.hash(&mut hasher);
    profile.port.hash(&mut hasher);
    std::env::temp_dir().join(format!("alphasub-{:x}.sock", hasher.finish()))
}

/// Feeds `contents` to the stdin of `command`. When the process exits early the write
/// fails with a broken pipe; its stderr is reported instead.
fn pipe_into(
    command: &mut Command,
    contents: &[u8],
    remote_path: &str,
) -> Result<(), RemoteError> {
    command
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let mut child = command.spawn().map_err(|e| RemoteError::Spawn {
        program: command.get_program().to_string_lossy().to_string(),
        source: e,
    })?;

    let written = match child.stdin.take() {
        Some(mut stdin) => stdin.write_all(contents),
        None => Ok(()),
    };
    let output = child.wait_with_output()?;

    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    match written {
        _ if !output.status.success() && !stderr.is_empty() => Err(RemoteError::Upload {
            path: remote_path.to_string(),
            message: stderr,
        }),
        Err(e) => Err(RemoteError::Upload {
            path: remote_path.to_string(),
            message: e.to_string(),
        }),
        Ok(()) if !output.status.success() => Err(RemoteError::Upload {
            path: remote_path.to_string(),
            message: format!("exited with status {}", output.status),
        }),
        Ok(()) => Ok(()),
    }
}

fn run_output(command: &mut Command) -> Result<CommandOutput, RemoteError> {
    let output = command.output().map_err(|e| RemoteError::Spawn {
        program: SSH_PROGRAM.to_string(),
        source: e,
    })?;
    Ok(CommandOutput {
        status: output.status.code().unwrap_or(-1),
        stdout: String::from_utf8_lossy(&output.stdout).to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).to_string(),
    })
}

fn write_askpass_script() -> Result<PathBuf, RemoteError> {
    let path = std::env::temp_dir().join(format!("alphasub-askpass-{}.sh", std::process::id()));
    fs::write(
        &path,
        format!("#!/bin/sh\nprintf '%s\\n' \"${ASKPASS_PASSWORD_ENV}\"\n"),
    )?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perm = fs::metadata(&path)?.permissions();
        perm.set_mode(0o700);
        fs::set_permissions(&path, perm)?;
    }
    Ok(path)
}
