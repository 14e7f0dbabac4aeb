use super::gpu::GpuTableError;
use crate::profile::ssh_config::SshConfigError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Failed to launch '{program}': {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("Connection to {destination} failed: {message}")]
    Connection {
        destination: String,
        message: String,
    },

    #[error("Transfer of '{path}' failed: {message}")]
    Upload { path: String, message: String },

    #[error("Command `{command}` exited with status {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: i32,
        stderr: String,
    },

    #[error("Could not read the GPU table: {source}")]
    GpuTable {
        #[from]
        source: GpuTableError,
    },

    #[error(transparent)]
    SshConfig(#[from] SshConfigError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
