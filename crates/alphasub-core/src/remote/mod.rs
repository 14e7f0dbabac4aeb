//! # Remote Module
//!
//! The connection manager: everything that needs a live shell on the compute host.
//!
//! - **Transport** ([`shell`], [`openssh`], [`local`]) - The [`RemoteShell`] trait and its
//!   OpenSSH and local implementations
//! - **Session** ([`session`]) - The connected host, its selected node and GPU, and the
//!   derived PBS resource request
//! - **GPU Probing** ([`gpu`]) - Parsing `nvidia-smi` tables and choosing an idle device
//! - **Error Handling** ([`error`]) - Transport and command failures
//!
//! All calls block until the underlying process exits. There is no retry, no timeout and
//! no cancellation.

pub mod error;
pub mod gpu;
pub mod local;
pub mod openssh;
pub mod session;
pub mod shell;

#[cfg(test)]
pub(crate) mod testing;

pub use error::RemoteError;
pub use session::{ConnectOptions, Session, SessionInfo, connect};
pub use shell::{CommandOutput, RemoteShell, shell_quote};
