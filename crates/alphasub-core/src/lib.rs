//! # alphasub Core Library
//!
//! Configure, submit and browse ColabFold/AlphaFold structure-prediction jobs running on
//! remote GPU hosts reached over SSH.
//!
//! ## Architectural Philosophy
//!
//! The library keeps everything that can be tested without a network pure, and pushes the
//! transport behind a single trait so the rest of the code never talks to `ssh` directly.
//!
//! - **[`profile`]: Server Profiles.** The per-user `servers.json` store, the `ServerProfile`
//!   model and the `~/.ssh/config` entries that make proxied connections work.
//!
//! - **[`remote`]: The Connection Manager.** The [`remote::RemoteShell`] transport (OpenSSH
//!   or a local shell), the live `Session`, the `nvidia-smi` table parser and free-GPU
//!   selection.
//!
//! - **[`job`]: The Job Configurator.** The `JobRequest` model, the run-script template and
//!   the submission sequence (working directory, uploads, launch).
//!
//! - **[`results`]: The Results Browser.** Discovery of finished jobs and models in the
//!   output layout, PAE matrices, heatmaps and structure summaries.
//!
//! - **[`workflows`]: The Public API.** Multi-step procedures (connect, query GPUs) that tie
//!   the layers together and report progress.

pub mod job;
pub mod profile;
pub mod progress;
pub mod remote;
pub mod results;
pub mod workflows;
