//! # Job Module
//!
//! The job configurator: turns user parameters into a [`JobRequest`], renders the run
//! script for a session ([`script`]) and stages and launches it on the host ([`submit`]).
//!
//! The script template and the request model are pure and deterministic: identical
//! inputs always render byte-identical scripts.

pub mod error;
pub mod request;
pub mod script;
pub mod submit;

pub use error::JobError;
pub use request::{
    AlignmentFile, DbLoadMode, JobInput, JobRequest, JobRequestBuilder, ModelSettings,
    ModelType, MsaSettings,
};
pub use script::{SCRIPT_FILE_NAME, build_script};
pub use submit::{SubmissionOutcome, SubmissionReport, submit};
