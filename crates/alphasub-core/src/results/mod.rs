//! # Results Module
//!
//! Browses the output of finished jobs: [`discovery`] maps a working directory onto jobs
//! and models, [`scores`] and [`structure`] read colabfold's JSON and PDB output, and
//! [`render`] turns one model into a PAE heatmap plus a text summary.
//!
//! The browser works on a local path. A remote working directory is browsed through a
//! mount or after copying it back.

pub mod discovery;
pub mod error;
pub mod heatmap;
pub mod render;
pub mod scores;
pub mod structure;

pub use discovery::{
    JobArtifacts, ModelSet, PREDICTIONS_DIR, discover_jobs, discover_models, find_job,
};
pub use error::{PdbParseErrorKind, ResultsError};
pub use render::{PlotFile, RenderedArtifacts, render_artifacts};
pub use scores::{PaeMatrix, ScoreFile, scores_file_name};
pub use structure::{ChainSummary, StructureSummary};
