use crate::remote::RemoteError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JobError {
    #[error("Missing required parameter: {0}")]
    MissingParameter(&'static str),

    #[error("Invalid job name '{0}': use letters, digits, '.', '_' or '-'")]
    InvalidJobName(String),

    #[error("{parameter} must be between {min} and {max}, got {value}")]
    OutOfRange {
        parameter: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },

    #[error("Unknown {kind} '{value}'. Expected one of: {expected}")]
    UnknownVariant {
        kind: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("The job input is empty")]
    EmptyInput,

    #[error("Invalid PBS queue {0:?}: use letters, digits, '.', '_', '-' or '@'")]
    InvalidPbsQueue(String),

    #[error("No working directory is set for server '{0}'")]
    MissingWorkdir(String),

    #[error("No GPU is selected; every device on '{0}' is busy or the query was skipped")]
    NoGpuSelected(String),

    #[error("Cannot create working directory '{workdir}': {stderr}")]
    WorkdirCreation { workdir: String, stderr: String },

    #[error("Script template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error(transparent)]
    Remote(#[from] RemoteError),
}
