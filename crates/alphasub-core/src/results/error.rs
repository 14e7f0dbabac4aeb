use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ResultsError {
    #[error("No 'predictions' folder in {path}")]
    MissingPredictions { path: PathBuf },

    #[error("No job folders or alignment files in {path}")]
    NoJobs { path: PathBuf },

    #[error("No relaxed or unrelaxed models in {path}")]
    NoModels { path: PathBuf },

    #[error("Unknown job '{id}'. Known jobs: {known}")]
    UnknownJob { id: String, known: String },

    #[error("Unknown model '{model}' for job '{job}'")]
    UnknownModel { job: String, model: String },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid score file {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid PAE matrix in {path}: {reason}")]
    InvalidPae { path: PathBuf, reason: String },

    #[error("Cannot draw the PAE heatmap {path}: {reason}")]
    Plot { path: PathBuf, reason: String },

    #[error("Parse error in {path} on line {line}: {kind}")]
    Pdb {
        path: PathBuf,
        line: usize,
        kind: PdbParseErrorKind,
    },
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PdbParseErrorKind {
    #[error("ATOM record is too short (must reach column {required})")]
    LineTooShort { required: usize },
    #[error("Invalid integer in columns {columns} (value: '{value}')")]
    InvalidInt { columns: &'static str, value: String },
    #[error("Invalid float in columns {columns} (value: '{value}')")]
    InvalidFloat { columns: &'static str, value: String },
}

impl ResultsError {
    pub(crate) fn io(path: impl Into<PathBuf>) -> impl FnOnce(std::io::Error) -> Self {
        let path = path.into();
        move |source| ResultsError::Io { path, source }
    }
}
