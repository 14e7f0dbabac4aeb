use crate::cli::InputArgs;
use crate::error::{CliError, Result};
use alphasub::job::{AlignmentFile, JobInput};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

/// Reads the query input named on the command line.
pub fn read_job_input(args: &InputArgs) -> Result<JobInput> {
    if let Some(sequence) = &args.sequence {
        return Ok(JobInput::Sequence(sequence.clone()));
    }

    if let Some(path) = &args.fasta {
        info!("Reading query sequences from {:?}", path);
        let contents = fs::read_to_string(path).map_err(|e| CliError::FileRead {
            path: path.clone(),
            source: e,
        })?;
        return Ok(JobInput::Fasta(contents));
    }

    if !args.a3m.is_empty() {
        let alignments = args
            .a3m
            .iter()
            .map(|path| read_alignment(path))
            .collect::<Result<Vec<_>>>()?;
        info!("Read {} pre-computed alignment(s).", alignments.len());
        return Ok(JobInput::Alignments(alignments));
    }

    Err(CliError::Argument(
        "One of --sequence, --fasta or --a3m is required.".to_string(),
    ))
}

fn read_alignment(path: &Path) -> Result<AlignmentFile> {
    debug!("Reading alignment {:?}", path);
    let contents = fs::read(path).map_err(|e| CliError::FileRead {
        path: path.to_path_buf(),
        source: e,
    })?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| CliError::Argument(format!("'{}' is not a file", path.display())))?;
    Ok(AlignmentFile { name, contents })
}

pub fn prompt_password(destination: &str) -> Result<String> {
    let password = rpassword::prompt_password(format!("Password for {destination}: "))?;
    Ok(password)
}
