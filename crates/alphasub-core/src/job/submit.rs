use super::error::JobError;
use super::request::{JobInput, JobRequest};
use super::script::{SCRIPT_FILE_NAME, build_script};
use crate::progress::{Progress, ProgressReporter};
use crate::remote::{CommandOutput, Session, shell_quote};
use tracing::{info, warn};

const MSA_DIR: &str = "msas";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionOutcome {
    /// The executor accepted the script; for `qsub` the output holds the job id.
    Submitted(CommandOutput),
    /// Both stages were disabled, so the files were staged and nothing ran.
    Staged,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionReport {
    pub workdir: String,
    /// Remote paths written, script first.
    pub uploaded: Vec<String>,
    pub outcome: SubmissionOutcome,
}

fn remote_join(dir: &str, name: &str) -> String {
    format!("{}/{}", dir.trim_end_matches('/'), name)
}

/// Stages `job` in the session's working directory and hands the script to the profile's
/// executor.
///
/// The script is rendered before anything touches the host, so a configuration error
/// leaves the working directory alone. Any later failure aborts the submission and
/// leaves whatever was already uploaded in place.
pub fn submit(
    job: &JobRequest,
    session: &Session,
    reporter: &ProgressReporter,
) -> Result<SubmissionReport, JobError> {
    let info = session.info();
    let script = build_script(job, info)?;
    let workdir = info.workdir.clone();

    reporter.report(Progress::PhaseStart {
        name: "Staging files",
    });

    let mut mkdir = format!("mkdir -p {}", shell_quote(&workdir));
    if matches!(job.input, JobInput::Alignments(_)) {
        mkdir.push(' ');
        mkdir.push_str(&shell_quote(&remote_join(&workdir, MSA_DIR)));
    }
    let output = session.run_command(&mkdir, None)?;
    if !output.success() {
        return Err(JobError::WorkdirCreation {
            workdir,
            stderr: output.stderr.trim().to_string(),
        });
    }

    let mut files: Vec<(String, Vec<u8>)> = vec![(
        remote_join(&workdir, SCRIPT_FILE_NAME),
        script.into_bytes(),
    )];
    match &job.input {
        JobInput::Sequence(_) | JobInput::Fasta(_) => {
            if let Some(fasta) = job.fasta_contents() {
                files.push((
                    remote_join(&workdir, &job.fasta_file_name()),
                    fasta.into_bytes(),
                ));
            }
        }
        JobInput::Alignments(alignments) => {
            let msa_dir = remote_join(&workdir, MSA_DIR);
            for alignment in alignments {
                files.push((
                    remote_join(&msa_dir, &alignment.remote_name()),
                    alignment.contents.clone(),
                ));
            }
        }
    }

    reporter.report(Progress::TaskStart {
        total_steps: files.len() as u64,
    });
    let mut uploaded = Vec::with_capacity(files.len());
    for (path, contents) in files {
        reporter.report(Progress::Message(format!("Uploading {path}")));
        session.upload(&contents, &path)?;
        info!("Uploaded {} ({} bytes).", path, contents.len());
        uploaded.push(path);
        reporter.report(Progress::TaskIncrement);
    }
    reporter.report(Progress::TaskFinish);
    reporter.report(Progress::PhaseFinish);

    if !job.has_work() {
        warn!("Alignment and model stages are both disabled; the job was staged but not run.");
        return Ok(SubmissionReport {
            workdir,
            uploaded,
            outcome: SubmissionOutcome::Staged,
        });
    }

    reporter.report(Progress::PhaseStart {
        name: "Launching job",
    });
    let command = format!("{} {}", info.profile.executor, SCRIPT_FILE_NAME);
    let output = session
        .run_command(&command, Some(&workdir))?
        .check(&command)?;
    reporter.report(Progress::PhaseFinish);
    info!("Job '{}' launched with `{}`.", job.job_name, command);

    Ok(SubmissionReport {
        workdir,
        uploaded,
        outcome: SubmissionOutcome::Submitted(output),
    })
}
