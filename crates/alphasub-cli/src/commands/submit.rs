use super::open_session;
use crate::cli::SubmitArgs;
use crate::config::build_job_request;
use crate::error::Result;
use crate::paths::AppPaths;
use crate::ui::{CliProgressHandler, UiEvent};
use alphasub::job::{SubmissionOutcome, submit as submit_job};
use alphasub::progress::ProgressReporter;
use alphasub::workflows::connect::GpuSelection;
use tokio::sync::mpsc;
use tracing::{info, warn};

pub async fn run(
    args: SubmitArgs,
    paths: &AppPaths,
    ui_sender: mpsc::Sender<UiEvent>,
) -> Result<()> {
    let job = build_job_request(&args.job)?;
    info!(
        "Job '{}': alignment {}, models {}.",
        job.job_name, job.do_alignment, job.do_models
    );

    let gpu = match args.gpu {
        Some(index) => GpuSelection::Fixed(index),
        None if job.do_models => GpuSelection::Query,
        None => GpuSelection::Skip,
    };
    let session = open_session(&args.target, paths, gpu, ui_sender.clone())?;

    let progress_handler = CliProgressHandler::new(ui_sender);
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    progress_handler.log(format!(
        "Submitting '{}' to '{}'...",
        job.job_name,
        session.info().server_name
    ));
    let report = tokio::task::block_in_place(|| submit_job(&job, &session, &reporter))?;

    println!("Uploaded {} file(s) to {}.", report.uploaded.len(), report.workdir);
    match report.outcome {
        SubmissionOutcome::Submitted(output) => {
            let stdout = output.stdout.trim();
            if !stdout.is_empty() {
                println!("{stdout}");
            }
            if let Some(gpu) = session.info().gpu {
                println!("Job '{}' launched on GPU {}.", job.job_name, gpu);
            } else {
                println!("Job '{}' launched.", job.job_name);
            }
        }
        SubmissionOutcome::Staged => {
            warn!("Both stages are disabled; nothing was launched.");
            println!("Both stages are disabled: files staged, nothing launched.");
        }
    }
    Ok(())
}
