use super::{load_profile, open_session};
use crate::cli::ScriptArgs;
use crate::config::build_job_request;
use crate::error::{CliError, Result};
use crate::paths::AppPaths;
use crate::ui::UiEvent;
use alphasub::job::build_script;
use alphasub::remote::SessionInfo;
use alphasub::workflows::connect::GpuSelection;
use std::fs;
use tokio::sync::mpsc;
use tracing::info;

pub async fn run(
    args: ScriptArgs,
    paths: &AppPaths,
    ui_sender: mpsc::Sender<UiEvent>,
) -> Result<()> {
    let job = build_job_request(&args.job)?;

    let info = if args.gpu.is_some() || !job.do_models {
        info!("Rendering the script without connecting.");
        let profile = load_profile(paths, &args.target.server)?;
        let node = args.target.node.or_else(|| profile.default_node());
        let mut info = SessionInfo::new(&args.target.server, profile)
            .with_node(node)
            .with_gpu(args.gpu);
        if let Some(workdir) = &args.target.workdir {
            info.workdir = workdir.clone();
        }
        info
    } else {
        let session = open_session(&args.target, paths, GpuSelection::Query, ui_sender)?;
        session.info().clone()
    };

    let script = build_script(&job, &info)?;

    match &args.output {
        Some(path) => {
            fs::write(path, &script).map_err(|e| CliError::FileWrite {
                path: path.clone(),
                source: e,
            })?;
            println!("Script for '{}' written to: {}", job.job_name, path.display());
        }
        None => print!("{script}"),
    }
    Ok(())
}
