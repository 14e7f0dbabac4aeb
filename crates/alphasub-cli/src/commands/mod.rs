pub mod connect;
pub mod disconnect;
pub mod results;
pub mod script;
pub mod servers;
pub mod submit;

use crate::cli::TargetArgs;
use crate::error::Result;
use crate::paths::AppPaths;
use crate::ui::{CliProgressHandler, UiEvent};
use crate::utils::input::prompt_password;
use alphasub::profile::{ProfileStore, ServerProfile};
use alphasub::progress::ProgressReporter;
use alphasub::remote::{ConnectOptions, Session};
use alphasub::workflows::connect::{self as connect_workflow, GpuSelection};
use tokio::sync::mpsc;
use tracing::info;

pub(crate) fn load_profile(paths: &AppPaths, name: &str) -> Result<ServerProfile> {
    let store = ProfileStore::load_or_create(&paths.servers_file)?;
    Ok(store.get(name)?.clone())
}

/// Opens a session on the target server and chooses its GPU, then applies the
/// working-directory override.
pub(crate) fn open_session(
    target: &TargetArgs,
    paths: &AppPaths,
    gpu: GpuSelection,
    ui_sender: mpsc::Sender<UiEvent>,
) -> Result<Session> {
    let profile = load_profile(paths, &target.server)?;

    let password = if target.ask_password && !profile.is_local() {
        Some(prompt_password(&profile.destination())?)
    } else {
        None
    };
    let options = ConnectOptions {
        password,
        ssh_config_path: Some(paths.ssh_config.clone()),
        node: target.node,
        ..ConnectOptions::default()
    };

    let progress_handler = CliProgressHandler::new(ui_sender);
    let reporter = ProgressReporter::with_callback(progress_handler.get_callback());

    info!("Invoking the connect workflow for '{}'.", target.server);
    let mut session = tokio::task::block_in_place(|| {
        connect_workflow::run(&target.server, &profile, &options, gpu, &reporter)
    })?;

    if let Some(workdir) = &target.workdir {
        info!("Overriding the working directory with '{}'.", workdir);
        session.info_mut().workdir = workdir.clone();
    }
    Ok(session)
}
