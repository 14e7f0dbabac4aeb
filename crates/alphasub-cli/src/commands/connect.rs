use super::open_session;
use crate::cli::ConnectArgs;
use crate::error::Result;
use crate::paths::AppPaths;
use crate::ui::UiEvent;
use crate::utils::table::format_gpu_table;
use alphasub::workflows::connect::GpuSelection;
use tokio::sync::mpsc;

pub async fn run(
    args: ConnectArgs,
    paths: &AppPaths,
    ui_sender: mpsc::Sender<UiEvent>,
) -> Result<()> {
    let gpu = if args.no_gpu_query {
        GpuSelection::Skip
    } else {
        GpuSelection::Query
    };
    let session = open_session(&args.target, paths, gpu, ui_sender)?;
    let info = session.info();

    println!("Connected to '{}'.", info.server_name);
    if let Some(node) = info.node {
        println!("Node: node{node}");
    }
    if info.workdir.is_empty() {
        println!("Working directory: (not set, pass --workdir when submitting)");
    } else {
        println!("Working directory: {}", info.workdir);
    }

    if !session.gpus().is_empty() {
        print!("{}", format_gpu_table(session.gpus(), info.gpu));
    }
    match (gpu, info.gpu) {
        (GpuSelection::Skip, _) => {}
        (_, Some(index)) => println!("Selected GPU: {index}"),
        (_, None) => println!("Every GPU is busy; no device selected."),
    }
    Ok(())
}
