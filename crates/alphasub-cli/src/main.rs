mod cli;
mod commands;
mod config;
mod error;
mod logging;
mod paths;
mod ui;
mod utils;

use crate::cli::{Cli, Commands};
use crate::error::{CliError, Result};
use crate::paths::AppPaths;
use crate::ui::UiManager;
use clap::Parser;
use tokio::task;
use tracing::{debug, error, info, warn};

#[tokio::main]
async fn main() {
    if let Err(e) = run_app().await {
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        eprintln!("\n❌ Error: {}", e);
        std::process::exit(1);
    }
}

async fn run_app() -> Result<()> {
    let (ui_manager, ui_sender, shutdown_sender) = UiManager::new();
    let ui_handle = task::spawn(ui_manager.run());

    let cli = Cli::parse();
    logging::setup_logging(cli.verbose, cli.quiet, cli.log_file.clone())?;

    let (panic_hook, eyre_hook) = color_eyre::config::HookBuilder::default().into_hooks();
    eyre_hook.install().map_err(|e| CliError::Other(e.into()))?;
    std::panic::set_hook(Box::new(move |pi| {
        error!("{}", panic_hook.panic_report(pi));
    }));

    let command_result = async {
        info!("🚀 alphasub v{} starting up.", env!("CARGO_PKG_VERSION"));
        debug!("Full CLI arguments parsed: {:?}", &cli);

        let paths = AppPaths::resolve(cli.servers_file.clone(), cli.ssh_config.clone())?;

        match cli.command {
            Commands::Servers(args) => {
                info!("Dispatching to 'servers' command.");
                commands::servers::run(args, &paths).await
            }
            Commands::Connect(args) => {
                info!("Dispatching to 'connect' command.");
                commands::connect::run(args, &paths, ui_sender).await
            }
            Commands::Disconnect(args) => {
                info!("Dispatching to 'disconnect' command.");
                commands::disconnect::run(args, &paths).await
            }
            Commands::Script(args) => {
                info!("Dispatching to 'script' command.");
                commands::script::run(args, &paths, ui_sender).await
            }
            Commands::Submit(args) => {
                info!("Dispatching to 'submit' command.");
                commands::submit::run(args, &paths, ui_sender).await
            }
            Commands::Results(args) => {
                info!("Dispatching to 'results' command.");
                commands::results::run(args).await
            }
        }
    }
    .await;

    match &command_result {
        Ok(_) => {
            info!("✅ Command completed successfully.");
            eprintln!("✅ Command completed successfully.");
        }
        Err(e) => {
            error!("❌ Command failed: {}", e);
            eprintln!("❌ Command failed: {}", e);
        }
    }

    if shutdown_sender.send(true).is_err() {
        warn!("UI manager may have already exited before shutdown signal.");
    }

    ui_handle
        .await
        .map_err(|e| CliError::Other(anyhow::anyhow!("UI manager task failed: {}", e)))?;

    command_result
}
