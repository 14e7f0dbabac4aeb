use crate::cli::{ServersArgs, ServersCommands};
use crate::error::{CliError, Result};
use crate::paths::AppPaths;
use crate::utils::table::format_profile_list;
use alphasub::profile::ProfileStore;
use tracing::info;

pub async fn run(args: ServersArgs, paths: &AppPaths) -> Result<()> {
    match args.command {
        ServersCommands::List => {
            let store = ProfileStore::load_or_create(&paths.servers_file)?;
            info!("Listing {} server profile(s).", store.len());
            print!("{}", format_profile_list(store.iter()));
        }
        ServersCommands::Show { name } => {
            let store = ProfileStore::load_or_create(&paths.servers_file)?;
            let profile = store.get(&name)?;
            let json = serde_json::to_string_pretty(profile)
                .map_err(|e| CliError::Other(e.into()))?;
            println!("{json}");
        }
        ServersCommands::Path => {
            println!("{}", paths.servers_file.display());
        }
    }
    Ok(())
}
