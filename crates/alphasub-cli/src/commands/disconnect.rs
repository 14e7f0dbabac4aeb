use super::load_profile;
use crate::cli::DisconnectArgs;
use crate::error::Result;
use crate::paths::AppPaths;
use alphasub::remote::openssh::{DEFAULT_CONTROL_PERSIST_SECS, OpenSshShell};
use tracing::info;

pub async fn run(args: DisconnectArgs, paths: &AppPaths) -> Result<()> {
    let profile = load_profile(paths, &args.server)?;
    if profile.is_local() {
        println!("'{}' runs on this machine; there is no connection to close.", args.server);
        return Ok(());
    }

    info!("Stopping the control master for '{}'.", args.server);
    let shell = OpenSshShell::new(&profile, None, DEFAULT_CONTROL_PERSIST_SECS);
    tokio::task::block_in_place(|| shell.close())?;
    println!("Closed the connection to '{}'.", args.server);
    Ok(())
}
