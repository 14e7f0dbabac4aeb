use crate::profile::ServerProfile;
use crate::progress::{Progress, ProgressReporter};
use crate::remote::{ConnectOptions, RemoteError, Session, connect};
use tracing::{info, instrument, warn};

/// How the session's GPU is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GpuSelection {
    /// Query `nvidia-smi` and take the idlest device.
    #[default]
    Query,
    /// Use this index without querying.
    Fixed(u32),
    /// Leave the GPU unset; only alignment-only jobs can be submitted.
    Skip,
}

#[instrument(skip_all, name = "connect_workflow", fields(server = server_name))]
pub fn run(
    server_name: &str,
    profile: &ServerProfile,
    options: &ConnectOptions,
    gpu: GpuSelection,
    reporter: &ProgressReporter,
) -> Result<Session, RemoteError> {
    reporter.report(Progress::PhaseStart { name: "Connecting" });
    info!("Connecting to '{}' ({}).", server_name, profile.destination());
    let mut session = connect(server_name, profile, options)?;
    reporter.report(Progress::PhaseFinish);

    prepare(&mut session, gpu, reporter)?;
    Ok(session)
}

/// Everything after the connection itself: node access, GPU choice and a round trip.
pub fn prepare(
    session: &mut Session,
    gpu: GpuSelection,
    reporter: &ProgressReporter,
) -> Result<(), RemoteError> {
    let on_cluster = session.info().node.is_some() && !session.info().profile.is_local();
    if on_cluster {
        reporter.report(Progress::PhaseStart {
            name: "Authorizing node access",
        });
        session.authorize_node_access()?;
        reporter.report(Progress::PhaseFinish);
    }

    match gpu {
        GpuSelection::Query => {
            reporter.report(Progress::PhaseStart {
                name: "Selecting GPU",
            });
            let selected = session.select_free_gpu()?;
            reporter.report(Progress::PhaseFinish);
            if selected.is_none() {
                warn!("Every GPU is busy; submit with --gpu to force a device.");
            }
        }
        GpuSelection::Fixed(index) => {
            info!("Using GPU {} without querying.", index);
            session.info_mut().gpu = Some(index);
        }
        GpuSelection::Skip => {}
    }

    let hostname = session.hostname()?;
    reporter.report(Progress::Message(format!("Connected to {hostname}")));
    info!("Connected to {}.", hostname);
    Ok(())
}
