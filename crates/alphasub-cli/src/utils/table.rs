use alphasub::profile::ServerProfile;
use alphasub::remote::gpu::GpuDevice;
use std::fmt::Write;

const SELECTED_MARKER: &str = "*";

/// One line per GPU; the selected device is starred.
pub fn format_gpu_table(devices: &[GpuDevice], selected: Option<u32>) -> String {
    let mut out = String::new();
    let name_width = devices
        .iter()
        .map(|d| d.name.len())
        .max()
        .unwrap_or(0)
        .max("NAME".len());

    let _ = writeln!(
        out,
        "  {:>5}  {:<name_width$}  {:>10}  {:>10}  {:>5}",
        "INDEX", "NAME", "USED MiB", "TOTAL MiB", "UTIL"
    );
    for device in devices {
        let marker = if selected == Some(device.index) {
            SELECTED_MARKER
        } else {
            " "
        };
        let util = device
            .utilization_percent
            .map(|u| format!("{u}%"))
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "{} {:>5}  {:<name_width$}  {:>10}  {:>10}  {:>5}",
            marker, device.index, device.name, device.used_mib, device.total_mib, util
        );
    }
    out
}

/// One line per profile: name, destination and executor.
pub fn format_profile_list<'a>(
    profiles: impl IntoIterator<Item = (&'a str, &'a ServerProfile)>,
) -> String {
    let mut out = String::new();
    for (name, profile) in profiles {
        let destination = if profile.is_local() {
            "(this machine)".to_string()
        } else if profile.uses_proxy() {
            format!("{} via {}", profile.destination(), profile.proxy_address)
        } else {
            profile.destination()
        };
        let _ = writeln!(
            out,
            "{:<16} {:<40} {:<6} {} GPU(s)",
            name, destination, profile.executor, profile.gpu_count
        );
    }
    out
}
