//! Reading and appending `Host` blocks of an OpenSSH client configuration file.
//!
//! Only exact host aliases are matched; wildcard patterns and `Match` blocks are treated as
//! block boundaries and never resolved.

use super::ServerProfile;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

const SERVER_ALIVE_INTERVAL_SECS: u32 = 60;

#[derive(Debug, Error)]
pub enum SshConfigError {
    #[error("SSH config I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEntryStatus {
    Created,
    Appended,
    AlreadyPresent,
    Skipped,
}

/// Proxy command used when the SSH config has none for the host. Without a user, the
/// gateway login falls back to the local user name.
pub fn default_proxy_command(profile: &ServerProfile) -> String {
    let gateway = if profile.user.is_empty() {
        profile.proxy_address.clone()
    } else {
        format!("{}@{}", profile.user, profile.proxy_address)
    };
    format!("ssh -q {} nc {} %p", gateway, profile.address)
}

pub fn host_entry(alias: &str, profile: &ServerProfile) -> String {
    let mut entry = format!("Host {alias}\n");
    entry.push_str(&format!("    HostName {}\n", profile.address));
    entry.push_str(&format!("    User {}\n", profile.user));
    if profile.port != 22 {
        entry.push_str(&format!("    Port {}\n", profile.port));
    }
    if let Some(identity) = &profile.identity_file {
        entry.push_str(&format!("    IdentityFile {}\n", identity.display()));
    }
    if profile.uses_proxy() {
        entry.push_str(&format!(
            "    ProxyCommand {}\n",
            default_proxy_command(profile)
        ));
    }
    entry.push_str(&format!(
        "    ServerAliveInterval {SERVER_ALIVE_INTERVAL_SECS}\n"
    ));
    entry
}

/// Appends a `Host` block for `alias` unless one exists. Never rewrites existing content.
pub fn ensure_host_entry(
    path: &Path,
    alias: &str,
    profile: &ServerProfile,
) -> Result<HostEntryStatus, SshConfigError> {
    if profile.user.is_empty() {
        warn!(
            "Server '{}' has no user configured; leaving {:?} untouched.",
            alias, path
        );
        return Ok(HostEntryStatus::Skipped);
    }

    let io_error = |e: std::io::Error| SshConfigError::Io {
        path: path.to_string_lossy().to_string(),
        source: e,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_error)?;
    }

    if !path.exists() {
        info!("Creating {:?} with an entry for '{}'.", path, alias);
        fs::write(path, host_entry(alias, profile)).map_err(io_error)?;
        return Ok(HostEntryStatus::Created);
    }

    let content = fs::read_to_string(path).map_err(io_error)?;
    if has_host_entry(&content, alias) {
        debug!("{:?} already has an entry for '{}'.", path, alias);
        return Ok(HostEntryStatus::AlreadyPresent);
    }

    info!("Appending an entry for '{}' to {:?}.", alias, path);
    let mut file = OpenOptions::new()
        .append(true)
        .open(path)
        .map_err(io_error)?;
    let separator = if content.is_empty() || content.ends_with('\n') {
        ""
    } else {
        "\n"
    };
    write!(file, "{separator}{}", host_entry(alias, profile)).map_err(io_error)?;
    Ok(HostEntryStatus::Appended)
}

pub fn has_host_entry(content: &str, alias: &str) -> bool {
    content.lines().any(|line| {
        split_directive(line)
            .is_some_and(|(key, value)| key == "host" && value.split_whitespace().any(|p| p == alias))
    })
}

/// Returns the `ProxyCommand` declared in the `Host` block matching `alias`.
pub fn lookup_proxy_command(content: &str, alias: &str) -> Option<String> {
    let mut in_block = false;
    for line in content.lines() {
        let Some((key, value)) = split_directive(line) else {
            continue;
        };
        match key.as_str() {
            "host" => in_block = value.split_whitespace().any(|p| p == alias),
            "match" => in_block = false,
            "proxycommand" if in_block => return Some(value.to_string()),
            _ => {}
        }
    }
    None
}

pub fn read_proxy_command(path: &Path, alias: &str) -> Result<Option<String>, SshConfigError> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path).map_err(|e| SshConfigError::Io {
        path: path.to_string_lossy().to_string(),
        source: e,
    })?;
    Ok(lookup_proxy_command(&content, alias))
}

fn split_directive(line: &str) -> Option<(String, &str)> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }
    let split_at = trimmed.find(|c: char| c.is_whitespace() || c == '=')?;
    let (key, rest) = trimmed.split_at(split_at);
    let value = rest.trim_start_matches(|c: char| c.is_whitespace() || c == '=').trim();
    if value.is_empty() {
        return None;
    }
    Some((key.to_ascii_lowercase(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn proxied_profile() -> ServerProfile {
        ServerProfile {
            proxy_address: "gateway.example.org".to_string(),
            address: "cluster.example.org".to_string(),
            user: "alice".to_string(),
            ..ServerProfile::local_default()
        }
    }

    #[test]
    fn host_entry_contains_proxy_command() {
        let entry = host_entry("cluster", &proxied_profile());
        assert!(entry.starts_with("Host cluster\n"));
        assert!(entry.contains("    User alice\n"));
        assert!(entry.contains(
            "    ProxyCommand ssh -q alice@gateway.example.org nc cluster.example.org %p\n"
        ));
        assert!(entry.contains("ServerAliveInterval 60"));
        assert!(!entry.contains("Port"));
    }

    #[test]
    fn proxy_command_without_user_has_no_empty_login() {
        let profile = ServerProfile {
            proxy_address: "gw.example".to_string(),
            address: "10.0.0.5".to_string(),
            user: String::new(),
            ..ServerProfile::local_default()
        };

        let command = default_proxy_command(&profile);

        assert_eq!(command, "ssh -q gw.example nc 10.0.0.5 %p");
        assert!(!command.contains('@'));
        assert_eq!(
            default_proxy_command(&proxied_profile()),
            "ssh -q alice@gateway.example.org nc cluster.example.org %p"
        );
    }

    #[test]
    fn ensure_creates_missing_file_and_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".ssh").join("config");

        let status = ensure_host_entry(&path, "cluster", &proxied_profile()).unwrap();

        assert_eq!(status, HostEntryStatus::Created);
        let content = fs::read_to_string(&path).unwrap();
        assert!(has_host_entry(&content, "cluster"));
    }

    #[test]
    fn ensure_appends_without_overwriting() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config");
        fs::write(&path, "Host other\n    User bob").unwrap();

        let status = ensure_host_entry(&path, "cluster", &proxied_profile()).unwrap();

        assert_eq!(status, HostEntryStatus::Appended);
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("Host other\n    User bob\nHost cluster\n"));
    }

    #[test]
    fn ensure_is_idempotent() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config");
        ensure_host_entry(&path, "cluster", &proxied_profile()).unwrap();
        let first = fs::read_to_string(&path).unwrap();

        let status = ensure_host_entry(&path, "cluster", &proxied_profile()).unwrap();

        assert_eq!(status, HostEntryStatus::AlreadyPresent);
        assert_eq!(fs::read_to_string(&path).unwrap(), first);
    }

    #[test]
    fn ensure_skips_profiles_without_user() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config");
        let profile = ServerProfile {
            user: String::new(),
            ..proxied_profile()
        };

        let status = ensure_host_entry(&path, "cluster", &profile).unwrap();

        assert_eq!(status, HostEntryStatus::Skipped);
        assert!(!path.exists());
    }

    #[test]
    fn proxy_lookup_is_scoped_to_the_matching_block() {
        let content = "\
# comment
Host first
    ProxyCommand ssh -q gw1 nc first %p
Host cluster login
    User alice
    proxycommand=ssh -q gw2 nc cluster %p
Host *
    ServerAliveInterval 30
";
        assert_eq!(
            lookup_proxy_command(content, "cluster").as_deref(),
            Some("ssh -q gw2 nc cluster %p")
        );
        assert_eq!(
            lookup_proxy_command(content, "login").as_deref(),
            Some("ssh -q gw2 nc cluster %p")
        );
        assert_eq!(lookup_proxy_command(content, "elsewhere"), None);
        assert!(!has_host_entry(content, "clust"));
    }
}
