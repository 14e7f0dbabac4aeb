use super::{LOCAL_PROFILE, ServerProfile, is_valid_pbs_queue};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("File I/O error for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("JSON parsing error for '{path}': {source}")]
    Json {
        path: String,
        source: serde_json::Error,
    },
    #[error("Unknown server '{name}'. Known servers: {known}")]
    UnknownServer { name: String, known: String },
    #[error("Server '{name}' has an invalid PBS queue {queue:?}: use letters, digits, '.', '_', '-' or '@'")]
    InvalidPbsQueue { name: String, queue: String },
}

/// All server profiles of the current user, keyed by server name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileStore {
    profiles: BTreeMap<String, ServerProfile>,
}

impl ProfileStore {
    /// Loads `path`, writing a store holding only the `local` profile first if the file
    /// does not exist yet.
    pub fn load_or_create(path: &Path) -> Result<Self, ProfileError> {
        if !path.exists() {
            info!(
                "No server file at {:?}, creating one with the default 'local' profile.",
                path
            );
            let store = Self::with_local_default();
            store.save(path)?;
            return Ok(store);
        }
        Self::load(path)
    }

    pub fn load(path: &Path) -> Result<Self, ProfileError> {
        debug!("Loading server profiles from {:?}", path);
        let content = fs::read_to_string(path).map_err(|e| ProfileError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        })?;
        let profiles: BTreeMap<String, ServerProfile> =
            serde_json::from_str(&content).map_err(|e| ProfileError::Json {
                path: path.to_string_lossy().to_string(),
                source: e,
            })?;
        for (name, profile) in &profiles {
            if let Some(queue) = &profile.pbs_queue {
                if !queue.is_empty() && !is_valid_pbs_queue(queue) {
                    return Err(ProfileError::InvalidPbsQueue {
                        name: name.clone(),
                        queue: queue.clone(),
                    });
                }
            }
        }
        Ok(Self { profiles })
    }

    pub fn save(&self, path: &Path) -> Result<(), ProfileError> {
        let io_error = |e: std::io::Error| ProfileError::Io {
            path: path.to_string_lossy().to_string(),
            source: e,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        let content = serde_json::to_string_pretty(&self.profiles).map_err(|e| {
            ProfileError::Json {
                path: path.to_string_lossy().to_string(),
                source: e,
            }
        })?;
        fs::write(path, content).map_err(io_error)
    }

    pub fn with_local_default() -> Self {
        let mut profiles = BTreeMap::new();
        profiles.insert(LOCAL_PROFILE.to_string(), ServerProfile::local_default());
        Self { profiles }
    }

    pub fn get(&self, name: &str) -> Result<&ServerProfile, ProfileError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ProfileError::UnknownServer {
                name: name.to_string(),
                known: self.names().collect::<Vec<_>>().join(", "),
            })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ServerProfile)> {
        self.profiles.iter().map(|(name, p)| (name.as_str(), p))
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn missing_file_is_created_with_local_profile() {
        let dir = tempdir().unwrap();
        let path = dir.path().join(".alphasub").join("servers.json");

        let store = ProfileStore::load_or_create(&path).unwrap();

        assert!(path.exists());
        assert_eq!(store.names().collect::<Vec<_>>(), vec!["local"]);
        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written["local"]["executor"], "bash");
        assert_eq!(written["local"]["NGPU"], 1);
        assert_eq!(written["local"]["passerelle"], "");
    }

    #[test]
    fn existing_file_is_loaded_untouched() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("servers.json");
        let content = r#"{
            "cluster": {"passerelle": "gw", "server": "login01", "user": "bob", "NGPU": 8},
            "workstation": {"passerelle": "", "server": "ws42", "user": "bob"}
        }"#;
        fs::write(&path, content).unwrap();

        let store = ProfileStore::load_or_create(&path).unwrap();

        assert_eq!(store.len(), 2);
        assert_eq!(store.get("cluster").unwrap().gpu_count, 8);
        assert_eq!(store.get("workstation").unwrap().address, "ws42");
        assert_eq!(fs::read_to_string(&path).unwrap(), content);
    }

    #[test]
    fn unknown_server_lists_known_names() {
        let store = ProfileStore::with_local_default();
        let err = store.get("cluster").unwrap_err();
        match err {
            ProfileError::UnknownServer { name, known } => {
                assert_eq!(name, "cluster");
                assert_eq!(known, "local");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn malformed_json_reports_the_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("servers.json");
        fs::write(&path, "{ not json").unwrap();

        let err = ProfileStore::load(&path).unwrap_err();
        assert!(matches!(err, ProfileError::Json { .. }));
        assert!(err.to_string().contains("servers.json"));
    }

    #[test]
    fn queue_with_shell_syntax_is_rejected_on_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("servers.json");
        fs::write(
            &path,
            r#"{"cluster": {"server": "login01", "pbsQueue": "gpu\ntouch /tmp/pwned"}}"#,
        )
        .unwrap();

        match ProfileStore::load(&path).unwrap_err() {
            ProfileError::InvalidPbsQueue { name, queue } => {
                assert_eq!(name, "cluster");
                assert_eq!(queue, "gpu\ntouch /tmp/pwned");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn plain_and_empty_queues_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("servers.json");
        fs::write(
            &path,
            r#"{"a": {"server": "h1", "pbsQueue": "alphafold@pbs01"}, "b": {"server": "h2", "pbsQueue": ""}}"#,
        )
        .unwrap();

        let store = ProfileStore::load(&path).unwrap();
        assert_eq!(
            store.get("a").unwrap().pbs_queue.as_deref(),
            Some("alphafold@pbs01")
        );
    }
}
