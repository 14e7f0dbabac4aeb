use crate::error::{CliError, Result};
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileMsaConfig {
    pub sensitivity: Option<u8>,
    pub db1: Option<String>,
    pub db3: Option<String>,
    pub use_env: Option<bool>,
    pub use_templates: Option<bool>,
    pub filter: Option<bool>,
    pub expand_eval: Option<String>,
    pub align_eval: Option<u32>,
    pub diff: Option<bool>,
    pub qsc: Option<f64>,
    pub max_accept: Option<u32>,
    pub db_load_mode: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileModelConfig {
    pub model_type: Option<String>,
    pub num_models: Option<u8>,
    pub num_recycle: Option<u8>,
    pub oligomer_count: Option<u8>,
    pub relax: Option<bool>,
    pub gpu_relax: Option<bool>,
}

/// The job parameter file.
///
/// ```toml
/// job-name = "ns5a"
/// do-alignment = true
///
/// [msa]
/// sensitivity = 8
/// db-load-mode = "mmap"
///
/// [model]
/// model-type = "AlphaFold2-multimer-v2"
/// num-recycle = 6
/// ```
#[derive(Deserialize, Debug, Default, Clone, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct FileJobConfig {
    pub job_name: Option<String>,
    pub do_alignment: Option<bool>,
    pub do_models: Option<bool>,
    pub msa: Option<FileMsaConfig>,
    pub model: Option<FileModelConfig>,
}

impl FileJobConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        debug!("Loading job parameters from file: {:?}", path);
        let content = std::fs::read_to_string(path).map_err(|e| CliError::FileRead {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| CliError::FileParsing {
            path: path.to_path_buf(),
            source: e.into(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn full_file_is_parsed() {
        let content = r#"
            job-name = "ns5a"
            do-models = false

            [msa]
            sensitivity = 6
            use-env = true
            qsc = -10.5
            db-load-mode = "mmap (2)"

            [model]
            model-type = "AlphaFold2-ptm"
            oligomer-count = 2
            gpu-relax = false
        "#;
        let config: FileJobConfig = toml::from_str(content).unwrap();

        assert_eq!(config.job_name.as_deref(), Some("ns5a"));
        assert_eq!(config.do_models, Some(false));
        assert_eq!(config.do_alignment, None);
        let msa = config.msa.unwrap();
        assert_eq!(msa.sensitivity, Some(6));
        assert_eq!(msa.use_env, Some(true));
        assert_eq!(msa.qsc, Some(-10.5));
        assert_eq!(msa.db_load_mode.as_deref(), Some("mmap (2)"));
        let model = config.model.unwrap();
        assert_eq!(model.model_type.as_deref(), Some("AlphaFold2-ptm"));
        assert_eq!(model.oligomer_count, Some(2));
        assert_eq!(model.gpu_relax, Some(false));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let temp = tempdir().unwrap();
        let path = temp.path().join("job.toml");
        fs::write(&path, "[model]\nnum-modles = 3\n").unwrap();

        let result = FileJobConfig::from_file(&path);
        assert!(matches!(result, Err(CliError::FileParsing { .. })));
    }

    #[test]
    fn missing_file_names_the_path() {
        let result = FileJobConfig::from_file(Path::new("/nonexistent/job.toml"));
        match result {
            Err(CliError::FileRead { path, .. }) => {
                assert_eq!(path, Path::new("/nonexistent/job.toml"))
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
