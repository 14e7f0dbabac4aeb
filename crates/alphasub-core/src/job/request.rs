use super::error::JobError;
use phf::phf_map;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tracing::warn;

const SENSITIVITY_RANGE: (i64, i64) = (1, 10);
const NUM_MODELS_RANGE: (i64, i64) = (1, 5);
const NUM_RECYCLE_RANGE: (i64, i64) = (0, 12);
const OLIGOMER_RANGE: (i64, i64) = (1, 6);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ModelType {
    #[default]
    Auto,
    AlphaFold2Ptm,
    AlphaFold2MultimerV1,
    AlphaFold2MultimerV2,
}

static MODEL_TYPES: phf::Map<&'static str, ModelType> = phf_map! {
    "auto" => ModelType::Auto,
    "alphafold2-ptm" => ModelType::AlphaFold2Ptm,
    "alphafold2-multimer-v1" => ModelType::AlphaFold2MultimerV1,
    "alphafold2-multimer-v2" => ModelType::AlphaFold2MultimerV2,
};

impl ModelType {
    /// The `--model-type` value understood by `colabfold_batch`.
    pub fn as_str(&self) -> &'static str {
        match self {
            ModelType::Auto => "auto",
            ModelType::AlphaFold2Ptm => "AlphaFold2-ptm",
            ModelType::AlphaFold2MultimerV1 => "AlphaFold2-multimer-v1",
            ModelType::AlphaFold2MultimerV2 => "AlphaFold2-multimer-v2",
        }
    }
}

impl FromStr for ModelType {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MODEL_TYPES
            .get(s.trim().to_ascii_lowercase().as_str())
            .copied()
            .ok_or_else(|| JobError::UnknownVariant {
                kind: "model type",
                value: s.to_string(),
                expected: "auto, AlphaFold2-ptm, AlphaFold2-multimer-v1, AlphaFold2-multimer-v2",
            })
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How MMseqs2 reads its databases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DbLoadMode {
    /// Plain reads; fastest when the databases are not in the page cache.
    #[default]
    Fread,
    /// Memory-mapped; fastest when the databases are already cached.
    Mmap,
}

static DB_LOAD_MODES: phf::Map<&'static str, DbLoadMode> = phf_map! {
    "fread" => DbLoadMode::Fread,
    "fread (3)" => DbLoadMode::Fread,
    "3" => DbLoadMode::Fread,
    "mmap" => DbLoadMode::Mmap,
    "mmap (2)" => DbLoadMode::Mmap,
    "2" => DbLoadMode::Mmap,
};

impl DbLoadMode {
    /// The numeric `--db-load-mode` passed to `colabfold_search`.
    pub fn code(&self) -> u8 {
        match self {
            DbLoadMode::Fread => 3,
            DbLoadMode::Mmap => 2,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DbLoadMode::Fread => "fread",
            DbLoadMode::Mmap => "mmap",
        }
    }
}

impl FromStr for DbLoadMode {
    type Err = JobError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        DB_LOAD_MODES
            .get(s.trim().to_ascii_lowercase().as_str())
            .copied()
            .ok_or_else(|| JobError::UnknownVariant {
                kind: "database load mode",
                value: s.to_string(),
                expected: "fread (3), mmap (2)",
            })
    }
}

/// A pre-computed alignment to upload into `msas/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlignmentFile {
    pub name: String,
    pub contents: Vec<u8>,
}

impl AlignmentFile {
    /// File name used on the host: directory components dropped, spaces turned into
    /// underscores, single quotes removed.
    pub fn remote_name(&self) -> String {
        let base = Path::new(&self.name)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.name.clone());
        base.replace(' ', "_").replace('\'', "")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobInput {
    /// One pasted sequence, with or without a FASTA header.
    Sequence(String),
    /// A FASTA file holding one or more query sequences, without alignments.
    Fasta(String),
    /// A3M alignments computed beforehand; the search stage is skipped.
    Alignments(Vec<AlignmentFile>),
}

impl JobInput {
    fn is_empty(&self) -> bool {
        match self {
            JobInput::Sequence(s) | JobInput::Fasta(s) => s.trim().is_empty(),
            JobInput::Alignments(files) => files.is_empty(),
        }
    }
}

/// Settings for the MMseqs2 search stage (`colabfold_search`).
#[derive(Debug, Clone, PartialEq)]
pub struct MsaSettings {
    pub sensitivity: u8,
    pub db1: String,
    pub db3: String,
    pub use_env: bool,
    pub use_templates: bool,
    pub filter: bool,
    pub expand_eval: String,
    pub align_eval: u32,
    pub diff: bool,
    pub qsc: f64,
    pub max_accept: u32,
    pub db_load_mode: DbLoadMode,
}

impl Default for MsaSettings {
    fn default() -> Self {
        Self {
            sensitivity: 8,
            db1: "uniref30_2103_db".to_string(),
            db3: "colabfold_envdb_202108_db".to_string(),
            use_env: false,
            use_templates: false,
            filter: true,
            expand_eval: "inf".to_string(),
            align_eval: 10,
            diff: false,
            qsc: -20.0,
            max_accept: 10,
            db_load_mode: DbLoadMode::Fread,
        }
    }
}

/// Settings for the structure-prediction stage (`colabfold_batch`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSettings {
    pub model_type: ModelType,
    pub num_models: u8,
    pub num_recycle: u8,
    pub oligomer_count: u8,
    pub relax: bool,
    pub gpu_relax: bool,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            model_type: ModelType::Auto,
            num_models: 5,
            num_recycle: 3,
            oligomer_count: 1,
            relax: true,
            gpu_relax: true,
        }
    }
}

impl ModelSettings {
    /// Extra `colabfold_batch` flags for Amber relaxation.
    pub fn relax_flags(&self) -> &'static str {
        match (self.relax, self.gpu_relax) {
            (true, true) => "--amber --use-gpu-relax",
            (true, false) => "--amber",
            (false, _) => "",
        }
    }
}

/// Everything one submission needs besides the session.
#[derive(Debug, Clone, PartialEq)]
pub struct JobRequest {
    pub job_name: String,
    pub input: JobInput,
    pub do_alignment: bool,
    pub do_models: bool,
    pub msa: MsaSettings,
    pub model: ModelSettings,
}

impl JobRequest {
    pub fn builder() -> JobRequestBuilder {
        JobRequestBuilder::new()
    }

    pub fn fasta_file_name(&self) -> String {
        format!("{}.fasta", self.job_name)
    }

    /// FASTA text to upload, or `None` for alignment inputs. A pasted sequence without a
    /// header gets `>job_name`.
    pub fn fasta_contents(&self) -> Option<String> {
        let text = match &self.input {
            JobInput::Sequence(seq) => {
                let seq = seq.trim();
                if seq.starts_with('>') {
                    seq.to_string()
                } else {
                    format!(">{}\n{}", self.job_name, seq)
                }
            }
            JobInput::Fasta(content) => content.trim_end().to_string(),
            JobInput::Alignments(_) => return None,
        };
        Some(format!("{text}\n"))
    }

    /// Whether the script will run any stage at all.
    pub fn has_work(&self) -> bool {
        self.do_alignment || self.do_models
    }
}

#[derive(Debug, Default)]
pub struct JobRequestBuilder {
    job_name: Option<String>,
    input: Option<JobInput>,
    do_alignment: Option<bool>,
    do_models: Option<bool>,
    msa: Option<MsaSettings>,
    model: Option<ModelSettings>,
}

impl JobRequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn job_name(mut self, name: impl Into<String>) -> Self {
        self.job_name = Some(name.into());
        self
    }
    pub fn input(mut self, input: JobInput) -> Self {
        self.input = Some(input);
        self
    }
    pub fn do_alignment(mut self, enabled: bool) -> Self {
        self.do_alignment = Some(enabled);
        self
    }
    pub fn do_models(mut self, enabled: bool) -> Self {
        self.do_models = Some(enabled);
        self
    }
    pub fn msa(mut self, settings: MsaSettings) -> Self {
        self.msa = Some(settings);
        self
    }
    pub fn model(mut self, settings: ModelSettings) -> Self {
        self.model = Some(settings);
        self
    }

    pub fn build(self) -> Result<JobRequest, JobError> {
        let job_name = self
            .job_name
            .ok_or(JobError::MissingParameter("job_name"))?;
        validate_job_name(&job_name)?;

        let input = self.input.ok_or(JobError::MissingParameter("input"))?;
        if input.is_empty() {
            return Err(JobError::EmptyInput);
        }

        let do_alignment = match (&input, self.do_alignment) {
            (JobInput::Alignments(_), Some(true)) => {
                warn!("Alignment input supplied; the MMseqs2 search stage is disabled.");
                false
            }
            (JobInput::Alignments(_), _) => false,
            (_, requested) => requested.unwrap_or(true),
        };

        let msa = self.msa.unwrap_or_default();
        let model = self.model.unwrap_or_default();
        check_range("sensitivity", msa.sensitivity.into(), SENSITIVITY_RANGE)?;
        check_range("num_models", model.num_models.into(), NUM_MODELS_RANGE)?;
        check_range("num_recycle", model.num_recycle.into(), NUM_RECYCLE_RANGE)?;
        check_range("oligomer_count", model.oligomer_count.into(), OLIGOMER_RANGE)?;

        Ok(JobRequest {
            job_name,
            input,
            do_alignment,
            do_models: self.do_models.unwrap_or(true),
            msa,
            model,
        })
    }
}

fn validate_job_name(name: &str) -> Result<(), JobError> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(JobError::InvalidJobName(name.to_string()))
    }
}

fn check_range(parameter: &'static str, value: i64, (min, max): (i64, i64)) -> Result<(), JobError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(JobError::OutOfRange {
            parameter,
            value,
            min,
            max,
        })
    }
}
