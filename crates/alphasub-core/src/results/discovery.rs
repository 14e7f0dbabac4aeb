use super::error::ResultsError;
use super::scores::scores_file_name;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const PREDICTIONS_DIR: &str = "predictions";

const RELAXED_MARKER: &str = "_relaxed_";
const UNRELAXED_MARKER: &str = "_unrelaxed_";

/// Outputs of one predicted query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobArtifacts {
    /// Query name; colabfold prefixes every output file with it.
    pub id: String,
    pub dir: PathBuf,
}

impl JobArtifacts {
    pub fn pae_plot(&self) -> PathBuf {
        self.dir.join(format!("{}_PAE.png", self.id))
    }

    pub fn coverage_plot(&self) -> PathBuf {
        self.dir.join(format!("{}_coverage.png", self.id))
    }

    pub fn plddt_plot(&self) -> PathBuf {
        self.dir.join(format!("{}_plddt.png", self.id))
    }

    pub fn structure_path(&self, model: &str) -> PathBuf {
        self.dir.join(format!("{model}.pdb"))
    }

    /// Score file of `model`; relaxed models share the scores of their unrelaxed input.
    pub fn scores_path(&self, model: &str) -> PathBuf {
        self.dir.join(scores_file_name(model))
    }

    pub fn models(&self) -> Result<ModelSet, ResultsError> {
        discover_models(&self.dir)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelSet {
    /// Whether the names are Amber-relaxed models.
    pub relaxed: bool,
    /// Model file names without `.pdb`, sorted.
    pub names: Vec<String>,
}

impl ModelSet {
    pub fn contains(&self, model: &str) -> bool {
        self.names.iter().any(|name| name == model)
    }

    /// The first model in sorted order; colabfold ranks models in their names.
    pub fn first(&self) -> Option<&str> {
        self.names.first().map(String::as_str)
    }
}

fn list_dir(dir: &Path) -> Result<Vec<PathBuf>, ResultsError> {
    let mut entries = Vec::new();
    for entry in fs::read_dir(dir).map_err(ResultsError::io(dir))? {
        entries.push(entry.map_err(ResultsError::io(dir))?.path());
    }
    entries.sort();
    Ok(entries)
}

fn file_name(path: &Path) -> Option<String> {
    path.file_name().map(|name| name.to_string_lossy().to_string())
}

/// Lists the jobs under `<workdir>/predictions`.
///
/// Each sub-directory is one job. colabfold only creates them when several queries were
/// predicted; otherwise the outputs sit directly in `predictions` and the job is named
/// after the first alignment file found there.
pub fn discover_jobs(workdir: &Path) -> Result<Vec<JobArtifacts>, ResultsError> {
    let predictions = workdir.join(PREDICTIONS_DIR);
    if !predictions.is_dir() {
        return Err(ResultsError::MissingPredictions {
            path: workdir.to_path_buf(),
        });
    }

    let entries = list_dir(&predictions)?;
    let jobs: Vec<JobArtifacts> = entries
        .iter()
        .filter(|path| path.is_dir())
        .filter_map(|path| {
            file_name(path).map(|id| JobArtifacts {
                id,
                dir: path.clone(),
            })
        })
        .collect();
    if !jobs.is_empty() {
        debug!("Found {} job folder(s) in {}.", jobs.len(), predictions.display());
        return Ok(jobs);
    }

    let alignment = entries
        .iter()
        .find(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "a3m"));
    match alignment.and_then(|path| path.file_stem()) {
        Some(stem) => Ok(vec![JobArtifacts {
            id: stem.to_string_lossy().to_string(),
            dir: predictions.clone(),
        }]),
        None => Err(ResultsError::NoJobs { path: predictions }),
    }
}

/// Lists the models of one job, preferring relaxed ones.
pub fn discover_models(dir: &Path) -> Result<ModelSet, ResultsError> {
    let pdb_names: Vec<String> = list_dir(dir)?
        .iter()
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "pdb"))
        .filter_map(|path| path.file_stem().map(|s| s.to_string_lossy().to_string()))
        .collect();

    let pick = |marker: &str| -> Vec<String> {
        pdb_names
            .iter()
            .filter(|name| name.contains(marker))
            .cloned()
            .collect()
    };

    let relaxed = pick(RELAXED_MARKER);
    if !relaxed.is_empty() {
        return Ok(ModelSet {
            relaxed: true,
            names: relaxed,
        });
    }
    let unrelaxed = pick(UNRELAXED_MARKER);
    if !unrelaxed.is_empty() {
        return Ok(ModelSet {
            relaxed: false,
            names: unrelaxed,
        });
    }
    Err(ResultsError::NoModels {
        path: dir.to_path_buf(),
    })
}

/// Looks a job up by id.
pub fn find_job<'a>(jobs: &'a [JobArtifacts], id: &str) -> Result<&'a JobArtifacts, ResultsError> {
    jobs.iter()
        .find(|job| job.id == id)
        .ok_or_else(|| ResultsError::UnknownJob {
            id: id.to_string(),
            known: jobs
                .iter()
                .map(|job| job.id.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, b"").unwrap();
    }

    #[test]
    fn sub_directories_are_jobs_in_sorted_order() {
        let workdir = TempDir::new().unwrap();
        let predictions = workdir.path().join(PREDICTIONS_DIR);
        touch(&predictions.join("seqB/seqB.a3m"));
        touch(&predictions.join("seqA/seqA.a3m"));
        touch(&predictions.join("stray.a3m"));

        let jobs = discover_jobs(workdir.path()).unwrap();
        let ids: Vec<&str> = jobs.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec!["seqA", "seqB"]);
        assert_eq!(jobs[0].dir, predictions.join("seqA"));
        assert_eq!(jobs[0].pae_plot(), predictions.join("seqA/seqA_PAE.png"));
    }

    #[test]
    fn single_alignment_names_the_only_job() {
        let workdir = TempDir::new().unwrap();
        let predictions = workdir.path().join(PREDICTIONS_DIR);
        touch(&predictions.join("ns5a.a3m"));
        touch(&predictions.join("ns5a_PAE.png"));
        touch(&predictions.join("zeta.a3m"));

        let jobs = discover_jobs(workdir.path()).unwrap();
        assert_eq!(
            jobs,
            vec![JobArtifacts {
                id: "ns5a".to_string(),
                dir: predictions,
            }]
        );
    }

    #[test]
    fn missing_predictions_or_alignment_is_an_error() {
        let workdir = TempDir::new().unwrap();
        assert!(matches!(
            discover_jobs(workdir.path()),
            Err(ResultsError::MissingPredictions { .. })
        ));

        fs::create_dir(workdir.path().join(PREDICTIONS_DIR)).unwrap();
        assert!(matches!(
            discover_jobs(workdir.path()),
            Err(ResultsError::NoJobs { .. })
        ));
    }

    #[test]
    fn relaxed_models_are_preferred() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("q_unrelaxed_rank_1_model_3.pdb"));
        touch(&dir.path().join("q_unrelaxed_rank_2_model_1.pdb"));
        touch(&dir.path().join("q_relaxed_rank_2_model_1.pdb"));
        touch(&dir.path().join("q_relaxed_rank_1_model_3.pdb"));

        let models = discover_models(dir.path()).unwrap();
        assert!(models.relaxed);
        assert_eq!(
            models.names,
            vec!["q_relaxed_rank_1_model_3", "q_relaxed_rank_2_model_1"]
        );
        assert_eq!(models.first(), Some("q_relaxed_rank_1_model_3"));
    }

    #[test]
    fn unrelaxed_models_are_the_fallback() {
        let dir = TempDir::new().unwrap();
        touch(&dir.path().join("q_unrelaxed_rank_1_model_3.pdb"));
        touch(&dir.path().join("q_unrelaxed_rank_1_model_3_scores.json"));

        let models = discover_models(dir.path()).unwrap();
        assert!(!models.relaxed);
        assert_eq!(models.names, vec!["q_unrelaxed_rank_1_model_3"]);

        let empty = TempDir::new().unwrap();
        assert!(matches!(
            discover_models(empty.path()),
            Err(ResultsError::NoModels { .. })
        ));
    }

    #[test]
    fn relaxed_model_points_at_unrelaxed_scores() {
        let job = JobArtifacts {
            id: "q".to_string(),
            dir: PathBuf::from("/w/predictions"),
        };
        assert_eq!(
            job.scores_path("q_relaxed_rank_1_model_3"),
            PathBuf::from("/w/predictions/q_unrelaxed_rank_1_model_3_scores.json")
        );
        assert_eq!(
            job.structure_path("q_relaxed_rank_1_model_3"),
            PathBuf::from("/w/predictions/q_relaxed_rank_1_model_3.pdb")
        );
    }

    #[test]
    fn unknown_job_lists_known_ids() {
        let jobs = vec![
            JobArtifacts {
                id: "a".to_string(),
                dir: PathBuf::from("/p/a"),
            },
            JobArtifacts {
                id: "b".to_string(),
                dir: PathBuf::from("/p/b"),
            },
        ];
        assert_eq!(find_job(&jobs, "b").unwrap().dir, PathBuf::from("/p/b"));
        match find_job(&jobs, "c") {
            Err(ResultsError::UnknownJob { id, known }) => {
                assert_eq!(id, "c");
                assert_eq!(known, "a, b");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }
}
