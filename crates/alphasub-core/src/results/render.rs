use super::discovery::JobArtifacts;
use super::error::ResultsError;
use super::heatmap::render_pae_svg;
use super::scores::ScoreFile;
use super::structure::StructureSummary;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// One of the PNG plots colabfold draws per job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlotFile {
    pub label: &'static str,
    pub path: PathBuf,
    pub present: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedArtifacts {
    pub job_id: String,
    pub model: String,
    pub structure_path: PathBuf,
    pub structure: StructureSummary,
    pub scores_path: PathBuf,
    pub heatmap_path: PathBuf,
    pub residues: usize,
    pub max_pae: f64,
    pub mean_plddt: Option<f64>,
    pub ptm: Option<f64>,
    pub iptm: Option<f64>,
    pub plots: Vec<PlotFile>,
}

fn plot(label: &'static str, path: PathBuf) -> PlotFile {
    let present = path.is_file();
    PlotFile {
        label,
        path,
        present,
    }
}

/// Renders one model of `job`: writes its PAE heatmap as `<model>_PAE.svg` into
/// `out_dir` and summarizes the structure and scores.
pub fn render_artifacts(
    job: &JobArtifacts,
    model: &str,
    out_dir: &Path,
) -> Result<RenderedArtifacts, ResultsError> {
    let models = job.models()?;
    if !models.contains(model) {
        return Err(ResultsError::UnknownModel {
            job: job.id.clone(),
            model: model.to_string(),
        });
    }

    let scores_path = job.scores_path(model);
    debug!("Loading scores from {}.", scores_path.display());
    let scores = ScoreFile::load(&scores_path)?;
    let pae = scores.pae_matrix(&scores_path)?;
    let vmax = scores.max_pae.unwrap_or_else(|| pae.max());

    fs::create_dir_all(out_dir).map_err(ResultsError::io(out_dir))?;
    let heatmap_path = out_dir.join(format!("{model}_PAE.svg"));
    let svg = render_pae_svg(&pae, vmax, model).map_err(|e| ResultsError::Plot {
        path: heatmap_path.clone(),
        reason: e.to_string(),
    })?;
    fs::write(&heatmap_path, svg).map_err(ResultsError::io(&heatmap_path))?;
    info!("Wrote PAE heatmap to {}.", heatmap_path.display());

    let structure_path = job.structure_path(model);
    let structure = StructureSummary::read(&structure_path)?;

    Ok(RenderedArtifacts {
        job_id: job.id.clone(),
        model: model.to_string(),
        mean_plddt: scores.mean_plddt().or_else(|| structure.mean_plddt()),
        structure_path,
        structure,
        scores_path,
        heatmap_path,
        residues: pae.size(),
        max_pae: vmax,
        ptm: scores.ptm,
        iptm: scores.iptm,
        plots: vec![
            plot("PAE", job.pae_plot()),
            plot("coverage", job.coverage_plot()),
            plot("pLDDT", job.plddt_plot()),
        ],
    })
}
