use crate::cli::ResultsArgs;
use crate::error::{CliError, Result};
use alphasub::results::{self, JobArtifacts, RenderedArtifacts};
use tracing::info;

pub async fn run(args: ResultsArgs) -> Result<()> {
    let jobs = results::discover_jobs(&args.workdir)?;
    info!("Found {} job(s) in {:?}.", jobs.len(), args.workdir);

    let job = match (&args.job, jobs.as_slice()) {
        (Some(id), _) => results::find_job(&jobs, id)?,
        (None, [only]) => only,
        (None, _) => {
            if args.model.is_some() {
                return Err(CliError::Argument(
                    "--model needs --job when the directory holds several jobs.".to_string(),
                ));
            }
            list_jobs(&jobs);
            return Ok(());
        }
    };

    let model = match &args.model {
        Some(model) => model.clone(),
        None => {
            let models = job.models()?;
            models
                .first()
                .map(str::to_string)
                .ok_or_else(|| CliError::Argument(format!("Job '{}' has no models.", job.id)))?
        }
    };

    let out_dir = args.output.clone().unwrap_or_else(|| job.dir.clone());
    let rendered =
        tokio::task::block_in_place(|| results::render_artifacts(job, &model, &out_dir))?;
    print_summary(&rendered);
    Ok(())
}

fn list_jobs(jobs: &[JobArtifacts]) {
    println!("{} job(s):", jobs.len());
    for job in jobs {
        match job.models() {
            Ok(models) => {
                let kind = if models.relaxed { "relaxed" } else { "unrelaxed" };
                println!("  {} ({} {} model(s))", job.id, models.names.len(), kind);
                for name in &models.names {
                    println!("    {name}");
                }
            }
            Err(e) => println!("  {} ({})", job.id, e),
        }
    }
    println!("Pick one with --job <ID>.");
}

fn print_summary(rendered: &RenderedArtifacts) {
    println!("Job:       {}", rendered.job_id);
    println!("Model:     {}", rendered.model);
    println!("Structure: {}", rendered.structure_path.display());
    for chain in &rendered.structure.chains {
        println!(
            "  chain {}: {} residue(s), {} atom(s)",
            chain.id, chain.residues, chain.atoms
        );
    }
    println!("Residues:  {}", rendered.residues);
    if let Some(plddt) = rendered.mean_plddt {
        println!("pLDDT:     {plddt:.1}");
    }
    if let Some(ptm) = rendered.ptm {
        println!("pTM:       {ptm:.3}");
    }
    if let Some(iptm) = rendered.iptm {
        println!("ipTM:      {iptm:.3}");
    }
    println!("Max PAE:   {:.1}", rendered.max_pae);
    println!("PAE heatmap written to: {}", rendered.heatmap_path.display());
    for plot in &rendered.plots {
        let status = if plot.present { "" } else { " (missing)" };
        println!("{:<9}  {}{}", plot.label, plot.path.display(), status);
    }
}
