use super::error::JobError;
use super::request::JobRequest;
use crate::profile::is_valid_pbs_queue;
use crate::remote::{SessionInfo, shell_quote};
use minijinja::{AutoEscape, Environment, UndefinedBehavior};
use serde::Serialize;

/// Name of the generated script in the working directory.
pub const SCRIPT_FILE_NAME: &str = "run_pred.sh";

const SCRIPT_TEMPLATE: &str = include_str!("templates/run_pred.sh.j2");

#[derive(Debug, Serialize)]
struct ScriptContext<'a> {
    pbs_lines: String,
    job_name: &'a str,
    fasta_file: String,
    workdir: &'a str,
    model_type: &'static str,
    minimisation: &'static str,
    nmer: u8,
    num_models: u8,
    num_recycle: u8,
    db_load_mode: u8,
    use_env: bool,
    do_alignment: bool,
    do_models: bool,
    gpu_index: String,
    params_dir: &'a str,
    databases: &'a str,
    image: &'a str,
    sensitivity: u8,
    db1: &'a str,
    db3: &'a str,
    use_templates: bool,
    filter: bool,
    expand_eval: &'a str,
    align_eval: u32,
    diff: bool,
    qsc: String,
    max_accept: u32,
}

impl<'a> ScriptContext<'a> {
    fn new(job: &'a JobRequest, info: &'a SessionInfo) -> Self {
        let profile = &info.profile;
        Self {
            pbs_lines: info.pbs_directives(),
            job_name: &job.job_name,
            fasta_file: job.fasta_file_name(),
            workdir: &info.workdir,
            model_type: job.model.model_type.as_str(),
            minimisation: job.model.relax_flags(),
            nmer: job.model.oligomer_count,
            num_models: job.model.num_models,
            num_recycle: job.model.num_recycle,
            db_load_mode: job.msa.db_load_mode.code(),
            use_env: job.msa.use_env,
            do_alignment: job.do_alignment,
            do_models: job.do_models,
            gpu_index: info.gpu.map(|gpu| gpu.to_string()).unwrap_or_default(),
            params_dir: &profile.params_folder,
            databases: &profile.database_folder,
            image: &profile.singularity_image,
            sensitivity: job.msa.sensitivity,
            db1: &job.msa.db1,
            db3: &job.msa.db3,
            use_templates: job.msa.use_templates,
            filter: job.msa.filter,
            expand_eval: &job.msa.expand_eval,
            align_eval: job.msa.align_eval,
            diff: job.msa.diff,
            qsc: job.msa.qsc.to_string(),
            max_accept: job.msa.max_accept,
        }
    }
}

fn flag(value: bool) -> u8 {
    u8::from(value)
}

fn shquote(value: String) -> String {
    shell_quote(&value)
}

fn environment() -> Result<Environment<'static>, JobError> {
    let mut env = Environment::new();
    env.set_keep_trailing_newline(true);
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env.set_auto_escape_callback(|_| AutoEscape::None);
    env.add_filter("flag", flag);
    env.add_filter("shquote", shquote);
    env.add_template(SCRIPT_FILE_NAME, SCRIPT_TEMPLATE)?;
    Ok(env)
}

/// Renders the run script for `job` on the host described by `info`.
///
/// Pure: the same request and session always produce the same bytes. Every boolean is
/// written as `1` or `0` and every free-text value is single-quoted for the shell.
pub fn build_script(job: &JobRequest, info: &SessionInfo) -> Result<String, JobError> {
    if info.workdir.trim().is_empty() {
        return Err(JobError::MissingWorkdir(info.server_name.clone()));
    }
    if job.do_models && info.gpu.is_none() {
        return Err(JobError::NoGpuSelected(info.server_name.clone()));
    }
    if let Some(queue) = &info.profile.pbs_queue {
        if !queue.is_empty() && !is_valid_pbs_queue(queue) {
            return Err(JobError::InvalidPbsQueue(queue.clone()));
        }
    }

    let env = environment()?;
    let template = env.get_template(SCRIPT_FILE_NAME)?;
    Ok(template.render(ScriptContext::new(job, info))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::request::{DbLoadMode, JobInput, ModelSettings, MsaSettings};
    use crate::profile::ServerProfile;

    fn cluster_info() -> SessionInfo {
        let mut profile = ServerProfile::local_default();
        profile.address = "gpu-cluster".to_string();
        profile.user = "tt".to_string();
        profile.database_folder = "/data/colabfold/database".to_string();
        profile.params_folder = "/data/colabfold/params".to_string();
        profile.singularity_image = "/data/colabfold/colabfold.sif".to_string();
        profile.executor = "qsub".to_string();
        profile.pbs_queue = Some("alphafold".to_string());
        SessionInfo::new("cluster", profile)
            .with_node(Some(38))
            .with_gpu(Some(1))
            .with_workdir("/scratch/tt/ns5a")
    }

    fn job() -> JobRequest {
        JobRequest::builder()
            .job_name("ns5a")
            .input(JobInput::Sequence("MSGSWLRDVWDWICTVL".to_string()))
            .build()
            .unwrap()
    }

    fn line_starting<'s>(script: &'s str, prefix: &str) -> &'s str {
        script
            .lines()
            .map(str::trim_start)
            .find(|line| line.starts_with(prefix))
            .unwrap_or_else(|| panic!("no line starting with {prefix:?}"))
    }

    #[test]
    fn rendering_is_deterministic() {
        let first = build_script(&job(), &cluster_info()).unwrap();
        let second = build_script(&job(), &cluster_info()).unwrap();
        assert_eq!(first, second);
        assert!(first.starts_with("#!/bin/bash\n#PBS -l select=1:ncpus=8:host=node38:ngpus=1\n#PBS -q alphafold\n"));
        assert!(first.ends_with("fi\n"));
    }

    fn render_flags(on: bool) -> String {
        let mut request = job();
        request.do_alignment = on;
        request.msa.use_env = on;
        request.msa.use_templates = on;
        request.msa.filter = on;
        request.msa.diff = on;
        build_script(&request, &cluster_info()).unwrap()
    }

    #[test]
    fn booleans_are_rendered_as_one_or_zero() {
        for (on, digit) in [(true, "1"), (false, "0")] {
            let script = render_flags(on);

            assert_eq!(line_starting(&script, "USEENV="), format!("USEENV={digit}"));
            assert_eq!(
                line_starting(&script, "DOALIGNMENT="),
                format!("DOALIGNMENT={digit}")
            );
            assert_eq!(
                line_starting(&script, "--use-templates"),
                format!("--use-templates {digit} \\")
            );
            assert_eq!(
                line_starting(&script, "--filter"),
                format!("--filter {digit} \\")
            );
            assert_eq!(line_starting(&script, "--diff"), format!("--diff {digit} \\"));
            assert_eq!(line_starting(&script, "DOMODELS="), "DOMODELS=1");
            assert!(!script.contains("true"));
            assert!(!script.contains("false"));
        }
    }

    #[test]
    fn parameters_reach_the_pipeline_commands() {
        let request = JobRequest::builder()
            .job_name("dimer")
            .input(JobInput::Sequence("MKV".to_string()))
            .msa(MsaSettings {
                sensitivity: 6,
                db_load_mode: DbLoadMode::Mmap,
                ..MsaSettings::default()
            })
            .model(ModelSettings {
                num_models: 2,
                num_recycle: 6,
                oligomer_count: 2,
                gpu_relax: false,
                ..ModelSettings::default()
            })
            .build()
            .unwrap();
        let script = build_script(&request, &cluster_info()).unwrap();

        assert_eq!(line_starting(&script, "FASTA_FILE="), "FASTA_FILE='dimer.fasta'");
        assert_eq!(line_starting(&script, "DBLOADMODE="), "DBLOADMODE=2");
        assert_eq!(line_starting(&script, "NMER="), "NMER=2");
        assert_eq!(line_starting(&script, "NUMMODELS="), "NUMMODELS=2");
        assert_eq!(line_starting(&script, "NUMRECYCLE="), "NUMRECYCLE=6");
        assert_eq!(line_starting(&script, "MINIMISATION="), "MINIMISATION='--amber'");
        assert_eq!(line_starting(&script, "GPUINDEX="), "GPUINDEX='1'");
        assert_eq!(line_starting(&script, "-s "), "-s 6 \\");
        assert_eq!(line_starting(&script, "--qsc"), "--qsc -20 \\");
        assert!(script.contains("CUDA_VISIBLE_DEVICES=\"${GPUINDEX}\" \"${CONTAINER[@]}\" colabfold_batch"));
        assert!(script.contains("touch makingModelsDone"));
    }

    #[test]
    fn free_text_values_are_quoted() {
        let mut info = cluster_info().with_workdir("/scratch/it's mine; rm -rf ~");
        info.profile.singularity_image = "/img/$(whoami).sif".to_string();
        let script = build_script(&job(), &info).unwrap();

        assert_eq!(
            line_starting(&script, "FASTA_DIR="),
            "FASTA_DIR='/scratch/it'\\''s mine; rm -rf ~'"
        );
        assert_eq!(
            line_starting(&script, "IMAGESINGULARITY="),
            "IMAGESINGULARITY='/img/$(whoami).sif'"
        );
    }

    #[test]
    fn workdir_and_gpu_are_required() {
        let info = cluster_info().with_workdir("");
        assert!(matches!(
            build_script(&job(), &info),
            Err(JobError::MissingWorkdir(name)) if name == "cluster"
        ));

        let info = cluster_info().with_gpu(None);
        assert!(matches!(
            build_script(&job(), &info),
            Err(JobError::NoGpuSelected(_))
        ));

        let mut msa_only = job();
        msa_only.do_models = false;
        let script = build_script(&msa_only, &info).unwrap();
        assert_eq!(line_starting(&script, "GPUINDEX="), "GPUINDEX=''");
        assert_eq!(line_starting(&script, "DOMODELS="), "DOMODELS=0");
    }

    #[test]
    fn queue_that_would_add_script_lines_is_rejected() {
        let mut info = cluster_info();
        info.profile.pbs_queue = Some("gpu\ntouch /tmp/pwned".to_string());

        match build_script(&job(), &info) {
            Err(JobError::InvalidPbsQueue(queue)) => {
                assert_eq!(queue, "gpu\ntouch /tmp/pwned")
            }
            other => panic!("unexpected result: {other:?}"),
        }

        info.profile.pbs_queue = Some("gpu@pbs01".to_string());
        let script = build_script(&job(), &info).unwrap();
        assert_eq!(line_starting(&script, "#PBS -q"), "#PBS -q gpu@pbs01");
    }

    #[test]
    fn local_host_has_no_node_pinning() {
        let mut profile = ServerProfile::local_default();
        profile.workdir = Some("/tmp/af".to_string());
        let info = SessionInfo::new("local", profile).with_gpu(Some(0));
        let script = build_script(&job(), &info).unwrap();
        assert_eq!(
            line_starting(&script, "#PBS"),
            "#PBS -l select=1:ncpus=8:ngpus=1"
        );
    }
}
