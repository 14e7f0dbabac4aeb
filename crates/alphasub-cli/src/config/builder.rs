use super::defaults::DefaultsConfig;
use super::file::FileJobConfig;
use crate::cli::JobArgs;
use crate::error::{CliError, Result};
use crate::utils::input;
use alphasub::job::{JobRequest, ModelSettings, MsaSettings};
use std::str::FromStr;

/// Merges the job parameters: CLI flag, then `--set`, then the config file, then the
/// defaults.
pub fn build_job_request(args: &JobArgs) -> Result<JobRequest> {
    let defaults = DefaultsConfig::default();

    let file_config = if let Some(config_path) = &args.config {
        FileJobConfig::from_file(config_path)?
    } else {
        FileJobConfig::default()
    };
    let mut file_config = apply_set_values(file_config, &args.set_values)?;

    let job_name = args
        .job_name
        .clone()
        .or(file_config.job_name.take())
        .ok_or_else(|| {
            CliError::Config(
                "A job name is required either in the config file or via --job-name.".to_string(),
            )
        })?;

    let msa = merge_msa(args, file_config.msa.take().unwrap_or_default(), defaults.msa)?;
    let model = merge_model(
        args,
        file_config.model.take().unwrap_or_default(),
        defaults.model,
    )?;

    // Left unset unless asked for, so the request picks the default for its input kind.
    let do_alignment = if args.no_alignment {
        Some(false)
    } else {
        file_config.do_alignment
    };
    let do_models = !args.no_models && file_config.do_models.unwrap_or(defaults.do_models);

    let job_input = input::read_job_input(&args.input)?;

    let mut builder = JobRequest::builder()
        .job_name(job_name)
        .input(job_input)
        .do_models(do_models)
        .msa(msa)
        .model(model);
    if let Some(enabled) = do_alignment {
        builder = builder.do_alignment(enabled);
    }
    Ok(builder.build()?)
}

fn merge_msa(
    args: &JobArgs,
    file: super::file::FileMsaConfig,
    defaults: MsaSettings,
) -> Result<MsaSettings> {
    let db_load_mode = match args.db_load_mode.as_deref().or(file.db_load_mode.as_deref()) {
        Some(label) => label.parse()?,
        None => defaults.db_load_mode,
    };
    Ok(MsaSettings {
        sensitivity: args
            .sensitivity
            .or(file.sensitivity)
            .unwrap_or(defaults.sensitivity),
        db1: file.db1.unwrap_or(defaults.db1),
        db3: file.db3.unwrap_or(defaults.db3),
        use_env: args.use_env || file.use_env.unwrap_or(defaults.use_env),
        use_templates: args.use_templates || file.use_templates.unwrap_or(defaults.use_templates),
        filter: file.filter.unwrap_or(defaults.filter),
        expand_eval: file.expand_eval.unwrap_or(defaults.expand_eval),
        align_eval: file.align_eval.unwrap_or(defaults.align_eval),
        diff: file.diff.unwrap_or(defaults.diff),
        qsc: file.qsc.unwrap_or(defaults.qsc),
        max_accept: file.max_accept.unwrap_or(defaults.max_accept),
        db_load_mode,
    })
}

fn merge_model(
    args: &JobArgs,
    file: super::file::FileModelConfig,
    defaults: ModelSettings,
) -> Result<ModelSettings> {
    let model_type = match args.model_type.as_deref().or(file.model_type.as_deref()) {
        Some(name) => name.parse()?,
        None => defaults.model_type,
    };
    let relax = match (args.relax.relax, args.relax.no_relax) {
        (true, false) => true,
        (false, true) => false,
        _ => file.relax.unwrap_or(defaults.relax),
    };
    let gpu_relax = !args.cpu_relax && file.gpu_relax.unwrap_or(defaults.gpu_relax);

    Ok(ModelSettings {
        model_type,
        num_models: args
            .num_models
            .or(file.num_models)
            .unwrap_or(defaults.num_models),
        num_recycle: args
            .num_recycle
            .or(file.num_recycle)
            .unwrap_or(defaults.num_recycle),
        oligomer_count: args
            .oligomer
            .or(file.oligomer_count)
            .unwrap_or(defaults.oligomer_count),
        relax,
        gpu_relax,
    })
}

fn parse_value<T: FromStr>(key: &str, value: &str, kind: &str) -> Result<T> {
    value.parse().map_err(|_| {
        CliError::Config(format!("Invalid {} value for {}: {}", kind, key, value))
    })
}

fn apply_set_values(mut config: FileJobConfig, set_values: &[String]) -> Result<FileJobConfig> {
    for kv_pair in set_values {
        let Some((key, value)) = kv_pair.split_once('=') else {
            return Err(CliError::Config(format!(
                "Invalid --set format: '{}'. Expected KEY=VALUE.",
                kv_pair
            )));
        };

        if let Some(msa_key) = key.strip_prefix("msa.") {
            let msa = config.msa.get_or_insert_with(Default::default);
            match msa_key {
                "sensitivity" => msa.sensitivity = Some(parse_value(key, value, "integer")?),
                "db1" => msa.db1 = Some(value.to_string()),
                "db3" => msa.db3 = Some(value.to_string()),
                "use-env" => msa.use_env = Some(parse_value(key, value, "boolean")?),
                "use-templates" => msa.use_templates = Some(parse_value(key, value, "boolean")?),
                "filter" => msa.filter = Some(parse_value(key, value, "boolean")?),
                "expand-eval" => msa.expand_eval = Some(value.to_string()),
                "align-eval" => msa.align_eval = Some(parse_value(key, value, "integer")?),
                "diff" => msa.diff = Some(parse_value(key, value, "boolean")?),
                "qsc" => msa.qsc = Some(parse_value(key, value, "float")?),
                "max-accept" => msa.max_accept = Some(parse_value(key, value, "integer")?),
                "db-load-mode" => msa.db_load_mode = Some(value.to_string()),
                _ => return Err(unsupported_key(key)),
            }
        } else if let Some(model_key) = key.strip_prefix("model.") {
            let model = config.model.get_or_insert_with(Default::default);
            match model_key {
                "model-type" => model.model_type = Some(value.to_string()),
                "num-models" => model.num_models = Some(parse_value(key, value, "integer")?),
                "num-recycle" => model.num_recycle = Some(parse_value(key, value, "integer")?),
                "oligomer-count" => {
                    model.oligomer_count = Some(parse_value(key, value, "integer")?)
                }
                "relax" => model.relax = Some(parse_value(key, value, "boolean")?),
                "gpu-relax" => model.gpu_relax = Some(parse_value(key, value, "boolean")?),
                _ => return Err(unsupported_key(key)),
            }
        } else {
            match key {
                "job-name" => config.job_name = Some(value.to_string()),
                "do-alignment" => config.do_alignment = Some(parse_value(key, value, "boolean")?),
                "do-models" => config.do_models = Some(parse_value(key, value, "boolean")?),
                _ => return Err(unsupported_key(key)),
            }
        }
    }
    Ok(config)
}

fn unsupported_key(key: &str) -> CliError {
    CliError::Config(format!("Unsupported configuration key for --set: '{}'", key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{InputArgs, RelaxFlags};
    use alphasub::job::{DbLoadMode, JobError, JobInput, ModelType};
    use std::fs;
    use std::path::PathBuf;
    use tempfile::tempdir;

    fn base_job_args() -> JobArgs {
        JobArgs {
            job_name: Some("ns5a".to_string()),
            input: InputArgs {
                sequence: Some("MSGSWLRDVWDWICTVL".to_string()),
                ..InputArgs::default()
            },
            ..JobArgs::default()
        }
    }

    fn write_config(dir: &tempfile::TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("job.toml");
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn defaults_apply_without_a_file() {
        let job = build_job_request(&base_job_args()).unwrap();

        assert_eq!(job.job_name, "ns5a");
        assert!(job.do_alignment);
        assert!(job.do_models);
        assert_eq!(job.msa, MsaSettings::default());
        assert_eq!(job.model, ModelSettings::default());
        assert!(matches!(job.input, JobInput::Sequence(_)));
    }

    #[test]
    fn file_values_fill_in_missing_flags() {
        let dir = tempdir().unwrap();
        let mut args = base_job_args();
        args.job_name = None;
        args.config = Some(write_config(
            &dir,
            r#"
            job-name = "from-file"
            do-alignment = false

            [msa]
            sensitivity = 4
            db-load-mode = "mmap"

            [model]
            model-type = "AlphaFold2-multimer-v2"
            num-recycle = 9
            relax = false
            "#,
        ));

        let job = build_job_request(&args).unwrap();

        assert_eq!(job.job_name, "from-file");
        assert!(!job.do_alignment);
        assert_eq!(job.msa.sensitivity, 4);
        assert_eq!(job.msa.db_load_mode, DbLoadMode::Mmap);
        assert_eq!(job.model.model_type, ModelType::AlphaFold2MultimerV2);
        assert_eq!(job.model.num_recycle, 9);
        assert!(!job.model.relax);
    }

    #[test]
    fn cli_flags_beat_set_values_which_beat_the_file() {
        let dir = tempdir().unwrap();
        let mut args = base_job_args();
        args.config = Some(write_config(
            &dir,
            r#"
            [msa]
            sensitivity = 4
            qsc = -5.0

            [model]
            num-recycle = 9
            num-models = 2
            relax = false
            "#,
        ));
        args.set_values = vec![
            "model.num-recycle=10".to_string(),
            "model.num-models=3".to_string(),
            "msa.qsc=-30".to_string(),
        ];
        args.num_recycle = Some(1);
        args.relax = RelaxFlags {
            relax: true,
            no_relax: false,
        };
        args.cpu_relax = true;

        let job = build_job_request(&args).unwrap();

        assert_eq!(job.model.num_recycle, 1);
        assert_eq!(job.model.num_models, 3);
        assert_eq!(job.msa.qsc, -30.0);
        assert_eq!(job.msa.sensitivity, 4);
        assert!(job.model.relax);
        assert!(!job.model.gpu_relax);
    }

    #[test]
    fn stage_flags_disable_stages() {
        let mut args = base_job_args();
        args.no_models = true;
        args.set_values = vec!["do-alignment=false".to_string()];

        let job = build_job_request(&args).unwrap();
        assert!(!job.do_alignment);
        assert!(!job.do_models);
    }

    #[test]
    fn alignment_input_without_stage_flags_skips_the_search() {
        let dir = tempdir().unwrap();
        let a3m = dir.path().join("ns5a.a3m");
        fs::write(&a3m, "#17\t1\n>101\nMSGSWLRDVWDWICTVL\n").unwrap();
        let mut args = base_job_args();
        args.input = InputArgs {
            a3m: vec![a3m],
            ..InputArgs::default()
        };

        let job = build_job_request(&args).unwrap();

        assert!(matches!(job.input, JobInput::Alignments(ref files) if files.len() == 1));
        assert!(!job.do_alignment);
        assert!(job.do_models);
    }

    #[test]
    fn missing_job_name_is_a_config_error() {
        let mut args = base_job_args();
        args.job_name = None;
        let result = build_job_request(&args);
        assert!(matches!(result, Err(CliError::Config(msg)) if msg.contains("job name")));
    }

    #[test]
    fn bad_set_values_are_rejected() {
        let mut args = base_job_args();
        args.set_values = vec!["model.num-recycle".to_string()];
        assert!(matches!(build_job_request(&args), Err(CliError::Config(_))));

        args.set_values = vec!["model.unknown=1".to_string()];
        assert!(matches!(
            build_job_request(&args),
            Err(CliError::Config(msg)) if msg.contains("model.unknown")
        ));

        args.set_values = vec!["msa.sensitivity=high".to_string()];
        assert!(matches!(
            build_job_request(&args),
            Err(CliError::Config(msg)) if msg.contains("integer")
        ));
    }

    #[test]
    fn invalid_values_surface_as_job_errors() {
        let mut args = base_job_args();
        args.model_type = Some("alphafold3".to_string());
        assert!(matches!(
            build_job_request(&args),
            Err(CliError::Job(JobError::UnknownVariant { .. }))
        ));

        let mut args = base_job_args();
        args.num_models = Some(9);
        assert!(matches!(
            build_job_request(&args),
            Err(CliError::Job(JobError::OutOfRange { .. }))
        ));
    }
}
