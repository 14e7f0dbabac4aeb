use alphasub::profile::LOCAL_PROFILE;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const HELP_TEMPLATE: &str = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}
";

#[derive(Parser, Debug)]
#[command(
    author = "Thibault Tubiana",
    version,
    about = "alphasub - configure, submit and browse ColabFold/AlphaFold structure predictions on remote GPU hosts.",
    help_template = HELP_TEMPLATE,
)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity level (-v for INFO, -vv for DEBUG, -vvv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all log output except for errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Write logs to a specified file in addition to the console output
    #[arg(long, global = true, value_name = "PATH")]
    pub log_file: Option<PathBuf>,

    /// Server profile file. Defaults to ~/.alphasub/servers.json
    #[arg(long, global = true, value_name = "PATH")]
    pub servers_file: Option<PathBuf>,

    /// OpenSSH client configuration to read proxy commands from and add host entries to.
    /// Defaults to ~/.ssh/config
    #[arg(long, global = true, value_name = "PATH")]
    pub ssh_config: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List and inspect the server profiles.
    Servers(ServersArgs),
    /// Connect to a server, check it answers and report its GPUs.
    Connect(ConnectArgs),
    /// Close the SSH connection kept open in the background for a server.
    Disconnect(DisconnectArgs),
    /// Render the run script of a job without submitting it.
    Script(ScriptArgs),
    /// Upload a job to the server's working directory and launch it.
    Submit(SubmitArgs),
    /// Browse the predictions of finished jobs in a working directory.
    Results(ResultsArgs),
}

/// Arguments for the `servers` subcommand.
#[derive(Args, Debug)]
pub struct ServersArgs {
    #[command(subcommand)]
    pub command: ServersCommands,
}

#[derive(Subcommand, Debug)]
pub enum ServersCommands {
    /// List every profile with its address and executor.
    List,
    /// Print one profile as JSON.
    Show {
        /// Profile name as written in servers.json.
        #[arg(required = true)]
        name: String,
    },
    /// Show the absolute path to the server profile file.
    Path,
}

/// Which host a job goes to and where it runs there.
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Server profile to use.
    #[arg(short, long, default_value = LOCAL_PROFILE, value_name = "NAME")]
    pub server: String,

    /// Compute node to run on. Defaults to the first node listed in the profile.
    #[arg(long, value_name = "N")]
    pub node: Option<u32>,

    /// Override the profile's remote working directory.
    #[arg(short, long, value_name = "DIR")]
    pub workdir: Option<String>,

    /// Prompt for the SSH password instead of relying on keys or an agent.
    #[arg(long)]
    pub ask_password: bool,
}

/// Arguments for the `connect` subcommand.
#[derive(Args, Debug)]
pub struct ConnectArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Do not query nvidia-smi.
    #[arg(long)]
    pub no_gpu_query: bool,
}

/// Arguments for the `disconnect` subcommand.
#[derive(Args, Debug)]
pub struct DisconnectArgs {
    /// Server profile whose connection to close.
    #[arg(short, long, default_value = LOCAL_PROFILE, value_name = "NAME")]
    pub server: String,
}

/// Exactly one kind of query input.
#[derive(Args, Debug, Clone, Default)]
#[group(required = true, multiple = false)]
pub struct InputArgs {
    /// A single protein sequence, with or without a FASTA header.
    #[arg(long, value_name = "SEQUENCE")]
    pub sequence: Option<String>,

    /// A FASTA file with one or more query sequences.
    #[arg(long, value_name = "PATH")]
    pub fasta: Option<PathBuf>,

    /// Pre-computed A3M alignments. Skips the MMseqs2 search.
    #[arg(long, value_name = "PATH", num_args(1..))]
    pub a3m: Vec<PathBuf>,
}

/// A group to handle mutually exclusive relaxation flags.
#[derive(Args, Debug, Clone, Copy, Default)]
#[group(required = false, multiple = false)]
pub struct RelaxFlags {
    /// Relax the models with Amber.
    #[arg(long)]
    pub relax: bool,
    /// Skip Amber relaxation.
    #[arg(long)]
    pub no_relax: bool,
}

/// Everything that describes a job, shared by `script` and `submit`.
#[derive(Args, Debug, Clone, Default)]
pub struct JobArgs {
    /// Job parameter file in TOML format.
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Job name; names the FASTA file and the outputs. Letters, digits, '.', '_' and '-'.
    #[arg(short = 'n', long, value_name = "NAME")]
    pub job_name: Option<String>,

    #[command(flatten)]
    pub input: InputArgs,

    // --- Model Overrides ---
    /// Model type: auto, AlphaFold2-ptm, AlphaFold2-multimer-v1 or AlphaFold2-multimer-v2.
    #[arg(long, value_name = "TYPE")]
    pub model_type: Option<String>,

    /// Number of models to predict (1-5).
    #[arg(long, value_name = "INT")]
    pub num_models: Option<u8>,

    /// Number of recycles per model (0-12).
    #[arg(long, value_name = "INT")]
    pub num_recycle: Option<u8>,

    /// Copies of the chain in a homo-oligomer (1-6).
    #[arg(long, value_name = "INT")]
    pub oligomer: Option<u8>,

    /// Override `model.relax` from the config file.
    #[command(flatten)]
    pub relax: RelaxFlags,

    /// Run Amber relaxation on the CPU instead of the GPU.
    #[arg(long)]
    pub cpu_relax: bool,

    // --- MSA Overrides ---
    /// MMseqs2 sensitivity (1-10).
    #[arg(long, value_name = "INT")]
    pub sensitivity: Option<u8>,

    /// Database load mode: fread (3) or mmap (2).
    #[arg(long, value_name = "MODE")]
    pub db_load_mode: Option<String>,

    /// Also search the environmental database.
    #[arg(long)]
    pub use_env: bool,

    /// Search templates.
    #[arg(long)]
    pub use_templates: bool,

    // --- Stages ---
    /// Skip the MMseqs2 search stage.
    #[arg(long)]
    pub no_alignment: bool,

    /// Skip the structure prediction stage.
    #[arg(long)]
    pub no_models: bool,

    /// Set a specific configuration value, overriding the config file.
    /// Can be used multiple times. Example: -S msa.qsc=-10
    #[arg(short = 'S', long = "set", value_name = "KEY=VALUE", num_args(0..))]
    pub set_values: Vec<String>,
}

/// Arguments for the `script` subcommand.
#[derive(Args, Debug)]
pub struct ScriptArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    #[command(flatten)]
    pub job: JobArgs,

    /// GPU index to pin. When given, the script is rendered without connecting.
    #[arg(long, value_name = "INDEX")]
    pub gpu: Option<u32>,

    /// Write the script to a file instead of standard output.
    #[arg(short, long, value_name = "PATH")]
    pub output: Option<PathBuf>,
}

/// Arguments for the `submit` subcommand.
#[derive(Args, Debug)]
pub struct SubmitArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    #[command(flatten)]
    pub job: JobArgs,

    /// GPU index to pin instead of picking the idlest one.
    #[arg(long, value_name = "INDEX")]
    pub gpu: Option<u32>,
}

/// Arguments for the `results` subcommand.
#[derive(Args, Debug)]
pub struct ResultsArgs {
    /// Working directory holding the `predictions` folder (local or mounted).
    #[arg(required = true, value_name = "DIR")]
    pub workdir: PathBuf,

    /// Job to render. Without it the jobs are listed.
    #[arg(short, long, value_name = "ID")]
    pub job: Option<String>,

    /// Model to render. Defaults to the best-ranked model of the job.
    #[arg(short, long, value_name = "NAME")]
    pub model: Option<String>,

    /// Directory for the rendered heatmap. Defaults to the job directory.
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn submit_parses_target_and_job_flags() {
        let cli = Cli::parse_from([
            "alphasub",
            "-vv",
            "submit",
            "--server",
            "cluster",
            "--node",
            "38",
            "-n",
            "ns5a",
            "--fasta",
            "ns5a.fasta",
            "--num-recycle",
            "6",
            "--no-relax",
            "-S",
            "msa.qsc=-10",
        ]);
        assert_eq!(cli.verbose, 2);
        let Commands::Submit(args) = cli.command else {
            panic!("Expected 'submit' subcommand");
        };
        assert_eq!(args.target.server, "cluster");
        assert_eq!(args.target.node, Some(38));
        assert_eq!(args.job.job_name.as_deref(), Some("ns5a"));
        assert_eq!(args.job.input.fasta, Some(PathBuf::from("ns5a.fasta")));
        assert_eq!(args.job.num_recycle, Some(6));
        assert!(args.job.relax.no_relax);
        assert_eq!(args.job.set_values, vec!["msa.qsc=-10"]);
    }

    #[test]
    fn server_defaults_to_local() {
        let cli = Cli::parse_from(["alphasub", "connect"]);
        let Commands::Connect(args) = cli.command else {
            panic!("Expected 'connect' subcommand");
        };
        assert_eq!(args.target.server, "local");
        assert!(!args.no_gpu_query);
    }

    #[test]
    fn inputs_are_mutually_exclusive_and_required() {
        assert!(
            Cli::try_parse_from([
                "alphasub", "script", "-n", "x", "--sequence", "MKV", "--fasta", "a.fasta",
            ])
            .is_err()
        );
        assert!(Cli::try_parse_from(["alphasub", "script", "-n", "x"]).is_err());

        let cli = Cli::try_parse_from([
            "alphasub", "script", "-n", "x", "--a3m", "a.a3m", "b.a3m", "--gpu", "0",
        ])
        .unwrap();
        let Commands::Script(args) = cli.command else {
            panic!("Expected 'script' subcommand");
        };
        assert_eq!(args.job.input.a3m.len(), 2);
        assert_eq!(args.gpu, Some(0));
    }

    #[test]
    fn relax_flags_conflict() {
        assert!(
            Cli::try_parse_from([
                "alphasub", "script", "-n", "x", "--sequence", "MKV", "--relax", "--no-relax",
            ])
            .is_err()
        );
    }
}
