use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use juno_blast::cluster::LsfScheduler;
use juno_blast::config::render_yaml;
use juno_blast::pipeline::SnakemakeEngine;
use juno_blast::{
    BlastParameters, ExecutionMode, InputMode, PipelineDriver, RunSettings, SampleManifestBuilder,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "juno-blast",
    version,
    about = "Juno-blast pipeline. Automated pipeline for blasting fasta files."
)]
struct Cli {
    /// Log debug output.
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Discover samples, write the configuration and run BLAST for each of them.
    Run(RunArgs),
    /// Print the sample sheet for an input directory without running anything.
    Samples {
        /// Input directory (files directly inside it, not in subdirectories).
        #[arg(short, long, value_name = "DIR")]
        input: PathBuf,
        /// Which files make up a sample: assembly, reads or both.
        #[arg(long, default_value = "assembly")]
        mode: InputMode,
    },
}

#[derive(clap::Args, Debug)]
struct RunArgs {
    /// Input directory holding the assemblies (fasta) of every sample.
    #[arg(short, long, value_name = "DIR")]
    input: PathBuf,
    /// Output directory.
    #[arg(short, long, value_name = "DIR", default_value = "output")]
    output: PathBuf,
    /// Directory containing the BLAST nt database.
    #[arg(short, long = "db-dir", value_name = "DIR", default_value = "/mnt/db/juno/blast")]
    db_dir: PathBuf,
    /// E-value threshold: expected hits of similar score found by chance.
    #[arg(short, long, value_name = "NUM", default_value_t = 1e-10)]
    evalue: f64,
    /// Maximum number of HSPs kept for any single query-subject pair.
    #[arg(long, value_name = "INT", default_value_t = 10)]
    max_hsps: u32,
    /// Delete hits enveloped by at least this many higher-scoring hits.
    #[arg(long, value_name = "INT", default_value_t = 10)]
    culling_limit: u32,
    /// Cores available to the workflow engine.
    #[arg(short, long, value_name = "INT", default_value_t = 300)]
    cores: u32,
    /// Threads per BLAST job in direct execution.
    #[arg(short, long, value_name = "INT", default_value_t = 1)]
    threads: u32,
    /// Cluster queue jobs are submitted to.
    #[arg(short, long, value_name = "STR", default_value = "bio")]
    queue: String,
    /// Which files make up a sample: assembly, reads or both.
    #[arg(long, default_value = "assembly")]
    mode: InputMode,
    /// Run through the workflow engine or submit one job per sample.
    #[arg(long, default_value = "workflow")]
    execution: ExecutionMode,
    /// Run the workflow locally instead of on the cluster.
    #[arg(short, long)]
    local: bool,
    /// Unlock the output directory (passed to the workflow engine).
    #[arg(short, long)]
    unlock: bool,
    /// Show what would run without running it.
    #[arg(short = 'n', long)]
    dryrun: bool,
    /// Re-run jobs marked as incomplete (passed to the workflow engine).
    #[arg(long)]
    rerunincomplete: bool,
    /// Restart failed workflow jobs this many times.
    #[arg(long, value_name = "INT", default_value_t = 0)]
    restart_times: u32,
    /// Directory for sample_sheet.yaml and user_parameters.yaml.
    #[arg(long, value_name = "DIR", default_value = "config")]
    config_dir: PathBuf,
    /// Workflow definition used in workflow execution.
    #[arg(long, value_name = "FILE", default_value = "Snakefile")]
    snakefile: PathBuf,
    /// Give up waiting for a cluster job after this many seconds.
    #[arg(long, value_name = "SECS")]
    wait_timeout: Option<u64>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run(args) => run_pipeline(args)?,
        Commands::Samples { input, mode } => print_samples(input, mode)?,
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run_pipeline(args: RunArgs) -> Result<()> {
    let settings = RunSettings::new(&args.input, &args.output)
        .with_db_dir(&args.db_dir)
        .with_blast_parameters(BlastParameters {
            evalue: args.evalue,
            max_hsps: args.max_hsps,
            culling_limit: args.culling_limit,
        })
        .with_input_mode(args.mode)
        .with_execution(args.execution)
        .with_resources(args.cores, args.threads)
        .with_queue(args.queue)
        .with_local(args.local)
        .with_dry_run(args.dryrun)
        .with_workflow_flags(args.unlock, args.rerunincomplete)
        .with_restart_times(args.restart_times)
        .with_config_dir(&args.config_dir)
        .with_wait_timeout(args.wait_timeout.map(Duration::from_secs));

    let workdir = std::env::current_dir().context("failed to resolve working directory")?;
    let driver = PipelineDriver::new(
        settings,
        SampleManifestBuilder::new(),
        LsfScheduler::new(),
        SnakemakeEngine::new(),
    )
    .with_workflow_files(args.snakefile, workdir);

    let report = driver
        .run()
        .with_context(|| format!("Juno-blast failed on {}", args.input.display()))?;

    println!(
        "{} samples\tsheet={}\tparameters={}",
        report.manifest.len(),
        report.sample_sheet.display(),
        report.user_parameters.display()
    );
    for planned in &report.planned {
        println!("planned\t{}\t{}\t{}", planned.sample_id, planned.job, planned.command);
    }
    for outcome in &report.completed {
        println!(
            "ended\t{}\tqueue={}\telapsed={:.1}s",
            outcome.name,
            outcome.queue,
            outcome.elapsed.as_secs_f64()
        );
    }

    Ok(())
}

fn print_samples(input: PathBuf, mode: InputMode) -> Result<()> {
    let manifest = SampleManifestBuilder::new()
        .build(&input, mode)
        .with_context(|| format!("failed to discover samples in {}", input.display()))?;
    let yaml = render_yaml(&manifest).context("failed to render sample sheet")?;
    print!("{yaml}");
    Ok(())
}
