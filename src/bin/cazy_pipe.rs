use std::fs::File;
use std::process::ExitCode;

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, Subcommand};
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use cazy_pipeline::annotate::{self, AnnotateAction, AnnotateOptions, SystemAnnotator};
use cazy_pipeline::config::{ConfigLoader, ResolvedConfig};
use cazy_pipeline::domain::{SeqType, ToolSelection};
use cazy_pipeline::error::PipelineError;
use cazy_pipeline::fetch::{self, EntrezResolver, FetchAction, HttpArchiveFetcher, NcbiGenomeDownload};
use cazy_pipeline::fs_util;
use cazy_pipeline::layout::Layout;
use cazy_pipeline::metadata;
use cazy_pipeline::place;
use cazy_pipeline::summary;
use cazy_pipeline::timing::StageClock;

#[derive(Parser)]
#[command(name = "cazy-pipe")]
#[command(about = "CAZyme annotation pipeline: fetch, place, annotate, summarize")]
#[command(version, author)]
struct Cli {
    /// Path to a cazy-pipe.json supplying default directories.
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(about = "Download genome assemblies listed in the taxa metadata table")]
    Fetch(FetchArgs),
    #[command(about = "Copy genome files from a flat directory into per-tax-id subdirectories")]
    Place(PlaceArgs),
    #[command(about = "Run dbCAN CAZyme prediction over every genome")]
    Annotate(AnnotateArgs),
    #[command(about = "Aggregate dbCAN overview reports into summary tables")]
    Summarize(SummarizeArgs),
}

#[derive(Args)]
struct FetchArgs {
    /// CSV export of the Taxa_metadata worksheet.
    #[arg(short = 'm', long, value_name = "<file>")]
    metadata: Option<Utf8PathBuf>,

    /// Root of the per-tax-id genomes tree.
    #[arg(short = 'g', long, value_name = "<dir>")]
    genomes_dir: Option<Utf8PathBuf>,
}

#[derive(Args)]
struct PlaceArgs {
    /// Flat directory of genome files named `<prefix>_<taxid>.<ext>`.
    #[arg(short = 'd', long, value_name = "<dir>")]
    data_dir: Utf8PathBuf,

    /// Root of the per-tax-id genomes tree.
    #[arg(short = 'g', long, value_name = "<dir>")]
    genomes_dir: Option<Utf8PathBuf>,
}

#[derive(Args)]
struct AnnotateArgs {
    /// Directory having the FASTA format files.
    #[arg(short = 'd', long, value_name = "<dir>")]
    data_dir: Option<Utf8PathBuf>,

    /// Type of sequence input. protein=proteome; prok=prokaryote; meta=metagenome.
    #[arg(short = 's', long, value_name = "<str>")]
    seq_type: SeqType,

    /// Path to the dbCAN database directory.
    #[arg(long, value_name = "<dir>")]
    db_dir: Option<Utf8PathBuf>,

    /// Combination of tools to run.
    #[arg(short = 't', long, default_value = "all", value_name = "<tool1,tool2,tool3>")]
    tools: ToolSelection,

    /// Directory for the stage log; defaults to the data directory.
    #[arg(short = 'o', long, value_name = "<dir>")]
    out_dir: Option<Utf8PathBuf>,

    /// Extra arguments passed directly to the run_dbcan.py executable.
    #[arg(long, default_value = "", value_name = "<str>")]
    dbcan_args: String,
}

#[derive(Args)]
struct SummarizeArgs {
    /// Root of the per-tax-id genomes tree.
    #[arg(short = 'g', long, value_name = "<dir>")]
    genomes_dir: Option<Utf8PathBuf>,

    /// Directory for the summary tables.
    #[arg(short = 's', long, value_name = "<dir>")]
    summary_dir: Option<Utf8PathBuf>,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(error) = report.downcast_ref::<PipelineError>() {
            return ExitCode::from(map_exit_code(error));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &PipelineError) -> u8 {
    match error {
        PipelineError::MissingInput(_)
        | PipelineError::ConfigRead(_)
        | PipelineError::ConfigParse(_) => 2,
        PipelineError::EmptyDirectory(_) => 1,
        PipelineError::MissingExecutable { .. }
        | PipelineError::Http(_)
        | PipelineError::HttpStatus { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = ConfigLoader::resolve(cli.config.as_deref()).into_diagnostic()?;

    match cli.command {
        Commands::Fetch(args) => run_fetch(args, &config),
        Commands::Place(args) => run_place(args, &config),
        Commands::Annotate(args) => run_annotate(args, &config),
        Commands::Summarize(args) => run_summarize(args, &config),
    }
}

fn run_fetch(args: FetchArgs, config: &ResolvedConfig) -> miette::Result<()> {
    let metadata_path = args
        .metadata
        .or_else(|| config.metadata.clone())
        .ok_or(PipelineError::MissingInput(
            "metadata table (pass --metadata or set \"metadata\" in cazy-pipe.json)".to_string(),
        ))
        .into_diagnostic()?;
    let genomes_dir = required_genomes_dir(args.genomes_dir, config).into_diagnostic()?;
    let layout = resolve_layout(genomes_dir, config.summary_dir.clone());

    let clock = StageClock::start("fetch");
    let records = metadata::read_taxa_metadata(&metadata_path).into_diagnostic()?;
    tracing::info!(
        "{} genome record(s) read from {metadata_path}",
        records.len()
    );

    let logfile = stage_logfile(layout.genomes_root(), "fetch.log").into_diagnostic()?;
    let downloader = NcbiGenomeDownload::new(logfile).into_diagnostic()?;
    let fetcher = HttpArchiveFetcher::new().into_diagnostic()?;
    let report = fetch::fetch_genomes(&records, &EntrezResolver, &fetcher, &downloader, &layout)
        .into_diagnostic()?;

    tracing::info!(
        "fetch finished: {} downloaded, {} via ncbi-genome-download, {} already present, {} failed",
        report.count(FetchAction::Downloaded),
        report.count(FetchAction::Fallback),
        report.count(FetchAction::Skipped),
        report.count(FetchAction::Failed)
    );
    clock.finish("fetch");
    Ok(())
}

fn run_place(args: PlaceArgs, config: &ResolvedConfig) -> miette::Result<()> {
    let genomes_dir = required_genomes_dir(args.genomes_dir, config).into_diagnostic()?;

    let clock = StageClock::start("place");
    let report = place::place_genomes(&args.data_dir, &genomes_dir).into_diagnostic()?;
    tracing::info!(
        "place finished: {} file(s) copied, {} skipped",
        report.copied.len(),
        report.skipped.len()
    );
    clock.finish("place");
    Ok(())
}

fn run_annotate(args: AnnotateArgs, config: &ResolvedConfig) -> miette::Result<()> {
    let data_dir = args
        .data_dir
        .ok_or(PipelineError::MissingInput(
            "directory having FASTA format files (pass --data-dir)".to_string(),
        ))
        .into_diagnostic()?;
    annotate::validate_data_dir(&data_dir).into_diagnostic()?;
    tracing::info!("[data directory]: {data_dir}");

    let db_dir = args
        .db_dir
        .or_else(|| config.database_dir.clone())
        .ok_or(PipelineError::MissingInput(
            "database directory (pass --db-dir or set \"database_dir\" in cazy-pipe.json)"
                .to_string(),
        ))
        .into_diagnostic()?;

    let out_dir = match args.out_dir {
        Some(dir) => fs_util::mkdir(&dir).into_diagnostic()?,
        None => {
            tracing::info!("[output dir] not specified, output will be written to {data_dir}");
            data_dir.clone()
        }
    };
    tracing::info!("[output dir]: {out_dir}");

    let clock = StageClock::start("annotate");
    let logfile = stage_logfile(&out_dir, "annotate.log").into_diagnostic()?;
    let annotator = SystemAnnotator::new(logfile).into_diagnostic()?;
    let options = AnnotateOptions {
        seq_type: args.seq_type,
        tools: args.tools,
        db_dir,
        extra_args: args.dbcan_args,
    };
    let outcomes =
        annotate::annotate_directory(&annotator, &data_dir, &options).into_diagnostic()?;

    let annotated = count(&outcomes, AnnotateAction::Annotated);
    let skipped = count(&outcomes, AnnotateAction::Skipped);
    let failed = count(&outcomes, AnnotateAction::Failed);
    tracing::info!("annotate finished: {annotated} annotated, {skipped} skipped, {failed} failed");
    clock.finish("annotate");
    Ok(())
}

fn run_summarize(args: SummarizeArgs, config: &ResolvedConfig) -> miette::Result<()> {
    let genomes_dir = required_genomes_dir(args.genomes_dir, config).into_diagnostic()?;
    let layout = resolve_layout(
        genomes_dir,
        args.summary_dir.or_else(|| config.summary_dir.clone()),
    );

    let clock = StageClock::start("summarize");
    let result = summary::aggregate_genomes(&layout).into_diagnostic()?;
    tracing::info!(
        "summarize finished: {} genome(s), {} famil(ies) in {}",
        result.genomes,
        result.families,
        result.combined_path
    );
    clock.finish("summarize");
    Ok(())
}

fn required_genomes_dir(
    arg: Option<Utf8PathBuf>,
    config: &ResolvedConfig,
) -> Result<Utf8PathBuf, PipelineError> {
    arg.or_else(|| config.genomes_dir.clone())
        .ok_or(PipelineError::MissingInput(
            "genomes directory (pass --genomes-dir or set \"genomes_dir\" in cazy-pipe.json)"
                .to_string(),
        ))
}

fn resolve_layout(genomes_dir: Utf8PathBuf, summary_dir: Option<Utf8PathBuf>) -> Layout {
    let summary_dir = summary_dir.unwrap_or_else(|| match genomes_dir.parent() {
        Some(parent) => parent.join("summary"),
        None => Utf8PathBuf::from("summary"),
    });
    Layout::new(genomes_dir, summary_dir)
}

fn stage_logfile(dir: &Utf8Path, name: &str) -> Result<File, PipelineError> {
    fs_util::mkdir(dir)?;
    File::create(dir.join(name).as_std_path())
        .map_err(|err| PipelineError::Filesystem(format!("create log file {name}: {err}")))
}

fn count(outcomes: &[annotate::AnnotateOutcome], action: AnnotateAction) -> usize {
    outcomes
        .iter()
        .filter(|outcome| outcome.action == action)
        .count()
}
