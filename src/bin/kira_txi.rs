use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use miette::IntoDiagnostic;
use tracing_subscriber::EnvFilter;

use kira_tximport::app::{App, RunOptions};
use kira_tximport::biomart::{BiomartHttpClient, DEFAULT_BIOMART_HOST};
use kira_tximport::config::{ConfigLoader, MapSource, ResolvedConfig};
use kira_tximport::domain::{CountsFromAbundance, QuantTool, Species, TableFormat};
use kira_tximport::error::TxiError;
use kira_tximport::output::{JsonOutput, LogSink, write_table};
use kira_tximport::store::Store;

#[derive(Parser)]
#[command(name = "kira-txi")]
#[command(
    about = "Aggregate per-sample transcript quantifications into one gene-level expression table"
)]
#[command(version, author)]
struct Cli {
    #[arg(help = "Directory whose entries are per-sample quantification folders")]
    base_dir: Option<PathBuf>,

    #[arg(long)]
    config: Option<String>,

    #[arg(long, value_enum, help = "Quantification tool that produced the files")]
    data_type: Option<QuantTool>,

    #[arg(long, help = "File inside each sample folder (default depends on --data-type)")]
    quant_file: Option<String>,

    #[arg(
        long,
        conflicts_with = "tx2gene",
        help = "Species whose transcript-gene map is fetched from Ensembl BioMart"
    )]
    species: Option<String>,

    #[arg(long, help = "Two-column transcript/gene table used instead of BioMart")]
    tx2gene: Option<PathBuf>,

    #[arg(long)]
    biomart_host: Option<String>,

    #[arg(long, help = "Fetch the species map again even if it is cached")]
    refresh_map: bool,

    #[arg(long, value_enum)]
    counts_from_abundance: Option<CountsFromAbundance>,

    #[arg(long, help = "Match transcript ids including their version suffix")]
    keep_transcript_version: bool,

    #[arg(long, help = "CSV/TSV keyed by a `sample` column; other columns become metadata")]
    sample_sheet: Option<PathBuf>,

    #[arg(short, long, help = "Output file (stdout when omitted)")]
    output: Option<PathBuf>,

    #[arg(long, value_enum)]
    format: Option<TableFormat>,

    #[arg(long, help = "Print a JSON run summary on stdout (needs an output path)")]
    json: bool,
}

fn main() -> ExitCode {
    if let Err(report) = run() {
        eprintln!("{report:?}");
        if let Some(err) = report.downcast_ref::<TxiError>() {
            return ExitCode::from(map_exit_code(err));
        }
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn map_exit_code(error: &TxiError) -> u8 {
    match error {
        TxiError::Discover { .. }
        | TxiError::UnknownQuantTool(_)
        | TxiError::InvalidSpecies(_)
        | TxiError::QuantRead { .. }
        | TxiError::QuantParse { .. }
        | TxiError::Tx2GeneRead { .. }
        | TxiError::Tx2GeneParse(_)
        | TxiError::NoTranscriptsMapped { .. }
        | TxiError::SampleSheet { .. }
        | TxiError::ConfigRead(_)
        | TxiError::ConfigParse(_)
        | TxiError::MissingBaseDir
        | TxiError::SummaryNeedsOutput => 2,
        TxiError::BiomartHttp(_) | TxiError::BiomartStatus { .. } => 3,
        _ => 1,
    }
}

fn run() -> miette::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let resolved = ConfigLoader::resolve(cli.config.as_deref())?;
    let resolved = apply_overrides(resolved, &cli)?;

    let host = match &resolved.map_source {
        MapSource::Species { host: Some(host), .. } => host.clone(),
        _ => DEFAULT_BIOMART_HOST.to_string(),
    };
    let biomart = BiomartHttpClient::with_host(&host)?;
    let app = match &resolved.map_source {
        MapSource::Species { .. } => App::new(Store::new()?, biomart),
        MapSource::File(_) => App::without_cache(biomart),
    };

    let options = RunOptions {
        refresh_map: cli.refresh_map,
    };
    let result = app.run(&resolved, &options, &LogSink)?;
    write_table(
        &result.table,
        resolved.output.as_deref(),
        resolved.table_format(),
    )?;

    if cli.json {
        JsonOutput::print_summary(&result.summary).into_diagnostic()?;
    }
    Ok(())
}

fn apply_overrides(mut resolved: ResolvedConfig, cli: &Cli) -> Result<ResolvedConfig, TxiError> {
    if let Some(base_dir) = &cli.base_dir {
        resolved.base_dir = Some(base_dir.clone());
    }
    if let Some(data_type) = cli.data_type {
        let default_file = resolved.data_type.default_quant_file();
        if cli.quant_file.is_none() && resolved.quant_file == default_file {
            resolved.quant_file = data_type.default_quant_file().to_string();
        }
        resolved.data_type = data_type;
    }
    if let Some(quant_file) = &cli.quant_file {
        resolved.quant_file = quant_file.clone();
    }
    if let Some(path) = &cli.tx2gene {
        resolved.map_source = MapSource::File(path.clone());
    }
    if let Some(species) = &cli.species {
        let species: Species = species.parse()?;
        resolved.map_source = MapSource::Species {
            species,
            host: None,
        };
    }
    if let Some(host) = &cli.biomart_host {
        if let MapSource::Species { host: current, .. } = &mut resolved.map_source {
            *current = Some(host.clone());
        }
    }
    if let Some(mode) = cli.counts_from_abundance {
        resolved.counts_from_abundance = mode;
    }
    if cli.keep_transcript_version {
        resolved.ignore_transcript_version = false;
    }
    if let Some(sheet) = &cli.sample_sheet {
        resolved.sample_sheet = Some(sheet.clone());
    }
    if let Some(output) = &cli.output {
        resolved.output = Some(output.clone());
    }
    if let Some(format) = cli.format {
        resolved.format = Some(format);
    }
    if cli.json && resolved.output.is_none() {
        return Err(TxiError::SummaryNeedsOutput);
    }
    Ok(resolved)
}
