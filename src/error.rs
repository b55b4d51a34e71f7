use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum TxiError {
    #[error("failed to list sample directory {path}: {message}")]
    Discover { path: PathBuf, message: String },

    #[error("unknown quantification tool: {0}")]
    #[diagnostic(help("supported tools: salmon, kallisto, rsem"))]
    UnknownQuantTool(String),

    #[error("invalid species: {0}")]
    #[diagnostic(help("use human, mouse, rat, zebrafish or a BioMart dataset such as btaurus_gene_ensembl"))]
    InvalidSpecies(String),

    #[error("failed to read quantification file {path}: {message}")]
    QuantRead { path: PathBuf, message: String },

    #[error("malformed quantification file {path}: {message}")]
    QuantParse { path: PathBuf, message: String },

    #[error("failed to read transcript-gene map {path}: {message}")]
    Tx2GeneRead { path: PathBuf, message: String },

    #[error("malformed transcript-gene map: {0}")]
    Tx2GeneParse(String),

    #[error("no transcripts of sample {sample} are present in the transcript-gene map")]
    #[diagnostic(help("check that transcript ids and the map come from the same annotation release"))]
    NoTranscriptsMapped { sample: String },

    #[error("failed to read sample sheet {path}: {message}")]
    SampleSheet { path: PathBuf, message: String },

    #[error("BioMart request failed: {0}")]
    BiomartHttp(String),

    #[error("BioMart returned status {status}: {message}")]
    BiomartStatus { status: u16, message: String },

    #[error("abundance matrix is {rows}x{cols} but the result has {samples} samples and {genes} genes")]
    MatrixShape {
        rows: usize,
        cols: usize,
        samples: usize,
        genes: usize,
    },

    #[error("sample metadata index does not match the abundance matrix index")]
    IndexMismatch,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("no sample directory given (pass BASE_DIR or set base_dir in kira-txi.json)")]
    MissingBaseDir,

    #[error("--json prints the summary on stdout, so the table needs an output path")]
    #[diagnostic(help("pass --output or set output in kira-txi.json"))]
    SummaryNeedsOutput,

    #[error("failed to write output: {0}")]
    Output(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
