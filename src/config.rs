use std::fs;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::domain::{CountsFromAbundance, QuantTool, Species, TableFormat};
use crate::error::TxiError;

pub const CONFIG_FILE: &str = "kira-txi.json";

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub base_dir: Option<PathBuf>,
    #[serde(default)]
    pub data_type: Option<String>,
    #[serde(default)]
    pub quant_file: Option<String>,
    #[serde(default)]
    pub transcript_gene_map: Option<TranscriptGeneMapEntry>,
    #[serde(default)]
    pub counts_from_abundance: Option<CountsFromAbundance>,
    #[serde(default)]
    pub ignore_transcript_version: Option<bool>,
    #[serde(default)]
    pub ignore_after_bar: Option<bool>,
    #[serde(default)]
    pub sample_sheet: Option<PathBuf>,
    #[serde(default)]
    pub output: Option<PathBuf>,
    #[serde(default)]
    pub format: Option<TableFormat>,
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(untagged)]
pub enum TranscriptGeneMapEntry {
    Shorthand(String),
    Detailed(TranscriptGeneMapObject),
}

#[derive(Debug, Deserialize, Serialize)]
pub struct TranscriptGeneMapObject {
    #[serde(default)]
    pub species: Option<String>,
    #[serde(default)]
    pub path: Option<PathBuf>,
    #[serde(default)]
    pub host: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MapSource {
    Species { species: Species, host: Option<String> },
    File(PathBuf),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    pub schema_version: u32,
    pub base_dir: Option<PathBuf>,
    pub data_type: QuantTool,
    pub quant_file: String,
    pub map_source: MapSource,
    pub counts_from_abundance: CountsFromAbundance,
    pub ignore_transcript_version: bool,
    pub ignore_after_bar: bool,
    pub sample_sheet: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub format: Option<TableFormat>,
}

impl ResolvedConfig {
    // An explicit format wins; otherwise a `.csv` output path selects CSV.
    pub fn table_format(&self) -> TableFormat {
        if let Some(format) = self.format {
            return format;
        }
        let csv_output = self
            .output
            .as_ref()
            .and_then(|path| path.extension())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));
        if csv_output {
            TableFormat::Csv
        } else {
            TableFormat::Tsv
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    pub fn resolve(path: Option<&str>) -> Result<ResolvedConfig, TxiError> {
        let config_path = match path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(CONFIG_FILE),
        };

        if !config_path.exists() {
            if path.is_some() {
                return Err(TxiError::ConfigRead(config_path));
            }
            return Self::resolve_config(Config::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| TxiError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| TxiError::ConfigParse(err.to_string()))?;
        tracing::debug!(path = %config_path.display(), "loaded config");

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<ResolvedConfig, TxiError> {
        let schema_version = config.schema_version.unwrap_or(1);
        let data_type = match config.data_type {
            Some(value) => value.parse()?,
            None => QuantTool::Salmon,
        };
        let quant_file = config
            .quant_file
            .unwrap_or_else(|| data_type.default_quant_file().to_string());

        let map_source = match config.transcript_gene_map {
            None => default_map_source(),
            Some(TranscriptGeneMapEntry::Shorthand(species)) => MapSource::Species {
                species: species.parse()?,
                host: None,
            },
            Some(TranscriptGeneMapEntry::Detailed(obj)) => match (obj.path, obj.species) {
                (Some(path), _) => MapSource::File(path),
                (None, Some(species)) => MapSource::Species {
                    species: species.parse()?,
                    host: obj.host,
                },
                (None, None) => MapSource::Species {
                    species: Species::Human,
                    host: obj.host,
                },
            },
        };

        Ok(ResolvedConfig {
            schema_version,
            base_dir: config.base_dir,
            data_type,
            quant_file,
            map_source,
            counts_from_abundance: config.counts_from_abundance.unwrap_or_default(),
            ignore_transcript_version: config.ignore_transcript_version.unwrap_or(true),
            ignore_after_bar: config.ignore_after_bar.unwrap_or(true),
            sample_sheet: config.sample_sheet,
            output: config.output,
            format: config.format,
        })
    }
}

pub fn default_map_source() -> MapSource {
    MapSource::Species {
        species: Species::Human,
        host: None,
    }
}
