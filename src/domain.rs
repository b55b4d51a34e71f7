use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::TxiError;

static BIOMART_DATASET: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z][a-z0-9]*_gene_ensembl$").expect("valid dataset regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum QuantTool {
    Salmon,
    Kallisto,
    Rsem,
}

impl QuantTool {
    pub fn default_quant_file(&self) -> &'static str {
        match self {
            QuantTool::Salmon => "quant.sf",
            QuantTool::Kallisto => "abundance.tsv",
            QuantTool::Rsem => "quant.isoforms.results",
        }
    }
}

impl fmt::Display for QuantTool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QuantTool::Salmon => write!(f, "salmon"),
            QuantTool::Kallisto => write!(f, "kallisto"),
            QuantTool::Rsem => write!(f, "rsem"),
        }
    }
}

impl FromStr for QuantTool {
    type Err = TxiError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "salmon" => Ok(QuantTool::Salmon),
            "kallisto" => Ok(QuantTool::Kallisto),
            "rsem" => Ok(QuantTool::Rsem),
            _ => Err(TxiError::UnknownQuantTool(value.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Species {
    Human,
    Mouse,
    Rat,
    Zebrafish,
    Dataset(String),
}

impl Species {
    pub fn biomart_dataset(&self) -> &str {
        match self {
            Species::Human => "hsapiens_gene_ensembl",
            Species::Mouse => "mmusculus_gene_ensembl",
            Species::Rat => "rnorvegicus_gene_ensembl",
            Species::Zebrafish => "drerio_gene_ensembl",
            Species::Dataset(name) => name,
        }
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Species::Human => write!(f, "human"),
            Species::Mouse => write!(f, "mouse"),
            Species::Rat => write!(f, "rat"),
            Species::Zebrafish => write!(f, "zebrafish"),
            Species::Dataset(name) => write!(f, "{name}"),
        }
    }
}

impl FromStr for Species {
    type Err = TxiError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "human" | "homo_sapiens" | "hsapiens" => Ok(Species::Human),
            "mouse" | "mus_musculus" | "mmusculus" => Ok(Species::Mouse),
            "rat" | "rattus_norvegicus" | "rnorvegicus" => Ok(Species::Rat),
            "zebrafish" | "danio_rerio" | "drerio" => Ok(Species::Zebrafish),
            other if BIOMART_DATASET.is_match(other) => Ok(Species::Dataset(normalized)),
            _ => Err(TxiError::InvalidSpecies(value.to_string())),
        }
    }
}

// The CLI and the config file accept the same spellings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum CountsFromAbundance {
    #[default]
    No,
    #[serde(alias = "scaledTPM")]
    #[value(alias = "scaledTPM")]
    ScaledTpm,
    #[serde(alias = "lengthScaledTPM")]
    #[value(alias = "lengthScaledTPM")]
    LengthScaledTpm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum TableFormat {
    #[default]
    Tsv,
    Csv,
}

impl TableFormat {
    pub fn delimiter(&self) -> u8 {
        match self {
            TableFormat::Tsv => b'\t',
            TableFormat::Csv => b',',
        }
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_quant_tool_case_insensitive() {
        let tool: QuantTool = "Salmon".parse().unwrap();
        assert_eq!(tool, QuantTool::Salmon);
        assert_eq!(tool.default_quant_file(), "quant.sf");
    }

    #[test]
    fn parse_quant_tool_unknown() {
        let err = "stringtie".parse::<QuantTool>().unwrap_err();
        assert_matches!(err, TxiError::UnknownQuantTool(_));
    }

    #[test]
    fn species_aliases_resolve_to_datasets() {
        let human: Species = "Homo_sapiens".parse().unwrap();
        assert_eq!(human.biomart_dataset(), "hsapiens_gene_ensembl");

        let cow: Species = "btaurus_gene_ensembl".parse().unwrap();
        assert_eq!(cow, Species::Dataset("btaurus_gene_ensembl".to_string()));
    }

    #[test]
    fn species_invalid() {
        let err = "martian".parse::<Species>().unwrap_err();
        assert_matches!(err, TxiError::InvalidSpecies(_));
    }

    #[test]
    fn counts_from_abundance_spellings_match_config() {
        for (value, expected) in [
            ("scaled_tpm", CountsFromAbundance::ScaledTpm),
            ("lengthScaledTPM", CountsFromAbundance::LengthScaledTpm),
        ] {
            let cli = <CountsFromAbundance as ValueEnum>::from_str(value, false).unwrap();
            let config: CountsFromAbundance =
                serde_json::from_value(serde_json::Value::from(value)).unwrap();
            assert_eq!(cli, expected);
            assert_eq!(config, expected);
        }
    }
}
