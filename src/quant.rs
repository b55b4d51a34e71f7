use std::path::Path;

use csv::ReaderBuilder;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::domain::QuantTool;
use crate::error::TxiError;
use crate::fs_util::open_text;

#[derive(Debug, Clone, PartialEq)]
pub struct TranscriptRecord {
    pub name: String,
    pub length: f64,
    pub effective_length: f64,
    pub tpm: f64,
    pub num_reads: f64,
}

#[derive(Debug, Deserialize)]
struct SalmonRow {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "Length")]
    length: f64,
    #[serde(rename = "EffectiveLength")]
    effective_length: f64,
    #[serde(rename = "TPM")]
    tpm: f64,
    #[serde(rename = "NumReads")]
    num_reads: f64,
}

#[derive(Debug, Deserialize)]
struct KallistoRow {
    target_id: String,
    length: f64,
    eff_length: f64,
    est_counts: f64,
    tpm: f64,
}

#[derive(Debug, Deserialize)]
struct RsemRow {
    transcript_id: String,
    length: f64,
    effective_length: f64,
    expected_count: f64,
    #[serde(rename = "TPM")]
    tpm: f64,
}

impl From<SalmonRow> for TranscriptRecord {
    fn from(row: SalmonRow) -> Self {
        Self {
            name: row.name,
            length: row.length,
            effective_length: row.effective_length,
            tpm: row.tpm,
            num_reads: row.num_reads,
        }
    }
}

impl From<KallistoRow> for TranscriptRecord {
    fn from(row: KallistoRow) -> Self {
        Self {
            name: row.target_id,
            length: row.length,
            effective_length: row.eff_length,
            tpm: row.tpm,
            num_reads: row.est_counts,
        }
    }
}

impl From<RsemRow> for TranscriptRecord {
    fn from(row: RsemRow) -> Self {
        Self {
            name: row.transcript_id,
            length: row.length,
            effective_length: row.effective_length,
            tpm: row.tpm,
            num_reads: row.expected_count,
        }
    }
}

pub fn read_quant_file(path: &Path, tool: QuantTool) -> Result<Vec<TranscriptRecord>, TxiError> {
    match tool {
        QuantTool::Salmon => read_rows::<SalmonRow>(path),
        QuantTool::Kallisto => read_rows::<KallistoRow>(path),
        QuantTool::Rsem => read_rows::<RsemRow>(path),
    }
}

fn read_rows<T>(path: &Path) -> Result<Vec<TranscriptRecord>, TxiError>
where
    T: DeserializeOwned + Into<TranscriptRecord>,
{
    let reader = open_text(path).map_err(|err| TxiError::QuantRead {
        path: path.to_path_buf(),
        message: err.to_string(),
    })?;
    let mut rdr = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_reader(reader);

    let mut records = Vec::new();
    for row in rdr.deserialize::<T>() {
        let row = row.map_err(|err| TxiError::QuantParse {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        records.push(row.into());
    }
    Ok(records)
}
