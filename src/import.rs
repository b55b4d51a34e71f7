use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use ndarray::{Array2, Axis};
use serde::Deserialize;

use crate::discover::SampleQuantPath;
use crate::domain::{CountsFromAbundance, QuantTool};
use crate::error::TxiError;
use crate::matrix::AbundanceMatrix;
use crate::quant::read_quant_file;
use crate::sample_sheet::SampleSheet;
use crate::table::{Cell, LabeledTable};
use crate::tx2gene::{IdNormalization, TranscriptGeneMap};

pub const SAMPLE_INDEX: &str = "sample";
pub const GENE_INDEX: &str = "gene_id";
pub const DEFAULT_SPARSE_THRESHOLD: f64 = 0.25;

#[derive(Debug, Clone)]
pub struct ImportOptions {
    pub counts_from_abundance: CountsFromAbundance,
    pub normalization: IdNormalization,
    pub sparse_threshold: f64,
    pub sample_sheet: Option<SampleSheet>,
}

impl Default for ImportOptions {
    fn default() -> Self {
        Self {
            counts_from_abundance: CountsFromAbundance::No,
            normalization: IdNormalization::default(),
            sparse_threshold: DEFAULT_SPARSE_THRESHOLD,
            sample_sheet: None,
        }
    }
}

/// `x` holds counts; `obs` is indexed by sample id and `var` by gene id.
#[derive(Debug, Clone)]
pub struct ImportResult {
    pub x: AbundanceMatrix,
    pub abundance: Array2<f64>,
    pub length: Array2<f64>,
    pub obs: LabeledTable,
    pub var: LabeledTable,
    pub counts_from_abundance: CountsFromAbundance,
}

impl ImportResult {
    pub fn n_samples(&self) -> usize {
        self.obs.n_rows()
    }

    pub fn n_genes(&self) -> usize {
        self.var.n_rows()
    }
}

#[derive(Debug, Default, Clone)]
struct GeneAccum {
    counts: f64,
    tpm: f64,
    tpm_weighted_length: f64,
    length_sum: f64,
    transcripts: u64,
}

#[derive(Debug)]
struct SampleSummary {
    genes: HashMap<String, GeneAccum>,
    num_transcripts: u64,
    num_mapped: u64,
}

#[derive(Debug, Default, Deserialize)]
struct SalmonMetaInfo {
    num_processed: Option<u64>,
    num_mapped: Option<u64>,
    percent_mapped: Option<f64>,
}

pub fn tximport(
    samples: &[SampleQuantPath],
    tool: QuantTool,
    map: &TranscriptGeneMap,
    options: &ImportOptions,
) -> Result<ImportResult, TxiError> {
    if samples.is_empty() {
        tracing::warn!("no samples to import");
    }
    let map = map.normalized(options.normalization);

    let summaries = samples
        .iter()
        .map(|sample| summarize_sample(sample, tool, &map, options.normalization))
        .collect::<Result<Vec<_>, TxiError>>()?;

    let mut gene_transcripts: BTreeMap<&str, u64> = BTreeMap::new();
    for summary in &summaries {
        for (gene, accum) in &summary.genes {
            let entry = gene_transcripts.entry(gene.as_str()).or_default();
            *entry = (*entry).max(accum.transcripts);
        }
    }
    let genes = gene_transcripts.keys().map(|gene| gene.to_string()).collect::<Vec<_>>();

    let shape = (samples.len(), genes.len());
    let mut counts = Array2::<f64>::zeros(shape);
    let mut abundance = Array2::<f64>::zeros(shape);
    let mut length = Array2::<f64>::from_elem(shape, f64::NAN);
    for (row, summary) in summaries.iter().enumerate() {
        for (col, gene) in genes.iter().enumerate() {
            let Some(accum) = summary.genes.get(gene) else {
                continue;
            };
            counts[[row, col]] = accum.counts;
            abundance[[row, col]] = accum.tpm;
            length[[row, col]] = if accum.tpm > 0.0 {
                accum.tpm_weighted_length / accum.tpm
            } else {
                accum.length_sum / accum.transcripts as f64
            };
        }
    }
    fill_missing_lengths(&mut length);

    let counts = match options.counts_from_abundance {
        CountsFromAbundance::No => counts,
        CountsFromAbundance::ScaledTpm => scale_to_library_size(&abundance, &counts),
        CountsFromAbundance::LengthScaledTpm => {
            let mean_length = length.mean_axis(Axis(0));
            let mut weighted = abundance.clone();
            if let Some(mean_length) = mean_length {
                for mut row in weighted.rows_mut() {
                    row *= &mean_length;
                }
            }
            scale_to_library_size(&weighted, &counts)
        }
    };

    let obs = build_obs(samples, &summaries, tool, options.sample_sheet.as_ref())?;
    let mut var = LabeledTable::new(GENE_INDEX, genes);
    var.push_column(
        "num_transcripts",
        gene_transcripts
            .values()
            .map(|count| Cell::Integer(*count))
            .collect(),
    )?;

    tracing::info!(
        samples = obs.n_rows(),
        genes = var.n_rows(),
        "summarized transcripts to genes"
    );

    Ok(ImportResult {
        x: AbundanceMatrix::from_dense(counts, options.sparse_threshold),
        abundance,
        length,
        obs,
        var,
        counts_from_abundance: options.counts_from_abundance,
    })
}

fn summarize_sample(
    sample: &SampleQuantPath,
    tool: QuantTool,
    map: &TranscriptGeneMap,
    rules: IdNormalization,
) -> Result<SampleSummary, TxiError> {
    let records = read_quant_file(&sample.path, tool)?;
    if records.is_empty() {
        return Err(TxiError::QuantParse {
            path: sample.path.clone(),
            message: "no transcript records".to_string(),
        });
    }

    let mut genes: HashMap<String, GeneAccum> = HashMap::new();
    let mut num_mapped = 0u64;
    for record in &records {
        let Some(gene) = map.gene_for(rules.normalize(&record.name)) else {
            continue;
        };
        num_mapped += 1;
        let accum = genes.entry(gene.to_string()).or_default();
        accum.counts += record.num_reads;
        accum.tpm += record.tpm;
        accum.tpm_weighted_length += record.tpm * record.effective_length;
        accum.length_sum += record.effective_length;
        accum.transcripts += 1;
    }

    let num_transcripts = records.len() as u64;
    if num_mapped == 0 {
        return Err(TxiError::NoTranscriptsMapped {
            sample: sample.sample_id.clone(),
        });
    }
    if num_mapped < num_transcripts {
        tracing::warn!(
            sample = %sample.sample_id,
            dropped = num_transcripts - num_mapped,
            "transcripts missing from the transcript-gene map were dropped"
        );
    }

    Ok(SampleSummary {
        genes,
        num_transcripts,
        num_mapped,
    })
}

fn fill_missing_lengths(length: &mut Array2<f64>) {
    for mut column in length.columns_mut() {
        let defined = column.iter().filter(|value| !value.is_nan()).collect::<Vec<_>>();
        if defined.is_empty() || defined.len() == column.len() {
            continue;
        }
        let mean = defined.iter().copied().sum::<f64>() / defined.len() as f64;
        column.mapv_inplace(|value| if value.is_nan() { mean } else { value });
    }
}

fn scale_to_library_size(values: &Array2<f64>, counts: &Array2<f64>) -> Array2<f64> {
    let mut scaled = values.clone();
    for (mut row, count_row) in scaled.rows_mut().into_iter().zip(counts.rows()) {
        let library_size = count_row.sum();
        let total = row.sum();
        if total > 0.0 {
            row.mapv_inplace(|value| value * library_size / total);
        } else {
            row.fill(0.0);
        }
    }
    scaled
}

fn build_obs(
    samples: &[SampleQuantPath],
    summaries: &[SampleSummary],
    tool: QuantTool,
    sheet: Option<&SampleSheet>,
) -> Result<LabeledTable, TxiError> {
    let ids = samples
        .iter()
        .map(|sample| sample.sample_id.clone())
        .collect::<Vec<_>>();
    let mut obs = LabeledTable::new(SAMPLE_INDEX, ids);

    obs.push_column(
        "quant_file",
        samples
            .iter()
            .map(|sample| Cell::Text(sample.path.display().to_string()))
            .collect(),
    )?;
    obs.push_column(
        "num_transcripts",
        summaries
            .iter()
            .map(|summary| Cell::Integer(summary.num_transcripts))
            .collect(),
    )?;
    obs.push_column(
        "num_mapped_transcripts",
        summaries
            .iter()
            .map(|summary| Cell::Integer(summary.num_mapped))
            .collect(),
    )?;

    if tool == QuantTool::Salmon {
        let meta = samples
            .iter()
            .map(|sample| read_salmon_meta_info(&sample.path))
            .collect::<Vec<_>>();
        obs.push_column(
            "num_processed",
            meta.iter().map(|info| Cell::from(info.num_processed)).collect(),
        )?;
        obs.push_column(
            "num_mapped",
            meta.iter().map(|info| Cell::from(info.num_mapped)).collect(),
        )?;
        obs.push_column(
            "percent_mapped",
            meta.iter().map(|info| Cell::from(info.percent_mapped)).collect(),
        )?;
    }

    if let Some(sheet) = sheet {
        for sample in samples {
            if !sheet.contains(&sample.sample_id) {
                tracing::warn!(sample = %sample.sample_id, "sample missing from sample sheet");
            }
        }
        for (column, name) in sheet.columns().iter().enumerate() {
            let values = samples
                .iter()
                .map(|sample| {
                    sheet
                        .value(&sample.sample_id, column)
                        .map_or(Cell::Empty, |value| Cell::Text(value.to_string()))
                })
                .collect();
            obs.push_column(name.clone(), values)?;
        }
    }

    Ok(obs)
}

fn read_salmon_meta_info(quant_path: &Path) -> SalmonMetaInfo {
    let Some(dir) = quant_path.parent() else {
        return SalmonMetaInfo::default();
    };
    let path = dir.join("aux_info").join("meta_info.json");
    let Ok(content) = fs::read_to_string(&path) else {
        return SalmonMetaInfo::default();
    };
    match serde_json::from_str(&content) {
        Ok(info) => info,
        Err(err) => {
            tracing::warn!(
                path = %path.display(),
                error = %err,
                "ignoring unreadable salmon meta_info.json"
            );
            SalmonMetaInfo::default()
        }
    }
}
