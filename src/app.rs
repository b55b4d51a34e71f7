use std::time::{Duration, Instant};

use serde::Serialize;

use crate::biomart::BiomartClient;
use crate::config::{MapSource, ResolvedConfig};
use crate::discover::discover_quant_files;
use crate::error::TxiError;
use crate::import::{ImportOptions, ImportResult, tximport};
use crate::sample_sheet::SampleSheet;
use crate::store::Store;
use crate::table::{LabeledTable, assemble};
use crate::tx2gene::{IdNormalization, TranscriptGeneMap};

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub refresh_map: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub base_dir: String,
    pub data_type: String,
    pub map_source: String,
    pub counts_from_abundance: String,
    pub samples: usize,
    pub genes: usize,
    pub metadata_columns: usize,
    pub columns: usize,
    pub sparse_counts: bool,
    pub output: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RunResult {
    pub import: ImportResult,
    pub table: LabeledTable,
    pub summary: RunSummary,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

#[derive(Clone)]
pub struct App<B: BiomartClient> {
    store: Option<Store>,
    biomart: B,
}

impl<B: BiomartClient> App<B> {
    pub fn new(store: Store, biomart: B) -> Self {
        Self {
            store: Some(store),
            biomart,
        }
    }

    // Species maps are fetched on every run.
    pub fn without_cache(biomart: B) -> Self {
        Self {
            store: None,
            biomart,
        }
    }

    pub fn run(
        &self,
        config: &ResolvedConfig,
        options: &RunOptions,
        sink: &dyn ProgressSink,
    ) -> Result<RunResult, TxiError> {
        let base_dir = config.base_dir.clone().ok_or(TxiError::MissingBaseDir)?;

        let started = Instant::now();
        sink.event(ProgressEvent {
            message: format!("phase=Discover; listing {}", base_dir.display()),
            elapsed: None,
        });
        let samples = discover_quant_files(&base_dir, &config.quant_file)?;

        sink.event(ProgressEvent {
            message: format!("phase=Map; resolving {}", describe_map_source(&config.map_source)),
            elapsed: Some(started.elapsed()),
        });
        let map = self.resolve_map(&config.map_source, options)?;

        let sample_sheet = config
            .sample_sheet
            .as_deref()
            .map(SampleSheet::read_path)
            .transpose()?;
        let import_options = ImportOptions {
            counts_from_abundance: config.counts_from_abundance,
            normalization: IdNormalization {
                ignore_transcript_version: config.ignore_transcript_version,
                ignore_after_bar: config.ignore_after_bar,
            },
            sample_sheet,
            ..ImportOptions::default()
        };

        sink.event(ProgressEvent {
            message: format!(
                "phase=Import; {} samples ({})",
                samples.len(),
                config.data_type
            ),
            elapsed: Some(started.elapsed()),
        });
        let import = tximport(&samples, config.data_type, &map, &import_options)?;

        sink.event(ProgressEvent {
            message: format!(
                "phase=Assemble; {} samples x {} genes",
                import.n_samples(),
                import.n_genes()
            ),
            elapsed: Some(started.elapsed()),
        });
        let table = assemble(&import)?;

        let summary = RunSummary {
            base_dir: base_dir.display().to_string(),
            data_type: config.data_type.to_string(),
            map_source: describe_map_source(&config.map_source),
            counts_from_abundance: format!("{:?}", config.counts_from_abundance),
            samples: table.n_rows(),
            genes: import.n_genes(),
            metadata_columns: import.obs.n_cols(),
            columns: table.n_cols(),
            sparse_counts: import.x.is_sparse(),
            output: config.output.as_ref().map(|path| path.display().to_string()),
        };
        sink.event(ProgressEvent {
            message: "phase=Done".to_string(),
            elapsed: Some(started.elapsed()),
        });

        Ok(RunResult {
            import,
            table,
            summary,
        })
    }

    pub fn resolve_map(
        &self,
        source: &MapSource,
        options: &RunOptions,
    ) -> Result<TranscriptGeneMap, TxiError> {
        let species = match source {
            MapSource::File(path) => return TranscriptGeneMap::read_path(path),
            MapSource::Species { species, .. } => species,
        };
        let Some(store) = &self.store else {
            return self.biomart.fetch_transcript_gene_map(species);
        };

        if !options.refresh_map {
            if let Some(map) = store.load_tx2gene(species)? {
                tracing::debug!(species = %species, "using cached transcript-gene map");
                return Ok(map);
            }
        }
        let map = self.biomart.fetch_transcript_gene_map(species)?;
        match store.save_tx2gene(species, &map, "biomart") {
            Ok(path) => tracing::debug!(path = %path, "cached transcript-gene map"),
            Err(err) => tracing::warn!(error = %err, "failed to cache transcript-gene map"),
        }
        Ok(map)
    }
}

fn describe_map_source(source: &MapSource) -> String {
    match source {
        MapSource::File(path) => format!("file:{}", path.display()),
        MapSource::Species { species, .. } => format!("species:{species}"),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use camino::Utf8PathBuf;

    use super::*;
    use crate::config::{Config, ConfigLoader};
    use crate::domain::Species;

    struct NoopSink;

    impl ProgressSink for NoopSink {
        fn event(&self, _event: ProgressEvent) {}
    }

    #[derive(Default)]
    struct MockBiomart {
        calls: Mutex<usize>,
    }

    impl BiomartClient for MockBiomart {
        fn fetch_transcript_gene_map(
            &self,
            _species: &Species,
        ) -> Result<TranscriptGeneMap, TxiError> {
            let mut guard = self.calls.lock().unwrap();
            *guard += 1;
            Ok(TranscriptGeneMap::from_pairs([("T1", "G1")]))
        }
    }

    #[test]
    fn species_map_is_fetched_once_then_cached() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().join("cache")).unwrap();
        let app = App::new(Store::new_with_root(root), MockBiomart::default());
        let source = MapSource::Species {
            species: Species::Human,
            host: None,
        };

        let first = app.resolve_map(&source, &RunOptions::default()).unwrap();
        let second = app.resolve_map(&source, &RunOptions::default()).unwrap();
        assert_eq!(first, second);
        assert_eq!(*app.biomart.calls.lock().unwrap(), 1);

        app.resolve_map(&source, &RunOptions { refresh_map: true })
            .unwrap();
        assert_eq!(*app.biomart.calls.lock().unwrap(), 2);
    }

    #[test]
    fn file_map_needs_no_cache() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("tx2gene.tsv");
        std::fs::write(&path, "ENST1\tENSG1\n").unwrap();
        let app = App::without_cache(MockBiomart::default());

        let map = app
            .resolve_map(&MapSource::File(path), &RunOptions::default())
            .unwrap();
        assert_eq!(map.gene_for("ENST1"), Some("ENSG1"));
        assert_eq!(*app.biomart.calls.lock().unwrap(), 0);
    }

    #[test]
    fn run_without_base_dir_fails() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let app = App::new(Store::new_with_root(root), MockBiomart::default());
        let config = ConfigLoader::resolve_config(Config::default()).unwrap();

        let err = app.run(&config, &RunOptions::default(), &NoopSink).unwrap_err();
        assert!(matches!(err, TxiError::MissingBaseDir));
    }
}
