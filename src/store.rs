use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use tempfile::Builder;

use crate::domain::Species;
use crate::error::TxiError;
use crate::tx2gene::TranscriptGeneMap;

#[derive(Debug, Clone)]
pub struct Store {
    cache_root: Utf8PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    pub source: String,
    pub dataset: String,
    pub transcripts: usize,
    pub downloaded_at: String,
    pub tool: String,
    pub resolved_path: String,
}

impl Store {
    pub fn new() -> Result<Self, TxiError> {
        let cache_root = BaseDirs::new()
            .and_then(|dirs| {
                Utf8PathBuf::from_path_buf(dirs.home_dir().join(".cache").join("kira-tximport"))
                    .ok()
            })
            .ok_or_else(|| TxiError::Filesystem("unable to resolve cache directory".to_string()))?;
        Ok(Self { cache_root })
    }

    pub fn new_with_root(cache_root: Utf8PathBuf) -> Self {
        Self { cache_root }
    }

    pub fn cache_root(&self) -> &Utf8Path {
        &self.cache_root
    }

    pub fn tx2gene_path(&self, species: &Species) -> Utf8PathBuf {
        self.cache_root
            .join("tx2gene")
            .join(format!("{}.tsv", species.biomart_dataset()))
    }

    pub fn metadata_path(&self, species: &Species) -> Utf8PathBuf {
        self.cache_root
            .join("metadata")
            .join("tx2gene")
            .join(format!("{}.json", species.biomart_dataset()))
    }

    pub fn load_tx2gene(&self, species: &Species) -> Result<Option<TranscriptGeneMap>, TxiError> {
        let path = self.tx2gene_path(species);
        if !path.as_std_path().exists() {
            return Ok(None);
        }
        TranscriptGeneMap::read_path(path.as_std_path()).map(Some)
    }

    pub fn save_tx2gene(
        &self,
        species: &Species,
        map: &TranscriptGeneMap,
        source: &str,
    ) -> Result<Utf8PathBuf, TxiError> {
        let path = self.tx2gene_path(species);
        let parent = path
            .parent()
            .ok_or_else(|| TxiError::Filesystem("invalid cache path".to_string()))?;
        fs::create_dir_all(parent.as_std_path())
            .map_err(|err| TxiError::Filesystem(err.to_string()))?;
        let temp = Builder::new()
            .prefix("kira-txi-map")
            .tempfile_in(parent.as_std_path())
            .map_err(|err| TxiError::Filesystem(err.to_string()))?;
        map.write_tsv(temp.as_file())?;
        temp.persist(path.as_std_path())
            .map_err(|err| TxiError::Filesystem(err.to_string()))?;

        let metadata = Metadata {
            source: source.to_string(),
            dataset: species.biomart_dataset().to_string(),
            transcripts: map.len(),
            downloaded_at: chrono::Utc::now().to_rfc3339(),
            tool: format!("kira-txi/{}", env!("CARGO_PKG_VERSION")),
            resolved_path: path.to_string(),
        };
        Self::write_metadata(&self.metadata_path(species), &metadata)?;
        Ok(path)
    }

    pub fn read_metadata(&self, species: &Species) -> Result<Option<Metadata>, TxiError> {
        let path = self.metadata_path(species);
        if !path.as_std_path().exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path.as_std_path())
            .map_err(|err| TxiError::Filesystem(err.to_string()))?;
        let metadata = serde_json::from_str(&content)
            .map_err(|err| TxiError::Filesystem(err.to_string()))?;
        Ok(Some(metadata))
    }

    fn write_metadata(path: &Utf8Path, metadata: &Metadata) -> Result<(), TxiError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent.as_std_path())
                .map_err(|err| TxiError::Filesystem(err.to_string()))?;
        }
        let tmp_path = path.with_extension("json.tmp");
        let content = serde_json::to_vec_pretty(metadata)
            .map_err(|err| TxiError::Filesystem(err.to_string()))?;
        fs::write(tmp_path.as_std_path(), &content)
            .map_err(|err| TxiError::Filesystem(err.to_string()))?;
        fs::rename(tmp_path.as_std_path(), path.as_std_path())
            .map_err(|err| TxiError::Filesystem(err.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn layout_paths() {
        let store = Store::new_with_root(Utf8PathBuf::from("/tmp/kira-txi-cache"));
        let human = Species::Human;
        assert!(
            store
                .tx2gene_path(&human)
                .ends_with("tx2gene/hsapiens_gene_ensembl.tsv")
        );
        assert!(
            store
                .metadata_path(&human)
                .ends_with("metadata/tx2gene/hsapiens_gene_ensembl.json")
        );
    }

    #[test]
    fn saved_map_loads_back() {
        let temp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
        let store = Store::new_with_root(root);
        let mouse = Species::Mouse;
        assert!(store.load_tx2gene(&mouse).unwrap().is_none());

        let map = TranscriptGeneMap::from_pairs([("ENSMUST1", "ENSMUSG1")]);
        store.save_tx2gene(&mouse, &map, "biomart").unwrap();

        assert_eq!(store.load_tx2gene(&mouse).unwrap(), Some(map));
        let metadata = store.read_metadata(&mouse).unwrap().unwrap();
        assert_eq!(metadata.dataset, "mmusculus_gene_ensembl");
        assert_eq!(metadata.transcripts, 1);
    }
}
