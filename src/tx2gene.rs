use std::collections::{BTreeMap, HashMap};
use std::io::{Read, Write};
use std::path::Path;

use csv::{ReaderBuilder, WriterBuilder};

use crate::error::TxiError;
use crate::fs_util::open_text;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdNormalization {
    pub ignore_transcript_version: bool,
    pub ignore_after_bar: bool,
}

impl Default for IdNormalization {
    fn default() -> Self {
        Self {
            ignore_transcript_version: true,
            ignore_after_bar: true,
        }
    }
}

impl IdNormalization {
    pub fn normalize<'a>(&self, id: &'a str) -> &'a str {
        let mut id = id.trim();
        if self.ignore_after_bar {
            if let Some((head, _)) = id.split_once('|') {
                id = head;
            }
        }
        if self.ignore_transcript_version {
            if let Some((head, version)) = id.rsplit_once('.') {
                if !head.is_empty()
                    && !version.is_empty()
                    && version.chars().all(|ch| ch.is_ascii_digit())
                {
                    id = head;
                }
            }
        }
        id
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TranscriptGeneMap {
    entries: HashMap<String, String>,
}

impl TranscriptGeneMap {
    pub fn from_pairs<I, T, G>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (T, G)>,
        T: Into<String>,
        G: Into<String>,
    {
        let entries = pairs
            .into_iter()
            .map(|(tx, gene)| (tx.into(), gene.into()))
            .collect();
        Self { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn gene_for(&self, transcript: &str) -> Option<&str> {
        self.entries.get(transcript).map(String::as_str)
    }

    /// On key collisions the lexicographically first gene wins.
    pub fn normalized(&self, rules: IdNormalization) -> Self {
        let mut entries: HashMap<String, String> = HashMap::with_capacity(self.entries.len());
        for (tx, gene) in &self.entries {
            let key = rules.normalize(tx).to_string();
            match entries.get(&key) {
                Some(existing) if existing.as_str() <= gene.as_str() => {}
                _ => {
                    entries.insert(key, gene.clone());
                }
            }
        }
        Self { entries }
    }

    pub fn read_path(path: &Path) -> Result<Self, TxiError> {
        let reader = open_text(path).map_err(|err| TxiError::Tx2GeneRead {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        Self::from_reader(reader)
    }

    pub fn from_reader(mut reader: impl Read) -> Result<Self, TxiError> {
        let mut text = String::new();
        reader
            .read_to_string(&mut text)
            .map_err(|err| TxiError::Tx2GeneParse(err.to_string()))?;

        let first_line = text.lines().next().unwrap_or_default();
        let delimiter = if first_line.contains('\t') { b'\t' } else { b',' };
        let mut rdr = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(false)
            .flexible(true)
            .from_reader(text.as_bytes());

        let mut entries = HashMap::new();
        for (idx, record) in rdr.records().enumerate() {
            let record = record.map_err(|err| TxiError::Tx2GeneParse(err.to_string()))?;
            let (Some(tx), Some(gene)) = (record.get(0), record.get(1)) else {
                if record.iter().all(|field| field.trim().is_empty()) {
                    continue;
                }
                return Err(TxiError::Tx2GeneParse(format!(
                    "line {} has fewer than two columns",
                    idx + 1
                )));
            };
            let (tx, gene) = (tx.trim(), gene.trim());
            if idx == 0 && is_header(tx) {
                continue;
            }
            if tx.is_empty() || gene.is_empty() {
                continue;
            }
            entries.insert(tx.to_string(), gene.to_string());
        }

        if entries.is_empty() {
            return Err(TxiError::Tx2GeneParse(
                "no transcript-gene pairs found".to_string(),
            ));
        }
        Ok(Self { entries })
    }

    pub fn write_tsv(&self, writer: impl Write) -> Result<(), TxiError> {
        let mut wtr = WriterBuilder::new().delimiter(b'\t').from_writer(writer);
        let sorted: BTreeMap<&str, &str> = self
            .entries
            .iter()
            .map(|(tx, gene)| (tx.as_str(), gene.as_str()))
            .collect();
        wtr.write_record(["transcript_id", "gene_id"])
            .map_err(|err| TxiError::Filesystem(err.to_string()))?;
        for (tx, gene) in sorted {
            wtr.write_record([tx, gene])
                .map_err(|err| TxiError::Filesystem(err.to_string()))?;
        }
        wtr.flush()
            .map_err(|err| TxiError::Filesystem(err.to_string()))?;
        Ok(())
    }
}

fn is_header(first_field: &str) -> bool {
    let lower = first_field.to_ascii_lowercase();
    lower.contains("transcript") || lower == "txname" || lower == "tx" || lower == "target_id"
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn normalize_strips_version_and_bar_suffix() {
        let rules = IdNormalization::default();
        assert_eq!(rules.normalize("ENST00000456328.2"), "ENST00000456328");
        assert_eq!(
            rules.normalize("ENST00000456328.2|ENSG00000223972.5|OTTHUMG|DDX11L1-202|"),
            "ENST00000456328"
        );
        assert_eq!(rules.normalize("tx.alpha"), "tx.alpha");
    }

    #[test]
    fn normalize_can_keep_versions() {
        let rules = IdNormalization {
            ignore_transcript_version: false,
            ignore_after_bar: true,
        };
        assert_eq!(rules.normalize("ENST1.4|ENSG1"), "ENST1.4");
    }

    #[test]
    fn reads_headed_tsv() {
        let text = "transcript_id\tgene_id\nENST1.1\tENSG1\nENST2.1\tENSG1\n";
        let map = TranscriptGeneMap::from_reader(text.as_bytes()).unwrap();
        assert_eq!(map.len(), 2);
        assert_eq!(map.gene_for("ENST2.1"), Some("ENSG1"));
    }

    #[test]
    fn reads_headerless_csv_with_extra_columns() {
        let text = "ENST1,ENSG1,DDX11L1\nENST2,ENSG2,WASH7P\n";
        let map = TranscriptGeneMap::from_reader(text.as_bytes()).unwrap();
        assert_eq!(map.gene_for("ENST1"), Some("ENSG1"));
        assert_eq!(map.gene_for("ENST2"), Some("ENSG2"));
    }

    #[test]
    fn single_column_is_rejected() {
        let err = TranscriptGeneMap::from_reader("ENST1\n".as_bytes()).unwrap_err();
        assert_matches!(err, TxiError::Tx2GeneParse(_));
    }

    #[test]
    fn normalized_map_is_deterministic_on_collisions() {
        let map = TranscriptGeneMap::from_pairs([("T1.1", "G2"), ("T1.2", "G1")]);
        let normalized = map.normalized(IdNormalization::default());
        assert_eq!(normalized.gene_for("T1"), Some("G1"));
    }

    #[test]
    fn tsv_output_reads_back() {
        let map = TranscriptGeneMap::from_pairs([("T2", "G1"), ("T1", "G1")]);
        let mut buf = Vec::new();
        map.write_tsv(&mut buf).unwrap();
        assert_eq!(
            String::from_utf8(buf.clone()).unwrap(),
            "transcript_id\tgene_id\nT1\tG1\nT2\tG1\n"
        );
        assert_eq!(TranscriptGeneMap::from_reader(buf.as_slice()).unwrap(), map);
    }
}
