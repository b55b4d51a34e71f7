use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::TxiError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SampleQuantPath {
    pub sample_id: String,
    pub path: PathBuf,
}

pub fn discover_quant_files(
    base: &Path,
    quant_file: &str,
) -> Result<Vec<SampleQuantPath>, TxiError> {
    let entries = fs::read_dir(base).map_err(|err| TxiError::Discover {
        path: base.to_path_buf(),
        message: err.to_string(),
    })?;

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| TxiError::Discover {
            path: base.to_path_buf(),
            message: err.to_string(),
        })?;
        names.push(entry.file_name());
    }
    names.sort();

    // Paths keep the raw entry name; only the sample label is lossy.
    let samples = names
        .into_iter()
        .map(|name| SampleQuantPath {
            sample_id: name.to_string_lossy().into_owned(),
            path: base.join(&name).join(quant_file),
        })
        .collect::<Vec<_>>();

    tracing::debug!(base = %base.display(), count = samples.len(), "discovered sample entries");
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn one_candidate_per_entry() {
        let temp = tempfile::tempdir().unwrap();
        for name in ["sample2", "sample1", "sample3"] {
            fs::create_dir(temp.path().join(name)).unwrap();
        }

        let found = discover_quant_files(temp.path(), "quant.sf").unwrap();
        let ids = found.iter().map(|s| s.sample_id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["sample1", "sample2", "sample3"]);
        assert_eq!(found[0].path, temp.path().join("sample1").join("quant.sf"));
    }

    #[test]
    fn plain_files_are_not_filtered() {
        let temp = tempfile::tempdir().unwrap();
        fs::create_dir(temp.path().join("sample1")).unwrap();
        fs::write(temp.path().join("README"), "notes").unwrap();

        let found = discover_quant_files(temp.path(), "quant.sf").unwrap();
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].path, temp.path().join("README").join("quant.sf"));
    }

    #[test]
    fn empty_base_yields_no_candidates() {
        let temp = tempfile::tempdir().unwrap();
        let found = discover_quant_files(temp.path(), "quant.sf").unwrap();
        assert!(found.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn non_utf8_entry_names_round_trip() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let temp = tempfile::tempdir().unwrap();
        let name = OsStr::from_bytes(b"sample\xFF");
        fs::create_dir(temp.path().join(name)).unwrap();
        fs::write(temp.path().join(name).join("quant.sf"), "Name\n").unwrap();

        let found = discover_quant_files(temp.path(), "quant.sf").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].path, temp.path().join(name).join("quant.sf"));
        assert!(found[0].path.exists());
        assert_eq!(found[0].sample_id, "sample\u{FFFD}");
    }

    #[test]
    fn missing_base_is_an_error() {
        let temp = tempfile::tempdir().unwrap();
        let err = discover_quant_files(&temp.path().join("absent"), "quant.sf").unwrap_err();
        assert_matches!(err, TxiError::Discover { .. });
    }
}
