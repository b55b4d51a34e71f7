use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use csv::ReaderBuilder;

use crate::error::TxiError;
use crate::fs_util::open_text;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SampleSheet {
    columns: Vec<String>,
    rows: HashMap<String, Vec<String>>,
}

impl SampleSheet {
    pub fn read_path(path: &Path) -> Result<Self, TxiError> {
        let sheet_error = |message: String| TxiError::SampleSheet {
            path: path.to_path_buf(),
            message,
        };
        let mut reader = open_text(path).map_err(|err| sheet_error(err.to_string()))?;
        let mut text = String::new();
        reader
            .read_to_string(&mut text)
            .map_err(|err| sheet_error(err.to_string()))?;

        let first_line = text.lines().next().unwrap_or_default();
        let delimiter = if first_line.contains('\t') { b'\t' } else { b',' };
        let mut rdr = ReaderBuilder::new()
            .delimiter(delimiter)
            .has_headers(true)
            .from_reader(text.as_bytes());

        let headers = rdr
            .headers()
            .map_err(|err| sheet_error(err.to_string()))?
            .iter()
            .map(|field| field.trim().to_string())
            .collect::<Vec<_>>();
        if headers.is_empty() || headers.iter().all(String::is_empty) {
            return Err(sheet_error("missing header row".to_string()));
        }
        let key = headers
            .iter()
            .position(|name| name.eq_ignore_ascii_case("sample"))
            .unwrap_or(0);
        let columns = headers
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != key)
            .map(|(_, name)| name.clone())
            .collect::<Vec<_>>();

        let mut rows = HashMap::new();
        for record in rdr.records() {
            let record = record.map_err(|err| sheet_error(err.to_string()))?;
            let sample = record.get(key).unwrap_or_default().trim().to_string();
            if sample.is_empty() {
                continue;
            }
            let values = record
                .iter()
                .enumerate()
                .filter(|(idx, _)| *idx != key)
                .map(|(_, value)| value.trim().to_string())
                .collect::<Vec<_>>();
            if rows.insert(sample.clone(), values).is_some() {
                return Err(sheet_error(format!("duplicate sample {sample}")));
            }
        }
        Ok(Self { columns, rows })
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn value(&self, sample: &str, column: usize) -> Option<&str> {
        self.rows
            .get(sample)
            .and_then(|values| values.get(column))
            .map(String::as_str)
    }

    pub fn contains(&self, sample: &str) -> bool {
        self.rows.contains_key(sample)
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn sample_column_is_the_key() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("samples.csv");
        std::fs::write(&path, "condition,sample,batch\ntreated,s1,b1\ncontrol,s2,b1\n").unwrap();

        let sheet = SampleSheet::read_path(&path).unwrap();
        assert_eq!(sheet.columns(), ["condition".to_string(), "batch".to_string()]);
        assert_eq!(sheet.value("s2", 0), Some("control"));
        assert!(!sheet.contains("s3"));
    }

    #[test]
    fn first_column_is_the_fallback_key() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("samples.tsv");
        std::fs::write(&path, "run\tcondition\ns1\ttreated\n").unwrap();

        let sheet = SampleSheet::read_path(&path).unwrap();
        assert_eq!(sheet.value("s1", 0), Some("treated"));
    }

    #[test]
    fn duplicate_samples_are_rejected() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("samples.csv");
        std::fs::write(&path, "sample,condition\ns1,a\ns1,b\n").unwrap();

        let err = SampleSheet::read_path(&path).unwrap_err();
        assert_matches!(err, TxiError::SampleSheet { .. });
    }
}
