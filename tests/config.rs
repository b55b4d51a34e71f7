use std::path::PathBuf;

use assert_matches::assert_matches;

use kira_tximport::config::{ConfigLoader, MapSource};
use kira_tximport::domain::{CountsFromAbundance, QuantTool, Species, TableFormat};
use kira_tximport::error::TxiError;

#[test]
fn parse_config_shorthand_species() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("kira-txi.json");
    std::fs::write(
        &path,
        r#"{"base_dir": "/data/salmon_output", "data_type": "salmon", "transcript_gene_map": "mouse"}"#,
    )
    .unwrap();

    let resolved = ConfigLoader::resolve(path.to_str()).unwrap();
    assert_eq!(resolved.base_dir, Some(PathBuf::from("/data/salmon_output")));
    assert_eq!(resolved.data_type, QuantTool::Salmon);
    assert_eq!(resolved.quant_file, "quant.sf");
    assert_eq!(
        resolved.map_source,
        MapSource::Species {
            species: Species::Mouse,
            host: None
        }
    );
}

#[test]
fn parse_config_detailed() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("txi.json");
    std::fs::write(
        &path,
        r#"{
            "schema_version": 1,
            "data_type": "rsem",
            "transcript_gene_map": {"path": "refs/tx2gene.tsv"},
            "counts_from_abundance": "length_scaled_tpm",
            "ignore_transcript_version": false,
            "format": "csv"
        }"#,
    )
    .unwrap();

    let resolved = ConfigLoader::resolve(path.to_str()).unwrap();
    assert_eq!(resolved.quant_file, "quant.isoforms.results");
    assert_eq!(
        resolved.map_source,
        MapSource::File(PathBuf::from("refs/tx2gene.tsv"))
    );
    assert_eq!(
        resolved.counts_from_abundance,
        CountsFromAbundance::LengthScaledTpm
    );
    assert!(!resolved.ignore_transcript_version);
    assert!(resolved.ignore_after_bar);
    assert_eq!(resolved.format, Some(TableFormat::Csv));
}

#[test]
fn config_accepts_tximport_mode_spelling() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("txi.json");
    std::fs::write(&path, r#"{"counts_from_abundance": "scaledTPM"}"#).unwrap();

    let resolved = ConfigLoader::resolve(path.to_str()).unwrap();
    assert_eq!(resolved.counts_from_abundance, CountsFromAbundance::ScaledTpm);
}

#[test]
fn unknown_data_type_is_rejected() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("txi.json");
    std::fs::write(&path, r#"{"data_type": "cufflinks"}"#).unwrap();

    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, TxiError::UnknownQuantTool(_));
}

#[test]
fn explicit_missing_config_is_an_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("absent.json");

    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, TxiError::ConfigRead(_));
}

#[test]
fn malformed_json_is_a_parse_error() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("txi.json");
    std::fs::write(&path, "{ not json").unwrap();

    let err = ConfigLoader::resolve(path.to_str()).unwrap_err();
    assert_matches!(err, TxiError::ConfigParse(_));
}
