use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

use serde::Serialize;

use crate::app::{ProgressEvent, ProgressSink, RunSummary};
use crate::domain::TableFormat;
use crate::error::TxiError;
use crate::table::LabeledTable;

pub struct JsonOutput;

impl JsonOutput {
    pub fn print_summary(summary: &RunSummary) -> io::Result<()> {
        Self::print_json(summary)
    }

    fn print_json<T: Serialize>(value: &T) -> io::Result<()> {
        let json = serde_json::to_string_pretty(value).map_err(io::Error::other)?;
        let mut stdout = io::stdout();
        stdout.write_all(json.as_bytes())?;
        stdout.write_all(b"\n")?;
        Ok(())
    }
}

pub struct LogSink;

impl ProgressSink for LogSink {
    fn event(&self, event: ProgressEvent) {
        match event.elapsed {
            Some(elapsed) => {
                tracing::info!(elapsed_ms = elapsed.as_millis() as u64, "{}", event.message)
            }
            None => tracing::info!("{}", event.message),
        }
    }
}

pub fn write_table(
    table: &LabeledTable,
    path: Option<&Path>,
    format: TableFormat,
) -> Result<(), TxiError> {
    match path {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent).map_err(|err| TxiError::Output(err.to_string()))?;
            }
            let file = File::create(path).map_err(|err| {
                TxiError::Output(format!("create {}: {err}", path.display()))
            })?;
            table.write_delimited(BufWriter::new(file), format.delimiter())?;
            tracing::info!(path = %path.display(), "wrote combined table");
            Ok(())
        }
        None => {
            let stdout = io::stdout();
            table.write_delimited(stdout.lock(), format.delimiter())
        }
    }
}
