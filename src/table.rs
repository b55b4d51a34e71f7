use std::collections::HashMap;
use std::fmt;
use std::io::Write;

use csv::WriterBuilder;
use ndarray::Array2;

use crate::error::TxiError;
use crate::import::ImportResult;

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Integer(u64),
    Number(f64),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(value) => write!(f, "{value}"),
            Cell::Integer(value) => write!(f, "{value}"),
            Cell::Number(value) if value.is_nan() => write!(f, "NA"),
            Cell::Number(value) => write!(f, "{value}"),
        }
    }
}

impl From<Option<f64>> for Cell {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Cell::Empty, Cell::Number)
    }
}

impl From<Option<u64>> for Cell {
    fn from(value: Option<u64>) -> Self {
        value.map_or(Cell::Empty, Cell::Integer)
    }
}

/// Row-labelled table with named columns. Column names may repeat.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledTable {
    index_name: String,
    index: Vec<String>,
    columns: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl LabeledTable {
    pub fn new(index_name: impl Into<String>, index: Vec<String>) -> Self {
        let rows = vec![Vec::new(); index.len()];
        Self {
            index_name: index_name.into(),
            index,
            columns: Vec::new(),
            rows,
        }
    }

    pub fn from_matrix(
        index_name: impl Into<String>,
        index: Vec<String>,
        columns: Vec<String>,
        data: &Array2<f64>,
    ) -> Result<Self, TxiError> {
        let (rows, cols) = data.dim();
        if rows != index.len() || cols != columns.len() {
            return Err(TxiError::MatrixShape {
                rows,
                cols,
                samples: index.len(),
                genes: columns.len(),
            });
        }
        let rows = data
            .outer_iter()
            .map(|row| row.iter().map(|value| Cell::Number(*value)).collect())
            .collect();
        Ok(Self {
            index_name: index_name.into(),
            index,
            columns,
            rows,
        })
    }

    pub fn push_column(
        &mut self,
        name: impl Into<String>,
        values: Vec<Cell>,
    ) -> Result<(), TxiError> {
        if values.len() != self.index.len() {
            return Err(TxiError::IndexMismatch);
        }
        self.columns.push(name.into());
        for (row, value) in self.rows.iter_mut().zip(values) {
            row.push(value);
        }
        Ok(())
    }

    pub fn index_name(&self) -> &str {
        &self.index_name
    }

    pub fn index(&self) -> &[String] {
        &self.index
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn n_rows(&self) -> usize {
        self.index.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn row(&self, idx: usize) -> Option<&[Cell]> {
        self.rows.get(idx).map(Vec::as_slice)
    }

    pub fn get(&self, label: &str, column: &str) -> Option<&Cell> {
        let row = self.index.iter().position(|value| value == label)?;
        let col = self.columns.iter().position(|value| value == column)?;
        self.rows.get(row).and_then(|cells| cells.get(col))
    }

    /// Rows of `other` are matched to rows of `self` by label.
    pub fn concat_columns(&self, other: &LabeledTable) -> Result<LabeledTable, TxiError> {
        if self.index.len() != other.index.len() {
            return Err(TxiError::IndexMismatch);
        }
        let positions: HashMap<&str, usize> = other
            .index
            .iter()
            .enumerate()
            .map(|(pos, label)| (label.as_str(), pos))
            .collect();
        if positions.len() != other.index.len() {
            return Err(TxiError::IndexMismatch);
        }

        let mut rows = Vec::with_capacity(self.rows.len());
        for (label, left) in self.index.iter().zip(&self.rows) {
            let pos = positions
                .get(label.as_str())
                .copied()
                .ok_or(TxiError::IndexMismatch)?;
            let mut row = Vec::with_capacity(self.columns.len() + other.columns.len());
            row.extend(left.iter().cloned());
            row.extend(other.rows[pos].iter().cloned());
            rows.push(row);
        }

        let mut columns = self.columns.clone();
        columns.extend(other.columns.iter().cloned());
        Ok(LabeledTable {
            index_name: self.index_name.clone(),
            index: self.index.clone(),
            columns,
            rows,
        })
    }

    pub fn write_delimited(&self, writer: impl Write, delimiter: u8) -> Result<(), TxiError> {
        let mut wtr = WriterBuilder::new()
            .delimiter(delimiter)
            .flexible(false)
            .from_writer(writer);
        let header = std::iter::once(self.index_name.as_str())
            .chain(self.columns.iter().map(String::as_str));
        wtr.write_record(header)
            .map_err(|err| TxiError::Output(err.to_string()))?;
        for (label, row) in self.index.iter().zip(&self.rows) {
            let record = std::iter::once(label.clone()).chain(row.iter().map(Cell::to_string));
            wtr.write_record(record)
                .map_err(|err| TxiError::Output(err.to_string()))?;
        }
        wtr.flush().map_err(|err| TxiError::Output(err.to_string()))?;
        Ok(())
    }
}

pub fn assemble(result: &ImportResult) -> Result<LabeledTable, TxiError> {
    let (rows, cols) = result.x.dim();
    if rows != result.obs.n_rows() || cols != result.var.n_rows() {
        return Err(TxiError::MatrixShape {
            rows,
            cols,
            samples: result.obs.n_rows(),
            genes: result.var.n_rows(),
        });
    }
    let dense = result.x.to_dense();
    let expression = LabeledTable::from_matrix(
        result.obs.index_name(),
        result.obs.index().to_vec(),
        result.var.index().to_vec(),
        &dense,
    )?;
    result.obs.concat_columns(&expression)
}
