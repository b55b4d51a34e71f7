pub mod app;
pub mod biomart;
pub mod config;
pub mod discover;
pub mod domain;
pub mod error;
pub mod fs_util;
pub mod import;
pub mod matrix;
pub mod output;
pub mod quant;
pub mod sample_sheet;
pub mod store;
pub mod table;
pub mod tx2gene;
