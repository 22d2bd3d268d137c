//! Writers for the supported output formats.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use crate::table::{FrameIndex, PoseColumn, PoseTable};

/// Errors that can occur while writing a converted file.
#[derive(Error, Debug)]
pub enum WriteError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV write error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON write error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for write operations.
pub type Result<T> = std::result::Result<T, WriteError>;

/// Creates parent directories for a file path if they don't exist.
pub(crate) fn ensure_parent_dirs(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

/// Formats a single cell: NaN becomes an empty cell, everything else the
/// shortest round-trip decimal representation.
fn csv_cell(value: f64) -> String {
    if value.is_nan() {
        String::new()
    } else {
        value.to_string()
    }
}

/// Writes a tracking table as CSV: one header row per column level (scorer,
/// optional individuals, bodyparts, coords), then one row per frame. No
/// index column.
pub fn write_csv(path: &Path, table: &PoseTable) -> Result<()> {
    ensure_parent_dirs(path)?;
    let mut writer = csv::Writer::from_writer(BufWriter::new(File::create(path)?));

    writer.write_record(table.columns.iter().map(|column| column.scorer.as_str()))?;
    if table.has_individuals() {
        writer.write_record(
            table
                .columns
                .iter()
                .map(|column| column.individual.as_deref().unwrap_or("")),
        )?;
    }
    writer.write_record(table.columns.iter().map(|column| column.bodypart.as_str()))?;
    writer.write_record(table.columns.iter().map(|column| column.coord.as_str()))?;

    for row in table.values.outer_iter() {
        writer.write_record(row.iter().map(|value| csv_cell(*value)))?;
    }
    writer.flush()?;
    Ok(())
}

#[derive(Serialize)]
struct JsonTable<'a> {
    columns: &'a [PoseColumn],
    frames: &'a FrameIndex,
    values: Vec<Vec<f64>>,
}

/// Writes a tracking table as a JSON document. Non-finite values serialize
/// as `null`, which `jsondecode` maps back to missing data.
pub fn write_json(path: &Path, table: &PoseTable) -> Result<()> {
    ensure_parent_dirs(path)?;
    let doc = JsonTable {
        columns: &table.columns,
        frames: &table.frames,
        values: table
            .values
            .outer_iter()
            .map(|row| row.to_vec())
            .collect(),
    };
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, &doc)?;
    Ok(())
}
