use log::{error, info, warn};
use std::fmt;
use thiserror::Error;

use crate::db::elia::raw_archive::{EliaRawArchive, SnapshotError};
use crate::utils::json_normalize::{json_normalize, NormalizeError};
use crate::utils::lib_duckdb::Sink;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
    #[error(transparent)]
    Normalize(#[from] NormalizeError),
    #[error(transparent)]
    Db(#[from] duckdb::Error),
}

/// Destination table for the snapshot saved under `label`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMapping {
    pub label: String,
    pub table: String,
}

impl TableMapping {
    pub fn new(label: &str, table: &str) -> TableMapping {
        TableMapping {
            label: label.to_string(),
            table: table.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum LoadOutcome {
    Loaded { rows: usize },
    Skipped,
    Failed(String),
}

impl fmt::Display for LoadOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadOutcome::Loaded { rows } => write!(f, "{} rows", rows),
            LoadOutcome::Skipped => write!(f, "skipped — file not found"),
            LoadOutcome::Failed(msg) => write!(f, "error: {}", msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadReport {
    pub mapping: TableMapping,
    pub outcome: LoadOutcome,
}

/// Read, flatten and write one snapshot to its table.  An empty snapshot leaves no
/// table behind.  Return the number of rows.
pub fn load_table(
    archive: &EliaRawArchive,
    sink: &mut Sink,
    mapping: &TableMapping,
) -> Result<usize, LoadError> {
    let records = archive.read_raw(&mapping.label)?;
    let frame = json_normalize(&records)?;
    let (rows, cols) = frame.shape();
    info!("  Frame shape: ({}, {})", rows, cols);
    let n = sink.replace_table(&mapping.table, &frame)?;
    info!("  Written to table: {} ({} rows)", mapping.table, n);
    Ok(n)
}

/// Load every label in order.  Missing snapshots are skipped, a failing label is
/// reported and the next one is tried.
pub fn load_tables(
    archive: &EliaRawArchive,
    sink: &mut Sink,
    mappings: &[TableMapping],
) -> Vec<LoadReport> {
    let mut reports = Vec::with_capacity(mappings.len());
    for mapping in mappings {
        let outcome = if !archive.exists(&mapping.label) {
            warn!(
                "  File not found, skipped: {}",
                archive.filename(&mapping.label)
            );
            LoadOutcome::Skipped
        } else {
            info!("Loading: {} -> {}", mapping.label, mapping.table);
            match load_table(archive, sink, mapping) {
                Ok(rows) => LoadOutcome::Loaded { rows },
                Err(e) => {
                    error!("  Failed {}: {}", mapping.label, e);
                    LoadOutcome::Failed(e.to_string())
                }
            }
        };
        reports.push(LoadReport {
            mapping: mapping.clone(),
            outcome,
        });
    }
    reports
}
