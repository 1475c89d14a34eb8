// Raw JSON snapshots of Elia open data datasets, one file per label.
// https://opendata.elia.be/explore/

use log::{error, info, warn};
use serde_json::Value;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;
use std::thread;
use std::time::Duration;
use thiserror::Error;

use crate::api::elia::_api_elia_core::DateFilter;
use crate::api::elia::exports::{ExportSource, FetchError};

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("snapshot is not a JSON list")]
    NotAList,
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// A catalog dataset and the label its snapshot is saved under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetDescriptor {
    pub dataset_id: String,
    pub label: String,
}

impl DatasetDescriptor {
    pub fn new(dataset_id: &str, label: &str) -> DatasetDescriptor {
        DatasetDescriptor {
            dataset_id: dataset_id.to_string(),
            label: label.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExtractOutcome {
    Saved { records: usize },
    Timeout,
    HttpStatus { status: u16, body: String },
    Failed(String),
}

impl fmt::Display for ExtractOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractOutcome::Saved { records } => write!(f, "{} records", records),
            ExtractOutcome::Timeout => write!(f, "timeout — narrow the date filter"),
            ExtractOutcome::HttpStatus { status, body } => write!(f, "HTTP {}: {}", status, body),
            ExtractOutcome::Failed(msg) => write!(f, "error: {}", msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractReport {
    pub dataset: DatasetDescriptor,
    pub outcome: ExtractOutcome,
}

#[derive(Debug, Clone)]
pub struct EliaRawArchive {
    pub base_dir: String,
}

impl EliaRawArchive {
    /// Return the json filename for the label.  Does not check if the file exists.
    pub fn filename(&self, label: &str) -> String {
        self.base_dir.to_owned() + "/" + label + ".json"
    }

    pub fn exists(&self, label: &str) -> bool {
        Path::new(&self.filename(label)).exists()
    }

    /// Write the records as indented UTF-8 JSON, replacing any previous snapshot.
    /// The file is written next to the target first, then renamed over it.
    pub fn save_raw(&self, label: &str, records: &[Value]) -> Result<(), SnapshotError> {
        fs::create_dir_all(&self.base_dir)?;
        let path = self.filename(label);
        let tmp = path.clone() + ".tmp";
        let written = write_pretty(&tmp, records)
            .and_then(|_| fs::rename(&tmp, &path).map_err(SnapshotError::from));
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        info!("  Saved: {} ({} records)", path, records.len());
        Ok(())
    }

    pub fn read_raw(&self, label: &str) -> Result<Vec<Value>, SnapshotError> {
        let file = File::open(self.filename(label))?;
        match serde_json::from_reader::<_, Value>(BufReader::new(file))? {
            Value::Array(records) => Ok(records),
            _ => Err(SnapshotError::NotAList),
        }
    }

    /// Fetch one dataset and save its snapshot.  Return the number of records.
    pub fn download_dataset(
        &self,
        source: &impl ExportSource,
        dataset: &DatasetDescriptor,
        filter: Option<&DateFilter>,
    ) -> Result<usize, ExtractError> {
        let records = source.fetch_export(&dataset.dataset_id, filter)?;
        self.save_raw(&dataset.label, &records)?;
        Ok(records.len())
    }

    /// Download every dataset in order.  A failed dataset is reported and skipped,
    /// there is a pause between two requests.
    pub fn download_all(
        &self,
        source: &impl ExportSource,
        datasets: &[DatasetDescriptor],
        filter: Option<&DateFilter>,
        pause: Duration,
    ) -> Vec<ExtractReport> {
        let mut reports = Vec::with_capacity(datasets.len());
        for (i, dataset) in datasets.iter().enumerate() {
            if i > 0 && !pause.is_zero() {
                thread::sleep(pause);
            }
            info!("Fetching dataset {} ({}) ...", dataset.dataset_id, dataset.label);
            let outcome = match self.download_dataset(source, dataset, filter) {
                Ok(records) => ExtractOutcome::Saved { records },
                Err(ExtractError::Fetch(FetchError::Timeout)) => {
                    warn!(
                        "  Timeout for {}, the dataset may be too large, add or narrow the date filter",
                        dataset.dataset_id
                    );
                    ExtractOutcome::Timeout
                }
                Err(ExtractError::Fetch(FetchError::Status { status, body })) => {
                    error!("  HTTP error for {}: {} {}", dataset.dataset_id, status, body);
                    ExtractOutcome::HttpStatus { status, body }
                }
                Err(e) => {
                    error!("  Failed {}: {}", dataset.dataset_id, e);
                    ExtractOutcome::Failed(e.to_string())
                }
            };
            reports.push(ExtractReport {
                dataset: dataset.clone(),
                outcome,
            });
        }
        reports
    }
}

fn write_pretty(path: &str, records: &[Value]) -> Result<(), SnapshotError> {
    let mut out = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut out, records)?;
    out.flush()?;
    Ok(())
}
