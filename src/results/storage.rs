//! Snapshot storage and retrieval
//!
//! Snapshots live as flat JSON files in a single results directory.

use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::snapshot::Snapshot;

/// File name of the rendered report
pub const REPORT_FILE: &str = "benchmark-report.html";

/// Results storage manager
#[derive(Clone, Debug)]
pub struct ResultsStorage {
    /// Base directory for results
    base_dir: PathBuf,
}

impl ResultsStorage {
    /// Create a new results storage
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Ensure storage directory exists
    pub fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.base_dir).with_context(|| {
            format!("Failed to create results directory {}", self.base_dir.display())
        })
    }

    /// Path of a file inside the results directory
    pub fn path(&self, file_name: &str) -> PathBuf {
        self.base_dir.join(file_name)
    }

    /// Path of the rendered report
    pub fn report_path(&self) -> PathBuf {
        self.path(REPORT_FILE)
    }

    /// Save a snapshot
    pub fn save(&self, snapshot: &Snapshot, file_name: &str) -> Result<PathBuf> {
        self.ensure_dir()?;

        let path = self.path(file_name);
        let file = File::create(&path).context("Failed to create snapshot file")?;
        let writer = BufWriter::new(file);

        serde_json::to_writer_pretty(writer, snapshot).context("Failed to write snapshot")?;

        info!("Saved snapshot to {}", path.display());
        Ok(path)
    }

    /// Load a snapshot; a missing file is `Ok(None)`
    pub fn load(&self, file_name: &str) -> Result<Option<Snapshot>> {
        let path = self.path(file_name);
        if !path.exists() {
            debug!("No snapshot at {}", path.display());
            return Ok(None);
        }
        self.load_from_path(&path).map(Some)
    }

    /// Load from a specific path
    pub fn load_from_path(&self, path: &Path) -> Result<Snapshot> {
        let file = File::open(path)
            .with_context(|| format!("Failed to open snapshot {}", path.display()))?;
        let reader = BufReader::new(file);
        serde_json::from_reader(reader)
            .with_context(|| format!("Failed to parse snapshot {}", path.display()))
    }

    /// Write the rendered report
    pub fn write_report(&self, html: &str) -> Result<PathBuf> {
        self.ensure_dir()?;
        let path = self.report_path();
        fs::write(&path, html).context("Failed to write report")?;
        info!("Report generated: {}", path.display());
        Ok(path)
    }

    /// Export a snapshot to a file
    pub fn export(&self, snapshot: &Snapshot, path: &Path, format: ExportFormat) -> Result<()> {
        match format {
            ExportFormat::Json => {
                let file = File::create(path)?;
                let writer = BufWriter::new(file);
                serde_json::to_writer_pretty(writer, snapshot)?;
            }
            ExportFormat::Csv => {
                let mut writer = csv::Writer::from_path(path)?;

                writer.write_record([
                    "metric", "min", "avg", "med", "p(90)", "p(95)", "max", "count", "rate",
                ])?;

                let cell = |v: Option<f64>| v.map(|x| format!("{x:.4}")).unwrap_or_default();
                for (name, m) in &snapshot.metrics {
                    writer.write_record([
                        name.clone(),
                        cell(m.min),
                        cell(m.avg),
                        cell(m.med),
                        cell(m.p90),
                        cell(m.p95),
                        cell(m.max),
                        cell(m.count),
                        cell(m.rate),
                    ])?;
                }
                writer.flush()?;
            }
        }

        info!("Exported snapshot to {}", path.display());
        Ok(())
    }
}

/// Export format
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
}

impl ExportFormat {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(ExportFormat::Json),
            "csv" => Some(ExportFormat::Csv),
            _ => None,
        }
    }

    pub fn from_extension(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_str)
    }
}
