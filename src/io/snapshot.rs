use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::FirmRecord;
use crate::stages::{LlmStageReport, SearchStageReport};

pub const RAW_SNAPSHOT: &str = "step1_raw_records";
pub const LOCATION_SNAPSHOT: &str = "step2_records_with_loc";
pub const SEARCH_SNAPSHOT: &str = "step3_records_after_search";
pub const SCORED_SNAPSHOT: &str = "step4_records_after_llm_scoring";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Destination for the record list after each stage
pub trait SnapshotSink {
    /// Persist the full record list under `stage`, replacing any earlier copy
    fn persist(&mut self, stage: &str, records: &[FirmRecord]) -> Result<PathBuf>;

    /// Persist the run manifest
    fn persist_manifest(&mut self, manifest: &RunManifest) -> Result<PathBuf>;
}

/// Writes each snapshot as `<dir>/<stage>.json`
#[derive(Debug, Clone)]
pub struct JsonSnapshotStore {
    dir: PathBuf,
}

impl JsonSnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, stage: &str) -> PathBuf {
        self.dir.join(format!("{stage}.json"))
    }

    fn write<T: Serialize + ?Sized>(&self, path: &Path, value: &T) -> Result<()> {
        std::fs::create_dir_all(&self.dir)
            .with_context(|| format!("Failed to create output directory: {:?}", self.dir))?;
        write_json(path, value)
    }
}

impl SnapshotSink for JsonSnapshotStore {
    fn persist(&mut self, stage: &str, records: &[FirmRecord]) -> Result<PathBuf> {
        let path = self.path_for(stage);
        self.write(&path, records)?;
        Ok(path)
    }

    fn persist_manifest(&mut self, manifest: &RunManifest) -> Result<PathBuf> {
        let path = self.dir.join(MANIFEST_FILE);
        self.write(&path, manifest)?;
        Ok(path)
    }
}

/// Write a value as pretty JSON, truncating any existing file
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create file: {:?}", path))?;
    serde_json::to_writer_pretty(file, value).context("Failed to write JSON")?;
    Ok(())
}

/// Summary of one pipeline run, written next to the snapshots
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub record_count: usize,
    pub fragments_used: usize,
    pub rows_dropped: usize,
    #[serde(default)]
    pub search: Option<SearchStageReport>,
    #[serde(default)]
    pub llm: Option<LlmStageReport>,
    #[serde(default)]
    pub snapshots: Vec<PathBuf>,
}

impl RunManifest {
    pub fn start() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            started_at: Utc::now(),
            finished_at: None,
            record_count: 0,
            fragments_used: 0,
            rows_dropped: 0,
            search: None,
            llm: None,
            snapshots: Vec::new(),
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }
}
