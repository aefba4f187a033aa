use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::warn;

use crate::models::{FirmRecord, TableBlock};

/// One block as written by the table extractor: bare rows, or rows with a page number
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawBlock {
    Rows(Vec<Vec<Option<String>>>),
    Paged {
        #[serde(default)]
        page: Option<u32>,
        rows: Vec<Vec<Option<String>>>,
    },
}

impl From<RawBlock> for TableBlock {
    fn from(raw: RawBlock) -> Self {
        match raw {
            RawBlock::Rows(rows) => TableBlock::new(rows),
            RawBlock::Paged { page, rows } => TableBlock { page, rows },
        }
    }
}

/// Read extracted table blocks from a JSON file
pub fn read_table_blocks(path: &Path) -> Result<Vec<TableBlock>> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {:?}", path))?;
    parse_table_blocks(&content)
}

/// Parse extracted table blocks from a JSON string
pub fn parse_table_blocks(json: &str) -> Result<Vec<TableBlock>> {
    let blocks: Vec<RawBlock> =
        serde_json::from_str(json).context("Failed to parse table blocks JSON")?;
    Ok(blocks.into_iter().map(TableBlock::from).collect())
}

/// Load a record snapshot written by any pipeline stage
pub fn load_records(path: &Path) -> Result<Vec<FirmRecord>> {
    let content =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read file: {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse records in {:?}", path))
}

/// Load earlier output so an interrupted run can resume.
///
/// A missing file means a fresh start; an unreadable one is logged and
/// treated the same way.
pub fn load_existing_records(path: &Path) -> Vec<FirmRecord> {
    if !path.exists() {
        return Vec::new();
    }
    match load_records(path) {
        Ok(records) => records,
        Err(e) => {
            warn!("Ignoring existing output {:?}: {:#}", path, e);
            Vec::new()
        }
    }
}
