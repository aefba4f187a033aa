use tracing::{debug, info};

use crate::error::TableError;
use crate::models::{FirmRecord, TableBlock, row_text};

/// Positional column names of the ranked-firms table
pub const COLUMN_SCHEMA: [&str; 15] = [
    "rank_current",
    "rank_prior",
    "firm",
    "total_revenue",
    "intl_revenue",
    "new_contracts",
    "general_building_pct",
    "manufacturing_pct",
    "power_pct",
    "water_supply_pct",
    "sewer_waste_pct",
    "industrial_oilgas_pct",
    "transportation_pct",
    "hazardous_waste_pct",
    "telecom_pct",
];

/// Index of the firm column; narrower tables cannot be mapped
const FIRM_COLUMN: usize = 2;

/// Tokens that mark a block as part of the ranked-firms table
const INDICATOR_TOKENS: [&str; 4] = ["firm", "revenue", "mil", "rank"];

/// Cell values that mean "no data"
const NULL_TOKENS: [&str; 4] = ["", "-", "—", "–"];

/// Configuration for table normalization
#[derive(Debug, Clone)]
pub struct NormalizeConfig {
    /// How many extra columns beyond the schema are tolerated (and dropped)
    pub column_tolerance: usize,
    /// How many leading rows of a block are searched for the header
    pub header_scan_rows: usize,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        Self {
            column_tolerance: 5,
            header_scan_rows: 3,
        }
    }
}

/// Result of table normalization
#[derive(Debug)]
pub struct NormalizationResult {
    /// Typed records in table order
    pub records: Vec<FirmRecord>,
    /// Number of blocks merged into the logical table
    pub fragments_used: usize,
    /// Data rows dropped for having no firm name
    pub rows_dropped: usize,
}

/// Normalize extracted table blocks into typed records.
///
/// This stage:
/// 1. Finds the block holding the header row (firm + revenue tokens)
/// 2. Merges every block that belongs to the table, in source order,
///    skipping repeated header rows
/// 3. Maps cells positionally onto the fixed column schema
/// 4. Parses numeric cells, cleans firm names, drops rows without a firm
pub fn normalize(
    blocks: &[TableBlock],
    config: &NormalizeConfig,
) -> Result<NormalizationResult, TableError> {
    if blocks.iter().all(|b| b.rows.is_empty()) {
        return Err(TableError::NoTables);
    }

    let (header_block, header_row) =
        find_header(blocks, config.header_scan_rows).ok_or(TableError::HeaderNotFound {
            blocks: blocks.len(),
        })?;
    let header_width = blocks[header_block].rows[header_row].len();

    let mut fragments_used = 0;
    let mut data_rows: Vec<&[Option<String>]> = Vec::new();

    for (index, block) in blocks.iter().enumerate() {
        let rows = if index == header_block {
            &block.rows[header_row + 1..]
        } else if is_table_fragment(block, header_width) {
            &block.rows[..]
        } else {
            debug!("Skipping block {} (page {:?}): not part of the table", index, block.page);
            continue;
        };

        fragments_used += 1;
        data_rows.extend(
            rows.iter()
                .filter(|row| !is_header_row(row) && !is_blank_row(row))
                .map(Vec::as_slice),
        );
    }

    if data_rows.is_empty() {
        return Err(TableError::NoDataRows);
    }

    let width = data_rows.iter().map(|row| row.len()).max().unwrap_or(0);
    let max_width = COLUMN_SCHEMA.len() + config.column_tolerance;
    if !(FIRM_COLUMN + 1..=max_width).contains(&width) {
        return Err(TableError::ColumnLayout {
            found: width,
            min: FIRM_COLUMN + 1,
            max: max_width,
        });
    }

    let mut records = Vec::with_capacity(data_rows.len());
    let mut rows_dropped = 0;

    for row in data_rows {
        let firm = clean_firm_name(cell(row, FIRM_COLUMN));
        if firm.is_empty() {
            rows_dropped += 1;
            continue;
        }
        records.push(build_record(records.len() + 1, firm, row));
    }

    info!(
        "Normalized {} records from {} fragments ({} rows dropped, {} columns)",
        records.len(),
        fragments_used,
        rows_dropped,
        width.min(COLUMN_SCHEMA.len())
    );

    Ok(NormalizationResult {
        records,
        fragments_used,
        rows_dropped,
    })
}

/// Parse a numeric cell such as `20,241.4`; placeholders and junk become `None`
pub fn parse_number(value: Option<&str>) -> Option<f64> {
    let value = value?.trim();
    if NULL_TOKENS.contains(&value) {
        return None;
    }
    value
        .replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|n| n.is_finite())
}

/// Strip footnote daggers, line breaks, and trailing commas from a firm name
pub fn clean_firm_name(value: Option<&str>) -> String {
    let Some(value) = value else {
        return String::new();
    };
    let without_marks: String = value.chars().filter(|c| !matches!(c, '†' | '‡')).collect();
    without_marks
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches(|c: char| c == ',' || c.is_whitespace())
        .to_string()
}

fn build_record(sequence: usize, firm: String, row: &[Option<String>]) -> FirmRecord {
    let num = |index: usize| parse_number(cell(row, index));

    let mut record = FirmRecord::new(sequence, firm);
    record.rank_current = num(0);
    record.rank_prior = num(1);
    record.total_revenue = num(3);
    record.intl_revenue = num(4);
    record.new_contracts = num(5);

    let segments = &mut record.segments;
    segments.general_building_pct = num(6);
    segments.manufacturing_pct = num(7);
    segments.power_pct = num(8);
    segments.water_supply_pct = num(9);
    segments.sewer_waste_pct = num(10);
    segments.industrial_oilgas_pct = num(11);
    segments.transportation_pct = num(12);
    segments.hazardous_waste_pct = num(13);
    segments.telecom_pct = num(14);

    record
}

fn cell(row: &[Option<String>], index: usize) -> Option<&str> {
    row.get(index).and_then(|c| c.as_deref())
}

/// Locate the first header row within the leading rows of any block
fn find_header(blocks: &[TableBlock], scan_rows: usize) -> Option<(usize, usize)> {
    blocks.iter().enumerate().find_map(|(block_index, block)| {
        block
            .rows
            .iter()
            .take(scan_rows)
            .position(|row| is_header_row(row))
            .map(|row_index| (block_index, row_index))
    })
}

fn is_header_row(row: &[Option<String>]) -> bool {
    let text = row_text(row);
    text.contains("firm") && text.contains("revenue")
}

fn is_blank_row(row: &[Option<String>]) -> bool {
    row.iter()
        .all(|c| c.as_deref().is_none_or(|s| s.trim().is_empty()))
}

/// A non-header block belongs to the table if it mentions an indicator token
/// or has the header's column count (continuation pages carry data rows only)
fn is_table_fragment(block: &TableBlock, header_width: usize) -> bool {
    if block.rows.is_empty() {
        return false;
    }
    let text = block.flat_text();
    INDICATOR_TOKENS.iter().any(|t| text.contains(t)) || block.width() == header_width
}
