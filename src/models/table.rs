use serde::{Deserialize, Serialize};

/// One physical table fragment as emitted by a document table extractor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableBlock {
    /// Source page, when the extractor reports it
    #[serde(default)]
    pub page: Option<u32>,
    pub rows: Vec<Vec<Option<String>>>,
}

impl TableBlock {
    pub fn new(rows: Vec<Vec<Option<String>>>) -> Self {
        Self { page: None, rows }
    }

    /// Build a block from plain string cells
    pub fn from_cells<R, C>(rows: R) -> Self
    where
        R: IntoIterator<Item = C>,
        C: IntoIterator,
        C::Item: Into<String>,
    {
        Self::new(
            rows.into_iter()
                .map(|row| row.into_iter().map(|cell| Some(cell.into())).collect())
                .collect(),
        )
    }

    /// Widest row in the block
    pub fn width(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// All cell text joined and lowercased
    pub fn flat_text(&self) -> String {
        self.rows
            .iter()
            .map(|row| row_text(row))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Cells of a row joined with spaces and lowercased
pub fn row_text(row: &[Option<String>]) -> String {
    row.iter()
        .map(|cell| cell.as_deref().unwrap_or(""))
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}
