use thiserror::Error;

/// Fatal failures of table normalization.
///
/// Everything downstream of normalization degrades per record instead of
/// failing, so these are the only errors that abort a run on their own.
#[derive(Debug, Error)]
pub enum TableError {
    #[error("no tabular blocks found in the source document")]
    NoTables,

    #[error("no block contains a header row with firm and revenue columns ({blocks} blocks scanned)")]
    HeaderNotFound { blocks: usize },

    #[error("the ranked-firms table has no data rows")]
    NoDataRows,

    #[error("table has {found} columns, expected between {min} and {max}")]
    ColumnLayout { found: usize, min: usize, max: usize },
}
