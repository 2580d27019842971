//! # Domain Traits
//!
//! Abstract interface for the tabular store behind the log and the roster.
//! The Infrastructure layer provides the Google Sheets and in-memory implementations.

use async_trait::async_trait;

use crate::domain::error::SheetError;

/// A spreadsheet made of named worksheets holding rows of string cells.
///
/// Ranges use A1 notation relative to the worksheet (`"1:1"`, `"A1:H1"`, `"D7"`).
#[async_trait]
pub trait SheetStore: Send + Sync {
    /// Title of the spreadsheet itself.
    async fn title(&self) -> Result<String, SheetError>;

    /// Create the worksheet when it is missing. Returns `true` if it was created.
    async fn ensure_worksheet(&self, worksheet: &str, rows: u32, cols: u32) -> Result<bool, SheetError>;

    /// Read a range. `None` reads every populated row. Trailing empty cells are dropped.
    async fn read_range(&self, worksheet: &str, range: Option<&str>) -> Result<Vec<Vec<String>>, SheetError>;

    /// Overwrite a range starting at its top-left cell.
    async fn write_range(&self, worksheet: &str, range: &str, rows: Vec<Vec<String>>) -> Result<(), SheetError>;

    /// Append one row after the last populated row.
    async fn append_row(&self, worksheet: &str, row: Vec<String>) -> Result<(), SheetError>;

    /// Remove every value in the worksheet.
    async fn clear(&self, worksheet: &str) -> Result<(), SheetError>;

    /// Freeze the first `rows` rows.
    async fn freeze_rows(&self, worksheet: &str, rows: u32) -> Result<(), SheetError>;
}
