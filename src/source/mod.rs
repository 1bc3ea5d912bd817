//! Sheet sources: everything that can yield a [`crate::types::Grid`] per tab.
//!
//! The compile engine is written once against the [`SheetSource`] trait;
//! concrete adapters normalize their backing store to the same shape:
//!
//! - [`excel::ExcelSource`]: local `.xlsx`/`.xlsm` workbooks (feature `excel`)
//! - [`google::GoogleSheetSource`]: an already-fetched Google Sheets API payload
//! - [`csv::CsvSource`]: a single-tab CSV file
//! - [`StaticSource`]: in-memory grids (tests, pre-materialized data)

pub mod csv;
#[cfg(feature = "excel")]
pub mod excel;
pub mod google;

use crate::error::{CompileError, CompileResult};
use crate::types::Grid;

/// A provider of raw sheet grids.
///
/// Implementations return grids un-normalized (raw cell text plus merged-cell
/// ranges); the engine applies [`Grid::normalize`] itself. Sources may be slow
/// or rate-limited upstream; by the time a source is handed to the engine its
/// data is expected to be materialized, and the engine performs no retry or
/// backoff of its own.
pub trait SheetSource {
    /// Names of all tabs this source can yield, in source order.
    fn sheet_names(&self) -> Vec<String>;

    /// The raw grid for one tab.
    ///
    /// Returns [`CompileError::MissingSheet`] when the tab does not exist.
    fn grid(&mut self, sheet: &str) -> CompileResult<Grid>;

    /// A display label for observer output (a file path, an API label).
    fn origin(&self) -> String {
        "sheet source".to_string()
    }
}

/// An in-memory [`SheetSource`] over pre-built grids.
///
/// Useful in tests and for hosts that fetch their data through some other
/// channel and only need the compilation engine.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    grids: Vec<Grid>,
}

impl StaticSource {
    /// Create a source over the given grids.
    pub fn new(grids: Vec<Grid>) -> Self {
        Self { grids }
    }

    /// Add one grid, replacing any existing grid with the same sheet name.
    pub fn insert(&mut self, grid: Grid) {
        self.grids.retain(|g| g.sheet != grid.sheet);
        self.grids.push(grid);
    }
}

impl SheetSource for StaticSource {
    fn sheet_names(&self) -> Vec<String> {
        self.grids.iter().map(|g| g.sheet.clone()).collect()
    }

    fn grid(&mut self, sheet: &str) -> CompileResult<Grid> {
        self.grids
            .iter()
            .find(|g| g.sheet == sheet)
            .cloned()
            .ok_or_else(|| CompileError::MissingSheet {
                sheet: sheet.to_string(),
            })
    }

    fn origin(&self) -> String {
        "static".to_string()
    }
}
