//! CSV source.
//!
//! A CSV file is a single tab named after the file stem. Records are read
//! headerless and flexible so the raw matrix reaches the engine unchanged;
//! row 0 becomes the header row like any other sheet.

use std::path::Path;

use crate::error::{CompileError, CompileResult};
use crate::source::SheetSource;
use crate::types::Grid;

/// A single-tab [`SheetSource`] backed by a CSV file.
#[derive(Debug, Clone)]
pub struct CsvSource {
    grid: Grid,
}

impl CsvSource {
    /// Read a CSV file into a one-tab source.
    pub fn open(path: impl AsRef<Path>) -> CompileResult<Self> {
        let path = path.as_ref();
        let sheet = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("sheet")
            .to_string();

        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(path)?;
        Self::from_reader(&mut rdr, sheet)
    }

    /// Read CSV data from an existing reader, naming the tab `sheet`.
    pub fn from_reader<R: std::io::Read>(
        rdr: &mut csv::Reader<R>,
        sheet: impl Into<String>,
    ) -> CompileResult<Self> {
        let mut rows: Vec<Vec<String>> = Vec::new();
        for result in rdr.records() {
            let record = result?;
            rows.push(record.iter().map(str::to_string).collect());
        }
        Ok(Self {
            grid: Grid::new(sheet, rows),
        })
    }
}

impl SheetSource for CsvSource {
    fn sheet_names(&self) -> Vec<String> {
        vec![self.grid.sheet.clone()]
    }

    fn grid(&mut self, sheet: &str) -> CompileResult<Grid> {
        if self.grid.sheet == sheet {
            Ok(self.grid.clone())
        } else {
            Err(CompileError::MissingSheet {
                sheet: sheet.to_string(),
            })
        }
    }

    fn origin(&self) -> String {
        format!("{}.csv", self.grid.sheet)
    }
}
