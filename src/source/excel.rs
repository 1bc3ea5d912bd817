#![cfg(feature = "excel")]

//! Excel workbook source.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use calamine::{open_workbook, Data, Reader, Xlsx};

use crate::error::{CompileError, CompileResult};
use crate::source::SheetSource;
use crate::types::{Grid, MergeRange};

/// A [`SheetSource`] backed by a local `.xlsx`/`.xlsm` workbook.
///
/// Merged regions are loaded once at open time so every [`Grid`] carries its
/// merge ranges; [`Grid::normalize`] later propagates anchor values across
/// them.
pub struct ExcelSource {
    workbook: Xlsx<BufReader<File>>,
    path: std::path::PathBuf,
}

impl std::fmt::Debug for ExcelSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExcelSource")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl ExcelSource {
    /// Open a workbook from disk.
    pub fn open(path: impl AsRef<Path>) -> CompileResult<Self> {
        let path = path.as_ref();
        let mut workbook: Xlsx<_> = open_workbook(path).map_err(calamine::Error::from)?;
        workbook
            .load_merged_regions()
            .map_err(calamine::Error::from)?;
        Ok(Self {
            workbook,
            path: path.to_path_buf(),
        })
    }
}

impl SheetSource for ExcelSource {
    fn sheet_names(&self) -> Vec<String> {
        self.workbook.sheet_names().to_vec()
    }

    fn grid(&mut self, sheet: &str) -> CompileResult<Grid> {
        if !self.workbook.sheet_names().iter().any(|s| s == sheet) {
            return Err(CompileError::MissingSheet {
                sheet: sheet.to_string(),
            });
        }

        let range = self
            .workbook
            .worksheet_range(sheet)
            .map_err(calamine::Error::from)?;

        // The used range may not start at A1; merge ranges are absolute sheet
        // coordinates, so re-base both onto the range origin.
        let (row0, col0) = range.start().unwrap_or((0, 0));

        let rows: Vec<Vec<String>> = range
            .rows()
            .map(|row| row.iter().map(cell_to_string).collect())
            .collect();

        let merges: Vec<MergeRange> = self
            .workbook
            .merged_regions_by_sheet(sheet)
            .into_iter()
            .map(|(_, _, dims)| MergeRange {
                start_row: dims.start.0.saturating_sub(row0) as usize,
                end_row: dims.end.0.saturating_sub(row0) as usize,
                start_col: dims.start.1.saturating_sub(col0) as usize,
                end_col: dims.end.1.saturating_sub(col0) as usize,
            })
            .collect();

        Ok(Grid::with_merges(sheet, rows, merges))
    }

    fn origin(&self) -> String {
        self.path.display().to_string()
    }
}

fn cell_to_string(c: &Data) -> String {
    match c {
        Data::String(s) => s.clone(),
        Data::Int(i) => i.to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 {
                (*f as i64).to_string()
            } else {
                f.to_string()
            }
        }
        Data::Bool(b) => b.to_string(),
        Data::DateTime(f) => f.to_string(),
        Data::DateTimeIso(s) => s.clone(),
        Data::DurationIso(s) => s.clone(),
        Data::Error(e) => format!("{e:?}"),
        Data::Empty => String::new(),
    }
}
