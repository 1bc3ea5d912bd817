//! Google Sheets source.
//!
//! Consumes an already-fetched `spreadsheets.get` response with
//! `includeGridData=true`. OAuth and HTTP plumbing stay with the host; this
//! adapter only normalizes the payload shape to [`Grid`]s.

use serde::Deserialize;

use crate::error::{CompileError, CompileResult};
use crate::source::SheetSource;
use crate::types::{Grid, MergeRange};

#[derive(Debug, Deserialize)]
struct Spreadsheet {
    #[serde(default)]
    sheets: Vec<SheetEntry>,
}

#[derive(Debug, Deserialize)]
struct SheetEntry {
    properties: SheetProperties,
    #[serde(default)]
    merges: Vec<ApiGridRange>,
    #[serde(default)]
    data: Vec<ApiGridData>,
}

#[derive(Debug, Deserialize)]
struct SheetProperties {
    #[serde(default)]
    title: String,
}

/// API grid range; row/column end indices are exclusive.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiGridRange {
    #[serde(default)]
    start_row_index: usize,
    #[serde(default)]
    end_row_index: usize,
    #[serde(default)]
    start_column_index: usize,
    #[serde(default)]
    end_column_index: usize,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiGridData {
    #[serde(default)]
    start_row: usize,
    #[serde(default)]
    start_column: usize,
    #[serde(default)]
    row_data: Vec<ApiRowData>,
}

#[derive(Debug, Default, Deserialize)]
struct ApiRowData {
    #[serde(default)]
    values: Vec<ApiCellData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiCellData {
    #[serde(default)]
    formatted_value: Option<String>,
}

/// A [`SheetSource`] over a pre-fetched Google Sheets API payload.
///
/// The whole payload is decoded up front, so `grid` lookups never touch the
/// network and a rate-limited fetch stays the host's concern.
#[derive(Debug, Clone)]
pub struct GoogleSheetSource {
    grids: Vec<Grid>,
}

impl GoogleSheetSource {
    /// Build a source from the raw response body.
    pub fn from_response_str(json: &str) -> CompileResult<Self> {
        let payload: Spreadsheet = serde_json::from_str(json)?;
        Self::from_payload(payload)
    }

    /// Build a source from an already-parsed response value.
    pub fn from_response(value: serde_json::Value) -> CompileResult<Self> {
        let payload: Spreadsheet = serde_json::from_value(value)?;
        Self::from_payload(payload)
    }

    fn from_payload(payload: Spreadsheet) -> CompileResult<Self> {
        if payload.sheets.is_empty() {
            return Err(CompileError::SourceMismatch {
                message: "spreadsheet payload has no sheets (was includeGridData set?)".to_string(),
            });
        }

        let grids = payload.sheets.into_iter().map(sheet_to_grid).collect();
        Ok(Self { grids })
    }
}

fn sheet_to_grid(sheet: SheetEntry) -> Grid {
    // Only the first data block is read; the API returns one block per
    // requested range and this adapter requests whole sheets.
    let data = sheet.data.into_iter().next().unwrap_or_default();
    let (row0, col0) = (data.start_row, data.start_column);

    let rows: Vec<Vec<String>> = data
        .row_data
        .into_iter()
        .map(|row| {
            row.values
                .into_iter()
                .map(|cell| cell.formatted_value.unwrap_or_default())
                .collect()
        })
        .collect();

    // Merge ranges are absolute and exclusive-end; re-base onto the data block
    // origin and convert to inclusive bounds.
    let merges: Vec<MergeRange> = sheet
        .merges
        .into_iter()
        .filter(|m| m.end_row_index > m.start_row_index && m.end_column_index > m.start_column_index)
        .map(|m| MergeRange {
            start_row: m.start_row_index.saturating_sub(row0),
            end_row: (m.end_row_index - 1).saturating_sub(row0),
            start_col: m.start_column_index.saturating_sub(col0),
            end_col: (m.end_column_index - 1).saturating_sub(col0),
        })
        .collect();

    Grid::with_merges(sheet.properties.title, rows, merges)
}

impl SheetSource for GoogleSheetSource {
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
        "google-sheets".to_string()
    }
}
