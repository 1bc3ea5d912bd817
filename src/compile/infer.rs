//! Type inference over raw cell matrices.
//!
//! Each column gets one [`FieldType`] per conversion pass, picked from the
//! header markers and the longest non-empty sample value in the column. Short
//! samples ("", "1") under-determine the true type, so the most
//! information-dense sample decides.

use crate::types::{split_array_cell, FieldSpec, FieldType, Grid};

/// Infer a [`FieldSpec`] per column of a normalized grid.
///
/// Rules:
///
/// - Returns `None` when the grid has no header row (caller warns and skips
///   the sheet).
/// - Columns whose header strips to an empty name are excluded from the
///   result entirely; `[x]` columns stay in the result flagged `excluded` so
///   column adjacency is preserved for attribute-run detection.
/// - `[]` headers classify the longest element of the split sample and take
///   the `Array*` variant.
pub fn infer_field_specs(grid: &Grid) -> Option<Vec<FieldSpec>> {
    let header = grid.header()?;

    let mut specs = Vec::with_capacity(header.len());
    for (col, cell) in header.iter().enumerate() {
        let mut spec = FieldSpec::from_header(col, cell);
        if spec.name.is_empty() {
            continue;
        }
        spec.field_type = infer_column_type(grid, &spec);
        specs.push(spec);
    }
    Some(specs)
}

fn infer_column_type(grid: &Grid, spec: &FieldSpec) -> FieldType {
    let sample = longest_sample(grid, spec.column);
    if spec.is_array {
        let element = split_array_cell(sample)
            .into_iter()
            .max_by_key(|e| e.len())
            .unwrap_or("");
        FieldType::array_of(classify_scalar(element, spec.is_json))
    } else {
        classify_scalar(sample, spec.is_json)
    }
}

/// The longest (by length) non-empty value in the column across all data rows.
fn longest_sample(grid: &Grid, col: usize) -> &str {
    grid.rows
        .iter()
        .skip(1)
        .map(|row| row.get(col).map(String::as_str).unwrap_or(""))
        .max_by_key(|v| v.len())
        .unwrap_or("")
}

fn classify_scalar(sample: &str, header_is_json: bool) -> FieldType {
    if sample.is_empty() {
        FieldType::Text
    } else if parses_as_number(sample) {
        FieldType::Number
    } else if parses_as_bool(sample) {
        FieldType::Bool
    } else if header_is_json {
        FieldType::Json
    } else {
        FieldType::Text
    }
}

/// A decimal literal without a thousands comma. Infinities/NaN spellings that
/// `f64::from_str` accepts do not count.
pub(crate) fn parses_as_number(s: &str) -> bool {
    !s.contains(',') && s.parse::<f64>().map(f64::is_finite).unwrap_or(false)
}

pub(crate) fn parses_as_bool(s: &str) -> bool {
    s.eq_ignore_ascii_case("true") || s.eq_ignore_ascii_case("false")
}
