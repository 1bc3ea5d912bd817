//! Core data model types for sheet compilation.
//!
//! A [`crate::source::SheetSource`] yields one [`Grid`] per sheet (row 0 is
//! the header row). The type inference engine turns a grid's header into a
//! list of [`FieldSpec`]s, which drive row projection.

/// Inclusive cell range covered by one merged cell.
///
/// Row/column indices are 0-based. Only the anchor cell (`start_row`,
/// `start_col`) holds a value in the raw grid; [`Grid::normalize`] propagates
/// it into the covered cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MergeRange {
    /// First covered row.
    pub start_row: usize,
    /// Last covered row (inclusive).
    pub end_row: usize,
    /// First covered column.
    pub start_col: usize,
    /// Last covered column (inclusive).
    pub end_col: usize,
}

/// One sheet's rectangular matrix of raw cell strings.
///
/// `rows[0]` is the header row. Sources return grids un-normalized; call
/// [`Grid::normalize`] before handing a grid to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    /// Sheet/tab name this grid came from.
    pub sheet: String,
    /// Row-major raw cell text.
    pub rows: Vec<Vec<String>>,
    /// Merged-cell ranges reported by the source.
    pub merges: Vec<MergeRange>,
}

impl Grid {
    /// Create a grid without merged-cell information.
    pub fn new(sheet: impl Into<String>, rows: Vec<Vec<String>>) -> Self {
        Self {
            sheet: sheet.into(),
            rows,
            merges: Vec::new(),
        }
    }

    /// Create a grid with merged-cell ranges.
    pub fn with_merges(sheet: impl Into<String>, rows: Vec<Vec<String>>, merges: Vec<MergeRange>) -> Self {
        Self {
            sheet: sheet.into(),
            rows,
            merges,
        }
    }

    /// Number of rows, header included.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Width of the widest row.
    pub fn col_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// The header row, if the grid has one.
    pub fn header(&self) -> Option<&[String]> {
        self.rows.first().map(Vec::as_slice)
    }

    /// Cell text at `(row, col)`; empty string when out of range.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    /// Normalize the grid for compilation:
    ///
    /// - trims every cell
    /// - pads rows to a uniform width
    /// - propagates each merge anchor value into the empty cells its range covers
    pub fn normalize(mut self) -> Self {
        let width = self.col_count();
        for row in &mut self.rows {
            for cell in row.iter_mut() {
                let trimmed = cell.trim();
                if trimmed.len() != cell.len() {
                    *cell = trimmed.to_string();
                }
            }
            row.resize(width, String::new());
        }

        for merge in &self.merges {
            let anchor = self.cell(merge.start_row, merge.start_col).to_string();
            if anchor.is_empty() {
                continue;
            }
            for r in merge.start_row..=merge.end_row {
                for c in merge.start_col..=merge.end_col {
                    if let Some(cell) = self.rows.get_mut(r).and_then(|row| row.get_mut(c)) {
                        if cell.is_empty() {
                            *cell = anchor.clone();
                        }
                    }
                }
            }
        }

        self
    }
}

/// Logical type inferred for one column.
///
/// Inferred once per column per conversion pass and immutable thereafter.
/// There is no `ArrayJson`: an array header on a `{}` column still classifies
/// element-wise as text/number/bool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    /// UTF-8 text.
    Text,
    /// Decimal number (serialized as an integer when it has no fraction).
    Number,
    /// Boolean literal (`true`/`false`).
    Bool,
    /// Free-form JSON fragment.
    Json,
    /// Array of text elements.
    ArrayText,
    /// Array of numbers.
    ArrayNumber,
    /// Array of booleans.
    ArrayBool,
}

impl FieldType {
    /// Whether this is one of the `Array*` variants.
    pub fn is_array(self) -> bool {
        matches!(self, Self::ArrayText | Self::ArrayNumber | Self::ArrayBool)
    }

    /// The scalar type of an array variant (identity for scalars).
    pub fn element(self) -> Self {
        match self {
            Self::ArrayText => Self::Text,
            Self::ArrayNumber => Self::Number,
            Self::ArrayBool => Self::Bool,
            other => other,
        }
    }

    /// The array variant of a scalar type. Json has no array form and stays Json.
    pub fn array_of(scalar: Self) -> Self {
        match scalar {
            Self::Text => Self::ArrayText,
            Self::Number => Self::ArrayNumber,
            Self::Bool => Self::ArrayBool,
            other => other,
        }
    }
}

/// A parsed column header plus the type inferred for the column.
///
/// Header markers:
///
/// - `[]`: array field (`"name[]"`)
/// - `{}`: JSON field (`"payload{}"`)
/// - `[x]`: excluded field, skipped entirely
/// - dot-separated segments denote a nested output path (`"stat.hp"`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    /// 0-based column index in the grid.
    pub column: usize,
    /// Raw header text, markers included.
    pub header: String,
    /// Header with markers stripped; dot path intact.
    pub name: String,
    /// Inferred column type.
    pub field_type: FieldType,
    /// Header carried the `[]` marker.
    pub is_array: bool,
    /// Header carried the `{}` marker.
    pub is_json: bool,
    /// Header carried the `[x]` marker, or stripped to an empty name.
    pub excluded: bool,
}

impl FieldSpec {
    /// Parse a raw header cell into a spec with a provisional [`FieldType::Text`].
    ///
    /// The type inference engine fills in the real type from data samples.
    pub fn from_header(column: usize, header: &str) -> Self {
        let header = header.trim();
        let excluded_marker = header.contains("[x]");
        let is_array = header.contains("[]");
        let is_json = header.contains("{}");
        let name = header
            .replace("[x]", "")
            .replace("[]", "")
            .replace("{}", "")
            .trim()
            .to_string();
        let excluded = excluded_marker || name.is_empty();

        Self {
            column,
            header: header.to_string(),
            name,
            field_type: FieldType::Text,
            is_array,
            is_json,
            excluded,
        }
    }

    /// Dot-path segments of the field name.
    pub fn path_segments(&self) -> impl Iterator<Item = &str> {
        self.name.split('.')
    }

    /// Whether the name denotes a nested output path.
    pub fn is_nested(&self) -> bool {
        self.name.contains('.')
    }
}

/// Split an array cell into its elements.
///
/// The delimiter set is fixed: `:`, `|`, CR, LF. Elements are trimmed and
/// empties dropped, so `"a|b|c"` and `"a | b\n| c"` both yield three elements.
pub fn split_array_cell(raw: &str) -> Vec<&str> {
    raw.split([':', '|', '\r', '\n'])
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .collect()
}
