//! Symbolic-key → integer-ID reference table.
//!
//! Built once per batch from every Ids-role sheet, then frozen and shared
//! read-only by all row projections. Never rebuilt mid-batch.

use std::collections::HashMap;

use crate::compile::observability::CompileWarning;
use crate::types::Grid;

/// Mapping of symbolic keys to registered integer IDs.
///
/// A secondary index sorted by descending key length backs
/// [`ReferenceTable::resolve_embedded`], so a short key never shadows a longer
/// key that contains it.
#[derive(Debug, Clone, Default)]
pub struct ReferenceTable {
    ids: HashMap<String, i64>,
    by_length: Vec<(String, i64)>,
}

impl ReferenceTable {
    /// An empty table. Lookups still resolve bare integer literals.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from every Ids-role grid.
    ///
    /// Each grid's row 0 is a group header; data rows are repeating 3-column
    /// groups `(key, integer, comment)`.
    pub fn from_ids_grids<'a>(
        grids: impl IntoIterator<Item = &'a Grid>,
        warnings: &mut Vec<CompileWarning>,
    ) -> Self {
        let mut table = Self::default();
        for grid in grids {
            table.add_ids_grid(grid, warnings);
        }
        table
    }

    /// Scan one Ids grid into the table.
    ///
    /// Unparsable integers register as 0. A duplicate key with a differing
    /// value reports a [`CompileWarning::DuplicateId`] and the latest value
    /// wins.
    pub fn add_ids_grid(&mut self, grid: &Grid, warnings: &mut Vec<CompileWarning>) {
        for row in grid.rows.iter().skip(1) {
            for group in row.chunks(3) {
                let key = group[0].trim();
                if key.is_empty() {
                    continue;
                }
                let value = group
                    .get(1)
                    .map(|v| v.trim().parse::<i64>().unwrap_or(0))
                    .unwrap_or(0);

                if let Some(previous) = self.ids.insert(key.to_string(), value) {
                    if previous != value {
                        warnings.push(CompileWarning::DuplicateId {
                            sheet: grid.sheet.clone(),
                            key: key.to_string(),
                            previous,
                            replacement: value,
                        });
                    }
                }
            }
        }
        self.rebuild_index();
    }

    /// Number of registered keys.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether no keys are registered.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Exact-match lookup, no literal bypass.
    pub fn get(&self, key: &str) -> Option<i64> {
        self.ids.get(key).copied()
    }

    /// Resolve a cell value to an integer ID.
    ///
    /// A value that parses as an integer literal bypasses the table and
    /// resolves to itself; otherwise an exact key match; otherwise `None`.
    pub fn resolve(&self, key: &str) -> Option<i64> {
        let key = key.trim();
        if let Ok(literal) = key.parse::<i64>() {
            return Some(literal);
        }
        self.ids.get(key).copied()
    }

    /// Substitute every registered key occurring in free text with its ID,
    /// longest key first.
    ///
    /// Used for `{}` fields, where symbolic ids are embedded in prose/JSON
    /// rather than filling a whole cell.
    pub fn resolve_embedded(&self, text: &str) -> String {
        let mut out = text.to_string();
        for (key, value) in &self.by_length {
            if out.contains(key.as_str()) {
                out = out.replace(key.as_str(), &value.to_string());
            }
        }
        out
    }

    fn rebuild_index(&mut self) {
        self.by_length = self.ids.iter().map(|(k, v)| (k.clone(), *v)).collect();
        // Descending length, lexicographic tie-break for deterministic output.
        self.by_length
            .sort_unstable_by(|a, b| b.0.len().cmp(&a.0.len()).then_with(|| a.0.cmp(&b.0)));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Grid;

    fn ids_grid(rows: &[&[&str]]) -> Grid {
        Grid::new(
            "Ids",
            rows.iter()
                .map(|r| r.iter().map(|c| c.to_string()).collect())
                .collect(),
        )
    }

    #[test]
    fn builds_from_three_column_groups() {
        let grid = ids_grid(&[
            &["Key", "Id", "Comment", "Key", "Id", "Comment"],
            &["STR", "1", "strength", "DEX", "2", "dexterity"],
            &["INT", "3", "", "", "", ""],
        ]);
        let mut warnings = Vec::new();
        let table = ReferenceTable::from_ids_grids([&grid], &mut warnings);

        assert_eq!(table.len(), 3);
        assert_eq!(table.get("DEX"), Some(2));
        assert!(warnings.is_empty());
    }

    #[test]
    fn duplicate_key_warns_and_latest_wins() {
        let grid = ids_grid(&[
            &["Key", "Id", "Comment"],
            &["STR", "1", ""],
            &["STR", "9", ""],
        ]);
        let mut warnings = Vec::new();
        let table = ReferenceTable::from_ids_grids([&grid], &mut warnings);

        assert_eq!(table.get("STR"), Some(9));
        assert_eq!(warnings.len(), 1);
        assert!(matches!(
            &warnings[0],
            CompileWarning::DuplicateId { key, previous: 1, replacement: 9, .. } if key == "STR"
        ));
    }

    #[test]
    fn duplicate_key_with_same_value_is_silent() {
        let grid = ids_grid(&[&["Key", "Id", "Comment"], &["STR", "1", ""], &["STR", "1", ""]]);
        let mut warnings = Vec::new();
        let _ = ReferenceTable::from_ids_grids([&grid], &mut warnings);
        assert!(warnings.is_empty());
    }

    #[test]
    fn unparsable_integer_registers_zero() {
        let grid = ids_grid(&[&["Key", "Id", "Comment"], &["ODD", "x1", ""]]);
        let mut warnings = Vec::new();
        let table = ReferenceTable::from_ids_grids([&grid], &mut warnings);
        assert_eq!(table.get("ODD"), Some(0));
    }

    #[test]
    fn resolve_bypasses_table_for_integer_literals() {
        let grid = ids_grid(&[&["Key", "Id", "Comment"], &["7", "99", ""]]);
        let mut warnings = Vec::new();
        let table = ReferenceTable::from_ids_grids([&grid], &mut warnings);

        assert_eq!(table.resolve("7"), Some(7));
        assert_eq!(table.resolve("unknown"), None);
    }

    #[test]
    fn embedded_substitution_prefers_longest_key() {
        let grid = ids_grid(&[
            &["Key", "Id", "Comment"],
            &["AB", "1", ""],
            &["ABC", "2", ""],
        ]);
        let mut warnings = Vec::new();
        let table = ReferenceTable::from_ids_grids([&grid], &mut warnings);

        assert_eq!(table.resolve_embedded(r#"{"want":ABC}"#), r#"{"want":2}"#);
        assert_eq!(table.resolve_embedded("AB then ABC"), "1 then 2");
    }
}
