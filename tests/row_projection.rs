use std::collections::BTreeSet;

use sheetx::compile::{
    infer_field_specs, project_row, project_sheet, CompileWarning, ReferenceTable,
};
use sheetx::types::Grid;

fn grid_of(sheet: &str, cells: &[&[&str]]) -> Grid {
    Grid::new(
        sheet,
        cells
            .iter()
            .map(|row| row.iter().map(|c| c.to_string()).collect())
            .collect(),
    )
    .normalize()
}

fn ids_table(entries: &[(&str, i64)]) -> ReferenceTable {
    let mut rows = vec![vec![
        "Key".to_string(),
        "Id".to_string(),
        "Comment".to_string(),
    ]];
    for (key, value) in entries {
        rows.push(vec![key.to_string(), value.to_string(), String::new()]);
    }
    let mut warnings = Vec::new();
    ReferenceTable::from_ids_grids([&Grid::new("Ids", rows)], &mut warnings)
}

fn project_one(grid: &Grid, refs: &ReferenceTable) -> Option<String> {
    let mut warnings = Vec::new();
    project_one_with(grid, refs, &BTreeSet::new(), &mut warnings)
}

fn project_one_with(
    grid: &Grid,
    refs: &ReferenceTable,
    persistent: &BTreeSet<String>,
    warnings: &mut Vec<CompileWarning>,
) -> Option<String> {
    let specs = infer_field_specs(grid).unwrap();
    project_row(&grid.sheet, 2, &grid.rows[1], &specs, refs, persistent, warnings)
        .map(|obj| serde_json::Value::Object(obj).to_string())
}

#[test]
fn array_header_splits_into_typed_array() {
    let grid = grid_of("S", &[&["id", "name[]"], &["1", "a|b|c"]]);
    assert_eq!(
        project_one(&grid, &ReferenceTable::new()).unwrap(),
        r#"{"id":1,"name":["a","b","c"]}"#
    );
}

#[test]
fn same_named_columns_merge_into_one_array() {
    let grid = grid_of("S", &[&["tag", "tag"], &["x", "y"]]);
    assert_eq!(
        project_one(&grid, &ReferenceTable::new()).unwrap(),
        r#"{"tag":["x","y"]}"#
    );
}

#[test]
fn merged_array_preserves_column_order_and_length() {
    let grid = grid_of("S", &[&["tag", "tag", "tag[]"], &["x", "y", "a|b"]]);
    assert_eq!(
        project_one(&grid, &ReferenceTable::new()).unwrap(),
        r#"{"tag":["x","y","a","b"]}"#
    );
}

#[test]
fn attribute_run_emits_attributes_record() {
    let grid = grid_of("S", &[&["attribute", "value"], &["STR", "10"]]);
    let refs = ids_table(&[("STR", 1)]);
    assert_eq!(
        project_one(&grid, &refs).unwrap(),
        r#"{"Attributes":[{"id":1,"value":10}]}"#
    );
}

#[test]
fn dot_path_headers_build_nested_objects() {
    let grid = grid_of("S", &[&["stat.hp", "stat.mp"], &["100", "50"]]);
    assert_eq!(
        project_one(&grid, &ReferenceTable::new()).unwrap(),
        r#"{"stat":{"hp":100,"mp":50}}"#
    );
}

#[test]
fn blank_row_is_suppressed() {
    let grid = grid_of("S", &[&["id", "name"], &["", ""]]);
    assert_eq!(project_one(&grid, &ReferenceTable::new()), None);
}

#[test]
fn row_with_only_persistent_data_is_suppressed() {
    let grid = grid_of("S", &[&["id", "name"], &["1", ""]]);
    let persistent = BTreeSet::from(["id".to_string()]);
    let mut warnings = Vec::new();
    assert_eq!(
        project_one_with(&grid, &ReferenceTable::new(), &persistent, &mut warnings),
        None
    );
}

#[test]
fn blank_persistent_field_is_backfilled() {
    let grid = grid_of("S", &[&["id", "name"], &["", "knight"], &["2", "archer"]]);
    let persistent = BTreeSet::from(["id".to_string()]);
    let mut warnings = Vec::new();
    // id infers Number from row 2, so the blank backfills as 0.
    assert_eq!(
        project_one_with(&grid, &ReferenceTable::new(), &persistent, &mut warnings).unwrap(),
        r#"{"id":0,"name":"knight"}"#
    );
}

#[test]
fn text_value_matching_a_key_promotes_to_number() {
    let grid = grid_of("S", &[&["id", "primary"], &["1", "STR"]]);
    let refs = ids_table(&[("STR", 4)]);
    assert_eq!(
        project_one(&grid, &refs).unwrap(),
        r#"{"id":1,"primary":4}"#
    );
}

#[test]
fn longest_key_wins_over_contained_shorter_key() {
    let grid = grid_of("S", &[&["id", "primary"], &["1", "ABC"]]);
    let refs = ids_table(&[("AB", 1), ("ABC", 2)]);
    assert_eq!(
        project_one(&grid, &refs).unwrap(),
        r#"{"id":1,"primary":2}"#
    );
}

#[test]
fn bare_integer_literal_bypasses_the_table() {
    let grid = grid_of("S", &[&["id", "primary"], &["1", "7"]]);
    // Even a registered key "7" does not shadow the literal.
    let refs = ids_table(&[("7", 99)]);
    assert_eq!(project_one(&grid, &refs).unwrap(), r#"{"id":1,"primary":7}"#);
}

#[test]
fn array_elements_resolve_and_unresolved_degrade_to_zero() {
    let grid = grid_of("S", &[&["id", "stats[]"], &["1", "STR|UNKNOWN"]]);
    let refs = ids_table(&[("STR", 4)]);
    let specs = infer_field_specs(&grid).unwrap();
    let mut warnings = Vec::new();
    let obj = project_row(
        "S",
        2,
        &grid.rows[1],
        &specs,
        &refs,
        &BTreeSet::new(),
        &mut warnings,
    )
    .unwrap();

    assert_eq!(
        serde_json::Value::Object(obj).to_string(),
        r#"{"id":1,"stats":[4,0]}"#
    );
    assert!(matches!(
        &warnings[0],
        CompileWarning::UnresolvedReference { key, .. } if key == "UNKNOWN"
    ));
}

#[test]
fn json_field_substitutes_embedded_keys() {
    let grid = grid_of(
        "S",
        &[&["id", "reward{}"], &["1", r#"{"give":STR,"n":2}"#]],
    );
    let refs = ids_table(&[("STR", 4)]);
    assert_eq!(
        project_one(&grid, &refs).unwrap(),
        r#"{"id":1,"reward":{"give":4,"n":2}}"#
    );
}

#[test]
fn malformed_json_field_warns_and_degrades_to_text() {
    let grid = grid_of("S", &[&["id", "reward{}"], &["1", "{not json"]]);
    let specs = infer_field_specs(&grid).unwrap();
    let mut warnings = Vec::new();
    let obj = project_row(
        "S",
        2,
        &grid.rows[1],
        &specs,
        &ReferenceTable::new(),
        &BTreeSet::new(),
        &mut warnings,
    )
    .unwrap();

    assert_eq!(
        serde_json::Value::Object(obj).to_string(),
        r#"{"id":1,"reward":"{not json"}"#
    );
    assert!(matches!(&warnings[0], CompileWarning::MalformedJson { .. }));
}

#[test]
fn excluded_columns_never_reach_output() {
    let grid = grid_of("S", &[&["id", "notes[x]", "name"], &["1", "internal", "a"]]);
    assert_eq!(
        project_one(&grid, &ReferenceTable::new()).unwrap(),
        r#"{"id":1,"name":"a"}"#
    );
}

#[test]
fn attribute_run_consumes_all_four_subkeys() {
    let grid = grid_of(
        "S",
        &[
            &["attribute", "value", "increase", "max", "unlock", "name"],
            &["STR", "10", "1.5", "99", "3", "knight"],
        ],
    );
    let refs = ids_table(&[("STR", 1)]);
    assert_eq!(
        project_one(&grid, &refs).unwrap(),
        r#"{"name":"knight","Attributes":[{"id":1,"value":10,"increase":1.5,"max":99,"unlock":3}]}"#
    );
}

#[test]
fn two_attribute_runs_accumulate_into_one_list() {
    let grid = grid_of(
        "S",
        &[
            &["attribute1", "value1", "attribute2", "value2"],
            &["STR", "10", "DEX", "20"],
        ],
    );
    let refs = ids_table(&[("STR", 1), ("DEX", 2)]);
    assert_eq!(
        project_one(&grid, &refs).unwrap(),
        r#"{"Attributes":[{"id":1,"value":10},{"id":2,"value":20}]}"#
    );
}

#[test]
fn attribute_run_array_subfield_parses_element_wise() {
    let grid = grid_of(
        "S",
        &[&["attribute", "value[]"], &["STR", "10|20|30"]],
    );
    let refs = ids_table(&[("STR", 1)]);
    assert_eq!(
        project_one(&grid, &refs).unwrap(),
        r#"{"Attributes":[{"id":1,"value":[10,20,30]}]}"#
    );
}

#[test]
fn attribute_scalar_falls_back_to_string_entry() {
    let grid = grid_of("S", &[&["attribute", "value"], &["STR", "special"]]);
    let refs = ids_table(&[("STR", 1)]);
    assert_eq!(
        project_one(&grid, &refs).unwrap(),
        r#"{"Attributes":[{"id":1,"valueString":"special"}]}"#
    );
}

#[test]
fn unresolved_attribute_head_keeps_id_string() {
    let grid = grid_of("S", &[&["attribute", "value"], &["MYSTERY", "10"]]);
    assert_eq!(
        project_one(&grid, &ReferenceTable::new()).unwrap(),
        r#"{"Attributes":[{"idString":"MYSTERY","value":10}]}"#
    );
}

#[test]
fn long_column_names_do_not_trigger_attribute_runs() {
    // "attributeDescription" is over the 11-char head limit.
    let grid = grid_of(
        "S",
        &[&["attributeDescription", "value"], &["STR", "10"]],
    );
    let refs = ids_table(&[("STR", 1)]);
    assert_eq!(
        project_one(&grid, &refs).unwrap(),
        r#"{"attributeDescription":1,"value":10}"#
    );
}

#[test]
fn projection_is_idempotent() {
    let grid = grid_of(
        "S",
        &[
            &["id", "name[]", "stat.hp", "tag", "tag"],
            &["1", "a|b", "10", "x", "y"],
            &["2", "c", "20", "z", ""],
        ],
    );
    let refs = ids_table(&[("STR", 1)]);
    let specs = infer_field_specs(&grid).unwrap();

    let mut w1 = Vec::new();
    let mut w2 = Vec::new();
    let first = project_sheet(&grid, &specs, &refs, &BTreeSet::new(), &mut w1);
    let second = project_sheet(&grid, &specs, &refs, &BTreeSet::new(), &mut w2);
    assert_eq!(first, second);
}

#[test]
fn every_emitted_object_round_trips_through_a_parser() {
    let grid = grid_of(
        "S",
        &[
            &["id", "name[]", "stat.hp", "reward{}", "attribute", "value"],
            &["1", "a|b", "10", r#"{"x":1}"#, "STR", "5"],
            &["2", "c", "20", r#"{"y":[1,2]}"#, "", ""],
        ],
    );
    let refs = ids_table(&[("STR", 9)]);
    let specs = infer_field_specs(&grid).unwrap();
    let mut warnings = Vec::new();
    let objects = project_sheet(&grid, &specs, &refs, &BTreeSet::new(), &mut warnings);

    assert_eq!(objects.len(), 2);
    for obj in &objects {
        let parsed: serde_json::Value = serde_json::from_str(obj).unwrap();
        assert!(parsed.is_object());
    }
}
