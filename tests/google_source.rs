use sheetx::compile::{compile_all, CompileOptions};
use sheetx::source::google::GoogleSheetSource;
use sheetx::source::SheetSource;

fn cell(v: &str) -> serde_json::Value {
    serde_json::json!({ "formattedValue": v })
}

fn row(cells: &[&str]) -> serde_json::Value {
    serde_json::json!({ "values": cells.iter().map(|c| cell(c)).collect::<Vec<_>>() })
}

fn payload() -> serde_json::Value {
    serde_json::json!({
        "spreadsheetId": "abc123",
        "sheets": [
            {
                "properties": { "title": "Ids" },
                "data": [{
                    "rowData": [
                        row(&["Key", "Id", "Comment"]),
                        row(&["STR", "1", "strength"]),
                    ]
                }]
            },
            {
                "properties": { "title": "Units" },
                "merges": [{
                    "startRowIndex": 1,
                    "endRowIndex": 3,
                    "startColumnIndex": 2,
                    "endColumnIndex": 3
                }],
                "data": [{
                    "rowData": [
                        row(&["id", "name", "tier"]),
                        row(&["1", "knight", "A"]),
                        row(&["2", "archer", ""]),
                    ]
                }]
            }
        ]
    })
}

#[test]
fn decodes_sheets_from_api_payload() {
    let source = GoogleSheetSource::from_response(payload()).unwrap();
    assert_eq!(source.sheet_names(), vec!["Ids", "Units"]);
}

#[test]
fn merge_ranges_propagate_through_normalization() {
    let mut source = GoogleSheetSource::from_response(payload()).unwrap();
    let grid = source.grid("Units").unwrap().normalize();

    // Row 2's tier is covered by the merge anchored at row 1.
    assert_eq!(grid.cell(2, 2), "A");
}

#[test]
fn compiles_end_to_end_from_payload() {
    let mut source = GoogleSheetSource::from_response(payload()).unwrap();
    let output = compile_all(&mut source, &CompileOptions::default()).unwrap();

    assert_eq!(output.documents.len(), 1);
    assert_eq!(
        output.documents[0].content,
        r#"[{"id":1,"name":"knight","tier":"A"},{"id":2,"name":"archer","tier":"A"}]"#
    );
}

#[test]
fn missing_grid_data_yields_source_mismatch_only_when_no_sheets() {
    let err = GoogleSheetSource::from_response(serde_json::json!({ "sheets": [] })).unwrap_err();
    assert!(err.to_string().contains("source mismatch"));

    // A sheet without grid data decodes to an empty grid rather than failing.
    let payload = serde_json::json!({
        "sheets": [{ "properties": { "title": "Empty" } }]
    });
    let mut source = GoogleSheetSource::from_response(payload).unwrap();
    let grid = source.grid("Empty").unwrap();
    assert_eq!(grid.row_count(), 0);
}
