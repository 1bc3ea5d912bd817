//! Row-to-JSON projection.
//!
//! One pass per row, fields left-to-right. The projector handles the full
//! column-naming convention: array merging across same-named columns,
//! dot-path nested objects, `{}` JSON fragments with embedded symbolic ids,
//! attribute runs, and promotion of text values that resolve through the
//! [`ReferenceTable`]. Everything here is a pure function of
//! `(row, field specs, reference table, persistent-field set)`; warnings are
//! collected, never thrown.

use std::collections::{BTreeSet, HashMap};

use serde_json::{Map, Number, Value};

use crate::compile::observability::CompileWarning;
use crate::compile::refs::ReferenceTable;
use crate::types::{split_array_cell, FieldSpec, FieldType, Grid};

/// Sub-field keywords recognized inside an attribute run, in match priority.
const ATTRIBUTE_SUBKEYS: [&str; 4] = ["unlock", "increase", "value", "max"];

/// Project every data row of a normalized grid into serialized JSON objects.
///
/// Blank rows are suppressed, so the result can be shorter than the number of
/// data rows. Objects serialize compactly with fields in column order.
pub fn project_sheet(
    grid: &Grid,
    specs: &[FieldSpec],
    refs: &ReferenceTable,
    persistent: &BTreeSet<String>,
    warnings: &mut Vec<CompileWarning>,
) -> Vec<String> {
    let counts = name_counts(specs);
    let mut objects = Vec::new();
    for (idx0, row) in grid.rows.iter().enumerate().skip(1) {
        // Report 1-based row numbers (header is row 1).
        let user_row = idx0 + 1;
        if let Some(obj) = project_row_inner(
            &grid.sheet,
            user_row,
            row,
            specs,
            &counts,
            refs,
            persistent,
            warnings,
        ) {
            objects.push(Value::Object(obj).to_string());
        }
    }
    objects
}

/// Project a single row.
///
/// Returns `None` when every non-persistent field is blank (the row is
/// suppressed from output).
pub fn project_row(
    sheet: &str,
    user_row: usize,
    row: &[String],
    specs: &[FieldSpec],
    refs: &ReferenceTable,
    persistent: &BTreeSet<String>,
    warnings: &mut Vec<CompileWarning>,
) -> Option<Map<String, Value>> {
    let counts = name_counts(specs);
    project_row_inner(sheet, user_row, row, specs, &counts, refs, persistent, warnings)
}

#[allow(clippy::too_many_arguments)]
fn project_row_inner(
    sheet: &str,
    user_row: usize,
    row: &[String],
    specs: &[FieldSpec],
    counts: &HashMap<&str, usize>,
    refs: &ReferenceTable,
    persistent: &BTreeSet<String>,
    warnings: &mut Vec<CompileWarning>,
) -> Option<Map<String, Value>> {
    let mut out = Map::new();
    let mut staged_paths: Vec<(String, Value)> = Vec::new();
    let mut attributes: Vec<Value> = Vec::new();
    let mut any_data = false;

    let mut i = 0;
    while i < specs.len() {
        let spec = &specs[i];
        if spec.excluded {
            i += 1;
            continue;
        }

        if is_attribute_run_head(specs, i) {
            let run = read_attribute_run(sheet, user_row, row, specs, i, refs, persistent, warnings);
            any_data |= run.any_data;
            if let Some(record) = run.record {
                attributes.push(record);
            }
            i += run.consumed;
            continue;
        }

        let raw = cell(row, spec.column);
        let force_array = spec.is_array || counts.get(spec.name.as_str()).copied().unwrap_or(0) > 1;

        if raw.is_empty() {
            if persistent.contains(&spec.name) {
                stage(&mut out, &mut staged_paths, spec, default_value(spec, force_array), force_array);
            }
            i += 1;
            continue;
        }

        if !persistent.contains(&spec.name) {
            any_data = true;
        }

        let value = convert_value(sheet, user_row, spec, raw, refs, warnings);
        stage(&mut out, &mut staged_paths, spec, value, force_array);
        i += 1;
    }

    if !any_data {
        return None;
    }

    splice_nested(&mut out, staged_paths);

    if !attributes.is_empty() {
        out.insert("Attributes".to_string(), Value::Array(attributes));
    }

    Some(out)
}

fn cell<'a>(row: &'a [String], col: usize) -> &'a str {
    row.get(col).map(String::as_str).unwrap_or("").trim()
}

/// Occurrences of each stripped field name among non-excluded columns.
/// A name appearing more than once forces array merging.
fn name_counts(specs: &[FieldSpec]) -> HashMap<&str, usize> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for spec in specs.iter().filter(|s| !s.excluded) {
        *counts.entry(spec.name.as_str()).or_default() += 1;
    }
    counts
}

/// Typed zero value emitted for blank persistent fields.
fn default_value(spec: &FieldSpec, force_array: bool) -> Value {
    if force_array {
        return Value::Array(Vec::new());
    }
    match spec.field_type.element() {
        FieldType::Number => Value::from(0),
        FieldType::Bool => Value::Bool(false),
        FieldType::Json => Value::Null,
        _ => Value::String(String::new()),
    }
}

// ---------------------------------------------------------------------------
// value conversion

fn convert_value(
    sheet: &str,
    user_row: usize,
    spec: &FieldSpec,
    raw: &str,
    refs: &ReferenceTable,
    warnings: &mut Vec<CompileWarning>,
) -> Value {
    if spec.is_json || spec.field_type == FieldType::Json {
        return convert_json_fragment(sheet, user_row, spec, raw, refs, warnings);
    }

    if spec.is_array || spec.field_type.is_array() {
        return convert_array(sheet, user_row, spec, raw, refs, warnings);
    }

    convert_scalar(sheet, user_row, spec, raw, refs, warnings)
}

fn convert_scalar(
    sheet: &str,
    user_row: usize,
    spec: &FieldSpec,
    raw: &str,
    refs: &ReferenceTable,
    warnings: &mut Vec<CompileWarning>,
) -> Value {
    match spec.field_type.element() {
        FieldType::Number => {
            if let Some(num) = number_value(raw) {
                num
            } else if let Some(id) = refs.resolve(raw) {
                Value::from(id)
            } else {
                warnings.push(CompileWarning::UnresolvedReference {
                    sheet: sheet.to_string(),
                    row: user_row,
                    column: spec.name.clone(),
                    key: raw.to_string(),
                });
                Value::from(0)
            }
        }
        FieldType::Bool => Value::Bool(raw.eq_ignore_ascii_case("true")),
        // Text: promote to a number when the value resolves as a table key or
        // a bare integer literal; otherwise it stays text.
        _ => match refs.resolve(raw) {
            Some(id) => Value::from(id),
            None => Value::String(raw.to_string()),
        },
    }
}

fn convert_array(
    sheet: &str,
    user_row: usize,
    spec: &FieldSpec,
    raw: &str,
    refs: &ReferenceTable,
    warnings: &mut Vec<CompileWarning>,
) -> Value {
    let elements = split_array_cell(raw);

    // An ArrayText column is promoted to numbers for this row when any
    // element resolves through the table; unresolved elements then degrade
    // to 0 with a warning.
    let element_type = spec.field_type.element();
    let promote = element_type == FieldType::Text && elements.iter().any(|e| refs.resolve(e).is_some());

    let values = elements
        .into_iter()
        .map(|element| {
            if promote {
                match refs.resolve(element) {
                    Some(id) => Value::from(id),
                    None => {
                        warnings.push(CompileWarning::UnresolvedReference {
                            sheet: sheet.to_string(),
                            row: user_row,
                            column: spec.name.clone(),
                            key: element.to_string(),
                        });
                        Value::from(0)
                    }
                }
            } else {
                convert_scalar(sheet, user_row, spec, element, refs, warnings)
            }
        })
        .collect();

    Value::Array(values)
}

fn convert_json_fragment(
    sheet: &str,
    user_row: usize,
    spec: &FieldSpec,
    raw: &str,
    refs: &ReferenceTable,
    warnings: &mut Vec<CompileWarning>,
) -> Value {
    // Symbolic ids embedded in the fragment become integers before parsing.
    let substituted = refs.resolve_embedded(raw);
    match serde_json::from_str::<Value>(&substituted) {
        Ok(value) => value,
        Err(e) => {
            warnings.push(CompileWarning::MalformedJson {
                sheet: sheet.to_string(),
                row: user_row,
                column: spec.name.clone(),
                message: e.to_string(),
            });
            Value::String(substituted)
        }
    }
}

/// Parse a numeric cell, keeping integers integral in the output.
fn number_value(raw: &str) -> Option<Value> {
    if raw.contains(',') {
        return None;
    }
    if let Ok(i) = raw.parse::<i64>() {
        return Some(Value::from(i));
    }
    raw.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .and_then(Number::from_f64)
        .map(Value::Number)
}

// ---------------------------------------------------------------------------
// staging: top-level fields, array merging, nested dot paths

fn stage(
    out: &mut Map<String, Value>,
    staged_paths: &mut Vec<(String, Value)>,
    spec: &FieldSpec,
    value: Value,
    force_array: bool,
) {
    if spec.is_nested() {
        stage_into_paths(staged_paths, &spec.name, value, force_array);
    } else {
        stage_into_map(out, &spec.name, value, force_array);
    }
}

fn stage_into_map(map: &mut Map<String, Value>, name: &str, value: Value, force_array: bool) {
    if force_array {
        let entry = map
            .entry(name.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if let Value::Array(arr) = entry {
            arr.extend(into_elements(value));
        }
    } else {
        map.insert(name.to_string(), value);
    }
}

fn stage_into_paths(staged: &mut Vec<(String, Value)>, path: &str, value: Value, force_array: bool) {
    if force_array {
        if let Some((_, Value::Array(arr))) = staged.iter_mut().find(|(p, _)| p == path) {
            arr.extend(into_elements(value));
            return;
        }
        staged.push((path.to_string(), Value::Array(into_elements(value))));
    } else {
        staged.push((path.to_string(), value));
    }
}

fn into_elements(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        other => vec![other],
    }
}

/// Deep-merge staged dot-path values into the row object. Later same-path
/// values overwrite earlier ones.
fn splice_nested(out: &mut Map<String, Value>, staged: Vec<(String, Value)>) {
    for (path, value) in staged {
        let mut segments: Vec<&str> = path.split('.').collect();
        let Some(last) = segments.pop() else { continue };

        let mut cursor: &mut Map<String, Value> = out;
        for segment in segments {
            let slot = cursor
                .entry(segment.to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            cursor = ensure_object(slot);
        }
        cursor.insert(last.to_string(), value);
    }
}

fn ensure_object(slot: &mut Value) -> &mut Map<String, Value> {
    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }
    slot.as_object_mut().expect("slot was just set to an object")
}

// ---------------------------------------------------------------------------
// attribute runs

/// A field heads an attribute run when its stripped name contains "attribute"
/// (≤ 11 chars) and the next field's name contains "value" (≤ 9 chars).
///
/// This is a naming heuristic, kept for behavioral fidelity with the
/// spreadsheets it was built for: an ordinary column that merely resembles an
/// attribute-system name can be misclassified.
fn is_attribute_run_head(specs: &[FieldSpec], i: usize) -> bool {
    let head = specs[i].name.to_lowercase();
    if !(head.contains("attribute") && head.len() <= 11) {
        return false;
    }
    let Some(next) = specs.get(i + 1) else {
        return false;
    };
    let next = next.name.to_lowercase();
    next.contains("value") && next.len() <= 9
}

fn attribute_subkey(name: &str) -> Option<&'static str> {
    let name = name.to_lowercase();
    ATTRIBUTE_SUBKEYS.iter().copied().find(|k| name.contains(k))
}

struct AttributeRun {
    record: Option<Value>,
    consumed: usize,
    any_data: bool,
}

#[allow(clippy::too_many_arguments)]
fn read_attribute_run(
    sheet: &str,
    user_row: usize,
    row: &[String],
    specs: &[FieldSpec],
    i: usize,
    refs: &ReferenceTable,
    persistent: &BTreeSet<String>,
    warnings: &mut Vec<CompileWarning>,
) -> AttributeRun {
    let head = &specs[i];
    let head_raw = cell(row, head.column);

    let mut record = Map::new();
    let mut any_data = false;

    if !head_raw.is_empty() {
        if !persistent.contains(&head.name) {
            any_data = true;
        }
        match refs.resolve(head_raw) {
            Some(id) => record.insert("id".to_string(), Value::from(id)),
            None => record.insert("idString".to_string(), Value::String(head_raw.to_string())),
        };
    }

    // The run consumes every contiguous field naming one of the recognized
    // sub-keys and stops at the first that names none of them.
    let mut j = i + 1;
    while j < specs.len() {
        let sub = &specs[j];
        let Some(key) = attribute_subkey(&sub.name) else {
            break;
        };
        if sub.excluded {
            j += 1;
            continue;
        }

        let raw = cell(row, sub.column);
        if !raw.is_empty() {
            if !persistent.contains(&sub.name) {
                any_data = true;
            }
            if sub.is_array {
                let values: Vec<Value> = split_array_cell(raw)
                    .into_iter()
                    .map(|element| attribute_element(sheet, user_row, sub, element, refs, warnings))
                    .collect();
                record.insert(key.to_string(), Value::Array(values));
            } else {
                let (entry_key, value) = attribute_scalar(key, raw, refs);
                record.insert(entry_key, value);
            }
        }
        j += 1;
    }

    AttributeRun {
        record: (!record.is_empty()).then(|| Value::Object(record)),
        consumed: j - i,
        any_data,
    }
}

/// A scalar sub-value parses as a number, falls back to a table lookup, and
/// finally degrades to a `<key>String` entry holding the raw text.
fn attribute_scalar(key: &'static str, raw: &str, refs: &ReferenceTable) -> (String, Value) {
    if let Some(num) = number_value(raw) {
        (key.to_string(), num)
    } else if let Some(id) = refs.resolve(raw) {
        (key.to_string(), Value::from(id))
    } else {
        (format!("{key}String"), Value::String(raw.to_string()))
    }
}

fn attribute_element(
    sheet: &str,
    user_row: usize,
    spec: &FieldSpec,
    element: &str,
    refs: &ReferenceTable,
    warnings: &mut Vec<CompileWarning>,
) -> Value {
    if let Some(num) = number_value(element) {
        num
    } else if let Some(id) = refs.resolve(element) {
        Value::from(id)
    } else {
        warnings.push(CompileWarning::UnresolvedReference {
            sheet: sheet.to_string(),
            row: user_row,
            column: spec.name.clone(),
            key: element.to_string(),
        });
        Value::from(0)
    }
}
