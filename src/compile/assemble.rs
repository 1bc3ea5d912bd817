//! Document assembly.
//!
//! Row objects come in already serialized; assembly is string joining, so the
//! final document is compact and newline-free by construction.

use serde_json::Value;

/// Join serialized row objects into one JSON array document.
///
/// Returns `None` when there are no objects: a sheet whose projection emitted
/// nothing is classified empty and produces no document at all.
pub fn assemble_document(objects: &[String]) -> Option<String> {
    if objects.is_empty() {
        return None;
    }
    let len = objects.iter().map(String::len).sum::<usize>() + objects.len() + 1;
    let mut doc = String::with_capacity(len);
    doc.push('[');
    for (i, obj) in objects.iter().enumerate() {
        if i > 0 {
            doc.push(',');
        }
        doc.push_str(obj);
    }
    doc.push(']');
    Some(doc)
}

/// Group per-sheet documents under one JSON object keyed by sheet name.
///
/// Documents are spliced in verbatim (they are already serialized JSON
/// arrays). An empty input yields the literal `{}`, which the output sink
/// treats as a no-op.
pub fn combine_documents<'a>(documents: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
    let mut out = String::from("{");
    for (i, (sheet, doc)) in documents.into_iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(&Value::String(sheet.to_string()).to_string());
        out.push(':');
        out.push_str(doc);
    }
    out.push('}');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_objects_with_commas() {
        let objects = vec![r#"{"id":1}"#.to_string(), r#"{"id":2}"#.to_string()];
        assert_eq!(
            assemble_document(&objects).unwrap(),
            r#"[{"id":1},{"id":2}]"#
        );
    }

    #[test]
    fn no_objects_means_no_document() {
        assert_eq!(assemble_document(&[]), None);
    }

    #[test]
    fn combine_keys_documents_by_sheet_name() {
        let combined = combine_documents([("Units", r#"[{"id":1}]"#), ("Items", "[]")]);
        assert_eq!(combined, r#"{"Units":[{"id":1}],"Items":[]}"#);
    }

    #[test]
    fn combine_of_nothing_is_empty_object() {
        assert_eq!(combine_documents([]), "{}");
    }
}
