//! Compilation entrypoints and engine implementations.
//!
//! Most callers should use [`compile_sheets`] (or [`compile_all`]), which:
//!
//! - builds the [`ReferenceTable`] from every Ids-role sheet first (a hard
//!   barrier: no row is projected before the table is complete)
//! - infers a [`crate::types::FieldSpec`] table per data sheet
//! - projects rows to JSON objects and assembles one document per sheet,
//!   fanning independent sheets out across a thread pool
//! - reports warnings/success/failure to an optional [`CompileObserver`]
//!
//! Engine stages are also available individually under:
//! - [`infer`]
//! - [`refs`]
//! - [`project`]
//! - [`assemble`]

pub mod assemble;
pub mod infer;
pub mod observability;
pub mod project;
pub mod refs;

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use rayon::prelude::*;

use crate::error::{CompileError, CompileResult};
use crate::output::{Encryptor, OutputSink};
use crate::source::SheetSource;

pub use assemble::{assemble_document, combine_documents};
pub use infer::infer_field_specs;
pub use observability::{
    CompileContext, CompileObserver, CompileSeverity, CompileWarning, CompositeObserver,
    FileObserver, SheetStats, StdErrObserver,
};
pub use project::{project_row, project_sheet};
pub use refs::ReferenceTable;

/// What a sheet contributes to a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetRole {
    /// A data sheet, projected to one JSON document.
    Data,
    /// An Ids sheet, scanned into the [`ReferenceTable`].
    Ids,
}

/// One planned sheet in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetPlan {
    /// Tab name in the source.
    pub name: String,
    /// The sheet's role.
    pub role: SheetRole,
}

impl SheetPlan {
    /// A data-role plan entry.
    pub fn data(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: SheetRole::Data,
        }
    }

    /// An Ids-role plan entry.
    pub fn ids(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: SheetRole::Ids,
        }
    }

    /// Infer a plan from tab names for hosts without explicit role flags:
    /// names starting with "ids" (case-insensitive) take the Ids role.
    pub fn infer_from(names: &[String]) -> Vec<Self> {
        names
            .iter()
            .map(|name| {
                if name.trim().to_lowercase().starts_with("ids") {
                    Self::ids(name)
                } else {
                    Self::data(name)
                }
            })
            .collect()
    }
}

/// Options controlling a compile pass.
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct CompileOptions {
    /// Route each finished document through the [`Encryptor`] before the sink.
    pub encrypt: bool,
    /// Group all sheet documents under one JSON object keyed by sheet name
    /// instead of one file per sheet.
    pub combine_into_one_file: bool,
    /// Field names always emitted even when blank (e.g. `"id"`).
    pub persistent_fields: BTreeSet<String>,
    /// Optional observer for warnings/logging/alerts.
    pub observer: Option<Arc<dyn CompileObserver>>,
    /// Severity threshold at which `on_alert` is invoked. `None` alerts never.
    pub alert_at_or_above: Option<CompileSeverity>,
    /// Encryption collaborator; only consulted when `encrypt` is set.
    pub encryptor: Option<Arc<dyn Encryptor>>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            encrypt: false,
            combine_into_one_file: false,
            persistent_fields: BTreeSet::new(),
            observer: None,
            alert_at_or_above: Some(CompileSeverity::Critical),
            encryptor: None,
        }
    }
}

impl fmt::Debug for CompileOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompileOptions")
            .field("encrypt", &self.encrypt)
            .field("combine_into_one_file", &self.combine_into_one_file)
            .field("persistent_fields", &self.persistent_fields)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .field("encryptor_set", &self.encryptor.is_some())
            .finish()
    }
}

/// One sheet's finished JSON array document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetDocument {
    /// Sheet/tab name the document came from.
    pub sheet: String,
    /// Compact, newline-free JSON array of row objects.
    pub content: String,
}

/// Result of one compile pass over a source.
#[derive(Debug, Clone, Default)]
pub struct CompileOutput {
    /// One document per non-empty data sheet, in plan order.
    pub documents: Vec<SheetDocument>,
    /// Everything non-fatal that went wrong, in deterministic sheet order.
    pub warnings: Vec<CompileWarning>,
}

/// Compile every planned sheet of a source into JSON documents.
///
/// Phase 1 scans all Ids-role sheets into the [`ReferenceTable`]; projection
/// only starts once the table is frozen. Phase 2 fetches data grids (the
/// source is `&mut`, so fetching stays sequential). Phase 3 projects
/// independent sheets in parallel; the table is read-only by then and all row
/// state is local per call.
///
/// A planned sheet missing from the source degrades to a
/// [`CompileWarning::MissingSheet`]; only source-level failures (I/O, an
/// unreadable workbook) abort the pass.
///
/// # Examples
///
/// ```
/// use sheetx::compile::{compile_sheets, CompileOptions, SheetPlan};
/// use sheetx::source::StaticSource;
/// use sheetx::types::Grid;
///
/// # fn main() -> Result<(), sheetx::CompileError> {
/// let mut source = StaticSource::new(vec![Grid::new(
///     "Units",
///     vec![
///         vec!["id".into(), "name".into()],
///         vec!["1".into(), "knight".into()],
///     ],
/// )]);
///
/// let plan = vec![SheetPlan::data("Units")];
/// let output = compile_sheets(&mut source, &plan, &CompileOptions::default())?;
/// assert_eq!(output.documents[0].content, r#"[{"id":1,"name":"knight"}]"#);
/// # Ok(())
/// # }
/// ```
pub fn compile_sheets(
    source: &mut dyn SheetSource,
    plan: &[SheetPlan],
    options: &CompileOptions,
) -> CompileResult<CompileOutput> {
    let ctx = CompileContext {
        origin: source.origin(),
    };

    let mut warnings: Vec<CompileWarning> = Vec::new();

    // Phase 1: the reference table. A hard barrier; nothing projects until
    // every Ids sheet is scanned.
    let mut ids_grids = Vec::new();
    for entry in plan.iter().filter(|p| p.role == SheetRole::Ids) {
        match source.grid(&entry.name) {
            Ok(grid) => ids_grids.push(grid.normalize()),
            Err(CompileError::MissingSheet { sheet }) => {
                warnings.push(CompileWarning::MissingSheet { sheet });
            }
            Err(e) => return Err(e),
        }
    }
    let refs = ReferenceTable::from_ids_grids(ids_grids.iter(), &mut warnings);

    // Phase 2: materialize data grids.
    let mut data_grids = Vec::new();
    for entry in plan.iter().filter(|p| p.role == SheetRole::Data) {
        match source.grid(&entry.name) {
            Ok(grid) => data_grids.push(grid.normalize()),
            Err(CompileError::MissingSheet { sheet }) => {
                warnings.push(CompileWarning::MissingSheet { sheet });
            }
            Err(e) => return Err(e),
        }
    }

    // Phase 3: projection, fanned out across sheets.
    let persistent = &options.persistent_fields;
    let projected: Vec<(String, Option<String>, SheetStats, Vec<CompileWarning>)> = data_grids
        .par_iter()
        .map(|grid| {
            let mut local = Vec::new();
            let stats_rows = grid.row_count().saturating_sub(1);

            let Some(specs) = infer_field_specs(grid) else {
                local.push(CompileWarning::EmptySheet {
                    sheet: grid.sheet.clone(),
                });
                return (
                    grid.sheet.clone(),
                    None,
                    SheetStats { rows: 0, objects: 0 },
                    local,
                );
            };

            let objects = project_sheet(grid, &specs, &refs, persistent, &mut local);
            let stats = SheetStats {
                rows: stats_rows,
                objects: objects.len(),
            };
            let document = assemble_document(&objects);
            if document.is_none() {
                local.push(CompileWarning::EmptySheet {
                    sheet: grid.sheet.clone(),
                });
            }
            (grid.sheet.clone(), document, stats, local)
        })
        .collect();

    // Phase 4: deterministic reporting and assembly of the batch result.
    let mut documents = Vec::new();
    for (sheet, document, stats, local) in projected {
        warnings.extend(local);
        if let Some(content) = document {
            if let Some(obs) = options.observer.as_ref() {
                obs.on_sheet_success(&ctx, &sheet, stats);
            }
            documents.push(SheetDocument { sheet, content });
        }
    }

    if let Some(obs) = options.observer.as_ref() {
        for warning in &warnings {
            obs.on_warning(&ctx, warning);
        }
    }

    Ok(CompileOutput {
        documents,
        warnings,
    })
}

/// Compile every sheet of a source, inferring sheet roles from tab names.
pub fn compile_all(
    source: &mut dyn SheetSource,
    options: &CompileOptions,
) -> CompileResult<CompileOutput> {
    let plan = SheetPlan::infer_from(&source.sheet_names());
    compile_sheets(source, &plan, options)
}

/// Hand finished documents to an [`OutputSink`].
///
/// Per-sheet files are named `<sheet>.json`; with
/// [`CompileOptions::combine_into_one_file`] everything lands in one file
/// named `combined_file_name`. Encryption, when enabled, applies to each
/// final artifact just before the sink.
pub fn write_documents(
    documents: &[SheetDocument],
    sink: &dyn OutputSink,
    folder: &std::path::Path,
    combined_file_name: &str,
    options: &CompileOptions,
) -> CompileResult<()> {
    let finalize = |content: String| -> String {
        if options.encrypt {
            if let Some(enc) = options.encryptor.as_ref() {
                return enc.encrypt(&content);
            }
        }
        content
    };

    if options.combine_into_one_file {
        let combined =
            combine_documents(documents.iter().map(|d| (d.sheet.as_str(), d.content.as_str())));
        sink.write(folder, combined_file_name, &finalize(combined))?;
    } else {
        for document in documents {
            let file_name = format!("{}.json", document.sheet);
            sink.write(folder, &file_name, &finalize(document.content.clone()))?;
        }
    }
    Ok(())
}

/// Compile every workbook found under a folder.
///
/// Files that cannot be opened report `on_failure` (and `on_alert` past the
/// threshold) and are skipped; sibling files in the batch continue. Lock files
/// (`~$...`) are ignored.
#[cfg(feature = "excel")]
pub fn compile_workbook_folder(
    dir: impl AsRef<std::path::Path>,
    options: &CompileOptions,
) -> CompileResult<Vec<(std::path::PathBuf, CompileOutput)>> {
    use crate::source::excel::ExcelSource;

    let mut outputs = Vec::new();
    for entry in walkdir::WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .map(str::to_ascii_lowercase);
        if !matches!(ext.as_deref(), Some("xlsx") | Some("xlsm")) {
            continue;
        }
        if path
            .file_name()
            .and_then(|s| s.to_str())
            .is_some_and(|n| n.starts_with("~$"))
        {
            continue;
        }

        let ctx = CompileContext {
            origin: path.display().to_string(),
        };
        let mut source = match ExcelSource::open(path) {
            Ok(source) => source,
            Err(e) => {
                report_failure(options, &ctx, &e);
                continue;
            }
        };

        match compile_all(&mut source, options) {
            Ok(output) => outputs.push((path.to_path_buf(), output)),
            Err(e) => report_failure(options, &ctx, &e),
        }
    }
    Ok(outputs)
}

fn report_failure(options: &CompileOptions, ctx: &CompileContext, error: &CompileError) {
    let Some(obs) = options.observer.as_ref() else {
        return;
    };
    let severity = severity_for_error(error);
    obs.on_failure(ctx, severity, error);
    if let Some(threshold) = options.alert_at_or_above {
        if severity >= threshold {
            obs.on_alert(ctx, severity, error);
        }
    }
}

fn severity_for_error(e: &CompileError) -> CompileSeverity {
    match e {
        CompileError::Io(_) => CompileSeverity::Critical,
        CompileError::Csv(err) => match err.kind() {
            ::csv::ErrorKind::Io(_) => CompileSeverity::Critical,
            _ => CompileSeverity::Error,
        },
        #[cfg(feature = "excel")]
        CompileError::Excel(_) => CompileSeverity::Error,
        CompileError::Json(_) => CompileSeverity::Error,
        CompileError::MissingSheet { .. } => CompileSeverity::Error,
        CompileError::SourceMismatch { .. } => CompileSeverity::Error,
    }
}
