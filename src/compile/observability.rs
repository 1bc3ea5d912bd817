use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::CompileError;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum CompileSeverity {
    /// Informational event.
    Info,
    /// Warning-level event (non-fatal, batch continues).
    Warning,
    /// Error-level event (one source/file failed).
    Error,
    /// Critical error (typically I/O or other infrastructure failures).
    Critical,
}

/// Context about one compile pass.
#[derive(Debug, Clone)]
pub struct CompileContext {
    /// Where the data came from: a workbook path, or a label like `"google"`.
    pub origin: String,
}

/// Minimal stats reported when a sheet compiles successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetStats {
    /// Number of data rows scanned.
    pub rows: usize,
    /// Number of JSON objects emitted (blank rows are suppressed).
    pub objects: usize,
}

/// A non-fatal problem found while compiling a sheet.
///
/// Spreadsheet content is human-maintained and expected to contain mistakes;
/// the engine collects these and keeps going rather than aborting the pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CompileWarning {
    /// A planned sheet is absent from the source.
    MissingSheet {
        sheet: String,
    },
    /// A sheet has no header row, or projected to zero objects.
    EmptySheet {
        sheet: String,
    },
    /// An Ids key was registered twice with differing values; the latest wins.
    DuplicateId {
        sheet: String,
        key: String,
        previous: i64,
        replacement: i64,
    },
    /// A `{}` field failed to parse after key substitution.
    MalformedJson {
        sheet: String,
        row: usize,
        column: String,
        message: String,
    },
    /// A symbolic key resolved nowhere; the value degrades to 0.
    UnresolvedReference {
        sheet: String,
        row: usize,
        column: String,
        key: String,
    },
}

impl CompileWarning {
    /// The sheet this warning belongs to.
    pub fn sheet(&self) -> &str {
        match self {
            Self::MissingSheet { sheet }
            | Self::EmptySheet { sheet }
            | Self::DuplicateId { sheet, .. }
            | Self::MalformedJson { sheet, .. }
            | Self::UnresolvedReference { sheet, .. } => sheet,
        }
    }

    /// Severity used when forwarding to an observer. All warnings are
    /// non-fatal by construction.
    pub fn severity(&self) -> CompileSeverity {
        CompileSeverity::Warning
    }
}

impl fmt::Display for CompileWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSheet { sheet } => write!(f, "sheet '{sheet}' not found in source"),
            Self::EmptySheet { sheet } => write!(f, "sheet '{sheet}' is empty; nothing emitted"),
            Self::DuplicateId {
                sheet,
                key,
                previous,
                replacement,
            } => write!(
                f,
                "sheet '{sheet}': id key '{key}' redefined ({previous} -> {replacement}); latest wins"
            ),
            Self::MalformedJson {
                sheet,
                row,
                column,
                message,
            } => write!(
                f,
                "sheet '{sheet}' row {row} column '{column}': invalid json fragment: {message}"
            ),
            Self::UnresolvedReference {
                sheet,
                row,
                column,
                key,
            } => write!(
                f,
                "sheet '{sheet}' row {row} column '{column}': unresolved reference '{key}'"
            ),
        }
    }
}

/// Observer interface for compile outcomes.
///
/// Implementors can record metrics, logs, or trigger alerts.
pub trait CompileObserver: Send + Sync {
    /// Called for every warning collected while compiling.
    fn on_warning(&self, _ctx: &CompileContext, _warning: &CompileWarning) {}

    /// Called when a sheet compiles to a document.
    fn on_sheet_success(&self, _ctx: &CompileContext, _sheet: &str, _stats: SheetStats) {}

    /// Called when a whole source/file fails.
    fn on_failure(&self, _ctx: &CompileContext, _severity: CompileSeverity, _error: &CompileError) {}

    /// Called when a failure meets an alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &CompileContext, severity: CompileSeverity, error: &CompileError) {
        self.on_failure(ctx, severity, error)
    }
}

/// An observer that fans out callbacks to a list of observers.
#[derive(Default)]
pub struct CompositeObserver {
    observers: Vec<Arc<dyn CompileObserver>>,
}

impl CompositeObserver {
    /// Create a new composite observer from a list of observers.
    pub fn new(observers: Vec<Arc<dyn CompileObserver>>) -> Self {
        Self { observers }
    }
}

impl fmt::Debug for CompositeObserver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeObserver")
            .field("observers_len", &self.observers.len())
            .finish()
    }
}

impl CompileObserver for CompositeObserver {
    fn on_warning(&self, ctx: &CompileContext, warning: &CompileWarning) {
        for o in &self.observers {
            o.on_warning(ctx, warning);
        }
    }

    fn on_sheet_success(&self, ctx: &CompileContext, sheet: &str, stats: SheetStats) {
        for o in &self.observers {
            o.on_sheet_success(ctx, sheet, stats);
        }
    }

    fn on_failure(&self, ctx: &CompileContext, severity: CompileSeverity, error: &CompileError) {
        for o in &self.observers {
            o.on_failure(ctx, severity, error);
        }
    }

    fn on_alert(&self, ctx: &CompileContext, severity: CompileSeverity, error: &CompileError) {
        for o in &self.observers {
            o.on_alert(ctx, severity, error);
        }
    }
}

/// Logs compile events to stderr.
#[derive(Debug, Default)]
pub struct StdErrObserver;

impl CompileObserver for StdErrObserver {
    fn on_warning(&self, ctx: &CompileContext, warning: &CompileWarning) {
        eprintln!("[sheetx][warn] origin={} {warning}", ctx.origin);
    }

    fn on_sheet_success(&self, ctx: &CompileContext, sheet: &str, stats: SheetStats) {
        eprintln!(
            "[sheetx][ok] origin={} sheet={} rows={} objects={}",
            ctx.origin, sheet, stats.rows, stats.objects
        );
    }

    fn on_failure(&self, ctx: &CompileContext, severity: CompileSeverity, error: &CompileError) {
        eprintln!(
            "[sheetx][{:?}] origin={} err={}",
            severity, ctx.origin, error
        );
    }

    fn on_alert(&self, ctx: &CompileContext, severity: CompileSeverity, error: &CompileError) {
        eprintln!(
            "[ALERT][sheetx][{:?}] origin={} err={}",
            severity, ctx.origin, error
        );
    }
}

/// Appends compile events to a local log file.
#[derive(Debug)]
pub struct FileObserver {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileObserver {
    /// Create a file observer that appends events to `path`.
    ///
    /// Writes are best-effort; failures to open/write the log file are ignored.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    fn append_line(&self, line: &str) {
        let _guard = self.lock.lock().ok();
        if let Ok(mut f) = OpenOptions::new().create(true).append(true).open(&self.path) {
            let _ = writeln!(f, "{line}");
        }
    }
}

impl CompileObserver for FileObserver {
    fn on_warning(&self, ctx: &CompileContext, warning: &CompileWarning) {
        self.append_line(&format!("{} warn origin={} {warning}", unix_ts(), ctx.origin));
    }

    fn on_sheet_success(&self, ctx: &CompileContext, sheet: &str, stats: SheetStats) {
        self.append_line(&format!(
            "{} ok origin={} sheet={} rows={} objects={}",
            unix_ts(),
            ctx.origin,
            sheet,
            stats.rows,
            stats.objects
        ));
    }

    fn on_failure(&self, ctx: &CompileContext, severity: CompileSeverity, error: &CompileError) {
        self.append_line(&format!(
            "{} fail severity={:?} origin={} err={}",
            unix_ts(),
            severity,
            ctx.origin,
            error
        ));
    }

    fn on_alert(&self, ctx: &CompileContext, severity: CompileSeverity, error: &CompileError) {
        self.append_line(&format!(
            "{} ALERT severity={:?} origin={} err={}",
            unix_ts(),
            severity,
            ctx.origin,
            error
        ));
    }
}

fn unix_ts() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
