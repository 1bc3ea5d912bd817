//! `sheetx` compiles spreadsheet tabs into compact JSON game-data documents.
//!
//! The pipeline turns a rectangular matrix of raw cell strings (row 0 =
//! header) into one JSON array of row objects per sheet: field types are
//! inferred per column, symbolic ids are resolved through a reference table
//! built from "Ids" sheets, and each row is projected left-to-right into one
//! JSON object.
//!
//! ## Sheet sources
//!
//! The engine is written once against [`source::SheetSource`]; adapters
//! normalize their backing store to the same grid shape:
//!
//! - **Excel workbooks** (`.xlsx`/`.xlsm`, requires the Cargo feature
//!   `excel`): [`source::excel::ExcelSource`]
//! - **Google Sheets**: [`source::google::GoogleSheetSource`], over an
//!   already-fetched API payload (OAuth/HTTP stay with the host)
//! - **CSV**: [`source::csv::CsvSource`], a single tab per file
//! - **In-memory**: [`source::StaticSource`]
//!
//! ## Column-naming conventions
//!
//! Header markers drive projection:
//!
//! - `name[]`: array field; cells split on `:`, `|`, CR, LF
//! - `payload{}`: JSON fragment; symbolic ids inside it resolve to integers
//! - `notes[x]`: excluded from output
//! - `stat.hp`: nested output path (`{"stat":{"hp":...}}`)
//! - columns sharing a name concatenate into one array, left to right
//! - an `attribute`/`value`/... column run encodes an `"Attributes"` record list
//!
//! ## Quick example: compile in-memory sheets
//!
//! ```
//! use sheetx::compile::{compile_sheets, CompileOptions, SheetPlan};
//! use sheetx::source::StaticSource;
//! use sheetx::types::Grid;
//!
//! # fn main() -> Result<(), sheetx::CompileError> {
//! let ids = Grid::new(
//!     "Ids",
//!     vec![
//!         vec!["Key".into(), "Id".into(), "Comment".into()],
//!         vec!["STR".into(), "1".into(), "strength".into()],
//!     ],
//! );
//! let units = Grid::new(
//!     "Units",
//!     vec![
//!         vec!["id".into(), "name".into(), "primary".into()],
//!         vec!["10".into(), "knight".into(), "STR".into()],
//!     ],
//! );
//!
//! let mut source = StaticSource::new(vec![ids, units]);
//! let plan = vec![SheetPlan::ids("Ids"), SheetPlan::data("Units")];
//! let output = compile_sheets(&mut source, &plan, &CompileOptions::default())?;
//!
//! // "STR" resolved through the reference table.
//! assert_eq!(
//!     output.documents[0].content,
//!     r#"[{"id":10,"name":"knight","primary":1}]"#
//! );
//! # Ok(())
//! # }
//! ```
//!
//! ## Writing documents
//!
//! Finished documents go to an [`output::OutputSink`]. The bundled
//! [`output::FileSink`] creates directories as needed, overwrites existing
//! files, and skips empty content:
//!
//! ```no_run
//! use std::path::Path;
//!
//! use sheetx::compile::{compile_all, write_documents, CompileOptions};
//! use sheetx::output::FileSink;
//! use sheetx::source::google::GoogleSheetSource;
//!
//! # fn main() -> Result<(), sheetx::CompileError> {
//! let payload = std::fs::read_to_string("spreadsheet.json")?;
//! let mut source = GoogleSheetSource::from_response_str(&payload)?;
//!
//! let options = CompileOptions::default();
//! let output = compile_all(&mut source, &options)?;
//! write_documents(
//!     &output.documents,
//!     &FileSink,
//!     Path::new("Assets/Data"),
//!     "GameData.json",
//!     &options,
//! )?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Error handling
//!
//! Spreadsheet content is human-maintained, so the engine favors a usable
//! partial artifact over hard failure: data-level problems (duplicate id
//! keys, malformed `{}` fragments, unresolved references, empty sheets)
//! collect as [`compile::CompileWarning`]s and can be forwarded to a
//! [`compile::CompileObserver`]. Only source-level failures (I/O, an
//! unreadable workbook, a malformed API payload) surface as
//! [`CompileError`]s.
//!
//! ## Modules
//!
//! - [`compile`]: the engine (type inference, reference table, row
//!   projection, document assembly, batch driver)
//! - [`source`]: the `SheetSource` trait and its adapters
//! - [`types`]: grid + field-spec data model
//! - [`output`]: output sink and encryption seams
//! - [`error`]: error types used across the crate

pub mod compile;
pub mod error;
pub mod output;
pub mod source;
pub mod types;

pub use error::{CompileError, CompileResult};
