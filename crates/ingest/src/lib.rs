//! Input normalizer: turns a seed file on disk into a [`ContainerSeed`].
//!
//! Two source formats are supported, selected by file extension:
//! - `.json`: either the plain `{variables, triggers, tags}` document or a
//!   container export (`containerVersion` at the top level), which is
//!   converted into the plain form;
//! - `.xlsx` / `.xls`: a workbook with `Variables`, `Triggers`, and `Tags`
//!   sheets, one parameter per row, multiple rows per resource.
//!
//! Parsing either succeeds with a complete seed or fails with a
//! [`ParseError`] naming the file and the structural problem. The only
//! documented coercion is skipping spreadsheet rows whose `name` cell is
//! blank; everything else malformed fails the whole parse.

use std::path::Path;

use tagforge_types::ContainerSeed;
use thiserror::Error;
use tracing::info;

mod json;
mod sheet;

/// A seed file could not be interpreted.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("could not read input file '{path}': {source}")]
    Unreadable {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("input file '{path}' is not valid JSON: {source}")]
    MalformedJson {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("unsupported input extension '{extension}' for '{path}'; use .json, .xlsx, or .xls")]
    UnsupportedExtension { path: String, extension: String },

    #[error("could not open spreadsheet '{path}': {source}")]
    UnreadableWorkbook {
        path: String,
        #[source]
        source: calamine::Error,
    },

    #[error("spreadsheet '{path}' is missing required sheet '{sheet}'")]
    MissingSheet { path: String, sheet: String },

    #[error("spreadsheet '{path}', sheet '{sheet}', row {row}: {problem}")]
    MalformedRow {
        path: String,
        sheet: String,
        row: usize,
        problem: String,
    },
}

/// Parse a seed file, detecting the format from the file extension.
pub fn read_seed(path: &Path) -> Result<ContainerSeed, ParseError> {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    let seed = match extension.as_str() {
        "json" => json::parse_json(path)?,
        "xlsx" | "xls" => sheet::parse_workbook(path)?,
        _ => {
            return Err(ParseError::UnsupportedExtension {
                path: path.display().to_string(),
                extension,
            });
        }
    };

    info!(
        path = %path.display(),
        variables = seed.variables.len(),
        triggers = seed.triggers.len(),
        tags = seed.tags.len(),
        "seed file parsed"
    );
    Ok(seed)
}
